//! Three-tier name resolution over a primary and a fallback model.
//!
//! Zero-copy borrowed views that combine a primary model `P: X → Y` with a
//! fallback model `F: X → Z`. Every record exposes:
//!
//! - `from` - the identity in X
//! - `to` - P's name, else `from`
//! - `fallback` - F's name, else `to`
//!
//! ## Usage
//!
//! ```ignore
//! let combined = CombinedMappings::new(&named, &intermediary);
//! for class in combined.classes() {
//!     println!("{} -> {} ({})", class.from, class.to, class.fallback);
//! }
//! ```

use super::MappingError;
use super::format::{MappingTable, TableVisitor};
use super::model::{ClassMapping, FieldMapping, MappingModel, MethodMapping};

/// A read-only combination of two models over the same from-namespace.
#[derive(Clone, Copy)]
pub struct CombinedMappings<'m> {
    primary: &'m MappingModel,
    fallback: &'m MappingModel,
}

impl<'m> CombinedMappings<'m> {
    pub fn new(primary: &'m MappingModel, fallback: &'m MappingModel) -> Self {
        Self { primary, fallback }
    }

    pub fn primary(&self) -> &'m MappingModel {
        self.primary
    }

    pub fn fallback(&self) -> &'m MappingModel {
        self.fallback
    }

    /// Every class known to either model: primary order first, then the
    /// fallback's remaining classes.
    pub fn classes(self) -> impl Iterator<Item = CombinedClass<'m>> + 'm {
        let primary = self.primary;
        let fallback = self.fallback;

        let first = primary
            .classes()
            .map(move |class| {
                CombinedClass::new(&class.from, Some(class), fallback.get(&class.from))
            });
        let rest = fallback
            .classes()
            .filter(move |class| !primary.contains_class(&class.from))
            .map(|class| CombinedClass::new(&class.from, None, Some(class)));

        first.chain(rest)
    }

    /// Every combined method, with its class.
    pub fn methods(self) -> impl Iterator<Item = (CombinedClass<'m>, CombinedMember<'m>)> + 'm {
        self.classes()
            .flat_map(|class| class.methods().map(move |method| (class, method)))
    }

    /// Every combined field, with its class.
    pub fn fields(self) -> impl Iterator<Item = (CombinedClass<'m>, CombinedMember<'m>)> + 'm {
        self.classes()
            .flat_map(|class| class.fields().map(move |field| (class, field)))
    }

    /// Every method carrying at least one parameter name, with its class.
    pub fn arg_methods(self) -> impl Iterator<Item = (CombinedClass<'m>, ArgMethod<'m>)> + 'm {
        self.classes()
            .flat_map(|class| class.arg_methods().map(move |method| (class, method)))
    }

    /// Returns true if any method in either model names a parameter.
    pub fn has_args(&self) -> bool {
        self.primary.methods().any(|(_, m)| m.has_args())
            || self.fallback.methods().any(|(_, m)| m.has_args())
    }
}

/// A class seen through both models.
#[derive(Clone, Copy)]
pub struct CombinedClass<'m> {
    pub from: &'m str,
    pub to: &'m str,
    pub fallback: &'m str,
    primary: Option<&'m ClassMapping>,
    secondary: Option<&'m ClassMapping>,
}

impl<'m> CombinedClass<'m> {
    fn new(
        from: &'m str,
        primary: Option<&'m ClassMapping>,
        secondary: Option<&'m ClassMapping>,
    ) -> Self {
        let to = primary.and_then(ClassMapping::to).unwrap_or(from);
        let fallback = secondary.and_then(ClassMapping::to).unwrap_or(to);
        Self {
            from,
            to,
            fallback,
            primary,
            secondary,
        }
    }

    /// Methods of either side, primary order first.
    pub fn methods(self) -> impl Iterator<Item = CombinedMember<'m>> + 'm {
        let primary = self.primary;
        let secondary = self.secondary;

        let first = primary
            .into_iter()
            .flat_map(ClassMapping::methods)
            .map(move |method| {
                let other = secondary.and_then(|c| c.method(&method.from_name, &method.from_desc));
                CombinedMember::from_methods(Some(method), other)
            });
        let rest = secondary
            .into_iter()
            .flat_map(ClassMapping::methods)
            .filter(move |method| {
                !primary.is_some_and(|c| c.has_method(&method.from_name, &method.from_desc))
            })
            .map(|method| CombinedMember::from_methods(None, Some(method)));

        first.chain(rest)
    }

    /// Fields of either side, primary order first.
    pub fn fields(self) -> impl Iterator<Item = CombinedMember<'m>> + 'm {
        let primary = self.primary;
        let secondary = self.secondary;

        let first = primary
            .into_iter()
            .flat_map(ClassMapping::fields)
            .map(move |field| {
                let other =
                    secondary.and_then(|c| c.field(&field.from_name, field.from_desc.as_deref()));
                CombinedMember::from_fields(Some(field), other)
            });
        let rest = secondary
            .into_iter()
            .flat_map(ClassMapping::fields)
            .filter(move |field| {
                !primary.is_some_and(|c| c.has_field(&field.from_name, field.from_desc.as_deref()))
            })
            .map(|field| CombinedMember::from_fields(None, Some(field)));

        first.chain(rest)
    }

    /// Methods with any named parameter.
    pub fn arg_methods(self) -> impl Iterator<Item = ArgMethod<'m>> + 'm {
        let primary = self.primary;
        let secondary = self.secondary;

        self.methods().filter_map(move |member| {
            let first = primary.and_then(|c| c.method(member.from, member.desc?));
            let second = secondary.and_then(|c| c.method(member.from, member.desc?));
            ArgMethod::new(member, first, second)
        })
    }
}

/// A field or method seen through both models.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CombinedMember<'m> {
    pub from: &'m str,
    /// Descriptor in the from-namespace (unknown for some fields).
    pub desc: Option<&'m str>,
    pub to: &'m str,
    pub fallback: &'m str,
}

impl<'m> CombinedMember<'m> {
    fn from_methods(
        primary: Option<&'m MethodMapping>,
        secondary: Option<&'m MethodMapping>,
    ) -> Self {
        let (from, desc) = match primary.or(secondary) {
            Some(m) => (m.from_name.as_str(), Some(m.from_desc.as_str())),
            None => ("", None),
        };
        let to = primary.and_then(MethodMapping::name).unwrap_or(from);
        let fallback = secondary.and_then(MethodMapping::name).unwrap_or(to);
        Self {
            from,
            desc,
            to,
            fallback,
        }
    }

    fn from_fields(primary: Option<&'m FieldMapping>, secondary: Option<&'m FieldMapping>) -> Self {
        let (from, desc) = match primary.or(secondary) {
            Some(f) => (
                f.from_name.as_str(),
                primary
                    .and_then(|f| f.from_desc.as_deref())
                    .or_else(|| secondary.and_then(|f| f.from_desc.as_deref())),
            ),
            None => ("", None),
        };
        let to = primary.and_then(FieldMapping::name).unwrap_or(from);
        let fallback = secondary.and_then(FieldMapping::name).unwrap_or(to);
        Self {
            from,
            desc,
            to,
            fallback,
        }
    }
}

/// A method with parameter names, each resolved primary-then-fallback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgMethod<'m> {
    pub member: CombinedMember<'m>,
    /// (slot, to-tier name, fallback-tier name), ascending by slot.
    pub args: Vec<(usize, &'m str, &'m str)>,
}

impl<'m> ArgMethod<'m> {
    fn new(
        member: CombinedMember<'m>,
        primary: Option<&'m MethodMapping>,
        secondary: Option<&'m MethodMapping>,
    ) -> Option<Self> {
        let slots = primary
            .map(|m| m.args().map(|(i, _)| i).max())
            .unwrap_or_default()
            .max(secondary.and_then(|m| m.args().map(|(i, _)| i).max()))?;

        let args: Vec<_> = (0..=slots)
            .filter_map(|slot| {
                let first = primary.and_then(|m| m.arg(slot));
                let second = secondary.and_then(|m| m.arg(slot));
                let to = first.or(second)?;
                Some((slot, to, second.unwrap_or(to)))
            })
            .collect();

        (!args.is_empty()).then_some(Self { member, args })
    }

    /// `<slot>: <name>` entries in descending slot order.
    pub fn named_args(&self) -> impl Iterator<Item = String> + '_ {
        self.args
            .iter()
            .rev()
            .map(|(slot, name, _)| format!("{slot}: {name}"))
    }
}

impl MappingTable for CombinedMappings<'_> {
    fn column_count(&self) -> usize {
        3
    }

    fn accept(&self, visitor: &mut dyn TableVisitor) -> Result<(), MappingError> {
        for class in self.classes() {
            visitor.visit_class(&[Some(class.from), Some(class.to), Some(class.fallback)])?;

            for field in class.fields() {
                visitor.visit_field(
                    field.desc,
                    &[Some(field.from), Some(field.to), Some(field.fallback)],
                )?;
            }

            let mut args = class.arg_methods().peekable();
            for method in class.methods() {
                let desc = method.desc.unwrap_or_default();
                let names = [Some(method.from), Some(method.to), Some(method.fallback)];
                visitor.visit_method(desc, &names)?;

                while let Some(arg_method) = args.next_if(|a| a.member == method) {
                    for (slot, to, fallback) in &arg_method.args {
                        visitor.visit_arg(*slot, &[None, Some(*to), Some(*fallback)])?;
                    }
                }
            }
        }
        Ok(())
    }
}
