//! Pure operations over [`MappingModel`]s.
//!
//! - [`MappingModel::invert`] swaps the from/to sides.
//! - [`MappingModel::rename_through`] re-keys a model `A → B` through a
//!   renamer `A → A'`, giving `A' → B`.
//! - [`MappingModel::merge`] accumulates a contribution with first-wins
//!   semantics, optionally only where a filter model confirms the identity.

use super::model::{ClassMapping, FieldMapping, MappingModel, MethodMapping};
use crate::base::{Name, remap_descriptor};

/// How much of a model [`MappingModel::invert`] swaps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvertScope {
    /// Class and member identities only, for membership tests.
    ///
    /// Every class is present in the result with a to-name (unmapped
    /// classes map to themselves) and parameter names are left out.
    Members,
    /// Every level, including parameter names. Unmapped entries stay
    /// unmapped.
    All,
}

/// A model used to confirm identities during [`MappingModel::merge`].
#[derive(Clone, Copy, Debug)]
pub struct MergeFilter<'a> {
    pub model: &'a MappingModel,
    /// Also skip classes the filter does not map (not just members).
    pub classes: bool,
}

impl<'a> MergeFilter<'a> {
    pub fn new(model: &'a MappingModel) -> Self {
        Self {
            model,
            classes: true,
        }
    }

    pub fn with_class_filtering(mut self, classes: bool) -> Self {
        self.classes = classes;
        self
    }
}

/// What a merge changed in the accumulator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub classes: usize,
    pub methods: usize,
    pub fields: usize,
    pub args: usize,
    /// Entries dropped because the filter did not confirm them.
    pub filtered: usize,
}

impl MergeStats {
    /// Returns true if the merge changed nothing.
    pub fn is_noop(&self) -> bool {
        self.classes == 0 && self.methods == 0 && self.fields == 0 && self.args == 0
    }
}

impl MappingModel {
    /// Produce a new model with from and to swapped.
    ///
    /// Member descriptors without a known to-side form are translated
    /// through this model's own class names.
    pub fn invert(&self, scope: InvertScope) -> MappingModel {
        let mut inverted =
            MappingModel::with_namespaces(self.to_namespace.clone(), self.from_namespace.clone());
        let classes = |name: &str| self.try_map_name(name);

        for class in self.classes() {
            let target = inverted.class_entry(class.mapped_name());
            match (scope, class.to()) {
                (InvertScope::Members, _) | (InvertScope::All, Some(_)) => {
                    target.set_to(&class.from);
                }
                (InvertScope::All, None) => {}
            }

            for field in class.fields() {
                let desc = field.to_desc.clone().or_else(|| {
                    field
                        .from_desc
                        .as_deref()
                        .map(|d| Name::from(remap_descriptor(d, classes)))
                });
                let mut swapped = FieldMapping::new(field.mapped_name(), desc);
                if scope == InvertScope::Members || field.to_name.is_some() {
                    swapped.to_name = Some(field.from_name.clone());
                    swapped.to_desc = field.from_desc.clone();
                }
                target.insert_field(swapped);
            }

            for method in class.methods() {
                let desc = method
                    .to_desc
                    .clone()
                    .unwrap_or_else(|| Name::from(remap_descriptor(&method.from_desc, classes)));
                let swapped = target.method_entry(method.mapped_name(), &desc);
                if scope == InvertScope::Members || method.to_name.is_some() {
                    swapped.set_name(&method.from_name);
                    swapped.to_desc = Some(method.from_desc.clone());
                }
                if scope == InvertScope::All {
                    for (index, arg) in method.args() {
                        swapped.set_arg(index, arg);
                    }
                }
            }
        }

        inverted
    }

    /// Re-key this `A → B` model through `renamer: A → A'`, giving `A' → B`.
    ///
    /// Classes and members whose A-name the renamer does not map are dropped:
    /// they have no identity in A'.
    pub fn rename_through(&self, renamer: &MappingModel) -> MappingModel {
        let mut renamed =
            MappingModel::with_namespaces(renamer.to_namespace.clone(), self.to_namespace.clone());
        let classes = |name: &str| renamer.try_map_name(name);
        let mut dropped = 0usize;

        for class in self.classes() {
            let Some(via) = renamer.get(&class.from) else {
                dropped += 1 + class.field_count() + class.method_count();
                continue;
            };
            let Some(new_from) = via.to() else {
                dropped += 1 + class.field_count() + class.method_count();
                continue;
            };

            let target = renamed.class_entry(new_from);
            if let Some(to) = class.to() {
                target.set_to(to);
            }

            for field in class.fields() {
                let Some(new_name) = renamed_field(via, field) else {
                    dropped += 1;
                    continue;
                };
                let desc = field
                    .from_desc
                    .as_deref()
                    .map(|d| Name::from(remap_descriptor(d, classes)));
                let mut moved = FieldMapping::new(new_name, desc);
                moved.to_name = field.to_name.clone();
                moved.to_desc = field.to_desc.clone();
                target.insert_field(moved);
            }

            for method in class.methods() {
                let Some((new_name, new_desc)) = renamed_method(via, method, &classes) else {
                    dropped += 1;
                    continue;
                };
                let moved = target.method_entry(&new_name, &new_desc);
                if let Some(to) = method.name() {
                    moved.set_name(to);
                }
                if moved.to_desc.is_none() {
                    moved.to_desc = method.to_desc.clone();
                }
                for (index, arg) in method.args() {
                    moved.set_arg(index, arg);
                }
            }
        }

        if dropped > 0 {
            tracing::debug!("Renaming dropped {dropped} entries without a destination identity");
        }
        renamed
    }

    /// Accumulate `contribution` into this model, first-wins.
    ///
    /// Entries that map to themselves carry no information and are skipped.
    /// With a filter, an entry is only taken if the filter model knows the
    /// same class (when class filtering is on) and the same member.
    pub fn merge(
        &mut self,
        contribution: &MappingModel,
        filter: Option<MergeFilter<'_>>,
    ) -> MergeStats {
        let mut stats = MergeStats::default();

        for class in contribution.classes() {
            let confirmed = match filter {
                Some(filter) => {
                    if filter.classes && filter.model.try_map_name(&class.from).is_none() {
                        stats.filtered += 1 + class.field_count() + class.method_count();
                        continue;
                    }
                    Some(filter.model.get(&class.from))
                }
                None => None,
            };

            let existing = self.class_entry(&class.from);
            if let Some(to) = class.to().filter(|to| *to != class.from.as_str()) {
                if existing.set_to(to) {
                    stats.classes += 1;
                }
            }

            for method in class.methods() {
                if let Some(confirmed) = confirmed {
                    let known = confirmed
                        .is_some_and(|c| c.has_method(&method.from_name, &method.from_desc));
                    if !known {
                        stats.filtered += 1;
                        continue;
                    }
                }

                let target = existing.method_entry(&method.from_name, &method.from_desc);
                if let Some(to) = method.name().filter(|to| *to != method.from_name.as_str()) {
                    if target.set_name(to) {
                        target.to_desc = method.to_desc.clone();
                        stats.methods += 1;
                    }
                }
                for (index, arg) in method.args() {
                    if target.set_arg(index, arg) {
                        stats.args += 1;
                    }
                }
            }

            for field in class.fields() {
                if let Some(confirmed) = confirmed {
                    let known = confirmed
                        .is_some_and(|c| c.has_field(&field.from_name, field.from_desc.as_deref()));
                    if !known {
                        stats.filtered += 1;
                        continue;
                    }
                }

                let target = existing.field_entry(&field.from_name, field.from_desc.as_deref());
                if let Some(to) = field.name().filter(|to| *to != field.from_name.as_str()) {
                    if target.set_name(to) {
                        target.to_desc = field.to_desc.clone();
                        stats.fields += 1;
                    }
                }
            }
        }

        stats
    }
}

fn renamed_field(via: &ClassMapping, field: &FieldMapping) -> Option<Name> {
    via.field(&field.from_name, field.from_desc.as_deref())
        .and_then(|f| f.to_name.clone())
}

fn renamed_method<'a, F>(
    via: &ClassMapping,
    method: &MethodMapping,
    classes: &F,
) -> Option<(Name, Name)>
where
    F: Fn(&str) -> Option<&'a str>,
{
    let found = via.method(&method.from_name, &method.from_desc)?;
    let name = found.to_name.clone()?;
    let desc = found
        .to_desc
        .clone()
        .unwrap_or_else(|| Name::from(remap_descriptor(&method.from_desc, classes)));
    Some((name, desc))
}
