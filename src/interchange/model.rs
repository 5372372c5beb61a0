//! In-memory mapping model.
//!
//! A [`MappingModel`] renames classes, fields and methods from one namespace
//! ("from") into another ("to"). Every entry is keyed by its from-side
//! identity; the to-side name is an explicit `Option`, so "never mapped" and
//! "mapped to itself" stay distinguishable.
//!
//! ```text
//! MappingModel
//! ├── classes: IndexMap<Name, ClassMapping>        (insertion order)
//! │   ├── fields:  IndexMap<(name, desc?), FieldMapping>
//! │   └── methods: IndexMap<(name, desc), MethodMapping>
//! │                └── args: Vec<Option<Name>>    (sparse, by slot)
//! └── namespaces: (from, to) labels, when known
//! ```
//!
//! Accept-calls are first-wins: a to-name, once present, is never replaced.

use indexmap::IndexMap;
use rayon::prelude::*;

use super::MappingError;
use super::format::{MappingTable, TableVisitor};
use crate::base::Name;
use crate::base::constants::MAX_PARAMETER_SLOT;

/// Key of a method inside a class: (from-name, from-descriptor).
pub type MethodKey = (Name, Name);

/// Key of a field inside a class: (from-name, from-descriptor if known).
pub type FieldKey = (Name, Option<Name>);

// ============================================================================
// MEMBERS
// ============================================================================

/// A method rename, with sparse per-slot parameter names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodMapping {
    pub from_name: Name,
    pub from_desc: Name,
    pub to_name: Option<Name>,
    /// Descriptor in the to-namespace, when a source supplied it.
    pub to_desc: Option<Name>,
    args: Vec<Option<Name>>,
}

impl MethodMapping {
    pub fn new(from_name: impl Into<Name>, from_desc: impl Into<Name>) -> Self {
        Self {
            from_name: from_name.into(),
            from_desc: from_desc.into(),
            to_name: None,
            to_desc: None,
            args: Vec::new(),
        }
    }

    /// The to-name, if this method was ever mapped.
    pub fn name(&self) -> Option<&str> {
        self.to_name.as_deref()
    }

    /// The to-name, falling back to the from-name.
    pub fn mapped_name(&self) -> &str {
        self.to_name.as_deref().unwrap_or(&self.from_name)
    }

    /// Parameter name at `index`, if any.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).and_then(|a| a.as_deref())
    }

    /// Returns true if any parameter slot carries a name.
    pub fn has_args(&self) -> bool {
        self.args.iter().any(Option::is_some)
    }

    /// Named parameter slots in ascending order.
    pub fn args(&self) -> impl Iterator<Item = (usize, &Name)> + '_ {
        self.args
            .iter()
            .enumerate()
            .filter_map(|(index, arg)| arg.as_ref().map(|name| (index, name)))
    }

    /// Set a parameter name; first-wins per slot. Slots past
    /// [`MAX_PARAMETER_SLOT`] are refused.
    pub(crate) fn set_arg(&mut self, index: usize, name: &str) -> bool {
        if index > MAX_PARAMETER_SLOT {
            return false;
        }
        if self.args.len() <= index {
            self.args.resize(index + 1, None);
        }
        let slot = &mut self.args[index];
        if slot.is_some() {
            return false;
        }
        *slot = Some(Name::new(name));
        true
    }

    pub(crate) fn set_name(&mut self, to: &str) -> bool {
        if self.to_name.is_some() {
            return false;
        }
        self.to_name = Some(Name::new(to));
        true
    }
}

/// A field rename. The descriptor may be unknown until resolved externally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldMapping {
    pub from_name: Name,
    pub from_desc: Option<Name>,
    pub to_name: Option<Name>,
    pub to_desc: Option<Name>,
}

impl FieldMapping {
    pub fn new(from_name: impl Into<Name>, from_desc: Option<Name>) -> Self {
        Self {
            from_name: from_name.into(),
            from_desc,
            to_name: None,
            to_desc: None,
        }
    }

    /// The to-name, if this field was ever mapped.
    pub fn name(&self) -> Option<&str> {
        self.to_name.as_deref()
    }

    /// The to-name, falling back to the from-name.
    pub fn mapped_name(&self) -> &str {
        self.to_name.as_deref().unwrap_or(&self.from_name)
    }

    pub(crate) fn set_name(&mut self, to: &str) -> bool {
        if self.to_name.is_some() {
            return false;
        }
        self.to_name = Some(Name::new(to));
        true
    }

    fn key(&self) -> FieldKey {
        (self.from_name.clone(), self.from_desc.clone())
    }
}

// ============================================================================
// CLASS
// ============================================================================

/// A class rename and the members renamed inside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassMapping {
    pub from: Name,
    to: Option<Name>,
    fields: IndexMap<FieldKey, FieldMapping>,
    methods: IndexMap<MethodKey, MethodMapping>,
}

impl ClassMapping {
    pub fn new(from: impl Into<Name>) -> Self {
        Self {
            from: from.into(),
            to: None,
            fields: IndexMap::new(),
            methods: IndexMap::new(),
        }
    }

    /// The to-name, if this class was ever mapped.
    pub fn to(&self) -> Option<&str> {
        self.to.as_deref()
    }

    /// The to-name, falling back to the from-name.
    pub fn mapped_name(&self) -> &str {
        self.to.as_deref().unwrap_or(&self.from)
    }

    pub fn method(&self, name: &str, desc: &str) -> Option<&MethodMapping> {
        self.methods.get(&(Name::new(name), Name::new(desc)))
    }

    pub fn has_method(&self, name: &str, desc: &str) -> bool {
        self.method(name, desc).is_some()
    }

    /// Look up a field by exact key, falling back to the name alone when
    /// either descriptor is unknown and exactly one field has that name.
    pub fn field(&self, name: &str, desc: Option<&str>) -> Option<&FieldMapping> {
        if let Some(field) = self
            .fields
            .get(&(Name::new(name), desc.map(Name::new)))
        {
            return Some(field);
        }

        let mut candidates = self
            .fields
            .values()
            .filter(|f| f.from_name.as_str() == name && (desc.is_none() || f.from_desc.is_none()));
        match (candidates.next(), candidates.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }

    pub fn has_field(&self, name: &str, desc: Option<&str>) -> bool {
        self.field(name, desc).is_some()
    }

    /// Fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldMapping> + '_ {
        self.fields.values()
    }

    /// Methods in insertion order.
    pub fn methods(&self) -> impl Iterator<Item = &MethodMapping> + '_ {
        self.methods.values()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub(crate) fn set_to(&mut self, to: &str) -> bool {
        if self.to.is_some() {
            return false;
        }
        self.to = Some(Name::new(to));
        true
    }

    pub(crate) fn method_entry(&mut self, name: &str, desc: &str) -> &mut MethodMapping {
        self.methods
            .entry((Name::new(name), Name::new(desc)))
            .or_insert_with(|| MethodMapping::new(name, desc))
    }

    pub(crate) fn field_entry(&mut self, name: &str, desc: Option<&str>) -> &mut FieldMapping {
        // A placeholder without descriptor stands for the only same-named field.
        let key = match self.field(name, desc) {
            Some(existing) => existing.key(),
            None => (Name::new(name), desc.map(Name::new)),
        };
        self.fields
            .entry(key)
            .or_insert_with(|| FieldMapping::new(name, desc.map(Name::new)))
    }

    pub(crate) fn insert_field(&mut self, field: FieldMapping) {
        self.fields.entry(field.key()).or_insert(field);
    }
}

// ============================================================================
// MODEL
// ============================================================================

/// A complete from→to mapping table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MappingModel {
    classes: IndexMap<Name, ClassMapping>,
    /// Label of the from-namespace, when known.
    pub from_namespace: Option<Name>,
    /// Label of the to-namespace, when known.
    pub to_namespace: Option<Name>,
}

impl MappingModel {
    /// Create a new empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty model between two labelled namespaces.
    pub fn between(from: &str, to: &str) -> Self {
        Self::with_namespaces(Some(Name::new(from)), Some(Name::new(to)))
    }

    pub(crate) fn with_namespaces(from: Option<Name>, to: Option<Name>) -> Self {
        Self {
            from_namespace: from,
            to_namespace: to,
            ..Self::default()
        }
    }

    // ── Accept-calls (first-wins) ───────────────────────────────────

    /// Register a class and, if it has no to-name yet, set it.
    ///
    /// Returns true if the to-name was set by this call.
    pub fn accept_class(&mut self, from: &str, to: Option<&str>) -> bool {
        let class = self.class_entry(from);
        match to {
            Some(to) => class.set_to(to),
            None => false,
        }
    }

    /// Register a method, creating its class on first reference.
    ///
    /// `class_to` is applied to the class with first-wins semantics.
    /// Returns true if the method's to-name was set by this call.
    pub fn accept_method(
        &mut self,
        class_from: &str,
        class_to: Option<&str>,
        name: &str,
        desc: &str,
        to: Option<&str>,
    ) -> bool {
        let class = self.class_entry(class_from);
        if let Some(class_to) = class_to {
            class.set_to(class_to);
        }
        let method = class.method_entry(name, desc);
        match to {
            Some(to) => method.set_name(to),
            None => false,
        }
    }

    /// Register a field, creating its class on first reference.
    ///
    /// Returns true if the field's to-name was set by this call.
    pub fn accept_field(
        &mut self,
        class_from: &str,
        class_to: Option<&str>,
        name: &str,
        desc: Option<&str>,
        to: Option<&str>,
    ) -> bool {
        let class = self.class_entry(class_from);
        if let Some(class_to) = class_to {
            class.set_to(class_to);
        }
        let field = class.field_entry(name, desc);
        match to {
            Some(to) => field.set_name(to),
            None => false,
        }
    }

    /// Name a method parameter slot; first-wins per slot.
    pub fn accept_method_arg(
        &mut self,
        class_from: &str,
        name: &str,
        desc: &str,
        index: usize,
        arg: &str,
    ) -> bool {
        self.class_entry(class_from)
            .method_entry(name, desc)
            .set_arg(index, arg)
    }

    // ── Lookup ──────────────────────────────────────────────────────

    /// The class entry for `from`, if the class is known at all.
    pub fn get(&self, from: &str) -> Option<&ClassMapping> {
        self.classes.get(from)
    }

    /// The to-name of `from`, or `None` exactly when it was never mapped.
    pub fn try_map_name(&self, from: &str) -> Option<&str> {
        self.classes.get(from).and_then(ClassMapping::to)
    }

    /// The to-name of `from`, falling back to `from` itself.
    pub fn map_class_name<'a>(&'a self, from: &'a str) -> &'a str {
        self.try_map_name(from).unwrap_or(from)
    }

    pub fn contains_class(&self, from: &str) -> bool {
        self.classes.contains_key(from)
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    // ── Traversal ───────────────────────────────────────────────────

    /// All classes. Call again to restart; order carries no meaning.
    pub fn classes(&self) -> impl Iterator<Item = &ClassMapping> + Clone + '_ {
        self.classes.values()
    }

    /// All classes, for read-only parallel validation passes.
    pub fn par_classes(&self) -> impl ParallelIterator<Item = &ClassMapping> + '_ {
        self.classes.par_values()
    }

    /// Every method of every class, with its owner.
    pub fn methods(&self) -> impl Iterator<Item = (&ClassMapping, &MethodMapping)> + '_ {
        self.classes()
            .flat_map(|class| class.methods().map(move |method| (class, method)))
    }

    /// Every field of every class, with its owner.
    pub fn fields(&self) -> impl Iterator<Item = (&ClassMapping, &FieldMapping)> + '_ {
        self.classes()
            .flat_map(|class| class.fields().map(move |field| (class, field)))
    }

    /// Total member count (fields + methods).
    pub fn member_count(&self) -> usize {
        self.classes
            .values()
            .map(|c| c.field_count() + c.method_count())
            .sum()
    }

    // ── Maintenance ─────────────────────────────────────────────────

    /// Fill in unknown field descriptors.
    ///
    /// `lookup` is queried with `<className>/<fieldName>` for every field
    /// whose descriptor is missing. Returns how many were resolved.
    pub fn resolve_field_descriptors<F>(&mut self, lookup: F) -> usize
    where
        F: Fn(&str) -> Option<Name>,
    {
        let mut resolved = 0;

        for class in self.classes.values_mut() {
            if class.fields.keys().all(|(_, desc)| desc.is_some()) {
                continue;
            }

            let fields = std::mem::take(&mut class.fields);
            for (_, mut field) in fields {
                if field.from_desc.is_none() {
                    let key = format!("{}/{}", class.from, field.from_name);
                    if let Some(desc) = lookup(&key) {
                        field.from_desc = Some(desc);
                        resolved += 1;
                    }
                }
                class.insert_field(field);
            }
        }

        resolved
    }

    pub(crate) fn class_entry(&mut self, from: &str) -> &mut ClassMapping {
        self.classes
            .entry(Name::new(from))
            .or_insert_with(|| ClassMapping::new(from))
    }
}

impl MappingTable for MappingModel {
    fn column_count(&self) -> usize {
        2
    }

    fn accept(&self, visitor: &mut dyn TableVisitor) -> Result<(), MappingError> {
        for class in self.classes() {
            visitor.visit_class(&[Some(class.from.as_str()), class.to()])?;

            for field in class.fields() {
                visitor.visit_field(
                    field.from_desc.as_deref(),
                    &[Some(field.from_name.as_str()), field.name()],
                )?;
            }

            for method in class.methods() {
                visitor.visit_method(
                    &method.from_desc,
                    &[Some(method.from_name.as_str()), method.name()],
                )?;
                for (index, arg) in method.args() {
                    visitor.visit_arg(index, &[None, Some(arg.as_str())])?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_class_is_first_wins() {
        let mut model = MappingModel::new();
        assert!(model.accept_class("a", Some("foo")));
        assert!(!model.accept_class("a", Some("bar")));
        assert_eq!(model.try_map_name("a"), Some("foo"));
    }

    #[test]
    fn test_unmapped_and_self_mapped_are_distinct() {
        let mut model = MappingModel::new();
        model.accept_class("a", None);
        model.accept_class("b", Some("b"));

        assert!(model.contains_class("a"));
        assert_eq!(model.try_map_name("a"), None);
        assert_eq!(model.try_map_name("b"), Some("b"));
        assert_eq!(model.try_map_name("missing"), None);
        assert_eq!(model.map_class_name("a"), "a");
        assert_eq!(model.map_class_name("missing"), "missing");
    }

    #[test]
    fn test_member_accept_synthesizes_class() {
        let mut model = MappingModel::new();
        assert!(model.accept_method("a", None, "b", "()V", Some("run")));

        let class = model.get("a").unwrap();
        assert_eq!(class.to(), None);
        assert_eq!(class.mapped_name(), "a");
        assert_eq!(class.method("b", "()V").unwrap().name(), Some("run"));
    }

    #[test]
    fn test_member_accept_sets_class_name_once() {
        let mut model = MappingModel::new();
        model.accept_field("a", Some("Foo"), "b", Some("I"), Some("count"));
        model.accept_method("a", Some("Bar"), "c", "()V", Some("tick"));
        assert_eq!(model.try_map_name("a"), Some("Foo"));
    }

    #[test]
    fn test_method_args_are_sparse_and_first_wins() {
        let mut model = MappingModel::new();
        assert!(model.accept_method_arg("a", "b", "(IIZ)V", 2, "flag"));
        assert!(!model.accept_method_arg("a", "b", "(IIZ)V", 2, "other"));

        let method = model.get("a").unwrap().method("b", "(IIZ)V").unwrap();
        assert!(method.has_args());
        assert_eq!(method.arg(0), None);
        assert_eq!(method.arg(2), Some("flag"));
        assert_eq!(method.args().map(|(i, _)| i).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_field_lookup_by_name_when_descriptor_unknown() {
        let mut model = MappingModel::new();
        model.accept_field("a", None, "b", None, Some("count"));

        let class = model.get("a").unwrap();
        assert_eq!(class.field("b", Some("I")).unwrap().name(), Some("count"));
        assert_eq!(class.field("b", None).unwrap().name(), Some("count"));
    }

    #[test]
    fn test_field_lookup_by_name_is_ambiguous_with_two_candidates() {
        let mut model = MappingModel::new();
        model.accept_field("a", None, "b", Some("I"), Some("count"));
        model.accept_field("a", None, "b", Some("J"), Some("total"));

        let class = model.get("a").unwrap();
        assert!(class.field("b", None).is_none());
        assert_eq!(class.field("b", Some("J")).unwrap().name(), Some("total"));
    }

    #[test]
    fn test_placeholder_field_is_reused_by_later_accept() {
        let mut model = MappingModel::new();
        model.accept_field("a", None, "b", None, None);
        model.accept_field("a", None, "b", Some("I"), Some("count"));

        let class = model.get("a").unwrap();
        assert_eq!(class.field_count(), 1);
        assert_eq!(class.field("b", Some("I")).unwrap().name(), Some("count"));
    }

    #[test]
    fn test_resolve_field_descriptors() {
        let mut model = MappingModel::new();
        model.accept_field("a", None, "b", None, Some("count"));
        model.accept_field("a", None, "c", Some("J"), Some("total"));

        let resolved = model.resolve_field_descriptors(|key| {
            (key == "a/b").then(|| Name::new("I"))
        });

        assert_eq!(resolved, 1);
        let field = model.get("a").unwrap().field("b", Some("I")).unwrap();
        assert_eq!(field.from_desc.as_deref(), Some("I"));
        assert_eq!(field.name(), Some("count"));
    }

    #[test]
    fn test_traversal_is_restartable() {
        let mut model = MappingModel::new();
        model.accept_method("a", None, "m", "()V", Some("run"));
        model.accept_field("b", None, "f", Some("I"), Some("x"));

        assert_eq!(model.classes().count(), 2);
        assert_eq!(model.classes().count(), 2);
        assert_eq!(model.methods().count(), 1);
        assert_eq!(model.fields().count(), 1);
        assert_eq!(model.member_count(), 2);
        assert_eq!(model.par_classes().count(), 2);
    }

    #[test]
    fn test_arg_slots_past_the_limit_are_refused() {
        let mut model = MappingModel::new();
        assert!(!model.accept_method_arg("a", "b", "()V", usize::MAX, "x"));
        assert!(!model.accept_method_arg("a", "b", "()V", MAX_PARAMETER_SLOT + 1, "x"));
        assert!(model.accept_method_arg("a", "b", "()V", MAX_PARAMETER_SLOT, "last"));

        let method = model.get("a").unwrap().method("b", "()V").unwrap();
        assert_eq!(method.args().count(), 1);
    }
}
