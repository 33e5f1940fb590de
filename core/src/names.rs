//! Names, name-based identity and name-only placeholders
//!
//! Named items compare by `(namespace, name)` alone. The same pair also
//! drives [`ItemRef::Unresolved`], the placeholder that stands in for an
//! item until a resolution fixup rewires it to a real arena id.

use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{EdmError, Result};
use crate::ids::ItemId;

/// Seed mixed into every named-item hash
pub const NAMED_ITEM_HASH_SEED: u64 = 0x2B99_2DDF_A232_49D6;

/// Build `namespace.name`, or just `name` when the namespace is empty
#[must_use]
pub fn full_name(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{ns}.{name}"),
        _ => name.to_string(),
    }
}

/// Seeded XOR of the name and namespace hashes; a missing part contributes nothing
#[must_use]
pub fn name_hash(namespace: Option<&str>, name: &str) -> u64 {
    let mut hash = NAMED_ITEM_HASH_SEED;
    if !name.is_empty() {
        hash ^= xxh3_64(name.as_bytes());
    }
    if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
        hash ^= xxh3_64(ns.as_bytes());
    }
    hash
}

/// Namespace-qualified name
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    name: String,
}

impl QualifiedName {
    /// A name without namespace
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    /// A name inside `namespace`; an empty namespace is treated as none
    pub fn qualified(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(name).in_namespace(namespace)
    }

    /// Replace the namespace
    #[must_use]
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = (!namespace.is_empty()).then_some(namespace);
        self
    }

    /// Split a full name at its last dot
    #[must_use]
    pub fn parse(full_name: &str) -> Self {
        match full_name.rsplit_once('.') {
            Some((ns, name)) => Self::qualified(ns, name),
            None => Self::new(full_name),
        }
    }

    /// Short name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace, if any
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// `namespace.name` or `name`
    #[must_use]
    pub fn full_name(&self) -> String {
        full_name(self.namespace(), &self.name)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// Anything with a name and an optional namespace
pub trait NamedItem {
    /// Short name
    fn name(&self) -> &str;

    /// Namespace; only top-level schema items carry one
    fn namespace(&self) -> Option<&str> {
        None
    }

    /// `namespace.name` or `name`
    fn full_name(&self) -> String {
        full_name(self.namespace(), self.name())
    }

    /// Owned copy of the name pair
    fn qualified_name(&self) -> QualifiedName {
        let qn = QualifiedName::new(self.name());
        match self.namespace() {
            Some(ns) => qn.in_namespace(ns),
            None => qn,
        }
    }

    /// Name-derived hash shared by every named kind
    fn name_hash(&self) -> u64 {
        name_hash(self.namespace(), self.name())
    }

    /// Same `(namespace, name)` pair, ignoring kind
    fn has_same_name(&self, other: &dyn NamedItem) -> bool {
        self.name() == other.name()
            && self.namespace().unwrap_or_default() == other.namespace().unwrap_or_default()
    }
}

impl NamedItem for QualifiedName {
    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

/// Reject empty names before they reach the arena
///
/// # Errors
///
/// Returns an invalid argument error when `name` is empty.
pub fn require_name(name: &str, what: &str) -> Result<()> {
    if name.is_empty() {
        return Err(EdmError::invalid_argument(format!("{what} name must not be empty")));
    }
    Ok(())
}

/// Implement name-based `PartialEq`, `Eq` and `Hash` for a named item kind
macro_rules! impl_name_identity {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl PartialEq for $ty {
                fn eq(&self, other: &Self) -> bool {
                    $crate::names::NamedItem::has_same_name(self, other)
                }
            }

            impl Eq for $ty {}

            impl std::hash::Hash for $ty {
                fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                    state.write_u64($crate::names::NamedItem::name_hash(self));
                }
            }
        )+
    };
}
pub(crate) use impl_name_identity;

/// A link to another item: either a resolved arena id or a name-only placeholder
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ItemRef<I> {
    /// Points at a live arena item
    Resolved(I),
    /// Carries only the name supplied at authoring time
    Unresolved(QualifiedName),
}

impl<I: ItemId> ItemRef<I> {
    /// Placeholder from a full name such as `"NS.Customer"`
    #[must_use]
    pub fn named(full_name: &str) -> Self {
        Self::Unresolved(QualifiedName::parse(full_name))
    }

    /// Placeholder from an explicit name pair
    #[must_use]
    pub const fn placeholder(name: QualifiedName) -> Self {
        Self::Unresolved(name)
    }

    /// The id, if resolved
    #[must_use]
    pub const fn id(&self) -> Option<I> {
        match self {
            Self::Resolved(id) => Some(*id),
            Self::Unresolved(_) => None,
        }
    }

    /// True once a fixup has replaced the placeholder
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// The placeholder name, if still unresolved
    #[must_use]
    pub const fn placeholder_name(&self) -> Option<&QualifiedName> {
        match self {
            Self::Resolved(_) => None,
            Self::Unresolved(name) => Some(name),
        }
    }

    /// The id, or an unresolved-reference error
    ///
    /// # Errors
    ///
    /// Returns [`EdmError::UnresolvedReference`] for a placeholder.
    pub fn require(&self) -> Result<I> {
        match self {
            Self::Resolved(id) => Ok(*id),
            Self::Unresolved(name) => Err(EdmError::unresolved(I::KIND, name.full_name())),
        }
    }
}

impl<I: ItemId> From<I> for ItemRef<I> {
    fn from(id: I) -> Self {
        Self::Resolved(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{EntityTypeId, ItemKind, SchemaId};
    use proptest::prelude::*;

    #[test]
    fn full_name_rules() {
        assert_eq!(QualifiedName::qualified("N", "T").full_name(), "N.T");
        assert_eq!(QualifiedName::new("T").full_name(), "T");
        assert_eq!(QualifiedName::qualified("", "T").full_name(), "T");
        assert_eq!(QualifiedName::qualified("", "T"), QualifiedName::new("T"));
    }

    #[test]
    fn hash_is_seeded_xor_of_present_parts() {
        let name = xxh3_64(b"T");
        let ns = xxh3_64(b"N");
        assert_eq!(name_hash(Some("N"), "T"), NAMED_ITEM_HASH_SEED ^ name ^ ns);
        assert_eq!(name_hash(None, "T"), NAMED_ITEM_HASH_SEED ^ name);
        assert_eq!(name_hash(Some(""), "T"), name_hash(None, "T"));
        assert_eq!(name_hash(None, ""), NAMED_ITEM_HASH_SEED);
    }

    #[test]
    fn parse_splits_at_last_dot() {
        let qn = QualifiedName::parse("Company.Sales.Order");
        assert_eq!(qn.namespace(), Some("Company.Sales"));
        assert_eq!(qn.name(), "Order");
        assert_eq!(QualifiedName::parse("Order").namespace(), None);
    }

    #[test]
    fn unresolved_ref_reports_its_name() {
        let r: ItemRef<EntityTypeId> = ItemRef::named("NS.Customer");
        assert!(!r.is_resolved());
        match r.require() {
            Err(EdmError::UnresolvedReference { kind, name }) => {
                assert_eq!(kind, ItemKind::EntityType);
                assert_eq!(name, "NS.Customer");
            }
            other => panic!("expected unresolved reference, got {other:?}"),
        }

        let id = EntityTypeId::new(SchemaId::next(), 3);
        assert_eq!(ItemRef::from(id).require().ok(), Some(id));
    }

    proptest! {
        #[test]
        fn equal_names_hash_equal(ns in "[A-Za-z]{0,8}", name in "[A-Za-z_][A-Za-z0-9_]{0,12}") {
            let a = QualifiedName::qualified(ns.clone(), name.clone());
            let b = QualifiedName::qualified(ns, name);
            prop_assert!(a.has_same_name(&b));
            prop_assert_eq!(a.name_hash(), b.name_hash());
        }

        #[test]
        fn parse_round_trips_full_name(ns in "[A-Za-z]{1,6}(\\.[A-Za-z]{1,6})?", name in "[A-Za-z]{1,10}") {
            let qn = QualifiedName::qualified(ns, name);
            prop_assert_eq!(QualifiedName::parse(&qn.full_name()), qn);
        }
    }
}
