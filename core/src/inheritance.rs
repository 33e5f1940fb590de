//! Derived views over single inheritance
//!
//! Base types are followed through `base_type` links until a type without
//! one is reached. Every walk keeps the set of visited ids, so a cyclic
//! chain ends in an error rather than looping.

use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;

use crate::error::{EdmError, Result};
use crate::ids::{ComplexTypeId, EntityTypeId, MemberPropertyId, NavigationPropertyId, StructuralTypeId};
use crate::names::NamedItem;
use crate::schema::EntityModelSchema;
use crate::structural::EdmUniqueConstraint;

/// Follow `base_of` from `start`; the result starts with `start` and ends
/// with the root
///
/// # Errors
///
/// Propagates errors from `base_of` and returns `InvariantViolation` when a
/// base is reached twice.
pub fn walk_bases<I>(start: I, mut base_of: impl FnMut(I) -> Result<Option<I>>) -> Result<Vec<I>>
where
    I: Copy + Eq + Hash + Display,
{
    let mut chain = vec![start];
    let mut visited = HashSet::from([start]);
    let mut current = start;

    while let Some(base) = base_of(current)? {
        if !visited.insert(base) {
            return Err(EdmError::invariant(format!(
                "Circular base type chain detected at {base} (reached from {start})"
            )));
        }
        chain.push(base);
        current = base;
    }

    Ok(chain)
}

impl EntityModelSchema {
    /// `id` followed by its ancestors, root last.
    ///
    /// # Errors
    ///
    /// `UnresolvedReference` when a base type is still a placeholder and
    /// `InvariantViolation` when the chain loops.
    pub fn entity_base_chain(&self, id: EntityTypeId) -> Result<Vec<EntityTypeId>> {
        walk_bases(id, |current| {
            self.get(current)?
                .base_type
                .as_ref()
                .map(crate::names::ItemRef::require)
                .transpose()
        })
    }

    /// `id` followed by its ancestors, root last.
    ///
    /// # Errors
    ///
    /// See [`EntityModelSchema::entity_base_chain`].
    pub fn complex_base_chain(&self, id: ComplexTypeId) -> Result<Vec<ComplexTypeId>> {
        walk_bases(id, |current| {
            self.get(current)?
                .base_type
                .as_ref()
                .map(crate::names::ItemRef::require)
                .transpose()
        })
    }

    /// The type at the top of the inheritance chain
    ///
    /// # Errors
    ///
    /// See [`EntityModelSchema::entity_base_chain`].
    pub fn root_entity_type(&self, id: EntityTypeId) -> Result<EntityTypeId> {
        let chain = self.entity_base_chain(id)?;
        Ok(chain.last().copied().unwrap_or(id))
    }

    /// Whether `id` is `base` or inherits from it
    ///
    /// # Errors
    ///
    /// See [`EntityModelSchema::entity_base_chain`].
    pub fn is_derived_from(&self, id: EntityTypeId, base: EntityTypeId) -> Result<bool> {
        Ok(self.entity_base_chain(id)?.contains(&base))
    }

    /// Inherited and own properties, base-first
    ///
    /// # Errors
    ///
    /// See [`EntityModelSchema::entity_base_chain`].
    pub fn all_properties(&self, owner: impl Into<StructuralTypeId>) -> Result<Vec<MemberPropertyId>> {
        let owners: Vec<StructuralTypeId> = match owner.into() {
            StructuralTypeId::Entity(id) => self
                .entity_base_chain(id)?
                .into_iter()
                .map(StructuralTypeId::from)
                .collect(),
            StructuralTypeId::Complex(id) => self
                .complex_base_chain(id)?
                .into_iter()
                .map(StructuralTypeId::from)
                .collect(),
        };

        let mut properties = Vec::new();
        for owner in owners.into_iter().rev() {
            properties.extend_from_slice(self.own_properties(owner)?);
        }
        Ok(properties)
    }

    /// Inherited and own navigation properties, base-first
    ///
    /// # Errors
    ///
    /// See [`EntityModelSchema::entity_base_chain`].
    pub fn all_navigation_properties(&self, id: EntityTypeId) -> Result<Vec<NavigationPropertyId>> {
        let mut navigation = Vec::new();
        for owner in self.entity_base_chain(id)?.into_iter().rev() {
            navigation.extend_from_slice(self.get(owner)?.navigation_properties());
        }
        Ok(navigation)
    }

    /// Inherited and own unique constraints, base-first
    ///
    /// # Errors
    ///
    /// See [`EntityModelSchema::entity_base_chain`].
    pub fn all_edm_unique_constraints(&self, id: EntityTypeId) -> Result<Vec<&EdmUniqueConstraint>> {
        let mut constraints = Vec::new();
        for owner in self.entity_base_chain(id)?.into_iter().rev() {
            constraints.extend(self.get(owner)?.edm_unique_constraints());
        }
        Ok(constraints)
    }

    /// Key properties, which live on the root type only.
    ///
    /// A root type reports its own key-marked properties. A derived type
    /// reports its root's, whatever keys it marks itself.
    ///
    /// # Errors
    ///
    /// See [`EntityModelSchema::entity_base_chain`].
    pub fn all_key_properties(&self, id: EntityTypeId) -> Result<Vec<MemberPropertyId>> {
        let root = self.root_entity_type(id)?;
        let mut keys = Vec::new();
        for property in self.get(root)?.properties() {
            if self.get(*property)?.is_primary_key {
                keys.push(*property);
            }
        }
        tracing::trace!(
            "{} keys of '{}' come from root '{}'",
            keys.len(),
            self.get(id)?.full_name(),
            self.get(root)?.full_name()
        );
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::{DataType, PrimitiveKind};
    use crate::names::ItemRef;
    use crate::structural::{ComplexType, EntityType, MemberProperty};
    use pretty_assertions::assert_eq;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    fn int(name: &str) -> MemberProperty {
        MemberProperty::new(name, DataType::primitive(PrimitiveKind::Int32))
    }

    #[test]
    fn all_properties_are_base_first() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let grandparent = schema.create(EntityType::new("Grandparent"))?;
        let parent = schema.create(EntityType::new("Parent").with_base_type(grandparent))?;
        let child = schema.create(EntityType::new("Child").with_base_type(parent))?;

        let p_g = schema.add_property(grandparent, int("P_g"))?;
        let p_p = schema.add_property(parent, int("P_p"))?;
        let p_c = schema.add_property(child, int("P_c"))?;

        assert_eq!(schema.all_properties(child)?, vec![p_g, p_p, p_c]);
        assert_eq!(schema.all_properties(parent)?, vec![p_g, p_p]);
        assert_eq!(schema.root_entity_type(child)?, grandparent);
        assert!(schema.is_derived_from(child, grandparent)?);
        assert!(!schema.is_derived_from(grandparent, child)?);
        Ok(())
    }

    #[test]
    fn derived_types_report_root_keys() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let root = schema.create(EntityType::new("Person"))?;
        let derived = schema.create(EntityType::new("Employee").with_base_type(root))?;

        let id = schema.add_property(root, int("Id").primary_key())?;
        schema.add_property(root, int("Age"))?;
        schema.add_property(derived, int("BadgeNo").primary_key())?;

        assert_eq!(schema.all_key_properties(derived)?, vec![id]);
        assert_eq!(schema.all_key_properties(root)?, vec![id]);
        Ok(())
    }

    #[test]
    fn cyclic_chains_are_reported() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let a = schema.create(EntityType::new("A"))?;
        let b = schema.create(EntityType::new("B").with_base_type(a))?;
        schema.get_mut(a)?.base_type = Some(ItemRef::Resolved(b));

        let err = schema.all_properties(b).unwrap_err();
        assert!(err.is_invariant_violation());

        let selfish = schema.create(EntityType::new("Selfish"))?;
        schema.get_mut(selfish)?.base_type = Some(ItemRef::Resolved(selfish));
        assert!(schema.root_entity_type(selfish).is_err());
        Ok(())
    }

    #[test]
    fn placeholder_base_blocks_the_walk() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let t = schema.create(EntityType::new("T").with_base_type(ItemRef::named("NS.Missing")))?;
        assert!(matches!(
            schema.all_properties(t),
            Err(EdmError::UnresolvedReference { .. })
        ));
        Ok(())
    }

    #[test]
    fn complex_types_inherit_the_same_way() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let base = schema.create(ComplexType::new("Address"))?;
        let derived = schema.create(ComplexType::new("UsAddress").with_base_type(base))?;
        let street = schema.add_property(base, int("Street"))?;
        let zip = schema.add_property(derived, int("Zip"))?;
        assert_eq!(schema.all_properties(derived)?, vec![street, zip]);
        Ok(())
    }
}
