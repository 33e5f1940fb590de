//! Relationship view derivation
//!
//! Builds the two-sided [`RelationshipType`] of an association set from a
//! resolved schema and memoizes it on the set. Later calls for the same set
//! return the same `Arc` until the view is invalidated.

use std::sync::Arc;

use edm_core::config::RelationshipConfig;
use edm_core::container::AssociationSet;
use edm_core::ids::{
    AssociationEndId, AssociationSetId, AssociationTypeId, EntityContainerId, EntityTypeId,
    NavigationPropertyId,
};
use edm_core::relationship::{ConstraintSides, RelationshipSide, RelationshipType, SideIndex};
use edm_core::schema::EntityModelSchema;
use edm_core::{EdmError, ItemRef, NamedItem, Result};

/// Memoized relationship view of `set`.
///
/// # Errors
///
/// Fails when the set or its association is not resolved, when the set does
/// not bind exactly two ends of its association, or when navigation
/// properties are ambiguous and `config` rejects that.
pub fn relationship_type(
    schema: &EntityModelSchema,
    set: AssociationSetId,
    config: &RelationshipConfig,
) -> Result<Arc<RelationshipType>> {
    let item = schema.get(set)?;
    if let Some(cached) = item.cached_relationship() {
        tracing::trace!("Relationship cache hit for {}", set);
        return Ok(Arc::clone(cached));
    }

    tracing::trace!("Relationship cache miss for {}", set);
    let view = derive(schema, set, item, config)?;
    Ok(item.cache_relationship(view))
}

/// Relationship views of every association set in `container`
///
/// # Errors
///
/// See [`relationship_type`].
pub fn container_relationships(
    schema: &EntityModelSchema,
    container: EntityContainerId,
    config: &RelationshipConfig,
) -> Result<Vec<Arc<RelationshipType>>> {
    schema
        .get(container)?
        .association_sets()
        .iter()
        .map(|&set| relationship_type(schema, set, config))
        .collect()
}

fn derive(
    schema: &EntityModelSchema,
    id: AssociationSetId,
    set: &AssociationSet,
    config: &RelationshipConfig,
) -> Result<RelationshipType> {
    let (association, association_type) = schema.deref(&set.association_type)?;

    let [first, second] = set.ends.as_slice() else {
        return Err(EdmError::invariant(format!(
            "association set '{}' has {} ends, expected 2",
            set.name,
            set.ends.len()
        )));
    };

    let mut sides = Vec::with_capacity(2);
    for (position, set_end) in [first, second].into_iter().enumerate() {
        let (end_id, end) = schema.deref(&set_end.association_end)?;
        if end.association() != Some(association) {
            return Err(EdmError::invariant(format!(
                "association set '{}' binds end '{}' which is not an end of '{}'",
                set.name,
                end.role_name,
                association_type.full_name()
            )));
        }
        let entity_set = set_end.entity_set.require()?;
        let entity_type = end.entity_type.require()?;

        sides.push(RelationshipSide {
            association_end: end_id,
            association_set_end: position,
            delete_behavior: end.delete_behavior,
            entity_set,
            entity_type,
            multiplicity: end.multiplicity,
            navigation_property: navigation_from(schema, entity_type, association, end_id, config)?,
            role_name: end.role_name.clone(),
        });
    }

    let sides: [RelationshipSide; 2] = sides
        .try_into()
        .map_err(|_| EdmError::invariant("relationship needs exactly two sides"))?;
    if sides[0].association_end == sides[1].association_end {
        return Err(EdmError::invariant(format!(
            "association set '{}' binds the same end twice",
            set.name
        )));
    }

    let constraint = match association_type.referential_constraint() {
        Some(constraint) => {
            let side_of = |end: &Option<ItemRef<AssociationEndId>>, label: &str| -> Result<SideIndex> {
                let end = end
                    .as_ref()
                    .ok_or_else(|| {
                        EdmError::invalid_argument(format!("referential constraint has no {label} end"))
                    })?
                    .require()?;
                if sides[0].association_end == end {
                    Ok(SideIndex::First)
                } else if sides[1].association_end == end {
                    Ok(SideIndex::Second)
                } else {
                    Err(EdmError::invariant(format!(
                        "{label} end {end} is not bound by association set '{}'",
                        set.name
                    )))
                }
            };
            let principal = side_of(&constraint.principal_end, "principal")?;
            let dependent = side_of(&constraint.dependent_end, "dependent")?;

            let principal_properties = constraint
                .principal_properties
                .iter()
                .map(ItemRef::require)
                .collect::<Result<Vec<_>>>()?;
            let dependent_properties = constraint
                .dependent_properties
                .iter()
                .map(ItemRef::require)
                .collect::<Result<Vec<_>>>()?;

            let mut dependent_properties_are_keys = true;
            for &property in &dependent_properties {
                dependent_properties_are_keys &= schema.get(property)?.is_primary_key;
            }

            Some(ConstraintSides {
                principal,
                dependent,
                principal_properties,
                dependent_properties,
                dependent_properties_are_keys,
            })
        }
        None => None,
    };

    Ok(RelationshipType::new(id, association, sides, constraint))
}

/// Navigation property on `entity_type` (own or inherited) that traverses
/// `association` starting from `end`
fn navigation_from(
    schema: &EntityModelSchema,
    entity_type: EntityTypeId,
    association: AssociationTypeId,
    end: AssociationEndId,
    config: &RelationshipConfig,
) -> Result<Option<NavigationPropertyId>> {
    let mut found = None;
    for id in schema.all_navigation_properties(entity_type)? {
        let navigation = schema.get(id)?;
        if navigation.association.id() != Some(association) || navigation.from_end.id() != Some(end)
        {
            continue;
        }
        match found {
            None => found = Some(id),
            Some(first) if config.reject_ambiguous_navigation => {
                return Err(EdmError::invariant(format!(
                    "navigation properties '{}' and '{}' both start at end {end}",
                    schema.get(first)?.name,
                    navigation.name
                )));
            }
            Some(_) => {}
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use edm_core::association::{AssociationEnd, AssociationType, EndMultiplicity};
    use edm_core::container::{AssociationSetEnd, EntityContainer, EntitySet};
    use edm_core::structural::{EntityType, NavigationProperty};

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn set_without_two_ends_is_rejected() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let customer = schema.create(EntityType::new("Customer"))?;
        let assoc = schema.create(AssociationType::new("Self"))?;
        let end = schema.add_association_end(
            assoc,
            AssociationEnd::new("Only", customer, EndMultiplicity::One),
        )?;
        let container = schema.create(EntityContainer::new("Db"))?;
        let customers = schema.create_in(container, EntitySet::new("Customers", customer))?;
        let set = schema.create_in(
            container,
            AssociationSet::new("Lonely", assoc).with_end(AssociationSetEnd::new(end, customers)),
        )?;

        let err = relationship_type(&schema, set, &RelationshipConfig::default()).unwrap_err();
        assert!(err.is_invariant_violation());
        assert!(schema.get(set)?.cached_relationship().is_none());
        Ok(())
    }

    #[test]
    fn duplicate_navigation_depends_on_config() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let node = schema.create(EntityType::new("Node"))?;
        let assoc = schema.create(AssociationType::new("Edge"))?;
        let parent = schema.add_association_end(
            assoc,
            AssociationEnd::new("Parent", node, EndMultiplicity::ZeroOne),
        )?;
        let child = schema.add_association_end(
            assoc,
            AssociationEnd::new("Child", node, EndMultiplicity::Many),
        )?;
        let first = schema.add_navigation_property(
            node,
            NavigationProperty::new("Children", assoc, parent, child),
        )?;
        schema.add_navigation_property(
            node,
            NavigationProperty::new("Kids", assoc, parent, child),
        )?;

        let strict = RelationshipConfig::default();
        assert!(navigation_from(&schema, node, assoc, parent, &strict).is_err());

        let lenient = RelationshipConfig {
            reject_ambiguous_navigation: false,
        };
        assert_eq!(
            navigation_from(&schema, node, assoc, parent, &lenient)?,
            Some(first)
        );
        assert_eq!(navigation_from(&schema, node, assoc, child, &lenient)?, None);
        Ok(())
    }
}
