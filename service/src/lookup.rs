//! Name lookup over a schema
//!
//! A placeholder is matched by full name first. When nothing carries that
//! full name, its short name is tried and must match exactly one item.

use indexmap::IndexMap;

use edm_core::association::AssociationType;
use edm_core::container::EntityContainer;
use edm_core::enum_type::EnumType;
use edm_core::function::Function;
use edm_core::ids::{
    AssociationTypeId, ComplexTypeId, EntityContainerId, EntityTypeId, EnumTypeId, FunctionId,
    ItemId,
};
use edm_core::schema::{EntityModelSchema, ModelMember};
use edm_core::structural::{ComplexType, EntityType};
use edm_core::{EdmError, QualifiedName, Result};

/// Full-name and short-name index for one item kind
#[derive(Debug, Clone)]
pub struct KindIndex<I> {
    by_full_name: IndexMap<String, Vec<I>>,
    by_short_name: IndexMap<String, Vec<(I, String)>>,
}

impl<I> Default for KindIndex<I> {
    fn default() -> Self {
        Self {
            by_full_name: IndexMap::new(),
            by_short_name: IndexMap::new(),
        }
    }
}

impl<I: ItemId> KindIndex<I> {
    /// Index `(id, name)` pairs
    pub fn from_names(entries: impl IntoIterator<Item = (I, QualifiedName)>) -> Self {
        let mut index = Self::default();
        for (id, name) in entries {
            index.insert(id, &name);
        }
        index
    }

    pub fn insert(&mut self, id: I, name: &QualifiedName) {
        let full_name = name.full_name();
        self.by_full_name
            .entry(full_name.clone())
            .or_default()
            .push(id);
        self.by_short_name
            .entry(name.name().to_string())
            .or_default()
            .push((id, full_name));
    }

    /// Look up `name`.
    ///
    /// Returns `Ok(None)` when nothing matches.
    ///
    /// # Errors
    ///
    /// `AmbiguousName` when the full name is duplicated or, with
    /// `short_name_fallback`, the short name matches several items.
    pub fn find(&self, name: &QualifiedName, short_name_fallback: bool) -> Result<Option<I>> {
        let full_name = name.full_name();
        match self.by_full_name.get(&full_name).map(Vec::as_slice) {
            Some([id]) => return Ok(Some(*id)),
            Some(ids) if ids.len() > 1 => {
                return Err(EdmError::ambiguous(
                    I::KIND,
                    full_name.clone(),
                    vec![full_name; ids.len()],
                ));
            }
            _ => {}
        }

        if !short_name_fallback {
            return Ok(None);
        }

        match self.by_short_name.get(name.name()).map(Vec::as_slice) {
            None | Some([]) => Ok(None),
            Some([(id, _)]) => Ok(Some(*id)),
            Some(matches) => Err(EdmError::ambiguous(
                I::KIND,
                name.name(),
                matches.iter().map(|(_, full)| full.clone()).collect(),
            )),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_full_name.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_full_name.is_empty()
    }
}

fn index_members<T: ModelMember>(schema: &EntityModelSchema) -> KindIndex<T::Id> {
    KindIndex::from_names(
        schema
            .members::<T>()
            .map(|(id, item)| (id, item.qualified_name())),
    )
}

/// Index of every top-level item registered in a schema
#[derive(Debug, Clone)]
pub struct NameIndex {
    short_name_fallback: bool,
    entity_types: KindIndex<EntityTypeId>,
    complex_types: KindIndex<ComplexTypeId>,
    enum_types: KindIndex<EnumTypeId>,
    association_types: KindIndex<AssociationTypeId>,
    functions: KindIndex<FunctionId>,
    entity_containers: KindIndex<EntityContainerId>,
}

impl NameIndex {
    /// Snapshot the schema's registries
    #[must_use]
    pub fn build(schema: &EntityModelSchema, short_name_fallback: bool) -> Self {
        Self {
            short_name_fallback,
            entity_types: index_members::<EntityType>(schema),
            complex_types: index_members::<ComplexType>(schema),
            enum_types: index_members::<EnumType>(schema),
            association_types: index_members::<AssociationType>(schema),
            functions: index_members::<Function>(schema),
            entity_containers: index_members::<EntityContainer>(schema),
        }
    }

    #[must_use]
    pub const fn short_name_fallback(&self) -> bool {
        self.short_name_fallback
    }

    pub fn find_entity_type(&self, name: &QualifiedName) -> Result<Option<EntityTypeId>> {
        self.entity_types.find(name, self.short_name_fallback)
    }

    pub fn find_complex_type(&self, name: &QualifiedName) -> Result<Option<ComplexTypeId>> {
        self.complex_types.find(name, self.short_name_fallback)
    }

    pub fn find_enum_type(&self, name: &QualifiedName) -> Result<Option<EnumTypeId>> {
        self.enum_types.find(name, self.short_name_fallback)
    }

    pub fn find_association_type(
        &self,
        name: &QualifiedName,
    ) -> Result<Option<AssociationTypeId>> {
        self.association_types.find(name, self.short_name_fallback)
    }

    pub fn find_function(&self, name: &QualifiedName) -> Result<Option<FunctionId>> {
        self.functions.find(name, self.short_name_fallback)
    }

    pub fn find_entity_container(
        &self,
        name: &QualifiedName,
    ) -> Result<Option<EntityContainerId>> {
        self.entity_containers.find(name, self.short_name_fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn full_name_wins_over_short_name() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let a = schema.create(EntityType::new("Customer").with_namespace("Sales"))?;
        let b = schema.create(EntityType::new("Customer").with_namespace("Billing"))?;
        let index = NameIndex::build(&schema, true);

        assert_eq!(index.find_entity_type(&QualifiedName::parse("Sales.Customer"))?, Some(a));
        assert_eq!(
            index.find_entity_type(&QualifiedName::parse("Billing.Customer"))?,
            Some(b)
        );
        assert!(matches!(
            index.find_entity_type(&QualifiedName::new("Customer")),
            Err(EdmError::AmbiguousName { .. })
        ));
        Ok(())
    }

    #[test]
    fn unique_short_name_falls_back() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let order = schema.create(EntityType::new("Order").with_namespace("Sales"))?;

        let lenient = NameIndex::build(&schema, true);
        assert_eq!(lenient.find_entity_type(&QualifiedName::new("Order"))?, Some(order));
        assert_eq!(
            lenient.find_entity_type(&QualifiedName::parse("Other.Order"))?,
            Some(order)
        );

        let strict = NameIndex::build(&schema, false);
        assert_eq!(strict.find_entity_type(&QualifiedName::new("Order"))?, None);
        assert_eq!(strict.find_complex_type(&QualifiedName::parse("Sales.Order"))?, None);
        Ok(())
    }

    #[test]
    fn detached_items_are_not_indexed() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let t = schema.create(EntityType::new("Gone"))?;
        schema.remove_entity_type(t)?;
        let index = NameIndex::build(&schema, true);
        assert_eq!(index.find_entity_type(&QualifiedName::new("Gone"))?, None);
        Ok(())
    }

    proptest! {
        #[test]
        fn unique_short_names_resolve_like_full_names(
            names in prop::collection::hash_set("[A-Z][a-z]{1,8}", 1..8)
        ) {
            let mut schema = EntityModelSchema::new();
            let ids: Vec<_> = names
                .iter()
                .map(|name| schema.create(EntityType::new(name.as_str()).with_namespace("NS")).unwrap())
                .collect();
            let index = NameIndex::build(&schema, true);
            for (name, id) in names.iter().zip(ids) {
                let by_short = index.find_entity_type(&QualifiedName::new(name.as_str())).unwrap();
                let by_full = index
                    .find_entity_type(&QualifiedName::qualified("NS", name.as_str()))
                    .unwrap();
                prop_assert_eq!(by_short, Some(id));
                prop_assert_eq!(by_full, Some(id));
            }
        }
    }
}
