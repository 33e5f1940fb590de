//! Deep clone of a schema graph
//!
//! The copy lives in a fresh arena with a new [`SchemaId`]. Every link that
//! pointed at an item of the source is re-expressed as a name-only
//! placeholder, so the copy has to go through the same resolution step as a
//! freshly authored schema before relationship views can be derived.
//!
//! [`SchemaId`]: edm_core::ids::SchemaId

use edm_core::annotations::Annotations;
use edm_core::association::{AssociationEnd, AssociationType, ReferentialConstraint};
use edm_core::config::CloneConfig;
use edm_core::container::{
    AssociationSet, AssociationSetEnd, EntityContainer, EntitySet, FunctionImport,
    FunctionImportReturnType,
};
use edm_core::data_type::DataType;
use edm_core::enum_type::EnumType;
use edm_core::function::{Function, FunctionParameter};
use edm_core::ids::{ComplexTypeId, EntityTypeId};
use edm_core::schema::{ArenaId, EntityModelSchema};
use edm_core::structural::{
    ComplexType, EdmUniqueConstraint, EntityType, MemberProperty, NavigationProperty, RowType,
};
use edm_core::{ItemRef, Result};

/// Copy `source` into a new, independent schema.
///
/// # Errors
///
/// Fails when the source holds an id issued by another schema, or when an
/// association type carries a referential constraint without both ends.
pub fn deep_clone(source: &EntityModelSchema, config: &CloneConfig) -> Result<EntityModelSchema> {
    let cloner = Cloner {
        source,
        deep_annotations: config.deep_clone_annotations,
    };
    let mut target = EntityModelSchema::new();

    for (id, entity_type) in source.entity_types() {
        cloner.entity_type(&mut target, id, entity_type)?;
    }
    for (id, complex_type) in source.complex_types() {
        cloner.complex_type(&mut target, id, complex_type)?;
    }
    for (_, enum_type) in source.enum_types() {
        target.create(cloner.enum_type(enum_type))?;
    }
    for (_, association) in source.association_types() {
        cloner.association_type(&mut target, association)?;
    }
    for (_, function) in source.functions() {
        target.create(cloner.function(function)?)?;
    }
    for (_, container) in source.entity_containers() {
        cloner.entity_container(&mut target, container)?;
    }

    tracing::debug!("Cloned {} into {}", source.id(), target.id());
    Ok(target)
}

struct Cloner<'a> {
    source: &'a EntityModelSchema,
    deep_annotations: bool,
}

impl Cloner<'_> {
    fn annotations(&self, annotations: &Annotations) -> Annotations {
        if self.deep_annotations {
            annotations.deep_cloned()
        } else {
            annotations.clone()
        }
    }

    fn placeholder<I: ArenaId>(&self, reference: &ItemRef<I>) -> Result<ItemRef<I>> {
        Ok(ItemRef::placeholder(self.source.ref_name(reference)?))
    }

    fn placeholders<I: ArenaId>(&self, references: &[ItemRef<I>]) -> Result<Vec<ItemRef<I>>> {
        references.iter().map(|r| self.placeholder(r)).collect()
    }

    fn optional<I: ArenaId>(&self, reference: Option<&ItemRef<I>>) -> Result<Option<ItemRef<I>>> {
        reference.map(|r| self.placeholder(r)).transpose()
    }

    fn data_type(&self, data_type: &DataType) -> Result<DataType> {
        Ok(match data_type {
            DataType::Primitive(p) => DataType::Primitive(p.clone()),
            DataType::Complex {
                complex_type,
                nullable,
            } => DataType::Complex {
                complex_type: self.placeholder(complex_type)?,
                nullable: *nullable,
            },
            DataType::Enum {
                enum_type,
                nullable,
            } => DataType::Enum {
                enum_type: self.placeholder(enum_type)?,
                nullable: *nullable,
            },
            DataType::Entity(r) => DataType::Entity(self.placeholder(r)?),
            DataType::Reference(r) => DataType::Reference(self.placeholder(r)?),
            DataType::Collection(element) => DataType::collection(self.data_type(element)?),
            DataType::Row(row) => {
                let mut copy = RowType::new();
                for property in row.properties() {
                    copy.add(self.property(property)?);
                }
                DataType::Row(copy)
            }
        })
    }

    fn property(&self, property: &MemberProperty) -> Result<MemberProperty> {
        Ok(MemberProperty {
            data_type: self.data_type(&property.data_type)?,
            annotations: self.annotations(&property.annotations),
            ..property.clone()
        })
    }

    fn parameter(&self, parameter: &FunctionParameter) -> Result<FunctionParameter> {
        Ok(FunctionParameter {
            data_type: self.data_type(&parameter.data_type)?,
            annotations: self.annotations(&parameter.annotations),
            ..parameter.clone()
        })
    }

    fn parameters(&self, parameters: &[FunctionParameter]) -> Result<Vec<FunctionParameter>> {
        parameters.iter().map(|p| self.parameter(p)).collect()
    }

    fn unique_constraint(&self, constraint: &EdmUniqueConstraint) -> Result<EdmUniqueConstraint> {
        Ok(EdmUniqueConstraint {
            name: constraint.name.clone(),
            properties: self.placeholders(&constraint.properties)?,
            annotations: self.annotations(&constraint.annotations),
        })
    }

    fn entity_type(
        &self,
        target: &mut EntityModelSchema,
        id: EntityTypeId,
        entity_type: &EntityType,
    ) -> Result<()> {
        let mut copy = entity_type.clone();
        copy.base_type = self.optional(entity_type.base_type.as_ref())?;
        copy.annotations = self.annotations(&entity_type.annotations);
        for constraint in copy.edm_unique_constraints_mut() {
            *constraint = self.unique_constraint(constraint)?;
        }
        let new_id = target.create(copy)?;

        for &property in self.source.own_properties(id)? {
            target.add_property(new_id, self.property(self.source.get(property)?)?)?;
        }
        for &navigation in entity_type.navigation_properties() {
            let navigation = self.source.get(navigation)?;
            let copy = NavigationProperty {
                name: navigation.name.clone(),
                association: self.placeholder(&navigation.association)?,
                from_end: self.placeholder(&navigation.from_end)?,
                to_end: self.placeholder(&navigation.to_end)?,
                annotations: self.annotations(&navigation.annotations),
            };
            target.add_navigation_property(new_id, copy)?;
        }
        Ok(())
    }

    fn complex_type(
        &self,
        target: &mut EntityModelSchema,
        id: ComplexTypeId,
        complex_type: &ComplexType,
    ) -> Result<()> {
        let mut copy = complex_type.clone();
        copy.base_type = self.optional(complex_type.base_type.as_ref())?;
        copy.annotations = self.annotations(&complex_type.annotations);
        let new_id = target.create(copy)?;

        for &property in self.source.own_properties(id)? {
            target.add_property(new_id, self.property(self.source.get(property)?)?)?;
        }
        Ok(())
    }

    fn enum_type(&self, enum_type: &EnumType) -> EnumType {
        let mut copy = enum_type.clone();
        copy.annotations = self.annotations(&enum_type.annotations);
        for member in &mut copy.members {
            member.annotations = self.annotations(&member.annotations);
        }
        copy
    }

    fn association_type(
        &self,
        target: &mut EntityModelSchema,
        association: &AssociationType,
    ) -> Result<()> {
        let mut copy = association.clone();
        copy.annotations = self.annotations(&association.annotations);
        let new_id = target.create(copy)?;

        for &end in association.ends() {
            let end = self.source.get(end)?;
            let mut copy: AssociationEnd = end.clone();
            copy.entity_type = self.placeholder(&end.entity_type)?;
            copy.annotations = self.annotations(&end.annotations);
            target.add_association_end(new_id, copy)?;
        }

        if let Some(constraint) = association.referential_constraint() {
            let copy = ReferentialConstraint {
                principal_end: self.optional(constraint.principal_end.as_ref())?,
                principal_properties: self.placeholders(&constraint.principal_properties)?,
                dependent_end: self.optional(constraint.dependent_end.as_ref())?,
                dependent_properties: self.placeholders(&constraint.dependent_properties)?,
                annotations: self.annotations(&constraint.annotations),
            };
            target.set_referential_constraint(new_id, copy)?;
        }
        Ok(())
    }

    fn function(&self, function: &Function) -> Result<Function> {
        let mut copy = function.clone();
        copy.return_type = function
            .return_type
            .as_ref()
            .map(|t| self.data_type(t))
            .transpose()?;
        copy.parameters = self.parameters(&function.parameters)?;
        copy.annotations = self.annotations(&function.annotations);
        Ok(copy)
    }

    fn entity_container(
        &self,
        target: &mut EntityModelSchema,
        container: &EntityContainer,
    ) -> Result<()> {
        let mut copy = container.clone();
        copy.annotations = self.annotations(&container.annotations);
        let new_id = target.create(copy)?;

        for &set in container.entity_sets() {
            let set = self.source.get(set)?;
            let mut copy: EntitySet = set.clone();
            copy.entity_type = self.placeholder(&set.entity_type)?;
            copy.annotations = self.annotations(&set.annotations);
            target.create_in(new_id, copy)?;
        }

        for &set in container.association_sets() {
            let set = self.source.get(set)?;
            let mut copy =
                AssociationSet::new(set.name.clone(), self.placeholder(&set.association_type)?);
            copy.annotations = self.annotations(&set.annotations);
            for end in &set.ends {
                let mut end_copy = AssociationSetEnd::new(
                    self.placeholder(&end.association_end)?,
                    self.placeholder(&end.entity_set)?,
                );
                end_copy.annotations = self.annotations(&end.annotations);
                copy.ends.push(end_copy);
            }
            target.create_in(new_id, copy)?;
        }

        for &import in container.function_imports() {
            let import = self.source.get(import)?;
            target.create_in(new_id, self.function_import(import)?)?;
        }
        Ok(())
    }

    fn function_import(&self, import: &FunctionImport) -> Result<FunctionImport> {
        let mut copy = import.clone();
        for (slot, original) in copy.return_types_mut().iter_mut().zip(import.return_types()) {
            *slot = FunctionImportReturnType {
                data_type: self.data_type(&original.data_type)?,
                entity_set: self.optional(original.entity_set.as_ref())?,
            };
        }
        copy.parameters = self.parameters(&import.parameters)?;
        copy.annotations = self.annotations(&import.annotations);
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edm_core::annotations::KeyValueAnnotation;
    use edm_core::data_type::PrimitiveKind;
    use edm_core::NamedItem;
    use pretty_assertions::assert_eq;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn links_become_placeholders_in_a_new_arena() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let base = schema.create(EntityType::new("Base").with_namespace("M"))?;
        let derived = schema.create(
            EntityType::new("Derived")
                .with_namespace("M")
                .with_base_type(base),
        )?;
        schema.add_property(
            base,
            MemberProperty::new("Id", DataType::primitive(PrimitiveKind::Int32)).primary_key(),
        )?;
        schema
            .get_mut(derived)?
            .annotations
            .add(KeyValueAnnotation::new("label", "derived"));

        let copy = deep_clone(&schema, &CloneConfig::default())?;
        assert!(copy.id() != schema.id());

        let types: Vec<_> = copy.entity_types().collect();
        assert_eq!(types.len(), 2);
        let (copy_derived, derived_copy) = types[1];
        assert_eq!(derived_copy.full_name(), "M.Derived");
        assert_eq!(
            derived_copy.base_type.as_ref().and_then(ItemRef::placeholder_name),
            Some(&edm_core::QualifiedName::qualified("M", "Base"))
        );
        assert_eq!(derived_copy.annotations.len(), 1);
        assert!(schema.get(copy_derived).is_err());

        let (copy_base, _) = types[0];
        let key = copy.own_properties(copy_base)?;
        assert_eq!(key.len(), 1);
        assert!(copy.get(key[0])?.is_primary_key);
        Ok(())
    }

    #[test]
    fn function_imports_keep_return_types_and_composability() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let person = schema.create(EntityType::new("Person"))?;
        let container = schema.create(EntityContainer::new("Db"))?;
        let people = schema.create_in(container, EntitySet::new("People", person))?;
        let mut import = FunctionImport::new("Everyone").returning(
            FunctionImportReturnType::new(DataType::collection(DataType::entity(person)))
                .from_entity_set(people),
        )?;
        import.set_composable(true)?;
        schema.create_in(container, import)?;

        let copy = deep_clone(&schema, &CloneConfig::default())?;
        let (_, container_copy) = copy.entity_containers().next().ok_or("no container")?;
        let import_copy = copy.get(container_copy.function_imports()[0])?;
        assert!(import_copy.is_composable());
        let returned = &import_copy.return_types()[0];
        assert!(returned.data_type.has_placeholders());
        assert_eq!(
            returned.entity_set.as_ref().and_then(ItemRef::placeholder_name),
            Some(&edm_core::QualifiedName::new("People"))
        );
        Ok(())
    }
}
