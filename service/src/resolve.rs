//! Reference resolution
//!
//! Rewrites every name-only placeholder reachable from the registered items
//! into the id of the item it names. Top-level kinds are looked up through a
//! [`NameIndex`]; association ends, properties and entity sets are looked up
//! inside the scope that owns them.
//!
//! Every lookup runs against the unchanged schema and records its result in a
//! [`ResolutionPlan`]. The plan is written back only after the last lookup
//! succeeded, so a failed resolution leaves the schema untouched.

use std::cell::Cell;
use std::collections::HashMap;

use edm_core::association::ReferentialConstraint;
use edm_core::config::ResolutionConfig;
use edm_core::container::{AssociationSetEnd, FunctionImportReturnType};
use edm_core::data_type::DataType;
use edm_core::function::FunctionParameter;
use edm_core::ids::{
    AssociationEndId, AssociationSetId, AssociationTypeId, ComplexTypeId, EntityContainerId,
    EntitySetId, EntityTypeId, FunctionId, FunctionImportId, ItemId, MemberPropertyId,
    NavigationPropertyId, StructuralTypeId,
};
use edm_core::inheritance::walk_bases;
use edm_core::schema::EntityModelSchema;
use edm_core::{EdmError, ItemRef, NamedItem, QualifiedName, Result};

use crate::fixup::SchemaFixup;
use crate::lookup::{KindIndex, NameIndex};

/// Fixup that resolves placeholders against the schema's own items
#[derive(Debug, Clone, Default)]
pub struct ResolveReferencesFixup {
    config: ResolutionConfig,
}

impl ResolveReferencesFixup {
    pub const NAME: &'static str = "resolve-references";

    #[must_use]
    pub const fn new(config: ResolutionConfig) -> Self {
        Self { config }
    }
}

impl SchemaFixup for ResolveReferencesFixup {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn fixup(&self, schema: &mut EntityModelSchema) -> Result<()> {
        let resolver = Resolver {
            index: NameIndex::build(schema, self.config.short_name_fallback),
            config: &self.config,
            tolerated: Cell::new(0),
        };
        let plan = resolver.plan(schema)?;
        tracing::debug!("Applying {} resolved link(s) to {}", plan.len(), schema.id());
        plan.apply(schema)?;

        if resolver.tolerated.get() > 0 {
            tracing::warn!(
                "{} placeholder(s) in {} were left unresolved",
                resolver.tolerated.get(),
                schema.id()
            );
        }
        Ok(())
    }
}

#[derive(Debug)]
struct NavigationLinks {
    association: ItemRef<AssociationTypeId>,
    from_end: ItemRef<AssociationEndId>,
    to_end: ItemRef<AssociationEndId>,
}

#[derive(Debug)]
struct FunctionSignature {
    return_type: Option<DataType>,
    parameters: Vec<FunctionParameter>,
}

#[derive(Debug)]
struct ImportSignature {
    return_types: Vec<FunctionImportReturnType>,
    parameters: Vec<FunctionParameter>,
}

/// Rewrites computed from an unchanged schema.
///
/// Every id in a plan was read from the schema it is applied to.
#[derive(Debug, Default)]
struct ResolutionPlan {
    entity_bases: HashMap<EntityTypeId, ItemRef<EntityTypeId>>,
    complex_bases: Vec<(ComplexTypeId, ItemRef<ComplexTypeId>)>,
    end_types: HashMap<AssociationEndId, ItemRef<EntityTypeId>>,
    property_types: Vec<(MemberPropertyId, DataType)>,
    navigations: Vec<(NavigationPropertyId, NavigationLinks)>,
    unique_constraints: Vec<(EntityTypeId, Vec<Vec<ItemRef<MemberPropertyId>>>)>,
    constraints: Vec<(AssociationTypeId, ReferentialConstraint)>,
    functions: Vec<(FunctionId, FunctionSignature)>,
    entity_sets: Vec<(EntitySetId, ItemRef<EntityTypeId>)>,
    association_sets: Vec<(AssociationSetId, ItemRef<AssociationTypeId>, Vec<AssociationSetEnd>)>,
    function_imports: Vec<(FunctionImportId, ImportSignature)>,
}

impl ResolutionPlan {
    fn len(&self) -> usize {
        self.entity_bases.len()
            + self.complex_bases.len()
            + self.end_types.len()
            + self.property_types.len()
            + self.navigations.len()
            + self.unique_constraints.len()
            + self.constraints.len()
            + self.functions.len()
            + self.entity_sets.len()
            + self.association_sets.len()
            + self.function_imports.len()
    }

    /// Base type of `id` as it will read once the plan is applied
    fn entity_base<'a>(
        &'a self,
        schema: &'a EntityModelSchema,
        id: EntityTypeId,
    ) -> Result<Option<&'a ItemRef<EntityTypeId>>> {
        match self.entity_bases.get(&id) {
            Some(base) => Ok(Some(base)),
            None => Ok(schema.get(id)?.base_type.as_ref()),
        }
    }

    /// Entity type of `end` as it will read once the plan is applied
    fn end_type<'a>(
        &'a self,
        schema: &'a EntityModelSchema,
        end: AssociationEndId,
    ) -> Result<&'a ItemRef<EntityTypeId>> {
        match self.end_types.get(&end) {
            Some(entity_type) => Ok(entity_type),
            None => Ok(&schema.get(end)?.entity_type),
        }
    }

    fn apply(self, schema: &mut EntityModelSchema) -> Result<()> {
        for (id, base) in self.entity_bases {
            schema.get_mut(id)?.base_type = Some(base);
        }
        for (id, base) in self.complex_bases {
            schema.get_mut(id)?.base_type = Some(base);
        }
        for (id, entity_type) in self.end_types {
            schema.get_mut(id)?.entity_type = entity_type;
        }
        for (id, data_type) in self.property_types {
            schema.get_mut(id)?.data_type = data_type;
        }
        for (id, links) in self.navigations {
            let navigation = schema.get_mut(id)?;
            navigation.association = links.association;
            navigation.from_end = links.from_end;
            navigation.to_end = links.to_end;
        }
        for (id, resolved) in self.unique_constraints {
            for (constraint, properties) in schema
                .get_mut(id)?
                .edm_unique_constraints_mut()
                .iter_mut()
                .zip(resolved)
            {
                constraint.properties = properties;
            }
        }
        for (id, constraint) in self.constraints {
            if let Some(slot) = schema.get_mut(id)?.referential_constraint_mut() {
                *slot = constraint;
            }
        }
        for (id, signature) in self.functions {
            let function = schema.get_mut(id)?;
            function.return_type = signature.return_type;
            function.parameters = signature.parameters;
        }
        for (id, entity_type) in self.entity_sets {
            schema.get_mut(id)?.entity_type = entity_type;
        }
        for (id, association, ends) in self.association_sets {
            let set = schema.get_mut(id)?;
            set.association_type = association;
            set.ends = ends;
        }
        for (id, signature) in self.function_imports {
            let import = schema.get_mut(id)?;
            import.return_types_mut().clone_from_slice(&signature.return_types);
            import.parameters = signature.parameters;
        }
        Ok(())
    }
}

struct Resolver<'c> {
    index: NameIndex,
    config: &'c ResolutionConfig,
    tolerated: Cell<usize>,
}

impl Resolver<'_> {
    fn plan(&self, schema: &EntityModelSchema) -> Result<ResolutionPlan> {
        let mut plan = ResolutionPlan::default();

        // base types first: scoped property lookups walk the inheritance chain
        for (id, entity) in schema.entity_types() {
            if let Some(base) = &entity.base_type {
                let base = self.reference(base, |n| self.index.find_entity_type(n))?;
                plan.entity_bases.insert(id, base);
            }
        }
        for (id, complex) in schema.complex_types() {
            if let Some(base) = &complex.base_type {
                let base = self.reference(base, |n| self.index.find_complex_type(n))?;
                plan.complex_bases.push((id, base));
            }
        }

        for (id, _) in schema.complex_types() {
            self.properties(schema, &mut plan, id.into())?;
        }
        for (id, _) in schema.association_types() {
            self.association(schema, &mut plan, id)?;
        }
        for (id, _) in schema.entity_types() {
            self.properties(schema, &mut plan, id.into())?;
            self.navigation_properties(schema, &mut plan, id)?;
            self.unique_constraints(schema, &mut plan, id)?;
        }
        for (id, function) in schema.functions() {
            let signature = FunctionSignature {
                return_type: function
                    .return_type
                    .as_ref()
                    .map(|t| self.data_type(t))
                    .transpose()?,
                parameters: self.parameters(&function.parameters)?,
            };
            plan.functions.push((id, signature));
        }
        for (id, _) in schema.entity_containers() {
            self.container(schema, &mut plan, id)?;
        }
        Ok(plan)
    }

    fn reference<I: ItemId>(
        &self,
        reference: &ItemRef<I>,
        find: impl FnOnce(&QualifiedName) -> Result<Option<I>>,
    ) -> Result<ItemRef<I>> {
        let ItemRef::Unresolved(name) = reference else {
            return Ok(reference.clone());
        };
        if let Some(id) = find(name)? {
            tracing::trace!("Resolved {} '{}' to {}", I::KIND, name, id);
            return Ok(ItemRef::Resolved(id));
        }
        if self.config.fail_on_unresolved {
            return Err(EdmError::unresolved(I::KIND, name.full_name()));
        }
        tracing::warn!("Leaving {} reference '{}' unresolved", I::KIND, name);
        self.tolerated.set(self.tolerated.get() + 1);
        Ok(reference.clone())
    }

    fn data_type(&self, data_type: &DataType) -> Result<DataType> {
        Ok(match data_type {
            DataType::Primitive(_) => data_type.clone(),
            DataType::Complex {
                complex_type,
                nullable,
            } => DataType::Complex {
                complex_type: self
                    .reference(complex_type, |n| self.index.find_complex_type(n))?,
                nullable: *nullable,
            },
            DataType::Enum {
                enum_type,
                nullable,
            } => DataType::Enum {
                enum_type: self.reference(enum_type, |n| self.index.find_enum_type(n))?,
                nullable: *nullable,
            },
            DataType::Entity(entity) => {
                DataType::Entity(self.reference(entity, |n| self.index.find_entity_type(n))?)
            }
            DataType::Reference(entity) => {
                DataType::Reference(self.reference(entity, |n| self.index.find_entity_type(n))?)
            }
            DataType::Collection(element) => DataType::collection(self.data_type(element)?),
            DataType::Row(row) => {
                let mut row = row.clone();
                for property in row.properties_mut() {
                    property.data_type = self.data_type(&property.data_type)?;
                }
                DataType::Row(row)
            }
        })
    }

    fn parameters(&self, parameters: &[FunctionParameter]) -> Result<Vec<FunctionParameter>> {
        parameters
            .iter()
            .map(|parameter| {
                let mut parameter = parameter.clone();
                parameter.data_type = self.data_type(&parameter.data_type)?;
                Ok(parameter)
            })
            .collect()
    }

    fn properties(
        &self,
        schema: &EntityModelSchema,
        plan: &mut ResolutionPlan,
        owner: StructuralTypeId,
    ) -> Result<()> {
        for &id in schema.own_properties(owner)? {
            let data_type = self.data_type(&schema.get(id)?.data_type)?;
            plan.property_types.push((id, data_type));
        }
        Ok(())
    }

    fn end_index(
        schema: &EntityModelSchema,
        association: AssociationTypeId,
    ) -> Result<KindIndex<AssociationEndId>> {
        let mut index = KindIndex::default();
        for &end in schema.get(association)?.ends() {
            index.insert(end, &schema.get(end)?.qualified_name());
        }
        Ok(index)
    }

    /// Properties visible on `entity` through the planned base types; own
    /// properties only when the base chain is still a placeholder and misses
    /// are tolerated
    fn property_index(
        &self,
        schema: &EntityModelSchema,
        plan: &ResolutionPlan,
        entity: EntityTypeId,
    ) -> Result<KindIndex<MemberPropertyId>> {
        let chain = walk_bases(entity, |current| {
            plan.entity_base(schema, current)?
                .map(ItemRef::require)
                .transpose()
        });
        let chain = match chain {
            Ok(chain) => chain,
            Err(EdmError::UnresolvedReference { .. }) if !self.config.fail_on_unresolved => {
                vec![entity]
            }
            Err(err) => return Err(err),
        };

        let mut index = KindIndex::default();
        for owner in chain.into_iter().rev() {
            for &id in schema.own_properties(owner)? {
                index.insert(id, &schema.get(id)?.qualified_name());
            }
        }
        Ok(index)
    }

    fn navigation_properties(
        &self,
        schema: &EntityModelSchema,
        plan: &mut ResolutionPlan,
        owner: EntityTypeId,
    ) -> Result<()> {
        let fallback = self.config.short_name_fallback;
        for &id in schema.get(owner)?.navigation_properties() {
            let navigation = schema.get(id)?;
            let association = self.reference(&navigation.association, |n| {
                self.index.find_association_type(n)
            })?;
            let (from_end, to_end) = match association.id() {
                Some(association) => {
                    let ends = Self::end_index(schema, association)?;
                    (
                        self.reference(&navigation.from_end, |n| ends.find(n, fallback))?,
                        self.reference(&navigation.to_end, |n| ends.find(n, fallback))?,
                    )
                }
                None => (navigation.from_end.clone(), navigation.to_end.clone()),
            };
            plan.navigations.push((
                id,
                NavigationLinks {
                    association,
                    from_end,
                    to_end,
                },
            ));
        }
        Ok(())
    }

    fn unique_constraints(
        &self,
        schema: &EntityModelSchema,
        plan: &mut ResolutionPlan,
        owner: EntityTypeId,
    ) -> Result<()> {
        let constraints = schema.get(owner)?.edm_unique_constraints();
        if constraints.is_empty() {
            return Ok(());
        }
        let fallback = self.config.short_name_fallback;
        let index = self.property_index(schema, plan, owner)?;
        let resolved = constraints
            .iter()
            .map(|constraint| {
                constraint
                    .properties
                    .iter()
                    .map(|p| self.reference(p, |n| index.find(n, fallback)))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        plan.unique_constraints.push((owner, resolved));
        Ok(())
    }

    fn association(
        &self,
        schema: &EntityModelSchema,
        plan: &mut ResolutionPlan,
        id: AssociationTypeId,
    ) -> Result<()> {
        let association = schema.get(id)?;
        for &end in association.ends() {
            let entity_type = self.reference(&schema.get(end)?.entity_type, |n| {
                self.index.find_entity_type(n)
            })?;
            plan.end_types.insert(end, entity_type);
        }

        if let Some(constraint) = association.referential_constraint() {
            let resolved = self.constraint(schema, plan, id, constraint.clone())?;
            plan.constraints.push((id, resolved));
        }
        Ok(())
    }

    fn constraint(
        &self,
        schema: &EntityModelSchema,
        plan: &ResolutionPlan,
        association: AssociationTypeId,
        mut constraint: ReferentialConstraint,
    ) -> Result<ReferentialConstraint> {
        let fallback = self.config.short_name_fallback;
        let ends = Self::end_index(schema, association)?;
        let end = |r: &Option<ItemRef<AssociationEndId>>| {
            r.as_ref()
                .map(|r| self.reference(r, |n| ends.find(n, fallback)))
                .transpose()
        };
        constraint.principal_end = end(&constraint.principal_end)?;
        constraint.dependent_end = end(&constraint.dependent_end)?;

        constraint.principal_properties = self.end_properties(
            schema,
            plan,
            constraint.principal_end.as_ref(),
            &constraint.principal_properties,
        )?;
        constraint.dependent_properties = self.end_properties(
            schema,
            plan,
            constraint.dependent_end.as_ref(),
            &constraint.dependent_properties,
        )?;
        Ok(constraint)
    }

    /// Resolve constraint properties against the entity type of `end`
    fn end_properties(
        &self,
        schema: &EntityModelSchema,
        plan: &ResolutionPlan,
        end: Option<&ItemRef<AssociationEndId>>,
        properties: &[ItemRef<MemberPropertyId>],
    ) -> Result<Vec<ItemRef<MemberPropertyId>>> {
        let entity = match end.and_then(ItemRef::id) {
            Some(end) => plan.end_type(schema, end)?.id(),
            None => None,
        };
        let Some(entity) = entity else {
            return Ok(properties.to_vec());
        };
        let fallback = self.config.short_name_fallback;
        let index = self.property_index(schema, plan, entity)?;
        properties
            .iter()
            .map(|p| self.reference(p, |n| index.find(n, fallback)))
            .collect()
    }

    fn container(
        &self,
        schema: &EntityModelSchema,
        plan: &mut ResolutionPlan,
        id: EntityContainerId,
    ) -> Result<()> {
        let fallback = self.config.short_name_fallback;
        let container = schema.get(id)?;

        let mut sets: KindIndex<EntitySetId> = KindIndex::default();
        for &set in container.entity_sets() {
            let item = schema.get(set)?;
            let entity_type = self.reference(&item.entity_type, |n| {
                self.index.find_entity_type(n)
            })?;
            sets.insert(set, &item.qualified_name());
            plan.entity_sets.push((set, entity_type));
        }

        for &set in container.association_sets() {
            let item = schema.get(set)?;
            let association = self.reference(&item.association_type, |n| {
                self.index.find_association_type(n)
            })?;
            let ends = association
                .id()
                .map(|association| Self::end_index(schema, association))
                .transpose()?;

            let mut set_ends = item.ends.clone();
            for set_end in &mut set_ends {
                if let Some(ends) = &ends {
                    set_end.association_end =
                        self.reference(&set_end.association_end, |n| ends.find(n, fallback))?;
                }
                set_end.entity_set = self.reference(&set_end.entity_set, |n| sets.find(n, fallback))?;
            }
            plan.association_sets.push((set, association, set_ends));
        }

        for &import in container.function_imports() {
            let item = schema.get(import)?;
            let return_types = item
                .return_types()
                .iter()
                .map(|return_type| {
                    Ok(FunctionImportReturnType {
                        data_type: self.data_type(&return_type.data_type)?,
                        entity_set: return_type
                            .entity_set
                            .as_ref()
                            .map(|set| self.reference(set, |n| sets.find(n, fallback)))
                            .transpose()?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let signature = ImportSignature {
                return_types,
                parameters: self.parameters(&item.parameters)?,
            };
            plan.function_imports.push((import, signature));
        }
        Ok(())
    }
}
