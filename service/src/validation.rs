//! Schema validation
//!
//! [`SchemaValidator`] walks the items registered in a schema and reports
//! problems as [`ValidationMessage`]s instead of failing on the first one.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use regex::Regex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::LazyLock;

use edm_core::config::ValidationConfig;
use edm_core::data_type::DataType;
use edm_core::function::FunctionParameter;
use edm_core::names::ItemRef;
use edm_core::schema::EntityModelSchema;
use edm_core::validation::{ValidationMessage, ValidationReport, ValidationSeverity};
use edm_core::{ItemId, NamedItem, Result};

static IDENTIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Valid identifier regex pattern")
});

static NAMESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("Valid namespace regex pattern")
});

pub const RULE_IDENTIFIER: &str = "identifier";
pub const RULE_DUPLICATE_NAME: &str = "duplicate-name";
pub const RULE_UNRESOLVED: &str = "unresolved-reference";
pub const RULE_INHERITANCE_CYCLE: &str = "inheritance-cycle";
pub const RULE_ASSOCIATION_ENDS: &str = "association-ends";
pub const RULE_ASSOCIATION_SET_ENDS: &str = "association-set-ends";
pub const RULE_CONSTRAINT_ARITY: &str = "constraint-arity";
pub const RULE_DUPLICATE_MEMBER: &str = "duplicate-enum-member";
pub const RULE_ROOT_KEY: &str = "root-key";

/// Checks a schema against the structural rules of the model
#[derive(Debug, Clone, Default)]
pub struct SchemaValidator {
    config: ValidationConfig,
}

impl SchemaValidator {
    #[must_use]
    pub const fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate every registered item of `schema`.
    ///
    /// # Errors
    ///
    /// Fails only when the schema holds an id issued by another schema.
    pub fn validate(&self, schema: &EntityModelSchema) -> Result<ValidationReport> {
        let mut report = ValidationReport::new(self.config.max_messages);

        if self.config.check_identifiers {
            check_identifiers(schema, &mut report)?;
        }
        check_duplicate_names(schema, &mut report);
        check_placeholders(schema, &mut report)?;
        check_inheritance_cycles(schema, &mut report);
        check_associations(schema, &mut report);
        check_association_sets(schema, &mut report)?;
        check_enum_members(schema, &mut report);
        if self.config.require_keys_on_root_types {
            check_root_keys(schema, &mut report)?;
        }

        tracing::debug!(
            "Validated {}: {} errors, {} warnings",
            schema.id(),
            report.summary.error_count + report.summary.critical_count,
            report.summary.warning_count
        );
        Ok(report)
    }
}

fn message(
    severity: ValidationSeverity,
    rule: &str,
    path: impl Into<String>,
    text: impl Into<String>,
) -> ValidationMessage {
    ValidationMessage::new(severity, text)
        .with_path(path)
        .with_rule(rule)
}

fn identifier(report: &mut ValidationReport, path: &str, name: &str) {
    if !IDENTIFIER_REGEX.is_match(name) {
        report.add_message(
            message(
                ValidationSeverity::Error,
                RULE_IDENTIFIER,
                path,
                format!("'{name}' is not a valid identifier"),
            )
            .with_context("name", name),
        );
    }
}

fn qualified_identifier(report: &mut ValidationReport, item: &dyn NamedItem) {
    let path = item.full_name();
    identifier(report, &path, item.name());
    if let Some(namespace) = item.namespace()
        && !NAMESPACE_REGEX.is_match(namespace)
    {
        report.add_message(
            message(
                ValidationSeverity::Error,
                RULE_IDENTIFIER,
                path.as_str(),
                format!("'{namespace}' is not a valid namespace"),
            )
            .with_context("namespace", namespace),
        );
    }
}

fn member_path(owner: &dyn NamedItem, member: &str) -> String {
    format!("{}/{member}", owner.full_name())
}

fn check_identifiers(schema: &EntityModelSchema, report: &mut ValidationReport) -> Result<()> {
    for item in schema.named_items() {
        qualified_identifier(report, &item);
    }

    for (id, entity_type) in schema.entity_types() {
        for &property in schema.own_properties(id)? {
            let name = &schema.get(property)?.name;
            identifier(report, &member_path(entity_type, name), name);
        }
        for &navigation in entity_type.navigation_properties() {
            let name = &schema.get(navigation)?.name;
            identifier(report, &member_path(entity_type, name), name);
        }
    }
    for (id, complex_type) in schema.complex_types() {
        for &property in schema.own_properties(id)? {
            let name = &schema.get(property)?.name;
            identifier(report, &member_path(complex_type, name), name);
        }
    }
    for (_, enum_type) in schema.enum_types() {
        for member in &enum_type.members {
            identifier(report, &member_path(enum_type, &member.name), &member.name);
        }
    }
    for (_, association) in schema.association_types() {
        for &end in association.ends() {
            let role = &schema.get(end)?.role_name;
            identifier(report, &member_path(association, role), role);
        }
    }
    for (_, container) in schema.entity_containers() {
        for &set in container.entity_sets() {
            let name = &schema.get(set)?.name;
            identifier(report, &member_path(container, name), name);
        }
        for &set in container.association_sets() {
            let name = &schema.get(set)?.name;
            identifier(report, &member_path(container, name), name);
        }
        for &import in container.function_imports() {
            let name = &schema.get(import)?.name;
            identifier(report, &member_path(container, name), name);
        }
    }
    Ok(())
}

fn check_duplicate_names(schema: &EntityModelSchema, report: &mut ValidationReport) {
    let mut seen: HashMap<_, usize> = HashMap::new();
    for item in schema.named_items() {
        *seen.entry((item.kind(), item.full_name())).or_default() += 1;
    }
    let mut duplicates: Vec<_> = seen.into_iter().filter(|(_, count)| *count > 1).collect();
    duplicates.sort();
    for ((kind, full_name), count) in duplicates {
        report.add_message(
            message(
                ValidationSeverity::Error,
                RULE_DUPLICATE_NAME,
                full_name.as_str(),
                format!("{count} items of kind {kind} are named '{full_name}'"),
            )
            .with_context("kind", kind.to_string()),
        );
    }
}

struct PlaceholderScan<'r> {
    report: &'r mut ValidationReport,
}

impl PlaceholderScan<'_> {
    fn reference<I: ItemId>(&mut self, path: &str, what: &str, reference: &ItemRef<I>) {
        if let Some(name) = reference.placeholder_name() {
            self.report.add_message(
                message(
                    ValidationSeverity::Error,
                    RULE_UNRESOLVED,
                    path,
                    format!("{what} '{name}' is still a placeholder"),
                )
                .with_context("kind", I::KIND.to_string()),
            );
        }
    }

    fn data_type(&mut self, path: &str, data_type: &DataType) {
        if data_type.has_placeholders() {
            self.report.add_message(message(
                ValidationSeverity::Error,
                RULE_UNRESOLVED,
                path,
                "data type refers to a placeholder",
            ));
        }
    }

    fn parameters(&mut self, path: &str, parameters: &[FunctionParameter]) {
        for parameter in parameters {
            self.data_type(&format!("{path}/{}", parameter.name), &parameter.data_type);
        }
    }
}

fn check_placeholders(schema: &EntityModelSchema, report: &mut ValidationReport) -> Result<()> {
    let mut scan = PlaceholderScan { report };

    for (id, entity_type) in schema.entity_types() {
        let path = entity_type.full_name();
        if let Some(base) = &entity_type.base_type {
            scan.reference(&path, "base type", base);
        }
        for &property in schema.own_properties(id)? {
            let property = schema.get(property)?;
            scan.data_type(&member_path(entity_type, &property.name), &property.data_type);
        }
        for &navigation in entity_type.navigation_properties() {
            let navigation = schema.get(navigation)?;
            let path = member_path(entity_type, &navigation.name);
            scan.reference(&path, "association", &navigation.association);
            scan.reference(&path, "from end", &navigation.from_end);
            scan.reference(&path, "to end", &navigation.to_end);
        }
        for constraint in entity_type.edm_unique_constraints() {
            let path = member_path(entity_type, &constraint.name);
            for property in &constraint.properties {
                scan.reference(&path, "property", property);
            }
        }
    }

    for (id, complex_type) in schema.complex_types() {
        if let Some(base) = &complex_type.base_type {
            scan.reference(&complex_type.full_name(), "base type", base);
        }
        for &property in schema.own_properties(id)? {
            let property = schema.get(property)?;
            scan.data_type(&member_path(complex_type, &property.name), &property.data_type);
        }
    }

    for (_, association) in schema.association_types() {
        for &end in association.ends() {
            let end = schema.get(end)?;
            scan.reference(&member_path(association, &end.role_name), "entity type", &end.entity_type);
        }
        if let Some(constraint) = association.referential_constraint() {
            let path = association.full_name();
            for end in [&constraint.principal_end, &constraint.dependent_end]
                .into_iter()
                .flatten()
            {
                scan.reference(&path, "constraint end", end);
            }
            for property in constraint
                .principal_properties
                .iter()
                .chain(&constraint.dependent_properties)
            {
                scan.reference(&path, "constraint property", property);
            }
        }
    }

    for (_, function) in schema.functions() {
        let path = function.full_name();
        if let Some(return_type) = &function.return_type {
            scan.data_type(&path, return_type);
        }
        scan.parameters(&path, &function.parameters);
    }

    for (_, container) in schema.entity_containers() {
        for &set in container.entity_sets() {
            let set = schema.get(set)?;
            scan.reference(&member_path(container, &set.name), "entity type", &set.entity_type);
        }
        for &set in container.association_sets() {
            let set = schema.get(set)?;
            let path = member_path(container, &set.name);
            scan.reference(&path, "association", &set.association_type);
            for end in &set.ends {
                scan.reference(&path, "association end", &end.association_end);
                scan.reference(&path, "entity set", &end.entity_set);
            }
        }
        for &import in container.function_imports() {
            let import = schema.get(import)?;
            let path = member_path(container, &import.name);
            for return_type in import.return_types() {
                scan.data_type(&path, &return_type.data_type);
                if let Some(entity_set) = &return_type.entity_set {
                    scan.reference(&path, "entity set", entity_set);
                }
            }
            scan.parameters(&path, &import.parameters);
        }
    }
    Ok(())
}

/// Names of the items on each base-type cycle
fn base_type_cycles<I: Copy + Eq + Hash>(items: &[(I, String, Option<I>)]) -> Vec<Vec<String>> {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let mut nodes: HashMap<I, NodeIndex> = HashMap::new();
    for (position, (id, _, _)) in items.iter().enumerate() {
        nodes.insert(*id, graph.add_node(position));
    }
    for (id, _, base) in items {
        if let (Some(&from), Some(to)) = (nodes.get(id), base.and_then(|b| nodes.get(&b))) {
            graph.add_edge(from, *to, ());
        }
    }

    tarjan_scc(&graph)
        .into_iter()
        .filter(|component| match component.as_slice() {
            [single] => graph.contains_edge(*single, *single),
            _ => true,
        })
        .map(|component| {
            let mut names: Vec<String> = component
                .iter()
                .map(|&node| items[graph[node]].1.clone())
                .collect();
            names.sort();
            names
        })
        .collect()
}

fn report_cycles(report: &mut ValidationReport, kind: &str, cycles: Vec<Vec<String>>) {
    for cycle in cycles {
        let path = cycle.first().cloned().unwrap_or_default();
        report.add_message(message(
            ValidationSeverity::Critical,
            RULE_INHERITANCE_CYCLE,
            path,
            format!("{kind} base types form a cycle: {}", cycle.join(" -> ")),
        ));
    }
}

fn check_inheritance_cycles(schema: &EntityModelSchema, report: &mut ValidationReport) {
    let entity_types: Vec<_> = schema
        .entity_types()
        .map(|(id, t)| (id, t.full_name(), t.base_type.as_ref().and_then(ItemRef::id)))
        .collect();
    report_cycles(report, "entity type", base_type_cycles(&entity_types));

    let complex_types: Vec<_> = schema
        .complex_types()
        .map(|(id, t)| (id, t.full_name(), t.base_type.as_ref().and_then(ItemRef::id)))
        .collect();
    report_cycles(report, "complex type", base_type_cycles(&complex_types));
}

fn check_associations(schema: &EntityModelSchema, report: &mut ValidationReport) {
    for (_, association) in schema.association_types() {
        let path = association.full_name();
        if association.ends().len() != 2 {
            report.add_message(message(
                ValidationSeverity::Error,
                RULE_ASSOCIATION_ENDS,
                path.as_str(),
                format!("association has {} ends, expected 2", association.ends().len()),
            ));
        }
        if let Some(constraint) = association.referential_constraint()
            && constraint.principal_properties.len() != constraint.dependent_properties.len()
        {
            report.add_message(message(
                ValidationSeverity::Error,
                RULE_CONSTRAINT_ARITY,
                path.as_str(),
                format!(
                    "referential constraint pairs {} principal with {} dependent properties",
                    constraint.principal_properties.len(),
                    constraint.dependent_properties.len()
                ),
            ));
        }
    }
}

fn check_association_sets(schema: &EntityModelSchema, report: &mut ValidationReport) -> Result<()> {
    for (_, container) in schema.entity_containers() {
        for &set in container.association_sets() {
            let set = schema.get(set)?;
            if set.ends.len() != 2 {
                report.add_message(message(
                    ValidationSeverity::Error,
                    RULE_ASSOCIATION_SET_ENDS,
                    member_path(container, &set.name),
                    format!("association set has {} ends, expected 2", set.ends.len()),
                ));
            }
        }
    }
    Ok(())
}

fn check_enum_members(schema: &EntityModelSchema, report: &mut ValidationReport) {
    for (_, enum_type) in schema.enum_types() {
        let mut seen = std::collections::HashSet::new();
        for member in &enum_type.members {
            if !seen.insert(member.name.as_str()) {
                report.add_message(message(
                    ValidationSeverity::Error,
                    RULE_DUPLICATE_MEMBER,
                    member_path(enum_type, &member.name),
                    format!("member '{}' is declared more than once", member.name),
                ));
            }
        }
    }
}

fn check_root_keys(schema: &EntityModelSchema, report: &mut ValidationReport) -> Result<()> {
    for (id, entity_type) in schema.entity_types() {
        if entity_type.base_type.is_some() {
            continue;
        }
        let mut has_key = false;
        for &property in schema.own_properties(id)? {
            has_key |= schema.get(property)?.is_primary_key;
        }
        if !has_key {
            report.add_message(message(
                ValidationSeverity::Warning,
                RULE_ROOT_KEY,
                entity_type.full_name(),
                "root entity type declares no key property",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use edm_core::association::{AssociationEnd, AssociationType, EndMultiplicity};
    use edm_core::data_type::PrimitiveKind;
    use edm_core::enum_type::{EnumMember, EnumType};
    use edm_core::structural::{EntityType, MemberProperty};

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    fn keyed(schema: &mut EntityModelSchema, name: &str) -> Result<edm_core::ids::EntityTypeId> {
        let id = schema.create(EntityType::new(name).with_namespace("M"))?;
        schema.add_property(
            id,
            MemberProperty::new("Id", DataType::primitive(PrimitiveKind::Int32)).primary_key(),
        )?;
        Ok(id)
    }

    #[test]
    fn clean_schema_is_valid() -> TestResult {
        let mut schema = EntityModelSchema::new();
        keyed(&mut schema, "Customer")?;
        let report = SchemaValidator::default().validate(&schema)?;
        assert!(report.is_valid, "{report}");
        assert!(report.messages.is_empty());
        Ok(())
    }

    #[test]
    fn bad_identifiers_and_duplicates_are_errors() -> TestResult {
        let mut schema = EntityModelSchema::new();
        keyed(&mut schema, "Order")?;
        keyed(&mut schema, "Order")?;
        keyed(&mut schema, "2nd Order")?;

        let report = SchemaValidator::default().validate(&schema)?;
        assert_eq!(report.messages_for_rule(RULE_DUPLICATE_NAME).len(), 1);
        assert_eq!(report.messages_for_rule(RULE_IDENTIFIER).len(), 1);

        let lenient = SchemaValidator::new(ValidationConfig {
            check_identifiers: false,
            ..ValidationConfig::default()
        });
        assert!(lenient.validate(&schema)?.messages_for_rule(RULE_IDENTIFIER).is_empty());
        Ok(())
    }

    #[test]
    fn inheritance_cycles_are_critical() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let a = keyed(&mut schema, "A")?;
        let b = keyed(&mut schema, "B")?;
        schema.get_mut(a)?.base_type = Some(ItemRef::from(b));
        schema.get_mut(b)?.base_type = Some(ItemRef::from(a));
        let lonely = keyed(&mut schema, "Lonely")?;
        schema.get_mut(lonely)?.base_type = Some(ItemRef::from(lonely));

        let report = SchemaValidator::default().validate(&schema)?;
        let cycles = report.messages_for_rule(RULE_INHERITANCE_CYCLE);
        assert_eq!(cycles.len(), 2);
        assert_eq!(report.max_severity(), Some(ValidationSeverity::Critical));
        Ok(())
    }

    #[test]
    fn structural_problems_are_reported() -> TestResult {
        let mut schema = EntityModelSchema::new();
        let keyless = schema.create(EntityType::new("Keyless"))?;
        let association = schema.create(AssociationType::new("Half"))?;
        schema.add_association_end(
            association,
            AssociationEnd::new("Only", keyless, EndMultiplicity::Many),
        )?;
        schema.create(
            EnumType::new("Color")
                .with_member(EnumMember::new("Red"))
                .with_member(EnumMember::new("Red")),
        )?;
        schema.create(EntityType::new("Dangling").with_base_type(ItemRef::named("Nowhere")))?;

        let report = SchemaValidator::default().validate(&schema)?;
        assert_eq!(report.messages_for_rule(RULE_ASSOCIATION_ENDS).len(), 1);
        assert_eq!(report.messages_for_rule(RULE_DUPLICATE_MEMBER).len(), 1);
        assert_eq!(report.messages_for_rule(RULE_UNRESOLVED).len(), 1);
        assert_eq!(report.messages_for_rule(RULE_ROOT_KEY).len(), 1);
        assert_eq!(report.summary.warning_count, 1);
        Ok(())
    }
}
