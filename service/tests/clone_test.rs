//! Deep clone followed by resolution

mod helpers;

use std::collections::HashSet;
use std::sync::Arc;

use edm_core::config::CloneConfig;
use edm_core::prelude::*;
use edm_service::{EdmService, deep_clone};
use helpers::{TestResult, sales_schema};
use pretty_assertions::assert_eq;

#[test]
fn resolved_clone_matches_original_by_name() -> TestResult {
    helpers::init_tracing();
    let service = EdmService::new(EdmConfig::default())?;
    let mut fixture = sales_schema()?;
    service.resolve(&mut fixture.schema)?;
    let original = &fixture.schema;

    let copy = service.clone_and_resolve(original)?;
    assert!(copy.id() != original.id());

    let original_items: Vec<_> = original.named_items().collect();
    let copied_items: Vec<_> = copy.named_items().collect();
    assert_eq!(original_items, copied_items);
    for (a, b) in original_items.iter().zip(&copied_items) {
        assert!(!std::ptr::eq(a.name(), b.name()));
    }

    let originals: HashSet<_> = original.named_items().collect();
    assert!(copied_items.iter().all(|item| originals.contains(item)));
    Ok(())
}

#[test]
fn clone_needs_resolution_before_relationship_views() -> TestResult {
    helpers::init_tracing();
    let service = EdmService::new(EdmConfig::default())?;
    let mut fixture = sales_schema()?;
    service.resolve(&mut fixture.schema)?;

    let mut copy = service.deep_clone(&fixture.schema)?;
    let report = service.validate(&copy)?;
    assert!(report.has_errors());
    assert!(!report.messages_for_rule("unresolved-reference").is_empty());

    service.resolve(&mut copy)?;
    assert!(service.validate(&copy)?.is_valid);

    let (container, _) = copy.entity_containers().next().ok_or("no container")?;
    let views = service.container_relationships(&copy, container)?;
    let originals = service.container_relationships(&fixture.schema, fixture.container)?;
    assert_eq!(views.len(), originals.len());
    for (copied, original) in views.iter().zip(&originals) {
        assert_eq!(copied.multiplicity_pattern(), original.multiplicity_pattern());
        assert_eq!(
            copied.is_identifying_relationship(),
            original.is_identifying_relationship()
        );
        let copied_set = copy.get(copied.association_set())?;
        let original_set = fixture.schema.get(original.association_set())?;
        assert_eq!(copied_set.name, original_set.name);
    }
    Ok(())
}

#[test]
fn inherited_keys_survive_the_round_trip() -> TestResult {
    helpers::init_tracing();
    let service = EdmService::new(EdmConfig::default())?;
    let fixture = sales_schema()?;
    let copy = service.clone_and_resolve(&fixture.schema)?;

    let premium = copy
        .entity_types()
        .find(|(_, t)| t.full_name() == "Sales.PremiumCustomer")
        .map(|(id, _)| id)
        .ok_or("premium customer missing")?;
    let keys = copy.all_key_properties(premium)?;
    assert_eq!(keys.len(), 1);
    assert_eq!(copy.get(keys[0])?.name, "Id");
    Ok(())
}

#[test]
fn annotations_are_copied_or_shared_per_config() -> TestResult {
    helpers::init_tracing();
    let mut schema = EntityModelSchema::new();
    let customer = schema.create(EntityType::new("Customer"))?;
    schema
        .get_mut(customer)?
        .annotations
        .add(KeyValueAnnotation::new("table", "customers"));

    let source = schema.get(customer)?.annotations.iter().next().ok_or("no annotation")?;

    let deep = deep_clone(&schema, &CloneConfig::default())?;
    let (_, deep_customer) = deep.entity_types().next().ok_or("no type")?;
    let deep_annotation = deep_customer.annotations.iter().next().ok_or("no annotation")?;
    assert!(!Arc::ptr_eq(source, deep_annotation));
    assert_eq!(
        deep_customer.annotations.get::<KeyValueAnnotation>().map(|a| a.key.as_str()),
        Some("table")
    );

    let shallow = deep_clone(
        &schema,
        &CloneConfig {
            deep_clone_annotations: false,
        },
    )?;
    let (_, shallow_customer) = shallow.entity_types().next().ok_or("no type")?;
    let shared = shallow_customer.annotations.iter().next().ok_or("no annotation")?;
    assert!(Arc::ptr_eq(source, shared));
    Ok(())
}

#[test]
fn detached_items_are_not_cloned() -> TestResult {
    helpers::init_tracing();
    let mut schema = EntityModelSchema::new();
    let kept = schema.create(EntityType::new("Kept"))?;
    let dropped = schema.create(EntityType::new("Dropped"))?;
    schema.add_property(kept, MemberProperty::new("Id", DataType::primitive(PrimitiveKind::Guid)))?;
    schema.remove_entity_type(dropped)?;

    let copy = deep_clone(&schema, &CloneConfig::default())?;
    let names: Vec<_> = copy.entity_types().map(|(_, t)| t.full_name()).collect();
    assert_eq!(names, vec!["Kept"]);
    Ok(())
}
