//! Shared sales schema fixture, authored with placeholders only

#![allow(dead_code)]

use edm_core::prelude::*;

pub type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

/// Route `tracing` output to the test harness; `RUST_LOG` selects the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Ids of the fixture's interesting items
pub struct SalesSchema {
    pub schema: EntityModelSchema,
    pub container: EntityContainerId,
    pub customer: EntityTypeId,
    pub order: EntityTypeId,
    pub order_line: EntityTypeId,
    pub premium_customer: EntityTypeId,
    pub customer_orders: AssociationSetId,
    pub order_lines: AssociationSetId,
    pub customer_profile: AssociationSetId,
    pub order_products: AssociationSetId,
}

fn int32(name: &str) -> MemberProperty {
    MemberProperty::new(name, DataType::primitive(PrimitiveKind::Int32).with_nullable(false))
}

fn entity(
    schema: &mut EntityModelSchema,
    name: &str,
    keys: &[&str],
    others: &[&str],
) -> Result<EntityTypeId> {
    let id = schema.create(EntityType::new(name).with_namespace("Sales"))?;
    for key in keys {
        schema.add_property(id, int32(key).primary_key())?;
    }
    for other in others {
        schema.add_property(id, int32(other))?;
    }
    Ok(id)
}

fn association(
    schema: &mut EntityModelSchema,
    name: &str,
    first: AssociationEnd,
    second: AssociationEnd,
) -> Result<AssociationTypeId> {
    let id = schema.create(AssociationType::new(name).with_namespace("Sales"))?;
    schema.add_association_end(id, first)?;
    schema.add_association_end(id, second)?;
    Ok(id)
}

fn end(role: &str, entity_type: &str, multiplicity: EndMultiplicity) -> AssociationEnd {
    AssociationEnd::new(role, ItemRef::named(entity_type), multiplicity)
}

fn navigation(name: &str, association: &str, from: &str, to: &str) -> NavigationProperty {
    NavigationProperty::new(
        name,
        ItemRef::named(association),
        ItemRef::named(from),
        ItemRef::named(to),
    )
}

fn association_set(name: &str, association: &str, ends: [(&str, &str); 2]) -> AssociationSet {
    ends.into_iter()
        .fold(AssociationSet::new(name, ItemRef::named(association)), |set, (role, entity_set)| {
            set.with_end(AssociationSetEnd::new(
                ItemRef::named(role),
                ItemRef::named(entity_set),
            ))
        })
}

/// Customers, orders, order lines, products and profiles in namespace
/// `Sales`. Nothing is resolved yet.
pub fn sales_schema() -> Result<SalesSchema> {
    let mut schema = EntityModelSchema::new();

    let customer = entity(&mut schema, "Customer", &["Id"], &["Rating"])?;
    let order = entity(&mut schema, "Order", &["OrderId"], &["CustomerId"])?;
    let order_line = entity(&mut schema, "OrderLine", &["OrderId", "LineNo"], &["Quantity"])?;
    entity(&mut schema, "Product", &["ProductId"], &[])?;
    entity(&mut schema, "Profile", &["CustomerId"], &[])?;
    let premium_customer = schema.create(
        EntityType::new("PremiumCustomer")
            .with_namespace("Sales")
            .with_base_type(ItemRef::named("Sales.Customer")),
    )?;

    let customer_orders = association(
        &mut schema,
        "CustomerOrders",
        end("Customer", "Sales.Customer", EndMultiplicity::One),
        end("Orders", "Sales.Order", EndMultiplicity::Many),
    )?;
    schema.set_referential_constraint(
        customer_orders,
        ReferentialConstraint::new()
            .with_principal(ItemRef::named("Customer"), [ItemRef::named("Id")])
            .with_dependent(ItemRef::named("Orders"), [ItemRef::named("CustomerId")]),
    )?;

    let order_lines = association(
        &mut schema,
        "OrderLines",
        end("Order", "Sales.Order", EndMultiplicity::One),
        end("Lines", "Sales.OrderLine", EndMultiplicity::Many).on_delete(OperationAction::Cascade),
    )?;
    schema.set_referential_constraint(
        order_lines,
        ReferentialConstraint::new()
            .with_principal(ItemRef::named("Order"), [ItemRef::named("OrderId")])
            .with_dependent(ItemRef::named("Lines"), [ItemRef::named("OrderId")]),
    )?;

    association(
        &mut schema,
        "CustomerProfile",
        end("Customer", "Sales.Customer", EndMultiplicity::One),
        end("Profile", "Sales.Profile", EndMultiplicity::ZeroOne),
    )?;
    association(
        &mut schema,
        "OrderProducts",
        end("Orders", "Sales.Order", EndMultiplicity::Many),
        end("Products", "Sales.Product", EndMultiplicity::Many),
    )?;

    schema.add_navigation_property(
        customer,
        navigation("Orders", "Sales.CustomerOrders", "Customer", "Orders"),
    )?;
    schema.add_navigation_property(
        customer,
        navigation("Profile", "Sales.CustomerProfile", "Customer", "Profile"),
    )?;
    schema.add_navigation_property(
        order,
        navigation("Customer", "Sales.CustomerOrders", "Orders", "Customer"),
    )?;
    schema.add_navigation_property(
        order,
        navigation("Lines", "Sales.OrderLines", "Order", "Lines"),
    )?;
    schema.add_navigation_property(
        order_line,
        navigation("Order", "Sales.OrderLines", "Lines", "Order"),
    )?;

    let container = schema.create(EntityContainer::new("SalesDb").with_namespace("Sales"))?;
    for (set, entity_type) in [
        ("Customers", "Sales.Customer"),
        ("Orders", "Sales.Order"),
        ("OrderLines", "Sales.OrderLine"),
        ("Products", "Sales.Product"),
        ("Profiles", "Sales.Profile"),
    ] {
        schema.create_in(container, EntitySet::new(set, ItemRef::named(entity_type)))?;
    }

    let customer_orders = schema.create_in(
        container,
        association_set(
            "CustomerOrders",
            "Sales.CustomerOrders",
            [("Customer", "Customers"), ("Orders", "Orders")],
        ),
    )?;
    let order_lines = schema.create_in(
        container,
        association_set(
            "OrderLines",
            "Sales.OrderLines",
            [("Order", "Orders"), ("Lines", "OrderLines")],
        ),
    )?;
    let customer_profile = schema.create_in(
        container,
        association_set(
            "CustomerProfile",
            "Sales.CustomerProfile",
            [("Customer", "Customers"), ("Profile", "Profiles")],
        ),
    )?;
    let order_products = schema.create_in(
        container,
        association_set(
            "OrderProducts",
            "Sales.OrderProducts",
            [("Orders", "Orders"), ("Products", "Products")],
        ),
    )?;

    Ok(SalesSchema {
        schema,
        container,
        customer,
        order,
        order_line,
        premium_customer,
        customer_orders,
        order_lines,
        customer_profile,
        order_products,
    })
}

/// Names of `ids`, for readable assertions
pub fn property_names(schema: &EntityModelSchema, ids: &[MemberPropertyId]) -> Result<Vec<String>> {
    ids.iter()
        .map(|&id| Ok(schema.get(id)?.name.clone()))
        .collect()
}
