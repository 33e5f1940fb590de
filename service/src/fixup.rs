//! Schema-wide fixups and the pipeline that orders them
//!
//! A fixup rewrites a schema in place. The pipeline runs registered fixups
//! after the ones they depend on and drops memoized relationship views once
//! every fixup has finished. When a fixup fails, the schema is restored to
//! the state it had before the first one ran.

use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use edm_core::schema::EntityModelSchema;
use edm_core::{EdmError, Result};

/// A pass that normalizes a schema in place
pub trait SchemaFixup {
    /// Unique name used for ordering and logging
    fn name(&self) -> &str;

    /// Names of fixups that must run first
    fn depends_on(&self) -> Vec<String> {
        Vec::new()
    }

    /// Rewrite `schema`
    ///
    /// # Errors
    ///
    /// Implementations should fail before their first write. The pipeline
    /// stops at the first error and rolls back whatever earlier fixups wrote.
    fn fixup(&self, schema: &mut EntityModelSchema) -> Result<()>;
}

/// Ordered collection of fixups
#[derive(Default)]
pub struct FixupPipeline {
    fixups: IndexMap<String, Box<dyn SchemaFixup>>,
}

impl FixupPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fixup.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` when a fixup with the same name is registered.
    pub fn register(&mut self, fixup: Box<dyn SchemaFixup>) -> Result<()> {
        let name = fixup.name().to_string();
        if self.fixups.contains_key(&name) {
            return Err(EdmError::invariant(format!(
                "fixup '{name}' is already registered"
            )));
        }
        self.fixups.insert(name, fixup);
        Ok(())
    }

    /// Builder-style [`FixupPipeline::register`]
    ///
    /// # Errors
    ///
    /// See [`FixupPipeline::register`].
    pub fn with(mut self, fixup: impl SchemaFixup + 'static) -> Result<Self> {
        self.register(Box::new(fixup))?;
        Ok(self)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fixups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fixups.is_empty()
    }

    /// Names in execution order, every fixup after its dependencies.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a dependency nobody registered and
    /// `InvariantViolation` for circular dependencies.
    pub fn execution_order(&self) -> Result<Vec<&str>> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

        for name in self.fixups.keys() {
            nodes.insert(name.as_str(), graph.add_node(name.as_str()));
        }

        for (name, fixup) in &self.fixups {
            let Some(&node) = nodes.get(name.as_str()) else {
                continue;
            };
            for dependency in fixup.depends_on() {
                let dep_node = nodes.get(dependency.as_str()).ok_or_else(|| {
                    EdmError::invalid_argument(format!(
                        "fixup '{name}' depends on unregistered fixup '{dependency}'"
                    ))
                })?;
                graph.add_edge(*dep_node, node, ());
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(|idx| graph[idx]).collect()),
            Err(cycle) => Err(EdmError::invariant(format!(
                "Circular dependency detected in fixups at '{}'",
                graph[cycle.node_id()]
            ))),
        }
    }

    /// Run every fixup against `schema`.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first fixup error, with `schema` restored to
    /// its state before the run.
    pub fn run(&self, schema: &mut EntityModelSchema) -> Result<()> {
        let order = self.execution_order()?;
        let fixups: Vec<&dyn SchemaFixup> = order
            .into_iter()
            .filter_map(|name| self.fixups.get(name).map(|fixup| &**fixup))
            .collect();
        apply_fixups(schema, &fixups)
    }
}

impl std::fmt::Debug for FixupPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixupPipeline")
            .field("fixups", &self.fixups.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Run `fixups` once each, in the given order
///
/// # Errors
///
/// Stops at and returns the first fixup error, with `schema` restored to
/// its state before the first fixup.
pub fn apply_fixups(schema: &mut EntityModelSchema, fixups: &[&dyn SchemaFixup]) -> Result<()> {
    let checkpoint = schema.checkpoint();
    for fixup in fixups {
        tracing::debug!("Running fixup '{}' on {}", fixup.name(), schema.id());
        if let Err(err) = fixup.fixup(schema) {
            tracing::debug!("Fixup '{}' failed, rolling back {}", fixup.name(), schema.id());
            schema.restore(checkpoint)?;
            return Err(err);
        }
        tracing::debug!("Fixup '{}' finished", fixup.name());
    }
    schema.invalidate_relationships();
    Ok(())
}
