//! The schema registry: an immutable resource → schema catalog.
//!
//! Built once from a JSON catalog at process start and shared read-only for
//! the life of the process. Labelled paths are computed at build time so
//! per-request lookups are allocation-free.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::schema::SchemaNode;

struct ResourceEntry {
    schema: SchemaNode,
    labelled_paths: Vec<String>,
}

/// Holds every registered resource schema and its derived labelled paths.
///
/// Unknown resources are not errors: they resolve to the empty schema and
/// the degenerate path list `[""]`, because the document root is labelled
/// by invariant even when nothing else is known about the resource.
pub struct SchemaRegistry {
    resources: BTreeMap<String, ResourceEntry>,
    empty_schema: SchemaNode,
    root_only: Vec<String>,
}

impl SchemaRegistry {
    /// Build a registry from a JSON catalog of `{resource: schema}`.
    ///
    /// Anything that is not an object catalog yields an empty registry.
    #[must_use]
    pub fn from_catalog(catalog: &Value) -> Self {
        let mut resources = BTreeMap::new();
        if let Some(map) = catalog.as_object() {
            for (name, schema) in map {
                let schema = SchemaNode::parse_resource(schema);
                let labelled_paths = schema.labelled_paths();
                resources.insert(
                    name.clone(),
                    ResourceEntry {
                        schema,
                        labelled_paths,
                    },
                );
            }
        }
        Self {
            resources,
            empty_schema: SchemaNode::empty(),
            root_only: vec![String::new()],
        }
    }

    /// The schema tree for `resource`, or the empty schema if unregistered.
    #[must_use]
    pub fn schema(&self, resource: &str) -> &SchemaNode {
        self.resources
            .get(resource)
            .map_or(&self.empty_schema, |entry| &entry.schema)
    }

    /// Every label-bearing path of `resource`, in pre-order, root first.
    #[must_use]
    pub fn labelled_paths(&self, resource: &str) -> &[String] {
        self.resources
            .get(resource)
            .map_or(&self.root_only, |entry| &entry.labelled_paths)
    }

    /// Whether `resource` was present in the catalog.
    #[must_use]
    pub fn contains(&self, resource: &str) -> bool {
        self.resources.contains_key(resource)
    }

    /// Registered resource names, in sorted order.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::from_catalog(&Value::Null)
    }
}
