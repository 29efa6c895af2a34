//! The resource schema tree and the labelled-path walk over it.
//!
//! Schemas arrive as JSON: an interior node is `{"type": "dict", "schema":
//! {...}}` or `{"type": "list", "schema": <element>}`; anything else is a
//! leaf. A dict whose `schema` contains the key `_sec` as a direct child is
//! label-bearing — documents conforming to it carry a [`Label`] sibling at
//! that position.
//!
//! [`Label`]: crate::Label

use std::collections::BTreeMap;

use serde_json::Value;

use crate::label::SEC_FIELD;

/// A node of a resource schema, parsed into an explicit tagged tree.
///
/// The wire format marks label-bearing nodes implicitly (a `_sec` child
/// key); parsing lifts the marker into the [`SchemaNode::Labelled`] variant
/// so the labelled-path walk is a plain pre-order traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    /// A scalar or otherwise opaque value; nothing to descend into.
    Leaf,

    /// A fixed-shape object. Keys are field names.
    Object {
        /// Child shapes by field name, in deterministic order.
        fields: BTreeMap<String, SchemaNode>,
    },

    /// A homogeneous list.
    List {
        /// Shape of each element.
        element: Box<SchemaNode>,
    },

    /// A node whose values carry their own security label.
    Labelled {
        /// The underlying shape, with the `_sec` marker stripped.
        inner: Box<SchemaNode>,
    },
}

impl SchemaNode {
    /// The empty object schema, used for unknown resources.
    #[must_use]
    pub fn empty() -> Self {
        Self::Object {
            fields: BTreeMap::new(),
        }
    }

    /// Parse a wire-format shape descriptor.
    ///
    /// Parsing is total: inputs that match neither interior form are leaves.
    #[must_use]
    pub fn parse(shape: &Value) -> Self {
        match shape.get("type").and_then(Value::as_str) {
            Some("dict") => {
                let fields = shape.get("schema").and_then(Value::as_object);
                Self::parse_fields(fields.into_iter().flatten())
            }
            Some("list") => {
                let element = shape.get("schema").map_or(Self::Leaf, Self::parse);
                Self::List {
                    element: Box::new(element),
                }
            }
            _ => Self::Leaf,
        }
    }

    /// Parse a resource schema: a bare map of field name → shape, without
    /// the `{"type": "dict"}` wrapper. A top-level `_sec` key marks the
    /// document root as labelled.
    #[must_use]
    pub fn parse_resource(schema: &Value) -> Self {
        match schema.as_object() {
            Some(map) => Self::parse_fields(map.iter()),
            None => Self::empty(),
        }
    }

    fn parse_fields<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a Value)>,
    {
        let mut labelled = false;
        let mut fields = BTreeMap::new();
        for (name, shape) in entries {
            if name == SEC_FIELD {
                labelled = true;
                continue;
            }
            fields.insert(name.clone(), Self::parse(shape));
        }

        let object = Self::Object { fields };
        if labelled {
            Self::Labelled {
                inner: Box::new(object),
            }
        } else {
            object
        }
    }

    /// Every label-bearing path under this schema, in pre-order.
    ///
    /// The list always begins with the empty path: the document root is
    /// labelled by invariant whether or not the schema carries an explicit
    /// root marker. Lists are transparent — a labelled list element
    /// contributes the list's own path.
    #[must_use]
    pub fn labelled_paths(&self) -> Vec<String> {
        let mut paths = vec![String::new()];
        // The root is pre-seeded; walk past a root-level marker directly.
        match self {
            Self::Labelled { inner } => inner.collect_labelled("", &mut paths),
            other => other.collect_labelled("", &mut paths),
        }
        paths
    }

    fn collect_labelled(&self, path: &str, out: &mut Vec<String>) {
        match self {
            Self::Leaf => {}
            Self::Labelled { inner } => {
                if !path.is_empty() {
                    out.push(path.to_string());
                }
                inner.collect_labelled(path, out);
            }
            Self::Object { fields } => {
                for (name, child) in fields {
                    let child_path = if path.is_empty() {
                        name.clone()
                    } else {
                        format!("{path}.{name}")
                    };
                    child.collect_labelled(&child_path, out);
                }
            }
            Self::List { element } => element.collect_labelled(path, out),
        }
    }
}
