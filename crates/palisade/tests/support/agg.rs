//! A small interpreter for the aggregation stage subset the gateway
//! emits: `$match` (equality and `$exists` on scalars), `$addFields` with
//! `$map`/`$cond`/`$setIsSubset`/`$ifNull`, `$redact` with
//! `$$PRUNE`/`$$DESCEND`, and exclusion `$project`.
//!
//! Follows the database's evaluation rules where they matter to the
//! gateway: field paths that resolve to nothing are *missing* (distinct
//! from `null`), missing elements are omitted from array literals, dotted
//! `$addFields` descend through arrays, and `$redact` re-evaluates its
//! condition at every sub-document. Unsupported stages and operators
//! panic — a fixture should never silently ignore a stage the real
//! database would execute.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Run a pipeline over a set of documents.
pub fn run(mut documents: Vec<Value>, pipeline: &[Value]) -> Vec<Value> {
    for stage in pipeline {
        let Some(spec) = stage.as_object() else {
            panic!("stage is not an object: {stage}");
        };
        let Some((operator, body)) = spec.iter().next() else {
            panic!("empty stage");
        };
        documents = match operator.as_str() {
            "$match" => documents
                .into_iter()
                .filter(|document| matches(document, body))
                .collect(),
            "$addFields" => documents
                .into_iter()
                .map(|mut document| {
                    add_fields(&mut document, body);
                    document
                })
                .collect(),
            "$redact" => documents
                .into_iter()
                .filter_map(|document| redact(document, body))
                .collect(),
            "$project" => documents
                .into_iter()
                .map(|mut document| {
                    project(&mut document, body);
                    document
                })
                .collect(),
            other => panic!("unsupported stage: {other}"),
        };
    }
    documents
}

fn matches(document: &Value, spec: &Value) -> bool {
    let Some(constraints) = spec.as_object() else {
        panic!("$match body is not an object: {spec}");
    };
    constraints.iter().all(|(field, constraint)| {
        match constraint.as_object().and_then(|c| c.get("$exists")) {
            Some(_) => document.get(field).is_some(),
            None => document.get(field) == Some(constraint),
        }
    })
}

fn add_fields(document: &mut Value, fields: &Value) {
    let Some(fields) = fields.as_object() else {
        panic!("$addFields body is not an object: {fields}");
    };
    let context = document.clone();
    for (path, expr) in fields {
        if let Some(value) = eval(expr, &context, &BTreeMap::new()) {
            set_path(document, path, &value);
        }
    }
}

/// Set a dotted path, creating intermediate objects and descending through
/// arrays the way `$addFields` does.
fn set_path(node: &mut Value, path: &str, value: &Value) {
    match node {
        Value::Object(map) => match path.split_once('.') {
            None => {
                map.insert(path.to_string(), value.clone());
            }
            Some((head, rest)) => {
                let child = map
                    .entry(head.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if child.is_object() || child.is_array() {
                    set_path(child, rest, value);
                }
            }
        },
        Value::Array(items) => {
            for item in items {
                set_path(item, path, value);
            }
        }
        _ => {}
    }
}

/// Evaluate an aggregation expression. `None` is the *missing* value.
fn eval(expr: &Value, document: &Value, vars: &BTreeMap<String, Value>) -> Option<Value> {
    match expr {
        Value::String(text) => {
            if let Some(name) = text.strip_prefix("$$") {
                vars.get(name).cloned()
            } else if let Some(path) = text.strip_prefix('$') {
                let segments: Vec<&str> = path.split('.').collect();
                resolve(document, &segments)
            } else {
                Some(expr.clone())
            }
        }
        Value::Array(items) => Some(Value::Array(
            items
                .iter()
                .filter_map(|item| eval(item, document, vars))
                .collect(),
        )),
        Value::Object(map) if map.len() == 1 => {
            let (operator, args) = map.iter().next().unwrap();
            Some(apply_operator(operator, args, document, vars))
        }
        other => Some(other.clone()),
    }
}

fn apply_operator(
    operator: &str,
    args: &Value,
    document: &Value,
    vars: &BTreeMap<String, Value>,
) -> Value {
    match operator {
        "$map" => {
            let input = eval(&args["input"], document, vars).unwrap_or(Value::Null);
            let Value::Array(elements) = input else {
                return Value::Null;
            };
            let var_name = args["as"].as_str().expect("$map as");
            let body = &args["in"];
            Value::Array(
                elements
                    .into_iter()
                    .filter_map(|element| {
                        let mut scoped = vars.clone();
                        scoped.insert(var_name.to_string(), element);
                        eval(body, document, &scoped)
                    })
                    .collect(),
            )
        }
        "$cond" => {
            let test = eval(&args["if"], document, vars);
            let branch = if truthy(test.as_ref()) {
                &args["then"]
            } else {
                &args["else"]
            };
            eval(branch, document, vars).unwrap_or(Value::Null)
        }
        "$setIsSubset" => {
            let first = eval(&args[0], document, vars).unwrap_or(Value::Null);
            let second = eval(&args[1], document, vars).unwrap_or(Value::Null);
            let (Value::Array(first), Value::Array(second)) = (first, second) else {
                panic!("$setIsSubset arguments must be arrays");
            };
            Value::Bool(first.iter().all(|needle| second.contains(needle)))
        }
        "$ifNull" => match eval(&args[0], document, vars) {
            Some(value) if !value.is_null() => value,
            _ => eval(&args[1], document, vars).unwrap_or(Value::Null),
        },
        other => panic!("unsupported operator: {other}"),
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(_) => true,
    }
}

/// Resolve a field path. Descending into an array resolves against each
/// element, omitting misses.
fn resolve(node: &Value, segments: &[&str]) -> Option<Value> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(node.clone());
    };
    match node {
        Value::Object(map) => resolve(map.get(*head)?, rest),
        Value::Array(items) => Some(Value::Array(
            items
                .iter()
                .filter_map(|item| resolve(item, segments))
                .collect(),
        )),
        _ => None,
    }
}

/// Apply a `$redact` condition at this level and every sub-document below.
fn redact(value: Value, condition: &Value) -> Option<Value> {
    match value {
        Value::Object(map) => {
            let context = Value::Object(map);
            let mut vars = BTreeMap::new();
            vars.insert("PRUNE".to_string(), Value::String("PRUNE".to_string()));
            vars.insert("DESCEND".to_string(), Value::String("DESCEND".to_string()));
            let decision = eval(condition, &context, &vars).unwrap_or(Value::Null);

            let Value::Object(map) = context else {
                unreachable!();
            };
            match decision.as_str() {
                Some("PRUNE") => None,
                Some("DESCEND") => {
                    let mut kept = Map::new();
                    for (field, child) in map {
                        match child {
                            Value::Object(_) => {
                                if let Some(child) = redact(child, condition) {
                                    kept.insert(field, child);
                                }
                            }
                            Value::Array(items) => {
                                let survivors: Vec<Value> = items
                                    .into_iter()
                                    .filter_map(|item| redact(item, condition))
                                    .collect();
                                kept.insert(field, Value::Array(survivors));
                            }
                            scalar => {
                                kept.insert(field, scalar);
                            }
                        }
                    }
                    Some(Value::Object(kept))
                }
                other => panic!("unexpected $redact decision: {other:?}"),
            }
        }
        other => Some(other),
    }
}

fn project(document: &mut Value, projection: &Value) {
    let Some(projection) = projection.as_object() else {
        panic!("$project body is not an object: {projection}");
    };
    for (path, flag) in projection {
        assert_eq!(flag, 0, "only exclusion projections are supported");
        remove_path(document, path);
    }
}

fn remove_path(node: &mut Value, path: &str) {
    match node {
        Value::Object(map) => match path.split_once('.') {
            None => {
                map.remove(path);
            }
            Some((head, rest)) => {
                if let Some(child) = map.get_mut(head) {
                    remove_path(child, rest);
                }
            }
        },
        Value::Array(items) => {
            for item in items {
                remove_path(item, path);
            }
        }
        _ => {}
    }
}
