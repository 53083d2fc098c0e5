//! Coding discovery inside resource instances.

use crate::json::{as_list, resource_type};
use crate::model::{Coding, FoundCoding};
use serde_json::Value;

/// An object is a Coding candidate when it carries string `system` and `code`.
pub fn as_coding(node: &Value) -> Option<Coding> {
    let object = node.as_object()?;
    let system = object.get("system")?.as_str()?;
    let code = object.get("code")?.as_str()?;
    Some(Coding::new(system, code))
}

/// Every Coding in `resource`, in document order, with the path it sits at.
///
/// The root path is the resource type. Field access appends `.field`; array
/// items share their field's path. Nested resources (contained, Bundle
/// entries) are walked like any other object.
pub fn collect_codings(resource: &Value) -> Vec<FoundCoding> {
    let root = resource_type(resource).unwrap_or_default().to_string();
    let mut found = Vec::new();
    let mut stack: Vec<(&Value, String)> = vec![(resource, root)];

    while let Some((node, path)) = stack.pop() {
        match node {
            Value::Object(fields) => {
                if let Some(coding) = as_coding(node) {
                    found.push(FoundCoding {
                        path: path.clone(),
                        coding,
                    });
                }
                for (key, child) in fields.iter().rev() {
                    stack.push((child, child_path(&path, key)));
                }
            }
            Value::Array(items) => {
                for item in items.iter().rev() {
                    stack.push((item, path.clone()));
                }
            }
            _ => {}
        }
    }

    found
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// The instances to check in a document: the document itself, or for a
/// Bundle every `entry.resource`, expanding nested Bundles.
pub fn instances(document: &Value) -> Vec<&Value> {
    let mut out = Vec::new();
    let mut pending = vec![document];

    while let Some(current) = pending.pop() {
        if resource_type(current) == Some("Bundle") {
            let entries = as_list(current.get("entry"));
            for entry in entries.into_iter().rev() {
                if let Some(resource) = entry.get("resource").filter(|r| r.is_object()) {
                    pending.push(resource);
                }
            }
        } else {
            out.push(current);
        }
    }

    out
}
