//! XML document checker over the record universe.
//!
//! The record types are also expressible as XML: elements named after
//! registry types, scalar fields as attributes, nested records and
//! collections as child elements. This checker walks a document, runs every
//! record element through the normal constructors and collects one
//! `(path, reason)` violation per failure instead of stopping at the first.
//! Only malformed XML itself is an error.

use std::fmt;

use serde_json::{Map, Value};
use xml::{Event, Parser};

use crate::normalize;
use crate::registry::{RecordSpec, REGISTRY};

#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub path: String,
    pub reason: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path={} Reason={}", self.path, self.reason)
    }
}

#[derive(Debug)]
pub enum XmlError {
    Parse(String),
    NoRootElement,
}

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(detail) => write!(f, "malformed XML: {}", detail),
            Self::NoRootElement => write!(f, "document has no root element"),
        }
    }
}

impl std::error::Error for XmlError {}

struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
    text: String,
}

fn build_tree(doc: &str) -> Result<XmlElement, XmlError> {
    let mut parser = Parser::new();
    parser.feed_str(doc);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    for event in parser {
        match event.map_err(|e| XmlError::Parse(e.to_string()))? {
            Event::ElementStart(tag) => {
                stack.push(XmlElement {
                    name: tag.name,
                    attributes: tag
                        .attributes
                        .into_iter()
                        .map(|((name, _ns), value)| (name, value))
                        .collect(),
                    children: Vec::new(),
                    text: String::new(),
                });
            }
            Event::ElementEnd(_) => {
                let element = match stack.pop() {
                    Some(e) => e,
                    None => continue,
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => {
                        root = Some(element);
                    }
                }
            }
            Event::Characters(text) | Event::CDATA(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            _ => {}
        }
    }
    root.ok_or(XmlError::NoRootElement)
}

/// Attribute text becomes the narrowest JSON scalar that holds it.
fn scalar_value(s: &str) -> Value {
    if let Ok(n) = s.parse::<u64>() {
        return Value::from(n);
    }
    if let Ok(n) = s.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(x) = s.parse::<f64>() {
        return Value::from(x);
    }
    match s {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(s.to_string()),
    }
}

fn element_value(element: &XmlElement) -> Value {
    let mut map = Map::new();
    for (name, value) in &element.attributes {
        map.insert(name.clone(), scalar_value(value));
    }
    for child in &element.children {
        let value = element_value(child);
        // repeated child names collect into an array
        match map.get_mut(&child.name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                map.insert(child.name.clone(), Value::Array(vec![first, value]));
            }
            None => {
                map.insert(child.name.clone(), value);
            }
        }
    }
    if map.is_empty() {
        let text = element.text.trim();
        if !text.is_empty() {
            return scalar_value(text);
        }
    }
    Value::Object(map)
}

fn spec_by_name(name: &str) -> Option<&'static RecordSpec> {
    REGISTRY.iter().find(|s| s.name == name)
}

fn check_record(spec: &RecordSpec, element: &XmlElement, path: &str, out: &mut Vec<Violation>) {
    let shaped = normalize::normalize(spec.kind, &element_value(element));
    if let Err(failure) = (spec.construct)(&shaped) {
        out.push(Violation {
            path: path.to_string(),
            reason: failure.to_string(),
        });
    }
}

/// Check every record element of `doc` and report all violations. A root
/// element named after a record type is checked directly; otherwise each
/// child of the root is expected to be a record element, and unknown names
/// are violations of their own.
pub fn check_document(doc: &str) -> Result<Vec<Violation>, XmlError> {
    let root = build_tree(doc)?;
    let mut violations = Vec::new();

    if let Some(spec) = spec_by_name(&root.name) {
        check_record(spec, &root, &format!("/{}", root.name), &mut violations);
        return Ok(violations);
    }

    for (index, child) in root.children.iter().enumerate() {
        let path = format!("/{}/{}[{}]", root.name, child.name, index);
        match spec_by_name(&child.name) {
            Some(spec) => check_record(spec, child, &path, &mut violations),
            None => violations.push(Violation {
                path,
                reason: format!("unknown record element `{}`", child.name),
            }),
        }
    }
    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_document_has_no_violations() {
        let doc = r#"<platform>
            <cluster cores_per_cluster="4">
                <short_name name="C1"/>
                <frequency value="2000" unit="MHz"/>
            </cluster>
            <chiplet>
                <short_name name="G1"/>
                <ucie_interface mode="host"/>
            </chiplet>
        </platform>"#;
        assert_eq!(check_document(doc).unwrap(), Vec::new());
    }

    #[test]
    fn out_of_range_attribute_is_reported_with_path() {
        let doc = r#"<platform>
            <cluster cores_per_cluster="3">
                <short_name name="C1"/>
                <frequency value="2000"/>
            </cluster>
        </platform>"#;
        let violations = check_document(doc).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "/platform/cluster[0]");
        assert!(violations[0].reason.contains("cores_per_cluster"));
    }

    #[test]
    fn unknown_element_is_a_violation_not_an_error() {
        let doc = r#"<platform><mystery/></platform>"#;
        let violations = check_document(doc).unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].reason.contains("mystery"));
    }

    #[test]
    fn every_invalid_record_is_reported() {
        let doc = r#"<platform>
            <cluster cores_per_cluster="4">
                <short_name name="C1"/>
                <frequency value="0"/>
            </cluster>
            <can_bus>
                <short_name name="CAN0"/>
            </can_bus>
        </platform>"#;
        let violations = check_document(doc).unwrap();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].path, "/platform/cluster[0]");
        assert_eq!(violations[1].path, "/platform/can_bus[1]");
    }

    #[test]
    fn record_root_is_checked_directly() {
        let doc = r#"<ucie_interface mode="endpoint"/>"#;
        assert_eq!(check_document(doc).unwrap(), Vec::new());
    }

    #[test]
    fn repeated_children_become_collections() {
        let doc = r#"<platform>
            <can_bus baud_rate="500000">
                <short_name name="CAN0"/>
                <interface_refs>/IF1</interface_refs>
                <interface_refs>/IF2</interface_refs>
            </can_bus>
        </platform>"#;
        assert_eq!(check_document(doc).unwrap(), Vec::new());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(check_document("<platform><cluster></platform>").is_err());
        assert!(check_document("just text").is_err());
    }

    #[test]
    fn checks_a_document_loaded_from_disk() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"<platform><eth_switch><short_name name="SW0"/><interface_refs>/IF1</interface_refs></eth_switch></platform>"#
        )
        .unwrap();
        let doc = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(check_document(&doc).unwrap(), Vec::new());
    }
}
