// Small helpers over `roxmltree` for the XML-speaking device APIs.
//
// Both PAN-OS and Junos answer with loosely structured XML. The adapters
// only ever need "first descendant with this tag" lookups plus a generic
// element-to-JSON conversion for list entries.

use roxmltree::{Document, Node};
use serde_json::{Map, Value};

use crate::error::Error;

/// Parse an XML body, mapping syntax errors to [`Error::Parse`].
pub(crate) fn parse(body: &str) -> Result<Document<'_>, Error> {
    Document::parse(body).map_err(|e| Error::parse(format!("invalid XML: {e}"), body))
}

/// First descendant element (document order) with the given tag name.
pub(crate) fn find<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.descendants()
        .find(|n| n.is_element() && n.has_tag_name(tag))
}

/// Follow a `/`-separated path of descendant lookups, e.g. `"peer-info/state"`.
pub(crate) fn find_path<'a, 'input>(node: Node<'a, 'input>, path: &str) -> Option<Node<'a, 'input>> {
    path.split('/').try_fold(node, |current, tag| find(current, tag))
}

/// Trimmed text of the element at `path`, if present and non-empty.
pub(crate) fn text_at(node: Node<'_, '_>, path: &str) -> Option<String> {
    find_path(node, path)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

/// Like [`text_at`] but a missing element is a parse error.
pub(crate) fn require_text(node: Node<'_, '_>, path: &str, body: &str) -> Result<String, Error> {
    text_at(node, path).ok_or_else(|| Error::parse(format!("missing <{path}>"), body))
}

/// Convert an element into a JSON object.
///
/// Attributes become `@name` keys (the PAN-OS REST convention), leaf children
/// become strings, nested children become objects, and repeated children
/// collapse into arrays.
pub(crate) fn element_to_record(node: Node<'_, '_>) -> Map<String, Value> {
    let mut record = Map::new();
    for attr in node.attributes() {
        record.insert(format!("@{}", attr.name()), Value::String(attr.value().to_owned()));
    }
    for child in node.children().filter(Node::is_element) {
        let key = child.tag_name().name().to_owned();
        let value = element_value(child);
        match record.get_mut(&key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                record.insert(key, value);
            }
        }
    }
    record
}

fn element_value(node: Node<'_, '_>) -> Value {
    let has_children = node.children().any(|c| c.is_element());
    if has_children || node.attributes().len() > 0 {
        Value::Object(element_to_record(node))
    } else {
        Value::String(node.text().map(str::trim).unwrap_or_default().to_owned())
    }
}
