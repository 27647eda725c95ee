//! Translation of operations into REST requests.
//!
//! RESTCONF addressing: fields are path nodes, keyed list elements are
//! `list=k1,k2`, and leaf-list entries are `list=value`. Writes PATCH the
//! parent node with the value wrapped under its name; whole-list replacements
//! use PUT so entries missing from want disappear; removals DELETE the node.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{DeviceError, ReconcileError, Result};
use crate::reconciler::{DefaultOrdering, Operation, OperationKind, OrderingHook};
use crate::schema::ResourceDescriptor;
use crate::tree::{PathSegment, TreePath};

/// HTTP methods used against the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// Read.
    Get,
    /// Merge.
    Patch,
    /// Replace.
    Put,
    /// Delete.
    Delete,
}

/// A request ready to be sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestRequest {
    /// Method.
    pub method: HttpMethod,
    /// URL path relative to the device base URL.
    pub path: String,
    /// JSON body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Maps reconciler operations to device requests.
pub trait RequestTranslator: Send + Sync {
    /// Translates ordered operations for one resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource has no REST binding or an operation
    /// cannot be addressed.
    fn translate(
        &self,
        resource: &ResourceDescriptor,
        operations: &[Operation],
    ) -> Result<Vec<RestRequest>>;

    /// Ordering the reconciler should use for this translator's resources.
    fn ordering(&self) -> &dyn OrderingHook {
        &DefaultOrdering
    }
}

/// RESTCONF translator.
#[derive(Debug, Default, Clone, Copy)]
pub struct RestconfTranslator;

impl RestRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            path: path.into(),
            body,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path, None)
    }
}

impl RequestTranslator for RestconfTranslator {
    fn translate(
        &self,
        resource: &ResourceDescriptor,
        operations: &[Operation],
    ) -> Result<Vec<RestRequest>> {
        let rest = resource.rest.as_ref().ok_or_else(|| DeviceError::Unbound {
            resource: resource.name.clone(),
        })?;
        let base = Target {
            path: rest.path.trim_end_matches('/'),
            list_name: rest.list_name.as_deref(),
        };

        operations.iter().map(|op| base.request(op)).collect()
    }
}

/// Where a resource lives.
struct Target<'a> {
    path: &'a str,
    list_name: Option<&'a str>,
}

impl Target<'_> {
    fn request(&self, op: &Operation) -> Result<RestRequest> {
        let value = op.value.clone().unwrap_or_default();

        match op.kind {
            OperationKind::Remove => Ok(RestRequest::new(
                HttpMethod::Delete,
                self.url(&op.path, Some(&value))?,
                None,
            )),
            OperationKind::Replace if value.is_array() => {
                let url = match (op.path.is_root(), self.list_name) {
                    (true, Some(list_name)) => format!("{}/{list_name}", self.path),
                    _ => self.url(&op.path, None)?,
                };
                Ok(RestRequest::new(
                    HttpMethod::Put,
                    url,
                    Some(self.wrap(&op.path, value)),
                ))
            }
            OperationKind::Add | OperationKind::Replace => {
                let container = Self::container_of(&op.path);
                Ok(RestRequest::new(
                    HttpMethod::Patch,
                    self.url(&container, None)?,
                    Some(self.wrap(&op.path, value)),
                ))
            }
        }
    }

    /// The node a write is sent to: the parent of a field, or the parent of
    /// the list holding an element.
    fn container_of(path: &TreePath) -> TreePath {
        let Some(parent) = path.parent() else {
            return TreePath::root();
        };
        match path.last() {
            Some(PathSegment::Key(_) | PathSegment::Index(_)) => {
                parent.parent().unwrap_or_else(TreePath::root)
            }
            _ => parent,
        }
    }

    /// Wraps `value` under the name of the node `path` points at.
    fn wrap(&self, path: &TreePath, value: Value) -> Value {
        let element = matches!(path.last(), Some(PathSegment::Key(_) | PathSegment::Index(_)));
        let name = if element {
            self.list_name_at(path.segments().len() - 1, path)
        } else {
            match path.last() {
                Some(PathSegment::Field(name)) => Some(name.as_str()),
                _ => self.list_name.filter(|_| value.is_array()),
            }
        };

        let value = if element { Value::Array(vec![value]) } else { value };
        match name {
            Some(name) => Value::Object(Map::from_iter([(name.to_string(), value)])),
            None => value,
        }
    }

    /// Name of the list whose element sits at `index` in `path`.
    fn list_name_at<'p>(&'p self, index: usize, path: &'p TreePath) -> Option<&'p str> {
        match index.checked_sub(1).map(|i| &path.segments()[i]) {
            Some(PathSegment::Field(name)) => Some(name.as_str()),
            _ => self.list_name,
        }
    }

    fn url(&self, path: &TreePath, hint: Option<&Value>) -> Result<String> {
        let mut url = self.path.to_string();

        for (i, segment) in path.segments().iter().enumerate() {
            match segment {
                PathSegment::Field(name) => {
                    url.push('/');
                    url.push_str(name);
                }
                PathSegment::Key(key) => {
                    if i == 0 {
                        url.push('/');
                        url.push_str(self.root_list(path)?);
                    }
                    let values: Vec<String> = key.fields().iter().map(|(_, v)| encode(v)).collect();
                    url.push('=');
                    url.push_str(&values.join(","));
                }
                PathSegment::Index(_) => match hint.filter(|v| !v.is_object() && !v.is_array()) {
                    Some(value) if i + 1 == path.len() => {
                        if i == 0 {
                            url.push('/');
                            url.push_str(self.root_list(path)?);
                        }
                        url.push('=');
                        url.push_str(&encode(value));
                    }
                    _ => {
                        return Err(unresolved(
                            path,
                            "list entry without key fields cannot be addressed",
                        ));
                    }
                },
            }
        }

        Ok(url)
    }

    fn root_list(&self, path: &TreePath) -> Result<&str> {
        self.list_name
            .ok_or_else(|| unresolved(path, "root list has no list_name"))
    }
}

fn unresolved(path: &TreePath, reason: &str) -> crate::error::SonicError {
    ReconcileError::UnresolvedPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Percent-encodes a key value for use in a URL path.
fn encode(value: &Value) -> String {
    let raw = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~' | b':') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Get => "GET",
            Self::Patch => "PATCH",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for RestRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if let Some(body) = &self.body {
            write!(f, " {body}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ElementKey;
    use serde_json::json;

    fn interfaces() -> ResourceDescriptor {
        serde_yaml::from_str(
            r"
name: interfaces
rest:
  path: /restconf/data/sonic-port:sonic-port/PORT
  list_name: PORT_LIST
schema:
  type: list
  key: [name]
  element:
    type: dict
    fields:
      name: { type: scalar, kind: string }
      mtu: { type: scalar, kind: int }
      tags: { type: list, element: { type: scalar, kind: string } }
",
        )
        .expect("descriptor")
    }

    fn port(name: &str) -> TreePath {
        let key = ElementKey::extract(&json!({ "name": name }), &[String::from("name")])
            .expect("key");
        TreePath::root().key(key)
    }

    fn translate(ops: &[Operation]) -> Vec<RestRequest> {
        RestconfTranslator
            .translate(&interfaces(), ops)
            .expect("translate")
    }

    #[test]
    fn test_replace_field_patches_element() {
        let op = Operation::replace(port("Ethernet0").field("mtu"), json!(9216));
        let requests = translate(&[op]);
        assert_eq!(
            requests,
            vec![RestRequest::new(
                HttpMethod::Patch,
                "/restconf/data/sonic-port:sonic-port/PORT/PORT_LIST=Ethernet0",
                Some(json!({ "mtu": 9216 })),
            )]
        );
    }

    #[test]
    fn test_add_element_patches_list_parent() {
        let element = json!({ "name": "Ethernet4", "mtu": 1500 });
        let requests = translate(&[Operation::add(port("Ethernet4"), element.clone())]);
        assert_eq!(requests[0].method, HttpMethod::Patch);
        assert_eq!(requests[0].path, "/restconf/data/sonic-port:sonic-port/PORT");
        assert_eq!(requests[0].body, Some(json!({ "PORT_LIST": [element] })));
    }

    #[test]
    fn test_remove_element_and_leaf_list_entry() {
        let requests = translate(&[
            Operation::remove(port("Ethernet0/1"), json!({ "name": "Ethernet0/1" })),
            Operation::remove(port("Ethernet8").field("tags").index(1), json!("blue")),
        ]);
        assert_eq!(
            requests[0].path,
            "/restconf/data/sonic-port:sonic-port/PORT/PORT_LIST=Ethernet0%2F1"
        );
        assert_eq!(requests[0].method, HttpMethod::Delete);
        assert_eq!(
            requests[1].path,
            "/restconf/data/sonic-port:sonic-port/PORT/PORT_LIST=Ethernet8/tags=blue"
        );
    }

    #[test]
    fn test_whole_list_replace_uses_put() {
        let requests = translate(&[Operation::replace(
            port("Ethernet0").field("tags"),
            json!(["a", "b"]),
        )]);
        assert_eq!(requests[0].method, HttpMethod::Put);
        assert_eq!(
            requests[0].path,
            "/restconf/data/sonic-port:sonic-port/PORT/PORT_LIST=Ethernet0/tags"
        );
        assert_eq!(requests[0].body, Some(json!({ "tags": ["a", "b"] })));
    }

    #[test]
    fn test_root_list_replace_uses_put_on_list_node() {
        let ports = json!([{ "name": "Ethernet0", "mtu": 1500 }]);
        let requests = translate(&[Operation::replace(TreePath::root(), ports.clone())]);
        assert_eq!(
            requests,
            vec![RestRequest::new(
                HttpMethod::Put,
                "/restconf/data/sonic-port:sonic-port/PORT/PORT_LIST",
                Some(json!({ "PORT_LIST": ports })),
            )]
        );
    }

    #[test]
    fn test_unaddressable_entry() {
        let op = Operation::remove(TreePath::root().index(0), json!({ "mtu": 1500 }));
        assert!(RestconfTranslator.translate(&interfaces(), &[op]).is_err());
    }

    #[test]
    fn test_unbound_resource() {
        let mut resource = interfaces();
        resource.rest = None;
        let err = RestconfTranslator
            .translate(&resource, &[])
            .expect_err("unbound");
        assert!(err.to_string().contains("no REST binding"));
    }
}
