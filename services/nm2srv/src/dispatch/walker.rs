//! JSON document flattening
//!
//! ```text
//!   topic  mbdetnrs/1.0/sensors/devices
//!   body   {"members@count": 2, "members": [{"@id": ".../devices/a"}, ...]}
//!
//!   mbdetnrs/1.0/sensors/devices/members@count       -> 2
//!   mbdetnrs/1.0/sensors/devices/members/0/@id       -> ".../devices/a"
//! ```
//!
//! Object members keep document order (`serde_json` with `preserve_order`).

use serde_json::Value;
use tracing::warn;

/// Nesting limit for a single payload
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct PathWalker {
    max_depth: usize,
}

impl Default for PathWalker {
    fn default() -> Self {
        Self::new(MAX_DEPTH)
    }
}

impl PathWalker {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Visit every leaf under `root`, returning the number of leaves visited
    ///
    /// Leaves are anything that is not an object or array, `null` included;
    /// empty containers produce nothing.
    pub fn walk<F>(&self, root: &str, value: &Value, visit: &mut F) -> usize
    where
        F: FnMut(&str, &Value),
    {
        let mut path = String::with_capacity(root.len() + 64);
        path.push_str(root);
        let mut visited = 0;
        self.walk_inner(&mut path, value, 0, visit, &mut visited);
        visited
    }

    fn walk_inner<F>(
        &self,
        path: &mut String,
        value: &Value,
        depth: usize,
        visit: &mut F,
        visited: &mut usize,
    ) where
        F: FnMut(&str, &Value),
    {
        match value {
            Value::Object(map) => {
                if depth >= self.max_depth {
                    warn!("Payload nested deeper than {} at {}, truncated", self.max_depth, path);
                    return;
                }
                for (key, child) in map {
                    let len = path.len();
                    path.push('/');
                    path.push_str(key);
                    self.walk_inner(path, child, depth + 1, visit, visited);
                    path.truncate(len);
                }
            },
            Value::Array(items) => {
                if depth >= self.max_depth {
                    warn!("Payload nested deeper than {} at {}, truncated", self.max_depth, path);
                    return;
                }
                let mut index = itoa::Buffer::new();
                for (i, child) in items.iter().enumerate() {
                    let len = path.len();
                    path.push('/');
                    path.push_str(index.format(i));
                    self.walk_inner(path, child, depth + 1, visit, visited);
                    path.truncate(len);
                }
            },
            leaf => {
                *visited += 1;
                visit(path.as_str(), leaf);
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use serde_json::json;

    fn flatten(root: &str, value: &Value) -> Vec<(String, Value)> {
        let mut out = Vec::new();
        PathWalker::default().walk(root, value, &mut |path, leaf| {
            out.push((path.to_string(), leaf.clone()))
        });
        out
    }

    #[test]
    fn test_objects_and_arrays() {
        let doc = json!({
            "members@count": 2,
            "members": [{"@id": "/x/a"}, {"@id": "/x/b"}]
        });
        let paths = flatten("mbdetnrs/1.0/sensors/devices", &doc);
        assert_eq!(
            paths,
            vec![
                ("mbdetnrs/1.0/sensors/devices/members@count".to_string(), json!(2)),
                ("mbdetnrs/1.0/sensors/devices/members/0/@id".to_string(), json!("/x/a")),
                ("mbdetnrs/1.0/sensors/devices/members/1/@id".to_string(), json!("/x/b")),
            ]
        );
    }

    #[test]
    fn test_document_order_is_kept() {
        let doc: Value = serde_json::from_str(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        let keys: Vec<String> = flatten("t", &doc).into_iter().map(|(p, _)| p).collect();
        assert_eq!(keys, vec!["t/z", "t/a", "t/m"]);
    }

    #[test]
    fn test_scalar_root_and_null_leaves() {
        assert_eq!(flatten("t", &json!(5)), vec![("t".to_string(), json!(5))]);
        let leaves = flatten("t", &json!({"a": null, "b": {}, "c": []}));
        assert_eq!(leaves, vec![("t/a".to_string(), Value::Null)]);
    }

    #[test]
    fn test_depth_limit() {
        let doc = json!({"a": {"b": {"c": 1}}, "d": 2});
        let mut seen = Vec::new();
        let visited = PathWalker::new(2).walk("t", &doc, &mut |path, _| seen.push(path.to_string()));
        assert_eq!(visited, 1);
        assert_eq!(seen, vec!["t/d"]);
    }
}
