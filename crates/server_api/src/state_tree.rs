use serde_json::{Map, Value};
use shared::protocol::path_segments;
use uuid::Uuid;

/// Hierarchical JSON state addressed by slash-separated paths.
///
/// Empty objects and nulls are never stored: writing null deletes, and a delete prunes
/// parents left empty, so "missing" and "null" read the same.
#[derive(Debug, Clone, Default)]
pub struct StateTree {
    root: Value,
}

impl StateTree {
    pub fn new() -> Self {
        Self { root: Value::Null }
    }

    pub fn get(&self, path: &str) -> Value {
        let mut node = &self.root;
        for segment in path_segments(path) {
            match node.get(segment) {
                Some(child) => node = child,
                None => return Value::Null,
            }
        }
        node.clone()
    }

    /// Replaces the node at `path`, creating (or overwriting non-object) ancestors.
    /// Nulls and empty objects nested inside `value` are dropped before storing.
    pub fn set(&mut self, path: &str, mut value: Value) {
        prune(&mut value);
        if is_empty(&value) {
            self.delete(path);
            return;
        }
        let segments = path_segments(path);
        let Some((last, parents)) = segments.split_last() else {
            self.root = value;
            return;
        };
        let mut node = &mut self.root;
        for segment in parents {
            node = ensure_object(node)
                .entry(segment.to_string())
                .or_insert(Value::Null);
        }
        ensure_object(node).insert(last.to_string(), value);
    }

    /// Removes the node at `path`. Returns whether anything was there.
    pub fn delete(&mut self, path: &str) -> bool {
        let segments = path_segments(path);
        if segments.is_empty() {
            let existed = !self.root.is_null();
            self.root = Value::Null;
            return existed;
        }
        let removed = remove_at(&mut self.root, &segments);
        if is_empty(&self.root) {
            self.root = Value::Null;
        }
        removed
    }

    /// Adds `value` as a new child of `path` under a generated key and returns the key.
    pub fn append(&mut self, path: &str, value: Value) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let segments = path_segments(path);
        let child = if segments.is_empty() {
            id.clone()
        } else {
            format!("{}/{id}", segments.join("/"))
        };
        self.set(&child, value);
        id
    }
}

/// True when a write at one path can change what a reader of the other path sees.
pub fn paths_overlap(a: &str, b: &str) -> bool {
    let a = path_segments(a);
    let b = path_segments(b);
    a.iter().zip(b.iter()).all(|(x, y)| x == y)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Removes null and empty-object members at every depth. Arrays are kept as they are.
fn prune(value: &mut Value) {
    if let Value::Object(map) = value {
        for child in map.values_mut() {
            prune(child);
        }
        map.retain(|_, child| !is_empty(child));
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just made an object"),
    }
}

fn remove_at(node: &mut Value, segments: &[&str]) -> bool {
    let Value::Object(map) = node else {
        return false;
    };
    let Some((first, rest)) = segments.split_first() else {
        return false;
    };
    if rest.is_empty() {
        return map.remove(*first).is_some();
    }
    let Some(child) = map.get_mut(*first) else {
        return false;
    };
    let removed = remove_at(child, rest);
    if is_empty(child) {
        map.remove(*first);
    }
    removed
}
