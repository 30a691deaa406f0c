//! The document cursors.
//!
//! A single "current node" that nested encode/decode calls swap in and out.
//! The caller keeps the parent on its own stack frame between `enter` and
//! `leave`, so recursion through nested objects needs no explicit stack.
//!
//! - [`DocumentCursor`] owns the node it builds during a save.
//! - [`NodeCursor`] borrows a node of the parsed document during a load.

use std::mem;

use super::value::Value;

#[derive(Debug)]
pub struct DocumentCursor {
    node: Value,
}

impl DocumentCursor {
    /// A cursor positioned on a fresh, empty object node.
    pub fn new() -> Self {
        Self::at(Value::empty_map())
    }

    /// A cursor positioned on `node`.
    pub fn at(node: Value) -> Self {
        Self { node }
    }

    pub fn node(&self) -> &Value {
        &self.node
    }

    /// Makes `node` current and returns the previous node.
    #[must_use = "the parent node must be restored with `leave`"]
    pub fn enter(&mut self, node: Value) -> Value {
        mem::replace(&mut self.node, node)
    }

    /// Restores `parent` and returns the node that was current.
    pub fn leave(&mut self, parent: Value) -> Value {
        mem::replace(&mut self.node, parent)
    }

    /// Inserts a named child into the current node.
    ///
    /// An existing child with the same name is replaced in place. A scalar
    /// current node is promoted to an empty object first.
    pub fn insert(&mut self, name: &str, value: Value) {
        if !matches!(self.node, Value::Map(_)) {
            self.node = Value::empty_map();
        }
        if let Value::Map(entries) = &mut self.node {
            match entries.iter_mut().find(|(key, _)| key == name) {
                Some((_, slot)) => *slot = value,
                None => entries.push((name.to_owned(), value)),
            }
        }
    }

    /// Looks up a named child of the current node.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.node.get(name)
    }

    pub fn into_node(self) -> Value {
        self.node
    }
}

impl Default for DocumentCursor {
    fn default() -> Self {
        Self::new()
    }
}

static EMPTY: Value = Value::Map(Vec::new());

/// Read-side cursor over a parsed document.
#[derive(Debug, Clone, Copy)]
pub struct NodeCursor<'d> {
    node: &'d Value,
}

impl<'d> NodeCursor<'d> {
    /// A cursor positioned on `node`.
    pub fn at(node: &'d Value) -> Self {
        Self { node }
    }

    pub fn node(&self) -> &'d Value {
        self.node
    }

    /// Makes `node` current and returns the previous node.
    #[must_use = "the parent node must be restored with `leave`"]
    pub fn enter(&mut self, node: &'d Value) -> &'d Value {
        mem::replace(&mut self.node, node)
    }

    /// Restores `parent`.
    pub fn leave(&mut self, parent: &'d Value) {
        self.node = parent;
    }

    /// Looks up a named child of the current node.
    ///
    /// The child borrows the document, not the cursor.
    pub fn get(&self, name: &str) -> Option<&'d Value> {
        self.node.get(name)
    }
}

impl Default for NodeCursor<'_> {
    /// A cursor positioned on an empty object node.
    fn default() -> Self {
        Self::at(&EMPTY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_same_name() {
        let mut cursor = DocumentCursor::new();
        cursor.insert("a", Value::U64(1));
        cursor.insert("b", Value::U64(2));
        cursor.insert("a", Value::U64(3));
        assert_eq!(
            cursor.into_node(),
            Value::Map(vec![("a".into(), Value::U64(3)), ("b".into(), Value::U64(2))])
        );
    }

    #[test]
    fn enter_and_leave_nest() {
        let mut cursor = DocumentCursor::new();
        cursor.insert("top", Value::Bool(true));

        let parent = cursor.enter(Value::empty_map());
        cursor.insert("inner", Value::U64(5));
        let child = cursor.leave(parent);
        cursor.insert("child", child);

        let root = cursor.into_node();
        assert_eq!(root.get("top"), Some(&Value::Bool(true)));
        assert_eq!(
            root.get("child").and_then(|c| c.get("inner")),
            Some(&Value::U64(5))
        );
    }

    #[test]
    fn node_cursor_borrows_document() {
        let root = Value::Map(vec![(
            "child".into(),
            Value::Map(vec![("inner".into(), Value::U64(5))]),
        )]);
        let mut cursor = NodeCursor::default();
        assert_eq!(cursor.get("child"), None);

        let outer = cursor.enter(&root);
        let child = cursor.get("child").unwrap();
        let parent = cursor.enter(child);
        assert_eq!(cursor.get("inner"), Some(&Value::U64(5)));
        cursor.leave(parent);
        assert!(std::ptr::eq(cursor.node(), &root));
        cursor.leave(outer);
        assert_eq!(cursor.node(), &Value::empty_map());
    }

    #[test]
    fn scalar_node_is_promoted_on_insert() {
        let mut cursor = DocumentCursor::at(Value::U64(9));
        cursor.insert("x", Value::Null);
        assert_eq!(cursor.get("x"), Some(&Value::Null));
    }
}
