//! Depth-first Enter/Exit traversal of a node tree.
//!
//! The walk is iterative, so deeply nested trees do not grow the call stack.
//! Every node produces an [`Event::Enter`] before its children and an
//! [`Event::Exit`] after them; leaves get both events back to back.

use super::Node;

/// A traversal signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    /// Fired before the node's children are visited.
    Enter(&'a Node),
    /// Fired after the node's children are visited.
    Exit(&'a Node),
}

impl<'a> Event<'a> {
    /// The node this event refers to.
    pub fn node(&self) -> &'a Node {
        match self {
            Event::Enter(node) | Event::Exit(node) => node,
        }
    }

    pub fn is_enter(&self) -> bool {
        matches!(self, Event::Enter(_))
    }
}

/// Iterator over the events of a tree walk.
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    root: Option<&'a Node>,
    stack: Vec<(&'a Node, usize)>,
}

/// Walk `root` in document order.
pub fn walk(root: &Node) -> Walk<'_> {
    Walk {
        root: Some(root),
        stack: Vec::new(),
    }
}

impl Walk<'_> {
    /// Number of nodes currently entered but not yet exited.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(root) = self.root.take() {
            self.stack.push((root, 0));
            return Some(Event::Enter(root));
        }

        let top = self.stack.last_mut()?;
        let node: &'a Node = top.0;
        if top.1 < node.children.len() {
            let child = &node.children[top.1];
            top.1 += 1;
            self.stack.push((child, 0));
            Some(Event::Enter(child))
        } else {
            self.stack.pop();
            Some(Event::Exit(node))
        }
    }
}

/// Receives the events of a tree walk.
pub trait Visitor<'a> {
    fn enter(&mut self, node: &'a Node);
    fn exit(&mut self, node: &'a Node);
}

/// Drive `visitor` over every event of `root`.
pub fn traverse<'a, V>(root: &'a Node, visitor: &mut V)
where
    V: Visitor<'a> + ?Sized,
{
    for event in walk(root) {
        match event {
            Event::Enter(node) => visitor.enter(node),
            Event::Exit(node) => visitor.exit(node),
        }
    }
}
