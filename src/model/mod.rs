//! Document tree model.
//!
//! This module defines the typed node tree the renderer consumes. Trees are
//! normally produced by the [`parse`](crate::parse) adapter, but they can be
//! built by hand or deserialized from JSON just as well.

mod node;
mod walk;

pub use node::*;
pub use walk::{traverse, walk, Event, Visitor, Walk};
