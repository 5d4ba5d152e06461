//! Traversal engine: visitor interface, cancellation, and the walker.

mod cancel;
mod visitor;
mod walker;

pub use cancel::CancelToken;
pub use visitor::{Flow, ParallelVisitor, Visitor};
pub use walker::{WalkError, WalkStats, Walker, traverse};
