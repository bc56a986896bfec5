pub mod nodes;
pub mod visitor;

pub use nodes::*;
pub use visitor::{walk_expr, UntypedExprs, Visitor};
