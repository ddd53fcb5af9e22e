pub mod nodes;
pub mod walker;

pub use nodes::*;
pub use walker::{walk, VisitFlow, Visitor};
