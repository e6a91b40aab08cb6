//! Parser front end for expressions over named array datasets.
//!
//! An expression command such as `"a + sin(b) * 2"` is parsed into a
//! typed, lazily evaluable tree. Bare identifiers are resolved against
//! a [`store::DatasetStore`] while the tree is built; the tree itself
//! stays unevaluated until [`engine::ExprNode::eval`] is called.

pub mod builder;
pub mod engine;
pub mod error;
pub mod parser;
pub mod store;
pub mod value;

pub use builder::{BuilderNode, Resolve};
pub use engine::ExprNode;
pub use error::{ExprError, Position};
pub use store::{Dataset, DatasetStore, MemoryStore};
pub use value::{ArrayValue, Complex32, Complex64, DataType, LiteralValue};

// ── Core API ───────────────────────────────────────────────────────

/// Parse an expression command into an unevaluated tree.
///
/// Datasets named in the expression are resolved from `store` during
/// the parse, so the returned node already knows its element type and
/// shape. Each call is independent; parsing the same text twice gives
/// two structurally equal but separate trees.
///
/// ```
/// use imexpr::{command, ArrayValue, DataType, MemoryStore};
///
/// let store = MemoryStore::new();
/// let node = command("1 + 2", &store).unwrap();
/// assert_eq!(node.dtype(), DataType::Int);
/// assert_eq!(node.eval().unwrap(), ArrayValue::Int(vec![3]));
/// ```
pub fn command(input: &str, store: &dyn DatasetStore) -> Result<ExprNode, ExprError> {
    parser::parse(input, store)
}

#[cfg(test)]
mod tests;
