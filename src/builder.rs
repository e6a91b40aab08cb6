//! The semantic-action layer the grammar drives: transient builder
//! values produced by one reduction each, converted on demand into
//! engine tree nodes.
//!
//! Identifier resolution is deferred on purpose. At the moment an
//! identifier token is reduced, the grammar cannot always know whether
//! it names a dataset or a symbolic constant; the decision is made
//! when the surrounding production asks for a concrete tree node, by
//! picking one of the three `make_*` operations.

use crate::engine::ExprNode;
use crate::error::ExprError;
use crate::store::DatasetStore;
use crate::value::{Complex32, Complex64, LiteralValue};

/// How a held name should be interpreted when a tree node is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolve {
    /// The name must be a dataset; never falls back.
    ArrayOnly,
    /// The held value is a literal, even if the text names a dataset.
    LiteralOnly,
    /// Dataset first, then symbolic constant, then fail.
    PreferArrayThenLiteral,
}

/// The value one grammar reduction produces: a tagged literal or a
/// not-yet-resolved identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum BuilderNode {
    Literal(LiteralValue),
    Name(String),
}

impl BuilderNode {
    pub fn bool(value: bool) -> Self {
        BuilderNode::Literal(LiteralValue::Bool(value))
    }

    pub fn int(value: i64) -> Self {
        BuilderNode::Literal(LiteralValue::Int(value))
    }

    pub fn float(value: f32) -> Self {
        BuilderNode::Literal(LiteralValue::Float(value))
    }

    pub fn double(value: f64) -> Self {
        BuilderNode::Literal(LiteralValue::Double(value))
    }

    pub fn complex(value: Complex32) -> Self {
        BuilderNode::Literal(LiteralValue::Complex(value))
    }

    pub fn dcomplex(value: Complex64) -> Self {
        BuilderNode::Literal(LiteralValue::DComplex(value))
    }

    pub fn text(value: impl Into<String>) -> Self {
        BuilderNode::Literal(LiteralValue::Text(value.into()))
    }

    pub fn name(name: impl Into<String>) -> Self {
        BuilderNode::Name(name.into())
    }

    /// The held name must be a dataset. `UnknownDataset` if the store
    /// has no dataset of that name; no constant fallback.
    pub fn make_lattice_node(&self, store: &dyn DatasetStore) -> Result<ExprNode, ExprError> {
        self.resolve(Resolve::ArrayOnly, store)
    }

    /// A scalar-literal tree node of the tagged type. A held name
    /// becomes a text literal, no matter what it might also name.
    pub fn make_literal_node(&self) -> ExprNode {
        match self {
            BuilderNode::Literal(value) => ExprNode::literal(value.clone()),
            BuilderNode::Name(name) => ExprNode::literal(LiteralValue::Text(name.clone())),
        }
    }

    /// Ambiguous bare identifier: dataset if the store knows it, else
    /// a symbolic constant, else `UnresolvedIdentifier`.
    pub fn make_litlatt_node(&self, store: &dyn DatasetStore) -> Result<ExprNode, ExprError> {
        self.resolve(Resolve::PreferArrayThenLiteral, store)
    }

    /// Apply the held function/operator name to already-built argument
    /// trees. Arity is exactly `args.len()`, supplied by the matched
    /// production; no inference happens here.
    pub fn make_func_node(&self, args: Vec<ExprNode>) -> Result<ExprNode, ExprError> {
        match self.held_name() {
            Some(name) => ExprNode::apply(name, args),
            None => Err(ExprError::UnknownFunction {
                name: self.render(),
                arity: args.len(),
            }),
        }
    }

    /// The single resolution routine behind the three `make_*` forms.
    fn resolve(&self, policy: Resolve, store: &dyn DatasetStore) -> Result<ExprNode, ExprError> {
        if policy == Resolve::LiteralOnly {
            return Ok(self.make_literal_node());
        }
        let name = match self.held_name() {
            Some(name) => name,
            // A non-text literal carries no name to resolve.
            None => {
                return match policy {
                    Resolve::ArrayOnly => Err(ExprError::UnknownDataset(self.render())),
                    _ => Ok(self.make_literal_node()),
                };
            }
        };
        if let Some(dataset) = store.resolve(name) {
            return Ok(ExprNode::dataset(dataset));
        }
        match policy {
            Resolve::ArrayOnly => Err(ExprError::UnknownDataset(name.to_string())),
            _ => ExprNode::constant(name)
                .ok_or_else(|| ExprError::UnresolvedIdentifier(name.to_string())),
        }
    }

    fn held_name(&self) -> Option<&str> {
        match self {
            BuilderNode::Name(name) => Some(name),
            BuilderNode::Literal(LiteralValue::Text(text)) => Some(text),
            BuilderNode::Literal(_) => None,
        }
    }

    fn render(&self) -> String {
        match self {
            BuilderNode::Name(name) => name.clone(),
            BuilderNode::Literal(value) => value.to_string(),
        }
    }
}
