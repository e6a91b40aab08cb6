use std::fmt;

use crate::value::DataType;

/// A 0-based position in the source text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// 0-based line number
    pub line: usize,
    /// 0-based column (character offset within the line)
    pub column: usize,
    /// 0-based absolute byte offset from the start of input
    pub offset: usize,
}

/// Everything that can go wrong while building an expression tree.
///
/// All variants surface directly to the `command` caller; nothing is
/// retried or recovered. A failed parse produces no tree at all.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprError {
    /// Malformed input text, with span information (begin..end).
    Parse {
        message: String,
        /// Start of the offending region
        begin: Position,
        /// End of the offending region (exclusive)
        end: Position,
    },
    /// A dataset-only name lookup found no dataset of that name.
    UnknownDataset(String),
    /// A bare identifier is neither a dataset nor a known constant.
    UnresolvedIdentifier(String),
    /// No function of this name takes this many arguments.
    UnknownFunction { name: String, arity: usize },
    /// The function exists but rejects these operand types.
    TypeMismatch {
        func: String,
        operands: Vec<DataType>,
    },
    /// Non-scalar operands with different shapes cannot be combined.
    ShapeMismatch {
        left: Vec<usize>,
        right: Vec<usize>,
    },
    /// Integer arithmetic left the 64-bit range during evaluation.
    Overflow { func: String },
}

impl ExprError {
    pub fn syntax(message: String, begin: Position, end: Position) -> Self {
        ExprError::Parse {
            message,
            begin,
            end,
        }
    }
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::Parse {
                message,
                begin,
                end,
            } => {
                if begin == end {
                    write!(f, "{}:{}: {}", begin.line, begin.column, message)
                } else {
                    write!(
                        f,
                        "{}:{}-{}:{}: {}",
                        begin.line, begin.column, end.line, end.column, message
                    )
                }
            }
            ExprError::UnknownDataset(name) => write!(f, "Unknown dataset '{}'", name),
            ExprError::UnresolvedIdentifier(name) => {
                write!(f, "'{}' is neither a dataset nor a known constant", name)
            }
            ExprError::UnknownFunction { name, arity } => {
                write!(f, "Unknown function '{}' with {} argument(s)", name, arity)
            }
            ExprError::TypeMismatch { func, operands } => {
                write!(f, "'{}' cannot be applied to (", func)?;
                for (i, dtype) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", dtype)?;
                }
                write!(f, ")")
            }
            ExprError::ShapeMismatch { left, right } => {
                write!(f, "Shapes {:?} and {:?} do not conform", left, right)
            }
            ExprError::Overflow { func } => {
                write!(f, "Integer overflow in '{}'", func)
            }
        }
    }
}

impl std::error::Error for ExprError {}
