//! The evaluation engine: lazy expression tree nodes, the function
//! table, type promotion, and whole-array evaluation.
//!
//! Tree nodes are built eagerly but evaluated only on `eval`. Every
//! node knows its element type and shape up front, so arity, operand
//! types, and shape conformance are all checked at build time.

use std::f64::consts;

use crate::error::ExprError;
use crate::store::Dataset;
use crate::value::{ArrayValue, Complex32, Complex64, DataType, LiteralValue};

/// One entry in the function table. Operators are functions under their
/// operator spelling; arity is part of the key, so `-` resolves to
/// negation with one argument and subtraction with two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Func {
    Pi,
    E,
    Neg,
    Not,
    Sin,
    Cos,
    Tan,
    Exp,
    Log,
    Sqrt,
    Abs,
    Floor,
    Ceil,
    Real,
    Imag,
    Conj,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Min,
    Max,
    Atan2,
}

fn lookup(name: &str, arity: usize) -> Option<Func> {
    use Func::*;
    let func = match (name, arity) {
        ("pi", 0) => Pi,
        ("e", 0) => E,
        ("-", 1) => Neg,
        ("!", 1) => Not,
        ("sin", 1) => Sin,
        ("cos", 1) => Cos,
        ("tan", 1) => Tan,
        ("exp", 1) => Exp,
        ("log", 1) => Log,
        ("sqrt", 1) => Sqrt,
        ("abs", 1) => Abs,
        ("floor", 1) => Floor,
        ("ceil", 1) => Ceil,
        ("real", 1) => Real,
        ("imag", 1) => Imag,
        ("conj", 1) => Conj,
        ("+", 2) => Add,
        ("-", 2) => Sub,
        ("*", 2) => Mul,
        ("/", 2) => Div,
        ("^", 2) | ("pow", 2) => Pow,
        ("==", 2) => Eq,
        ("!=", 2) => Ne,
        ("<", 2) => Lt,
        ("<=", 2) => Le,
        (">", 2) => Gt,
        (">=", 2) => Ge,
        ("&&", 2) => And,
        ("||", 2) => Or,
        ("min", 2) => Min,
        ("max", 2) => Max,
        ("atan2", 2) => Atan2,
        _ => return None,
    };
    Some(func)
}

/// An unevaluated expression tree node with a fixed element type and
/// shape. An empty shape is a scalar.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprNode {
    dtype: DataType,
    shape: Vec<usize>,
    kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq)]
enum NodeKind {
    Literal(LiteralValue),
    Dataset(Dataset),
    Apply {
        func: Func,
        name: String,
        args: Vec<ExprNode>,
    },
}

impl ExprNode {
    /// A scalar-literal node of the literal's tagged type.
    pub fn literal(value: LiteralValue) -> ExprNode {
        ExprNode {
            dtype: value.dtype(),
            shape: Vec::new(),
            kind: NodeKind::Literal(value),
        }
    }

    /// A node referencing a resolved dataset, typed and shaped by it.
    pub fn dataset(dataset: &Dataset) -> ExprNode {
        ExprNode {
            dtype: dataset.dtype(),
            shape: dataset.shape.clone(),
            kind: NodeKind::Dataset(dataset.clone()),
        }
    }

    /// The symbolic constants a bare identifier may fall back to when
    /// it does not name a dataset.
    pub fn constant(name: &str) -> Option<ExprNode> {
        let value = match name {
            "pi" => LiteralValue::Double(consts::PI),
            "e" => LiteralValue::Double(consts::E),
            _ => return None,
        };
        Some(ExprNode::literal(value))
    }

    /// Apply the named function/operator to already-built argument
    /// trees. Arity is `args.len()`; the table decides whether that
    /// (name, arity) pair exists, the type rules decide the result
    /// element type, and the shapes must conform.
    pub fn apply(name: &str, args: Vec<ExprNode>) -> Result<ExprNode, ExprError> {
        let func = lookup(name, args.len()).ok_or_else(|| ExprError::UnknownFunction {
            name: name.to_string(),
            arity: args.len(),
        })?;
        let dtype = result_type(func, name, &args)?;
        let shape = join_shapes(&args)?;
        Ok(ExprNode {
            dtype,
            shape,
            kind: NodeKind::Apply {
                func,
                name: name.to_string(),
                args,
            },
        })
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    /// Evaluate the whole tree into a flat buffer. Scalars broadcast
    /// against arrays element-wise; shapes were already checked when
    /// the tree was built.
    pub fn eval(&self) -> Result<ArrayValue, ExprError> {
        match &self.kind {
            NodeKind::Literal(value) => Ok(ArrayValue::from_literal(value)),
            NodeKind::Dataset(dataset) => Ok(dataset.values.clone()),
            NodeKind::Apply { func, name, args } => match args.len() {
                0 => eval_nullary(*func, name),
                1 => eval_unary(*func, name, self.dtype, args[0].eval()?),
                _ => eval_binary(*func, name, self.dtype, args[0].eval()?, args[1].eval()?),
            },
        }
    }
}

fn mismatch(name: &str, operands: &[DataType]) -> ExprError {
    ExprError::TypeMismatch {
        func: name.to_string(),
        operands: operands.to_vec(),
    }
}

/// Promoted type for two numeric operands; None if either side is
/// Bool or Text. Mixing real and complex takes the complex side,
/// widening to DComplex when the real side is Double.
fn promote(a: DataType, b: DataType) -> Option<DataType> {
    use DataType::*;
    let out = match (a, b) {
        (Int, Int) => Int,
        (Int, Float) | (Float, Int) | (Float, Float) => Float,
        (Int, Double)
        | (Double, Int)
        | (Float, Double)
        | (Double, Float)
        | (Double, Double) => Double,
        (Complex, Complex)
        | (Complex, Int)
        | (Int, Complex)
        | (Complex, Float)
        | (Float, Complex) => Complex,
        (DComplex, DComplex)
        | (DComplex, Int)
        | (Int, DComplex)
        | (DComplex, Float)
        | (Float, DComplex)
        | (DComplex, Double)
        | (Double, DComplex)
        | (DComplex, Complex)
        | (Complex, DComplex)
        | (Complex, Double)
        | (Double, Complex) => DComplex,
        _ => return None,
    };
    Some(out)
}

/// Common operand type for comparisons: Bool pairs compare as Bool,
/// numeric pairs compare in their promoted type.
fn comparison_type(a: DataType, b: DataType) -> Option<DataType> {
    if a == DataType::Bool && b == DataType::Bool {
        Some(DataType::Bool)
    } else {
        promote(a, b)
    }
}

fn result_type(func: Func, name: &str, args: &[ExprNode]) -> Result<DataType, ExprError> {
    use DataType::*;
    let types: Vec<DataType> = args.iter().map(|a| a.dtype()).collect();
    let err = || mismatch(name, &types);

    let out = match func {
        Func::Pi | Func::E => Double,

        Func::Neg => {
            if !types[0].is_numeric() {
                return Err(err());
            }
            types[0]
        }
        Func::Not => {
            if types[0] != Bool {
                return Err(err());
            }
            Bool
        }
        // Transcendentals take real operands; Int widens to Double.
        Func::Sin | Func::Cos | Func::Tan | Func::Exp | Func::Log | Func::Sqrt => match types[0] {
            Int | Double => Double,
            Float => Float,
            _ => return Err(err()),
        },
        Func::Abs => match types[0] {
            Int => Int,
            Float => Float,
            Double => Double,
            Complex => Float,
            DComplex => Double,
            _ => return Err(err()),
        },
        Func::Floor | Func::Ceil => match types[0] {
            Int => Int,
            Float => Float,
            Double => Double,
            _ => return Err(err()),
        },
        Func::Real | Func::Imag => match types[0] {
            Complex => Float,
            DComplex => Double,
            _ => return Err(err()),
        },
        Func::Conj => match types[0] {
            Complex => Complex,
            DComplex => DComplex,
            _ => return Err(err()),
        },

        Func::Add | Func::Sub | Func::Mul => promote(types[0], types[1]).ok_or_else(|| err())?,
        Func::Min | Func::Max => {
            let t = promote(types[0], types[1]).ok_or_else(|| err())?;
            if t.is_complex() {
                return Err(err());
            }
            t
        }
        // Int/Int division has fractional results, so it widens.
        Func::Div => {
            let t = promote(types[0], types[1]).ok_or_else(|| err())?;
            if t == Int {
                Double
            } else {
                t
            }
        }
        Func::Pow | Func::Atan2 => {
            let t = promote(types[0], types[1]).ok_or_else(|| err())?;
            if t.is_complex() {
                return Err(err());
            }
            if t == Int {
                Double
            } else {
                t
            }
        }

        Func::Eq | Func::Ne => {
            comparison_type(types[0], types[1]).ok_or_else(|| err())?;
            Bool
        }
        Func::Lt | Func::Le | Func::Gt | Func::Ge => {
            let t = promote(types[0], types[1]).ok_or_else(|| err())?;
            if t.is_complex() {
                return Err(err());
            }
            Bool
        }
        Func::And | Func::Or => {
            if types[0] != Bool || types[1] != Bool {
                return Err(err());
            }
            Bool
        }
    };
    Ok(out)
}

/// Scalars conform with everything; two non-scalar shapes must match.
fn join_shapes(args: &[ExprNode]) -> Result<Vec<usize>, ExprError> {
    let mut shape: Vec<usize> = Vec::new();
    for arg in args {
        if arg.shape.is_empty() {
            continue;
        }
        if shape.is_empty() {
            shape = arg.shape.clone();
        } else if shape != arg.shape {
            return Err(ExprError::ShapeMismatch {
                left: shape,
                right: arg.shape.clone(),
            });
        }
    }
    Ok(shape)
}

/// Element-wise zip with scalar broadcast. Shape conformance was
/// checked at build time, so lengths are equal or one side is 1.
fn zip2<T: Copy, R>(a: &[T], b: &[T], f: impl Fn(T, T) -> R) -> Vec<R> {
    if a.len() == 1 && b.len() != 1 {
        b.iter().map(|&y| f(a[0], y)).collect()
    } else if b.len() == 1 && a.len() != 1 {
        a.iter().map(|&x| f(x, b[0])).collect()
    } else {
        a.iter().zip(b.iter()).map(|(&x, &y)| f(x, y)).collect()
    }
}

/// Like `zip2`, for kernels that can fail per element. None if any
/// element fails.
fn zip2_checked<T: Copy, R>(a: &[T], b: &[T], f: impl Fn(T, T) -> Option<R>) -> Option<Vec<R>> {
    if a.len() == 1 && b.len() != 1 {
        b.iter().map(|&y| f(a[0], y)).collect()
    } else if b.len() == 1 && a.len() != 1 {
        a.iter().map(|&x| f(x, b[0])).collect()
    } else {
        a.iter().zip(b.iter()).map(|(&x, &y)| f(x, y)).collect()
    }
}

fn overflow(name: &str) -> ExprError {
    ExprError::Overflow {
        func: name.to_string(),
    }
}

fn cast_to(value: ArrayValue, to: DataType, name: &str) -> Result<ArrayValue, ExprError> {
    let from = value.dtype();
    value.cast(to).ok_or_else(|| mismatch(name, &[from]))
}

fn eval_nullary(func: Func, name: &str) -> Result<ArrayValue, ExprError> {
    match func {
        Func::Pi => Ok(ArrayValue::Double(vec![consts::PI])),
        Func::E => Ok(ArrayValue::Double(vec![consts::E])),
        _ => Err(mismatch(name, &[])),
    }
}

fn real_unary_f32(func: Func, x: f32) -> f32 {
    match func {
        Func::Sin => x.sin(),
        Func::Cos => x.cos(),
        Func::Tan => x.tan(),
        Func::Exp => x.exp(),
        Func::Log => x.ln(),
        _ => x.sqrt(),
    }
}

fn real_unary_f64(func: Func, x: f64) -> f64 {
    match func {
        Func::Sin => x.sin(),
        Func::Cos => x.cos(),
        Func::Tan => x.tan(),
        Func::Exp => x.exp(),
        Func::Log => x.ln(),
        _ => x.sqrt(),
    }
}

fn eval_unary(
    func: Func,
    name: &str,
    out: DataType,
    a: ArrayValue,
) -> Result<ArrayValue, ExprError> {
    use ArrayValue::*;
    let arg_type = a.dtype();
    match func {
        Func::Neg => match a {
            // i64::MIN has no negation.
            Int(v) => v
                .iter()
                .map(|&x| x.checked_neg())
                .collect::<Option<Vec<_>>>()
                .map(Int)
                .ok_or_else(|| overflow(name)),
            Float(v) => Ok(Float(v.iter().map(|&x| -x).collect())),
            Double(v) => Ok(Double(v.iter().map(|&x| -x).collect())),
            Complex(v) => Ok(Complex(v.iter().map(|&x| -x).collect())),
            DComplex(v) => Ok(DComplex(v.iter().map(|&x| -x).collect())),
            _ => Err(mismatch(name, &[arg_type])),
        },
        Func::Not => match a {
            Bool(v) => Ok(Bool(v.iter().map(|&x| !x).collect())),
            _ => Err(mismatch(name, &[arg_type])),
        },
        Func::Sin | Func::Cos | Func::Tan | Func::Exp | Func::Log | Func::Sqrt => {
            match cast_to(a, out, name)? {
                Float(v) => Ok(Float(v.iter().map(|&x| real_unary_f32(func, x)).collect())),
                Double(v) => Ok(Double(v.iter().map(|&x| real_unary_f64(func, x)).collect())),
                _ => Err(mismatch(name, &[arg_type])),
            }
        }
        Func::Abs => match a {
            Int(v) => v
                .iter()
                .map(|&x| x.checked_abs())
                .collect::<Option<Vec<_>>>()
                .map(Int)
                .ok_or_else(|| overflow(name)),
            Float(v) => Ok(Float(v.iter().map(|&x| x.abs()).collect())),
            Double(v) => Ok(Double(v.iter().map(|&x| x.abs()).collect())),
            Complex(v) => Ok(Float(v.iter().map(|x| x.abs()).collect())),
            DComplex(v) => Ok(Double(v.iter().map(|x| x.abs()).collect())),
            _ => Err(mismatch(name, &[arg_type])),
        },
        Func::Floor => match a {
            Int(v) => Ok(Int(v)),
            Float(v) => Ok(Float(v.iter().map(|&x| x.floor()).collect())),
            Double(v) => Ok(Double(v.iter().map(|&x| x.floor()).collect())),
            _ => Err(mismatch(name, &[arg_type])),
        },
        Func::Ceil => match a {
            Int(v) => Ok(Int(v)),
            Float(v) => Ok(Float(v.iter().map(|&x| x.ceil()).collect())),
            Double(v) => Ok(Double(v.iter().map(|&x| x.ceil()).collect())),
            _ => Err(mismatch(name, &[arg_type])),
        },
        Func::Real => match a {
            Complex(v) => Ok(Float(v.iter().map(|x| x.re).collect())),
            DComplex(v) => Ok(Double(v.iter().map(|x| x.re).collect())),
            _ => Err(mismatch(name, &[arg_type])),
        },
        Func::Imag => match a {
            Complex(v) => Ok(Float(v.iter().map(|x| x.im).collect())),
            DComplex(v) => Ok(Double(v.iter().map(|x| x.im).collect())),
            _ => Err(mismatch(name, &[arg_type])),
        },
        Func::Conj => match a {
            Complex(v) => Ok(Complex(v.iter().map(|x| x.conj()).collect())),
            DComplex(v) => Ok(DComplex(v.iter().map(|x| x.conj()).collect())),
            _ => Err(mismatch(name, &[arg_type])),
        },
        _ => Err(mismatch(name, &[arg_type])),
    }
}

fn eval_binary(
    func: Func,
    name: &str,
    out: DataType,
    a: ArrayValue,
    b: ArrayValue,
) -> Result<ArrayValue, ExprError> {
    use ArrayValue::*;
    let arg_types = [a.dtype(), b.dtype()];
    match func {
        Func::Add
        | Func::Sub
        | Func::Mul
        | Func::Div
        | Func::Pow
        | Func::Min
        | Func::Max
        | Func::Atan2 => {
            // Arithmetic computes in the promoted (result) type.
            let a = cast_to(a, out, name)?;
            let b = cast_to(b, out, name)?;
            match (a, b) {
                // Int arithmetic is checked: leaving the i64 range is
                // an error, never a wrap.
                (Int(x), Int(y)) => {
                    let f: fn(i64, i64) -> Option<i64> = match func {
                        Func::Add => |p, q| p.checked_add(q),
                        Func::Sub => |p, q| p.checked_sub(q),
                        Func::Mul => |p, q| p.checked_mul(q),
                        Func::Min => |p, q| Some(p.min(q)),
                        Func::Max => |p, q| Some(p.max(q)),
                        _ => return Err(mismatch(name, &arg_types)),
                    };
                    zip2_checked(&x, &y, f)
                        .map(Int)
                        .ok_or_else(|| overflow(name))
                }
                (Float(x), Float(y)) => {
                    let f: fn(f32, f32) -> f32 = match func {
                        Func::Add => |p, q| p + q,
                        Func::Sub => |p, q| p - q,
                        Func::Mul => |p, q| p * q,
                        Func::Div => |p, q| p / q,
                        Func::Pow => |p, q| p.powf(q),
                        Func::Min => |p, q| p.min(q),
                        Func::Max => |p, q| p.max(q),
                        Func::Atan2 => |p, q| p.atan2(q),
                        _ => return Err(mismatch(name, &arg_types)),
                    };
                    Ok(Float(zip2(&x, &y, f)))
                }
                (Double(x), Double(y)) => {
                    let f: fn(f64, f64) -> f64 = match func {
                        Func::Add => |p, q| p + q,
                        Func::Sub => |p, q| p - q,
                        Func::Mul => |p, q| p * q,
                        Func::Div => |p, q| p / q,
                        Func::Pow => |p, q| p.powf(q),
                        Func::Min => |p, q| p.min(q),
                        Func::Max => |p, q| p.max(q),
                        Func::Atan2 => |p, q| p.atan2(q),
                        _ => return Err(mismatch(name, &arg_types)),
                    };
                    Ok(Double(zip2(&x, &y, f)))
                }
                (Complex(x), Complex(y)) => {
                    let f: fn(Complex32, Complex32) -> Complex32 = match func {
                        Func::Add => |p, q| p + q,
                        Func::Sub => |p, q| p - q,
                        Func::Mul => |p, q| p * q,
                        Func::Div => |p, q| p / q,
                        _ => return Err(mismatch(name, &arg_types)),
                    };
                    Ok(Complex(zip2(&x, &y, f)))
                }
                (DComplex(x), DComplex(y)) => {
                    let f: fn(Complex64, Complex64) -> Complex64 = match func {
                        Func::Add => |p, q| p + q,
                        Func::Sub => |p, q| p - q,
                        Func::Mul => |p, q| p * q,
                        Func::Div => |p, q| p / q,
                        _ => return Err(mismatch(name, &arg_types)),
                    };
                    Ok(DComplex(zip2(&x, &y, f)))
                }
                _ => Err(mismatch(name, &arg_types)),
            }
        }

        Func::Eq | Func::Ne | Func::Lt | Func::Le | Func::Gt | Func::Ge => {
            let common = comparison_type(arg_types[0], arg_types[1])
                .ok_or_else(|| mismatch(name, &arg_types))?;
            let a = cast_to(a, common, name)?;
            let b = cast_to(b, common, name)?;
            let result = match (a, b) {
                (Bool(x), Bool(y)) => match func {
                    Func::Eq => zip2(&x, &y, |p, q| p == q),
                    Func::Ne => zip2(&x, &y, |p, q| p != q),
                    _ => return Err(mismatch(name, &arg_types)),
                },
                (Int(x), Int(y)) => {
                    let f: fn(i64, i64) -> bool = compare_fn(func);
                    zip2(&x, &y, f)
                }
                (Float(x), Float(y)) => {
                    let f: fn(f32, f32) -> bool = compare_fn(func);
                    zip2(&x, &y, f)
                }
                (Double(x), Double(y)) => {
                    let f: fn(f64, f64) -> bool = compare_fn(func);
                    zip2(&x, &y, f)
                }
                // Complex values have no ordering; only (in)equality.
                (Complex(x), Complex(y)) => match func {
                    Func::Eq => zip2(&x, &y, |p, q| p == q),
                    Func::Ne => zip2(&x, &y, |p, q| p != q),
                    _ => return Err(mismatch(name, &arg_types)),
                },
                (DComplex(x), DComplex(y)) => match func {
                    Func::Eq => zip2(&x, &y, |p, q| p == q),
                    Func::Ne => zip2(&x, &y, |p, q| p != q),
                    _ => return Err(mismatch(name, &arg_types)),
                },
                _ => return Err(mismatch(name, &arg_types)),
            };
            Ok(Bool(result))
        }

        Func::And => match (a, b) {
            (Bool(x), Bool(y)) => Ok(Bool(zip2(&x, &y, |p, q| p && q))),
            _ => Err(mismatch(name, &arg_types)),
        },
        Func::Or => match (a, b) {
            (Bool(x), Bool(y)) => Ok(Bool(zip2(&x, &y, |p, q| p || q))),
            _ => Err(mismatch(name, &arg_types)),
        },

        _ => Err(mismatch(name, &arg_types)),
    }
}

fn compare_fn<T: PartialOrd + Copy>(func: Func) -> fn(T, T) -> bool {
    match func {
        Func::Eq => |p, q| p == q,
        Func::Ne => |p, q| p != q,
        Func::Lt => |p, q| p < q,
        Func::Le => |p, q| p <= q,
        Func::Gt => |p, q| p > q,
        _ => |p, q| p >= q,
    }
}
