use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Element-type tag carried by every literal, dataset, and tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Bool,
    Int,
    Float,
    Double,
    Complex,
    DComplex,
    Text,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Bool => "Bool",
            DataType::Int => "Int",
            DataType::Float => "Float",
            DataType::Double => "Double",
            DataType::Complex => "Complex",
            DataType::DComplex => "DComplex",
            DataType::Text => "Text",
        };
        write!(f, "{}", name)
    }
}

impl DataType {
    /// Int, Float, or Double.
    pub fn is_real(self) -> bool {
        matches!(self, DataType::Int | DataType::Float | DataType::Double)
    }

    pub fn is_complex(self) -> bool {
        matches!(self, DataType::Complex | DataType::DComplex)
    }

    pub fn is_numeric(self) -> bool {
        self.is_real() || self.is_complex()
    }
}

macro_rules! complex_type {
    ($name:ident, $float:ty) => {
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub struct $name {
            pub re: $float,
            pub im: $float,
        }

        impl $name {
            pub fn new(re: $float, im: $float) -> Self {
                Self { re, im }
            }

            /// Modulus.
            pub fn abs(self) -> $float {
                self.re.hypot(self.im)
            }

            pub fn conj(self) -> Self {
                Self::new(self.re, -self.im)
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, other: Self) -> Self {
                Self::new(self.re + other.re, self.im + other.im)
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, other: Self) -> Self {
                Self::new(self.re - other.re, self.im - other.im)
            }
        }

        impl Mul for $name {
            type Output = Self;
            fn mul(self, other: Self) -> Self {
                Self::new(
                    self.re * other.re - self.im * other.im,
                    self.re * other.im + self.im * other.re,
                )
            }
        }

        impl Div for $name {
            type Output = Self;
            fn div(self, other: Self) -> Self {
                let denom = other.re * other.re + other.im * other.im;
                Self::new(
                    (self.re * other.re + self.im * other.im) / denom,
                    (self.im * other.re - self.re * other.im) / denom,
                )
            }
        }

        impl Neg for $name {
            type Output = Self;
            fn neg(self) -> Self {
                Self::new(-self.re, -self.im)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{:+}i", self.re, self.im)
            }
        }
    };
}

complex_type!(Complex32, f32);
complex_type!(Complex64, f64);

impl Complex32 {
    pub fn widen(self) -> Complex64 {
        Complex64::new(self.re as f64, self.im as f64)
    }
}

/// A parsed scalar literal: one payload per type tag, set atomically by
/// whichever constructor form the grammar matched.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Bool(bool),
    Int(i64),
    Float(f32),
    Double(f64),
    Complex(Complex32),
    DComplex(Complex64),
    Text(String),
}

impl LiteralValue {
    pub fn dtype(&self) -> DataType {
        match self {
            LiteralValue::Bool(_) => DataType::Bool,
            LiteralValue::Int(_) => DataType::Int,
            LiteralValue::Float(_) => DataType::Float,
            LiteralValue::Double(_) => DataType::Double,
            LiteralValue::Complex(_) => DataType::Complex,
            LiteralValue::DComplex(_) => DataType::DComplex,
            LiteralValue::Text(_) => DataType::Text,
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Bool(v) => write!(f, "{}", v),
            LiteralValue::Int(v) => write!(f, "{}", v),
            LiteralValue::Float(v) => write!(f, "{}", v),
            LiteralValue::Double(v) => write!(f, "{}", v),
            LiteralValue::Complex(v) => write!(f, "{}", v),
            LiteralValue::DComplex(v) => write!(f, "{}", v),
            LiteralValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// A flat, typed buffer: the materialized form of an evaluated tree
/// node or a stored dataset. A scalar is a one-element buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Complex(Vec<Complex32>),
    DComplex(Vec<Complex64>),
    Text(Vec<String>),
}

impl ArrayValue {
    pub fn dtype(&self) -> DataType {
        match self {
            ArrayValue::Bool(_) => DataType::Bool,
            ArrayValue::Int(_) => DataType::Int,
            ArrayValue::Float(_) => DataType::Float,
            ArrayValue::Double(_) => DataType::Double,
            ArrayValue::Complex(_) => DataType::Complex,
            ArrayValue::DComplex(_) => DataType::DComplex,
            ArrayValue::Text(_) => DataType::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ArrayValue::Bool(v) => v.len(),
            ArrayValue::Int(v) => v.len(),
            ArrayValue::Float(v) => v.len(),
            ArrayValue::Double(v) => v.len(),
            ArrayValue::Complex(v) => v.len(),
            ArrayValue::DComplex(v) => v.len(),
            ArrayValue::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A one-element buffer holding the literal's payload.
    pub fn from_literal(lit: &LiteralValue) -> ArrayValue {
        match lit {
            LiteralValue::Bool(v) => ArrayValue::Bool(vec![*v]),
            LiteralValue::Int(v) => ArrayValue::Int(vec![*v]),
            LiteralValue::Float(v) => ArrayValue::Float(vec![*v]),
            LiteralValue::Double(v) => ArrayValue::Double(vec![*v]),
            LiteralValue::Complex(v) => ArrayValue::Complex(vec![*v]),
            LiteralValue::DComplex(v) => ArrayValue::DComplex(vec![*v]),
            LiteralValue::Text(v) => ArrayValue::Text(vec![v.clone()]),
        }
    }

    /// Widen to `to`. Only the promotions the type rules can request are
    /// supported; anything else returns None.
    pub fn cast(&self, to: DataType) -> Option<ArrayValue> {
        if self.dtype() == to {
            return Some(self.clone());
        }
        let out = match (self, to) {
            (ArrayValue::Int(v), DataType::Float) => {
                ArrayValue::Float(v.iter().map(|&x| x as f32).collect())
            }
            (ArrayValue::Int(v), DataType::Double) => {
                ArrayValue::Double(v.iter().map(|&x| x as f64).collect())
            }
            (ArrayValue::Int(v), DataType::Complex) => {
                ArrayValue::Complex(v.iter().map(|&x| Complex32::new(x as f32, 0.0)).collect())
            }
            (ArrayValue::Int(v), DataType::DComplex) => {
                ArrayValue::DComplex(v.iter().map(|&x| Complex64::new(x as f64, 0.0)).collect())
            }
            (ArrayValue::Float(v), DataType::Double) => {
                ArrayValue::Double(v.iter().map(|&x| x as f64).collect())
            }
            (ArrayValue::Float(v), DataType::Complex) => {
                ArrayValue::Complex(v.iter().map(|&x| Complex32::new(x, 0.0)).collect())
            }
            (ArrayValue::Float(v), DataType::DComplex) => {
                ArrayValue::DComplex(v.iter().map(|&x| Complex64::new(x as f64, 0.0)).collect())
            }
            (ArrayValue::Double(v), DataType::DComplex) => {
                ArrayValue::DComplex(v.iter().map(|&x| Complex64::new(x, 0.0)).collect())
            }
            (ArrayValue::Complex(v), DataType::DComplex) => {
                ArrayValue::DComplex(v.iter().map(|x| x.widen()).collect())
            }
            _ => return None,
        };
        Some(out)
    }
}
