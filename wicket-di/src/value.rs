//! Conversion of literals into scalar field values. Every scalar field type implements [Scalar],
//! which ties it to a [ScalarKind]; [coerce] produces a matching [ScalarValue] from a literal.
//!
//! Parsing is locale-independent: integers and floats are read in base 10, booleans accept
//! `1 t T TRUE true True` and `0 f F FALSE false False`, complex numbers accept `re`, `re+imi`,
//! `re-imi` and `imi`, optionally wrapped in parentheses.

use crate::error::ConversionError;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A complex number with real and imaginary parts.
#[derive(Clone, Copy, PartialEq, Default, Debug)]
pub struct Complex<T> {
    pub re: T,
    pub im: T,
}

impl<T> Complex<T> {
    pub const fn new(re: T, im: T) -> Self {
        Self { re, im }
    }
}

pub type Complex32 = Complex<f32>;
pub type Complex64 = Complex<f64>;

/// Scalar types supported by value injection.
#[derive(Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    F32,
    F64,
    Complex32,
    Complex64,
    String,
}

impl Display for ScalarKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ScalarKind::Bool => "bool",
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::I128 => "i128",
            ScalarKind::Isize => "isize",
            ScalarKind::U8 => "u8",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::U128 => "u128",
            ScalarKind::Usize => "usize",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::Complex32 => "complex32",
            ScalarKind::Complex64 => "complex64",
            ScalarKind::String => "string",
        })
    }
}

/// A coerced scalar value.
#[derive(Clone, PartialEq, Debug)]
pub enum ScalarValue {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    I128(i128),
    Isize(isize),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    Usize(usize),
    F32(f32),
    F64(f64),
    Complex32(Complex32),
    Complex64(Complex64),
    String(String),
}

/// Field types which can be populated from literals.
pub trait Scalar: Sized + Send + Sync + 'static {
    const KIND: ScalarKind;

    /// Extracts the typed value, if the variant matches [Self::KIND].
    fn from_value(value: ScalarValue) -> Option<Self>;
}

macro_rules! scalar {
    ($ty:ty, $variant:ident) => {
        impl Scalar for $ty {
            const KIND: ScalarKind = ScalarKind::$variant;

            #[inline]
            fn from_value(value: ScalarValue) -> Option<Self> {
                match value {
                    ScalarValue::$variant(value) => Some(value),
                    _ => None,
                }
            }
        }
    };
}

scalar!(bool, Bool);
scalar!(i8, I8);
scalar!(i16, I16);
scalar!(i32, I32);
scalar!(i64, I64);
scalar!(i128, I128);
scalar!(isize, Isize);
scalar!(u8, U8);
scalar!(u16, U16);
scalar!(u32, U32);
scalar!(u64, U64);
scalar!(u128, U128);
scalar!(usize, Usize);
scalar!(f32, F32);
scalar!(f64, F64);
scalar!(Complex32, Complex32);
scalar!(Complex64, Complex64);
scalar!(String, String);

/// Converts a literal into a value of given kind.
pub fn coerce(literal: &str, kind: ScalarKind) -> Result<ScalarValue, ConversionError> {
    let error = || ConversionError {
        literal: literal.to_string(),
        kind,
    };

    Ok(match kind {
        ScalarKind::Bool => ScalarValue::Bool(parse_bool(literal).ok_or_else(error)?),
        ScalarKind::I8 => ScalarValue::I8(parse_number(literal).ok_or_else(error)?),
        ScalarKind::I16 => ScalarValue::I16(parse_number(literal).ok_or_else(error)?),
        ScalarKind::I32 => ScalarValue::I32(parse_number(literal).ok_or_else(error)?),
        ScalarKind::I64 => ScalarValue::I64(parse_number(literal).ok_or_else(error)?),
        ScalarKind::I128 => ScalarValue::I128(parse_number(literal).ok_or_else(error)?),
        ScalarKind::Isize => ScalarValue::Isize(parse_number(literal).ok_or_else(error)?),
        ScalarKind::U8 => ScalarValue::U8(parse_number(literal).ok_or_else(error)?),
        ScalarKind::U16 => ScalarValue::U16(parse_number(literal).ok_or_else(error)?),
        ScalarKind::U32 => ScalarValue::U32(parse_number(literal).ok_or_else(error)?),
        ScalarKind::U64 => ScalarValue::U64(parse_number(literal).ok_or_else(error)?),
        ScalarKind::U128 => ScalarValue::U128(parse_number(literal).ok_or_else(error)?),
        ScalarKind::Usize => ScalarValue::Usize(parse_number(literal).ok_or_else(error)?),
        ScalarKind::F32 => ScalarValue::F32(parse_number(literal).ok_or_else(error)?),
        ScalarKind::F64 => ScalarValue::F64(parse_number(literal).ok_or_else(error)?),
        ScalarKind::Complex32 => ScalarValue::Complex32(parse_complex(literal).ok_or_else(error)?),
        ScalarKind::Complex64 => ScalarValue::Complex64(parse_complex(literal).ok_or_else(error)?),
        ScalarKind::String => ScalarValue::String(literal.to_string()),
    })
}

fn parse_bool(literal: &str) -> Option<bool> {
    match literal {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[inline]
fn parse_number<T: FromStr>(literal: &str) -> Option<T> {
    literal.parse().ok()
}

fn parse_complex<T: FromStr + Default>(literal: &str) -> Option<Complex<T>> {
    let literal = literal
        .strip_prefix('(')
        .and_then(|literal| literal.strip_suffix(')'))
        .unwrap_or(literal);

    let Some(body) = literal.strip_suffix('i') else {
        return Some(Complex::new(literal.parse().ok()?, T::default()));
    };

    // the sign separating both parts cannot be leading or part of an exponent
    let split = body
        .char_indices()
        .skip(1)
        .filter(|(index, c)| {
            (*c == '+' || *c == '-') && !matches!(body.as_bytes()[index - 1], b'e' | b'E')
        })
        .map(|(index, _)| index)
        .last();

    let (re, im) = match split {
        Some(index) => (body[..index].parse().ok()?, parse_imaginary(&body[index..])?),
        None => (T::default(), parse_imaginary(body)?),
    };

    Some(Complex::new(re, im))
}

fn parse_imaginary<T: FromStr>(literal: &str) -> Option<T> {
    match literal {
        "" | "+" => "1".parse().ok(),
        "-" => "-1".parse().ok(),
        _ => literal.parse().ok(),
    }
}
