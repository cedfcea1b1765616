//! Deals with run-time data representation
//!
//! Every variable holds a [`Value`]: an integer, a float, or a short string. Strings are
//! "packed": the first 8 bytes live in an integer slot, byte `i` at bits `8*i..8*i+8`, and up
//! to 6 more bytes live in an auxiliary array. Because of this a short string also has an
//! integer reading, e.g. `"a"` reads as 97, which is what the numeric actions and the equality
//! rule operate on.

use derive_more::From;
use std::fmt::{self, Debug, Display};
use thiserror::Error;

/// maximum number of bytes a packed string can hold
pub const PACKED_STR_CAP: usize = 14;
const SLOT_BYTES: usize = 8;
const AUX_BYTES: usize = PACKED_STR_CAP - SLOT_BYTES;

/// absolute tolerance used whenever floats are compared
pub const FLOAT_TOLERANCE: f64 = 1e-9;

/// 2^63, the first float that does not fit into an i64
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("a string of {len} bytes does not fit into {cap} bytes")]
    StringTooLong { len: usize, cap: usize },

    #[error("strings can't contain NUL bytes")]
    NulByte,

    #[error("can't truncate the non-finite number {0} to an integer")]
    NotFinite(f64),

    #[error("{0} is out of the 64 bit integer range")]
    OutOfRange(f64),

    #[error("the operand is NaN")]
    NaN,

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// Up to 14 bytes of text, stored in an integer slot plus an overflow array
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PackedStr {
    slot: i64,
    aux: [u8; AUX_BYTES],
    aux_used: bool,
}

/// A runtime value. Literals, variables and action operands all use this type
#[derive(Debug, Clone, Copy, PartialEq, From)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(PackedStr),
}

/// The numeric reading of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

// ==============================================================================
// Packing
// ==============================================================================

/// packs `bytes` into a [`PackedStr`]. Fails for more than 14 bytes or embedded NULs
pub fn pack_bytes(bytes: &[u8]) -> Result<PackedStr, ValueError> {
    if bytes.len() > PACKED_STR_CAP {
        return Err(ValueError::StringTooLong {
            len: bytes.len(),
            cap: PACKED_STR_CAP,
        });
    }
    if bytes.contains(&0) {
        return Err(ValueError::NulByte);
    }

    let mut slot = 0u64;
    for (i, byte) in bytes.iter().take(SLOT_BYTES).enumerate() {
        slot |= (*byte as u64) << (8 * i);
    }
    let rest = bytes.get(SLOT_BYTES..).unwrap_or(&[]);
    let mut aux = [0u8; AUX_BYTES];
    aux[..rest.len()].copy_from_slice(rest);

    Ok(PackedStr {
        slot: slot as i64,
        aux,
        aux_used: !rest.is_empty(),
    })
}

/// the inverse of [`pack_bytes`]
pub fn unpack_bytes(s: &PackedStr) -> Vec<u8> {
    let mut bytes: Vec<u8> = s
        .slot
        .to_le_bytes()
        .into_iter()
        .take_while(|b| *b != 0)
        .collect();
    if s.aux_used {
        bytes.extend(s.aux.iter().take_while(|b| **b != 0));
    }
    bytes
}

impl PackedStr {
    /// reads the bytes of an integer as text, which ends at the first zero byte
    pub fn from_slot(slot: i64) -> Self {
        PackedStr {
            slot,
            ..PackedStr::default()
        }
    }

    /// The integer reading of the string. Strings longer than 8 bytes have none
    pub fn slot(&self) -> Option<i64> {
        (!self.aux_used).then_some(self.slot)
    }

    pub fn len(&self) -> usize {
        unpack_bytes(self).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&unpack_bytes(self)).into_owned()
    }
}

impl TryFrom<&str> for PackedStr {
    type Error = ValueError;
    fn try_from(s: &str) -> Result<Self, ValueError> {
        pack_bytes(s.as_bytes())
    }
}

impl Debug for PackedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

impl Display for PackedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_lossy())
    }
}

// ==============================================================================
// Numbers
// ==============================================================================

/// Truncates toward zero. Fails for NaN, infinities and anything outside of i64
pub fn truncate_f64(x: f64) -> Result<i64, ValueError> {
    if !x.is_finite() {
        return Err(ValueError::NotFinite(x));
    }
    if x >= I64_LIMIT || x < -I64_LIMIT {
        return Err(ValueError::OutOfRange(x));
    }
    Ok(x.trunc() as i64)
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(x) => x,
        }
    }

    /// exact for two integers, within [`FLOAT_TOLERANCE`] otherwise
    pub fn approx_eq(self, other: Number) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (a, b) => (a.as_f64() - b.as_f64()).abs() < FLOAT_TOLERANCE,
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(i) => Value::Int(i),
            Number::Float(x) => Value::Float(x),
        }
    }
}

// ==============================================================================
// Value
// ==============================================================================

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
        }
    }

    /// the numeric reading, if there is one
    pub fn number(&self) -> Option<Number> {
        match self {
            Value::Int(n) => Some(Number::Int(*n)),
            Value::Float(x) => Some(Number::Float(*x)),
            Value::Str(s) => s.slot().map(Number::Int),
        }
    }

    pub fn expect_number(&self) -> Result<Number, ValueError> {
        self.number().ok_or(ValueError::TypeMismatch {
            expected: "a number",
            found: "a string longer than 8 bytes",
        })
    }

    pub fn to_f64(&self) -> Result<f64, ValueError> {
        Ok(self.expect_number()?.as_f64())
    }

    /// the integer reading, floats are truncated via [`truncate_f64`]
    pub fn to_i64(&self) -> Result<i64, ValueError> {
        match self.expect_number()? {
            Number::Int(n) => Ok(n),
            Number::Float(x) => truncate_f64(x),
        }
    }

    /// The equality used by conditional jumps. Symmetric, NaN equals nothing
    pub fn loosely_eq(&self, other: &Value) -> bool {
        if let (Value::Str(a), Value::Str(b)) = (self, other) {
            return a == b;
        }
        match (self.number(), other.number()) {
            (Some(a), Some(b)) => a.approx_eq(b),
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:.6}", x),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}
