//! Typed values and the byte codec.
//!
//! Integers and floats are little-endian; strings are fixed width and zero
//! padded. A value longer than its string column is truncated on encode.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use strata_common::error::{ParseError, SchemaError};
use strata_filter::{CompareOp, Literal};

use super::ColumnType;

/// A decoded column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean.
    Bool(bool),
    /// 1-byte signed integer.
    Char(i8),
    /// 2-byte signed integer.
    Short(i16),
    /// 4-byte signed integer.
    Int(i32),
    /// 8-byte signed integer.
    Long(i64),
    /// 4-byte float.
    Float(f32),
    /// 8-byte float.
    Double(f64),
    /// String with trailing padding removed.
    Str(String),
}

impl Value {
    /// Returns the value's type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Char(_) => "char",
            Self::Short(_) => "short",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Str(_) => "string",
        }
    }

    /// Decodes a value of the given type from its column slice.
    #[must_use]
    pub fn decode(ty: ColumnType, bytes: &[u8]) -> Self {
        match ty {
            ColumnType::Bool => Self::Bool(bytes[0] != 0),
            ColumnType::Char => Self::Char(bytes[0] as i8),
            ColumnType::Short => Self::Short(i16::from_le_bytes([bytes[0], bytes[1]])),
            ColumnType::Int => {
                Self::Int(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            ColumnType::Long => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes[..8]);
                Self::Long(i64::from_le_bytes(buf))
            }
            ColumnType::Float => {
                Self::Float(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            ColumnType::Double => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes[..8]);
                Self::Double(f64::from_le_bytes(buf))
            }
            ColumnType::String(n) => {
                let raw = &bytes[..n];
                let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                Self::Str(String::from_utf8_lossy(&raw[..end]).into_owned())
            }
        }
    }

    /// Appends the value's encoding for the given column type.
    ///
    /// Fails with `BadType` if the value's type does not match the column.
    pub fn encode_into(&self, ty: ColumnType, out: &mut Vec<u8>) -> Result<(), SchemaError> {
        match (self, ty) {
            (Self::Bool(v), ColumnType::Bool) => out.push(u8::from(*v)),
            (Self::Char(v), ColumnType::Char) => out.push(*v as u8),
            (Self::Short(v), ColumnType::Short) => out.extend_from_slice(&v.to_le_bytes()),
            (Self::Int(v), ColumnType::Int) => out.extend_from_slice(&v.to_le_bytes()),
            (Self::Long(v), ColumnType::Long) => out.extend_from_slice(&v.to_le_bytes()),
            (Self::Float(v), ColumnType::Float) => out.extend_from_slice(&v.to_le_bytes()),
            (Self::Double(v), ColumnType::Double) => out.extend_from_slice(&v.to_le_bytes()),
            (Self::Str(v), ColumnType::String(n)) => {
                let bytes = v.as_bytes();
                let len = bytes.len().min(n);
                out.extend_from_slice(&bytes[..len]);
                out.extend(std::iter::repeat(0u8).take(n - len));
            }
            _ => {
                return Err(SchemaError::BadType {
                    expected: ty.name().to_string(),
                    actual: self.type_name().to_string(),
                })
            }
        }
        Ok(())
    }

    /// Returns a numeric rendering of the value, if it has one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Bool(v) => Some(f64::from(u8::from(*v))),
            Self::Char(v) => Some(f64::from(*v)),
            Self::Short(v) => Some(f64::from(*v)),
            Self::Int(v) => Some(f64::from(*v)),
            Self::Long(v) => Some(*v as f64),
            Self::Float(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            Self::Str(_) => None,
        }
    }

    /// Compares two values.
    ///
    /// Same-type values compare directly; numeric values of different types
    /// compare through f64. Strings only compare with strings.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => {
                let a = self.as_f64()?;
                let b = other.as_f64()?;
                a.partial_cmp(&b)
            }
        }
    }

    /// Applies a comparison operator between this value and `rhs`.
    ///
    /// Incomparable values (e.g. string vs number) match nothing.
    #[must_use]
    pub fn matches(&self, op: CompareOp, rhs: &Self) -> bool {
        self.compare(rhs).is_some_and(|ordering| op.matches(ordering))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Char(v) => write!(f, "{v}"),
            Self::Short(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

/// Coerces an expression literal to a column's type.
///
/// Fails with `BadLiteral` when the literal cannot represent a value of the
/// column's type.
pub fn coerce_literal(
    literal: &Literal,
    ty: ColumnType,
    column: &str,
) -> Result<Value, ParseError> {
    let bad = || ParseError::BadLiteral {
        value: literal.to_string(),
        column: column.to_string(),
    };

    match ty {
        ColumnType::Bool => match literal {
            Literal::Bool(v) => Ok(Value::Bool(*v)),
            Literal::Int(0) => Ok(Value::Bool(false)),
            Literal::Int(1) => Ok(Value::Bool(true)),
            _ => Err(bad()),
        },
        ColumnType::Char => match literal {
            Literal::Int(v) => i8::try_from(*v).map(Value::Char).map_err(|_| bad()),
            Literal::Str(s) if s.len() == 1 => Ok(Value::Char(s.as_bytes()[0] as i8)),
            _ => Err(bad()),
        },
        ColumnType::Short => match literal {
            Literal::Int(v) => i16::try_from(*v).map(Value::Short).map_err(|_| bad()),
            _ => Err(bad()),
        },
        ColumnType::Int => match literal {
            Literal::Int(v) => i32::try_from(*v).map(Value::Int).map_err(|_| bad()),
            _ => Err(bad()),
        },
        ColumnType::Long => match literal {
            Literal::Int(v) => Ok(Value::Long(*v)),
            _ => Err(bad()),
        },
        ColumnType::Float => match literal {
            Literal::Int(v) => Ok(Value::Float(*v as f32)),
            Literal::Float(v) => Ok(Value::Float(*v as f32)),
            _ => Err(bad()),
        },
        ColumnType::Double => match literal {
            Literal::Int(v) => Ok(Value::Double(*v as f64)),
            Literal::Float(v) => Ok(Value::Double(*v)),
            _ => Err(bad()),
        },
        ColumnType::String(_) => match literal {
            Literal::Str(s) => Ok(Value::Str(s.clone())),
            _ => Err(bad()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_integers() {
        assert_eq!(Value::decode(ColumnType::Short, &[0xFE, 0xFF]), Value::Short(-2));
        assert_eq!(
            Value::decode(ColumnType::Int, &42i32.to_le_bytes()),
            Value::Int(42)
        );
        assert_eq!(
            Value::decode(ColumnType::Long, &(-7i64).to_le_bytes()),
            Value::Long(-7)
        );
    }

    #[test]
    fn test_decode_string_trims_padding() {
        let mut bytes = vec![0u8; 8];
        bytes[..3].copy_from_slice(b"abc");
        assert_eq!(
            Value::decode(ColumnType::String(8), &bytes),
            Value::Str("abc".to_string())
        );
    }

    #[test]
    fn test_encode_truncates_long_string() {
        let mut out = Vec::new();
        Value::Str("abcdefgh".to_string())
            .encode_into(ColumnType::String(4), &mut out)
            .unwrap();
        assert_eq!(out, b"abcd");
    }

    #[test]
    fn test_encode_type_mismatch() {
        let mut out = Vec::new();
        let err = Value::Int(1)
            .encode_into(ColumnType::Double, &mut out)
            .unwrap_err();
        assert!(matches!(err, SchemaError::BadType { .. }));
    }

    #[test]
    fn test_cross_type_numeric_compare() {
        assert!(Value::Int(5).matches(CompareOp::Lt, &Value::Long(6)));
        assert!(Value::Double(2.5).matches(CompareOp::Gt, &Value::Short(2)));
        assert!(!Value::Str("a".to_string()).matches(CompareOp::Eq, &Value::Int(1)));
    }

    #[test]
    fn test_coerce_literal() {
        assert_eq!(
            coerce_literal(&Literal::Int(5), ColumnType::Long, "e").unwrap(),
            Value::Long(5)
        );
        assert_eq!(
            coerce_literal(&Literal::Int(1), ColumnType::Bool, "a").unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            coerce_literal(&Literal::Str("0".to_string()), ColumnType::Char, "b").unwrap(),
            Value::Char(b'0' as i8)
        );
        assert!(coerce_literal(&Literal::Str("xy".to_string()), ColumnType::Int, "d").is_err());
        assert!(coerce_literal(&Literal::Int(100_000), ColumnType::Short, "c").is_err());
    }
}
