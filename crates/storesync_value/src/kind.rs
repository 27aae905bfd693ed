//! Closed classification of values.

use std::fmt;

/// The classification of a [`Value`](crate::Value).
///
/// Two values of different kinds are never compared structurally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// The absent sentinel.
    Undefined,
    /// A boolean.
    Boolean,
    /// A number.
    Number,
    /// A text string.
    String,
    /// Null.
    Null,
    /// An ordered sequence.
    Array,
    /// A point in time.
    Date,
    /// A regular expression.
    RegExp,
    /// A plain object.
    Object,
}

impl Kind {
    /// Returns the lowercase kind name.
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Undefined => "undefined",
            Kind::Boolean => "boolean",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Null => "null",
            Kind::Array => "array",
            Kind::Date => "date",
            Kind::RegExp => "regexp",
            Kind::Object => "object",
        }
    }

    /// Returns true for arrays and plain objects.
    pub fn is_composite(&self) -> bool {
        matches!(self, Kind::Array | Kind::Object)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn classifies_every_variant() {
        assert_eq!(Value::Undefined.kind(), Kind::Undefined);
        assert_eq!(Value::Null.kind(), Kind::Null);
        assert_eq!(Value::from(true).kind(), Kind::Boolean);
        assert_eq!(Value::from(1.5).kind(), Kind::Number);
        assert_eq!(Value::from("x").kind(), Kind::String);
        assert_eq!(Value::date_from_millis(0).unwrap().kind(), Kind::Date);
        assert_eq!(Value::Regex("^a$".into()).kind(), Kind::RegExp);
        assert_eq!(Value::array([1]).kind(), Kind::Array);
        assert_eq!(Value::empty_object().kind(), Kind::Object);
    }

    #[test]
    fn composite_kinds() {
        assert!(Kind::Array.is_composite());
        assert!(Kind::Object.is_composite());
        assert!(!Kind::Null.is_composite());
        assert!(!Kind::Date.is_composite());
        assert_eq!(Kind::RegExp.to_string(), "regexp");
    }
}
