use serde::{Deserialize, Serialize};

use crate::ident::Identifier;

/// The syntactic type tags a declaration, conversion, or literal can carry
/// (§3 "Type"). Unlike a runtime value type, this model never holds data —
/// it only names a type the way the tokenizer recorded it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    Any,
    Integer,
    Long,
    Single,
    Double,
    Currency,
    String,
    /// `STRING * n`. `n == 0` is valid and prints as `STRING * 0`.
    FixedString(u16),
    /// A user-defined `TYPE` referenced by name.
    Custom(Identifier),
}

impl Type {
    /// The full keyword used in a declaration (`AS INTEGER`). `Any` has no
    /// keyword of its own (absence of `AS` means `ANY` semantics); fixed
    /// strings and custom types are rendered by their own print logic.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Type::Any => None,
            Type::Integer => Some("INTEGER"),
            Type::Long => Some("LONG"),
            Type::Single => Some("SINGLE"),
            Type::Double => Some("DOUBLE"),
            Type::Currency => Some("CURRENCY"),
            Type::String => Some("STRING"),
            Type::FixedString(_) | Type::Custom(_) => None,
        }
    }

    /// The three-letter suffix used by the `C*` conversion builtins
    /// (`CINT`, `CLNG`, ...). `Any`, fixed strings, and custom types reject
    /// this query, as does `String` (no `CSTR` conversion target in the
    /// opcode table — conversion *from* a value to a string uses `STR$`).
    pub fn conversion_short_name(&self) -> Option<&'static str> {
        match self {
            Type::Integer => Some("INT"),
            Type::Long => Some("LNG"),
            Type::Single => Some("SNG"),
            Type::Double => Some("DBL"),
            Type::Currency => Some("CUR"),
            Type::Any | Type::String | Type::FixedString(_) | Type::Custom(_) => None,
        }
    }

    /// The sigil appended to a name carrying this type (`%`, `&`, `!`, `#`,
    /// `@`, `$`). `Any`, fixed strings, and custom types have no sigil.
    pub fn sigil(&self) -> Option<char> {
        match self {
            Type::Integer => Some('%'),
            Type::Long => Some('&'),
            Type::Single => Some('!'),
            Type::Double => Some('#'),
            Type::Currency => Some('@'),
            Type::String => Some('$'),
            Type::Any | Type::FixedString(_) | Type::Custom(_) => None,
        }
    }

    /// Render the `AS <type>` clause's right-hand side exactly as it should
    /// appear in source (without the leading `AS `).
    pub fn render(&self) -> String {
        match self {
            Type::FixedString(len) => format!("STRING * {len}"),
            Type::Custom(ident) => ident.display(),
            other => other.keyword().unwrap_or("ANY").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_string_zero_prints_with_star_zero() {
        assert_eq!(Type::FixedString(0).render(), "STRING * 0");
    }

    #[test]
    fn sigils_match_expected_characters() {
        assert_eq!(Type::Integer.sigil(), Some('%'));
        assert_eq!(Type::Long.sigil(), Some('&'));
        assert_eq!(Type::Single.sigil(), Some('!'));
        assert_eq!(Type::Double.sigil(), Some('#'));
        assert_eq!(Type::Currency.sigil(), Some('@'));
        assert_eq!(Type::String.sigil(), Some('$'));
        assert_eq!(Type::Any.sigil(), None);
    }

    #[test]
    fn any_and_custom_reject_conversion_suffix() {
        assert_eq!(Type::Any.conversion_short_name(), None);
        let custom = Type::Custom(Identifier::text(*b"POINT", 0x10));
        assert_eq!(custom.conversion_short_name(), None);
        assert_eq!(custom.render(), "POINT");
    }
}
