//! Port validation.

use tracing::debug;

use super::{parse_decimal, Field, ValidationError};
use crate::rule::Port;

/// Ports at or below this value are reserved.
const RESERVED_MAX: u64 = 1024;
/// Exclusive upper bound.
const PORT_LIMIT: u64 = 65535;

/// Accepts `any`/`none` in any casing, or an integer strictly between 1024
/// and 65535.
pub fn parse_port(value: &str, field: Field) -> Result<Port, ValidationError> {
    if value.eq_ignore_ascii_case("any") || value.eq_ignore_ascii_case("none") {
        return Ok(Port::Any);
    }

    match parse_decimal(value) {
        Some(n) if n > RESERVED_MAX && n < PORT_LIMIT => Ok(Port::Number(n as u16)),
        _ => {
            debug!(field = field.as_str(), value = %value, "Port rejected");
            Err(ValidationError::Port {
                field,
                value: value.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcards_any_casing() {
        for value in ["any", "ANY", "Any", "aNy", "none", "NONE", "None", "nOnE"] {
            assert_eq!(parse_port(value, Field::SourcePort).unwrap(), Port::Any);
        }
    }

    #[test]
    fn test_numeric_bounds() {
        assert_eq!(
            parse_port("1025", Field::SourcePort).unwrap(),
            Port::Number(1025)
        );
        assert_eq!(
            parse_port("65534", Field::SourcePort).unwrap(),
            Port::Number(65534)
        );
        assert!(parse_port("1024", Field::SourcePort).is_err());
        assert!(parse_port("80", Field::SourcePort).is_err());
        assert!(parse_port("65535", Field::SourcePort).is_err());
        assert!(parse_port("70000", Field::SourcePort).is_err());
    }

    #[test]
    fn test_rejects_other_strings() {
        for value in ["", "http", "8080 ", "-8080", "any*", "0x1F90"] {
            let err = parse_port(value, Field::DestinationPort).unwrap_err();
            assert_eq!(err.field(), Field::DestinationPort);
        }
    }
}
