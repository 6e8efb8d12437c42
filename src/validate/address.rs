//! IPv4 CIDR validation.

use std::fmt;
use std::net::Ipv4Addr;
use tracing::debug;

use super::{parse_decimal, Field, ValidationError};
use crate::rule::Cidr;

const OCTETS: usize = 4;
const MIN_PREFIX: u64 = 8;
const MAX_PREFIX: u64 = 32;

/// Why an address was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFault {
    MissingPrefix,
    OctetCount(usize),
    NotNumeric,
    OctetOutOfRange,
    PrefixOutOfRange,
}

impl fmt::Display for AddressFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFault::MissingPrefix => write!(f, "missing /prefix"),
            AddressFault::OctetCount(n) => write!(f, "{} octets instead of 4", n),
            AddressFault::NotNumeric => write!(f, "non-numeric part"),
            AddressFault::OctetOutOfRange => write!(f, "octet above 255"),
            AddressFault::PrefixOutOfRange => write!(f, "prefix outside 8..32"),
        }
    }
}

/// Accepts `a.b.c.d/p` with every octet in `[0, 255]` and `p` in `[8, 32]`.
pub fn parse_cidr(value: &str, field: Field) -> Result<Cidr, ValidationError> {
    classify(value).map_err(|reason| {
        debug!(field = field.as_str(), value = %value, %reason, "Address rejected");
        ValidationError::Address {
            field,
            value: value.to_string(),
            reason,
        }
    })
}

fn classify(value: &str) -> Result<Cidr, AddressFault> {
    let (addr, prefix) = value.split_once('/').ok_or(AddressFault::MissingPrefix)?;

    let parts: Vec<&str> = addr.split('.').collect();
    if parts.len() != OCTETS {
        return Err(AddressFault::OctetCount(parts.len()));
    }

    let mut octets = [0u8; OCTETS];
    for (slot, part) in octets.iter_mut().zip(&parts) {
        let n = parse_decimal(part).ok_or(AddressFault::NotNumeric)?;
        *slot = u8::try_from(n).map_err(|_| AddressFault::OctetOutOfRange)?;
    }

    let prefix = parse_decimal(prefix).ok_or(AddressFault::NotNumeric)?;
    if !(MIN_PREFIX..=MAX_PREFIX).contains(&prefix) {
        return Err(AddressFault::PrefixOutOfRange);
    }

    Ok(Cidr::new(Ipv4Addr::from(octets), prefix as u8))
}
