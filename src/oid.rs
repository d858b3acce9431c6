//! Object identifiers: an ordered sequence of non-negative integers with
//! lexicographic comparison and a dotted-decimal textual form.

use std::fmt;
use std::str::FromStr;

use crate::error::{SnmpError, SnmpResult};

/// An SNMP object identifier, e.g. `1.3.6.1.2.1.1.1.0`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Oid(Vec<u32>);

impl Oid {
    pub fn new(arcs: Vec<u32>) -> SnmpResult<Self> {
        if arcs.is_empty() {
            return Err(SnmpError::Argument("OID must have at least one arc".into()));
        }
        Ok(Self(arcs))
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u32> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `self` is a prefix of (or equal to) `other`.
    pub fn is_prefix_of(&self, other: &Oid) -> bool {
        self.0.len() <= other.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// Whether `other` is a strict descendant of `self` (proper prefix).
    pub fn is_strict_prefix_of(&self, other: &Oid) -> bool {
        self.0.len() < other.0.len() && self.is_prefix_of(other)
    }
}

impl From<Vec<u32>> for Oid {
    fn from(v: Vec<u32>) -> Self {
        Oid(v)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl FromStr for Oid {
    type Err = SnmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arcs = s
            .trim_start_matches('.')
            .split('.')
            .filter(|p| !p.is_empty())
            .map(|p| {
                p.parse::<u32>()
                    .map_err(|_| SnmpError::Argument(format!("invalid OID component: '{p}'")))
            })
            .collect::<Result<Vec<u32>, _>>()?;
        Oid::new(arcs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_dotted_decimal() {
        let oid: Oid = "1.3.6.1.2.1.1.1.0".parse().unwrap();
        assert_eq!(oid.to_string(), "1.3.6.1.2.1.1.1.0");
        assert_eq!(oid.as_slice(), &[1, 3, 6, 1, 2, 1, 1, 1, 0]);
    }

    #[test]
    fn rejects_empty() {
        assert!("".parse::<Oid>().is_err());
        assert!(Oid::new(vec![]).is_err());
    }

    #[test]
    fn rejects_non_numeric_component() {
        assert!("1.3.x.1".parse::<Oid>().is_err());
    }

    #[test]
    fn prefix_semantics() {
        let root: Oid = "1.3.6.1.2.1.1".parse().unwrap();
        let child: Oid = "1.3.6.1.2.1.1.1.0".parse().unwrap();
        let sibling: Oid = "1.3.6.1.2.1.2".parse().unwrap();

        assert!(root.is_prefix_of(&child));
        assert!(root.is_strict_prefix_of(&child));
        assert!(!root.is_prefix_of(&sibling));
        assert!(root.is_prefix_of(&root));
        assert!(!root.is_strict_prefix_of(&root));
    }

    #[test]
    fn lexicographic_ordering() {
        let a: Oid = "1.3.6.1.2.1.1.1".parse().unwrap();
        let b: Oid = "1.3.6.1.2.1.1.2".parse().unwrap();
        let c: Oid = "1.3.6.1.2.1.1.1.0".parse().unwrap();
        assert!(a < b);
        assert!(a < c);
    }
}
