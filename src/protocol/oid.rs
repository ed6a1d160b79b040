// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Numeric object identifiers.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// A numeric object identifier such as `.1.3.6.1.4.1.318`.
///
/// # Examples
///
/// ```
/// use apc2mqtt::protocol::ObjectId;
///
/// let table: ObjectId = ".1.3.6.1.4.1.318.1.1.4.4.2.1.3".parse().unwrap();
/// let row = table.child(4);
/// assert!(row.starts_with(&table));
/// assert_eq!(row.to_string(), ".1.3.6.1.4.1.318.1.1.4.4.2.1.3.4");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(Vec<u64>);

impl ObjectId {
    /// Creates an identifier from its arcs.
    #[must_use]
    pub fn new(arcs: impl Into<Vec<u64>>) -> Self {
        Self(arcs.into())
    }

    /// Returns the arcs.
    #[must_use]
    pub fn arcs(&self) -> &[u64] {
        &self.0
    }

    /// Returns this identifier extended by one arc.
    #[must_use]
    pub fn child(&self, arc: u64) -> Self {
        let mut arcs = self.0.clone();
        arcs.push(arc);
        Self(arcs)
    }

    /// Returns `true` if `prefix` is a (non-strict) prefix of this identifier.
    #[must_use]
    pub fn starts_with(&self, prefix: &ObjectId) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl From<&[u64]> for ObjectId {
    fn from(arcs: &[u64]) -> Self {
        Self(arcs.to_vec())
    }
}

impl FromStr for ObjectId {
    type Err = ValueError;

    /// Parses dotted notation, with or without the leading dot.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix('.').unwrap_or(s);
        if trimmed.is_empty() {
            return Err(ValueError::InvalidObjectId(s.to_string()));
        }
        trimmed
            .split('.')
            .map(|arc| arc.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
            .map_err(|_| ValueError::InvalidObjectId(s.to_string()))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for arc in &self.0 {
            write!(f, ".{arc}")?;
        }
        Ok(())
    }
}
