//! Fixed-point money representation.
//!
//! Amounts in the source documents are quoted with exactly two fractional
//! digits (rupees and paise). Representing them as `f64` would let the
//! `0.01` equality tolerances required by ARL and the ledger invariants
//! drift silently on accumulation; storing minor units (paise) as `i64`
//! keeps every comparison exact.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An amount in paise (1 rupee = 100 paise).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Paise(pub i64);

impl Paise {
    pub const ZERO: Paise = Paise(0);

    /// Build from a rupee amount with up to 2 fractional digits.
    pub fn from_rupees(rupees: f64) -> Self {
        Paise((rupees * 100.0).round() as i64)
    }

    pub fn rupees(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Whether `self` and `other` are equal within the spec's `0.01` rupee
    /// tolerance (i.e. within 1 paisa).
    pub fn approx_eq(self, other: Paise) -> bool {
        (self.0 - other.0).abs() <= 1
    }
}

impl fmt::Display for Paise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.rupees())
    }
}

impl std::ops::Add for Paise {
    type Output = Paise;
    fn add(self, rhs: Paise) -> Paise {
        Paise(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Paise {
    type Output = Paise;
    fn sub(self, rhs: Paise) -> Paise {
        Paise(self.0 - rhs.0)
    }
}
