//! Goldilocks prime field, p = 2^64 - 2^32 + 1.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

pub const MODULUS: u64 = 0xFFFF_FFFF_0000_0001;

/// Canonical field element, always `< MODULUS`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Felt(u64);

impl Felt {
    pub const ZERO: Felt = Felt(0);
    pub const ONE: Felt = Felt(1);

    /// Reduce an arbitrary u64 into the field.
    pub fn new(value: u64) -> Self {
        Felt(value % MODULUS)
    }

    /// Accept only canonical values.
    pub fn try_canonical(value: u64) -> Option<Self> {
        (value < MODULUS).then_some(Felt(value))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl From<Felt> for u64 {
    fn from(value: Felt) -> Self {
        value.0
    }
}

impl fmt::Display for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Felt {
    type Output = Felt;

    fn add(self, rhs: Felt) -> Felt {
        Felt(((self.0 as u128 + rhs.0 as u128) % MODULUS as u128) as u64)
    }
}

impl Sub for Felt {
    type Output = Felt;

    fn sub(self, rhs: Felt) -> Felt {
        Felt(((self.0 as u128 + MODULUS as u128 - rhs.0 as u128) % MODULUS as u128) as u64)
    }
}

impl Mul for Felt {
    type Output = Felt;

    fn mul(self, rhs: Felt) -> Felt {
        Felt(((self.0 as u128 * rhs.0 as u128) % MODULUS as u128) as u64)
    }
}

impl Neg for Felt {
    type Output = Felt;

    fn neg(self) -> Felt {
        Felt::ZERO - self
    }
}
