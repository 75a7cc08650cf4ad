//! Proof option checks.

use crate::engine::reference::EngineError;
use crate::proto::{FieldExtension, HashFunction, PrimeField, ProofOptions};

pub const MAX_GRINDING_FACTOR: u32 = 32;
pub const FRI_FOLDING_FACTORS: [u32; 4] = [2, 4, 8, 16];

/// Parameters the reference prover acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryParameters {
    pub num_queries: usize,
    pub grinding_factor: u32,
}

pub fn validate(options: &ProofOptions) -> Result<QueryParameters, EngineError> {
    let unsupported = |reason: String| Err(EngineError::UnsupportedOptions(reason));

    if options.hash_fn != HashFunction::Blake2s as i32 {
        return unsupported(format!("hash function {}", options.hash_fn));
    }
    if options.field_extension != FieldExtension::None as i32 {
        return unsupported(format!("field extension {}", options.field_extension));
    }
    if options.prime_field != PrimeField::Goldilocks as i32 {
        return unsupported(format!("prime field {}", options.prime_field));
    }
    if options.num_queries == 0 {
        return unsupported("num_queries must be at least 1".to_string());
    }
    if options.blowup_factor < 2 || !options.blowup_factor.is_power_of_two() {
        return unsupported(format!(
            "blowup_factor {} is not a power of two >= 2",
            options.blowup_factor
        ));
    }
    if options.grinding_factor > MAX_GRINDING_FACTOR {
        return unsupported(format!(
            "grinding_factor {} exceeds {}",
            options.grinding_factor, MAX_GRINDING_FACTOR
        ));
    }
    if !FRI_FOLDING_FACTORS.contains(&options.fri_folding_factor) {
        return unsupported(format!(
            "fri_folding_factor {} is not one of {:?}",
            options.fri_folding_factor, FRI_FOLDING_FACTORS
        ));
    }
    if !options.fri_max_remainder_size.is_power_of_two() {
        return unsupported(format!(
            "fri_max_remainder_size {} is not a power of two",
            options.fri_max_remainder_size
        ));
    }

    Ok(QueryParameters {
        num_queries: options.num_queries as usize,
        grinding_factor: options.grinding_factor,
    })
}
