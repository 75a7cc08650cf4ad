//! Fiat-Shamir transcript over BLAKE2s.
//!
//! Prover and verifier feed the same values in the same order and therefore draw
//! the same challenges.

use crate::engine::reference::field::Felt;
use crate::engine::reference::merkle::{blake2s, leading_zero_bits, Blake2sDigest};
use std::collections::BTreeSet;

const DOMAIN: &[u8] = b"starkline-transcript-v1";

#[derive(Debug, Clone)]
pub struct Transcript {
    state: Blake2sDigest,
}

impl Transcript {
    pub fn new(seed: &[u8]) -> Self {
        let mut transcript = Self {
            state: blake2s(DOMAIN),
        };
        transcript.absorb(seed);
        transcript
    }

    pub fn absorb(&mut self, data: &[u8]) {
        let mut input = Vec::with_capacity(self.state.len() + data.len());
        input.extend_from_slice(&self.state);
        input.extend_from_slice(data);
        self.state = blake2s(&input);
    }

    fn squeeze(&mut self) -> u64 {
        self.state = blake2s(&self.state);
        let mut word = [0u8; 8];
        word.copy_from_slice(&self.state[..8]);
        u64::from_le_bytes(word)
    }

    pub fn draw_felt(&mut self) -> Felt {
        Felt::new(self.squeeze())
    }

    /// Draw `count` distinct positions in `0..domain`, sorted ascending.
    ///
    /// The count is capped at the domain size.
    pub fn draw_positions(&mut self, count: usize, domain: usize) -> Vec<usize> {
        if domain == 0 {
            return Vec::new();
        }
        let count = count.min(domain);
        let mut positions = BTreeSet::new();
        while positions.len() < count {
            positions.insert((self.squeeze() % domain as u64) as usize);
        }
        positions.into_iter().collect()
    }

    fn pow_digest(&self, nonce: u64) -> Blake2sDigest {
        let mut input = Vec::with_capacity(self.state.len() + 8);
        input.extend_from_slice(&self.state);
        input.extend_from_slice(&nonce.to_le_bytes());
        blake2s(&input)
    }

    /// Whether `nonce` meets the proof-of-work target.
    pub fn check_pow(&self, nonce: u64, bits: u32) -> bool {
        leading_zero_bits(&self.pow_digest(nonce)) >= bits
    }

    /// Smallest nonce meeting the proof-of-work target.
    pub fn grind(&self, bits: u32) -> u64 {
        (0..=u64::MAX)
            .find(|nonce| self.check_pow(*nonce, bits))
            .unwrap_or(u64::MAX)
    }
}
