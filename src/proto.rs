//! Wire Schemas
//!
//! Protobuf messages exchanged across the SDK boundary: programs, inputs, proof options,
//! proofs, program outputs and public inputs. Messages are declared with the `prost`
//! derive macros directly, so no code generation step is needed.

use crate::error::MalformedInput;
use prost::Message;

/// Hash function used for commitments
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum HashFunction {
    Blake2s = 0,
}

/// Field extension used for out-of-domain sampling
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum FieldExtension {
    None = 0,
}

/// Base prime field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PrimeField {
    Goldilocks = 0,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MidenProgram {
    /// Program source text
    #[prost(string, tag = "1")]
    pub program: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MidenProgramInputs {
    /// Initial stack; the last element ends up on top
    #[prost(uint64, repeated, tag = "1")]
    pub stack_init: Vec<u64>,
    #[prost(uint64, repeated, tag = "2")]
    pub advice_tape: Vec<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProofOptions {
    #[prost(uint32, tag = "1")]
    pub num_queries: u32,
    #[prost(uint32, tag = "2")]
    pub blowup_factor: u32,
    #[prost(uint32, tag = "3")]
    pub grinding_factor: u32,
    #[prost(enumeration = "HashFunction", tag = "4")]
    pub hash_fn: i32,
    #[prost(enumeration = "FieldExtension", tag = "5")]
    pub field_extension: i32,
    #[prost(uint32, tag = "6")]
    pub fri_folding_factor: u32,
    #[prost(uint32, tag = "7")]
    pub fri_max_remainder_size: u32,
    #[prost(enumeration = "PrimeField", tag = "8")]
    pub prime_field: i32,
}

impl ProofOptions {
    /// The named configuration applied when a caller supplies no options.
    ///
    /// `ProofOptions::default()` is the all-zero protobuf default and is not a usable
    /// configuration.
    pub fn standard() -> Self {
        Self {
            num_queries: 27,
            blowup_factor: 8,
            grinding_factor: 16,
            hash_fn: HashFunction::Blake2s as i32,
            field_extension: FieldExtension::None as i32,
            fri_folding_factor: 8,
            fri_max_remainder_size: 256,
            prime_field: PrimeField::Goldilocks as i32,
        }
    }
}

/// A field element as 8 little-endian bytes
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FieldElement {
    #[prost(bytes = "vec", tag = "1")]
    pub element: Vec<u8>,
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        Self {
            element: value.to_le_bytes().to_vec(),
        }
    }
}

impl TryFrom<&FieldElement> for u64 {
    type Error = MalformedInput;

    fn try_from(value: &FieldElement) -> Result<Self, Self::Error> {
        crate::sdk::u64_from_le_bytes(&value.element)
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Digest {
    #[prost(bytes = "vec", tag = "1")]
    pub data: Vec<u8>,
}

impl From<[u8; 32]> for Digest {
    fn from(value: [u8; 32]) -> Self {
        Self {
            data: value.to_vec(),
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MidenProgramOutputs {
    /// Final stack, top first
    #[prost(message, repeated, tag = "1")]
    pub stack: Vec<FieldElement>,
    #[prost(message, repeated, tag = "2")]
    pub overflow_addrs: Vec<FieldElement>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MidenPublicInputs {
    #[prost(message, optional, tag = "1")]
    pub program_hash: Option<Digest>,
    #[prost(message, repeated, tag = "2")]
    pub stack_inputs: Vec<FieldElement>,
    #[prost(message, optional, tag = "3")]
    pub outputs: Option<MidenProgramOutputs>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProofContext {
    #[prost(uint64, tag = "1")]
    pub trace_length: u64,
    #[prost(uint32, tag = "2")]
    pub trace_width: u32,
    #[prost(message, optional, tag = "3")]
    pub options: Option<ProofOptions>,
    #[prost(message, optional, tag = "4")]
    pub field_modulus: Option<FieldElement>,
}

/// One opened trace row
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TraceQuery {
    #[prost(uint64, tag = "1")]
    pub position: u64,
    #[prost(message, repeated, tag = "2")]
    pub values: Vec<FieldElement>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BatchMerkleProof {
    #[prost(message, repeated, tag = "1")]
    pub nodes: Vec<Digest>,
    #[prost(uint32, tag = "2")]
    pub depth: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StarkProof {
    #[prost(message, optional, tag = "1")]
    pub context: Option<ProofContext>,
    #[prost(message, optional, tag = "2")]
    pub trace_commitment: Option<Digest>,
    #[prost(message, optional, tag = "3")]
    pub constraint_commitment: Option<Digest>,
    #[prost(uint64, tag = "4")]
    pub pow_nonce: u64,
    #[prost(message, repeated, tag = "5")]
    pub queries: Vec<TraceQuery>,
    #[prost(message, optional, tag = "6")]
    pub query_proof: Option<BatchMerkleProof>,
}

/// Decode a protobuf payload, naming the schema in the error.
pub fn decode_message<M: Message + Default>(
    bytes: &[u8],
    what: &'static str,
) -> Result<M, MalformedInput> {
    M::decode(bytes).map_err(|e| MalformedInput::Decode {
        what,
        reason: e.to_string(),
    })
}
