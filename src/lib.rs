//! Starkline: Worker-Orchestrated STARK Proving
//!
//! Proving work runs on background execution contexts that each own an engine
//! instance. Contexts bootstrap asynchronously, hold messages until their engine
//! is ready, and answer requests over channels. A proving context drives a pool
//! of hashing and constraint contexts and resets its prover once per unit of work.
//!
//! Host code talks to [`sdk::ProverClient`].

pub mod capability;
pub mod cli;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod logging;
pub mod pool;
pub mod proto;
pub mod sdk;
pub mod session;
pub mod work;

pub use error::{ApiError, MalformedInput};
pub use sdk::{u64_from_le_bytes, ProofBundle, ProverClient};
