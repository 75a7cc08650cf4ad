//! BLAKE2s row hashing and the Merkle commitment over trace rows.

use blake2::{Blake2s256, Digest};
use rs_merkle::{Hasher, MerkleProof, MerkleTree};

pub type Blake2sDigest = [u8; 32];

/// BLAKE2s-256 as an `rs_merkle` hasher
#[derive(Clone, Debug)]
pub struct Blake2sAlgorithm;

impl Hasher for Blake2sAlgorithm {
    type Hash = Blake2sDigest;

    fn hash(data: &[u8]) -> Blake2sDigest {
        blake2s(data)
    }
}

pub fn blake2s(data: &[u8]) -> Blake2sDigest {
    Blake2s256::digest(data).into()
}

/// Digest of one trace row: BLAKE2s-256 over the 8-byte little-endian elements.
pub fn hash_row(row: &[u64]) -> Blake2sDigest {
    let mut hasher = Blake2s256::new();
    for element in row {
        hasher.update(element.to_le_bytes());
    }
    hasher.finalize().into()
}

/// Commitment to a power-of-two number of row digests
pub struct TraceCommitment {
    tree: MerkleTree<Blake2sAlgorithm>,
    root: Blake2sDigest,
    leaves: usize,
}

impl TraceCommitment {
    /// Returns `None` for an empty set of leaves.
    pub fn new(row_hashes: &[Blake2sDigest]) -> Option<Self> {
        let tree = MerkleTree::<Blake2sAlgorithm>::from_leaves(row_hashes);
        let root = tree.root()?;
        Some(Self {
            tree,
            root,
            leaves: row_hashes.len(),
        })
    }

    pub fn root(&self) -> Blake2sDigest {
        self.root
    }

    pub fn leaves(&self) -> usize {
        self.leaves
    }

    /// Authentication nodes opening `positions` (sorted, distinct).
    pub fn open(&self, positions: &[usize]) -> Vec<Blake2sDigest> {
        self.tree.proof(positions).proof_hashes().to_vec()
    }
}

/// Check a batch opening against a root.
pub fn verify_openings(
    root: Blake2sDigest,
    positions: &[usize],
    leaf_hashes: &[Blake2sDigest],
    total_leaves: usize,
    nodes: Vec<Blake2sDigest>,
) -> bool {
    MerkleProof::<Blake2sAlgorithm>::new(nodes).verify(root, positions, leaf_hashes, total_leaves)
}

/// Number of leading zero bits in a digest
pub fn leading_zero_bits(digest: &Blake2sDigest) -> u32 {
    let mut bits = 0;
    for byte in digest {
        if *byte == 0 {
            bits += 8;
        } else {
            bits += byte.leading_zeros();
            break;
        }
    }
    bits
}
