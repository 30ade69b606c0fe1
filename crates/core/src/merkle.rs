//! Merkle tree implementation for transaction roots.
//!
//! Leaves are raw byte strings. A leaf digest is `hash(data)`, an internal digest is
//! `hash(left || right)`. Whenever a level holds an odd number of nodes, the last node is
//! duplicated (same digest, not re-hashed) before pairing. This applies at every level, so a
//! finished tree is always perfect.

use crate::hash::{hash, hash_concat, Hash};
use thiserror::Error;

/// Errors that can occur while building a merkle tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerkleError {
    #[error("cannot build a merkle tree from zero leaves")]
    EmptyInput,
    #[error("a merkle node needs both children or neither")]
    InvalidTreeShape,
}

pub type Result<T> = std::result::Result<T, MerkleError>;

/// One node of the commitment tree. Internal nodes own both of their subtrees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleNode {
    digest: Hash,
    children: Option<Box<(MerkleNode, MerkleNode)>>,
}

impl MerkleNode {
    /// Build a node from optional children.
    ///
    /// With no children this is a leaf over `data`. With both children this is an internal
    /// node and `data` is ignored. Any other combination is rejected.
    pub fn new(left: Option<MerkleNode>, right: Option<MerkleNode>, data: &[u8]) -> Result<Self> {
        match (left, right) {
            (None, None) => Ok(Self::leaf(data)),
            (Some(left), Some(right)) => Ok(Self::branch(left, right)),
            _ => Err(MerkleError::InvalidTreeShape),
        }
    }

    /// A leaf whose digest is the hash of `data`.
    pub fn leaf(data: &[u8]) -> Self {
        Self {
            digest: hash(data),
            children: None,
        }
    }

    /// An internal node over two subtrees.
    pub fn branch(left: MerkleNode, right: MerkleNode) -> Self {
        let digest = hash_concat(&[left.digest.as_ref(), right.digest.as_ref()]);
        Self {
            digest,
            children: Some(Box::new((left, right))),
        }
    }

    pub fn digest(&self) -> Hash {
        self.digest
    }

    pub fn left(&self) -> Option<&MerkleNode> {
        self.children.as_deref().map(|(left, _)| left)
    }

    pub fn right(&self) -> Option<&MerkleNode> {
        self.children.as_deref().map(|(_, right)| right)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Reduce one level of digests into the next, duplicating the last one on odd counts.
fn next_level(level: &[Hash]) -> Vec<Hash> {
    level
        .chunks(2)
        .map(|pair| {
            let left = pair[0];
            let right = pair.get(1).copied().unwrap_or(left);
            hash_concat(&[left.as_ref(), right.as_ref()])
        })
        .collect()
}

/// Compute the merkle root of a list of raw leaves without keeping the tree.
///
/// Produces the same digest as [`MerkleTree::new`] followed by [`MerkleTree::root`].
pub fn merkle_root<T: AsRef<[u8]>>(leaves: &[T]) -> Result<Hash> {
    let mut current_level: Vec<Hash> = leaves.iter().map(|leaf| hash(leaf.as_ref())).collect();

    while current_level.len() > 1 {
        current_level = next_level(&current_level);
    }

    current_level.pop().ok_or(MerkleError::EmptyInput)
}

/// A merkle tree holding its root node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    root: MerkleNode,
    /// Number of leaves supplied by the caller, before any padding.
    leaf_count: usize,
    /// Number of reduction levels between the leaves and the root.
    depth: usize,
}

/// A merkle proof for a single leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    /// Digest of the leaf being proven.
    pub leaf: Hash,
    /// Sibling digests from leaf to root.
    pub siblings: Vec<Hash>,
    /// Direction for each sibling (true = sibling is on the right).
    pub directions: Vec<bool>,
}

impl MerkleTree {
    /// Build a merkle tree from an ordered list of raw leaves.
    pub fn new<T: AsRef<[u8]>>(leaves: &[T]) -> Result<Self> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyInput);
        }

        let mut level: Vec<MerkleNode> = leaves
            .iter()
            .map(|leaf| MerkleNode::leaf(leaf.as_ref()))
            .collect();
        let mut depth = 0;

        while level.len() > 1 {
            if level.len() % 2 == 1 {
                if let Some(last) = level.last().cloned() {
                    level.push(last);
                }
            }

            let mut next = Vec::with_capacity(level.len() / 2);
            let mut nodes = level.into_iter();
            while let (Some(left), Some(right)) = (nodes.next(), nodes.next()) {
                next.push(MerkleNode::branch(left, right));
            }

            level = next;
            depth += 1;
        }

        let root = level.pop().ok_or(MerkleError::EmptyInput)?;
        tracing::trace!(leaves = leaves.len(), depth, root = %root.digest, "built merkle tree");

        Ok(Self {
            root,
            leaf_count: leaves.len(),
            depth,
        })
    }

    /// Get the root digest of the merkle tree.
    pub fn root(&self) -> Hash {
        self.root.digest
    }

    pub fn root_node(&self) -> &MerkleNode {
        &self.root
    }

    /// Get the number of leaves the tree was built from.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Generate a proof for the leaf at the given index.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.leaf_count {
            return None;
        }

        let mut siblings = Vec::with_capacity(self.depth);
        let mut directions = Vec::with_capacity(self.depth);
        let mut node = &self.root;

        // The tree is perfect, so the bits of `index` spell the path from the root.
        for level in (0..self.depth).rev() {
            let (left, right) = node.children.as_deref()?;
            if (index >> level) & 1 == 0 {
                siblings.push(right.digest);
                directions.push(true);
                node = left;
            } else {
                siblings.push(left.digest);
                directions.push(false);
                node = right;
            }
        }

        siblings.reverse();
        directions.reverse();

        Some(MerkleProof {
            leaf: node.digest,
            siblings,
            directions,
        })
    }

    /// Verify a merkle proof against this tree's root.
    pub fn verify_proof(&self, proof: &MerkleProof) -> bool {
        verify_proof(&self.root(), proof)
    }
}

/// Verify a merkle proof against a given root.
pub fn verify_proof(root: &Hash, proof: &MerkleProof) -> bool {
    if proof.siblings.len() != proof.directions.len() {
        return false;
    }

    let mut current = proof.leaf;

    for (sibling, is_right) in proof.siblings.iter().zip(proof.directions.iter()) {
        current = if *is_right {
            hash_concat(&[current.as_ref(), sibling.as_ref()])
        } else {
            hash_concat(&[sibling.as_ref(), current.as_ref()])
        };
    }

    current == *root
}
