use sqlchain_core::{hash, merkle_root, MerkleNode, MerkleTree};

/// Five encoded transactions taken from a node running the previous wire format.
/// One leaf per line, hex encoded.
const LEGACY_LEAVES: &str = include_str!("fixtures/legacy_leaves.hex");

fn legacy_leaves() -> Vec<Vec<u8>> {
    LEGACY_LEAVES
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| hex::decode(line).unwrap())
        .collect()
}

#[test]
fn test_node_vectors() {
    let data: [&[u8]; 3] = [b"node1", b"node2", b"node3"];

    // Level 1
    let n1 = MerkleNode::new(None, None, data[0]).unwrap();
    let n2 = MerkleNode::new(None, None, data[1]).unwrap();
    let n3 = MerkleNode::new(None, None, data[2]).unwrap();
    let n4 = MerkleNode::new(None, None, data[2]).unwrap();

    // Level 2
    let n5 = MerkleNode::new(Some(n1), Some(n2), &[]).unwrap();
    let n6 = MerkleNode::new(Some(n3), Some(n4), &[]).unwrap();

    assert_eq!(
        n5.digest().to_hex(),
        "64b04b718d8b7c5b6fd17f7ec221945c034cfce3be4118da33244966150c4bd4"
    );
    assert_eq!(
        n6.digest().to_hex(),
        "08bd0d1426f87a78bfc2f0b13eccdf6f5b58dac6b37a7b9441c1a2fab415d76c"
    );

    // Level 3
    let n7 = MerkleNode::new(Some(n5), Some(n6), &[]).unwrap();
    assert_eq!(
        n7.digest().to_hex(),
        "4e3e44e55926330ab6c31892f980f8bfd1a6e910ff1ebc3f778211377f35227e"
    );
}

#[test]
fn test_tree_duplicates_odd_leaf() {
    let three = MerkleTree::new(&[b"node1", b"node2", b"node3"]).unwrap();
    let four = MerkleTree::new(&[b"node1", b"node2", b"node3", b"node3"]).unwrap();

    assert_eq!(
        three.root().to_hex(),
        "4e3e44e55926330ab6c31892f980f8bfd1a6e910ff1ebc3f778211377f35227e"
    );
    assert_eq!(three.root(), four.root());

    let level_one = three.root_node().right().unwrap();
    assert_eq!(
        level_one.digest().to_hex(),
        "08bd0d1426f87a78bfc2f0b13eccdf6f5b58dac6b37a7b9441c1a2fab415d76c"
    );
    assert_eq!(
        level_one.left().unwrap().digest(),
        level_one.right().unwrap().digest()
    );
    assert_eq!(level_one.right().unwrap().digest(), hash(b"node3"));
}

#[test]
fn test_legacy_blob_leaves() {
    let leaves = legacy_leaves();
    let lengths: Vec<usize> = leaves.iter().map(Vec::len).collect();
    assert_eq!(lengths, vec![520, 520, 522, 520, 369]);
}

#[test]
fn test_legacy_blob_roots() {
    let leaves = legacy_leaves();
    let expected = [
        "b3a369b7a9aefc76f40307b792817f256a1dc9e0b1eb9862b0aaf5239c7e08f7",
        "09e1be60e30fa34c0ffd4f5fa356c2b8e123ba10edd6c0a400a0607a6048d217",
        "366fb7d2c67ded8c257eb6a68a14eec28500550ba5e046b68bc8e672f0e7f864",
        "2f51eac05747a9f4448e5b0453b1f5c2a31a7895480aa0ea97b65447b3ffce00",
        "72ea5be9289faf2c61b5c2e50e5afc580229a3034dbbebcb3d74d55e0f3a251a",
    ];

    for (count, root) in (1..=leaves.len()).zip(expected) {
        let prefix = &leaves[..count];
        assert_eq!(merkle_root(prefix).unwrap().to_hex(), root, "{count} leaves");
        assert_eq!(MerkleTree::new(prefix).unwrap().root().to_hex(), root, "{count} leaves");
    }
}

#[test]
fn test_legacy_blob_order_sensitive() {
    let mut leaves = legacy_leaves();
    let original = merkle_root(&leaves).unwrap();
    leaves.swap(0, 4);
    assert_ne!(merkle_root(&leaves).unwrap(), original);
}

#[test]
fn test_legacy_blob_proofs() {
    let leaves = legacy_leaves();
    let tree = MerkleTree::new(&leaves).unwrap();
    assert_eq!(tree.depth(), 3);
    for (index, leaf) in leaves.iter().enumerate() {
        let proof = tree.proof(index).unwrap();
        assert_eq!(proof.leaf, hash(leaf));
        assert!(tree.verify_proof(&proof));
    }
}
