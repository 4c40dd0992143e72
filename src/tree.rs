//! Construction of the code tree and the code words derived from it.
//!
//! Both sides of the codec build the tree independently from the same frequency table, so the
//! construction must be fully deterministic. Nodes live in an arena and the index of a node is
//! its insertion order: leaves first in ascending byte order, then every merged node. Among
//! nodes of equal weight the one inserted earlier is merged first.
use core::cmp::Reverse;
use std::collections::BinaryHeap;

use bitvec::prelude::{BitSlice, BitVec, Lsb0};

use crate::table::FrequencyTable;

/// Index of a node in the arena.
pub(crate) type NodeId = u16;

/// A code word, the first bit is the choice made at the root.
pub(crate) type Code = BitVec<u8, Lsb0>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Node {
    Leaf {
        byte: u8,
    },
    Branch {
        left: NodeId,
        right: NodeId,
    },
}

/// A binary prefix-code tree.
#[derive(Debug)]
pub(crate) struct CodeTree {
    nodes: Vec<Node>,
    weights: Vec<u64>,
    root: NodeId,
}

/// The code words of all bytes in a tree.
pub(crate) struct CodeBook {
    codes: Vec<Option<Code>>,
}

impl CodeTree {
    /// Merge the two lightest nodes until one remains.
    ///
    /// Returns `None` only for a table without entries. A single entry results in a tree whose
    /// root is a leaf.
    pub(crate) fn build(table: &FrequencyTable) -> Option<Self> {
        let mut tree = CodeTree {
            nodes: Vec::with_capacity(2 * table.len()),
            weights: Vec::with_capacity(2 * table.len()),
            root: 0,
        };

        let mut queue = BinaryHeap::with_capacity(table.len());
        for (byte, count) in table.iter() {
            let id = tree.push(Node::Leaf { byte }, count);
            queue.push(Reverse((count, id)));
        }

        while queue.len() > 1 {
            let Reverse((lweight, left)) = queue.pop()?;
            let Reverse((rweight, right)) = queue.pop()?;
            let weight = lweight.saturating_add(rweight);
            let id = tree.push(Node::Branch { left, right }, weight);
            queue.push(Reverse((weight, id)));
        }

        let Reverse((_, root)) = queue.pop()?;
        tree.root = root;
        Some(tree)
    }

    fn push(&mut self, node: Node, weight: u64) -> NodeId {
        // At most 256 leaves and 255 branches.
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        self.weights.push(weight);
        id
    }

    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    /// Follow one bit from `node`, `None` when there is no such child.
    pub(crate) fn step(&self, node: NodeId, bit: bool) -> Option<NodeId> {
        match self.nodes[usize::from(node)] {
            Node::Leaf { .. } => None,
            Node::Branch { left, right } => Some(if bit { right } else { left }),
        }
    }

    /// The byte of a leaf.
    pub(crate) fn symbol(&self, node: NodeId) -> Option<u8> {
        match self.nodes[usize::from(node)] {
            Node::Leaf { byte } => Some(byte),
            Node::Branch { .. } => None,
        }
    }

    pub(crate) fn weight(&self, node: NodeId) -> u64 {
        self.weights[usize::from(node)]
    }
}

impl CodeBook {
    /// Collect the root-to-leaf path of every leaf, `0` for left and `1` for right.
    pub(crate) fn new(tree: &CodeTree) -> Self {
        let mut book = CodeBook::empty();
        let mut path = Code::new();
        book.assign(tree, tree.root(), &mut path);
        book
    }

    /// A code book without any code words.
    pub(crate) fn empty() -> Self {
        CodeBook {
            codes: vec![None; 256],
        }
    }

    fn assign(&mut self, tree: &CodeTree, node: NodeId, path: &mut Code) {
        match tree.nodes[usize::from(node)] {
            Node::Leaf { byte } => {
                self.codes[usize::from(byte)] = Some(path.clone());
            }
            Node::Branch { left, right } => {
                path.push(false);
                self.assign(tree, left, path);
                path.pop();
                path.push(true);
                self.assign(tree, right, path);
                path.pop();
            }
        }
    }

    pub(crate) fn get(&self, byte: u8) -> Option<&BitSlice<u8, Lsb0>> {
        self.codes[usize::from(byte)].as_deref()
    }

    /// Number of distinct bytes with a code word.
    pub(crate) fn len(&self) -> usize {
        self.codes.iter().filter(|c| c.is_some()).count()
    }

    /// The length of the longest code word.
    pub(crate) fn max_len(&self) -> usize {
        self.codes.iter().flatten().map(|c| c.len()).max().unwrap_or(0)
    }
}
