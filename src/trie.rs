//! Binary prefix trie over left-aligned address keys.
//!
//! Nodes live in a single arena and refer to each other by [`NodeId`].
//! Bit `i` of a key is bit `127 - i` of the `u128`, so IPv4 keys for an
//! IPv4-only tree are shifted into the top 32 bits by the caller.
//!
//! # Overlap policy
//!
//! - Inserting a more specific prefix under existing data splits the covering
//!   leaf, so the rest of the covering range keeps its data.
//! - Inserting at a prefix that already holds data replaces it.
//! - Inserting a coarser prefix over finer data replaces the whole subtree;
//!   the finer entries are discarded.

use crate::pool::DataId;

/// Index of a node in the trie arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The root node.
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A trie node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    /// No data for this range.
    Empty,
    /// Range split in two by the next address bit.
    Branch { left: NodeId, right: NodeId },
    /// Whole range maps to one pool entry.
    Leaf(DataId),
}

/// Prefix trie with a single root.
#[derive(Debug)]
pub struct PrefixTrie {
    nodes: Vec<Node>,
    depth: u8,
}

impl PrefixTrie {
    /// Create an empty trie keyed on `depth` bits (32 or 128).
    pub fn new(depth: u8) -> Self {
        Self {
            nodes: vec![Node::Empty],
            depth: depth.min(128),
        }
    }

    /// Number of key bits.
    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn node(&self, id: NodeId) -> Node {
        self.nodes[id.index()]
    }

    /// Arena size, including nodes orphaned by coarser inserts.
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Attach `data` to every address under `key/len`.
    pub fn insert(&mut self, key: u128, len: u8, data: DataId) {
        let node = self.descend_to(key, len.min(self.depth));
        self.nodes[node.index()] = Node::Leaf(data);
    }

    /// Data of the most specific prefix covering `key`.
    pub fn lookup(&self, key: u128) -> Option<DataId> {
        let mut node = NodeId::ROOT;
        for depth in 0..self.depth {
            match self.node(node) {
                Node::Empty => return None,
                Node::Leaf(data) => return Some(data),
                Node::Branch { left, right } => {
                    node = if bit(key, depth) { right } else { left };
                }
            }
        }
        match self.node(node) {
            Node::Leaf(data) => Some(data),
            _ => None,
        }
    }

    /// Node at `key/len`, creating the path to it if needed.
    pub fn ensure_node(&mut self, key: u128, len: u8) -> NodeId {
        self.descend_to(key, len.min(self.depth))
    }

    /// Make the range `key/len` share the subtree rooted at `target`.
    ///
    /// Anything previously stored under `key/len` is dropped.
    pub fn alias(&mut self, key: u128, len: u8, target: NodeId) {
        let len = len.min(self.depth);
        if len == 0 {
            return;
        }
        let parent = self.descend_to(key, len - 1);
        let side = bit(key, len - 1);
        self.split(parent, side);
        if let Node::Branch { left, right } = self.node(parent) {
            self.nodes[parent.index()] = if side {
                Node::Branch {
                    left,
                    right: target,
                }
            } else {
                Node::Branch {
                    left: target,
                    right,
                }
            };
        }
    }

    /// Collapse branches whose children carry identical data.
    ///
    /// Lookups are unaffected. Must run before [`alias`](Self::alias) since
    /// aliased subtrees are shared.
    pub fn merge_identical(&mut self) {
        self.merge_from(NodeId::ROOT);
    }

    fn merge_from(&mut self, node: NodeId) {
        let Node::Branch { left, right } = self.node(node) else {
            return;
        };
        self.merge_from(left);
        self.merge_from(right);
        match (self.node(left), self.node(right)) {
            (Node::Leaf(a), Node::Leaf(b)) if a == b => {
                self.nodes[node.index()] = Node::Leaf(a);
            }
            (Node::Empty, Node::Empty) => {
                self.nodes[node.index()] = Node::Empty;
            }
            _ => {}
        }
    }

    fn descend_to(&mut self, key: u128, len: u8) -> NodeId {
        let mut node = NodeId::ROOT;
        for depth in 0..len {
            node = self.split(node, bit(key, depth));
        }
        node
    }

    /// Child of `node` on the given side, turning `node` into a branch first.
    fn split(&mut self, node: NodeId, go_right: bool) -> NodeId {
        let (left_child, right_child) = match self.node(node) {
            Node::Branch { left, right } => (left, right),
            Node::Empty => {
                let pair = (self.push(Node::Empty), self.push(Node::Empty));
                self.nodes[node.index()] = Node::Branch {
                    left: pair.0,
                    right: pair.1,
                };
                pair
            }
            // Push covering data down so the sibling range keeps it.
            Node::Leaf(data) => {
                let pair = (self.push(Node::Leaf(data)), self.push(Node::Leaf(data)));
                self.nodes[node.index()] = Node::Branch {
                    left: pair.0,
                    right: pair.1,
                };
                pair
            }
        };
        if go_right {
            right_child
        } else {
            left_child
        }
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }
}

fn bit(key: u128, depth: u8) -> bool {
    (key >> (127 - depth as u32)) & 1 == 1
}
