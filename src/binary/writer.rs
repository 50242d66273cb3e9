//! MaxMind DB file writer.

use log::debug;

use super::format::*;
use super::metadata::Metadata;
use crate::database::{Database, WriteStats};
use crate::pool::DataPool;
use crate::trie::{Node, NodeId, PrefixTrie};
use crate::{Error, Result};

/// Two-pass writer for a finished [`Database`].
///
/// Pass one numbers every reachable branch breadth-first from the root.
/// Pass two lays out each referenced pool entry in order of first use.
pub struct MmdbWriter {
    buffer: Vec<u8>,
    node_count: u32,
    data_section_size: usize,
}

/// Slot numbers and data offsets computed before anything is written.
struct Layout {
    /// Branches in slot order.
    order: Vec<NodeId>,
    /// Slot of each arena node, if it is a reachable branch.
    slots: Vec<Option<u32>>,
    /// Offset of each pool entry in the data section, if referenced.
    offsets: Vec<Option<u32>>,
    data: Vec<u8>,
}

impl MmdbWriter {
    /// Create a new writer.
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(1024 * 1024), // 1MB initial
            node_count: 0,
            data_section_size: 0,
        }
    }

    /// Serialize `db` and return the file bytes.
    pub fn write(&mut self, mut db: Database) -> Result<Vec<u8>> {
        self.buffer.clear();
        db.finalize();
        let build_epoch = db.build_epoch();
        let (options, trie, pool) = db.parts();
        let record_size = options.record_size;

        let layout = Self::layout(trie, pool)?;
        // A tree needs at least one node, even when the root holds no branch.
        let node_count = layout.order.len().max(1) as u64;

        let record = |node: NodeId| -> Result<u64> {
            match trie.node(node) {
                Node::Empty => Ok(node_count),
                Node::Branch { .. } => layout.slots[node.index()]
                    .map(u64::from)
                    .ok_or_else(|| Error::Serialization(format!("unnumbered branch {:?}", node))),
                Node::Leaf(data) => layout.offsets[data.index()]
                    .map(|offset| node_count + DATA_SECTION_SEPARATOR_SIZE as u64 + offset as u64)
                    .ok_or_else(|| Error::Serialization(format!("unplaced data {:?}", data))),
            }
        };

        self.buffer
            .reserve(node_count as usize * record_size.node_bytes() + layout.data.len());

        if layout.order.is_empty() {
            let root = record(NodeId::ROOT)?;
            record_size.write_node(&mut self.buffer, root, root)?;
        }
        for node in &layout.order {
            let Node::Branch { left, right } = trie.node(*node) else {
                return Err(Error::Serialization(format!("{:?} is not a branch", node)));
            };
            let (left, right) = (record(left)?, record(right)?);
            record_size.write_node(&mut self.buffer, left, right)?;
        }

        self.buffer
            .extend_from_slice(&[0u8; DATA_SECTION_SEPARATOR_SIZE]);
        self.buffer.extend_from_slice(&layout.data);

        let metadata = Metadata {
            database_type: options.database_type.clone(),
            description: options.description.clone(),
            languages: options.languages.clone(),
            build_epoch,
            ip_version: options.ip_version,
            record_size,
            node_count: node_count as u32,
        };
        self.buffer.extend_from_slice(METADATA_START_MARKER);
        metadata.to_value().encode(&mut self.buffer)?;

        self.node_count = node_count as u32;
        self.data_section_size = layout.data.len();
        debug!(
            "wrote {} nodes, {} data bytes, {} total bytes",
            node_count,
            layout.data.len(),
            self.buffer.len()
        );

        Ok(std::mem::take(&mut self.buffer))
    }

    /// Statistics of the last [`write`](Self::write).
    pub fn stats(&self, total_size: usize) -> WriteStats {
        WriteStats {
            node_count: self.node_count,
            data_section_size: self.data_section_size,
            total_size,
        }
    }

    fn layout(trie: &PrefixTrie, pool: &DataPool) -> Result<Layout> {
        let mut layout = Layout {
            order: Vec::new(),
            slots: vec![None; trie.arena_len()],
            offsets: vec![None; pool.len()],
            data: Vec::new(),
        };

        // Pass 1: node slots. Aliased subtrees are reachable twice but
        // numbered once.
        if let Node::Branch { .. } = trie.node(NodeId::ROOT) {
            layout.slots[NodeId::ROOT.index()] = Some(0);
            layout.order.push(NodeId::ROOT);
        }
        let mut next = 0;
        while next < layout.order.len() {
            if let Node::Branch { left, right } = trie.node(layout.order[next]) {
                for child in [left, right] {
                    if matches!(trie.node(child), Node::Branch { .. })
                        && layout.slots[child.index()].is_none()
                    {
                        layout.slots[child.index()] = Some(layout.order.len() as u32);
                        layout.order.push(child);
                    }
                }
            }
            next += 1;
        }

        // Pass 2: data offsets in order of first reference.
        let mut referenced = Vec::new();
        if layout.order.is_empty() {
            referenced.push(NodeId::ROOT);
        }
        for node in &layout.order {
            if let Node::Branch { left, right } = trie.node(*node) {
                referenced.push(left);
                referenced.push(right);
            }
        }
        for node in referenced {
            let Node::Leaf(data) = trie.node(node) else {
                continue;
            };
            if layout.offsets[data.index()].is_some() {
                continue;
            }
            let entry = pool
                .get(data)
                .ok_or_else(|| Error::Serialization(format!("missing pool entry {:?}", data)))?;
            layout.offsets[data.index()] = Some(layout.data.len() as u32);
            layout.data.extend_from_slice(&entry.encoded);
        }

        Ok(layout)
    }
}

impl Default for MmdbWriter {
    fn default() -> Self {
        Self::new()
    }
}
