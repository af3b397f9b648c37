//! Topic and partition descriptions materialized per request.

use std::fmt;

use uuid::Uuid;

use crate::protocol::primitives::{id_from_wire, id_to_wire};

/// Local-layout bytes of the placeholder identifier
/// `71a59a51-8968-4f8b-937e-0000000005XX`.
const PLACEHOLDER_ID_LOCAL: [u8; 16] = [
    0x71, 0xA5, 0x9A, 0x51, 0x89, 0x68, 0x4F, 0x8B, 0x93, 0x7E, 0x00, 0x00, 0x00, 0x00, 0x05, 0x80,
];

/// 16-byte topic identifier. All-zero means "unknown/absent".
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TopicId(Uuid);

impl TopicId {
    pub const ZERO: TopicId = TopicId(Uuid::nil());

    /// Build from the big-endian wire form.
    #[must_use]
    pub fn from_wire(wire: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(wire))
    }

    /// Build from the local (mixed-endian) layout.
    #[must_use]
    pub fn from_local(local: [u8; 16]) -> Self {
        Self::from_wire(id_to_wire(local))
    }

    /// Big-endian wire form.
    #[must_use]
    pub fn to_wire(&self) -> [u8; 16] {
        self.0.into_bytes()
    }

    /// The wire form as a [`Uuid`], as carried by protocol messages.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Local (mixed-endian) layout.
    #[must_use]
    pub fn to_local(&self) -> [u8; 16] {
        id_from_wire(self.to_wire())
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_nil()
    }

    /// Synthetic identifier for a topic referenced by name without a resolvable id.
    ///
    /// Stable for a given `(name, index)` across requests. Only the positional
    /// index feeds into the value: bytes 14-15 of the local layout hold
    /// `0x80 + index * 0x10`, truncated to 16 bits.
    #[must_use]
    pub fn placeholder(_name: &str, index: usize) -> Self {
        let suffix = 0x80usize.wrapping_add(index.wrapping_mul(0x10));
        let mut local = PLACEHOLDER_ID_LOCAL;
        local[14] = (suffix >> 8) as u8;
        local[15] = suffix as u8;
        Self::from_local(local)
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TopicId({})", self.0)
    }
}

/// A partition of a topic. Placement is fixed to a single-node layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub index: i32,
    pub leader_id: i32,
    pub leader_epoch: i32,
    pub replicas: Vec<i32>,
    pub isr: Vec<i32>,
}

impl Partition {
    #[must_use]
    pub fn new(index: i32) -> Self {
        Self {
            index,
            leader_id: 0,
            leader_epoch: 0,
            replicas: vec![0],
            isr: vec![0],
        }
    }
}

/// A topic as resolved from the control-plane log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: TopicId,
    pub name: String,
    pub partitions: Vec<Partition>,
}

impl Topic {
    #[must_use]
    pub fn new(id: TopicId, name: impl Into<String>, indices: impl IntoIterator<Item = i32>) -> Self {
        Self {
            id,
            name: name.into(),
            partitions: indices.into_iter().map(Partition::new).collect(),
        }
    }

    /// A topic that does not exist: zero id, no partitions.
    #[must_use]
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::new(TopicId::ZERO, name, [])
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.id.is_zero()
    }

    /// Partition indices, deduplicated and ascending.
    #[must_use]
    pub fn partition_indices(&self) -> Vec<i32> {
        let mut indices: Vec<i32> = self.partitions.iter().map(|p| p.index).collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    #[must_use]
    pub fn has_partition(&self, index: i32) -> bool {
        self.partitions.iter().any(|p| p.index == index)
    }
}
