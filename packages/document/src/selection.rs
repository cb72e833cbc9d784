use crate::transaction::{Assoc, Mapping};

/// A cursor or range, defined by an anchor and a moving head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Collapsed selection at `pos`
    pub fn cursor(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Map both ends through a transaction's mapping
    pub fn map(&self, mapping: &Mapping) -> Self {
        if self.is_empty() {
            return Self::cursor(mapping.map(self.head, Assoc::After));
        }
        let forward = self.head >= self.anchor;
        let (anchor_assoc, head_assoc) = if forward {
            (Assoc::Before, Assoc::After)
        } else {
            (Assoc::After, Assoc::Before)
        };
        Self::new(
            mapping.map(self.anchor, anchor_assoc),
            mapping.map(self.head, head_assoc),
        )
    }

    /// Clamp both ends into `0..=size`
    pub fn clamp(&self, size: usize) -> Self {
        Self::new(self.anchor.min(size), self.head.min(size))
    }
}
