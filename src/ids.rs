//! ID Allocator (C9, `§4.9`).
//!
//! Assigns monotonically increasing surrogate ids that do not collide with
//! ids already present in the core database. Single-writer: every
//! `object_xref_id` in a run is handed out from here, never computed
//! independently by another component (`§4.9`, `§5` "Shared resource
//! policy").

use std::cell::Cell;

use crate::store::CoreStore;

/// Offsets and a monotone counter for surrogate id assignment.
#[derive(Debug)]
pub struct IdAllocator {
    /// `source_xref_id + xref_id_offset` is never present in the target
    /// (`§3` invariants).
    pub xref_id_offset: u32,
    next_object_xref_id: Cell<u32>,
}

impl IdAllocator {
    /// Query `max(object_xref_id)` and `max(xref_id)` in the target and
    /// derive offsets of `max + 1` (or `1` if the target is empty).
    pub fn from_core_store(core: &dyn CoreStore) -> Self {
        let xref_id_offset = core.max_xref_id().checked_add(1).unwrap_or(1).max(1);
        let first_object_xref_id = core.max_object_xref_id().checked_add(1).unwrap_or(1).max(1);
        Self {
            xref_id_offset,
            next_object_xref_id: Cell::new(first_object_xref_id),
        }
    }

    /// Shift a source xref id into the target's id space.
    pub fn shift_xref_id(&self, source_xref_id: u32) -> u32 {
        source_xref_id + self.xref_id_offset
    }

    /// Hand out the next, strictly monotone `object_xref_id`.
    pub fn next_object_xref_id(&self) -> u32 {
        let id = self.next_object_xref_id.get();
        self.next_object_xref_id.set(id + 1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryCoreStore;

    #[test]
    fn offsets_default_to_one_on_empty_target() {
        let core = InMemoryCoreStore::default();
        let alloc = IdAllocator::from_core_store(&core);
        assert_eq!(alloc.xref_id_offset, 1);
        assert_eq!(alloc.next_object_xref_id(), 1);
        assert_eq!(alloc.next_object_xref_id(), 2);
    }

    #[test]
    fn offsets_start_above_existing_target_max() {
        let core = InMemoryCoreStore {
            max_object_xref_id: 500,
            max_xref_id: 9000,
            ..Default::default()
        };
        let alloc = IdAllocator::from_core_store(&core);
        assert_eq!(alloc.xref_id_offset, 9001);
        assert_eq!(alloc.shift_xref_id(1), 9002);
        assert_eq!(alloc.next_object_xref_id(), 501);
        assert_eq!(alloc.next_object_xref_id(), 502);
    }
}
