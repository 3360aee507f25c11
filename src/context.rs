//! The `PipelineContext` (`§9` redesign note).
//!
//! The original process-wide global indices (`object_xref_mappings`,
//! `xref_to_source`, translation<->transcript maps, ...) are re-architected
//! here as explicit fields on one value, owned by the top-level engine and
//! threaded by reference through the component functions. Each index is
//! built lazily by the component that first needs it and retained for the
//! rest of the run (`§3` Lifecycle).

use std::collections::{HashMap, HashSet};

use crate::model::{
    GoXrefRow, IdentityXref, Interpro, ObjectType, ObjectXrefRow, Source, Synonym, XrefRow,
};

/// Per-(object, xref) alignment identity metrics.
pub type IdentityKey = (ObjectType, u32, u32);

/// All in-memory state built up over the run, plus the accumulated rows
/// that will eventually be materialized by the Emitter (C8).
#[derive(Debug, Default)]
pub struct PipelineContext {
    /// `xref_id -> source_id` (built by whichever component first loads
    /// xrefs; read by the Propagator and Selector).
    pub xref_to_source: HashMap<u32, u32>,
    /// `source_id -> Source`, for `is_known()` checks everywhere.
    pub sources_by_id: HashMap<u32, Source>,

    /// `(object_type, object_internal_id) -> [xref_id]`, append-only,
    /// written by the Parser (C4) and extended by the Propagator (C5)
    /// (`§4.4`, `§4.5(b)`).
    pub object_xref_mappings: HashMap<(ObjectType, u32), Vec<u32>>,
    /// `(object_type, object_internal_id, xref_id) -> (query_identity,
    /// target_identity)`, written by the Parser and inherited by dependents
    /// in the Propagator (`§3` invariants).
    pub object_xref_identities: HashMap<IdentityKey, (u8, u8)>,
    /// `xref_id -> [(object_type, object_internal_id)]` of primary
    /// (aligned) targets, written by the Parser (`§4.4`).
    pub primary_xref_ids: HashMap<u32, Vec<(ObjectType, u32)>>,

    /// Guards against writing the same xref twice (`§3` invariants).
    pub xrefs_written: HashSet<u32>,
    /// Guards against writing the same `(object_type, object_id, xref_id)`
    /// triple twice (`§3` invariants).
    pub object_xrefs_written: HashSet<(ObjectType, u32, u32)>,

    /// Per-method `(query_threshold, target_threshold)` in percent,
    /// recorded globally by the Dispatcher (`§4.3`).
    pub method_thresholds: HashMap<String, (u8, u8)>,

    pub xref_rows: Vec<XrefRow>,
    pub object_xref_rows: Vec<ObjectXrefRow>,
    pub identity_rows: Vec<IdentityXref>,
    pub synonym_rows: Vec<Synonym>,
    pub go_rows: Vec<GoXrefRow>,
    pub interpro_rows: Vec<Interpro>,
}

impl PipelineContext {
    /// Whether `xref_id` has already been emitted (`xrefs_written`).
    pub fn is_xref_written(&self, xref_id: u32) -> bool {
        self.xrefs_written.contains(&xref_id)
    }

    pub fn mark_xref_written(&mut self, xref_id: u32) {
        self.xrefs_written.insert(xref_id);
    }

    pub fn is_object_xref_written(
        &self,
        object_type: ObjectType,
        object_id: u32,
        xref_id: u32,
    ) -> bool {
        self.object_xrefs_written
            .contains(&(object_type, object_id, xref_id))
    }

    pub fn mark_object_xref_written(&mut self, object_type: ObjectType, object_id: u32, xref_id: u32) {
        self.object_xrefs_written
            .insert((object_type, object_id, xref_id));
    }

    /// Record that `object` now maps to `xref_id`, appending to the
    /// mapping index so later passes (propagation, display selection, gene
    /// description) see it (`§4.5(b)` "Append the dependent to
    /// `object_xref_mappings`").
    pub fn add_mapping(&mut self, object_type: ObjectType, object_id: u32, xref_id: u32) {
        self.object_xref_mappings
            .entry((object_type, object_id))
            .or_default()
            .push(xref_id);
    }

    pub fn mappings_for(&self, object_type: ObjectType, object_id: u32) -> &[u32] {
        self.object_xref_mappings
            .get(&(object_type, object_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn identity_for(
        &self,
        object_type: ObjectType,
        object_id: u32,
        xref_id: u32,
    ) -> Option<(u8, u8)> {
        self.object_xref_identities
            .get(&(object_type, object_id, xref_id))
            .copied()
    }

    pub fn set_identity(
        &mut self,
        object_type: ObjectType,
        object_id: u32,
        xref_id: u32,
        identity: (u8, u8),
    ) {
        self.object_xref_identities
            .insert((object_type, object_id, xref_id), identity);
    }

    pub fn source_for_xref(&self, xref_id: u32) -> Option<&Source> {
        let source_id = self.xref_to_source.get(&xref_id)?;
        self.sources_by_id.get(source_id)
    }
}
