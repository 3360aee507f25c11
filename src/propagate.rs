//! Xref Propagator (C5, `§4.5`).
//!
//! Three sub-flows over the primary mapping built by the Parser (C4):
//! writing the primary xrefs themselves, walking the dependent-xref
//! closure, and emitting synonyms. A fourth, independent pass handles
//! hand-curated direct xrefs. Orphan xrefs and the Interpro passthrough
//! round out the component.

use clap::Parser;
use itertools::Itertools;
use tracing::warn;

use crate::context::PipelineContext;
use crate::err::XrefError;
use crate::ids::IdAllocator;
use crate::model::{ObjectType, ObjectXrefRow, XrefRow};
use crate::store::{CoreStore, XrefStore};

/// Command line arguments for the `propagate` sub command.
#[derive(Parser, Debug)]
#[command(about = "Propagate primary, dependent, direct, and orphan xrefs", long_about = None)]
pub struct Args {
    #[arg(long, required = true)]
    pub path_work_dir: std::path::PathBuf,
}

/// Standalone invocation has no access to the mapping/identity indices
/// the Parser (C4) builds; `run-all` owns the shared `PipelineContext`
/// across components.
pub fn run(_common: &crate::common::Args, _args: &Args) -> Result<(), anyhow::Error> {
    anyhow::bail!(
        "propagate is intended to be driven by `run-all`, which owns the shared \
         PipelineContext and IdAllocator across components"
    );
}

const MASTER_CHUNK_SIZE: usize = 200;

/// Populate `ctx.xref_to_source`/`ctx.sources_by_id` the first time any
/// propagation step needs them (`§3` Lifecycle: indices are built lazily
/// and retained for the rest of the run).
fn ensure_source_index(xref_store: &dyn XrefStore, ctx: &mut PipelineContext) {
    if !ctx.sources_by_id.is_empty() {
        return;
    }
    for source in xref_store.sources() {
        ctx.sources_by_id.insert(source.id, source.clone());
    }
    for xref in xref_store.xrefs() {
        ctx.xref_to_source.insert(xref.id, xref.source_id);
    }
}

fn is_xref_source_known(ctx: &PipelineContext, xref_id: u32) -> bool {
    ctx.source_for_xref(xref_id)
        .map(|s| s.is_known())
        .unwrap_or(false)
}

fn xref_row(
    xref_store: &dyn XrefStore,
    allocator: &IdAllocator,
    ctx: &PipelineContext,
    xref_id: u32,
    dependent: bool,
) -> Option<XrefRow> {
    let xref = xref_store.xref_by_id(xref_id)?;
    let source = ctx.source_for_xref(xref_id)?;
    Some(XrefRow {
        xref_id: allocator.shift_xref_id(xref_id),
        external_db_id: source.external_db_id?,
        accession: xref.accession.clone(),
        label: xref.effective_label().to_string(),
        version: xref.version,
        description: xref.description.clone(),
        dependent,
    })
}

/// `§4.5(a)` Primary: write an `xref` row for every xref that the Parser
/// found an alignment for, guarded by `xrefs_written` and the source
/// filter.
pub fn propagate_primary(
    xref_store: &dyn XrefStore,
    allocator: &IdAllocator,
    ctx: &mut PipelineContext,
) -> usize {
    ensure_source_index(xref_store, ctx);

    let xref_ids: Vec<u32> = ctx.primary_xref_ids.keys().copied().collect();
    let mut written = 0;
    for xref_id in xref_ids {
        if ctx.is_xref_written(xref_id) {
            continue;
        }
        if !is_xref_source_known(ctx, xref_id) {
            continue;
        }
        if let Some(row) = xref_row(xref_store, allocator, ctx, xref_id, false) {
            ctx.xref_rows.push(row);
            ctx.mark_xref_written(xref_id);
            written += 1;
        }
    }
    written
}

/// `§4.5(b)` Dependent closure: for each master in `primary_xref_ids`,
/// walk `dependent_xref ⋈ xref`, writing xref/object_xref/go_xref rows and
/// inheriting identity metrics from the master.
pub fn propagate_dependents(
    xref_store: &dyn XrefStore,
    allocator: &IdAllocator,
    ctx: &mut PipelineContext,
) -> usize {
    ensure_source_index(xref_store, ctx);

    let masters: Vec<u32> = ctx.primary_xref_ids.keys().copied().collect();
    let mut written = 0;

    for chunk in &masters.iter().copied().chunks(MASTER_CHUNK_SIZE) {
        let chunk: Vec<u32> = chunk.collect();
        for (dependent_edge, _dependent_xref) in xref_store.dependents_of(&chunk) {
            let master_id = dependent_edge.master_xref_id;
            let dependent_id = dependent_edge.dependent_xref_id;

            if !is_xref_source_known(ctx, dependent_id) {
                continue;
            }

            if !ctx.is_xref_written(dependent_id) {
                if let Some(row) = xref_row(xref_store, allocator, ctx, dependent_id, true) {
                    ctx.xref_rows.push(row);
                    ctx.mark_xref_written(dependent_id);
                }
            }

            let linked_objects: Vec<(ObjectType, u32)> = ctx
                .primary_xref_ids
                .get(&master_id)
                .cloned()
                .unwrap_or_default();

            for (object_type, object_id) in linked_objects {
                if ctx.is_object_xref_written(object_type, object_id, dependent_id) {
                    continue;
                }

                let object_xref_id = allocator.next_object_xref_id();
                ctx.object_xref_rows.push(ObjectXrefRow {
                    object_xref_id,
                    object_type,
                    object_internal_id: object_id,
                    xref_id: allocator.shift_xref_id(dependent_id),
                    dependent: true,
                });

                if let Some(identity) = ctx.identity_for(object_type, object_id, master_id) {
                    ctx.set_identity(object_type, object_id, dependent_id, identity);
                }

                if ctx
                    .source_for_xref(dependent_id)
                    .map(|s| s.name == "GO")
                    .unwrap_or(false)
                {
                    ctx.go_rows.push(crate::model::GoXrefRow {
                        object_xref_id,
                        linkage_annotation: dependent_edge.linkage_annotation.clone(),
                    });
                }

                ctx.mark_object_xref_written(object_type, object_id, dependent_id);
                ctx.add_mapping(object_type, object_id, dependent_id);
                written += 1;
            }
        }
    }

    written
}

/// `§4.5(c)` Synonyms: emit `(xref_id, synonym)` rows for every xref that
/// ended up written as a primary or dependent xref.
pub fn propagate_synonyms(xref_store: &dyn XrefStore, allocator: &IdAllocator, ctx: &mut PipelineContext) -> usize {
    let mut written = 0;
    for synonym in xref_store.synonyms() {
        if !ctx.is_xref_written(synonym.xref_id) {
            continue;
        }
        ctx.synonym_rows.push(crate::model::Synonym {
            xref_id: allocator.shift_xref_id(synonym.xref_id),
            synonym: synonym.synonym.clone(),
        });
        written += 1;
    }
    written
}

/// Resolve a direct xref's curated stable id to a core internal id,
/// retrying with the legacy UTR-transcript `.1`..`.4` suffix fallback
/// (`§4.5` Direct xrefs).
fn resolve_direct_target(
    core_store: &dyn CoreStore,
    object_type: ObjectType,
    stable_id: &str,
) -> Option<u32> {
    if let Some(id) = core_store.stable_id_to_internal(object_type, stable_id) {
        return Some(id);
    }
    for suffix in 1..=4 {
        let candidate = format!("{stable_id}.{suffix}");
        if let Some(id) = core_store.stable_id_to_internal(object_type, &candidate) {
            return Some(id);
        }
    }
    None
}

/// `§4.5` Direct xrefs: an independent pass over hand-curated
/// xref-to-stable-id edges, including CCDS-to-translation retargeting.
pub fn propagate_direct(
    xref_store: &dyn XrefStore,
    core_store: &dyn CoreStore,
    allocator: &IdAllocator,
    ctx: &mut PipelineContext,
) -> usize {
    ensure_source_index(xref_store, ctx);

    let mut written = 0;
    for direct in xref_store.direct_xrefs() {
        if !is_xref_source_known(ctx, direct.xref_id) {
            continue;
        }

        let source_name = ctx
            .source_for_xref(direct.xref_id)
            .map(|s| s.name.clone())
            .unwrap_or_default();

        let (object_type, internal_id) = if source_name == "CCDS"
            && direct.object_type == ObjectType::Transcript
        {
            let Some(translation_stable_id) =
                core_store.translation_stable_id_for_transcript(&direct.ensembl_stable_id)
            else {
                warn!(
                    "{}",
                    XrefError::UnresolvedStableId {
                        stable_id: direct.ensembl_stable_id.clone(),
                        reason: "CCDS transcript has no translation".into(),
                    }
                );
                continue;
            };
            let Some(internal_id) = core_store
                .stable_id_to_internal(ObjectType::Translation, &translation_stable_id)
            else {
                warn!(
                    "{}",
                    XrefError::UnresolvedStableId {
                        stable_id: translation_stable_id,
                        reason: "CCDS-resolved translation is unknown to the core store".into(),
                    }
                );
                continue;
            };
            (ObjectType::Translation, internal_id)
        } else {
            let Some(internal_id) =
                resolve_direct_target(core_store, direct.object_type, &direct.ensembl_stable_id)
            else {
                warn!(
                    "{}",
                    XrefError::UnresolvedStableId {
                        stable_id: direct.ensembl_stable_id.clone(),
                        reason: "no match, including .1..4 fallback suffixes".into(),
                    }
                );
                continue;
            };
            (direct.object_type, internal_id)
        };

        if ctx.is_object_xref_written(object_type, internal_id, direct.xref_id) {
            continue;
        }

        if !ctx.is_xref_written(direct.xref_id) {
            if let Some(row) = xref_row(xref_store, allocator, ctx, direct.xref_id, false) {
                ctx.xref_rows.push(row);
                ctx.mark_xref_written(direct.xref_id);
            }
        }

        let object_xref_id = allocator.next_object_xref_id();
        ctx.object_xref_rows.push(ObjectXrefRow {
            object_xref_id,
            object_type,
            object_internal_id: internal_id,
            xref_id: allocator.shift_xref_id(direct.xref_id),
            dependent: false,
        });
        ctx.mark_object_xref_written(object_type, internal_id, direct.xref_id);
        ctx.add_mapping(object_type, internal_id, direct.xref_id);
        written += 1;
    }
    written
}

/// Any xref with a known source that is reachable through neither the
/// primary alignment nor the dependent closure is still emitted as a bare
/// `xref` row (`§4.5` "Orphan xrefs").
pub fn propagate_orphans(xref_store: &dyn XrefStore, allocator: &IdAllocator, ctx: &mut PipelineContext) -> usize {
    ensure_source_index(xref_store, ctx);

    let mut written = 0;
    let orphan_ids: Vec<u32> = xref_store
        .xrefs()
        .iter()
        .map(|x| x.id)
        .filter(|id| !ctx.is_xref_written(*id))
        .collect();

    for xref_id in orphan_ids {
        if !is_xref_source_known(ctx, xref_id) {
            continue;
        }
        if let Some(row) = xref_row(xref_store, allocator, ctx, xref_id, false) {
            ctx.xref_rows.push(row);
            ctx.mark_xref_written(xref_id);
            written += 1;
        }
    }
    written
}

/// Pass interpro/pfam pairs through verbatim (`§4.5`).
pub fn propagate_interpro(xref_store: &dyn XrefStore, ctx: &mut PipelineContext) {
    ctx.interpro_rows.extend(xref_store.interpro().iter().cloned());
}

/// Run every propagation sub-flow in the order required to satisfy the
/// `§5` ordering guarantee (all primary `object_xref` rows precede any
/// dependent ones).
pub fn run_all(
    xref_store: &dyn XrefStore,
    core_store: &dyn CoreStore,
    allocator: &IdAllocator,
    ctx: &mut PipelineContext,
) {
    propagate_primary(xref_store, allocator, ctx);
    propagate_dependents(xref_store, allocator, ctx);
    propagate_synonyms(xref_store, allocator, ctx);
    propagate_direct(xref_store, core_store, allocator, ctx);
    propagate_orphans(xref_store, allocator, ctx);
    propagate_interpro(xref_store, ctx);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DependentXref, DirectXref, Sequence, SequenceType, Source, Synonym, Transcript, Translation, Xref};
    use crate::store::{InMemoryCoreStore, InMemoryXrefStore};

    fn allocator() -> IdAllocator {
        IdAllocator::from_core_store(&InMemoryCoreStore::default())
    }

    fn xref(id: u32, source_id: u32) -> Xref {
        Xref {
            id,
            accession: format!("ACC{id}"),
            version: 1,
            label: String::new(),
            description: String::new(),
            source_id,
            species_id: 1,
            sequence: Some(Sequence {
                kind: SequenceType::Dna,
                seq: "ACGT".into(),
            }),
        }
    }

    /// Scenario B: master xref 7 aligns to Translation 42; dependent xref 9
    /// has master 7. Expect an `object_xref` row Translation 42 <-> 9
    /// (DEPENDENT), with identities inherited.
    #[test]
    fn scenario_b_dependent_inheritance() {
        let store = InMemoryXrefStore {
            sources: vec![
                Source { id: 1, name: "RefSeq_peptide".into(), external_db_id: Some(100) },
                Source { id: 2, name: "GO".into(), external_db_id: Some(200) },
            ],
            xrefs: vec![xref(7, 1), xref(9, 2)],
            dependent_xrefs: vec![DependentXref {
                master_xref_id: 7,
                dependent_xref_id: 9,
                linkage_annotation: "IEA".into(),
            }],
            ..Default::default()
        };

        let allocator = allocator();
        let mut ctx = PipelineContext::default();
        ctx.primary_xref_ids.insert(7, vec![(ObjectType::Translation, 42)]);
        ctx.set_identity(ObjectType::Translation, 42, 7, (80, 70));
        ctx.mark_object_xref_written(ObjectType::Translation, 42, 7);

        propagate_primary(&store, &allocator, &mut ctx);
        propagate_dependents(&store, &allocator, &mut ctx);

        assert!(ctx.is_xref_written(9));
        let row = ctx
            .object_xref_rows
            .iter()
            .find(|r| r.xref_id == allocator.shift_xref_id(9))
            .expect("dependent object_xref row present");
        assert_eq!(row.object_internal_id, 42);
        assert_eq!(row.object_type, ObjectType::Translation);
        assert!(row.dependent);

        assert_eq!(
            ctx.identity_for(ObjectType::Translation, 42, 9),
            Some((80, 70))
        );
        assert_eq!(ctx.go_rows.len(), 1);
        assert_eq!(ctx.go_rows[0].linkage_annotation, "IEA");
    }

    /// Scenario C: CCDS direct xref to transcript T-001, whose translation
    /// stable id is P-001 / internal id 501; expect one object_xref row
    /// linking the xref to Translation 501.
    #[test]
    fn scenario_c_ccds_retargeting() {
        let xref_store = InMemoryXrefStore {
            sources: vec![Source {
                id: 1,
                name: "CCDS".into(),
                external_db_id: Some(100),
            }],
            xrefs: vec![xref(50, 1)],
            direct_xrefs: vec![DirectXref {
                xref_id: 50,
                ensembl_stable_id: "T-001".into(),
                object_type: ObjectType::Transcript,
                linkage_xref: None,
            }],
            ..Default::default()
        };
        let core_store = InMemoryCoreStore {
            transcripts: vec![Transcript {
                internal_id: 5,
                stable_id: "T-001".into(),
                gene_internal_id: 1,
                length: 10,
                spliced_dna: "ACGTACGTAC".into(),
                location: "chr1".into(),
            }],
            translations: vec![Translation {
                internal_id: 501,
                stable_id: "P-001".into(),
                transcript_internal_id: 5,
                peptide: "MKV".into(),
            }],
            ..Default::default()
        };

        let allocator = allocator();
        let mut ctx = PipelineContext::default();
        propagate_direct(&xref_store, &core_store, &allocator, &mut ctx);

        assert_eq!(ctx.object_xref_rows.len(), 1);
        let row = &ctx.object_xref_rows[0];
        assert_eq!(row.object_internal_id, 501);
        assert_eq!(row.object_type, ObjectType::Translation);
        assert_eq!(row.xref_id, allocator.shift_xref_id(50));
    }

    #[test]
    fn ccds_without_translation_is_dropped() {
        let xref_store = InMemoryXrefStore {
            sources: vec![Source {
                id: 1,
                name: "CCDS".into(),
                external_db_id: Some(100),
            }],
            xrefs: vec![xref(50, 1)],
            direct_xrefs: vec![DirectXref {
                xref_id: 50,
                ensembl_stable_id: "T-002".into(),
                object_type: ObjectType::Transcript,
                linkage_xref: None,
            }],
            ..Default::default()
        };
        let core_store = InMemoryCoreStore {
            transcripts: vec![Transcript {
                internal_id: 6,
                stable_id: "T-002".into(),
                gene_internal_id: 1,
                length: 10,
                spliced_dna: "ACGTACGTAC".into(),
                location: "chr1".into(),
            }],
            ..Default::default()
        };

        let allocator = allocator();
        let mut ctx = PipelineContext::default();
        let written = propagate_direct(&xref_store, &core_store, &allocator, &mut ctx);
        assert_eq!(written, 0);
        assert!(ctx.object_xref_rows.is_empty());
    }

    #[test]
    fn direct_xref_falls_back_to_dotted_utr_suffix() {
        let xref_store = InMemoryXrefStore {
            sources: vec![Source {
                id: 1,
                name: "RefSeq_dna".into(),
                external_db_id: Some(100),
            }],
            xrefs: vec![xref(60, 1)],
            direct_xrefs: vec![DirectXref {
                xref_id: 60,
                ensembl_stable_id: "T-100".into(),
                object_type: ObjectType::Transcript,
                linkage_xref: None,
            }],
            ..Default::default()
        };
        let core_store = InMemoryCoreStore {
            transcripts: vec![Transcript {
                internal_id: 9,
                stable_id: "T-100.2".into(),
                gene_internal_id: 1,
                length: 10,
                spliced_dna: "ACGTACGTAC".into(),
                location: "chr1".into(),
            }],
            ..Default::default()
        };

        let allocator = allocator();
        let mut ctx = PipelineContext::default();
        let written = propagate_direct(&xref_store, &core_store, &allocator, &mut ctx);
        assert_eq!(written, 1);
        assert_eq!(ctx.object_xref_rows[0].object_internal_id, 9);
    }

    #[test]
    fn unknown_source_is_dropped_silently_everywhere() {
        let store = InMemoryXrefStore {
            sources: vec![Source {
                id: 1,
                name: "Mystery".into(),
                external_db_id: None,
            }],
            xrefs: vec![xref(1, 1)],
            ..Default::default()
        };
        let allocator = allocator();
        let mut ctx = PipelineContext::default();
        ctx.primary_xref_ids.insert(1, vec![(ObjectType::Transcript, 1)]);

        let written = propagate_primary(&store, &allocator, &mut ctx);
        assert_eq!(written, 0);
        assert!(!ctx.is_xref_written(1));
    }

    #[test]
    fn orphan_xref_is_emitted_bare() {
        let store = InMemoryXrefStore {
            sources: vec![Source {
                id: 1,
                name: "RefSeq_dna".into(),
                external_db_id: Some(100),
            }],
            xrefs: vec![xref(1, 1)],
            ..Default::default()
        };
        let allocator = allocator();
        let mut ctx = PipelineContext::default();

        let written = propagate_orphans(&store, &allocator, &mut ctx);
        assert_eq!(written, 1);
        assert_eq!(ctx.xref_rows.len(), 1);
        assert!(!ctx.xref_rows[0].dependent);
    }

    #[test]
    fn synonyms_only_emitted_for_written_xrefs() {
        let store = InMemoryXrefStore {
            synonyms: vec![
                Synonym { xref_id: 1, synonym: "syn-a".into() },
                Synonym { xref_id: 2, synonym: "syn-b".into() },
            ],
            ..Default::default()
        };
        let allocator = allocator();
        let mut ctx = PipelineContext::default();
        ctx.mark_xref_written(1);

        let written = propagate_synonyms(&store, &allocator, &mut ctx);
        assert_eq!(written, 1);
        assert_eq!(ctx.synonym_rows[0].synonym, "syn-a");
    }

    #[test]
    fn interpro_passes_through_verbatim() {
        let store = InMemoryXrefStore {
            interpro: vec![crate::model::Interpro {
                interpro_accession: "IPR000001".into(),
                pfam_accession: "PF00001".into(),
            }],
            ..Default::default()
        };
        let mut ctx = PipelineContext::default();
        propagate_interpro(&store, &mut ctx);
        assert_eq!(ctx.interpro_rows.len(), 1);
    }
}
