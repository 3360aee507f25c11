//! Display-Xref Selector (C6, `§4.6`).
//!
//! Picks a single best xref per Transcript/Translation, reconciles the two
//! into one per-transcript display xref, then rolls up to one per gene.

use std::collections::HashMap;

use clap::Parser;
use tracing::warn;

use crate::context::PipelineContext;
use crate::ids::IdAllocator;
use crate::model::ObjectType;
use crate::store::CoreStore;

/// Command line arguments for the `select-display` sub command.
#[derive(Parser, Debug)]
#[command(about = "Select display xrefs for transcripts and genes", long_about = None)]
pub struct Args {
    #[arg(long, required = true)]
    pub path_work_dir: std::path::PathBuf,
}

/// Standalone invocation has no access to the mapping/identity indices
/// built up by the Parser and Propagator; `run-all` owns the shared
/// `PipelineContext` across components.
pub fn run(_common: &crate::common::Args, _args: &Args) -> Result<(), anyhow::Error> {
    anyhow::bail!(
        "select-display is intended to be driven by `run-all`, which owns the shared \
         PipelineContext and IdAllocator across components"
    );
}

/// `(xref_id, priority_idx)` — lower `priority_idx` is better.
type BestXref = (u32, i32);

fn priority_of(priorities: &[String], source_name: &str) -> i32 {
    priorities
        .iter()
        .position(|s| s == source_name)
        .map(|i| i as i32)
        .unwrap_or(-1)
}

/// `§4.6` Phase 1: for one object's candidate xrefs, find the best by
/// `(priority_idx, query_identity)`, lower priority first, ties broken by
/// higher query identity. Xrefs with unknown source or priority `-1` are
/// disqualified.
fn best_for_object(
    priorities: &[String],
    ctx: &PipelineContext,
    object_type: ObjectType,
    object_id: u32,
) -> Option<BestXref> {
    let mut best: Option<(u32, i32, u8)> = None;
    for &xref_id in ctx.mappings_for(object_type, object_id) {
        let Some(source) = ctx.source_for_xref(xref_id) else {
            warn!("xref {xref_id} has no known source, disqualified from display selection");
            continue;
        };
        let priority_idx = priority_of(priorities, &source.name);
        if priority_idx < 0 {
            continue;
        }
        let query_identity = ctx
            .identity_for(object_type, object_id, xref_id)
            .map(|(qi, _)| qi)
            .unwrap_or(0);

        let better = match best {
            None => true,
            Some((_, best_priority, best_qi)) => {
                priority_idx < best_priority || (priority_idx == best_priority && query_identity > best_qi)
            }
        };
        if better {
            best = Some((xref_id, priority_idx, query_identity));
        }
    }
    best.map(|(xref_id, priority_idx, _)| (xref_id, priority_idx))
}

/// `§4.6` Phase 1 over every Transcript/Translation known to the core
/// store.
pub fn select_per_object_best(
    core: &dyn CoreStore,
    priorities: &[String],
    ctx: &PipelineContext,
) -> HashMap<(ObjectType, u32), BestXref> {
    let mut best = HashMap::new();
    for transcript in core.transcripts() {
        if let Some(b) = best_for_object(priorities, ctx, ObjectType::Transcript, transcript.internal_id) {
            best.insert((ObjectType::Transcript, transcript.internal_id), b);
        }
    }
    for translation in core.translations() {
        if let Some(b) = best_for_object(priorities, ctx, ObjectType::Translation, translation.internal_id) {
            best.insert((ObjectType::Translation, translation.internal_id), b);
        }
    }
    best
}

/// `XrefRow`/row for `transcript_display_xref.{sql,txt}`.
///
/// `priority_idx` belongs to whichever side (Transcript or Translation)
/// actually produced `xref_id`, so Phase 3 can roll genes up without
/// re-deriving which side won.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptDisplayXref {
    pub transcript_id: u32,
    pub xref_id: u32,
    pub priority_idx: i32,
}

/// `XrefRow`/row for `gene_display_xref.{sql,txt}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneDisplayXref {
    pub gene_id: u32,
    pub xref_id: u32,
}

/// `§4.6` Phase 2: reconcile each transcript's best xref with its
/// translation's, if any. The translation wins only on a strictly better
/// priority AND a strictly higher query identity (Scenario E); otherwise
/// the transcript's own best wins (Scenario D).
pub fn reconcile_transcripts(
    core: &dyn CoreStore,
    ctx: &PipelineContext,
    obj_to_best_xref: &HashMap<(ObjectType, u32), BestXref>,
) -> Vec<TranscriptDisplayXref> {
    let mut rows = Vec::new();
    for transcript in core.transcripts() {
        let transcript_best = obj_to_best_xref.get(&(ObjectType::Transcript, transcript.internal_id)).copied();
        let translation = core.translation_for_transcript(transcript.internal_id);
        let translation_best = translation
            .and_then(|tr| obj_to_best_xref.get(&(ObjectType::Translation, tr.internal_id)).map(|b| (tr, *b)));

        let (xref_id, priority_idx) = match (transcript_best, translation_best) {
            (None, None) => continue,
            (Some((xref_id, priority_idx)), None) => (xref_id, priority_idx),
            (None, Some((_, (xref_id, priority_idx)))) => (xref_id, priority_idx),
            (Some((t_xref, t_priority)), Some((translation, (p_xref, p_priority)))) => {
                let t_qi = ctx
                    .identity_for(ObjectType::Transcript, transcript.internal_id, t_xref)
                    .map(|(qi, _)| qi)
                    .unwrap_or(0);
                let p_qi = ctx
                    .identity_for(ObjectType::Translation, translation.internal_id, p_xref)
                    .map(|(qi, _)| qi)
                    .unwrap_or(0);
                if p_priority < t_priority && p_qi > t_qi {
                    (p_xref, p_priority)
                } else {
                    (t_xref, t_priority)
                }
            }
        };
        rows.push(TranscriptDisplayXref {
            transcript_id: transcript.internal_id,
            xref_id,
            priority_idx,
        });
    }
    rows
}

/// `§4.6` Phase 3: one display xref per gene, the lowest-priority xref
/// among its transcripts, ties broken by longest transcript length
/// (Scenario F).
///
/// Reads `priority_idx` straight off each `TranscriptDisplayXref` rather
/// than re-deriving it from Phase 1's per-object map, since Phase 2 may
/// have overridden a transcript's own best with its translation's
/// (Scenario E) — re-deriving by object type alone would pair the
/// winning `xref_id` with the wrong side's priority.
pub fn select_gene_display_xrefs(
    core: &dyn CoreStore,
    transcript_display: &[TranscriptDisplayXref],
) -> Vec<GeneDisplayXref> {
    let transcript_info: HashMap<u32, (u32, i32)> = transcript_display
        .iter()
        .map(|row| (row.transcript_id, (row.xref_id, row.priority_idx)))
        .collect();

    let mut rows = Vec::new();
    for gene in core.genes() {
        let mut best: Option<(u32, i32, u32)> = None; // (xref_id, priority_idx, transcript_length)
        for transcript in core.transcripts_of_gene(gene.internal_id) {
            let Some(&(xref_id, priority_idx)) = transcript_info.get(&transcript.internal_id) else {
                continue;
            };

            let better = match best {
                None => true,
                Some((_, best_priority, best_len)) => {
                    priority_idx < best_priority
                        || (priority_idx == best_priority && transcript.length > best_len)
                }
            };
            if better {
                best = Some((xref_id, priority_idx, transcript.length));
            }
        }
        if let Some((xref_id, _, _)) = best {
            rows.push(GeneDisplayXref {
                gene_id: gene.internal_id,
                xref_id,
            });
        }
    }
    rows
}

/// Run all three phases and shift the winning xref ids into the target id
/// space for emission.
pub fn run_all(
    core: &dyn CoreStore,
    priorities: &[String],
    allocator: &IdAllocator,
    ctx: &PipelineContext,
) -> (Vec<TranscriptDisplayXref>, Vec<GeneDisplayXref>) {
    let obj_to_best_xref = select_per_object_best(core, priorities, ctx);
    let transcript_rows = reconcile_transcripts(core, ctx, &obj_to_best_xref);
    let gene_rows = select_gene_display_xrefs(core, &transcript_rows);

    let shifted_transcripts = transcript_rows
        .into_iter()
        .map(|row| TranscriptDisplayXref {
            transcript_id: row.transcript_id,
            xref_id: allocator.shift_xref_id(row.xref_id),
            priority_idx: row.priority_idx,
        })
        .collect();
    let shifted_genes = gene_rows
        .into_iter()
        .map(|row| GeneDisplayXref {
            gene_id: row.gene_id,
            xref_id: allocator.shift_xref_id(row.xref_id),
        })
        .collect();
    (shifted_transcripts, shifted_genes)
}
