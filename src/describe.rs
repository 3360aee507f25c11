//! Gene-Description Builder (C7, `§4.7`).
//!
//! Filters xref descriptions through the species' regex list, pools every
//! xref reachable from a gene's transcripts/translations, and picks one
//! winner under a total order.

use std::cmp::Ordering;

use clap::Parser;
use regex::Regex;

use crate::context::PipelineContext;
use crate::model::ObjectType;
use crate::store::{CoreStore, XrefStore};

/// Command line arguments for the `describe-genes` sub command.
#[derive(Parser, Debug)]
#[command(about = "Build one description per gene from its xref pool", long_about = None)]
pub struct Args {
    #[arg(long, required = true)]
    pub path_work_dir: std::path::PathBuf,
}

/// Standalone invocation has no access to the mapping/identity indices
/// built up earlier in the pipeline; `run-all` owns the shared
/// `PipelineContext` across components.
pub fn run(_common: &crate::common::Args, _args: &Args) -> Result<(), anyhow::Error> {
    anyhow::bail!(
        "describe-genes is intended to be driven by `run-all`, which owns the shared \
         PipelineContext across components"
    );
}

const SPTREMBL_FILLER_WORDS: &[&str] = &[
    "unknown",
    "hypothetical",
    "putative",
    "novel",
    "probable",
    "[0-9]{3}",
    "kDa",
    "fragment",
    "cdna",
    "protein",
];

/// One gene-description emission row (`§4.7`, `§6`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneDescriptionRow {
    pub gene_id: u32,
    pub description: String,
}

/// One candidate in a gene's description pool: the xref id plus the
/// metrics needed by the total order, resolved once up front so the
/// comparator stays pure.
#[derive(Debug, Clone)]
struct Candidate {
    xref_id: u32,
    accession: String,
    filtered_description: String,
    source_name: String,
    query_identity: u8,
    target_identity: u8,
}

/// Apply every filter regex (case-insensitive), in order, deleting all
/// matches. Returns `None` if the result is empty (`§4.7` step 1).
fn filtered_description(description: &str, filters: &[Regex]) -> Option<String> {
    let mut text = description.to_string();
    for filter in filters {
        text = filter.replace_all(&text, "").to_string();
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Compile the species' `description_filters` as case-insensitive regexes.
pub fn compile_filters(patterns: &[String]) -> Result<Vec<Regex>, anyhow::Error> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).map_err(anyhow::Error::from))
        .collect()
}

fn source_rank(source_name: &str, consortium: Option<&str>) -> i32 {
    let ranked = [
        "Uniprot/SPTREMBL",
        "RefSeq_dna",
        "RefSeq_peptide",
        "Uniprot/SWISSPROT",
    ];
    if let Some(idx) = ranked.iter().position(|s| *s == source_name) {
        return idx as i32 + 1;
    }
    if consortium == Some(source_name) {
        return ranked.len() as i32 + 1;
    }
    0
}

/// Highest index of any filler word found in `description`, or `-1` if
/// none match (`§4.7` step 3, SPTREMBL branch).
fn sptrembl_cleanliness(description: &str) -> i32 {
    let mut best = -1i32;
    for (idx, word) in SPTREMBL_FILLER_WORDS.iter().enumerate() {
        let pattern = format!("(?i){word}");
        if let Ok(re) = Regex::new(&pattern) {
            if re.is_match(description) {
                best = best.max(idx as i32);
            }
        }
    }
    best
}

/// The `§4.7` step 3 total order: greater is better, last after a stable
/// sort is the winner.
fn compare_candidates(a: &Candidate, b: &Candidate, consortium: Option<&str>) -> Ordering {
    let rank_a = source_rank(&a.source_name, consortium);
    let rank_b = source_rank(&b.source_name, consortium);
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }

    if a.source_name != b.source_name {
        return Ordering::Equal;
    }

    match a.source_name.as_str() {
        "Uniprot/SWISSPROT" | "RefSeq_dna" | "RefSeq_peptide" => {
            (a.query_identity, a.target_identity).cmp(&(b.query_identity, b.target_identity))
        }
        "Uniprot/SPTREMBL" => {
            sptrembl_cleanliness(&a.filtered_description).cmp(&sptrembl_cleanliness(&b.filtered_description))
        }
        _ => Ordering::Equal,
    }
}

/// Collect every xref reachable from `gene`'s transcripts and
/// translations, keeping the metrics needed for the total order
/// (`§4.7` step 2).
fn gather_candidates(
    core: &dyn CoreStore,
    xref_store: &dyn XrefStore,
    ctx: &PipelineContext,
    filters: &[Regex],
    gene_internal_id: u32,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for transcript in core.transcripts_of_gene(gene_internal_id) {
        collect_for_object(
            xref_store,
            ctx,
            filters,
            ObjectType::Transcript,
            transcript.internal_id,
            &mut candidates,
        );
        if let Some(translation) = core.translation_for_transcript(transcript.internal_id) {
            collect_for_object(
                xref_store,
                ctx,
                filters,
                ObjectType::Translation,
                translation.internal_id,
                &mut candidates,
            );
        }
    }
    candidates
}

fn collect_for_object(
    xref_store: &dyn XrefStore,
    ctx: &PipelineContext,
    filters: &[Regex],
    object_type: ObjectType,
    object_id: u32,
    out: &mut Vec<Candidate>,
) {
    for &xref_id in ctx.mappings_for(object_type, object_id) {
        let Some(xref) = xref_store.xref_by_id(xref_id) else {
            continue;
        };
        let Some(filtered) = filtered_description(&xref.description, filters) else {
            continue;
        };
        let Some(source) = ctx.source_for_xref(xref_id) else {
            continue;
        };
        let (query_identity, target_identity) = ctx
            .identity_for(object_type, object_id, xref_id)
            .unwrap_or((0, 0));

        out.push(Candidate {
            xref_id,
            accession: xref.accession.clone(),
            filtered_description: filtered,
            source_name: source.name.clone(),
            query_identity,
            target_identity,
        });
    }
}

/// Build the gene description for one gene, if it has any eligible
/// candidate (`§4.7` step 4).
pub fn describe_gene(
    core: &dyn CoreStore,
    xref_store: &dyn XrefStore,
    ctx: &PipelineContext,
    filters: &[Regex],
    consortium: Option<&str>,
    gene_internal_id: u32,
) -> Option<GeneDescriptionRow> {
    let mut candidates = gather_candidates(core, xref_store, ctx, filters, gene_internal_id);
    if candidates.is_empty() {
        return None;
    }
    candidates.sort_by(|a, b| compare_candidates(a, b, consortium));
    let winner = candidates.last()?;
    Some(GeneDescriptionRow {
        gene_id: gene_internal_id,
        description: format!(
            "{} [Source:{};Acc:{}]",
            winner.filtered_description, winner.source_name, winner.accession
        ),
    })
}

/// Run the builder over every gene in the core store.
pub fn describe_genes(
    core: &dyn CoreStore,
    xref_store: &dyn XrefStore,
    ctx: &PipelineContext,
    filters: &[Regex],
    consortium: Option<&str>,
) -> Vec<GeneDescriptionRow> {
    core.genes()
        .iter()
        .filter_map(|gene| describe_gene(core, xref_store, ctx, filters, consortium, gene.internal_id))
        .collect()
}
