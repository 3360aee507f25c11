//! Alignment-Output Parser (C4, `§4.4`).
//!
//! Reads per-job `.map` files, applies per-method identity thresholds, and
//! emits primary object<->xref rows plus their identity metrics.

use std::path::Path;

use clap::Parser;
use tracing::{debug, warn};

use crate::context::PipelineContext;
use crate::ids::IdAllocator;
use crate::model::{IdentityXref, ObjectType, ObjectXrefRow};

/// Command line arguments for the `parse-alignments` sub command.
#[derive(Parser, Debug)]
#[command(about = "Parse alignment .map files into object_xref/identity_xref rows", long_about = None)]
pub struct Args {
    /// Paths to the `.map` files emitted by the alignment jobs.
    #[arg(long = "path-map", required = true)]
    pub path_maps: Vec<std::path::PathBuf>,
    /// Analysis id recorded on every `identity_xref` row.
    #[arg(long, default_value_t = 1)]
    pub analysis_id: u32,
}

/// `(query_identity%, target_identity%)` thresholds for one alignment
/// method, recorded globally by the Dispatcher (`§4.3`).
pub type MethodThresholds = std::collections::HashMap<String, (u8, u8)>;

/// One parsed-and-kept alignment record, prior to being turned into rows.
#[derive(Debug, Clone, PartialEq)]
struct AlignmentRecord {
    xref_id: u32,
    object_internal_id: u32,
    query_identity: u8,
    target_identity: u8,
    query_start: u32,
    query_end: u32,
    target_start: u32,
    target_end: u32,
    cigar_line: String,
    score: f64,
}

/// Split a `.map` file name into `(method_name, object_type)`, per
/// `<Method>_<dna|peptide>_<N>.map` (`§4.4`, `§6`).
fn object_type_from_file_name(file_name: &str) -> Option<(String, ObjectType)> {
    let stem = file_name.strip_suffix(".map").unwrap_or(file_name);
    if let Some(idx) = stem.find("_dna_") {
        return Some((stem[..idx].to_string(), ObjectType::Transcript));
    }
    if let Some(idx) = stem.find("_peptide_") {
        return Some((stem[..idx].to_string(), ObjectType::Translation));
    }
    None
}

/// Parse one colon-separated alignment line, applying the method's
/// identity thresholds (`§4.4`, Scenario A).
fn parse_line(line: &str, thresholds: (u8, u8)) -> Result<Option<AlignmentRecord>, anyhow::Error> {
    let fields: Vec<&str> = line.split(':').collect();
    anyhow::ensure!(
        fields.len() == 12,
        "expected 12 colon-separated fields, got {} in {line:?}",
        fields.len()
    );

    let query_id: u32 = fields[1].parse()?;
    let target_id: u32 = fields[2].parse()?;
    let identity: u32 = fields[3].parse()?;
    let query_len: u32 = fields[4].parse()?;
    let target_len: u32 = fields[5].parse()?;
    let q_start: u32 = fields[6].parse()?;
    let q_end: u32 = fields[7].parse()?;
    let t_start: u32 = fields[8].parse()?;
    let t_end: u32 = fields[9].parse()?;
    let cigar: String = fields[10].split_whitespace().collect();
    let score: f64 = fields[11].parse()?;

    anyhow::ensure!(query_len > 0 && target_len > 0, "zero-length query/target");

    let query_identity = (100 * identity / query_len) as u8;
    let target_identity = (100 * identity / target_len) as u8;

    let (query_threshold, target_threshold) = thresholds;
    if query_identity < query_threshold && target_identity < target_threshold {
        return Ok(None);
    }

    Ok(Some(AlignmentRecord {
        xref_id: query_id,
        object_internal_id: target_id,
        query_identity,
        target_identity,
        // Re-index starts from 0-based to 1-based; ends are left as-is
        // (`§4.4`, `§9` Open Question on coordinate conventions).
        query_start: q_start + 1,
        query_end: q_end,
        target_start: t_start + 1,
        target_end: t_end,
        cigar_line: cigar,
        score,
    }))
}

/// Parse one `.map` file, updating `ctx`'s mapping/identity indices and
/// appending rows for every kept record.
pub fn parse_map_file(
    path: &Path,
    thresholds: &MethodThresholds,
    allocator: &IdAllocator,
    analysis_id: u32,
    ctx: &mut PipelineContext,
) -> Result<usize, anyhow::Error> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("invalid map file path {path:?}"))?;
    let Some((method_name, object_type)) = object_type_from_file_name(file_name) else {
        anyhow::bail!("could not derive object type from map file name {file_name:?}");
    };

    let Some(&threshold) = thresholds.get(&method_name) else {
        warn!("no threshold registered for method {method_name:?}, skipping {file_name:?}");
        return Ok(0);
    };

    let content = std::fs::read_to_string(path)?;
    let mut kept = 0;
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = match parse_line(line, threshold) {
            Ok(record) => record,
            Err(err) => {
                warn!("skipping malformed line {line_no} in {file_name:?}: {err}");
                continue;
            }
        };
        let Some(record) = record else {
            debug!("line {line_no} in {file_name:?} below threshold, dropped");
            continue;
        };

        let object_xref_id = allocator.next_object_xref_id();
        ctx.object_xref_rows.push(ObjectXrefRow {
            object_xref_id,
            object_type,
            object_internal_id: record.object_internal_id,
            xref_id: allocator.shift_xref_id(record.xref_id),
            dependent: false,
        });
        ctx.identity_rows.push(IdentityXref {
            object_xref_id,
            query_identity: record.query_identity,
            target_identity: record.target_identity,
            query_start: record.query_start,
            query_end: record.query_end,
            target_start: record.target_start,
            target_end: record.target_end,
            cigar_line: record.cigar_line,
            score: record.score,
            evalue: None,
            analysis_id,
        });

        ctx.add_mapping(object_type, record.object_internal_id, record.xref_id);
        ctx.set_identity(
            object_type,
            record.object_internal_id,
            record.xref_id,
            (record.query_identity, record.target_identity),
        );
        ctx.primary_xref_ids
            .entry(record.xref_id)
            .or_default()
            .push((object_type, record.object_internal_id));
        ctx.mark_object_xref_written(object_type, record.object_internal_id, record.xref_id);

        kept += 1;
    }

    Ok(kept)
}

/// Main entry point for the `parse-alignments` sub command.
pub fn run(_common: &crate::common::Args, _args: &Args) -> Result<(), anyhow::Error> {
    anyhow::bail!(
        "parse-alignments is intended to be driven by `run-all`, which owns the shared \
         PipelineContext and IdAllocator across components"
    );
}
