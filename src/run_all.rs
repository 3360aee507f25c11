//! Top-level pipeline orchestration for the `run-all` sub command.
//!
//! Owns the single `PipelineContext` and `IdAllocator` for a run and
//! drives every component in dependency order: dump, dispatch, parse,
//! propagate, select, describe, emit.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use crate::context::PipelineContext;
use crate::dispatch::JobRequest;
use crate::ids::IdAllocator;
use crate::model::ObjectType;
use crate::scheduler::LocalProcessScheduler;

/// Command line arguments for the `run-all` sub command.
#[derive(Parser, Debug)]
#[command(about = "Run the full xref-mapping pipeline end to end", long_about = None)]
pub struct Args {
    /// Working directory for FASTA, `.map`, and output files.
    #[arg(long, required = true)]
    pub path_work_dir: PathBuf,
    /// Species configuration TOML file.
    #[arg(long, required = true)]
    pub path_config: PathBuf,
    /// Developer-mode fixture directory standing in for the xref store.
    #[arg(long, required = true)]
    pub path_xref_fixture_dir: PathBuf,
    /// Developer-mode fixture directory standing in for the core store.
    #[arg(long, required = true)]
    pub path_core_fixture_dir: PathBuf,
    /// Method-handler registry TOML file.
    #[arg(long, required = true)]
    pub path_registry: PathBuf,
    /// Species name, used in core FASTA file names.
    #[arg(long, required = true)]
    pub species: String,
    /// Skip the dispatch/alignment step and parse `.map` files already
    /// present in the working directory (`§8` round-trip property).
    #[arg(long)]
    pub use_existing_mappings: bool,
    /// Skip dumping FASTAs already present on disk.
    #[arg(long)]
    pub dumpcheck: bool,
}

pub fn run(_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let config = crate::config::SpeciesConfig::load_from_path(&args.path_config)?;
    let xref_store = crate::fixture::load_xref_store(&args.path_xref_fixture_dir)?;
    let core_store = crate::fixture::load_core_store(&args.path_core_fixture_dir)?;
    let rules = crate::rules::compile_rules(&xref_store, &config.rules())?;
    let registry = crate::dispatch::load_registry(&args.path_registry)?;

    let allocator = IdAllocator::from_core_store(&core_store);
    let mut ctx = PipelineContext::default();

    info!("dumping xref and core FASTAs to {:?}", args.path_work_dir);
    crate::dump::dump_xref_fastas(&xref_store, &rules, &args.path_work_dir, args.dumpcheck)?;
    crate::dump::dump_core_fastas(
        &core_store,
        &args.path_work_dir,
        &args.species,
        None,
        None,
        args.dumpcheck,
    )?;

    let mut thresholds = crate::parse::MethodThresholds::new();
    for (method_name, handler) in &registry {
        thresholds.insert(method_name.clone(), (handler.query_threshold, handler.target_threshold));
        ctx.method_thresholds
            .insert(method_name.clone(), (handler.query_threshold, handler.target_threshold));
    }

    let map_paths: Vec<PathBuf> = if args.use_existing_mappings {
        existing_map_files(&args.path_work_dir)?
    } else {
        let scheduler = LocalProcessScheduler::default();
        let requests = job_requests(&rules, &args.path_work_dir, &args.species);
        let job_ids = crate::dispatch::submit_all(&registry, &scheduler, &args.path_work_dir, &requests, &mut ctx);
        crate::dispatch::wait_for_all(&scheduler, &job_ids)?;
        existing_map_files(&args.path_work_dir)?
    };

    let mut parsed = 0;
    for path in &map_paths {
        parsed += crate::parse::parse_map_file(path, &thresholds, &allocator, 1, &mut ctx)?;
    }
    info!("parsed {parsed} alignment record(s) from {} map file(s)", map_paths.len());

    crate::propagate::run_all(&xref_store, &core_store, &allocator, &mut ctx);

    let (transcript_display, gene_display) =
        crate::select::run_all(&core_store, &config.display_sources, &allocator, &ctx);

    let filters = crate::describe::compile_filters(&config.description_filters)?;
    let gene_descriptions = crate::describe::describe_genes(
        &core_store,
        &xref_store,
        &ctx,
        &filters,
        config.consortium.as_deref(),
    );

    crate::emit::emit_all(&ctx, &gene_descriptions, &transcript_display, &gene_display, &args.path_work_dir)?;

    info!(
        "run-all complete: {} xrefs, {} object_xrefs, {} gene descriptions",
        ctx.xref_rows.len(),
        ctx.object_xref_rows.len(),
        gene_descriptions.len()
    );
    Ok(())
}

fn existing_map_files(work_dir: &std::path::Path) -> Result<Vec<PathBuf>, anyhow::Error> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(work_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("map") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn job_requests(
    rules: &[crate::rules::CompiledRule],
    work_dir: &std::path::Path,
    species: &str,
) -> Vec<JobRequest> {
    let mut requests = Vec::new();
    for (rule_index, rule) in rules.iter().enumerate() {
        requests.push(JobRequest {
            method_name: rule.method_name.clone(),
            query_fasta: work_dir.join(format!("xref_{rule_index}_dna.fasta")),
            target_fasta: work_dir.join(format!("{species}_dna.fasta")),
            object_type: ObjectType::Transcript,
        });
        requests.push(JobRequest {
            method_name: rule.method_name.clone(),
            query_fasta: work_dir.join(format!("xref_{rule_index}_peptide.fasta")),
            target_fasta: work_dir.join(format!("{species}_protein.fasta")),
            object_type: ObjectType::Translation,
        });
    }
    requests
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_requests_pair_dna_and_peptide_per_rule() {
        let rules = crate::rules::compile_rules(
            &crate::store::InMemoryXrefStore::default(),
            &[crate::model::Rule {
                method_name: "m".into(),
                patterns: vec![("*".into(), "*".into())],
            }],
        )
        .unwrap();
        let requests = job_requests(&rules, std::path::Path::new("/work"), "danio_rerio");
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].query_fasta, std::path::Path::new("/work/xref_0_dna.fasta"));
        assert_eq!(requests[1].query_fasta, std::path::Path::new("/work/xref_0_peptide.fasta"));
        assert_eq!(requests[1].target_fasta, std::path::Path::new("/work/danio_rerio_protein.fasta"));
    }
}
