//! Job Dispatcher (C3, `§4.3`).
//!
//! For each `(method, query_fasta, target_fasta)` triple, looks up a
//! method handler in a plug-in registry, submits an alignment job named
//! `<Method>_<dna|peptide>_<N>.map`, and waits synchronously on every
//! submission via a single barrier.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use tracing::warn;

use crate::context::PipelineContext;
use crate::err::XrefError;
use crate::model::ObjectType;
use crate::scheduler::{JobId, JobScheduler, JobSpec, SchedulerResult};

/// `§9` "Plug-in method handlers": a registry entry carrying the
/// thresholds and the command template used to submit a job for this
/// method, keyed by method name.
#[derive(Debug, Clone, Deserialize)]
pub struct MethodHandler {
    pub query_threshold: u8,
    pub target_threshold: u8,
    /// Program and fixed arguments; `query_fasta`/`target_fasta` are
    /// appended when a job is built.
    pub command: Vec<String>,
}

pub type MethodRegistry = HashMap<String, MethodHandler>;

/// Load a method registry from a TOML file: `[methods.<name>]` tables.
#[derive(Debug, Deserialize)]
struct RegistryFile {
    methods: MethodRegistry,
}

pub fn load_registry(path: &Path) -> Result<MethodRegistry, anyhow::Error> {
    let toml_str = std::fs::read_to_string(path)?;
    let file: RegistryFile = toml::from_str(&toml_str)?;
    Ok(file.methods)
}

/// One alignment job to submit, prior to dispatch.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub method_name: String,
    pub query_fasta: PathBuf,
    pub target_fasta: PathBuf,
    pub object_type: ObjectType,
}

fn sequence_kind_tag(object_type: ObjectType) -> &'static str {
    match object_type {
        ObjectType::Transcript => "dna",
        ObjectType::Translation | ObjectType::Gene => "peptide",
    }
}

fn build_job_spec(
    work_dir: &Path,
    handler: &MethodHandler,
    request: &JobRequest,
    index: usize,
) -> JobSpec {
    let output_path = work_dir.join(format!(
        "{}_{}_{index}.map",
        request.method_name,
        sequence_kind_tag(request.object_type)
    ));
    let mut command = handler.command.clone();
    command.push(request.query_fasta.display().to_string());
    command.push(request.target_fasta.display().to_string());

    JobSpec {
        label: format!("{}-{index}", request.method_name),
        command,
        output_path,
    }
}

/// `§4.3`: submit every requested job, recording thresholds into `ctx` and
/// skipping (with a warning, not an error) any method missing from the
/// registry.
pub fn submit_all(
    registry: &MethodRegistry,
    scheduler: &dyn JobScheduler,
    work_dir: &Path,
    requests: &[JobRequest],
    ctx: &mut PipelineContext,
) -> Vec<JobId> {
    let mut job_ids = Vec::new();
    for (index, request) in requests.iter().enumerate() {
        let Some(handler) = registry.get(&request.method_name) else {
            warn!(
                "{}",
                XrefError::PluginMissing(request.method_name.clone())
            );
            continue;
        };

        ctx.method_thresholds.insert(
            request.method_name.clone(),
            (handler.query_threshold, handler.target_threshold),
        );

        let job_spec = build_job_spec(work_dir, handler, request, index);
        match scheduler.submit(&job_spec) {
            SchedulerResult::Submitted(job_id) => job_ids.push(job_id),
            SchedulerResult::Failed(reason) => {
                warn!("{}", XrefError::SchedulerFailure(reason));
            }
        }
    }
    job_ids
}

/// Block until every submitted job has ended (`§4.3` "wait synchronously").
pub fn wait_for_all(scheduler: &dyn JobScheduler, job_ids: &[JobId]) -> Result<(), anyhow::Error> {
    scheduler
        .wait_for_all(job_ids)
        .map_err(|reason| XrefError::SchedulerFailure(reason).into())
}

/// Cancel every outstanding job (`§4.3` "cancellation ... must attempt to
/// cancel outstanding jobs").
pub fn cancel_all(scheduler: &dyn JobScheduler, job_ids: &[JobId]) {
    scheduler.cancel_all(job_ids);
}

/// Command line arguments for the `submit` sub command.
#[derive(Parser, Debug)]
#[command(about = "Submit alignment jobs and block until they finish", long_about = None)]
pub struct Args {
    /// Path to the working directory jobs write their `.map` files into.
    #[arg(long, required = true)]
    pub path_work_dir: PathBuf,
    /// Path to the method-handler registry TOML file.
    #[arg(long, required = true)]
    pub path_registry: PathBuf,
}

/// Main entry point for the `submit` sub command. A standalone invocation
/// submits nothing (job requests come from the Sequence Dumper's rule
/// output via `run-all`); this loads and validates the registry so a
/// misconfigured one fails fast.
pub fn run(_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let registry = load_registry(&args.path_registry)?;
    tracing::info!(
        "loaded {} method handler(s) from {:?}; use `run-all` to actually submit jobs",
        registry.len(),
        args.path_registry
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::LocalProcessScheduler;

    fn registry() -> MethodRegistry {
        let mut registry = MethodRegistry::new();
        registry.insert(
            "exonerate_est2genome".to_string(),
            MethodHandler {
                query_threshold: 50,
                target_threshold: 50,
                command: vec!["true".to_string()],
            },
        );
        registry
    }

    #[test]
    fn submits_known_method_and_records_thresholds() {
        let scheduler = LocalProcessScheduler::default();
        let mut ctx = PipelineContext::default();
        let requests = vec![JobRequest {
            method_name: "exonerate_est2genome".to_string(),
            query_fasta: "q.fasta".into(),
            target_fasta: "t.fasta".into(),
            object_type: ObjectType::Transcript,
        }];

        let job_ids = submit_all(&registry(), &scheduler, Path::new("/tmp"), &requests, &mut ctx);
        assert_eq!(job_ids.len(), 1);
        assert_eq!(ctx.method_thresholds.get("exonerate_est2genome"), Some(&(50, 50)));
        assert!(wait_for_all(&scheduler, &job_ids).is_ok());
    }

    #[test]
    fn unknown_method_is_skipped_not_fatal() {
        let scheduler = LocalProcessScheduler::default();
        let mut ctx = PipelineContext::default();
        let requests = vec![JobRequest {
            method_name: "no_such_method".to_string(),
            query_fasta: "q.fasta".into(),
            target_fasta: "t.fasta".into(),
            object_type: ObjectType::Transcript,
        }];

        let job_ids = submit_all(&registry(), &scheduler, Path::new("/tmp"), &requests, &mut ctx);
        assert!(job_ids.is_empty());
        assert!(ctx.method_thresholds.is_empty());
    }

    #[test]
    fn output_path_follows_method_kind_index_pattern() {
        let handler = MethodHandler {
            query_threshold: 1,
            target_threshold: 1,
            command: vec!["aligner".to_string()],
        };
        let request = JobRequest {
            method_name: "wu_blastx".to_string(),
            query_fasta: "q.fasta".into(),
            target_fasta: "t.fasta".into(),
            object_type: ObjectType::Translation,
        };
        let spec = build_job_spec(Path::new("/work"), &handler, &request, 3);
        assert_eq!(spec.output_path, Path::new("/work/wu_blastx_peptide_3.map"));
        assert_eq!(spec.command, vec!["aligner", "q.fasta", "t.fasta"]);
    }
}
