//! The crate's named error kinds (`§7` error handling design).
//!
//! Errors that invalidate a single record (`PluginMissing`,
//! `SchedulerFailure`, `UnresolvedStableId`, `UnknownSource`) are
//! downgraded to warnings by callers and logged via `tracing::warn`, never
//! propagated. Errors that invalidate the pipeline's contract
//! (`ConfigMissing`, `IoFailure`) are fatal and bubble up as `anyhow::Error`.

use thiserror::Error;

/// Fatal and per-record error kinds produced by the pipeline components.
#[derive(Error, Debug, Clone)]
pub enum XrefError {
    /// A species or source name used in configuration does not resolve.
    /// Fatal: enumerates the valid names it knows about.
    #[error("unknown name {name:?}, valid names are: {valid:?}")]
    ConfigMissing { name: String, valid: Vec<String> },

    /// A method plug-in could not be loaded. Downgraded to a warning; the
    /// method is skipped.
    #[error("no handler registered for method {0:?}")]
    PluginMissing(String),

    /// The batch scheduler reported a failure. Downgraded to a warning;
    /// the pipeline continues with whatever outputs already exist.
    #[error("scheduler failure: {0}")]
    SchedulerFailure(String),

    /// A direct xref's target stable id could not be resolved (including
    /// CCDS-without-translation and exhausted `.1`..`.4` UTR fallbacks).
    /// Downgraded to a warning; the record is skipped.
    #[error("could not resolve stable id {stable_id:?} ({reason})")]
    UnresolvedStableId { stable_id: String, reason: String },

    /// An xref's source has no `external_db` mapping in the target.
    /// Silently drops the xref from emitted artifacts.
    #[error("source {0:?} has no external_db mapping")]
    UnknownSource(String),
}
