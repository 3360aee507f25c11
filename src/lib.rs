//! Cross-reference mapping engine.
//!
//! Given a curated database of external biological identifiers ("xrefs")
//! and a core genome-annotation database of genes, transcripts, and
//! translations, this crate computes which xrefs attach to which genomic
//! objects, selects a single best display identifier for each transcript
//! and gene, and synthesizes a human-readable gene description for each
//! gene.

pub mod common;
pub mod config;
pub mod context;
pub mod describe;
pub mod dispatch;
pub mod dump;
pub mod emit;
pub mod err;
pub mod fixture;
pub mod ids;
pub mod model;
pub mod parse;
pub mod propagate;
pub mod rules;
pub mod run_all;
pub mod scheduler;
pub mod select;
pub mod store;
