//! xref-mapper main executable

use clap::{Parser, Subcommand};
use console::Term;
use xref_mapper::common;

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Cross-reference mapping engine",
    long_about = "Computes xref-to-object mappings, display xrefs, and gene descriptions \
                   for a comparative-genomics annotation pipeline"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Subcommand)]
enum Commands {
    /// Dump xref FASTA subsets driven by the rule table.
    DumpXref(xref_mapper::dump::XrefArgs),
    /// Dump core transcript/translation FASTA files.
    DumpCore(xref_mapper::dump::CoreArgs),
    /// Submit alignment jobs and block until they finish.
    Submit(xref_mapper::dispatch::Args),
    /// Parse alignment `.map` files into object_xref/identity_xref rows.
    ParseAlignments(xref_mapper::parse::Args),
    /// Propagate primary, dependent, direct, and orphan xrefs.
    Propagate(xref_mapper::propagate::Args),
    /// Select display xrefs for transcripts and genes.
    SelectDisplay(xref_mapper::select::Args),
    /// Build one description per gene from its xref pool.
    DescribeGenes(xref_mapper::describe::Args),
    /// Materialize the output file set for the working directory.
    Emit(xref_mapper::emit::Args),
    /// Run the full pipeline end to end.
    RunAll(xref_mapper::run_all::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    let term = Term::stderr();
    tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::DumpXref(args) => xref_mapper::dump::run_xref(&cli.common, args)?,
            Commands::DumpCore(args) => xref_mapper::dump::run_core(&cli.common, args)?,
            Commands::Submit(args) => xref_mapper::dispatch::run(&cli.common, args)?,
            Commands::ParseAlignments(args) => xref_mapper::parse::run(&cli.common, args)?,
            Commands::Propagate(args) => xref_mapper::propagate::run(&cli.common, args)?,
            Commands::SelectDisplay(args) => xref_mapper::select::run(&cli.common, args)?,
            Commands::DescribeGenes(args) => xref_mapper::describe::run(&cli.common, args)?,
            Commands::Emit(args) => xref_mapper::emit::run(&cli.common, args)?,
            Commands::RunAll(args) => xref_mapper::run_all::run(&cli.common, args)?,
        }

        Ok::<(), anyhow::Error>(())
    })?;
    term.write_line("All done.")?;

    Ok(())
}
