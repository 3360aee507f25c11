//! Sequence Dumper (C2, `§4.2`).
//!
//! Emits xref FASTA subsets (one pair of files per rule) and core FASTA
//! files (transcripts -> spliced cDNA, translations -> peptide).

use std::path::{Path, PathBuf};

use clap::Parser;
use indicatif::ProgressIterator;
use tracing::info;

use crate::common::io::write_fasta_record;
use crate::model::SequenceType;
use crate::rules::CompiledRule;
use crate::store::{CoreStore, XrefStore};

/// Command line arguments for the `dump-xref` sub command.
#[derive(Parser, Debug)]
#[command(about = "Dump xref FASTA subsets driven by the rule table", long_about = None)]
pub struct XrefArgs {
    /// Path to the working directory FASTA files are written into.
    #[arg(long, required = true)]
    pub path_work_dir: PathBuf,
    /// Path to the species configuration TOML file.
    #[arg(long, required = true)]
    pub path_config: PathBuf,
    /// Path to a developer-mode fixture directory (`§2` "Database
    /// adapters"), standing in for the real xref store.
    #[arg(long, required = true)]
    pub path_fixture_dir: PathBuf,
    /// Skip dumping when every expected FASTA already exists on disk.
    #[arg(long)]
    pub dumpcheck: bool,
}

/// Command line arguments for the `dump-core` sub command.
#[derive(Parser, Debug)]
#[command(about = "Dump core transcript/translation FASTA files", long_about = None)]
pub struct CoreArgs {
    /// Path to the working directory FASTA files are written into.
    #[arg(long, required = true)]
    pub path_work_dir: PathBuf,
    /// Species name, used in the output file names.
    #[arg(long, required = true)]
    pub species: String,
    /// Path to a developer-mode fixture directory (`§2` "Database
    /// adapters"), standing in for the real core store.
    #[arg(long, required = true)]
    pub path_fixture_dir: PathBuf,
    /// Restrict the dump to a single genomic slice; dumps the whole genome
    /// if omitted.
    #[arg(long)]
    pub location: Option<String>,
    /// Truncate the transcript dump after this many transcripts.
    #[arg(long)]
    pub maxdump: Option<usize>,
    /// Skip dumping when the expected FASTAs already exist on disk.
    #[arg(long)]
    pub dumpcheck: bool,
}

fn xref_fasta_paths(work_dir: &Path, rule_index: usize) -> (PathBuf, PathBuf) {
    (
        work_dir.join(format!("xref_{rule_index}_dna.fasta")),
        work_dir.join(format!("xref_{rule_index}_peptide.fasta")),
    )
}

/// Dump one DNA and one peptide FASTA file per rule (`§4.2`).
pub fn dump_xref_fastas(
    store: &dyn XrefStore,
    rules: &[CompiledRule],
    work_dir: &Path,
    dumpcheck: bool,
) -> Result<(), anyhow::Error> {
    std::fs::create_dir_all(work_dir)?;

    if dumpcheck
        && (0..rules.len()).all(|i| {
            let (dna, peptide) = xref_fasta_paths(work_dir, i);
            dna.exists() && peptide.exists()
        })
    {
        info!("dumpcheck: all xref FASTA files already present, skipping dump");
        return Ok(());
    }

    for (i, rule) in rules.iter().enumerate() {
        let (dna_path, peptide_path) = xref_fasta_paths(work_dir, i);
        info!(
            "dumping rule {i} ({}) -> {dna_path:?}, {peptide_path:?}",
            rule.method_name
        );
        dump_xref_subset(store, rule, SequenceType::Dna, &dna_path)?;
        dump_xref_subset(store, rule, SequenceType::Peptide, &peptide_path)?;
    }

    Ok(())
}

fn dump_xref_subset(
    store: &dyn XrefStore,
    rule: &CompiledRule,
    kind: SequenceType,
    path: &Path,
) -> Result<(), anyhow::Error> {
    let mut writer = crate::common::io::create_buffered(path)?;
    for xref in store.xrefs().iter().filter(|x| rule.matches(x, kind)) {
        let seq = xref
            .sequence
            .as_ref()
            .expect("rule.matches only returns xrefs with a sequence of the right kind");
        write_fasta_record(&mut writer, xref.id, &seq.seq)?;
    }
    Ok(())
}

fn core_fasta_paths(work_dir: &Path, species: &str) -> (PathBuf, PathBuf) {
    (
        work_dir.join(format!("{species}_dna.fasta")),
        work_dir.join(format!("{species}_protein.fasta")),
    )
}

/// Dump the core transcript (spliced cDNA) and translation (peptide)
/// FASTA files, optionally restricted to one genomic slice and/or
/// truncated at `maxdump` transcripts (`§4.2`).
pub fn dump_core_fastas(
    core: &dyn CoreStore,
    work_dir: &Path,
    species: &str,
    location: Option<&str>,
    maxdump: Option<usize>,
    dumpcheck: bool,
) -> Result<(), anyhow::Error> {
    std::fs::create_dir_all(work_dir)?;
    let (dna_path, protein_path) = core_fasta_paths(work_dir, species);

    if dumpcheck && dna_path.exists() && protein_path.exists() {
        info!("dumpcheck: core FASTA files already present, skipping dump");
        return Ok(());
    }

    let mut transcripts: Vec<_> = core
        .transcripts()
        .iter()
        .filter(|t| location.map(|loc| t.location == loc).unwrap_or(true))
        .collect();
    transcripts.sort_by_key(|t| t.internal_id);
    if let Some(max) = maxdump {
        transcripts.truncate(max);
    }

    info!(
        "dumping {} transcripts to {dna_path:?}",
        transcripts.len()
    );
    let mut dna_writer = crate::common::io::create_buffered(&dna_path)?;
    for transcript in transcripts.iter().progress() {
        write_fasta_record(&mut dna_writer, transcript.internal_id, &transcript.spliced_dna)?;
    }

    let transcript_ids: std::collections::HashSet<u32> =
        transcripts.iter().map(|t| t.internal_id).collect();
    info!("dumping translations to {protein_path:?}");
    let mut protein_writer = crate::common::io::create_buffered(&protein_path)?;
    for translation in core
        .translations()
        .iter()
        .filter(|tr| transcript_ids.contains(&tr.transcript_internal_id))
    {
        write_fasta_record(&mut protein_writer, translation.internal_id, &translation.peptide)?;
    }

    Ok(())
}

/// Main entry point for the `dump-xref` sub command.
pub fn run_xref(_common: &crate::common::Args, args: &XrefArgs) -> Result<(), anyhow::Error> {
    let config = crate::config::SpeciesConfig::load_from_path(&args.path_config)?;
    let store = crate::fixture::load_xref_store(&args.path_fixture_dir)?;
    let rules = crate::rules::compile_rules(&store, &config.rules())?;

    info!("dumping {} xref rule(s) to {:?}", rules.len(), args.path_work_dir);
    dump_xref_fastas(&store, &rules, &args.path_work_dir, args.dumpcheck)
}

/// Main entry point for the `dump-core` sub command.
pub fn run_core(_common: &crate::common::Args, args: &CoreArgs) -> Result<(), anyhow::Error> {
    let core = crate::fixture::load_core_store(&args.path_fixture_dir)?;

    info!(
        "dumping core FASTAs for {:?} to {:?} (location={:?}, maxdump={:?})",
        args.species, args.path_work_dir, args.location, args.maxdump
    );
    dump_core_fastas(
        &core,
        &args.path_work_dir,
        &args.species,
        args.location.as_deref(),
        args.maxdump,
        args.dumpcheck,
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::model::{Rule, Sequence, Source, Transcript, Translation, Xref};
    use crate::store::InMemoryCoreStore;
    use crate::store::InMemoryXrefStore;

    fn xref_store() -> InMemoryXrefStore {
        InMemoryXrefStore {
            sources: vec![Source {
                id: 1,
                name: "RefSeq_dna".into(),
                external_db_id: Some(10),
            }],
            xrefs: vec![
                Xref {
                    id: 1,
                    accession: "NM_1".into(),
                    version: 1,
                    label: String::new(),
                    description: String::new(),
                    source_id: 1,
                    species_id: 1,
                    sequence: Some(Sequence {
                        kind: SequenceType::Dna,
                        seq: "ACGTACGTAC".into(),
                    }),
                },
                Xref {
                    id: 2,
                    accession: "NP_1".into(),
                    version: 1,
                    label: String::new(),
                    description: String::new(),
                    source_id: 1,
                    species_id: 1,
                    sequence: Some(Sequence {
                        kind: SequenceType::Peptide,
                        seq: "MKV".into(),
                    }),
                },
            ],
            species_ids: HashMap::from([("danio_rerio".to_string(), 1)]),
            ..Default::default()
        }
    }

    #[test]
    fn dump_xref_fastas_writes_one_pair_per_rule() -> Result<(), anyhow::Error> {
        let tmp = temp_testdir::TempDir::default();
        let store = xref_store();
        let rule = Rule {
            method_name: "m".into(),
            patterns: vec![("*".into(), "*".into())],
        };
        let compiled = crate::rules::compile_rules(&store, &[rule])?;

        dump_xref_fastas(&store, &compiled, &tmp, false)?;

        let dna = std::fs::read_to_string(tmp.join("xref_0_dna.fasta"))?;
        assert_eq!(dna, ">1\nACGTACGTAC\n");
        let peptide = std::fs::read_to_string(tmp.join("xref_0_peptide.fasta"))?;
        assert_eq!(peptide, ">2\nMKV\n");
        Ok(())
    }

    #[test]
    fn dumpcheck_skips_when_files_present() -> Result<(), anyhow::Error> {
        let tmp = temp_testdir::TempDir::default();
        std::fs::write(tmp.join("xref_0_dna.fasta"), "sentinel")?;
        std::fs::write(tmp.join("xref_0_peptide.fasta"), "sentinel")?;

        let store = xref_store();
        let rule = Rule {
            method_name: "m".into(),
            patterns: vec![("*".into(), "*".into())],
        };
        let compiled = crate::rules::compile_rules(&store, &[rule])?;

        dump_xref_fastas(&store, &compiled, &tmp, true)?;

        let dna = std::fs::read_to_string(tmp.join("xref_0_dna.fasta"))?;
        assert_eq!(dna, "sentinel");
        Ok(())
    }

    fn core_store() -> InMemoryCoreStore {
        InMemoryCoreStore {
            transcripts: vec![
                Transcript {
                    internal_id: 1,
                    stable_id: "T1".into(),
                    gene_internal_id: 1,
                    length: 4,
                    spliced_dna: "ACGT".into(),
                    location: "chr1".into(),
                },
                Transcript {
                    internal_id: 2,
                    stable_id: "T2".into(),
                    gene_internal_id: 1,
                    length: 4,
                    spliced_dna: "TTTT".into(),
                    location: "chr2".into(),
                },
            ],
            translations: vec![Translation {
                internal_id: 1,
                stable_id: "P1".into(),
                transcript_internal_id: 1,
                peptide: "MKV".into(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn dump_core_fastas_honors_location_and_links_translations() -> Result<(), anyhow::Error> {
        let tmp = temp_testdir::TempDir::default();
        let core = core_store();

        dump_core_fastas(&core, &tmp, "danio_rerio", Some("chr1"), None, false)?;

        let dna = std::fs::read_to_string(tmp.join("danio_rerio_dna.fasta"))?;
        assert_eq!(dna, ">1\nACGT\n");
        let protein = std::fs::read_to_string(tmp.join("danio_rerio_protein.fasta"))?;
        assert_eq!(protein, ">1\nMKV\n");
        Ok(())
    }

    #[test]
    fn dump_core_fastas_maxdump_truncates() -> Result<(), anyhow::Error> {
        let tmp = temp_testdir::TempDir::default();
        let core = core_store();

        dump_core_fastas(&core, &tmp, "danio_rerio", None, Some(1), false)?;

        let dna = std::fs::read_to_string(tmp.join("danio_rerio_dna.fasta"))?;
        assert_eq!(dna, ">1\nACGT\n");
        Ok(())
    }
}
