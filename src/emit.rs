//! Emitter & Uploader (C8, `§4.8`).
//!
//! Materializes every accumulated row in `PipelineContext` into the
//! working directory's tabular/SQL output files (`§6`).

use std::path::{Path, PathBuf};

use clap::Parser;
use thousands::Separable;
use tracing::info;

use crate::common::io::tsv_writer;
use crate::context::PipelineContext;
use crate::select::{GeneDisplayXref, TranscriptDisplayXref};

const DEPENDENT_MARKER: &str = "DEPENDENT";

fn write_xref_txt(ctx: &PipelineContext, path: &Path) -> Result<(), anyhow::Error> {
    let mut writer = tsv_writer(crate::common::io::create_buffered(path)?);
    for row in &ctx.xref_rows {
        let mut record = vec![
            row.xref_id.to_string(),
            row.external_db_id.to_string(),
            row.accession.clone(),
            row.label.clone(),
            row.version.to_string(),
            row.description.clone(),
        ];
        if row.dependent {
            record.push(DEPENDENT_MARKER.to_string());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_object_xref_txt(ctx: &PipelineContext, path: &Path) -> Result<(), anyhow::Error> {
    let mut writer = tsv_writer(crate::common::io::create_buffered(path)?);
    for row in &ctx.object_xref_rows {
        let mut record = vec![
            row.object_xref_id.to_string(),
            row.object_internal_id.to_string(),
            row.object_type.to_string(),
            row.xref_id.to_string(),
        ];
        if row.dependent {
            record.push(DEPENDENT_MARKER.to_string());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_identity_xref_txt(ctx: &PipelineContext, path: &Path) -> Result<(), anyhow::Error> {
    let mut writer = tsv_writer(crate::common::io::create_buffered(path)?);
    for row in &ctx.identity_rows {
        let evalue = row
            .evalue
            .map(|v| v.to_string())
            .unwrap_or_else(|| "\\N".to_string());
        writer.write_record(&[
            row.object_xref_id.to_string(),
            row.query_identity.to_string(),
            row.target_identity.to_string(),
            row.query_start.to_string(),
            row.query_end.to_string(),
            row.target_start.to_string(),
            row.target_end.to_string(),
            row.cigar_line.clone(),
            row.score.to_string(),
            evalue,
            row.analysis_id.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_external_synonym_txt(ctx: &PipelineContext, path: &Path) -> Result<(), anyhow::Error> {
    let mut writer = tsv_writer(crate::common::io::create_buffered(path)?);
    for row in &ctx.synonym_rows {
        writer.write_record(&[row.xref_id.to_string(), row.synonym.clone()])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_go_xref_txt(ctx: &PipelineContext, path: &Path) -> Result<(), anyhow::Error> {
    let mut writer = tsv_writer(crate::common::io::create_buffered(path)?);
    for row in &ctx.go_rows {
        writer.write_record(&[row.object_xref_id.to_string(), row.linkage_annotation.clone()])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_interpro_txt(ctx: &PipelineContext, path: &Path) -> Result<(), anyhow::Error> {
    let mut writer = tsv_writer(crate::common::io::create_buffered(path)?);
    for row in &ctx.interpro_rows {
        writer.write_record(&[row.interpro_accession.clone(), row.pfam_accession.clone()])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_gene_description_txt(
    rows: &[crate::describe::GeneDescriptionRow],
    path: &Path,
) -> Result<(), anyhow::Error> {
    let mut writer = tsv_writer(crate::common::io::create_buffered(path)?);
    for row in rows {
        writer.write_record(&[row.gene_id.to_string(), row.description.clone()])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_transcript_display_xref(
    rows: &[TranscriptDisplayXref],
    sql_path: &Path,
    txt_path: &Path,
) -> Result<(), anyhow::Error> {
    let mut sql = crate::common::io::create_buffered(sql_path)?;
    let mut txt_writer = tsv_writer(crate::common::io::create_buffered(txt_path)?);
    for row in rows {
        use std::io::Write as _;
        writeln!(
            sql,
            "UPDATE transcript SET display_xref_id = {} WHERE transcript_id = {};",
            row.xref_id, row.transcript_id
        )?;
        txt_writer.write_record(&[row.xref_id.to_string(), row.transcript_id.to_string()])?;
    }
    txt_writer.flush()?;
    Ok(())
}

fn write_gene_display_xref(
    rows: &[GeneDisplayXref],
    sql_path: &Path,
    txt_path: &Path,
) -> Result<(), anyhow::Error> {
    let mut sql = crate::common::io::create_buffered(sql_path)?;
    let mut txt_writer = tsv_writer(crate::common::io::create_buffered(txt_path)?);
    for row in rows {
        use std::io::Write as _;
        writeln!(
            sql,
            "UPDATE gene SET display_xref_id = {} WHERE gene_id = {};",
            row.xref_id, row.gene_id
        )?;
        txt_writer.write_record(&[row.xref_id.to_string(), row.gene_id.to_string()])?;
    }
    txt_writer.flush()?;
    Ok(())
}

/// Materialize every output file listed in `§4.8` into `work_dir`.
pub fn emit_all(
    ctx: &PipelineContext,
    gene_descriptions: &[crate::describe::GeneDescriptionRow],
    transcript_display: &[TranscriptDisplayXref],
    gene_display: &[GeneDisplayXref],
    work_dir: &Path,
) -> Result<(), anyhow::Error> {
    std::fs::create_dir_all(work_dir)?;

    write_xref_txt(ctx, &work_dir.join("xref.txt"))?;
    write_object_xref_txt(ctx, &work_dir.join("object_xref.txt"))?;
    write_identity_xref_txt(ctx, &work_dir.join("identity_xref.txt"))?;
    write_external_synonym_txt(ctx, &work_dir.join("external_synonym.txt"))?;
    write_go_xref_txt(ctx, &work_dir.join("go_xref.txt"))?;
    write_interpro_txt(ctx, &work_dir.join("interpro.txt"))?;
    write_gene_description_txt(gene_descriptions, &work_dir.join("gene_description.txt"))?;
    write_transcript_display_xref(
        transcript_display,
        &work_dir.join("transcript_display_xref.sql"),
        &work_dir.join("transcript_display_xref.txt"),
    )?;
    write_gene_display_xref(
        gene_display,
        &work_dir.join("gene_display_xref.sql"),
        &work_dir.join("gene_display_xref.txt"),
    )?;

    info!(
        "emitted {} xref, {} object_xref, {} gene_description rows to {work_dir:?}",
        ctx.xref_rows.len().separate_with_commas(),
        ctx.object_xref_rows.len().separate_with_commas(),
        gene_descriptions.len().separate_with_commas(),
    );
    Ok(())
}

/// Bootstrap an empty `external_db` table from the packaged reference
/// file (`§4.8`, `§7` `EmptyExternalDb`).
pub fn bootstrap_external_db_if_empty(
    current_row_count: usize,
    packaged_reference_path: &Path,
) -> Result<Option<String>, anyhow::Error> {
    if current_row_count > 0 {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(packaged_reference_path)?;
    Ok(Some(contents))
}

/// Command line arguments for the `emit` sub command. A standalone
/// invocation only reports what it would write; `run-all` drives the real
/// materialization with the shared `PipelineContext`.
#[derive(Parser, Debug)]
#[command(about = "Materialize the output file set for the working directory", long_about = None)]
pub struct Args {
    #[arg(long, required = true)]
    pub path_work_dir: PathBuf,
}

pub fn run(_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let ctx = PipelineContext::default();
    emit_all(&ctx, &[], &[], &[], &args.path_work_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GoXrefRow, IdentityXref, Interpro, ObjectType, ObjectXrefRow, Synonym, XrefRow};

    fn sample_ctx() -> PipelineContext {
        let mut ctx = PipelineContext::default();
        ctx.xref_rows.push(XrefRow {
            xref_id: 1001,
            external_db_id: 10,
            accession: "NM_1".into(),
            label: "NM_1".into(),
            version: 1,
            description: "some gene".into(),
            dependent: false,
        });
        ctx.xref_rows.push(XrefRow {
            xref_id: 1002,
            external_db_id: 20,
            accession: "GO:1".into(),
            label: "GO:1".into(),
            version: 1,
            description: String::new(),
            dependent: true,
        });
        ctx.object_xref_rows.push(ObjectXrefRow {
            object_xref_id: 1,
            object_type: ObjectType::Transcript,
            object_internal_id: 42,
            xref_id: 1001,
            dependent: false,
        });
        ctx.identity_rows.push(IdentityXref {
            object_xref_id: 1,
            query_identity: 80,
            target_identity: 70,
            query_start: 1,
            query_end: 100,
            target_start: 1,
            target_end: 100,
            cigar_line: "100M".into(),
            score: 500.0,
            evalue: None,
            analysis_id: 1,
        });
        ctx.synonym_rows.push(Synonym { xref_id: 1001, synonym: "ALIAS1".into() });
        ctx.go_rows.push(GoXrefRow { object_xref_id: 1, linkage_annotation: "IEA".into() });
        ctx.interpro_rows.push(Interpro {
            interpro_accession: "IPR1".into(),
            pfam_accession: "PF1".into(),
        });
        ctx
    }

    #[test]
    fn xref_txt_appends_dependent_marker_only_when_set() -> Result<(), anyhow::Error> {
        let tmp = temp_testdir::TempDir::default();
        let ctx = sample_ctx();
        write_xref_txt(&ctx, &tmp.join("xref.txt"))?;
        let content = std::fs::read_to_string(tmp.join("xref.txt"))?;
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("1001\t10\tNM_1\tNM_1\t1\tsome gene"));
        assert_eq!(lines.next(), Some("1002\t20\tGO:1\tGO:1\t1\t\tDEPENDENT"));
        Ok(())
    }

    #[test]
    fn identity_xref_txt_renders_null_evalue() -> Result<(), anyhow::Error> {
        let tmp = temp_testdir::TempDir::default();
        let ctx = sample_ctx();
        write_identity_xref_txt(&ctx, &tmp.join("identity_xref.txt"))?;
        let content = std::fs::read_to_string(tmp.join("identity_xref.txt"))?;
        assert!(content.contains("\\N"));
        Ok(())
    }

    #[test]
    fn emit_all_writes_full_file_set() -> Result<(), anyhow::Error> {
        let tmp = temp_testdir::TempDir::default();
        let ctx = sample_ctx();
        let descriptions = vec![crate::describe::GeneDescriptionRow {
            gene_id: 1,
            description: "desc [Source:RefSeq_dna;Acc:NM_1]".into(),
        }];
        let transcript_display =
            vec![TranscriptDisplayXref { transcript_id: 5, xref_id: 1001, priority_idx: 0 }];
        let gene_display = vec![GeneDisplayXref { gene_id: 1, xref_id: 1001 }];

        emit_all(&ctx, &descriptions, &transcript_display, &gene_display, &tmp)?;

        for name in [
            "xref.txt",
            "object_xref.txt",
            "identity_xref.txt",
            "external_synonym.txt",
            "go_xref.txt",
            "interpro.txt",
            "gene_description.txt",
            "transcript_display_xref.sql",
            "transcript_display_xref.txt",
            "gene_display_xref.sql",
            "gene_display_xref.txt",
        ] {
            assert!(tmp.join(name).exists(), "{name} should have been written");
        }

        let sql = std::fs::read_to_string(tmp.join("transcript_display_xref.sql"))?;
        assert_eq!(
            sql.trim(),
            "UPDATE transcript SET display_xref_id = 1001 WHERE transcript_id = 5;"
        );
        Ok(())
    }

    #[test]
    fn bootstrap_external_db_only_when_empty() -> Result<(), anyhow::Error> {
        let tmp = temp_testdir::TempDir::default();
        let reference = tmp.join("external_db_reference.txt");
        std::fs::write(&reference, "1\tRefSeq_dna\n")?;

        assert!(bootstrap_external_db_if_empty(3, &reference)?.is_none());
        assert!(bootstrap_external_db_if_empty(0, &reference)?.is_some());
        Ok(())
    }
}
