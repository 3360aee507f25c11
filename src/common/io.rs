//! Common, IO-related code: FASTA writing and tab-separated table writing.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Write one FASTA record: a bare numeric id header and the sequence
/// wrapped at 60 columns.
pub fn write_fasta_record<W: Write>(
    writer: &mut W,
    id: u32,
    sequence: &str,
) -> Result<(), anyhow::Error> {
    writeln!(writer, ">{id}")?;
    writeln!(writer, "{}", super::wrap_sequence(sequence, 60))?;
    Ok(())
}

/// Open a buffered writer for a path, creating parent directories as needed.
pub fn create_buffered<P: AsRef<Path>>(path: P) -> Result<BufWriter<File>, anyhow::Error> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Build a `csv::Writer` configured for tab-separated, unquoted output,
/// matching the tabular output format used throughout this crate (`§6`).
pub fn tsv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .has_headers(false)
        .from_writer(writer)
}
