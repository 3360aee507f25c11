//! Developer-mode fixture loading.
//!
//! `spec.md` §1 places the database adapter layer out of scope. This
//! module loads a small JSON bundle into [`InMemoryXrefStore`] /
//! [`InMemoryCoreStore`] so the CLI subcommands can run end-to-end against
//! fixture data instead of a real SQL backend, for local development and
//! smoke testing.

use std::collections::HashMap;

use serde::Deserialize;

use crate::model::{DependentXref, DirectXref, Gene, Interpro, Source, Synonym, Transcript,
    Translation, Xref};
use crate::store::{InMemoryCoreStore, InMemoryXrefStore};

#[derive(Debug, Deserialize)]
struct XrefFixture {
    #[serde(default)]
    sources: Vec<Source>,
    #[serde(default)]
    xrefs: Vec<Xref>,
    #[serde(default)]
    dependent_xrefs: Vec<DependentXref>,
    #[serde(default)]
    direct_xrefs: Vec<DirectXref>,
    #[serde(default)]
    synonyms: Vec<Synonym>,
    #[serde(default)]
    interpro: Vec<Interpro>,
    #[serde(default)]
    species_ids: HashMap<String, u32>,
}

#[derive(Debug, Deserialize)]
struct CoreFixture {
    #[serde(default)]
    genes: Vec<Gene>,
    #[serde(default)]
    transcripts: Vec<Transcript>,
    #[serde(default)]
    translations: Vec<Translation>,
    #[serde(default)]
    max_object_xref_id: u32,
    #[serde(default)]
    max_xref_id: u32,
}

/// Load `<dir>/xref_store.json` into an [`InMemoryXrefStore`].
pub fn load_xref_store<P: AsRef<std::path::Path>>(
    dir: P,
) -> Result<InMemoryXrefStore, anyhow::Error> {
    let path = dir.as_ref().join("xref_store.json");
    let text = std::fs::read_to_string(&path)
        .map_err(|err| anyhow::anyhow!("reading {path:?}: {err}"))?;
    let fixture: XrefFixture = serde_json::from_str(&text)?;
    Ok(InMemoryXrefStore {
        sources: fixture.sources,
        xrefs: fixture.xrefs,
        dependent_xrefs: fixture.dependent_xrefs,
        direct_xrefs: fixture.direct_xrefs,
        synonyms: fixture.synonyms,
        interpro: fixture.interpro,
        species_ids: fixture.species_ids,
    })
}

/// Load `<dir>/core_store.json` into an [`InMemoryCoreStore`].
pub fn load_core_store<P: AsRef<std::path::Path>>(
    dir: P,
) -> Result<InMemoryCoreStore, anyhow::Error> {
    let path = dir.as_ref().join("core_store.json");
    let text = std::fs::read_to_string(&path)
        .map_err(|err| anyhow::anyhow!("reading {path:?}: {err}"))?;
    let fixture: CoreFixture = serde_json::from_str(&text)?;
    Ok(InMemoryCoreStore {
        genes: fixture.genes,
        transcripts: fixture.transcripts,
        translations: fixture.translations,
        max_object_xref_id: fixture.max_object_xref_id,
        max_xref_id: fixture.max_xref_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_xref_store_from_json() -> Result<(), anyhow::Error> {
        let tmp = temp_testdir::TempDir::default();
        std::fs::write(
            tmp.join("xref_store.json"),
            r#"{
                "sources": [{"id": 1, "name": "RefSeq_dna", "external_db_id": 10}],
                "xrefs": [],
                "species_ids": {"danio_rerio": 1}
            }"#,
        )?;

        let store = load_xref_store(tmp.to_path_buf())?;
        assert_eq!(store.sources.len(), 1);
        assert_eq!(store.species_ids.get("danio_rerio"), Some(&1));
        Ok(())
    }

    #[test]
    fn load_core_store_missing_file_errors() {
        let tmp = temp_testdir::TempDir::default();
        assert!(load_core_store(tmp.to_path_buf()).is_err());
    }
}
