//! Database adapter boundary.
//!
//! `spec.md` §1 places "the database adapter layer (how SQL is executed
//! and connections pooled)" out of scope. These traits are the narrow
//! contract the rest of the engine needs from "the xref store" and "the
//! core store"; a real deployment supplies its own SQL-backed
//! implementation. [`InMemoryXrefStore`] / [`InMemoryCoreStore`] are
//! simple fixtures used by tests and by a `--fixture-dir` developer mode.

use std::collections::HashMap;

use crate::model::{
    DependentXref, DirectXref, Gene, Interpro, ObjectType, Source, Synonym, Transcript,
    Translation, Xref,
};

/// Read-only access to the xref database.
pub trait XrefStore {
    fn sources(&self) -> &[Source];
    fn xrefs(&self) -> &[Xref];
    fn dependent_xrefs(&self) -> &[DependentXref];
    fn direct_xrefs(&self) -> &[DirectXref];
    fn synonyms(&self) -> &[Synonym];
    fn interpro(&self) -> &[Interpro];

    fn species_id_by_name(&self, name: &str) -> Option<u32>;
    fn source_id_by_name(&self, name: &str) -> Option<u32>;
    fn valid_species_names(&self) -> Vec<String>;
    fn valid_source_names(&self) -> Vec<String>;

    fn source_by_id(&self, id: u32) -> Option<&Source> {
        self.sources().iter().find(|s| s.id == id)
    }

    fn xref_by_id(&self, id: u32) -> Option<&Xref> {
        self.xrefs().iter().find(|x| x.id == id)
    }

    /// All dependents of any of `masters`, joined with their xref record
    /// (`§4.5(b)`: `dependent_xref ⋈ xref`).
    fn dependents_of(&self, masters: &[u32]) -> Vec<(&DependentXref, &Xref)> {
        let masters: std::collections::HashSet<u32> = masters.iter().copied().collect();
        self.dependent_xrefs()
            .iter()
            .filter(|d| masters.contains(&d.master_xref_id))
            .filter_map(|d| self.xref_by_id(d.dependent_xref_id).map(|x| (d, x)))
            .collect()
    }
}

/// Read-only access to the core genome-annotation database.
pub trait CoreStore {
    fn genes(&self) -> &[Gene];
    fn transcripts(&self) -> &[Transcript];
    fn translations(&self) -> &[Translation];

    fn stable_id_to_internal(&self, object_type: ObjectType, stable_id: &str) -> Option<u32>;

    /// Stable id of the translation owned by the transcript with the given
    /// stable id, if any (`§4.5` direct-xref CCDS retargeting and the
    /// transcript-stable-id -> translation-stable-id map).
    fn translation_stable_id_for_transcript(&self, transcript_stable_id: &str) -> Option<String>;

    fn max_object_xref_id(&self) -> u32;
    fn max_xref_id(&self) -> u32;

    fn transcript_by_internal_id(&self, id: u32) -> Option<&Transcript> {
        self.transcripts().iter().find(|t| t.internal_id == id)
    }

    fn translation_by_internal_id(&self, id: u32) -> Option<&Translation> {
        self.translations().iter().find(|t| t.internal_id == id)
    }

    fn gene_by_internal_id(&self, id: u32) -> Option<&Gene> {
        self.genes().iter().find(|g| g.internal_id == id)
    }

    fn translation_for_transcript(&self, transcript_internal_id: u32) -> Option<&Translation> {
        self.translations()
            .iter()
            .find(|t| t.transcript_internal_id == transcript_internal_id)
    }

    fn transcripts_of_gene(&self, gene_internal_id: u32) -> Vec<&Transcript> {
        self.transcripts()
            .iter()
            .filter(|t| t.gene_internal_id == gene_internal_id)
            .collect()
    }
}

/// A simple in-memory xref store, used by tests and the `--fixture-dir`
/// developer mode.
#[derive(Debug, Default, Clone)]
pub struct InMemoryXrefStore {
    pub sources: Vec<Source>,
    pub xrefs: Vec<Xref>,
    pub dependent_xrefs: Vec<DependentXref>,
    pub direct_xrefs: Vec<DirectXref>,
    pub synonyms: Vec<Synonym>,
    pub interpro: Vec<Interpro>,
    pub species_ids: HashMap<String, u32>,
}

impl XrefStore for InMemoryXrefStore {
    fn sources(&self) -> &[Source] {
        &self.sources
    }

    fn xrefs(&self) -> &[Xref] {
        &self.xrefs
    }

    fn dependent_xrefs(&self) -> &[DependentXref] {
        &self.dependent_xrefs
    }

    fn direct_xrefs(&self) -> &[DirectXref] {
        &self.direct_xrefs
    }

    fn synonyms(&self) -> &[Synonym] {
        &self.synonyms
    }

    fn interpro(&self) -> &[Interpro] {
        &self.interpro
    }

    fn species_id_by_name(&self, name: &str) -> Option<u32> {
        self.species_ids.get(name).copied()
    }

    fn source_id_by_name(&self, name: &str) -> Option<u32> {
        self.sources.iter().find(|s| s.name == name).map(|s| s.id)
    }

    fn valid_species_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.species_ids.keys().cloned().collect();
        names.sort();
        names
    }

    fn valid_source_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sources.iter().map(|s| s.name.clone()).collect();
        names.sort();
        names
    }
}

/// A simple in-memory core store, used by tests and the `--fixture-dir`
/// developer mode.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCoreStore {
    pub genes: Vec<Gene>,
    pub transcripts: Vec<Transcript>,
    pub translations: Vec<Translation>,
    pub max_object_xref_id: u32,
    pub max_xref_id: u32,
}

impl CoreStore for InMemoryCoreStore {
    fn genes(&self) -> &[Gene] {
        &self.genes
    }

    fn transcripts(&self) -> &[Transcript] {
        &self.transcripts
    }

    fn translations(&self) -> &[Translation] {
        &self.translations
    }

    fn stable_id_to_internal(&self, object_type: ObjectType, stable_id: &str) -> Option<u32> {
        match object_type {
            ObjectType::Gene => self
                .genes
                .iter()
                .find(|g| g.stable_id == stable_id)
                .map(|g| g.internal_id),
            ObjectType::Transcript => self
                .transcripts
                .iter()
                .find(|t| t.stable_id == stable_id)
                .map(|t| t.internal_id),
            ObjectType::Translation => self
                .translations
                .iter()
                .find(|t| t.stable_id == stable_id)
                .map(|t| t.internal_id),
        }
    }

    fn translation_stable_id_for_transcript(&self, transcript_stable_id: &str) -> Option<String> {
        let transcript = self
            .transcripts
            .iter()
            .find(|t| t.stable_id == transcript_stable_id)?;
        self.translations
            .iter()
            .find(|tr| tr.transcript_internal_id == transcript.internal_id)
            .map(|tr| tr.stable_id.clone())
    }

    fn max_object_xref_id(&self) -> u32 {
        self.max_object_xref_id
    }

    fn max_xref_id(&self) -> u32 {
        self.max_xref_id
    }
}
