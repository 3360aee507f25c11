//! Data model entities (`§3`).

use serde::{Deserialize, Serialize};

/// One of the three core genome-annotation object kinds an xref can attach
/// to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum_macros::Display,
    Serialize,
    Deserialize,
)]
pub enum ObjectType {
    Gene,
    Transcript,
    Translation,
}

/// The kind of sequence a primary xref carries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, Serialize, Deserialize,
)]
pub enum SequenceType {
    Dna,
    Peptide,
}

/// Named provenance of a set of xrefs.
///
/// A source with `external_db_id == None` is *unknown*: its xrefs are
/// dropped from every emitted artifact (`§3` invariants, `§7`
/// `UnknownSource`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: u32,
    pub name: String,
    pub external_db_id: Option<u32>,
}

impl Source {
    pub fn is_known(&self) -> bool {
        self.external_db_id.is_some()
    }
}

/// An external biological identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Xref {
    pub id: u32,
    pub accession: String,
    pub version: u32,
    pub label: String,
    pub description: String,
    pub source_id: u32,
    pub species_id: u32,
    pub sequence: Option<Sequence>,
}

impl Xref {
    /// `label` defaults to `accession` if empty (`§3`).
    pub fn effective_label(&self) -> &str {
        if self.label.is_empty() {
            &self.accession
        } else {
            &self.label
        }
    }

    pub fn is_primary(&self) -> bool {
        self.sequence.is_some()
    }
}

/// A sequence attached to a primary xref.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub kind: SequenceType,
    pub seq: String,
}

/// A directed edge `master -> dependent`, both xrefs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentXref {
    pub master_xref_id: u32,
    pub dependent_xref_id: u32,
    pub linkage_annotation: String,
}

/// A hand-curated edge from an xref to a core object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectXref {
    pub xref_id: u32,
    pub ensembl_stable_id: String,
    pub object_type: ObjectType,
    pub linkage_xref: Option<String>,
}

/// `(xref_id, synonym_string)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synonym {
    pub xref_id: u32,
    pub synonym: String,
}

/// Interpro/Pfam pair, passed through verbatim (`§4.5`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interpro {
    pub interpro_accession: String,
    pub pfam_accession: String,
}

/// A gene in the core annotation database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gene {
    pub internal_id: u32,
    pub stable_id: String,
}

/// A transcript belonging to one gene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub internal_id: u32,
    pub stable_id: String,
    pub gene_internal_id: u32,
    /// Length of the spliced transcript, used for gene display-xref
    /// tie-breaking (`§4.6` Phase 3).
    pub length: u32,
    pub spliced_dna: String,
    /// Name of the genomic slice this transcript lives on, used to honor
    /// the Sequence Dumper's `location` argument (`§4.2`).
    pub location: String,
}

/// A translation belonging to one transcript (at most one per transcript).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub internal_id: u32,
    pub stable_id: String,
    pub transcript_internal_id: u32,
    pub peptide: String,
}

/// Per-aligned-edge alignment identity metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityXref {
    pub object_xref_id: u32,
    pub query_identity: u8,
    pub target_identity: u8,
    pub query_start: u32,
    pub query_end: u32,
    pub target_start: u32,
    pub target_end: u32,
    pub cigar_line: String,
    pub score: f64,
    /// `None` renders as the SQL-null literal `\N` (`§4.4`).
    pub evalue: Option<f64>,
    pub analysis_id: u32,
}

/// A row as written to `xref.txt`: a shifted-id xref plus the
/// `"DEPENDENT"` trailing marker (`§6`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrefRow {
    /// Already shifted by the xref id offset (`§3` invariants).
    pub xref_id: u32,
    pub external_db_id: u32,
    pub accession: String,
    pub label: String,
    pub version: u32,
    pub description: String,
    pub dependent: bool,
}

/// A row as written to `object_xref.txt`: a materialized edge between a
/// core object and an xref, plus the `"DEPENDENT"` trailing marker (`§6`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectXrefRow {
    pub object_xref_id: u32,
    pub object_type: ObjectType,
    pub object_internal_id: u32,
    /// Already shifted by the xref id offset (`§3` invariants).
    pub xref_id: u32,
    pub dependent: bool,
}

/// A row as written to `go_xref.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoXrefRow {
    pub object_xref_id: u32,
    pub linkage_annotation: String,
}

/// An alignment method and the (species, source) patterns that route xrefs
/// to it (`§4.1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub method_name: String,
    pub patterns: Vec<(String, String)>,
}

impl Rule {
    /// A rule with every pair `("*", "*")` fetches everything and needs no
    /// SQL predicate (`§4.1`).
    pub fn is_universal(&self) -> bool {
        self.patterns
            .iter()
            .all(|(species, source)| species == "*" && source == "*")
    }
}
