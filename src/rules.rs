//! Rule Engine (C10, `§4.1`).
//!
//! Translates the rule table (method x (species, source) pairs) into
//! predicates the Sequence Dumper (C2) uses to select which xrefs go into
//! which FASTA subset. The real adapter would turn these into SQL `WHERE`
//! clauses against `primary_xref`; the database layer is out of scope
//! (`spec.md` §1), so [`CompiledRule`] instead exposes an in-memory
//! predicate plus a debug SQL rendering for parity with `§4.1`'s example.

use crate::err::XrefError;
use crate::model::{Rule, SequenceType, Xref};
use crate::store::XrefStore;

/// One `(species_id = s AND source_id = src)`-shaped OR-term, or a
/// one-sided variant when a pattern side is `"*"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    SpeciesAndSource(u32, u32),
    SpeciesOnly(u32),
    SourceOnly(u32),
}

impl Condition {
    fn matches(&self, xref: &Xref) -> bool {
        match *self {
            Condition::SpeciesAndSource(species, source) => {
                xref.species_id == species && xref.source_id == source
            }
            Condition::SpeciesOnly(species) => xref.species_id == species,
            Condition::SourceOnly(source) => xref.source_id == source,
        }
    }

    fn to_sql(&self) -> String {
        match *self {
            Condition::SpeciesAndSource(species, source) => {
                format!("(species_id = {species} AND source_id = {source})")
            }
            Condition::SpeciesOnly(species) => format!("(species_id = {species})"),
            Condition::SourceOnly(source) => format!("(source_id = {source})"),
        }
    }
}

/// A rule compiled against a concrete xref store's species/source ids.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub method_name: String,
    /// `None` means the rule is universal: fetch everything, no predicate
    /// (`§4.1`).
    pub conditions: Option<Vec<Condition>>,
}

impl CompiledRule {
    /// Whether `xref` belongs in the `kind`-typed FASTA subset for this
    /// rule.
    pub fn matches(&self, xref: &Xref, kind: SequenceType) -> bool {
        match &xref.sequence {
            Some(seq) if seq.kind == kind => match &self.conditions {
                None => true,
                Some(conds) => conds.iter().any(|c| c.matches(xref)),
            },
            _ => false,
        }
    }

    /// Render the `§4.1`-shaped SQL predicate for a given sequence kind,
    /// for debug logging; `None` when the rule is universal (no predicate
    /// added).
    pub fn to_sql_predicate(&self, kind: SequenceType) -> Option<String> {
        let conditions = self.conditions.as_ref()?;
        let or_clause = conditions
            .iter()
            .map(Condition::to_sql)
            .collect::<Vec<_>>()
            .join(" OR ");
        Some(format!(
            "primary_xref.sequence_type = {kind:?} AND ( {or_clause} )"
        ))
    }
}

/// Compile every rule in `rules` against `store`'s species/source ids.
///
/// A missing species or source name is a fatal [`XrefError::ConfigMissing`]
/// enumerating the valid names the store knows about (`§4.1`, `§7`).
pub fn compile_rules(
    store: &dyn XrefStore,
    rules: &[Rule],
) -> Result<Vec<CompiledRule>, XrefError> {
    rules.iter().map(|rule| compile_rule(store, rule)).collect()
}

fn compile_rule(store: &dyn XrefStore, rule: &Rule) -> Result<CompiledRule, XrefError> {
    if rule.is_universal() {
        return Ok(CompiledRule {
            method_name: rule.method_name.clone(),
            conditions: None,
        });
    }

    let mut conditions = Vec::with_capacity(rule.patterns.len());
    for (species_pattern, source_pattern) in &rule.patterns {
        let species_id = if species_pattern == "*" {
            None
        } else {
            Some(resolve_species(store, species_pattern)?)
        };
        let source_id = if source_pattern == "*" {
            None
        } else {
            Some(resolve_source(store, source_pattern)?)
        };

        let condition = match (species_id, source_id) {
            (Some(species), Some(source)) => Condition::SpeciesAndSource(species, source),
            (Some(species), None) => Condition::SpeciesOnly(species),
            (None, Some(source)) => Condition::SourceOnly(source),
            (None, None) => continue, // ("*", "*") term within an otherwise mixed rule
        };
        conditions.push(condition);
    }

    Ok(CompiledRule {
        method_name: rule.method_name.clone(),
        conditions: Some(conditions),
    })
}

fn resolve_species(store: &dyn XrefStore, name: &str) -> Result<u32, XrefError> {
    store
        .species_id_by_name(name)
        .ok_or_else(|| XrefError::ConfigMissing {
            name: name.to_string(),
            valid: store.valid_species_names(),
        })
}

fn resolve_source(store: &dyn XrefStore, name: &str) -> Result<u32, XrefError> {
    store
        .source_id_by_name(name)
        .ok_or_else(|| XrefError::ConfigMissing {
            name: name.to_string(),
            valid: store.valid_source_names(),
        })
}
