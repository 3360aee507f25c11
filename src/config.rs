//! Species-specific configuration plug-in (`§6`).
//!
//! A plain serde struct loaded from TOML, with round-trip tests against
//! a fixture file.

use serde::{Deserialize, Serialize};

use crate::model::Rule;

/// A species-specific configuration, as described in `§6`.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct SpeciesConfig {
    /// `(method, [(species_pattern, source_pattern), ...])` rules
    /// consumed by the rule engine (`§4.1`).
    pub rules: Vec<RuleConf>,
    /// Ordered list of source names, highest priority first, used by the
    /// display-xref selector (`§4.6`).
    pub display_sources: Vec<String>,
    /// Case-insensitive regexes applied, in order, to gene descriptions
    /// (`§4.7`).
    pub description_filters: Vec<String>,
    /// The authoritative naming body for the species, e.g. `ZFIN_ID`.
    /// Nullable: some species have no consortium source.
    pub consortium: Option<String>,
}

/// TOML-friendly mirror of [`Rule`].
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct RuleConf {
    pub method: String,
    pub patterns: Vec<(String, String)>,
}

impl From<&RuleConf> for Rule {
    fn from(conf: &RuleConf) -> Self {
        Rule {
            method_name: conf.method.clone(),
            patterns: conf.patterns.clone(),
        }
    }
}

impl SpeciesConfig {
    /// Load a species configuration from a TOML file on disk.
    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self, anyhow::Error> {
        let toml_str = std::fs::read_to_string(path)?;
        let config: SpeciesConfig = toml::from_str(&toml_str)?;
        Ok(config)
    }

    /// The engine's in-memory rule list (`§4.1`).
    pub fn rules(&self) -> Vec<Rule> {
        self.rules.iter().map(Rule::from).collect()
    }
}
