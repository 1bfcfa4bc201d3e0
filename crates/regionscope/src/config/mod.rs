use std::{fs, path::Path};

use anyhow::Context;
use regionscope_data::BoundaryKind;
use serde::{Deserialize, Serialize};

use crate::error::RegionScopeError;

/// Base score of an exact match; no single boost may exceed it.
pub const EXACT_MATCH_SCORE: u32 = 100;

/// Additive type boosts applied after a matching rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBoosts {
    /// Facility entries, non-numeric query
    pub facility: u32,
    pub locality_text: u32,
    pub locality_numeric: u32,
    pub postcode_numeric: u32,
    pub postcode_text: u32,
    /// LGA entries, any query
    pub lga: u32,
}

impl Default for ScoreBoosts {
    fn default() -> Self {
        Self {
            facility: 25,
            locality_text: 15,
            locality_numeric: 5,
            postcode_numeric: 20,
            postcode_text: 5,
            lga: 10,
        }
    }
}

impl ScoreBoosts {
    /// All boosts zero; scores are then the bare ladder values.
    pub const NONE: Self = Self {
        facility: 0,
        locality_text: 0,
        locality_numeric: 0,
        postcode_numeric: 0,
        postcode_text: 0,
        lga: 0,
    };

    /// Boosts in declaration order. Each must stay within the exact-match base score.
    pub fn custom(
        facility: u32,
        locality_text: u32,
        locality_numeric: u32,
        postcode_numeric: u32,
        postcode_text: u32,
        lga: u32,
    ) -> Result<Self, RegionScopeError> {
        let boosts = Self {
            facility,
            locality_text,
            locality_numeric,
            postcode_numeric,
            postcode_text,
            lga,
        };
        boosts.validate()?;
        Ok(boosts)
    }

    pub fn validate(&self) -> Result<(), RegionScopeError> {
        let largest = [
            self.facility,
            self.locality_text,
            self.locality_numeric,
            self.postcode_numeric,
            self.postcode_text,
            self.lga,
        ]
        .into_iter()
        .max()
        .unwrap_or(0);
        if largest > EXACT_MATCH_SCORE {
            return Err(RegionScopeError::ConfigError(format!(
                "Score boosts must not exceed {EXACT_MATCH_SCORE}, got {largest}"
            )));
        }
        Ok(())
    }
}

/// Search behaviour shared by every query a [`crate::RegionSearcher`] answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum number of results to return
    pub limit: usize,
    /// Queries shorter than this (after trimming) return nothing
    pub min_query_chars: usize,
    /// Number of display strings returned by `suggestions`
    pub suggestion_limit: usize,
    /// Boundary kinds merged into the index, in merge order
    pub kinds: Vec<BoundaryKind>,
    /// Half-width in degrees of the box placed around a facility point
    pub facility_point_padding: f64,
    pub boosts: ScoreBoosts,
}

impl SearchConfig {
    pub fn builder() -> SearchConfigBuilder {
        SearchConfigBuilder::default()
    }

    /// Reads a JSON configuration; absent fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RegionScopeError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read search config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid search config {}", path.display()))?;
        config.boosts.validate()?;
        Ok(config)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: 20,
            min_query_chars: 2,
            suggestion_limit: 10,
            kinds: BoundaryKind::ALL.to_vec(),
            facility_point_padding: 0.001,
            boosts: ScoreBoosts::default(),
        }
    }
}

/// Builder for creating search configurations with ergonomic defaults
#[derive(Debug, Clone, Default)]
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    /// Few results, boundaries only (no facility dataset to load)
    pub fn fast() -> Self {
        let mut builder = Self::new();
        builder.config.limit = 10;
        builder.config.suggestion_limit = 5;
        builder.config.kinds.retain(|kind| !kind.is_facility());
        builder
    }

    /// Many results across every dataset
    pub fn comprehensive() -> Self {
        let mut builder = Self::new();
        builder.config.limit = 50;
        builder.config.suggestion_limit = 20;
        builder
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.config.limit = limit;
        self
    }

    /// Minimum trimmed query length; never below one character
    pub fn min_query_chars(mut self, chars: usize) -> Self {
        self.config.min_query_chars = chars.max(1);
        self
    }

    pub fn suggestion_limit(mut self, limit: usize) -> Self {
        self.config.suggestion_limit = limit;
        self
    }

    /// Restrict the index to `kinds`, keeping the given order and dropping repeats
    pub fn kinds(mut self, kinds: &[BoundaryKind]) -> Self {
        let mut unique = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            if !unique.contains(&kind) {
                unique.push(kind);
            }
        }
        self.config.kinds = unique;
        self
    }

    pub fn facility_point_padding(mut self, degrees: f64) -> Self {
        self.config.facility_point_padding = degrees.abs();
        self
    }

    /// Configure the per-kind score boosts
    pub fn boosts(self) -> BoostsBuilder {
        BoostsBuilder::new(self)
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

/// Builder for [`ScoreBoosts`]
pub struct BoostsBuilder {
    parent: SearchConfigBuilder,
}

impl BoostsBuilder {
    fn new(parent: SearchConfigBuilder) -> Self {
        Self { parent }
    }

    /// Rank purely on match quality
    pub fn disable(mut self) -> Self {
        self.parent.config.boosts = ScoreBoosts::NONE;
        self
    }

    /// Prefer suburbs and postcodes over statistical areas
    pub fn prefer_places(mut self) -> Self {
        let boosts = &mut self.parent.config.boosts;
        boosts.locality_text = 25;
        boosts.postcode_numeric = 30;
        boosts.lga = 5;
        self
    }

    pub fn custom(mut self, boosts: ScoreBoosts) -> Result<Self, RegionScopeError> {
        boosts.validate()?;
        self.parent.config.boosts = boosts;
        Ok(self)
    }

    /// Return to the main configuration builder
    pub fn done(self) -> SearchConfigBuilder {
        self.parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_builder() {
        let config = SearchConfigBuilder::new().build();
        assert_eq!(config.limit, 20);
        assert_eq!(config.min_query_chars, 2);
        assert_eq!(config.kinds, BoundaryKind::ALL.to_vec());
        assert_eq!(config.boosts, ScoreBoosts::default());
    }

    #[test]
    fn test_fast_preset() {
        let config = SearchConfigBuilder::fast().build();
        assert_eq!(config.limit, 10);
        assert!(!config.kinds.contains(&BoundaryKind::Facility));
        assert_eq!(config.kinds.len(), 6);
    }

    #[test]
    fn test_comprehensive_preset() {
        let config = SearchConfigBuilder::comprehensive().build();
        assert_eq!(config.limit, 50);
        assert_eq!(config.suggestion_limit, 20);
    }

    #[test]
    fn test_method_chaining() {
        let config = SearchConfigBuilder::new()
            .limit(30)
            .min_query_chars(0)
            .kinds(&[BoundaryKind::Sa2, BoundaryKind::Locality, BoundaryKind::Sa2])
            .boosts()
            .prefer_places()
            .done()
            .build();

        assert_eq!(config.limit, 30);
        assert_eq!(config.min_query_chars, 1);
        assert_eq!(config.kinds, vec![BoundaryKind::Sa2, BoundaryKind::Locality]);
        assert_eq!(config.boosts.locality_text, 25);
        assert_eq!(config.boosts.facility, 25);
    }

    #[test]
    fn test_custom_boosts_validation() {
        assert!(ScoreBoosts::custom(25, 15, 5, 20, 5, 10).is_ok());
        assert!(ScoreBoosts::custom(101, 15, 5, 20, 5, 10).is_err());

        let too_large = ScoreBoosts {
            lga: 150,
            ..ScoreBoosts::default()
        };
        assert!(SearchConfigBuilder::new().boosts().custom(too_large).is_err());
    }

    #[test]
    fn test_config_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.json");
        std::fs::write(&path, r#"{"limit": 5, "kinds": ["sa2", "locality"]}"#).unwrap();

        let config = SearchConfig::from_json_file(&path).unwrap();
        assert_eq!(config.limit, 5);
        assert_eq!(config.kinds, vec![BoundaryKind::Sa2, BoundaryKind::Locality]);
        assert_eq!(config.min_query_chars, 2);

        let missing = SearchConfig::from_json_file(dir.path().join("absent.json"));
        assert!(matches!(missing, Err(RegionScopeError::Other(_))));

        std::fs::write(&path, r#"{"boosts": {"facility": 500, "locality_text": 0,
            "locality_numeric": 0, "postcode_numeric": 0, "postcode_text": 0, "lga": 0}}"#)
            .unwrap();
        assert!(matches!(
            SearchConfig::from_json_file(&path),
            Err(RegionScopeError::ConfigError(_))
        ));
    }

    #[test]
    fn test_disabled_boosts() {
        let config = SearchConfig::builder().boosts().disable().done().build();
        assert_eq!(config.boosts, ScoreBoosts::NONE);
    }
}
