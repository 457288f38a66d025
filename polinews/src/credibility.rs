use std::collections::HashMap;
use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Coarse reliability class of a news source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CredibilityTier {
    High,
    Medium,
    Low,
    Unknown,
}

impl CredibilityTier {
    pub const ALL: [CredibilityTier; 4] = [
        CredibilityTier::High,
        CredibilityTier::Medium,
        CredibilityTier::Low,
        CredibilityTier::Unknown,
    ];
}

impl fmt::Display for CredibilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CredibilityTier::High => "High",
            CredibilityTier::Medium => "Medium",
            CredibilityTier::Low => "Low",
            CredibilityTier::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// Curated source name → tier table.
#[derive(Debug, Clone, Default)]
pub struct CredibilityTable {
    tiers: HashMap<String, CredibilityTier>,
}

impl CredibilityTable {
    /// Build a table, rejecting a source listed under two tiers.
    pub fn new<S: AsRef<str>>(high: &[S], medium: &[S], low: &[S]) -> Result<Self> {
        let table = Self::build(high, medium, low);
        for (tier, names) in [
            (CredibilityTier::High, high),
            (CredibilityTier::Medium, medium),
            (CredibilityTier::Low, low),
        ] {
            for name in names {
                let recorded = table.tier_of(name.as_ref());
                if recorded != tier && recorded != CredibilityTier::Unknown {
                    bail!(
                        "source {:?} listed as both {} and {}",
                        normalize_name(name.as_ref()),
                        recorded,
                        tier
                    );
                }
            }
        }
        Ok(table)
    }

    /// Build without conflict checks; the first tier a source appears under wins.
    pub(crate) fn build<S: AsRef<str>>(high: &[S], medium: &[S], low: &[S]) -> Self {
        let mut tiers = HashMap::new();
        let groups = [
            (CredibilityTier::High, high),
            (CredibilityTier::Medium, medium),
            (CredibilityTier::Low, low),
        ];
        for (tier, names) in groups {
            for name in names {
                let key = normalize_name(name.as_ref());
                if !key.is_empty() {
                    tiers.entry(key).or_insert(tier);
                }
            }
        }
        Self { tiers }
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn tier_of(&self, source_name: &str) -> CredibilityTier {
        self.tiers
            .get(&normalize_name(source_name))
            .copied()
            .unwrap_or(CredibilityTier::Unknown)
    }
}

/// Case-insensitive exact lookup of source names.
#[derive(Debug, Clone)]
pub struct CredibilityAssessor {
    table: CredibilityTable,
}

impl CredibilityAssessor {
    pub fn new(table: CredibilityTable) -> Self {
        Self { table }
    }

    pub fn assess(&self, source_name: &str) -> CredibilityTier {
        self.table.tier_of(source_name)
    }
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
