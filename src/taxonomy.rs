use std::fmt;

use regex::Regex;
use serde::Serialize;

/// Separator between rank labels inside a canonical key.
pub const RANK_SEPARATOR: char = ';';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
}

impl Rank {
    /// All ranks in kingdom-to-species order. Extraction is positional and
    /// must follow this order.
    pub const ALL: [Rank; 7] = [
        Rank::Kingdom,
        Rank::Phylum,
        Rank::Class,
        Rank::Order,
        Rank::Family,
        Rank::Genus,
        Rank::Species,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Rank::Kingdom => "k__",
            Rank::Phylum => "p__",
            Rank::Class => "c__",
            Rank::Order => "o__",
            Rank::Family => "f__",
            Rank::Genus => "g__",
            Rank::Species => "s__",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Kingdom => write!(f, "kingdom"),
            Rank::Phylum => write!(f, "phylum"),
            Rank::Class => write!(f, "class"),
            Rank::Order => write!(f, "order"),
            Rank::Family => write!(f, "family"),
            Rank::Genus => write!(f, "genus"),
            Rank::Species => write!(f, "species"),
        }
    }
}

/// Canonical lookup identity for a taxon: the contiguous rank labels parsed
/// from an annotation, joined with `;`. Case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaxonKey(String);

impl TaxonKey {
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Option<Self> {
        if labels.is_empty() {
            return None;
        }
        let mut joined = String::new();
        for (i, label) in labels.iter().enumerate() {
            if i > 0 {
                joined.push(RANK_SEPARATOR);
            }
            joined.push_str(label.as_ref());
        }
        Some(Self(joined))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaxonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered per-rank extraction rules. A label runs from a rank tag to the
/// next rank delimiter, closing bracket, or end of string, with optional
/// `[`-wrapping and surrounding whitespace tolerated.
pub struct RankExtractor {
    rules: Vec<Regex>,
}

impl RankExtractor {
    pub fn new() -> Self {
        let rules = Rank::ALL
            .iter()
            .map(|rank| Regex::new(&format!(r"{}\[?([\w\s]+)", rank.tag())).unwrap())
            .collect();
        Self { rules }
    }

    /// Extract the longest contiguous run of rank labels from an annotation.
    /// The first rule that fails ends extraction; tags of lower ranks
    /// appearing later in the string are ignored. Absence is not an error:
    /// the result may be empty.
    pub fn extract(&self, raw: &str) -> Vec<String> {
        let mut labels = Vec::new();
        for rule in &self.rules {
            let Some(captures) = rule.captures(raw) else {
                break;
            };
            let label = captures[1].trim();
            if label.is_empty() {
                break;
            }
            labels.push(label.to_string());
        }
        labels
    }
}

impl Default for RankExtractor {
    fn default() -> Self {
        Self::new()
    }
}
