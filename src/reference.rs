use std::collections::{BTreeMap, HashMap, hash_map::Entry};

use serde::Serialize;
use tracing::debug;

use crate::error::NormError;
use crate::taxonomy::{RankExtractor, TaxonKey};

/// Curated mapping from canonical taxon key to rRNA gene copy number.
/// Immutable once curation completes.
#[derive(Debug, Default)]
pub struct ReferenceTable {
    entries: HashMap<TaxonKey, f64>,
}

impl ReferenceTable {
    pub fn get(&self, key: &TaxonKey) -> Option<f64> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &TaxonKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mean copy number across all entries, the fallback divisor for taxa
    /// that match nothing at any rank depth. Curation guarantees at least
    /// one entry.
    pub fn grand_average(&self) -> f64 {
        self.entries.values().sum::<f64>() / self.entries.len() as f64
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DuplicateReport {
    pub keys_added: usize,
    /// Discarded later records per canonical key; a key seen twice in the
    /// reference counts 1 here.
    pub duplicates: BTreeMap<TaxonKey, u64>,
}

impl DuplicateReport {
    pub fn duplicate_instances(&self) -> u64 {
        self.duplicates.values().sum()
    }

    pub fn distinct_duplicated_keys(&self) -> usize {
        self.duplicates.len()
    }
}

#[derive(Debug)]
pub struct Curation {
    pub table: ReferenceTable,
    pub report: DuplicateReport,
}

/// Build the reference table from raw database lines. Only lines starting
/// with the kingdom marker are records; the rest are discarded silently.
/// A record whose copy-number field is missing or unparseable is fatal:
/// a partially corrupt reference cannot be trusted.
pub fn curate<I, S>(lines: I, extractor: &RankExtractor) -> Result<Curation, NormError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut entries = HashMap::new();
    let mut report = DuplicateReport::default();

    for (index, line) in lines.into_iter().enumerate() {
        let line = line.as_ref();
        if !line.starts_with('k') {
            continue;
        }

        let mut fields = line.split('\t');
        let raw_taxonomy = fields.next().unwrap_or_default();
        let value_field = fields.next().ok_or_else(|| NormError::DataCorruption {
            line: index + 1,
            message: "missing copy-number field".to_string(),
        })?;
        let copy_number: f64 =
            value_field
                .trim()
                .parse()
                .map_err(|_| NormError::DataCorruption {
                    line: index + 1,
                    message: format!("copy-number field is not a number: {value_field:?}"),
                })?;

        let labels = extractor.extract(raw_taxonomy);
        let Some(key) = TaxonKey::from_labels(&labels) else {
            // annotation carries no usable ranks, record contributes no key
            continue;
        };

        match entries.entry(key) {
            Entry::Vacant(slot) => {
                debug!(key = %slot.key(), copy_number, "reference key added");
                slot.insert(copy_number);
                report.keys_added += 1;
            }
            Entry::Occupied(slot) => {
                *report.duplicates.entry(slot.key().clone()).or_insert(0) += 1;
            }
        }
    }

    if entries.is_empty() {
        return Err(NormError::EmptyReference);
    }

    Ok(Curation {
        table: ReferenceTable { entries },
        report,
    })
}
