use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::NormError;
use crate::reference::ReferenceTable;
use crate::taxonomy::{RankExtractor, TaxonKey};

/// A taxon that only matched the reference after trailing ranks were
/// dropped from its canonical key.
#[derive(Debug, Clone, Serialize)]
pub struct Shortening {
    pub taxon: String,
    pub key: TaxonKey,
    pub dropped: usize,
}

/// Resolution of every distinct input taxon against the reference table.
/// Taxa absent from the map matched nothing at any rank depth and are
/// normalised by the grand average; they are listed in `unresolved` so the
/// fallback is never silent.
#[derive(Debug, Default)]
pub struct Reconciliation {
    map: HashMap<String, TaxonKey>,
    pub shortened: Vec<Shortening>,
    pub unresolved: Vec<String>,
}

impl Reconciliation {
    pub fn lookup(&self, taxon: &str) -> Option<&TaxonKey> {
        self.map.get(taxon)
    }

    pub fn resolved(&self) -> usize {
        self.map.len()
    }

    pub fn exact_matches(&self) -> usize {
        self.map.len() - self.shortened.len()
    }

    pub fn distinct_taxa(&self) -> usize {
        self.map.len() + self.unresolved.len()
    }
}

/// Map each distinct input annotation to the reference key used for lookup.
/// Repeated raw strings are resolved once, in first-appearance order. An
/// annotation with no parseable ranks is fatal: the input table's taxa are
/// assumed well-formed by contract.
pub fn reconcile<'a, I>(
    taxa: I,
    extractor: &RankExtractor,
    table: &ReferenceTable,
) -> Result<Reconciliation, NormError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut reconciliation = Reconciliation::default();
    let mut seen = HashSet::new();

    for taxon in taxa {
        if !seen.insert(taxon.to_string()) {
            continue;
        }

        let labels = extractor.extract(taxon);
        let Some(full) = TaxonKey::from_labels(&labels) else {
            return Err(NormError::UnparseableTaxon(taxon.to_string()));
        };

        if table.contains(&full) {
            reconciliation.map.insert(taxon.to_string(), full);
            continue;
        }

        // longest matching prefix wins; drop one trailing rank at a time
        let shortened = (1..labels.len()).rev().find_map(|len| {
            TaxonKey::from_labels(&labels[..len])
                .filter(|key| table.contains(key))
                .map(|key| (key, labels.len() - len))
        });

        match shortened {
            Some((key, dropped)) => {
                debug!(taxon, key = %key, dropped, "taxon shortened to a coarser reference key");
                reconciliation.shortened.push(Shortening {
                    taxon: taxon.to_string(),
                    key: key.clone(),
                    dropped,
                });
                reconciliation.map.insert(taxon.to_string(), key);
            }
            None => {
                warn!(taxon, "no reference match at any rank depth");
                reconciliation.unresolved.push(taxon.to_string());
            }
        }
    }

    Ok(reconciliation)
}
