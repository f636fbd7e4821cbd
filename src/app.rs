use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::error::NormError;
use crate::fs_util;
use crate::normalize;
use crate::reconcile::{self, Shortening};
use crate::reference;
use crate::table::AbundanceTable;
use crate::taxonomy::{RankExtractor, TaxonKey};

pub const DEFAULT_OUTPUT_FILENAME: &str = "counts_out.tsv";

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub db_path: Utf8PathBuf,
    pub input_path: Utf8PathBuf,
    pub output_path: Option<Utf8PathBuf>,
    pub taxonomy_column: String,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub reference: ReferenceSummary,
    pub taxa: TaxaSummary,
    pub rows: usize,
    pub samples: usize,
    pub zero_sum_columns: Vec<String>,
    pub output_path: Option<String>,
    pub finished_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceSummary {
    pub keys_added: usize,
    pub duplicate_instances: u64,
    pub duplicated_keys: usize,
    pub duplicates: BTreeMap<TaxonKey, u64>,
    pub grand_average: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaxaSummary {
    pub distinct: usize,
    pub exact: usize,
    pub shortened: Vec<Shortening>,
    pub unresolved: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App {
    extractor: RankExtractor,
}

impl App {
    pub fn new() -> Self {
        Self {
            extractor: RankExtractor::new(),
        }
    }

    /// Run the whole pipeline: curate the reference, reconcile the input
    /// table's annotations against it, normalise, and write the output
    /// table unless this is a dry run. Fatal errors abort before any
    /// output file exists.
    pub fn run(
        &self,
        options: &RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunResult, NormError> {
        let started = Instant::now();

        sink.event(ProgressEvent {
            message: format!("phase=Curate; reading reference {}", options.db_path),
            elapsed: None,
        });
        let db_lines = fs_util::read_lines(&options.db_path)?;
        let curation = reference::curate(&db_lines, &self.extractor)?;
        let grand_average = curation.table.grand_average();

        sink.event(ProgressEvent {
            message: format!("phase=Reconcile; reading table {}", options.input_path),
            elapsed: Some(started.elapsed()),
        });
        let input_lines = fs_util::read_lines(&options.input_path)?;
        let mut table = AbundanceTable::parse(&input_lines, &options.taxonomy_column)?;
        let reconciliation = reconcile::reconcile(
            table.rows.iter().map(|row| row.taxon.as_str()),
            &self.extractor,
            &curation.table,
        )?;

        sink.event(ProgressEvent {
            message: format!("phase=Normalize; correcting {} rows", table.rows.len()),
            elapsed: Some(started.elapsed()),
        });
        let normalize_report = normalize::normalize(
            &mut table,
            &curation.table,
            &reconciliation,
            grand_average,
        );

        let output_path = if options.dry_run {
            None
        } else {
            let path = resolve_output_path(options);
            sink.event(ProgressEvent {
                message: format!("phase=Write; writing {path}"),
                elapsed: Some(started.elapsed()),
            });
            fs_util::write_atomic(&path, &table.to_tsv())?;
            Some(path.into_string())
        };

        Ok(RunResult {
            reference: ReferenceSummary {
                keys_added: curation.report.keys_added,
                duplicate_instances: curation.report.duplicate_instances(),
                duplicated_keys: curation.report.distinct_duplicated_keys(),
                duplicates: curation.report.duplicates,
                grand_average,
            },
            taxa: TaxaSummary {
                distinct: reconciliation.distinct_taxa(),
                exact: reconciliation.exact_matches(),
                shortened: reconciliation.shortened,
                unresolved: reconciliation.unresolved,
            },
            rows: table.rows.len(),
            samples: table.sample_names.len(),
            zero_sum_columns: normalize_report.zero_sum_columns,
            output_path,
            finished_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

pub fn resolve_output_path(options: &RunOptions) -> Utf8PathBuf {
    match &options.output_path {
        Some(path) => path.clone(),
        None => match options.input_path.parent() {
            Some(dir) => dir.join(DEFAULT_OUTPUT_FILENAME),
            None => Utf8PathBuf::from(DEFAULT_OUTPUT_FILENAME),
        },
    }
}
