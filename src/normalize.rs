use serde::Serialize;
use tracing::warn;

use crate::reconcile::Reconciliation;
use crate::reference::ReferenceTable;
use crate::table::AbundanceTable;

#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizeReport {
    /// Sample columns whose post-division total was zero. Rescaling is
    /// undefined for these; their values are left as-is and the caller is
    /// expected to surface the list.
    pub zero_sum_columns: Vec<String>,
}

/// Divide each row by its reconciled copy number (grand average when the
/// taxon is unmapped), then rescale every sample column to relative
/// abundance. Rows sharing a raw annotation divide independently with the
/// same resolution; row and column order are untouched.
pub fn normalize(
    table: &mut AbundanceTable,
    reference: &ReferenceTable,
    reconciliation: &Reconciliation,
    grand_average: f64,
) -> NormalizeReport {
    for row in &mut table.rows {
        let divisor = reconciliation
            .lookup(&row.taxon)
            .and_then(|key| reference.get(key))
            .unwrap_or(grand_average);
        for value in &mut row.counts {
            *value /= divisor;
        }
    }

    let mut report = NormalizeReport::default();
    for (column, name) in table.sample_names.iter().enumerate() {
        let total: f64 = table.rows.iter().map(|row| row.counts[column]).sum();
        if total == 0.0 {
            warn!(column = name.as_str(), "sample column sums to zero, relative abundance undefined");
            report.zero_sum_columns.push(name.clone());
            continue;
        }
        for row in &mut table.rows {
            row.counts[column] /= total;
        }
    }
    report
}
