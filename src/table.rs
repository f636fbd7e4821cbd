use crate::error::NormError;

/// One abundance row: the raw taxon annotation (repeatable across rows),
/// counts aligned with the table's sample columns, and the passthrough
/// field carried through normalisation unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub taxon: String,
    pub counts: Vec<f64>,
    pub passthrough: String,
}

/// Tab-delimited abundance table. Rows and columns keep their input order;
/// the trailing non-numeric column is excluded from normalisation and
/// reattached on output.
#[derive(Debug, Clone, PartialEq)]
pub struct AbundanceTable {
    pub taxonomy_column: String,
    pub sample_names: Vec<String>,
    pub passthrough_name: String,
    pub rows: Vec<Row>,
}

impl AbundanceTable {
    pub fn parse<I, S>(lines: I, taxonomy_column: &str) -> Result<Self, NormError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lines = lines.into_iter();
        let header = lines.next().ok_or_else(|| NormError::TableParse {
            line: 1,
            message: "table is empty".to_string(),
        })?;
        let columns: Vec<String> = header
            .as_ref()
            .split('\t')
            .map(|name| name.to_string())
            .collect();

        let taxonomy_index = columns
            .iter()
            .position(|name| name == taxonomy_column)
            .ok_or_else(|| NormError::MissingColumn(taxonomy_column.to_string()))?;

        let mut value_indices: Vec<usize> =
            (0..columns.len()).filter(|i| *i != taxonomy_index).collect();
        let passthrough_index = value_indices.pop().ok_or_else(|| NormError::TableParse {
            line: 1,
            message: "no columns besides the taxonomy column".to_string(),
        })?;
        let sample_names: Vec<String> = value_indices
            .iter()
            .map(|i| columns[*i].clone())
            .collect();

        let mut rows = Vec::new();
        for (index, line) in lines.enumerate() {
            let line = line.as_ref();
            if line.is_empty() {
                continue;
            }
            let line_number = index + 2;
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != columns.len() {
                return Err(NormError::TableParse {
                    line: line_number,
                    message: format!(
                        "expected {} fields, found {}",
                        columns.len(),
                        fields.len()
                    ),
                });
            }

            let mut counts = Vec::with_capacity(value_indices.len());
            for i in &value_indices {
                let field = fields[*i];
                let value: f64 = field.trim().parse().map_err(|_| NormError::TableParse {
                    line: line_number,
                    message: format!(
                        "sample {:?} value is not a number: {field:?}",
                        columns[*i]
                    ),
                })?;
                counts.push(value);
            }

            rows.push(Row {
                taxon: fields[taxonomy_index].to_string(),
                counts,
                passthrough: fields[passthrough_index].to_string(),
            });
        }

        Ok(Self {
            taxonomy_column: taxonomy_column.to_string(),
            sample_names,
            passthrough_name: columns[passthrough_index].clone(),
            rows,
        })
    }

    /// Serialize back to tab-delimited text: index column restored first,
    /// samples in original order, passthrough last.
    pub fn to_tsv(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.taxonomy_column);
        for name in &self.sample_names {
            out.push('\t');
            out.push_str(name);
        }
        out.push('\t');
        out.push_str(&self.passthrough_name);
        out.push('\n');

        for row in &self.rows {
            out.push_str(&row.taxon);
            for value in &row.counts {
                out.push('\t');
                out.push_str(&value.to_string());
            }
            out.push('\t');
            out.push_str(&row.passthrough);
            out.push('\n');
        }
        out
    }
}
