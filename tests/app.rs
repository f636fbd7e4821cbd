use std::io::Write;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use flate2::Compression;
use flate2::write::GzEncoder;

use rrna_norm::app::{App, ProgressEvent, ProgressSink, RunOptions, resolve_output_path};
use rrna_norm::error::NormError;

struct NoopSink;

impl ProgressSink for NoopSink {
    fn event(&self, _event: ProgressEvent) {}
}

struct Fixture {
    _temp: tempfile::TempDir,
    root: Utf8PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        Self { _temp: temp, root }
    }

    fn write(&self, name: &str, content: &str) -> Utf8PathBuf {
        let path = self.root.join(name);
        std::fs::write(path.as_std_path(), content).unwrap();
        path
    }

    fn options(&self, db: Utf8PathBuf, input: Utf8PathBuf) -> RunOptions {
        RunOptions {
            db_path: db,
            input_path: input,
            output_path: None,
            taxonomy_column: "Taxonomy".to_string(),
            dry_run: false,
        }
    }
}

#[test]
fn run_resolves_via_shortening_and_rescales() {
    // single-sample round trip: k__A;p__B;c__C shortens one level to the
    // reference entry at 2.0, divides 10 -> 5, rescales the column to 1.0
    let fixture = Fixture::new();
    let db = fixture.write("rrna_db.tsv", "k__Alpha;p__Beta\t2.0\n");
    let input = fixture.write(
        "counts.tsv",
        "Taxonomy\tS1\tOTU_ID\nk__Alpha;p__Beta;c__Gamma\t10\tOTU1\n",
    );

    let options = fixture.options(db, input);
    let result = App::new().run(&options, &NoopSink).unwrap();

    assert_eq!(result.taxa.shortened.len(), 1);
    assert_eq!(result.taxa.shortened[0].dropped, 1);
    assert!(result.taxa.unresolved.is_empty());
    assert!(result.zero_sum_columns.is_empty());

    let written = std::fs::read_to_string(
        Utf8PathBuf::from(result.output_path.unwrap()).as_std_path(),
    )
    .unwrap();
    assert_eq!(
        written,
        "Taxonomy\tS1\tOTU_ID\nk__Alpha;p__Beta;c__Gamma\t1\tOTU1\n"
    );
}

#[test]
fn run_reports_unresolved_taxa_and_uses_grand_average() {
    let fixture = Fixture::new();
    let db = fixture.write("rrna_db.tsv", "k__Alpha\t2.0\nk__Beta\t4.0\n");
    let input = fixture.write(
        "counts.tsv",
        "Taxonomy\tS1\tOTU_ID\nk__Gamma\t6\tOTU1\nk__Alpha\t6\tOTU2\n",
    );

    let options = fixture.options(db, input);
    let result = App::new().run(&options, &NoopSink).unwrap();

    assert_eq!(result.taxa.unresolved, vec!["k__Gamma"]);
    assert_eq!(result.taxa.exact, 1);

    // grand average is 3.0: unresolved row divides to 2, exact row to 3
    let written = std::fs::read_to_string(
        Utf8PathBuf::from(result.output_path.unwrap()).as_std_path(),
    )
    .unwrap();
    let mut lines = written.lines().skip(1);
    let first: Vec<&str> = lines.next().unwrap().split('\t').collect();
    let second: Vec<&str> = lines.next().unwrap().split('\t').collect();
    let first_value: f64 = first[1].parse().unwrap();
    let second_value: f64 = second[1].parse().unwrap();
    assert!((first_value - 0.4).abs() < 1e-12);
    assert!((second_value - 0.6).abs() < 1e-12);
}

#[test]
fn run_surfaces_duplicate_reference_keys() {
    let fixture = Fixture::new();
    let db = fixture.write(
        "rrna_db.tsv",
        "k__Alpha;p__Beta\t3.0\nk__Alpha;p__Beta\t5.0\n",
    );
    let input = fixture.write(
        "counts.tsv",
        "Taxonomy\tS1\tOTU_ID\nk__Alpha;p__Beta\t9\tOTU1\n",
    );

    let options = fixture.options(db, input);
    let result = App::new().run(&options, &NoopSink).unwrap();

    assert_eq!(result.reference.keys_added, 1);
    assert_eq!(result.reference.duplicate_instances, 1);
    assert_eq!(result.reference.duplicated_keys, 1);
    // first-seen 3.0 was used, not 5.0: 9 / 3 = 3, rescaled to 1
    let written = std::fs::read_to_string(
        Utf8PathBuf::from(result.output_path.unwrap()).as_std_path(),
    )
    .unwrap();
    assert!(written.contains("\t1\t"));
}

#[test]
fn run_aborts_on_unparseable_taxon_without_output() {
    let fixture = Fixture::new();
    let db = fixture.write("rrna_db.tsv", "k__Alpha\t2.0\n");
    let input = fixture.write(
        "counts.tsv",
        "Taxonomy\tS1\tOTU_ID\nUnassigned\t10\tOTU1\n",
    );

    let options = fixture.options(db, input);
    let err = App::new().run(&options, &NoopSink).unwrap_err();
    assert_matches!(err, NormError::UnparseableTaxon(_));
    assert!(!resolve_output_path(&options).as_std_path().exists());
}

#[test]
fn run_aborts_on_corrupt_reference_without_output() {
    let fixture = Fixture::new();
    let db = fixture.write("rrna_db.tsv", "k__Alpha\ttwo-and-a-bit\n");
    let input = fixture.write(
        "counts.tsv",
        "Taxonomy\tS1\tOTU_ID\nk__Alpha\t10\tOTU1\n",
    );

    let options = fixture.options(db, input);
    let err = App::new().run(&options, &NoopSink).unwrap_err();
    assert_matches!(err, NormError::DataCorruption { .. });
    assert!(!resolve_output_path(&options).as_std_path().exists());
}

#[test]
fn run_flags_zero_sum_columns() {
    let fixture = Fixture::new();
    let db = fixture.write("rrna_db.tsv", "k__Alpha\t2.0\n");
    let input = fixture.write(
        "counts.tsv",
        "Taxonomy\tS1\tS2\tOTU_ID\nk__Alpha\t0\t10\tOTU1\n",
    );

    let options = fixture.options(db, input);
    let result = App::new().run(&options, &NoopSink).unwrap();
    assert_eq!(result.zero_sum_columns, vec!["S1"]);
}

#[test]
fn run_dry_run_writes_nothing() {
    let fixture = Fixture::new();
    let db = fixture.write("rrna_db.tsv", "k__Alpha\t2.0\n");
    let input = fixture.write(
        "counts.tsv",
        "Taxonomy\tS1\tOTU_ID\nk__Alpha\t10\tOTU1\n",
    );

    let mut options = fixture.options(db, input);
    options.dry_run = true;
    let result = App::new().run(&options, &NoopSink).unwrap();
    assert!(result.output_path.is_none());
    assert!(!resolve_output_path(&options).as_std_path().exists());
}

#[test]
fn run_accepts_gzipped_reference() {
    let fixture = Fixture::new();
    let db = fixture.root.join("rrna_db.tsv.gz");
    let mut encoder = GzEncoder::new(
        std::fs::File::create(db.as_std_path()).unwrap(),
        Compression::default(),
    );
    encoder.write_all(b"k__Alpha\t2.0\n").unwrap();
    encoder.finish().unwrap();

    let input = fixture.write(
        "counts.tsv",
        "Taxonomy\tS1\tOTU_ID\nk__Alpha\t10\tOTU1\n",
    );

    let options = fixture.options(db, input);
    let result = App::new().run(&options, &NoopSink).unwrap();
    assert_eq!(result.reference.keys_added, 1);
    assert_eq!(result.taxa.exact, 1);
}

#[test]
fn run_preserves_row_and_column_order() {
    let fixture = Fixture::new();
    let db = fixture.write("rrna_db.tsv", "k__Alpha\t2.0\nk__Beta\t4.0\n");
    let input = fixture.write(
        "counts.tsv",
        "Taxonomy\tS2\tS1\tOTU_ID\nk__Beta\t4\t8\tOTU1\nk__Alpha\t2\t2\tOTU2\n",
    );

    let options = fixture.options(db, input);
    let result = App::new().run(&options, &NoopSink).unwrap();

    let written = std::fs::read_to_string(
        Utf8PathBuf::from(result.output_path.unwrap()).as_std_path(),
    )
    .unwrap();
    let mut lines = written.lines();
    assert_eq!(lines.next().unwrap(), "Taxonomy\tS2\tS1\tOTU_ID");
    assert!(lines.next().unwrap().starts_with("k__Beta\t"));
    assert!(lines.next().unwrap().starts_with("k__Alpha\t"));
}
