mod common;

use assert_matches::assert_matches;

use kira_crispr_screens::app::App;
use kira_crispr_screens::domain::{Location, VocabularyKind};
use kira_crispr_screens::error::KiraError;
use kira_crispr_screens::matcher::ConditionMatch;
use kira_crispr_screens::screen::{ScreenFilter, ScreenRead};
use kira_crispr_screens::source::{DataSource, Fetched, LocalSource};
use kira_crispr_screens::table::Table;

use common::{Fixture, id, ids};

fn column(table: &Table, name: &str) -> Vec<String> {
    table
        .column_values(name)
        .unwrap()
        .map(|value| value.unwrap_or("<null>").to_string())
        .collect()
}

#[test]
fn missing_screen_file_reads_as_missing() {
    let fixture = Fixture::new();
    let app = fixture.app();

    let read = app.read_screen(&id("4"), &ScreenFilter::default()).unwrap();
    assert_eq!(read, ScreenRead::Missing);
    let read = app.read_screen(&id("999"), &ScreenFilter::genes(["TP53"])).unwrap();
    assert!(read.is_missing());
    assert!(read.into_table().is_empty());
}

#[test]
fn gene_query_returns_only_requested_symbols() {
    let fixture = Fixture::new();
    let app = fixture.app();

    let rows = app.results_by_genes(&["TP53"]).unwrap();
    assert_eq!(column(&rows, "OFFICIAL_SYMBOL"), ["TP53", "TP53", "TP53"]);
    assert_eq!(column(&rows, "SCREEN_ID"), ["1", "2", "3"]);
    assert_eq!(column(&rows, "CELL_LINE"), ["A549", "Calu-3", "HEK293T"]);

    let rows = app.results_by_genes(&["tp53"]).unwrap();
    assert!(rows.is_empty());
}

#[test]
fn enrichment_never_overwrites_screen_columns() {
    let fixture = Fixture::new();
    let app = fixture.app();

    let rows = app.results_by_genes(&["TP53", "KRAS"]).unwrap();
    assert_eq!(
        column(&rows, "NOTES"),
        ["screen note", "<null>", "index note 3", "index note 3"]
    );
    assert_eq!(
        column(&rows, "SIGNIFICANCE_CRITERIA"),
        ["FDR < 0.05", "<null>", "p < 0.01", "p < 0.01"]
    );
}

#[test]
fn empty_gene_list_is_malformed() {
    let fixture = Fixture::new();
    let app = fixture.app();

    let err = app.results_by_genes::<String>(&[]).unwrap_err();
    assert_matches!(err, KiraError::MalformedInput(_));
}

#[test]
fn screen_query_preserves_requested_order() {
    let fixture = Fixture::new();
    let app = fixture.app();

    let rows = app.results_by_screens(&ids(&["3", "1", "4", "2"])).unwrap();
    assert_eq!(column(&rows, "SCREEN_ID"), ["3", "3", "1", "1", "2", "2"]);
    assert_eq!(
        column(&rows, "OFFICIAL_SYMBOL"),
        ["KRAS", "TP53", "TP53", "BRCA1", "TP53", "ACE2"]
    );
}

#[test]
fn condition_exact_match_is_case_insensitive() {
    let fixture = Fixture::new();
    let app = fixture.app();

    let results = app.results_by_condition("influenza a").unwrap();
    assert_matches!(results.matched, ConditionMatch::Exact { .. });
    assert_eq!(results.matched.screens(), ids(&["1", "3"]).as_slice());
    assert_eq!(column(&results.rows, "SCREEN_ID"), ["1", "1", "3", "3"]);
}

#[test]
fn condition_fuzzy_match_and_no_match() {
    let fixture = Fixture::new();
    let app = fixture.app();

    let results = app.results_by_condition("Influenza").unwrap();
    assert_matches!(
        &results.matched,
        ConditionMatch::Approximate { value, .. } if value == "Influenza A"
    );
    assert_eq!(results.rows.len(), 4);

    let results = app.results_by_condition("Ebola").unwrap();
    assert_matches!(results.matched, ConditionMatch::NoMatch { .. });
    assert!(results.rows.is_empty());
}

#[test]
fn hits_are_rows_flagged_yes() {
    let fixture = Fixture::new();
    let app = fixture.app();

    let hits = app.hits(&id("1")).unwrap().into_table();
    assert_eq!(column(&hits, "OFFICIAL_SYMBOL"), ["TP53"]);

    let rows = app.gene_rows(&id("2"), "ACE2").unwrap().into_table();
    assert_eq!(column(&rows, "SCORE.1"), ["9.1"]);
}

#[test]
fn summary_orders_top_hits_and_explains() {
    let fixture = Fixture::new();
    let app = fixture.app();

    let summary = app.summarize_screen(&id("3")).unwrap().unwrap();
    assert_eq!(summary.num_hits, 2);
    assert_eq!(column(&summary.top_hits, "OFFICIAL_SYMBOL"), ["TP53", "KRAS"]);
    assert_eq!(
        summary.explanation,
        "Hits are defined by: p-value with criteria: p < 0.01. Score columns: [Z-score]"
    );
    assert_eq!(summary.metadata["CELL_LINE"], "HEK293T");

    assert!(app.summarize_screen(&id("4")).unwrap().is_none());
    assert_eq!(app.explain_significance(&id("999")), "No criteria found.");
}

#[test]
fn metadata_filter_summarizes_existing_screens() {
    let fixture = Fixture::new();
    let app = fixture.app();

    let summaries = app
        .screens_by_metadata(&[("ORGANISM_OFFICIAL".to_string(), "Homo sapiens".to_string())])
        .unwrap();
    let found = summaries
        .iter()
        .map(|summary| summary.screen_id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(found, ["1", "2", "3"]);

    let summaries = app
        .screens_by_metadata(&[("ORGANISM_OFFICIAL".to_string(), "Mus musculus".to_string())])
        .unwrap();
    assert!(summaries.is_empty());
}

#[test]
fn vocabularies_follow_index_order() {
    let fixture = Fixture::new();
    let app = fixture.app();

    assert_eq!(
        app.vocabulary(VocabularyKind::Conditions),
        ["Influenza A", "SARS-CoV-2", "Zika virus"]
    );
    assert_eq!(
        app.vocabulary(VocabularyKind::Organisms),
        ["Homo sapiens", "Mus musculus"]
    );
}

#[test]
fn missing_index_is_fatal() {
    let fixture = Fixture::new();
    std::fs::remove_file(fixture.root.join("index.tab.txt")).unwrap();

    let err = App::load(fixture.config(), LocalSource).err().unwrap();
    assert_matches!(err, KiraError::DataUnavailable { .. });
}

/// Fails every read of locations ending in `broken`; everything else goes to disk.
struct FlakySource {
    broken: String,
    remote: bool,
}

impl FlakySource {
    fn unreadable(broken: &str) -> Self {
        Self {
            broken: broken.to_string(),
            remote: false,
        }
    }

    fn unreachable(broken: &str) -> Self {
        Self {
            broken: broken.to_string(),
            remote: true,
        }
    }
}

impl DataSource for FlakySource {
    fn fetch(&self, location: &Location) -> Result<Fetched, KiraError> {
        if location.as_str().ends_with(&self.broken) {
            if self.remote {
                return Err(KiraError::RemoteHttp("connection refused".to_string()));
            }
            return Err(KiraError::unavailable(location, "permission denied"));
        }
        LocalSource.fetch(location)
    }
}

#[test]
fn unreadable_screen_is_skipped_in_aggregates() {
    let fixture = Fixture::new();
    let app = fixture.app_with(FlakySource::unreadable("TEST-SCREEN_2-0.0.0.screen.tab.txt"));

    let rows = app.results_by_screens(&ids(&["1", "2", "3"])).unwrap();
    assert_eq!(column(&rows, "SCREEN_ID"), ["1", "1", "3", "3"]);

    let rows = app.results_by_genes(&["TP53"]).unwrap();
    assert_eq!(column(&rows, "SCREEN_ID"), ["1", "3"]);

    let err = app.read_screen(&id("2"), &ScreenFilter::default()).unwrap_err();
    assert_matches!(err, KiraError::DataUnavailable { .. });
}

#[test]
fn remote_failures_surface_from_aggregates() {
    let fixture = Fixture::new();
    let app = fixture.app_with(FlakySource::unreachable(".screen.tab.txt"));

    let err = app.results_by_screens(&ids(&["1", "2"])).unwrap_err();
    assert_matches!(err, KiraError::RemoteHttp(_));

    let err = app.results_by_genes(&["TP53"]).unwrap_err();
    assert_matches!(err, KiraError::RemoteHttp(_));

    let err = app.results_by_condition("Influenza A").unwrap_err();
    assert_matches!(err, KiraError::RemoteHttp(_));

    let err = app
        .screens_by_metadata(&[("CELL_LINE".to_string(), "A549".to_string())])
        .unwrap_err();
    assert_matches!(err, KiraError::RemoteHttp(_));
}

#[test]
fn index_rows_with_odd_ids_do_not_block_loading() {
    let fixture = Fixture::new();
    let index = format!(
        "{}-\tEbola\tVero\tChlorocebus sabaeus\t-\t-\t-\t-\nORCS-9\tDengue\tHuh7\tHomo sapiens\t-\t-\t-\t-\n",
        common::INDEX
    );
    std::fs::write(fixture.root.join("index.tab.txt"), index).unwrap();

    let app = App::load(fixture.config(), LocalSource).unwrap();
    assert_eq!(app.index().len(), 5);
    assert!(!app.vocabulary(VocabularyKind::Conditions).contains(&"Ebola".to_string()));

    let read = app.read_screen(&id("ORCS-9"), &ScreenFilter::default()).unwrap();
    assert_matches!(read, ScreenRead::Missing);
}
