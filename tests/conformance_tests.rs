//! Conformance runs against the fixture records and bundle cache

use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;
use wcmp::conformance::{wcmp1, wcmp2};
use wcmp::documents::{self, Family, ParsedDocument};
use wcmp::{run_conformance, Bundle, ConformanceReport, Environment, Error, Outcome, RunOptions};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn load(name: &str) -> ParsedDocument {
    let content = fs::read(fixtures_dir().join("records").join(name)).unwrap();
    documents::parse(&content).unwrap()
}

fn validate(name: &str, options: &RunOptions) -> ConformanceReport {
    let document = load(name);
    let bundle = Bundle::new(fixtures_dir().join("cache"));
    let env = Environment::load(&bundle, document.family()).unwrap();
    run_conformance(&document, &env, options).unwrap()
}

#[test]
fn test_regional_wcmp1_record_is_conformant() {
    let report = validate("wcmp1-regional.xml", &RunOptions::default());
    assert_eq!(report.family, Family::Wcmp1);
    assert_eq!(
        report.record_id.as_deref(),
        Some("urn:x-wmo:md:ca.gc.ec.msc::surface-weather")
    );
    assert!(report.is_conformant(), "{:?}", report.failures().collect::<Vec<_>>());
    assert_eq!(report.results.len(), 13);
    // schema content models, rule-based validation and the four global
    // exchange requirements
    assert_eq!(report.skipped_count(), 6);
    assert_eq!(report.passed_count(), 7);
}

#[test]
fn test_global_wcmp1_record_failures() {
    let report = validate("wcmp1-global-invalid.xml", &RunOptions::default());
    let failed: Vec<&str> = report.failures().map(|r| r.id.as_str()).collect();
    for name in [
        "gml-namespace-specification",
        "WMO_CategoryCode-keyword-cardinality",
        "geographic-bounding-box",
        "fileIdentifier-for-globally-exchanged-data",
        "WMO-data-policy-for-globally-exchanged-data",
        "GTS-priority-for-globally-exchanged-data",
    ] {
        assert!(failed.contains(&wcmp1::requirement_id(name).as_str()), "{} should fail", name);
    }
    assert_eq!(
        report.outcome(&wcmp1::requirement_id("identification-of-globally-exchanged-data")),
        Some(&Outcome::Pass)
    );
    let gml = report
        .outcome(&wcmp1::requirement_id("gml-namespace-specification"))
        .unwrap();
    assert!(gml.reason().unwrap().contains("Found http://www.opengis.net/gml at line"));
}

#[test]
fn test_valid_wcmp2_record() {
    let report = validate("wcmp2-valid.json", &RunOptions::default());
    assert_eq!(report.family, Family::Wcmp2);
    assert!(report.is_conformant(), "{:?}", report.failures().collect::<Vec<_>>());
    assert_eq!(report.results.len(), 13);
    assert_eq!(report.results[0].id, wcmp2::requirement_id("validation"));
}

#[test]
fn test_schema_failure_gates_wcmp2_rules() {
    let gated = RunOptions::default().with_fail_on_schema_validation(true);
    let report = validate("wcmp2-invalid.json", &gated);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.skipped_count(), 12);
    assert!(report
        .outcome(&wcmp2::requirement_id("validation"))
        .unwrap()
        .is_fail());

    let report = validate("wcmp2-invalid.json", &RunOptions::default());
    assert!(report.failed_count() > 1);
    assert_eq!(
        report.outcome(&wcmp2::requirement_id("links")),
        Some(&Outcome::fail("missing at least one canonical link"))
    );
}

#[test]
fn test_report_serialization() {
    let report = validate("wcmp1-regional.xml", &RunOptions::default());
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["ets-report"].as_array().unwrap().len(), 13);
    assert_eq!(value["summary"]["FAILED"], 0);
    assert_eq!(value["summary"]["SKIPPED"], 6);
}

#[test]
fn test_wcmp1_schema_errors_do_not_skip_rules() {
    let gated = RunOptions::default().with_fail_on_schema_validation(true);
    for options in [RunOptions::default(), gated] {
        let report = validate("wcmp1-schema-invalid.xml", &options);
        let failed: Vec<&str> = report.failures().map(|r| r.id.as_str()).collect();
        let expected: Vec<String> = [
            "ISO-TS-19139-2007-xml-schema-validation",
            "fileIdentifier-cardinality",
            "WMO_CategoryCode-keyword-cardinality",
            "WMO_CategoryCode-keyword-theme",
            "keyword-grouping",
            "geographic-bounding-box",
        ]
        .iter()
        .map(|name| wcmp1::requirement_id(name))
        .collect();
        assert_eq!(failed, expected);
    }

    let report = validate("wcmp1-schema-invalid.xml", &RunOptions::default());
    let reason = report
        .outcome(&wcmp1::requirement_id("ISO-TS-19139-2007-xml-schema-validation"))
        .and_then(Outcome::reason)
        .unwrap();
    assert!(reason.contains("Line 4: element 'notAnIsoElement' is not declared"));
    assert!(reason.contains("Line 4: 'banana' is not a valid gco:Boolean"));
    assert!(reason.contains("Line 5: 'yesterday' is not a valid gco:DateTime"));
}

#[test]
fn test_clean_wcmp1_record_does_not_claim_schema_validity() {
    let report = validate("wcmp1-regional.xml", &RunOptions::default());
    let outcome = report
        .outcome(&wcmp1::requirement_id("ISO-TS-19139-2007-xml-schema-validation"))
        .unwrap();
    assert!(outcome.is_skipped());
    assert!(outcome.reason().unwrap().contains("content models are not evaluated"));
}

#[test]
fn test_unrecognized_document() {
    let content = fs::read(fixtures_dir().join("records").join("not-a-record.txt")).unwrap();
    assert!(matches!(documents::parse(&content), Err(Error::Parse(_))));
}

#[test]
fn test_missing_cache() {
    let dir = tempfile::tempdir().unwrap();
    let document = load("wcmp1-regional.xml");
    let result = Environment::load(&Bundle::new(dir.path()), document.family());
    assert!(matches!(result, Err(Error::CacheMissing(_))));
}
