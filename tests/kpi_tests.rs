//! KPI runs against the fixture records, with links answered offline

use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;
use wcmp::documents::{self, ParsedDocument};
use wcmp::kpi::{group, Category, KpiReport, KpiRunner};
use wcmp::probes::{LinkProbe, LinkStatus, Probes};
use wcmp::{Bundle, Environment, Error, Grade};

/// Every link resolves; only `https` ones count as verified
struct OfflineProbe;

impl LinkProbe for OfflineProbe {
    fn check(&self, url: &str) -> LinkStatus {
        LinkStatus {
            url: url.to_string(),
            resolved: Some(url.to_string()),
            accessible: true,
            tls_verified: url.starts_with("https://"),
            mime_type: Some("text/html".to_string()),
        }
    }
}

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn bundle() -> Bundle {
    Bundle::new(fixtures_dir().join("cache"))
}

fn load(name: &str) -> ParsedDocument {
    let content = fs::read(fixtures_dir().join("records").join(name)).unwrap();
    documents::parse(&content).unwrap()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn score(name: &str, selector: Option<&str>) -> KpiReport {
    let document = load(name);
    let env = Environment::load(&bundle(), document.family()).unwrap();
    let probes = Probes::new(OfflineProbe, bundle().load_dictionary().unwrap());
    KpiRunner::new(&env, &probes)
        .at(now())
        .run(&document, selector)
        .unwrap()
}

#[test]
fn test_wcmp1_full_run() {
    let report = score("wcmp1-regional.xml", None);
    assert_eq!(report.metadata_id, "urn:x-wmo:md:ca.gc.ec.msc::surface-weather");
    assert_eq!(report.id, "urn:x-wmo:md:ca.gc.ec.msc::surface-weather:kpi:20240601T120000Z");
    assert_eq!(report.tests.len(), 11);

    let compliance = report.test("kpi_001").unwrap();
    assert_eq!(compliance.category, Category::Mandatory);
    assert_eq!((compliance.total, compliance.score), (13, 13));
    assert_eq!(report.mandatory_shortfall(), Some(0));

    let title = report.test("kpi_002").unwrap();
    assert_eq!((title.total, title.score), (8, 8), "{:?}", title.comments);

    let summary = report.summary.as_ref().unwrap();
    assert_eq!(summary.total, report.tests.iter().map(|t| t.total).sum::<u32>());
    assert_eq!(summary.score, report.tests.iter().map(|t| t.score).sum::<u32>());
    assert!(summary.grade.is_some());
    assert_ne!(summary.grade, Some(Grade::U));
}

#[test]
fn test_pinned_clock_is_reproducible() {
    let first = serde_json::to_string(&score("wcmp1-regional.xml", None)).unwrap();
    let second = serde_json::to_string(&score("wcmp1-regional.xml", None)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_single_kpi_has_no_summary() {
    let report = score("wcmp1-regional.xml", Some("002"));
    assert_eq!(report.tests.len(), 1);
    assert_eq!(report.tests[0].id, "kpi_002");
    assert!(report.summary.is_none());
    assert_eq!(report.mandatory_shortfall(), None);
    assert!(matches!(group(&report), Err(Error::Value(_))));
}

#[test]
fn test_unknown_selector() {
    let document = load("wcmp2-valid.json");
    let env = Environment::load(&bundle(), document.family()).unwrap();
    let probes = Probes::new(OfflineProbe, bundle().load_dictionary().unwrap());
    let runner = KpiRunner::new(&env, &probes).at(now());
    assert!(matches!(runner.run(&document, Some("kpi_011")), Err(Error::UnknownCheck(_))));
    assert!(matches!(runner.run(&document, Some("title")), Err(Error::UnknownCheck(_))));
}

#[test]
fn test_grouped_report() {
    let report = score("wcmp1-regional.xml", None);
    let grouped = group(&report).unwrap();
    assert_eq!(grouped.groups.len(), 4);
    assert_eq!(grouped.groups[&Category::Mandatory].tests.len(), 1);
    assert_eq!(grouped.groups[&Category::ContentInformation].tests.len(), 6);
    assert_eq!(grouped.groups[&Category::DistributionInformation].tests.len(), 2);
    assert_eq!(grouped.groups[&Category::Enhancements].tests.len(), 2);
    assert_eq!(Some(&grouped.summary), report.summary.as_ref());

    let value = serde_json::to_value(&grouped).unwrap();
    assert!(value["content_information"]["summary"].get("grade").is_none());
    assert!(value["summary"].get("grade").is_some());
}

#[test]
fn test_wcmp2_full_run() {
    let report = score("wcmp2-valid.json", None);
    assert_eq!(report.tests.len(), 7);
    assert_eq!(report.mandatory_shortfall(), Some(0));

    let links = report.test("kpi_006").unwrap();
    // one https link and one mqtts broker
    assert_eq!((links.total, links.score), (4, 3));

    let contacts = report.test("kpi_007").unwrap();
    assert_eq!((contacts.total, contacts.score), (3, 3));
}

#[test]
fn test_wcmp2_compliance_failures_ungrade_the_record() {
    let report = score("wcmp2-invalid.json", None);
    let compliance = report.test("kpi_001").unwrap();
    assert!(compliance.score < compliance.total);
    assert_eq!(
        report.mandatory_shortfall(),
        Some(compliance.comments.len() as u32)
    );
    assert_eq!(report.summary.unwrap().grade, Some(Grade::U));
}

#[test]
fn test_missing_codelists_abort_the_run() {
    let document = load("wcmp1-regional.xml");
    let env = Environment::new();
    let probes = Probes::new(OfflineProbe, bundle().load_dictionary().unwrap());
    let result = KpiRunner::new(&env, &probes).at(now()).run(&document, None);
    assert!(matches!(result, Err(Error::CacheMissing(_))));
}
