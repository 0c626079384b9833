//! KPI report model, aggregation and grouping

use super::grading::{overall_grade, Grade};
use super::Category;
use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};

/// Decimal places kept in percentages
pub const PERCENTAGE_DECIMALS: u32 = 3;

/// `round(100 * score / total, 3)`, undefined when nothing was possible
pub fn percentage(score: u32, total: u32) -> Option<f64> {
    if total == 0 {
        return None;
    }
    let ratio = Decimal::from(score) * Decimal::ONE_HUNDRED / Decimal::from(total);
    ratio
        .round_dp_with_strategy(PERCENTAGE_DECIMALS, RoundingStrategy::MidpointNearestEven)
        .to_f64()
}

/// One evaluated KPI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiTest {
    /// KPI id, `kpi_001` style
    pub id: String,
    /// Human readable title
    pub title: String,
    /// Category the KPI is registered under
    pub category: Category,
    /// Points possible
    pub total: u32,
    /// Points earned, never negative
    pub score: u32,
    /// Why points were lost
    pub comments: Vec<String>,
    /// `score / total` as a percentage
    pub percentage: Option<f64>,
}

/// Aggregate over a set of tests
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    /// Sum of points possible
    pub total: u32,
    /// Sum of points earned
    pub score: u32,
    /// `score / total` as a percentage
    pub percentage: Option<f64>,
    /// Overall grade, only on a report-level summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<Grade>,
    /// Comments keyed by KPI id, tests without comments left out
    pub comments: IndexMap<String, Vec<String>>,
}

impl KpiSummary {
    /// Sum up tests; no grade is assigned
    pub fn of<'a>(tests: impl IntoIterator<Item = &'a KpiTest>) -> Self {
        let mut total = 0;
        let mut score = 0;
        let mut comments = IndexMap::new();
        for test in tests {
            total += test.total;
            score += test.score;
            if !test.comments.is_empty() {
                comments.insert(test.id.clone(), test.comments.clone());
            }
        }
        Self {
            total,
            score,
            percentage: percentage(score, total),
            grade: None,
            comments,
        }
    }

    /// Sum up tests and grade the result
    ///
    /// The grade is `U` when any mandatory test scored below 100 %.
    pub fn graded(tests: &[KpiTest]) -> Result<Self> {
        let mandatory_complete = tests
            .iter()
            .filter(|t| t.category == Category::Mandatory)
            .all(|t| t.percentage == Some(100.0));
        let mut summary = Self::of(tests);
        summary.grade = overall_grade(summary.percentage, mandatory_complete)?;
        Ok(summary)
    }
}

/// KPI results for one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiReport {
    /// `{metadata_id}:kpi:{timestamp}`
    pub id: String,
    /// Always `kpi`
    pub report_type: &'static str,
    /// Record identifier
    pub metadata_id: String,
    /// When the report was produced
    #[serde(serialize_with = "rfc3339")]
    pub datetime: DateTime<Utc>,
    /// Results in registry order
    pub tests: Vec<KpiTest>,
    /// Present when more than one KPI ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<KpiSummary>,
}

fn rfc3339<S: Serializer>(datetime: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&datetime.to_rfc3339_opts(SecondsFormat::Secs, true))
}

impl KpiReport {
    /// Assemble a report, summarizing when more than one test ran
    pub fn new(metadata_id: impl Into<String>, datetime: DateTime<Utc>, tests: Vec<KpiTest>) -> Result<Self> {
        let metadata_id = metadata_id.into();
        let summary = if tests.len() > 1 {
            Some(KpiSummary::graded(&tests)?)
        } else {
            None
        };
        Ok(Self {
            id: format!("{}:kpi:{}", metadata_id, datetime.format("%Y%m%dT%H%M%SZ")),
            report_type: "kpi",
            metadata_id,
            datetime,
            tests,
            summary,
        })
    }

    /// A test by KPI id
    pub fn test(&self, id: &str) -> Option<&KpiTest> {
        self.tests.iter().find(|t| t.id == id)
    }

    /// Points lost in the mandatory tests
    ///
    /// For a full run this is the number of compliance failures that count
    /// against the record.
    pub fn mandatory_shortfall(&self) -> Option<u32> {
        let mandatory: Vec<&KpiTest> = self
            .tests
            .iter()
            .filter(|t| t.category == Category::Mandatory)
            .collect();
        if mandatory.is_empty() {
            return None;
        }
        Some(mandatory.iter().map(|t| t.total - t.score.min(t.total)).sum())
    }
}

/// Tests of one category with their own summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiGroup {
    /// Tests in registry order
    pub tests: Vec<KpiTest>,
    /// Re-aggregated over the tests of this group
    pub summary: KpiSummary,
}

/// A KPI report partitioned by category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedReport {
    /// Groups in category order
    #[serde(flatten)]
    pub groups: IndexMap<Category, KpiGroup>,
    /// The report's overall summary, unchanged
    pub summary: KpiSummary,
}

/// Partition a full report by category
///
/// Categories with no tests are left out. A report without a summary (a
/// single selected KPI) cannot be grouped.
pub fn group(report: &KpiReport) -> Result<GroupedReport> {
    let summary = report
        .summary
        .clone()
        .ok_or_else(|| Error::Value("grouping needs a report with a summary".to_string()))?;

    let mut groups = IndexMap::new();
    for category in Category::ALL {
        let tests: Vec<KpiTest> = report
            .tests
            .iter()
            .filter(|t| t.category == category)
            .cloned()
            .collect();
        if tests.is_empty() {
            continue;
        }
        let summary = KpiSummary::of(&tests);
        groups.insert(category, KpiGroup { tests, summary });
    }
    Ok(GroupedReport { groups, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn test(id: &str, category: Category, total: u32, score: u32) -> KpiTest {
        KpiTest {
            id: id.to_string(),
            title: id.to_uppercase(),
            category,
            total,
            score,
            comments: if score < total {
                vec![format!("{} lost points", id)]
            } else {
                Vec::new()
            },
            percentage: percentage(score, total),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap()
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(0, 0), None);
        assert_eq!(percentage(1, 3), Some(33.333));
        assert_eq!(percentage(2, 3), Some(66.667));
        assert_eq!(percentage(5, 5), Some(100.0));
        assert_eq!(percentage(0, 7), Some(0.0));
    }

    #[test]
    fn test_summary_only_for_several_tests() {
        let single = KpiReport::new("x", now(), vec![test("kpi_002", Category::ContentInformation, 8, 6)]).unwrap();
        assert!(single.summary.is_none());
        assert_eq!(single.id, "x:kpi:20240301T123005Z");

        let report = KpiReport::new(
            "x",
            now(),
            vec![
                test("kpi_001", Category::Mandatory, 13, 13),
                test("kpi_002", Category::ContentInformation, 8, 6),
                test("kpi_005", Category::ContentInformation, 0, 0),
            ],
        )
        .unwrap();
        let summary = report.summary.as_ref().unwrap();
        assert_eq!(summary.total, 21);
        assert_eq!(summary.score, 19);
        assert_eq!(summary.percentage, Some(90.476));
        assert_eq!(summary.grade, Some(Grade::A));
        assert_eq!(summary.comments.keys().collect::<Vec<_>>(), vec!["kpi_002"]);
        assert_eq!(report.mandatory_shortfall(), Some(0));
    }

    #[test]
    fn test_mandatory_below_full_is_ungraded() {
        let report = KpiReport::new(
            "x",
            now(),
            vec![
                test("kpi_001", Category::Mandatory, 13, 12),
                test("kpi_002", Category::ContentInformation, 8, 8),
            ],
        )
        .unwrap();
        assert_eq!(report.summary.unwrap().grade, Some(Grade::U));
    }

    #[test]
    fn test_grouping() {
        let report = KpiReport::new(
            "x",
            now(),
            vec![
                test("kpi_001", Category::Mandatory, 13, 13),
                test("kpi_002", Category::ContentInformation, 8, 4),
                test("kpi_008", Category::Enhancements, 4, 2),
                test("kpi_009", Category::DistributionInformation, 5, 5),
            ],
        )
        .unwrap();
        let grouped = group(&report).unwrap();
        assert_eq!(
            grouped.groups.keys().copied().collect::<Vec<_>>(),
            vec![
                Category::Mandatory,
                Category::ContentInformation,
                Category::DistributionInformation,
                Category::Enhancements
            ]
        );
        let content = &grouped.groups[&Category::ContentInformation];
        assert_eq!(content.summary.percentage, Some(50.0));
        assert_eq!(content.summary.grade, None);
        assert_eq!(Some(&grouped.summary), report.summary.as_ref());

        let value = serde_json::to_value(&grouped).unwrap();
        assert!(value.get("enhancements").is_some());
        assert_eq!(value["summary"]["grade"], json!("A"));
    }

    #[test]
    fn test_grouping_needs_summary() {
        let report = KpiReport::new("x", now(), vec![test("kpi_001", Category::Mandatory, 1, 1)]).unwrap();
        assert!(matches!(group(&report), Err(Error::Value(_))));
    }

    #[test]
    fn test_serialization_shape() {
        let report = KpiReport::new("x", now(), vec![test("kpi_005", Category::ContentInformation, 0, 0)]).unwrap();
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "id": "x:kpi:20240301T123005Z",
                "report_type": "kpi",
                "metadata_id": "x",
                "datetime": "2024-03-01T12:30:05Z",
                "tests": [{
                    "id": "kpi_005",
                    "title": "KPI_005",
                    "category": "content_information",
                    "total": 0,
                    "score": 0,
                    "comments": [],
                    "percentage": null
                }]
            })
        );
    }
}
