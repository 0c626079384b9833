//! Key Performance Indicators
//!
//! A KPI check scores one aspect of record quality. Unlike conformance
//! requirements, the points possible depend on the record: three per
//! temporal extent, two per unique link and so on. The runner sums
//! `(score, total)` pairs over exactly the checks that ran.
//!
//! ```ignore
//! let report = KpiRunner::new(&env, &probes).run(&document, None)?;
//! println!("{}", report.summary.unwrap().percentage.unwrap_or_default());
//! ```

pub mod grading;
pub mod report;
pub mod wcmp1;
pub mod wcmp2;

pub use grading::{grade, Grade};
pub use report::{group, percentage, GroupedReport, KpiGroup, KpiReport, KpiSummary, KpiTest};

use crate::documents::{Family, ParsedDocument};
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::probes::{
    acronym_count, all_alphanumeric, contains_markup, has_bulletin_header, is_title_case, Probes,
    Speller,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, warn};

/// Category a KPI reports under when grouped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Profile compliance
    Mandatory,
    /// Quality of the descriptive content
    ContentInformation,
    /// Data policy and distribution
    DistributionInformation,
    /// Links and codelists
    Enhancements,
}

impl Category {
    /// Every category in report order
    pub const ALL: [Category; 4] = [
        Category::Mandatory,
        Category::ContentInformation,
        Category::DistributionInformation,
        Category::Enhancements,
    ];

    /// Name used in grouped reports
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Mandatory => "mandatory",
            Category::ContentInformation => "content_information",
            Category::DistributionInformation => "distribution_information",
            Category::Enhancements => "enhancements",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Points and comments produced by one KPI check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KpiResult {
    /// Points possible
    pub total: u32,
    /// Points earned; a penalty may push this below zero
    pub score: i64,
    /// Why points were lost
    pub comments: Vec<String>,
}

impl KpiResult {
    /// An empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to the points possible
    pub fn possible(&mut self, points: u32) -> &mut Self {
        self.total += points;
        self
    }

    /// Add to the points earned
    pub fn earn(&mut self, points: i64) -> &mut Self {
        self.score += points;
        self
    }

    /// Record a comment
    pub fn comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.comments.push(comment.into());
        self
    }

    /// Earn a point already counted as possible when `holds`, otherwise
    /// record `comment`
    pub fn award(&mut self, holds: bool, comment: impl FnOnce() -> String) -> bool {
        if holds {
            self.score += 1;
        } else {
            self.comments.push(comment());
        }
        holds
    }

    /// A one-point sub-test: possible always, earned when `holds`
    pub fn test(&mut self, holds: bool, comment: impl FnOnce() -> String) -> bool {
        self.total += 1;
        self.award(holds, comment)
    }

    /// Earned points clamped to `0..=total`
    pub fn clamped_score(&self) -> u32 {
        self.score.clamp(0, i64::from(self.total)) as u32
    }
}

/// Points possible for a title
pub const TITLE_POINTS: u32 = 8;

/// Points possible per abstract
pub const ABSTRACT_POINTS: u32 = 4;

/// Score a title that is present
///
/// Eight sub-tests: present, at least 3 words, at most 150 characters,
/// alphanumeric words, title case, at most 3 acronyms, no bulletin header
/// and no spelling errors. A bulletin header costs a point. `subject` leads
/// every comment, e.g. `Line 12: title`.
pub fn score_title(result: &mut KpiResult, title: &str, subject: &str, speller: &dyn Speller) {
    debug!("Title is present");
    result.test(true, String::new);

    let words: Vec<&str> = title.split_whitespace().collect();
    result.test(words.len() >= 3, || format!("{} has less than 3 words", subject));
    result.test(title.chars().count() <= 150, || {
        format!("{} has more than 150 characters", subject)
    });
    result.test(all_alphanumeric(words.iter().copied()), || {
        format!("{} contains non-printable characters", subject)
    });
    result.test(is_title_case(title), || format!("{} is not title case", subject));
    result.test(acronym_count(title) <= 3, || {
        format!("{} has more than 3 acronyms", subject)
    });

    result.possible(1);
    if has_bulletin_header(title) {
        result.earn(-1).comment(format!("{} contains bulletin header", subject));
    } else {
        result.earn(1);
    }

    let unknown = speller.misspelled(title);
    result.test(unknown.is_empty(), || {
        format!("{} contains spelling errors {:?}", subject, unknown)
    });
}

/// Score an abstract or description
///
/// Four sub-tests: 16 to 2048 characters, no markup, no bulletin header
/// and no spelling errors. Comments read `{prefix}: ...`.
pub fn score_abstract(result: &mut KpiResult, text: &str, prefix: &str, speller: &dyn Speller) {
    let length = text.chars().count();
    result.test((16..=2048).contains(&length), || {
        format!("{}: is not between 16 and 2048 characters", prefix)
    });
    result.test(!contains_markup(text), || format!("{}: contains markup", prefix));
    result.test(!has_bulletin_header(text), || {
        format!("{}: contains bulletin header", prefix)
    });
    let unknown = speller.misspelled(text);
    result.test(unknown.is_empty(), || {
        format!("{}: contains spelling errors {:?}", prefix, unknown)
    });
}

/// What a KPI check sees while it runs
pub struct KpiContext<'a, D> {
    /// The record
    pub document: &'a D,
    /// Reference data
    pub env: &'a Environment,
    /// Link and text probes
    pub probes: &'a Probes,
    /// Clock the run is evaluated against
    pub now: DateTime<Utc>,
}

/// Check function of a KPI
pub type EvaluateKpi<D> = fn(&KpiContext<'_, D>) -> Result<KpiResult>;

/// A named KPI check
pub struct KpiCheck<D> {
    /// `kpi_001` style id
    pub id: String,
    /// Title such as `KPI-2: Good quality title`
    pub title: &'static str,
    /// Category for grouped reports
    pub category: Category,
    /// The check
    pub evaluate: EvaluateKpi<D>,
}

impl<D> KpiCheck<D> {
    /// Create a check numbered `number`
    pub fn new(number: u32, title: &'static str, category: Category, evaluate: EvaluateKpi<D>) -> Self {
        Self {
            id: kpi_id(number),
            title,
            category,
            evaluate,
        }
    }
}

impl<D> fmt::Debug for KpiCheck<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KpiCheck")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// `kpi_NNN` id for a KPI number
pub fn kpi_id(number: u32) -> String {
    format!("kpi_{:03}", number)
}

/// Normalize a KPI selector
///
/// Accepts `kpi_003`, `3` or `003`.
pub fn parse_selector(selector: &str) -> Result<String> {
    let trimmed = selector.trim();
    let digits = trimmed.strip_prefix("kpi_").unwrap_or(trimmed);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::UnknownCheck(selector.to_string()));
    }
    let number: u32 = digits
        .parse()
        .map_err(|_| Error::UnknownCheck(selector.to_string()))?;
    Ok(kpi_id(number))
}

/// Ordered KPI checks of one family
#[derive(Debug)]
pub struct KpiRegistry<D> {
    family: Family,
    checks: Vec<KpiCheck<D>>,
}

impl<D> KpiRegistry<D> {
    /// An empty registry
    pub fn new(family: Family) -> Self {
        Self {
            family,
            checks: Vec::new(),
        }
    }

    /// Append a check; ids must be unique
    pub fn register(&mut self, check: KpiCheck<D>) -> Result<()> {
        if self.get(&check.id).is_some() {
            return Err(Error::DuplicateCheck(check.id));
        }
        self.checks.push(check);
        Ok(())
    }

    /// Builder form of [`KpiRegistry::register`]
    pub fn with(mut self, check: KpiCheck<D>) -> Result<Self> {
        self.register(check)?;
        Ok(self)
    }

    /// Family the checks apply to
    pub fn family(&self) -> Family {
        self.family
    }

    /// A check by id
    pub fn get(&self, id: &str) -> Option<&KpiCheck<D>> {
        self.checks.iter().find(|c| c.id == id)
    }

    /// Checks in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = &KpiCheck<D>> {
        self.checks.iter()
    }

    /// Number of checks
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// The checks a selector picks: all of them, or exactly one
    pub fn select(&self, selector: Option<&str>) -> Result<Vec<&KpiCheck<D>>> {
        match selector {
            None => Ok(self.checks.iter().collect()),
            Some(selector) => {
                let id = parse_selector(selector)?;
                self.get(&id).map(|check| vec![check]).ok_or_else(|| {
                    let known: Vec<&str> = self.checks.iter().map(|c| c.id.as_str()).collect();
                    Error::UnknownCheck(format!("{} is not in {:?}", id, known))
                })
            }
        }
    }

    /// Evaluate the selected checks
    ///
    /// A check that fails with anything but [`Error::CacheMissing`] is
    /// reported with no points and a `fault:` comment; a missing cache
    /// aborts the run.
    pub fn run(&self, ctx: &KpiContext<'_, D>, selector: Option<&str>) -> Result<Vec<KpiTest>> {
        let checks = self.select(selector)?;
        info!(
            "Evaluating {} KPIs: {:?}",
            self.family,
            checks.iter().map(|c| c.id.as_str()).collect::<Vec<_>>()
        );
        checks.into_iter().map(|check| evaluate(check, ctx)).collect()
    }
}

fn evaluate<D>(check: &KpiCheck<D>, ctx: &KpiContext<'_, D>) -> Result<KpiTest> {
    info!("Running {}", check.title);
    let result = match panic::catch_unwind(AssertUnwindSafe(|| (check.evaluate)(ctx))) {
        Ok(Ok(result)) => result,
        Ok(Err(err @ Error::CacheMissing(_))) => return Err(err),
        Ok(Err(err)) => {
            warn!("{} raised a fault: {}", check.id, err);
            KpiResult {
                comments: vec![format!("fault: {}", err)],
                ..KpiResult::default()
            }
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!("{} panicked: {}", check.id, message);
            KpiResult {
                comments: vec![format!("fault: {}", message)],
                ..KpiResult::default()
            }
        }
    };
    if result.score < 0 {
        debug!("{} scored {}, clamping to 0", check.id, result.score);
    }
    let score = result.clamped_score();
    let percentage = report::percentage(score, result.total);
    debug!("{}: {} / {} = {:?}", check.id, score, result.total, percentage);
    Ok(KpiTest {
        id: check.id.clone(),
        title: check.title.to_string(),
        category: check.category,
        total: result.total,
        score,
        comments: result.comments,
        percentage,
    })
}

/// Evaluates KPIs for records of either family
pub struct KpiRunner<'a> {
    env: &'a Environment,
    probes: &'a Probes,
    now: Option<DateTime<Utc>>,
}

impl<'a> KpiRunner<'a> {
    /// Create a runner over reference data and probes
    pub fn new(env: &'a Environment, probes: &'a Probes) -> Self {
        Self {
            env,
            probes,
            now: None,
        }
    }

    /// Pin the clock, making reports reproducible
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Run every KPI of the record's family, or only the selected one
    pub fn run(&self, document: &ParsedDocument, selector: Option<&str>) -> Result<KpiReport> {
        let now = self.now.unwrap_or_else(Utc::now);
        let tests = match document {
            ParsedDocument::Xml(doc) => wcmp1::registry()?.run(&self.context(doc, now), selector)?,
            ParsedDocument::Json(record) => wcmp2::registry()?.run(&self.context(record, now), selector)?,
        };
        let metadata_id = document.record_id().unwrap_or_default();
        KpiReport::new(metadata_id, now, tests)
    }

    fn context<'d, D>(&self, document: &'d D, now: DateTime<Utc>) -> KpiContext<'d, D>
    where
        'a: 'd,
    {
        KpiContext {
            document,
            env: self.env,
            probes: self.probes,
            now,
        }
    }
}

impl fmt::Debug for KpiRunner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KpiRunner").field("now", &self.now).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::{LinkProbe, LinkStatus, WordList};

    struct Offline;

    impl LinkProbe for Offline {
        fn check(&self, url: &str) -> LinkStatus {
            LinkStatus::unreachable(url)
        }
    }

    fn full(_: &KpiContext<'_, u32>) -> Result<KpiResult> {
        let mut result = KpiResult::new();
        result.test(true, String::new);
        Ok(result)
    }

    fn penalized(_: &KpiContext<'_, u32>) -> Result<KpiResult> {
        let mut result = KpiResult::new();
        result.possible(2).earn(-1).comment("penalty");
        Ok(result)
    }

    fn faulty(_: &KpiContext<'_, u32>) -> Result<KpiResult> {
        Err(Error::Value("no title".to_string()))
    }

    fn uncached(_: &KpiContext<'_, u32>) -> Result<KpiResult> {
        Err(Error::cache_missing("Codelist wmo/X is not in the cache"))
    }

    fn registry() -> KpiRegistry<u32> {
        KpiRegistry::new(Family::Wcmp1)
            .with(KpiCheck::new(1, "KPI-1", Category::Mandatory, full))
            .and_then(|r| r.with(KpiCheck::new(2, "KPI-2", Category::ContentInformation, penalized)))
            .and_then(|r| r.with(KpiCheck::new(3, "KPI-3", Category::ContentInformation, faulty)))
            .unwrap()
    }

    #[test]
    fn test_parse_selector() {
        assert_eq!(parse_selector("kpi_003").unwrap(), "kpi_003");
        assert_eq!(parse_selector("3").unwrap(), "kpi_003");
        assert_eq!(parse_selector("003").unwrap(), "kpi_003");
        assert_eq!(parse_selector("11").unwrap(), "kpi_011");
        assert!(matches!(parse_selector("three"), Err(Error::UnknownCheck(_))));
        assert!(matches!(parse_selector("kpi_"), Err(Error::UnknownCheck(_))));
        assert!(matches!(parse_selector("-1"), Err(Error::UnknownCheck(_))));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = registry().with(KpiCheck::new(2, "again", Category::Enhancements, full));
        assert!(matches!(result, Err(Error::DuplicateCheck(id)) if id == "kpi_002"));
    }

    #[test]
    fn test_run_clamps_and_isolates_faults() {
        let env = Environment::new();
        let probes = Probes::new(Offline, WordList::default());
        let ctx = KpiContext {
            document: &0u32,
            env: &env,
            probes: &probes,
            now: Utc::now(),
        };
        let tests = registry().run(&ctx, None).unwrap();
        assert_eq!(tests.len(), 3);
        assert_eq!((tests[1].total, tests[1].score), (2, 0));
        assert_eq!(tests[1].percentage, Some(0.0));
        assert_eq!((tests[2].total, tests[2].score), (0, 0));
        assert_eq!(tests[2].percentage, None);
        assert_eq!(tests[2].comments, vec!["fault: value error: no title".to_string()]);

        let selected = registry().run(&ctx, Some("2")).unwrap();
        assert_eq!(selected.len(), 1);
        assert!(matches!(registry().run(&ctx, Some("9")), Err(Error::UnknownCheck(_))));
    }

    #[test]
    fn test_cache_missing_aborts() {
        let registry = KpiRegistry::new(Family::Wcmp1)
            .with(KpiCheck::new(1, "KPI-1", Category::Mandatory, uncached))
            .unwrap();
        let env = Environment::new();
        let probes = Probes::new(Offline, WordList::default());
        let ctx = KpiContext {
            document: &0u32,
            env: &env,
            probes: &probes,
            now: Utc::now(),
        };
        assert!(matches!(registry.run(&ctx, None), Err(Error::CacheMissing(_))));
    }

    #[test]
    fn test_clamped_score() {
        let mut result = KpiResult::new();
        result.possible(3).earn(5);
        assert_eq!(result.clamped_score(), 3);
        assert_eq!(Category::DistributionInformation.to_string(), "distribution_information");
    }
}
