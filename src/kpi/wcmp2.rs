//! WCMP 2 KPIs
//!
//! The WCMP 1.3 rubric applied to the JSON record's fields.

use super::{
    score_abstract, score_title, Category, KpiCheck, KpiContext, KpiRegistry, KpiResult,
    ABSTRACT_POINTS, TITLE_POINTS,
};
use crate::conformance::{self, Outcome, RunOptions};
use crate::documents::{Family, JsonRecord};
use crate::error::Result;
use crate::extract::parse_timestamp;
use crate::extract::wcmp2::{TimeExtent, Wcmp2Fields};
use indexmap::IndexSet;
use tracing::{debug, info};

type Ctx<'a> = KpiContext<'a, JsonRecord>;

/// The WCMP 2 KPIs in evaluation order
pub fn registry() -> Result<KpiRegistry<JsonRecord>> {
    KpiRegistry::new(Family::Wcmp2)
        .with(KpiCheck::new(1, "KPI-1: WCMP 2 compliance", Category::Mandatory, compliance))?
        .with(KpiCheck::new(2, "KPI-2: Good quality title", Category::ContentInformation, title))?
        .with(KpiCheck::new(
            3,
            "KPI-3: Good quality description",
            Category::ContentInformation,
            description,
        ))?
        .with(KpiCheck::new(4, "KPI-4: Temporal information", Category::ContentInformation, temporal))?
        .with(KpiCheck::new(5, "KPI-5: Themes", Category::ContentInformation, themes))?
        .with(KpiCheck::new(6, "KPI-6: Links health", Category::Enhancements, links_health))?
        .with(KpiCheck::new(7, "KPI-7: Contacts", Category::DistributionInformation, contacts))
}

/// One point per requirement, lost for each failure
fn compliance(ctx: &Ctx<'_>) -> Result<KpiResult> {
    let registry = conformance::wcmp2::registry()?;
    let options = RunOptions::default().with_fail_on_schema_validation(false);
    let results = registry.run(ctx.document, ctx.env, &options);

    let mut result = KpiResult::new();
    let total = registry.len() as u32;
    result.possible(total).earn(i64::from(total));
    for outcome in &results {
        if let Outcome::Fail { reason, .. } = &outcome.outcome {
            debug!("{} failed: {}", outcome.id, reason);
            result.earn(-1).comment(reason.clone());
        }
    }
    Ok(result)
}

fn title(ctx: &Ctx<'_>) -> Result<KpiResult> {
    let fields = Wcmp2Fields::new(ctx.document);
    let mut result = KpiResult::new();
    match fields.title() {
        Some(title) => score_title(&mut result, title, "title", ctx.probes.speller.as_ref()),
        None => {
            result.possible(TITLE_POINTS).comment("Title not found");
        }
    }
    Ok(result)
}

fn description(ctx: &Ctx<'_>) -> Result<KpiResult> {
    let fields = Wcmp2Fields::new(ctx.document);
    let mut result = KpiResult::new();
    match fields.description() {
        Some(text) => score_abstract(&mut result, text, "description", ctx.probes.speller.as_ref()),
        None => {
            result.possible(ABSTRACT_POINTS).comment("Description not found");
        }
    }
    Ok(result)
}

/// Three points per interval: present, begin defined, ordered
///
/// An open end counts as ordered. Instants score two: present and
/// parseable.
fn temporal(ctx: &Ctx<'_>) -> Result<KpiResult> {
    let fields = Wcmp2Fields::new(ctx.document);
    let mut result = KpiResult::new();

    let extents = fields.time_extents();
    if extents.is_empty() {
        result.possible(3).comment("Temporal information not found");
        return Ok(result);
    }
    for (index, extent) in extents.iter().enumerate() {
        match *extent {
            TimeExtent::Interval { begin, end } => {
                result.possible(3).earn(1);
                let Some(begin) = begin else {
                    result.comment(format!("time[{}]: begin time not found", index));
                    continue;
                };
                result.earn(1);
                let Some(from) = parse_timestamp(begin) else {
                    result.comment(format!("time[{}]: begin time has unknown format", index));
                    continue;
                };
                match end.map(|end| (end, parse_timestamp(end))) {
                    None => {
                        debug!("time[{}] is open ended", index);
                        result.earn(1);
                    }
                    Some((end, None)) => {
                        result.comment(format!(
                            "time[{}]: end time has unknown format ({})",
                            index, end
                        ));
                    }
                    Some((_, Some(to))) => {
                        result.award(from <= to, || {
                            format!("time[{}]: interval begins after it ends", index)
                        });
                    }
                }
            }
            TimeExtent::Instant(instant) => {
                result.possible(2).earn(1);
                result.award(parse_timestamp(instant).is_some(), || {
                    format!("time[{}]: {} has unknown format", index, instant)
                });
            }
            TimeExtent::Unrecognized => {
                result
                    .possible(3)
                    .earn(1)
                    .comment(format!("time[{}]: neither an interval nor an instant", index));
            }
        }
    }
    Ok(result)
}

fn themes(ctx: &Ctx<'_>) -> Result<KpiResult> {
    let fields = Wcmp2Fields::new(ctx.document);
    let themes = fields.themes();
    let mut result = KpiResult::new();

    result.test(themes.iter().any(|t| !t.concepts.is_empty()), || {
        "No theme concepts found".to_string()
    });
    result.test(themes.iter().all(|t| t.scheme.is_some()), || {
        "Not every theme has a scheme".to_string()
    });
    result.test(
        themes.iter().flat_map(|t| &t.concepts).all(Option::is_some),
        || "Not every concept has an id".to_string(),
    );
    Ok(result)
}

/// Two points per unique href: reachable, and reachable over verified HTTPS
fn links_health(ctx: &Ctx<'_>) -> Result<KpiResult> {
    let fields = Wcmp2Fields::new(ctx.document);
    let mut result = KpiResult::new();

    let links: IndexSet<&str> = fields.links().iter().filter_map(|l| l.href).collect();
    debug!("Found {} unique links", links.len());
    for link in links {
        result.possible(2);
        let status = ctx.probes.links.check(link);
        if !status.accessible {
            let message = format!("\"{}\" cannot be resolved!", link);
            info!("{}", message);
            result.comment(message);
            continue;
        }
        result.earn(1);
        if status.tls_verified {
            result.earn(1);
        }
    }
    Ok(result)
}

fn contacts(ctx: &Ctx<'_>) -> Result<KpiResult> {
    let fields = Wcmp2Fields::new(ctx.document);
    let contacts = fields.contacts();
    let mut result = KpiResult::new();

    result.test(
        contacts.iter().any(|c| c.roles.contains(&"pointOfContact")),
        || "No point of contact found".to_string(),
    );
    result.test(contacts.iter().any(|c| !c.emails.is_empty()), || {
        "No contact email found".to_string()
    });
    result.test(contacts.iter().any(|c| c.organization.is_some()), || {
        "No contact organization found".to_string()
    });
    Ok(result)
}
