//! WCMP 2 core requirements

use super::{Outcome, Requirement, RequirementRegistry, SourceLocation};
use crate::bundle::SchemaHandle;
use crate::documents::{Family, JsonRecord};
use crate::environment::Environment;
use crate::error::{Fault, Result};
use crate::extract::parse_timestamp;
use crate::extract::wcmp2::{TimeExtent, Wcmp2Fields};
use chrono::DateTime;
use serde_json::Value;

type Check = std::result::Result<Outcome, Fault>;

/// Prefix of every WCMP 2 requirement URI
pub const ID_PREFIX: &str = "http://www.wmo.int/spec/wcmp/2.0/req/conf/core/";

/// Conformance class every WCMP 2 record declares
pub const CONFORMANCE_CLASS: &str = "http://wis.wmo.int/spec/wcmp/2.0";

/// Identifier prefix
pub const IDENTIFIER_PREFIX: &str = "urn:x-wmo:md:";

/// Topic level listing the countries of WIS2 centres
const COUNTRY_LEVEL: &str = "origin/a/wis2";

/// Requirement URI for a name
pub fn requirement_id(name: &str) -> String {
    format!("{}{}", ID_PREFIX, name)
}

/// The WCMP 2 requirements in declared order
pub fn registry() -> Result<RequirementRegistry<JsonRecord>> {
    let rules: [(&'static str, &'static str, super::Evaluate<JsonRecord>); 12] = [
        ("identifier", "The record identifier is a valid WCMP 2 URN.", identifier),
        ("conformance", "The record declares the WCMP 2 conformance class.", conformance),
        ("type", "The record provides a non-empty properties.type.", record_type),
        ("extent_geospatial", "The record provides a GeoJSON geometry.", extent_geospatial),
        ("extent_temporal", "The record provides a valid temporal extent.", extent_temporal),
        ("title", "The record provides a title.", title),
        ("description", "The record provides a description.", description),
        ("topic_hierarchy", "The record's WIS2 topic is a valid topic.", topic_hierarchy),
        ("contacts", "The record names its point of contact and originator.", contacts),
        ("record_creation_date", "The record provides its creation date.", creation_date),
        ("data_policy", "The record provides a valid WMO data policy.", data_policy),
        ("links", "The record provides at least one canonical link.", links),
    ];

    let mut registry = RequirementRegistry::new(Family::Wcmp2)
        .with_schema_gate()
        .with(Requirement::schema_validation(
        requirement_id("validation"),
        "validation",
        "The record is valid against the authoritative WCMP 2 schema.",
        validation,
    ))?;
    for (name, description, evaluate) in rules {
        registry.register(Requirement::rule(requirement_id(name), name, description, evaluate))?;
    }
    Ok(registry)
}

fn validation(record: &JsonRecord, env: &Environment) -> Check {
    let Some(SchemaHandle::Json(schema)) = env.schema() else {
        return Err(Fault::new("WCMP2 schema is not loaded"));
    };
    let errors = schema.validate(&record.value);
    Ok(Outcome::check(errors.is_empty(), || {
        Outcome::fail(format!("Invalid document: {}", errors.join("; ")))
    }))
}

fn identifier(record: &JsonRecord, env: &Environment) -> Check {
    let Some(id) = Wcmp2Fields::new(record).id() else {
        return Ok(Outcome::fail("missing identifier"));
    };
    if id.matches(':').count() != 5 {
        return Ok(Outcome::fail("identifier does not have six ':' delimiters"));
    }
    if !id.starts_with(IDENTIFIER_PREFIX) {
        return Ok(Outcome::fail("bad prefix"));
    }

    let parts: Vec<&str> = id.split(':').collect();
    let (country, centre_id) = (parts[3], parts[4]);

    let countries = env.topics().list_children(Some(COUNTRY_LEVEL))?;
    if !countries.iter().any(|c| c == country) {
        return Ok(Outcome::fail(format!("Invalid country: {}", country)));
    }
    let country_topic = format!("{}/{}", COUNTRY_LEVEL, country);
    let centres = env
        .topics()
        .list_children(Some(country_topic.as_str()))
        .unwrap_or_default();
    if !centres.iter().any(|c| c == centre_id) {
        return Ok(Outcome::fail(format!("Invalid centre_id: {}", centre_id)));
    }

    Ok(Outcome::check(id.is_ascii(), || Outcome::fail("Bad characters in id")))
}

fn conformance(record: &JsonRecord, _: &Environment) -> Check {
    let declared = Wcmp2Fields::new(record).conforms_to();
    Ok(Outcome::check(declared.contains(&CONFORMANCE_CLASS), || {
        Outcome::fail(format!("Missing conformance class {}", CONFORMANCE_CLASS))
    }))
}

fn record_type(record: &JsonRecord, _: &Environment) -> Check {
    Ok(Outcome::check(Wcmp2Fields::new(record).record_type().is_some(), || {
        Outcome::fail("missing properties.type")
    }))
}

fn extent_geospatial(record: &JsonRecord, _: &Environment) -> Check {
    let geometry = match Wcmp2Fields::new(record).geometry() {
        None => return Ok(Outcome::fail("missing geometry")),
        Some(Value::Null) => return Ok(Outcome::fail("geometry is null")),
        Some(Value::Object(geometry)) => geometry,
        Some(_) => return Ok(Outcome::fail("geometry is not a GeoJSON object")),
    };
    Ok(match geometry.get("type").and_then(Value::as_str) {
        None => Outcome::fail("geometry has no type"),
        Some("GeometryCollection") => Outcome::check(
            geometry.get("geometries").map_or(false, Value::is_array),
            || Outcome::fail("GeometryCollection has no geometries"),
        ),
        Some(kind) => Outcome::check(
            geometry.get("coordinates").map_or(false, Value::is_array),
            || Outcome::fail(format!("{} geometry has no coordinates", kind)),
        ),
    })
}

fn extent_temporal(record: &JsonRecord, _: &Environment) -> Check {
    let fields = Wcmp2Fields::new(record);
    if !fields.has_time() {
        return Ok(Outcome::fail("missing properties.time"));
    }
    for (index, extent) in fields.time_extents().into_iter().enumerate() {
        let location = || vec![SourceLocation::path(format!("/properties/time/{}", index))];
        let problem = match extent {
            TimeExtent::Interval { begin, end } => {
                match (begin.map(|b| (b, parse_timestamp(b))), end.map(|e| (e, parse_timestamp(e)))) {
                    (Some((text, None)), _) | (_, Some((text, None))) => {
                        Some(format!("invalid time {}", text))
                    }
                    (Some((_, Some(b))), Some((_, Some(e)))) if b > e => {
                        Some("interval begins after it ends".to_string())
                    }
                    _ => None,
                }
            }
            TimeExtent::Instant(text) if parse_timestamp(text).is_none() => {
                Some(format!("invalid time {}", text))
            }
            TimeExtent::Instant(_) => None,
            TimeExtent::Unrecognized => Some("unrecognized temporal extent".to_string()),
        };
        if let Some(reason) = problem {
            return Ok(Outcome::Fail {
                reason,
                locations: location(),
            });
        }
    }
    Ok(Outcome::Pass)
}

fn title(record: &JsonRecord, _: &Environment) -> Check {
    Ok(Outcome::check(Wcmp2Fields::new(record).title().is_some(), || {
        Outcome::fail("missing title")
    }))
}

fn description(record: &JsonRecord, _: &Environment) -> Check {
    Ok(Outcome::check(Wcmp2Fields::new(record).description().is_some(), || {
        Outcome::fail("missing description")
    }))
}

fn topic_hierarchy(record: &JsonRecord, env: &Environment) -> Check {
    let Some(topic) = Wcmp2Fields::new(record).topic_hierarchy() else {
        return Ok(Outcome::skipped("record has no wmo:topicHierarchy"));
    };
    if !env.topics().validate(topic, false) {
        return Ok(Outcome::fail(format!("Invalid topic {}", topic)));
    }
    let levels: Vec<&str> = topic.splitn(4, '/').collect();
    if levels.len() < 4 {
        return Ok(Outcome::fail(format!(
            "Topic {} does not have enough components",
            topic
        )));
    }

    // channel, version and system prefixes are matched with their trailing slash
    let mut infrastructure = String::new();
    let mut outcome = Outcome::Pass;
    for level in &levels[..3] {
        infrastructure.push_str(level);
        infrastructure.push('/');
        if env.topics().validate(&infrastructure, false) {
            outcome = Outcome::fail(format!("Topic {} should not include levels 1-3", topic));
        }
    }
    Ok(outcome)
}

fn contacts(record: &JsonRecord, _: &Environment) -> Check {
    let contacts = Wcmp2Fields::new(record).contacts();
    if contacts.is_empty() {
        return Ok(Outcome::fail("missing contacts"));
    }
    for role in ["pointOfContact", "originator"] {
        if !contacts.iter().any(|c| c.roles.contains(&role)) {
            return Ok(Outcome::fail(format!("Missing role {}", role)));
        }
    }
    Ok(Outcome::Pass)
}

fn creation_date(record: &JsonRecord, _: &Environment) -> Check {
    Ok(match Wcmp2Fields::new(record).created() {
        None => Outcome::fail("missing properties.created"),
        Some(created) => Outcome::check(DateTime::parse_from_rfc3339(created).is_ok(), || {
            Outcome::fail(format!("Invalid creation date {}", created))
        }),
    })
}

fn data_policy(record: &JsonRecord, _: &Environment) -> Check {
    let policy = Wcmp2Fields::new(record).data_policy();
    let name = match policy {
        Some(Value::String(name)) => name.as_str(),
        Some(Value::Object(object)) => match object.get("name").and_then(Value::as_str) {
            Some(name) => name,
            None => return Ok(Outcome::fail("missing data policy name")),
        },
        _ => return Ok(Outcome::fail("missing wmo:dataPolicy")),
    };
    if !matches!(name, "core" | "recommended") {
        return Ok(Outcome::fail(format!("Invalid data policy {}", name)));
    }

    if let (Some(Value::Object(object)), "recommended") = (policy, name) {
        let Some(conditions) = object.get("additionalConditions").and_then(Value::as_array) else {
            return Ok(Outcome::fail("missing additionalConditions"));
        };
        if !conditions.iter().any(|c| c.get("name").is_some()) {
            return Ok(Outcome::fail("missing additionalConditions name"));
        }
        if let Some(index) = conditions
            .iter()
            .position(|c| c.get("name").is_none() && c.get("scheme").is_none())
        {
            return Ok(Outcome::Fail {
                reason: "missing additionalConditions name/scheme".to_string(),
                locations: vec![SourceLocation::path(format!(
                    "/properties/wmo:dataPolicy/additionalConditions/{}",
                    index
                ))],
            });
        }
    }
    Ok(Outcome::Pass)
}

fn links(record: &JsonRecord, _: &Environment) -> Check {
    let links = Wcmp2Fields::new(record).links();
    let missing: Vec<SourceLocation> = links
        .iter()
        .filter(|l| l.href.map_or(true, |h| h.trim().is_empty()))
        .map(|l| SourceLocation::path(format!("/links/{}", l.index)))
        .collect();
    if !missing.is_empty() {
        return Ok(Outcome::Fail {
            reason: format!("{} link(s) without href", missing.len()),
            locations: missing,
        });
    }
    Ok(Outcome::check(
        links.iter().any(|l| l.rel == Some("canonical")),
        || Outcome::fail("missing at least one canonical link"),
    ))
}
