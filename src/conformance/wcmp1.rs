//! WCMP 1.3 Part 2 requirements

use super::{Outcome, Requirement, RequirementRegistry};
use crate::bundle::{Authority, SchemaHandle};
use crate::documents::{Family, XmlDocument};
use crate::environment::Environment;
use crate::error::{Fault, Result};
use crate::extract::wcmp1::{codelist_value, text_values, Wcmp1Fields};
use crate::namespaces::GML_NAMESPACE;
use std::collections::HashMap;

type Check = std::result::Result<Outcome, Fault>;

/// Prefix of every WCMP 1.3 requirement URI
pub const ID_PREFIX: &str = "http://wis.wmo.int/2012/metadata/conf/";

/// Identifier template for globally exchanged records
pub const GLOBAL_EXCHANGE_ID_PREFIX: &str = "urn:x-wmo:md:int.wmo.wis::";

const REQ_6_1_1: &str = "Requirement 6.1.1: Each WIS Discovery Metadata record shall validate without error against the XML schemas defined in ISO/TS 19139:2007.";
const REQ_6_1_2: &str = "Requirement 6.1.2: Each WIS Discovery Metadata record shall validate without error against the rule-based constraints listed in ISO/TS 19139:2007 Annex A (Table A.1).";
const REQ_6_2_1: &str = "Requirement 6.2.1: Each WIS Discovery Metadata record shall explicitly name all namespaces used within the record; use of default namespaces is prohibited.";
const REQ_6_3_1: &str = "Requirement 6.3.1: Each WIS Discovery Metadata record shall declare the following XML namespace for GML: http://www.opengis.net/gml/3.2.";
const REQ_8_1_1: &str = "Requirement 8.1.1: Each WIS Discovery Metadata record shall include one gmd:MD_Metadata/gmd:fileIdentifier attribute.";
const REQ_8_2_1: &str = "Requirement 8.2.1: Each WIS Discovery Metadata record shall include at least one keyword from the WMO_CategoryCode code list.";
const REQ_8_2_2: &str = "Requirement 8.2.2: Keywords from WMO_CategoryCode code list shall be defined as keyword type \"theme\".";
const REQ_8_2_3: &str = "Requirement 8.2.3: All keywords sourced from a particular keyword thesaurus shall be grouped into a single instance of the MD_Keywords class.";
const REQ_8_2_4: &str = "Requirement 8.2.4: Each WIS Discovery Metadata record describing geographic data shall include the description of at least one geographic bounding box defining the spatial extent of the data.";
const REQ_9_1_1: &str = "Requirement 9.1.1: A WIS Discovery Metadata record describing data for global exchange via the WIS shall indicate the scope of distribution using the keyword \"GlobalExchange\" of type \"dataCenter\" from thesaurus WMO_DistributionScopeCode.";
const REQ_9_2_1: &str = "Requirement 9.2.1: A WIS Discovery Metadata record describing data for global exchange via the WIS shall have a gmd:MD_Metadata/gmd:fileIdentifier attribute formatted as follows (where {uid} is a unique identifier derived from the GTS bulletin or file name): urn:x-wmo:md:int.wmo.wis::{uid}.";
const REQ_9_3_1: &str = "Requirement 9.3.1: A WIS Discovery Metadata record describing data for global exchange via the WIS shall indicate the WMO Data License as Legal Constraint (type: \"otherConstraints\") using one and only one term from the WMO_DataLicenseCode code list.";
const REQ_9_3_2: &str = "Requirement 9.3.2: A WIS Discovery Metadata record describing data for global exchange via the WIS shall indicate the GTS Priority as Legal Constraint (type: \"otherConstraints\") using one and only one term from the WMO_GTSProductCategoryCode code list.";

const NOT_GLOBAL: &str = "record is not for global exchange";

/// Requirement URI for a name
pub fn requirement_id(name: &str) -> String {
    format!("{}{}", ID_PREFIX, name)
}

/// The WCMP 1.3 requirements in declared order
pub fn registry() -> Result<RequirementRegistry<XmlDocument>> {
    RequirementRegistry::new(Family::Wcmp1)
        .with(Requirement::schema_validation(
            requirement_id("ISO-TS-19139-2007-xml-schema-validation"),
            "6.1.1",
            REQ_6_1_1,
            xml_schema_validation,
        ))?
        .with(Requirement::rule(
            requirement_id("ISO-TS-19139-2007-rule-based-validation"),
            "6.1.2",
            REQ_6_1_2,
            rule_based_validation,
        ))?
        .with(Requirement::rule(
            requirement_id("explicit-xml-namespace-identification"),
            "6.2.1",
            REQ_6_2_1,
            explicit_namespaces,
        ))?
        .with(Requirement::rule(
            requirement_id("gml-namespace-specification"),
            "6.3.1",
            REQ_6_3_1,
            gml_namespace,
        ))?
        .with(Requirement::rule(
            requirement_id("fileIdentifier-cardinality"),
            "8.1.1",
            REQ_8_1_1,
            file_identifier_cardinality,
        ))?
        .with(Requirement::rule(
            requirement_id("WMO_CategoryCode-keyword-cardinality"),
            "8.2.1",
            REQ_8_2_1,
            category_keyword_cardinality,
        ))?
        .with(Requirement::rule(
            requirement_id("WMO_CategoryCode-keyword-theme"),
            "8.2.2",
            REQ_8_2_2,
            category_keyword_theme,
        ))?
        .with(Requirement::rule(
            requirement_id("keyword-grouping"),
            "8.2.3",
            REQ_8_2_3,
            keyword_grouping,
        ))?
        .with(Requirement::rule(
            requirement_id("geographic-bounding-box"),
            "8.2.4",
            REQ_8_2_4,
            geographic_bounding_box,
        ))?
        .with(Requirement::rule(
            requirement_id("identification-of-globally-exchanged-data"),
            "9.1.1",
            REQ_9_1_1,
            global_exchange_identification,
        ))?
        .with(Requirement::rule(
            requirement_id("fileIdentifier-for-globally-exchanged-data"),
            "9.2.1",
            REQ_9_2_1,
            global_exchange_identifier,
        ))?
        .with(Requirement::rule(
            requirement_id("WMO-data-policy-for-globally-exchanged-data"),
            "9.3.1",
            REQ_9_3_1,
            global_exchange_data_policy,
        ))?
        .with(Requirement::rule(
            requirement_id("GTS-priority-for-globally-exchanged-data"),
            "9.3.2",
            REQ_9_3_2,
            global_exchange_gts_priority,
        ))
}

fn xml_schema_validation(doc: &XmlDocument, env: &Environment) -> Check {
    let Some(SchemaHandle::Xml(schema)) = env.schema() else {
        return Err(Fault::new("ISO/TS 19139 schema is not loaded"));
    };
    let errors = schema.validate(doc);
    if errors.is_empty() {
        return Ok(Outcome::skipped(
            "No namespace, declaration or simple value errors found; ISO/TS 19139:2007 content models are not evaluated",
        ));
    }
    Ok(Outcome::fail(format!("{} {}", REQ_6_1_1, errors.join("; "))))
}

fn rule_based_validation(_: &XmlDocument, _: &Environment) -> Check {
    Ok(Outcome::skipped(
        "ISO/TS 19139:2007 Annex A rule-based constraints are not evaluated",
    ))
}

fn explicit_namespaces(doc: &XmlDocument, _: &Environment) -> Check {
    let lines: Vec<u32> = doc
        .declarations
        .iter()
        .filter(|d| d.prefix.is_none())
        .map(|d| d.line)
        .collect();
    Ok(Outcome::check(lines.is_empty(), || {
        Outcome::fail_at(
            format!("{} Default namespace declared at lines {:?}.", REQ_6_2_1, lines),
            lines.clone(),
        )
    }))
}

fn gml_namespace(doc: &XmlDocument, _: &Environment) -> Check {
    let wrong: Vec<_> = doc
        .declarations
        .iter()
        .filter(|d| d.prefix.as_deref() == Some("gml") && d.uri != GML_NAMESPACE)
        .collect();
    Ok(Outcome::check(wrong.is_empty(), || {
        Outcome::fail_at(
            format!("{} Found {} at line {}.", REQ_6_3_1, wrong[0].uri, wrong[0].line),
            wrong.iter().map(|d| d.line),
        )
    }))
}

fn file_identifier_cardinality(doc: &XmlDocument, _: &Environment) -> Check {
    let ids = Wcmp1Fields::new(doc).file_identifiers()?;
    let lines: Vec<u32> = ids.iter().map(|e| e.line).collect();
    Ok(match lines.len() {
        0 => Outcome::fail(REQ_8_1_1),
        1 => Outcome::Pass,
        _ => Outcome::fail_at(
            format!("{} Multiple definitions found at lines {:?}.", REQ_8_1_1, lines),
            lines.clone(),
        ),
    })
}

fn category_keyword_cardinality(doc: &XmlDocument, env: &Environment) -> Check {
    let sets = Wcmp1Fields::new(doc).keyword_sets_for("WMO_CategoryCode")?;
    if sets.is_empty() {
        return Ok(Outcome::fail(REQ_8_2_1));
    }
    let categories = env.codelists().require(Authority::Wmo, "WMO_CategoryCode")?;

    let invalid: Vec<u32> = sets
        .iter()
        .filter(|set| !set.keyword_values().iter().any(|v| categories.contains(*v)))
        .map(|set| set.line())
        .collect();
    Ok(Outcome::check(invalid.len() < sets.len(), || {
        Outcome::fail_at(
            format!("{} Invalid keyword(s) found at line(s) {:?}.", REQ_8_2_1, invalid),
            invalid.clone(),
        )
    }))
}

fn category_keyword_theme(doc: &XmlDocument, _: &Environment) -> Check {
    let sets = Wcmp1Fields::new(doc).keyword_sets_for("WMO_CategoryCode")?;
    if sets.is_empty() {
        return Ok(Outcome::fail(REQ_8_2_2));
    }
    for set in &sets {
        for keyword_type in &set.types {
            if codelist_value(keyword_type) != Some("theme") {
                return Ok(Outcome::fail_at(
                    format!("{} Invalid keyword found at line {}.", REQ_8_2_2, keyword_type.line),
                    [keyword_type.line],
                ));
            }
        }
    }
    Ok(Outcome::Pass)
}

fn keyword_grouping(doc: &XmlDocument, _: &Environment) -> Check {
    let fields = Wcmp1Fields::new(doc);
    if fields.keyword_sets_for("WMO_CategoryCode")?.is_empty() {
        return Ok(Outcome::fail(REQ_8_2_3));
    }

    let mut first_seen: HashMap<&str, u32> = HashMap::new();
    let mut lines = Vec::new();
    for set in fields.keyword_sets()? {
        let Some(name) = set.thesaurus_names().into_iter().next() else {
            continue;
        };
        if let Some(first) = first_seen.insert(name, set.line()) {
            lines.extend([first, set.line()]);
        }
    }
    lines.sort_unstable();
    lines.dedup();
    Ok(Outcome::check(lines.is_empty(), || {
        Outcome::fail_at(
            format!("{} Thesaurus repeated in groups at lines {:?}.", REQ_8_2_3, lines),
            lines.clone(),
        )
    }))
}

fn geographic_bounding_box(doc: &XmlDocument, _: &Environment) -> Check {
    let fields = Wcmp1Fields::new(doc);
    if let Some(scope) = fields.scope_code()? {
        if codelist_value(scope) == Some("nonGeographicDataset") {
            return Ok(Outcome::skipped(format!(
                "Dataset defined as non-geographic at line {}",
                scope.line
            )));
        }
    }
    Ok(Outcome::check(!fields.bounding_boxes()?.is_empty(), || {
        Outcome::fail(REQ_8_2_4)
    }))
}

fn global_exchange_identification(doc: &XmlDocument, _: &Environment) -> Check {
    let fields = Wcmp1Fields::new(doc);
    if !fields.is_for_global_exchange()? {
        return Ok(Outcome::skipped(NOT_GLOBAL));
    }

    // untyped sets and records without distribution scope keywords pass
    for set in fields.keyword_sets_for("WMO_DistributionScopeCode")? {
        let values = set.keyword_values();
        for keyword_type in &set.types {
            if !matches!(codelist_value(keyword_type), Some("dataCentre" | "dataCenter")) {
                return Ok(Outcome::fail_at(
                    format!("{} Invalid keyword found at line {}.", REQ_9_1_1, keyword_type.line),
                    [keyword_type.line],
                ));
            }
            if !values.contains(&"GlobalExchange") {
                return Ok(Outcome::fail_at(
                    format!(
                        "{} Invalid keyword(s) ({:?}) found at line {}.",
                        REQ_9_1_1, values, keyword_type.line
                    ),
                    [keyword_type.line],
                ));
            }
        }
    }
    Ok(Outcome::Pass)
}

fn global_exchange_identifier(doc: &XmlDocument, _: &Environment) -> Check {
    let fields = Wcmp1Fields::new(doc);
    if !fields.is_for_global_exchange()? {
        return Ok(Outcome::skipped(NOT_GLOBAL));
    }
    Ok(match fields.identifier()? {
        None => Outcome::fail(format!("{} No identifier found.", REQ_9_2_1)),
        Some((id, _)) if id.starts_with(GLOBAL_EXCHANGE_ID_PREFIX) => Outcome::Pass,
        Some((id, line)) => Outcome::fail_at(
            format!("{} Invalid identifier ({}) found at line {}.", REQ_9_2_1, id, line),
            [line],
        ),
    })
}

fn global_exchange_data_policy(doc: &XmlDocument, env: &Environment) -> Check {
    one_constraint_from(doc, env, "WMO_DataLicenseCode", REQ_9_3_1)
}

fn global_exchange_gts_priority(doc: &XmlDocument, env: &Environment) -> Check {
    one_constraint_from(doc, env, "WMO_GTSProductCategoryCode", REQ_9_3_2)
}

/// Exactly one `otherConstraints` value from a WMO codelist
fn one_constraint_from(doc: &XmlDocument, env: &Environment, codelist: &str, requirement: &str) -> Check {
    let fields = Wcmp1Fields::new(doc);
    if !fields.is_for_global_exchange()? {
        return Ok(Outcome::skipped(NOT_GLOBAL));
    }
    let values = env.codelists().require(Authority::Wmo, codelist)?;

    let constraints = fields.other_constraints()?;
    let count = constraints
        .iter()
        .flat_map(|c| text_values(c))
        .filter_map(|v| v.value())
        .filter(|v| values.contains(*v))
        .count();
    if count == 1 {
        return Ok(Outcome::Pass);
    }
    if constraints.is_empty() {
        return Ok(Outcome::fail(requirement));
    }
    let lines: Vec<u32> = constraints.iter().map(|c| c.line).collect();
    Ok(Outcome::fail_at(
        format!("{} Please check constraints at lines {:?}.", requirement, lines),
        lines.clone(),
    ))
}
