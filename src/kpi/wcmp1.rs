//! WCMP 1.3 KPIs

use super::{
    score_abstract, score_title, Category, KpiCheck, KpiContext, KpiRegistry, KpiResult,
    ABSTRACT_POINTS, TITLE_POINTS,
};
use crate::bundle::Authority;
use crate::conformance::{self, Outcome, RunOptions};
use crate::documents::{Family, XmlDocument};
use crate::error::Result;
use crate::extract::wcmp1::{
    codelist_value, parse_time_position, text_values, Wcmp1Fields, KEYWORD_SETS,
};
use crate::namespaces::{GML_NAMESPACE, XLINK_NAMESPACE};
use indexmap::IndexSet;
use tracing::{debug, info};

type Ctx<'a> = KpiContext<'a, XmlDocument>;

/// Requirements whose failure does not cost compliance points
const WAIVED_REQUIREMENTS: [&str; 3] = ["6.1.1", "6.1.2", "6.2.1"];

/// MIME types browsers display as images
pub const WEB_IMAGE_MIME_TYPES: [&str; 7] = [
    "image/apng",
    "image/avif",
    "image/gif",
    "image/jpeg",
    "image/png",
    "image/svg+xml",
    "image/webp",
];

const TITLE: &str = "gmd:identificationInfo//gmd:citation/gmd:CI_Citation/gmd:title/gco:CharacterString";
const ABSTRACT: &str = "gmd:identificationInfo//gmd:abstract/gco:CharacterString";
const TIME_PERIOD: &str = "gmd:identificationInfo//gmd:temporalElement/gmd:EX_TemporalExtent/gmd:extent/gml:TimePeriod";
const UPDATE_FREQUENCY: &str =
    "gmd:identificationInfo//gmd:resourceMaintenance//gmd:maintenanceAndUpdateFrequency";
const STATUS: &str = "gmd:identificationInfo//gmd:status";
const DOI_ANCHOR: &str = "gmd:identificationInfo//gmd:citation//gmd:identifier//gmd:code/gmx:Anchor";
const CITATION_CONSTRAINT: &str =
    "gmd:identificationInfo//gmd:resourceConstraints//gmd:otherConstraints/gco:CharacterString";
const GRAPHIC_OVERVIEW: &str = "gmd:identificationInfo/gmd:MD_DataIdentification/gmd:graphicOverview/gmd:MD_BrowseGraphic/gmd:fileName";
const LEGAL_CONSTRAINTS: &str = "gmd:identificationInfo//gmd:resourceConstraints/gmd:MD_LegalConstraints";
const ONLINE_LINKAGE: &str = "gmd:distributionInfo/gmd:MD_Distribution/gmd:transferOptions/gmd:MD_DigitalTransferOptions/gmd:onLine/gmd:CI_OnlineResource/gmd:linkage";
const FORMAT: &str = "//gmd:distributionInfo//gmd:distributionFormat/gmd:MD_Format";
const FORMAT_SPECIFICATION: &str =
    "//gmd:distributionInfo//gmd:distributionFormat/gmd:MD_Format//gmd:specification/gmx:Anchor";
const DISTRIBUTOR_ORGANISATION: &str =
    "//gmd:distributionInfo//gmd:MD_Distributor//gmd:organisationName/gco:CharacterString";
const DISTRIBUTOR_EMAIL: &str = "//gmd:distributionInfo//gmd:MD_Distributor//gmd:contactInfo//gmd:electronicMailAddress/gco:CharacterString";
const TRANSFER_OPTIONS: &str = "//gmd:distributionInfo//gmd:MD_DigitalTransferOptions//gmd:onLine//gmd:URL";

/// Where links are collected for the health check
const LINK_SOURCES: [&str; 4] = [
    "//gmd:URL",
    "//gmx:Anchor/@xlink:href",
    "//gmd:CI_DateTypeCode/@codeList",
    "//gmd:graphicOverview/gmd:MD_BrowseGraphic/gmd:fileName/gco:CharacterString",
];

/// Codelist-bearing elements, by the authority that defines their lists
const CODELIST_ELEMENTS: [(Authority, &str); 5] = [
    (Authority::Wmo, "//gmd:date/gmd:CI_Date/gmd:dateType/gmd:CI_DateTypeCode"),
    (Authority::Wmo, "//gmd:MD_Keywords/gmd:type/gmd:MD_KeywordTypeCode"),
    (Authority::Iso, "//gmd:CI_ResponsibleParty/gmd:role/gmd:CI_RoleCode"),
    (Authority::Iso, "//gmd:resourceConstraints//gmd:MD_RestrictionCode"),
    (Authority::Iso, "//gmd:scope//gmd:MD_ScopeCode"),
];

const TOPIC_CATEGORY: &str = "//gmd:topicCategory/gmd:MD_TopicCategoryCode";

/// Free-text values that earn a point when drawn from a WMO codelist
const WMO_VALUE_SOURCES: [&str; 2] = [
    "//gmd:resourceConstraints//gmd:otherConstraints",
    "//gmd:descriptiveKeywords/gmd:MD_Keywords/gmd:keyword",
];

const WMO_VALUE_CODELISTS: [&str; 3] = [
    "WMO_GTSProductCategoryCode",
    "WMO_CategoryCode",
    "WMO_DistributionScopeCode",
];

/// The WCMP 1.3 KPIs in evaluation order
pub fn registry() -> Result<KpiRegistry<XmlDocument>> {
    KpiRegistry::new(Family::Wcmp1)
        .with(KpiCheck::new(1, "KPI-1: WCMP 1.3, Part 2 Compliance", Category::Mandatory, compliance))?
        .with(KpiCheck::new(2, "KPI-2: Good quality title", Category::ContentInformation, title))?
        .with(KpiCheck::new(3, "KPI-3: Good quality abstract", Category::ContentInformation, abstracts))?
        .with(KpiCheck::new(4, "KPI-4: Temporal information", Category::ContentInformation, temporal))?
        .with(KpiCheck::new(5, "KPI-5: DOI citation", Category::ContentInformation, doi_citation))?
        .with(KpiCheck::new(6, "KPI-6: Keywords", Category::ContentInformation, keywords))?
        .with(KpiCheck::new(
            7,
            "KPI-7: Graphic overview for non bulletins metadata records",
            Category::ContentInformation,
            graphic_overview,
        ))?
        .with(KpiCheck::new(8, "KPI-8: Links health", Category::Enhancements, links_health))?
        .with(KpiCheck::new(9, "KPI-9: Data policy", Category::DistributionInformation, data_policy))?
        .with(KpiCheck::new(
            10,
            "KPI-10: Distribution information",
            Category::DistributionInformation,
            distribution,
        ))?
        .with(KpiCheck::new(11, "KPI-11: Codelists validation", Category::Enhancements, codelists))
}

/// One point per requirement, lost for each failure that is not waived
///
/// Every requirement is evaluated, schema failures included.
fn compliance(ctx: &Ctx<'_>) -> Result<KpiResult> {
    let registry = conformance::wcmp1::registry()?;
    let options = RunOptions::default().with_fail_on_schema_validation(false);
    let results = registry.run(ctx.document, ctx.env, &options);

    let mut result = KpiResult::new();
    let total = registry.len() as u32;
    result.possible(total).earn(i64::from(total));
    for (requirement, outcome) in registry.iter().zip(&results) {
        if let Outcome::Fail { reason, .. } = &outcome.outcome {
            if WAIVED_REQUIREMENTS.contains(&requirement.label) {
                debug!("Skipping failure of the requirement {}", requirement.label);
                continue;
            }
            result.earn(-1).comment(reason.clone());
        }
    }
    Ok(result)
}

fn title(ctx: &Ctx<'_>) -> Result<KpiResult> {
    let fields = Wcmp1Fields::new(ctx.document);
    let mut result = KpiResult::new();

    match fields.first(TITLE)? {
        Some(element) => {
            let title = element.text().map(str::trim).unwrap_or_default();
            let subject = format!("Line {}: title", element.line);
            score_title(&mut result, title, &subject, ctx.probes.speller.as_ref());
        }
        None => {
            result.possible(TITLE_POINTS).comment("Title not found");
        }
    }
    Ok(result)
}

fn abstracts(ctx: &Ctx<'_>) -> Result<KpiResult> {
    let fields = Wcmp1Fields::new(ctx.document);
    let mut result = KpiResult::new();

    for element in fields.elements(ABSTRACT)? {
        let line = element.line;
        match element.text().map(str::trim) {
            Some(text) => {
                let prefix = format!("Line {}", line);
                score_abstract(&mut result, text, &prefix, ctx.probes.speller.as_ref());
            }
            None => {
                result
                    .possible(ABSTRACT_POINTS)
                    .comment(format!("Abstract at line {}: is null", line));
            }
        }
    }
    Ok(result)
}

fn temporal(ctx: &Ctx<'_>) -> Result<KpiResult> {
    let fields = Wcmp1Fields::new(ctx.document);
    let mut result = KpiResult::new();

    let periods = fields.elements(TIME_PERIOD)?;
    if periods.is_empty() {
        result.possible(3).comment("Temporal information not found");
    } else if periods.len() > 1 {
        debug!("Temporal information - multiple ({}) elements found", periods.len());
    }
    for period in periods {
        result.possible(3).earn(1);
        let begin = period.child(GML_NAMESPACE, "beginPosition");
        let end = period.child(GML_NAMESPACE, "endPosition");
        let (begin, end) = match (begin, end) {
            (Some(begin), Some(end)) => (begin, end),
            (None, _) => {
                result.comment(format!(
                    "Line {}: Temporal information - begin time not found",
                    period.line
                ));
                continue;
            }
            (_, None) => {
                result.comment(format!(
                    "Line {}: Temporal information - end time not found",
                    period.line
                ));
                continue;
            }
        };
        result.earn(1);
        match (parse_time_position(begin, ctx.now), parse_time_position(end, ctx.now)) {
            (Some(from), Some(to)) => {
                result.award(from < to, || {
                    format!(
                        "Line {}-{}: Temporal information is invalid ({} < {} = False).",
                        begin.line, end.line, from, to
                    )
                });
            }
            (None, _) => {
                result.comment(format!(
                    "Line {}: Temporal information - begin time has unknown format",
                    begin.line
                ));
            }
            (_, None) => {
                result.comment(format!(
                    "Line {}: Temporal information - end time has unknown format",
                    end.line
                ));
            }
        }
    }

    let frequencies = fields.elements(UPDATE_FREQUENCY)?;
    result.test(!frequencies.is_empty(), || "Update frequency not found".to_string());
    if frequencies.len() > 1 {
        result.comment(format!(
            "Multiple ({}) update frequency elements found.",
            frequencies.len()
        ));
    }

    let statuses = fields.elements(STATUS)?;
    result.test(!statuses.is_empty(), || "Data status not found".to_string());
    if statuses.len() > 1 {
        debug!("Multiple ({}) data status elements found", statuses.len());
    }
    Ok(result)
}

/// Scored only when the record cites a DOI
fn doi_citation(ctx: &Ctx<'_>) -> Result<KpiResult> {
    let fields = Wcmp1Fields::new(ctx.document);
    let mut result = KpiResult::new();

    let Some(anchor) = fields.first(DOI_ANCHOR)? else {
        return Ok(result);
    };
    debug!("DOI anchor is present");
    result.possible(3).earn(1);

    result.award(anchor.get_attribute_ns(XLINK_NAMESPACE, "title") == Some("DOI"), || {
        format!("Line {}: DOI title is not equal to \"DOI\"", anchor.line)
    });

    let doi = anchor.text().map(str::trim).unwrap_or_default();
    let mut cited = false;
    for constraint in fields.elements(CITATION_CONSTRAINT)? {
        let Some(text) = constraint.text() else {
            continue;
        };
        if !text.contains("Cite as:") {
            continue;
        }
        if !doi.is_empty() && text.contains(doi) {
            cited = true;
        } else {
            result.comment(format!(
                "Line {}: citation should start with \"Cite as\" and have matching DOI",
                constraint.line
            ));
        }
    }
    result.award(cited, || "No \"Cite as:\" constraint quoting the DOI found".to_string());
    Ok(result)
}

fn keywords(ctx: &Ctx<'_>) -> Result<KpiResult> {
    let fields = Wcmp1Fields::new(ctx.document);
    let mut result = KpiResult::new();

    let any = fields.elements(&format!("{}/gmd:keyword", KEYWORD_SETS))?;
    debug!("Found {} keywords", any.len());
    result.test(!any.is_empty(), || "No keywords found".to_string());

    let mut count = 0usize;
    let mut anchors = 0usize;
    let mut typed = 0usize;
    let mut with_thesaurus = 0usize;
    for set in fields.keyword_sets()? {
        let keywords = set.keywords.len();
        count += keywords;
        if !set.types.is_empty() {
            typed += keywords;
        }
        if !set.thesauri.is_empty() {
            with_thesaurus += keywords;
        }
        for keyword in &set.keywords {
            if text_values(keyword).iter().all(|v| v.anchor) {
                anchors += 1;
            }
        }
    }
    debug!("Found {} anchor keywords out of {}", anchors, count);

    result.possible(3);
    result.award(anchors >= count, || {
        format!(
            "Found {} keywords that are not gmx:Anchor but a bare character string",
            count - anchors
        )
    });
    result.award(typed >= count, || {
        format!("Found {} keywords without type definition", count - typed)
    });
    result.award(with_thesaurus >= count, || {
        format!("Found {} keywords without thesaurus", count - with_thesaurus)
    });
    Ok(result)
}

/// Scored only when the record has a graphic overview
fn graphic_overview(ctx: &Ctx<'_>) -> Result<KpiResult> {
    let fields = Wcmp1Fields::new(ctx.document);
    let mut result = KpiResult::new();

    let Some(file_name) = fields.first(GRAPHIC_OVERVIEW)? else {
        return Ok(result);
    };
    debug!("Graphic overview is present");
    result.possible(3).earn(1);

    let values = text_values(file_name);
    let link = values
        .iter()
        .find(|v| v.anchor)
        .and_then(|v| v.href)
        .or_else(|| values.iter().find(|v| !v.anchor).and_then(|v| v.text))
        .unwrap_or_default();
    let status = ctx.probes.links.check(link);

    result.award(status.accessible, || {
        format!("Line {}: URL not accessible: {}", file_name.line, link)
    });
    let mime_type = status.mime_type.as_deref();
    result.award(
        mime_type.map_or(false, |m| WEB_IMAGE_MIME_TYPES.contains(&m)),
        || {
            format!(
                "Line {}: MIME type not a web image: {}",
                file_name.line,
                mime_type.unwrap_or("None")
            )
        },
    );
    Ok(result)
}

/// Unique links in discovery order
fn collect_links<'a>(fields: &Wcmp1Fields<'a>) -> Result<IndexSet<&'a str>> {
    let mut links = IndexSet::new();
    for source in LINK_SOURCES {
        let found = fields.values(source)?;
        debug!("Found {} links with {}", found.len(), source);
        links.extend(found);
    }
    Ok(links)
}

/// Two points per unique link: reachable, and reachable over verified HTTPS
fn links_health(ctx: &Ctx<'_>) -> Result<KpiResult> {
    let fields = Wcmp1Fields::new(ctx.document);
    let mut result = KpiResult::new();

    let links = collect_links(&fields)?;
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
        if let Some(resolved) = status.resolved.as_deref().filter(|r| *r != link) {
            debug!("\"{}\" resolves to \"{}\"", link, resolved);
        }
        if status.tls_verified {
            result.earn(1);
        }
    }
    Ok(result)
}

fn data_policy(ctx: &Ctx<'_>) -> Result<KpiResult> {
    let fields = Wcmp1Fields::new(ctx.document);
    let codelists = ctx.env.codelists();
    let license_codes = codelists.require(Authority::Wmo, "WMO_DataLicenseCode")?;
    let scope_codes = codelists.require(Authority::Wmo, "WMO_DistributionScopeCode")?;
    let category_codes = codelists.require(Authority::Wmo, "WMO_GTSProductCategoryCode")?;
    let mut result = KpiResult::new();

    debug!("Checking if data policy is a known value");
    result.possible(1);
    let constraint_values: Vec<_> = fields
        .elements(&format!("{}/gmd:otherConstraints", LEGAL_CONSTRAINTS))?
        .into_iter()
        .flat_map(text_values)
        .collect();
    let mut license_found = false;
    let mut license_anchor = false;
    let mut checked = Vec::new();
    for value in &constraint_values {
        let text = value.text.unwrap_or_default();
        if !license_codes.contains(text) {
            checked.push(text);
            continue;
        }
        debug!("Found {}", text);
        license_found = true;
        if value.anchor {
            license_anchor = true;
        } else {
            result.comment(format!(
                "Line {}: WMO_DataLicenseCode is not defined as an anchor",
                value.line
            ));
        }
    }
    result.award(license_found, || {
        format!("None of {:?} is a known WMO_DataLicenseCode value", checked)
    });

    result.possible(1);
    let mut other_restrictions = 0;
    for name in ["gmd:accessConstraints", "gmd:useConstraints"] {
        let path = format!("{}/{}/gmd:MD_RestrictionCode", LEGAL_CONSTRAINTS, name);
        let codes = fields.elements(&path)?;
        if codes.is_empty() {
            result.comment(format!("Legal constraint {} not found", name));
        }
        for code in codes {
            match codelist_value(code) {
                Some("otherRestrictions") => other_restrictions += 1,
                value => {
                    result.comment(format!(
                        "Line {}: Unexpected value at {}: {}",
                        code.line,
                        path,
                        value.unwrap_or_default()
                    ));
                }
            }
        }
    }
    if other_restrictions == 2 {
        result.earn(1);
    }

    debug!("Testing for definition of the distribution scope and product category");
    result.possible(3);
    let mut distribution_defined = false;
    let mut category_defined = false;
    let mut scope_anchor = false;
    let mut thesaurus_anchor = false;
    let mut essential_checked = false;

    for set in fields.keyword_sets()? {
        if set.types.len() > 1 {
            result.comment(format!(
                "Line {}: Ambiguous definition of keyword type ({:?})",
                set.types[0].line,
                set.type_values()
            ));
        } else if set.thesauri.len() > 1 {
            result.comment(format!(
                "Line {}: Ambiguous definition of thesaurus ({})",
                set.thesauri[0].line,
                set.thesauri.len()
            ));
        } else if set.types.is_empty() || set.thesauri.is_empty() {
            continue;
        }

        let titles = set.thesaurus_names();
        if titles.is_empty() {
            debug!("Unnamed thesaurus at line {}", set.thesauri[0].line);
            continue;
        }
        if titles.len() > 1 {
            result.comment(format!(
                "Line {}: Ambiguous definition of thesaurus title ({:?})",
                set.thesauri[0].line, titles
            ));
        }

        let Some(keyword_type) = codelist_value(set.types[0]) else {
            continue;
        };
        let known_type = codelists.contains(Authority::Wmo, "MD_KeywordTypeCode", keyword_type)
            || codelists.contains(Authority::Iso, "MD_KeywordTypeCode", keyword_type)
            || matches!(keyword_type, "dataCentre" | "dataCenter");
        if !known_type || !set.cites_thesaurus("WMO_DistributionScopeCode") {
            continue;
        }
        debug!("Found keyword type \"{}\" of WMO_DistributionScopeCode", keyword_type);
        if matches!(keyword_type, "dataCentre" | "dataCenter") {
            distribution_defined = true;
        }

        for keyword in &set.keywords {
            let Some(value) = text_values(keyword)
                .into_iter()
                .find(|v| v.text.map_or(false, |t| scope_codes.contains(t)))
            else {
                continue;
            };
            if matches!(value.text, Some("GlobalExchange" | "RegionalExchange")) {
                for constraint in constraint_values.iter().filter_map(|v| v.value()) {
                    if category_codes.contains(constraint) {
                        debug!("Found product category \"{}\"", constraint);
                        category_defined = true;
                    }
                    if constraint == "WMOEssential" && !essential_checked {
                        essential_checked = true;
                        let linkages = fields.elements(ONLINE_LINKAGE)?;
                        result.test(!linkages.is_empty(), || {
                            "Resource transferOption link not found for WMOEssential data".to_string()
                        });
                    }
                }
            }
            if value.anchor {
                scope_anchor = true;
            } else {
                result.comment(format!(
                    "Line {}: WMO_DistributionScopeCode is not defined as an anchor",
                    value.line
                ));
            }
        }

        if text_values(set.thesauri[0]).iter().any(|v| v.anchor) {
            thesaurus_anchor = true;
        } else {
            result.comment(format!(
                "Line {}: WMO_DistributionScopeCode thesaurus title is not defined as an anchor",
                set.thesauri[0].line
            ));
        }
    }

    result.award(distribution_defined, || {
        "No definition of the distribution scope found (keyword from WMO_DistributionScopeCode thesaurus)"
            .to_string()
    });
    result.award(category_defined, || {
        "No product category code defined for globally or regionally exchanged data (keyword from WMO_GTSProductCategoryCode code list)"
            .to_string()
    });
    result.award(license_anchor && scope_anchor && thesaurus_anchor, || {
        "Data policy codes are not all defined as anchors".to_string()
    });
    Ok(result)
}

fn distribution(ctx: &Ctx<'_>) -> Result<KpiResult> {
    let fields = Wcmp1Fields::new(ctx.document);
    let mut result = KpiResult::new();
    result.possible(5);

    debug!("Testing for distribution format");
    if fields.first(FORMAT)?.is_some() {
        result.earn(1);
        match fields.first(FORMAT_SPECIFICATION)? {
            Some(anchor) => {
                let link = anchor.get_attribute_ns(XLINK_NAMESPACE, "href").unwrap_or_default();
                let status = ctx.probes.links.check(link);
                result.award(status.accessible, || {
                    format!(
                        "Line {}: The format specification URL is not accessible: {}",
                        anchor.line, link
                    )
                });
            }
            None => {
                result.comment(format!("Format URL is missing (expected at {})", FORMAT_SPECIFICATION));
            }
        }
    } else {
        result.comment(format!("Distribution format not found (expected at {})", FORMAT));
    }

    result.award(!fields.values(DISTRIBUTOR_ORGANISATION)?.is_empty(), || {
        format!(
            "Distribution contact organization not found (expected at {})",
            DISTRIBUTOR_ORGANISATION
        )
    });
    result.award(!fields.values(DISTRIBUTOR_EMAIL)?.is_empty(), || {
        format!("Distribution contact email not found (expected at {})", DISTRIBUTOR_EMAIL)
    });
    let transfer_options = fields.elements(TRANSFER_OPTIONS)?;
    debug!("Transfer options found: {}", transfer_options.len());
    result.award(!transfer_options.is_empty(), || {
        format!("No transfer options found (expected at {})", TRANSFER_OPTIONS)
    });
    Ok(result)
}

fn codelists(ctx: &Ctx<'_>) -> Result<KpiResult> {
    let fields = Wcmp1Fields::new(ctx.document);
    let codelists = ctx.env.codelists();
    let mut result = KpiResult::new();

    for (authority, path) in CODELIST_ELEMENTS {
        debug!("Evaluating {}", path);
        for element in fields.elements(path)? {
            let value = codelist_value(element).unwrap_or_default();
            let Some(reference) = element.get_attribute("codeList") else {
                result.test(false, || {
                    format!("Line {}: Missing codeList attribute: '{}'", element.line, value)
                });
                continue;
            };
            let name = reference.rsplit('#').next().unwrap_or(reference);
            match codelists.get(authority, name) {
                Some(values) => {
                    result.test(values.contains(value), || {
                        format!(
                            "Line {}: Invalid codelist value: '{}' not in '{}'",
                            element.line, value, name
                        )
                    });
                }
                None => {
                    result.test(false, || {
                        format!(
                            "Line {}: Invalid code list reference: '{}' is not defined in '{}'",
                            element.line, name, authority
                        )
                    });
                }
            }
        }
    }

    let topic_categories = codelists.require(Authority::Iso, "MD_TopicCategoryCode")?;
    for element in fields.elements(TOPIC_CATEGORY)? {
        let value = codelist_value(element).unwrap_or_default();
        result.test(topic_categories.contains(value), || {
            format!(
                "Line {}: Invalid codelist value: {} not in MD_TopicCategoryCode",
                element.line, value
            )
        });
    }

    let mut known = Vec::with_capacity(WMO_VALUE_CODELISTS.len());
    for name in WMO_VALUE_CODELISTS {
        known.push(codelists.require(Authority::Wmo, name)?);
    }
    for source in WMO_VALUE_SOURCES {
        let values: Vec<_> = fields
            .elements(source)?
            .into_iter()
            .flat_map(text_values)
            .filter_map(|v| v.value())
            .collect();
        for value in values {
            if known.iter().any(|list| list.contains(value)) {
                result.possible(1).earn(1);
            }
        }
    }
    Ok(result)
}
