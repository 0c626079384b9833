//! WCMP 2 field extractors
//!
//! Key access over the GeoJSON-shaped record. Missing or mistyped members
//! read as absent; the schema requirement is where shape problems surface.

use crate::documents::JsonRecord;
use serde_json::Value;

/// A temporal extent from `properties.time`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeExtent<'a> {
    /// `{"interval": [begin, end]}`, `..` or `null` marking an open end
    Interval {
        /// Start of the interval
        begin: Option<&'a str>,
        /// End of the interval
        end: Option<&'a str>,
    },
    /// `{"date": ..}` or `{"timestamp": ..}`
    Instant(&'a str),
    /// An object carrying neither form
    Unrecognized,
}

/// A contact from `properties.contacts` (or `properties.providers`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact<'a> {
    /// Person name
    pub name: Option<&'a str>,
    /// Organization name
    pub organization: Option<&'a str>,
    /// Email addresses
    pub emails: Vec<&'a str>,
    /// Role names
    pub roles: Vec<&'a str>,
}

/// An entry of the top-level `links` array
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Link<'a> {
    /// Link target
    pub href: Option<&'a str>,
    /// Relation type
    pub rel: Option<&'a str>,
    /// Media type
    pub media_type: Option<&'a str>,
    /// Position in the `links` array
    pub index: usize,
}

/// A theme from `properties.themes`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Theme<'a> {
    /// Concept scheme
    pub scheme: Option<&'a str>,
    /// Concept ids, `None` for a concept without one
    pub concepts: Vec<Option<&'a str>>,
}

/// Typed accessors over a WCMP 2 record
#[derive(Debug, Clone, Copy)]
pub struct Wcmp2Fields<'a> {
    record: &'a JsonRecord,
}

impl<'a> Wcmp2Fields<'a> {
    /// Create accessors for a record
    pub fn new(record: &'a JsonRecord) -> Self {
        Self { record }
    }

    /// The record
    pub fn record(&self) -> &'a JsonRecord {
        self.record
    }

    fn property_str(&self, key: &str) -> Option<&'a str> {
        self.record
            .property(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Top-level `id`
    pub fn id(&self) -> Option<&'a str> {
        self.record.value.get("id").and_then(Value::as_str)
    }

    /// Top-level `conformsTo` entries
    pub fn conforms_to(&self) -> Vec<&'a str> {
        self.record
            .value
            .get("conformsTo")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// `properties.type`
    pub fn record_type(&self) -> Option<&'a str> {
        self.property_str("type")
    }

    /// `properties.title`
    pub fn title(&self) -> Option<&'a str> {
        self.property_str("title")
    }

    /// `properties.description`
    pub fn description(&self) -> Option<&'a str> {
        self.property_str("description")
    }

    /// `properties.created`
    pub fn created(&self) -> Option<&'a str> {
        self.property_str("created")
    }

    /// `properties["wmo:topicHierarchy"]`
    pub fn topic_hierarchy(&self) -> Option<&'a str> {
        self.property_str("wmo:topicHierarchy")
    }

    /// `properties["wmo:dataPolicy"]`
    pub fn data_policy(&self) -> Option<&'a Value> {
        self.record.property("wmo:dataPolicy")
    }

    /// Top-level `geometry`
    pub fn geometry(&self) -> Option<&'a Value> {
        self.record.value.get("geometry")
    }

    /// Whether `properties` has a `time` member, `null` included
    pub fn has_time(&self) -> bool {
        self.record.properties().contains_key("time")
    }

    /// Temporal extents from `properties.time` (an object or array of objects)
    pub fn time_extents(&self) -> Vec<TimeExtent<'a>> {
        match self.record.property("time") {
            Some(value @ Value::Object(_)) => vec![time_extent(value)],
            Some(Value::Array(items)) => items
                .iter()
                .filter(|v| v.is_object())
                .map(time_extent)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Contacts, read from `contacts` and falling back to `providers`
    pub fn contacts(&self) -> Vec<Contact<'a>> {
        let list = self
            .record
            .property("contacts")
            .and_then(Value::as_array)
            .or_else(|| self.record.property("providers").and_then(Value::as_array));
        list.map(|items| items.iter().map(contact).collect())
            .unwrap_or_default()
    }

    /// Entries of the top-level `links` array
    pub fn links(&self) -> Vec<Link<'a>> {
        self.record
            .value
            .get("links")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .enumerate()
                    .map(|(index, link)| Link {
                        href: link.get("href").and_then(Value::as_str),
                        rel: link.get("rel").and_then(Value::as_str),
                        media_type: link.get("type").and_then(Value::as_str),
                        index,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Themes from `properties.themes`
    pub fn themes(&self) -> Vec<Theme<'a>> {
        self.record
            .property("themes")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|theme| Theme {
                        scheme: theme.get("scheme").and_then(Value::as_str),
                        concepts: theme
                            .get("concepts")
                            .and_then(Value::as_array)
                            .map(|concepts| {
                                concepts
                                    .iter()
                                    .map(|c| c.get("id").and_then(Value::as_str))
                                    .collect()
                            })
                            .unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn open_end(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "..")
}

fn time_extent(value: &Value) -> TimeExtent<'_> {
    if let Some(interval) = value.get("interval").and_then(Value::as_array) {
        return TimeExtent::Interval {
            begin: open_end(interval.first()),
            end: open_end(interval.get(1)),
        };
    }
    value
        .get("timestamp")
        .or_else(|| value.get("date"))
        .and_then(Value::as_str)
        .map(TimeExtent::Instant)
        .unwrap_or(TimeExtent::Unrecognized)
}

fn contact(value: &Value) -> Contact<'_> {
    let emails = value
        .get("emails")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|e| e.get("value").or(Some(e)).and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    // roles are plain strings, or objects with a `name`
    let roles = value
        .get("roles")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|r| r.as_str().or_else(|| r.get("name").and_then(Value::as_str)))
                .collect()
        })
        .unwrap_or_default();
    Contact {
        name: value.get("name").and_then(Value::as_str),
        organization: value.get("organization").and_then(Value::as_str),
        emails,
        roles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: Value) -> JsonRecord {
        JsonRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_basic_properties() {
        let rec = record(json!({
            "id": "urn:x-wmo:md:can:eccc-msc:radar",
            "conformsTo": ["http://wis.wmo.int/spec/wcmp/2/conf/core"],
            "properties": {"type": "dataset", "title": "  Radar  ", "description": ""}
        }));
        let fields = Wcmp2Fields::new(&rec);
        assert_eq!(fields.id(), Some("urn:x-wmo:md:can:eccc-msc:radar"));
        assert_eq!(fields.conforms_to().len(), 1);
        assert_eq!(fields.record_type(), Some("dataset"));
        assert_eq!(fields.title(), Some("Radar"));
        assert_eq!(fields.description(), None);
    }

    #[test]
    fn test_time_extents() {
        let rec = record(json!({"properties": {"time": {"interval": ["2020-01-01", ".."]}}}));
        let fields = Wcmp2Fields::new(&rec);
        assert!(fields.has_time());
        assert_eq!(
            fields.time_extents(),
            vec![TimeExtent::Interval {
                begin: Some("2020-01-01"),
                end: None
            }]
        );

        let rec = record(json!({"properties": {"time": null}}));
        let fields = Wcmp2Fields::new(&rec);
        assert!(fields.has_time());
        assert!(fields.time_extents().is_empty());
    }

    #[test]
    fn test_contacts_roles_both_forms() {
        let rec = record(json!({"properties": {"contacts": [
            {"organization": "ECCC", "roles": ["pointOfContact"], "emails": [{"value": "a@b.c"}]},
            {"name": "X", "roles": [{"name": "originator"}]}
        ]}}));
        let contacts = Wcmp2Fields::new(&rec).contacts();
        assert_eq!(contacts[0].roles, vec!["pointOfContact"]);
        assert_eq!(contacts[0].emails, vec!["a@b.c"]);
        assert_eq!(contacts[1].roles, vec!["originator"]);
    }

    #[test]
    fn test_links_and_themes() {
        let rec = record(json!({
            "properties": {"themes": [{"scheme": "s", "concepts": [{"id": "a"}, {"title": "b"}]}]},
            "links": [{"href": "https://example.org", "rel": "canonical", "type": "text/html"}]
        }));
        let fields = Wcmp2Fields::new(&rec);
        let links = fields.links();
        assert_eq!(links[0].rel, Some("canonical"));
        assert_eq!(links[0].media_type, Some("text/html"));
        let themes = fields.themes();
        assert_eq!(themes[0].concepts, vec![Some("a"), None]);
    }
}
