//! Read-only collaborators handed to every check

use crate::bundle::{Bundle, Codelists, SchemaHandle, TopicHierarchy};
use crate::documents::Family;
use crate::error::Result;
use tracing::debug;

/// Reference data for one evaluation run
///
/// Built once before the run and never modified while checks execute.
#[derive(Debug, Default)]
pub struct Environment {
    codelists: Codelists,
    topics: TopicHierarchy,
    schema: Option<SchemaHandle>,
}

impl Environment {
    /// An environment with no reference data
    pub fn new() -> Self {
        Self::default()
    }

    /// Load what a family's checks need from the cache
    ///
    /// WCMP 1.3 needs the codelists and the ISO schema bundle; WCMP 2 needs
    /// the JSON Schema and the topic hierarchy.
    pub fn load(bundle: &Bundle, family: Family) -> Result<Self> {
        debug!("Loading {} environment from {}", family, bundle.root().display());
        let env = match family {
            Family::Wcmp1 => Self::new()
                .with_codelists(bundle.load_codelists()?)
                .with_schema(bundle.load_schema(family)?),
            Family::Wcmp2 => Self::new()
                .with_topics(bundle.load_topics()?)
                .with_schema(bundle.load_schema(family)?),
        };
        Ok(env)
    }

    /// Set the codelists
    pub fn with_codelists(mut self, codelists: Codelists) -> Self {
        self.codelists = codelists;
        self
    }

    /// Set the topic hierarchy
    pub fn with_topics(mut self, topics: TopicHierarchy) -> Self {
        self.topics = topics;
        self
    }

    /// Set the schema
    pub fn with_schema(mut self, schema: SchemaHandle) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Codelists
    pub fn codelists(&self) -> &Codelists {
        &self.codelists
    }

    /// Topic hierarchy
    pub fn topics(&self) -> &TopicHierarchy {
        &self.topics
    }

    /// Schema, when one was loaded
    pub fn schema(&self) -> Option<&SchemaHandle> {
        self.schema.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{Authority, XmlSchema};

    #[test]
    fn test_builder() {
        let env = Environment::new()
            .with_codelists(Codelists::new().with_list(Authority::Wmo, "WMO_CategoryCode", ["climatology"]))
            .with_topics(TopicHierarchy::from_topics(["origin"]))
            .with_schema(SchemaHandle::Xml(XmlSchema::default()));

        assert!(env.codelists().contains(Authority::Wmo, "WMO_CategoryCode", "climatology"));
        assert!(env.topics().validate("origin", false));
        assert_eq!(env.schema().map(SchemaHandle::family), Some(Family::Wcmp1));
    }

    #[test]
    fn test_load_without_cache() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = Environment::load(&Bundle::new(dir.path()), Family::Wcmp2);
        assert!(matches!(result, Err(crate::error::Error::CacheMissing(_))));
    }
}
