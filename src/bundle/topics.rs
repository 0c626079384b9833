//! WIS2 topic hierarchy
//!
//! The hierarchy is published as one CSV table per level. Each row names a
//! topic level (`Name`) and the table holding its children (`Child`);
//! `channel.csv` is the first level.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Table holding the first topic level
pub const ROOT_LEVEL: &str = "channel";

/// Guard against `Child` columns that loop back on themselves
const MAX_LEVELS: usize = 16;

#[derive(Debug, Deserialize)]
struct LevelRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Child", default)]
    child: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TopicsFile {
    topics: Vec<String>,
}

/// Flattened list of every valid topic path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicHierarchy {
    topics: Vec<String>,
}

impl TopicHierarchy {
    /// Create a hierarchy from topic paths
    pub fn from_topics<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topics: topics.into_iter().map(Into::into).collect(),
        }
    }

    /// Load the flattened list (`all.json`)
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::cache_missing(format!(
                "Topic hierarchy {} missing",
                path.display()
            )));
        }
        let file: TopicsFile = serde_json::from_str(&fs::read_to_string(path)?)?;
        Ok(Self::from_topics(file.topics))
    }

    /// Write the flattened list
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = TopicsFile {
            topics: self.topics.clone(),
        };
        fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    /// All topic paths
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Whether the topic is known, or with `fuzzy` a substring of a known topic
    pub fn validate(&self, topic: &str, fuzzy: bool) -> bool {
        debug!("Validating topic hierarchy {}", topic);
        if fuzzy {
            self.topics.iter().any(|t| t.contains(topic))
        } else {
            self.topics.iter().any(|t| t == topic)
        }
    }

    /// Distinct next-level names below `topic`, sorted
    ///
    /// Without a topic the first-level names are listed. An unknown topic,
    /// or one without children, is an error.
    pub fn list_children(&self, topic: Option<&str>) -> Result<Vec<String>> {
        let Some(topic) = topic else {
            let roots: BTreeSet<&str> = self
                .topics
                .iter()
                .filter_map(|t| t.split('/').next())
                .collect();
            return Ok(roots.into_iter().map(str::to_string).collect());
        };

        let trimmed = topic.strip_suffix('/').unwrap_or(topic);
        if !self.validate(trimmed, false) {
            return Err(Error::Value("Invalid topic".to_string()));
        }

        let prefix = format!("{}/", trimmed);
        let children: BTreeSet<&str> = self
            .topics
            .iter()
            .filter_map(|t| t.strip_prefix(prefix.as_str()))
            .filter_map(|rest| rest.split('/').next())
            .filter(|child| !child.is_empty())
            .collect();

        if children.is_empty() {
            return Err(Error::Value(format!("No matching topics for {}", topic)));
        }
        Ok(children.into_iter().map(str::to_string).collect())
    }
}

/// Build the flattened hierarchy from the per-level CSV tables in `dir`
///
/// A level table that does not exist is skipped with a warning.
pub fn build_topics(dir: &Path) -> Result<TopicHierarchy> {
    let mut topics = Vec::new();
    process_level(dir, ROOT_LEVEL, None, &mut topics, 0)?;
    Ok(TopicHierarchy::from_topics(topics))
}

fn process_level(
    dir: &Path,
    level: &str,
    parent: Option<&str>,
    topics: &mut Vec<String>,
    depth: usize,
) -> Result<()> {
    if depth >= MAX_LEVELS {
        return Err(Error::LimitExceeded(format!(
            "Topic hierarchy deeper than {} levels at {}",
            MAX_LEVELS, level
        )));
    }

    let level_file = dir.join(format!("{}.csv", level));
    if !level_file.exists() {
        warn!("Topic file {} does not exist", level_file.display());
        return Ok(());
    }
    debug!("Reading topic hierarchy file {}", level_file.display());

    let mut reader = csv::Reader::from_path(&level_file)?;
    for row in reader.deserialize() {
        let row: LevelRow = row?;
        let name = row.name.trim();
        if name.is_empty() {
            continue;
        }
        let path = match parent {
            Some(parent) => format!("{}/{}", parent, name),
            None => name.to_string(),
        };
        topics.push(path.clone());
        if let Some(child) = row.child.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            process_level(dir, child, Some(&path), topics, depth + 1)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn hierarchy() -> TopicHierarchy {
        TopicHierarchy::from_topics([
            "origin",
            "origin/a",
            "origin/a/wis2",
            "origin/a/wis2/can",
            "origin/a/wis2/can/eccc-msc",
            "origin/a/wis2/can/eccc-msc/data",
            "cache",
            "cache/a",
        ])
    }

    #[test]
    fn test_validate() {
        let th = hierarchy();
        assert!(th.validate("origin/a/wis2/can", false));
        assert!(!th.validate("wis2/can", false));
        assert!(th.validate("wis2/can", true));
    }

    #[test]
    fn test_list_children() {
        let th = hierarchy();
        assert_eq!(th.list_children(None).unwrap(), vec!["cache", "origin"]);
        assert_eq!(th.list_children(Some("origin/a/wis2/")).unwrap(), vec!["can"]);
        assert_eq!(
            th.list_children(Some("origin/a/wis2/can")).unwrap(),
            vec!["eccc-msc"]
        );
    }

    #[test]
    fn test_list_children_errors() {
        let th = hierarchy();
        let err = th.list_children(Some("nowhere")).unwrap_err();
        assert_eq!(err.to_string(), "value error: Invalid topic");
        let err = th.list_children(Some("cache/a")).unwrap_err();
        assert!(err.to_string().contains("No matching topics for cache/a"));
    }

    #[test]
    fn test_build_topics_from_tables() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("channel.csv"), "Name,Description,Child\norigin,Origin,version\ncache,Cache,version\n").unwrap();
        fs::write(dir.path().join("version.csv"), "Name,Description,Child\na,Version a,system\n").unwrap();

        let th = build_topics(dir.path()).unwrap();
        assert_eq!(
            th.topics(),
            &["origin", "origin/a", "cache", "cache/a"].map(String::from)
        );

        let path = dir.path().join("all.json");
        th.save(&path).unwrap();
        assert_eq!(TopicHierarchy::load(&path).unwrap(), th);
    }

    #[test]
    fn test_missing_list_is_cache_missing() {
        let dir = TempDir::new().unwrap();
        let result = TopicHierarchy::load(&dir.path().join("all.json"));
        assert!(matches!(result, Err(Error::CacheMissing(_))));
    }
}
