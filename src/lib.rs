//! # wcmp
//!
//! Conformance testing and quality scoring for WMO Core Metadata Profile
//! discovery metadata records.
//!
//! Two record families are supported:
//!
//! - WCMP 1.3: ISO 19139 XML (`gmd:MD_Metadata`)
//! - WCMP 2: GeoJSON-shaped JSON with a `properties` object
//!
//! ## Features
//!
//! - Abstract test suite: pass / fail / skipped per profile requirement
//! - Key Performance Indicators with percentages and an overall grade
//! - A local bundle of codelists, schemas, topics and a word list, synced
//!   from the WMO and WIS2 sources
//! - WIS2 topic hierarchy lookups
//! - Protection against oversized and deeply nested input
//!
//! ## Example
//!
//! ```rust,ignore
//! use wcmp::{documents, Bundle, Environment, KpiRunner, Probes, RunOptions};
//!
//! let document = documents::parse(&std::fs::read("record.xml")?)?;
//! let bundle = Bundle::new("~/.cache/wcmp");
//! let env = Environment::load(&bundle, document.family())?;
//!
//! let report = wcmp::run_conformance(&document, &env, &RunOptions::default())?;
//! println!("{} requirements failed", report.failed_count());
//!
//! let probes = Probes::new(wcmp::probes::HttpProbe::new(), bundle.load_dictionary()?);
//! let kpis = KpiRunner::new(&env, &probes).run(&document, None)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;
pub mod settings;

// Names and resources
pub mod namespaces;
pub mod locations;
pub mod loaders;

// Records
pub mod documents;
pub mod xpath;
pub mod extract;

// Reference data and external lookups
pub mod bundle;
pub mod environment;
pub mod probes;

// Evaluation
pub mod conformance;
pub mod kpi;

pub use bundle::{Bundle, Codelists, TopicHierarchy};
pub use conformance::{run_conformance, ConformanceReport, Outcome, RunOptions};
pub use documents::{Family, JsonRecord, ParsedDocument, XmlDocument};
pub use environment::Environment;
pub use error::{Error, Result};
pub use kpi::{Grade, KpiReport, KpiRunner};
pub use probes::Probes;
pub use settings::Settings;

/// Version of the wcmp library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
