//! Rebuilding the cache from the published sources

use super::{build_topics, layout, Bundle, Manifest};
use crate::error::Result;
use crate::limits::Limits;
use crate::loaders::Loader;
use crate::settings::Settings;
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::ZipArchive;

/// ISO/TS 19139:2007 schema bundle
pub const ISO_SCHEMA_ZIP_URL: &str = "https://wis.wmo.int/2011/schemata/iso19139_2007/19139.zip";

/// WMO codelist catalogue
pub const WMO_CODELISTS_URL: &str = "https://wis.wmo.int/2012/codelists/WMOCodeLists.xml";

/// Bundled WCMP 2 JSON Schema
pub const WCMP2_SCHEMA_URL: &str =
    "https://raw.githubusercontent.com/wmo-im/wcmp2/main/schemas/wcmp2-bundled.json";

/// WIS2 topic hierarchy repository archive
pub const TOPIC_HIERARCHY_ZIP_URL: &str =
    "https://github.com/wmo-im/wis2-topic-hierarchy/archive/refs/heads/main.zip";

/// English word list for spelling checks
pub const WORD_LIST_URL: &str =
    "https://raw.githubusercontent.com/dwyl/english-words/master/words_alpha.txt";

/// Archive entries holding the topic tables
const TOPIC_ARCHIVE_PREFIX: &str = "wis2-topic-hierarchy-main/topic-hierarchy";

/// Rebuild the configured cache from the network
pub fn sync(settings: &Settings) -> Result<Manifest> {
    let loader = Loader::from_settings(settings).with_limits(Limits {
        max_document_size: settings.limits().max_archive_size as usize,
        ..settings.limits().clone()
    });
    sync_from(
        &Bundle::from_settings(settings),
        |url| loader.fetch(url),
        settings.limits(),
    )
}

/// Rebuild a cache, fetching each source through `fetch`
///
/// The cache directory is removed first; nothing from a previous sync
/// survives.
pub fn sync_from<F>(bundle: &Bundle, fetch: F, limits: &Limits) -> Result<Manifest>
where
    F: Fn(&str) -> Result<Vec<u8>>,
{
    let root = bundle.root();
    if root.exists() {
        info!("Removing cache {}", root.display());
        fs::remove_dir_all(root)?;
    }

    info!("Caching ISO/TS 19139 schemas");
    let wcmp1_dir = bundle.path(layout::WCMP1_DIR);
    fs::create_dir_all(&wcmp1_dir)?;
    let archive = fetch(ISO_SCHEMA_ZIP_URL)?;
    extract_all(&archive, &wcmp1_dir, limits)?;

    info!("Caching WMO codelists");
    fs::write(bundle.path(layout::WMO_CODELISTS), fetch(WMO_CODELISTS_URL)?)?;

    debug!("Writing {}", layout::ISO_ALL_XSD);
    fs::write(bundle.path(layout::ISO_ALL_XSD), iso_all_xsd())?;

    info!("Caching WCMP2 schema");
    fs::create_dir_all(bundle.path(layout::WCMP2_DIR))?;
    fs::write(bundle.path(layout::WCMP2_SCHEMA), fetch(WCMP2_SCHEMA_URL)?)?;

    info!("Caching WIS2 topic hierarchy");
    let topics_dir = bundle.path(layout::TOPICS_DIR);
    fs::create_dir_all(&topics_dir)?;
    let archive = fetch(TOPIC_HIERARCHY_ZIP_URL)?;
    extract_flattened(&archive, TOPIC_ARCHIVE_PREFIX, &topics_dir, limits)?;
    let topics = build_topics(&topics_dir)?;
    topics.save(&bundle.path(layout::TOPICS_FILE))?;
    info!("Topic hierarchy has {} topics", topics.topics().len());

    info!("Caching spelling dictionary");
    fs::create_dir_all(bundle.path(layout::DICTIONARY_DIR))?;
    fs::write(bundle.path(layout::DICTIONARY), fetch(WORD_LIST_URL)?)?;

    let manifest = Manifest::now();
    bundle.write_manifest(&manifest)?;
    info!("Cache written to {}", root.display());
    Ok(manifest)
}

/// Wrapper schema importing the gmd and gmx namespaces
pub fn iso_all_xsd() -> String {
    let imports: String = ["gmd", "gmx"]
        .iter()
        .map(|uri| {
            format!(
                "  <xs:import namespace=\"http://www.isotc211.org/2005/{uri}\" schemaLocation=\"schema/{uri}/{uri}.xsd\"/>\n",
                uri = uri
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <xs:schema xmlns:xs=\"http://www.w3.org/2001/XMLSchema\" elementFormDefault=\"qualified\" version=\"1.0.0\">\n\
         {}</xs:schema>\n",
        imports
    )
}

fn open_archive<'a>(bytes: &'a [u8], limits: &Limits) -> Result<ZipArchive<Cursor<&'a [u8]>>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut uncompressed = 0u64;
    for i in 0..archive.len() {
        uncompressed += archive.by_index(i)?.size();
    }
    limits.check_archive(archive.len(), uncompressed)?;
    Ok(archive)
}

/// Unpack every entry below `dest`, keeping the archive's directories
fn extract_all(bytes: &[u8], dest: &Path, limits: &Limits) -> Result<()> {
    let mut archive = open_archive(bytes, limits)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            warn!("Skipping archive entry with unsafe path {}", entry.name());
            continue;
        };
        let target = dest.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        io::copy(&mut entry, &mut fs::File::create(&target)?)?;
    }
    Ok(())
}

/// Unpack the files of entries whose path contains `marker` into `dest`,
/// dropping their directories
fn extract_flattened(bytes: &[u8], marker: &str, dest: &Path, limits: &Limits) -> Result<()> {
    let mut archive = open_archive(bytes, limits)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() || !entry.name().contains(marker) {
            continue;
        }
        let Some(file_name) = entry
            .enclosed_name()
            .and_then(Path::file_name)
            .map(PathBuf::from)
        else {
            continue;
        };
        debug!("Extracting {}", entry.name());
        io::copy(&mut entry, &mut fs::File::create(dest.join(file_name))?)?;
    }
    Ok(())
}
