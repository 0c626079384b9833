//! Command-line interface for wcmp

#[cfg(feature = "cli")]
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

#[cfg(feature = "cli")]
use std::fs::File;
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};
#[cfg(feature = "cli")]
use std::sync::Mutex;

#[cfg(feature = "cli")]
use tracing_subscriber::EnvFilter;

#[cfg(feature = "cli")]
use wcmp::bundle::{self, Bundle};
#[cfg(feature = "cli")]
use wcmp::documents::{self, ParsedDocument};
#[cfg(feature = "cli")]
use wcmp::kpi::{self, KpiRunner};
#[cfg(feature = "cli")]
use wcmp::loaders::Loader;
#[cfg(feature = "cli")]
use wcmp::locations::Location;
#[cfg(feature = "cli")]
use wcmp::probes::{HttpProbe, Probes};
#[cfg(feature = "cli")]
use wcmp::{run_conformance, Environment, RunOptions, Settings};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "wcmp")]
#[command(author, version, about = "WMO Core Metadata Profile test suite and KPI scoring", long_about = None)]
struct Cli {
    /// Log level; logging is off unless this or --log is given
    #[arg(long, value_enum, global = true)]
    verbosity: Option<Verbosity>,

    /// Write log output to a file
    #[arg(long, value_name = "FILE", global = true)]
    log: Option<PathBuf>,

    /// Bundle cache directory (defaults to $WCMP_CACHE_DIR or ~/.wcmp)
    #[arg(long, value_name = "DIR", global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(ValueEnum, Clone, Copy, Debug)]
#[value(rename_all = "UPPER")]
enum Verbosity {
    Error,
    Warning,
    Info,
    Debug,
}

#[cfg(feature = "cli")]
impl Verbosity {
    fn directive(self) -> &'static str {
        match self {
            Verbosity::Error => "error",
            Verbosity::Warning => "warn",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
        }
    }
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Abstract test suite
    Ets {
        #[command(subcommand)]
        command: EtsCommand,
    },

    /// Key Performance Indicators
    Kpi {
        #[command(subcommand)]
        command: KpiCommand,
    },

    /// Codelist, schema and topic cache
    Bundle {
        #[command(subcommand)]
        command: BundleCommand,
    },

    /// WIS2 topic hierarchy
    Topics {
        #[command(subcommand)]
        command: TopicsCommand,
    },
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum EtsCommand {
    /// Validate a record against the abstract test suite
    Validate {
        /// Record file or URL
        #[arg(value_name = "FILE_OR_URL")]
        file: String,

        /// Stop evaluating after a schema validation failure
        #[arg(
            long = "fail-on-schema-validation",
            overrides_with = "no_fail_on_schema_validation",
            action = ArgAction::SetTrue
        )]
        fail_on_schema_validation: bool,

        /// Evaluate every requirement even when schema validation fails
        #[arg(
            long = "no-fail-on-schema-validation",
            overrides_with = "fail_on_schema_validation",
            action = ArgAction::SetTrue
        )]
        no_fail_on_schema_validation: bool,
    },
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum KpiCommand {
    /// Score a record
    Validate {
        /// Record file or URL
        #[arg(value_name = "FILE_OR_URL")]
        file: String,

        /// Run a single KPI (kpi_003, 3 or 003)
        #[arg(long, value_name = "N")]
        kpi: Option<String>,

        /// Print only the summary
        #[arg(long)]
        summary: bool,

        /// Group results by category
        #[arg(long, conflicts_with = "summary")]
        group: bool,
    },
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum BundleCommand {
    /// Download and rebuild the cache
    Sync,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum TopicsCommand {
    /// List the children of a topic (the root levels without one)
    List {
        #[arg(value_name = "TOPIC")]
        topic: Option<String>,
    },

    /// Check that a topic exists
    Validate {
        #[arg(value_name = "TOPIC")]
        topic: String,

        /// Accept any known topic containing TOPIC
        #[arg(long)]
        fuzzy: bool,
    },
}

#[cfg(feature = "cli")]
type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbosity, cli.log.as_deref()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let mut settings = Settings::from_env();
    if let Some(dir) = cli.cache_dir {
        settings = settings.with_cache_dir(dir);
    }

    let result = match cli.command {
        Commands::Ets {
            command:
                EtsCommand::Validate {
                    file,
                    fail_on_schema_validation: _,
                    no_fail_on_schema_validation,
                },
        } => cmd_ets_validate(&settings, &file, !no_fail_on_schema_validation),
        Commands::Kpi {
            command:
                KpiCommand::Validate {
                    file,
                    kpi,
                    summary,
                    group,
                },
        } => cmd_kpi_validate(&settings, &file, kpi.as_deref(), summary, group),
        Commands::Bundle {
            command: BundleCommand::Sync,
        } => cmd_bundle_sync(&settings),
        Commands::Topics { command } => cmd_topics(&settings, command),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "cli")]
fn init_logging(verbosity: Option<Verbosity>, log: Option<&Path>) -> CliResult<()> {
    if verbosity.is_none() && log.is_none() {
        return Ok(());
    }
    let filter = EnvFilter::new(verbosity.unwrap_or(Verbosity::Warning).directive());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log {
        Some(path) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(File::create(path)?))
            .init(),
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn load_record(settings: &Settings, file: &str) -> CliResult<ParsedDocument> {
    let location = Location::parse(file)?;
    let content = Loader::from_settings(settings).load_bytes(&location)?;
    Ok(documents::parse_with_limits(&content, settings.limits())?)
}

#[cfg(feature = "cli")]
fn print_json<T: serde::Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(feature = "cli")]
fn exit_code(count: usize) -> i32 {
    count.min(255) as i32
}

#[cfg(feature = "cli")]
fn cmd_ets_validate(settings: &Settings, file: &str, fail_on_schema_validation: bool) -> CliResult<i32> {
    let document = load_record(settings, file)?;
    let env = Environment::load(&Bundle::from_settings(settings), document.family())?;
    let options = RunOptions::default().with_fail_on_schema_validation(fail_on_schema_validation);

    let report = run_conformance(&document, &env, &options)?;
    print_json(&report)?;
    Ok(exit_code(report.failed_count()))
}

#[cfg(feature = "cli")]
fn cmd_kpi_validate(
    settings: &Settings,
    file: &str,
    selector: Option<&str>,
    summary: bool,
    group: bool,
) -> CliResult<i32> {
    let document = load_record(settings, file)?;
    let bundle = Bundle::from_settings(settings);
    let env = Environment::load(&bundle, document.family())?;
    let probes = Probes::new(HttpProbe::from_settings(settings), bundle.load_dictionary()?);

    let report = KpiRunner::new(&env, &probes).run(&document, selector)?;
    if group {
        print_json(&kpi::group(&report)?)?;
    } else if summary {
        match &report.summary {
            Some(summary) => print_json(summary)?,
            None => print_json(&report.tests)?,
        }
    } else {
        print_json(&report)?;
    }
    Ok(exit_code(report.mandatory_shortfall().unwrap_or(0) as usize))
}

#[cfg(feature = "cli")]
fn cmd_bundle_sync(settings: &Settings) -> CliResult<i32> {
    let manifest = bundle::sync(settings)?;
    println!(
        "Bundle cache {} synced at {}",
        settings.cache_dir().display(),
        manifest.synced_at
    );
    Ok(0)
}

#[cfg(feature = "cli")]
fn cmd_topics(settings: &Settings, command: TopicsCommand) -> CliResult<i32> {
    let topics = Bundle::from_settings(settings).load_topics()?;
    match command {
        TopicsCommand::List { topic } => {
            for child in topics.list_children(topic.as_deref())? {
                println!("{}", child);
            }
            Ok(0)
        }
        TopicsCommand::Validate { topic, fuzzy } => {
            if topics.validate(&topic, fuzzy) {
                println!("Valid");
                Ok(0)
            } else {
                println!("Invalid");
                Ok(1)
            }
        }
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
