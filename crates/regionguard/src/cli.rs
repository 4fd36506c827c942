//! Command-line interface handling for the region daemon.
//!
//! Every option here overrides the matching configuration file setting.

use clap::{Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the region data directory
    pub data_dir: Option<PathBuf>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the index implementation
    pub index: Option<String>,
    /// Worlds to load; replaces the configured list when non-empty
    pub worlds: Vec<String>,
}

/// Builds the clap command.
pub fn command() -> Command {
    Command::new("regionguard")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Protected region index and flag resolution daemon")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("data-dir")
                .short('d')
                .long("data-dir")
                .value_name("DIR")
                .help("Directory holding one <world>.json file per world"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("index")
                .long("index")
                .value_name("KIND")
                .help("Region index implementation")
                .value_parser(["flat", "rtree", "chunk"]),
        )
        .arg(
            Arg::new("world")
                .short('w')
                .long("world")
                .value_name("NAME")
                .help("World to load (repeatable)")
                .action(ArgAction::Append),
        )
}

impl CliArgs {
    /// Parses the process arguments, exiting with usage on error.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config.toml")),
            data_dir: matches.get_one::<String>("data-dir").map(PathBuf::from),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            index: matches.get_one::<String>("index").cloned(),
            worlds: matches
                .get_many::<String>("world")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
        }
    }
}
