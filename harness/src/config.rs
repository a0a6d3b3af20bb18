//! Session configuration (§6 "Configuration (consumed as a struct)"),
//! loaded from YAML and merged with the CLI the way the teacher's
//! `ConfigOptions::new(file, cli)` merges `ConfigFileOptions` with
//! `CliOptions` (`main/core/support/configuration.rs`).

use crate::cli::CliOptions;
use catalog::{ErrorGroup, Function};
use protocol::{FunctionList, ListKind};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, #[source] source: serde_yaml::Error },
    #[error("testedProgram must not be empty")]
    EmptyProgram,
    #[error("unknown error group {0:?}")]
    UnknownGroup(String),
    #[error("{0:?} is named in the control list but is not a controllable function")]
    NotControllable(String),
    #[error("unknown function {0:?} named in {1} list")]
    UnknownFunction(String, &'static str),
    #[error("unsupported scheduler kind {0:?} (only \"bfs\" is implemented)")]
    UnsupportedScheduler(String),
    #[error("unsupported aggregator kind {0:?} (expected \"name\" or \"base_param\")")]
    UnsupportedAggregator(String),
    #[error("subroutine size must be >= 1, got {0}")]
    SubroutineSizeZero(usize),
    #[error("unsupported output kind {0:?} (expected \"dot\" or \"json\")")]
    UnsupportedOutput(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorKind {
    Name,
    BaseParam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Dot,
    Json,
}


/// Raw, on-disk shape of the config file. Field names match the YAML the
/// operator writes; everything gets validated and resolved into typed form
/// when building a [`Config`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileOptions {
    tested_program: Vec<String>,
    #[serde(default = "default_list")]
    notify: RawList,
    #[serde(default = "default_list")]
    control: RawList,
    #[serde(default)]
    variant_groups: Vec<String>,
    #[serde(default = "default_scheduler")]
    scheduler: String,
    #[serde(default = "default_aggregator")]
    aggregator: String,
    #[serde(default = "default_subroutine_size")]
    subroutine_size: usize,
    #[serde(default = "default_output_kind")]
    output_kind: String,
    output_path: String,
    shim_library_path: String,
    #[serde(default)]
    socket_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "UPPERCASE")]
enum RawList {
    All,
    None,
    Include { names: Vec<String> },
}

fn default_list() -> RawList {
    RawList::None
}
fn default_scheduler() -> String {
    "bfs".to_string()
}
fn default_aggregator() -> String {
    "name".to_string()
}
fn default_subroutine_size() -> usize {
    3
}
fn default_output_kind() -> String {
    "dot".to_string()
}

/// The fully validated, merged configuration the session driver consumes.
#[derive(Debug, Clone)]
pub struct Config {
    pub tested_program: Vec<String>,
    pub notify: FunctionList,
    pub control: FunctionList,
    pub variant_groups: Vec<ErrorGroup>,
    pub aggregator: AggregatorKind,
    pub subroutine_size: usize,
    pub output_kind: OutputKind,
    pub output_path: String,
    pub shim_library_path: String,
    pub socket_path: Option<String>,
    pub show_config: bool,
}

impl Config {
    pub fn load(cli: &CliOptions) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(&cli.config)
            .map_err(|source| ConfigError::Read { path: cli.config.clone(), source })?;
        let file: ConfigFileOptions = serde_yaml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: cli.config.clone(), source })?;
        Config::from_parts(file, cli)
    }

    fn from_parts(file: ConfigFileOptions, cli: &CliOptions) -> Result<Config, ConfigError> {
        if file.tested_program.is_empty() {
            return Err(ConfigError::EmptyProgram);
        }

        let notify = resolve_list(file.notify, "notify")?;
        let control = resolve_list(file.control, "control")?;
        if let ListKind::Include = control.kind {
            for name in &control.names {
                match Function::from_name(name) {
                    Some(f) if f.is_controllable() => {}
                    Some(_) => return Err(ConfigError::NotControllable(name.clone())),
                    None => return Err(ConfigError::UnknownFunction(name.clone(), "control")),
                }
            }
        }

        let mut variant_groups = Vec::with_capacity(file.variant_groups.len());
        for name in &file.variant_groups {
            let group = ErrorGroup::from_name(name).ok_or_else(|| ConfigError::UnknownGroup(name.clone()))?;
            variant_groups.push(group);
        }

        if file.scheduler != "bfs" {
            return Err(ConfigError::UnsupportedScheduler(file.scheduler));
        }

        let aggregator = match file.aggregator.as_str() {
            "name" => AggregatorKind::Name,
            "base_param" => AggregatorKind::BaseParam,
            other => return Err(ConfigError::UnsupportedAggregator(other.to_string())),
        };

        if file.subroutine_size == 0 {
            return Err(ConfigError::SubroutineSizeZero(file.subroutine_size));
        }

        let output_kind = match file.output_kind.as_str() {
            "dot" => OutputKind::Dot,
            "json" => OutputKind::Json,
            other => return Err(ConfigError::UnsupportedOutput(other.to_string())),
        };

        Ok(Config {
            tested_program: file.tested_program,
            notify,
            control,
            variant_groups,
            aggregator,
            subroutine_size: file.subroutine_size,
            output_kind,
            output_path: cli.output.clone().unwrap_or(file.output_path),
            shim_library_path: file.shim_library_path,
            socket_path: file.socket_path,
            show_config: cli.show_config,
        })
    }
}

fn resolve_list(raw: RawList, which: &'static str) -> Result<FunctionList, ConfigError> {
    match raw {
        RawList::All => Ok(FunctionList::all()),
        RawList::None => Ok(FunctionList::none()),
        RawList::Include { names } => {
            for name in &names {
                if Function::from_name(name).is_none() {
                    return Err(ConfigError::UnknownFunction(name.clone(), which));
                }
            }
            Ok(FunctionList::include(names))
        }
    }
}


impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "testedProgram: {:?}", self.tested_program)?;
        writeln!(f, "notify: {}", self.notify.kind.name())?;
        writeln!(f, "control: {}", self.control.kind.name())?;
        writeln!(f, "variantGroups: {:?}", self.variant_groups.iter().map(|g| g.name()).collect::<Vec<_>>())?;
        writeln!(f, "aggregator: {:?}", self.aggregator)?;
        writeln!(f, "subroutineSize: {}", self.subroutine_size)?;
        writeln!(f, "output: {:?} -> {}", self.output_kind, self.output_path)?;
        write!(f, "shimLibraryPath: {}", self.shim_library_path)
    }
}
