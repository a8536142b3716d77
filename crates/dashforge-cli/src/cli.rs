//! Command-line surface: flags, subcommands and value resolution.
//!
//! Values are resolved in this order: command-line flag, environment
//! variable (`<APP>_<FLAG>`), configuration file, builder default.

use crate::config::FileConfig;
use crate::error::{AppError, AppResult};
use crate::runner::Runner;
use clap::builder::BoolishValueParser;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};
use dashforge_core::{CoreResult, Dashboard};
use dashforge_rules::{RecordingMap, ResourceMetadata};
use dashforge_telemetry::Metrics;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::{info, warn};

/// Server used when nothing else is configured.
pub const DEFAULT_SERVER: &str = "http://localhost:3000";

pub const DEFAULT_YAML_FILE: &str = "target.yml";

pub const DEFAULT_RULES_FILE: &str = "rules.yml";

/// Flags whose defaults can be overridden with [`CliBuilder::default_flag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CliFlag {
    Server,
    ApiKey,
    FolderName,
    Config,
    DebugQueries,
    MetricsFile,
    /// `to-yaml --file`.
    YamlFile,
    /// `rules --file`.
    RulesFile,
}

impl CliFlag {
    pub const ALL: [CliFlag; 8] = [
        CliFlag::Server,
        CliFlag::ApiKey,
        CliFlag::FolderName,
        CliFlag::Config,
        CliFlag::DebugQueries,
        CliFlag::MetricsFile,
        CliFlag::YamlFile,
        CliFlag::RulesFile,
    ];

    /// Long option name.
    pub fn long(self) -> &'static str {
        match self {
            CliFlag::Server => "server",
            CliFlag::ApiKey => "apikey",
            CliFlag::FolderName => "foldername",
            CliFlag::Config => "config",
            CliFlag::DebugQueries => "debug-queries",
            CliFlag::MetricsFile => "metrics-file",
            CliFlag::YamlFile | CliFlag::RulesFile => "file",
        }
    }

    /// Argument id, unique across subcommands.
    fn id(self) -> &'static str {
        match self {
            CliFlag::YamlFile => "yaml-file",
            CliFlag::RulesFile => "rules-file",
            other => other.long(),
        }
    }

    /// Environment variable read for this flag.
    pub fn env_var(self, app_name: &str) -> String {
        env_var_name(app_name, self.id())
    }
}

/// `<APP>_<FLAG>`, upper-cased, with every non-alphanumeric replaced by `_`.
pub fn env_var_name(app_name: &str, flag: &str) -> String {
    format!("{}_{}", shout(app_name), shout(flag))
}

fn shout(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn parse_label(raw: &str) -> AppResult<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(AppError::Config(format!(
            "invalid label '{raw}', expected KEY=VALUE"
        ))),
    }
}

type BuildFn = Box<dyn FnOnce(&mut RecordingMap) -> CoreResult<Dashboard>>;

enum DashboardSource {
    Ready(Dashboard),
    /// Built after argument parsing, so the recording map knows the debug flag.
    Build(BuildFn),
}

/// Configures a [`Cli`].
pub struct CliBuilder {
    app_name: String,
    about: Option<String>,
    dashboard: Option<DashboardSource>,
    defaults: HashMap<CliFlag, String>,
    rule_group: Option<String>,
}

impl CliBuilder {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            about: None,
            dashboard: None,
            defaults: HashMap::new(),
            rule_group: None,
        }
    }

    #[must_use]
    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    /// Use a prebuilt dashboard. Its queries are not recorded.
    pub fn dashboard(mut self, dashboard: Dashboard) -> AppResult<Self> {
        self.set_dashboard(DashboardSource::Ready(dashboard))?;
        Ok(self)
    }

    /// Build the dashboard from a recording map once flags are known.
    pub fn dashboard_fn<F>(mut self, build: F) -> AppResult<Self>
    where
        F: FnOnce(&mut RecordingMap) -> CoreResult<Dashboard> + 'static,
    {
        self.set_dashboard(DashboardSource::Build(Box::new(build)))?;
        Ok(self)
    }

    fn set_dashboard(&mut self, source: DashboardSource) -> AppResult<()> {
        if self.dashboard.is_some() {
            return Err(AppError::Config("dashboard already set".to_string()));
        }
        self.dashboard = Some(source);
        Ok(())
    }

    /// Override the default value of `flag`.
    #[must_use]
    pub fn default_flag(mut self, flag: CliFlag, value: impl Into<String>) -> Self {
        self.defaults.insert(flag, value.into());
        self
    }

    /// Name of the recording-rule group. Defaults to the app name.
    #[must_use]
    pub fn rule_group(mut self, name: impl Into<String>) -> Self {
        self.rule_group = Some(name.into());
        self
    }

    pub fn build(self) -> AppResult<Cli> {
        let dashboard = self
            .dashboard
            .ok_or_else(|| AppError::Config("no dashboard configured".to_string()))?;
        let rule_group = self.rule_group.unwrap_or_else(|| self.app_name.clone());

        Ok(Cli {
            app_name: self.app_name,
            about: self.about,
            dashboard,
            defaults: self.defaults,
            rule_group,
        })
    }
}

/// Resolved global settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub app_name: String,
    pub server: String,
    pub api_key: Option<String>,
    /// Empty selects the General folder.
    pub folder: String,
    pub debug_queries: bool,
    pub metrics_file: Option<PathBuf>,
    pub rule_group: String,
    pub config: FileConfig,
}

/// Output options of the `rules` command.
#[derive(Debug, Clone, PartialEq)]
pub struct RulesTarget {
    pub file: PathBuf,
    /// Run the configured rule validator on the written file.
    pub check: bool,
    /// Wrap the rules in a PrometheusRule resource.
    pub resource: Option<ResourceMetadata>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Apply,
    Destroy,
    Plan,
    ToYaml { file: PathBuf },
    Rules(RulesTarget),
    Dev,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Apply => "apply",
            Action::Destroy => "destroy",
            Action::Plan => "plan",
            Action::ToYaml { .. } => "to-yaml",
            Action::Rules(_) => "rules",
            Action::Dev => "dev",
        }
    }

    fn needs_api_key(&self) -> bool {
        matches!(self, Action::Apply | Action::Destroy)
    }
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub settings: Settings,
    pub action: Action,
}

/// Dashboard command-line runner.
pub struct Cli {
    app_name: String,
    about: Option<String>,
    dashboard: DashboardSource,
    defaults: HashMap<CliFlag, String>,
    rule_group: String,
}

impl Cli {
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// The clap command tree.
    pub fn command(&self) -> Command {
        let env = |flag: CliFlag| flag.env_var(&self.app_name);
        let about = self
            .about
            .clone()
            .unwrap_or_else(|| format!("Manage the {} dashboard", self.app_name));

        Command::new(self.app_name.clone())
            .about(about)
            .version(env!("CARGO_PKG_VERSION"))
            .subcommand_required(true)
            .arg_required_else_help(true)
            .arg(
                Arg::new(CliFlag::Server.id())
                    .long(CliFlag::Server.long())
                    .env(env(CliFlag::Server))
                    .global(true)
                    .help("Grafana base URL"),
            )
            .arg(
                Arg::new(CliFlag::ApiKey.id())
                    .long(CliFlag::ApiKey.long())
                    .env(env(CliFlag::ApiKey))
                    .hide_env_values(true)
                    .global(true)
                    .help("Grafana API key, required by apply and destroy"),
            )
            .arg(
                Arg::new(CliFlag::FolderName.id())
                    .long(CliFlag::FolderName.long())
                    .env(env(CliFlag::FolderName))
                    .global(true)
                    .help("Folder to store the dashboard in"),
            )
            .arg(
                Arg::new(CliFlag::Config.id())
                    .long(CliFlag::Config.long())
                    .env(env(CliFlag::Config))
                    .global(true)
                    .value_name("PATH")
                    .help("TOML configuration file"),
            )
            .arg(
                Arg::new(CliFlag::DebugQueries.id())
                    .long(CliFlag::DebugQueries.long())
                    .env(env(CliFlag::DebugQueries))
                    .action(ArgAction::SetTrue)
                    .value_parser(BoolishValueParser::new())
                    .global(true)
                    .help("Show raw queries instead of recorded rule names"),
            )
            .arg(
                Arg::new(CliFlag::MetricsFile.id())
                    .long(CliFlag::MetricsFile.long())
                    .env(env(CliFlag::MetricsFile))
                    .global(true)
                    .value_name("PATH")
                    .help("Write run metrics in Prometheus text format"),
            )
            .subcommand(Command::new("apply").about("Create or update the dashboard"))
            .subcommand(Command::new("destroy").about("Delete the dashboard"))
            .subcommand(Command::new("plan").about("Print the dashboard JSON"))
            .subcommand(
                Command::new("to-yaml")
                    .alias("toYaml")
                    .about("Write the dashboard as YAML")
                    .arg(
                        Arg::new(CliFlag::YamlFile.id())
                            .long(CliFlag::YamlFile.long())
                            .env(env(CliFlag::YamlFile))
                            .value_name("PATH")
                            .help("File to save yaml"),
                    ),
            )
            .subcommand(
                Command::new("rules")
                    .about("Write the recording rules used by the dashboard")
                    .arg(
                        Arg::new(CliFlag::RulesFile.id())
                            .long(CliFlag::RulesFile.long())
                            .env(env(CliFlag::RulesFile))
                            .value_name("PATH")
                            .help("File to save rules"),
                    )
                    .arg(
                        Arg::new("check")
                            .long("check")
                            .action(ArgAction::SetTrue)
                            .conflicts_with("k8s-name")
                            .help("Validate the written file"),
                    )
                    .arg(
                        Arg::new("k8s-name")
                            .long("k8s-name")
                            .value_name("NAME")
                            .help("Wrap the rules in a PrometheusRule resource"),
                    )
                    .arg(
                        Arg::new("namespace")
                            .long("namespace")
                            .requires("k8s-name")
                            .help("Namespace of the PrometheusRule resource"),
                    )
                    .arg(
                        Arg::new("label")
                            .long("label")
                            .value_name("KEY=VALUE")
                            .action(ArgAction::Append)
                            .requires("k8s-name")
                            .help("Label of the PrometheusRule resource"),
                    ),
            )
            .subcommand(
                Command::new("dev")
                    .about("Run a local Grafana and Prometheus with the dashboard applied"),
            )
    }

    /// Parse `args` (program name first) without running anything.
    pub fn parse_from<I, T>(&self, args: I) -> AppResult<Invocation>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.command().try_get_matches_from(args)?;
        self.resolve(&matches)
    }

    fn resolve(&self, matches: &ArgMatches) -> AppResult<Invocation> {
        let config = match self.string(matches, CliFlag::Config, None) {
            Some(path) => {
                info!(config_path = %path, "Loading configuration");
                FileConfig::from_file(&path)?
            }
            None => FileConfig::default(),
        };

        let server = self
            .string(matches, CliFlag::Server, config.server.as_deref())
            .unwrap_or_else(|| DEFAULT_SERVER.to_string());
        let api_key = self
            .string(matches, CliFlag::ApiKey, None)
            .filter(|key| !key.is_empty());
        let folder = self
            .string(matches, CliFlag::FolderName, config.folder.as_deref())
            .unwrap_or_default();
        let debug_queries = self.debug_queries(matches, config.debug_queries)?;
        let metrics_file = self
            .string(matches, CliFlag::MetricsFile, config.metrics_file.as_deref())
            .map(PathBuf::from);
        let rule_group = config
            .rules
            .group
            .clone()
            .unwrap_or_else(|| self.rule_group.clone());

        let action = match matches.subcommand() {
            Some(("apply", _)) => Action::Apply,
            Some(("destroy", _)) => Action::Destroy,
            Some(("plan", _)) => Action::Plan,
            Some(("to-yaml", sub)) => Action::ToYaml {
                file: self
                    .string(sub, CliFlag::YamlFile, config.output_file.as_deref())
                    .unwrap_or_else(|| DEFAULT_YAML_FILE.to_string())
                    .into(),
            },
            Some(("rules", sub)) => Action::Rules(self.rules_target(sub, &config)?),
            Some(("dev", _)) => Action::Dev,
            _ => return Err(AppError::Config("no command given".to_string())),
        };

        if action.needs_api_key() && api_key.is_none() {
            return Err(AppError::Config(format!(
                "--{} (or {}) is required for {}",
                CliFlag::ApiKey.long(),
                CliFlag::ApiKey.env_var(&self.app_name),
                action.name()
            )));
        }

        Ok(Invocation {
            settings: Settings {
                app_name: self.app_name.clone(),
                server,
                api_key,
                folder,
                debug_queries,
                metrics_file,
                rule_group,
                config,
            },
            action,
        })
    }

    /// Flag or env value, then the config file, then the builder default.
    fn string(&self, matches: &ArgMatches, flag: CliFlag, config: Option<&str>) -> Option<String> {
        matches
            .get_one::<String>(flag.id())
            .cloned()
            .or_else(|| config.map(str::to_string))
            .or_else(|| self.defaults.get(&flag).cloned())
    }

    fn debug_queries(&self, matches: &ArgMatches, config: Option<bool>) -> AppResult<bool> {
        let id = CliFlag::DebugQueries.id();
        if matches!(
            matches.value_source(id),
            Some(ValueSource::CommandLine | ValueSource::EnvVariable)
        ) {
            return Ok(matches.get_flag(id));
        }
        if let Some(value) = config {
            return Ok(value);
        }
        match self.defaults.get(&CliFlag::DebugQueries) {
            Some(raw) => parse_bool(raw).ok_or_else(|| {
                AppError::Config(format!("invalid default for --debug-queries: '{raw}'"))
            }),
            None => Ok(false),
        }
    }

    fn rules_target(&self, sub: &ArgMatches, config: &FileConfig) -> AppResult<RulesTarget> {
        let file = self
            .string(sub, CliFlag::RulesFile, config.rules.file.as_deref())
            .unwrap_or_else(|| DEFAULT_RULES_FILE.to_string());

        let resource = match sub.get_one::<String>("k8s-name") {
            Some(name) => {
                let namespace = sub
                    .get_one::<String>("namespace")
                    .cloned()
                    .unwrap_or_else(|| config.rules.namespace.clone());
                let mut metadata = ResourceMetadata::new(name.clone(), namespace);
                for (key, value) in &config.rules.labels {
                    metadata = metadata.label(key.clone(), value.clone());
                }
                for raw in sub.get_many::<String>("label").into_iter().flatten() {
                    let (key, value) = parse_label(raw)?;
                    metadata = metadata.label(key, value);
                }
                Some(metadata)
            }
            None => None,
        };

        Ok(RulesTarget {
            file: file.into(),
            check: sub.get_flag("check"),
            resource,
        })
    }

    /// Build the dashboard and its recording map.
    pub fn into_runner(self, settings: Settings) -> AppResult<Runner> {
        let mut rules = RecordingMap::new(settings.debug_queries);
        let dashboard = match self.dashboard {
            DashboardSource::Ready(dashboard) => dashboard,
            DashboardSource::Build(build) => build(&mut rules)?,
        };
        info!(
            dashboard = %dashboard.uid_str(),
            panels = dashboard.panel_count(),
            rules = rules.len(),
            aliased = rules.alias_count(),
            debug_queries = settings.debug_queries,
            "Dashboard built"
        );
        Ok(Runner::new(settings, dashboard, rules))
    }

    /// Parse the process arguments and run the selected command.
    ///
    /// Exits the process on `--help`, `--version` and usage errors.
    pub async fn run(self) -> AppResult<()> {
        let matches = self.command().get_matches();
        let invocation = self.resolve(&matches)?;
        self.execute(invocation).await
    }

    /// Parse `args` and run the selected command.
    pub async fn run_from<I, T>(self, args: I) -> AppResult<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let invocation = self.parse_from(args)?;
        self.execute(invocation).await
    }

    async fn execute(self, invocation: Invocation) -> AppResult<()> {
        let Invocation { settings, action } = invocation;
        let metrics_file = settings.metrics_file.clone();

        let result = match self.into_runner(settings) {
            Ok(runner) => runner.execute(&action).await,
            Err(e) => Err(e),
        };

        Metrics::command_finished(action.name(), result.is_ok());
        if let Some(path) = metrics_file {
            if let Err(e) = Metrics::write_textfile(&path) {
                warn!(path = %path.display(), error = %e, "Failed to write metrics file");
            }
        }
        result
    }
}
