//! Flag, environment and config-file resolution of the command line.
//!
//! Each test uses its own app name so environment variables never leak
//! between tests running in parallel.

use dashforge_cli::{Action, AppError, Cli, CliBuilder, CliFlag, DEFAULT_SERVER};
use dashforge_core::{Dashboard, Panel, TargetOptions};
use dashforge_rules::RecordingMap;
use std::path::PathBuf;
use tempfile::TempDir;

fn build(rules: &mut RecordingMap) -> dashforge_core::CoreResult<Dashboard> {
    let panel = rules.with_targets(
        Panel::time_series("Up"),
        "job:up:sum",
        "sum by (job) (up)",
        TargetOptions::new(),
    )?;
    Ok(Dashboard::new("Resolution")?.panel(panel))
}

fn cli(app: &str) -> Cli {
    CliBuilder::new(app).dashboard_fn(build).unwrap().build().unwrap()
}

#[test]
fn test_builtin_defaults() {
    let invocation = cli("res-defaults").parse_from(["res-defaults", "plan"]).unwrap();
    let settings = invocation.settings;

    assert_eq!(settings.server, DEFAULT_SERVER);
    assert_eq!(settings.folder, "");
    assert!(settings.api_key.is_none());
    assert!(!settings.debug_queries);
    assert!(settings.metrics_file.is_none());
}

#[test]
fn test_default_flag_override() {
    let cli = CliBuilder::new("res-override")
        .dashboard_fn(build)
        .unwrap()
        .default_flag(CliFlag::Server, "http://grafana.internal:3000")
        .default_flag(CliFlag::FolderName, "Platform")
        .default_flag(CliFlag::DebugQueries, "true")
        .default_flag(CliFlag::YamlFile, "board.yml")
        .build()
        .unwrap();

    let invocation = cli.parse_from(["res-override", "to-yaml"]).unwrap();
    assert_eq!(invocation.settings.server, "http://grafana.internal:3000");
    assert_eq!(invocation.settings.folder, "Platform");
    assert!(invocation.settings.debug_queries);
    assert_eq!(
        invocation.action,
        Action::ToYaml {
            file: PathBuf::from("board.yml")
        }
    );
}

#[test]
fn test_invalid_bool_default_rejected() {
    let cli = CliBuilder::new("res-badbool")
        .dashboard_fn(build)
        .unwrap()
        .default_flag(CliFlag::DebugQueries, "sometimes")
        .build()
        .unwrap();
    assert!(matches!(
        cli.parse_from(["res-badbool", "plan"]),
        Err(AppError::Config(_))
    ));
}

#[test]
fn test_env_var_beats_default_and_flag_beats_env() {
    std::env::set_var("RES_ENV_SERVER", "http://from-env:3000");
    std::env::set_var("RES_ENV_DEBUG_QUERIES", "true");
    let cli = CliBuilder::new("res-env")
        .dashboard_fn(build)
        .unwrap()
        .default_flag(CliFlag::Server, "http://from-default:3000")
        .build()
        .unwrap();

    let from_env = cli.parse_from(["res-env", "plan"]).unwrap();
    assert_eq!(from_env.settings.server, "http://from-env:3000");
    assert!(from_env.settings.debug_queries);

    let from_flag = cli
        .parse_from(["res-env", "plan", "--server", "http://from-flag:3000"])
        .unwrap();
    assert_eq!(from_flag.settings.server, "http://from-flag:3000");
}

#[test]
fn test_config_file_fallback() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("dashforge.toml");
    std::fs::write(
        &config,
        r#"
server = "http://from-config:3000"
folder = "Configured"
debug_queries = true

[rules]
group = "configured-group"
file = "configured-rules.yml"
"#,
    )
    .unwrap();
    let config_arg = config.to_str().unwrap();

    let cli = CliBuilder::new("res-config")
        .dashboard_fn(build)
        .unwrap()
        .default_flag(CliFlag::Server, "http://from-default:3000")
        .build()
        .unwrap();

    let invocation = cli
        .parse_from(["res-config", "--config", config_arg, "rules"])
        .unwrap();
    assert_eq!(invocation.settings.server, "http://from-config:3000");
    assert_eq!(invocation.settings.folder, "Configured");
    assert!(invocation.settings.debug_queries);
    assert_eq!(invocation.settings.rule_group, "configured-group");
    match invocation.action {
        Action::Rules(target) => {
            assert_eq!(target.file, PathBuf::from("configured-rules.yml"));
            assert!(!target.check);
            assert!(target.resource.is_none());
        }
        other => panic!("expected rules action, got {other:?}"),
    }

    // flags still win over the file
    let invocation = cli
        .parse_from([
            "res-config",
            "--config",
            config_arg,
            "--foldername",
            "Flagged",
            "rules",
            "--file",
            "flagged.yml",
        ])
        .unwrap();
    assert_eq!(invocation.settings.folder, "Flagged");
    assert!(matches!(
        invocation.action,
        Action::Rules(target) if target.file == PathBuf::from("flagged.yml")
    ));
}

#[test]
fn test_missing_config_file_is_error() {
    let err = cli("res-nocfg")
        .parse_from(["res-nocfg", "--config", "/nonexistent/dashforge.toml", "plan"])
        .unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn test_apikey_required_for_apply_and_destroy_only() {
    let cli = cli("res-key");

    for command in ["apply", "destroy"] {
        let err = cli.parse_from(["res-key", command]).unwrap_err();
        match err {
            AppError::Config(msg) => assert!(msg.contains("RES_KEY_APIKEY"), "{msg}"),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    assert!(cli.parse_from(["res-key", "plan"]).is_ok());
    let apply = cli
        .parse_from(["res-key", "--apikey", "secret", "apply"])
        .unwrap();
    assert_eq!(apply.settings.api_key.as_deref(), Some("secret"));
}

#[test]
fn test_to_yaml_alias() {
    let invocation = cli("res-alias").parse_from(["res-alias", "toYaml"]).unwrap();
    assert_eq!(
        invocation.action,
        Action::ToYaml {
            file: PathBuf::from("target.yml")
        }
    );
}

#[test]
fn test_k8s_rules_options() {
    let invocation = cli("res-k8s")
        .parse_from([
            "res-k8s",
            "rules",
            "--k8s-name",
            "svc-rules",
            "--label",
            "release=prom",
            "--label",
            "team=core",
        ])
        .unwrap();

    let Action::Rules(target) = invocation.action else {
        panic!("expected rules action");
    };
    let resource = target.resource.unwrap();
    assert_eq!(resource.name, "svc-rules");
    assert_eq!(resource.namespace, "monitoring");
    assert_eq!(resource.labels["release"], "prom");
    assert_eq!(resource.labels["team"], "core");
}

#[test]
fn test_usage_errors() {
    let cli = cli("res-usage");
    // --check validates plain rule files only
    assert!(matches!(
        cli.parse_from(["res-usage", "rules", "--check", "--k8s-name", "x"]),
        Err(AppError::Cli(_))
    ));
    assert!(matches!(
        cli.parse_from(["res-usage", "rules", "--namespace", "ns"]),
        Err(AppError::Cli(_))
    ));
    assert!(matches!(
        cli.parse_from(["res-usage", "bogus"]),
        Err(AppError::Cli(_))
    ));
}

#[test]
fn test_dashboard_registered_twice() {
    let err = CliBuilder::new("res-twice")
        .dashboard_fn(build)
        .unwrap()
        .dashboard(Dashboard::new("Other").unwrap())
        .err()
        .unwrap();
    assert!(matches!(err, AppError::Config(msg) if msg == "dashboard already set"));
}

#[tokio::test]
async fn test_rules_command_writes_file() {
    let dir = TempDir::new().unwrap();
    let rules = dir.path().join("out.yml");
    let metrics = dir.path().join("run.prom");

    cli("res-run")
        .run_from([
            "res-run",
            "--metrics-file",
            metrics.to_str().unwrap(),
            "rules",
            "--file",
            rules.to_str().unwrap(),
        ])
        .await
        .unwrap();

    let content = std::fs::read_to_string(&rules).unwrap();
    assert!(content.contains("name: res-run"));
    assert!(content.contains("sum by (job) (up)"));

    let exposition = std::fs::read_to_string(&metrics).unwrap();
    assert!(exposition.contains("dashforge_recorded_rules 1"));
}

#[tokio::test]
async fn test_failing_validator_surfaces_exit_status() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("dashforge.toml");
    std::fs::write(&config, "[rules]\nvalidator = [\"sh\", \"-c\", \"exit 4\"]\n").unwrap();
    let rules = dir.path().join("rules.yml");

    let err = cli("res-check")
        .run_from([
            "res-check",
            "--config",
            config.to_str().unwrap(),
            "rules",
            "--check",
            "--file",
            rules.to_str().unwrap(),
        ])
        .await
        .unwrap_err();

    match err {
        AppError::Rules(dashforge_rules::RulesError::ValidatorFailed { status, .. }) => {
            assert_eq!(status.code(), Some(4));
        }
        other => panic!("expected validator failure, got {other:?}"),
    }
    // the file is written before validation
    assert!(rules.exists());
}
