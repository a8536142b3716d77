//! Example service dashboard with recorded queries.
//!
//! `dashforge-demo plan` prints the dashboard, `dashforge-demo rules` writes
//! the recording rules its panels rely on, `dashforge-demo dev` runs both
//! against a local Grafana and Prometheus.

use anyhow::Result;
use dashforge_cli::{AppError, CliBuilder, CliFlag};
use dashforge_core::{
    continuous_color_scheme, stat_field_override, variable_as_text_default, ColorScheme,
    CoreResult, Dashboard, DashboardVariable, FieldMatcher, OverrideProperty, Panel, Pixel, Row,
    TargetFormat, TargetOptions, Variable,
};
use dashforge_rules::RecordingMap;

const APP_NAME: &str = "dashforge-demo";
const DATASOURCE: &str = "prometheus";

fn build_dashboard(rules: &mut RecordingMap) -> CoreResult<Dashboard> {
    let job = DashboardVariable::new("job");
    let mut job_variable = Variable::textbox(job.0.clone()).label("Job");
    variable_as_text_default(&mut job_variable, "api")?;

    let mut availability = rules.with_targets(
        Panel::stat("Availability")
            .datasource(DATASOURCE)
            .unit("percentunit")
            .decimals(2)
            .range(0.0, 1.0)
            .span(3)?,
        "job:up:avg",
        "avg by (job) (up)",
        TargetOptions::new().instant().legend("{{job}}"),
    )?;
    stat_field_override(
        &mut availability,
        FieldMatcher::by_query("job:up:avg"),
        vec![
            continuous_color_scheme(ColorScheme::RedYellowGreen),
            OverrideProperty::display_name("${__field.labels.job}"),
        ],
    )?;

    let request_rate = rules.with_targets(
        Panel::time_series("Request rate")
            .datasource(DATASOURCE)
            .unit("reqps")
            .span(5)?,
        "job:http_requests:rate5m",
        "sum by (job) (rate(http_requests_total[5m]))",
        TargetOptions::new().legend("{{job}}"),
    )?;

    let error_ratio = rules.with_targets(
        Panel::time_series("Error ratio")
            .datasource(DATASOURCE)
            .unit("percentunit")
            .span(4)?,
        "job:http_errors:ratio5m",
        "sum by (job) (rate(http_requests_total{code=~\"5..\"}[5m]))
           / sum by (job) (rate(http_requests_total[5m]))",
        TargetOptions::new().legend("{{job}}"),
    )?;

    // same query as the request rate panel, recorded once
    let busiest = rules.with_targets(
        Panel::gauge("Busiest job").datasource(DATASOURCE).unit("reqps").span(4)?,
        "busiest_job_rate",
        "sum by (job)   (rate(http_requests_total[5m]))",
        TargetOptions::new().instant(),
    )?;

    let targets = Panel::table("Scrape targets")
        .datasource(DATASOURCE)
        .span(8)?
        .with_prometheus_target(
            format!("up{{job={}}}", job.as_var_quote()),
            TargetOptions::new().instant().format(TargetFormat::Table),
        )?;

    let about = Panel::text(
        "About",
        "Built with **dashforge**. Panels query recording rules; \
         run with `--debug-queries` to see the raw expressions.",
    )
    .span(12)?
    .height(Pixel(90));

    let dashboard = Dashboard::new("Service overview")?
        .uid(APP_NAME)
        .tag("dashforge")
        .tag("demo")
        .auto_refresh("30s")
        .time("now-3h", "now")
        .variable(job_variable)?
        .row(
            Row::new("Traffic")
                .panel(availability)
                .panel(request_rate)
                .panel(error_ratio),
        )
        .row(
            Row::new("Details")
                .panel(busiest)
                .panel(targets)
                .panel(about),
        );
    Ok(dashboard)
}

#[tokio::main]
async fn main() -> Result<()> {
    dashforge_telemetry::init_logging()?;

    let cli = CliBuilder::new(APP_NAME)
        .about("Example service dashboard built with dashforge")
        .default_flag(CliFlag::FolderName, "Demo")
        .rule_group("dashforge-demo.rules")
        .dashboard_fn(build_dashboard)?
        .build()?;

    match cli.run().await {
        Ok(()) => Ok(()),
        Err(AppError::Cli(e)) => e.exit(),
        Err(e) => Err(e.into()),
    }
}
