use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::{ArgAction, Args, Parser, Subcommand};
use packops_api::{
    client::{spawn_session, DashboardController, DashboardView, Event, HttpDashboardApi},
    config::{self, DashboardConfig},
    dashboard::{DashboardFilters, DashboardQuery},
};
use tokio::time;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "packops", about = "PackOps dashboard client", version)]
struct Cli {
    #[arg(long, global = true, help = "Server base URL; defaults to dashboard.client_base_url")]
    base_url: Option<String>,
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the dashboard, printing every refresh until interrupted
    Watch(WatchArgs),
    /// Load the dashboard once and save it as CSV
    Export(ExportArgs),
}

#[derive(Args, Clone)]
struct FilterArgs {
    #[arg(long, default_value = "all", help = "all, today, week, month or custom")]
    period: String,
    #[arg(long, help = "First day of a custom period (YYYY-MM-DD)")]
    from: Option<String>,
    #[arg(long, help = "Last day of a custom period (YYYY-MM-DD)")]
    to: Option<String>,
    #[arg(long, help = "Restrict to one customer (UUID)")]
    customer: Option<String>,
    #[arg(long = "status", help = "Order status code; repeat for several")]
    statuses: Vec<u8>,
}

impl FilterArgs {
    fn filters(&self) -> Result<DashboardFilters> {
        let query = DashboardQuery {
            date_filter: Some(self.period.clone()),
            start_date: self.from.clone(),
            end_date: self.to.clone(),
            customer_uuid: self.customer.clone(),
            statuses: (!self.statuses.is_empty()).then(|| {
                self.statuses
                    .iter()
                    .map(u8::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            }),
            only: None,
        };
        let parsed = query.parse().context("invalid dashboard filters")?;
        Ok(parsed.filters)
    }
}

#[derive(Args)]
struct WatchArgs {
    #[command(flatten)]
    filters: FilterArgs,
    #[arg(long, help = "Poll interval in seconds; defaults to dashboard.poll_interval_secs")]
    interval: Option<u64>,
}

#[derive(Args)]
struct ExportArgs {
    #[command(flatten)]
    filters: FilterArgs,
    #[arg(long, default_value = ".", help = "Directory the CSV file is written to")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::init_tracing("warn", false);

    let dashboard = dashboard_settings();
    let base_url = cli
        .base_url
        .clone()
        .unwrap_or_else(|| dashboard.client_base_url.clone());
    let api = Arc::new(
        HttpDashboardApi::new(base_url, dashboard.client_timeout())
            .context("failed to build HTTP client")?,
    );

    match cli.command {
        Commands::Watch(args) => watch(api, &dashboard, args, cli.json).await,
        Commands::Export(args) => export(api, &dashboard, args).await,
    }
}

/// Dashboard section of the layered configuration; built-in defaults when no config is found.
fn dashboard_settings() -> DashboardConfig {
    match config::load_config() {
        Ok(cfg) => cfg.dashboard,
        Err(e) => {
            debug!("configuration unavailable, using dashboard defaults: {}", e);
            DashboardConfig::default()
        }
    }
}

async fn watch(
    api: Arc<HttpDashboardApi>,
    dashboard: &DashboardConfig,
    args: WatchArgs,
    json: bool,
) -> Result<()> {
    let mut settings = dashboard.controller_settings();
    if let Some(secs) = args.interval {
        settings.poll_interval = Duration::from_secs(secs.max(1));
    }
    settings.auto_refresh = true;

    let controller = DashboardController::with_filters(settings, args.filters.filters()?);
    let session = spawn_session(api, controller);
    let mut views = session.view();
    session.send(Event::Opened).await?;

    let mut last_generated = None;
    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                if let Some(error) = &view.last_error {
                    warn!("refresh failed: {}", error);
                }
                let generated = view.snapshot.as_ref().map(|s| s.generated_at);
                if generated.is_some() && generated != last_generated {
                    last_generated = generated;
                    render(&view, json)?;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.shutdown().await;
    Ok(())
}

async fn export(
    api: Arc<HttpDashboardApi>,
    dashboard: &DashboardConfig,
    args: ExportArgs,
) -> Result<()> {
    let mut settings = dashboard.controller_settings();
    settings.auto_refresh = false;

    let controller = DashboardController::with_filters(settings, args.filters.filters()?);
    let mut session = spawn_session(api, controller);
    let mut views = session.view();
    session.send(Event::Opened).await?;

    let deadline = dashboard.client_timeout() + Duration::from_secs(1);
    let loaded = time::timeout(deadline, async {
        loop {
            if views.changed().await.is_err() {
                return Err(anyhow!("dashboard session stopped"));
            }
            let view = views.borrow_and_update().clone();
            if view.processing {
                continue;
            }
            if view.snapshot.is_some() {
                return Ok(());
            }
            if let Some(error) = view.last_error {
                return Err(anyhow!("dashboard could not be loaded: {}", error));
            }
        }
    })
    .await
    .map_err(|_| anyhow!("timed out waiting for the dashboard"))?;
    loaded?;

    session
        .send(Event::ExportRequested {
            today: Local::now().date_naive(),
        })
        .await?;
    let csv = session
        .next_download()
        .await
        .ok_or_else(|| anyhow!("export produced no file"))?;
    session.shutdown().await;

    let path = write_export(&args.output, &csv.file_name, &csv.contents)?;
    println!("{}", path.display());
    Ok(())
}

fn write_export(dir: &Path, file_name: &str, contents: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(file_name);
    fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

fn render(view: &DashboardView, json: bool) -> Result<()> {
    let Some(snapshot) = &view.snapshot else {
        return Ok(());
    };
    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
        return Ok(());
    }

    println!(
        "== {} ({}) ==",
        snapshot.generated_at.format("%Y-%m-%d %H:%M:%S"),
        snapshot.filters.date_filter
    );
    if let Some(stats) = &snapshot.statistics {
        let orders = &stats.orders;
        println!(
            "orders: {} total, {} in progress, {} completed, {} overdue, {} suspended",
            orders.total, orders.in_progress, orders.completed, orders.overdue, orders.suspended
        );
        println!(
            "quantity: {} worked of {} ordered ({:.1}%)",
            stats.quantities.worked, stats.quantities.ordered, stats.quantities.completion_rate
        );
    }
    if let Some(metrics) = &snapshot.metrics {
        println!(
            "production: {} processings by {} employees",
            metrics.processings, metrics.active_employees
        );
    }
    for entry in &view.alerts {
        println!(
            "[{}] {}: {} orders",
            entry.alert.severity,
            entry.alert.kind.title(),
            entry.alert.count
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn args(period: &str) -> FilterArgs {
        FilterArgs {
            period: period.into(),
            from: None,
            to: None,
            customer: None,
            statuses: vec![],
        }
    }

    #[test]
    fn custom_period_needs_both_dates() {
        assert!(args("custom").filters().is_err());

        let mut custom = args("custom");
        custom.from = Some("2024-05-01".into());
        custom.to = Some("2024-05-31".into());
        let filters = custom.filters().unwrap();
        let range = filters.period.resolve(NaiveDate::MIN).unwrap();
        assert_eq!(range.days(), 31);
    }

    #[test]
    fn statuses_are_forwarded_as_codes() {
        let mut with_statuses = args("week");
        with_statuses.statuses = vec![3, 0];
        let filters = with_statuses.filters().unwrap();
        assert_eq!(filters.statuses.len(), 2);
        assert_eq!(filters.to_query(None).statuses.as_deref(), Some("0,3"));
    }

    #[test]
    fn unknown_period_is_rejected() {
        assert!(args("fortnight").filters().is_err());
    }
}
