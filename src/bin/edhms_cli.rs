use std::{fs, path::PathBuf, str::FromStr, sync::Arc};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{ArgAction, Args, Parser, Subcommand};
use edhms_api::{
    commands::hospitals::SaveHospitalCommand,
    config::{self, AppConfig},
    db::{self, DbPool},
    events::{Event, EventSender},
    forms::ListInput,
    models::HospitalStatus,
    services::{
        alerts::AlertService,
        analytics::{AnalyticsReport, AnalyticsService, TimeRange},
        exports::settings_export_filename,
        hospitals::HospitalService,
        settings::SettingsStore,
    },
};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config().context("failed to load application config")?;
    config::init_tracing(config.log_level(), config.log_json);

    match cli.command {
        Commands::Migrate => handle_migrate(&config).await?,
        Commands::ExportSettings(args) => handle_export_settings(&config, args, cli.json).await?,
        Commands::ImportSettings(args) => handle_import_settings(&config, args, cli.json).await?,
        Commands::Analytics(args) => {
            let context = CliContext::initialize(config).await?;
            handle_analytics(&context, args, cli.json).await?
        }
        Commands::SeedDemo => {
            let context = CliContext::initialize(config).await?;
            handle_seed_demo(&context, cli.json).await?
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "edhms-cli", about = "Operator tooling for the EDHMS backend")]
struct Cli {
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
    /// Apply pending database migrations
    Migrate,
    /// Write console settings to a file (the API key is never exported)
    ExportSettings(ExportSettingsArgs),
    /// Apply a previously exported settings file
    ImportSettings(ImportSettingsArgs),
    /// Print the analytics report for a time range
    Analytics(AnalyticsArgs),
    /// Add a demo hospital when none exist
    SeedDemo,
}

#[derive(Args)]
struct ExportSettingsArgs {
    /// Target file; defaults to edhms-settings-{date}.json
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct ImportSettingsArgs {
    file: PathBuf,
}

#[derive(Args)]
struct AnalyticsArgs {
    /// 24h, 7d, 30d or 90d
    #[arg(long, default_value = "7d")]
    range: String,
}

struct CliContext {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl CliContext {
    async fn initialize(config: AppConfig) -> Result<Self> {
        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        let db = Arc::new(db_pool);

        let (event_tx, mut event_rx) = mpsc::channel::<Event>(32);
        let event_sender = Arc::new(EventSender::new(event_tx));

        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                debug!(target: "edhms_cli", event = ?event, "received async event");
            }
        });

        Ok(Self { db, event_sender })
    }

    fn hospital_service(&self) -> HospitalService {
        HospitalService::new(self.db.clone(), self.event_sender.clone())
    }

    fn analytics_service(&self) -> AnalyticsService {
        AnalyticsService::new(
            self.db.clone(),
            AlertService::new(self.db.clone(), self.event_sender.clone()),
        )
    }
}

async fn handle_migrate(config: &AppConfig) -> Result<()> {
    let db_pool = db::establish_connection_from_app_config(config)
        .await
        .context("failed to connect to database")?;
    db::run_migrations(&db_pool)
        .await
        .context("failed to run migrations")?;
    println!("Migrations applied");
    Ok(())
}

async fn handle_export_settings(config: &AppConfig, args: ExportSettingsArgs, json: bool) -> Result<()> {
    let store = SettingsStore::load(&config.settings_path)
        .await
        .context("failed to load settings")?;
    let document = store.export_document().await;
    let target = args
        .out
        .unwrap_or_else(|| PathBuf::from(settings_export_filename(Utc::now().date_naive())));
    fs::write(&target, serde_json::to_vec_pretty(&document)?)
        .with_context(|| format!("failed to write {}", target.display()))?;

    if json {
        print_json(&document)?;
    } else {
        println!("Settings exported to {}", target.display());
    }
    Ok(())
}

async fn handle_import_settings(config: &AppConfig, args: ImportSettingsArgs, json: bool) -> Result<()> {
    let bytes = fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let store = SettingsStore::load(&config.settings_path)
        .await
        .context("failed to load settings")?;
    let view = store
        .import_document(&bytes)
        .await
        .map_err(|e| anyhow!("{}", e))?;

    if json {
        print_json(&view)?;
    } else {
        println!("Settings imported from {}", args.file.display());
    }
    Ok(())
}

async fn handle_analytics(context: &CliContext, args: AnalyticsArgs, json: bool) -> Result<()> {
    let range = TimeRange::from_str(&args.range.to_lowercase())
        .map_err(|_| anyhow!("unknown range `{}`; use 24h, 7d, 30d or 90d", args.range))?;
    let report = context
        .analytics_service()
        .report(range)
        .await
        .map_err(|e| anyhow!("failed to build analytics report: {}", e))?;

    if json {
        print_json(&report)?;
    } else {
        render_report(range, &report);
    }
    Ok(())
}

async fn handle_seed_demo(context: &CliContext, json: bool) -> Result<()> {
    let service = context.hospital_service();
    let existing = service
        .list(None, None)
        .await
        .map_err(|e| anyhow!("failed to list hospitals: {}", e))?;
    if !existing.is_empty() {
        println!("{} hospital(s) already present; nothing seeded", existing.len());
        return Ok(());
    }

    let hospital = service
        .save(SaveHospitalCommand {
            id: None,
            name: "City General Hospital".to_string(),
            address: "100 Main Street".to_string(),
            phone: "555-0100".to_string(),
            email: Some("emergency@citygeneral.example".to_string()),
            emergency_contact: "555-0911".to_string(),
            bed_capacity: 120,
            available_beds: Some(35),
            specialties: ListInput::Text("Emergency Medicine, Cardiology, Trauma".to_string()),
            status: Some(HospitalStatus::Active),
            latitude: None,
            longitude: None,
        })
        .await
        .map_err(|e| anyhow!("failed to seed hospital: {}", e))?;

    if json {
        print_json(&hospital)?;
    } else {
        println!("Seeded hospital {} ({})", hospital.name, hospital.id);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_report(range: TimeRange, report: &AnalyticsReport) {
    println!("Analytics for the last {}", range);
    println!(
        "- Hospitals {} • patients {} • beds {}/{} available",
        report.total_hospitals, report.total_patients, report.available_beds, report.total_beds
    );
    match report.bed_occupancy_rate {
        Some(rate) => println!("- Bed occupancy {:.1}%", rate),
        None => println!("- Bed occupancy n/a"),
    }
    println!(
        "- Active alerts {} • emergency visits {}",
        report.active_alerts, report.emergency_visits
    );
    for day in &report.daily_admissions {
        println!("  {} {}", day.date, day.count);
    }
}
