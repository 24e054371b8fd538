use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use inventory_forecast::{
    config::{self, AppConfig},
    db,
    services::forecasting::{parse_item_type, AlertEntry, ForecastResult, ForecastingService},
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config().context("failed to load application config")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let db_pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to database")?;
    if cfg.auto_migrate || matches!(cli.command, Commands::Migrate) {
        db::run_migrations(&db_pool)
            .await
            .context("failed running migrations")?;
    }

    let service = build_service(&cfg, Arc::new(db_pool));

    match cli.command {
        Commands::Migrate => info!("Migrations applied"),
        Commands::Generate(args) => handle_generate(&service, args, cli.json).await?,
        Commands::GenerateAll => {
            let summary = service
                .generate_all_forecasts()
                .await
                .context("batch forecast generation failed")?;
            if cli.json {
                print_json(&summary)?;
            } else {
                println!(
                    "Processed {} of {} items ({} skipped)",
                    summary.processed, summary.total, summary.skipped
                );
            }
        }
        Commands::Alerts(args) => {
            let alerts = service
                .get_low_stock_alerts(args.horizon)
                .await
                .context("failed to derive low-stock alerts")?;
            if cli.json {
                print_json(&alerts)?;
            } else {
                render_alerts(&alerts);
            }
        }
        Commands::Show(args) => handle_show(&service, args, cli.json).await?,
    }

    Ok(())
}

fn build_service(cfg: &AppConfig, db: Arc<db::DbPool>) -> ForecastingService {
    ForecastingService::new(db, cfg.forecast.clone())
}

#[derive(Parser)]
#[command(
    name = "inventory-forecast",
    about = "Demand forecasting and low-stock alerts for catalog items",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate,
    /// Generate and store the forecast for one item
    Generate(ItemArgs),
    /// Regenerate forecasts for every active item
    GenerateAll,
    /// List items whose predicted demand exceeds stock
    Alerts(AlertArgs),
    /// Print stored forecast rows for one item
    Show(ItemArgs),
}

#[derive(Args)]
struct ItemArgs {
    #[arg(long, help = "Item type: product, consumable or filter")]
    item_type: String,
    #[arg(long, help = "Catalog id of the item")]
    item_id: Uuid,
    #[arg(long, help = "Days to project; defaults to the configured horizon")]
    horizon: Option<u32>,
}

#[derive(Args)]
struct AlertArgs {
    #[arg(long, help = "Days of demand to sum; defaults to the configured alert horizon")]
    horizon: Option<u32>,
}

async fn handle_generate(service: &ForecastingService, args: ItemArgs, json: bool) -> Result<()> {
    let item_type = parse_item_type(&args.item_type)?;
    let result = service
        .generate_forecast(item_type, args.item_id, args.horizon)
        .await
        .with_context(|| {
            format!(
                "failed to generate forecast for {} {}",
                item_type, args.item_id
            )
        })?;

    if json {
        print_json(&result)?;
    } else {
        render_forecast(&result);
    }
    Ok(())
}

async fn handle_show(service: &ForecastingService, args: ItemArgs, json: bool) -> Result<()> {
    let item_type = parse_item_type(&args.item_type)?;
    let rows = service
        .get_forecasts(item_type, args.item_id)
        .await
        .context("failed to read stored forecasts")?;

    if json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("No stored forecast for {} {}", item_type, args.item_id);
        return Ok(());
    }
    let stock = service
        .current_stock(item_type, args.item_id)
        .await
        .context("failed to read current stock")?;
    println!("Current stock: {}", stock);
    for row in rows {
        println!(
            "- {} • demand {} • confidence {:.2}",
            row.forecast_date, row.predicted_demand, row.confidence_level
        );
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_forecast(result: &ForecastResult) {
    if !result.has_data() {
        println!("No historical data; nothing stored");
        return;
    }
    let factors = &result.factors;
    println!(
        "Confidence {:.2} • moving average {:.2} • trend {:+.3}/day • {} days of history",
        result.confidence, factors.moving_average, factors.trend, factors.historical_days
    );
    for point in &result.forecasts {
        println!("- {} • demand {}", point.date, point.predicted_demand);
    }
}

fn render_alerts(alerts: &[AlertEntry]) {
    if alerts.is_empty() {
        println!("No low-stock alerts");
        return;
    }
    for alert in alerts {
        println!(
            "- {} {} ({}) • stock {} • demand {} • shortage {} • confidence {:.2}",
            alert.item_type,
            alert.item_name,
            alert.item_id,
            alert.current_stock,
            alert.predicted_demand_over_horizon,
            alert.shortage,
            alert.avg_confidence
        );
    }
}
