//! training-metrics CLI
//!
//! Commands:
//! - rebuild: rebuild the week/month zone-stats and VDOT-trend caches
//! - backfill: compute VDOT and training load for new activities
//! - purge: delete activities without a source and invalidate the caches
//! - zones: print pace zones for a VDOT

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use training_metrics::cache::{self, pace_zone_stats};
use training_metrics::pace_zones::pace_zone_centers;
use training_metrics::{
  compute_activity_fitness, db, format_pace, pace_zone_bounds, CacheBuilder, DateRange, EngineConfig, HrZone,
  PeriodSelection, RebuildMode, RebuildOptions, Result,
};

/// Training metrics engine: zone classification, VDOT, and per-period caches
#[derive(Parser)]
#[command(name = "training-metrics")]
#[command(version)]
#[command(about = "Build and maintain training-metrics aggregate caches", long_about = None)]
struct Cli {
  /// Emit logs as JSON lines
  #[arg(long, global = true)]
  log_json: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Rebuild the zone-stats and VDOT-trend caches
  Rebuild {
    /// full: upsert and prune keys with no data; incremental: upsert only
    #[arg(long, value_enum, default_value = "incremental")]
    mode: RebuildMode,

    /// Period types to rebuild (overrides PERIOD_TYPE)
    #[arg(long, value_enum)]
    period_type: Option<PeriodSelection>,

    /// First day to include, YYYY-MM-DD (overrides START_DATE)
    #[arg(long)]
    start_date: Option<String>,

    /// Last day to include, YYYY-MM-DD (overrides END_DATE)
    #[arg(long)]
    end_date: Option<String>,

    /// Empty both caches before rebuilding
    #[arg(long)]
    clear: bool,

    /// Stop after this many seconds, keeping keys already written
    #[arg(long)]
    timeout_secs: Option<u64>,
  },

  /// Compute VDOT and training load for activities that have neither
  Backfill,

  /// Delete activities without a source tag and clear the caches
  Purge,

  /// Print pace zones for a VDOT
  Zones {
    #[arg(long)]
    vdot: f64,

    /// Also aggregate stored laps by pace zone
    #[arg(long)]
    laps: bool,

    #[arg(long)]
    start_date: Option<String>,

    #[arg(long)]
    end_date: Option<String>,
  },
}

#[tokio::main]
async fn main() -> ExitCode {
  let cli = Cli::parse();
  init_logging(cli.log_json);

  match run(cli).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      tracing::error!(error = %e, "Command failed");
      eprintln!("error: {}", e);
      ExitCode::FAILURE
    }
  }
}

/// Logs go to stderr so stdout carries only command output
fn init_logging(json: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

  let json_layer = json.then(|| {
    tracing_subscriber::fmt::layer()
      .json()
      .with_target(false)
      .flatten_event(true)
      .with_writer(std::io::stderr)
  });
  let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

  tracing_subscriber::registry()
    .with(filter)
    .with(json_layer)
    .with(text_layer)
    .init();
}

async fn run(cli: Cli) -> Result<()> {
  let config = EngineConfig::from_env()?;

  match cli.command {
    Commands::Rebuild {
      mode,
      period_type,
      start_date,
      end_date,
      clear,
      timeout_secs,
    } => {
      let date_range = if start_date.is_some() || end_date.is_some() {
        DateRange::parse(start_date.as_deref(), end_date.as_deref())?
      } else {
        config.date_range
      };

      let options = RebuildOptions {
        mode,
        period_types: period_type.unwrap_or(config.period_types),
        date_range,
        clear,
        deadline: timeout_secs.map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs)),
      };

      let pool = db::initialize_db(&config.database_url).await?;
      let builder = CacheBuilder::new(pool.clone(), config.calculator(), config.week_numbering);
      let summary = builder.rebuild(&options).await;
      pool.close().await;

      print_json(&summary?);
      Ok(())
    }

    Commands::Backfill => {
      let pool = db::initialize_db(&config.database_url).await?;
      let result = compute_activity_fitness(&pool, &config.calculator()).await;
      pool.close().await;

      print_json(&result?);
      Ok(())
    }

    Commands::Purge => {
      let pool = db::initialize_db(&config.database_url).await?;
      let result = cache::purge_unsourced_activities(&pool).await;
      pool.close().await;

      print_json(&result?);
      Ok(())
    }

    Commands::Zones {
      vdot,
      laps,
      start_date,
      end_date,
    } => {
      let bounds = pace_zone_bounds(vdot);
      if bounds.is_empty() {
        println!("No pace zones for VDOT {}", vdot);
        return Ok(());
      }

      let centers = pace_zone_centers(vdot);
      println!("Pace zones for VDOT {:.1} (min/km)", vdot);
      for (zone, band) in bounds.iter() {
        // open ends print as --
        let fast = (zone != HrZone::Z5).then_some(band.pace_min);
        let slow = (zone != HrZone::Z1).then_some(band.pace_max);
        println!(
          "  {}  {} - {}  (target {})",
          zone,
          format_pace(fast),
          format_pace(slow),
          format_pace(Some(centers[zone.index()]))
        );
      }

      if laps {
        let range = DateRange::parse(start_date.as_deref(), end_date.as_deref())?;
        let pool = db::initialize_db(&config.database_url).await?;
        let stats = pace_zone_stats(&pool, vdot, &range).await;
        pool.close().await;

        print_json(&stats?);
      }

      Ok(())
    }
  }
}

fn print_json<T: Serialize>(value: &T) {
  match serde_json::to_string_pretty(value) {
    Ok(json) => println!("{}", json),
    Err(e) => tracing::warn!(error = %e, "Could not serialize command output"),
  }
}
