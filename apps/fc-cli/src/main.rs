use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use fc_config::{ServiceConfig, load_config, validate_config};
use fc_core::timing::TICK_TIMING;
use fc_core::{SystemClock, WriteMode};
use fc_platform::{BUILTIN_PLATFORMS, DEFAULT_FRUID_PATH, PlatformRegistry, SimPlatform};
use fc_service::{
    FanService, RunnerOptions, ServiceResult, ServiceRunner, TickReport, build_bus,
    simulated_sensors,
};
use fc_telemetry::SimulatedSource;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fan-service")]
#[command(about = "Fan control service - telemetry-driven fan speed control", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a service configuration file
    Validate {
        /// Path to the YAML or JSON config
        config_path: PathBuf,
    },
    /// List supported platforms
    Platforms,
    /// Run the control loop
    Run {
        /// Path to the YAML or JSON config
        config_path: PathBuf,
        /// Compute and log outputs without writing fans
        #[arg(long)]
        simulate: bool,
        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
        /// Tick period in milliseconds (defaults to the fetch frequency)
        #[arg(long)]
        period_ms: Option<u64>,
        /// Platform name, overriding config and FRU detection
        #[arg(long)]
        platform: Option<String>,
        /// FRU dump used for platform detection
        #[arg(long, default_value = DEFAULT_FRUID_PATH)]
        fruid: PathBuf,
        /// Print the final tick report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ServiceResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Platforms => cmd_platforms(),
        Commands::Run {
            config_path,
            simulate,
            ticks,
            period_ms,
            platform,
            fruid,
            json,
        } => cmd_run(
            &config_path,
            RunArgs {
                simulate,
                ticks,
                period: period_ms.map(Duration::from_millis),
                platform,
                fruid,
                json,
            },
        ),
    }
}

fn cmd_validate(config_path: &Path) -> ServiceResult<()> {
    println!("Validating config: {}", config_path.display());
    let config = load_config(config_path)?;
    validate_config(&config)?;
    println!(
        "✓ Config is valid ({} zones, {} sensors, fetch every {}s)",
        config.zones.len(),
        config.sensor_names().len(),
        config.fetch_frequency_s
    );
    Ok(())
}

fn cmd_platforms() -> ServiceResult<()> {
    println!("Supported platforms:");
    for descriptor in BUILTIN_PLATFORMS {
        let leds = if descriptor.has_leds { ", LEDs" } else { "" };
        println!("  {} ({}{})", descriptor.name, descriptor.asic, leds);
    }
    println!("  {} (no hardware)", SimPlatform::NAME);
    Ok(())
}

struct RunArgs {
    simulate: bool,
    ticks: Option<u64>,
    period: Option<Duration>,
    platform: Option<String>,
    fruid: PathBuf,
    json: bool,
}

fn cmd_run(config_path: &Path, args: RunArgs) -> ServiceResult<()> {
    let config = load_config(config_path)?;
    validate_config(&config)?;

    let registry = PlatformRegistry::with_builtin();
    let override_name = args.platform.as_deref().or(config.platform.as_deref());
    let platform = registry.resolve(override_name, &args.fruid)?;
    println!(
        "Platform: {} ({})",
        platform.name(),
        platform.product_info().identity()
    );

    let clock = Arc::new(SystemClock);
    let built = build_bus(&config.bus);
    let _source = start_simulation(&config, &built.memory, clock.clone())?;

    let service = Arc::new(FanService::from_platform(
        config,
        built.bus,
        platform.as_ref(),
        clock,
    )?);
    if args.simulate {
        service.write_mode().set(WriteMode::Simulate);
    }

    let first = service.kickstart()?;
    print_status(&first);

    let mut options = RunnerOptions::for_service(&service);
    if let Some(period) = args.period {
        options.period = period;
    }
    // Kickstart already ran the first tick.
    options.max_ticks = args.ticks.map(|n| n.saturating_sub(1));
    if options.max_ticks == Some(0) {
        return finish(&service, args.json);
    }

    let mut runner = ServiceRunner::start(Arc::clone(&service), options)?;
    let mut printed = first.tick;
    while !runner.is_finished() {
        thread::sleep(options.period.min(Duration::from_secs(1)));
        if let Some(report) = service.last_tick() {
            if report.tick > printed {
                print_status(&report);
                printed = report.tick;
            }
        }
    }
    let ran = runner.wait();
    info!(ticks = ran + 1, "control loop finished");
    finish(&service, args.json)
}

/// Feed the in-memory bus from the configured simulated sensors.
fn start_simulation(
    config: &ServiceConfig,
    memory: &Option<fc_telemetry::InMemoryBus>,
    clock: Arc<SystemClock>,
) -> ServiceResult<Option<SimulatedSource>> {
    let Some(memory) = memory else {
        return Ok(None);
    };
    let sensors = simulated_sensors(&config.simulation);
    if sensors.is_empty() {
        warn!("memory bus without simulated sensors, every zone will run fail-safe");
        return Ok(None);
    }
    let source = SimulatedSource::start(
        memory.clone(),
        config.bus.namespace.clone(),
        sensors,
        Duration::from_millis(config.simulation.interval_ms),
        clock,
    )?;
    Ok(Some(source))
}

fn finish(service: &FanService, json: bool) -> ServiceResult<()> {
    let last = service.last_tick();
    service.shutdown();
    if json {
        if let Some(report) = last {
            let out = serde_json::to_string_pretty(report.as_ref())
                .map_err(|e| std::io::Error::other(e.to_string()))?;
            println!("{out}");
        }
    }
    println!(
        "✓ Service stopped after {} ticks (avg {:.2} ms, max {:.2} ms)",
        TICK_TIMING.count(),
        TICK_TIMING.average_seconds() * 1000.0,
        TICK_TIMING.max_seconds() * 1000.0
    );
    Ok(())
}

fn print_status(report: &TickReport) {
    let at = DateTime::<Utc>::from_timestamp(report.completed_at as i64, 0)
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| report.completed_at.to_string());
    let outputs = report
        .zones
        .iter()
        .map(|z| {
            let flag = if z.decision.is_fail_safe() {
                "!"
            } else if z.actuation.alerting {
                "?"
            } else {
                ""
            };
            format!("{}={:.1}%{}", z.decision.zone, z.decision.output, flag)
        })
        .collect::<Vec<_>>()
        .join(" ");
    println!(
        "[{at}] tick {} ({:?}, {} sensors): {}",
        report.tick, report.write_mode, report.sensors_seen, outputs
    );
}
