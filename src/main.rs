use clap::{Parser, Subcommand};
use colored::*;
use ops_analytics::{
    AnalysisReport, AnalyticsEngine, CycleFailure, EngineConfig, EngineEvent, Priority,
    SimulatedCollector,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "ops-analytics")]
#[command(about = "Periodic analytics over operational metrics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, env = "OPS_ANALYTICS_CONFIG")]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine against the simulated collector
    Run {
        /// Stop after this many cycles
        #[arg(short = 'n', long)]
        cycles: Option<u64>,

        /// Cycle interval in seconds (overrides config)
        #[arg(short, long, env = "OPS_ANALYTICS_INTERVAL")]
        interval: Option<u64>,

        /// Chance of an overload spike per sample
        #[arg(long, default_value = "0.1")]
        spike_probability: f64,
    },

    /// Run a single cycle and print the report
    Once {
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default configuration file
    Init {
        /// Output configuration file path
        #[arg(short, long, default_value = "analytics.toml")]
        output: String,
    },

    /// Load and validate a configuration file
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    if cli.json_logs {
        ops_analytics::utils::logging::init_json_logging(log_level)?;
    } else {
        ops_analytics::init_with_logging(log_level).await?;
    }

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        EngineConfig::from_file(config_path)?
    } else {
        EngineConfig::default()
    };

    match cli.command {
        Commands::Run {
            cycles,
            interval,
            spike_probability,
        } => {
            let config = match interval {
                Some(secs) => config.with_cycle_interval(Duration::from_secs(secs)),
                None => config,
            };
            run_engine(config, cycles, spike_probability).await?;
        }
        Commands::Once { json } => {
            run_once(config, json).await?;
        }
        Commands::Init { output } => {
            run_init(output).await?;
        }
        Commands::Validate => {
            run_validate(config, cli.config.as_deref())?;
        }
    }

    Ok(())
}

fn simulated_collector(spike_probability: f64) -> anyhow::Result<Arc<SimulatedCollector>> {
    let collector =
        SimulatedCollector::new(Default::default(), 0.15, spike_probability)?;
    Ok(Arc::new(collector))
}

async fn run_engine(
    config: EngineConfig,
    max_cycles: Option<u64>,
    spike_probability: f64,
) -> anyhow::Result<()> {
    let engine = AnalyticsEngine::new(config, simulated_collector(spike_probability)?)?;
    let (_subscription, mut events) = engine.subscribe_stream().await;

    engine.start().await?;
    println!("{}", "Analytics engine running, press Ctrl-C to stop".bright_cyan().bold());

    let mut seen = 0u64;
    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                match &event {
                    EngineEvent::Report(report) => print_summary(report),
                    EngineEvent::Error(failure) => print_failure(failure),
                }
                seen += 1;
                if max_cycles.is_some_and(|max| seen >= max) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    engine.stop().await?;

    let stats = engine.stats().await;
    println!();
    println!("Engine Statistics:");
    println!("  Cycles completed: {}", stats.cycles_completed);
    println!("  Cycles failed: {}", stats.cycles_failed);
    println!("  Average cycle time: {:.2} ms", stats.avg_cycle_duration_ms);

    Ok(())
}

async fn run_once(config: EngineConfig, json: bool) -> anyhow::Result<()> {
    let engine = AnalyticsEngine::new(config, simulated_collector(0.1)?)?;
    let report = engine.run_cycle().await?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        print_summary(&report);
        print_details(&report);
    }

    Ok(())
}

async fn run_init(output: String) -> anyhow::Result<()> {
    let config = EngineConfig::default();
    config.save_to_file(&output)?;

    println!("Created configuration file: {}", output);
    println!("Edit thresholds and intervals to match your environment.");

    Ok(())
}

fn run_validate(config: EngineConfig, path: Option<&str>) -> anyhow::Result<()> {
    let source = path.unwrap_or("built-in defaults");
    match config.validate() {
        Ok(()) => {
            println!("{} {}", "Configuration is valid:".green(), source);
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "Configuration is invalid:".red(), source);
            Err(e.into())
        }
    }
}

fn health_label(score: u8) -> ColoredString {
    let text = format!("{:>3}", score);
    match score {
        80..=100 => text.green(),
        50..=79 => text.yellow(),
        _ => text.red(),
    }
}

fn print_summary(report: &AnalysisReport) {
    println!(
        "[{}] cycle {:>4}  health {}  anomalies {}  bottlenecks {}/{}/{}  recommendations {}",
        report.timestamp.format("%H:%M:%S"),
        report.cycle,
        health_label(report.overall_health),
        report.anomalies.len(),
        report.bottlenecks.critical.len(),
        report.bottlenecks.warning.len(),
        report.bottlenecks.info.len(),
        report.recommendations.len(),
    );

    for recommendation in report.recommendations_at_least(Priority::High) {
        let tag = match recommendation.priority {
            Priority::Critical => "CRITICAL".red().bold(),
            _ => "HIGH".yellow(),
        };
        println!("    {} {}", tag, recommendation.title);
    }
}

fn print_failure(failure: &CycleFailure) {
    warn!("{}", failure);
    println!(
        "[{}] cycle {:>4}  {} {}",
        failure.timestamp.format("%H:%M:%S"),
        failure.cycle,
        "FAILED".red().bold(),
        failure.message
    );
}

fn print_details(report: &AnalysisReport) {
    let sample = &report.sample;
    println!();
    println!("Sample:");
    println!(
        "  cpu {:.1}%  memory {:.1}%  disk {:.1}%  latency {:.1}ms",
        sample.system.cpu_usage,
        sample.system.memory_usage,
        sample.system.disk_usage,
        sample.system.network_latency
    );
    println!(
        "  response {:.0}ms  errors {:.2}%  throughput {:.0}/s",
        sample.application.response_time,
        sample.application.error_rate,
        sample.application.throughput
    );

    println!();
    println!("Predictions ({}):", report.predictions.model);
    println!("  next hour load: {:.1}%", report.predictions.next_hour_load);
    println!("  next day load: {:.1}%", report.predictions.next_day_load);
    println!("  scaling needed: {}", report.predictions.scaling_needed);

    if report.cost_analysis.waste_detected {
        println!();
        println!(
            "Potential savings: ${:.2}",
            report.cost_analysis.potential_savings
        );
    }

    if !report.security_insights.risks.is_empty() {
        println!();
        println!("Security risk score: {}", report.security_insights.risk_score);
    }

    if !report.recommendations.is_empty() {
        println!();
        println!("Recommendations ({}):", report.recommendations.len());
        for (i, recommendation) in report.recommendations.iter().enumerate() {
            println!(
                "{}. [{}] {}",
                i + 1,
                recommendation.priority,
                recommendation.title
            );
            println!("   {}", recommendation.action);
        }
    }
}
