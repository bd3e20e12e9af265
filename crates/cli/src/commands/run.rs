//! `run` command implementation.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::cli::RunArgs;
use crate::commands::load_blueprint;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let blueprint = load_blueprint(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        observation = %blueprint.observation.id,
        sample_rate = blueprint.observation.sample_rate,
        realtime = blueprint.observation.realtime,
        inputs = blueprint.inputs.len(),
        workers = blueprint.workers.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        blueprint,
        max_periods: if args.periods == 0 {
            None
        } else {
            Some(args.periods)
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    // Shared stop flag, flipped by SIGINT/SIGTERM
    let stop = Arc::new(AtomicBool::new(false));
    install_signal_handler(Arc::clone(&stop));

    info!("Starting pipeline...");

    let pipeline = Pipeline::new(pipeline_config);
    let stats = pipeline.run(stop).context("Pipeline execution failed")?;

    info!(
        periods = stats.periods,
        flagged = stats.sync_metrics.total_flagged,
        duration_secs = stats.duration.as_secs_f64(),
        "Pipeline completed"
    );
    stats.print_summary();

    info!("Station Syncer finished");
    Ok(())
}

#[cfg(unix)]
fn install_signal_handler(stop: Arc<AtomicBool>) {
    use std::sync::atomic::AtomicBool as Flag;

    static SHUTDOWN: Flag = Flag::new(false);

    extern "C" fn handle_signal(_signal: libc::c_int) {
        SHUTDOWN.store(true, Ordering::SeqCst);
    }

    unsafe {
        libc::signal(libc::SIGINT, handle_signal as *const () as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handle_signal as *const () as libc::sighandler_t);
    }

    // Signal handlers may only touch the static flag; a watcher thread
    // propagates it to the pipeline's stop flag.
    std::thread::Builder::new()
        .name("signal-watcher".into())
        .spawn(move || loop {
            if SHUTDOWN.load(Ordering::SeqCst) {
                tracing::warn!("Received shutdown signal, stopping pipeline...");
                stop.store(true, Ordering::SeqCst);
                break;
            }
            if stop.load(Ordering::SeqCst) {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(100));
        })
        .expect("failed to spawn signal watcher");
}

#[cfg(not(unix))]
fn install_signal_handler(_stop: Arc<AtomicBool>) {}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::ObservationBlueprint) {
    let obs = &blueprint.observation;

    println!("\n=== Configuration Summary ===\n");
    println!("Observation:");
    println!("  Id: {}", obs.id);
    println!("  Sample rate: {} Hz", obs.sample_rate);
    println!("  Period: {} samples", obs.period_samples);
    println!(
        "  Mode: {}",
        if obs.realtime { "realtime" } else { "offline" }
    );

    println!("\nInputs ({}):", blueprint.inputs.len());
    for input in &blueprint.inputs {
        println!(
            "  - {} (beam {}, {} subbands)",
            input.stream, input.beam, input.subbands
        );
    }

    println!(
        "\nProcessing sets: {} x {} subbands, {} workers each",
        obs.pset_count, obs.subbands_per_pset, obs.workers_per_pset
    );
    println!();
}
