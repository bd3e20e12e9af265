//! `info` command implementation.

use anyhow::Result;

use contracts::{LinkConfig, SourceConfig};

use crate::cli::InfoArgs;
use crate::commands::load_blueprint;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let blueprint = load_blueprint(&args.config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&blueprint)?);
        return Ok(());
    }

    let obs = &blueprint.observation;

    println!("Observation: {}", obs.id);
    println!("  Sample rate: {} Hz", obs.sample_rate);
    println!("  Period: {} samples", obs.period_samples);
    println!("  History: {} samples", obs.history_samples);
    println!("  Max network delay: {} samples", obs.max_network_delay_samples);
    println!(
        "  Mode: {}",
        if obs.realtime { "realtime" } else { "offline" }
    );
    println!(
        "  Topology: {} psets x {} subbands, {} workers per pset",
        obs.pset_count, obs.subbands_per_pset, obs.workers_per_pset
    );
    println!(
        "  Streams: {} carrying {} subbands",
        blueprint.inputs.len(),
        blueprint.input_subbands()
    );
    println!("  Beams: {}", blueprint.beams.len());

    if args.inputs {
        println!("\nInputs:");
        for input in &blueprint.inputs {
            let source = match &input.source {
                SourceConfig::Udp { listen } => format!("udp {listen}"),
                SourceConfig::Generator { seed, .. } => format!("generator seed={seed}"),
            };
            println!(
                "  - {}: beam {}, {} subbands, {} samples/frame, {}",
                input.stream, input.beam, input.subbands, input.samples_per_frame, source
            );
        }
    }

    if args.workers {
        println!("\nWorkers:");
        for (index, worker) in blueprint.workers.iter().enumerate() {
            let link = match &worker.link {
                LinkConfig::Tcp { addr } => format!("tcp {addr}"),
                LinkConfig::Record => "record".to_string(),
            };
            println!("  - w{index}: pset {}, {}", worker.pset, link);
        }
    }

    Ok(())
}
