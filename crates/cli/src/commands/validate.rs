//! `validate` command implementation.

use anyhow::Result;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::commands::load_blueprint;

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    match load_blueprint(&args.config) {
        Ok(blueprint) => {
            if args.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "valid": true,
                        "observation": blueprint.observation.id,
                        "inputs": blueprint.inputs.len(),
                        "beams": blueprint.beams.len(),
                        "workers": blueprint.workers.len(),
                    })
                );
            } else {
                info!(
                    config = %args.config.display(),
                    observation = %blueprint.observation.id,
                    "Configuration is valid"
                );
                println!("OK: {}", args.config.display());
            }
            Ok(())
        }
        Err(e) => {
            if args.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "valid": false,
                        "error": e.to_string(),
                    })
                );
                // JSON consumers read the payload; still exit non-zero.
            }
            Err(e.into())
        }
    }
}
