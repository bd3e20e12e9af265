//! Configuration validation.
//!
//! Rules:
//! - stream ids unique, beam ids unique
//! - every input references an existing beam
//! - sample_rate, period_samples, per-input subbands all positive
//! - input subbands match the pset topology exactly
//! - worker list matches `pset_count * workers_per_pset`, per pset
//!
//! A failed rule aborts startup before any period runs.

use std::collections::HashSet;

use contracts::{ContractError, ObservationBlueprint};

/// Validate an ObservationBlueprint.
///
/// Returns the first rule violation, or Ok(()).
pub fn validate(blueprint: &ObservationBlueprint) -> Result<(), ContractError> {
    validate_observation(blueprint)?;
    validate_stream_ids(blueprint)?;
    validate_beams(blueprint)?;
    validate_inputs(blueprint)?;
    validate_topology(blueprint)?;
    validate_workers(blueprint)?;
    Ok(())
}

/// Global parameter sanity
fn validate_observation(blueprint: &ObservationBlueprint) -> Result<(), ContractError> {
    let obs = &blueprint.observation;
    if obs.sample_rate == 0 {
        return Err(ContractError::config_validation(
            "observation.sample_rate",
            "sample_rate must be > 0",
        ));
    }
    if obs.period_samples == 0 {
        return Err(ContractError::config_validation(
            "observation.period_samples",
            "period_samples must be > 0",
        ));
    }
    if obs.pset_count == 0 || obs.subbands_per_pset == 0 || obs.workers_per_pset == 0 {
        return Err(ContractError::config_validation(
            "observation",
            "pset_count, subbands_per_pset and workers_per_pset must all be > 0",
        ));
    }
    if obs.max_flag_ranges == 0 {
        return Err(ContractError::config_validation(
            "observation.max_flag_ranges",
            "max_flag_ranges must be > 0",
        ));
    }
    Ok(())
}

/// Stream id uniqueness (global)
fn validate_stream_ids(blueprint: &ObservationBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for input in &blueprint.inputs {
        if !seen.insert(input.stream.as_str()) {
            return Err(ContractError::config_validation(
                format!("inputs[stream={}]", input.stream),
                "duplicate stream id",
            ));
        }
    }
    Ok(())
}

/// Beam id uniqueness
fn validate_beams(blueprint: &ObservationBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for beam in &blueprint.beams {
        if !seen.insert(beam.id) {
            return Err(ContractError::config_validation(
                format!("beams[id={}]", beam.id),
                "duplicate beam id",
            ));
        }
    }
    Ok(())
}

/// Per-input sanity and beam references
fn validate_inputs(blueprint: &ObservationBlueprint) -> Result<(), ContractError> {
    if blueprint.inputs.is_empty() {
        return Err(ContractError::config_validation(
            "inputs",
            "at least one input stream is required",
        ));
    }
    for input in &blueprint.inputs {
        if input.subbands == 0 {
            return Err(ContractError::config_validation(
                format!("inputs[{}].subbands", input.stream),
                "subbands must be > 0",
            ));
        }
        if input.samples_per_frame == 0 {
            return Err(ContractError::config_validation(
                format!("inputs[{}].samples_per_frame", input.stream),
                "samples_per_frame must be > 0",
            ));
        }
        if blueprint.beam(input.beam).is_none() {
            return Err(ContractError::config_validation(
                format!("inputs[{}].beam", input.stream),
                format!("beam {} not found", input.beam),
            ));
        }
    }
    Ok(())
}

/// Subband arithmetic: the streams must carry exactly the subbands the
/// processing sets expect.
fn validate_topology(blueprint: &ObservationBlueprint) -> Result<(), ContractError> {
    let carried = blueprint.input_subbands();
    let expected = blueprint.total_subbands();
    if carried != expected {
        return Err(ContractError::config_validation(
            "inputs / observation",
            format!(
                "inputs carry {carried} subbands but pset_count * subbands_per_pset = {expected}"
            ),
        ));
    }
    Ok(())
}

/// Worker list shape: `workers_per_pset` links for each pset.
fn validate_workers(blueprint: &ObservationBlueprint) -> Result<(), ContractError> {
    let obs = &blueprint.observation;
    if blueprint.workers.len() != blueprint.total_workers() {
        return Err(ContractError::config_validation(
            "workers",
            format!(
                "expected {} worker links, found {}",
                blueprint.total_workers(),
                blueprint.workers.len()
            ),
        ));
    }
    for pset in 0..obs.pset_count {
        let count = blueprint.workers.iter().filter(|w| w.pset == pset).count();
        if count != obs.workers_per_pset {
            return Err(ContractError::config_validation(
                format!("workers[pset={pset}]"),
                format!("expected {} links, found {count}", obs.workers_per_pset),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        BeamConfig, ConfigVersion, InputConfig, LinkConfig, ObservationConfig, SourceConfig,
        WorkerConfig,
    };

    fn minimal_blueprint() -> ObservationBlueprint {
        ObservationBlueprint {
            version: ConfigVersion::V1,
            observation: ObservationConfig {
                id: "obs".into(),
                sample_rate: 1000,
                realtime: false,
                period_samples: 100,
                history_samples: 16,
                max_network_delay_samples: 64,
                subbands_per_pset: 2,
                pset_count: 1,
                workers_per_pset: 2,
                delay_batch_periods: 16,
                max_flag_ranges: 16,
                delay_sign: Default::default(),
                dispatch_failure: Default::default(),
            },
            inputs: vec![InputConfig {
                stream: "rsp0".into(),
                beam: 0,
                subbands: 2,
                samples_per_frame: 10,
                source: SourceConfig::Generator {
                    seed: 0,
                    drop_frames: vec![],
                    frames: None,
                },
            }],
            beams: vec![BeamConfig {
                id: 0,
                base_delay_seconds: 0.0,
                delay_rate: 0.0,
            }],
            workers: vec![
                WorkerConfig {
                    pset: 0,
                    link: LinkConfig::Record,
                },
                WorkerConfig {
                    pset: 0,
                    link: LinkConfig::Record,
                },
            ],
        }
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_duplicate_stream_id() {
        let mut bp = minimal_blueprint();
        bp.inputs.push(bp.inputs[0].clone());
        let result = validate(&bp);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("duplicate stream id"), "got: {err}");
    }

    #[test]
    fn test_duplicate_beam_id() {
        let mut bp = minimal_blueprint();
        bp.beams.push(bp.beams[0].clone());
        let result = validate(&bp);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("duplicate beam id"), "got: {err}");
    }

    #[test]
    fn test_unknown_beam_reference() {
        let mut bp = minimal_blueprint();
        bp.inputs[0].beam = 7;
        let result = validate(&bp);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("beam 7 not found"), "got: {err}");
    }

    #[test]
    fn test_subband_arithmetic_mismatch() {
        let mut bp = minimal_blueprint();
        bp.inputs[0].subbands = 3;
        let result = validate(&bp);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("subbands"), "got: {err}");
    }

    #[test]
    fn test_worker_count_mismatch() {
        let mut bp = minimal_blueprint();
        bp.workers.pop();
        let result = validate(&bp);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("worker links"), "got: {err}");
    }

    #[test]
    fn test_worker_pset_mismatch() {
        let mut bp = minimal_blueprint();
        bp.workers[1].pset = 1;
        let result = validate(&bp);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("pset"), "got: {err}");
    }

    #[test]
    fn test_zero_period_rejected() {
        let mut bp = minimal_blueprint();
        bp.observation.period_samples = 0;
        assert!(validate(&bp).is_err());
    }
}
