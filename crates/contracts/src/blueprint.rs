//! ObservationBlueprint - the observation configuration tree.
//!
//! Supplied once at startup by the observation configuration, immutable
//! thereafter. Describes the input streams (one per capture board), the
//! beams they belong to, the processing-set/worker topology and the global
//! timing parameters.

use serde::{Deserialize, Serialize};

use crate::{DelaySign, SampleClock, StreamId};

/// Blueprint format version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigVersion {
    /// Initial format
    #[default]
    #[serde(rename = "1")]
    V1,
}

/// Root configuration object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationBlueprint {
    /// Format version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Global observation parameters
    pub observation: ObservationConfig,

    /// Input streams, one per physical capture board
    pub inputs: Vec<InputConfig>,

    /// Logical beams (pointing directions) referenced by inputs
    pub beams: Vec<BeamConfig>,

    /// Compute worker links, `pset_count * workers_per_pset` of them
    pub workers: Vec<WorkerConfig>,
}

/// Global observation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationConfig {
    /// Observation identifier (logging only)
    pub id: String,

    /// Sample rate in samples per second, process-wide and fixed
    pub sample_rate: u64,

    /// Live operation: realtime scheduling, bounded reader waits,
    /// overwrite-without-block on writer/reader contention
    #[serde(default)]
    pub realtime: bool,

    /// Integration period length in samples
    pub period_samples: usize,

    /// History samples retained behind the live window (filter warm-up)
    #[serde(default = "default_history_samples")]
    pub history_samples: usize,

    /// Network jitter absorbed by each input channel, in samples.
    /// Also the reader-wait bound in realtime mode.
    pub max_network_delay_samples: usize,

    /// Subbands processed by each processing set
    pub subbands_per_pset: usize,

    /// Number of processing sets
    pub pset_count: usize,

    /// Compute workers per processing set
    pub workers_per_pset: usize,

    /// Periods covered by one delay-oracle batch call
    #[serde(default = "default_delay_batch_periods")]
    pub delay_batch_periods: usize,

    /// Maximum flag ranges per metadata record (wire-size bound)
    #[serde(default = "default_max_flag_ranges")]
    pub max_flag_ranges: usize,

    /// Coarse-shift sign convention
    #[serde(default)]
    pub delay_sign: DelaySign,

    /// Policy for dispatch transport failures
    #[serde(default)]
    pub dispatch_failure: DispatchFailurePolicy,
}

fn default_history_samples() -> usize {
    16
}

fn default_delay_batch_periods() -> usize {
    16
}

fn default_max_flag_ranges() -> usize {
    16
}

/// One physical input stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Stream identifier
    pub stream: StreamId,

    /// Owning beam id
    pub beam: u32,

    /// Subbands carried by this stream
    pub subbands: usize,

    /// Samples per subband per frame on this stream
    pub samples_per_frame: u16,

    /// Where the frames come from
    pub source: SourceConfig,
}

/// Frame source selection for one input stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// UDP socket bound to `listen`
    Udp {
        /// Bind address, e.g. "0.0.0.0:4346"
        listen: String,
    },
    /// Deterministic in-process generator (offline and test operation)
    Generator {
        /// Seed for the generated sample values
        #[serde(default)]
        seed: u64,
        /// Frame indices the generator silently skips (scripted loss)
        #[serde(default)]
        drop_frames: Vec<u64>,
        /// Frames to produce before end of stream (absent = endless)
        #[serde(default)]
        frames: Option<u64>,
    },
}

/// One logical beam.
///
/// The base delay and drift feed the built-in linear oracle used for
/// offline operation; a live deployment injects its own `DelayOracle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeamConfig {
    /// Beam id referenced by inputs
    pub id: u32,

    /// Accumulated delay at observation start, in seconds
    #[serde(default)]
    pub base_delay_seconds: f64,

    /// Delay drift in seconds per second
    #[serde(default)]
    pub delay_rate: f64,
}

/// One compute worker link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Owning processing set
    pub pset: usize,

    /// Transport for this link
    pub link: LinkConfig,
}

/// Link transport selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkConfig {
    /// TCP connection to `addr`
    Tcp {
        /// Worker address, e.g. "10.0.1.7:5000"
        addr: String,
    },
    /// In-memory recording link (tests, dry runs)
    Record,
}

/// Policy applied when a worker link write fails mid-period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchFailurePolicy {
    /// Abort the pipeline
    #[default]
    Fatal,
    /// Retry the subband once, then skip it
    Retry,
    /// Skip the subband and continue the period
    Skip,
}

impl ObservationBlueprint {
    /// Sample clock for this observation.
    pub fn clock(&self) -> SampleClock {
        SampleClock::new(self.observation.sample_rate)
    }

    /// Total subbands across all processing sets.
    pub fn total_subbands(&self) -> usize {
        self.observation.pset_count * self.observation.subbands_per_pset
    }

    /// Total compute workers expected.
    pub fn total_workers(&self) -> usize {
        self.observation.pset_count * self.observation.workers_per_pset
    }

    /// Subbands carried by the input streams.
    pub fn input_subbands(&self) -> usize {
        self.inputs.iter().map(|i| i.subbands).sum()
    }

    /// Per-subband channel capacity each input channel is provisioned with:
    /// the period itself, history on both flanks, and network-jitter slack.
    pub fn channel_capacity(&self) -> usize {
        let obs = &self.observation;
        obs.period_samples + 2 * obs.history_samples + obs.max_network_delay_samples
    }

    /// Look up a beam by id.
    pub fn beam(&self, id: u32) -> Option<&BeamConfig> {
        self.beams.iter().find(|b| b.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_config_tagged_serde() {
        let udp: SourceConfig = serde_json::from_str(
            r#"{ "kind": "udp", "listen": "0.0.0.0:4346" }"#,
        )
        .unwrap();
        assert!(matches!(udp, SourceConfig::Udp { .. }));

        let generator: SourceConfig =
            serde_json::from_str(r#"{ "kind": "generator", "seed": 7 }"#).unwrap();
        match generator {
            SourceConfig::Generator {
                seed,
                drop_frames,
                frames,
            } => {
                assert_eq!(seed, 7);
                assert!(drop_frames.is_empty());
                assert!(frames.is_none());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_dispatch_policy_default_is_fatal() {
        assert_eq!(DispatchFailurePolicy::default(), DispatchFailurePolicy::Fatal);
    }
}
