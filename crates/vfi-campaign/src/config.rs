//! Campaign configuration surface.
//!
//! An external CLI or config layer builds these structs; every field has a
//! serde default so partial configurations deserialize cleanly.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use vfi_core::GlitchResultKind;
use vfi_space::ParameterSpace;

/// Which sampling strategy drives the campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SamplerKind {
    /// Shuffled full Cartesian product; every combination exactly once.
    Exhaustive,
    /// Unbounded independent uniform draws; combinations may repeat.
    Infinite,
}

/// Early-stop behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StopFlags {
    /// Stop the campaign on the first `Success` classification.
    #[serde(default)]
    pub on_success: bool,
    /// Stop the campaign on the first `HalfSuccess` classification.
    #[serde(default)]
    pub on_half_success: bool,
}

/// Power-cycle-and-ping retry policy for target recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryPolicy {
    /// Maximum target ping attempts after a power cycle.
    #[serde(default = "default_recovery_attempts")]
    pub attempts: u32,
    /// Delay between ping attempts, in milliseconds.
    #[serde(default = "default_recovery_delay_ms")]
    pub delay_ms: u64,
    /// Serial timeout per ping attempt, in milliseconds.
    #[serde(default = "default_ping_timeout_ms")]
    pub per_attempt_timeout_ms: u64,
}

fn default_recovery_attempts() -> u32 {
    15
}

fn default_recovery_delay_ms() -> u64 {
    100
}

fn default_ping_timeout_ms() -> u64 {
    500
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            attempts: default_recovery_attempts(),
            delay_ms: default_recovery_delay_ms(),
            per_attempt_timeout_ms: default_ping_timeout_ms(),
        }
    }
}

impl RecoveryPolicy {
    /// Delay between ping attempts.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Serial timeout per ping attempt.
    pub fn per_attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.per_attempt_timeout_ms)
    }
}

/// Full configuration consumed by the campaign loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Target operation name, resolved through the profile registry.
    pub op_name: String,
    /// Parameter search space.
    pub space: ParameterSpace,
    /// Nominal core voltage of the target, in millivolts.
    #[serde(default = "default_nominal_mv")]
    pub nominal_mv: u32,
    /// Sampling strategy.
    #[serde(default = "default_sampler")]
    pub sampler: SamplerKind,
    /// Seed for the sampler's randomness.
    #[serde(default)]
    pub seed: u64,
    /// Early-stop flags.
    #[serde(default)]
    pub stop: StopFlags,
    /// Result kinds that trigger automatic target recovery.
    #[serde(default = "default_recovery_triggers")]
    pub recovery_triggers: Vec<GlitchResultKind>,
    /// Recovery retry policy.
    #[serde(default)]
    pub recovery: RecoveryPolicy,
    /// Skip the preflight liveness and loop-duration checks (bench setups
    /// without a trigger loop).
    #[serde(default)]
    pub skip_preflight: bool,
}

fn default_nominal_mv() -> u32 {
    1240
}

fn default_sampler() -> SamplerKind {
    SamplerKind::Infinite
}

fn default_recovery_triggers() -> Vec<GlitchResultKind> {
    vec![
        GlitchResultKind::Reset,
        GlitchResultKind::Broken,
        GlitchResultKind::HalfSuccess,
    ]
}

impl CampaignConfig {
    /// Minimal configuration for the given target and space.
    pub fn new(op_name: impl Into<String>, space: ParameterSpace) -> Self {
        Self {
            op_name: op_name.into(),
            space,
            nominal_mv: default_nominal_mv(),
            sampler: default_sampler(),
            seed: 0,
            stop: StopFlags::default(),
            recovery_triggers: default_recovery_triggers(),
            recovery: RecoveryPolicy::default(),
            skip_preflight: false,
        }
    }
}
