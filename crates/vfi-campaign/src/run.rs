//! Campaign orchestration: preflight, sampling loop, shutdown.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use vfi_core::errors::{ErrorInfo, VfiError};
use vfi_core::{target, CampaignRecord, GlitchResultKind, GlitchSettings};
use vfi_link::{DeviceLink, Transport};
use vfi_space::{sample_exhaustive, sample_infinite, TPS65094};

use crate::cancel::CancelToken;
use crate::config::{CampaignConfig, SamplerKind};
use crate::power::PowerSupply;
use crate::recovery;
use crate::store::ResultStore;

const RATE_REPORT_EVERY: u64 = 5;

/// Why a campaign loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopCause {
    /// The sampler ran out of combinations.
    SpaceExhausted,
    /// An early-stop flag matched a classification.
    EarlyStop(GlitchResultKind),
    /// The cancellation token was raised.
    Cancelled,
}

/// Summary returned after a clean campaign exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSummary {
    /// Completed attempts.
    pub iterations: u64,
    /// Attempts per classification name.
    pub counts: BTreeMap<String, u64>,
    /// Wall-clock seconds the loop ran.
    pub elapsed_seconds: f64,
    /// Iterations per second.
    pub rate: f64,
    /// Why the loop stopped.
    pub stop: StopCause,
}

/// Runs one campaign to completion.
///
/// Every attempt is persisted before any reaction to it; a protocol failure
/// aborts immediately without persisting the broken attempt. On any exit,
/// clean or fatal, the target is left in the state the stop semantics ask
/// for: untouched after an early stop or exhausted space, powered off after
/// cancellation or a fatal error.
pub fn run<T, S, P>(
    config: &CampaignConfig,
    link: &mut DeviceLink<T>,
    store: &mut S,
    psu: &mut P,
    cancel: &CancelToken,
) -> Result<CampaignSummary, VfiError>
where
    T: Transport,
    S: ResultStore,
    P: PowerSupply,
{
    let outcome = drive(config, link, store, psu, cancel);
    if outcome.is_err() {
        // Best effort: the original failure stays the reported one.
        if let Err(off_err) = psu.set_on(false) {
            warn!(error = %off_err, "could not switch power supply off");
        }
    }
    outcome
}

fn drive<T, S, P>(
    config: &CampaignConfig,
    link: &mut DeviceLink<T>,
    store: &mut S,
    psu: &mut P,
    cancel: &CancelToken,
) -> Result<CampaignSummary, VfiError>
where
    T: Transport,
    S: ResultStore,
    P: PowerSupply,
{
    let profile = target::lookup(&config.op_name)?;
    if profile.op_name != link.profile().op_name {
        return Err(VfiError::Config(
            ErrorInfo::new(
                "campaign.profile_mismatch",
                format!(
                    "campaign targets {} but the link was built for {}",
                    profile.op_name,
                    link.profile().op_name
                ),
            )
            .with_context("config", profile.op_name)
            .with_context("link", link.profile().op_name),
        ));
    }

    if !config.skip_preflight {
        preflight(config, link, psu)?;
    }

    let sampler: Box<dyn Iterator<Item = GlitchSettings>> = match config.sampler {
        SamplerKind::Exhaustive => Box::new(sample_exhaustive(&config.space, config.seed)?),
        SamplerKind::Infinite => Box::new(sample_infinite(
            &config.space,
            &TPS65094,
            config.nominal_mv,
            config.seed,
        )?),
    };

    info!(
        op_name = %config.op_name,
        combinations = config.space.combination_count(),
        "campaign started"
    );

    let started = Instant::now();
    let mut iterations: u64 = 0;
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut stop = StopCause::SpaceExhausted;

    for settings in sampler {
        if cancel.is_cancelled() {
            stop = StopCause::Cancelled;
            break;
        }

        let (result, payload) = link.arm_and_read(&settings)?;
        iterations += 1;
        *counts.entry(result.as_str().to_string()).or_insert(0) += 1;

        store.append(&CampaignRecord {
            settings,
            result,
            payload,
        })?;

        if (config.stop.on_success && result == GlitchResultKind::Success)
            || (config.stop.on_half_success && result == GlitchResultKind::HalfSuccess)
        {
            info!(?settings, kind = result.as_str(), "early stop hit");
            stop = StopCause::EarlyStop(result);
            break;
        }

        if config.recovery_triggers.contains(&result) {
            recovery::recover(link, psu, &config.recovery)?;
        }

        if iterations % RATE_REPORT_EVERY == 0 {
            let elapsed = started.elapsed().as_secs_f64();
            info!(
                iterations,
                rate = iterations as f64 / elapsed,
                "campaign progress"
            );
        }
    }

    let elapsed_seconds = started.elapsed().as_secs_f64();
    store.add_runtime(elapsed_seconds)?;
    if stop == StopCause::Cancelled {
        psu.set_on(false)?;
    }

    let rate = if elapsed_seconds > 0.0 {
        iterations as f64 / elapsed_seconds
    } else {
        0.0
    };
    info!(iterations, ?stop, "campaign finished");
    Ok(CampaignSummary {
        iterations,
        counts,
        elapsed_seconds,
        rate,
        stop,
    })
}

/// Brings the bench to a known state and checks the configured glitch
/// window against the target's measured trigger period.
fn preflight<T, P>(
    config: &CampaignConfig,
    link: &mut DeviceLink<T>,
    psu: &mut P,
) -> Result<(), VfiError>
where
    T: Transport,
    P: PowerSupply,
{
    psu.power_cycle()?;
    if !link.ping()? {
        return Err(VfiError::Protocol(ErrorInfo::new(
            "preflight.probe",
            "probe did not answer ping",
        )));
    }
    if !link.ping_target(
        config.recovery.attempts,
        config.recovery.delay(),
        config.recovery.per_attempt_timeout(),
    )? {
        return Err(VfiError::TargetUnresponsive(ErrorInfo::new(
            "preflight.target",
            "target did not answer ping",
        )));
    }

    let loop_us = link.measure_loop_duration()?;
    if loop_us <= 0 {
        return Err(VfiError::Config(
            ErrorInfo::new(
                "preflight.loop_duration",
                format!("implausible loop duration {loop_us}us"),
            )
            .with_hint("the probe saw no stable trigger period"),
        ));
    }
    let window = u64::from(config.space.ext_offset.end) + u64::from(config.space.width.end);
    if window > loop_us as u64 {
        return Err(VfiError::Config(
            ErrorInfo::new(
                "preflight.window",
                format!("glitch window {window}us exceeds the {loop_us}us trigger period"),
            )
            .with_context("ext_offset_end", config.space.ext_offset.end.to_string())
            .with_context("width_end", config.space.width.end.to_string()),
        ));
    }
    info!(loop_us, "preflight passed");
    Ok(())
}
