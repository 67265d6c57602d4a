//! Physical feasibility of the configured voltage transitions.
//!
//! Between the trigger and the glitch the PMIC must slew the rail from the
//! nominal voltage down to the preparation voltage, and then from the
//! preparation voltage to the glitch voltage, each transition bracketed by
//! two voltage-command transmissions. A range whose time budget cannot cover
//! the slew distance will never produce the requested waveform, so campaigns
//! check this before burning bench time.

use std::fmt;

use serde::{Deserialize, Serialize};

use vfi_core::voltage::vid_to_millivolts;
use vfi_core::GlitchSettings;

use crate::range::ParameterSpace;

/// Electrical characteristics of the PMIC driving the target rail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PmicProfile {
    /// Time to transmit one voltage command to the PMIC, in us.
    pub cmd_transmit_us: u32,
    /// Maximum rail slew rate, in mV/us.
    pub slew_rate_mv_per_us: u32,
}

/// TPS65094 PMIC on Up Squared Pentium N4200 boards.
pub const TPS65094: PmicProfile = PmicProfile {
    cmd_transmit_us: 36,
    slew_rate_mv_per_us: 3,
};

/// Which configured range limits a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionBound {
    /// Nominal-to-preparation transition, bounded by the ext_offset range.
    ExtOffset,
    /// Preparation-to-glitch transition, bounded by the width range.
    Width,
}

impl TransitionBound {
    fn as_str(&self) -> &'static str {
        match self {
            TransitionBound::ExtOffset => "ext_offset",
            TransitionBound::Width => "width",
        }
    }
}

/// Diagnostic for a transition that does not fit its time budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeasibilityWarning {
    /// Range limiting the transition.
    pub bound: TransitionBound,
    /// Millivolts the transition aims for.
    pub target_mv: u32,
    /// Millivolt distance the rail must cover.
    pub delta_mv: u32,
    /// Bound value the transition was checked against, in us.
    pub available_us: u32,
    /// Minimum time the transition needs, in us.
    pub required_us: i64,
}

impl fmt::Display for FeasibilityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "target of {}mV (delta {}mV) cannot be reached within {}={}us; required {} >= {}us",
            self.target_mv,
            self.delta_mv,
            self.bound.as_str(),
            self.available_us,
            self.bound.as_str(),
            self.required_us,
        )
    }
}

/// Outcome of a range-level feasibility analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FeasibilityReport {
    /// Transitions that do not fit even at the range's upper bound.
    pub violations: Vec<FeasibilityWarning>,
    /// Transitions that fit only near the upper bound (the lower bound is
    /// too small, so part of the range is wasted).
    pub marginal: Vec<FeasibilityWarning>,
}

impl FeasibilityReport {
    /// True when every transition fits somewhere in its range.
    pub fn is_feasible(&self) -> bool {
        self.violations.is_empty()
    }
}

impl PmicProfile {
    /// Minimum time in us to slew `delta_mv`, after discounting the two
    /// command transmissions bracketing the transition. May be negative for
    /// small deltas, in which case any budget suffices.
    pub fn required_us(&self, delta_mv: u32) -> i64 {
        let slew_us = i64::from(delta_mv.div_ceil(self.slew_rate_mv_per_us));
        slew_us - 2 * i64::from(self.cmd_transmit_us)
    }

    /// Analyzes both transitions of a configured space against this PMIC.
    ///
    /// The worst case is the largest voltage distance: the lowest preparation
    /// voltage against the nominal rail, and the lowest glitch voltage
    /// against the highest preparation voltage.
    pub fn analyze(&self, space: &ParameterSpace, nominal_mv: u32) -> FeasibilityReport {
        let mut report = FeasibilityReport::default();

        let prep_min_mv = vid_mv(space.prep_voltage.start);
        let prep_delta = nominal_mv.abs_diff(prep_min_mv);
        self.check_transition(
            TransitionBound::ExtOffset,
            prep_min_mv,
            prep_delta,
            space.ext_offset.start,
            space.ext_offset.end,
            &mut report,
        );

        let glitch_min_mv = vid_mv(space.voltage.start);
        let prep_max_mv = vid_mv(space.prep_voltage.end);
        let glitch_delta = glitch_min_mv.abs_diff(prep_max_mv);
        self.check_transition(
            TransitionBound::Width,
            glitch_min_mv,
            glitch_delta,
            space.width.start,
            space.width.end,
            &mut report,
        );

        report
    }

    fn check_transition(
        &self,
        bound: TransitionBound,
        target_mv: u32,
        delta_mv: u32,
        lower_us: u32,
        upper_us: u32,
        report: &mut FeasibilityReport,
    ) {
        let required_us = self.required_us(delta_mv);
        let warning = |available_us| FeasibilityWarning {
            bound,
            target_mv,
            delta_mv,
            available_us,
            required_us,
        };
        if required_us > i64::from(upper_us) {
            report.violations.push(warning(upper_us));
        } else if required_us > i64::from(lower_us) {
            report.marginal.push(warning(lower_us));
        }
    }

    /// Range-level feasibility: `Err` carries the hard violations, marginal
    /// findings alone do not fail the check.
    pub fn check_feasibility(
        &self,
        space: &ParameterSpace,
        nominal_mv: u32,
    ) -> Result<(), Vec<FeasibilityWarning>> {
        let report = self.analyze(space, nominal_mv);
        if report.is_feasible() {
            Ok(())
        } else {
            Err(report.violations)
        }
    }

    /// Per-tuple check: can one concrete settings tuple achieve both of its
    /// transitions in the time it allots?
    pub fn check_settings(&self, settings: &GlitchSettings, nominal_mv: u32) -> bool {
        let prep_mv = vid_to_millivolts(settings.prep_voltage);
        let glitch_mv = vid_to_millivolts(settings.voltage);

        let prep_budget = u64::from(self.cmd_transmit_us + settings.ext_offset)
            * u64::from(self.slew_rate_mv_per_us);
        let glitch_budget = u64::from(self.cmd_transmit_us + settings.width)
            * u64::from(self.slew_rate_mv_per_us);

        prep_budget > u64::from(nominal_mv.abs_diff(prep_mv))
            && glitch_budget > u64::from(prep_mv.abs_diff(glitch_mv))
    }
}

fn vid_mv(vid_range_value: u32) -> u32 {
    // Voltage ranges hold VID codes; sampler construction rejects values
    // above one byte.
    vid_to_millivolts(vid_range_value.min(255) as u8)
}
