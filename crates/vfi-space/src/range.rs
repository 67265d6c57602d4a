//! Named parameter ranges forming the campaign search space.

use serde::{Deserialize, Serialize};

use vfi_core::errors::{ErrorInfo, VfiError};
use vfi_core::{GlitchParam, GlitchSettings};

/// Inclusive stepped integer range for one glitch parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterRange {
    /// First value of the range.
    pub start: u32,
    /// Last value of the range (inclusive bound; the largest reachable value
    /// may be lower when the step does not divide the span evenly).
    pub end: u32,
    /// Increment between neighbouring values.
    pub step: u32,
}

impl ParameterRange {
    /// Creates a range, validating `start <= end` and `step >= 1`.
    pub fn new(start: u32, end: u32, step: u32) -> Result<Self, VfiError> {
        if start > end {
            return Err(VfiError::Config(
                ErrorInfo::new("range.bounds", format!("range start {start} exceeds end {end}"))
                    .with_context("start", start.to_string())
                    .with_context("end", end.to_string()),
            ));
        }
        if step == 0 {
            return Err(VfiError::Config(ErrorInfo::new(
                "range.step",
                "range step must be at least 1",
            )));
        }
        Ok(Self { start, end, step })
    }

    /// Single-point range.
    pub fn fixed(value: u32) -> Self {
        Self {
            start: value,
            end: value,
            step: 1,
        }
    }

    /// Number of reachable values.
    pub fn count(&self) -> usize {
        ((self.end - self.start) / self.step + 1) as usize
    }

    /// Iterator over reachable values, in ascending order.
    pub fn values(&self) -> impl Iterator<Item = u32> {
        let range = *self;
        (0..range.count() as u32).map(move |k| range.start + k * range.step)
    }

    /// True when `value` is reachable as `start + k * step` within bounds.
    pub fn contains(&self, value: u32) -> bool {
        value >= self.start && value <= self.end && (value - self.start) % self.step == 0
    }
}

impl Default for ParameterRange {
    fn default() -> Self {
        Self::fixed(0)
    }
}

/// The four configured ranges for a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ParameterSpace {
    /// Trigger-to-glitch delay range, in us.
    pub ext_offset: ParameterRange,
    /// Glitch width range, in us.
    pub width: ParameterRange,
    /// Glitch voltage VID range.
    pub voltage: ParameterRange,
    /// Preparation voltage VID range.
    pub prep_voltage: ParameterRange,
}

impl ParameterSpace {
    /// Builds a space from the four ranges.
    pub fn new(
        ext_offset: ParameterRange,
        width: ParameterRange,
        voltage: ParameterRange,
        prep_voltage: ParameterRange,
    ) -> Self {
        Self {
            ext_offset,
            width,
            voltage,
            prep_voltage,
        }
    }

    /// Replaces the bounds of a named parameter, keeping its step.
    pub fn set_range(&mut self, name: &str, start: u32, end: u32) -> Result<(), VfiError> {
        let param = GlitchParam::from_name(name)?;
        let current = self.range_mut(param);
        *current = ParameterRange::new(start, end, current.step)?;
        Ok(())
    }

    /// Replaces the step of a named parameter, keeping its bounds.
    pub fn set_step(&mut self, name: &str, step: u32) -> Result<(), VfiError> {
        let param = GlitchParam::from_name(name)?;
        let current = self.range_mut(param);
        *current = ParameterRange::new(current.start, current.end, step)?;
        Ok(())
    }

    /// Range backing the given parameter.
    pub fn range(&self, param: GlitchParam) -> &ParameterRange {
        match param {
            GlitchParam::ExtOffset => &self.ext_offset,
            GlitchParam::Width => &self.width,
            GlitchParam::Voltage => &self.voltage,
            GlitchParam::PrepVoltage => &self.prep_voltage,
        }
    }

    fn range_mut(&mut self, param: GlitchParam) -> &mut ParameterRange {
        match param {
            GlitchParam::ExtOffset => &mut self.ext_offset,
            GlitchParam::Width => &mut self.width,
            GlitchParam::Voltage => &mut self.voltage,
            GlitchParam::PrepVoltage => &mut self.prep_voltage,
        }
    }

    /// Total number of combinations in the stepped product.
    pub fn combination_count(&self) -> usize {
        GlitchParam::ALL
            .iter()
            .map(|param| self.range(*param).count())
            .product()
    }

    /// True when every field of `settings` is reachable in this space.
    pub fn contains(&self, settings: &GlitchSettings) -> bool {
        GlitchParam::ALL
            .iter()
            .all(|param| self.range(*param).contains(settings.value(*param)))
    }
}
