//! Glitch parameter identifiers and per-attempt settings.

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, VfiError};

/// Identifier for one of the four tunable glitch parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlitchParam {
    /// Delay between trigger detection and glitch application, in us.
    ExtOffset,
    /// Duration the glitch voltage is held, in us.
    Width,
    /// Glitch voltage VID code.
    Voltage,
    /// Preparation voltage VID code applied before the glitch.
    PrepVoltage,
}

impl GlitchParam {
    /// All parameters, in the fixed order the device link applies them.
    pub const ALL: [GlitchParam; 4] = [
        GlitchParam::ExtOffset,
        GlitchParam::Width,
        GlitchParam::Voltage,
        GlitchParam::PrepVoltage,
    ];

    /// Configuration-surface name of the parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            GlitchParam::ExtOffset => "ext_offset",
            GlitchParam::Width => "width",
            GlitchParam::Voltage => "voltage",
            GlitchParam::PrepVoltage => "prep_voltage",
        }
    }

    /// Resolves a configuration-surface name to a parameter identifier.
    pub fn from_name(name: &str) -> Result<Self, VfiError> {
        match name {
            "ext_offset" => Ok(GlitchParam::ExtOffset),
            "width" => Ok(GlitchParam::Width),
            "voltage" => Ok(GlitchParam::Voltage),
            "prep_voltage" => Ok(GlitchParam::PrepVoltage),
            _ => Err(VfiError::UnknownParameter(
                ErrorInfo::new("param.unknown", format!("parameter {name} not found"))
                    .with_context("name", name)
                    .with_hint("known parameters: ext_offset, width, voltage, prep_voltage"),
            )),
        }
    }
}

/// Settings tuple for a single glitch attempt.
///
/// Produced by a sampler, applied once by the device link, then persisted
/// alongside the classified outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GlitchSettings {
    /// Trigger-to-glitch delay in microseconds.
    pub ext_offset: u32,
    /// Glitch hold time in microseconds.
    pub width: u32,
    /// Glitch voltage VID.
    pub voltage: u8,
    /// Preparation voltage VID.
    pub prep_voltage: u8,
}

impl GlitchSettings {
    /// Value of the given parameter, widened to `u32`.
    pub fn value(&self, param: GlitchParam) -> u32 {
        match param {
            GlitchParam::ExtOffset => self.ext_offset,
            GlitchParam::Width => self.width,
            GlitchParam::Voltage => u32::from(self.voltage),
            GlitchParam::PrepVoltage => u32::from(self.prep_voltage),
        }
    }
}
