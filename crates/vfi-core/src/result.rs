//! Glitch outcome classification and persisted records.

use serde::{Deserialize, Serialize};

use crate::settings::GlitchSettings;

/// Classified outcome of one glitch attempt.
///
/// Every kind is expected experimental data, persisted as-is; none of them
/// is an error. Which kinds stop a campaign or trigger target recovery is
/// decided by the campaign configuration, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GlitchResultKind {
    /// Target reset during the glitch.
    Reset,
    /// Target survived and its return values look ordinary.
    Normal,
    /// Target survived but misbehaved in an unclassified way.
    Weird,
    /// The profile's success predicate matched the return values.
    Success,
    /// Partial corruption reported by some probe firmware builds.
    HalfSuccess,
    /// The probe could not run the attempt (no trigger, PMIC write failed).
    Broken,
    /// Target did not come back at all.
    Dead,
}

impl GlitchResultKind {
    /// Stable name used in persisted records.
    pub fn as_str(&self) -> &'static str {
        match self {
            GlitchResultKind::Reset => "RESET",
            GlitchResultKind::Normal => "NORMAL",
            GlitchResultKind::Weird => "WEIRD",
            GlitchResultKind::Success => "SUCCESS",
            GlitchResultKind::HalfSuccess => "HALF_SUCCESS",
            GlitchResultKind::Broken => "BROKEN",
            GlitchResultKind::Dead => "DEAD",
        }
    }
}

/// Auxiliary data attached to a classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultPayload {
    /// Decoded little-endian words, one per profile return value.
    Words(Vec<u32>),
    /// Raw undecoded bytes.
    Raw(Vec<u8>),
}

/// Persisted unit describing one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignRecord {
    /// Settings applied for the attempt.
    pub settings: GlitchSettings,
    /// Classified outcome.
    pub result: GlitchResultKind,
    /// Optional payload returned with the outcome.
    pub payload: Option<ResultPayload>,
}
