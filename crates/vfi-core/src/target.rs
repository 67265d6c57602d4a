//! Target firmware profiles and the operation registry.
//!
//! Profiles describe the class of code running on the target under test:
//! which values it reports back after a glitch window, whether it needs the
//! slow ping variant, and what counts as a successful fault. The table is
//! flat and static; a campaign selects exactly one profile by name.

use crate::errors::{ErrorInfo, VfiError};

/// Success predicate evaluated over the decoded return values.
pub type SuccessPredicate = fn(&[u32]) -> bool;

/// Descriptor for a class of code running on the target.
#[derive(Clone, Copy)]
pub struct TargetProfile {
    /// Operation name used to select the profile.
    pub op_name: &'static str,
    /// Ordered names of the values the target reports after an attempt.
    pub return_values: &'static [&'static str],
    /// Whether the target needs the slow ping variant (long-running loops).
    pub is_slow: bool,
    /// Predicate deciding whether a decoded tuple counts as a success.
    pub success: SuccessPredicate,
}

impl TargetProfile {
    /// Number of 32-bit words the target sends back after an attempt.
    pub fn return_count(&self) -> usize {
        self.return_values.len()
    }

    /// Applies the success predicate to a decoded tuple.
    pub fn is_success(&self, values: &[u32]) -> bool {
        (self.success)(values)
    }
}

impl std::fmt::Debug for TargetProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetProfile")
            .field("op_name", &self.op_name)
            .field("return_values", &self.return_values)
            .field("is_slow", &self.is_slow)
            .finish_non_exhaustive()
    }
}

fn fault_count_positive(values: &[u32]) -> bool {
    values.first().is_some_and(|count| *count > 0)
}

static PROFILES: &[TargetProfile] = &[
    TargetProfile {
        op_name: "mul",
        return_values: &["fault_count", "result_a", "result_b"],
        is_slow: false,
        success: fault_count_positive,
    },
    TargetProfile {
        op_name: "load",
        return_values: &["fault_count", "wrong_value"],
        is_slow: false,
        success: fault_count_positive,
    },
    TargetProfile {
        op_name: "cmp",
        return_values: &["fault_count"],
        is_slow: false,
        success: fault_count_positive,
    },
    TargetProfile {
        op_name: "rdrand-sub",
        return_values: &["fault_count"],
        is_slow: false,
        success: fault_count_positive,
    },
    TargetProfile {
        op_name: "ucode",
        return_values: &["fault_count"],
        is_slow: true,
        success: fault_count_positive,
    },
];

/// Looks up a profile by operation name.
pub fn lookup(op_name: &str) -> Result<&'static TargetProfile, VfiError> {
    PROFILES
        .iter()
        .find(|profile| profile.op_name == op_name)
        .ok_or_else(|| {
            VfiError::UnknownTarget(
                ErrorInfo::new("target.unknown", format!("no target named {op_name}"))
                    .with_context("op_name", op_name)
                    .with_hint(format!("registered targets: {}", op_names().join(", "))),
            )
        })
}

/// Names of all registered target operations.
pub fn op_names() -> Vec<&'static str> {
    PROFILES.iter().map(|profile| profile.op_name).collect()
}
