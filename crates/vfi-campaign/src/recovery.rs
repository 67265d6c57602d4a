//! Target recovery after destructive glitch outcomes.

use tracing::{info, warn};

use vfi_core::errors::{ErrorInfo, VfiError};
use vfi_link::{DeviceLink, Transport};

use crate::config::RecoveryPolicy;
use crate::power::PowerSupply;

/// Power-cycles the target and waits for it to answer pings again.
///
/// This bounded retry is the only implicit retry in the engine. A target
/// that stays silent through every attempt ends the campaign with
/// [`VfiError::TargetUnresponsive`].
pub fn recover<T: Transport, P: PowerSupply>(
    link: &mut DeviceLink<T>,
    psu: &mut P,
    policy: &RecoveryPolicy,
) -> Result<(), VfiError> {
    info!("power cycling target");
    psu.power_cycle()?;
    if link.ping_target(policy.attempts, policy.delay(), policy.per_attempt_timeout())? {
        return Ok(());
    }
    warn!(attempts = policy.attempts, "target silent after power cycle");
    Err(VfiError::TargetUnresponsive(
        ErrorInfo::new(
            "recover.silent",
            format!(
                "target did not answer after {} ping attempts",
                policy.attempts
            ),
        )
        .with_hint("check the target power rail wiring and the trigger loop"),
    ))
}
