//! Power supply collaborator contract.

use std::thread;
use std::time::Duration;

use vfi_core::errors::VfiError;

/// Abstract bench power supply feeding the target.
///
/// Vendor protocols stay outside the engine; an implementation only needs
/// the switching primitive and its settle delay.
pub trait PowerSupply {
    /// Switches the output on or off.
    fn set_on(&mut self, on: bool) -> Result<(), VfiError>;

    /// Off-to-on settle delay used by [`PowerSupply::power_cycle`].
    fn cycle_wait(&self) -> Duration {
        Duration::from_millis(500)
    }

    /// Power-cycles the target: off, settle, on. Blocking.
    fn power_cycle(&mut self) -> Result<(), VfiError> {
        self.set_on(false)?;
        thread::sleep(self.cycle_wait());
        self.set_on(true)
    }
}
