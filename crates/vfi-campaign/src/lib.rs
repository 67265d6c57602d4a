#![deny(missing_docs)]
#![doc = "Glitch campaign orchestration: configuration, the sampling loop, target recovery, cancellation, and the store/power-supply collaborator contracts."]

pub mod cancel;
pub mod config;
pub mod power;
pub mod recovery;
pub mod run;
pub mod store;

pub use cancel::CancelToken;
pub use config::{CampaignConfig, RecoveryPolicy, SamplerKind, StopFlags};
pub use power::PowerSupply;
pub use recovery::recover;
pub use run::{run, CampaignSummary, StopCause};
pub use store::ResultStore;
