#![deny(missing_docs)]
#![doc = "Core types for the VFI glitch campaign engine: errors, outcome taxonomy, glitch settings, target profiles, and voltage encoding."]

pub mod errors;
pub mod result;
pub mod settings;
pub mod target;
pub mod voltage;

pub use errors::{ErrorInfo, VfiError};
pub use result::{CampaignRecord, GlitchResultKind, ResultPayload};
pub use settings::{GlitchParam, GlitchSettings};
pub use target::{lookup, op_names, SuccessPredicate, TargetProfile};
pub use voltage::{millivolts_to_vid, vid_to_millivolts};
