#![deny(missing_docs)]
#![doc = "Parameter search space for glitch campaigns: stepped ranges, PMIC feasibility checks, and the exhaustive/infinite samplers."]

pub mod feasibility;
pub mod range;
pub mod sampler;

pub use feasibility::{
    FeasibilityReport, FeasibilityWarning, PmicProfile, TransitionBound, TPS65094,
};
pub use range::{ParameterRange, ParameterSpace};
pub use sampler::{sample_exhaustive, sample_infinite, ExhaustiveSampler, InfiniteSampler};
