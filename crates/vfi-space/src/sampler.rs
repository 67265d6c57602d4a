//! Samplers producing glitch settings from a parameter space.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use vfi_core::errors::{ErrorInfo, VfiError};
use vfi_core::{GlitchParam, GlitchSettings};

use crate::feasibility::PmicProfile;
use crate::range::{ParameterRange, ParameterSpace};

fn validate_vid_ranges(space: &ParameterSpace) -> Result<(), VfiError> {
    for param in [GlitchParam::Voltage, GlitchParam::PrepVoltage] {
        let range = space.range(param);
        if range.end > u32::from(u8::MAX) {
            return Err(VfiError::Config(
                ErrorInfo::new(
                    "sampler.vid_range",
                    format!("{} range end {} exceeds one VID byte", param.as_str(), range.end),
                )
                .with_context("end", range.end.to_string()),
            ));
        }
    }
    Ok(())
}

/// Exhaustive sampler over the shuffled Cartesian product of the space.
///
/// The full combination list is materialized before the shuffle, so memory
/// grows with the product size; four stepped ranges of realistic bench
/// sweeps stay in the low millions at most. Each combination is yielded
/// exactly once.
#[derive(Debug)]
pub struct ExhaustiveSampler {
    combos: std::vec::IntoIter<GlitchSettings>,
}

/// Builds an exhaustive sampler with a deterministic shuffle order.
pub fn sample_exhaustive(space: &ParameterSpace, seed: u64) -> Result<ExhaustiveSampler, VfiError> {
    validate_vid_ranges(space)?;
    let mut combos = Vec::with_capacity(space.combination_count());
    for ext_offset in space.ext_offset.values() {
        for width in space.width.values() {
            for voltage in space.voltage.values() {
                for prep_voltage in space.prep_voltage.values() {
                    combos.push(GlitchSettings {
                        ext_offset,
                        width,
                        voltage: voltage as u8,
                        prep_voltage: prep_voltage as u8,
                    });
                }
            }
        }
    }
    combos.shuffle(&mut StdRng::seed_from_u64(seed));
    Ok(ExhaustiveSampler {
        combos: combos.into_iter(),
    })
}

impl Iterator for ExhaustiveSampler {
    type Item = GlitchSettings;

    fn next(&mut self) -> Option<GlitchSettings> {
        self.combos.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.combos.size_hint()
    }
}

impl ExactSizeIterator for ExhaustiveSampler {}

/// Unbounded sampler drawing each parameter independently and uniformly
/// from its stepped range. Combinations may repeat.
#[derive(Debug)]
pub struct InfiniteSampler {
    space: ParameterSpace,
    rng: StdRng,
}

/// Builds an infinite sampler.
///
/// Refuses spaces whose ranges cannot achieve the required voltage
/// transitions; an endless draw over an impossible waveform would only
/// produce noise.
pub fn sample_infinite(
    space: &ParameterSpace,
    pmic: &PmicProfile,
    nominal_mv: u32,
    seed: u64,
) -> Result<InfiniteSampler, VfiError> {
    validate_vid_ranges(space)?;
    if let Err(violations) = pmic.check_feasibility(space, nominal_mv) {
        let mut info = ErrorInfo::new(
            "sampler.infeasible",
            "configured ranges cannot achieve the required voltage transitions",
        );
        for (idx, violation) in violations.iter().enumerate() {
            info = info.with_context(format!("violation_{idx}"), violation.to_string());
        }
        return Err(VfiError::Infeasible(info));
    }
    Ok(InfiniteSampler {
        space: *space,
        rng: StdRng::seed_from_u64(seed),
    })
}

impl InfiniteSampler {
    fn draw(&mut self, range: &ParameterRange) -> u32 {
        let k = self.rng.gen_range(0..range.count() as u32);
        range.start + k * range.step
    }
}

impl Iterator for InfiniteSampler {
    type Item = GlitchSettings;

    fn next(&mut self) -> Option<GlitchSettings> {
        let space = self.space;
        Some(GlitchSettings {
            ext_offset: self.draw(&space.ext_offset),
            width: self.draw(&space.width),
            voltage: self.draw(&space.voltage) as u8,
            prep_voltage: self.draw(&space.prep_voltage) as u8,
        })
    }
}
