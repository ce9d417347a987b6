// src/stimuli/blank.rs

use crate::params::{ParamContext, ParamError, ParamRef};
use crate::timing::{TimingElement, TimingSpec};
use crate::unit::{ElementBuilder, Stimulus};
use std::time::Duration;

/// An empty screen held for a fixed duration. Pair it with
/// [`Display::with_background`](crate::unit::Display::with_background) to
/// choose the color.
#[derive(Debug, Clone)]
pub struct Blank {
    duration: ParamRef<Duration>,
}

impl Blank {
    pub fn new(duration: impl Into<ParamRef<Duration>>) -> Self {
        Blank {
            duration: duration.into(),
        }
    }
}

impl Stimulus for Blank {
    fn build(&mut self, builder: &mut ElementBuilder, _params: &ParamContext) -> Result<(), ParamError> {
        builder.timing(TimingSpec::clock(Duration::ZERO));
        Ok(())
    }

    fn compute_timing(
        &mut self,
        timing: &mut [TimingElement],
        params: &ParamContext,
    ) -> Result<(), ParamError> {
        if let Some(group) = timing.first_mut() {
            group.intended = self.duration.resolve(params)?;
        }
        Ok(())
    }
}
