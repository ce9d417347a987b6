// src/stimuli/trigger.rs

//! Device-control unit that emits trigger codes when it goes on screen.
//!
//! A trigger has no timer by default, so the show-list compiler fuses it with
//! the following unit and the codes go out with that unit's onset.

use crate::clock::Timestamp;
use crate::params::{ParamContext, ParamError, ParamRef};
use crate::timing::{TimingElement, TimingSpec};
use crate::unit::{ElementBuilder, Stimulus, StimulusKind};
use log::{debug, warn};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Receiver of trigger codes (parallel port, network marker stream...).
pub trait TriggerSink: Send + Sync {
    fn emit(&self, code: u32, at: Timestamp);
}

/// Sink that keeps every emitted code.
#[derive(Debug, Clone, Default)]
pub struct TriggerLog {
    sent: Arc<Mutex<Vec<(u32, Timestamp)>>>,
}

impl TriggerLog {
    pub fn new() -> Self {
        TriggerLog::default()
    }

    pub fn sent(&self) -> Vec<(u32, Timestamp)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl TriggerSink for TriggerLog {
    fn emit(&self, code: u32, at: Timestamp) {
        match self.sent.lock() {
            Ok(mut sent) => sent.push((code, at)),
            Err(_) => warn!("TriggerLog: lock poisoned, dropping code {}", code),
        }
    }
}

pub struct Trigger {
    codes: ParamRef<Vec<u32>>,
    resolved: Vec<u32>,
    duration: Option<Duration>,
    sink: Arc<dyn TriggerSink>,
}

impl Trigger {
    /// Emits `codes[k]` when group `k` is presented. A trigger has a single
    /// group unless it is timed.
    pub fn new(codes: impl Into<ParamRef<Vec<u32>>>, sink: Arc<dyn TriggerSink>) -> Self {
        Trigger {
            codes: codes.into(),
            resolved: Vec::new(),
            duration: None,
            sink,
        }
    }

    /// Holds the screen for `duration` instead of fusing with the next unit.
    pub fn timed(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

impl Stimulus for Trigger {
    fn build(&mut self, builder: &mut ElementBuilder, _params: &ParamContext) -> Result<(), ParamError> {
        match self.duration {
            Some(duration) => builder.timing(TimingSpec::clock(duration)),
            None => builder.timing(TimingSpec::untimed()),
        };
        Ok(())
    }

    fn compute_timing(
        &mut self,
        _timing: &mut [TimingElement],
        params: &ParamContext,
    ) -> Result<(), ParamError> {
        self.resolved = self.codes.resolve(params)?;
        Ok(())
    }

    fn kind(&self) -> StimulusKind {
        StimulusKind::NonGraphic
    }

    fn on_present(&mut self, group: usize, onset: Timestamp) {
        if let Some(&code) = self.resolved.get(group) {
            debug!("Trigger: code {} at {:?}", code, onset);
            self.sink.emit(code, onset);
        }
    }
}
