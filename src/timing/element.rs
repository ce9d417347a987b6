// src/timing/element.rs

//! Per-group timing descriptor.

use crate::clock::Timestamp;
use crate::geometry::Point;
use crate::surface::FrameBuffer;
use crate::timing::{ResponseCode, ResponseEvent, ResponseFilter, TimerKind, WaitOutcome};
use std::time::Duration;

/// Declaration of a timing group, as produced by a stimulus before any
/// parameter has been evaluated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimingSpec {
    pub timer: TimerKind,
    pub intended: Duration,
    pub responses: ResponseFilter,
    /// Earlier group of the same unit whose stop time this group's onset is
    /// measured from. `None` means the immediately preceding update.
    pub reference: Option<usize>,
}

impl TimingSpec {
    pub fn clock(intended: Duration) -> Self {
        TimingSpec {
            timer: TimerKind::CLOCK,
            intended,
            ..Default::default()
        }
    }

    pub fn untimed() -> Self {
        TimingSpec::default()
    }

    pub fn with_responses(mut self, timer: TimerKind, responses: ResponseFilter) -> Self {
        self.timer |= timer;
        self.responses = responses;
        self
    }
}

/// Measured gap between two onsets compared with the intended duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingDeviation {
    pub intended: Duration,
    pub actual: Duration,
}

impl TimingDeviation {
    /// Positive when the group stayed up longer than intended.
    pub fn error_micros(&self) -> i64 {
        self.actual.as_micros() as i64 - self.intended.as_micros() as i64
    }

    pub fn error_ms(&self) -> f64 {
        self.error_micros() as f64 / 1000.0
    }
}

/// Runtime state of one timing group.
///
/// The timer kind, duration and filter are fixed at `recompute_timing`; the
/// rest is per-show state, cleared at the start of every show.
#[derive(Debug, Default)]
pub struct TimingElement {
    pub timer: TimerKind,
    pub intended: Duration,
    pub responses: ResponseFilter,
    pub reference: Option<usize>,

    pub(crate) buffer: Option<FrameBuffer>,
    pub(crate) preloaded: bool,

    pub onset: Option<Timestamp>,
    pub stop_time: Option<Timestamp>,
    pub stop_code: Option<ResponseCode>,
    pub stop_position: Option<Point>,
    pub spurious: Vec<ResponseEvent>,
    /// Duration actually handed to the wait primitive.
    pub corrected_wait: Duration,
    /// Filled by the correction pass for clock-driven groups.
    pub deviation: Option<TimingDeviation>,
}

impl TimingElement {
    pub fn from_spec(spec: &TimingSpec) -> Self {
        TimingElement {
            timer: spec.timer,
            intended: spec.intended,
            responses: spec.responses.clone(),
            reference: spec.reference,
            ..Default::default()
        }
    }

    /// Default timing used when a unit declares no explicit timing.
    pub fn untimed() -> Self {
        TimingElement::default()
    }

    /// Clears everything a show produces. Returns the cached buffer, if any,
    /// so the caller can recycle it.
    pub fn reset_show_state(&mut self) -> Option<FrameBuffer> {
        self.preloaded = false;
        self.onset = None;
        self.stop_time = None;
        self.stop_code = None;
        self.stop_position = None;
        self.spurious.clear();
        self.corrected_wait = Duration::ZERO;
        self.deviation = None;
        self.buffer.take()
    }

    pub fn is_preloaded(&self) -> bool {
        self.preloaded && self.buffer.is_some()
    }

    pub fn buffer(&self) -> Option<&FrameBuffer> {
        self.buffer.as_ref()
    }

    pub(crate) fn attach(&mut self, buffer: FrameBuffer, preloaded: bool) {
        self.buffer = Some(buffer);
        self.preloaded = preloaded;
    }

    pub(crate) fn detach(&mut self) -> Option<FrameBuffer> {
        self.preloaded = false;
        self.buffer.take()
    }

    /// Copies a wait outcome into the measured fields.
    pub(crate) fn record_outcome(&mut self, outcome: &WaitOutcome) {
        self.stop_time = Some(outcome.stop_time);
        if self.timer.watches_response() || self.timer.contains(TimerKind::MEDIA_SYNC) {
            self.stop_code = outcome.code;
        }
        if self.timer.records_position() {
            self.stop_position = outcome.position;
        }
        if self.timer.contains(TimerKind::SPURIOUS) {
            self.spurious.extend(outcome.spurious.iter().cloned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;

    #[test_log::test]
    fn reset_returns_buffer_and_clears_measurements() {
        let mut te = TimingElement::from_spec(&TimingSpec::clock(Duration::from_millis(100)));
        te.attach(FrameBuffer::new(Size::new(2, 2)), true);
        te.onset = Some(Duration::from_millis(5));
        assert!(te.is_preloaded());

        let recycled = te.reset_show_state();
        assert!(recycled.is_some());
        assert!(!te.is_preloaded());
        assert_eq!(te.onset, None);
        assert_eq!(te.intended, Duration::from_millis(100));
    }

    #[test_log::test]
    fn outcome_fields_follow_timer_flags() {
        let mut te = TimingElement::from_spec(&TimingSpec::clock(Duration::from_millis(100)));
        let outcome = WaitOutcome {
            stop_time: Duration::from_millis(60),
            code: Some(4),
            source: None,
            position: Some(Point::new(1, 1)),
            spurious: Vec::new(),
        };
        te.record_outcome(&outcome);
        assert_eq!(te.stop_time, Some(Duration::from_millis(60)));
        assert_eq!(te.stop_code, None);
        assert_eq!(te.stop_position, None);

        te.timer |= TimerKind::MOUSE_BUTTON;
        te.record_outcome(&outcome);
        assert_eq!(te.stop_code, Some(4));
        assert_eq!(te.stop_position, Some(Point::new(1, 1)));
    }

    #[test_log::test]
    fn deviation_sign() {
        let late = TimingDeviation {
            intended: Duration::from_millis(500),
            actual: Duration::from_micros(516_700),
        };
        assert_eq!(late.error_micros(), 16_700);
        let early = TimingDeviation {
            intended: Duration::from_millis(500),
            actual: Duration::from_millis(490),
        };
        assert!(early.error_ms() < 0.0);
    }
}
