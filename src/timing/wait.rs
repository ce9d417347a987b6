// src/timing/wait.rs

//! The blocking wait primitive and the response events it consumes.
//!
//! The wait is the only place where the presentation thread blocks. The engine
//! hands it the corrected duration and the timer kind; the implementation
//! decides what qualifies as a stop event. Two implementations ship with the
//! crate: [`ClockWait`] for duration-only timing and [`ChannelWait`], which
//! receives response events from the event layer over a channel.

use crate::clock::{Clock, Timestamp};
use crate::geometry::Point;
use crate::timing::TimerKind;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Device-specific response identifier (key code, button number, ...).
pub type ResponseCode = u32;

/// Which device produced a response event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseSource {
    Key,
    MouseButton,
    Wheel,
    Axis,
    VoiceKey,
    /// End of a media clip, terminates media-synchronized groups.
    MediaEnd,
}

impl ResponseSource {
    /// The timer kind that listens to this source.
    pub fn timer_kind(self) -> TimerKind {
        match self {
            ResponseSource::Key => TimerKind::KEY,
            ResponseSource::MouseButton => TimerKind::MOUSE_BUTTON,
            ResponseSource::Wheel => TimerKind::WHEEL,
            ResponseSource::Axis => TimerKind::AXIS,
            ResponseSource::VoiceKey => TimerKind::VOICE_KEY,
            ResponseSource::MediaEnd => TimerKind::MEDIA_SYNC,
        }
    }
}

/// A time-stamped event from the response layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEvent {
    pub source: ResponseSource,
    pub code: ResponseCode,
    /// When the device reported the event, on the presentation clock.
    pub time: Timestamp,
    pub position: Option<Point>,
}

impl ResponseEvent {
    pub fn key(code: ResponseCode, time: Timestamp) -> Self {
        ResponseEvent {
            source: ResponseSource::Key,
            code,
            time,
            position: None,
        }
    }

    pub fn mouse(button: ResponseCode, time: Timestamp, at: Point) -> Self {
        ResponseEvent {
            source: ResponseSource::MouseButton,
            code: button,
            time,
            position: Some(at),
        }
    }
}

/// Accepted response codes of a timing group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResponseFilter {
    #[default]
    Any,
    /// Ordered list of accepted codes.
    Only(Vec<ResponseCode>),
}

impl ResponseFilter {
    pub fn accepts(&self, code: ResponseCode) -> bool {
        match self {
            ResponseFilter::Any => true,
            ResponseFilter::Only(codes) => codes.contains(&code),
        }
    }

    /// Position of `code` in the accepted list (`None` for `Any`).
    pub fn index_of(&self, code: ResponseCode) -> Option<usize> {
        match self {
            ResponseFilter::Any => None,
            ResponseFilter::Only(codes) => codes.iter().position(|c| *c == code),
        }
    }
}

/// One call into the wait primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitRequest {
    pub timer: TimerKind,
    /// Remaining time after the loop's own overhead has been subtracted.
    pub corrected: Duration,
    /// Absolute end of the corrected duration.
    pub deadline: Timestamp,
    /// Whether a qualifying response terminates the wait.
    pub watch_response: bool,
}

/// What ended a wait.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WaitOutcome {
    pub stop_time: Timestamp,
    pub code: Option<ResponseCode>,
    pub source: Option<ResponseSource>,
    pub position: Option<Point>,
    /// Events seen during the wait that did not qualify.
    pub spurious: Vec<ResponseEvent>,
}

impl WaitOutcome {
    /// A wait that ended by running out its duration.
    pub fn timed_out(stop_time: Timestamp) -> Self {
        WaitOutcome {
            stop_time,
            ..Default::default()
        }
    }

    pub fn responded(&self) -> bool {
        self.code.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    #[error("response source disconnected while waiting on {0:?}")]
    Disconnected(TimerKind),
    #[error("timer {0:?} cannot be served by this wait primitive")]
    Unsupported(TimerKind),
}

/// The external timing-wait primitive.
pub trait TimingWait: Send {
    /// Registers the accepted response codes for the next wait.
    fn register_filter(&mut self, filter: &ResponseFilter);

    /// Blocks until the request's stop condition holds.
    fn wait(&mut self, request: &WaitRequest) -> Result<WaitOutcome, WaitError>;
}

/// Waits out the corrected duration and nothing else.
pub struct ClockWait {
    clock: Arc<dyn Clock>,
}

impl ClockWait {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        ClockWait { clock }
    }
}

impl TimingWait for ClockWait {
    fn register_filter(&mut self, _filter: &ResponseFilter) {}

    fn wait(&mut self, request: &WaitRequest) -> Result<WaitOutcome, WaitError> {
        if request.watch_response && !request.timer.contains(TimerKind::CLOCK) {
            return Err(WaitError::Unsupported(request.timer));
        }
        self.clock.sleep_until(request.deadline);
        Ok(WaitOutcome::timed_out(self.clock.now()))
    }
}

/// Waits on response events delivered over a channel.
///
/// The event layer stamps each event when the device reports it, so the
/// polling granularity affects only when the wait returns, never the measured
/// response time.
pub struct ChannelWait {
    events: Receiver<ResponseEvent>,
    clock: Arc<dyn Clock>,
    filter: ResponseFilter,
    poll: Duration,
}

impl ChannelWait {
    pub fn new(events: Receiver<ResponseEvent>, clock: Arc<dyn Clock>, poll: Duration) -> Self {
        ChannelWait {
            events,
            clock,
            filter: ResponseFilter::Any,
            poll: poll.max(Duration::from_micros(50)),
        }
    }

    fn qualifies(&self, timer: TimerKind, event: &ResponseEvent) -> bool {
        timer.intersects(event.source.timer_kind()) && self.filter.accepts(event.code)
    }
}

impl TimingWait for ChannelWait {
    fn register_filter(&mut self, filter: &ResponseFilter) {
        self.filter = filter.clone();
    }

    fn wait(&mut self, request: &WaitRequest) -> Result<WaitOutcome, WaitError> {
        let timed = request.timer.contains(TimerKind::CLOCK)
            || request.timer.contains(TimerKind::FIXED_DELAY);
        let mut spurious = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    if request.watch_response && self.qualifies(request.timer, &event) {
                        debug!(
                            "ChannelWait: {:?} code {} qualifies at {:?}",
                            event.source, event.code, event.time
                        );
                        return Ok(WaitOutcome {
                            stop_time: event.time,
                            code: Some(event.code),
                            source: Some(event.source),
                            position: event.position,
                            spurious,
                        });
                    }
                    if request.timer.contains(TimerKind::SPURIOUS) {
                        trace!("ChannelWait: spurious {:?} code {}", event.source, event.code);
                        spurious.push(event);
                    }
                    continue;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    if !timed {
                        return Err(WaitError::Disconnected(request.timer));
                    }
                    self.clock.sleep_until(request.deadline);
                    let mut outcome = WaitOutcome::timed_out(self.clock.now());
                    outcome.spurious = spurious;
                    return Ok(outcome);
                }
            }

            let now = self.clock.now();
            if timed && now >= request.deadline {
                let mut outcome = WaitOutcome::timed_out(now);
                outcome.spurious = spurious;
                return Ok(outcome);
            }
            let mut next = now + self.poll;
            if timed {
                next = next.min(request.deadline);
            }
            self.clock.sleep_until(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::mpsc;

    fn request(timer: TimerKind, deadline_ms: u64) -> WaitRequest {
        WaitRequest {
            timer,
            corrected: Duration::from_millis(deadline_ms),
            deadline: Duration::from_millis(deadline_ms),
            watch_response: timer.watches_response(),
        }
    }

    #[test_log::test]
    fn clock_wait_runs_to_deadline() {
        let clock = ManualClock::new();
        let mut wait = ClockWait::new(Arc::new(clock.clone()));
        let outcome = wait.wait(&request(TimerKind::CLOCK, 250)).unwrap();
        assert_eq!(outcome.stop_time, Duration::from_millis(250));
        assert!(!outcome.responded());
        assert_eq!(
            wait.wait(&request(TimerKind::KEY, 10)),
            Err(WaitError::Unsupported(TimerKind::KEY))
        );
    }

    #[test_log::test]
    fn channel_wait_filters_codes_and_records_spurious() {
        let clock = ManualClock::new();
        let (tx, rx) = mpsc::channel();
        let mut wait = ChannelWait::new(rx, Arc::new(clock.clone()), Duration::from_millis(1));
        wait.register_filter(&ResponseFilter::Only(vec![70, 74]));

        tx.send(ResponseEvent::key(32, Duration::from_millis(100))).unwrap();
        tx.send(ResponseEvent::mouse(1, Duration::from_millis(120), Point::new(3, 4)))
            .unwrap();
        tx.send(ResponseEvent::key(74, Duration::from_millis(180))).unwrap();

        let outcome = wait
            .wait(&request(
                TimerKind::CLOCK | TimerKind::KEY | TimerKind::SPURIOUS,
                1000,
            ))
            .unwrap();
        assert_eq!(outcome.code, Some(74));
        assert_eq!(outcome.stop_time, Duration::from_millis(180));
        assert_eq!(outcome.spurious.len(), 2);
    }

    #[test_log::test]
    fn channel_wait_times_out_on_clock() {
        let clock = ManualClock::new();
        let (_tx, rx) = mpsc::channel::<ResponseEvent>();
        let mut wait = ChannelWait::new(rx, Arc::new(clock.clone()), Duration::from_millis(1));
        let outcome = wait
            .wait(&request(TimerKind::CLOCK | TimerKind::KEY, 40))
            .unwrap();
        assert_eq!(outcome.stop_time, Duration::from_millis(40));
        assert!(outcome.code.is_none());
    }

    #[test_log::test]
    fn response_only_wait_fails_when_source_goes_away() {
        let clock = ManualClock::new();
        let (tx, rx) = mpsc::channel::<ResponseEvent>();
        drop(tx);
        let mut wait = ChannelWait::new(rx, Arc::new(clock), Duration::from_millis(1));
        assert_eq!(
            wait.wait(&request(TimerKind::KEY, 0)),
            Err(WaitError::Disconnected(TimerKind::KEY))
        );
    }
}
