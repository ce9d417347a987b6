// src/timing/mod.rs

//! Timing groups: timer kinds, the per-group Timing Element, and the wait
//! primitive the timing loop blocks on.

pub mod element;
pub mod timer;
pub mod wait;

pub use element::{TimingDeviation, TimingElement, TimingSpec};
pub use timer::TimerKind;
pub use wait::{
    ChannelWait, ClockWait, ResponseCode, ResponseEvent, ResponseFilter, ResponseSource,
    TimingWait, WaitError, WaitOutcome, WaitRequest,
};
