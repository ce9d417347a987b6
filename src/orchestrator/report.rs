// src/orchestrator/report.rs

use crate::clock::Timestamp;
use crate::surface::PresentPath;
use crate::timing::{ResponseCode, TimerKind};
use std::time::Duration;

/// What happened during one screen update of the last show-list.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRecord {
    /// Show-list entry and timing group of the update.
    pub entry: usize,
    pub group: usize,
    /// Index and name of the unit whose timing governed the update.
    pub unit_index: usize,
    pub unit: String,
    pub timer: TimerKind,
    /// `None` when nothing was drawn (non-graphic or invisible chains).
    pub path: Option<PresentPath>,
    pub preloaded: bool,
    pub onset: Timestamp,
    pub intended: Duration,
    pub corrected_wait: Duration,
    /// Time spent past the intended duration before the wait could begin.
    pub overrun: Duration,
    /// Time spent preloading the next update inside this update's slot.
    pub preload_cost: Duration,
    /// Time the presentation thread spent on this update, wait included.
    pub blocked_for: Duration,
    pub stop_time: Timestamp,
    pub code: Option<ResponseCode>,
}
