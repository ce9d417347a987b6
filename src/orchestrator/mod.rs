// src/orchestrator/mod.rs

//! The presentation manager.
//!
//! Compiles a unit list into a show-list, then runs the timing loop over it:
//! present, preload the next update, wait out the corrected duration, capture
//! the response. Afterwards a correction pass measures what each clock-driven
//! group actually got.

pub mod compiler;
pub(crate) mod preload;
pub mod report;
mod timing_loop;


pub use compiler::{compile, CompileTarget, ShowEntry, ShowList};
pub use report::UpdateRecord;

use crate::clock::{Clock, Timestamp};
use crate::error::{PresentationError, Result};
use crate::params::ParamContext;
use crate::surface::{lock_surface, FrameBuffer, SharedSurface};
use crate::timing::TimingWait;
use crate::unit::{Display, DisplayState, StereoLayout};
use crate::workers::{CancelToken, DelayedShowWorker};
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowStatus {
    Ok,
    /// The stop flag was raised; remaining entries were not shown.
    Stopped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PresentationSettings {
    /// Render upcoming updates into off-screen buffers during waits.
    pub preload: bool,
    /// Overruns above this are logged as warnings.
    pub overrun_warning: Duration,
    pub stereo: Option<StereoLayout>,
}

impl Default for PresentationSettings {
    fn default() -> Self {
        PresentationSettings {
            preload: true,
            overrun_warning: Duration::from_millis(2),
            stereo: None,
        }
    }
}

pub struct PresentationManager {
    surface: SharedSurface,
    clock: Arc<dyn Clock>,
    wait: Box<dyn TimingWait>,
    stop: CancelToken,
    settings: PresentationSettings,
    delayed: Option<DelayedShowWorker>,
    /// Pooled buffer currently on screen. Kept out of the pool until the next
    /// present so it is never drawn into while visible.
    on_screen: Option<FrameBuffer>,
    interval_start: Option<Timestamp>,
    report: Vec<UpdateRecord>,
}

impl PresentationManager {
    pub fn new(surface: SharedSurface, wait: Box<dyn TimingWait>, stop: CancelToken) -> Result<Self> {
        let clock = lock_surface(&surface)?.clock();
        info!("PresentationManager: created");
        Ok(PresentationManager {
            surface,
            clock,
            wait,
            stop,
            settings: PresentationSettings::default(),
            delayed: None,
            on_screen: None,
            interval_start: None,
            report: Vec::new(),
        })
    }

    pub fn with_settings(mut self, settings: PresentationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &PresentationSettings {
        &self.settings
    }

    pub fn surface(&self) -> &SharedSurface {
        &self.surface
    }

    pub fn stop_token(&self) -> &CancelToken {
        &self.stop
    }

    /// One record per screen update of the most recent show-list.
    pub fn last_report(&self) -> &[UpdateRecord] {
        &self.report
    }

    fn target(&self) -> Result<CompileTarget> {
        let size = lock_surface(&self.surface)?.size();
        Ok(CompileTarget {
            size,
            stereo: self.settings.stereo,
        })
    }

    /// Returns every cached buffer held by `units` to the pool and clears their
    /// per-show state.
    fn reclaim_buffers(&self, units: &mut [Display]) -> Result<()> {
        let mut target = lock_surface(&self.surface)?;
        for unit in units.iter_mut() {
            for buffer in unit.reset_show_state() {
                target.release(buffer);
            }
        }
        Ok(())
    }

    /// Compiles `units` without showing them. `Ok(None)` means the stop flag
    /// was raised.
    pub fn compile(&mut self, units: &mut [Display], params: &ParamContext) -> Result<Option<ShowList>> {
        self.reclaim_buffers(units)?;
        let target = self.target()?;
        compiler::compile(units, params, &target, &self.stop)
    }

    /// Compiles and shows `units`. Measurements are left in each unit's
    /// timing elements and response state, and in [`last_report`](Self::last_report).
    pub fn compile_and_show(&mut self, units: &mut [Display], params: &ParamContext) -> Result<ShowStatus> {
        self.report.clear();
        self.interval_start = None;

        let mut list = match self.compile(units, params) {
            Ok(Some(list)) => list,
            Ok(None) => return Ok(ShowStatus::Stopped),
            Err(e) => {
                error!("PresentationManager: compilation failed: {}", e);
                return Err(e);
            }
        };
        debug!("PresentationManager: showing {} entries", list.len());

        let status = self.run(units, &mut list, params);
        match &status {
            Ok(status) => info!(
                "PresentationManager: show-list finished ({:?}, {} updates)",
                status,
                self.report.len()
            ),
            Err(e) => error!("PresentationManager: show-list aborted: {}", e),
        }
        status
    }

    /// Advances `unit` by one timing group and paints that group live, outside
    /// the timed path. Returns false once the unit has no further group.
    pub fn step_one_group(&mut self, unit: &mut Display, params: &ParamContext) -> Result<bool> {
        if unit.state() < DisplayState::Steppable {
            let target = self.target()?;
            unit.recompute(target.size, params, target.stereo)?;
        }
        if !unit.next_timing_group() {
            return Ok(false);
        }
        let group = unit.active_group().unwrap_or(0);

        let mut target = lock_surface(&self.surface)?;
        let background = target.background();
        let onset = target.paint_live(|fb| {
            fb.clear(background);
            unit.show_group(fb, true);
        })?;
        if let Some(previous) = self.on_screen.take() {
            target.release(previous);
        }
        drop(target);

        unit.on_present(group, onset);
        debug!("PresentationManager: stepped '{}' to group {}", unit.name(), group);
        Ok(true)
    }

    fn delayed_worker(&mut self) -> Result<&DelayedShowWorker> {
        if self.delayed.is_none() {
            let worker = DelayedShowWorker::spawn(Arc::clone(&self.surface), Arc::clone(&self.clock))?;
            self.delayed = Some(worker);
        }
        self.delayed.as_ref().ok_or(PresentationError::Worker {
            name: "delayed-show",
            reason: "worker unavailable".to_string(),
        })
    }
}
