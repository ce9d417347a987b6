// src/orchestrator/timing_loop.rs

//! The timing loop: one pass over a compiled show-list.

use super::preload::{can_preload, compose, is_graphic};
use super::{PresentationManager, ShowEntry, ShowList, ShowStatus, UpdateRecord};
use crate::clock::Timestamp;
use crate::error::Result;
use crate::params::ParamContext;
use crate::surface::{lock_surface, FrameBuffer, PresentPath};
use crate::timing::{TimerKind, TimingDeviation, WaitOutcome, WaitRequest};
use crate::unit::Display;
use crate::workers::{AnimationWorker, DelayedShow, DelayedShowTicket};
use log::{debug, info, trace, warn};
use std::sync::Arc;
use std::time::Duration;

/// A fixed-delay group handed to the delayed-show worker.
struct PendingShow {
    ticket: DelayedShowTicket,
    entry: usize,
    group: usize,
    record: usize,
    /// Time the delay is measured from.
    base: Timestamp,
}

#[derive(Default)]
struct ShowState {
    /// Final frame of the previous update, for transparent entries.
    carry: Option<FrameBuffer>,
    pending: Option<PendingShow>,
    last_stop: Timestamp,
}

impl PresentationManager {
    pub(super) fn run(
        &mut self,
        units: &mut [Display],
        list: &mut ShowList,
        params: &ParamContext,
    ) -> Result<ShowStatus> {
        let mut state = ShowState {
            last_stop: self.clock.now(),
            ..Default::default()
        };
        let outcome = self.run_entries(units, list, params, &mut state);
        let settled = self.settle(units, list, &mut state);
        let status = outcome?;
        settled?;
        self.correction_pass(units);
        Ok(status)
    }

    fn run_entries(
        &mut self,
        units: &mut [Display],
        list: &mut ShowList,
        params: &ParamContext,
        state: &mut ShowState,
    ) -> Result<ShowStatus> {
        let target = self.target()?;
        for e in 0..list.len() {
            if self.stop.is_cancelled() {
                info!("PresentationManager: stop requested before entry {}", e);
                return Ok(ShowStatus::Stopped);
            }
            if !list.entries[e].transparent {
                state.carry = None;
            }
            for index in list.entries[e].chain.clone() {
                if units[index].is_compute_late() {
                    units[index].recompute(target.size, params, target.stereo)?;
                }
            }
            let groups = units[list.entries[e].tail()].group_count();
            for k in 0..groups {
                self.show_group(units, list, e, k, state)?;
            }
        }
        Ok(ShowStatus::Ok)
    }

    fn show_group(
        &mut self,
        units: &mut [Display],
        list: &mut ShowList,
        e: usize,
        k: usize,
        state: &mut ShowState,
    ) -> Result<()> {
        let started = self.clock.now();
        self.resolve_pending(units, list, state)?;

        let entry = list.entries[e].clone();
        let tail = entry.tail();
        let last_group = k + 1 == units[tail].group_count();
        let (timer, intended) = {
            let te = &units[tail].timing()[k];
            (te.timer, te.intended)
        };
        let graphic = is_graphic(units, &entry);

        if timer.contains(TimerKind::FIXED_DELAY) {
            return self.schedule_delayed(units, list, e, k, state, started);
        }

        // (a) present
        let buffer = units[tail].timing_mut()[k].detach();
        let preloaded = buffer.is_some();
        let (onset, path) = if graphic {
            let (onset, path) = self.present(units, list, e, k, buffer, state)?;
            (onset, Some(path))
        } else {
            (self.clock.now(), None)
        };
        // (b) onset, execute hooks, response interval
        self.after_present(units, &entry, k, onset);
        if last_group && entry.transparent_follows {
            state.carry = self.current_frame(path, state)?;
        }

        let animation = if graphic {
            self.start_animation(units, &entry, onset, path, state)?
        } else {
            None
        };

        // (c) preload the next update inside this one's slot, then correct
        let preload_cost = self.preload_next(units, list, e, k, state)?;
        let now = self.clock.now();
        let elapsed = now.saturating_sub(onset);
        let corrected = intended.saturating_sub(elapsed);
        let overrun = if timer.is_null() {
            Duration::ZERO
        } else {
            elapsed.saturating_sub(intended)
        };
        if overrun > self.settings.overrun_warning {
            warn!(
                "PresentationManager: '{}' group {} overran by {:?} before its wait",
                units[tail].name(),
                k,
                overrun
            );
        }
        units[tail].timing_mut()[k].corrected_wait = corrected;

        // (d) wait
        let outcome: Result<WaitOutcome> = if timer.blocks() {
            let request = WaitRequest {
                timer,
                corrected,
                deadline: now + corrected,
                watch_response: timer.watches_response() || timer.contains(TimerKind::MEDIA_SYNC),
            };
            self.wait.register_filter(&units[tail].timing()[k].responses);
            debug!(
                "PresentationManager: '{}' group {} waits {:?} ({:?})",
                units[tail].name(),
                k,
                corrected,
                timer
            );
            self.wait.wait(&request).map_err(Into::into)
        } else {
            Ok(WaitOutcome::timed_out(now))
        };
        let stopped = animation.map(AnimationWorker::stop).transpose();
        let outcome = outcome?;
        if let Some(frames) = stopped? {
            trace!("PresentationManager: animation painted {} frames", frames);
        }

        // (e) capture
        self.capture(units, tail, k, onset, &outcome);
        state.last_stop = outcome.stop_time;
        self.report.push(UpdateRecord {
            entry: e,
            group: k,
            unit_index: tail,
            unit: units[tail].name().to_string(),
            timer,
            path,
            preloaded,
            onset,
            intended,
            corrected_wait: corrected,
            overrun,
            preload_cost,
            blocked_for: self.clock.elapsed_since(started),
            stop_time: outcome.stop_time,
            code: outcome.code,
        });
        Ok(())
    }

    /// Puts group `k` of entry `e` on screen: the preloaded buffer if there is
    /// one, a live paint otherwise.
    fn present(
        &mut self,
        units: &mut [Display],
        list: &mut ShowList,
        e: usize,
        k: usize,
        buffer: Option<FrameBuffer>,
        state: &ShowState,
    ) -> Result<(Timestamp, PresentPath)> {
        let mut target = lock_surface(&self.surface)?;
        let (onset, path) = match buffer {
            Some(buffer) => {
                let (onset, path, buffer) = target.show_buffer(buffer)?;
                if let Some(previous) = self.on_screen.replace(buffer) {
                    target.release(previous);
                }
                (onset, path)
            }
            None => {
                let background = target.background();
                let entry = &list.entries[e];
                let carry = state.carry.as_ref();
                let mut bounds = Default::default();
                let onset = target.paint_live(|fb| {
                    bounds = compose(units, entry, k, fb, carry, background);
                })?;
                list.entries[e].bounds = bounds;
                if let Some(previous) = self.on_screen.take() {
                    target.release(previous);
                }
                (onset, PresentPath::Live)
            }
        };
        trace!("PresentationManager: entry {} group {} {:?} at {:?}", e, k, path, onset);
        Ok((onset, path))
    }

    fn after_present(&mut self, units: &mut [Display], entry: &ShowEntry, k: usize, onset: Timestamp) {
        for &index in &entry.chain {
            let unit = &mut units[index];
            if unit.executes() && k <= unit.last_group_index() {
                unit.on_present(k, onset);
            }
        }
        let tail = &mut units[entry.tail()];
        let timer = tail.timing()[k].timer;
        tail.timing_mut()[k].onset = Some(onset);
        if timer.contains(TimerKind::INTERVAL_START) {
            self.interval_start = Some(onset);
        }
        if timer.intersects(TimerKind::INTERVAL_START | TimerKind::INTERVAL_CONTINUE) {
            tail.response_mut().interval_start = self.interval_start;
        }
    }

    /// Copy of what is on screen after a present along `path`.
    fn current_frame(&self, path: Option<PresentPath>, state: &ShowState) -> Result<Option<FrameBuffer>> {
        Ok(match path {
            Some(PresentPath::Live) => lock_surface(&self.surface)?.snapshot_back_buffer(),
            Some(PresentPath::Swap | PresentPath::Blit) => self.on_screen.clone(),
            None => state.carry.clone(),
        })
    }

    fn start_animation(
        &self,
        units: &[Display],
        entry: &ShowEntry,
        onset: Timestamp,
        path: Option<PresentPath>,
        state: &ShowState,
    ) -> Result<Option<AnimationWorker>> {
        let Some(&index) = entry
            .chain
            .iter()
            .find(|&&i| units[i].executes() && units[i].is_animated())
        else {
            return Ok(None);
        };
        let Some(animation) = units[index].animation() else {
            return Ok(None);
        };
        let base = match self.current_frame(path, state)? {
            Some(frame) => frame,
            None => FrameBuffer::new(lock_surface(&self.surface)?.size()),
        };
        AnimationWorker::spawn(
            units[index].name(),
            animation,
            base,
            Arc::clone(&self.surface),
            Arc::clone(&self.clock),
            onset,
        )
        .map(Some)
    }

    /// Renders the update after group `k` of entry `e` into an off-screen
    /// buffer. Returns the time it took.
    fn preload_next(
        &mut self,
        units: &mut [Display],
        list: &mut ShowList,
        e: usize,
        k: usize,
        state: &ShowState,
    ) -> Result<Duration> {
        if !self.settings.preload {
            return Ok(Duration::ZERO);
        }
        let (ne, nk) = if k + 1 < units[list.entries[e].tail()].group_count() {
            (e, k + 1)
        } else if e + 1 < list.len() {
            (e + 1, 0)
        } else {
            return Ok(Duration::ZERO);
        };
        if !can_preload(units, &list.entries[ne], nk) {
            return Ok(Duration::ZERO);
        }
        if list.entries[ne].transparent && state.carry.is_none() {
            return Ok(Duration::ZERO);
        }

        let started = self.clock.now();
        let (buffer, background) = {
            let mut target = lock_surface(&self.surface)?;
            (target.acquire(), target.background())
        };
        let Some(mut buffer) = buffer else {
            debug!(
                "PresentationManager: no off-screen buffer, entry {} group {} will be painted live",
                ne, nk
            );
            return Ok(Duration::ZERO);
        };
        let bounds = compose(units, &list.entries[ne], nk, &mut buffer, state.carry.as_ref(), background);
        list.entries[ne].bounds = bounds;
        let tail = list.entries[ne].tail();
        units[tail].timing_mut()[nk].attach(buffer, true);

        let cost = self.clock.elapsed_since(started);
        trace!("PresentationManager: preloaded entry {} group {} in {:?}", ne, nk, cost);
        Ok(cost)
    }

    fn schedule_delayed(
        &mut self,
        units: &mut [Display],
        list: &mut ShowList,
        e: usize,
        k: usize,
        state: &mut ShowState,
        started: Timestamp,
    ) -> Result<()> {
        let entry = list.entries[e].clone();
        let tail = entry.tail();
        let last_group = k + 1 == units[tail].group_count();
        let (timer, intended, reference) = {
            let te = &units[tail].timing()[k];
            (te.timer, te.intended, te.reference)
        };
        let base = reference
            .and_then(|r| units[tail].timing()[r].stop_time)
            .unwrap_or(state.last_stop);
        let deadline = base + intended;

        let buffer = units[tail].timing_mut()[k].detach();
        let preloaded = buffer.is_some();
        let (frame, pooled) = match buffer {
            Some(buffer) => (Some(buffer), true),
            None if !is_graphic(units, &entry) => (None, false),
            None => {
                let (buffer, background, size) = {
                    let mut target = lock_surface(&self.surface)?;
                    (target.acquire(), target.background(), target.size())
                };
                let (mut frame, pooled) = match buffer {
                    Some(buffer) => (buffer, true),
                    None => (FrameBuffer::new(size), false),
                };
                let bounds = compose(units, &list.entries[e], k, &mut frame, state.carry.as_ref(), background);
                list.entries[e].bounds = bounds;
                (Some(frame), pooled)
            }
        };
        if last_group && entry.transparent_follows && frame.is_some() {
            state.carry = frame.clone();
        }

        let ticket = self.delayed_worker()?.schedule(DelayedShow {
            frame,
            pooled,
            deadline,
        })?;
        state.pending = Some(PendingShow {
            ticket,
            entry: e,
            group: k,
            record: self.report.len(),
            base,
        });
        debug!(
            "PresentationManager: '{}' group {} scheduled for {:?}",
            units[tail].name(),
            k,
            deadline
        );

        let preload_cost = self.preload_next(units, list, e, k, state)?;
        let corrected = deadline.saturating_sub(self.clock.now());
        units[tail].timing_mut()[k].corrected_wait = corrected;
        state.last_stop = deadline;
        self.report.push(UpdateRecord {
            entry: e,
            group: k,
            unit_index: tail,
            unit: units[tail].name().to_string(),
            timer,
            path: None,
            preloaded,
            onset: deadline,
            intended,
            corrected_wait: corrected,
            overrun: Duration::ZERO,
            preload_cost,
            blocked_for: self.clock.elapsed_since(started),
            stop_time: deadline,
            code: None,
        });
        Ok(())
    }

    /// Waits for an outstanding delayed show and books its onset.
    fn resolve_pending(&mut self, units: &mut [Display], list: &ShowList, state: &mut ShowState) -> Result<()> {
        let Some(pending) = state.pending.take() else {
            return Ok(());
        };
        let pooled = pending.ticket.pooled();
        let landed = pending.ticket.wait()?;
        let onset = landed.onset;
        if landed.path.is_some() {
            let mut target = lock_surface(&self.surface)?;
            let previous = match landed.frame {
                Some(frame) if pooled => self.on_screen.replace(frame),
                _ => self.on_screen.take(),
            };
            if let Some(previous) = previous {
                target.release(previous);
            }
        }

        let entry = &list.entries[pending.entry];
        self.after_present(units, entry, pending.group, onset);
        let te = &mut units[entry.tail()].timing_mut()[pending.group];
        te.stop_time = Some(onset);
        te.deviation = Some(TimingDeviation {
            intended: te.intended,
            actual: onset.saturating_sub(pending.base),
        });
        if let Some(record) = self.report.get_mut(pending.record) {
            record.onset = onset;
            record.stop_time = onset;
            record.path = landed.path;
        }
        trace!("PresentationManager: delayed show landed at {:?} via {:?}", onset, landed.path);
        Ok(())
    }

    fn capture(&mut self, units: &mut [Display], tail: usize, k: usize, onset: Timestamp, outcome: &WaitOutcome) {
        let unit = &mut units[tail];
        let timer = unit.timing()[k].timer;
        unit.timing_mut()[k].record_outcome(outcome);
        if outcome.responded()
            && (timer.watches_response() || timer.contains(TimerKind::MEDIA_SYNC))
        {
            let name = unit.name().to_string();
            let response = unit.response_mut();
            let from = response.interval_start.unwrap_or(onset);
            response.code = outcome.code;
            response.rt = Some(outcome.stop_time.saturating_sub(from));
            if timer.records_position() {
                response.position = outcome.position;
            }
            debug!(
                "PresentationManager: '{}' response {:?} after {:?}",
                name, response.code, response.rt
            );
        }
    }

    /// Finishes any delayed show and returns unused buffers to the pool.
    fn settle(&mut self, units: &mut [Display], list: &ShowList, state: &mut ShowState) -> Result<()> {
        let resolved = self.resolve_pending(units, list, state);
        let mut target = lock_surface(&self.surface)?;
        for unit in units.iter_mut() {
            for buffer in unit.take_buffers() {
                target.release(buffer);
            }
        }
        resolved
    }

    /// Stores, for every clock-timed update, the gap to the next update's onset
    /// as its deviation. The final update, and one followed by a fixed delay,
    /// is measured to its own stop time instead.
    fn correction_pass(&mut self, units: &mut [Display]) {
        for (i, record) in self.report.iter().enumerate() {
            if !record.timer.contains(TimerKind::CLOCK) || record.timer.contains(TimerKind::FIXED_DELAY) {
                continue;
            }
            let end = self
                .report
                .get(i + 1)
                .filter(|next| !next.timer.contains(TimerKind::FIXED_DELAY))
                .map(|next| next.onset)
                .unwrap_or(record.stop_time);
            let actual = end.saturating_sub(record.onset);
            if let Some(te) = units[record.unit_index].timing_mut().get_mut(record.group) {
                let deviation = TimingDeviation {
                    intended: te.intended,
                    actual,
                };
                trace!(
                    "PresentationManager: '{}' group {} off by {:.3} ms",
                    record.unit,
                    record.group,
                    deviation.error_ms()
                );
                te.deviation = Some(deviation);
            }
        }
    }
}
