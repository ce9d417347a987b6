// src/workers/animation.rs

//! Animation worker: repaints an animated unit on its own thread while the
//! presentation thread blocks on the unit's wait.

use crate::clock::{Clock, Timestamp};
use crate::error::PresentationError;
use crate::surface::{lock_surface, FrameBuffer, SharedSurface};
use crate::workers::CancelToken;
use log::*;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);
const CANCEL_POLL: Duration = Duration::from_millis(1);

/// Frame source of an animated unit.
pub trait Animation: Send {
    fn frame_interval(&self) -> Duration;

    /// Paints the frame due `elapsed` after onset. `canvas` already holds the
    /// unit's static frame. Returns false once the animation has finished.
    fn frame(&mut self, elapsed: Duration, canvas: &mut FrameBuffer) -> bool;
}

/// Handle to a running animation thread. Dropping it stops and joins the
/// thread.
pub struct AnimationWorker {
    unit: String,
    cancel: CancelToken,
    thread_handle: Option<JoinHandle<u64>>,
}

impl AnimationWorker {
    /// Starts repainting `base` plus the animation's frames, measuring elapsed
    /// time from `onset`.
    pub fn spawn(
        unit: &str,
        mut animation: Box<dyn Animation>,
        base: FrameBuffer,
        surface: SharedSurface,
        clock: Arc<dyn Clock>,
        onset: Timestamp,
    ) -> Result<Self, PresentationError> {
        let cancel = CancelToken::new();
        let stop = cancel.clone();
        let interval = animation.frame_interval().max(MIN_FRAME_INTERVAL);
        let name = unit.to_string();

        let thread_handle = thread::Builder::new()
            .name(format!("animation-{}", unit))
            .spawn(move || {
                debug!("AnimationWorker: '{}' started, interval {:?}", name, interval);
                let mut canvas = base.clone();
                let mut next = onset + interval;
                let mut frames = 0u64;
                'frames: loop {
                    // Pace on the presentation clock but sleep in short real
                    // slices so a stop request is seen promptly.
                    loop {
                        if stop.is_cancelled() {
                            break 'frames;
                        }
                        let now = clock.now();
                        if now >= next {
                            break;
                        }
                        thread::sleep((next - now).min(CANCEL_POLL));
                    }

                    canvas.copy_from(&base);
                    let more = animation.frame(clock.elapsed_since(onset), &mut canvas);
                    let painted = lock_surface(&surface)
                        .and_then(|mut s| s.paint_live(|fb| {
                            fb.copy_from(&canvas);
                        }));
                    if let Err(e) = painted {
                        warn!("AnimationWorker: '{}' frame {} failed: {}", name, frames, e);
                        break;
                    }
                    frames += 1;
                    if !more {
                        break;
                    }
                    next += interval;
                }
                debug!("AnimationWorker: '{}' exiting after {} frames", name, frames);
                frames
            })
            .map_err(|e| PresentationError::Worker {
                name: "animation",
                reason: e.to_string(),
            })?;

        Ok(AnimationWorker {
            unit: unit.to_string(),
            cancel,
            thread_handle: Some(thread_handle),
        })
    }

    /// Stops the thread and waits for it. Returns the number of frames painted.
    pub fn stop(mut self) -> Result<u64, PresentationError> {
        self.cancel.cancel();
        match self.thread_handle.take() {
            Some(handle) => handle.join().map_err(|_| PresentationError::Worker {
                name: "animation",
                reason: format!("thread for '{}' panicked", self.unit),
            }),
            None => Ok(0),
        }
    }
}

impl Drop for AnimationWorker {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                error!("AnimationWorker: '{}' thread panicked: {:?}", self.unit, e);
            }
        }
    }
}
