// src/workers/delayed_show.rs

//! Delayed-show worker.
//!
//! Fixed-delay groups are not waited out on the presentation thread. The frame
//! is handed to this worker together with its deadline; the worker sleeps until
//! then and presents it. The presentation thread gets a ticket and must resolve
//! it before it touches the surface again. A non-graphic group is scheduled
//! without a frame; its ticket resolves at the deadline and nothing is shown.

use crate::clock::{Clock, Timestamp};
use crate::error::PresentationError;
use crate::surface::{lock_surface, FrameBuffer, PresentPath, SharedSurface, SurfaceError};
use log::*;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A frame scheduled for presentation.
#[derive(Debug)]
pub struct DelayedShow {
    /// `None` for audio or device-control groups.
    pub frame: Option<FrameBuffer>,
    /// Whether `frame` came from the surface's buffer pool. Pooled frames are
    /// page-flipped; others are copied into the back buffer.
    pub pooled: bool,
    pub deadline: Timestamp,
}

/// What a resolved ticket hands back.
#[derive(Debug)]
pub struct DelayedOnset {
    pub onset: Timestamp,
    /// `None` when nothing was shown.
    pub path: Option<PresentPath>,
    pub frame: Option<FrameBuffer>,
}

pub type DelayedShowResult = Result<DelayedOnset, SurfaceError>;

type Job = (DelayedShow, Sender<DelayedShowResult>);

/// Pending delayed show.
#[derive(Debug)]
pub struct DelayedShowTicket {
    deadline: Timestamp,
    pooled: bool,
    reply: Receiver<DelayedShowResult>,
}

impl DelayedShowTicket {
    pub fn deadline(&self) -> Timestamp {
        self.deadline
    }

    pub fn pooled(&self) -> bool {
        self.pooled
    }

    /// Blocks until the frame is on screen, or the deadline has passed for a
    /// frameless show.
    pub fn wait(self) -> Result<DelayedOnset, PresentationError> {
        match self.reply.recv() {
            Ok(result) => result.map_err(PresentationError::from),
            Err(_) => Err(PresentationError::Worker {
                name: "delayed-show",
                reason: "worker exited before presenting".to_string(),
            }),
        }
    }
}

pub struct DelayedShowWorker {
    jobs: Option<Sender<Job>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl DelayedShowWorker {
    pub fn spawn(surface: SharedSurface, clock: Arc<dyn Clock>) -> Result<Self, PresentationError> {
        let (tx, rx) = mpsc::channel::<Job>();
        let thread_handle = thread::Builder::new()
            .name("delayed-show".to_string())
            .spawn(move || {
                debug!("DelayedShowWorker: Started");
                for (job, reply) in rx {
                    clock.sleep_until(job.deadline);
                    let result = present(&surface, clock.as_ref(), job.frame, job.pooled);
                    match &result {
                        Ok(landed) => trace!(
                            "DelayedShowWorker: {:?} at {:?} (deadline {:?})",
                            landed.path,
                            landed.onset,
                            job.deadline
                        ),
                        Err(e) => warn!("DelayedShowWorker: present failed: {}", e),
                    }
                    if reply.send(result).is_err() {
                        debug!("DelayedShowWorker: ticket dropped before completion");
                    }
                }
                debug!("DelayedShowWorker: Job channel closed, exiting");
            })
            .map_err(|e| PresentationError::Worker {
                name: "delayed-show",
                reason: e.to_string(),
            })?;

        Ok(DelayedShowWorker {
            jobs: Some(tx),
            thread_handle: Some(thread_handle),
        })
    }

    pub fn schedule(&self, show: DelayedShow) -> Result<DelayedShowTicket, PresentationError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        let deadline = show.deadline;
        let pooled = show.pooled;
        let jobs = self.jobs.as_ref().ok_or(PresentationError::Worker {
            name: "delayed-show",
            reason: "worker already shut down".to_string(),
        })?;
        jobs.send((show, reply_tx))
            .map_err(|_| PresentationError::Worker {
                name: "delayed-show",
                reason: "worker thread is gone".to_string(),
            })?;
        Ok(DelayedShowTicket {
            deadline,
            pooled,
            reply: reply_rx,
        })
    }
}

fn present(
    surface: &SharedSurface,
    clock: &dyn Clock,
    frame: Option<FrameBuffer>,
    pooled: bool,
) -> DelayedShowResult {
    let Some(frame) = frame else {
        return Ok(DelayedOnset {
            onset: clock.now(),
            path: None,
            frame: None,
        });
    };
    let mut target = lock_surface(surface)?;
    let (onset, path, frame) = if pooled {
        target.show_buffer(frame)?
    } else {
        let onset = target.paint_live(|fb| {
            fb.copy_from(&frame);
        })?;
        (onset, PresentPath::Live, frame)
    };
    Ok(DelayedOnset {
        onset,
        path: Some(path),
        frame: Some(frame),
    })
}

impl Drop for DelayedShowWorker {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        self.jobs.take();
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                error!("DelayedShowWorker: thread panicked: {:?}", e);
            }
        }
    }
}
