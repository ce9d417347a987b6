// src/surface/drivers/headless.rs

//! Headless surface driver.
//!
//! Keeps a copy of whatever was last put on screen. Because the driver is
//! owned by the [`SurfaceManager`](crate::surface::SurfaceManager) once
//! installed, observation goes through a cloneable [`HeadlessProbe`]. An
//! optional allocation limit simulates a target that runs out of video memory.

use crate::geometry::Size;
use crate::surface::driver::{SurfaceDriver, SurfaceError, SurfaceMetrics};
use crate::surface::FrameBuffer;
use log::{info, trace};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug)]
struct FrontState {
    front: FrameBuffer,
    flips: u64,
    blits: u64,
}

/// Read access to what a [`HeadlessDriver`] has put on screen.
#[derive(Debug, Clone)]
pub struct HeadlessProbe {
    state: Arc<Mutex<FrontState>>,
}

impl HeadlessProbe {
    /// Copy of the current front buffer.
    pub fn front(&self) -> Option<FrameBuffer> {
        self.state.lock().ok().map(|s| s.front.clone())
    }

    pub fn flips(&self) -> u64 {
        self.state.lock().map(|s| s.flips).unwrap_or(0)
    }

    pub fn blits(&self) -> u64 {
        self.state.lock().map(|s| s.blits).unwrap_or(0)
    }
}

pub struct HeadlessDriver {
    size: Size,
    supports_swap: bool,
    refresh_interval: Duration,
    allocation_limit: Option<usize>,
    allocated: usize,
    state: Arc<Mutex<FrontState>>,
}

impl HeadlessDriver {
    pub fn new(size: Size) -> Self {
        info!("HeadlessDriver::new() {}x{}", size.width, size.height);
        HeadlessDriver {
            size,
            supports_swap: true,
            refresh_interval: Duration::from_micros(16_667),
            allocation_limit: None,
            allocated: 0,
            state: Arc::new(Mutex::new(FrontState {
                front: FrameBuffer::new(size),
                flips: 0,
                blits: 0,
            })),
        }
    }

    pub fn with_swap(mut self, supports_swap: bool) -> Self {
        self.supports_swap = supports_swap;
        self
    }

    /// Fail allocations after `limit` buffers have been handed out.
    pub fn with_allocation_limit(mut self, limit: usize) -> Self {
        self.allocation_limit = Some(limit);
        self
    }

    pub fn probe(&self) -> HeadlessProbe {
        HeadlessProbe {
            state: Arc::clone(&self.state),
        }
    }

    fn show(&self, frame: &FrameBuffer, flip: bool) -> Result<(), SurfaceError> {
        let mut state = self.state.lock().map_err(|_| SurfaceError::Poisoned)?;
        if !state.front.copy_from(frame) {
            return Err(SurfaceError::SizeMismatch {
                expected: self.size,
                got: frame.size(),
            });
        }
        if flip {
            state.flips += 1;
        } else {
            state.blits += 1;
        }
        Ok(())
    }
}

impl SurfaceDriver for HeadlessDriver {
    fn metrics(&self) -> SurfaceMetrics {
        SurfaceMetrics {
            size: self.size,
            supports_swap: self.supports_swap,
            refresh_interval: self.refresh_interval,
        }
    }

    fn allocate(&mut self, size: Size) -> Option<FrameBuffer> {
        if let Some(limit) = self.allocation_limit {
            if self.allocated >= limit {
                return None;
            }
        }
        self.allocated += 1;
        Some(FrameBuffer::new(size))
    }

    fn present(&mut self, frame: FrameBuffer) -> Result<FrameBuffer, SurfaceError> {
        if frame.size() != self.size {
            return Err(SurfaceError::PresentationFailed {
                reason: format!("frame is {:?}, surface is {:?}", frame.size(), self.size),
                buffer: Some(frame),
            });
        }
        trace!("HeadlessDriver: Present");
        self.show(&frame, true)?;
        Ok(frame)
    }

    fn blit(&mut self, frame: &FrameBuffer) -> Result<(), SurfaceError> {
        trace!("HeadlessDriver: Blit");
        self.show(frame, false)
    }
}
