// src/surface/driver.rs

//! SurfaceDriver trait - minimal interface to the physical display.
//!
//! The driver only knows how to hand out buffers and put them on screen. All
//! pooling, back-buffer handling and time stamping lives in
//! [`SurfaceManager`](crate::surface::SurfaceManager).
//!
//! ## Ownership
//! `present` takes the buffer by value and hands it back once it is on screen,
//! the same ping-pong as a swap chain. When presentation fails the buffer comes
//! back inside [`SurfaceError::PresentationFailed`] so the pool never starves.

use crate::geometry::Size;
use crate::surface::FrameBuffer;
use std::time::Duration;
use thiserror::Error;

/// Properties of the target surface discovered at initialization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMetrics {
    pub size: Size,
    /// Whether `present` is a true page flip. Drivers without one only
    /// support copying buffers to the front (`blit`).
    pub supports_swap: bool,
    /// Nominal refresh interval, zero if unknown.
    pub refresh_interval: Duration,
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("presentation failed: {reason}")]
    PresentationFailed {
        reason: String,
        buffer: Option<FrameBuffer>,
    },
    #[error("buffer of size {got:?} does not match surface size {expected:?}")]
    SizeMismatch { expected: Size, got: Size },
    #[error("could not allocate the {0:?} back buffer")]
    BackBufferUnavailable(Size),
    #[error("surface lock poisoned by a panicking worker")]
    Poisoned,
}

/// Platform primitives of a presentation target.
pub trait SurfaceDriver: Send {
    fn metrics(&self) -> SurfaceMetrics;

    /// Allocates an off-screen buffer. `None` signals exhausted resources.
    fn allocate(&mut self, size: Size) -> Option<FrameBuffer> {
        Some(FrameBuffer::new(size))
    }

    /// Puts `frame` on screen (page flip) and returns it once displayed.
    fn present(&mut self, frame: FrameBuffer) -> Result<FrameBuffer, SurfaceError>;

    /// Copies `frame` to the front buffer.
    fn blit(&mut self, frame: &FrameBuffer) -> Result<(), SurfaceError>;
}
