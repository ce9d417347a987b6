// src/surface/mod.rs
//! Presentation target.
//!
//! - SurfaceDriver: platform primitives (allocate, present, blit)
//! - SurfaceManager: buffer pool, back buffer, onset time stamps
//! - FrameBuffer: software RGBA buffer everything is painted into

pub mod driver;
pub mod drivers;
pub mod framebuffer;
pub mod manager;

pub use driver::{SurfaceDriver, SurfaceError, SurfaceMetrics};
pub use framebuffer::FrameBuffer;
pub use manager::{lock_surface, PresentPath, SharedSurface, SurfaceManager};
