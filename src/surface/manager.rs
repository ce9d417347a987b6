// src/surface/manager.rs
//! SurfaceManager - buffer pooling and time-stamped presentation on top of a
//! [`SurfaceDriver`].

use crate::clock::{Clock, Timestamp};
use crate::color::Color;
use crate::geometry::Size;
use crate::surface::driver::{SurfaceDriver, SurfaceError, SurfaceMetrics};
use crate::surface::FrameBuffer;
use log::{debug, info, trace, warn};
use std::sync::{Arc, Mutex, MutexGuard};

/// How a frame reached the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentPath {
    /// A preloaded buffer was page-flipped.
    Swap,
    /// A preloaded buffer was copied to the front.
    Blit,
    /// The frame was painted into the back buffer at show time.
    Live,
}

/// Owns the driver, the off-screen buffer pool and the back buffer used for
/// live paints.
pub struct SurfaceManager {
    driver: Box<dyn SurfaceDriver>,
    metrics: SurfaceMetrics,
    clock: Arc<dyn Clock>,
    background: Color,
    pool: Vec<FrameBuffer>,
    outstanding: usize,
    max_buffers: usize,
    back: Option<FrameBuffer>,
    last_path: Option<PresentPath>,
    last_onset: Option<Timestamp>,
    presents: u64,
}

/// The surface as shared between the presentation thread and its workers.
pub type SharedSurface = Arc<Mutex<SurfaceManager>>;

/// Locks a shared surface, mapping poisoning to a [`SurfaceError`].
pub fn lock_surface(surface: &SharedSurface) -> Result<MutexGuard<'_, SurfaceManager>, SurfaceError> {
    surface.lock().map_err(|_| SurfaceError::Poisoned)
}

impl SurfaceManager {
    /// Wraps `driver`. `max_buffers` bounds the number of off-screen buffers
    /// alive at once (pooled or attached to timing elements).
    pub fn new(
        mut driver: Box<dyn SurfaceDriver>,
        clock: Arc<dyn Clock>,
        background: Color,
        max_buffers: usize,
    ) -> Result<Self, SurfaceError> {
        let metrics = driver.metrics();
        let mut back = driver
            .allocate(metrics.size)
            .ok_or(SurfaceError::BackBufferUnavailable(metrics.size))?;
        back.clear(background);
        info!(
            "SurfaceManager: {}x{} px, swap={}, max_buffers={}",
            metrics.size.width, metrics.size.height, metrics.supports_swap, max_buffers
        );
        Ok(SurfaceManager {
            driver,
            metrics,
            clock,
            background,
            pool: Vec::new(),
            outstanding: 0,
            max_buffers,
            back: Some(back),
            last_path: None,
            last_onset: None,
            presents: 0,
        })
    }

    pub fn into_shared(self) -> SharedSurface {
        Arc::new(Mutex::new(self))
    }

    pub fn size(&self) -> Size {
        self.metrics.size
    }

    pub fn metrics(&self) -> &SurfaceMetrics {
        &self.metrics
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn presents(&self) -> u64 {
        self.presents
    }

    pub fn last_onset(&self) -> Option<Timestamp> {
        self.last_onset
    }

    pub fn last_path(&self) -> Option<PresentPath> {
        self.last_path
    }

    /// Off-screen buffers currently handed out.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// A surface-sized off-screen buffer with unspecified content, or `None`
    /// when the buffer budget is spent or the driver is out of memory.
    pub fn acquire(&mut self) -> Option<FrameBuffer> {
        if let Some(buffer) = self.pool.pop() {
            self.outstanding += 1;
            return Some(buffer);
        }
        if self.outstanding >= self.max_buffers {
            debug!(
                "SurfaceManager: buffer budget of {} exhausted",
                self.max_buffers
            );
            return None;
        }
        match self.driver.allocate(self.metrics.size) {
            Some(buffer) => {
                self.outstanding += 1;
                Some(buffer)
            }
            None => {
                warn!("SurfaceManager: driver failed to allocate an off-screen buffer");
                None
            }
        }
    }

    /// Returns a buffer obtained from [`acquire`](Self::acquire).
    pub fn release(&mut self, buffer: FrameBuffer) {
        self.outstanding = self.outstanding.saturating_sub(1);
        if buffer.size() == self.metrics.size {
            self.pool.push(buffer);
        }
    }

    fn check_size(&self, frame: &FrameBuffer) -> Result<(), SurfaceError> {
        if frame.size() != self.metrics.size {
            return Err(SurfaceError::SizeMismatch {
                expected: self.metrics.size,
                got: frame.size(),
            });
        }
        Ok(())
    }

    fn stamp(&mut self, path: PresentPath) -> Timestamp {
        let onset = self.clock.now();
        self.presents += 1;
        self.last_path = Some(path);
        self.last_onset = Some(onset);
        trace!("SurfaceManager: {:?} present #{} at {:?}", path, self.presents, onset);
        onset
    }

    /// Puts a preloaded buffer on screen. Drivers without page flipping get a
    /// blit instead. The buffer is handed back together with the onset.
    pub fn show_buffer(
        &mut self,
        frame: FrameBuffer,
    ) -> Result<(Timestamp, PresentPath, FrameBuffer), SurfaceError> {
        self.check_size(&frame)?;
        if !self.metrics.supports_swap {
            if let Err(e) = self.driver.blit(&frame) {
                self.release(frame);
                return Err(e);
            }
            let onset = self.stamp(PresentPath::Blit);
            return Ok((onset, PresentPath::Blit, frame));
        }
        match self.driver.present(frame) {
            Ok(frame) => {
                let onset = self.stamp(PresentPath::Swap);
                Ok((onset, PresentPath::Swap, frame))
            }
            Err(SurfaceError::PresentationFailed { reason, buffer }) => {
                if let Some(buffer) = buffer {
                    self.release(buffer);
                }
                Err(SurfaceError::PresentationFailed {
                    reason,
                    buffer: None,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Paints into the back buffer with `paint` and presents it.
    pub fn paint_live<F>(&mut self, paint: F) -> Result<Timestamp, SurfaceError>
    where
        F: FnOnce(&mut FrameBuffer),
    {
        let mut back = match self.back.take() {
            Some(back) => back,
            None => return Err(SurfaceError::BackBufferUnavailable(self.metrics.size)),
        };
        paint(&mut back);
        let result = if self.metrics.supports_swap {
            self.driver.present(back)
        } else {
            self.driver.blit(&back).map(|_| back)
        };
        match result {
            Ok(back) => {
                self.back = Some(back);
                Ok(self.stamp(PresentPath::Live))
            }
            Err(SurfaceError::PresentationFailed { reason, buffer }) => {
                self.back = buffer;
                Err(SurfaceError::PresentationFailed {
                    reason,
                    buffer: None,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Copy of the most recent live paint. Used to carry a live-painted frame
    /// forward under a transparent overlay.
    pub fn snapshot_back_buffer(&self) -> Option<FrameBuffer> {
        self.back.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::surface::drivers::HeadlessDriver;
    use std::time::Duration;

    fn manager(supports_swap: bool, max_buffers: usize) -> (SurfaceManager, ManualClock) {
        let clock = ManualClock::new();
        let driver = HeadlessDriver::new(Size::new(8, 6)).with_swap(supports_swap);
        let mgr = SurfaceManager::new(
            Box::new(driver),
            Arc::new(clock.clone()),
            Color::BLACK,
            max_buffers,
        )
        .unwrap();
        (mgr, clock)
    }

    #[test_log::test]
    fn acquire_respects_budget_and_recycles() {
        let (mut mgr, _clock) = manager(true, 2);
        let a = mgr.acquire().unwrap();
        let b = mgr.acquire().unwrap();
        assert!(mgr.acquire().is_none());
        mgr.release(a);
        assert_eq!(mgr.outstanding(), 1);
        assert!(mgr.acquire().is_some());
        mgr.release(b);
    }

    #[test_log::test]
    fn show_buffer_stamps_onset() {
        let (mut mgr, clock) = manager(true, 2);
        clock.advance(Duration::from_millis(12));
        let buffer = mgr.acquire().unwrap();
        let (onset, path, buffer) = mgr.show_buffer(buffer).unwrap();
        assert_eq!(onset, Duration::from_millis(12));
        assert_eq!(path, PresentPath::Swap);
        assert_eq!(mgr.presents(), 1);
        mgr.release(buffer);
    }

    #[test_log::test]
    fn no_swap_support_falls_back_to_blit() {
        let (mut mgr, _clock) = manager(false, 2);
        let buffer = mgr.acquire().unwrap();
        let (_, path, _buffer) = mgr.show_buffer(buffer).unwrap();
        assert_eq!(path, PresentPath::Blit);
    }

    #[test_log::test]
    fn live_paint_keeps_back_buffer() {
        let (mut mgr, _clock) = manager(true, 1);
        mgr.paint_live(|fb| fb.clear(Color::WHITE)).unwrap();
        assert_eq!(mgr.last_path(), Some(PresentPath::Live));
        let copy = mgr.snapshot_back_buffer().unwrap();
        assert_eq!(copy.color_at(0, 0), Some(Color::WHITE));
    }

    #[test_log::test]
    fn wrong_size_is_rejected() {
        let (mut mgr, _clock) = manager(true, 1);
        let err = mgr.show_buffer(FrameBuffer::new(Size::new(2, 2))).unwrap_err();
        assert!(matches!(err, SurfaceError::SizeMismatch { .. }));
    }
}
