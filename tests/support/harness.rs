#![allow(dead_code)]

//! Shared fixtures for the presentation tests.
//!
//! Everything runs on a [`ManualClock`] and the headless surface unless a test
//! builds its own manager.

use stimulus_engine::clock::{Clock, ManualClock};
use stimulus_engine::color::Color;
use stimulus_engine::geometry::Size;
use stimulus_engine::params::ParamContext;
use stimulus_engine::surface::drivers::{HeadlessDriver, HeadlessProbe};
use stimulus_engine::surface::{
    lock_surface, FrameBuffer, SharedSurface, SurfaceDriver, SurfaceError, SurfaceManager, SurfaceMetrics,
};
use stimulus_engine::timing::{ClockWait, ResponseFilter, TimingWait, WaitError, WaitOutcome, WaitRequest};
use stimulus_engine::unit::{Display, Stimulus};
use stimulus_engine::workers::CancelToken;
use stimulus_engine::{PresentationManager, Result, ShowStatus};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SURFACE: Size = Size {
    width: 40,
    height: 30,
};

/// Wraps a wait primitive and keeps every request it was given, along with
/// the number of off-screen buffers handed out when the wait began.
pub struct RecordingWait {
    inner: Box<dyn TimingWait>,
    surface: SharedSurface,
    requests: Arc<Mutex<Vec<(WaitRequest, usize)>>>,
}

impl RecordingWait {
    pub fn new(
        inner: Box<dyn TimingWait>,
        surface: SharedSurface,
    ) -> (Self, Arc<Mutex<Vec<(WaitRequest, usize)>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let wait = RecordingWait {
            inner,
            surface,
            requests: Arc::clone(&requests),
        };
        (wait, requests)
    }
}

impl TimingWait for RecordingWait {
    fn register_filter(&mut self, filter: &ResponseFilter) {
        self.inner.register_filter(filter);
    }

    fn wait(&mut self, request: &WaitRequest) -> std::result::Result<WaitOutcome, WaitError> {
        let outstanding = lock_surface(&self.surface).unwrap().outstanding();
        self.requests.lock().unwrap().push((request.clone(), outstanding));
        self.inner.wait(request)
    }
}

/// Headless driver whose off-screen allocations take `cost` on the manual
/// clock, standing in for an expensive render.
pub struct CostlyDriver {
    inner: HeadlessDriver,
    clock: ManualClock,
    cost: Duration,
}

impl CostlyDriver {
    pub fn new(inner: HeadlessDriver, clock: ManualClock, cost: Duration) -> Self {
        CostlyDriver { inner, clock, cost }
    }
}

impl SurfaceDriver for CostlyDriver {
    fn metrics(&self) -> SurfaceMetrics {
        self.inner.metrics()
    }

    fn allocate(&mut self, size: Size) -> Option<FrameBuffer> {
        self.clock.advance(self.cost);
        self.inner.allocate(size)
    }

    fn present(&mut self, frame: FrameBuffer) -> std::result::Result<FrameBuffer, SurfaceError> {
        self.inner.present(frame)
    }

    fn blit(&mut self, frame: &FrameBuffer) -> std::result::Result<(), SurfaceError> {
        self.inner.blit(frame)
    }
}

pub struct Harness {
    pub manager: PresentationManager,
    pub clock: ManualClock,
    pub probe: HeadlessProbe,
    pub requests: Arc<Mutex<Vec<(WaitRequest, usize)>>>,
    pub params: ParamContext,
}

impl Harness {
    pub fn new() -> Self {
        let clock = ManualClock::new();
        let driver = HeadlessDriver::new(SURFACE);
        let probe = driver.probe();
        Self::assemble(Box::new(driver), probe, clock, None, 4)
    }

    /// Every off-screen allocation after the back buffer advances the clock
    /// by `cost`.
    pub fn with_preload_cost(cost: Duration) -> Self {
        let clock = ManualClock::new();
        let headless = HeadlessDriver::new(SURFACE);
        let probe = headless.probe();
        let driver = CostlyDriver::new(headless, clock.clone(), cost);
        let harness = Self::assemble(Box::new(driver), probe, clock, None, 4);
        harness.clock.set(Duration::ZERO);
        harness
    }

    pub fn with_driver(driver: HeadlessDriver, max_buffers: usize) -> Self {
        let probe = driver.probe();
        Self::assemble(Box::new(driver), probe, ManualClock::new(), None, max_buffers)
    }

    /// Uses `wait` (built on `clock`) instead of a plain clock wait.
    pub fn with_wait(clock: ManualClock, wait: Box<dyn TimingWait>) -> Self {
        let driver = HeadlessDriver::new(SURFACE);
        let probe = driver.probe();
        Self::assemble(Box::new(driver), probe, clock, Some(wait), 4)
    }

    fn assemble(
        driver: Box<dyn SurfaceDriver>,
        probe: HeadlessProbe,
        clock: ManualClock,
        wait: Option<Box<dyn TimingWait>>,
        max_buffers: usize,
    ) -> Self {
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        let surface = SurfaceManager::new(driver, Arc::clone(&shared), Color::BLACK, max_buffers)
            .unwrap()
            .into_shared();
        let inner = wait.unwrap_or_else(|| Box::new(ClockWait::new(shared)));
        let (wait, requests) = RecordingWait::new(inner, Arc::clone(&surface));
        let manager = PresentationManager::new(surface, Box::new(wait), CancelToken::new()).unwrap();
        Harness {
            manager,
            clock,
            probe,
            requests,
            params: ParamContext::new(),
        }
    }

    /// A created unit ready to be compiled.
    pub fn unit(&self, name: &str, stimulus: impl Stimulus + 'static) -> Display {
        let mut unit = Display::new(name, Box::new(stimulus));
        unit.create_instance(&self.params).unwrap();
        unit
    }

    pub fn show(&mut self, units: &mut [Display]) -> Result<ShowStatus> {
        self.manager.compile_and_show(units, &self.params)
    }

    pub fn requests(&self) -> Vec<WaitRequest> {
        self.requests.lock().unwrap().iter().map(|(r, _)| r.clone()).collect()
    }

    /// Off-screen buffers held at the start of each wait.
    pub fn buffers_during_waits(&self) -> Vec<usize> {
        self.requests.lock().unwrap().iter().map(|(_, n)| *n).collect()
    }

    pub fn front(&self) -> FrameBuffer {
        self.probe.front().unwrap()
    }
}

pub fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}
