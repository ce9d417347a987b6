//! Delayed shows and animations on the system clock.

mod support;

use stimulus_engine::clock::{Clock, SystemClock, Timestamp};
use stimulus_engine::color::Color;
use stimulus_engine::params::{ParamContext, ParamError};
use stimulus_engine::stimuli::{FixationCross, ItemShape, MovingDot, Slide, SlideGroup, SlideItem};
use stimulus_engine::surface::drivers::{HeadlessDriver, HeadlessProbe};
use stimulus_engine::surface::{PresentPath, SurfaceManager};
use stimulus_engine::timing::{ClockWait, TimerKind, TimingSpec};
use stimulus_engine::unit::{Display, ElementBuilder, Stimulus, StimulusKind};
use stimulus_engine::workers::CancelToken;
use stimulus_engine::PresentationManager;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use support::harness::{ms, SURFACE};

fn realtime_manager() -> (PresentationManager, HeadlessProbe) {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::default());
    let driver = HeadlessDriver::new(SURFACE);
    let probe = driver.probe();
    let surface = SurfaceManager::new(Box::new(driver), Arc::clone(&clock), Color::BLACK, 4)
        .unwrap()
        .into_shared();
    let wait = ClockWait::new(clock);
    let manager = PresentationManager::new(surface, Box::new(wait), CancelToken::new()).unwrap();
    (manager, probe)
}

fn created(name: &str, stimulus: impl stimulus_engine::unit::Stimulus + 'static) -> Display {
    let mut unit = Display::new(name, Box::new(stimulus));
    unit.create_instance(&ParamContext::new()).unwrap();
    unit
}

#[test_log::test]
fn fixed_delay_does_not_block_the_presentation_thread() {
    let (mut manager, probe) = realtime_manager();
    let slide = Slide::new()
        .item(SlideItem::new("cue", ItemShape::Box, (0.25, 0.5), (0.2, 0.2)))
        .item(SlideItem::new("target", ItemShape::Box, (0.75, 0.5), (0.2, 0.2)).in_groups(&[1]))
        .group(SlideGroup::clock(ms(100)))
        .group(
            SlideGroup::clock(ms(1500))
                .with_timer(TimerKind::FIXED_DELAY)
                .after(0),
        );
    let mut units = vec![created("slide", slide)];

    manager.compile_and_show(&mut units, &ParamContext::new()).unwrap();

    let report = manager.last_report();
    assert_eq!(report.len(), 2);
    assert!(report[1].blocked_for < ms(50), "blocked for {:?}", report[1].blocked_for);

    let timing = units[0].timing();
    let deadline = timing[0].stop_time.unwrap() + ms(1500);
    let onset = timing[1].onset.unwrap();
    assert!(onset >= deadline);
    assert!(onset - deadline < ms(20), "late by {:?}", onset - deadline);
    assert_eq!(report[1].onset, onset);
    assert_eq!(report[1].path, Some(PresentPath::Swap));

    let deviation = timing[1].deviation.unwrap();
    assert!(deviation.error_micros() >= 0);
    assert!(deviation.error_micros() < 20_000);
    // The clock group is measured to its own stop, not to the delayed onset.
    assert!(timing[0].deviation.unwrap().error_micros() < 20_000);

    assert_eq!(probe.front().unwrap().color_at(30, 15), Some(Color::WHITE));
}

#[test_log::test]
fn animated_unit_keeps_painting_during_its_wait() {
    let (mut manager, probe) = realtime_manager();
    let dot = MovingDot::new((0.1, 0.5), (0.9, 0.5), ms(200)).with_frame_interval(ms(10));
    let mut units = vec![created("dot", dot)];

    manager.compile_and_show(&mut units, &ParamContext::new()).unwrap();

    let report = manager.last_report();
    assert_eq!(report.len(), 1);
    assert!(!report[0].preloaded);
    // One present for the unit itself, the rest from the animation worker.
    assert!(probe.flips() >= 3, "only {} flips", probe.flips());
}

/// Audio-like unit that starts a fixed delay after the previous update.
struct DelayedTone {
    delay: Duration,
    played: Arc<Mutex<Vec<Timestamp>>>,
}

impl Stimulus for DelayedTone {
    fn build(&mut self, builder: &mut ElementBuilder, _params: &ParamContext) -> Result<(), ParamError> {
        builder.timing(TimingSpec {
            timer: TimerKind::FIXED_DELAY,
            intended: self.delay,
            ..Default::default()
        });
        Ok(())
    }

    fn kind(&self) -> StimulusKind {
        StimulusKind::NonGraphic
    }

    fn on_present(&mut self, _group: usize, onset: Timestamp) {
        self.played.lock().unwrap().push(onset);
    }
}

#[test_log::test]
fn fixed_delay_holds_back_a_non_graphic_unit() {
    let (mut manager, probe) = realtime_manager();
    let played = Arc::new(Mutex::new(Vec::new()));
    let tone = DelayedTone {
        delay: ms(300),
        played: Arc::clone(&played),
    };
    let mut units = vec![
        created("fix", FixationCross::new(ms(100))),
        created("tone", tone),
        created("after", FixationCross::new(ms(50))),
    ];

    manager.compile_and_show(&mut units, &ParamContext::new()).unwrap();

    let fix_stop = units[0].timing()[0].stop_time.unwrap();
    let played = played.lock().unwrap().clone();
    assert_eq!(played.len(), 1);
    let deadline = fix_stop + ms(300);
    assert!(played[0] >= deadline, "tone at {:?}, deadline {:?}", played[0], deadline);
    assert!(played[0] - deadline < ms(20), "late by {:?}", played[0] - deadline);

    let report = manager.last_report();
    assert_eq!(report.len(), 3);
    assert_eq!(report[1].path, None);
    assert_eq!(report[1].onset, played[0]);
    assert!(report[1].blocked_for < ms(50), "blocked for {:?}", report[1].blocked_for);
    assert!(report[2].onset >= played[0]);

    let deviation = units[1].timing()[0].deviation.unwrap();
    assert!(deviation.error_micros() >= 0);
    assert!(deviation.error_micros() < 20_000);
    // Only the two fixation crosses ever reach the screen.
    assert_eq!(probe.flips(), 2);
}
