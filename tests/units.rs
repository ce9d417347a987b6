//! Unit lifecycle through the public API: stepping, recompute, stop requests.

mod support;

use stimulus_engine::clock::Timestamp;
use stimulus_engine::color::Color;
use stimulus_engine::error::{PresentationError, StructuralFault};
use stimulus_engine::geometry::Size;
use stimulus_engine::params::{ParamError, ParamRef};
use stimulus_engine::stimuli::{FixationCross, ItemShape, Slide, SlideGroup, SlideItem, Trigger, TriggerSink};
use stimulus_engine::unit::{DisplayState, StereoLayout};
use stimulus_engine::workers::CancelToken;
use stimulus_engine::ShowStatus;
use std::sync::Arc;
use std::time::Duration;
use support::harness::{ms, Harness};

fn three_step_slide() -> Slide {
    Slide::new()
        .item(SlideItem::new("a", ItemShape::Box, (0.2, 0.5), (0.1, 0.2)))
        .item(SlideItem::new("b", ItemShape::Box, (0.5, 0.5), (0.1, 0.2)).in_groups(&[1]))
        .item(SlideItem::new("c", ItemShape::Box, (0.8, 0.5), (0.1, 0.2)).in_groups(&[2]))
        .group(SlideGroup::clock(ms(100)))
        .group(SlideGroup::clock(ms(100)))
        .group(SlideGroup::clock(ms(100)))
}

#[test_log::test]
fn stepping_walks_every_group_then_stops() {
    let mut h = Harness::new();
    let mut unit = h.unit("slide", three_step_slide());
    let params = h.params.clone();

    let mut lit = Vec::new();
    while h.manager.step_one_group(&mut unit, &params).unwrap() {
        let front = h.front();
        lit.push(
            [8, 20, 32]
                .iter()
                .map(|&x| front.color_at(x, 15) == Some(Color::WHITE))
                .collect::<Vec<_>>(),
        );
    }
    assert_eq!(
        lit,
        vec![
            vec![true, false, false],
            vec![false, true, false],
            vec![false, false, true]
        ]
    );
    assert_eq!(unit.state(), DisplayState::Steppable);
    assert_eq!(unit.active_group(), None);
}

#[test_log::test]
fn recompute_is_idempotent() {
    let h = Harness::new();
    let mut unit = h.unit("slide", three_step_slide());
    unit.recompute(Size::new(40, 30), &h.params, None).unwrap();
    let first: Vec<_> = unit.elements().iter().map(|e| e.bounds()).collect();
    unit.recompute(Size::new(40, 30), &h.params, None).unwrap();
    let second: Vec<_> = unit.elements().iter().map(|e| e.bounds()).collect();
    assert_eq!(first, second);
}

#[test_log::test]
fn stereo_draws_each_element_in_both_halves() {
    let h = Harness::new();
    let cross = FixationCross::new(ms(100)).with_arm(2, 1);
    let mut unit = h.unit("fix", cross);
    unit.recompute(Size::new(40, 30), &h.params, Some(StereoLayout { disparity: 0 }))
        .unwrap();

    let mut canvas = stimulus_engine::surface::FrameBuffer::new(Size::new(40, 30));
    unit.set_timing_group(0);
    unit.show_group(&mut canvas, false);
    // Centered in a 20 px wide eye view, once per eye.
    assert_eq!(canvas.color_at(10, 15), Some(Color::WHITE));
    assert_eq!(canvas.color_at(30, 15), Some(Color::WHITE));
}

#[test_log::test]
fn using_a_unit_before_creation_is_a_structural_fault() {
    let mut h = Harness::new();
    let mut units = vec![stimulus_engine::unit::Display::new(
        "raw",
        Box::new(FixationCross::new(ms(100))),
    )];
    let err = h.show(&mut units).unwrap_err();
    assert!(matches!(
        err,
        PresentationError::Structural(StructuralFault::NotInstantiated { .. })
    ));
}

#[test_log::test]
fn out_of_range_duration_parameter_is_a_lookup_fault() {
    let mut h = Harness::new();
    h.params.push("d", 1e25f64);
    let slide = Slide::new()
        .item(SlideItem::new("a", ItemShape::Box, (0.5, 0.5), (0.1, 0.2)))
        .group(SlideGroup::clock(ParamRef::<Duration>::param("d")));
    let mut units = vec![h.unit("slide", slide)];

    let err = h.show(&mut units).unwrap_err();
    assert!(matches!(
        err,
        PresentationError::Lookup {
            source: ParamError::Invalid { .. },
            ..
        }
    ));
    assert!(!err.is_structural());
}

/// Raises the stop flag as soon as its trigger goes out.
struct StopOnTrigger(CancelToken);

impl TriggerSink for StopOnTrigger {
    fn emit(&self, _code: u32, _at: Timestamp) {
        self.0.cancel();
    }
}

#[test_log::test]
fn stop_request_ends_the_show_at_the_next_entry() {
    let mut h = Harness::new();
    let stop = Arc::new(StopOnTrigger(h.manager.stop_token().clone()));
    let mut units = vec![
        h.unit("first", FixationCross::new(ms(100))),
        h.unit("abort", Trigger::new(vec![1u32], stop)),
        h.unit("second", FixationCross::new(ms(100))),
        h.unit("never", FixationCross::new(ms(100))),
    ];

    assert_eq!(h.show(&mut units).unwrap(), ShowStatus::Stopped);
    assert_eq!(h.manager.last_report().len(), 2);
    assert!(units[3].timing()[0].onset.is_none());

    // No cached buffer outlives the show apart from the one on screen.
    let outstanding = stimulus_engine::surface::lock_surface(h.manager.surface())
        .unwrap()
        .outstanding();
    assert!(outstanding <= 1);

    h.manager.stop_token().reset();
    assert_eq!(h.show(&mut units[..1]).unwrap(), ShowStatus::Ok);
}
