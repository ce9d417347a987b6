//! Join, transparent and list-overlay composition as seen on the front buffer.

mod support;

use stimulus_engine::color::Color;
use stimulus_engine::error::{PresentationError, StructuralFault};
use stimulus_engine::stimuli::{FixationCross, ItemShape, Slide, SlideGroup, SlideItem};
use stimulus_engine::unit::{Display, OverlayKind};
use support::harness::{ms, Harness};

const RED: Color = Color::rgb(255, 0, 0);

/// A single filled box at `x` (normalized) shown for `duration` ms.
fn square(h: &Harness, name: &str, x: f64, color: Color, duration: u64) -> Display {
    let slide = Slide::new()
        .item(SlideItem::new(name, ItemShape::Box, (x, 0.5), (0.2, 0.2)).with_color(color))
        .group(SlideGroup::clock(ms(duration)));
    h.unit(name, slide)
}

#[test_log::test]
fn join_chain_is_one_update_timed_by_its_tail() {
    let mut h = Harness::new();
    let mut units = vec![
        square(&h, "left", 0.25, Color::WHITE, 100),
        square(&h, "middle", 0.5, Color::WHITE, 150).with_overlay(OverlayKind::Join),
        square(&h, "right", 0.75, RED, 400).with_overlay(OverlayKind::Join),
    ];
    h.show(&mut units).unwrap();

    let report = h.manager.last_report();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].unit, "right");
    assert_eq!(report[0].intended, ms(400));
    assert!(units[0].timing()[0].onset.is_none());
    assert!(units[1].timing()[0].onset.is_none());
    assert!(units[2].timing()[0].onset.is_some());
    assert_eq!(h.probe.flips(), 1);

    let front = h.front();
    assert_eq!(front.color_at(10, 15), Some(Color::WHITE));
    assert_eq!(front.color_at(20, 15), Some(Color::WHITE));
    assert_eq!(front.color_at(30, 15), Some(RED));
}

#[test_log::test]
fn join_as_first_unit_is_rejected() {
    let mut h = Harness::new();
    let mut units = vec![square(&h, "j", 0.5, Color::WHITE, 100).with_overlay(OverlayKind::Join)];

    let err = h.show(&mut units).unwrap_err();
    assert!(err.is_structural());
    assert!(matches!(
        err,
        PresentationError::Structural(StructuralFault::OverlayFirst { .. })
    ));
    assert!(h.manager.last_report().is_empty());
    assert_eq!(h.probe.flips(), 0);
}

#[test_log::test]
fn transparent_unit_draws_over_the_previous_frame() {
    let mut h = Harness::new();
    let mut units = vec![
        square(&h, "first", 0.25, Color::WHITE, 100),
        square(&h, "over", 0.75, RED, 100).with_overlay(OverlayKind::Transparent),
    ];
    h.show(&mut units).unwrap();

    let front = h.front();
    assert_eq!(front.color_at(10, 15), Some(Color::WHITE));
    assert_eq!(front.color_at(30, 15), Some(RED));
    assert!(h.manager.last_report()[1].preloaded);
}

#[test_log::test]
fn opaque_unit_replaces_the_previous_frame() {
    let mut h = Harness::new();
    let mut units = vec![
        square(&h, "first", 0.25, Color::WHITE, 100),
        square(&h, "second", 0.75, RED, 100),
    ];
    h.show(&mut units).unwrap();

    let front = h.front();
    assert_eq!(front.color_at(10, 15), Some(Color::BLACK));
    assert_eq!(front.color_at(30, 15), Some(RED));
}

#[test_log::test]
fn list_overlay_stays_on_top_of_following_units() {
    let mut h = Harness::new();
    let frame = Slide::new()
        .item(SlideItem::new("frame", ItemShape::Frame { thickness: 1 }, (0.5, 0.5), (0.9, 0.9)))
        .group(SlideGroup::untimed());
    let mut units = vec![
        h.unit("frame", frame).with_overlay(OverlayKind::ListOverlay),
        square(&h, "a", 0.25, RED, 100),
        square(&h, "b", 0.75, RED, 100),
    ];
    h.show(&mut units).unwrap();

    // The overlay unit is not an update of its own.
    assert_eq!(h.manager.last_report().len(), 2);
    let front = h.front();
    let frame_rect = units[0].elements()[1].bounds();
    assert_eq!(front.color_at(frame_rect.x, frame_rect.center().y), Some(Color::WHITE));
    assert_eq!(front.color_at(30, 15), Some(RED));
}

#[test_log::test]
fn cleared_list_overlay_is_gone() {
    let mut h = Harness::new();
    let frame = Slide::new()
        .item(SlideItem::new("frame", ItemShape::Frame { thickness: 1 }, (0.5, 0.5), (0.9, 0.9)))
        .group(SlideGroup::untimed());
    let mut units = vec![
        h.unit("frame", frame).with_overlay(OverlayKind::ListOverlay),
        square(&h, "a", 0.25, RED, 100),
        h.unit("clear", FixationCross::new(ms(0))).with_overlay(OverlayKind::ClearListOverlay),
        square(&h, "b", 0.75, RED, 100),
    ];
    h.show(&mut units).unwrap();

    assert_eq!(h.manager.last_report().len(), 2);
    let frame_rect = units[0].elements()[1].bounds();
    assert_eq!(
        h.front().color_at(frame_rect.x, frame_rect.center().y),
        Some(Color::BLACK)
    );
}
