// src/stimuli/slide.rs

//! Declarative multi-group stimulus.
//!
//! Items are placed in normalized coordinates: `(0.0, 0.0)` is the top-left
//! and `(1.0, 1.0)` the bottom-right corner of the drawing area; extents are
//! fractions of the area's width and height.

use crate::color::Color;
use crate::geometry::{Point, Rect, Size};
use crate::params::{ParamContext, ParamError, ParamRef};
use crate::timing::{ResponseFilter, TimerKind, TimingElement, TimingSpec};
use crate::unit::{Element, ElementBuilder, Shape, Stimulus};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemShape {
    Box,
    Frame { thickness: u32 },
    Cross { thickness: u32 },
    Dot,
}

#[derive(Debug, Clone)]
pub struct SlideItem {
    pub name: String,
    pub groups: Vec<usize>,
    pub shape: ItemShape,
    pub center: (f64, f64),
    pub extent: (f64, f64),
    pub color: ParamRef<Color>,
}

impl SlideItem {
    pub fn new(name: &str, shape: ItemShape, center: (f64, f64), extent: (f64, f64)) -> Self {
        SlideItem {
            name: name.to_string(),
            groups: vec![0],
            shape,
            center,
            extent,
            color: ParamRef::Fixed(Color::WHITE),
        }
    }

    pub fn in_groups(mut self, groups: &[usize]) -> Self {
        self.groups = groups.to_vec();
        self
    }

    pub fn with_color(mut self, color: impl Into<ParamRef<Color>>) -> Self {
        self.color = color.into();
        self
    }

    fn place(&self, area: Size) -> Shape {
        let center = Point::new(
            (self.center.0 * area.width as f64).round() as i32,
            (self.center.1 * area.height as f64).round() as i32,
        );
        let width = (self.extent.0 * area.width as f64).round().max(1.0) as u32;
        let height = (self.extent.1 * area.height as f64).round().max(1.0) as u32;
        match self.shape {
            ItemShape::Box => Shape::Rect {
                rect: Rect::centered(center, width, height),
                color: Color::WHITE,
                filled: true,
                thickness: 0,
            },
            ItemShape::Frame { thickness } => Shape::Rect {
                rect: Rect::centered(center, width, height),
                color: Color::WHITE,
                filled: false,
                thickness,
            },
            ItemShape::Cross { thickness } => Shape::Cross {
                center,
                arm: width.min(height) / 2,
                thickness,
                color: Color::WHITE,
            },
            ItemShape::Dot => Shape::Disc {
                center,
                radius: width.min(height) / 2,
                color: Color::WHITE,
            },
        }
    }
}

/// Timing of one slide group.
#[derive(Debug, Clone)]
pub struct SlideGroup {
    pub timer: TimerKind,
    pub duration: ParamRef<Duration>,
    pub responses: ResponseFilter,
    pub reference: Option<usize>,
}

impl SlideGroup {
    pub fn clock(duration: impl Into<ParamRef<Duration>>) -> Self {
        SlideGroup {
            timer: TimerKind::CLOCK,
            duration: duration.into(),
            responses: ResponseFilter::Any,
            reference: None,
        }
    }

    pub fn untimed() -> Self {
        SlideGroup {
            timer: TimerKind::NO_TIMER,
            duration: ParamRef::Fixed(Duration::ZERO),
            responses: ResponseFilter::Any,
            reference: None,
        }
    }

    pub fn with_timer(mut self, timer: TimerKind) -> Self {
        self.timer = timer;
        self
    }

    pub fn with_responses(mut self, responses: ResponseFilter) -> Self {
        self.responses = responses;
        self
    }

    /// Measure a fixed delay from the stop of group `reference`.
    pub fn after(mut self, reference: usize) -> Self {
        self.reference = Some(reference);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Slide {
    items: Vec<SlideItem>,
    groups: Vec<SlideGroup>,
}

impl Slide {
    pub fn new() -> Self {
        Slide::default()
    }

    pub fn item(mut self, item: SlideItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn group(mut self, group: SlideGroup) -> Self {
        self.groups.push(group);
        self
    }
}

impl Stimulus for Slide {
    fn build(&mut self, builder: &mut ElementBuilder, _params: &ParamContext) -> Result<(), ParamError> {
        for item in &self.items {
            builder.add_in(&item.name, &item.groups);
        }
        for group in &self.groups {
            builder.timing(TimingSpec {
                timer: group.timer,
                intended: Duration::ZERO,
                responses: group.responses.clone(),
                reference: group.reference,
            });
        }
        Ok(())
    }

    fn compute_geometry(
        &mut self,
        elements: &mut [Element],
        area: Size,
        _params: &ParamContext,
    ) -> Result<(), ParamError> {
        for (element, item) in elements.iter_mut().zip(&self.items) {
            element.shape = item.place(area);
        }
        Ok(())
    }

    fn compute_timing(
        &mut self,
        timing: &mut [TimingElement],
        params: &ParamContext,
    ) -> Result<(), ParamError> {
        for (element, group) in timing.iter_mut().zip(&self.groups) {
            element.intended = group.duration.resolve(params)?;
        }
        Ok(())
    }

    fn compute_colors(&mut self, elements: &mut [Element], params: &ParamContext) -> Result<(), ParamError> {
        for (element, item) in elements.iter_mut().zip(&self.items) {
            element.shape.set_color(item.color.resolve(params)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::Display;

    fn two_group_slide() -> Slide {
        Slide::new()
            .item(SlideItem::new("cue", ItemShape::Box, (0.25, 0.5), (0.1, 0.1)))
            .item(
                SlideItem::new("target", ItemShape::Dot, (0.75, 0.5), (0.1, 0.1))
                    .in_groups(&[1])
                    .with_color(ParamRef::param("target.color")),
            )
            .group(SlideGroup::clock(Duration::from_millis(100)))
            .group(SlideGroup::clock(ParamRef::param("target.ms")))
    }

    #[test_log::test]
    fn groups_and_durations_resolve() {
        let mut params = ParamContext::new();
        params.set("target.color", "red");
        params.set("target.ms", 750.0);
        let mut unit = Display::new("slide", Box::new(two_group_slide()));
        unit.create_instance(&params).unwrap();
        unit.recompute(Size::new(100, 40), &params, None).unwrap();

        assert_eq!(unit.group_count(), 2);
        assert_eq!(unit.timing()[1].intended, Duration::from_millis(750));
        assert_eq!(unit.elements()[1].bounds(), Rect::centered(Point::new(25, 20), 10, 4));
    }

    #[test_log::test]
    fn missing_parameter_is_reported() {
        let params = ParamContext::new();
        let mut unit = Display::new("slide", Box::new(two_group_slide()));
        unit.create_instance(&params).unwrap();
        let err = unit.recompute(Size::new(100, 40), &params, None).unwrap_err();
        assert!(matches!(err, crate::error::PresentationError::Lookup { .. }));
    }
}
