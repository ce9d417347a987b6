// src/stimuli/moving_dot.rs

//! A dot travelling in a straight line, painted by the animation worker.

use crate::color::Color;
use crate::geometry::{Point, Rect, Size};
use crate::params::{ParamContext, ParamError, ParamRef};
use crate::surface::FrameBuffer;
use crate::timing::{TimingElement, TimingSpec};
use crate::unit::{Element, ElementBuilder, Shape, Stimulus};
use crate::workers::Animation;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MovingDot {
    from: (f64, f64),
    to: (f64, f64),
    radius: u32,
    color: ParamRef<Color>,
    duration: ParamRef<Duration>,
    frame_interval: Duration,
    path: Option<(Point, Point)>,
    resolved_color: Color,
    resolved_duration: Duration,
}

impl MovingDot {
    /// `from` and `to` are normalized coordinates of the drawing area.
    pub fn new(from: (f64, f64), to: (f64, f64), duration: impl Into<ParamRef<Duration>>) -> Self {
        MovingDot {
            from,
            to,
            radius: 4,
            color: ParamRef::Fixed(Color::WHITE),
            duration: duration.into(),
            frame_interval: Duration::from_micros(16_667),
            path: None,
            resolved_color: Color::WHITE,
            resolved_duration: Duration::ZERO,
        }
    }

    pub fn with_radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_color(mut self, color: impl Into<ParamRef<Color>>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }
}

fn to_pixels(p: (f64, f64), area: Size) -> Point {
    Point::new(
        (p.0 * area.width as f64).round() as i32,
        (p.1 * area.height as f64).round() as i32,
    )
}

impl Stimulus for MovingDot {
    fn build(&mut self, builder: &mut ElementBuilder, _params: &ParamContext) -> Result<(), ParamError> {
        builder.add("dot");
        builder.timing(TimingSpec::clock(Duration::ZERO));
        Ok(())
    }

    fn compute_geometry(
        &mut self,
        elements: &mut [Element],
        area: Size,
        _params: &ParamContext,
    ) -> Result<(), ParamError> {
        let from = to_pixels(self.from, area);
        let to = to_pixels(self.to, area);
        self.path = Some((from, to));
        // Only the animation paints the dot; the static frame shows the
        // rest of the update.
        elements[0].shape = Shape::Disc {
            center: from,
            radius: self.radius,
            color: Color::WHITE,
        };
        elements[0].visible = false;
        Ok(())
    }

    fn compute_timing(
        &mut self,
        timing: &mut [TimingElement],
        params: &ParamContext,
    ) -> Result<(), ParamError> {
        self.resolved_duration = self.duration.resolve(params)?;
        timing[0].intended = self.resolved_duration;
        Ok(())
    }

    fn compute_colors(&mut self, elements: &mut [Element], params: &ParamContext) -> Result<(), ParamError> {
        self.resolved_color = self.color.resolve(params)?;
        elements[0].shape.set_color(self.resolved_color);
        Ok(())
    }

    fn is_animated(&self) -> bool {
        true
    }

    fn animation(&self) -> Option<Box<dyn Animation>> {
        let (from, to) = self.path?;
        Some(Box::new(DotPath {
            from,
            to,
            radius: self.radius,
            color: self.resolved_color,
            duration: self.resolved_duration,
            interval: self.frame_interval,
        }))
    }
}

struct DotPath {
    from: Point,
    to: Point,
    radius: u32,
    color: Color,
    duration: Duration,
    interval: Duration,
}

impl DotPath {
    fn position(&self, elapsed: Duration) -> Point {
        let t = if self.duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
        };
        let lerp = |a: i32, b: i32| a + ((b - a) as f64 * t).round() as i32;
        Point::new(lerp(self.from.x, self.to.x), lerp(self.from.y, self.to.y))
    }
}

impl Animation for DotPath {
    fn frame_interval(&self) -> Duration {
        self.interval
    }

    fn frame(&mut self, elapsed: Duration, canvas: &mut FrameBuffer) -> bool {
        let center = self.position(elapsed);
        let r = self.radius as i32;
        let clip = canvas.bounds();
        for dy in -r..=r {
            let half = ((r * r - dy * dy) as f64).sqrt() as i32;
            canvas.fill_rect(
                Rect::new(center.x - half, center.y + dy, (2 * half + 1) as u32, 1),
                clip,
                self.color,
            );
        }
        elapsed < self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::Display;

    #[test_log::test]
    fn animation_interpolates_along_the_path() {
        let params = ParamContext::new();
        let mut unit = Display::new(
            "dot",
            Box::new(MovingDot::new((0.0, 0.5), (1.0, 0.5), Duration::from_millis(100)).with_radius(1)),
        );
        unit.create_instance(&params).unwrap();
        unit.recompute(Size::new(100, 10), &params, None).unwrap();
        assert!(unit.is_animated());

        let mut animation = unit.animation().unwrap();
        let mut canvas = FrameBuffer::new(Size::new(100, 10));
        assert!(animation.frame(Duration::from_millis(50), &mut canvas));
        assert_eq!(canvas.color_at(50, 5), Some(Color::WHITE));
        assert!(!animation.frame(Duration::from_millis(100), &mut canvas));
    }
}
