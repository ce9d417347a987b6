// src/stimuli/fixation.rs

use crate::color::Color;
use crate::geometry::{Point, Size};
use crate::params::{ParamContext, ParamError, ParamRef};
use crate::timing::{TimingElement, TimingSpec};
use crate::unit::{Element, ElementBuilder, Shape, Stimulus};
use std::time::Duration;

/// A cross at the center of the drawing area.
#[derive(Debug, Clone)]
pub struct FixationCross {
    arm: u32,
    thickness: u32,
    color: ParamRef<Color>,
    duration: ParamRef<Duration>,
}

impl FixationCross {
    pub fn new(duration: impl Into<ParamRef<Duration>>) -> Self {
        FixationCross {
            arm: 10,
            thickness: 2,
            color: ParamRef::Fixed(Color::WHITE),
            duration: duration.into(),
        }
    }

    pub fn with_arm(mut self, arm: u32, thickness: u32) -> Self {
        self.arm = arm;
        self.thickness = thickness;
        self
    }

    pub fn with_color(mut self, color: impl Into<ParamRef<Color>>) -> Self {
        self.color = color.into();
        self
    }
}

impl Stimulus for FixationCross {
    fn build(&mut self, builder: &mut ElementBuilder, _params: &ParamContext) -> Result<(), ParamError> {
        builder.add("cross");
        builder.timing(TimingSpec::clock(Duration::ZERO));
        Ok(())
    }

    fn compute_geometry(
        &mut self,
        elements: &mut [Element],
        area: Size,
        _params: &ParamContext,
    ) -> Result<(), ParamError> {
        elements[0].shape = Shape::Cross {
            center: Point::new(area.width as i32 / 2, area.height as i32 / 2),
            arm: self.arm,
            thickness: self.thickness,
            color: Color::WHITE,
        };
        Ok(())
    }

    fn compute_timing(
        &mut self,
        timing: &mut [TimingElement],
        params: &ParamContext,
    ) -> Result<(), ParamError> {
        timing[0].intended = self.duration.resolve(params)?;
        Ok(())
    }

    fn compute_colors(&mut self, elements: &mut [Element], params: &ParamContext) -> Result<(), ParamError> {
        let color = self.color.resolve(params)?;
        elements[0].shape.set_color(color);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::FrameBuffer;
    use crate::unit::Display;

    #[test_log::test]
    fn color_comes_from_parameters() {
        let mut params = ParamContext::new();
        params.set("fix.color", "#ff0000");
        params.set("fix.ms", 250i64);
        let mut unit = Display::new(
            "fixation",
            Box::new(
                FixationCross::new(ParamRef::param("fix.ms"))
                    .with_color(ParamRef::param("fix.color")),
            ),
        );
        unit.create_instance(&params).unwrap();
        unit.recompute(Size::new(21, 21), &params, None).unwrap();
        assert_eq!(unit.timing()[0].intended, Duration::from_millis(250));

        let mut canvas = FrameBuffer::new(Size::new(21, 21));
        unit.show(&mut canvas);
        assert_eq!(canvas.color_at(10, 10), Some(Color::rgb(255, 0, 0)));
        assert_eq!(canvas.color_at(0, 0), Some(Color::BLACK));
    }
}
