// src/renderer.rs

//! Software rasterizer for element shapes.
//!
//! Shapes are painted through a [`Viewport`]: a clip rectangle plus a
//! horizontal offset. Mono presentation uses the whole surface with no offset;
//! the stereo path paints every element twice, once per eye half.

use crate::color::Color;
use crate::geometry::{Point, Rect};
use crate::surface::FrameBuffer;
use crate::unit::element::Shape;
use log::trace;

/// Where on the canvas a shape lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub clip: Rect,
    pub dx: i32,
}

impl Viewport {
    pub fn full(canvas: &FrameBuffer) -> Self {
        Viewport {
            clip: canvas.bounds(),
            dx: 0,
        }
    }
}

/// Paints `shape` into `canvas` and returns the on-canvas bounds it covers.
pub fn paint_shape(shape: &Shape, canvas: &mut FrameBuffer, viewport: &Viewport) -> Rect {
    let shape = if viewport.dx != 0 {
        shape.translated(viewport.dx)
    } else {
        shape.clone()
    };
    let clip = match viewport.clip.intersect(&canvas.bounds()) {
        Some(clip) => clip,
        None => return Rect::default(),
    };

    match &shape {
        Shape::Rect {
            rect,
            color,
            filled,
            thickness,
        } => {
            if *filled {
                canvas.fill_rect(*rect, clip, *color);
            } else {
                let t = (*thickness).max(1).min(rect.width.min(rect.height).div_ceil(2).max(1));
                let inner_h = rect.height.saturating_sub(2 * t);
                canvas.fill_rect(Rect::new(rect.x, rect.y, rect.width, t), clip, *color);
                canvas.fill_rect(
                    Rect::new(rect.x, rect.bottom() - t as i32, rect.width, t),
                    clip,
                    *color,
                );
                canvas.fill_rect(Rect::new(rect.x, rect.y + t as i32, t, inner_h), clip, *color);
                canvas.fill_rect(
                    Rect::new(rect.right() - t as i32, rect.y + t as i32, t, inner_h),
                    clip,
                    *color,
                );
            }
        }
        Shape::Cross {
            center,
            arm,
            thickness,
            color,
        } => {
            let span = arm * 2 + 1;
            let t = (*thickness).max(1);
            canvas.fill_rect(Rect::centered(*center, span, t), clip, *color);
            canvas.fill_rect(Rect::centered(*center, t, span), clip, *color);
        }
        Shape::Disc {
            center,
            radius,
            color,
        } => paint_disc(canvas, *center, *radius as i32, clip, *color),
        Shape::Image { origin, size, data } => {
            canvas.draw_image(origin.x, origin.y, *size, data, clip);
        }
        Shape::Empty => return Rect::default(),
    }

    let painted = shape.bounds().intersect(&clip).unwrap_or_default();
    trace!("Renderer: painted {:?} at {:?}", shape_name(&shape), painted);
    painted
}

// One span per scanline.
fn paint_disc(canvas: &mut FrameBuffer, center: Point, radius: i32, clip: Rect, color: Color) {
    let r2 = radius * radius;
    for dy in -radius..=radius {
        let mut half = 0;
        while (half + 1) * (half + 1) + dy * dy <= r2 {
            half += 1;
        }
        let span = Rect::new(center.x - half, center.y + dy, (2 * half + 1) as u32, 1);
        canvas.fill_rect(span, clip, color);
    }
}

fn shape_name(shape: &Shape) -> &'static str {
    match shape {
        Shape::Rect { .. } => "rect",
        Shape::Cross { .. } => "cross",
        Shape::Disc { .. } => "disc",
        Shape::Image { .. } => "image",
        Shape::Empty => "empty",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;

    #[test_log::test]
    fn outline_leaves_interior_untouched() {
        let mut fb = FrameBuffer::new(Size::new(10, 10));
        let shape = Shape::Rect {
            rect: Rect::new(1, 1, 8, 8),
            color: Color::WHITE,
            filled: false,
            thickness: 1,
        };
        let vp = Viewport::full(&fb);
        paint_shape(&shape, &mut fb, &vp);
        assert_eq!(fb.color_at(1, 1), Some(Color::WHITE));
        assert_eq!(fb.color_at(8, 8), Some(Color::WHITE));
        assert_eq!(fb.color_at(4, 4), Some(Color::BLACK));
    }

    #[test_log::test]
    fn cross_paints_both_arms() {
        let mut fb = FrameBuffer::new(Size::new(11, 11));
        let shape = Shape::Cross {
            center: Point::new(5, 5),
            arm: 3,
            thickness: 1,
            color: Color::WHITE,
        };
        let vp = Viewport::full(&fb);
        let painted = paint_shape(&shape, &mut fb, &vp);
        assert_eq!(painted, Rect::new(2, 2, 7, 7));
        assert_eq!(fb.color_at(2, 5), Some(Color::WHITE));
        assert_eq!(fb.color_at(5, 2), Some(Color::WHITE));
        assert_eq!(fb.color_at(2, 2), Some(Color::BLACK));
    }

    #[test_log::test]
    fn viewport_offsets_and_clips() {
        let mut fb = FrameBuffer::new(Size::new(20, 4));
        let shape = Shape::Rect {
            rect: Rect::new(0, 0, 6, 4),
            color: Color::WHITE,
            filled: true,
            thickness: 0,
        };
        let vp = Viewport {
            clip: Rect::new(10, 0, 10, 4),
            dx: 8,
        };
        let painted = paint_shape(&shape, &mut fb, &vp);
        assert_eq!(painted, Rect::new(10, 0, 4, 4));
        assert_eq!(fb.color_at(9, 0), Some(Color::BLACK));
        assert_eq!(fb.color_at(13, 0), Some(Color::WHITE));
    }

    #[test_log::test]
    fn disc_is_round() {
        let mut fb = FrameBuffer::new(Size::new(9, 9));
        let shape = Shape::Disc {
            center: Point::new(4, 4),
            radius: 3,
            color: Color::WHITE,
        };
        let vp = Viewport::full(&fb);
        paint_shape(&shape, &mut fb, &vp);
        assert_eq!(fb.color_at(4, 1), Some(Color::WHITE));
        assert_eq!(fb.color_at(1, 1), Some(Color::BLACK));
    }
}
