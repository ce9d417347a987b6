// src/surface/framebuffer.rs

//! Software RGBA framebuffer used for preloaded groups and live paints.

use crate::color::Color;
use crate::geometry::{Rect, Size};
use std::fmt;

pub const BYTES_PER_PIXEL: usize = 4;

/// An off-screen RGBA8 buffer, row-major, no padding.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    size: Size,
    pixels: Box<[u8]>,
}

impl FrameBuffer {
    /// A buffer cleared to opaque black.
    pub fn new(size: Size) -> Self {
        let mut fb = FrameBuffer {
            size,
            pixels: vec![0u8; size.area() * BYTES_PER_PIXEL].into_boxed_slice(),
        };
        fb.clear(Color::BLACK);
        fb
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.size)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn clear(&mut self, color: Color) {
        let px = color.to_bytes();
        for chunk in self.pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            chunk.copy_from_slice(&px);
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.size.width as usize + x as usize) * BYTES_PER_PIXEL
    }

    /// Pixel at `(x, y)`, `None` outside the buffer.
    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        if x < 0 || y < 0 || x as u32 >= self.size.width || y as u32 >= self.size.height {
            return None;
        }
        let o = self.offset(x as u32, y as u32);
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.pixels[o..o + BYTES_PER_PIXEL]);
        Some(out)
    }

    pub fn color_at(&self, x: i32, y: i32) -> Option<Color> {
        self.pixel(x, y).map(|p| Color::rgba(p[0], p[1], p[2], p[3]))
    }

    /// Fills `rect` (clipped to `clip` and to the buffer) with `color`,
    /// blending translucent colors over the existing content.
    pub fn fill_rect(&mut self, rect: Rect, clip: Rect, color: Color) {
        let Some(area) = rect
            .intersect(&clip)
            .and_then(|r| r.intersect(&self.bounds()))
        else {
            return;
        };
        let opaque = color.to_bytes();
        for y in area.y as u32..area.bottom() as u32 {
            let start = self.offset(area.x as u32, y);
            let end = start + area.width as usize * BYTES_PER_PIXEL;
            for chunk in self.pixels[start..end].chunks_exact_mut(BYTES_PER_PIXEL) {
                if color.a == 255 {
                    chunk.copy_from_slice(&opaque);
                } else {
                    let dst = [chunk[0], chunk[1], chunk[2], chunk[3]];
                    chunk.copy_from_slice(&color.over(dst));
                }
            }
        }
    }

    /// Copies an RGBA8 image with its top-left corner at `(x, y)`.
    /// Alpha 0 pixels are skipped, other pixels are blended.
    pub fn draw_image(&mut self, x: i32, y: i32, image_size: Size, data: &[u8], clip: Rect) {
        if data.len() < image_size.area() * BYTES_PER_PIXEL {
            return;
        }
        let dest = Rect::new(x, y, image_size.width, image_size.height);
        let Some(area) = dest
            .intersect(&clip)
            .and_then(|r| r.intersect(&self.bounds()))
        else {
            return;
        };
        for py in area.y..area.bottom() {
            for px in area.x..area.right() {
                let sx = (px - x) as usize;
                let sy = (py - y) as usize;
                let so = (sy * image_size.width as usize + sx) * BYTES_PER_PIXEL;
                let src = Color::rgba(data[so], data[so + 1], data[so + 2], data[so + 3]);
                let o = self.offset(px as u32, py as u32);
                let dst = [
                    self.pixels[o],
                    self.pixels[o + 1],
                    self.pixels[o + 2],
                    self.pixels[o + 3],
                ];
                self.pixels[o..o + BYTES_PER_PIXEL].copy_from_slice(&src.over(dst));
            }
        }
    }

    /// Overwrites this buffer with `other`. Returns false on a size mismatch.
    pub fn copy_from(&mut self, other: &FrameBuffer) -> bool {
        if self.size != other.size {
            return false;
        }
        self.pixels.copy_from_slice(&other.pixels);
        true
    }

    /// Cheap content fingerprint (FNV-1a), handy for comparing frames.
    pub fn checksum(&self) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for b in self.pixels.iter() {
            hash ^= *b as u64;
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        hash
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("size", &self.size)
            .field("checksum", &format_args!("{:016x}", self.checksum()))
            .finish()
    }
}
