// src/unit/element.rs

//! Drawable elements and their timing-group tags.

use crate::color::Color;
use crate::geometry::{Point, Rect, Size};
use std::fmt;
use std::sync::Arc;

/// Hard ceiling on timing groups per unit.
pub const MAX_GROUPS: usize = 64;

/// Set of timing groups, one bit per group.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GroupMask(u64);

impl GroupMask {
    pub const EMPTY: GroupMask = GroupMask(0);
    /// Group 0, the tag of elements added without explicit tagging.
    pub const DEFAULT: GroupMask = GroupMask(1);

    /// Mask holding the single group `index`, `None` past [`MAX_GROUPS`].
    pub fn group(index: usize) -> Option<GroupMask> {
        if index >= MAX_GROUPS {
            return None;
        }
        Some(GroupMask(1u64 << index))
    }

    pub fn from_bits(bits: u64) -> GroupMask {
        GroupMask(bits)
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn union(self, other: GroupMask) -> GroupMask {
        GroupMask(self.0 | other.0)
    }

    pub fn intersects(self, other: GroupMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn contains_index(self, index: usize) -> bool {
        index < MAX_GROUPS && self.0 & (1u64 << index) != 0
    }

    /// Highest group present, `None` for the empty mask.
    pub fn highest_index(self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(63 - self.0.leading_zeros() as usize)
        }
    }

    /// Index of the single set bit, `None` unless exactly one bit is set.
    pub fn single_index(self) -> Option<usize> {
        if self.0.count_ones() == 1 {
            Some(self.0.trailing_zeros() as usize)
        } else {
            None
        }
    }

    /// Next cursor position in stepping order: group 0 from the empty mask,
    /// otherwise the next bit up. Shifting past bit 63 yields the empty mask.
    pub fn next_step(self) -> GroupMask {
        if self.0 == 0 {
            GroupMask(1)
        } else {
            GroupMask(self.0.checked_shl(1).unwrap_or(0))
        }
    }

    pub fn indices(self) -> impl Iterator<Item = usize> {
        (0..MAX_GROUPS).filter(move |i| self.contains_index(*i))
    }
}

impl fmt::Debug for GroupMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupMask({:#b})", self.0)
    }
}

/// Builds a mask from group indices; indices past the ceiling are dropped by
/// the caller's validation, see [`crate::unit::stimulus::ElementBuilder`].
impl FromIterator<usize> for GroupMask {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        iter.into_iter()
            .filter_map(GroupMask::group)
            .fold(GroupMask::EMPTY, GroupMask::union)
    }
}

/// The opaque visual content of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// A rectangle, filled or outlined with `thickness` pixels.
    Rect {
        rect: Rect,
        color: Color,
        filled: bool,
        thickness: u32,
    },
    /// A fixation cross.
    Cross {
        center: Point,
        arm: u32,
        thickness: u32,
        color: Color,
    },
    /// A filled disc.
    Disc {
        center: Point,
        radius: u32,
        color: Color,
    },
    /// An RGBA8 image.
    Image {
        origin: Point,
        size: Size,
        data: Arc<[u8]>,
    },
    /// Nothing on screen (placeholder until geometry is computed).
    Empty,
}

impl Shape {
    pub fn bounds(&self) -> Rect {
        match self {
            Shape::Rect { rect, .. } => *rect,
            Shape::Cross { center, arm, .. } => Rect::centered(*center, arm * 2 + 1, arm * 2 + 1),
            Shape::Disc { center, radius, .. } => {
                Rect::centered(*center, radius * 2 + 1, radius * 2 + 1)
            }
            Shape::Image { origin, size, .. } => {
                Rect::new(origin.x, origin.y, size.width, size.height)
            }
            Shape::Empty => Rect::default(),
        }
    }

    /// Same shape moved horizontally by `dx`.
    pub fn translated(&self, dx: i32) -> Shape {
        let mut shape = self.clone();
        match &mut shape {
            Shape::Rect { rect, .. } => *rect = rect.translate(dx, 0),
            Shape::Cross { center, .. } | Shape::Disc { center, .. } => center.x += dx,
            Shape::Image { origin, .. } => origin.x += dx,
            Shape::Empty => {}
        }
        shape
    }

    pub fn set_color(&mut self, new: Color) {
        match self {
            Shape::Rect { color, .. } | Shape::Cross { color, .. } | Shape::Disc { color, .. } => {
                *color = new
            }
            Shape::Image { .. } | Shape::Empty => {}
        }
    }
}

/// One drawable element of a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub shape: Shape,
    pub groups: GroupMask,
    pub visible: bool,
}

impl Element {
    pub fn new(name: impl Into<String>, groups: GroupMask) -> Self {
        Element {
            name: name.into(),
            shape: Shape::Empty,
            groups,
            visible: true,
        }
    }

    /// The full-surface background element kept at index 0.
    pub fn background(color: Color) -> Self {
        Element {
            name: "background".to_string(),
            shape: Shape::Rect {
                rect: Rect::default(),
                color,
                filled: true,
                thickness: 0,
            },
            groups: GroupMask::EMPTY,
            visible: true,
        }
    }

    pub fn bounds(&self) -> Rect {
        self.shape.bounds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn highest_index_and_single() {
        let mask: GroupMask = [0usize, 3, 5].into_iter().collect();
        assert_eq!(mask.highest_index(), Some(5));
        assert_eq!(mask.single_index(), None);
        assert_eq!(GroupMask::group(63).unwrap().single_index(), Some(63));
        assert_eq!(GroupMask::EMPTY.highest_index(), None);
        assert!(GroupMask::group(64).is_none());
    }

    #[test_log::test]
    fn stepping_walks_bits_and_falls_off_the_end() {
        let mut cursor = GroupMask::EMPTY;
        cursor = cursor.next_step();
        assert_eq!(cursor, GroupMask::DEFAULT);
        cursor = cursor.next_step();
        assert_eq!(cursor.single_index(), Some(1));
        assert_eq!(GroupMask::group(63).unwrap().next_step(), GroupMask::EMPTY);
    }

    #[test_log::test]
    fn translated_moves_horizontally_only() {
        let cross = Shape::Cross {
            center: Point::new(10, 10),
            arm: 4,
            thickness: 1,
            color: Color::WHITE,
        };
        assert_eq!(cross.translated(-3).bounds().center(), Point::new(7, 10));
    }
}
