//! CSS Float Layout.
//!
//! [§ 9.5 Floats](https://www.w3.org/TR/CSS2/visuren.html#floats)
//!
//! "A float is a box that is shifted to the left or right on the current line.
//! The most interesting characteristic of a float is that content may flow along
//! its side (or be prohibited from doing so by the 'clear' property)."
//!
//! Placement, band queries and clearance all read the exclusion shapes of
//! the innermost [`FormattingContext`].

use quire_common::warning::warn_once;
use serde::Serialize;

use crate::formatting_context::{ExclusionShape, FormattingContext};
use crate::geometry::Rect;
use crate::style::{Clear, Float};
use crate::tree::BoxId;

/// [§ 9.5.1](https://www.w3.org/TR/CSS2/visuren.html#float-position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FloatSide {
    /// "The element generates a block box that is floated to the left."
    Left,
    /// "The element generates a block box that is floated to the right."
    Right,
}

impl FloatSide {
    /// Side for a computed `float`, `None` when the box is not floated.
    #[must_use]
    pub const fn from_float(float: Float) -> Option<Self> {
        match float {
            Float::Left => Some(Self::Left),
            Float::Right => Some(Self::Right),
            Float::None | Float::Footnote => None,
        }
    }
}

/// A horizontal band of free space at some vertical position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// Left edge of the free space.
    pub left: f32,
    /// Width of the free space, never negative.
    pub width: f32,
}

impl Band {
    /// Right edge of the free space.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.left + self.width
    }
}

impl FormattingContext {
    /// [§ 9.5](https://www.w3.org/TR/CSS2/visuren.html#floats)
    ///
    /// "The current and subsequent line boxes created next to the float are
    /// shortened as necessary to make room for the margin box of the float."
    ///
    /// Free space for content occupying `[y, y + height)` inside the
    /// containing block spanning `[cb_left, cb_left + cb_width)`. A shape is
    /// active when its margin box overlaps the band; a zero-height band
    /// tests the single line `y`.
    #[must_use]
    pub fn band_at(&self, y: f32, height: f32, cb_left: f32, cb_width: f32) -> Band {
        let band_bottom = y + height.max(0.0);
        let mut left = cb_left;
        let mut right = cb_left + cb_width;
        for shape in &self.shapes {
            let rect = shape.margin_box;
            let overlaps = if height > 0.0 {
                rect.y < band_bottom && rect.bottom() > y
            } else {
                rect.y <= y && rect.bottom() > y
            };
            if !overlaps || rect.height <= 0.0 {
                continue;
            }
            match shape.side {
                FloatSide::Left => left = left.max(rect.right()),
                FloatSide::Right => right = right.min(rect.x),
            }
        }
        Band {
            left,
            width: (right - left).max(0.0),
        }
    }

    /// Smallest shape bottom strictly below `y`, if any.
    #[must_use]
    pub fn next_shape_bottom_after(&self, y: f32) -> Option<f32> {
        self.shapes
            .iter()
            .map(|s| s.margin_box.bottom())
            .filter(|bottom| *bottom > y)
            .reduce(f32::min)
    }

    /// [§ 9.5.1 Positioning the float](https://www.w3.org/TR/CSS2/visuren.html#float-position)
    ///
    /// Place a float's margin box and register it as an exclusion shape.
    ///
    /// - Rules 1 and 9: pushed against the containing block edge or the
    ///   outer edge of another float on its side.
    /// - Rules 4, 5, 6: never above `position_y` (the current flow
    ///   position), nor above the top of an earlier float.
    /// - Rules 2, 3, 7, 8: as high as possible where a band at least as wide
    ///   as the margin box is free for its whole height.
    ///
    /// A float wider than its containing block is placed at the first Y
    /// where the band is entirely free and overlaps whatever it overlaps.
    pub fn place_float(
        &mut self,
        box_id: Option<BoxId>,
        side: FloatSide,
        margin_width: f32,
        margin_height: f32,
        position_y: f32,
        cb_left: f32,
        cb_width: f32,
    ) -> Rect {
        // STEP 1: Start at the highest allowed position.
        let earliest_top = self
            .shapes
            .iter()
            .map(|s| s.margin_box.y)
            .fold(position_y, f32::max);
        let mut y = earliest_top;

        let too_wide = margin_width > cb_width;
        if too_wide {
            let _ = warn_once(
                "Float",
                &format!(
                    "float {box_id:?} is {margin_width}px wide in a {cb_width}px containing block; it will overlap"
                ),
            );
        }

        // STEP 2: Scan down shape bottom by shape bottom until it fits.
        let band = loop {
            let band = self.band_at(y, margin_height, cb_left, cb_width);
            let fits = if too_wide {
                band.width >= cb_width
            } else {
                band.width >= margin_width
            };
            if fits {
                break band;
            }
            match self.next_shape_bottom_after(y) {
                Some(next) => y = next,
                None => break band,
            }
        };

        // STEP 3: Push to the requested side.
        let x = match side {
            FloatSide::Left => band.left,
            FloatSide::Right if too_wide => cb_left,
            FloatSide::Right => band.right() - margin_width,
        };
        let margin_box = Rect::new(x, y, margin_width, margin_height);
        self.shapes.push(ExclusionShape {
            box_id,
            side,
            margin_box,
        });
        margin_box
    }

    /// [§ 9.5.2 Controlling flow next to floats](https://www.w3.org/TR/CSS2/visuren.html#flow-control)
    ///
    /// The lowest bottom margin edge of the shapes relevant to `clear`, if
    /// any is below `y`. A box that would otherwise sit above that edge
    /// gets clearance.
    #[must_use]
    pub fn clearance_floor(&self, clear: Clear, y: f32) -> Option<f32> {
        let relevant = |side: FloatSide| match clear {
            Clear::None => false,
            Clear::Both => true,
            Clear::Left => side == FloatSide::Left,
            Clear::Right => side == FloatSide::Right,
        };
        self.shapes
            .iter()
            .filter(|s| relevant(s.side))
            .map(|s| s.margin_box.bottom())
            .filter(|bottom| *bottom > y)
            .reduce(f32::max)
    }

    /// [§ 9.5](https://www.w3.org/TR/CSS2/visuren.html#floats)
    ///
    /// "The border box of a table, a block-level replaced element, or an
    /// element in the normal flow that establishes a new block formatting
    /// context ... must not overlap the margin box of any floats in the same
    /// block formatting context as the element itself."
    ///
    /// Returns the position and band where a box of `height` and at least
    /// `min_width` fits beside the floats, starting at `y`.
    #[must_use]
    pub fn avoid_collisions(
        &self,
        y: f32,
        height: f32,
        min_width: f32,
        cb_left: f32,
        cb_width: f32,
    ) -> (f32, Band) {
        let mut y = y;
        loop {
            let band = self.band_at(y, height, cb_left, cb_width);
            if band.width >= min_width || band.width >= cb_width {
                return (y, band);
            }
            match self.next_shape_bottom_after(y) {
                Some(next) => y = next,
                None => return (y, band),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlap(a: Rect, b: Rect) -> bool {
        a.x < b.right() && b.x < a.right() && a.y < b.bottom() && b.y < a.bottom()
    }

    #[test]
    fn same_side_floats_stack_then_wrap() {
        let mut bfc = FormattingContext::new(None);
        let a = bfc.place_float(None, FloatSide::Left, 60.0, 20.0, 0.0, 0.0, 100.0);
        let b = bfc.place_float(None, FloatSide::Left, 30.0, 10.0, 0.0, 0.0, 100.0);
        let c = bfc.place_float(None, FloatSide::Left, 30.0, 10.0, 0.0, 0.0, 100.0);
        assert_eq!((a.x, a.y), (0.0, 0.0));
        assert_eq!((b.x, b.y), (60.0, 0.0));
        // No room for 30px beside 90px of floats: drop below the shorter one.
        assert_eq!((c.x, c.y), (60.0, 10.0));
        assert!(!overlap(a, b) && !overlap(b, c) && !overlap(a, c));
    }

    #[test]
    fn band_shrinks_around_both_sides() {
        let mut bfc = FormattingContext::new(None);
        let _ = bfc.place_float(None, FloatSide::Left, 20.0, 10.0, 0.0, 0.0, 100.0);
        let _ = bfc.place_float(None, FloatSide::Right, 30.0, 20.0, 0.0, 0.0, 100.0);
        assert_eq!(bfc.band_at(0.0, 5.0, 0.0, 100.0), Band { left: 20.0, width: 50.0 });
        assert_eq!(bfc.band_at(12.0, 5.0, 0.0, 100.0), Band { left: 0.0, width: 70.0 });
        assert_eq!(bfc.band_at(25.0, 5.0, 0.0, 100.0), Band { left: 0.0, width: 100.0 });
    }

    #[test]
    fn clearance_floor_respects_side() {
        let mut bfc = FormattingContext::new(None);
        let _ = bfc.place_float(None, FloatSide::Left, 20.0, 40.0, 0.0, 0.0, 100.0);
        let _ = bfc.place_float(None, FloatSide::Right, 20.0, 15.0, 0.0, 0.0, 100.0);
        assert_eq!(bfc.clearance_floor(Clear::Right, 0.0), Some(15.0));
        assert_eq!(bfc.clearance_floor(Clear::Both, 0.0), Some(40.0));
        assert_eq!(bfc.clearance_floor(Clear::Left, 50.0), None);
    }

    #[test]
    fn later_floats_never_rise_above_earlier_ones() {
        let mut bfc = FormattingContext::new(None);
        let _ = bfc.place_float(None, FloatSide::Left, 20.0, 10.0, 30.0, 0.0, 100.0);
        let b = bfc.place_float(None, FloatSide::Right, 20.0, 10.0, 0.0, 0.0, 100.0);
        assert_eq!(b.y, 30.0);
    }

    #[test]
    fn over_wide_float_takes_the_full_band() {
        let mut bfc = FormattingContext::new(None);
        let _ = bfc.place_float(None, FloatSide::Left, 20.0, 10.0, 0.0, 0.0, 100.0);
        let wide = bfc.place_float(None, FloatSide::Right, 150.0, 10.0, 0.0, 0.0, 100.0);
        assert_eq!((wide.x, wide.y), (0.0, 10.0));
    }
}
