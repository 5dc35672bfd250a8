//! Box model geometry.
//!
//! [CSS Box Model Module Level 3](https://www.w3.org/TR/css-box-3/)

use serde::Serialize;

/// [§ 3. The CSS Box Model](https://www.w3.org/TR/css-box-3/#box-model)
///
/// "Each box has a content area and optional surrounding padding, border,
/// and margin areas."
///
/// The `padding`, `border` and `margin` fields hold edge thicknesses, not
/// positions; every outer rectangle is derived from `content`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BoxDimensions {
    /// Content area, in page coordinates.
    pub content: Rect,
    /// Padding thickness on each side.
    pub padding: EdgeSizes,
    /// Border thickness on each side.
    pub border: EdgeSizes,
    /// Margin thickness on each side.
    pub margin: EdgeSizes,
}

/// A rectangle positioned in page coordinates (CSS px, y grows down).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rect {
    /// Horizontal position of the top-left corner.
    pub x: f32,
    /// Vertical position of the top-left corner.
    pub y: f32,
    /// Width of the rectangle.
    pub width: f32,
    /// Height of the rectangle.
    pub height: f32,
}

impl Rect {
    /// Create a rectangle from its origin and size.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Bottom edge (`y + height`).
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Right edge (`x + width`).
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Grow the rectangle outward by `edges`.
    #[must_use]
    pub fn expanded_by(&self, edges: EdgeSizes) -> Self {
        Self {
            x: self.x - edges.left,
            y: self.y - edges.top,
            width: self.width + edges.horizontal(),
            height: self.height + edges.vertical(),
        }
    }

    /// Shrink the rectangle inward by `edges`, never below zero size.
    #[must_use]
    pub fn shrunk_by(&self, edges: EdgeSizes) -> Self {
        Self {
            x: self.x + edges.left,
            y: self.y + edges.top,
            width: (self.width - edges.horizontal()).max(0.0),
            height: (self.height - edges.vertical()).max(0.0),
        }
    }
}

/// Edge sizes for padding, border, or margin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EdgeSizes {
    /// Top edge size.
    pub top: f32,
    /// Right edge size.
    pub right: f32,
    /// Bottom edge size.
    pub bottom: f32,
    /// Left edge size.
    pub left: f32,
}

impl EdgeSizes {
    /// All four edges set to `value`.
    #[must_use]
    pub const fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// `left + right`
    #[must_use]
    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    /// `top + bottom`
    #[must_use]
    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }

    /// Component-wise sum.
    #[must_use]
    pub fn plus(&self, other: Self) -> Self {
        Self {
            top: self.top + other.top,
            right: self.right + other.right,
            bottom: self.bottom + other.bottom,
            left: self.left + other.left,
        }
    }
}

impl BoxDimensions {
    /// [§ 3.1 Margins](https://www.w3.org/TR/css-box-3/#margins)
    ///
    /// "The margin box is the outermost box, and contains all four areas."
    #[must_use]
    pub fn margin_box(&self) -> Rect {
        self.border_box().expanded_by(self.margin)
    }

    /// [§ 3.3 Borders](https://www.w3.org/TR/css-box-3/#borders)
    #[must_use]
    pub fn border_box(&self) -> Rect {
        self.padding_box().expanded_by(self.border)
    }

    /// [§ 3.2 Padding](https://www.w3.org/TR/css-box-3/#paddings)
    #[must_use]
    pub fn padding_box(&self) -> Rect {
        self.content.expanded_by(self.padding)
    }

    /// Sum of left margin, border and padding.
    #[must_use]
    pub fn leading_inline(&self) -> f32 {
        self.margin.left + self.border.left + self.padding.left
    }

    /// Sum of right margin, border and padding.
    #[must_use]
    pub fn trailing_inline(&self) -> f32 {
        self.margin.right + self.border.right + self.padding.right
    }

    /// Height of the margin box.
    #[must_use]
    pub fn margin_height(&self) -> f32 {
        self.content.height
            + self.padding.vertical()
            + self.border.vertical()
            + self.margin.vertical()
    }

    /// Width of the margin box.
    #[must_use]
    pub fn margin_width(&self) -> f32 {
        self.content.width + self.padding.horizontal() + self.border.horizontal() + self.margin.horizontal()
    }

    /// Move the content box by `(dx, dy)`.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.content.x += dx;
        self.content.y += dy;
    }
}

/// [§ 2.1 Inline direction](https://www.w3.org/TR/css-writing-modes-3/#direction)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Left to right.
    #[default]
    Ltr,
    /// Right to left.
    Rtl,
}

/// [§ 10.1 Definition of "containing block"](https://www.w3.org/TR/CSS2/visudet.html#containing-block-details)
///
/// "The position and size of an element's box(es) are sometimes calculated
/// relative to a certain rectangle, called the containing block of the
/// element."
///
/// Exactly one containing block is handed to every layout call. A `None`
/// height means the height is indefinite, so percentage heights of children
/// behave as `auto`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainingBlock {
    /// Left edge of the content area.
    pub x: f32,
    /// Top edge of the content area.
    pub y: f32,
    /// Definite content width.
    pub width: f32,
    /// Content height, if definite.
    pub height: Option<f32>,
    /// Inline base direction.
    pub direction: Direction,
}

impl ContainingBlock {
    /// A containing block covering `rect` with a definite height.
    #[must_use]
    pub const fn from_rect(rect: Rect, direction: Direction) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: Some(rect.height),
            direction,
        }
    }

    /// The same block with its height forgotten.
    #[must_use]
    pub const fn with_indefinite_height(self) -> Self {
        Self {
            height: None,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outer_boxes_derive_from_content() {
        let dims = BoxDimensions {
            content: Rect::new(20.0, 30.0, 100.0, 50.0),
            padding: EdgeSizes::uniform(5.0),
            border: EdgeSizes::uniform(1.0),
            margin: EdgeSizes::uniform(10.0),
        };
        let mb = dims.margin_box();
        assert_eq!(mb, Rect::new(4.0, 14.0, 132.0, 82.0));
        assert_eq!(dims.margin_height(), 82.0);
        assert_eq!(dims.margin_width(), 132.0);
    }
}
