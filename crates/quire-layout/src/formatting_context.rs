//! Block formatting context scopes.
//!
//! [§ 9.4.1 Block formatting contexts](https://www.w3.org/TR/CSS2/visuren.html#block-formatting)
//!
//! "In a block formatting context, boxes are laid out one after the other,
//! vertically, beginning at the top of a containing block."
//!
//! Each BFC owns the exclusion shapes of the floats placed inside it.
//! Nested BFCs push a fresh scope on the context stack, so their floats
//! never reach the ancestor's line boxes, and pop it when the owner is done.

use crate::float::FloatSide;
use crate::geometry::Rect;
use crate::tree::BoxId;

/// The margin box of a placed float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExclusionShape {
    /// The floated box.
    pub box_id: Option<BoxId>,
    /// Which side it floats to.
    pub side: FloatSide,
    /// Margin box, in page coordinates.
    pub margin_box: Rect,
}

/// One block formatting context scope.
#[derive(Debug, Clone, Default)]
pub struct FormattingContext {
    /// The box establishing the context, `None` for the page scope.
    pub owner: Option<BoxId>,
    /// Exclusion shapes in placement order.
    pub shapes: Vec<ExclusionShape>,
}

impl FormattingContext {
    /// A new empty scope for `owner`.
    #[must_use]
    pub const fn new(owner: Option<BoxId>) -> Self {
        Self {
            owner,
            shapes: Vec::new(),
        }
    }

    /// Returns true if no float has been placed in this context.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// [§ 10.6.7 'Auto' heights for block formatting context roots](https://www.w3.org/TR/CSS2/visudet.html#root-height)
    ///
    /// "If the element has any floating descendants whose bottom margin edge
    /// is below the element's bottom content edge, then the height is
    /// increased to include those edges."
    ///
    /// Returns the lowest bottom margin edge, if any float was placed.
    #[must_use]
    pub fn lowest_shape_bottom(&self) -> Option<f32> {
        self.shapes
            .iter()
            .map(|s| s.margin_box.bottom())
            .reduce(f32::max)
    }

    /// Drop shapes registered after `len`, used when content laid out
    /// speculatively is thrown away.
    pub fn truncate(&mut self, len: usize) {
        self.shapes.truncate(len);
    }
}
