//! Laid-out geometry: the fragment tree.
//!
//! [§ 2 Fragmentation](https://www.w3.org/TR/css-break-3/#fragmentation-model)
//!
//! A box that is split across pages yields one fragment per page. Each
//! fragment owns its geometry and children outright, so `Clone` is a deep
//! copy: repeated table headers and per-page copies of fixed boxes are
//! cloned and then moved without touching the original.

use serde::Serialize;

use crate::background::ResolvedBackground;
use crate::geometry::{BoxDimensions, Rect};
use crate::tree::BoxId;

/// Where to continue laying out a box on the next page.
///
/// `index` is a position in the box's own sequence (child index for block
/// containers, item index for inline runs, byte offset for text, row index
/// for tables and grids); `inner` continues inside that position.
/// A table row split across pages continues each of its cells separately,
/// listed in `branches` by cell index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumePoint {
    /// Position in this box's sequence.
    pub index: usize,
    /// Resume point inside the element at `index`.
    pub inner: Option<Box<ResumePoint>>,
    /// Per-child resume points of a split row.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<(usize, ResumePoint)>,
}

impl ResumePoint {
    /// Resume at `index`, starting that element fresh.
    #[must_use]
    pub const fn at(index: usize) -> Self {
        Self {
            index,
            inner: None,
            branches: Vec::new(),
        }
    }

    /// Resume at `index`, continuing inside it at `inner`.
    #[must_use]
    pub fn nested(index: usize, inner: Self) -> Self {
        Self {
            index,
            inner: Some(Box::new(inner)),
            branches: Vec::new(),
        }
    }

    /// Resume inside the row at `index`, each listed cell at its own point.
    #[must_use]
    pub const fn split(index: usize, branches: Vec<(usize, Self)>) -> Self {
        Self {
            index,
            inner: None,
            branches,
        }
    }

    /// The resume point of branch `child`, if that child continues.
    #[must_use]
    pub fn branch(&self, child: usize) -> Option<&Self> {
        self.branches
            .iter()
            .find_map(|(i, rp)| (*i == child).then_some(rp))
    }

    /// The inner resume point, if any.
    #[must_use]
    pub fn inner(&self) -> Option<&Self> {
        self.inner.as_deref()
    }
}

/// What a fragment paints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FragmentKind {
    /// Block container (including the page root).
    Block,
    /// Anonymous line box.
    Line,
    /// Inline box fragment on one line.
    Inline,
    /// Text on one line.
    Text {
        /// The text, with collapsible spaces already collapsed.
        text: String,
        /// Extra space added to each word gap by justification.
        word_spacing: f32,
    },
    /// Atomic inline block.
    InlineBlock,
    /// Replaced image.
    Replaced {
        /// Image source.
        url: String,
    },
    /// Table wrapper: margins, captions and the table grid box.
    Table,
    /// The table box proper: borders, padding and row groups.
    TableGrid,
    /// Table caption.
    TableCaption,
    /// Row group.
    TableRowGroup,
    /// Row.
    TableRow,
    /// Cell.
    TableCell,
    /// Grid container.
    Grid,
    /// Flex container.
    Flex,
    /// One column of a multi-column container.
    Column,
    /// Footnote call marker.
    FootnoteCall {
        /// The footnote body.
        footnote: BoxId,
    },
    /// The page's footnote area.
    FootnoteArea,
    /// A page margin box.
    MarginBox {
        /// Which of the sixteen boxes.
        slot: crate::pagination::MarginSlot,
    },
}

/// One laid-out piece of a box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment {
    /// Source box, `None` for anonymous line boxes and areas.
    pub box_id: Option<BoxId>,
    /// What the fragment paints.
    pub kind: FragmentKind,
    /// Resolved geometry, in page coordinates.
    pub dimensions: BoxDimensions,
    /// Children, in paint order.
    pub children: Vec<Fragment>,
    /// [§ 9.5.2](https://www.w3.org/TR/CSS2/visuren.html#flow-control)
    ///
    /// Clearance above the border box. `Some(0.0)` still means the box has
    /// clearance: its top margin took no part in collapsing.
    pub clearance: Option<f32>,
    /// Absolute y of the first baseline, if any.
    pub baseline: Option<f32>,
    /// Whether the box started on an earlier page.
    pub is_continuation: bool,
    /// Whether the box continues on a later page.
    pub is_broken: bool,
    /// Background resolved after pagination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<ResolvedBackground>,
    /// Position of the source box among its parent's children.
    #[serde(skip)]
    pub(crate) source_index: Option<usize>,
    /// For line boxes: where the content after this line starts.
    #[serde(skip)]
    pub(crate) resume_at: Option<ResumePoint>,
}

impl Fragment {
    /// A fragment with no children and no flags.
    #[must_use]
    pub const fn new(box_id: Option<BoxId>, kind: FragmentKind, dimensions: BoxDimensions) -> Self {
        Self {
            box_id,
            kind,
            dimensions,
            children: Vec::new(),
            clearance: None,
            baseline: None,
            is_continuation: false,
            is_broken: false,
            background: None,
            source_index: None,
            resume_at: None,
        }
    }

    /// Border box.
    #[must_use]
    pub fn border_box(&self) -> Rect {
        self.dimensions.border_box()
    }

    /// Margin box.
    #[must_use]
    pub fn margin_box(&self) -> Rect {
        self.dimensions.margin_box()
    }

    /// Move this fragment and everything in it.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        self.dimensions.translate(dx, dy);
        if let Some(baseline) = &mut self.baseline {
            *baseline += dy;
        }
        if let Some(background) = &mut self.background {
            background.translate(dx, dy);
        }
        for child in &mut self.children {
            child.translate(dx, dy);
        }
    }

    /// A deep copy moved by `(dx, dy)`; the original is untouched.
    #[must_use]
    pub fn duplicate_at(&self, dx: f32, dy: f32) -> Self {
        let mut copy = self.clone();
        copy.translate(dx, dy);
        copy
    }

    /// Pre-order walk over this fragment and its descendants.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Self)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Mutable pre-order walk.
    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut Self)) {
        visit(self);
        for child in &mut self.children {
            child.walk_mut(visit);
        }
    }

    /// First fragment (pre-order) generated by `id`.
    #[must_use]
    pub fn find(&self, id: BoxId) -> Option<&Self> {
        if self.box_id == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Every fragment generated by `id`, in pre-order.
    #[must_use]
    pub fn find_all(&self, id: BoxId) -> Vec<&Self> {
        let mut out = Vec::new();
        self.walk(&mut |f| {
            if f.box_id == Some(id) {
                out.push(f);
            }
        });
        out
    }

    /// Footnote bodies whose calls appear in this fragment.
    #[must_use]
    pub fn footnote_calls(&self) -> Vec<BoxId> {
        let mut out = Vec::new();
        self.walk(&mut |f| {
            if let FragmentKind::FootnoteCall { footnote } = f.kind {
                out.push(footnote);
            }
        });
        out
    }

    /// Text of every text fragment, concatenated.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.walk(&mut |f| {
            if let FragmentKind::Text { text, .. } = &f.kind {
                out.push_str(text);
            }
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    fn leaf(y: f32) -> Fragment {
        Fragment::new(
            Some(BoxId(1)),
            FragmentKind::Block,
            BoxDimensions {
                content: Rect::new(0.0, y, 10.0, 10.0),
                ..BoxDimensions::default()
            },
        )
    }

    #[test]
    fn duplicates_own_their_geometry() {
        let mut parent = leaf(0.0);
        parent.children.push(leaf(5.0));
        let copy = parent.duplicate_at(0.0, 100.0);
        assert_eq!(parent.children[0].dimensions.content.y, 5.0);
        assert_eq!(copy.children[0].dimensions.content.y, 105.0);
    }
}
