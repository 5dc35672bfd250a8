//! Block-level layout.
//!
//! [§ 9.4.1 Block formatting contexts](https://www.w3.org/TR/CSS2/visuren.html#block-formatting)
//! and [§ 10.3.3 Block-level, non-replaced elements in normal flow](https://www.w3.org/TR/CSS2/visudet.html#blockwidth)
//!
//! Vertical flow keeps a cursor and a list of pending margins. Margins
//! stay pending until something with a border edge or a line box is
//! placed, so parent/child and sibling margins collapse without going back
//! over laid out boxes. A layout call either places the whole box, places
//! part of it and returns where to resume on the next page, or places
//! nothing.

use crate::breaks;
use crate::context::{Checkpoint, LayoutContext, PendingAbsolute};
use crate::float::FloatSide;
use crate::fragment::{Fragment, FragmentKind, ResumePoint};
use crate::geometry::{BoxDimensions, ContainingBlock, Direction, EdgeSizes, Rect};
use crate::inline::{LineBreaker, RunInput};
use crate::pagination::footnotes;
use crate::strings::PageEvent;
use crate::style::{
    BoxDecorationBreak, BoxSizing, BreakInside, BreakValue, Clear, ComputedStyle, FootnotePolicy,
    Position,
};
use crate::tree::{BoxId, BoxKind, BoxTree};

/// [§ 8.3.1 Collapsing margins](https://www.w3.org/TR/CSS2/box.html#collapsing-margins)
///
/// "When two or more margins collapse, the resulting margin width is the
/// maximum of the collapsing margins' widths. In the case of negative
/// margins, the maximum of the absolute values of the negative adjoining
/// margins is deducted from the maximum of the positive adjoining margins."
#[must_use]
pub fn collapse_margins(margins: &[f32]) -> f32 {
    let positive = margins.iter().copied().filter(|m| *m > 0.0).fold(0.0, f32::max);
    let negative = margins.iter().copied().filter(|m| *m < 0.0).fold(0.0, f32::min);
    positive + negative
}

/// What the parent hands to a block-level layout call.
#[derive(Debug, Clone)]
pub(crate) struct BlockInput<'r> {
    /// Flow cursor: bottom of the previous in-flow content, before the
    /// pending margins.
    pub position_y: f32,
    /// Space to keep free above the page bottom (ancestors' bottom
    /// borders and paddings).
    pub bottom_space: f32,
    /// Where to resume when continuing from the previous page.
    pub skip: Option<&'r ResumePoint>,
    /// Whether nothing in flow was placed on this page yet.
    pub page_is_empty: bool,
    /// Margins adjoining the top of this box.
    pub adjoining_margins: Vec<f32>,
}

impl BlockInput<'_> {
    /// Input for content laid out in one piece at `y`.
    pub(crate) const fn unbreakable(y: f32) -> Self {
        Self {
            position_y: y,
            bottom_space: 0.0,
            skip: None,
            page_is_empty: true,
            adjoining_margins: Vec::new(),
        }
    }
}

/// Result of a block-level layout call.
#[derive(Debug, Clone, Default)]
pub(crate) struct LayoutOutcome {
    /// The fragment for this page, `None` when nothing fits.
    pub fragment: Option<Fragment>,
    /// Where to continue on the next page, `None` when done.
    pub resume_at: Option<ResumePoint>,
    /// Forced break that ended this page, if any.
    pub next_page: Option<BreakValue>,
    /// Margins adjoining the bottom, still to collapse with what follows.
    pub adjoining_margins: Vec<f32>,
    /// Whether the box collapsed through: its margins joined the pending
    /// ones and the cursor did not move.
    pub collapsing_through: bool,
}

impl LayoutOutcome {
    const fn nothing() -> Self {
        Self {
            fragment: None,
            resume_at: None,
            next_page: None,
            adjoining_margins: Vec::new(),
            collapsing_through: false,
        }
    }

    pub(crate) fn placed(fragment: Fragment, margin_bottom: f32) -> Self {
        Self {
            fragment: Some(fragment),
            adjoining_margins: vec![margin_bottom],
            ..Self::nothing()
        }
    }
}

// ---------------------------------------------------------------
// Widths
// ---------------------------------------------------------------

/// Used horizontal values of a block-level box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizontalSolution {
    /// Used content width.
    pub width: f32,
    /// Used left margin.
    pub margin_left: f32,
    /// Used right margin.
    pub margin_right: f32,
}

/// [§ 10.3.3 Block-level, non-replaced elements in normal flow](https://www.w3.org/TR/CSS2/visudet.html#blockwidth)
///
/// "'margin-left' + 'border-left-width' + 'padding-left' + 'width' +
/// 'padding-right' + 'border-right-width' + 'margin-right' = width of
/// containing block"
///
/// `None` stands for `auto`; `border_padding` is the sum of the four
/// horizontal borders and paddings.
#[must_use]
pub fn solve_horizontal(
    cb_width: f32,
    width: Option<f32>,
    margin_left: Option<f32>,
    margin_right: Option<f32>,
    border_padding: f32,
    direction: Direction,
) -> HorizontalSolution {
    let (mut margin_left, mut margin_right) = (margin_left, margin_right);

    // "If 'width' is not 'auto' and 'border-left-width' + 'padding-left' +
    // 'width' + 'padding-right' + 'border-right-width' (plus any of
    // 'margin-left' or 'margin-right' that are not 'auto') is larger than
    // the width of the containing block, then any 'auto' values for
    // 'margin-left' or 'margin-right' are, for the following rules,
    // treated as zero."
    if let Some(w) = width
        && border_padding + w + margin_left.unwrap_or(0.0) + margin_right.unwrap_or(0.0) > cb_width
    {
        margin_left = margin_left.or(Some(0.0));
        margin_right = margin_right.or(Some(0.0));
    }

    let overconstrained = |w: f32, start: f32| cb_width - border_padding - w - start;
    match (width, margin_left, margin_right) {
        // "If all of the above have a computed value other than 'auto', the
        // values are said to be over-constrained and one of the used values
        // will have to be different from its computed value. If the
        // 'direction' property of the containing block has the value 'ltr',
        // the specified value of 'margin-right' is ignored."
        (Some(w), Some(l), Some(r)) => match direction {
            Direction::Ltr => HorizontalSolution {
                width: w,
                margin_left: l,
                margin_right: overconstrained(w, l),
            },
            Direction::Rtl => HorizontalSolution {
                width: w,
                margin_left: overconstrained(w, r),
                margin_right: r,
            },
        },
        // "If there is exactly one value specified as 'auto', its used
        // value follows from the equality."
        (Some(w), None, Some(r)) => HorizontalSolution {
            width: w,
            margin_left: cb_width - border_padding - w - r,
            margin_right: r,
        },
        (Some(w), Some(l), None) => HorizontalSolution {
            width: w,
            margin_left: l,
            margin_right: cb_width - border_padding - w - l,
        },
        // "If both 'margin-left' and 'margin-right' are 'auto', their used
        // values are equal."
        (Some(w), None, None) => {
            let each = (cb_width - border_padding - w) / 2.0;
            HorizontalSolution {
                width: w,
                margin_left: each,
                margin_right: each,
            }
        }
        // "If 'width' is set to 'auto', any other 'auto' values become '0'
        // and 'width' follows from the resulting equality."
        (None, l, r) => {
            let l = l.unwrap_or(0.0);
            let r = r.unwrap_or(0.0);
            let w = cb_width - border_padding - l - r;
            if w >= 0.0 {
                HorizontalSolution {
                    width: w,
                    margin_left: l,
                    margin_right: r,
                }
            } else {
                // Width floors at 0; the end margin absorbs the rest.
                solve_horizontal(cb_width, Some(0.0), Some(l), Some(r), border_padding, direction)
            }
        }
    }
}

/// [§ 4.1 'box-sizing'](https://www.w3.org/TR/css-sizing-3/#box-sizing)
///
/// A declared size converted to a content size.
pub(crate) fn content_size(style: &ComputedStyle, declared: f32, padding: f32, border: f32) -> f32 {
    let size = match style.box_sizing {
        BoxSizing::ContentBox => declared,
        BoxSizing::PaddingBox => declared - padding,
        BoxSizing::BorderBox => declared - padding - border,
    };
    size.max(0.0)
}

/// Floats, absolutely positioned boxes and atomic inlines size to their
/// containing block without solving the width equation: auto margins are
/// zero and an auto width fills what is left.
pub(crate) fn sizes_to_fit(tree: &BoxTree, id: BoxId) -> bool {
    let style = tree.style(id);
    style.is_floated() || style.position.is_absolutely_positioned() || tree.is_inline_level(id)
}

/// Horizontal geometry of `id` in `cb`: content x and width, horizontal
/// margins, all paddings and borders. Vertical margins are left at 0.
pub(crate) fn horizontal_box(tree: &BoxTree, id: BoxId, cb: &ContainingBlock, width: Option<f32>) -> BoxDimensions {
    let style = tree.style(id);
    let padding = style.padding(cb.width);
    let border = style.border();
    let (pad_h, border_h) = (padding.horizontal(), border.horizontal());
    let to_content = |declared: f32| content_size(style, declared, pad_h, border_h);
    let declared = width.or_else(|| style.width.resolve(cb.width).map(to_content));
    let margin_left = style.margin_left.resolve(cb.width);
    let margin_right = style.margin_right.resolve(cb.width);

    // [§ 17.5](https://www.w3.org/TR/CSS2/tables.html#width-layout):
    // cells take the width of the columns they span and have no margins.
    if *tree.kind(id) == BoxKind::TableCell {
        return BoxDimensions {
            content: Rect::new(
                cb.x + border.left + padding.left,
                cb.y,
                (cb.width - pad_h - border_h).max(0.0),
                0.0,
            ),
            padding,
            border,
            margin: EdgeSizes::default(),
        };
    }

    // [§ 9.7](https://www.w3.org/TR/css-flexbox-1/#resolve-flexible-lengths):
    // a row flex item is laid out at its resolved main size, which the
    // container passes as the margin box width. Auto margins are zero.
    if width.is_none() && crate::flex::is_row_item(tree, id) {
        let margin_left = margin_left.unwrap_or(0.0);
        let margin_right = margin_right.unwrap_or(0.0);
        return BoxDimensions {
            content: Rect::new(
                cb.x + margin_left + border.left + padding.left,
                cb.y,
                (cb.width - margin_left - margin_right - pad_h - border_h).max(0.0),
                0.0,
            ),
            padding,
            border,
            margin: EdgeSizes {
                left: margin_left,
                right: margin_right,
                ..EdgeSizes::default()
            },
        };
    }

    let solve = |w: Option<f32>| {
        if sizes_to_fit(tree, id) {
            let l = margin_left.unwrap_or(0.0);
            let r = margin_right.unwrap_or(0.0);
            HorizontalSolution {
                width: w.unwrap_or(cb.width - l - r - pad_h - border_h).max(0.0),
                margin_left: l,
                margin_right: r,
            }
        } else {
            solve_horizontal(cb.width, w, margin_left, margin_right, pad_h + border_h, cb.direction)
        }
    };

    // [§ 10.4](https://www.w3.org/TR/CSS2/visudet.html#min-max-widths):
    // "If the tentative used width is greater than 'max-width', the rules
    // above are applied again, but this time using the computed value of
    // 'max-width' as the computed value for 'width'."
    let mut solution = solve(declared);
    if let Some(max) = style.max_width.0.map(|m| to_content(m.resolve(cb.width)))
        && solution.width > max
    {
        solution = solve(Some(max));
    }
    let min = to_content(style.min_width.resolve(cb.width));
    if solution.width < min {
        solution = solve(Some(min));
    }

    BoxDimensions {
        content: Rect::new(
            cb.x + solution.margin_left + border.left + padding.left,
            cb.y,
            solution.width,
            0.0,
        ),
        padding,
        border,
        margin: EdgeSizes {
            left: solution.margin_left,
            right: solution.margin_right,
            ..EdgeSizes::default()
        },
    }
}

// ---------------------------------------------------------------
// Heights
// ---------------------------------------------------------------

/// [§ 10.5 Content height](https://www.w3.org/TR/CSS2/visudet.html#the-height-property)
///
/// "If the height of the containing block is not specified explicitly
/// (i.e., it depends on content height), and this element is not
/// absolutely positioned, the value computes to 'auto'."
pub(crate) fn declared_height(style: &ComputedStyle, cb_height: Option<f32>, dims: &BoxDimensions) -> Option<f32> {
    style
        .height
        .resolve_definite(cb_height)
        .map(|h| content_size(style, h, dims.padding.vertical(), dims.border.vertical()))
}

/// [§ 10.7 Minimum and maximum heights](https://www.w3.org/TR/CSS2/visudet.html#min-max-heights)
pub(crate) fn clamp_height(style: &ComputedStyle, cb_height: Option<f32>, dims: &BoxDimensions, height: f32) -> f32 {
    let (pad_v, border_v) = (dims.padding.vertical(), dims.border.vertical());
    let max = style
        .max_height
        .0
        .and_then(|m| m.resolve_definite(cb_height))
        .map_or(f32::INFINITY, |m| content_size(style, m, pad_v, border_v));
    let min = style
        .min_height
        .resolve_definite(cb_height)
        .map_or(0.0, |m| content_size(style, m, pad_v, border_v));
    height.min(max).max(min).max(0.0)
}

// ---------------------------------------------------------------
// Top edge
// ---------------------------------------------------------------

/// [§ 5.2 Adjoining margins at breaks](https://www.w3.org/TR/css-break-3/#break-margins)
///
/// "When an unforced break occurs between block-level boxes, any margins
/// adjoining the break truncate to zero."
pub(crate) fn truncates_top_margin(ctx: &LayoutContext<'_>, input: &BlockInput<'_>) -> bool {
    input.page_is_empty && ctx.current_page > 1 && !ctx.forced_break && ctx.page_bottom.is_finite()
}

/// Resolved top of a border box that does not collapse with its content.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TopEdge {
    /// Border box top.
    pub border_top: f32,
    /// Clearance, when the box was pushed below floats.
    pub clearance: Option<f32>,
}

/// Collapse the pending margins with `margin_top`, then apply clearance.
///
/// [§ 9.5.2](https://www.w3.org/TR/CSS2/visuren.html#flow-control): "Then
/// the amount of clearance is set to the greater of: the amount necessary
/// to place the border edge of the block even with the bottom outer edge
/// of the lowest float that is to be cleared ..."
pub(crate) fn resolve_top(ctx: &mut LayoutContext<'_>, clear: Clear, input: &BlockInput<'_>, margin_top: f32) -> TopEdge {
    let mut margins = input.adjoining_margins.clone();
    margins.push(margin_top);
    let hypothetical = input.position_y + collapse_margins(&margins);
    if clear != Clear::None
        && input.skip.is_none()
        && let Some(floor) = ctx.bfc().clearance_floor(clear, hypothetical)
    {
        return TopEdge {
            border_top: floor,
            clearance: Some(floor - hypothetical),
        };
    }
    TopEdge {
        border_top: hypothetical,
        clearance: None,
    }
}

/// [§ 9.5 Floats](https://www.w3.org/TR/CSS2/visuren.html#floats)
///
/// "The border box of a table, a block-level replaced element, or an
/// element in the normal flow that establishes a new block formatting
/// context ... must not overlap the margin box of any floats in the same
/// block formatting context as the element itself."
///
/// Returns the border top and the containing block narrowed to the free
/// band.
pub(crate) fn avoid_floats(ctx: &mut LayoutContext<'_>, id: BoxId, cb: &ContainingBlock, border_top: f32) -> (f32, ContainingBlock) {
    let tree = ctx.tree;
    if sizes_to_fit(tree, id) || tree.root() == Some(id) || ctx.current_bfc().is_none_or(|b| b.is_empty()) {
        return (border_top, *cb);
    }
    let min_width = crate::preferred::min_content_width(ctx, id);
    let (y, band) = ctx.bfc().avoid_collisions(border_top, 0.0, min_width, cb.x, cb.width);
    if band.width >= cb.width {
        return (y, *cb);
    }
    (
        y,
        ContainingBlock {
            x: band.left,
            width: band.width,
            ..*cb
        },
    )
}

// ---------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------

/// Lay out any block-level box.
pub(crate) fn block_level_layout(
    ctx: &mut LayoutContext<'_>,
    id: BoxId,
    cb: &ContainingBlock,
    input: BlockInput<'_>,
) -> LayoutOutcome {
    match ctx.tree.kind(id) {
        BoxKind::Table | BoxKind::InlineTable => crate::table::table_layout(ctx, id, cb, &input),
        BoxKind::Grid | BoxKind::InlineGrid => crate::grid::grid_layout(ctx, id, cb, &input),
        BoxKind::Flex | BoxKind::InlineFlex => crate::flex::flex_layout(ctx, id, cb, &input),
        BoxKind::Replaced(url) => {
            let url = url.clone();
            replaced_block_layout(ctx, id, cb, &input, url)
        }
        _ => block_container_layout(ctx, id, cb, &input),
    }
}

/// Lay out `id` in one piece, its margin box starting at `(cb.x, y)`,
/// ignoring the page bottom.
pub(crate) fn layout_unbreakable(ctx: &mut LayoutContext<'_>, id: BoxId, cb: &ContainingBlock, y: f32) -> Fragment {
    let page_bottom = ctx.page_bottom;
    ctx.page_bottom = f32::INFINITY;
    let outcome = block_level_layout(ctx, id, cb, BlockInput::unbreakable(y));
    ctx.page_bottom = page_bottom;
    outcome
        .fragment
        .unwrap_or_else(|| Fragment::new(Some(id), FragmentKind::Block, BoxDimensions::default()))
}

/// Outer (margin box) width of a box sized to fit: floats, atomic
/// inlines, absolutely positioned boxes.
pub(crate) fn fit_outer_width(ctx: &mut LayoutContext<'_>, id: BoxId, cb: &ContainingBlock) -> f32 {
    let tree = ctx.tree;
    let style = tree.style(id);
    let padding = style.padding(cb.width).horizontal();
    let border = style.border().horizontal();
    let margins = style.margin_left.resolve(cb.width).unwrap_or(0.0)
        + style.margin_right.resolve(cb.width).unwrap_or(0.0);
    match tree.kind(id) {
        BoxKind::Replaced(_) => crate::replaced::used_size(ctx, id, cb).0 + padding + border + margins,
        _ => match style.width.resolve(cb.width) {
            Some(declared) => content_size(style, declared, padding, border) + padding + border + margins,
            None => crate::preferred::shrink_to_fit(ctx, id, cb.width),
        },
    }
}

/// Lay out a box sized to fit in one piece at `(cb.x, y)`.
pub(crate) fn layout_fitted(ctx: &mut LayoutContext<'_>, id: BoxId, cb: &ContainingBlock, y: f32) -> Fragment {
    let tree = ctx.tree;
    let fitted = match tree.kind(id) {
        BoxKind::Replaced(_) | BoxKind::Table | BoxKind::InlineTable => *cb,
        _ if tree.style(id).width.is_auto() => ContainingBlock {
            width: fit_outer_width(ctx, id, cb),
            ..*cb
        },
        _ => *cb,
    };
    let mut fragment = layout_unbreakable(ctx, id, &fitted, y);
    if fragment.kind == FragmentKind::Block && tree.is_inline_level(id) {
        fragment.kind = FragmentKind::InlineBlock;
    }
    fragment
}

/// [§ 9.5.1 Positioning the float](https://www.w3.org/TR/CSS2/visuren.html#float-position)
///
/// Lay out a float and register its margin box in the current formatting
/// context, no higher than `position_y`.
pub(crate) fn layout_float(ctx: &mut LayoutContext<'_>, id: BoxId, cb: &ContainingBlock, position_y: f32) -> Fragment {
    let style = ctx.style(id);
    let side = FloatSide::from_float(style.float).unwrap_or(FloatSide::Left);
    let origin = ContainingBlock {
        x: 0.0,
        y: 0.0,
        height: cb.height,
        ..*cb
    };
    let mut fragment = layout_fitted(ctx, id, &origin, 0.0);
    let margin_box = fragment.margin_box();
    let placed = ctx.bfc().place_float(
        Some(id),
        side,
        margin_box.width,
        margin_box.height,
        position_y,
        cb.x,
        cb.width,
    );
    fragment.translate(placed.x - margin_box.x, placed.y - margin_box.y);
    fragment
}

// ---------------------------------------------------------------
// Replaced
// ---------------------------------------------------------------

fn replaced_block_layout(
    ctx: &mut LayoutContext<'_>,
    id: BoxId,
    cb: &ContainingBlock,
    input: &BlockInput<'_>,
    url: String,
) -> LayoutOutcome {
    let tree = ctx.tree;
    let style = tree.style(id);
    let (width, height) = crate::replaced::used_size(ctx, id, cb);
    let mut margin_top = style.margin_top.resolve(cb.width).unwrap_or(0.0);
    if truncates_top_margin(ctx, input) {
        margin_top = 0.0;
    }
    let top = resolve_top(ctx, style.clear, input, margin_top);
    let (border_top, cb) = avoid_floats(ctx, id, cb, top.border_top);
    let mut dims = horizontal_box(tree, id, &cb, Some(width));
    dims.margin.top = margin_top;
    dims.margin.bottom = style.margin_bottom.resolve(cb.width).unwrap_or(0.0);
    dims.content.y = border_top + dims.border.top + dims.padding.top;
    dims.content.height = height;
    let mut fragment = Fragment::new(Some(id), FragmentKind::Replaced { url }, dims);
    fragment.clearance = top.clearance;
    if input.skip.is_none() {
        crate::generated::record_box_start(ctx, id, input.page_is_empty);
    }
    LayoutOutcome::placed(fragment, dims.margin.bottom)
}

// ---------------------------------------------------------------
// Block containers
// ---------------------------------------------------------------

/// Running state of the vertical flow inside one block container.
struct BlockFlow {
    position_y: f32,
    adjoining: Vec<f32>,
    /// Content top, once margins above the first in-flow content resolved.
    content_top: Option<f32>,
    page_is_empty: bool,
    first_line_pending: bool,
    children: Vec<Fragment>,
    /// State before each child, to drop children again.
    checkpoints: Vec<Checkpoint>,
    last_block: Option<BoxId>,
    has_content: bool,
    resume_at: Option<ResumePoint>,
    next_page: Option<BreakValue>,
    /// Nothing placed on this page: the parent moves the whole box.
    nothing_fits: bool,
}

impl BlockFlow {
    fn pending_y(&self) -> f32 {
        self.position_y + collapse_margins(&self.adjoining)
    }

    fn resolve_margins(&mut self) -> f32 {
        let y = self.pending_y();
        self.adjoining.clear();
        self.position_y = y;
        if self.content_top.is_none() {
            self.content_top = Some(y);
        }
        y
    }

    fn push(&mut self, fragment: Fragment, checkpoint: Checkpoint) {
        self.children.push(fragment);
        self.checkpoints.push(checkpoint);
    }
}

/// Lay out a block container, retrying once with more bottom space when
/// its own bottom border and padding would cross the page bottom.
pub(crate) fn block_container_layout(
    ctx: &mut LayoutContext<'_>,
    id: BoxId,
    cb: &ContainingBlock,
    input: &BlockInput<'_>,
) -> LayoutOutcome {
    let checkpoint = ctx.checkpoint();
    let outcome = block_container_pass(ctx, id, cb, input, 0.0);
    let Some(fragment) = &outcome.fragment else {
        return outcome;
    };
    let decoration = fragment.dimensions.padding.bottom + fragment.dimensions.border.bottom;
    let content_bottom = fragment.dimensions.content.bottom();
    if outcome.resume_at.is_none()
        && !input.page_is_empty
        && decoration > 0.0
        && !ctx.overflows_page(input.bottom_space, content_bottom)
        && ctx.overflows_page(input.bottom_space, fragment.border_box().bottom())
        && !ctx.tree.children(id).is_empty()
    {
        log::trace!(
            target: "quire::block",
            "{} retried with {decoration}px bottom space",
            ctx.tree.describe(id)
        );
        ctx.rollback(&checkpoint);
        return block_container_pass(ctx, id, cb, input, decoration);
    }
    outcome
}

#[allow(clippy::too_many_lines)]
fn block_container_pass(
    ctx: &mut LayoutContext<'_>,
    id: BoxId,
    cb: &ContainingBlock,
    input: &BlockInput<'_>,
    extra_bottom: f32,
) -> LayoutOutcome {
    let tree = ctx.tree;
    let style = tree.style(id);
    let is_continuation = input.skip.is_some();
    let clone = style.box_decoration_break == BoxDecorationBreak::Clone;
    let bfc_root = tree.establishes_bfc(id);
    let is_cell = *tree.kind(id) == BoxKind::TableCell;

    // STEP 1: Vertical edges.
    let margin = if is_cell {
        EdgeSizes::default()
    } else {
        style.margin_or_zero(cb.width)
    };
    let mut margin_top = margin.top;
    let mut margin_bottom = margin.bottom;
    let padding = style.padding(cb.width);
    let border = style.border();
    let (mut top_border, mut top_padding) = (border.top, padding.top);
    if is_continuation && !clone {
        margin_top = 0.0;
        top_border = 0.0;
        top_padding = 0.0;
    }
    if truncates_top_margin(ctx, input) {
        margin_top = 0.0;
    }

    // STEP 2: Top edge. A box collapses its top margin with its first
    // child unless something separates them.
    let mut top = None;
    if style.clear != Clear::None && !is_continuation {
        let edge = resolve_top(ctx, style.clear, input, margin_top);
        if edge.clearance.is_some() {
            top = Some(edge);
        }
    }
    let collapsing_top = top.is_none() && !bfc_root && top_border == 0.0 && top_padding == 0.0;
    let mut cb = *cb;
    let mut flow = BlockFlow {
        position_y: input.position_y,
        adjoining: input.adjoining_margins.clone(),
        content_top: None,
        page_is_empty: input.page_is_empty,
        first_line_pending: !is_continuation,
        children: Vec::new(),
        checkpoints: Vec::new(),
        last_block: None,
        has_content: false,
        resume_at: None,
        next_page: None,
        nothing_fits: false,
    };
    let mut clearance = None;
    if collapsing_top {
        flow.adjoining.push(margin_top);
    } else {
        let edge = match top {
            Some(edge) => edge,
            None => resolve_top(ctx, Clear::None, input, margin_top),
        };
        clearance = edge.clearance;
        let border_top = if bfc_root {
            let (border_top, narrowed) = avoid_floats(ctx, id, &cb, edge.border_top);
            cb = narrowed;
            border_top
        } else {
            edge.border_top
        };
        let content_top = border_top + top_border + top_padding;
        flow.position_y = content_top;
        flow.adjoining.clear();
        flow.content_top = Some(content_top);
    }

    // STEP 3: Horizontal geometry and the containing block for children.
    let mut dims = horizontal_box(tree, id, &cb, None);
    dims.border.top = top_border;
    dims.padding.top = top_padding;
    // A cell's declared height is a minimum the row applies.
    let declared = if is_cell {
        None
    } else {
        declared_height(style, cb.height, &dims)
    };
    let child_cb = ContainingBlock {
        x: dims.content.x,
        y: flow.content_top.unwrap_or(input.position_y),
        width: dims.content.width,
        height: declared,
        direction: style.direction,
    };
    let bottom_space = input.bottom_space
        + extra_bottom
        + if clone {
            padding.bottom + border.bottom
        } else {
            0.0
        };

    if bfc_root {
        ctx.push_bfc(id);
    }
    let positioned = style.is_positioned() || tree.root() == Some(id);
    if positioned {
        ctx.push_absolute_scope();
    }
    if !is_continuation {
        crate::generated::record_box_start(ctx, id, input.page_is_empty);
    }

    // STEP 4: Children, in columns for a multi-column container.
    if *tree.kind(id) == BoxKind::Block && style.is_multicol() {
        let columns = crate::columns::columns_layout(
            ctx,
            id,
            &child_cb,
            flow.position_y,
            input.skip,
            input.page_is_empty,
            bottom_space,
        );
        flow.has_content = !columns.children.is_empty();
        flow.page_is_empty &= !flow.has_content;
        flow.position_y = columns.bottom;
        flow.children = columns.children;
        flow.resume_at = columns.resume_at;
        flow.nothing_fits = columns.nothing_fits;
    } else {
        flow_children(ctx, id, &child_cb, &mut flow, input.skip, bottom_space);
    }

    // STEP 5: Nothing fit, or the box must not break here.
    let broken = flow.resume_at.is_some();
    let pushed = (flow.nothing_fits && !input.page_is_empty)
        || (broken && style.break_inside == BreakInside::Avoid && !input.page_is_empty);
    if pushed {
        if positioned {
            let _ = ctx.pop_absolute_scope();
        }
        if bfc_root {
            let _ = ctx.pop_bfc();
        }
        log::trace!(target: "quire::block", "{} moves to the next page", tree.describe(id));
        return LayoutOutcome::nothing();
    }

    // STEP 6: Collapsing through.
    let collapse_bottom_allowed = !bfc_root
        && style.height.is_auto()
        && padding.bottom == 0.0
        && border.bottom == 0.0
        && !broken;
    if collapsing_top
        && collapse_bottom_allowed
        && flow.content_top.is_none()
        && clamp_height(style, cb.height, &dims, 0.0) == 0.0
    {
        let y = flow.pending_y();
        dims.content.y = y;
        dims.margin.top = margin_top;
        dims.margin.bottom = margin_bottom;
        let mut fragment = Fragment::new(Some(id), FragmentKind::Block, dims);
        fragment.children = flow.children;
        fragment.is_continuation = is_continuation;
        finish_positioned(ctx, id, &mut fragment, positioned);
        if bfc_root {
            let _ = ctx.pop_bfc();
        }
        let mut adjoining = flow.adjoining;
        adjoining.push(margin_bottom);
        return LayoutOutcome {
            fragment: Some(fragment),
            adjoining_margins: adjoining,
            collapsing_through: true,
            ..LayoutOutcome::nothing()
        };
    }

    // STEP 7: Height.
    let content_top = match flow.content_top {
        Some(top) => top,
        None => flow.resolve_margins(),
    };
    if !collapse_bottom_allowed {
        let _ = flow.resolve_margins();
    }
    let mut height = flow.position_y - content_top;
    if bfc_root && let Some(lowest) = ctx.current_bfc().and_then(|b| b.lowest_shape_bottom()) {
        height = height.max(lowest - content_top);
    }
    if !broken && !is_continuation && let Some(declared) = declared {
        height = declared;
    }
    height = if broken {
        height.max(0.0)
    } else {
        clamp_height(style, cb.height, &dims, height)
    };

    // STEP 8: Decorations at the break.
    if broken && !clone {
        dims.padding.bottom = 0.0;
        dims.border.bottom = 0.0;
        margin_bottom = 0.0;
    } else if broken && ctx.config.clone_decoration_margins {
        margin_bottom = 0.0;
    }
    dims.content.y = content_top;
    dims.content.height = height;
    dims.margin.top = margin_top;
    dims.margin.bottom = margin_bottom;

    let mut fragment = Fragment::new(Some(id), FragmentKind::Block, dims);
    fragment.clearance = clearance;
    fragment.is_continuation = is_continuation;
    fragment.is_broken = broken;
    fragment.baseline = fragment_first_baseline(&flow.children);
    fragment.children = flow.children;

    // STEP 9: Absolutely positioned descendants and the BFC scope.
    finish_positioned(ctx, id, &mut fragment, positioned);
    if bfc_root {
        let _ = ctx.pop_bfc();
    }

    let adjoining_margins = if broken {
        Vec::new()
    } else if collapse_bottom_allowed {
        let mut pending = flow.adjoining;
        pending.push(margin_bottom);
        pending
    } else {
        vec![margin_bottom]
    };
    LayoutOutcome {
        fragment: Some(fragment),
        resume_at: flow.resume_at,
        next_page: flow.next_page,
        adjoining_margins,
        collapsing_through: false,
    }
}

fn fragment_first_baseline(children: &[Fragment]) -> Option<f32> {
    children.iter().find_map(|c| c.baseline)
}

/// Close the absolute scope of a positioned box and lay out what it
/// collected against its padding box.
pub(crate) fn finish_positioned(ctx: &mut LayoutContext<'_>, id: BoxId, fragment: &mut Fragment, positioned: bool) {
    if !positioned {
        return;
    }
    let pending = ctx.pop_absolute_scope();
    let direction = ctx.style(id).direction;
    let padding_box = fragment.dimensions.padding_box();
    for item in pending {
        let placed = crate::positioned::layout_absolute(ctx, item, padding_box, direction);
        fragment.children.push(placed);
    }
}

/// End of the run of inline-level children starting at `start`: inline
/// boxes, text, atomics and the out-of-flow boxes among them.
fn inline_run_end(tree: &BoxTree, children: &[BoxId], start: usize) -> Option<usize> {
    let mut end = start;
    let mut has_inline = false;
    while end < children.len() {
        let child = children[end];
        if tree.is_inline_level(child) {
            has_inline = true;
        } else if !tree.style(child).is_out_of_flow() {
            break;
        }
        end += 1;
    }
    has_inline.then_some(end)
}

#[allow(clippy::too_many_lines)]
fn flow_children(
    ctx: &mut LayoutContext<'_>,
    id: BoxId,
    cb: &ContainingBlock,
    flow: &mut BlockFlow,
    skip: Option<&ResumePoint>,
    bottom_space: f32,
) {
    let tree = ctx.tree;
    let children = tree.children(id);
    let (mut index, mut inner) = skip.map_or((0, None), |rp| (rp.index, rp.inner()));
    let start_index = index;

    while index < children.len() {
        let child = children[index];
        let child_style = tree.style(child);

        if let Some(end) = inline_run_end(tree, children, index) {
            let done = flow_inline_run(ctx, id, cb, flow, index, &children[index..end], inner.take(), bottom_space);
            if !done {
                break;
            }
            index = end;
            continue;
        }

        if let Position::Running(name) = &child_style.position {
            ctx.log_event(PageEvent::Running {
                name: name.clone(),
                box_id: child,
                at_start: flow.page_is_empty,
            });
            index += 1;
            continue;
        }

        if child_style.position.is_absolutely_positioned() {
            let pending = PendingAbsolute {
                box_id: child,
                static_x: cb.x,
                static_y: flow.pending_y(),
            };
            ctx.defer_positioned(pending, child_style.position == Position::Fixed);
            index += 1;
            continue;
        }

        if child_style.is_floated() {
            let checkpoint = ctx.checkpoint();
            let mut fragment = layout_float(ctx, child, cb, flow.pending_y());
            if !flow.page_is_empty && ctx.overflows_page(bottom_space, fragment.margin_box().y) {
                ctx.rollback(&checkpoint);
                break_before(ctx, flow, index, child, start_index);
                break;
            }
            fragment.source_index = Some(index);
            flow.push(fragment, checkpoint);
            index += 1;
            continue;
        }

        // Forced break between this child and what precedes it here.
        if inner.is_none() && flow.has_content {
            let value = match flow.last_block {
                Some(previous) => breaks::between(tree, previous, child),
                None => breaks::break_before(tree, child),
            };
            if value.is_forced() {
                log::debug!(
                    target: "quire::pagination",
                    "forced {value} break before {}",
                    tree.describe(child)
                );
                flow.resume_at = Some(ResumePoint::at(index));
                flow.next_page = Some(value);
                break;
            }
        }

        let checkpoint = ctx.checkpoint();
        let child_input = BlockInput {
            position_y: flow.position_y,
            bottom_space,
            skip: inner.take(),
            page_is_empty: flow.page_is_empty,
            adjoining_margins: flow.adjoining.clone(),
        };
        let outcome = block_level_layout(ctx, child, cb, child_input);
        let Some(mut fragment) = outcome.fragment else {
            ctx.rollback(&checkpoint);
            break_before(ctx, flow, index, child, start_index);
            break;
        };

        let bottom = if outcome.collapsing_through {
            flow.position_y
        } else {
            fragment.border_box().bottom()
        };
        if outcome.resume_at.is_none() && !flow.page_is_empty && ctx.overflows_page(bottom_space, bottom) {
            #[cfg(feature = "layout-trace")]
            log::trace!(
                target: "quire::block",
                "{} ends at {bottom}, past {}",
                tree.describe(child),
                ctx.page_bottom - bottom_space
            );
            ctx.rollback(&checkpoint);
            break_before(ctx, flow, index, child, start_index);
            break;
        }

        if !outcome.collapsing_through {
            if flow.content_top.is_none() {
                flow.content_top = Some(fragment.border_box().y);
            }
            flow.position_y = bottom;
            flow.page_is_empty = false;
        }
        flow.adjoining = outcome.adjoining_margins;
        flow.has_content = true;
        flow.first_line_pending = false;
        flow.last_block = Some(child);

        let (dx, dy) = crate::positioned::relative_offset(child_style, cb);
        fragment.translate(dx, dy);
        fragment.source_index = Some(index);
        flow.push(fragment, checkpoint);

        if let Some(resume) = outcome.resume_at {
            flow.resume_at = Some(ResumePoint::nested(index, resume));
            flow.next_page = outcome.next_page;
            break;
        }
        index += 1;
    }
}

/// End this page before child `index`, moving the break earlier when the
/// break there is to be avoided.
fn break_before(ctx: &mut LayoutContext<'_>, flow: &mut BlockFlow, index: usize, child: BoxId, start_index: usize) {
    let tree = ctx.tree;
    if !flow.has_content {
        // Nothing in flow here yet: the whole box moves.
        flow.nothing_fits = true;
        flow.resume_at = Some(ResumePoint::at(start_index));
        return;
    }
    let avoided = match flow.children.last() {
        Some(last) if last.kind != FragmentKind::Line => last
            .box_id
            .is_some_and(|previous| breaks::between(tree, previous, child).is_avoid()),
        _ => breaks::break_before(tree, child).is_avoid(),
    };
    if avoided && let Some(at) = breaks::find_earlier_page_break(tree, &flow.children) {
        let checkpoint = flow.checkpoints[at].clone();
        ctx.rollback(&checkpoint);
        let removed = flow.children.split_off(at);
        flow.checkpoints.truncate(at);
        let resume = removed[0].source_index.unwrap_or(index);
        log::debug!(
            target: "quire::pagination",
            "break avoided before {}, moved back to child {resume}",
            tree.describe(child)
        );
        flow.resume_at = Some(ResumePoint::at(resume));
        if flow.children.is_empty() {
            flow.nothing_fits = true;
        }
        return;
    }
    if avoided {
        log::debug!(
            target: "quire::pagination",
            "no better break than before {}",
            tree.describe(child)
        );
    }
    flow.resume_at = Some(ResumePoint::at(index));
}

/// Place the lines of an inline run. Returns `false` when the page ends
/// inside or before the run.
#[allow(clippy::too_many_arguments, clippy::too_many_lines)]
fn flow_inline_run(
    ctx: &mut LayoutContext<'_>,
    id: BoxId,
    cb: &ContainingBlock,
    flow: &mut BlockFlow,
    run_index: usize,
    run: &[BoxId],
    skip: Option<&ResumePoint>,
    bottom_space: f32,
) -> bool {
    let tree = ctx.tree;
    let style = tree.style(id);
    let run_checkpoint = ctx.checkpoint();
    let page_was_empty = flow.page_is_empty;

    let mut breaker = LineBreaker::new(
        ctx,
        RunInput {
            container: id,
            children: run,
            cb: *cb,
            y: flow.pending_y(),
            skip,
            first_line: flow.first_line_pending,
            page_is_empty: flow.page_is_empty,
        },
    );

    // STEP 1: Accept lines until one crosses the page bottom.
    let mut accepted: Vec<(Fragment, Checkpoint, bool)> = Vec::new();
    let mut real_lines = 0_u32;
    let mut overflow: Option<Checkpoint> = None;
    let mut push_paragraph = false;
    'lines: loop {
        let checkpoint = ctx.checkpoint();
        let Some(line) = breaker.next_line(ctx) else {
            break;
        };
        if line.phantom {
            accepted.push((line.fragment, checkpoint, true));
            continue;
        }
        let bottom = line.fragment.border_box().bottom();
        let forced_fit = page_was_empty && real_lines == 0;
        if !forced_fit && ctx.overflows_page(bottom_space, bottom) {
            overflow = Some(checkpoint);
            break;
        }
        for footnote in line.fragment.footnote_calls() {
            let fits = footnotes::place(ctx, footnote);
            if fits && !ctx.overflows_page(bottom_space, bottom) {
                continue;
            }
            match tree.style(footnote).footnote_policy {
                FootnotePolicy::Line if !forced_fit => {
                    ctx.rollback(&checkpoint);
                    overflow = Some(checkpoint);
                    break 'lines;
                }
                FootnotePolicy::Block if !page_was_empty => {
                    push_paragraph = true;
                    break 'lines;
                }
                _ => footnotes::report(ctx, footnote),
            }
        }
        real_lines += 1;
        accepted.push((line.fragment, checkpoint, false));
    }

    // STEP 2: Orphans and widows.
    let mut keep = accepted.len();
    if let Some(checkpoint) = &overflow {
        let mut rest = 1_u32;
        while let Some(line) = breaker.next_line(ctx) {
            if !line.phantom {
                rest += 1;
            }
        }
        ctx.rollback(checkpoint);

        let orphans = style.orphans.max(1);
        let widows = style.widows.max(1);
        if rest < widows {
            let mut need = widows - rest;
            let mut kept_real = real_lines;
            while need > 0 && keep > 0 {
                keep -= 1;
                if !accepted[keep].2 {
                    kept_real -= 1;
                    need -= 1;
                }
            }
            if kept_real < orphans {
                if page_was_empty {
                    keep = accepted.len();
                } else {
                    push_paragraph = true;
                }
            } else {
                real_lines = kept_real;
            }
        }
        if real_lines < orphans && !page_was_empty {
            push_paragraph = true;
        }
        log::trace!(
            target: "quire::block",
            "paragraph in {} breaks after {real_lines} lines, {rest} follow",
            tree.describe(id)
        );
    }

    if push_paragraph || (overflow.is_some() && keep == 0 && !page_was_empty) {
        ctx.rollback(&run_checkpoint);
        let run_resume = skip.map_or(ResumePoint::at(run_index), |rp| {
            ResumePoint::nested(run_index, rp.clone())
        });
        let first = run.first().copied().unwrap_or(id);
        break_before(ctx, flow, run_index, first, run_index);
        if flow.resume_at == Some(ResumePoint::at(run_index)) {
            flow.resume_at = Some(run_resume);
        }
        return false;
    }
    if keep < accepted.len() {
        let checkpoint = accepted[keep].1.clone();
        ctx.rollback(&checkpoint);
        accepted.truncate(keep);
    }

    // STEP 3: Move accepted lines into the flow.
    let mut resume = None;
    for (mut line, checkpoint, phantom) in accepted {
        resume = line.resume_at.clone();
        line.source_index = Some(run_index);
        if !phantom {
            let _ = flow.resolve_margins();
            flow.position_y = line.border_box().bottom();
            flow.page_is_empty = false;
            flow.has_content = true;
            flow.first_line_pending = false;
            flow.last_block = None;
        }
        flow.push(line, checkpoint);
    }

    if overflow.is_some() {
        flow.resume_at = Some(match resume {
            Some(inner) => ResumePoint::nested(run_index, inner),
            None => ResumePoint::at(run_index + run.len()),
        });
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(s: HorizontalSolution, bp: f32) -> f32 {
        s.margin_left + s.width + s.margin_right + bp
    }

    #[test]
    fn auto_width_absorbs_remaining_space() {
        let s = solve_horizontal(100.0, None, Some(10.0), None, 4.0, Direction::Ltr);
        assert_eq!(s.width, 86.0);
        assert_eq!(s.margin_right, 0.0);
        assert_eq!(sum(s, 4.0), 100.0);
    }

    #[test]
    fn auto_margins_center() {
        let s = solve_horizontal(100.0, Some(60.0), None, None, 0.0, Direction::Ltr);
        assert_eq!((s.margin_left, s.margin_right), (20.0, 20.0));
    }

    #[test]
    fn overconstrained_overrides_end_margin() {
        let ltr = solve_horizontal(100.0, Some(50.0), Some(10.0), Some(10.0), 0.0, Direction::Ltr);
        assert_eq!((ltr.margin_left, ltr.margin_right), (10.0, 40.0));
        let rtl = solve_horizontal(100.0, Some(50.0), Some(10.0), Some(10.0), 0.0, Direction::Rtl);
        assert_eq!((rtl.margin_left, rtl.margin_right), (40.0, 10.0));
    }

    #[test]
    fn too_wide_boxes_treat_auto_margins_as_zero() {
        let s = solve_horizontal(100.0, Some(120.0), None, Some(5.0), 0.0, Direction::Ltr);
        assert_eq!(s.margin_left, 0.0);
        assert_eq!(s.margin_right, -20.0);
    }

    #[test]
    fn width_never_goes_negative() {
        let s = solve_horizontal(10.0, None, Some(8.0), Some(8.0), 0.0, Direction::Ltr);
        assert_eq!(s.width, 0.0);
        assert_eq!(sum(s, 0.0), 10.0);
    }

    #[test]
    fn margins_collapse_by_sign() {
        assert_eq!(collapse_margins(&[10.0, 15.0]), 15.0);
        assert_eq!(collapse_margins(&[-10.0, 15.0]), 5.0);
        assert_eq!(collapse_margins(&[-10.0, -15.0]), -15.0);
        assert_eq!(collapse_margins(&[]), 0.0);
    }
}
