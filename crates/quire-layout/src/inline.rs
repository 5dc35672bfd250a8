//! Inline formatting contexts.
//!
//! [§ 9.4.2 Inline formatting contexts](https://www.w3.org/TR/CSS2/visuren.html#inline-formatting)
//!
//! "In an inline formatting context, boxes are laid out horizontally, one
//! after the other, beginning at the top of a containing block."
//!
//! A run of inline-level siblings is flattened into [`Item`]s once, then
//! [`LineBreaker::next_line`] produces one line box per call. Each line is
//! planned first (what fits in the float band at its Y) and then built
//! (vertical alignment, `text-align`, the fragment tree). The block flow
//! decides which lines stay on the page.

use crate::block::{fit_outer_width, layout_fitted, layout_float};
use crate::context::{Checkpoint, LayoutContext, PendingAbsolute};
use crate::fragment::{Fragment, FragmentKind, ResumePoint};
use crate::geometry::{BoxDimensions, ContainingBlock, Direction, EdgeSizes, Rect};
use crate::float::Band;
use crate::generated::GeneratedPart;
use crate::strings::PageEvent;
use crate::style::{ComputedStyle, Hyphens, Overflow, Position, TextAlign, VerticalAlign, WhiteSpace};
use crate::text::Strut;
use crate::tree::{BoxId, BoxKind, BoxTree};

const SOFT_HYPHEN: char = '\u{ad}';

/// Slack when comparing widths, for accumulated float error.
const FIT_EPSILON: f32 = 1e-3;

// ---------------------------------------------------------------
// Items
// ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum ItemKind {
    /// Text with white space already processed.
    Text(String),
    /// Start of an inline box.
    Open,
    /// End of an inline box.
    Close,
    /// Inline-block, inline table or grid, image, or a block-level box
    /// met inside an inline box.
    Atomic,
    /// Forced line break.
    LineBreak,
    /// Footnote call marker.
    Call { footnote: BoxId, label: String },
    /// `leader()` pattern from generated content.
    Leader(String),
    Float,
    Positioned,
    Running(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Item {
    box_id: BoxId,
    kind: ItemKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Text(String),
    Newline,
}

/// [§ 4.1 The White Space Processing Rules](https://www.w3.org/TR/css-text-3/#white-space-rules)
///
/// Collapse white space in `text` according to `ws`. `prev_space` carries
/// whether the text before ended in a collapsible space, so runs collapse
/// across box boundaries.
fn normalize(text: &str, ws: WhiteSpace, prev_space: &mut bool) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut buffer = String::new();
    if ws.collapses_spaces() {
        for c in text.chars() {
            if c == '\n' && ws.preserves_newlines() {
                // "Any collapsible space immediately preceding or following
                // a segment break is removed."
                if buffer.ends_with(' ') {
                    let _ = buffer.pop();
                }
                if !buffer.is_empty() {
                    pieces.push(Piece::Text(std::mem::take(&mut buffer)));
                }
                pieces.push(Piece::Newline);
                *prev_space = true;
            } else if c.is_whitespace() && c != '\u{a0}' {
                if !*prev_space {
                    buffer.push(' ');
                    *prev_space = true;
                }
            } else {
                buffer.push(c);
                *prev_space = false;
            }
        }
    } else {
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                if !buffer.is_empty() {
                    pieces.push(Piece::Text(std::mem::take(&mut buffer)));
                }
                pieces.push(Piece::Newline);
            }
            buffer.push_str(&line.replace('\t', "        ").replace('\r', ""));
        }
        *prev_space = false;
    }
    if !buffer.is_empty() {
        pieces.push(Piece::Text(buffer));
    }
    pieces
}

fn flatten(ctx: &mut LayoutContext<'_>, children: &[BoxId], prev_space: &mut bool, out: &mut Vec<Item>) {
    let tree = ctx.tree;
    for &id in children {
        let style = tree.style(id);
        let item = |kind| Item { box_id: id, kind };
        if style.is_floated() {
            out.push(item(ItemKind::Float));
            continue;
        }
        if style.position.is_absolutely_positioned() {
            out.push(item(ItemKind::Positioned));
            continue;
        }
        if let Position::Running(name) = &style.position {
            out.push(item(ItemKind::Running(name.clone())));
            continue;
        }
        match tree.kind(id) {
            BoxKind::Text(text) => push_text(out, id, text, style.white_space, prev_space),
            BoxKind::Generated => {
                for part in crate::generated::generated_box_parts(ctx, id) {
                    match part {
                        GeneratedPart::Text(text) => push_text(out, id, &text, style.white_space, prev_space),
                        GeneratedPart::Leader(pattern) => {
                            out.push(item(ItemKind::Leader(pattern)));
                            *prev_space = false;
                        }
                    }
                }
            }
            BoxKind::LineBreak => {
                out.push(item(ItemKind::LineBreak));
                *prev_space = true;
            }
            BoxKind::FootnoteCall { footnote, label } => {
                out.push(item(ItemKind::Call {
                    footnote: *footnote,
                    label: label.clone(),
                }));
                *prev_space = false;
            }
            BoxKind::Inline => {
                out.push(item(ItemKind::Open));
                flatten(ctx, tree.children(id), prev_space, out);
                out.push(item(ItemKind::Close));
            }
            _ => {
                out.push(item(ItemKind::Atomic));
                *prev_space = false;
            }
        }
    }
}

fn push_text(out: &mut Vec<Item>, id: BoxId, text: &str, ws: WhiteSpace, prev_space: &mut bool) {
    for piece in normalize(text, ws, prev_space) {
        let kind = match piece {
            Piece::Text(text) => ItemKind::Text(text),
            Piece::Newline => ItemKind::LineBreak,
        };
        out.push(Item { box_id: id, kind });
    }
}

/// Text as painted: soft hyphens are invisible unless a line breaks there.
fn visible(text: &str) -> String {
    text.chars().filter(|c| *c != SOFT_HYPHEN).collect()
}

// ---------------------------------------------------------------
// Line breaker
// ---------------------------------------------------------------

/// What the block flow hands to the line breaker.
#[derive(Debug, Clone)]
pub(crate) struct RunInput<'r> {
    /// Block container owning the inline formatting context.
    pub container: BoxId,
    /// The inline-level (and out-of-flow) children forming the run.
    pub children: &'r [BoxId],
    /// The container's content box.
    pub cb: ContainingBlock,
    /// Top of the first line.
    pub y: f32,
    /// Where to resume inside the run.
    pub skip: Option<&'r ResumePoint>,
    /// Whether the first line is the container's first formatted line.
    pub first_line: bool,
    /// Whether nothing in flow was placed on this page yet.
    pub page_is_empty: bool,
}

/// One line, ready to be placed.
#[derive(Debug, Clone)]
pub(crate) struct LineBox {
    /// The line fragment; `resume_at` is set when content follows.
    pub fragment: Fragment,
    /// A line with no text, atomic, call or forced break. It has no
    /// height and does not count for orphans, widows or collapsing.
    pub phantom: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    item: usize,
    offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineEnd {
    /// Wrapped at a soft opportunity or by overflow.
    Soft,
    /// Ended by a forced break.
    Forced,
    /// Last line of the run.
    Last,
}

#[derive(Debug, Clone)]
enum Entry {
    Text { item: usize, text: String, width: f32 },
    Open { item: usize, width: f32 },
    Close { item: usize, width: f32 },
    Atomic { item: usize, fragment: Box<Fragment> },
    Call { item: usize, width: f32 },
    /// Takes no room while planning; grows to its share of the free space
    /// when the line is built.
    Leader(usize),
    LineBreak,
    Positioned(usize),
    Running(usize),
}

impl Entry {
    fn width(&self) -> f32 {
        match self {
            Self::Text { width, .. }
            | Self::Open { width, .. }
            | Self::Close { width, .. }
            | Self::Call { width, .. } => *width,
            Self::Atomic { fragment, .. } => fragment.margin_box().width,
            Self::Leader(_) | Self::LineBreak | Self::Positioned(_) | Self::Running(_) => 0.0,
        }
    }
}

/// A position in the line where it may wrap.
#[derive(Debug, Clone)]
struct Opportunity {
    entries: usize,
    cursor: Cursor,
    effects: usize,
}

/// What fits on one line.
#[derive(Debug)]
struct Plan {
    entries: Vec<Entry>,
    x: f32,
    has_content: bool,
    cursor: Cursor,
    end: LineEnd,
    band: Band,
    floats: Vec<Fragment>,
    floats_after: Vec<BoxId>,
    /// State before each layout call with side effects, to undo them when
    /// going back to an opportunity.
    effects: Vec<Checkpoint>,
}

enum Planned {
    Line(Plan),
    /// The first segment does not fit beside the floats: retry lower.
    MoveDown(f32),
}

/// Produces the line boxes of one inline run, one at a time.
pub(crate) struct LineBreaker {
    container: BoxId,
    cb: ContainingBlock,
    items: Vec<Item>,
    cursor: Cursor,
    /// Inline boxes open at the cursor, outermost first.
    open: Vec<BoxId>,
    y: f32,
    first_line: bool,
    page_is_empty: bool,
    strut: Strut,
}

impl LineBreaker {
    /// Flatten the run and position the cursor at `input.skip`.
    pub(crate) fn new(ctx: &mut LayoutContext<'_>, input: RunInput<'_>) -> Self {
        let mut items = Vec::new();
        let mut prev_space = true;
        flatten(ctx, input.children, &mut prev_space, &mut items);

        let cursor = input.skip.map_or(Cursor { item: 0, offset: 0 }, |rp| Cursor {
            item: rp.index.min(items.len()),
            offset: rp.inner().map_or(0, |inner| inner.index),
        });
        let mut open = Vec::new();
        for item in &items[..cursor.item] {
            match item.kind {
                ItemKind::Open => open.push(item.box_id),
                ItemKind::Close => {
                    let _ = open.pop();
                }
                _ => {}
            }
        }
        let strut = ctx.strut(ctx.style(input.container));
        Self {
            container: input.container,
            cb: input.cb,
            items,
            cursor,
            open,
            y: input.y,
            first_line: input.first_line && input.skip.is_none(),
            page_is_empty: input.page_is_empty,
            strut,
        }
    }

    fn at_end(&self) -> bool {
        self.cursor.item >= self.items.len()
    }

    /// The next line box, `None` once the run is exhausted.
    pub(crate) fn next_line(&mut self, ctx: &mut LayoutContext<'_>) -> Option<LineBox> {
        if self.at_end() {
            return None;
        }
        let start = self.cursor;
        let checkpoint = ctx.checkpoint();
        let mut plan = loop {
            match self.plan(ctx) {
                Planned::Line(plan) => break plan,
                Planned::MoveDown(y) => {
                    ctx.rollback(&checkpoint);
                    log::trace!(target: "quire::inline", "line moves below floats to {y}");
                    self.y = y;
                }
            }
        };
        // Always make progress, even on content that cannot be placed.
        if plan.cursor == start {
            plan.cursor = Cursor {
                item: start.item + 1,
                offset: 0,
            };
        }
        let line = self.build(ctx, plan);
        Some(line)
    }

    fn band(&self, ctx: &mut LayoutContext<'_>, y: f32) -> Band {
        ctx.bfc().band_at(y, self.strut.height, self.cb.x, self.cb.width)
    }

    fn indent(&self, ctx: &LayoutContext<'_>) -> f32 {
        if self.first_line {
            ctx.style(self.container).text_indent.resolve(self.cb.width)
        } else {
            0.0
        }
    }

    // -----------------------------------------------------------
    // Planning
    // -----------------------------------------------------------

    #[allow(clippy::too_many_lines)]
    fn plan(&self, ctx: &mut LayoutContext<'_>) -> Planned {
        let tree = ctx.tree;
        let indent = self.indent(ctx);
        let band = self.band(ctx, self.y);
        let narrowed = band.width < self.cb.width;
        let wraps = ctx.style(self.container).white_space.wraps();
        let mut plan = Plan {
            entries: Vec::new(),
            x: 0.0,
            has_content: false,
            cursor: self.cursor,
            end: LineEnd::Soft,
            band,
            floats: Vec::new(),
            floats_after: Vec::new(),
            effects: Vec::new(),
        };
        let mut avail = band.width - indent;
        let mut opportunity: Option<Opportunity> = None;

        loop {
            let Some(item) = self.items.get(plan.cursor.item) else {
                plan.end = LineEnd::Last;
                break;
            };
            let index = plan.cursor.item;
            let style = tree.style(item.box_id);
            match &item.kind {
                ItemKind::Open => {
                    let width = leading_edge(style, self.cb.width);
                    plan.x += width;
                    plan.entries.push(Entry::Open { item: index, width });
                    plan.advance_item();
                }
                ItemKind::Close => {
                    let width = trailing_edge(style, self.cb.width);
                    plan.x += width;
                    plan.entries.push(Entry::Close { item: index, width });
                    plan.advance_item();
                }
                ItemKind::Positioned => {
                    plan.entries.push(Entry::Positioned(index));
                    plan.advance_item();
                }
                ItemKind::Running(_) => {
                    plan.entries.push(Entry::Running(index));
                    plan.advance_item();
                }
                ItemKind::LineBreak => {
                    plan.entries.push(Entry::LineBreak);
                    plan.has_content = true;
                    plan.advance_item();
                    plan.end = LineEnd::Forced;
                    break;
                }
                ItemKind::Float => {
                    // [§ 9.5.1](https://www.w3.org/TR/CSS2/visuren.html#float-position):
                    // a float goes beside the current line when there is
                    // room for it, below the line otherwise.
                    let width = fit_outer_width(ctx, item.box_id, &self.cb);
                    if plan.x + width <= avail + FIT_EPSILON {
                        plan.effects.push(ctx.checkpoint());
                        let fragment = layout_float(ctx, item.box_id, &self.cb, self.y);
                        plan.floats.push(fragment);
                        plan.band = self.band(ctx, self.y);
                        avail = plan.band.width - indent;
                    } else {
                        plan.floats_after.push(item.box_id);
                    }
                    plan.advance_item();
                }
                ItemKind::Leader(_) => {
                    plan.entries.push(Entry::Leader(index));
                    plan.has_content = true;
                    plan.advance_item();
                }
                ItemKind::Call { label, .. } => {
                    let width = ctx.text_width(style, label);
                    plan.entries.push(Entry::Call { item: index, width });
                    plan.x += width;
                    plan.has_content = true;
                    plan.advance_item();
                }
                ItemKind::Atomic => {
                    if wraps && plan.has_content {
                        opportunity = Some(plan.opportunity());
                    }
                    plan.effects.push(ctx.checkpoint());
                    let origin = ContainingBlock {
                        x: 0.0,
                        y: 0.0,
                        ..self.cb
                    };
                    let fragment = layout_fitted(ctx, item.box_id, &origin, 0.0);
                    let width = fragment.margin_box().width;
                    if plan.x + width > avail + FIT_EPSILON && wraps {
                        if plan.has_content {
                            if let Some(op) = &opportunity {
                                plan.revert(ctx, op);
                                break;
                            }
                        } else if narrowed && let Some(below) = ctx.bfc().next_shape_bottom_after(self.y) {
                            return Planned::MoveDown(below);
                        }
                    }
                    plan.entries.push(Entry::Atomic {
                        item: index,
                        fragment: Box::new(fragment),
                    });
                    plan.x += width;
                    plan.has_content = true;
                    plan.advance_item();
                    if wraps {
                        opportunity = Some(plan.opportunity());
                    }
                }
                ItemKind::Text(text) => {
                    let ws = style.white_space;
                    let mut offset = plan.cursor.offset.min(text.len());
                    if !plan.has_content && ws.collapses_spaces() {
                        let rest = &text[offset..];
                        offset += rest.len() - rest.trim_start_matches(' ').len();
                        plan.cursor.offset = offset;
                    }
                    if offset >= text.len() {
                        plan.advance_item();
                        continue;
                    }
                    let rest = &text[offset..];
                    let (word_len, segment_len) = if ws.wraps() {
                        let word = rest.find(' ').unwrap_or(rest.len());
                        let spaces = rest[word..].len() - rest[word..].trim_start_matches(' ').len();
                        (word, word + spaces)
                    } else {
                        (rest.len(), rest.len())
                    };
                    let word = &rest[..word_len];
                    let segment = visible(&rest[..segment_len]);
                    let word_width = ctx.text_width(style, &visible(word));
                    let fits = plan.x + word_width <= avail + FIT_EPSILON;

                    if !fits && ws.wraps() {
                        // STEP 1: Hyphenate the word that does not fit.
                        if let Some((shown, consumed)) = hyphenation_cut(ctx, style, word, avail - plan.x) {
                            let width = ctx.text_width(style, &shown);
                            plan.entries.push(Entry::Text {
                                item: index,
                                text: shown,
                                width,
                            });
                            plan.x += width;
                            plan.has_content = true;
                            plan.cursor.offset = offset + consumed;
                            break;
                        }
                        // STEP 2: Wrap at the last opportunity.
                        if let Some(op) = &opportunity {
                            plan.revert(ctx, op);
                            break;
                        }
                        // STEP 3: Try below the floats.
                        if !plan.has_content
                            && narrowed
                            && let Some(below) = ctx.bfc().next_shape_bottom_after(self.y)
                        {
                            return Planned::MoveDown(below);
                        }
                        // STEP 4: Overflow with the unbreakable word.
                    }

                    let width = ctx.text_width(style, &segment);
                    plan.entries.push(Entry::Text {
                        item: index,
                        text: segment,
                        width,
                    });
                    plan.x += width;
                    plan.has_content = true;
                    plan.cursor.offset = offset + segment_len;
                    if plan.cursor.offset >= text.len() {
                        plan.advance_item();
                    }
                    if !fits && ws.wraps() && plan.has_content {
                        break;
                    }
                    if ws.wraps() && segment_len > word_len {
                        opportunity = Some(plan.opportunity());
                    }
                }
            }
        }

        // A soft wrap that consumed everything left is still the last line.
        if plan.end == LineEnd::Soft && plan.cursor.item >= self.items.len() {
            plan.end = LineEnd::Last;
        }
        Planned::Line(plan)
    }

    // -----------------------------------------------------------
    // Building
    // -----------------------------------------------------------

    #[allow(clippy::too_many_lines, clippy::cast_precision_loss)]
    fn build(&mut self, ctx: &mut LayoutContext<'_>, mut plan: Plan) -> LineBox {
        let tree = ctx.tree;
        let container = ctx.style(self.container);
        let line_top = self.y;
        let band = plan.band;
        let phantom = !plan.has_content;

        // STEP 1: Trim collapsible spaces at the end of the line, and join
        // the segments of each text box.
        trim_trailing_spaces(tree, &self.items, &mut plan.entries, ctx);
        plan.entries = coalesce(std::mem::take(&mut plan.entries));

        // STEP 2: Vertical metrics.
        // [§ 10.8 Line height calculations](https://www.w3.org/TR/CSS2/visudet.html#line-height)
        //
        // "The height of the line box is the distance between the uppermost
        // box top and the lowermost box bottom."
        let mut above = 0.0_f32;
        let mut below = 0.0_f32;
        if !phantom {
            grow(&mut above, &mut below, self.strut);
            for &id in &self.open {
                grow(&mut above, &mut below, ctx.strut(ctx.style(id)));
            }
        }
        let mut edge_aligned: Vec<(VerticalAlign, f32)> = Vec::new();
        for entry in &plan.entries {
            match entry {
                Entry::Text { item, .. } | Entry::Call { item, .. } | Entry::Open { item, .. } => {
                    grow(&mut above, &mut below, ctx.strut(ctx.style(self.items[*item].box_id)));
                }
                Entry::Atomic { item, fragment } => {
                    let style = ctx.style(self.items[*item].box_id);
                    let margin_box = fragment.margin_box();
                    let height = margin_box.height;
                    let baseline = atomic_baseline(style, fragment);
                    let font = self.strut;
                    let (a, b) = match style.vertical_align {
                        VerticalAlign::Baseline => (baseline, height - baseline),
                        VerticalAlign::Middle => {
                            let centre = container.font_size.0 * 0.25;
                            (height / 2.0 + centre, height / 2.0 - centre)
                        }
                        VerticalAlign::TextTop => (font.ascent, height - font.ascent),
                        VerticalAlign::TextBottom => (height - font.descent, font.descent),
                        align @ (VerticalAlign::Top | VerticalAlign::Bottom) => {
                            edge_aligned.push((align, height));
                            continue;
                        }
                    };
                    above = above.max(a);
                    below = below.max(b);
                }
                _ => {}
            }
        }
        let mut height = if phantom { 0.0 } else { above + below };
        // Top-aligned boxes hang from the line top and extend the line
        // downwards; bottom-aligned ones push the baseline down.
        for (align, box_height) in edge_aligned {
            if box_height > height {
                if align == VerticalAlign::Bottom {
                    above += box_height - height;
                }
                height = box_height;
            }
        }
        let baseline = line_top + above;
        let line_bottom = line_top + height;

        // STEP 3: Horizontal alignment.
        // [§ 7.1 'text-align'](https://www.w3.org/TR/css-text-3/#text-align-property)
        let indent = self.indent(ctx);
        let content_width: f32 = plan.entries.iter().map(Entry::width).sum();
        let free = (band.width - indent - content_width).max(0.0);
        let rtl = container.direction == Direction::Rtl;
        // [§ 13.1 Leaders](https://www.w3.org/TR/css-content-3/#leaders):
        // leaders share the free space and the line fills its band.
        let leaders = plan.entries.iter().filter(|e| matches!(e, Entry::Leader(_))).count();
        let leader_share = if leaders > 0 { free / leaders as f32 } else { 0.0 };
        let justify = leaders == 0 && container.text_align == TextAlign::Justify && plan.end == LineEnd::Soft;
        let shift = match (container.text_align, rtl) {
            _ if leaders > 0 => 0.0,
            (TextAlign::Left, _) | (TextAlign::Start | TextAlign::Justify, false) | (TextAlign::End, true) => 0.0,
            (TextAlign::Right, _) | (TextAlign::Start | TextAlign::Justify, true) | (TextAlign::End, false) => free,
            (TextAlign::Center, _) => free / 2.0,
        };
        let word_spacing = if justify {
            let gaps: usize = plan
                .entries
                .iter()
                .map(|e| match e {
                    Entry::Text { text, .. } => text.matches(' ').count(),
                    _ => 0,
                })
                .sum();
            if gaps > 0 { free / gaps as f32 } else { 0.0 }
        } else {
            0.0
        };
        let mut x = band.left + shift + if rtl { 0.0 } else { indent };

        // STEP 4: The fragment tree.
        let mut stack: Vec<Frame> = vec![Frame::root()];
        for &id in &self.open {
            stack.push(Frame {
                id: Some(id),
                children: Vec::new(),
                start_x: x,
                continuation: true,
            });
        }
        let at_start = self.page_is_empty;
        for entry in std::mem::take(&mut plan.entries) {
            match entry {
                Entry::Open { item, width } => {
                    let id = self.items[item].box_id;
                    crate::generated::record_box_start(ctx, id, at_start);
                    stack.push(Frame {
                        id: Some(id),
                        children: Vec::new(),
                        start_x: x,
                        continuation: false,
                    });
                    x += width;
                }
                Entry::Close { width, .. } => {
                    x += width;
                    if stack.len() > 1
                        && let Some(frame) = stack.pop()
                    {
                        let fragment = self.close_frame(ctx, frame, x, baseline, false);
                        if let Some(parent) = stack.last_mut() {
                            parent.children.push(fragment);
                        }
                    }
                }
                Entry::Text { item, text, width } => {
                    let id = self.items[item].box_id;
                    let strut = ctx.strut(ctx.style(id));
                    let spacing = if ctx.style(id).white_space.collapses_spaces() {
                        word_spacing
                    } else {
                        0.0
                    };
                    let width = width + spacing * text.matches(' ').count() as f32;
                    let mut fragment = Fragment::new(
                        Some(id),
                        FragmentKind::Text {
                            text,
                            word_spacing: spacing,
                        },
                        BoxDimensions {
                            content: Rect::new(x, baseline - strut.ascent, width, strut.ascent + strut.descent),
                            ..BoxDimensions::default()
                        },
                    );
                    fragment.baseline = Some(baseline);
                    push_child(&mut stack, fragment);
                    x += width;
                }
                Entry::Call { item, width } => {
                    let id = self.items[item].box_id;
                    let ItemKind::Call { footnote, label } = &self.items[item].kind else {
                        continue;
                    };
                    let strut = ctx.strut(ctx.style(id));
                    let dims = BoxDimensions {
                        content: Rect::new(x, baseline - strut.ascent, width, strut.ascent + strut.descent),
                        ..BoxDimensions::default()
                    };
                    let mut text = Fragment::new(
                        Some(id),
                        FragmentKind::Text {
                            text: label.clone(),
                            word_spacing: 0.0,
                        },
                        dims,
                    );
                    text.baseline = Some(baseline);
                    let mut call = Fragment::new(Some(id), FragmentKind::FootnoteCall { footnote: *footnote }, dims);
                    call.baseline = Some(baseline);
                    call.children.push(text);
                    push_child(&mut stack, call);
                    x += width;
                }
                Entry::Atomic { item, mut fragment } => {
                    let style = ctx.style(self.items[item].box_id);
                    let margin_box = fragment.margin_box();
                    let top = match style.vertical_align {
                        VerticalAlign::Baseline => baseline - atomic_baseline(style, &fragment),
                        VerticalAlign::Middle => {
                            baseline - container.font_size.0 * 0.25 - margin_box.height / 2.0
                        }
                        VerticalAlign::TextTop => baseline - self.strut.ascent,
                        VerticalAlign::TextBottom => baseline + self.strut.descent - margin_box.height,
                        VerticalAlign::Top => line_top,
                        VerticalAlign::Bottom => line_bottom - margin_box.height,
                    };
                    fragment.translate(x - margin_box.x, top - margin_box.y);
                    x += margin_box.width;
                    push_child(&mut stack, *fragment);
                }
                Entry::Leader(item) => {
                    if let ItemKind::Leader(pattern) = &self.items[item].kind
                        && let Some(fragment) =
                            leader_fragment(ctx, self.items[item].box_id, pattern, (x, leader_share), band, baseline)
                    {
                        push_child(&mut stack, fragment);
                    }
                    x += leader_share;
                }
                Entry::Positioned(item) => {
                    let id = self.items[item].box_id;
                    let pending = PendingAbsolute {
                        box_id: id,
                        static_x: x,
                        static_y: line_top,
                    };
                    ctx.defer_positioned(pending, ctx.style(id).position == Position::Fixed);
                }
                Entry::Running(item) => {
                    if let ItemKind::Running(name) = &self.items[item].kind {
                        ctx.log_event(PageEvent::Running {
                            name: name.clone(),
                            box_id: self.items[item].box_id,
                            at_start,
                        });
                    }
                }
                Entry::LineBreak => {}
            }
        }
        // Boxes still open continue on the next line.
        while stack.len() > 1 {
            let Some(frame) = stack.pop() else { break };
            let fragment = self.close_frame(ctx, frame, x, baseline, true);
            push_child(&mut stack, fragment);
        }
        let mut children = stack.pop().map(|f| f.children).unwrap_or_default();

        // STEP 5: Open boxes at the new cursor.
        for entry_item in self.cursor.item..plan.cursor.item.min(self.items.len()) {
            match self.items[entry_item].kind {
                ItemKind::Open => self.open.push(self.items[entry_item].box_id),
                ItemKind::Close => {
                    let _ = self.open.pop();
                }
                _ => {}
            }
        }
        self.cursor = plan.cursor;

        // STEP 6: Floats that did not fit beside this line go below it.
        children.append(&mut plan.floats);
        for id in plan.floats_after {
            children.push(layout_float(ctx, id, &self.cb, line_bottom));
        }

        let mut fragment = Fragment::new(
            None,
            FragmentKind::Line,
            BoxDimensions {
                content: Rect::new(band.left, line_top, band.width, height),
                ..BoxDimensions::default()
            },
        );
        fragment.children = children;
        if !phantom {
            fragment.baseline = Some(baseline);
            self.first_line = false;
            self.page_is_empty = false;
        }
        fragment.resume_at = (!self.at_end()).then(|| {
            ResumePoint::nested(self.cursor.item, ResumePoint::at(self.cursor.offset))
        });
        self.y = line_bottom;
        #[cfg(feature = "layout-trace")]
        log::trace!(
            target: "quire::inline",
            "line at {line_top} height {height}: {:?}",
            fragment.text()
        );
        LineBox { fragment, phantom }
    }

    fn close_frame(&self, ctx: &mut LayoutContext<'_>, frame: Frame, x: f32, baseline: f32, broken: bool) -> Fragment {
        let Some(id) = frame.id else {
            return Fragment::new(None, FragmentKind::Inline, BoxDimensions::default());
        };
        let style = ctx.style(id);
        let strut = ctx.strut(style);
        let padding = style.padding(self.cb.width);
        let border = style.border();
        let margin = style.margin_or_zero(self.cb.width);
        let mut dims = BoxDimensions {
            content: Rect::default(),
            padding,
            border,
            margin: EdgeSizes {
                top: 0.0,
                bottom: 0.0,
                ..margin
            },
        };
        // [§ 5.4](https://www.w3.org/TR/css-break-3/#break-decoration):
        // sliced inline boxes lose their edges at the line break.
        if frame.continuation {
            dims.padding.left = 0.0;
            dims.border.left = 0.0;
            dims.margin.left = 0.0;
        }
        if broken {
            dims.padding.right = 0.0;
            dims.border.right = 0.0;
            dims.margin.right = 0.0;
        }
        let left = frame.start_x + dims.leading_inline();
        let right = x - dims.trailing_inline();
        dims.content = Rect::new(left, baseline - strut.ascent, (right - left).max(0.0), strut.ascent + strut.descent);
        let mut fragment = Fragment::new(Some(id), FragmentKind::Inline, dims);
        fragment.children = frame.children;
        fragment.baseline = Some(baseline);
        fragment.is_continuation = frame.continuation;
        fragment.is_broken = broken;
        fragment
    }
}

struct Frame {
    id: Option<BoxId>,
    children: Vec<Fragment>,
    start_x: f32,
    continuation: bool,
}

impl Frame {
    const fn root() -> Self {
        Self {
            id: None,
            children: Vec::new(),
            start_x: 0.0,
            continuation: false,
        }
    }
}

fn push_child(stack: &mut [Frame], fragment: Fragment) {
    if let Some(frame) = stack.last_mut() {
        frame.children.push(fragment);
    }
}

impl Plan {
    fn advance_item(&mut self) {
        self.cursor = Cursor {
            item: self.cursor.item + 1,
            offset: 0,
        };
    }

    fn opportunity(&self) -> Opportunity {
        Opportunity {
            entries: self.entries.len(),
            cursor: self.cursor,
            effects: self.effects.len(),
        }
    }

    /// Drop everything after `op`, undoing the layout it caused.
    fn revert(&mut self, ctx: &mut LayoutContext<'_>, op: &Opportunity) {
        if let Some(checkpoint) = self.effects.get(op.effects) {
            ctx.rollback(checkpoint);
        }
        self.effects.truncate(op.effects);
        self.entries.truncate(op.entries);
        self.cursor = op.cursor;
        self.x = self.entries.iter().map(Entry::width).sum();
        self.has_content = self.entries.iter().any(|e| {
            matches!(
                e,
                Entry::Text { .. }
                    | Entry::Atomic { .. }
                    | Entry::Call { .. }
                    | Entry::Leader(_)
                    | Entry::LineBreak
            )
        });
        self.end = LineEnd::Soft;
    }
}

fn grow(above: &mut f32, below: &mut f32, strut: Strut) {
    *above = above.max(strut.baseline);
    *below = below.max(strut.height - strut.baseline);
}

/// Join consecutive text entries of the same box into one.
fn coalesce(entries: Vec<Entry>) -> Vec<Entry> {
    let mut out: Vec<Entry> = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Entry::Text { item, text, width } = &entry
            && let Some(Entry::Text {
                item: last_item,
                text: last_text,
                width: last_width,
            }) = out.last_mut()
            && last_item == item
        {
            last_text.push_str(text);
            *last_width += width;
            continue;
        }
        out.push(entry);
    }
    out
}

/// Copies of a leader `pattern` filling `share` px from `x`. Copies sit
/// on a grid anchored at the end of the line, so the leaders of
/// consecutive lines line up; a copy that would cross either end of the
/// share is dropped.
fn leader_fragment(
    ctx: &mut LayoutContext<'_>,
    id: BoxId,
    pattern: &str,
    (x, share): (f32, f32),
    band: Band,
    baseline: f32,
) -> Option<Fragment> {
    let style = ctx.style(id);
    let width = ctx.text_width(style, pattern);
    if width <= 0.0 || share < width - FIT_EPSILON {
        return None;
    }
    let line_end = band.left + band.width;
    let last = ((line_end - x) / width + FIT_EPSILON).floor();
    let first = ((line_end - x - share) / width - FIT_EPSILON).ceil().max(0.0) + 1.0;
    if last < first {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let copies = (last - first + 1.0) as usize;
    let strut = ctx.strut(style);
    let mut fragment = Fragment::new(
        Some(id),
        FragmentKind::Text {
            text: pattern.repeat(copies),
            word_spacing: 0.0,
        },
        BoxDimensions {
            content: Rect::new(
                line_end - last * width,
                baseline - strut.ascent,
                (last - first + 1.0) * width,
                strut.ascent + strut.descent,
            ),
            ..BoxDimensions::default()
        },
    );
    fragment.baseline = Some(baseline);
    Some(fragment)
}

/// Margin, border and padding at the start of an inline box.
fn leading_edge(style: &ComputedStyle, cb_width: f32) -> f32 {
    style.margin_left.resolve(cb_width).unwrap_or(0.0)
        + style.border().left
        + style.padding(cb_width).left
}

/// Margin, border and padding at the end of an inline box.
fn trailing_edge(style: &ComputedStyle, cb_width: f32) -> f32 {
    style.margin_right.resolve(cb_width).unwrap_or(0.0)
        + style.border().right
        + style.padding(cb_width).right
}

/// [§ 10.8.1](https://www.w3.org/TR/CSS2/visudet.html#leading)
///
/// "The baseline of an 'inline-block' is the baseline of its last line box
/// in the normal flow, unless it has either no in-flow line boxes or if its
/// 'overflow' property has a computed value other than 'visible', in which
/// case the baseline is the bottom margin edge."
///
/// Offset from the top of the margin box.
fn atomic_baseline(style: &ComputedStyle, fragment: &Fragment) -> f32 {
    let margin_box = fragment.margin_box();
    if style.overflow != Overflow::Visible {
        return margin_box.height;
    }
    let mut last = None;
    fragment.walk(&mut |f| {
        if f.kind == FragmentKind::Line
            && let Some(b) = f.baseline
        {
            last = Some(b);
        }
    });
    last.map_or(margin_box.height, |b| b - margin_box.y)
}

/// [§ 4.1.3](https://www.w3.org/TR/css-text-3/#white-space-phase-2)
///
/// "A sequence of collapsible spaces at the end of a line is removed."
fn trim_trailing_spaces(tree: &BoxTree, items: &[Item], entries: &mut [Entry], ctx: &mut LayoutContext<'_>) {
    for entry in entries.iter_mut().rev() {
        match entry {
            Entry::Close { .. } | Entry::Positioned(_) | Entry::Running(_) | Entry::LineBreak => {}
            Entry::Text { item, text, width } => {
                let style = tree.style(items[*item].box_id);
                if style.white_space.collapses_spaces() && text.ends_with(' ') {
                    text.truncate(text.trim_end_matches(' ').len());
                    *width = ctx.text_width(style, text);
                }
                return;
            }
            _ => return,
        }
    }
}

/// [§ 5.4 Hyphenation](https://www.w3.org/TR/css-text-3/#hyphenation)
///
/// The longest start of `word` that fits `room` with a hyphen added:
/// the text to show and the bytes of `word` it consumes. Soft hyphens are
/// the only break points under `hyphens: manual`; `hyphens: auto` asks the
/// text service when the word has none.
fn hyphenation_cut(ctx: &mut LayoutContext<'_>, style: &ComputedStyle, word: &str, room: f32) -> Option<(String, usize)> {
    if style.hyphens == Hyphens::None || room <= 0.0 {
        return None;
    }
    let mut cuts: Vec<(usize, usize)> = word
        .char_indices()
        .filter(|(_, c)| *c == SOFT_HYPHEN)
        .map(|(i, c)| (i, i + c.len_utf8()))
        .collect();
    if cuts.is_empty() && style.hyphens == Hyphens::Auto {
        let lang = style.lang.as_deref().unwrap_or("en");
        cuts = ctx.hyphenate(lang, word).iter().map(|&p| (p, p)).collect();
    }
    for (end, consumed) in cuts.into_iter().rev() {
        let mut shown = visible(&word[..end]);
        if shown.is_empty() {
            continue;
        }
        shown.push('-');
        if ctx.text_width(style, &shown) <= room + FIT_EPSILON {
            return Some((shown, consumed));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::resources::StaticImageResolver;
    use crate::text::ApproximateFontMetrics;
    use crate::tree::BoxNode;

    fn texts(pieces: &[Piece]) -> Vec<&str> {
        pieces
            .iter()
            .map(|p| match p {
                Piece::Text(t) => t.as_str(),
                Piece::Newline => "\n",
            })
            .collect()
    }

    #[test]
    fn spaces_collapse_across_boxes() {
        let mut prev = true;
        let first = normalize("  hello \n  world ", WhiteSpace::Normal, &mut prev);
        let second = normalize("  again", WhiteSpace::Normal, &mut prev);
        assert_eq!(texts(&first), vec!["hello world "]);
        assert_eq!(texts(&second), vec!["again"]);
    }

    #[test]
    fn pre_line_keeps_newlines_but_collapses_spaces() {
        let mut prev = true;
        let pieces = normalize("a   b \n  c", WhiteSpace::PreLine, &mut prev);
        assert_eq!(texts(&pieces), vec!["a b", "\n", "c"]);
    }

    #[test]
    fn pre_keeps_everything() {
        let mut prev = true;
        let pieces = normalize("  a\n b", WhiteSpace::Pre, &mut prev);
        assert_eq!(texts(&pieces), vec!["  a", "\n", " b"]);
    }

    fn lines(style: serde_json::Value, text: &str, width: f32, metrics: &ApproximateFontMetrics) -> Vec<LineBox> {
        let node: BoxNode = serde_json::from_value(serde_json::json!({
            "style": style,
            "children": [{ "text": text }]
        }))
        .unwrap();
        let tree = BoxTree::from_node(&node);
        let config = LayoutConfig::default();
        let images = StaticImageResolver::new();
        let mut ctx = LayoutContext::new(&tree, &config, metrics, &images);
        let root = tree.root().unwrap();
        let cb = ContainingBlock {
            x: 0.0,
            y: 0.0,
            width,
            height: None,
            direction: Direction::Ltr,
        };
        let mut breaker = LineBreaker::new(
            &mut ctx,
            RunInput {
                container: root,
                children: tree.children(root),
                cb,
                y: 0.0,
                skip: None,
                first_line: true,
                page_is_empty: true,
            },
        );
        let mut out = Vec::new();
        while let Some(line) = breaker.next_line(&mut ctx) {
            out.push(line);
        }
        out
    }

    #[test]
    fn greedy_breaking_at_spaces() {
        // 6px per character at 10px.
        let metrics = ApproximateFontMetrics::new();
        let out = lines(serde_json::json!({ "font-size": "10px" }), "aaa bbb ccc", 50.0, &metrics);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].fragment.text(), "aaa bbb");
        assert_eq!(out[1].fragment.text(), "ccc");
        assert!(out[0].fragment.resume_at.is_some());
        assert!(out[1].fragment.resume_at.is_none());
        assert_eq!(out[1].fragment.dimensions.content.y, 12.0);
    }

    #[test]
    fn leaders_fill_the_line_in_whole_copies() {
        let metrics = ApproximateFontMetrics::new();
        let node: BoxNode = serde_json::from_value(serde_json::json!({
            "style": { "font-size": "10px", "content": "\"A\" leader(dotted) \"9\"" }
        }))
        .unwrap();
        let tree = BoxTree::from_node(&node);
        let config = LayoutConfig::default();
        let images = StaticImageResolver::new();
        let mut ctx = LayoutContext::new(&tree, &config, &metrics, &images);
        let root = tree.root().unwrap();
        let cb = ContainingBlock {
            x: 0.0,
            y: 0.0,
            width: 60.0,
            height: None,
            direction: Direction::Ltr,
        };
        let mut breaker = LineBreaker::new(
            &mut ctx,
            RunInput {
                container: root,
                children: tree.children(root),
                cb,
                y: 0.0,
                skip: None,
                first_line: true,
                page_is_empty: true,
            },
        );
        let line = breaker.next_line(&mut ctx).expect("one line");
        assert!(breaker.next_line(&mut ctx).is_none());
        assert_eq!(line.fragment.text(), "A........9");
        let mut pieces = Vec::new();
        line.fragment.walk(&mut |f| {
            if let FragmentKind::Text { text, .. } = &f.kind {
                pieces.push((text.clone(), f.dimensions.content.x));
            }
        });
        assert_eq!(pieces[1], ("........".to_owned(), 6.0));
        assert_eq!(pieces[2], ("9".to_owned(), 54.0));
    }

    #[test]
    fn justified_lines_spread_word_gaps_except_the_last() {
        let metrics = ApproximateFontMetrics::new();
        let style = serde_json::json!({ "font-size": "10px", "text-align": "justify" });
        let out = lines(style, "aaa bbb ccc", 50.0, &metrics);
        let spacing = |line: &LineBox| {
            let mut found = None;
            line.fragment.walk(&mut |f| {
                if let FragmentKind::Text { word_spacing, .. } = f.kind {
                    found = Some(word_spacing);
                }
            });
            found
        };
        assert_eq!(spacing(&out[0]), Some(8.0));
        assert_eq!(spacing(&out[1]), Some(0.0));
    }

    #[test]
    fn hyphenation_points_split_long_words() {
        let metrics = ApproximateFontMetrics::new().with_hyphenation("pagination", &[4]);
        let style = serde_json::json!({ "font-size": "10px", "hyphens": "auto" });
        let out = lines(style, "pagination", 40.0, &metrics);
        assert_eq!(out[0].fragment.text(), "pagi-");
        assert_eq!(out[1].fragment.text(), "nation");
    }
}
