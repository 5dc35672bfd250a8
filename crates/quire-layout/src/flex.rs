//! Flex layout.
//!
//! [§ 9 Flex Layout Algorithm](https://www.w3.org/TR/css-flexbox-1/#layout-algorithm)
//!
//! Items are laid out in one piece. The container collects them into flex
//! lines, resolves flexible lengths line by line, sizes the lines in the
//! cross axis and aligns items on both axes. Row containers that wrap
//! break between their lines; other flex containers move to the next
//! page as a whole when they do not fit.

use crate::block::{
    BlockInput, LayoutOutcome, avoid_floats, clamp_height, content_size, declared_height,
    finish_positioned, fit_outer_width, horizontal_box, layout_unbreakable, resolve_top,
    truncates_top_margin,
};
use crate::context::{Checkpoint, LayoutContext, PendingAbsolute};
use crate::fragment::{Fragment, FragmentKind, ResumePoint};
use crate::geometry::{ContainingBlock, Direction};
use crate::strings::PageEvent;
use crate::style::{
    BoxDecorationBreak, BreakInside, ComputedStyle, ContentAlign, FlexBasis, FlexWrap, Position,
    SelfAlign,
};
use crate::tree::{BoxId, BoxKind, BoxTree};

/// Whether `id` is an in-flow item of a row flex container.
pub(crate) fn is_row_item(tree: &BoxTree, id: BoxId) -> bool {
    !tree.style(id).position.is_absolutely_positioned()
        && tree.parent(id).is_some_and(|parent| {
            matches!(tree.kind(parent), BoxKind::Flex | BoxKind::InlineFlex)
                && tree.style(parent).flex_direction.is_row()
        })
}

/// Per-item data collected during flex layout.
///
/// [§ 9.2 Line Length Determination](https://www.w3.org/TR/css-flexbox-1/#algo-main-item)
#[derive(Debug, Clone)]
struct FlexItem {
    id: BoxId,
    /// [§ 9.2 step 3](https://www.w3.org/TR/css-flexbox-1/#algo-main-item)
    /// The flex base size.
    base_size: f32,
    /// The flex base size clamped by the min and max main sizes.
    hypothetical_size: f32,
    min_size: f32,
    max_size: f32,
    grow: f32,
    shrink: f32,
    /// The resolved main size after § 9.7.
    target_size: f32,
    frozen: bool,
    /// Margins, borders and paddings on the main axis.
    outer_main: f32,
}

impl FlexItem {
    fn outer_hypothetical(&self) -> f32 {
        self.hypothetical_size + self.outer_main
    }

    fn outer_target(&self) -> f32 {
        self.target_size + self.outer_main
    }

    fn clamp(&self, size: f32) -> f32 {
        size.min(self.max_size).max(self.min_size).max(0.0)
    }
}

/// Children of a flex container split into flex items, in `order`, and
/// the boxes that leave the flow.
///
/// [§ 4.1 Absolutely-Positioned Flex Children](https://www.w3.org/TR/css-flexbox-1/#abspos-items):
/// "An absolutely-positioned child of a flex container does not
/// participate in flex layout."
fn flex_items(ctx: &LayoutContext<'_>, id: BoxId) -> (Vec<BoxId>, Vec<BoxId>) {
    let (mut items, out_of_flow): (Vec<BoxId>, Vec<BoxId>) =
        ctx.tree.children(id).iter().copied().partition(|&child| {
            let position = &ctx.style(child).position;
            !position.is_absolutely_positioned() && !matches!(position, Position::Running(_))
        });
    // [§ 5.4.1](https://www.w3.org/TR/css-flexbox-1/#order-property): a
    // stable sort, ties keep document order.
    items.sort_by_key(|&item| ctx.style(item).order);
    (items, out_of_flow)
}

/// Containing block an item of a column container is laid out in: the
/// whole cross size when it stretches, its fit-content width otherwise.
fn column_item_cb(ctx: &mut LayoutContext<'_>, item: BoxId, container: &ComputedStyle, cb: &ContainingBlock) -> ContainingBlock {
    let style = ctx.style(item);
    let align = style.align_self.or(container.align_items.or(SelfAlign::Stretch));
    let stretches = align == SelfAlign::Stretch && container.flex_wrap == FlexWrap::Nowrap;
    if stretches && style.width.is_auto() && !matches!(ctx.tree.kind(item), BoxKind::Replaced(_)) {
        return *cb;
    }
    ContainingBlock {
        width: fit_outer_width(ctx, item, cb).min(cb.width),
        ..*cb
    }
}

/// [§ 9.2 step 3](https://www.w3.org/TR/css-flexbox-1/#algo-main-item)
///
/// Base size, min and max main sizes of `item` in a container with
/// content box `cb`.
fn collect_item(ctx: &mut LayoutContext<'_>, item: BoxId, container: &ComputedStyle, cb: &ContainingBlock) -> FlexItem {
    let style = ctx.style(item);
    let padding = style.padding(cb.width);
    let border = style.border();
    let margin = style.margin_or_zero(cb.width);
    let row = container.flex_direction.is_row();

    let (outer_main, base_size, min_size, max_size) = if row {
        let (pad, bord) = (padding.horizontal(), border.horizontal());
        let to_content = |declared: f32| content_size(style, declared, pad, bord);
        // "If the used flex basis is content or depends on its available
        // space, ... the flex base size is the item's resulting main size."
        let basis = match style.flex_basis {
            FlexBasis::Length(basis) => Some(to_content(basis.resolve(cb.width))),
            FlexBasis::Content => None,
            FlexBasis::Auto => style.width.resolve(cb.width).map(to_content),
        };
        let base = match basis {
            Some(base) => base,
            None => (crate::preferred::max_content_width(ctx, item) - crate::preferred::horizontal_mbp(style)).max(0.0),
        };
        let min = to_content(style.min_width.resolve(cb.width));
        let max = style
            .max_width
            .0
            .map_or(f32::INFINITY, |m| to_content(m.resolve(cb.width)));
        (margin.horizontal() + pad + bord, base, min, max)
    } else {
        let (pad, bord) = (padding.vertical(), border.vertical());
        let to_content = |declared: f32| content_size(style, declared, pad, bord);
        let basis = match style.flex_basis {
            FlexBasis::Length(basis) => basis.resolve_definite(cb.height).map(to_content),
            FlexBasis::Content => None,
            FlexBasis::Auto => style.height.resolve_definite(cb.height).map(to_content),
        };
        let base = match basis {
            Some(base) => base,
            None => {
                let checkpoint = ctx.checkpoint();
                let item_cb = column_item_cb(ctx, item, container, cb);
                let height = layout_unbreakable(ctx, item, &item_cb, 0.0).dimensions.content.height;
                ctx.rollback(&checkpoint);
                height
            }
        };
        let min = style.min_height.resolve_definite(cb.height).map_or(0.0, to_content);
        let max = style
            .max_height
            .0
            .and_then(|m| m.resolve_definite(cb.height))
            .map_or(f32::INFINITY, to_content);
        (margin.vertical() + pad + bord, base, min, max)
    };

    let mut flex_item = FlexItem {
        id: item,
        base_size,
        hypothetical_size: 0.0,
        min_size,
        max_size,
        grow: style.flex_grow.max(0.0),
        shrink: style.flex_shrink.max(0.0),
        target_size: 0.0,
        frozen: false,
        outer_main,
    };
    // [§ 9.2 step 3E](https://www.w3.org/TR/css-flexbox-1/#algo-main-item)
    //
    // "The hypothetical main size is the item's flex base size clamped
    // according to its used min and max main sizes."
    flex_item.hypothetical_size = flex_item.clamp(base_size);
    flex_item
}

/// [§ 9.3 step 5](https://www.w3.org/TR/css-flexbox-1/#algo-line-break)
///
/// Collect items into lines. "If the flex container is single-line,
/// collect all the flex items into a single flex line."
fn collect_lines(items: &[FlexItem], wrap: FlexWrap, available: f32, gap: f32) -> Vec<std::ops::Range<usize>> {
    if wrap == FlexWrap::Nowrap || items.is_empty() {
        return vec![0..items.len()];
    }
    let mut lines = Vec::new();
    let mut start = 0;
    let mut used = 0.0;
    for (i, item) in items.iter().enumerate() {
        let size = item.outer_hypothetical();
        if i > start && used + gap + size > available {
            lines.push(start..i);
            start = i;
            used = size;
        } else if i == start {
            used = size;
        } else {
            used += gap + size;
        }
    }
    lines.push(start..items.len());
    lines
}

/// [§ 9.7 Resolving Flexible Lengths](https://www.w3.org/TR/css-flexbox-1/#resolve-flexible-lengths)
///
/// The iterative freeze loop, with min and max violations.
fn resolve_flexible_lengths(items: &mut [FlexItem], available_main: f32) {
    if items.is_empty() {
        return;
    }
    if !available_main.is_finite() {
        for item in items.iter_mut() {
            item.target_size = item.hypothetical_size;
        }
        return;
    }

    // STEP 1: "Determine the used flex factor."
    let sum_outer_hypo: f32 = items.iter().map(FlexItem::outer_hypothetical).sum();
    let growing = sum_outer_hypo < available_main;

    // STEP 2: "Size inflexible items."
    for item in items.iter_mut() {
        let factor = if growing { item.grow } else { item.shrink };
        item.frozen = false;
        item.target_size = item.base_size;
        if factor <= 0.0
            || (growing && item.base_size > item.hypothetical_size)
            || (!growing && item.base_size < item.hypothetical_size)
        {
            item.frozen = true;
            item.target_size = item.hypothetical_size;
        }
    }

    // STEP 3: "Calculate initial free space."
    let free_space = |items: &[FlexItem]| {
        available_main
            - items
                .iter()
                .map(|item| {
                    if item.frozen {
                        item.outer_target()
                    } else {
                        item.base_size + item.outer_main
                    }
                })
                .sum::<f32>()
    };
    let initial_free_space = free_space(items);

    // STEP 4: Loop until all items are frozen.
    while !items.iter().all(|item| item.frozen) {
        let remaining_free = free_space(items);

        // "If the sum of the unfrozen flex items' flex factors is less than
        // one, multiply the initial free space by this sum. If the
        // magnitude of this value is less than the magnitude of the
        // remaining free space, use this as the remaining free space."
        let factor_sum: f32 = items
            .iter()
            .filter(|item| !item.frozen)
            .map(|item| if growing { item.grow } else { item.shrink })
            .sum();
        let free = if factor_sum < 1.0 && (initial_free_space * factor_sum).abs() < remaining_free.abs() {
            initial_free_space * factor_sum
        } else {
            remaining_free
        };

        // Distribute free space proportional to the flex factors.
        if growing {
            if factor_sum > 0.0 {
                for item in items.iter_mut().filter(|item| !item.frozen) {
                    item.target_size = item.base_size + free * (item.grow / factor_sum);
                }
            }
        } else {
            // "For every unfrozen item on the line, multiply its flex
            // shrink factor by its inner flex base size, and note this as
            // its scaled flex shrink factor."
            let scaled_sum: f32 = items
                .iter()
                .filter(|item| !item.frozen)
                .map(|item| item.shrink * item.base_size)
                .sum();
            if scaled_sum > 0.0 {
                for item in items.iter_mut().filter(|item| !item.frozen) {
                    let ratio = item.shrink * item.base_size / scaled_sum;
                    item.target_size = free.abs().mul_add(-ratio, item.base_size);
                }
            }
        }

        // "Fix min/max violations."
        let mut total_violation = 0.0_f32;
        let mut violations = vec![0.0_f32; items.len()];
        for (item, violation) in items.iter_mut().zip(violations.iter_mut()) {
            if item.frozen {
                continue;
            }
            let clamped = item.clamp(item.target_size);
            *violation = clamped - item.target_size;
            total_violation += *violation;
            item.target_size = clamped;
        }

        // "Freeze over-flexed items. ... Zero: freeze all items. Positive:
        // freeze all the items with min violations. Negative: freeze all
        // the items with max violations."
        for (item, violation) in items.iter_mut().zip(violations) {
            if item.frozen {
                continue;
            }
            item.frozen = if total_violation.abs() < 0.01 {
                true
            } else if total_violation > 0.0 {
                violation > 0.0
            } else {
                violation < 0.0
            };
        }
    }
}

/// `(min-content, max-content)` widths of a flex container's content box.
pub(crate) fn preferred_widths(ctx: &mut LayoutContext<'_>, id: BoxId) -> (f32, f32) {
    let style = ctx.style(id);
    let (items, _) = flex_items(ctx, id);
    let gap = style.column_gap.resolve(0.0);
    let mut min: f32 = 0.0;
    let mut max: f32 = 0.0;
    let mut sum_min = 0.0;
    let mut sum_max = 0.0;
    for (i, &item) in items.iter().enumerate() {
        let (item_min, item_max) = crate::preferred::preferred_widths(ctx, item);
        let between = if i == 0 { 0.0 } else { gap };
        min = min.max(item_min);
        max = max.max(item_max);
        sum_min += between + item_min;
        sum_max += between + item_max;
    }
    if !style.flex_direction.is_row() {
        return (min, max.max(min));
    }
    let min = if style.flex_wrap == FlexWrap::Nowrap { sum_min } else { min };
    (min, sum_max.max(min))
}

/// One flex line on this page.
struct FlexLine {
    items: Vec<FlexItem>,
    /// Laid out items with their outer cross sizes, in line order.
    fragments: Vec<Fragment>,
    cross: f32,
    /// State before the line was laid out.
    checkpoint: Checkpoint,
}

/// Lay out a flex container.
#[allow(clippy::too_many_lines)]
pub(crate) fn flex_layout(
    ctx: &mut LayoutContext<'_>,
    id: BoxId,
    cb: &ContainingBlock,
    input: &BlockInput<'_>,
) -> LayoutOutcome {
    let tree = ctx.tree;
    let style = tree.style(id);
    let is_continuation = input.skip.is_some();
    let clone = style.box_decoration_break == BoxDecorationBreak::Clone;
    let row = style.flex_direction.is_row();
    let breakable = row && style.flex_wrap == FlexWrap::Wrap;

    // STEP 1: The container box. It never collapses margins with its items.
    let margin = style.margin_or_zero(cb.width);
    let mut margin_top = margin.top;
    if (is_continuation && !clone) || truncates_top_margin(ctx, input) {
        margin_top = 0.0;
    }
    let top = resolve_top(ctx, style.clear, input, margin_top);
    let (border_top, cb) = avoid_floats(ctx, id, cb, top.border_top);
    let mut dims = horizontal_box(tree, id, &cb, None);
    if is_continuation && !clone {
        dims.border.top = 0.0;
        dims.padding.top = 0.0;
    }
    let content_x = dims.content.x;
    let content_y = border_top + dims.border.top + dims.padding.top;
    let width = dims.content.width;
    let declared = declared_height(style, cb.height, &dims);
    let positioned = style.is_positioned();
    if positioned {
        ctx.push_absolute_scope();
    }
    if !is_continuation {
        crate::generated::record_box_start(ctx, id, input.page_is_empty);
    }

    let (items, out_of_flow) = flex_items(ctx, id);
    if !is_continuation {
        for child in out_of_flow {
            match &ctx.style(child).position {
                Position::Running(name) => ctx.log_event(PageEvent::Running {
                    name: name.clone(),
                    box_id: child,
                    at_start: input.page_is_empty,
                }),
                position => {
                    let pending = PendingAbsolute {
                        box_id: child,
                        static_x: content_x,
                        static_y: content_y,
                    };
                    ctx.defer_positioned(pending, *position == Position::Fixed);
                }
            }
        }
    }

    // STEP 2: Main sizes and lines.
    let items_cb = ContainingBlock {
        x: content_x,
        y: content_y,
        width,
        height: declared,
        direction: style.direction,
    };
    let available_main = if row {
        width
    } else {
        declared.map_or(f32::INFINITY, |h| clamp_height(style, cb.height, &dims, h))
    };
    let (main_gap, cross_gap) = if row {
        (style.column_gap.resolve(width), style.row_gap.resolve_definite(declared).unwrap_or(0.0))
    } else {
        (style.row_gap.resolve_definite(declared).unwrap_or(0.0), style.column_gap.resolve(width))
    };
    let collected: Vec<FlexItem> = items
        .iter()
        .map(|&item| collect_item(ctx, item, style, &items_cb))
        .collect();
    let ranges = collect_lines(&collected, style.flex_wrap, available_main, main_gap);

    // STEP 3: Flexible lengths and item layout, line by line from the
    // first line on this page.
    let first_line = input.skip.map_or(0, |rp| rp.index).min(ranges.len());
    let mut lines: Vec<FlexLine> = Vec::with_capacity(ranges.len() - first_line);
    for range in &ranges[first_line..] {
        let checkpoint = ctx.checkpoint();
        let mut line_items = collected[range.clone()].to_vec();
        #[allow(clippy::cast_precision_loss)]
        let gaps = main_gap * line_items.len().saturating_sub(1) as f32;
        resolve_flexible_lengths(&mut line_items, available_main - gaps);
        let mut fragments = Vec::with_capacity(line_items.len());
        for item in &line_items {
            let item_cb = if row {
                ContainingBlock {
                    x: 0.0,
                    y: 0.0,
                    width: item.outer_target(),
                    height: declared,
                    direction: style.direction,
                }
            } else {
                let origin = ContainingBlock {
                    x: 0.0,
                    y: 0.0,
                    ..items_cb
                };
                column_item_cb(ctx, item.id, style, &origin)
            };
            let mut fragment = layout_unbreakable(ctx, item.id, &item_cb, 0.0);
            if !row {
                fragment.dimensions.content.height = item.target_size;
            }
            fragments.push(fragment);
        }
        let cross = fragments
            .iter()
            .map(|f| cross_size(f, row))
            .fold(0.0, f32::max);
        lines.push(FlexLine {
            items: line_items,
            fragments,
            cross,
            checkpoint,
        });
    }

    // [§ 9.4 step 8](https://www.w3.org/TR/css-flexbox-1/#algo-cross-line):
    // "If the flex container is single-line and has a definite cross size,
    // the cross size of the flex line is the flex container's inner cross
    // size."
    let definite_cross = if row { declared } else { Some(width) };
    if style.flex_wrap == FlexWrap::Nowrap
        && let (Some(cross), [line]) = (definite_cross, lines.as_mut_slice())
    {
        line.cross = cross;
    }

    // STEP 4: Lines on this page.
    let bottom_space = input.bottom_space + dims.padding.bottom + dims.border.bottom;
    let mut end_line = lines.len();
    let mut resume_at = None;
    let mut y = content_y;
    for (i, line) in lines.iter().enumerate() {
        let bottom = if row {
            y + line.cross
        } else {
            content_y + line_main_extent(line, main_gap).max(declared.unwrap_or(0.0))
        };
        let forced = input.page_is_empty && (i == 0 || !breakable);
        if !forced && ctx.overflows_page(bottom_space, bottom) {
            if i == 0 || !breakable {
                log::trace!(target: "quire::flex", "{} moves to the next page", tree.describe(id));
                if positioned {
                    let _ = ctx.pop_absolute_scope();
                }
                ctx.rollback(&lines[0].checkpoint);
                return LayoutOutcome::default();
            }
            log::trace!(
                target: "quire::flex",
                "{} breaks before line {}",
                tree.describe(id),
                first_line + i
            );
            end_line = i;
            resume_at = Some(ResumePoint::at(first_line + i));
            break;
        }
        y = bottom + cross_gap;
    }
    let broken = resume_at.is_some();
    if broken && style.break_inside == BreakInside::Avoid && !input.page_is_empty {
        if positioned {
            let _ = ctx.pop_absolute_scope();
        }
        ctx.rollback(&lines[0].checkpoint);
        return LayoutOutcome::default();
    }
    if let Some(line) = lines.get(end_line) {
        let checkpoint = line.checkpoint.clone();
        ctx.rollback(&checkpoint);
    }
    lines.truncate(end_line);

    // STEP 5: Container size. The cross size of a row container and the
    // main size of a column container.
    #[allow(clippy::cast_precision_loss)]
    let lines_cross = lines.iter().map(|l| l.cross).sum::<f32>() + cross_gap * lines.len().saturating_sub(1) as f32;
    let content_height = if row {
        lines_cross
    } else {
        lines.iter().map(|l| line_main_extent(l, main_gap)).fold(0.0, f32::max)
    };
    let height = if broken || is_continuation {
        content_height
    } else {
        clamp_height(style, cb.height, &dims, declared.unwrap_or(content_height))
    };
    let container_cross = if row { height } else { width };
    let main_size = if row { width } else { height };

    // STEP 6: [§ 9.4 step 15](https://www.w3.org/TR/css-flexbox-1/#algo-line-align)
    // align-content. Lines stretch into free cross space by default.
    let free_cross = container_cross - lines_cross;
    let single_line = style.flex_wrap == FlexWrap::Nowrap;
    let (mut line_offset, line_spacing) = match style.align_content {
        ContentAlign::Normal | ContentAlign::Stretch if free_cross > 0.0 && !single_line && !lines.is_empty() => {
            #[allow(clippy::cast_precision_loss)]
            let share = free_cross / lines.len() as f32;
            for line in &mut lines {
                line.cross += share;
            }
            (0.0, 0.0)
        }
        _ if single_line => (0.0, 0.0),
        align => align.distribute(free_cross, lines.len()),
    };

    // STEP 7: Main-axis and cross-axis positions.
    let main_flip = if row {
        (style.direction == Direction::Rtl) != style.flex_direction.is_reverse()
    } else {
        style.flex_direction.is_reverse()
    };
    let cross_flip = if row {
        style.flex_wrap == FlexWrap::WrapReverse
    } else {
        (style.direction == Direction::Rtl) != (style.flex_wrap == FlexWrap::WrapReverse)
    };
    let mut children = Vec::new();
    for line in lines {
        let used: f32 = line.items.iter().map(FlexItem::outer_target).sum();
        #[allow(clippy::cast_precision_loss)]
        let gaps = main_gap * line.items.len().saturating_sub(1) as f32;
        let (lead, spacing) = style.justify_content.distribute(main_size - used - gaps, line.items.len());
        let mut main_pos = lead;
        for (item, mut fragment) in line.items.iter().zip(line.fragments) {
            let item_style = ctx.style(item.id);
            let outer_main = item.outer_target();

            // [§ 8.3 'align-self'](https://www.w3.org/TR/css-flexbox-1/#align-items-property)
            let free = line.cross - cross_size(&fragment, row);
            let align = item_style.align_self.or(style.align_items.or(SelfAlign::Stretch));
            let replaced = matches!(tree.kind(item.id), BoxKind::Replaced(_));
            let cross_in_line = match align {
                SelfAlign::Center => free / 2.0,
                SelfAlign::End => free,
                SelfAlign::Stretch if row && item_style.height.is_auto() && !replaced => {
                    fragment.dimensions.content.height += free.max(0.0);
                    0.0
                }
                SelfAlign::Auto | SelfAlign::Start | SelfAlign::Stretch => 0.0,
            };
            let item_cross = cross_size(&fragment, row);
            let cross_pos = line_offset + cross_in_line;

            let (x, y) = if row {
                let x = if main_flip {
                    content_x + main_size - main_pos - outer_main
                } else {
                    content_x + main_pos
                };
                let y = if cross_flip {
                    content_y + container_cross - cross_pos - item_cross
                } else {
                    content_y + cross_pos
                };
                (x, y)
            } else {
                let x = if cross_flip {
                    content_x + container_cross - cross_pos - item_cross
                } else {
                    content_x + cross_pos
                };
                let y = if main_flip {
                    content_y + main_size - main_pos - outer_main
                } else {
                    content_y + main_pos
                };
                (x, y)
            };
            let outer = fragment.margin_box();
            fragment.translate(x - outer.x, y - outer.y);
            let (dx, dy) = crate::positioned::relative_offset(item_style, &items_cb);
            fragment.translate(dx, dy);
            children.push(fragment);
            main_pos += outer_main + main_gap + spacing;
        }
        line_offset += line.cross + cross_gap + line_spacing;
    }

    // STEP 8: The container fragment.
    let mut margin_bottom = margin.bottom;
    if broken && !clone {
        dims.padding.bottom = 0.0;
        dims.border.bottom = 0.0;
        margin_bottom = 0.0;
    } else if broken && ctx.config.clone_decoration_margins {
        margin_bottom = 0.0;
    }
    dims.content.y = content_y;
    dims.content.height = height;
    dims.margin.top = margin_top;
    dims.margin.bottom = margin_bottom;

    let mut fragment = Fragment::new(Some(id), FragmentKind::Flex, dims);
    fragment.baseline = children.first().and_then(|c| c.baseline);
    fragment.children = children;
    fragment.clearance = top.clearance;
    fragment.is_continuation = is_continuation;
    fragment.is_broken = broken;
    finish_positioned(ctx, id, &mut fragment, positioned);
    log::trace!(
        target: "quire::flex",
        "{} laid out: {} items, lines {first_line}..{}",
        tree.describe(id),
        collected.len(),
        first_line + end_line
    );

    LayoutOutcome {
        fragment: Some(fragment),
        resume_at,
        next_page: None,
        adjoining_margins: if broken { Vec::new() } else { vec![margin_bottom] },
        collapsing_through: false,
    }
}

/// Outer cross size of a laid out item.
fn cross_size(fragment: &Fragment, row: bool) -> f32 {
    let outer = fragment.margin_box();
    if row { outer.height } else { outer.width }
}

/// Outer main size taken by a line of a column container.
fn line_main_extent(line: &FlexLine, gap: f32) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let gaps = gap * line.items.len().saturating_sub(1) as f32;
    line.items.iter().map(FlexItem::outer_target).sum::<f32>() + gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::resources::StaticImageResolver;
    use crate::text::ApproximateFontMetrics;
    use crate::tree::{BoxNode, BoxTree};

    fn lay(flex: serde_json::Value, page_bottom: f32, skip: Option<&ResumePoint>) -> LayoutOutcome {
        let node: BoxNode = serde_json::from_value(flex).unwrap();
        let tree = BoxTree::from_node(&node);
        let config = LayoutConfig::default();
        let metrics = ApproximateFontMetrics::new();
        let images = StaticImageResolver::new();
        let mut ctx = LayoutContext::new(&tree, &config, &metrics, &images);
        ctx.page_bottom = page_bottom;
        let id = tree.root().unwrap();
        let cb = ContainingBlock {
            x: 0.0,
            y: 0.0,
            width: 400.0,
            height: None,
            direction: Direction::Ltr,
        };
        ctx.push_bfc(id);
        let input = BlockInput {
            skip,
            ..BlockInput::unbreakable(0.0)
        };
        flex_layout(&mut ctx, id, &cb, &input)
    }

    fn item(style: serde_json::Value) -> serde_json::Value {
        serde_json::json!({ "style": style })
    }

    fn widths(fragment: &Fragment) -> Vec<f32> {
        fragment.children.iter().map(|c| c.border_box().width).collect()
    }

    fn xs(fragment: &Fragment) -> Vec<f32> {
        fragment.children.iter().map(|c| c.border_box().x).collect()
    }

    #[test]
    fn grow_shares_the_free_space_by_factor() {
        let outcome = lay(
            serde_json::json!({
                "style": { "display": "flex" },
                "children": [
                    item(serde_json::json!({ "width": "100px", "height": "10px", "flex-grow": "1" })),
                    item(serde_json::json!({ "width": "100px", "height": "10px", "flex-grow": "3" }))
                ]
            }),
            f32::INFINITY,
            None,
        );
        let flex = outcome.fragment.unwrap();
        assert_eq!(flex.kind, FragmentKind::Flex);
        assert_eq!(widths(&flex), vec![150.0, 250.0]);
        assert_eq!(xs(&flex), vec![0.0, 150.0]);
        assert_eq!(flex.dimensions.content.height, 10.0);
    }

    #[test]
    fn shrink_is_weighted_by_base_size() {
        let outcome = lay(
            serde_json::json!({
                "style": { "display": "flex" },
                "children": [
                    item(serde_json::json!({ "flex-basis": "300px", "height": "10px" })),
                    item(serde_json::json!({ "flex-basis": "200px", "height": "10px" }))
                ]
            }),
            f32::INFINITY,
            None,
        );
        let flex = outcome.fragment.unwrap();
        assert_eq!(widths(&flex), vec![240.0, 160.0], "100px taken 3:2");
    }

    #[test]
    fn min_width_freezes_an_item() {
        let outcome = lay(
            serde_json::json!({
                "style": { "display": "flex" },
                "children": [
                    item(serde_json::json!({ "flex-basis": "300px", "min-width": "290px", "height": "10px" })),
                    item(serde_json::json!({ "flex-basis": "200px", "height": "10px" }))
                ]
            }),
            f32::INFINITY,
            None,
        );
        let flex = outcome.fragment.unwrap();
        assert_eq!(widths(&flex), vec![290.0, 110.0]);
    }

    #[test]
    fn justify_content_space_between() {
        let outcome = lay(
            serde_json::json!({
                "style": { "display": "flex", "justify-content": "space-between" },
                "children": [
                    item(serde_json::json!({ "width": "50px", "height": "10px" })),
                    item(serde_json::json!({ "width": "50px", "height": "10px" })),
                    item(serde_json::json!({ "width": "50px", "height": "10px" }))
                ]
            }),
            f32::INFINITY,
            None,
        );
        assert_eq!(xs(&outcome.fragment.unwrap()), vec![0.0, 175.0, 350.0]);
    }

    #[test]
    fn order_and_row_reverse_place_items() {
        let outcome = lay(
            serde_json::json!({
                "style": { "display": "flex", "flex-direction": "row-reverse" },
                "children": [
                    item(serde_json::json!({ "width": "50px", "height": "10px", "order": "2" })),
                    item(serde_json::json!({ "width": "60px", "height": "10px" }))
                ]
            }),
            f32::INFINITY,
            None,
        );
        let flex = outcome.fragment.unwrap();
        assert_eq!(widths(&flex), vec![60.0, 50.0], "order sorts the items");
        assert_eq!(xs(&flex), vec![340.0, 290.0], "packed from the right");
    }

    #[test]
    fn align_items_center_and_stretch() {
        let outcome = lay(
            serde_json::json!({
                "style": { "display": "flex" },
                "children": [
                    item(serde_json::json!({ "width": "50px", "height": "40px" })),
                    item(serde_json::json!({ "width": "50px" })),
                    item(serde_json::json!({ "width": "50px", "height": "10px", "align-self": "center" }))
                ]
            }),
            f32::INFINITY,
            None,
        );
        let flex = outcome.fragment.unwrap();
        assert_eq!(flex.children[1].border_box().height, 40.0, "auto height stretches to the line");
        assert_eq!(flex.children[2].border_box().y, 15.0);
    }

    #[test]
    fn column_direction_stacks_and_grows_in_a_definite_height() {
        let outcome = lay(
            serde_json::json!({
                "style": { "display": "flex", "flex-direction": "column", "height": "100px" },
                "children": [
                    item(serde_json::json!({ "height": "20px" })),
                    item(serde_json::json!({ "height": "20px", "flex-grow": "1" }))
                ]
            }),
            f32::INFINITY,
            None,
        );
        let flex = outcome.fragment.unwrap();
        let (a, b) = (&flex.children[0], &flex.children[1]);
        assert_eq!(a.border_box().width, 400.0, "stretched across");
        assert_eq!(b.border_box().y, 20.0);
        assert_eq!(b.border_box().height, 80.0);
        assert_eq!(flex.dimensions.content.height, 100.0);
    }

    #[test]
    fn wrapped_lines_break_across_pages() {
        let boxed = item(serde_json::json!({ "width": "150px", "height": "50px" }));
        let flex = serde_json::json!({
            "style": { "display": "flex", "flex-wrap": "wrap" },
            "children": [boxed.clone(), boxed.clone(), boxed.clone(), boxed.clone(), boxed]
        });
        let first = lay(flex.clone(), 120.0, None);
        let resume = first.resume_at.clone().expect("flex container continues");
        assert_eq!(resume.index, 2);
        let fragment = first.fragment.unwrap();
        assert_eq!(fragment.children.len(), 4);
        assert_eq!(fragment.children[2].border_box().y, 50.0);
        assert!(fragment.is_broken);

        let second = lay(flex, 1000.0, Some(&resume));
        let fragment = second.fragment.unwrap();
        assert_eq!(fragment.children.len(), 1);
        assert_eq!(fragment.children[0].border_box().y, 0.0);
        assert!(fragment.is_continuation);
        assert!(second.resume_at.is_none());
    }

    #[test]
    fn lines_follow_the_available_width() {
        let sized = |w: f32| FlexItem {
            id: BoxId(0),
            base_size: w,
            hypothetical_size: w,
            min_size: 0.0,
            max_size: f32::INFINITY,
            grow: 0.0,
            shrink: 1.0,
            target_size: 0.0,
            frozen: false,
            outer_main: 0.0,
        };
        let items = [sized(100.0), sized(100.0), sized(100.0)];
        assert_eq!(collect_lines(&items, FlexWrap::Wrap, 250.0, 10.0), vec![0..2, 2..3]);
        assert_eq!(collect_lines(&items, FlexWrap::Wrap, 200.0, 10.0), vec![0..1, 1..2, 2..3]);
        assert_eq!(collect_lines(&items, FlexWrap::Nowrap, 200.0, 10.0), vec![0..3]);
    }
}
