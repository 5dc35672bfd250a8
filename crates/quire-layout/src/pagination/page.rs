//! Laying out one page.

use std::collections::BTreeMap;

use quire_common::warning::warn_once;

use super::footnotes;
use super::margin_boxes::make_margin_boxes;
use super::{PageBox, PageMakerEntry, PageTemplate};
use crate::block::{BlockInput, block_level_layout};
use crate::context::{FootnoteState, LayoutContext};
use crate::fragment::{Fragment, ResumePoint};
use crate::geometry::ContainingBlock;
use crate::positioned::layout_absolute;
use crate::strings::PageEvent;
use crate::style::{BreakValue, PageKeyword};
use crate::tree::BoxId;

/// A page and where the next one starts.
pub(super) struct MadePage {
    pub page: PageBox,
    pub resume_at: Option<ResumePoint>,
    pub next_page: BreakValue,
}

/// Reset the per-page state of `ctx` for page `number`.
fn start_page(ctx: &mut LayoutContext<'_>, template: &PageTemplate, entry: &PageMakerEntry, number: usize) {
    let page_area = template.setup.content_area();
    ctx.page_area = page_area;
    ctx.page_bottom = page_area.bottom();
    ctx.current_page = number;
    ctx.pages_wanted = false;
    ctx.reset_bfcs();
    ctx.fixed.clear();
    let _ = ctx.take_events();
    ctx.string_sets.clear_page(number);
    ctx.running_elements.clear_page(number);
    ctx.targets.clear_readers(number);

    ctx.counters.clone_from(&entry.counters);
    ctx.counters.increment("page", 1);

    ctx.footnotes = FootnoteState {
        area_cb: Some(page_area),
        max_height: template.setup.footnote_max_height.unwrap_or(page_area.height),
        ..FootnoteState::default()
    };
}

/// Move what the page logged into the document-wide stores.
fn commit_events(ctx: &mut LayoutContext<'_>, number: usize) {
    for event in ctx.take_events() {
        match event {
            PageEvent::StringSet { name, value, at_start } => {
                ctx.string_sets.record(&name, number, value, at_start);
            }
            PageEvent::Running { name, box_id, at_start } => {
                ctx.running_elements.record(&name, number, box_id, at_start);
            }
            PageEvent::Anchor { name, counters } => ctx.targets.record_anchor(&name, number, &counters),
        }
    }
}

/// [§ 3 Page Layout](https://www.w3.org/TR/css-page-3/#page-model)
///
/// Lay out page `number` starting from `entry`: the footnotes reported by
/// the previous page, then the root in a fresh formatting context, then
/// the footnote area, positioned boxes and margin boxes. A blank page
/// only carries reported footnotes and margin boxes.
pub(super) fn make_page(
    ctx: &mut LayoutContext<'_>,
    root: BoxId,
    template: &PageTemplate,
    entry: &PageMakerEntry,
    number: usize,
    blank: bool,
) -> MadePage {
    start_page(ctx, template, entry, number);
    let page_area = ctx.page_area;

    // STEP 1: Footnotes carried over from the previous page. The first one
    // always stays, so that a footnote taller than the cap still gets out.
    for (i, &footnote) in entry.reported.iter().enumerate() {
        if !footnotes::place(ctx, footnote) && i != 0 {
            footnotes::report(ctx, footnote);
            ctx.footnotes.reported.extend_from_slice(&entry.reported[i + 1..]);
            break;
        }
    }

    // STEP 2: The root box.
    let direction = ctx.style(root).direction;
    let mut root_fragment: Option<Fragment> = None;
    let mut resume_at = entry.resume_at.clone();
    let mut next_page = entry.next_page;
    if !blank {
        let cb = ContainingBlock::from_rect(page_area, direction);
        ctx.push_absolute_scope();
        let outcome = block_level_layout(
            ctx,
            root,
            &cb,
            BlockInput {
                position_y: page_area.y,
                bottom_space: 0.0,
                skip: entry.resume_at.as_ref(),
                page_is_empty: true,
                adjoining_margins: Vec::new(),
            },
        );
        let absolutes = ctx.pop_absolute_scope();
        root_fragment = outcome.fragment;
        if let Some(fragment) = &mut root_fragment {
            for item in absolutes {
                let placed = layout_absolute(ctx, item, page_area, direction);
                fragment.children.push(placed);
            }
        }
        next_page = outcome.next_page.unwrap_or(BreakValue::Auto);
        resume_at = outcome.resume_at;
        if resume_at.is_some() && resume_at == entry.resume_at {
            let _ = warn_once(
                "Pagination",
                &format!("page {number} made no progress; dropping the remaining content"),
            );
            resume_at = None;
        }
    }

    // STEP 3: Fixed boxes, against the page area.
    let fixed = std::mem::take(&mut ctx.fixed);
    let fixed_boxes: Vec<Fragment> = fixed
        .into_iter()
        .map(|item| layout_absolute(ctx, item, page_area, direction))
        .collect();

    // STEP 4: Footnote area at the bottom of the page area.
    let footnote_area = footnotes::finish_area(ctx);

    // STEP 5: Page state, then the margin boxes reading it.
    commit_events(ctx, number);
    let margin_boxes = make_margin_boxes(ctx, root, &template.setup, &template.margin_boxes);
    let strings: BTreeMap<String, String> = ctx
        .string_sets
        .names()
        .into_iter()
        .filter_map(|name| {
            ctx.string_sets
                .resolve(name, number, PageKeyword::First)
                .map(|value| (name.to_owned(), value.clone()))
        })
        .collect();

    log::debug!(
        target: "quire::pagination",
        "made page {number}{}: resume at {:?}, next break {next_page}",
        if blank { " (blank)" } else { "" },
        resume_at.as_ref().map(|rp| rp.index),
    );

    MadePage {
        page: PageBox {
            number,
            right: entry.right_page,
            blank,
            width: template.setup.width,
            height: template.setup.height,
            root: root_fragment,
            footnote_area,
            fixed_boxes,
            margin_boxes,
            counters: ctx.counter_snapshot(),
            strings,
        },
        resume_at,
        next_page,
    }
}
