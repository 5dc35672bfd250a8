//! Pagination: fragmenting the root box across pages.
//!
//! [CSS Paged Media Module Level 3](https://www.w3.org/TR/css-page-3/)
//!
//! # Page maker entries
//!
//! Every page starts from a [`PageMakerEntry`]: where to resume, the
//! forced break that ended the previous page, the page side, the counter
//! values and the footnotes carried over. Page *i* depends only on entry
//! *i*, so after the first pass a page is laid out again only when its
//! entry changed, when an anchor it read moved, or when it read the page
//! total and the total changed. Everything else is reused as is.
//!
//! # Repagination
//!
//! `counter(pages)` and forward `target-counter()` references are unknown
//! while the first pass runs. Passes repeat until nothing asks for a
//! replay, up to [`LayoutConfig::max_repagination_loops`]; the last pass
//! is kept when the cap is reached.
//!
//! [`LayoutConfig::max_repagination_loops`]: crate::config::LayoutConfig::max_repagination_loops

pub(crate) mod footnotes;
mod margin_boxes;
mod page;

use std::collections::BTreeMap;

use quire_common::warning::warn_once;
use serde::Serialize;

pub use margin_boxes::MarginSlot;

use crate::config::PageSetup;
use crate::context::LayoutContext;
use crate::counters::PageCounters;
use crate::fragment::{Fragment, ResumePoint};
use crate::geometry::Direction;
use crate::style::{BreakValue, ComputedStyle};
use crate::tree::BoxId;

/// What every page of a document shares: geometry and margin box rules.
#[derive(Debug, Clone, Default)]
pub struct PageTemplate {
    /// Page size and margins.
    pub setup: PageSetup,
    /// Style (mostly `content`) of each margin box in use.
    pub margin_boxes: BTreeMap<MarginSlot, ComputedStyle>,
}

/// One laid out page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageBox {
    /// 1-based position in the document.
    pub number: usize,
    /// Whether this is a right (recto in left-to-right documents) page.
    pub right: bool,
    /// Whether the page was inserted to honour a side break or to carry
    /// footnotes only.
    pub blank: bool,
    /// Page width.
    pub width: f32,
    /// Page height.
    pub height: f32,
    /// The root box fragment, `None` on blank pages.
    pub root: Option<Fragment>,
    /// The footnote area, when the page has footnotes.
    pub footnote_area: Option<Fragment>,
    /// Fixed boxes: laid out where they occur, copied onto every page.
    pub fixed_boxes: Vec<Fragment>,
    /// Margin boxes with content.
    pub margin_boxes: Vec<Fragment>,
    /// Counter values at the end of the page.
    pub counters: BTreeMap<String, i32>,
    /// `first` value of each named string on this page.
    pub strings: BTreeMap<String, String>,
}

/// Pages of a document and how pagination went.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagedDocument {
    /// The pages, in order.
    pub pages: Vec<PageBox>,
    /// Passes run.
    pub passes: usize,
    /// Whether the last pass asked for no replay.
    pub stable: bool,
}

/// Why a page must be laid out again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RemakeState {
    content_changed: bool,
    pages_wanted: bool,
}

/// State at the start of one page.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PageMakerEntry {
    /// Where the root resumes, `None` for the document start (first entry)
    /// or the end (any other).
    pub resume_at: Option<ResumePoint>,
    /// Forced break that ended the previous page.
    pub next_page: BreakValue,
    /// Whether this page is a right page.
    pub right_page: bool,
    /// Counter values at the page start.
    pub counters: PageCounters,
    /// Footnotes that did not fit on the previous page.
    pub reported: Vec<BoxId>,
    remake: RemakeState,
}

impl PageMakerEntry {
    /// Same starting state, ignoring the replay flags.
    fn same_start(&self, other: &Self) -> bool {
        self.resume_at == other.resume_at
            && self.next_page == other.next_page
            && self.right_page == other.right_page
            && self.counters == other.counters
            && self.reported == other.reported
    }
}

/// The chain of page maker entries of one document.
struct PageMaker<'t> {
    root: BoxId,
    template: &'t PageTemplate,
    entries: Vec<PageMakerEntry>,
}

impl<'t> PageMaker<'t> {
    fn new(ctx: &LayoutContext<'_>, root: BoxId, template: &'t PageTemplate) -> Self {
        let first = PageMakerEntry {
            resume_at: None,
            next_page: BreakValue::Auto,
            right_page: ctx.style(root).direction == Direction::Ltr,
            counters: PageCounters::default(),
            reported: Vec::new(),
            remake: RemakeState::default(),
        };
        Self {
            root,
            template,
            entries: vec![first],
        }
    }

    /// Side a forced break asks for: `Some(true)` for a right page.
    fn wanted_side(&self, ctx: &LayoutContext<'_>, value: BreakValue) -> Option<bool> {
        match value {
            BreakValue::Left => Some(false),
            BreakValue::Right => Some(true),
            BreakValue::Recto | BreakValue::Verso => {
                let ltr = ctx.style(self.root).direction == Direction::Ltr;
                Some(ltr != (value == BreakValue::Verso))
            }
            _ => None,
        }
    }

    /// Lay out page `index` from its entry and update the entry after it.
    ///
    /// A blank page is made instead when a side break lands on the wrong
    /// side, or when only reported footnotes are left.
    fn remake_page(&mut self, ctx: &mut LayoutContext<'_>, index: usize) -> page::MadePage {
        let entry = self.entries[index].clone();
        let wrong_side = self
            .wanted_side(ctx, entry.next_page)
            .is_some_and(|right| right != entry.right_page);
        let footnotes_only = index > 0 && entry.resume_at.is_none() && !entry.reported.is_empty();
        let blank = wrong_side || footnotes_only;

        ctx.forced_break = entry.next_page.is_forced();
        let made = page::make_page(ctx, self.root, self.template, &entry, index + 1, blank);
        self.entries[index].remake.pages_wanted = ctx.pages_wanted;

        let mut next = PageMakerEntry {
            resume_at: made.resume_at.clone(),
            next_page: made.next_page,
            right_page: !entry.right_page,
            counters: ctx.counters.clone(),
            reported: ctx.footnotes.reported.clone(),
            remake: RemakeState::default(),
        };
        // The page after a changed start is stale, unless there is none.
        next.remake.content_changed = next.resume_at.is_some() || !next.reported.is_empty();
        match self.entries.get_mut(index + 1) {
            Some(existing) if existing.same_start(&next) => {}
            Some(existing) => {
                log::debug!(target: "quire::pagination", "start of page {} changed", index + 2);
                *existing = next;
            }
            None => self.entries.push(next),
        }
        made
    }

    /// One pass: walk the chain from the first page, reusing pages from
    /// `previous` whose entries ask for nothing.
    fn make_all_pages(&mut self, ctx: &mut LayoutContext<'_>, previous: Vec<PageBox>) -> Vec<PageBox> {
        let mut previous: Vec<Option<PageBox>> = previous.into_iter().map(Some).collect();
        let mut pages = Vec::new();
        let mut index = 0;
        loop {
            let remake = self.entries[index].remake;
            let up_to_date = !remake.content_changed && !remake.pages_wanted && index + 1 < self.entries.len();
            let kept = previous
                .get_mut(index)
                .and_then(Option::take)
                .filter(|_| up_to_date);
            match kept {
                Some(page) => {
                    log::debug!(target: "quire::pagination", "page {} is up to date", index + 1);
                    pages.push(page);
                }
                None => {
                    self.entries[index].remake = RemakeState::default();
                    let made = self.remake_page(ctx, index);
                    pages.push(made.page);
                }
            }

            index += 1;
            let next = &self.entries[index];
            if next.resume_at.is_none() && next.reported.is_empty() {
                self.entries.truncate(index + 1);
                ctx.string_sets.truncate_after(index);
                ctx.running_elements.truncate_after(index);
                return pages;
            }
        }
    }
}

/// Copy every page's fixed boxes onto all the other pages.
fn share_fixed_boxes(pages: &mut [PageBox]) {
    let own: Vec<Vec<Fragment>> = pages.iter().map(|p| p.fixed_boxes.clone()).collect();
    for (i, page) in pages.iter_mut().enumerate() {
        for (j, boxes) in own.iter().enumerate() {
            if i != j {
                page.fixed_boxes.extend(boxes.iter().cloned());
            }
        }
    }
}

/// Resolve the backgrounds of everything on `page`.
fn resolve_backgrounds(ctx: &mut LayoutContext<'_>, page: &mut PageBox) {
    let fragments = page
        .root
        .iter_mut()
        .chain(page.footnote_area.iter_mut())
        .chain(page.fixed_boxes.iter_mut());
    for fragment in fragments {
        crate::background::resolve_tree(ctx, fragment);
    }
}

/// Lay `root` out on pages until page-dependent values settle.
pub fn paginate(ctx: &mut LayoutContext<'_>, root: BoxId, template: &PageTemplate) -> PagedDocument {
    let mut maker = PageMaker::new(ctx, root, template);
    let max_passes = ctx.config.max_repagination_loops.max(1);
    let mut pages: Vec<PageBox> = Vec::new();
    let mut total = 0;
    let mut passes = 0;
    let mut stable = false;

    while passes < max_passes {
        passes += 1;
        if passes > 1 {
            log::debug!(target: "quire::pagination", "repagination pass {passes}");
        }
        let previous_total = total;
        ctx.total_pages = total;
        pages = maker.make_all_pages(ctx, pages);
        total = pages.len();

        for page in ctx.targets.take_changed() {
            if let Some(entry) = page.checked_sub(1).and_then(|i| maker.entries.get_mut(i)) {
                entry.remake.content_changed = true;
            }
        }
        let content_changed = maker.entries.iter().any(|e| e.remake.content_changed);
        let pages_changed = previous_total != total && maker.entries.iter().any(|e| e.remake.pages_wanted);
        if !content_changed && !pages_changed {
            stable = true;
            break;
        }
    }
    if !stable {
        let _ = warn_once(
            "Pagination",
            &format!("page-dependent content still changing after {passes} passes; keeping the last pass"),
        );
    }

    share_fixed_boxes(&mut pages);
    for page in &mut pages {
        resolve_backgrounds(ctx, page);
    }
    log::info!(target: "quire::pagination", "{total} pages in {passes} passes");
    PagedDocument { pages, passes, stable }
}
