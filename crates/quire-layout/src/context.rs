//! Per-document layout state.
//!
//! A [`LayoutContext`] is created once per document and passed by `&mut`
//! through every layout call. It holds the memoization caches (text,
//! struts, hyphenation, images, table widths), the stack of block
//! formatting contexts, and the state of the page being laid out. None of
//! it is shared across documents or threads.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::config::LayoutConfig;
use crate::counters::{PageCounters, TargetCollector};
use crate::formatting_context::FormattingContext;
use crate::fragment::Fragment;
use crate::geometry::Rect;
use crate::resources::{ImageCache, ImageResolver, IntrinsicSize};
use crate::strings::{PageAssignments, PageEvent};
use crate::style::ComputedStyle;
use crate::table::{ColumnWidths, RepeatedGroups};
use crate::text::{FontMetrics, Strut, TextCache};
use crate::tree::{BoxId, BoxTree};

/// An absolutely positioned box waiting for its containing block.
#[derive(Debug, Clone, Copy)]
pub struct PendingAbsolute {
    /// The positioned box.
    pub box_id: BoxId,
    /// Where it would have been in normal flow.
    pub static_x: f32,
    /// Where it would have been in normal flow.
    pub static_y: f32,
}

/// Footnote state of the page being laid out.
#[derive(Debug, Clone, Default)]
pub struct FootnoteState {
    /// Footnotes placed in this page's area, in call order.
    pub current_page: Vec<BoxId>,
    /// Footnotes that did not fit and move to the next page.
    pub reported: Vec<BoxId>,
    /// The laid out footnote area of this page.
    pub area: Option<Fragment>,
    /// Height currently taken from the page bottom by the area.
    pub area_height: f32,
    /// Containing block of the area: page content box.
    pub area_cb: Option<Rect>,
    /// Tallest the area may grow.
    pub max_height: f32,
}

/// Snapshot of the speculative state, restored when laid out content is
/// thrown away.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    shapes: usize,
    absolutes: Option<(usize, usize)>,
    fixed: usize,
    log: usize,
    counters: PageCounters,
    footnotes: FootnoteState,
    page_bottom: f32,
}

/// Shared caches and mutable state threaded through layout.
pub struct LayoutContext<'a> {
    /// The box tree being laid out.
    pub tree: &'a BoxTree,
    /// Engine configuration.
    pub config: &'a LayoutConfig,
    /// Text measurement service.
    pub metrics: &'a dyn FontMetrics,
    /// Image intrinsic size service.
    pub images: &'a dyn ImageResolver,
    /// Memoized text measurements, struts and hyphenation points.
    pub text: TextCache,
    /// Memoized image sizes and failures.
    pub image_cache: ImageCache,
    /// Column widths keyed by table box.
    pub table_widths: HashMap<BoxId, Rc<ColumnWidths>>,
    /// Laid out header/footer rows keyed by table box.
    pub table_groups: HashMap<BoxId, RepeatedGroups>,
    /// Min/max-content widths keyed by box.
    pub preferred: HashMap<BoxId, (f32, f32)>,
    bfc_stack: Vec<FormattingContext>,
    absolutes: Vec<Vec<PendingAbsolute>>,
    /// Fixed boxes met on the current page.
    pub fixed: Vec<PendingAbsolute>,
    /// Bottom edge content must not cross on the current page.
    pub page_bottom: f32,
    /// Page content area of the current page.
    pub page_area: Rect,
    /// 1-based number of the page being laid out.
    pub current_page: usize,
    /// Whether the current page starts after a forced break.
    pub forced_break: bool,
    /// Footnote state of the current page.
    pub footnotes: FootnoteState,
    /// Counter values while laying out the current page.
    pub counters: PageCounters,
    /// Total page count from the previous pass, 0 on the first.
    pub total_pages: usize,
    /// Whether the current page read `counter(pages)`.
    pub pages_wanted: bool,
    /// Named strings per page.
    pub string_sets: PageAssignments<String>,
    /// Running elements per page.
    pub running_elements: PageAssignments<BoxId>,
    /// Anchors and the generated content reading them.
    pub targets: TargetCollector,
    log: Vec<PageEvent>,
}

impl<'a> LayoutContext<'a> {
    /// A fresh context for one document.
    #[must_use]
    pub fn new(
        tree: &'a BoxTree,
        config: &'a LayoutConfig,
        metrics: &'a dyn FontMetrics,
        images: &'a dyn ImageResolver,
    ) -> Self {
        Self {
            tree,
            config,
            metrics,
            images,
            text: TextCache::default(),
            image_cache: ImageCache::default(),
            table_widths: HashMap::new(),
            table_groups: HashMap::new(),
            preferred: HashMap::new(),
            bfc_stack: vec![FormattingContext::new(None)],
            absolutes: Vec::new(),
            fixed: Vec::new(),
            page_bottom: f32::INFINITY,
            page_area: Rect::default(),
            current_page: 1,
            forced_break: false,
            footnotes: FootnoteState::default(),
            counters: PageCounters::default(),
            total_pages: 0,
            pages_wanted: false,
            string_sets: PageAssignments::default(),
            running_elements: PageAssignments::default(),
            targets: TargetCollector::default(),
            log: Vec::new(),
        }
    }

    /// Style of `id`.
    #[must_use]
    pub fn style(&self, id: BoxId) -> &'a ComputedStyle {
        self.tree.style(id)
    }

    /// Width of `text` in `style`'s font.
    pub fn text_width(&mut self, style: &ComputedStyle, text: &str) -> f32 {
        self.text.width(self.metrics, style, text)
    }

    /// Strut of `style`.
    pub fn strut(&mut self, style: &ComputedStyle) -> Strut {
        self.text.strut(self.metrics, style)
    }

    /// Hyphenation points of `word`.
    pub fn hyphenate(&mut self, lang: &str, word: &str) -> Rc<[usize]> {
        self.text.hyphenate(self.metrics, lang, word)
    }

    /// Intrinsic size of an image, `None` if it failed.
    pub fn image_size(&mut self, url: &str) -> Option<IntrinsicSize> {
        self.image_cache.get(self.images, url)
    }

    // ---------------------------------------------------------------
    // Formatting contexts
    // ---------------------------------------------------------------

    /// Innermost block formatting context.
    pub fn bfc(&mut self) -> &mut FormattingContext {
        if self.bfc_stack.is_empty() {
            self.bfc_stack.push(FormattingContext::new(None));
        }
        let last = self.bfc_stack.len() - 1;
        &mut self.bfc_stack[last]
    }

    /// Read-only view of the innermost block formatting context.
    #[must_use]
    pub fn current_bfc(&self) -> Option<&FormattingContext> {
        self.bfc_stack.last()
    }

    /// Enter a new block formatting context owned by `owner`.
    pub fn push_bfc(&mut self, owner: BoxId) {
        self.bfc_stack.push(FormattingContext::new(Some(owner)));
    }

    /// Leave the innermost block formatting context.
    pub fn pop_bfc(&mut self) -> FormattingContext {
        self.bfc_stack
            .pop()
            .unwrap_or_else(|| FormattingContext::new(None))
    }

    /// Replace the whole stack with one page scope.
    pub fn reset_bfcs(&mut self) {
        self.bfc_stack.clear();
        self.bfc_stack.push(FormattingContext::new(None));
    }

    // ---------------------------------------------------------------
    // Absolutely positioned boxes
    // ---------------------------------------------------------------

    /// Start collecting absolute descendants for a new containing block.
    pub fn push_absolute_scope(&mut self) {
        self.absolutes.push(Vec::new());
    }

    /// Stop collecting for the innermost containing block.
    pub fn pop_absolute_scope(&mut self) -> Vec<PendingAbsolute> {
        self.absolutes.pop().unwrap_or_default()
    }

    /// Queue an absolutely positioned or fixed box met in flow.
    pub fn defer_positioned(&mut self, pending: PendingAbsolute, fixed: bool) {
        if fixed {
            self.fixed.push(pending);
        } else if let Some(scope) = self.absolutes.last_mut() {
            scope.push(pending);
        } else {
            self.fixed.push(pending);
        }
    }

    // ---------------------------------------------------------------
    // Page events and rollback
    // ---------------------------------------------------------------

    /// Record a string-set, running element or anchor met on this page.
    pub fn log_event(&mut self, event: PageEvent) {
        self.log.push(event);
    }

    /// Take the events recorded for the current page.
    pub fn take_events(&mut self) -> Vec<PageEvent> {
        std::mem::take(&mut self.log)
    }

    /// Snapshot the speculative state.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            shapes: self.bfc_stack.last().map_or(0, |b| b.shapes.len()),
            absolutes: self
                .absolutes
                .last()
                .map(|scope| (self.absolutes.len(), scope.len())),
            fixed: self.fixed.len(),
            log: self.log.len(),
            counters: self.counters.clone(),
            footnotes: self.footnotes.clone(),
            page_bottom: self.page_bottom,
        }
    }

    /// Restore a snapshot taken in the same formatting context.
    pub fn rollback(&mut self, checkpoint: &Checkpoint) {
        if let Some(bfc) = self.bfc_stack.last_mut() {
            bfc.truncate(checkpoint.shapes);
        }
        if let Some((depth, len)) = checkpoint.absolutes
            && self.absolutes.len() == depth
            && let Some(scope) = self.absolutes.last_mut()
        {
            scope.truncate(len);
        }
        self.fixed.truncate(checkpoint.fixed);
        self.log.truncate(checkpoint.log);
        self.counters.clone_from(&checkpoint.counters);
        self.footnotes.clone_from(&checkpoint.footnotes);
        self.page_bottom = checkpoint.page_bottom;
    }

    /// Whether `y` is past the usable bottom of the page, leaving
    /// `bottom_space` free.
    #[must_use]
    pub fn overflows_page(&self, bottom_space: f32, y: f32) -> bool {
        overflows(self.page_bottom - bottom_space, y)
    }

    /// Counter values snapshot, for page state.
    #[must_use]
    pub fn counter_snapshot(&self) -> BTreeMap<String, i32> {
        self.counters.values().clone()
    }
}

/// `y` exceeds `bottom`, with a tolerance for accumulated float error.
#[must_use]
pub fn overflows(bottom: f32, y: f32) -> bool {
    y > bottom + bottom.abs() * 1e-6 + 1e-4
}
