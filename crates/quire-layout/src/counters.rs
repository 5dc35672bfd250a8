//! Counters and cross-references.
//!
//! [§ 12.4 Automatic counters and numbering](https://www.w3.org/TR/CSS2/generate.html#counters)
//! and [§ 2.1 target-counter()](https://www.w3.org/TR/css-gcpm-3/#target-counter)
//!
//! Counters here are document-wide: `counter-reset` on any box restarts
//! the counter for everything that follows, with no nested scopes.
//! `page` and `pages` are maintained by pagination.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::style::ComputedStyle;

/// Counter values at some point of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageCounters {
    values: BTreeMap<String, i32>,
}

impl PageCounters {
    /// Value of `name`, 0 if it was never set.
    #[must_use]
    pub fn get(&self, name: &str) -> i32 {
        self.values.get(name).copied().unwrap_or(0)
    }

    /// Set `name` to `value`.
    pub fn reset(&mut self, name: &str, value: i32) {
        let _ = self.values.insert(name.to_owned(), value);
    }

    /// Add `by` to `name`.
    pub fn increment(&mut self, name: &str, by: i32) {
        *self.values.entry(name.to_owned()).or_insert(0) += by;
    }

    /// Apply a box's `counter-reset` then `counter-increment`. Returns
    /// whether `page` was reset.
    pub fn apply(&mut self, style: &ComputedStyle) -> bool {
        let mut page_reset = false;
        for (name, value) in style.counter_reset.resolved(0) {
            // The page carrying a `page` reset takes the value as its number.
            page_reset |= name == "page";
            self.reset(name, value);
        }
        for (name, value) in style.counter_increment.resolved(1) {
            if name != "page" {
                self.increment(name, value);
            }
        }
        page_reset
    }

    /// All values.
    #[must_use]
    pub const fn values(&self) -> &BTreeMap<String, i32> {
        &self.values
    }
}

/// Where an anchor was found.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AnchorTarget {
    page: usize,
    counters: BTreeMap<String, i32>,
}

/// Collects anchor positions and the pages that read them.
///
/// A page that reads an anchor before it is known, or whose anchor moved
/// since it was read, is marked for replay.
#[derive(Debug, Clone, Default)]
pub struct TargetCollector {
    anchors: HashMap<String, AnchorTarget>,
    readers: HashMap<String, BTreeSet<usize>>,
    changed: BTreeSet<usize>,
}

impl TargetCollector {
    /// Record that `name` lives on `page` with `counters` in effect.
    pub fn record_anchor(&mut self, name: &str, page: usize, counters: &PageCounters) {
        let target = AnchorTarget {
            page,
            counters: counters.values().clone(),
        };
        if self.anchors.get(name) == Some(&target) {
            return;
        }
        log::trace!(target: "quire::pagination", "anchor '{name}' now on page {page}");
        let _ = self.anchors.insert(name.to_owned(), target);
        if let Some(readers) = self.readers.get(name) {
            self.changed.extend(readers.iter().copied());
        }
    }

    /// Value of `counter` at the anchor `name`, read from `page`.
    ///
    /// Returns `None` while the anchor is unknown; `page` is then replayed
    /// once it is found.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn lookup(&mut self, name: &str, counter: &str, page: usize) -> Option<i32> {
        let _ = self
            .readers
            .entry(name.to_owned())
            .or_default()
            .insert(page);
        let target = self.anchors.get(name)?;
        Some(if counter == "page" {
            target
                .counters
                .get("page")
                .copied()
                .unwrap_or(target.page as i32)
        } else {
            target.counters.get(counter).copied().unwrap_or(0)
        })
    }

    /// Forget who read what on `page`, before it is laid out again.
    pub fn clear_readers(&mut self, page: usize) {
        for pages in self.readers.values_mut() {
            let _ = pages.remove(&page);
        }
    }

    /// Pages marked for replay since the last call.
    pub fn take_changed(&mut self) -> BTreeSet<usize> {
        std::mem::take(&mut self.changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_are_replayed_when_the_anchor_appears() {
        let mut targets = TargetCollector::default();
        assert_eq!(targets.lookup("intro", "page", 1), None);
        let mut counters = PageCounters::default();
        counters.reset("page", 4);
        targets.record_anchor("intro", 4, &counters);
        assert_eq!(targets.take_changed().into_iter().collect::<Vec<_>>(), vec![1]);
        assert_eq!(targets.lookup("intro", "page", 1), Some(4));
        // Same position again: nobody needs replay.
        targets.record_anchor("intro", 4, &counters);
        assert!(targets.take_changed().is_empty());
    }

    #[test]
    fn page_reset_counts_the_page_itself() {
        let mut counters = PageCounters::default();
        counters.reset("page", 7);
        let style = ComputedStyle {
            counter_reset: "page 1 chapter".parse().unwrap_or_default(),
            counter_increment: "chapter".parse().unwrap_or_default(),
            ..ComputedStyle::default()
        };
        assert!(counters.apply(&style));
        assert_eq!(counters.get("page"), 1);
        assert_eq!(counters.get("chapter"), 1);
    }
}
