//! Named strings and running elements.
//!
//! [§ 1 Named strings](https://www.w3.org/TR/css-gcpm-3/#named-strings)
//! and [§ 1.3 Running elements](https://www.w3.org/TR/css-gcpm-3/#running-elements)
//!
//! Assignments are logged while a page is laid out, then committed to the
//! page once it is final. Logging first means assignments made by content
//! that is later pushed to the next page are simply truncated away.

use std::collections::{BTreeMap, HashMap};

use crate::counters::PageCounters;
use crate::style::PageKeyword;
use crate::tree::BoxId;

/// Something a page's content recorded for later pages or margin boxes.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    /// `string-set: name ...` evaluated to `value`.
    StringSet {
        /// String name.
        name: String,
        /// Evaluated text.
        value: String,
        /// Set by the first in-flow content of the page.
        at_start: bool,
    },
    /// A `position: running(name)` box.
    Running {
        /// Running element name.
        name: String,
        /// The running box.
        box_id: BoxId,
        /// Met before any in-flow content of the page.
        at_start: bool,
    },
    /// A box carrying an anchor name.
    Anchor {
        /// Anchor name.
        name: String,
        /// Counter values where the box starts.
        counters: PageCounters,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct Assignment<T> {
    value: T,
    at_start: bool,
}

/// Per-page assignments of one kind of named value.
#[derive(Debug, Clone)]
pub struct PageAssignments<T> {
    by_name: HashMap<String, BTreeMap<usize, Vec<Assignment<T>>>>,
}

impl<T> Default for PageAssignments<T> {
    fn default() -> Self {
        Self {
            by_name: HashMap::new(),
        }
    }
}

impl<T: Clone + PartialEq> PageAssignments<T> {
    /// Record an assignment of `name` on `page`.
    pub fn record(&mut self, name: &str, page: usize, value: T, at_start: bool) {
        self.by_name
            .entry(name.to_owned())
            .or_default()
            .entry(page)
            .or_default()
            .push(Assignment { value, at_start });
    }

    /// Names with at least one assignment, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Forget every assignment made on `page`, before it is laid out again.
    pub fn clear_page(&mut self, page: usize) {
        for pages in self.by_name.values_mut() {
            let _ = pages.remove(&page);
        }
    }

    /// Forget every page after `last`, when the document got shorter.
    pub fn truncate_after(&mut self, last: usize) {
        for pages in self.by_name.values_mut() {
            let _ = pages.split_off(&(last + 1));
        }
    }

    /// [§ 1.2 Using named strings](https://www.w3.org/TR/css-gcpm-3/#using-named-strings)
    ///
    /// Value of `name` for `page` under `keyword`.
    ///
    /// If the page has assignments:
    /// - `first`: the first one.
    /// - `start`: the first one if it was made by the content that starts
    ///   the page, otherwise the value carried in from earlier pages.
    /// - `last`: the last one.
    /// - `first-except`: nothing.
    ///
    /// Otherwise every keyword takes the last assignment of the nearest
    /// earlier page that has one.
    #[must_use]
    pub fn resolve(&self, name: &str, page: usize, keyword: PageKeyword) -> Option<&T> {
        let pages = self.by_name.get(name)?;
        if let Some(here) = pages.get(&page).filter(|a| !a.is_empty()) {
            match keyword {
                PageKeyword::First => return here.first().map(|a| &a.value),
                PageKeyword::Last => return here.last().map(|a| &a.value),
                PageKeyword::FirstExcept => return None,
                PageKeyword::Start => {
                    if let Some(first) = here.first().filter(|a| a.at_start) {
                        return Some(&first.value);
                    }
                }
            }
        }
        pages
            .range(..page)
            .rev()
            .find_map(|(_, assignments)| assignments.last())
            .map(|a| &a.value)
    }

    /// Whether two stores hold the same assignments for `page`.
    #[must_use]
    pub fn page_equals(&self, other: &Self, page: usize) -> bool {
        let names = self.by_name.keys().chain(other.by_name.keys());
        for name in names {
            let mine = self.by_name.get(name).and_then(|p| p.get(&page));
            let theirs = other.by_name.get(name).and_then(|p| p.get(&page));
            if mine.is_none_or(Vec::is_empty) && theirs.is_none_or(Vec::is_empty) {
                continue;
            }
            if mine != theirs {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> PageAssignments<String> {
        let mut store = PageAssignments::default();
        store.record("chapter", 1, "One".into(), true);
        store.record("chapter", 3, "Two".into(), false);
        store.record("chapter", 3, "Three".into(), false);
        store
    }

    #[test]
    fn keywords_on_a_page_with_assignments() {
        let s = store();
        let get = |kw| s.resolve("chapter", 3, kw).cloned();
        assert_eq!(get(PageKeyword::First).as_deref(), Some("Two"));
        assert_eq!(get(PageKeyword::Last).as_deref(), Some("Three"));
        assert_eq!(get(PageKeyword::FirstExcept), None);
        // Not set by the page's first content: carried from page 1.
        assert_eq!(get(PageKeyword::Start).as_deref(), Some("One"));
        assert_eq!(s.resolve("chapter", 1, PageKeyword::Start).map(String::as_str), Some("One"));
    }

    #[test]
    fn pages_without_assignments_look_backwards() {
        let s = store();
        assert_eq!(s.resolve("chapter", 2, PageKeyword::FirstExcept).map(String::as_str), Some("One"));
        assert_eq!(s.resolve("chapter", 5, PageKeyword::First).map(String::as_str), Some("Three"));
        assert_eq!(s.resolve("missing", 5, PageKeyword::First), None);
    }

    #[test]
    fn clearing_a_page_forgets_its_assignments() {
        let mut s = store();
        let before = s.clone();
        s.clear_page(3);
        assert!(!s.page_equals(&before, 3));
        assert_eq!(s.resolve("chapter", 3, PageKeyword::Last).map(String::as_str), Some("One"));
    }
}
