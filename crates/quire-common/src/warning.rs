//! Deduplicated layout warnings.
//!
//! Recovered input problems (a bad `colspan`, a missing image, an
//! over-wide float) tend to repeat on every repagination pass. This module
//! makes sure each distinct message reaches the log once.

use std::cell::RefCell;
use std::collections::HashSet;

thread_local! {
    /// Warnings already emitted on this thread since the last reset
    static WARNED: RefCell<HashSet<String>> = RefCell::new(HashSet::new());
}

/// Log a warning once per unique `(component, message)` pair.
///
/// Returns `true` when the message was emitted, `false` when it had
/// already been seen.
///
/// # Example
/// ```
/// use quire_common::warning::warn_once;
///
/// assert!(warn_once("Table", "invalid colspan 'x', using 1"));
/// assert!(!warn_once("Table", "invalid colspan 'x', using 1"));
/// ```
pub fn warn_once(component: &str, message: &str) -> bool {
    let key = format!("[{component}] {message}");
    let fresh = WARNED.with_borrow_mut(|warned| warned.insert(key));

    if fresh {
        log::warn!(target: "quire", "[{component}] {message}");
    }
    fresh
}

/// Forget every recorded warning on this thread.
///
/// Layout calls this at the start of each document so one document's
/// warnings never hide another's.
pub fn clear_warnings() {
    WARNED.with_borrow_mut(HashSet::clear);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_components_are_tracked_separately() {
        assert!(warn_once("Grid", "unit-test message"));
        assert!(warn_once("Float", "unit-test message"));
        assert!(!warn_once("Grid", "unit-test message"));
    }

    #[test]
    fn clearing_lets_a_warning_through_again() {
        assert!(warn_once("Table", "cleared message"));
        assert!(!warn_once("Table", "cleared message"));
        clear_warnings();
        assert!(warn_once("Table", "cleared message"));
    }
}
