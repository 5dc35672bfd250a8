//! Break opportunities between block-level siblings.
//!
//! [§ 4.4 Unforced Breaks](https://www.w3.org/TR/css-break-3/#unforced-breaks)
//!
//! "A break is allowed at Class A break points if the 'break-after' and
//! 'break-before' values of the relevant elements allow it."

use crate::fragment::{Fragment, FragmentKind};
use crate::style::{BreakValue, Position};
use crate::tree::{BoxId, BoxTree};

fn in_flow(tree: &BoxTree, id: BoxId) -> bool {
    let style = tree.style(id);
    !style.is_floated()
        && !style.position.is_absolutely_positioned()
        && !matches!(style.position, Position::Running(_))
        && !tree.is_inline_level(id)
}

/// Strongest of two values met at the same break point. Forced values win
/// over `avoid`, which wins over `auto`; between two forced values the
/// later one wins.
#[must_use]
pub fn combine(earlier: BreakValue, later: BreakValue) -> BreakValue {
    if later.is_forced() {
        later
    } else if earlier.is_forced() {
        earlier
    } else if later.is_avoid() {
        later
    } else {
        earlier
    }
}

/// [§ 3.1](https://www.w3.org/TR/css-break-3/#break-between)
///
/// "Values for a box's break-before property propagate to the first
/// in-flow child": the value at the top edge of `id`, including its first
/// in-flow descendants.
#[must_use]
pub fn break_before(tree: &BoxTree, id: BoxId) -> BreakValue {
    let own = tree.style(id).break_before;
    match tree.children(id).iter().copied().find(|&c| in_flow(tree, c)) {
        Some(first) => combine(own, break_before(tree, first)),
        None => own,
    }
}

/// The value at the bottom edge of `id`, including its last in-flow
/// descendants.
#[must_use]
pub fn break_after(tree: &BoxTree, id: BoxId) -> BreakValue {
    let own = tree.style(id).break_after;
    match tree
        .children(id)
        .iter()
        .rev()
        .copied()
        .find(|&c| in_flow(tree, c))
    {
        Some(last) => combine(break_after(tree, last), own),
        None => own,
    }
}

/// The value between two adjacent siblings.
#[must_use]
pub fn between(tree: &BoxTree, previous: BoxId, next: BoxId) -> BreakValue {
    combine(break_after(tree, previous), break_before(tree, next))
}

/// Whether an unforced break is allowed between two laid-out siblings.
/// Line boxes only allow a break before a following block: breaking
/// between lines is the paragraph's business.
fn allowed_between(tree: &BoxTree, previous: &Fragment, next: &Fragment) -> bool {
    if next.kind == FragmentKind::Line || next.source_index.is_none() {
        return false;
    }
    let Some(next_id) = next.box_id else {
        return false;
    };
    match previous.box_id.filter(|_| previous.kind != FragmentKind::Line) {
        Some(previous_id) => !between(tree, previous_id, next_id).is_avoid(),
        None => !break_before(tree, next_id).is_avoid(),
    }
}

/// [§ 4.4](https://www.w3.org/TR/css-break-3/#unforced-breaks)
///
/// Search backwards through `children` (laid out on this page, in order)
/// for the last position where a break is allowed. Returns the index of
/// the first child to push to the next page. Index 0 is never returned:
/// breaking before everything is the parent's decision.
#[must_use]
pub fn find_earlier_page_break(tree: &BoxTree, children: &[Fragment]) -> Option<usize> {
    (1..children.len())
        .rev()
        .find(|&i| allowed_between(tree, &children[i - 1], &children[i]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_values_win_and_later_wins_ties() {
        assert_eq!(combine(BreakValue::Avoid, BreakValue::Page), BreakValue::Page);
        assert_eq!(combine(BreakValue::Left, BreakValue::Auto), BreakValue::Left);
        assert_eq!(combine(BreakValue::Left, BreakValue::Right), BreakValue::Right);
        assert_eq!(combine(BreakValue::Auto, BreakValue::Avoid), BreakValue::Avoid);
    }

    #[test]
    fn break_before_propagates_from_first_child() {
        let node: crate::tree::BoxNode = serde_json::from_value(serde_json::json!({
            "children": [{
                "children": [
                    { "style": { "break-before": "right" } },
                    { "style": { "break-after": "avoid" } }
                ]
            }]
        }))
        .unwrap();
        let tree = BoxTree::from_node(&node);
        let root = tree.root().unwrap();
        let section = tree.children(root)[0];
        assert_eq!(break_before(&tree, section), BreakValue::Right);
        assert_eq!(break_after(&tree, section), BreakValue::Avoid);
    }
}
