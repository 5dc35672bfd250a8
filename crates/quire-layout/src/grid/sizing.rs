//! Grid track sizing.
//!
//! [§ 11 Grid Sizing](https://www.w3.org/TR/css-grid-1/#layout-algorithm)
//!
//! Each track carries a base size and a growth limit. Content
//! contributions raise them, free space is handed out up to the growth
//! limits, then flexible tracks share what is left.

use std::ops::Range;

use super::template::{TrackBreadth, TrackSize};

/// Space the tracks of one axis are sized into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum AvailableSpace {
    /// A definite size: free space is distributed.
    Definite(f32),
    /// Size under a min-content constraint.
    MinContent,
    /// Size under a max-content constraint (indefinite free space).
    MaxContent,
}

/// An item's size contributions to the tracks it spans.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Contribution {
    /// Spanned tracks.
    pub tracks: Range<usize>,
    /// Min-content contribution.
    pub min: f32,
    /// Max-content contribution.
    pub max: f32,
}

#[derive(Debug, Clone, Copy)]
struct Track {
    size: TrackSize,
    base: f32,
    limit: f32,
}

impl Track {
    fn flex(&self) -> Option<f32> {
        self.size.flex()
    }
}

/// Percentages against an indefinite size behave as `auto`.
fn effective(breadth: TrackBreadth, basis: Option<f32>) -> TrackBreadth {
    match breadth {
        TrackBreadth::Percent(_) if basis.is_none() => TrackBreadth::Auto,
        other => other,
    }
}

/// Raise a growth limit, an infinite one counting as unset.
fn raise_limit(limit: f32, value: f32) -> f32 {
    if limit.is_infinite() { value } else { limit.max(value) }
}

/// Used sizes of the tracks of one axis.
///
/// `percent_basis` resolves percentage tracks; `gap` is the gutter between
/// adjacent tracks.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn size_tracks(
    sizes: &[TrackSize],
    items: &[Contribution],
    space: AvailableSpace,
    percent_basis: Option<f32>,
    gap: f32,
) -> Vec<f32> {
    // STEP 1: Initialize.
    let mut tracks: Vec<Track> = sizes
        .iter()
        .map(|size| {
            let size = TrackSize {
                min: effective(size.min, percent_basis),
                max: effective(size.max, percent_basis),
            };
            let base = size.min.definite(percent_basis).unwrap_or(0.0);
            let limit = size.max.definite(percent_basis).map_or(f32::INFINITY, |l| l.max(base));
            Track { size, base, limit }
        })
        .collect();
    if tracks.is_empty() {
        return Vec::new();
    }
    let gaps = gap * (tracks.len() - 1) as f32;
    let crosses_flex = |tracks: &[Track], range: &Range<usize>| tracks[range.clone()].iter().any(|t| t.flex().is_some());

    // STEP 2: Items spanning one track.
    for item in items.iter().filter(|i| i.tracks.len() == 1) {
        let Some(track) = tracks.get_mut(item.tracks.start) else {
            continue;
        };
        match track.size.min {
            TrackBreadth::MaxContent => track.base = track.base.max(item.max),
            TrackBreadth::Auto | TrackBreadth::MinContent => track.base = track.base.max(item.min),
            _ => {}
        }
        if track.flex().is_none() {
            match track.size.max {
                TrackBreadth::MinContent => track.limit = raise_limit(track.limit, item.min),
                TrackBreadth::Auto | TrackBreadth::MaxContent => track.limit = raise_limit(track.limit, item.max),
                _ => {}
            }
        }
    }
    for track in &mut tracks {
        if track.limit < track.base {
            track.limit = track.base;
        }
    }

    // STEP 3: Items spanning several tracks, none of them flexible,
    // smallest spans first.
    let mut spanning: Vec<&Contribution> = items
        .iter()
        .filter(|i| i.tracks.len() > 1 && i.tracks.end <= tracks.len() && !crosses_flex(&tracks, &i.tracks))
        .collect();
    spanning.sort_by_key(|i| i.tracks.len());
    for item in spanning {
        let range = item.tracks.clone();
        let inner_gaps = gap * (range.len() - 1) as f32;
        let spanned = &mut tracks[range];
        let base_sum: f32 = spanned.iter().map(|t| t.base).sum();
        let intrinsic_min = |t: &Track| t.size.min.is_intrinsic();
        let left = distribute(spanned, item.min - inner_gaps - base_sum, intrinsic_min, Target::Base);
        let _ = distribute(spanned, left, intrinsic_min, Target::BaseBeyondLimits);
        let limit_sum: f32 = spanned
            .iter()
            .map(|t| if t.limit.is_finite() { t.limit } else { t.base })
            .sum();
        for track in spanned.iter_mut().filter(|t| t.limit.is_infinite() && t.size.max.is_intrinsic()) {
            track.limit = track.base;
        }
        let _ = distribute(
            spanned,
            item.max - inner_gaps - limit_sum,
            |t| t.size.max.is_intrinsic(),
            Target::Limit,
        );
        for track in spanned.iter_mut() {
            track.limit = track.limit.max(track.base);
        }
    }

    // STEP 4: Items crossing flexible tracks grow the flexible tracks'
    // base sizes in proportion to their flex factors.
    let crossing: Vec<(Range<usize>, f32)> = items
        .iter()
        .filter(|i| i.tracks.len() > 1 && i.tracks.end <= tracks.len() && crosses_flex(&tracks, &i.tracks))
        .map(|i| (i.tracks.clone(), i.min))
        .collect();
    for (range, min) in crossing {
        let inner_gaps = gap * (range.len() - 1) as f32;
        let spanned = &mut tracks[range];
        let extra = min - inner_gaps - spanned.iter().map(|t| t.base).sum::<f32>();
        if extra <= 0.0 {
            continue;
        }
        let factors: f32 = spanned.iter().filter_map(Track::flex).sum();
        let flexible = spanned.iter().filter(|t| t.flex().is_some()).count() as f32;
        for track in spanned.iter_mut() {
            if let Some(factor) = track.flex() {
                track.base += if factors > 0.0 { extra * factor / factors } else { extra / flexible };
            }
        }
    }

    // STEP 5: Infinite growth limits become the base size.
    for track in &mut tracks {
        if track.limit.is_infinite() {
            track.limit = track.base;
        }
    }

    // STEP 6: Maximize tracks.
    match space {
        AvailableSpace::Definite(available) => {
            let free = available - gaps - tracks.iter().map(|t| t.base).sum::<f32>();
            let _ = distribute(&mut tracks, free, |t| t.base < t.limit, Target::Base);
        }
        AvailableSpace::MaxContent => {
            for track in &mut tracks {
                track.base = track.limit;
            }
        }
        AvailableSpace::MinContent => {}
    }

    // STEP 7: Expand flexible tracks.
    let flexible: Vec<usize> = (0..tracks.len()).filter(|&i| tracks[i].flex().is_some()).collect();
    if !flexible.is_empty() {
        let fr = match space {
            AvailableSpace::Definite(available) => find_fr_size(&tracks, available - gaps),
            AvailableSpace::MinContent => 0.0,
            // "If the free space is an indefinite length: The used flex
            // fraction is the maximum of: for each flexible track, if the
            // flexible track's flex factor is greater than one, the result
            // of dividing the track's base size by its flex factor;
            // otherwise, the track's base size. For each grid item that
            // crosses a flexible track, the result of finding the size of
            // an fr using all the grid tracks that the item crosses and a
            // space to fill of the item's max-content contribution."
            AvailableSpace::MaxContent => {
                let from_tracks = flexible
                    .iter()
                    .map(|&i| {
                        let factor = tracks[i].flex().unwrap_or(1.0);
                        if factor > 1.0 { tracks[i].base / factor } else { tracks[i].base }
                    })
                    .fold(0.0, f32::max);
                items
                    .iter()
                    .filter(|i| i.tracks.end <= tracks.len() && crosses_flex(&tracks, &i.tracks))
                    .map(|i| {
                        let inner_gaps = gap * (i.tracks.len() - 1) as f32;
                        find_fr_size(&tracks[i.tracks.clone()], i.max - inner_gaps)
                    })
                    .fold(from_tracks, f32::max)
            }
        };
        for &i in &flexible {
            let factor = tracks[i].flex().unwrap_or(0.0);
            tracks[i].base = tracks[i].base.max(fr * factor);
        }
    }

    // STEP 8: Stretch `auto` tracks into what is left of a definite size.
    if let AvailableSpace::Definite(available) = space
        && flexible.is_empty()
    {
        let free = available - gaps - tracks.iter().map(|t| t.base).sum::<f32>();
        let auto: Vec<usize> = (0..tracks.len())
            .filter(|&i| tracks[i].size.max == TrackBreadth::Auto)
            .collect();
        if free > 0.0 && !auto.is_empty() {
            let share = free / auto.len() as f32;
            for i in auto {
                tracks[i].base += share;
            }
        }
    }

    tracks.into_iter().map(|t| t.base).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    /// Base sizes, up to the growth limits.
    Base,
    /// Base sizes, past the growth limits.
    BaseBeyondLimits,
    /// Growth limits.
    Limit,
}

/// Hand `space` out equally to the tracks selected by `affected`. Returns
/// what could not be handed out.
#[allow(clippy::cast_precision_loss)]
fn distribute(tracks: &mut [Track], mut space: f32, affected: impl Fn(&Track) -> bool, target: Target) -> f32 {
    let mut open: Vec<usize> = (0..tracks.len()).filter(|&i| affected(&tracks[i])).collect();
    while space > 1e-3 && !open.is_empty() {
        let share = space / open.len() as f32;
        let mut still_open = Vec::with_capacity(open.len());
        for i in open {
            let track = &mut tracks[i];
            let grown = match target {
                Target::Base => share.min((track.limit - track.base).max(0.0)),
                Target::BaseBeyondLimits | Target::Limit => share,
            };
            if target == Target::Limit {
                track.limit += grown;
            } else {
                track.base += grown;
            }
            space -= grown;
            if grown >= share {
                still_open.push(i);
            }
        }
        open = still_open;
    }
    space.max(0.0)
}

/// [§ 11.7.1 Find the Size of an fr](https://www.w3.org/TR/css-grid-1/#algo-find-fr-size)
fn find_fr_size(tracks: &[Track], space_to_fill: f32) -> f32 {
    let mut inflexible = vec![false; tracks.len()];
    loop {
        let leftover = space_to_fill
            - tracks
                .iter()
                .zip(&inflexible)
                .filter(|(t, fixed)| t.flex().is_none() || **fixed)
                .map(|(t, _)| t.base)
                .sum::<f32>();
        let factors: f32 = tracks
            .iter()
            .zip(&inflexible)
            .filter(|(_, fixed)| !**fixed)
            .filter_map(|(t, _)| t.flex())
            .sum();
        let hypothetical = leftover / factors.max(1.0);
        let mut changed = false;
        for (track, fixed) in tracks.iter().zip(inflexible.iter_mut()) {
            if let Some(factor) = track.flex()
                && !*fixed
                && hypothetical * factor < track.base
            {
                *fixed = true;
                changed = true;
            }
        }
        if !changed {
            return hypothetical.max(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::template::TrackSizes;

    fn track(s: &str) -> TrackSize {
        let list: TrackSizes = s.parse().unwrap();
        list.0[0]
    }

    fn item(tracks: Range<usize>, min: f32, max: f32) -> Contribution {
        Contribution { tracks, min, max }
    }

    #[test]
    fn fr_takes_definite_free_space() {
        let sizes = [track("auto"), track("1fr")];
        let used = size_tracks(&sizes, &[item(0..1, 2.0, 2.0)], AvailableSpace::Definite(10.0), Some(10.0), 0.0);
        assert_eq!(used, vec![2.0, 8.0]);
    }

    #[test]
    fn fr_uses_max_content_when_space_is_indefinite() {
        let sizes = [track("auto"), track("1fr")];
        let items = [item(0..1, 2.0, 2.0), item(1..2, 10.0, 50.0)];
        let used = size_tracks(&sizes, &items, AvailableSpace::MaxContent, None, 0.0);
        assert_eq!(used, vec![2.0, 50.0]);
    }

    #[test]
    fn fr_factors_share_proportionally() {
        let sizes = [track("1fr"), track("3fr")];
        let used = size_tracks(&sizes, &[], AvailableSpace::Definite(110.0), Some(110.0), 10.0);
        assert_eq!(used, vec![25.0, 75.0]);
    }

    #[test]
    fn auto_tracks_stretch_without_flexible_tracks() {
        let sizes = [track("20px"), track("auto")];
        let used = size_tracks(&sizes, &[item(1..2, 5.0, 10.0)], AvailableSpace::Definite(100.0), Some(100.0), 0.0);
        assert_eq!(used, vec![20.0, 80.0]);
    }

    #[test]
    fn spanning_items_grow_intrinsic_tracks() {
        let sizes = [track("auto"), track("auto")];
        let used = size_tracks(&sizes, &[item(0..2, 40.0, 60.0)], AvailableSpace::MinContent, None, 0.0);
        assert_eq!(used, vec![20.0, 20.0]);
    }
}
