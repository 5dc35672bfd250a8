//! Grid template values: track lists, `repeat()`, named areas and lines.
//!
//! [§ 7 Defining the Grid](https://www.w3.org/TR/css-grid-1/#grid-definition)

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StyleParseError;
use crate::style::values::{
    RawValue, parse_percent, parse_px, parse_via_from_str, split_top_level, split_top_level_by,
    unquote,
};

/// One sizing function of a track.
///
/// [§ 7.2.1 Track Sizes](https://www.w3.org/TR/css-grid-1/#track-sizing)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TrackBreadth {
    /// A fixed length.
    Px(f32),
    /// A percentage of the container's content size in that axis.
    Percent(f32),
    /// A flexible share of free space.
    Fr(f32),
    /// `auto`
    Auto,
    /// `min-content`
    MinContent,
    /// `max-content`
    MaxContent,
}

impl TrackBreadth {
    /// The fixed size, if the breadth is definite for `basis`.
    #[must_use]
    pub fn definite(self, basis: Option<f32>) -> Option<f32> {
        match self {
            Self::Px(px) => Some(px),
            Self::Percent(pct) => basis.map(|b| b * pct / 100.0),
            _ => None,
        }
    }

    /// Whether this is one of the intrinsic keywords.
    #[must_use]
    pub const fn is_intrinsic(self) -> bool {
        matches!(self, Self::Auto | Self::MinContent | Self::MaxContent)
    }

    fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s {
            "auto" => return Some(Self::Auto),
            "min-content" => return Some(Self::MinContent),
            "max-content" => return Some(Self::MaxContent),
            _ => {}
        }
        if let Some(fr) = s.strip_suffix("fr") {
            return fr.trim().parse::<f32>().ok().filter(|f| *f >= 0.0).map(Self::Fr);
        }
        if let Some(pct) = parse_percent(s) {
            return Some(Self::Percent(pct));
        }
        parse_px(s).map(Self::Px)
    }
}

/// A track's min and max sizing functions.
///
/// `minmax(a, b)` sets both; a single breadth `b` means `minmax(b, b)`,
/// except that a flexible `b` means `minmax(auto, b)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackSize {
    /// Minimum sizing function.
    pub min: TrackBreadth,
    /// Maximum sizing function.
    pub max: TrackBreadth,
}

impl TrackSize {
    /// `auto`, the initial value of `grid-auto-rows` and `grid-auto-columns`.
    pub const AUTO: Self = Self {
        min: TrackBreadth::Auto,
        max: TrackBreadth::Auto,
    };

    /// Flex factor, if the max sizing function is flexible.
    #[must_use]
    pub const fn flex(self) -> Option<f32> {
        match self.max {
            TrackBreadth::Fr(fr) => Some(fr),
            _ => None,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(args) = s.strip_prefix("minmax(").and_then(|r| r.strip_suffix(')')) {
            let parts = split_top_level_by(args, |c| c == ',');
            let [min, max] = parts.as_slice() else {
                return None;
            };
            let min = TrackBreadth::parse(min)?;
            if matches!(min, TrackBreadth::Fr(_)) {
                return None;
            }
            return Some(Self {
                min,
                max: TrackBreadth::parse(max)?,
            });
        }
        let breadth = TrackBreadth::parse(s)?;
        Some(match breadth {
            TrackBreadth::Fr(_) => Self {
                min: TrackBreadth::Auto,
                max: breadth,
            },
            _ => Self {
                min: breadth,
                max: breadth,
            },
        })
    }

    /// Size used for `auto-fill` repetition counting: the max function if
    /// definite, else the min function, else nothing.
    fn repeat_basis(self, basis: Option<f32>) -> Option<f32> {
        self.max.definite(basis).or_else(|| self.min.definite(basis))
    }
}

/// [§ 7.2.3 Repeating Rows and Columns](https://www.w3.org/TR/css-grid-1/#repeat-notation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeatCount {
    /// `repeat(N, ...)`
    Count(usize),
    /// `repeat(auto-fill, ...)`
    AutoFill,
    /// `repeat(auto-fit, ...)`: like auto-fill, empty repetitions collapse.
    AutoFit,
}

/// One component of a track list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrackListEntry {
    /// A sized track.
    Track(TrackSize),
    /// `[name ...]` before the next track.
    Names(Vec<String>),
    /// `repeat(count, entries)`
    Repeat(RepeatCount, Vec<TrackListEntry>),
}

/// `grid-template-rows` / `grid-template-columns`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
pub struct TrackList(pub Vec<TrackListEntry>);

fn parse_entries(s: &str, allow_repeat: bool) -> Option<Vec<TrackListEntry>> {
    let mut entries = Vec::new();
    for token in split_top_level(s) {
        if let Some(names) = token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            entries.push(TrackListEntry::Names(
                names.split_whitespace().map(str::to_owned).collect(),
            ));
        } else if let Some(args) = token.strip_prefix("repeat(").and_then(|t| t.strip_suffix(')')) {
            if !allow_repeat {
                return None;
            }
            let (count, body) = args.split_once(',')?;
            let count = match count.trim() {
                "auto-fill" => RepeatCount::AutoFill,
                "auto-fit" => RepeatCount::AutoFit,
                n => RepeatCount::Count(n.parse().ok().filter(|n: &usize| *n > 0)?),
            };
            entries.push(TrackListEntry::Repeat(count, parse_entries(body, false)?));
        } else {
            entries.push(TrackListEntry::Track(TrackSize::parse(token)?));
        }
    }
    Some(entries)
}

impl FromStr for TrackList {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim() == "none" {
            return Ok(Self::default());
        }
        let entries =
            parse_entries(s, true).ok_or_else(|| StyleParseError::invalid("track list", s))?;
        let auto_repeats = entries
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    TrackListEntry::Repeat(RepeatCount::AutoFill | RepeatCount::AutoFit, _)
                )
            })
            .count();
        if auto_repeats > 1 {
            return Err(StyleParseError::invalid("track list", s));
        }
        Ok(Self(entries))
    }
}

/// `grid-auto-rows` / `grid-auto-columns`: a non-empty list of track sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
pub struct TrackSizes(pub Vec<TrackSize>);

impl Default for TrackSizes {
    fn default() -> Self {
        Self(vec![TrackSize::AUTO])
    }
}

impl FromStr for TrackSizes {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sizes = split_top_level(s)
            .into_iter()
            .map(TrackSize::parse)
            .collect::<Option<Vec<_>>>()
            .filter(|sizes| !sizes.is_empty())
            .ok_or_else(|| StyleParseError::invalid("track sizes", s))?;
        Ok(Self(sizes))
    }
}

/// A track list with every `repeat()` expanded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExplicitTracks {
    /// Track sizing functions, in order.
    pub sizes: Vec<TrackSize>,
    /// Names of each line; `line_names.len() == sizes.len() + 1`.
    pub line_names: Vec<Vec<String>>,
    /// Indices of tracks generated by `repeat(auto-fit, ...)`.
    pub auto_fit: Vec<usize>,
}

impl TrackList {
    /// [§ 7.2.3.2 Repeat-to-fill](https://www.w3.org/TR/css-grid-1/#auto-repeat)
    ///
    /// Expand into explicit tracks. `available` is the container's content
    /// size in this axis when definite; it drives the auto-repeat count.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn expand(&self, available: Option<f32>, gap: f32) -> ExplicitTracks {
        let mut out = ExplicitTracks {
            line_names: vec![Vec::new()],
            ..ExplicitTracks::default()
        };

        let auto_repeat_count = |body: &[TrackListEntry]| -> usize {
            let Some(available) = available else {
                return 1;
            };
            let repeated: Vec<TrackSize> = body
                .iter()
                .filter_map(|e| match e {
                    TrackListEntry::Track(t) => Some(*t),
                    _ => None,
                })
                .collect();
            let Some(repeat_size) = repeated
                .iter()
                .map(|t| t.repeat_basis(Some(available)))
                .sum::<Option<f32>>()
            else {
                return 1;
            };
            let mut other_tracks = 0_usize;
            let mut other_size = 0.0;
            for entry in &self.0 {
                match entry {
                    TrackListEntry::Track(t) => {
                        other_tracks += 1;
                        other_size += t.repeat_basis(Some(available)).unwrap_or(0.0);
                    }
                    TrackListEntry::Repeat(RepeatCount::Count(n), inner) => {
                        for e in inner {
                            if let TrackListEntry::Track(t) = e {
                                other_tracks += *n;
                                other_size +=
                                    *n as f32 * t.repeat_basis(Some(available)).unwrap_or(0.0);
                            }
                        }
                    }
                    _ => {}
                }
            }
            let free = available - other_size - gap * other_tracks as f32;
            let step = repeat_size + gap * repeated.len() as f32;
            if step <= 0.0 {
                return 1;
            }
            (((free + gap) / step).floor() as usize).max(1)
        };

        for entry in &self.0 {
            match entry {
                TrackListEntry::Track(size) => push_track(&mut out, *size),
                TrackListEntry::Names(names) => push_names(&mut out, names),
                TrackListEntry::Repeat(count, body) => {
                    let (times, fit) = match count {
                        RepeatCount::Count(n) => (*n, false),
                        RepeatCount::AutoFill => (auto_repeat_count(body), false),
                        RepeatCount::AutoFit => (auto_repeat_count(body), true),
                    };
                    for _ in 0..times {
                        for inner in body {
                            match inner {
                                TrackListEntry::Track(size) => {
                                    if fit {
                                        out.auto_fit.push(out.sizes.len());
                                    }
                                    push_track(&mut out, *size);
                                }
                                TrackListEntry::Names(names) => push_names(&mut out, names),
                                TrackListEntry::Repeat(..) => {}
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

fn push_track(out: &mut ExplicitTracks, size: TrackSize) {
    out.sizes.push(size);
    out.line_names.push(Vec::new());
}

fn push_names(out: &mut ExplicitTracks, names: &[String]) {
    if let Some(last) = out.line_names.last_mut() {
        last.extend(names.iter().cloned());
    }
}

/// A rectangle of named cells, as 0-based half-open line ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedArea {
    /// First row line.
    pub row_start: usize,
    /// Row line after the area.
    pub row_end: usize,
    /// First column line.
    pub column_start: usize,
    /// Column line after the area.
    pub column_end: usize,
}

/// [§ 7.3 Named Areas](https://www.w3.org/TR/css-grid-1/#grid-template-areas-property)
///
/// Parsed into a rectangular inventory; `.` sequences are empty cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
pub struct TemplateAreas {
    /// Number of rows spanned by the template.
    pub rows: usize,
    /// Number of columns spanned by the template.
    pub columns: usize,
    /// Named areas.
    pub areas: HashMap<String, NamedArea>,
}

impl FromStr for TemplateAreas {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StyleParseError::invalid("grid-template-areas", s);
        if s.trim() == "none" {
            return Ok(Self::default());
        }
        let mut grid: Vec<Vec<Option<String>>> = Vec::new();
        for row in split_top_level(s) {
            let row = unquote(row).ok_or_else(invalid)?;
            let cells: Vec<Option<String>> = row
                .split_whitespace()
                .map(|cell| {
                    if cell.chars().all(|c| c == '.') {
                        None
                    } else {
                        Some(cell.to_owned())
                    }
                })
                .collect();
            if cells.is_empty() || grid.first().is_some_and(|first| first.len() != cells.len()) {
                return Err(invalid());
            }
            grid.push(cells);
        }

        let mut areas: HashMap<String, NamedArea> = HashMap::new();
        for (r, row) in grid.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let Some(name) = cell else { continue };
                let area = areas.entry(name.clone()).or_insert(NamedArea {
                    row_start: r,
                    row_end: r + 1,
                    column_start: c,
                    column_end: c + 1,
                });
                area.row_end = area.row_end.max(r + 1);
                area.column_end = area.column_end.max(c + 1);
            }
        }

        // Every cell inside an area's bounding box must carry its name.
        for (name, area) in &areas {
            let cells = (area.row_end - area.row_start) * (area.column_end - area.column_start);
            let named = grid
                .iter()
                .flatten()
                .filter(|cell| cell.as_deref() == Some(name.as_str()))
                .count();
            let covered = grid[area.row_start..area.row_end].iter().all(|row| {
                row[area.column_start..area.column_end]
                    .iter()
                    .all(|cell| cell.as_deref() == Some(name.as_str()))
            });
            if !covered || named != cells {
                return Err(invalid());
            }
        }

        Ok(Self {
            rows: grid.len(),
            columns: grid.first().map_or(0, Vec::len),
            areas,
        })
    }
}

/// Largest line number or span a placement may use.
///
/// [§ 7.1 The Explicit Grid](https://www.w3.org/TR/css-grid-1/#overlarge-grids):
/// "UAs may clamp the possible size of the implicit grid to be within a
/// UA-defined limit."
pub const MAX_GRID_LINE: i32 = 1000;

/// [§ 8.3 Line-based Placement](https://www.w3.org/TR/css-grid-1/#line-placement)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
pub enum GridLine {
    /// `auto`
    #[default]
    Auto,
    /// A 1-based line number; negative counts from the explicit end.
    Line(i32),
    /// `span N`
    Span(u32),
    /// A named line or area, with an occurrence count.
    Named(String, i32),
}

impl FromStr for GridLine {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StyleParseError::invalid("grid line", s);
        let tokens: Vec<&str> = s.split_whitespace().collect();
        match tokens.as_slice() {
            ["auto"] => Ok(Self::Auto),
            ["span"] => Ok(Self::Span(1)),
            ["span", n] | [n, "span"] => n
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .map(|n| Self::Span(n.min(MAX_GRID_LINE.unsigned_abs())))
                .ok_or_else(invalid),
            [n] if n.parse::<i32>().is_ok() => match n.parse::<i32>() {
                Ok(0) | Err(_) => Err(invalid()),
                Ok(line) => Ok(Self::Line(line.clamp(-MAX_GRID_LINE, MAX_GRID_LINE))),
            },
            [name] => Ok(Self::Named((*name).to_owned(), 1)),
            [a, b] => {
                let (name, count) = match (a.parse::<i32>(), b.parse::<i32>()) {
                    (Ok(n), Err(_)) => (b, n),
                    (Err(_), Ok(n)) => (a, n),
                    _ => return Err(invalid()),
                };
                if count == 0 {
                    return Err(invalid());
                }
                Ok(Self::Named((*name).to_owned(), count.clamp(-MAX_GRID_LINE, MAX_GRID_LINE)))
            }
            _ => Err(invalid()),
        }
    }
}

/// `grid-row` / `grid-column` shorthand: `start [/ end]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
pub struct GridLinePair {
    /// Start line.
    pub start: GridLine,
    /// End line.
    pub end: GridLine,
}

impl FromStr for GridLinePair {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((start, end)) => Ok(Self {
                start: start.parse()?,
                end: end.parse()?,
            }),
            None => {
                let start: GridLine = s.parse()?;
                // A lone custom ident applies to both edges.
                let end = match &start {
                    GridLine::Named(name, 1) => GridLine::Named(name.clone(), 1),
                    _ => GridLine::Auto,
                };
                Ok(Self { start, end })
            }
        }
    }
}

/// [§ 7.7 'grid-auto-flow'](https://www.w3.org/TR/css-grid-1/#grid-auto-flow-property)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
pub struct AutoFlow {
    /// Fill columns before rows.
    pub column: bool,
    /// Re-scan from the grid start for every auto-placed item.
    pub dense: bool,
}

impl FromStr for AutoFlow {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flow = Self::default();
        for token in s.split_whitespace() {
            match token {
                "row" => flow.column = false,
                "column" => flow.column = true,
                "dense" => flow.dense = true,
                _ => return Err(StyleParseError::invalid("grid-auto-flow", s)),
            }
        }
        Ok(flow)
    }
}

parse_via_from_str!(TrackList, TrackSizes, TemplateAreas, GridLine, GridLinePair, AutoFlow);

#[cfg(test)]
mod tests {
    use super::*;

    fn px(v: f32) -> TrackSize {
        TrackSize {
            min: TrackBreadth::Px(v),
            max: TrackBreadth::Px(v),
        }
    }

    #[test]
    fn repeat_count_expands_with_line_names() {
        let list: TrackList = "[a] repeat(2, [row] 10px) 1fr".parse().unwrap_or_default();
        let tracks = list.expand(None, 0.0);
        assert_eq!(tracks.sizes.len(), 3);
        assert_eq!(tracks.sizes[0], px(10.0));
        assert_eq!(tracks.line_names[0], vec!["a".to_owned(), "row".to_owned()]);
        assert_eq!(tracks.line_names[1], vec!["row".to_owned()]);
        assert_eq!(tracks.sizes[2].flex(), Some(1.0));
    }

    #[test]
    fn auto_fill_counts_against_definite_space() {
        let list: TrackList = "repeat(auto-fill, 30px)".parse().unwrap_or_default();
        assert_eq!(list.expand(Some(100.0), 10.0).sizes.len(), 2);
        assert_eq!(list.expand(Some(100.0), 0.0).sizes.len(), 3);
        assert_eq!(list.expand(None, 0.0).sizes.len(), 1);
    }

    #[test]
    fn areas_must_be_rectangular() {
        let areas: TemplateAreas = "\"head head\" \"side main\"".parse().unwrap_or_default();
        assert_eq!(areas.rows, 2);
        assert_eq!(
            areas.areas["head"],
            NamedArea {
                row_start: 0,
                row_end: 1,
                column_start: 0,
                column_end: 2
            }
        );
        assert!("\"a b\" \"b a\"".parse::<TemplateAreas>().is_err());
        assert!("\"a . \" \"a\"".parse::<TemplateAreas>().is_err());
    }

    #[test]
    fn grid_lines_parse() {
        assert_eq!("span 2".parse::<GridLine>().ok(), Some(GridLine::Span(2)));
        assert_eq!("-1".parse::<GridLine>().ok(), Some(GridLine::Line(-1)));
        assert_eq!(
            "main 2".parse::<GridLine>().ok(),
            Some(GridLine::Named("main".into(), 2))
        );
        assert!("0".parse::<GridLine>().is_err());
    }
}
