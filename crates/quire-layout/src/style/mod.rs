//! Computed style, as handed to the layout engine.
//!
//! [§ 4.4 Computed Values](https://www.w3.org/TR/css-cascade-4/#computed)
//!
//! The cascade happens upstream; every field here holds a computed value.
//! Documents spell values the way CSS does (`"10px"`, `"repeat(2, 1fr)"`).
//! An unparsable value is dropped in favour of the initial value with a
//! warning, the same way a browser ignores an invalid declaration.

pub mod content;
pub mod values;

use std::str::FromStr;
use std::sync::LazyLock;

use quire_common::warning::warn_once;
use serde::{Deserialize, Deserializer, Serialize};

use crate::background::BackgroundLayers;
use crate::geometry::{Direction, EdgeSizes};
use crate::grid::template::{
    AutoFlow, GridLine, GridLinePair, TemplateAreas, TrackList, TrackSizes,
};

pub use content::{Content, ContentItem, CounterOps, CounterStyle, PageKeyword, StringSet};
pub use values::{
    BorderCollapse, BoxArea, BoxDecorationBreak, BoxSizing, BreakInside, BreakValue, Clear, Color,
    ColumnCount, ColumnFill, ColumnSpan, ContentAlign, Dimension, Display, FlexBasis,
    FlexDirection, FlexWrap, Float, FootnotePolicy, Hyphens, LengthPercentage, LineHeight,
    MaxSize, Overflow, Position, Px, SelfAlign, TableLayout, TextAlign, VerticalAlign, WhiteSpace,
};

use values::RawValue;

/// Deserialize a value through its string form, falling back to the
/// default (initial) value when it does not parse.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
    T::Err: std::fmt::Display,
{
    let raw = RawValue::deserialize(deserializer)?;
    match raw.to_string().parse() {
        Ok(value) => Ok(value),
        Err(err) => {
            let _ = warn_once("Style", &format!("{err}; using the initial value"));
            Ok(T::default())
        }
    }
}

static INITIAL: LazyLock<ComputedStyle> = LazyLock::new(ComputedStyle::default);

/// Computed styles for a box.
///
/// Field names map to CSS property names in kebab-case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ComputedStyle {
    /// [§ 2 'display'](https://www.w3.org/TR/css-display-3/#the-display-properties)
    #[serde(deserialize_with = "lenient")]
    pub display: Display,
    /// [§ 9.3.1 'position'](https://www.w3.org/TR/CSS2/visuren.html#propdef-position)
    #[serde(deserialize_with = "lenient")]
    pub position: Position,
    /// [§ 9.5.1 'float'](https://www.w3.org/TR/CSS2/visuren.html#float-position)
    #[serde(deserialize_with = "lenient")]
    pub float: Float,
    /// [§ 9.5.2 'clear'](https://www.w3.org/TR/CSS2/visuren.html#flow-control)
    #[serde(deserialize_with = "lenient")]
    pub clear: Clear,
    /// Box offsets for positioned boxes.
    #[serde(deserialize_with = "lenient")]
    pub top: Dimension,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub right: Dimension,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub bottom: Dimension,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub left: Dimension,

    /// [§ 10.2 'width'](https://www.w3.org/TR/CSS2/visudet.html#the-width-property)
    #[serde(deserialize_with = "lenient")]
    pub width: Dimension,
    /// [§ 10.5 'height'](https://www.w3.org/TR/CSS2/visudet.html#the-height-property)
    #[serde(deserialize_with = "lenient")]
    pub height: Dimension,
    /// [§ 10.4 Minimum and maximum widths](https://www.w3.org/TR/CSS2/visudet.html#min-max-widths)
    #[serde(deserialize_with = "lenient")]
    pub min_width: LengthPercentage,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub max_width: MaxSize,
    /// [§ 10.7 Minimum and maximum heights](https://www.w3.org/TR/CSS2/visudet.html#min-max-heights)
    #[serde(deserialize_with = "lenient")]
    pub min_height: LengthPercentage,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub max_height: MaxSize,
    /// [§ 4.1 'box-sizing'](https://www.w3.org/TR/css-sizing-3/#box-sizing)
    #[serde(deserialize_with = "lenient")]
    pub box_sizing: BoxSizing,

    /// [§ 8.3 Margin properties](https://www.w3.org/TR/CSS2/box.html#margin-properties)
    #[serde(deserialize_with = "lenient")]
    pub margin_top: Dimension,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub margin_right: Dimension,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub margin_bottom: Dimension,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub margin_left: Dimension,
    /// [§ 8.4 Padding properties](https://www.w3.org/TR/CSS2/box.html#padding-properties)
    #[serde(deserialize_with = "lenient")]
    pub padding_top: LengthPercentage,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub padding_right: LengthPercentage,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub padding_bottom: LengthPercentage,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub padding_left: LengthPercentage,
    /// [§ 8.5.1 Border width](https://www.w3.org/TR/CSS2/box.html#border-width-properties)
    #[serde(deserialize_with = "lenient")]
    pub border_top_width: Px,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub border_right_width: Px,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub border_bottom_width: Px,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub border_left_width: Px,

    /// [§ 2.1 'direction'](https://www.w3.org/TR/css-writing-modes-3/#direction)
    pub direction: Direction,
    /// [§ 11.1.1 'overflow'](https://www.w3.org/TR/CSS2/visufx.html#overflow)
    #[serde(deserialize_with = "lenient")]
    pub overflow: Overflow,

    /// Font family name, used as part of the text measurement key.
    pub font_family: String,
    /// [§ 3.5 'font-size'](https://www.w3.org/TR/css-fonts-4/#font-size-prop)
    #[serde(deserialize_with = "lenient")]
    pub font_size: Px,
    /// [§ 3.2 'font-weight'](https://www.w3.org/TR/css-fonts-4/#font-weight-prop)
    #[serde(deserialize_with = "lenient")]
    pub font_weight: u16,
    /// [§ 4.2 'line-height'](https://www.w3.org/TR/css-inline-3/#line-height-property)
    #[serde(deserialize_with = "lenient")]
    pub line_height: LineHeight,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub white_space: WhiteSpace,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub text_align: TextAlign,
    /// [§ 8.1 'text-indent'](https://www.w3.org/TR/css-text-3/#text-indent-property)
    #[serde(deserialize_with = "lenient")]
    pub text_indent: LengthPercentage,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub vertical_align: VerticalAlign,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub hyphens: Hyphens,
    /// Content language, used for automatic hyphenation.
    pub lang: Option<String>,

    /// [§ 3.1 'break-before'](https://www.w3.org/TR/css-break-3/#break-between)
    #[serde(deserialize_with = "lenient")]
    pub break_before: BreakValue,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub break_after: BreakValue,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub break_inside: BreakInside,
    /// [§ 3.3 'orphans', 'widows'](https://www.w3.org/TR/css-break-3/#widows-orphans)
    #[serde(deserialize_with = "lenient")]
    pub orphans: u32,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub widows: u32,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub box_decoration_break: BoxDecorationBreak,

    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub table_layout: TableLayout,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub border_collapse: BorderCollapse,
    /// [§ 17.6.1 'border-spacing'](https://www.w3.org/TR/CSS2/tables.html#separated-borders)
    #[serde(deserialize_with = "lenient")]
    pub border_spacing: Px,

    /// [§ 7.2 Explicit Track Sizing](https://www.w3.org/TR/css-grid-1/#explicit-grids)
    #[serde(deserialize_with = "lenient")]
    pub grid_template_columns: TrackList,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub grid_template_rows: TrackList,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub grid_template_areas: TemplateAreas,
    /// [§ 7.6 Implicit Track Sizing](https://www.w3.org/TR/css-grid-1/#auto-tracks)
    #[serde(deserialize_with = "lenient")]
    pub grid_auto_columns: TrackSizes,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub grid_auto_rows: TrackSizes,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub grid_auto_flow: AutoFlow,
    /// [§ 8.3 Line-based Placement](https://www.w3.org/TR/css-grid-1/#line-placement)
    #[serde(deserialize_with = "lenient")]
    pub grid_row_start: GridLine,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub grid_row_end: GridLine,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub grid_column_start: GridLine,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub grid_column_end: GridLine,
    /// `grid-row` shorthand, used when both longhands are `auto`.
    #[serde(deserialize_with = "lenient")]
    pub grid_row: GridLinePair,
    /// `grid-column` shorthand, used when both longhands are `auto`.
    #[serde(deserialize_with = "lenient")]
    pub grid_column: GridLinePair,
    /// `grid-area: <name>`
    pub grid_area: Option<String>,
    /// [§ 10.1 Gutters](https://www.w3.org/TR/css-align-3/#gaps)
    #[serde(deserialize_with = "lenient")]
    pub row_gap: LengthPercentage,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub column_gap: LengthPercentage,
    /// [§ 6.1 'justify-self'](https://www.w3.org/TR/css-align-3/#justify-self-property)
    #[serde(deserialize_with = "lenient")]
    pub justify_self: SelfAlign,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub align_self: SelfAlign,
    /// [§ 6.3 'justify-items'](https://www.w3.org/TR/css-align-3/#justify-items-property):
    /// the `auto` fallback for the items' `justify-self`.
    #[serde(deserialize_with = "lenient")]
    pub justify_items: SelfAlign,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub align_items: SelfAlign,
    /// [§ 5.1 'justify-content'](https://www.w3.org/TR/css-align-3/#align-justify-content)
    #[serde(deserialize_with = "lenient")]
    pub justify_content: ContentAlign,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub align_content: ContentAlign,

    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub flex_direction: FlexDirection,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub flex_wrap: FlexWrap,
    /// [§ 7.3 Components of Flexibility](https://www.w3.org/TR/css-flexbox-1/#flex-components)
    #[serde(deserialize_with = "lenient")]
    pub flex_grow: f32,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub flex_shrink: f32,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub flex_basis: FlexBasis,
    /// [§ 5.4 'order'](https://www.w3.org/TR/css-flexbox-1/#order-property)
    #[serde(deserialize_with = "lenient")]
    pub order: i32,

    /// [§ 3 The Number and Width of Columns](https://www.w3.org/TR/css-multicol-1/#the-number-and-width-of-columns)
    #[serde(deserialize_with = "lenient")]
    pub column_count: ColumnCount,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub column_width: Dimension,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub column_fill: ColumnFill,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub column_span: ColumnSpan,

    /// [§ 2 'content'](https://www.w3.org/TR/css-content-3/#content-property)
    #[serde(deserialize_with = "lenient")]
    pub content: Content,
    /// [§ 1.1 'string-set'](https://www.w3.org/TR/css-gcpm-3/#string-set)
    #[serde(deserialize_with = "lenient")]
    pub string_set: StringSet,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub counter_reset: CounterOps,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub counter_increment: CounterOps,
    #[serde(deserialize_with = "lenient")]
    #[allow(missing_docs)]
    pub footnote_policy: FootnotePolicy,

    /// [§ 3.2 'background-color'](https://www.w3.org/TR/css-backgrounds-3/#background-color)
    pub background_color: Option<Color>,
    /// [§ 3.3 'background-image'](https://www.w3.org/TR/css-backgrounds-3/#background-image)
    #[serde(deserialize_with = "lenient")]
    pub background_image: BackgroundLayers,
    /// [§ 3.7 'background-clip'](https://www.w3.org/TR/css-backgrounds-3/#background-clip)
    pub background_clip: Option<BoxArea>,
    /// [§ 3.8 'background-origin'](https://www.w3.org/TR/css-backgrounds-3/#background-origin)
    pub background_origin: Option<BoxArea>,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            position: Position::Static,
            float: Float::None,
            clear: Clear::None,
            top: Dimension::Auto,
            right: Dimension::Auto,
            bottom: Dimension::Auto,
            left: Dimension::Auto,
            width: Dimension::Auto,
            height: Dimension::Auto,
            min_width: LengthPercentage::Px(0.0),
            max_width: MaxSize(None),
            min_height: LengthPercentage::Px(0.0),
            max_height: MaxSize(None),
            box_sizing: BoxSizing::ContentBox,
            margin_top: Dimension::Px(0.0),
            margin_right: Dimension::Px(0.0),
            margin_bottom: Dimension::Px(0.0),
            margin_left: Dimension::Px(0.0),
            padding_top: LengthPercentage::Px(0.0),
            padding_right: LengthPercentage::Px(0.0),
            padding_bottom: LengthPercentage::Px(0.0),
            padding_left: LengthPercentage::Px(0.0),
            border_top_width: Px(0.0),
            border_right_width: Px(0.0),
            border_bottom_width: Px(0.0),
            border_left_width: Px(0.0),
            direction: Direction::Ltr,
            overflow: Overflow::Visible,
            font_family: "serif".to_owned(),
            font_size: Px(16.0),
            font_weight: 400,
            line_height: LineHeight::Normal,
            white_space: WhiteSpace::Normal,
            text_align: TextAlign::Start,
            text_indent: LengthPercentage::Px(0.0),
            vertical_align: VerticalAlign::Baseline,
            hyphens: Hyphens::Manual,
            lang: None,
            break_before: BreakValue::Auto,
            break_after: BreakValue::Auto,
            break_inside: BreakInside::Auto,
            orphans: 2,
            widows: 2,
            box_decoration_break: BoxDecorationBreak::Slice,
            table_layout: TableLayout::Auto,
            border_collapse: BorderCollapse::Separate,
            border_spacing: Px(0.0),
            grid_template_columns: TrackList::default(),
            grid_template_rows: TrackList::default(),
            grid_template_areas: TemplateAreas::default(),
            grid_auto_columns: TrackSizes::default(),
            grid_auto_rows: TrackSizes::default(),
            grid_auto_flow: AutoFlow::default(),
            grid_row_start: GridLine::Auto,
            grid_row_end: GridLine::Auto,
            grid_column_start: GridLine::Auto,
            grid_column_end: GridLine::Auto,
            grid_row: GridLinePair::default(),
            grid_column: GridLinePair::default(),
            grid_area: None,
            row_gap: LengthPercentage::Px(0.0),
            column_gap: LengthPercentage::Px(0.0),
            justify_self: SelfAlign::Auto,
            align_self: SelfAlign::Auto,
            justify_items: SelfAlign::Stretch,
            align_items: SelfAlign::Stretch,
            justify_content: ContentAlign::Normal,
            align_content: ContentAlign::Normal,
            flex_direction: FlexDirection::Row,
            flex_wrap: FlexWrap::Nowrap,
            flex_grow: 0.0,
            flex_shrink: 1.0,
            flex_basis: FlexBasis::Auto,
            order: 0,
            column_count: ColumnCount(None),
            column_width: Dimension::Auto,
            column_fill: ColumnFill::Balance,
            column_span: ColumnSpan::None,
            content: Content::default(),
            string_set: StringSet::default(),
            counter_reset: CounterOps::default(),
            counter_increment: CounterOps::default(),
            footnote_policy: FootnotePolicy::Auto,
            background_color: None,
            background_image: BackgroundLayers::default(),
            background_clip: None,
            background_origin: None,
        }
    }
}

impl ComputedStyle {
    /// The shared initial style, used for boxes that carry none.
    #[must_use]
    pub fn initial() -> &'static Self {
        &INITIAL
    }

    /// Padding resolved against the containing block width.
    ///
    /// [§ 8.4](https://www.w3.org/TR/CSS2/box.html#padding-properties):
    /// percentages refer to the width of the containing block, for all four
    /// sides. Negative values clamp to 0.
    #[must_use]
    pub fn padding(&self, cb_width: f32) -> EdgeSizes {
        EdgeSizes {
            top: self.padding_top.resolve(cb_width).max(0.0),
            right: self.padding_right.resolve(cb_width).max(0.0),
            bottom: self.padding_bottom.resolve(cb_width).max(0.0),
            left: self.padding_left.resolve(cb_width).max(0.0),
        }
    }

    /// Border widths.
    #[must_use]
    pub fn border(&self) -> EdgeSizes {
        EdgeSizes {
            top: self.border_top_width.0.max(0.0),
            right: self.border_right_width.0.max(0.0),
            bottom: self.border_bottom_width.0.max(0.0),
            left: self.border_left_width.0.max(0.0),
        }
    }

    /// Margins with `auto` taken as 0, resolved against `cb_width`.
    #[must_use]
    pub fn margin_or_zero(&self, cb_width: f32) -> EdgeSizes {
        EdgeSizes {
            top: self.margin_top.resolve(cb_width).unwrap_or(0.0),
            right: self.margin_right.resolve(cb_width).unwrap_or(0.0),
            bottom: self.margin_bottom.resolve(cb_width).unwrap_or(0.0),
            left: self.margin_left.resolve(cb_width).unwrap_or(0.0),
        }
    }

    /// Whether the box is floated left or right. Footnotes are not floats
    /// for layout purposes.
    #[must_use]
    pub const fn is_floated(&self) -> bool {
        matches!(self.float, Float::Left | Float::Right)
    }

    /// Out of normal flow: floated, absolutely positioned or running.
    #[must_use]
    pub const fn is_out_of_flow(&self) -> bool {
        self.is_floated()
            || matches!(
                self.position,
                Position::Absolute | Position::Fixed | Position::Running(_)
            )
    }

    /// Whether the box is positioned (a containing block for absolute
    /// descendants).
    #[must_use]
    pub const fn is_positioned(&self) -> bool {
        matches!(
            self.position,
            Position::Relative | Position::Absolute | Position::Fixed
        )
    }

    /// Resolved line height in px, if not `normal`.
    #[must_use]
    pub fn line_height_px(&self) -> Option<f32> {
        match self.line_height {
            LineHeight::Normal => None,
            LineHeight::Number(n) => Some(n * self.font_size.0),
            LineHeight::Px(px) => Some(px),
        }
    }

    /// Whether the box is a multi-column container.
    ///
    /// [§ 2 The multi-column model](https://www.w3.org/TR/css-multicol-1/#the-multi-column-model)
    #[must_use]
    pub const fn is_multicol(&self) -> bool {
        self.column_count.0.is_some() || !matches!(self.column_width, Dimension::Auto)
    }

    /// Placement lines for grid items, longhands over shorthands, an area
    /// name over both.
    #[must_use]
    pub fn grid_placement(&self) -> [GridLine; 4] {
        if let Some(area) = &self.grid_area {
            let line = GridLine::Named(area.clone(), 1);
            return [line.clone(), line.clone(), line.clone(), line];
        }
        let pick = |long: &GridLine, short: &GridLine| {
            if matches!(long, GridLine::Auto) {
                short.clone()
            } else {
                long.clone()
            }
        };
        [
            pick(&self.grid_row_start, &self.grid_row.start),
            pick(&self.grid_row_end, &self.grid_row.end),
            pick(&self.grid_column_start, &self.grid_column.start),
            pick(&self.grid_column_end, &self.grid_column.end),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_values_fall_back_to_initial() {
        let style: ComputedStyle = serde_json::from_value(serde_json::json!({
            "width": "wide",
            "margin-left": 12,
            "orphans": 3,
            "float": "left",
        }))
        .unwrap_or_default();
        assert_eq!(style.width, Dimension::Auto);
        assert_eq!(style.margin_left, Dimension::Px(12.0));
        assert_eq!(style.orphans, 3);
        assert!(style.is_floated());
        assert!(style.is_out_of_flow());
    }

    #[test]
    fn column_properties_make_a_multicol_container() {
        let style: ComputedStyle = serde_json::from_value(serde_json::json!({
            "column-count": 2,
            "flex-grow": "1.5",
        }))
        .unwrap_or_default();
        assert!(style.is_multicol());
        assert!(!ComputedStyle::default().is_multicol());
        assert_eq!(style.flex_grow, 1.5);
        assert_eq!(style.flex_shrink, 1.0);
    }

    #[test]
    fn grid_area_name_applies_to_all_edges() {
        let style = ComputedStyle {
            grid_area: Some("main".into()),
            ..ComputedStyle::default()
        };
        assert_eq!(style.grid_placement()[3], GridLine::Named("main".into(), 1));
    }
}
