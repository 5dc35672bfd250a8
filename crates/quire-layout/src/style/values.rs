//! Computed value types and their string forms.
//!
//! [CSS Values and Units Level 4](https://www.w3.org/TR/css-values-4/)
//!
//! Styles arrive already computed, so every length here is absolute
//! (px, or a unit with a fixed px ratio) or a percentage still waiting for
//! its containing block.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StyleParseError;

/// A raw JSON scalar before it is parsed into a typed value.
///
/// Lets documents write `"margin-top": 10` as well as `"margin-top": "10px"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// A CSS-like string.
    Text(String),
    /// A bare number (px for lengths).
    Number(f64),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Implement `TryFrom<RawValue>` through `FromStr`, so the type can be used
/// with `#[serde(try_from = "RawValue")]`.
macro_rules! parse_via_from_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl TryFrom<RawValue> for $ty {
                type Error = StyleParseError;

                fn try_from(raw: RawValue) -> Result<Self, Self::Error> {
                    raw.to_string().parse()
                }
            }
        )*
    };
}
pub(crate) use parse_via_from_str;

/// Implement `FromStr` for a keyword enum from a `"keyword" => Variant` table.
macro_rules! keyword_enum {
    ($ty:ident, $kind:literal, { $($kw:literal => $variant:ident),* $(,)? }) => {
        impl FromStr for $ty {
            type Err = StyleParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($kw => Ok(Self::$variant),)*
                    _ => Err(StyleParseError::invalid($kind, s)),
                }
            }
        }
        parse_via_from_str!($ty);
    };
}

/// [§ 6.1 Absolute lengths](https://www.w3.org/TR/css-values-4/#absolute-lengths)
///
/// Parse an absolute length to px. A bare number is taken as px.
pub(crate) fn parse_px(s: &str) -> Option<f32> {
    let s = s.trim();
    let (number, scale) = if let Some(n) = s.strip_suffix("px") {
        (n, 1.0)
    } else if let Some(n) = s.strip_suffix("pt") {
        (n, 96.0 / 72.0)
    } else if let Some(n) = s.strip_suffix("pc") {
        (n, 16.0)
    } else if let Some(n) = s.strip_suffix("in") {
        (n, 96.0)
    } else if let Some(n) = s.strip_suffix("cm") {
        (n, 96.0 / 2.54)
    } else if let Some(n) = s.strip_suffix("mm") {
        (n, 96.0 / 25.4)
    } else {
        (s, 1.0)
    };
    let value: f32 = number.trim().parse().ok()?;
    value.is_finite().then_some(value * scale)
}

/// Parse `N%` to its number.
pub(crate) fn parse_percent(s: &str) -> Option<f32> {
    let value: f32 = s.trim().strip_suffix('%')?.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

/// An absolute length in px (border widths, font sizes, spacing).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
pub struct Px(pub f32);

impl FromStr for Px {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_px(s)
            .map(Self)
            .ok_or_else(|| StyleParseError::invalid("length", s))
    }
}

/// [§ 4.3 Percentages](https://www.w3.org/TR/css-values-4/#percentages)
///
/// `<length-percentage>`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
pub enum LengthPercentage {
    /// Absolute length in px.
    Px(f32),
    /// Percentage of a reference length.
    Percent(f32),
}

impl Default for LengthPercentage {
    fn default() -> Self {
        Self::Px(0.0)
    }
}

impl LengthPercentage {
    /// Resolve against `reference`.
    #[must_use]
    pub fn resolve(self, reference: f32) -> f32 {
        match self {
            Self::Px(px) => px,
            Self::Percent(pct) => reference * pct / 100.0,
        }
    }

    /// Resolve against a possibly indefinite reference; percentages of an
    /// indefinite size resolve to `None`.
    #[must_use]
    pub fn resolve_definite(self, reference: Option<f32>) -> Option<f32> {
        match self {
            Self::Px(px) => Some(px),
            Self::Percent(pct) => reference.map(|r| r * pct / 100.0),
        }
    }
}

impl FromStr for LengthPercentage {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(pct) = parse_percent(s) {
            return Ok(Self::Percent(pct));
        }
        parse_px(s)
            .map(Self::Px)
            .ok_or_else(|| StyleParseError::invalid("length-percentage", s))
    }
}

/// `auto | <length-percentage>`, used by width, height, margins and offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
pub enum Dimension {
    /// `auto`
    #[default]
    Auto,
    /// Absolute length in px.
    Px(f32),
    /// Percentage of the containing block.
    Percent(f32),
}

impl Dimension {
    /// Whether the value is `auto`.
    #[must_use]
    pub const fn is_auto(self) -> bool {
        matches!(self, Self::Auto)
    }

    /// Resolve against a definite reference; `auto` stays `None`.
    #[must_use]
    pub fn resolve(self, reference: f32) -> Option<f32> {
        match self {
            Self::Auto => None,
            Self::Px(px) => Some(px),
            Self::Percent(pct) => Some(reference * pct / 100.0),
        }
    }

    /// Resolve against a possibly indefinite reference. A percentage of an
    /// indefinite size behaves as `auto`.
    #[must_use]
    pub fn resolve_definite(self, reference: Option<f32>) -> Option<f32> {
        match self {
            Self::Auto => None,
            Self::Px(px) => Some(px),
            Self::Percent(pct) => reference.map(|r| r * pct / 100.0),
        }
    }

    /// The percentage, if this is one.
    #[must_use]
    pub const fn percent(self) -> Option<f32> {
        match self {
            Self::Percent(pct) => Some(pct),
            _ => None,
        }
    }

    /// The absolute length, if this is one.
    #[must_use]
    pub const fn px(self) -> Option<f32> {
        match self {
            Self::Px(px) => Some(px),
            _ => None,
        }
    }
}

impl FromStr for Dimension {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        match s.parse::<LengthPercentage>() {
            Ok(LengthPercentage::Px(px)) => Ok(Self::Px(px)),
            Ok(LengthPercentage::Percent(pct)) => Ok(Self::Percent(pct)),
            Err(_) => Err(StyleParseError::invalid("dimension", s)),
        }
    }
}

/// `none | <length-percentage>`, used by max-width and max-height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
pub struct MaxSize(pub Option<LengthPercentage>);

impl FromStr for MaxSize {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("none") {
            Ok(Self(None))
        } else {
            s.parse().map(|lp| Self(Some(lp)))
        }
    }
}

/// [§ 4.2 'line-height'](https://www.w3.org/TR/css-inline-3/#line-height-property)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
pub enum LineHeight {
    /// `normal`, taken from the font's strut.
    #[default]
    Normal,
    /// A multiple of the font size.
    Number(f32),
    /// An absolute height.
    Px(f32),
}

impl FromStr for LineHeight {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("normal") {
            return Ok(Self::Normal);
        }
        if let Ok(number) = trimmed.parse::<f32>() {
            return Ok(Self::Number(number));
        }
        if let Some(pct) = parse_percent(trimmed) {
            return Ok(Self::Number(pct / 100.0));
        }
        parse_px(trimmed)
            .map(Self::Px)
            .ok_or_else(|| StyleParseError::invalid("line-height", s))
    }
}

/// [§ 4 Color syntax](https://www.w3.org/TR/css-color-4/#color-syntax)
/// sRGB color represented as RGBA components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel, 255 is opaque.
    pub a: u8,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    /// Black.
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);
    /// White.
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);

    /// Build from channels.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// [§ 4.2 The RGB hexadecimal notations](https://www.w3.org/TR/css-color-4/#hex-notation)
    fn from_hex(hex: &str) -> Option<Self> {
        let digit = |i: usize, len: usize| -> Option<u8> {
            let part = hex.get(i * len..(i + 1) * len)?;
            let value = u8::from_str_radix(part, 16).ok()?;
            Some(if len == 1 { value * 17 } else { value })
        };
        match hex.len() {
            3 => Some(Self::rgba(digit(0, 1)?, digit(1, 1)?, digit(2, 1)?, 255)),
            4 => Some(Self::rgba(digit(0, 1)?, digit(1, 1)?, digit(2, 1)?, digit(3, 1)?)),
            6 => Some(Self::rgba(digit(0, 2)?, digit(1, 2)?, digit(2, 2)?, 255)),
            8 => Some(Self::rgba(digit(0, 2)?, digit(1, 2)?, digit(2, 2)?, digit(3, 2)?)),
            _ => None,
        }
    }

    /// [§ 4.1 The RGB functions](https://www.w3.org/TR/css-color-4/#rgb-functions)
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn from_function(args: &str) -> Option<Self> {
        let parts: Vec<&str> = args
            .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() != 3 && parts.len() != 4 {
            return None;
        }
        let channel = |p: &str| -> Option<u8> {
            let value = match parse_percent(p) {
                Some(pct) => pct * 2.55,
                None => p.parse::<f32>().ok()?,
            };
            Some(value.round().clamp(0.0, 255.0) as u8)
        };
        let alpha = match parts.get(3) {
            Some(p) => {
                let value = match parse_percent(p) {
                    Some(pct) => pct / 100.0,
                    None => p.parse::<f32>().ok()?,
                };
                (value.clamp(0.0, 1.0) * 255.0).round() as u8
            }
            None => 255,
        };
        Some(Self::rgba(
            channel(parts[0])?,
            channel(parts[1])?,
            channel(parts[2])?,
            alpha,
        ))
    }
}

impl FromStr for Color {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        let parsed = if let Some(hex) = value.strip_prefix('#') {
            Self::from_hex(hex)
        } else if let Some(args) = value
            .strip_prefix("rgba(")
            .or_else(|| value.strip_prefix("rgb("))
        {
            args.strip_suffix(')').and_then(Self::from_function)
        } else {
            match value.as_str() {
                "transparent" => Some(Self::TRANSPARENT),
                "black" => Some(Self::BLACK),
                "white" => Some(Self::WHITE),
                "red" => Some(Self::rgba(255, 0, 0, 255)),
                "green" => Some(Self::rgba(0, 128, 0, 255)),
                "blue" => Some(Self::rgba(0, 0, 255, 255)),
                "gray" | "grey" => Some(Self::rgba(128, 128, 128, 255)),
                "yellow" => Some(Self::rgba(255, 255, 0, 255)),
                _ => None,
            }
        };
        parsed.ok_or_else(|| StyleParseError::invalid("color", s))
    }
}

parse_via_from_str!(Px, LengthPercentage, Dimension, MaxSize, LineHeight, Color);

/// [§ 2 'display'](https://www.w3.org/TR/css-display-3/#the-display-properties)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[allow(missing_docs)]
pub enum Display {
    #[default]
    Block,
    Inline,
    InlineBlock,
    ListItem,
    Table,
    InlineTable,
    TableCaption,
    TableHeaderGroup,
    TableRowGroup,
    TableFooterGroup,
    TableRow,
    TableCell,
    TableColumnGroup,
    TableColumn,
    Grid,
    InlineGrid,
    Flex,
    InlineFlex,
    None,
}

keyword_enum!(Display, "display", {
    "block" => Block,
    "inline" => Inline,
    "inline-block" => InlineBlock,
    "list-item" => ListItem,
    "flow-root" => Block,
    "table" => Table,
    "inline-table" => InlineTable,
    "table-caption" => TableCaption,
    "table-header-group" => TableHeaderGroup,
    "table-row-group" => TableRowGroup,
    "table-footer-group" => TableFooterGroup,
    "table-row" => TableRow,
    "table-cell" => TableCell,
    "table-column-group" => TableColumnGroup,
    "table-column" => TableColumn,
    "grid" => Grid,
    "inline-grid" => InlineGrid,
    "flex" => Flex,
    "inline-flex" => InlineFlex,
    "none" => None,
});

/// [§ 9.3.1 'position'](https://www.w3.org/TR/CSS2/visuren.html#propdef-position)
/// extended with [`running()`](https://www.w3.org/TR/css-gcpm-3/#running-elements).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
pub enum Position {
    /// In normal flow.
    #[default]
    Static,
    /// In flow, then offset.
    Relative,
    /// Out of flow, against the nearest positioned ancestor.
    Absolute,
    /// Out of flow, against the page area, repeated on every page.
    Fixed,
    /// Removed from flow and made available to page margin boxes.
    Running(String),
}

impl Position {
    /// Absolute or fixed.
    #[must_use]
    pub const fn is_absolutely_positioned(&self) -> bool {
        matches!(self, Self::Absolute | Self::Fixed)
    }
}

impl FromStr for Position {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if let Some(name) = value
            .strip_prefix("running(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Ok(Self::Running(name.trim().to_owned()));
        }
        match value.to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "relative" => Ok(Self::Relative),
            "absolute" => Ok(Self::Absolute),
            "fixed" => Ok(Self::Fixed),
            _ => Err(StyleParseError::invalid("position", s)),
        }
    }
}
parse_via_from_str!(Position);

/// [§ 5.5 Floats](https://www.w3.org/TR/CSS2/visuren.html#float-position)
/// extended with [`footnote`](https://www.w3.org/TR/css-gcpm-3/#footnotes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[allow(missing_docs)]
pub enum Float {
    #[default]
    None,
    Left,
    Right,
    Footnote,
}

keyword_enum!(Float, "float", {
    "none" => None,
    "left" => Left,
    "right" => Right,
    "footnote" => Footnote,
});

/// [§ 9.5.2 'clear'](https://www.w3.org/TR/CSS2/visuren.html#flow-control)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[allow(missing_docs)]
pub enum Clear {
    #[default]
    None,
    Left,
    Right,
    Both,
}

keyword_enum!(Clear, "clear", {
    "none" => None,
    "left" => Left,
    "right" => Right,
    "both" => Both,
});

/// [§ 11.1.1 'overflow'](https://www.w3.org/TR/CSS2/visufx.html#overflow)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[allow(missing_docs)]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    Scroll,
    Auto,
}

keyword_enum!(Overflow, "overflow", {
    "visible" => Visible,
    "hidden" => Hidden,
    "clip" => Hidden,
    "scroll" => Scroll,
    "auto" => Auto,
});

/// [§ 4.1 'box-sizing'](https://www.w3.org/TR/css-sizing-3/#box-sizing)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[allow(missing_docs)]
pub enum BoxSizing {
    #[default]
    ContentBox,
    PaddingBox,
    BorderBox,
}

keyword_enum!(BoxSizing, "box-sizing", {
    "content-box" => ContentBox,
    "padding-box" => PaddingBox,
    "border-box" => BorderBox,
});

/// [§ 3.1 Breaks between boxes](https://www.w3.org/TR/css-break-3/#break-between)
#[derive(Debug, strum_macros::Display, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[strum(serialize_all = "kebab-case")]
#[allow(missing_docs)]
pub enum BreakValue {
    #[default]
    Auto,
    Avoid,
    AvoidPage,
    Page,
    Left,
    Right,
    Recto,
    Verso,
}

keyword_enum!(BreakValue, "break", {
    "auto" => Auto,
    "avoid" => Avoid,
    "avoid-page" => AvoidPage,
    "page" => Page,
    "always" => Page,
    "left" => Left,
    "right" => Right,
    "recto" => Recto,
    "verso" => Verso,
});

impl BreakValue {
    /// Whether this value forces a page break.
    #[must_use]
    pub const fn is_forced(self) -> bool {
        matches!(
            self,
            Self::Page | Self::Left | Self::Right | Self::Recto | Self::Verso
        )
    }

    /// Whether this value asks to avoid a break.
    #[must_use]
    pub const fn is_avoid(self) -> bool {
        matches!(self, Self::Avoid | Self::AvoidPage)
    }
}

/// [§ 3.2 Breaks within boxes](https://www.w3.org/TR/css-break-3/#break-within)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[allow(missing_docs)]
pub enum BreakInside {
    #[default]
    Auto,
    Avoid,
}

keyword_enum!(BreakInside, "break-inside", {
    "auto" => Auto,
    "avoid" => Avoid,
    "avoid-page" => Avoid,
});

/// [§ 5.4 'box-decoration-break'](https://www.w3.org/TR/css-break-3/#break-decoration)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[allow(missing_docs)]
pub enum BoxDecorationBreak {
    #[default]
    Slice,
    Clone,
}

keyword_enum!(BoxDecorationBreak, "box-decoration-break", {
    "slice" => Slice,
    "clone" => Clone,
});

/// [§ 3 'white-space'](https://www.w3.org/TR/css-text-3/#white-space-property)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[allow(missing_docs)]
pub enum WhiteSpace {
    #[default]
    Normal,
    Pre,
    Nowrap,
    PreWrap,
    PreLine,
}

keyword_enum!(WhiteSpace, "white-space", {
    "normal" => Normal,
    "pre" => Pre,
    "nowrap" => Nowrap,
    "pre-wrap" => PreWrap,
    "pre-line" => PreLine,
});

impl WhiteSpace {
    /// Whether runs of spaces collapse.
    #[must_use]
    pub const fn collapses_spaces(self) -> bool {
        matches!(self, Self::Normal | Self::Nowrap | Self::PreLine)
    }

    /// Whether newlines are forced breaks.
    #[must_use]
    pub const fn preserves_newlines(self) -> bool {
        matches!(self, Self::Pre | Self::PreWrap | Self::PreLine)
    }

    /// Whether lines may wrap at soft opportunities.
    #[must_use]
    pub const fn wraps(self) -> bool {
        matches!(self, Self::Normal | Self::PreWrap | Self::PreLine)
    }
}

/// [§ 7.1 'text-align'](https://www.w3.org/TR/css-text-3/#text-align-property)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[allow(missing_docs)]
pub enum TextAlign {
    #[default]
    Start,
    End,
    Left,
    Right,
    Center,
    Justify,
}

keyword_enum!(TextAlign, "text-align", {
    "start" => Start,
    "end" => End,
    "left" => Left,
    "right" => Right,
    "center" => Center,
    "justify" => Justify,
});

/// [§ 10.8.1 'vertical-align'](https://www.w3.org/TR/CSS2/visudet.html#propdef-vertical-align)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[allow(missing_docs)]
pub enum VerticalAlign {
    #[default]
    Baseline,
    Top,
    Middle,
    Bottom,
    TextTop,
    TextBottom,
}

keyword_enum!(VerticalAlign, "vertical-align", {
    "baseline" => Baseline,
    "top" => Top,
    "middle" => Middle,
    "bottom" => Bottom,
    "text-top" => TextTop,
    "text-bottom" => TextBottom,
});

/// [§ 6.1 'hyphens'](https://www.w3.org/TR/css-text-3/#hyphens-property)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[allow(missing_docs)]
pub enum Hyphens {
    None,
    #[default]
    Manual,
    Auto,
}

keyword_enum!(Hyphens, "hyphens", {
    "none" => None,
    "manual" => Manual,
    "auto" => Auto,
});

/// [§ 17.5.2 'table-layout'](https://www.w3.org/TR/CSS2/tables.html#width-layout)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[allow(missing_docs)]
pub enum TableLayout {
    #[default]
    Auto,
    Fixed,
}

keyword_enum!(TableLayout, "table-layout", {
    "auto" => Auto,
    "fixed" => Fixed,
});

/// [§ 17.6 'border-collapse'](https://www.w3.org/TR/CSS2/tables.html#borders)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[allow(missing_docs)]
pub enum BorderCollapse {
    #[default]
    Separate,
    Collapse,
}

keyword_enum!(BorderCollapse, "border-collapse", {
    "separate" => Separate,
    "collapse" => Collapse,
});

/// [`footnote-policy`](https://www.w3.org/TR/css-gcpm-3/#footnote-policy)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[allow(missing_docs)]
pub enum FootnotePolicy {
    #[default]
    Auto,
    Line,
    Block,
}

keyword_enum!(FootnotePolicy, "footnote-policy", {
    "auto" => Auto,
    "line" => Line,
    "block" => Block,
});

/// [§ 6 Self-Alignment](https://www.w3.org/TR/css-align-3/#self-alignment)
///
/// `auto` defers to the container's `align-items`; grid and flex layout
/// resolve it with [`SelfAlign::or`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[allow(missing_docs)]
pub enum SelfAlign {
    #[default]
    Auto,
    Stretch,
    Start,
    Center,
    End,
}

keyword_enum!(SelfAlign, "self-alignment", {
    "auto" => Auto,
    "normal" => Stretch,
    "stretch" => Stretch,
    "start" => Start,
    "self-start" => Start,
    "flex-start" => Start,
    "center" => Center,
    "end" => End,
    "self-end" => End,
    "flex-end" => End,
});

impl SelfAlign {
    /// This value, or `fallback` when it is `auto`.
    #[must_use]
    pub const fn or(self, fallback: Self) -> Self {
        match self {
            Self::Auto => fallback,
            other => other,
        }
    }
}

/// [§ 5 Content Distribution](https://www.w3.org/TR/css-align-3/#content-distribution),
/// used by `justify-content` and `align-content`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[allow(missing_docs)]
pub enum ContentAlign {
    #[default]
    Normal,
    Start,
    End,
    Center,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
    Stretch,
}

keyword_enum!(ContentAlign, "content distribution", {
    "normal" => Normal,
    "start" => Start,
    "flex-start" => Start,
    "end" => End,
    "flex-end" => End,
    "center" => Center,
    "space-between" => SpaceBetween,
    "space-around" => SpaceAround,
    "space-evenly" => SpaceEvenly,
    "stretch" => Stretch,
});

impl ContentAlign {
    /// `(leading offset, extra gap between neighbours)` that distributes
    /// `free` space over `count` subjects. Negative free space falls back
    /// to start for the space-* values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn distribute(self, free: f32, count: usize) -> (f32, f32) {
        let n = count as f32;
        match self {
            Self::End => (free, 0.0),
            Self::Center => (free / 2.0, 0.0),
            Self::SpaceBetween if free > 0.0 && count > 1 => (0.0, free / (n - 1.0)),
            Self::SpaceAround if free > 0.0 && count > 0 => (free / n / 2.0, free / n),
            Self::SpaceEvenly if free > 0.0 && count > 0 => (free / (n + 1.0), free / (n + 1.0)),
            Self::SpaceAround | Self::SpaceEvenly if count > 0 => (free / 2.0, 0.0),
            _ => (0.0, 0.0),
        }
    }
}

/// [§ 5.1 'flex-direction'](https://www.w3.org/TR/css-flexbox-1/#flex-direction-property)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[allow(missing_docs)]
pub enum FlexDirection {
    #[default]
    Row,
    RowReverse,
    Column,
    ColumnReverse,
}

keyword_enum!(FlexDirection, "flex-direction", {
    "row" => Row,
    "row-reverse" => RowReverse,
    "column" => Column,
    "column-reverse" => ColumnReverse,
});

impl FlexDirection {
    /// Whether the main axis is horizontal.
    #[must_use]
    pub const fn is_row(self) -> bool {
        matches!(self, Self::Row | Self::RowReverse)
    }

    /// Whether main-start and main-end are swapped.
    #[must_use]
    pub const fn is_reverse(self) -> bool {
        matches!(self, Self::RowReverse | Self::ColumnReverse)
    }
}

/// [§ 5.2 'flex-wrap'](https://www.w3.org/TR/css-flexbox-1/#flex-wrap-property)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[allow(missing_docs)]
pub enum FlexWrap {
    #[default]
    Nowrap,
    Wrap,
    WrapReverse,
}

keyword_enum!(FlexWrap, "flex-wrap", {
    "nowrap" => Nowrap,
    "wrap" => Wrap,
    "wrap-reverse" => WrapReverse,
});

/// [§ 7.3.3 'flex-basis'](https://www.w3.org/TR/css-flexbox-1/#flex-basis-property)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
pub enum FlexBasis {
    /// Use the main size property.
    #[default]
    Auto,
    /// Size from the item's content.
    Content,
    /// A definite basis.
    Length(LengthPercentage),
}

impl FromStr for FlexBasis {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "content" => Ok(Self::Content),
            other => other
                .parse()
                .map(Self::Length)
                .map_err(|_| StyleParseError::invalid("flex-basis", s)),
        }
    }
}
parse_via_from_str!(FlexBasis);

/// [§ 3.1 'column-count'](https://www.w3.org/TR/css-multicol-1/#cc):
/// `auto` or a positive integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
pub struct ColumnCount(pub Option<u32>);

impl FromStr for ColumnCount {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self(None));
        }
        match s.parse::<u32>() {
            Ok(n) if n > 0 => Ok(Self(Some(n))),
            _ => Err(StyleParseError::invalid("column-count", s)),
        }
    }
}
parse_via_from_str!(ColumnCount);

/// [§ 7.1 'column-fill'](https://www.w3.org/TR/css-multicol-1/#cf)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[allow(missing_docs)]
pub enum ColumnFill {
    #[default]
    Balance,
    Auto,
}

keyword_enum!(ColumnFill, "column-fill", {
    "balance" => Balance,
    "balance-all" => Balance,
    "auto" => Auto,
});

/// [§ 6.1 'column-span'](https://www.w3.org/TR/css-multicol-1/#column-span)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[allow(missing_docs)]
pub enum ColumnSpan {
    #[default]
    None,
    All,
}

keyword_enum!(ColumnSpan, "column-span", {
    "none" => None,
    "all" => All,
});

/// Which box area a background is clipped to or positioned in.
///
/// [§ 3.7 'background-clip'](https://www.w3.org/TR/css-backgrounds-3/#background-clip)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
#[allow(missing_docs)]
pub enum BoxArea {
    BorderBox,
    PaddingBox,
    ContentBox,
}

keyword_enum!(BoxArea, "box area", {
    "border-box" => BorderBox,
    "padding-box" => PaddingBox,
    "content-box" => ContentBox,
});

/// Split `s` on top-level whitespace, keeping parenthesised, bracketed and
/// quoted groups together.
pub(crate) fn split_top_level(s: &str) -> Vec<&str> {
    split_top_level_by(s, char::is_whitespace)
}

/// Split `s` on top-level separators matched by `is_separator`.
pub(crate) fn split_top_level_by(s: &str, is_separator: impl Fn(char) -> bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_i32;
    let mut quote: Option<char> = None;
    let mut start: Option<usize> = None;
    for (i, c) in s.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                let _ = start.get_or_insert(i);
            }
            '(' | '[' => {
                depth += 1;
                let _ = start.get_or_insert(i);
            }
            ')' | ']' => depth -= 1,
            _ if depth == 0 && is_separator(c) => {
                if let Some(st) = start.take() {
                    parts.push(s[st..i].trim());
                }
            }
            _ => {
                let _ = start.get_or_insert(i);
            }
        }
    }
    if let Some(st) = start {
        parts.push(s[st..].trim());
    }
    parts.retain(|p| !p.is_empty());
    parts
}

/// Strip one level of matching quotes.
pub(crate) fn unquote(s: &str) -> Option<&str> {
    let s = s.trim();
    s.strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .or_else(|| s.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_accept_units_and_bare_numbers() {
        assert_eq!("12px".parse::<Px>().ok(), Some(Px(12.0)));
        assert_eq!("12".parse::<Px>().ok(), Some(Px(12.0)));
        assert_eq!("72pt".parse::<Px>().ok(), Some(Px(96.0)));
        assert_eq!("50%".parse::<Dimension>().ok(), Some(Dimension::Percent(50.0)));
        assert_eq!("auto".parse::<Dimension>().ok(), Some(Dimension::Auto));
        assert!("wide".parse::<Dimension>().is_err());
    }

    #[test]
    fn colors_parse_hex_and_functions() {
        assert_eq!("#f00".parse::<Color>().ok(), Some(Color::rgba(255, 0, 0, 255)));
        assert_eq!(
            "rgba(0, 0, 255, 0.5)".parse::<Color>().ok(),
            Some(Color::rgba(0, 0, 255, 128))
        );
    }

    #[test]
    fn content_distribution_offsets() {
        assert_eq!(ContentAlign::SpaceBetween.distribute(30.0, 4), (0.0, 10.0));
        assert_eq!(ContentAlign::SpaceAround.distribute(40.0, 2), (10.0, 20.0));
        assert_eq!(ContentAlign::SpaceEvenly.distribute(30.0, 2), (10.0, 10.0));
        assert_eq!(ContentAlign::SpaceBetween.distribute(-10.0, 2), (0.0, 0.0));
        assert_eq!(ContentAlign::Center.distribute(-10.0, 2), (-5.0, 0.0));
    }

    #[test]
    fn column_count_rejects_zero() {
        assert_eq!("3".parse::<ColumnCount>().ok(), Some(ColumnCount(Some(3))));
        assert_eq!("auto".parse::<ColumnCount>().ok(), Some(ColumnCount(None)));
        assert!("0".parse::<ColumnCount>().is_err());
        assert_eq!(
            "25%".parse::<FlexBasis>().ok(),
            Some(FlexBasis::Length(LengthPercentage::Percent(25.0)))
        );
    }

    #[test]
    fn top_level_split_respects_groups() {
        assert_eq!(
            split_top_level("[a] repeat(2, 1fr 10px) auto \"x y\""),
            vec!["[a]", "repeat(2, 1fr 10px)", "auto", "\"x y\""]
        );
    }
}
