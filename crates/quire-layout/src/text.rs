//! Text measurement service and its per-document caches.
//!
//! [§ 10.8 Line height calculations](https://www.w3.org/TR/CSS2/visudet.html#line-height)
//!
//! "CSS assumes that every font has font metrics that specify a
//! characteristic height above the baseline and a depth below it."
//!
//! Shaping and font loading live outside the engine, behind
//! [`FontMetrics`]. Every query goes through [`TextCache`], which memoizes
//! widths, struts and hyphenation points for the duration of one layout.

use std::collections::HashMap;
use std::rc::Rc;

use crate::style::ComputedStyle;

/// Identity of a font for measurement purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontKey {
    /// Family name.
    pub family: String,
    /// `font-size` as raw `f32` bits.
    size_bits: u32,
    /// `font-weight`.
    pub weight: u16,
}

impl FontKey {
    /// Key for the font selected by `style`.
    #[must_use]
    pub fn from_style(style: &ComputedStyle) -> Self {
        Self {
            family: style.font_family.clone(),
            size_bits: style.font_size.0.to_bits(),
            weight: style.font_weight,
        }
    }

    /// Font size in px.
    #[must_use]
    pub fn size(&self) -> f32 {
        f32::from_bits(self.size_bits)
    }
}

/// Font metrics interface for text measurement during layout.
///
/// Implementors provide advance widths and vertical metrics. Hyphenation
/// is optional; the default finds no hyphenation points.
pub trait FontMetrics {
    /// Total advance width of `text`.
    fn text_width(&self, text: &str, font: &FontKey) -> f32;

    /// Ascent above and descent below the baseline.
    fn ascent_descent(&self, font: &FontKey) -> (f32, f32);

    /// [§ 10.8.1 Leading and half-leading](https://www.w3.org/TR/CSS2/visudet.html#leading)
    ///
    /// "We recommend a used value for 'normal' between 1.0 and 1.2."
    fn normal_line_height(&self, font: &FontKey) -> f32;

    /// Byte offsets inside `word` where a hyphen may be inserted.
    fn hyphenate(&self, _lang: &str, _word: &str) -> Vec<usize> {
        Vec::new()
    }
}

/// Approximate font metrics using fixed ratios.
///
/// The average advance of Latin glyphs in a proportional font is about
/// 0.6× the font size; `normal` line height is 1.2×. Used when no real font
/// is wired in, and in tests.
#[derive(Debug, Clone, Default)]
pub struct ApproximateFontMetrics {
    hyphenation: HashMap<String, Vec<usize>>,
}

impl ApproximateFontMetrics {
    /// Width of one character as a fraction of the font size.
    pub const CHAR_WIDTH_RATIO: f32 = 0.6;
    /// `line-height: normal` as a multiple of the font size.
    pub const LINE_HEIGHT_RATIO: f32 = 1.2;

    /// Metrics without hyphenation data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register hyphenation points (byte offsets) for `word`.
    #[must_use]
    pub fn with_hyphenation(mut self, word: &str, points: &[usize]) -> Self {
        let _ = self
            .hyphenation
            .insert(word.to_lowercase(), points.to_vec());
        self
    }
}

impl FontMetrics for ApproximateFontMetrics {
    #[allow(clippy::cast_precision_loss)]
    fn text_width(&self, text: &str, font: &FontKey) -> f32 {
        text.chars().count() as f32 * font.size() * Self::CHAR_WIDTH_RATIO
    }

    fn ascent_descent(&self, font: &FontKey) -> (f32, f32) {
        (font.size() * 0.8, font.size() * 0.2)
    }

    fn normal_line_height(&self, font: &FontKey) -> f32 {
        font.size() * Self::LINE_HEIGHT_RATIO
    }

    fn hyphenate(&self, _lang: &str, word: &str) -> Vec<usize> {
        self.hyphenation
            .get(&word.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}

/// [§ 10.8.1](https://www.w3.org/TR/CSS2/visudet.html#leading)
///
/// "Each line box starts with a zero-width inline box with the element's
/// font and line height properties. We call that imaginary box a 'strut.'"
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strut {
    /// Minimum line box height.
    pub height: f32,
    /// Baseline offset from the top of the strut.
    pub baseline: f32,
    /// Ascent of the font.
    pub ascent: f32,
    /// Descent of the font.
    pub descent: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StrutKey {
    font: FontKey,
    line_height_bits: Option<u32>,
}

/// Memoized text queries.
#[derive(Debug, Default)]
pub struct TextCache {
    widths: HashMap<(FontKey, String), f32>,
    struts: HashMap<StrutKey, Strut>,
    hyphenation: HashMap<(String, String), Rc<[usize]>>,
    hits: usize,
    misses: usize,
}

impl TextCache {
    /// Width of `text` in the font selected by `style`.
    pub fn width(&mut self, metrics: &dyn FontMetrics, style: &ComputedStyle, text: &str) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        let key = (FontKey::from_style(style), text.to_owned());
        if let Some(width) = self.widths.get(&key) {
            self.hits += 1;
            return *width;
        }
        self.misses += 1;
        let width = metrics.text_width(text, &key.0);
        let _ = self.widths.insert(key, width);
        width
    }

    /// Strut for `style`, keyed by font and line height.
    pub fn strut(&mut self, metrics: &dyn FontMetrics, style: &ComputedStyle) -> Strut {
        let line_height = style.line_height_px();
        let key = StrutKey {
            font: FontKey::from_style(style),
            line_height_bits: line_height.map(f32::to_bits),
        };
        if let Some(strut) = self.struts.get(&key) {
            return *strut;
        }
        let (ascent, descent) = metrics.ascent_descent(&key.font);
        let height = line_height
            .unwrap_or_else(|| metrics.normal_line_height(&key.font))
            .max(0.0);
        let half_leading = (height - (ascent + descent)) / 2.0;
        let strut = Strut {
            height,
            baseline: half_leading + ascent,
            ascent,
            descent,
        };
        let _ = self.struts.insert(key, strut);
        strut
    }

    /// Hyphenation points for `word` in `lang`.
    pub fn hyphenate(&mut self, metrics: &dyn FontMetrics, lang: &str, word: &str) -> Rc<[usize]> {
        let key = (lang.to_owned(), word.to_owned());
        if let Some(points) = self.hyphenation.get(&key) {
            return Rc::clone(points);
        }
        let mut points = metrics.hyphenate(lang, word);
        points.retain(|p| *p > 0 && *p < word.len() && word.is_char_boundary(*p));
        points.sort_unstable();
        let points: Rc<[usize]> = points.into();
        let _ = self.hyphenation.insert(key, Rc::clone(&points));
        points
    }

    /// Width cache hit ratio, for logging.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f32 / total as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strut_centres_the_font_in_the_line() {
        let mut cache = TextCache::default();
        let metrics = ApproximateFontMetrics::new();
        let style = ComputedStyle {
            font_size: crate::style::Px(10.0),
            line_height: crate::style::LineHeight::Px(20.0),
            ..ComputedStyle::default()
        };
        let strut = cache.strut(&metrics, &style);
        assert_eq!(strut.height, 20.0);
        // ascent 8, descent 2, half-leading 5
        assert!((strut.baseline - 13.0).abs() < 1e-4);
    }

    #[test]
    fn widths_are_memoized() {
        let mut cache = TextCache::default();
        let metrics = ApproximateFontMetrics::new();
        let style = ComputedStyle::default();
        let first = cache.width(&metrics, &style, "hello");
        let second = cache.width(&metrics, &style, "hello");
        assert_eq!(first, second);
        assert!((cache.hit_ratio() - 0.5).abs() < 1e-6);
    }
}
