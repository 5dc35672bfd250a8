//! Generated content values: `content`, `string-set`, counters.
//!
//! [CSS Generated Content Module Level 3](https://www.w3.org/TR/css-content-3/)
//! and [CSS Generated Content for Paged Media](https://www.w3.org/TR/css-gcpm-3/)

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::values::{RawValue, parse_via_from_str, split_top_level, split_top_level_by, unquote};
use crate::error::StyleParseError;

/// [§ 1.1 'string-set'](https://www.w3.org/TR/css-gcpm-3/#using-named-strings)
///
/// Which assignment of a named string (or running element) a page uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageKeyword {
    /// First assignment on the page, else the value carried from earlier pages.
    #[default]
    First,
    /// Value at the start of the page.
    Start,
    /// Last assignment on the page.
    Last,
    /// Like `first`, but empty on the page where the value is assigned.
    FirstExcept,
}

impl FromStr for PageKeyword {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "first" => Ok(Self::First),
            "start" => Ok(Self::Start),
            "last" => Ok(Self::Last),
            "first-except" => Ok(Self::FirstExcept),
            _ => Err(StyleParseError::invalid("page keyword", s)),
        }
    }
}

/// [§ 2.1 Counter styles](https://www.w3.org/TR/css-counter-styles-3/)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum CounterStyle {
    #[default]
    Decimal,
    LowerAlpha,
    UpperAlpha,
    LowerRoman,
    UpperRoman,
}

impl CounterStyle {
    fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "decimal" => Some(Self::Decimal),
            "lower-alpha" | "lower-latin" => Some(Self::LowerAlpha),
            "upper-alpha" | "upper-latin" => Some(Self::UpperAlpha),
            "lower-roman" => Some(Self::LowerRoman),
            "upper-roman" => Some(Self::UpperRoman),
            _ => None,
        }
    }

    /// Format `value` in this style. Alphabetic and roman styles fall back
    /// to decimal outside their range.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn format(self, value: i32) -> String {
        match self {
            Self::Decimal => value.to_string(),
            Self::LowerAlpha | Self::UpperAlpha if value > 0 => {
                let mut n = value;
                let mut letters = Vec::new();
                while n > 0 {
                    n -= 1;
                    letters.push(char::from(b'a' + (n % 26) as u8));
                    n /= 26;
                }
                let text: String = letters.into_iter().rev().collect();
                if self == Self::UpperAlpha {
                    text.to_ascii_uppercase()
                } else {
                    text
                }
            }
            Self::LowerRoman | Self::UpperRoman if (1..4000).contains(&value) => {
                const NUMERALS: [(i32, &str); 13] = [
                    (1000, "m"),
                    (900, "cm"),
                    (500, "d"),
                    (400, "cd"),
                    (100, "c"),
                    (90, "xc"),
                    (50, "l"),
                    (40, "xl"),
                    (10, "x"),
                    (9, "ix"),
                    (5, "v"),
                    (4, "iv"),
                    (1, "i"),
                ];
                let mut n = value;
                let mut text = String::new();
                for (weight, numeral) in NUMERALS {
                    while n >= weight {
                        text.push_str(numeral);
                        n -= weight;
                    }
                }
                if self == Self::UpperRoman {
                    text.to_ascii_uppercase()
                } else {
                    text
                }
            }
            _ => value.to_string(),
        }
    }
}

/// One item of a `content` or `string-set` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentItem {
    /// A quoted string.
    Literal(String),
    /// `counter(name, style)`
    Counter(String, CounterStyle),
    /// `string(name, keyword)`
    NamedString(String, PageKeyword),
    /// `element(name, keyword)`
    Element(String, PageKeyword),
    /// `target-counter(url, name, style)`
    TargetCounter {
        /// Anchor id, without `#`.
        anchor: String,
        /// Counter to read on the target's page.
        counter: String,
        /// Presentation of the value.
        style: CounterStyle,
    },
    /// `content(text)`: the text of the box carrying the declaration.
    ContentText,
    /// [`leader()`](https://www.w3.org/TR/css-content-3/#leaders): a
    /// pattern repeated over the free space of its line.
    Leader(String),
}

fn function_args<'a>(item: &'a str, name: &str) -> Option<Vec<&'a str>> {
    let inner = item.strip_prefix(name)?.strip_prefix('(')?.strip_suffix(')')?;
    Some(split_top_level_by(inner, |c| c == ','))
}

impl FromStr for ContentItem {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let item = s.trim();
        let invalid = || StyleParseError::invalid("content", s);
        if let Some(text) = unquote(item) {
            return Ok(Self::Literal(text.to_owned()));
        }
        if let Some(args) = function_args(item, "counter") {
            let name = args.first().ok_or_else(invalid)?;
            let style = match args.get(1) {
                Some(style) => CounterStyle::parse(style).ok_or_else(invalid)?,
                None => CounterStyle::Decimal,
            };
            return Ok(Self::Counter((*name).to_owned(), style));
        }
        for (function, is_element) in [("string", false), ("element", true)] {
            if let Some(args) = function_args(item, function) {
                let name = (*args.first().ok_or_else(invalid)?).to_owned();
                let keyword = match args.get(1) {
                    Some(kw) => kw.parse()?,
                    None => PageKeyword::First,
                };
                return Ok(if is_element {
                    Self::Element(name, keyword)
                } else {
                    Self::NamedString(name, keyword)
                });
            }
        }
        if let Some(args) = function_args(item, "target-counter") {
            let target = args.first().ok_or_else(invalid)?;
            let target = target
                .strip_prefix("url(")
                .and_then(|t| t.strip_suffix(')'))
                .unwrap_or(target);
            let target = unquote(target).unwrap_or(target);
            let counter = (*args.get(1).ok_or_else(invalid)?).to_owned();
            let style = match args.get(2) {
                Some(style) => CounterStyle::parse(style).ok_or_else(invalid)?,
                None => CounterStyle::Decimal,
            };
            return Ok(Self::TargetCounter {
                anchor: target.trim_start_matches('#').to_owned(),
                counter,
                style,
            });
        }
        if let Some(args) = function_args(item, "leader") {
            let pattern = match args.as_slice() {
                ["dotted"] => ".",
                ["solid"] => "_",
                ["space"] => " ",
                [literal] => unquote(literal).ok_or_else(invalid)?,
                _ => return Err(invalid()),
            };
            return Ok(Self::Leader(pattern.to_owned()));
        }
        if item == "content(text)" || item == "content()" {
            return Ok(Self::ContentText);
        }
        Err(invalid())
    }
}

/// A whole `content` value: `none`/`normal` or a list of items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
pub struct Content(pub Vec<ContentItem>);

impl FromStr for Content {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "none" || trimmed == "normal" {
            return Ok(Self::default());
        }
        split_top_level(trimmed)
            .into_iter()
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

/// [§ 1.1 'string-set'](https://www.w3.org/TR/css-gcpm-3/#string-set)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
pub struct StringSet(pub Vec<(String, Vec<ContentItem>)>);

impl FromStr for StringSet {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "none" {
            return Ok(Self::default());
        }
        let mut sets = Vec::new();
        for declaration in split_top_level_by(trimmed, |c| c == ',') {
            let mut parts = split_top_level(declaration).into_iter();
            let name = parts
                .next()
                .ok_or_else(|| StyleParseError::invalid("string-set", s))?;
            let items = parts.map(str::parse).collect::<Result<Vec<_>, _>>()?;
            sets.push((name.to_owned(), items));
        }
        Ok(Self(sets))
    }
}

/// `counter-reset` / `counter-increment`: `none | [name integer?]+`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
pub struct CounterOps(pub Vec<(String, Option<i32>)>);

impl CounterOps {
    /// Resolve missing values to `default` (0 for reset, 1 for increment).
    pub fn resolved(&self, default: i32) -> impl Iterator<Item = (&str, i32)> + '_ {
        self.0
            .iter()
            .map(move |(name, value)| (name.as_str(), value.unwrap_or(default)))
    }
}

impl FromStr for CounterOps {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "none" {
            return Ok(Self::default());
        }
        let mut ops: Vec<(String, Option<i32>)> = Vec::new();
        for token in trimmed.split_whitespace() {
            if let Ok(value) = token.parse::<i32>() {
                match ops.last_mut() {
                    Some((_, slot @ None)) => *slot = Some(value),
                    _ => return Err(StyleParseError::invalid("counter", s)),
                }
            } else {
                ops.push((token.to_owned(), None));
            }
        }
        Ok(Self(ops))
    }
}

parse_via_from_str!(Content, StringSet, CounterOps);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_lists_parse_functions_and_literals() {
        let content: Content = "\"Page \" counter(page) \" of \" counter(pages, upper-roman)"
            .parse()
            .unwrap_or_default();
        assert_eq!(content.0.len(), 4);
        assert_eq!(
            content.0[3],
            ContentItem::Counter("pages".into(), CounterStyle::UpperRoman)
        );
    }

    #[test]
    fn target_counter_strips_url_and_hash() {
        let item: ContentItem = "target-counter(url(#intro), page)".parse().unwrap_or(ContentItem::ContentText);
        assert_eq!(
            item,
            ContentItem::TargetCounter {
                anchor: "intro".into(),
                counter: "page".into(),
                style: CounterStyle::Decimal,
            }
        );
    }

    #[test]
    fn leader_keywords_and_strings() {
        let content: Content = "\"Intro\" leader(dotted) leader(\"-=\")".parse().unwrap_or_default();
        assert_eq!(content.0[1], ContentItem::Leader(".".into()));
        assert_eq!(content.0[2], ContentItem::Leader("-=".into()));
        assert!("leader(wavy)".parse::<ContentItem>().is_err());
    }

    #[test]
    fn counter_ops_default_values() {
        let ops: CounterOps = "page 3 chapter".parse().unwrap_or_default();
        let resolved: Vec<_> = ops.resolved(1).collect();
        assert_eq!(resolved, vec![("page", 3), ("chapter", 1)]);
    }

    #[test]
    fn counter_styles_format() {
        assert_eq!(CounterStyle::LowerRoman.format(14), "xiv");
        assert_eq!(CounterStyle::UpperAlpha.format(28), "AB");
        assert_eq!(CounterStyle::LowerAlpha.format(0), "0");
    }
}
