//! Backgrounds.
//!
//! [CSS Backgrounds and Borders Module Level 3](https://www.w3.org/TR/css-backgrounds-3/)
//! and [§ 3.1 Linear gradients](https://www.w3.org/TR/css-images-3/#linear-gradients)
//!
//! Backgrounds are resolved once pagination is final, so every fragment's
//! painting and positioning areas are the ones that will be painted.
//! Gradient geometry is given in device pixels, ready for the painter.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::context::LayoutContext;
use crate::error::StyleParseError;
use crate::fragment::{Fragment, FragmentKind};
use crate::geometry::Rect;
use crate::style::values::{RawValue, parse_via_from_str, split_top_level, split_top_level_by};
use crate::style::{BoxArea, Color, ComputedStyle, LengthPercentage};

/// One color stop of a gradient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    /// Stop color.
    pub color: Color,
    /// Position along the gradient line, if given.
    pub position: Option<LengthPercentage>,
}

/// One `background-image` layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BackgroundImage {
    /// `url(...)`
    Url(String),
    /// `linear-gradient(...)`
    LinearGradient {
        /// Direction of the gradient line, CSS degrees (0 points up).
        angle: GradientAngle,
        /// At least two stops.
        stops: Vec<ColorStop>,
    },
}

/// Gradient direction, kept symbolic for corners because their angle
/// depends on the box size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GradientAngle {
    /// An explicit angle, or `to top|right|bottom|left`.
    Degrees(f32),
    /// `to <corner>`: horizontal then vertical sign (+1 right/bottom).
    Corner(f32, f32),
}

impl GradientAngle {
    /// Angle in radians for a box of `width × height`.
    #[must_use]
    pub fn radians(self, width: f32, height: f32) -> f32 {
        match self {
            Self::Degrees(deg) => deg.to_radians(),
            // The 50% line joins the two other corners.
            Self::Corner(sx, sy) => (sx * height).atan2(-sy * width),
        }
    }
}

/// The `background-image` layer list; empty for `none`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
pub struct BackgroundLayers(pub Vec<BackgroundImage>);

impl BackgroundLayers {
    /// Whether there are no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn parse_direction(s: &str) -> Option<GradientAngle> {
    let s = s.trim();
    if let Some(sides) = s.strip_prefix("to ") {
        let mut sx = 0_i8;
        let mut sy = 0_i8;
        for side in sides.split_whitespace() {
            match side {
                "left" => sx = -1,
                "right" => sx = 1,
                "top" => sy = -1,
                "bottom" => sy = 1,
                _ => return None,
            }
        }
        return match (sx, sy) {
            (0, 0) => None,
            (0, -1) => Some(GradientAngle::Degrees(0.0)),
            (0, _) => Some(GradientAngle::Degrees(180.0)),
            (1, 0) => Some(GradientAngle::Degrees(90.0)),
            (_, 0) => Some(GradientAngle::Degrees(270.0)),
            (x, y) => Some(GradientAngle::Corner(f32::from(x), f32::from(y))),
        };
    }
    let (number, per_degree) = if let Some(n) = s.strip_suffix("deg") {
        (n, 1.0)
    } else if let Some(n) = s.strip_suffix("grad") {
        (n, 0.9)
    } else if let Some(n) = s.strip_suffix("rad") {
        (n, 180.0 / std::f32::consts::PI)
    } else if let Some(n) = s.strip_suffix("turn") {
        (n, 360.0)
    } else {
        return None;
    };
    let value: f32 = number.trim().parse().ok()?;
    Some(GradientAngle::Degrees(value * per_degree))
}

fn parse_stop(s: &str) -> Option<ColorStop> {
    let parts = split_top_level(s);
    let color = parts.first()?.parse().ok()?;
    let position = match parts.get(1) {
        Some(p) => Some(p.parse().ok()?),
        None => None,
    };
    Some(ColorStop { color, position })
}

impl FromStr for BackgroundImage {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let item = s.trim();
        let invalid = || StyleParseError::invalid("background-image", s);
        if let Some(inner) = item.strip_prefix("url(").and_then(|r| r.strip_suffix(')')) {
            let url = crate::style::values::unquote(inner).unwrap_or(inner).trim();
            return Ok(Self::Url(url.to_owned()));
        }
        let inner = item
            .strip_prefix("linear-gradient(")
            .and_then(|r| r.strip_suffix(')'))
            .ok_or_else(invalid)?;
        let mut args = split_top_level_by(inner, |c| c == ',').into_iter().peekable();
        let angle = match args.peek().and_then(|a| parse_direction(a)) {
            Some(angle) => {
                let _ = args.next();
                angle
            }
            None => GradientAngle::Degrees(180.0),
        };
        let stops = args
            .map(|a| parse_stop(a).ok_or_else(invalid))
            .collect::<Result<Vec<_>, _>>()?;
        if stops.len() < 2 {
            return Err(invalid());
        }
        Ok(Self::LinearGradient { angle, stops })
    }
}

impl FromStr for BackgroundLayers {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "none" {
            return Ok(Self::default());
        }
        split_top_level_by(trimmed, |c| c == ',')
            .into_iter()
            .filter(|layer| *layer != "none")
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

parse_via_from_str!(BackgroundLayers);

/// A gradient line in device coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedGradient {
    /// Start point of the gradient line.
    pub start: (f32, f32),
    /// End point of the gradient line.
    pub end: (f32, f32),
    /// Stops as (distance from `start`, color), non-decreasing.
    pub stops: Vec<(f32, Color)>,
}

/// One resolved layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ResolvedLayer {
    /// An image drawn at its intrinsic size from the positioning area
    /// origin.
    Image {
        /// Image source.
        url: String,
        /// Drawn size in CSS px.
        width: f32,
        /// Drawn size in CSS px.
        height: f32,
    },
    /// A linear gradient filling the painting area.
    Gradient(ResolvedGradient),
}

/// A fragment's background, ready to paint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedBackground {
    /// Background color, under every layer.
    pub color: Option<Color>,
    /// Area painted (per `background-clip`).
    pub painting_area: Rect,
    /// Area images are positioned in (per `background-origin`).
    pub positioning_area: Rect,
    /// Layers, top first.
    pub layers: Vec<ResolvedLayer>,
    /// CSS px to device px scale of the gradient geometry.
    scale: f32,
}

impl ResolvedBackground {
    /// Move the background by `(dx, dy)` CSS px.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.painting_area.x += dx;
        self.painting_area.y += dy;
        self.positioning_area.x += dx;
        self.positioning_area.y += dy;
        let (ddx, ddy) = (dx * self.scale, dy * self.scale);
        for layer in &mut self.layers {
            if let ResolvedLayer::Gradient(gradient) = layer {
                gradient.start.0 += ddx;
                gradient.start.1 += ddy;
                gradient.end.0 += ddx;
                gradient.end.1 += ddy;
            }
        }
    }
}

/// [§ 3.1.1 Linear gradient syntax](https://www.w3.org/TR/css-images-3/#linear-gradient-syntax)
///
/// "The gradient line's length is `abs(W * sin(A)) + abs(H * cos(A))`."
///
/// Resolve a gradient over `area` (CSS px), scaled by `scale`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn resolve_gradient(angle: GradientAngle, stops: &[ColorStop], area: Rect, scale: f32) -> ResolvedGradient {
    let a = angle.radians(area.width, area.height);
    let (sin, cos) = a.sin_cos();
    let length = (area.width * sin).abs() + (area.height * cos).abs();
    let (cx, cy) = (area.x + area.width / 2.0, area.y + area.height / 2.0);
    let (dx, dy) = (sin * length / 2.0, -cos * length / 2.0);
    let start = ((cx - dx) * scale, (cy - dy) * scale);
    let end = ((cx + dx) * scale, (cy + dy) * scale);

    // [§ 3.5.1 Color stop "fixup"](https://www.w3.org/TR/css-images-3/#color-stop-fixup)
    let last = stops.len().saturating_sub(1);
    let mut positions: Vec<Option<f32>> = stops
        .iter()
        .enumerate()
        .map(|(i, stop)| match stop.position {
            Some(p) => Some(p.resolve(length)),
            None if i == 0 => Some(0.0),
            None if i == last => Some(length),
            None => None,
        })
        .collect();
    // "If a color stop has a position that is less than the specified
    // position of any color stop before it, set its position to be equal
    // to the largest specified position of any color stop before it."
    let mut running = f32::NEG_INFINITY;
    for p in positions.iter_mut().flatten() {
        running = running.max(*p);
        *p = running;
    }
    // "If any color stop still does not have a position, then, for each run
    // of adjacent color stops without positions, set their positions so
    // that they are evenly spaced between the preceding and following
    // color stops with positions."
    let mut i = 0;
    while i < positions.len() {
        if positions[i].is_some() {
            i += 1;
            continue;
        }
        let run_start = i;
        while i < positions.len() && positions[i].is_none() {
            i += 1;
        }
        let before = run_start
            .checked_sub(1)
            .and_then(|b| positions[b])
            .unwrap_or(0.0);
        let after = positions.get(i).copied().flatten().unwrap_or(length);
        let steps = (i - run_start + 1) as f32;
        for (k, slot) in positions[run_start..i].iter_mut().enumerate() {
            *slot = Some(before + (after - before) * (k + 1) as f32 / steps);
        }
    }

    ResolvedGradient {
        start,
        end,
        stops: stops
            .iter()
            .zip(positions)
            .map(|(stop, p)| (p.unwrap_or(0.0) * scale, stop.color))
            .collect(),
    }
}

fn area_of(fragment: &Fragment, area: BoxArea) -> Rect {
    match area {
        BoxArea::BorderBox => fragment.dimensions.border_box(),
        BoxArea::PaddingBox => fragment.dimensions.padding_box(),
        BoxArea::ContentBox => fragment.dimensions.content,
    }
}

/// Background of `fragment` drawn with `style`, `None` when there is
/// nothing to paint.
pub fn resolve_background(
    ctx: &mut LayoutContext<'_>,
    fragment: &Fragment,
    style: &ComputedStyle,
) -> Option<ResolvedBackground> {
    let color = style.background_color.filter(|c| c.a > 0);
    if color.is_none() && style.background_image.is_empty() {
        return None;
    }
    let scale = ctx.config.device_pixel_ratio;
    let painting_area = area_of(fragment, style.background_clip.unwrap_or(BoxArea::BorderBox));
    let positioning_area = area_of(fragment, style.background_origin.unwrap_or(BoxArea::PaddingBox));
    let mut layers = Vec::new();
    for layer in &style.background_image.0 {
        match layer {
            BackgroundImage::Url(url) => {
                // A failed image paints nothing.
                let Some(size) = ctx.image_size(url) else {
                    continue;
                };
                let (width, height) = match (size.width, size.height, size.ratio) {
                    (Some(w), Some(h), _) => (w, h),
                    (Some(w), None, Some(r)) if r > 0.0 => (w, w / r),
                    (None, Some(h), Some(r)) => (h * r, h),
                    (None, None, Some(r)) if r > 0.0 => {
                        (positioning_area.width, positioning_area.width / r)
                    }
                    _ => (positioning_area.width, positioning_area.height),
                };
                layers.push(ResolvedLayer::Image {
                    url: url.clone(),
                    width,
                    height,
                });
            }
            BackgroundImage::LinearGradient { angle, stops } => {
                layers.push(ResolvedLayer::Gradient(resolve_gradient(
                    *angle,
                    stops,
                    painting_area,
                    scale,
                )));
            }
        }
    }
    Some(ResolvedBackground {
        color,
        painting_area,
        positioning_area,
        layers,
        scale,
    })
}

/// Resolve the background of every fragment under `root`.
pub fn resolve_tree(ctx: &mut LayoutContext<'_>, root: &mut Fragment) {
    let tree = ctx.tree;
    let mut pending: Vec<&mut Fragment> = vec![root];
    while let Some(fragment) = pending.pop() {
        // The wrapper shares its box with the table grid, which paints.
        if let Some(id) = fragment.box_id.filter(|_| fragment.kind != FragmentKind::Table) {
            fragment.background = resolve_background(ctx, fragment, tree.style(id));
        }
        pending.extend(fragment.children.iter_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_lists_parse() {
        let layers: BackgroundLayers = "url(\"a.png\"), linear-gradient(to right, red, blue 75%)"
            .parse()
            .unwrap_or_default();
        assert_eq!(layers.0.len(), 2);
        assert_eq!(layers.0[0], BackgroundImage::Url("a.png".into()));
        assert!(matches!(
            layers.0[1],
            BackgroundImage::LinearGradient {
                angle: GradientAngle::Degrees(a),
                ..
            } if (a - 90.0).abs() < f32::EPSILON
        ));
        assert!("linear-gradient(red)".parse::<BackgroundLayers>().is_err());
    }

    #[test]
    fn horizontal_gradient_spans_the_box_in_device_pixels() {
        let stops = [
            ColorStop { color: Color::BLACK, position: None },
            ColorStop { color: Color::WHITE, position: None },
            ColorStop { color: Color::BLACK, position: None },
        ];
        let g = resolve_gradient(GradientAngle::Degrees(90.0), &stops, Rect::new(10.0, 0.0, 100.0, 50.0), 2.0);
        assert!((g.start.0 - 20.0).abs() < 1e-3 && (g.end.0 - 220.0).abs() < 1e-3);
        assert!((g.start.1 - 50.0).abs() < 1e-3);
        let positions: Vec<f32> = g.stops.iter().map(|s| s.0).collect();
        assert!((positions[1] - 100.0).abs() < 1e-3, "{positions:?}");
        assert!((positions[2] - 200.0).abs() < 1e-3);
    }

    #[test]
    fn out_of_order_stops_are_clamped() {
        let stops = [
            ColorStop { color: Color::BLACK, position: Some(LengthPercentage::Percent(50.0)) },
            ColorStop { color: Color::WHITE, position: Some(LengthPercentage::Px(10.0)) },
        ];
        let g = resolve_gradient(GradientAngle::Degrees(180.0), &stops, Rect::new(0.0, 0.0, 10.0, 100.0), 1.0);
        assert_eq!(g.stops[0].0, 50.0);
        assert_eq!(g.stops[1].0, 50.0);
    }
}
