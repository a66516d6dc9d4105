//! Scale bar layout and rendering
//!
//! The bar length is picked from a table of "nice" lengths for common scale
//! denominators, with a coarse fallback for everything else. Division ticks
//! follow the leading digits of the length so that e.g. 1000 m gets ten
//! divisions and 1200 m gets twelve.

use super::surface::{DrawingSurface, Point, TextAlign};
use crate::constants::*;
use crate::types::Color;

/// Bar length in meters for a scale denominator
pub fn fitting_scale_bar_length(scale: f64) -> f64 {
    let tabulated = SCALE_BAR_LENGTHS
        .iter()
        .find(|(denominator, _)| *denominator as f64 == scale)
        .map(|(_, length)| *length);

    match tabulated {
        Some(length) => length,
        None if scale < 250.0 => 5.0,
        None if scale < 2500.0 => scale * 0.02,
        None => scale * 0.05,
    }
}

/// Layout of one scale bar, in points relative to the bar's left end
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleBarSpec {
    pub scale: f64,
    pub length_meters: f64,
    pub length_points: f32,
    /// Positions of the division ticks, starting with 0
    pub division_tick_positions: Vec<f32>,
    /// Number of divisions along the bar (may be fractional, e.g. 2.5 for 250 m)
    pub divider: f64,
    /// Position of the one-fifth subdivision tick, when there is room for it
    pub subdivision: Option<f32>,
}

impl ScaleBarSpec {
    pub fn compute(scale: f64) -> Self {
        let length_meters = fitting_scale_bar_length(scale);
        let length_points =
            ((length_meters / scale / METERS_PER_INCH) * POINTS_PER_INCH) as f32;
        let divider = divider_for(length_meters);

        let step = length_points / divider as f32;
        let count = (divider + 1e-9).floor() as usize;
        let division_tick_positions = (0..=count).map(|i| i as f32 * step).collect();

        let subdivision = (step >= SCALE_BAR_MIN_SUBDIVISION_ROOM).then_some(step / 5.0);

        Self {
            scale,
            length_meters,
            length_points,
            division_tick_positions,
            divider,
            subdivision,
        }
    }

    /// Distance between two division ticks
    pub fn step(&self) -> f32 {
        self.length_points / self.divider as f32
    }

    /// Index of the tick labelled in the middle of the bar
    pub fn middle_index(&self) -> usize {
        let last = self.division_tick_positions.len().saturating_sub(1);
        ((self.divider / 2.0).round() as usize).min(last)
    }

    /// Meters represented by the bar up to `position`
    pub fn meters_at(&self, position: f32) -> f64 {
        if self.length_points <= 0.0 {
            return 0.0;
        }
        self.length_meters * f64::from(position / self.length_points)
    }

    /// How far the "0" and end labels stick out left and right of the bar
    pub fn label_overhang(&self, style_scale: f32) -> (f32, f32) {
        let font = SCALE_BAR_FONT_SIZE * style_scale;
        let half_width =
            |text: &str| text.chars().count() as f32 * font * HELVETICA_CHAR_WIDTH_RATIO / 2.0;
        let end_label = format_distance(self.length_meters, self.length_meters);
        (half_width("0"), half_width(&end_label))
    }

    /// Width and height the bar occupies once rendered at `style_scale`,
    /// labels included
    pub fn footprint(&self, style_scale: f32) -> (f32, f32) {
        let font = SCALE_BAR_FONT_SIZE * style_scale;
        let (left, right) = self.label_overhang(style_scale);
        (
            left + self.length_points + right,
            SCALE_BAR_CAP_HEIGHT * style_scale + font * LINE_SPACING,
        )
    }
}

/// Divisions for a bar of `length_meters`.
///
/// Two leading digits are used only when they read 10 to 19, one otherwise.
fn divider_for(length_meters: f64) -> f64 {
    let digits = (length_meters.round().max(1.0) as u64).to_string();
    let two_digit_prefix = digits
        .get(..2)
        .and_then(|prefix| prefix.parse::<u32>().ok())
        .filter(|prefix| (10..=19).contains(prefix));
    let significant = if two_digit_prefix.is_some() { 2 } else { 1 };
    let exponent = digits.len().saturating_sub(significant) as i32;
    length_meters / 10f64.powi(exponent)
}

/// Human-readable distance, switching to kilometers when the whole bar does
fn format_distance(meters: f64, bar_length: f64) -> String {
    let (value, unit) = if bar_length >= 1000.0 {
        (meters / 1000.0, "km")
    } else {
        (meters, "m")
    };
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{} {}", rounded as i64, unit)
    } else {
        format!("{} {}", rounded, unit)
    }
}

/// Numeric part of a tick label
fn format_tick(meters: f64, bar_length: f64) -> String {
    let label = format_distance(meters, bar_length);
    label
        .split_once(' ')
        .map(|(number, _)| number.to_string())
        .unwrap_or(label)
}

/// Ticks this close to the end coincide with the end cap
const TICK_TOLERANCE: f32 = 1e-3;

/// Draw the bar with its bottom-left corner at `origin`
pub fn render_scale_bar(
    surface: &mut dyn DrawingSurface,
    spec: &ScaleBarSpec,
    origin: Point,
    style_scale: f32,
    color: Color,
) {
    let line_width = SCALE_BAR_LINE_WIDTH * style_scale;
    let cap = SCALE_BAR_CAP_HEIGHT * style_scale;
    let tick = SCALE_BAR_TICK_HEIGHT * style_scale;
    let subtick = SCALE_BAR_SUBTICK_HEIGHT * style_scale;
    let font = SCALE_BAR_FONT_SIZE * style_scale;

    let x0 = origin.x;
    let y = origin.y;
    let x1 = x0 + spec.length_points;
    let label_y = y + cap + font * (LINE_SPACING - 1.0);

    // Baseline and end caps
    surface.line(Point::new(x0, y), Point::new(x1, y), line_width, color);
    surface.line(Point::new(x0, y), Point::new(x0, y + cap), line_width, color);
    surface.line(Point::new(x1, y), Point::new(x1, y + cap), line_width, color);

    for &position in spec.division_tick_positions.iter().skip(1) {
        let x = x0 + position;
        if x >= x1 - TICK_TOLERANCE {
            continue;
        }
        surface.line(Point::new(x, y), Point::new(x, y + tick), line_width, color);
    }

    if let Some(position) = spec.subdivision {
        let x = x0 + position;
        surface.line(Point::new(x, y), Point::new(x, y + subtick), line_width, color);

        let label = format_tick(spec.meters_at(position), spec.length_meters);
        // Only labelled when it cannot run into the "0" label
        if surface.text_width(&label, font) + surface.text_width("0", font) < position * 2.0 {
            surface.text(&label, Point::new(x, label_y), font, TextAlign::Center, color);
        }
    }

    surface.text("0", Point::new(x0, label_y), font, TextAlign::Center, color);

    let middle = spec.middle_index();
    if middle > 0 {
        if let Some(&position) = spec.division_tick_positions.get(middle) {
            if position < spec.length_points - TICK_TOLERANCE {
                let label = format_tick(spec.meters_at(position), spec.length_meters);
                surface.text(
                    &label,
                    Point::new(x0 + position, label_y),
                    font,
                    TextAlign::Center,
                    color,
                );
            }
        }
    }

    let end_label = format_distance(spec.length_meters, spec.length_meters);
    surface.text(&end_label, Point::new(x1, label_y), font, TextAlign::Center, color);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divider_uses_two_digits_for_teens() {
        assert_eq!(divider_for(1000.0), 10.0);
        assert_eq!(divider_for(1200.0), 12.0);
        assert_eq!(divider_for(500.0), 5.0);
        assert_eq!(divider_for(2000.0), 2.0);
        assert_eq!(divider_for(6.0), 6.0);
        assert_eq!(divider_for(10.0), 10.0);
    }

    #[test]
    fn test_length_in_points() {
        // 1000 m at 1:10000 is 10 cm on paper
        let spec = ScaleBarSpec::compute(10_000.0);
        let expected = 100.0 / 25.4 * 72.0;
        assert!((spec.length_points - expected as f32).abs() < 0.01);
        assert_eq!(spec.division_tick_positions.len(), 11);
        assert_eq!(spec.middle_index(), 5);
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(1000.0, 1000.0), "1 km");
        assert_eq!(format_distance(500.0, 1000.0), "0.5 km");
        assert_eq!(format_distance(50.0, 50.0), "50 m");
        assert_eq!(format_tick(500.0, 1000.0), "0.5");
    }

    #[test]
    fn test_subdivision_needs_room() {
        // 1:500 → 50 m over ~283 pt in 5 divisions of ~57 pt
        let spec = ScaleBarSpec::compute(500.0);
        let subdivision = spec.subdivision.expect("room for a subdivision");
        assert!((subdivision - spec.step() / 5.0).abs() < 1e-4);

        // 1:200 → 10 m over ~142 pt in 10 divisions of ~14 pt
        assert!(ScaleBarSpec::compute(200.0).subdivision.is_none());
    }
}
