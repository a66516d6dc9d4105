use kartexport::render::*;
use kartexport::*;

#[test]
fn test_tabulated_lengths() {
    assert_eq!(fitting_scale_bar_length(200.0), 10.0);
    assert_eq!(fitting_scale_bar_length(500.0), 50.0);
    assert_eq!(fitting_scale_bar_length(1000.0), 100.0);
    assert_eq!(fitting_scale_bar_length(100_000.0), 10_000.0);
}

#[test]
fn test_fallback_lengths() {
    assert_eq!(fitting_scale_bar_length(100.0), 5.0);
    assert!((fitting_scale_bar_length(300.0) - 6.0).abs() < 1e-9);
    assert!((fitting_scale_bar_length(3000.0) - 150.0).abs() < 1e-9);
}

#[test]
fn test_bar_length_in_points() {
    // 10 m at 1:200 is 5 cm on paper
    let spec = ScaleBarSpec::compute(200.0);
    let expected = 50.0 / 25.4 * 72.0;
    assert!((spec.length_points - expected as f32).abs() < 0.01);
}

#[test]
fn test_ticks_start_at_zero_and_stay_on_bar() {
    for scale in [200.0, 300.0, 2_500.0, 15_000.0, 250_000.0, 7_777.0] {
        let spec = ScaleBarSpec::compute(scale);
        assert_eq!(spec.division_tick_positions[0], 0.0);
        for position in &spec.division_tick_positions {
            assert!(*position <= spec.length_points + 1e-3, "scale {}", scale);
        }
        assert!(spec.middle_index() < spec.division_tick_positions.len());
    }
}

#[test]
fn test_teen_lengths_get_two_digit_divider() {
    // 1:15000 → 1000 m → ten divisions
    let spec = ScaleBarSpec::compute(15_000.0);
    assert_eq!(spec.divider, 10.0);
    // 1:2500 → 250 m → 2.5 divisions, ticks at 0, 100 m and 200 m
    let spec = ScaleBarSpec::compute(2_500.0);
    assert_eq!(spec.divider, 2.5);
    assert_eq!(spec.division_tick_positions.len(), 3);
}

#[derive(Default)]
struct Recorder {
    lines: usize,
    labels: Vec<String>,
}

impl DrawingSurface for Recorder {
    fn page_size(&self) -> (f32, f32) {
        (595.0, 842.0)
    }

    fn line(&mut self, _from: Point, _to: Point, _width: f32, _color: Color) {
        self.lines += 1;
    }

    fn path(&mut self, _points: &[Point], _style: PathStyle) {}

    fn text(&mut self, text: &str, _origin: Point, _size: f32, _align: TextAlign, _color: Color) {
        self.labels.push(text.to_string());
    }

    fn image(
        &mut self,
        _image: &image::RgbaImage,
        _origin: Point,
        _width: f32,
        _height: f32,
    ) -> Result<()> {
        Ok(())
    }
}

#[test]
fn test_render_draws_caps_ticks_and_labels() {
    // 1:10000 → 1000 m, ten divisions of ~28 pt, no subdivision
    let spec = ScaleBarSpec::compute(10_000.0);
    let mut surface = Recorder::default();
    render_scale_bar(&mut surface, &spec, Point::new(20.0, 20.0), 1.0, Color::BLACK);

    // Baseline, two caps and nine inner ticks
    assert_eq!(surface.lines, 12);
    assert_eq!(surface.labels, vec!["0", "0.5", "1 km"]);
}
