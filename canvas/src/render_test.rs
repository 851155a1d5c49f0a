use super::*;
use crate::history::StrokeStore;
use crate::raster::Raster;

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn line(tool: Tool, color: &str, width: f64, points: &[(f64, f64)]) -> Stroke {
    Stroke {
        tool,
        color: color.to_owned(),
        line_width: width,
        points: points.iter().map(|&(x, y)| pt(x, y)).collect(),
    }
}

fn red() -> Rgb {
    Rgb { r: 255, g: 0, b: 0 }
}

fn blue() -> Rgb {
    Rgb { r: 0, g: 0, b: 255 }
}

// =============================================================
// Recording surface
// =============================================================

#[derive(Default)]
struct Recorder {
    calls: Vec<String>,
    fail_on_clear: bool,
}

impl Surface for Recorder {
    type Error = &'static str;

    fn clear(&mut self) -> Result<(), Self::Error> {
        if self.fail_on_clear {
            return Err("context lost");
        }
        self.calls.push("clear".to_owned());
        Ok(())
    }

    fn stroke_polyline(&mut self, points: &[Point], style: &StrokeStyle) -> Result<(), Self::Error> {
        self.calls.push(format!("{}:{:?}:{}", style.color, style.mode, points.len()));
        Ok(())
    }
}

#[test]
fn render_clears_then_paints_in_order() {
    let strokes = vec![
        line(Tool::Brush, "#FF0000", 2.0, &[(0.0, 0.0), (1.0, 1.0)]),
        line(Tool::Eraser, "#FFFFFF", 8.0, &[(0.0, 0.0)]),
        line(Tool::Text, "#00F", 1.0, &[(0.0, 0.0), (2.0, 2.0), (3.0, 3.0)]),
    ];
    let mut rec = Recorder::default();
    render(&mut rec, &strokes).expect("render");

    assert_eq!(
        rec.calls,
        vec!["clear", "#FF0000:Paint:2", "#FFFFFF:Erase:1", "#0000FF:Paint:3"]
    );
}

#[test]
fn render_skips_empty_and_zero_width_strokes() {
    let strokes = vec![
        line(Tool::Brush, "#000", 2.0, &[]),
        line(Tool::Brush, "#000", 0.0, &[(1.0, 1.0)]),
        line(Tool::Brush, "#000", f64::NAN, &[(1.0, 1.0)]),
    ];
    let mut rec = Recorder::default();
    render(&mut rec, &strokes).expect("render");
    assert_eq!(rec.calls, vec!["clear"]);
}

#[test]
fn render_stops_at_first_surface_error() {
    let strokes = vec![line(Tool::Brush, "#000", 2.0, &[(0.0, 0.0)])];
    let mut rec = Recorder { fail_on_clear: true, ..Recorder::default() };
    assert_eq!(render(&mut rec, &strokes), Err("context lost"));
    assert!(rec.calls.is_empty());
}

#[test]
fn unparseable_color_falls_back_to_black() {
    let style = StrokeStyle::for_stroke(&line(Tool::Brush, "chartreuse", 1.0, &[(0.0, 0.0)]));
    assert_eq!(style.color, Rgb::BLACK);
}

// =============================================================
// Raster output
// =============================================================

#[test]
fn horizontal_line_covers_its_band_only() {
    let mut raster = Raster::new(40, 20);
    render(&mut raster, &[line(Tool::Brush, "#FF0000", 4.0, &[(5.0, 10.0), (35.0, 10.0)])]).expect("render");

    assert!(raster.is_color(20, 9, red()));
    assert!(raster.is_color(20, 10, red()));
    assert_eq!(raster.pixel(20, 2), Some([0, 0, 0, 0]));
    assert_eq!(raster.pixel(20, 17), Some([0, 0, 0, 0]));
}

#[test]
fn line_ends_are_rounded() {
    let mut raster = Raster::new(40, 40);
    render(&mut raster, &[line(Tool::Brush, "#FF0000", 10.0, &[(10.0, 20.0), (30.0, 20.0)])]).expect("render");

    // Past the endpoint on the axis is inside the cap; the square corner is not.
    assert!(raster.is_color(6, 19, red()));
    assert_eq!(raster.pixel(5, 15), Some([0, 0, 0, 0]));
}

#[test]
fn single_point_paints_round_dot() {
    let mut raster = Raster::new(30, 30);
    render(&mut raster, &[line(Tool::Brush, "#0000FF", 12.0, &[(15.0, 15.0)])]).expect("render");

    assert!(raster.is_color(15, 15, blue()));
    assert!(raster.is_color(10, 14, blue()));
    assert_eq!(raster.pixel(9, 9), Some([0, 0, 0, 0]));
    assert!(raster.painted() > 80);
}

#[test]
fn later_strokes_paint_over_earlier_ones() {
    let mut raster = Raster::new(30, 30);
    let strokes = vec![
        line(Tool::Brush, "#FF0000", 6.0, &[(0.0, 15.0), (30.0, 15.0)]),
        line(Tool::Brush, "#0000FF", 6.0, &[(15.0, 0.0), (15.0, 30.0)]),
    ];
    render(&mut raster, &strokes).expect("render");

    assert!(raster.is_color(15, 15, blue()));
    assert!(raster.is_color(3, 15, red()));
}

#[test]
fn eraser_clears_covered_pixels() {
    let mut raster = Raster::new(30, 30);
    let strokes = vec![
        line(Tool::Brush, "#FF0000", 6.0, &[(0.0, 15.0), (30.0, 15.0)]),
        line(Tool::Eraser, "#FFFFFF", 10.0, &[(15.0, 15.0)]),
    ];
    render(&mut raster, &strokes).expect("render");

    assert_eq!(raster.pixel(15, 15), Some([0, 0, 0, 0]));
    assert!(raster.is_color(2, 15, red()));
}

#[test]
fn geometry_outside_the_raster_is_clipped() {
    let mut raster = Raster::new(10, 10);
    render(&mut raster, &[line(Tool::Brush, "#FF0000", 4.0, &[(-50.0, -50.0), (-20.0, -20.0)])]).expect("render");
    assert_eq!(raster.painted(), 0);

    render(&mut raster, &[line(Tool::Brush, "#FF0000", 4.0, &[(-5.0, 5.0), (50.0, 5.0)])]).expect("render");
    assert!(raster.is_color(0, 5, red()));
    assert!(raster.is_color(9, 5, red()));
}

#[test]
fn render_forgets_previous_contents() {
    let mut raster = Raster::new(20, 20);
    render(&mut raster, &[line(Tool::Brush, "#FF0000", 6.0, &[(10.0, 10.0)])]).expect("render");
    assert!(raster.painted() > 0);

    let no_strokes: &[Stroke] = &[];
    render(&mut raster, no_strokes).expect("render");
    assert_eq!(raster.painted(), 0);
}

// =============================================================
// Replay equivalence
// =============================================================

fn drive(store: &mut StrokeStore, step: u32) {
    let f = f64::from(step);
    match step % 7 {
        0 | 3 => store.begin_stroke(
            if step % 5 == 0 { Tool::Eraser } else { Tool::Brush },
            if step % 2 == 0 { "#FF0000" } else { "#00F" },
            2.0 + f64::from(step % 4),
            pt((f * 7.0) % 48.0, (f * 3.0) % 48.0),
        ),
        1 | 4 => {
            store.extend_stroke(pt((f * 11.0) % 48.0, (f * 5.0) % 48.0));
        }
        2 => store.end_stroke(),
        5 => store.undo(),
        _ => store.redo(),
    }
}

#[test]
fn render_after_any_history_matches_replay_from_blank() {
    let mut store = StrokeStore::new();
    let mut live = Raster::new(48, 48);

    for step in 0..120 {
        drive(&mut store, step);
        render(&mut live, store.active_prefix()).expect("live render");

        let mut fresh = Raster::new(48, 48);
        render(&mut fresh, store.active_prefix()).expect("fresh render");
        assert_eq!(live, fresh, "divergence after step {step}");
    }
}

#[test]
fn undo_then_redo_restores_identical_pixels() {
    let mut store = StrokeStore::new();
    store.begin_stroke(Tool::Brush, "#FF0000", 4.0, pt(4.0, 4.0));
    store.extend_stroke(pt(40.0, 40.0));
    store.end_stroke();
    store.begin_stroke(Tool::Eraser, "#000", 8.0, pt(22.0, 22.0));
    store.end_stroke();

    let mut before = Raster::new(48, 48);
    render(&mut before, store.active_prefix()).expect("render");

    store.undo();
    let mut undone = Raster::new(48, 48);
    render(&mut undone, store.active_prefix()).expect("render");
    assert_ne!(before, undone);

    store.redo();
    let mut after = Raster::new(48, 48);
    render(&mut after, store.active_prefix()).expect("render");
    assert_eq!(before, after);
}
