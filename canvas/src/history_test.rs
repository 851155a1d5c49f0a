use super::*;

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

/// Draw a complete one-segment stroke whose start x identifies it.
fn draw(store: &mut StrokeStore, tag: f64) {
    store.begin_stroke(Tool::Brush, "#000000", 2.0, pt(tag, 0.0));
    store.extend_stroke(pt(tag, 10.0));
    store.end_stroke();
}

fn tags(strokes: &[Stroke]) -> Vec<f64> {
    strokes.iter().map(|s| s.points[0].x).collect()
}

// =============================================================
// Basic lifecycle
// =============================================================

#[test]
fn new_store_is_empty_with_cursor_minus_one() {
    let store = StrokeStore::new();
    assert_eq!(store.cursor(), -1);
    assert!(store.is_empty());
    assert!(store.active_prefix().is_empty());
    assert!(!store.can_undo());
    assert!(!store.can_redo());
}

#[test]
fn begin_seeds_one_point_and_moves_cursor() {
    let mut store = StrokeStore::new();
    store.begin_stroke(Tool::Brush, "#FF0000", 4.0, pt(1.0, 2.0));

    assert_eq!(store.cursor(), 0);
    assert!(store.is_drawing());
    let current = store.current().expect("stroke should be active");
    assert_eq!(current.points, vec![pt(1.0, 2.0)]);
    assert_eq!(current.color, "#FF0000");
}

#[test]
fn extend_appends_to_current_stroke_only() {
    let mut store = StrokeStore::new();
    draw(&mut store, 1.0);
    store.begin_stroke(Tool::Brush, "#000000", 2.0, pt(5.0, 5.0));
    assert!(store.extend_stroke(pt(6.0, 6.0)));

    assert_eq!(store.entries()[0].points.len(), 2);
    assert_eq!(store.entries()[1].points, vec![pt(5.0, 5.0), pt(6.0, 6.0)]);
}

#[test]
fn extend_without_active_stroke_is_noop() {
    let mut store = StrokeStore::new();
    assert!(!store.extend_stroke(pt(1.0, 1.0)));
    assert!(store.is_empty());
}

#[test]
fn extend_after_end_is_rejected() {
    let mut store = StrokeStore::new();
    draw(&mut store, 1.0);
    assert!(!store.extend_stroke(pt(99.0, 99.0)));
    assert_eq!(store.entries()[0].points.len(), 2);
}

#[test]
fn undo_ends_in_progress_stroke() {
    let mut store = StrokeStore::new();
    draw(&mut store, 1.0);
    store.begin_stroke(Tool::Brush, "#000000", 2.0, pt(2.0, 0.0));
    store.undo();

    assert!(!store.is_drawing());
    assert!(!store.extend_stroke(pt(3.0, 3.0)));
    assert_eq!(store.entries()[1].points.len(), 1);
}

// =============================================================
// Undo / redo boundaries
// =============================================================

#[test]
fn undo_at_empty_canvas_is_noop() {
    let mut store = StrokeStore::new();
    store.undo();
    store.undo();
    assert_eq!(store.cursor(), -1);
}

#[test]
fn undo_to_empty_then_further_undo_is_noop() {
    let mut store = StrokeStore::new();
    draw(&mut store, 1.0);
    store.undo();
    assert_eq!(store.cursor(), -1);
    store.undo();
    assert_eq!(store.cursor(), -1);
    assert_eq!(store.len(), 1);
}

#[test]
fn redo_at_tail_is_noop() {
    let mut store = StrokeStore::new();
    draw(&mut store, 1.0);
    draw(&mut store, 2.0);
    store.redo();
    assert_eq!(store.cursor(), 1);
    assert_eq!(tags(store.active_prefix()), vec![1.0, 2.0]);
}

#[test]
fn undo_hides_and_redo_restores() {
    let mut store = StrokeStore::new();
    draw(&mut store, 1.0);
    draw(&mut store, 2.0);

    store.undo();
    assert_eq!(tags(store.active_prefix()), vec![1.0]);
    assert_eq!(store.len(), 2);

    store.redo();
    assert_eq!(tags(store.active_prefix()), vec![1.0, 2.0]);
}

// =============================================================
// Truncation
// =============================================================

#[test]
fn drawing_after_undo_truncates_redo_history() {
    let mut store = StrokeStore::new();
    draw(&mut store, 1.0); // A
    draw(&mut store, 2.0); // B
    draw(&mut store, 3.0); // C
    assert_eq!(store.cursor(), 2);

    store.undo();
    store.undo();
    assert_eq!(store.cursor(), 0);

    draw(&mut store, 4.0); // D
    assert_eq!(tags(store.entries()), vec![1.0, 4.0]);
    assert_eq!(store.cursor(), 1);
    assert!(!store.can_redo());

    store.redo();
    assert_eq!(tags(store.active_prefix()), vec![1.0, 4.0]);
}

#[test]
fn drawing_after_undo_to_empty_discards_everything() {
    let mut store = StrokeStore::new();
    draw(&mut store, 1.0);
    draw(&mut store, 2.0);
    store.undo();
    store.undo();

    draw(&mut store, 9.0);
    assert_eq!(tags(store.entries()), vec![9.0]);
    assert_eq!(store.cursor(), 0);
}

#[test]
fn clear_drops_redo_state_too() {
    let mut store = StrokeStore::new();
    draw(&mut store, 1.0);
    draw(&mut store, 2.0);
    store.undo();
    store.clear();

    assert_eq!(store.cursor(), -1);
    assert!(store.is_empty());
    store.redo();
    assert_eq!(store.cursor(), -1);
}

#[test]
fn load_makes_every_stroke_active() {
    let mut seed = StrokeStore::new();
    draw(&mut seed, 1.0);
    draw(&mut seed, 2.0);

    let mut store = StrokeStore::new();
    draw(&mut store, 7.0);
    store.load(seed.entries().to_vec());

    assert_eq!(store.cursor(), 1);
    assert_eq!(tags(store.active_prefix()), vec![1.0, 2.0]);
    assert!(!store.can_redo());
}

// =============================================================
// Randomized invariants
// =============================================================

/// Tiny deterministic generator so the sequence is reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }
}

#[test]
fn cursor_and_prefix_stay_in_bounds_for_random_sequences() {
    for seed in 0..32 {
        let mut rng = Lcg(seed);
        let mut store = StrokeStore::new();

        for step in 0..400 {
            #[allow(clippy::cast_precision_loss)]
            let p = pt(step as f64, (rng.next() % 500) as f64);
            match rng.next() % 6 {
                0 => store.begin_stroke(Tool::Brush, "#000000", 1.0, p),
                1 => {
                    store.extend_stroke(p);
                }
                2 => store.end_stroke(),
                3 => store.undo(),
                4 => store.redo(),
                _ => {
                    if rng.next() % 20 == 0 {
                        store.clear();
                    }
                }
            }

            let len = isize::try_from(store.len()).expect("len fits isize");
            assert!(store.cursor() >= -1, "seed {seed} step {step}: cursor below -1");
            assert!(store.cursor() <= len - 1, "seed {seed} step {step}: cursor past tail");
            assert!(store.active_prefix().len() <= store.len());
            assert_eq!(
                store.active_prefix().len(),
                usize::try_from(store.cursor() + 1).expect("non-negative")
            );
        }
    }
}
