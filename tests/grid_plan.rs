use gifsheet::{GridLayout, plan};

fn layout(columns: u32, rows: u32) -> GridLayout {
    GridLayout { columns, rows }
}

#[test]
fn known_counts() {
    let cases = [
        (0, true, layout(1, 1)),
        (1, true, layout(1, 1)),
        (2, true, layout(2, 1)),
        (3, true, layout(3, 1)),
        (4, true, layout(2, 2)),
        (5, false, layout(5, 1)),
        (5, true, layout(3, 2)),
        (7, true, layout(3, 3)),
        (10, true, layout(5, 2)),
        (12, true, layout(4, 3)),
        (16, true, layout(4, 4)),
        (64, true, layout(8, 8)),
    ];
    for (n, avoid, expected) in cases {
        assert_eq!(plan(n, avoid), expected, "frame count {n}, avoid {avoid}");
    }
}

#[test]
fn every_layout_holds_all_frames_with_columns_first() {
    for n in 1..=300 {
        for avoid in [false, true] {
            let g = plan(n, avoid);
            assert!(g.cells() >= n as u64, "{n}: {g}");
            assert!(g.columns >= g.rows, "{n}: {g}");
            assert!(g.rows >= 1);
        }
    }
}

#[test]
fn even_counts_ignore_the_flag() {
    for n in (2..=200).step_by(2) {
        assert_eq!(plan(n, false), plan(n, true), "{n}");
    }
}

#[test]
fn plan_is_deterministic() {
    for n in 0..100 {
        assert_eq!(plan(n, true), plan(n, true));
    }
}

#[test]
fn display_is_columns_by_rows() {
    assert_eq!(plan(10, true).to_string(), "5x2");
}
