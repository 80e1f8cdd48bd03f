//! Grid planning: choose a `columns x rows` layout for a frame count.

/// Tile arrangement of a sheet. Always `columns >= rows >= 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct GridLayout {
    pub columns: u32,
    pub rows: u32,
}

impl GridLayout {
    pub const SINGLE: Self = Self {
        columns: 1,
        rows: 1,
    };

    pub fn cells(self) -> u64 {
        u64::from(self.columns) * u64::from(self.rows)
    }

    /// `(column, row)` of the cell holding tile `index`, row-major.
    pub fn cell_of(self, index: usize) -> (u32, u32) {
        let cols = self.columns.max(1) as usize;
        ((index % cols) as u32, (index / cols) as u32)
    }
}

impl std::fmt::Display for GridLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.columns, self.rows)
    }
}

#[derive(Clone, Copy)]
struct Candidate {
    x: u64,
    y: u64,
    waste: u64,
}

impl Candidate {
    fn new(x: u64, frame_count: u64) -> Self {
        let y = frame_count.div_ceil(x);
        Self {
            x,
            y,
            waste: x * y - frame_count,
        }
    }

    /// Strictly better: less waste, then a more square `max/min` ratio.
    fn is_better_than(&self, other: &Self) -> bool {
        if self.waste != other.waste {
            return self.waste < other.waste;
        }
        // max_a/min_a < max_b/min_b  <=>  max_a*min_b < max_b*min_a
        let (a_max, a_min) = (self.x.max(self.y), self.x.min(self.y));
        let (b_max, b_min) = (other.x.max(other.y), other.x.min(other.y));
        u128::from(a_max) * u128::from(b_min) < u128::from(b_max) * u128::from(a_min)
    }
}

/// Plan the grid for `frame_count` tiles.
///
/// Searches column counts `1..=ceil(sqrt(2n)) + 1`, minimising wasted cells and then the aspect
/// ratio; the first candidate wins ties. With `avoid_single_row_for_odd_counts`, an odd count
/// above 3 that ends up as a single strip is re-laid out as `ceil(sqrt(n))` columns instead.
/// The result is always at least as wide as it is tall.
pub fn plan(frame_count: usize, avoid_single_row_for_odd_counts: bool) -> GridLayout {
    if frame_count <= 1 {
        return GridLayout::SINGLE;
    }
    let n = frame_count as u64;

    let max_x = isqrt_ceil(2 * n) + 1;
    let mut best = Candidate::new(1, n);
    for x in 2..=max_x {
        let candidate = Candidate::new(x, n);
        if candidate.is_better_than(&best) {
            best = candidate;
        }
    }

    let (mut x, mut y) = (best.x, best.y);
    if avoid_single_row_for_odd_counts && n > 3 && n % 2 == 1 && x.min(y) == 1 {
        x = isqrt_ceil(n);
        y = n.div_ceil(x);
    }

    if y > x {
        std::mem::swap(&mut x, &mut y);
    }

    GridLayout {
        columns: clamp_u32(x),
        rows: clamp_u32(y),
    }
}

fn clamp_u32(v: u64) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

/// Smallest `r` with `r * r >= n`.
fn isqrt_ceil(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let mut r = (n as f64).sqrt() as u64;
    while r.saturating_mul(r) < n {
        r += 1;
    }
    while r > 0 && (r - 1).saturating_mul(r - 1) >= n {
        r -= 1;
    }
    r
}
