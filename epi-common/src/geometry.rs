use serde::{Deserialize, Serialize};

use crate::vecmath::Vec2;

/// Inclusive rectangle of integer cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexBox {
    pub lo: [i32; 2],
    pub hi: [i32; 2],
}

impl IndexBox {
    pub fn new(lo: [i32; 2], hi: [i32; 2]) -> Self {
        Self { lo, hi }
    }

    #[inline(always)]
    pub fn len(&self, dim: usize) -> i32 {
        self.hi[dim] - self.lo[dim] + 1
    }

    /// Number of cells covered by the box (0 for an inverted box).
    #[inline]
    pub fn num_cells(&self) -> usize {
        (self.len(0).max(0) as usize) * (self.len(1).max(0) as usize)
    }

    #[inline(always)]
    pub fn contains(&self, cell: [i32; 2]) -> bool {
        cell[0] >= self.lo[0] && cell[0] <= self.hi[0] && cell[1] >= self.lo[1] && cell[1] <= self.hi[1]
    }

    /// Flat, x-fastest index of `cell` relative to the box's lower corner.
    #[inline(always)]
    pub fn flat_index(&self, cell: [i32; 2]) -> usize {
        let ix = (cell[0] - self.lo[0]) as usize;
        let iy = (cell[1] - self.lo[1]) as usize;
        iy * self.len(0) as usize + ix
    }

    /// Splits the box into tiles of at most `max_size` cells per dimension.
    pub fn chop(&self, max_size: i32) -> Vec<IndexBox> {
        let max_size = max_size.max(1);
        let mut tiles = Vec::new();
        let mut y = self.lo[1];
        while y <= self.hi[1] {
            let y_hi = (y + max_size - 1).min(self.hi[1]);
            let mut x = self.lo[0];
            while x <= self.hi[0] {
                let x_hi = (x + max_size - 1).min(self.hi[0]);
                tiles.push(IndexBox::new([x, y], [x_hi, y_hi]));
                x = x_hi + 1;
            }
            y = y_hi + 1;
        }
        tiles
    }
}

/// Physical extent and cell resolution of the simulated domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geometry {
    pub domain: IndexBox,
    pub prob_lo: [f32; 2],
    pub prob_hi: [f32; 2],
    /// Cell size per dimension.
    pub dx: [f32; 2],
    /// Inverse cell size per dimension.
    pub dxi: [f32; 2],
}

impl Geometry {
    pub fn new(size: [u32; 2], prob_lo: [f32; 2], prob_hi: [f32; 2]) -> Self {
        let domain = IndexBox::new([0, 0], [size[0] as i32 - 1, size[1] as i32 - 1]);
        let dx = [
            (prob_hi[0] - prob_lo[0]) / size[0] as f32,
            (prob_hi[1] - prob_lo[1]) / size[1] as f32,
        ];
        let dxi = [1.0 / dx[0], 1.0 / dx[1]];
        Self { domain, prob_lo, prob_hi, dx, dxi }
    }

    /// Integer cell containing `pos`. Truncates toward negative infinity; the
    /// result is not clamped to the domain.
    #[inline(always)]
    pub fn cell_of(&self, pos: Vec2) -> [i32; 2] {
        [
            ((pos.x - self.prob_lo[0]) * self.dxi[0]).floor() as i32,
            ((pos.y - self.prob_lo[1]) * self.dxi[1]).floor() as i32,
        ]
    }

    /// Lower corner of `cell` in physical coordinates.
    #[inline]
    pub fn cell_lo(&self, cell: [i32; 2]) -> Vec2 {
        Vec2::new(
            self.prob_lo[0] + cell[0] as f32 * self.dx[0],
            self.prob_lo[1] + cell[1] as f32 * self.dx[1],
        )
    }

    /// Wraps `pos` back into the domain (periodic boundaries).
    pub fn wrap(&self, pos: Vec2) -> Vec2 {
        let wrap_axis = |v: f32, lo: f32, hi: f32| {
            let len = hi - lo;
            let w = lo + (v - lo).rem_euclid(len);
            // rem_euclid can round up to exactly `len`
            if w >= hi { lo } else { w }
        };
        Vec2::new(
            wrap_axis(pos.x, self.prob_lo[0], self.prob_hi[0]),
            wrap_axis(pos.y, self.prob_lo[1], self.prob_hi[1]),
        )
    }
}
