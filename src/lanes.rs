//! Eight-column DDA batches.
//!
//! A [`LaneBatch`] keeps the traversal state of eight rays as
//! structure-of-arrays registers and advances them in lockstep. Branches of
//! the scalar loop become masks: every iteration computes both the X and Y
//! step for all lanes and blends in the one each lane takes. Finished lanes
//! are frozen by the `done` mask while the rest keep walking.
//!
//! The per-ray setup is [`Ray::new`] and every arithmetic step matches
//! [`crate::raycast::traverse`], so the results are bit-identical to the
//! scalar path.

use std::ops::{Add, BitAnd, BitOr, Not};

use crate::camera::CameraState;
use crate::raycast::{ColumnHit, HitSide, Ray};
use crate::world::WorldGrid;

pub const LANES: usize = 8;

/// One bit per lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mask(u8);

impl Mask {
    pub const NONE: Mask = Mask(0);
    pub const ALL: Mask = Mask(u8::MAX);

    /// Lanes `0..n` set.
    pub fn first(n: usize) -> Mask {
        if n >= LANES { Mask::ALL } else { Mask((1u8 << n) - 1) }
    }

    #[inline(always)]
    pub fn test(self, lane: usize) -> bool {
        self.0 & (1 << lane) != 0
    }

    #[inline(always)]
    fn from_fn(f: impl Fn(usize) -> bool) -> Mask {
        let mut bits = 0u8;
        for lane in 0..LANES {
            bits |= (f(lane) as u8) << lane;
        }
        Mask(bits)
    }

    fn set(&mut self, lane: usize) {
        self.0 |= 1 << lane;
    }
}

impl Not for Mask {
    type Output = Mask;
    fn not(self) -> Mask {
        Mask(!self.0)
    }
}

impl BitAnd for Mask {
    type Output = Mask;
    fn bitand(self, rhs: Mask) -> Mask {
        Mask(self.0 & rhs.0)
    }
}

impl BitOr for Mask {
    type Output = Mask;
    fn bitor(self, rhs: Mask) -> Mask {
        Mask(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct F32s([f32; LANES]);

impl F32s {
    #[inline(always)]
    fn lt(self, rhs: F32s) -> Mask {
        Mask::from_fn(|i| self.0[i] < rhs.0[i])
    }

    #[inline(always)]
    fn select(mask: Mask, a: F32s, b: F32s) -> F32s {
        F32s(std::array::from_fn(|i| if mask.test(i) { a.0[i] } else { b.0[i] }))
    }
}

impl Add for F32s {
    type Output = F32s;
    #[inline(always)]
    fn add(self, rhs: F32s) -> F32s {
        F32s(std::array::from_fn(|i| self.0[i] + rhs.0[i]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct I32s([i32; LANES]);

impl I32s {
    #[inline(always)]
    fn select(mask: Mask, a: I32s, b: I32s) -> I32s {
        I32s(std::array::from_fn(|i| if mask.test(i) { a.0[i] } else { b.0[i] }))
    }
}

impl Add for I32s {
    type Output = I32s;
    #[inline(always)]
    fn add(self, rhs: I32s) -> I32s {
        I32s(std::array::from_fn(|i| self.0[i].wrapping_add(rhs.0[i])))
    }
}

/// Eight rays advanced together.
#[derive(Debug, Clone)]
pub struct LaneBatch {
    map_x: I32s,
    map_y: I32s,
    step_x: I32s,
    step_y: I32s,
    delta_x: F32s,
    delta_y: F32s,
    side_x: F32s,
    side_y: F32s,
    /// Lanes whose last step crossed a Y boundary.
    y_side: Mask,
    done: Mask,
    material: [u8; LANES],
    distance: [f32; LANES],
}

impl LaneBatch {
    /// Set up rays for columns `first_column..first_column + LANES`. Lanes at
    /// or past `screen_width` start finished and report nothing.
    pub fn new(camera: &CameraState, first_column: usize, screen_width: usize) -> Self {
        let live = Mask::first(screen_width.saturating_sub(first_column));
        let rays: [Ray; LANES] = std::array::from_fn(|lane| {
            let column = (first_column + lane).min(screen_width - 1);
            Ray::new(camera, column, screen_width)
        });
        Self {
            map_x: I32s(rays.map(|r| r.map_x)),
            map_y: I32s(rays.map(|r| r.map_y)),
            step_x: I32s(rays.map(|r| r.step_x)),
            step_y: I32s(rays.map(|r| r.step_y)),
            delta_x: F32s(rays.map(|r| r.delta_x)),
            delta_y: F32s(rays.map(|r| r.delta_y)),
            side_x: F32s(rays.map(|r| r.side_x)),
            side_y: F32s(rays.map(|r| r.side_y)),
            y_side: Mask::NONE,
            done: !live,
            material: [0; LANES],
            distance: [0.0; LANES],
        }
    }

    pub fn done(&self) -> Mask {
        self.done
    }

    /// Advance every unfinished lane by one cell. Finished lanes keep their state.
    #[inline(always)]
    pub fn step(&mut self) {
        let live = !self.done;
        let closer_x = self.side_x.lt(self.side_y);
        let take_x = closer_x & live;
        let take_y = !closer_x & live;

        self.side_x = F32s::select(take_x, self.side_x + self.delta_x, self.side_x);
        self.map_x = I32s::select(take_x, self.map_x + self.step_x, self.map_x);
        self.side_y = F32s::select(take_y, self.side_y + self.delta_y, self.side_y);
        self.map_y = I32s::select(take_y, self.map_y + self.step_y, self.map_y);
        self.y_side = (self.y_side & self.done) | take_y;
    }

    fn side(&self, lane: usize) -> HitSide {
        if self.y_side.test(lane) { HitSide::Y } else { HitSide::X }
    }

    /// Record hits for live lanes that now stand in a solid cell.
    fn resolve_hits(&mut self, grid: &WorldGrid) {
        for lane in 0..LANES {
            if self.done.test(lane) {
                continue;
            }
            let material = grid.material_at(self.map_x.0[lane], self.map_y.0[lane]);
            if material != 0 {
                self.material[lane] = material;
                self.distance[lane] = match self.side(lane) {
                    HitSide::X => self.side_x.0[lane] - self.delta_x.0[lane],
                    HitSide::Y => self.side_y.0[lane] - self.delta_y.0[lane],
                };
                self.done.set(lane);
            }
        }
    }

    /// Lanes whose ray starts inside a solid cell finish after the first step
    /// with distance zero, as the scalar path does.
    fn resolve_inside(&mut self, grid: &WorldGrid, start: &[(i32, i32); LANES]) {
        for (lane, &(x, y)) in start.iter().enumerate() {
            if self.done.test(lane) {
                continue;
            }
            let material = grid.material_at(x, y);
            if material != 0 {
                self.material[lane] = material;
                self.distance[lane] = 0.0;
                self.done.set(lane);
            }
        }
    }

    /// Run the batch to completion.
    pub fn run(mut self, grid: &WorldGrid) -> [ColumnHit; LANES] {
        let start: [(i32, i32); LANES] = std::array::from_fn(|i| (self.map_x.0[i], self.map_y.0[i]));

        self.step();
        self.resolve_inside(grid, &start);
        self.resolve_hits(grid);
        while self.done != Mask::ALL {
            self.step();
            self.resolve_hits(grid);
        }

        std::array::from_fn(|lane| ColumnHit {
            distance: self.distance[lane],
            material: self.material[lane],
            side: self.side(lane),
        })
    }
}

/// Cast `LANES` columns starting at `first_column`. Only the first
/// `min(LANES, screen_width - first_column)` entries are meaningful.
pub fn cast_lanes(
    grid: &WorldGrid,
    camera: &CameraState,
    first_column: usize,
    screen_width: usize,
) -> [ColumnHit; LANES] {
    LaneBatch::new(camera, first_column, screen_width).run(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raycast::cast_column;
    use glam::Vec2;

    fn assert_matches_scalar(grid: &WorldGrid, cam: &CameraState, width: usize) {
        for first in (0..width).step_by(LANES) {
            let hits = cast_lanes(grid, cam, first, width);
            for lane in 0..LANES.min(width - first) {
                let scalar = cast_column(grid, cam, first + lane, width);
                let lane_hit = hits[lane];
                assert_eq!(
                    lane_hit.distance.to_bits(),
                    scalar.distance.to_bits(),
                    "column {}",
                    first + lane
                );
                assert_eq!(lane_hit.material, scalar.material);
                assert_eq!(lane_hit.side, scalar.side);
            }
        }
    }

    #[test]
    fn mask_helpers() {
        assert_eq!(Mask::first(0), Mask::NONE);
        assert_eq!(Mask::first(3), Mask(0b111));
        assert_eq!(Mask::first(8), Mask::ALL);
        assert_eq!(Mask::first(20), Mask::ALL);
        assert!(Mask(0b100).test(2));
        assert!(!Mask(0b100).test(1));
    }

    #[test]
    fn finished_lanes_are_frozen() {
        let grid = WorldGrid::ring(24, 24, 1).unwrap();
        let cam = CameraState::new(Vec2::new(12.5, 12.5), Vec2::X, Vec2::Y);
        // Only two live lanes.
        let mut batch = LaneBatch::new(&cam, 318, 320);
        assert_eq!(batch.done(), !Mask::first(2));
        let frozen = (batch.side_x.0[5], batch.map_x.0[5], batch.map_y.0[5]);
        for _ in 0..4 {
            batch.step();
        }
        assert_eq!((batch.side_x.0[5], batch.map_x.0[5], batch.map_y.0[5]), frozen);
        assert_ne!(batch.map_x.0[0], 12);
    }

    #[test]
    fn matches_scalar_in_default_map() {
        let grid = WorldGrid::default();
        for (i, yaw) in [0.0f32, 0.7, 1.6, 2.9, 3.1, 4.4, 5.9].iter().enumerate() {
            let pos = Vec2::new(10.3 + i as f32 * 0.9, 12.7 - i as f32 * 0.35);
            let cam = CameraState::from_yaw(pos, *yaw, 66.0);
            assert_matches_scalar(&grid, &cam, 203);
        }
    }

    #[test]
    fn matches_scalar_on_axis_aligned_rays() {
        let grid = WorldGrid::ring(24, 24, 1).unwrap();
        let cam = CameraState::new(Vec2::new(12.0, 12.0), Vec2::X, Vec2::Y);
        assert_matches_scalar(&grid, &cam, 320);
        let cam = CameraState::new(Vec2::new(7.0, 3.0), Vec2::NEG_Y, Vec2::X);
        assert_matches_scalar(&grid, &cam, 17);
    }

    #[test]
    fn matches_scalar_inside_a_wall() {
        let grid = WorldGrid::ring(24, 24, 1).unwrap();
        let cam = CameraState::new(Vec2::new(23.5, 8.25), Vec2::NEG_X, Vec2::Y * 0.66);
        assert_matches_scalar(&grid, &cam, 40);
        let hits = cast_lanes(&grid, &cam, 0, 40);
        assert!(hits.iter().all(|h| h.distance == 0.0 && h.material == 1));
    }
}
