//! DDA grid traversal for one screen column.
//!
//! Scalar reference path. [`crate::lanes`] runs the same steps eight columns
//! at a time and must agree with this module bit for bit, so both share
//! [`Ray::new`], [`draw_span`] and [`shade`].

use crate::camera::CameraState;
use crate::world::{MaterialPalette, WorldGrid};

/// Delta distance for an axis the ray never crosses.
pub const NO_CROSSING: f32 = 1e30;

/// Axis whose grid line the ray crossed last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitSide {
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnHit {
    /// Distance along the view axis, not along the ray.
    pub distance: f32,
    pub material: u8,
    pub side: HitSide,
}

/// Horizontal screen coordinate of a column, in `[-1, 1)`.
#[inline(always)]
pub fn camera_x(column: usize, screen_width: usize) -> f32 {
    (2 * column) as f32 / screen_width as f32 - 1.0
}

#[inline(always)]
fn axis_delta(dir: f32) -> f32 {
    if dir == 0.0 { NO_CROSSING } else { (1.0 / dir).abs() }
}

/// Traversal state of a single ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub dir_x: f32,
    pub dir_y: f32,
    pub map_x: i32,
    pub map_y: i32,
    pub step_x: i32,
    pub step_y: i32,
    pub delta_x: f32,
    pub delta_y: f32,
    pub side_x: f32,
    pub side_y: f32,
}

impl Ray {
    pub fn new(camera: &CameraState, column: usize, screen_width: usize) -> Self {
        let cx = camera_x(column, screen_width);
        let dir_x = camera.forward.x + camera.right.x * cx;
        let dir_y = camera.forward.y + camera.right.y * cx;
        Self::from_direction(camera.position.x, camera.position.y, dir_x, dir_y)
    }

    pub fn from_direction(pos_x: f32, pos_y: f32, dir_x: f32, dir_y: f32) -> Self {
        let map_x = pos_x.floor() as i32;
        let map_y = pos_y.floor() as i32;
        let delta_x = axis_delta(dir_x);
        let delta_y = axis_delta(dir_y);

        let (step_x, side_x) = if dir_x < 0.0 {
            (-1, (pos_x - map_x as f32) * delta_x)
        } else {
            (1, (map_x as f32 + 1.0 - pos_x) * delta_x)
        };
        let (step_y, side_y) = if dir_y < 0.0 {
            (-1, (pos_y - map_y as f32) * delta_y)
        } else {
            (1, (map_y as f32 + 1.0 - pos_y) * delta_y)
        };

        Self {
            dir_x,
            dir_y,
            map_x,
            map_y,
            step_x,
            step_y,
            delta_x,
            delta_y,
            side_x,
            side_y,
        }
    }

    /// Move into the next cell along whichever axis boundary is nearer.
    /// Ties step along Y.
    #[inline(always)]
    pub fn advance(&mut self) -> HitSide {
        if self.side_x < self.side_y {
            self.side_x += self.delta_x;
            self.map_x += self.step_x;
            HitSide::X
        } else {
            self.side_y += self.delta_y;
            self.map_y += self.step_y;
            HitSide::Y
        }
    }

    /// Distance to the boundary just crossed on `side`, undoing the last advance.
    #[inline(always)]
    pub fn perpendicular_distance(&self, side: HitSide) -> f32 {
        match side {
            HitSide::X => self.side_x - self.delta_x,
            HitSide::Y => self.side_y - self.delta_y,
        }
    }
}

/// Walk `ray` until it enters a solid cell.
///
/// A ray that starts inside a solid cell stops after its first step and
/// reports distance `0.0` with the starting cell's material.
pub fn traverse(grid: &WorldGrid, mut ray: Ray) -> ColumnHit {
    let inside = grid.material_at(ray.map_x, ray.map_y);
    loop {
        let side = ray.advance();
        if inside != 0 {
            return ColumnHit {
                distance: 0.0,
                material: inside,
                side,
            };
        }
        let material = grid.material_at(ray.map_x, ray.map_y);
        if material != 0 {
            return ColumnHit {
                distance: ray.perpendicular_distance(side),
                material,
                side,
            };
        }
    }
}

pub fn cast_column(grid: &WorldGrid, camera: &CameraState, column: usize, screen_width: usize) -> ColumnHit {
    traverse(grid, Ray::new(camera, column, screen_width))
}

/// Inclusive row range of the wall stripe for a hit at `distance`.
#[inline]
pub fn draw_span(distance: f32, height: usize) -> (usize, usize) {
    let h = height as i64;
    // `as` saturates, so a zero distance gives a full-height stripe.
    let line_height = (height as f32 / distance) as i64;
    let start = (h / 2 - line_height / 2).clamp(0, h - 1);
    let end = (line_height / 2 + h / 2).clamp(0, h - 1);
    (start as usize, end as usize)
}

/// Palette color, halved per channel for Y-side hits.
#[inline]
pub fn shade(palette: &MaterialPalette, hit: &ColumnHit) -> u32 {
    let color = palette.color(hit.material);
    match hit.side {
        HitSide::X => color,
        HitSide::Y => (color >> 1) & 0x007F_7F7F,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn ring() -> WorldGrid {
        WorldGrid::ring(24, 24, 1).unwrap()
    }

    #[test]
    fn camera_x_spans_screen() {
        assert_eq!(camera_x(0, 320), -1.0);
        assert_eq!(camera_x(160, 320), 0.0);
        assert!(camera_x(319, 320) < 1.0);
    }

    #[test]
    fn zero_x_direction_never_steps_on_x() {
        let mut ray = Ray::from_direction(12.5, 12.5, 0.0, 1.0);
        assert_eq!(ray.delta_x, NO_CROSSING);
        assert_eq!(ray.delta_y, 1.0);
        let hit = traverse(&ring(), ray);
        assert_eq!(hit.side, HitSide::Y);
        for _ in 0..10 {
            assert_eq!(ray.advance(), HitSide::Y);
            assert_eq!(ray.map_x, 12);
        }
    }

    #[test]
    fn negative_zero_direction_uses_sentinel() {
        let ray = Ray::from_direction(3.25, 3.25, -0.0, -1.0);
        assert_eq!(ray.delta_x, NO_CROSSING);
        assert_eq!(ray.step_x, 1);
        assert_eq!(ray.step_y, -1);
        assert_eq!(ray.side_y, 0.25);
    }

    #[test]
    fn x_hit_distance_is_side_minus_delta() {
        let grid = ring();
        let start = Ray::from_direction(12.3, 12.6, 1.0, 0.25);
        let hit = traverse(&grid, start);
        assert_eq!(hit.side, HitSide::X);

        // Replay the walk to capture the state at the hit.
        let mut ray = start;
        loop {
            let side = ray.advance();
            if grid.material_at(ray.map_x, ray.map_y) != 0 {
                assert_eq!(side, HitSide::X);
                break;
            }
        }
        assert_eq!(hit.distance, ray.side_x - ray.delta_x);

        // Perpendicular distance to the face at x = 23, not the ray length.
        assert!((hit.distance - (23.0 - 12.3)).abs() < 1e-4);
        let euclid = hit.distance * Vec2::new(1.0, 0.25).length();
        assert!(euclid > hit.distance + 0.1);
    }

    #[test]
    fn ring_scenario_has_uniform_distance() {
        let grid = ring();
        let cam = CameraState::new(Vec2::new(12.0, 12.0), Vec2::X, Vec2::Y);
        for column in 0..320 {
            let hit = cast_column(&grid, &cam, column, 320);
            assert_eq!(hit.distance, 11.0, "column {column}");
            assert_eq!(hit.material, 1);
            let expected = if column == 0 { HitSide::Y } else { HitSide::X };
            assert_eq!(hit.side, expected, "column {column}");
        }
    }

    #[test]
    fn inside_wall_stops_after_first_step() {
        let grid = ring();
        let cam = CameraState::new(Vec2::new(0.5, 5.5), Vec2::X, Vec2::Y * 0.66);
        for column in [0, 40, 79] {
            let hit = cast_column(&grid, &cam, column, 80);
            assert_eq!(hit.distance, 0.0);
            assert_eq!(hit.material, 1);
        }
        assert_eq!(draw_span(0.0, 120), (0, 119));
    }

    #[test]
    fn draw_span_clamps_and_centers() {
        assert_eq!(draw_span(11.0, 240), (110, 130));
        assert_eq!(draw_span(1.0, 240), (0, 239));
        assert_eq!(draw_span(0.25, 100), (0, 99));
        assert_eq!(draw_span(1000.0, 240), (120, 120));
    }

    #[test]
    fn y_side_halves_each_channel() {
        let palette = MaterialPalette::new(vec![0, 0x00FF_8101]);
        let x_hit = ColumnHit {
            distance: 1.0,
            material: 1,
            side: HitSide::X,
        };
        let y_hit = ColumnHit {
            side: HitSide::Y,
            ..x_hit
        };
        assert_eq!(shade(&palette, &x_hit), 0x00FF_8101);
        assert_eq!(shade(&palette, &y_hit), 0x007F_4000);
    }
}
