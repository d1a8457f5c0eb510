use glam::Vec2;

use crate::camera::CameraState;
use crate::error::SceneError;
use crate::world::{MaterialPalette, WorldGrid};

/// Everything a renderer reads during one frame.
///
/// Renderers only ever see `&Scene`, so the grid, palette and camera stay
/// fixed for the duration of a frame. Game logic mutates it between frames.
#[derive(Debug, Clone)]
pub struct Scene {
    grid: WorldGrid,
    palette: MaterialPalette,
    camera: CameraState,
}

impl Scene {
    pub fn new(
        grid: WorldGrid,
        palette: MaterialPalette,
        camera: CameraState,
    ) -> Result<Self, SceneError> {
        if palette.is_empty() {
            return Err(SceneError::EmptyPalette);
        }
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                let id = grid.cells()[y * grid.width() + x];
                if id as usize >= palette.len() {
                    return Err(SceneError::UnknownMaterial {
                        id,
                        x,
                        y,
                        len: palette.len(),
                    });
                }
            }
        }
        let scene = Self {
            grid,
            palette,
            camera,
        };
        scene.check_camera(camera.position)?;
        Ok(scene)
    }

    /// The built-in map with the player at (22, 12) facing -X.
    pub fn demo(fov_x_deg: f32) -> Result<Self, SceneError> {
        let camera = CameraState::from_yaw(Vec2::new(22.0, 12.0), std::f32::consts::PI, fov_x_deg);
        Self::new(WorldGrid::default(), MaterialPalette::default(), camera)
    }

    pub fn cell_material(&self, x: i32, y: i32) -> u8 {
        self.grid.material_at(x, y)
    }

    pub fn camera_position(&self) -> Vec2 {
        self.camera.position
    }

    pub fn camera_forward(&self) -> Vec2 {
        self.camera.forward
    }

    pub fn camera_right(&self) -> Vec2 {
        self.camera.right
    }

    pub fn grid(&self) -> &WorldGrid {
        &self.grid
    }

    pub fn palette(&self) -> &MaterialPalette {
        &self.palette
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    /// Replace the camera. Positions outside the grid are refused.
    pub fn set_camera(&mut self, camera: CameraState) -> Result<(), SceneError> {
        self.check_camera(camera.position)?;
        self.camera = camera;
        Ok(())
    }

    pub fn rotate_camera(&mut self, radians: f32) {
        self.camera.rotate(radians);
    }

    /// Move the camera, sliding along walls: each axis is applied only when
    /// the destination cell on that axis is empty. Anything off the grid
    /// counts as solid.
    pub fn try_move(&mut self, delta: Vec2) {
        let pos = self.camera.position;
        let nx = pos.x + delta.x;
        if self.is_open(nx, pos.y) {
            self.camera.position.x = nx;
        }
        let pos = self.camera.position;
        let ny = pos.y + delta.y;
        if self.is_open(pos.x, ny) {
            self.camera.position.y = ny;
        }
    }

    fn is_open(&self, x: f32, y: f32) -> bool {
        if !(x >= 0.0 && y >= 0.0) {
            return false;
        }
        self.grid.get(x as usize, y as usize) == Some(0)
    }

    pub fn set_cell(&mut self, x: usize, y: usize, id: u8) -> Result<(), SceneError> {
        if id as usize >= self.palette.len() {
            return Err(SceneError::UnknownMaterial {
                id,
                x,
                y,
                len: self.palette.len(),
            });
        }
        self.grid.set_cell(x, y, id)?;
        Ok(())
    }

    fn check_camera(&self, p: Vec2) -> Result<(), SceneError> {
        let inside = p.x >= 0.0
            && p.y >= 0.0
            && p.x < self.grid.width() as f32
            && p.y < self.grid.height() as f32;
        if !inside {
            return Err(SceneError::CameraOutside { x: p.x, y: p.y });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GridError;

    fn ring_scene(camera: CameraState) -> Result<Scene, SceneError> {
        Scene::new(
            WorldGrid::ring(8, 8, 1).unwrap(),
            MaterialPalette::default(),
            camera,
        )
    }

    #[test]
    fn demo_scene_builds() {
        let scene = Scene::demo(66.0).unwrap();
        assert_eq!(scene.camera_position(), Vec2::new(22.0, 12.0));
        assert!(scene.camera_forward().x < -0.99);
        assert_eq!(scene.cell_material(0, 0), 1);
    }

    #[test]
    fn unknown_material_is_rejected() {
        let grid = WorldGrid::ring(4, 4, 9).unwrap();
        let cam = CameraState::from_yaw(Vec2::splat(2.0), 0.0, 90.0);
        let err = Scene::new(grid, MaterialPalette::default(), cam).unwrap_err();
        assert!(matches!(err, SceneError::UnknownMaterial { id: 9, .. }));
    }

    #[test]
    fn camera_outside_grid_is_rejected() {
        let cam = CameraState::from_yaw(Vec2::new(-0.5, 3.0), 0.0, 90.0);
        assert!(matches!(
            ring_scene(cam),
            Err(SceneError::CameraOutside { .. })
        ));
    }

    #[test]
    fn try_move_slides_along_walls() {
        let cam = CameraState::from_yaw(Vec2::new(1.5, 1.5), 0.0, 90.0);
        let mut scene = ring_scene(cam).unwrap();

        // Blocked on x by the west wall, free on y.
        scene.try_move(Vec2::new(-1.0, 0.5));
        assert_eq!(scene.camera_position(), Vec2::new(1.5, 2.0));

        scene.try_move(Vec2::new(2.0, 0.0));
        assert_eq!(scene.camera_position(), Vec2::new(3.5, 2.0));
    }

    #[test]
    fn try_move_never_leaves_the_grid() {
        let cam = CameraState::from_yaw(Vec2::new(6.5, 1.5), 0.0, 90.0);
        let mut scene = ring_scene(cam).unwrap();
        // Jumps clear over the east wall; x = 9 must not wrap into the next row.
        scene.try_move(Vec2::new(3.0, 0.0));
        assert_eq!(scene.camera_position(), Vec2::new(6.5, 1.5));

        let cam = CameraState::from_yaw(Vec2::new(1.5, 1.5), 0.0, 90.0);
        let mut scene = ring_scene(cam).unwrap();
        scene.try_move(Vec2::new(-3.0, 0.0));
        scene.try_move(Vec2::new(0.0, -3.0));
        assert_eq!(scene.camera_position(), Vec2::new(1.5, 1.5));

        scene.try_move(Vec2::new(f32::NAN, 40.0));
        assert_eq!(scene.camera_position(), Vec2::new(1.5, 1.5));
    }

    #[test]
    fn set_cell_validates_palette_and_border() {
        let cam = CameraState::from_yaw(Vec2::new(1.5, 1.5), 0.0, 90.0);
        let mut scene = ring_scene(cam).unwrap();
        assert!(scene.set_cell(3, 3, 2).is_ok());
        assert_eq!(scene.cell_material(3, 3), 2);
        assert!(matches!(
            scene.set_cell(3, 3, 42),
            Err(SceneError::UnknownMaterial { id: 42, .. })
        ));
        assert_eq!(
            scene.set_cell(0, 3, 0),
            Err(SceneError::Grid(GridError::OpenBorder { x: 0, y: 3 }))
        );
    }
}
