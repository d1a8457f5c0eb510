//! Grid raycaster with interchangeable execution strategies.
//!
//! A [`Scene`] holds a closed 2D grid of materials, a palette and a camera.
//! For every screen column a ray is walked through the grid with DDA until it
//! enters a solid cell, and the perpendicular hit distance decides the height
//! of the wall stripe drawn in that column.
//!
//! Four strategies produce the same frame:
//!
//! - [`render::ScalarRenderer`]: one column at a time.
//! - [`render::VectorizedRenderer`]: eight columns per step in lockstep lanes.
//! - [`render::ParallelRenderer`]: column batches on a rayon pool.
//! - [`gpu::GpuRenderer`]: a compute dispatch plus instanced draw.

pub mod camera;
pub mod config;
pub mod error;
pub mod framebuffer;
pub mod gpu;
pub mod lanes;
pub mod present;
pub mod raycast;
pub mod render;
pub mod scaler;
pub mod scene;
pub mod world;

pub use camera::CameraState;
pub use config::{ColumnKernel, RenderConfig, Strategy};
pub use error::Error;
pub use framebuffer::FrameBuffer;
pub use render::Renderer;
pub use scene::Scene;
pub use world::{MaterialPalette, WorldGrid};
