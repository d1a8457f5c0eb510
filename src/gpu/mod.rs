//! Device strategy: a compute pass casts one ray per column into a storage
//! buffer, then an instanced draw turns each column record into a quad.
//!
//! The compute and render passes are recorded into one encoder. wgpu orders
//! storage writes in the compute pass before any read in the following render
//! pass, so the pass boundary is the barrier between them.

pub mod device;
mod raycast;
mod surface;

pub use device::{AdapterInfo, GpuDevice, WorkgroupSize};
pub use raycast::{CameraUniforms, GpuColumn, GpuRenderer};
pub use surface::GpuSurface;
