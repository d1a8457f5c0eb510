use std::fmt;

use crate::error::ConfigError;

/// Execution strategy, chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Strategy {
    /// One column at a time on the calling thread.
    #[default]
    Scalar,
    /// Eight columns per step in lockstep lanes, single thread.
    Vectorized,
    /// Column batches on a work-stealing pool.
    Parallel,
    /// Compute dispatch plus instanced draw on the GPU.
    Device,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Scalar => write!(f, "scalar"),
            Strategy::Vectorized => write!(f, "vectorized"),
            Strategy::Parallel => write!(f, "parallel"),
            Strategy::Device => write!(f, "device"),
        }
    }
}

/// Per-column algorithm a parallel batch runs internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColumnKernel {
    #[default]
    Scalar,
    Lanes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub strategy: Strategy,
    pub kernel: ColumnKernel,
    pub width: usize,
    pub height: usize,
    /// Worker threads for the parallel strategy. `None` uses one per core.
    pub threads: Option<usize>,
    /// Columns per parallel task.
    pub batch_columns: usize,
    pub fov_degrees: f32,
    pub clear_color: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Scalar,
            kernel: ColumnKernel::Scalar,
            width: 640,
            height: 480,
            threads: None,
            batch_columns: 32,
            fov_degrees: 66.0,
            clear_color: 0,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ZeroFrame {
                width: self.width,
                height: self.height,
            });
        }
        if self.batch_columns == 0 {
            return Err(ConfigError::ZeroBatch);
        }
        if self.threads == Some(0) {
            return Err(ConfigError::ZeroThreads);
        }
        if !(self.fov_degrees > 0.0 && self.fov_degrees < 180.0) {
            return Err(ConfigError::FieldOfView(self.fov_degrees.to_string()));
        }
        Ok(())
    }
}

/// Internal frame size for a window: fixed height, width from the aspect
/// ratio, never narrower than 160 and always even.
pub fn internal_resolution(window_w: usize, window_h: usize, target_h: usize) -> (usize, usize) {
    let aspect = if window_h > 0 {
        window_w as f32 / window_h as f32
    } else {
        1.0
    };
    let mut width = ((target_h as f32 * aspect).round() as usize).max(160);
    if width % 2 != 0 {
        width += 1;
    }
    (width, target_h.max(1))
}
