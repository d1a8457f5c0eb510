use thiserror::Error;

/// Rejected world grids. Every variant is caught before the first frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("grid must be at least 3x3, got {width}x{height}")]
    TooSmall { width: usize, height: usize },

    #[error("grid has {found} cells, expected {expected}")]
    CellCount { expected: usize, found: usize },

    #[error("border cell ({x}, {y}) is empty; the outer ring must be solid")]
    OpenBorder { x: usize, y: usize },

    #[error("map row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid cell {ch:?} on map line {line}")]
    InvalidCell { line: usize, ch: char },

    #[error("cell ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum SceneError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("material {id} at ({x}, {y}) has no palette entry (palette has {len})")]
    UnknownMaterial { id: u8, x: usize, y: usize, len: usize },

    #[error("camera position ({x}, {y}) lies outside the grid")]
    CameraOutside { x: f32, y: f32 },

    #[error("palette must contain the sentinel entry for material 0")]
    EmptyPalette,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("frame size must be non-zero, got {width}x{height}")]
    ZeroFrame { width: usize, height: usize },

    #[error("parallel batches need at least one column")]
    ZeroBatch,

    #[error("thread count must be at least 1")]
    ZeroThreads,

    #[error("field of view must be in (0, 180) degrees, got {0}")]
    FieldOfView(String),

    #[error("the device strategy is built from a GPU context, not from the CPU factory")]
    DeviceStrategy,
}

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no suitable GPU adapter found")]
    NoSuitableAdapter,

    #[error("device request failed: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("surface is not supported by the selected adapter")]
    UnsupportedSurface,

    #[error("surface texture unavailable: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("readback of {what} failed: {source}")]
    Readback {
        what: &'static str,
        source: wgpu::BufferAsyncError,
    },

    #[error("readback channel closed before {0} was mapped")]
    ReadbackDropped(&'static str),

    #[error("texture format {0:?} cannot be read back into a frame buffer")]
    UnsupportedFormat(wgpu::TextureFormat),
}

/// Window presentation failures. softbuffer's error is not `Send`, so only
/// its message is kept.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PresentError {
    #[error("softbuffer: {0}")]
    Softbuffer(String),
}

impl From<softbuffer::SoftBufferError> for PresentError {
    fn from(err: softbuffer::SoftBufferError) -> Self {
        PresentError::Softbuffer(err.to_string())
    }
}

/// Top-level error for everything the renderer can fail on.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error(transparent)]
    Present(#[from] PresentError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to read map {path}: {source}")]
    MapFile {
        path: String,
        source: std::io::Error,
    },
}
