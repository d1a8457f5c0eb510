use rayon::iter::ParallelIterator;

use crate::config::{ColumnKernel, RenderConfig, Strategy};
use crate::error::Error;
use crate::framebuffer::FrameBuffer;
use crate::scene::Scene;

use super::{Renderer, render_columns};

/// Fork-join strategy: the frame is cut into disjoint column batches and each
/// batch is rendered by one task on a dedicated work-stealing pool.
pub struct ParallelRenderer {
    framebuffer: FrameBuffer,
    pool: rayon::ThreadPool,
    batch_columns: usize,
    kernel: ColumnKernel,
    clear_color: u32,
}

impl ParallelRenderer {
    pub fn new(config: &RenderConfig) -> Result<Self, Error> {
        config.validate()?;
        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|i| format!("raycast-{i}"));
        if let Some(threads) = config.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build()?;
        tracing::debug!(
            threads = pool.current_num_threads(),
            batch_columns = config.batch_columns,
            kernel = ?config.kernel,
            "parallel pool started"
        );
        Ok(Self {
            framebuffer: FrameBuffer::new(config.width, config.height),
            pool,
            batch_columns: config.batch_columns,
            kernel: config.kernel,
            clear_color: config.clear_color,
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl Renderer for ParallelRenderer {
    fn strategy(&self) -> Strategy {
        Strategy::Parallel
    }

    fn size(&self) -> (usize, usize) {
        (self.framebuffer.width(), self.framebuffer.height())
    }

    fn resize(&mut self, width: usize, height: usize) {
        self.framebuffer.resize(width, height);
    }

    fn render_frame(&mut self, scene: &Scene) -> Result<&FrameBuffer, Error> {
        let kernel = self.kernel;
        let clear_color = self.clear_color;
        let batches = self.framebuffer.par_column_batches(self.batch_columns);
        // Blocks until every batch has been drawn.
        self.pool.install(|| {
            batches.for_each(|mut cols| render_columns(kernel, scene, &mut cols, clear_color));
        });
        Ok(&self.framebuffer)
    }
}
