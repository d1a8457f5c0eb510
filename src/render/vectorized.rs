use crate::config::{ColumnKernel, Strategy};
use crate::error::Error;
use crate::framebuffer::FrameBuffer;
use crate::scene::Scene;

use super::{Renderer, render_columns};

/// Single-threaded strategy that walks eight columns per step.
#[derive(Debug)]
pub struct VectorizedRenderer {
    framebuffer: FrameBuffer,
    clear_color: u32,
}

impl VectorizedRenderer {
    pub fn new(width: usize, height: usize, clear_color: u32) -> Self {
        Self {
            framebuffer: FrameBuffer::new(width, height),
            clear_color,
        }
    }
}

impl Renderer for VectorizedRenderer {
    fn strategy(&self) -> Strategy {
        Strategy::Vectorized
    }

    fn size(&self) -> (usize, usize) {
        (self.framebuffer.width(), self.framebuffer.height())
    }

    fn resize(&mut self, width: usize, height: usize) {
        self.framebuffer.resize(width, height);
    }

    fn render_frame(&mut self, scene: &Scene) -> Result<&FrameBuffer, Error> {
        let mut cols = self.framebuffer.all_columns();
        render_columns(ColumnKernel::Lanes, scene, &mut cols, self.clear_color);
        Ok(&self.framebuffer)
    }
}
