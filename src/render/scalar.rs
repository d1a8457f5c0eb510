use crate::config::{ColumnKernel, Strategy};
use crate::error::Error;
use crate::framebuffer::FrameBuffer;
use crate::scene::Scene;

use super::{Renderer, render_columns};

/// Reference strategy: one column at a time, in order.
#[derive(Debug)]
pub struct ScalarRenderer {
    framebuffer: FrameBuffer,
    clear_color: u32,
}

impl ScalarRenderer {
    pub fn new(width: usize, height: usize, clear_color: u32) -> Self {
        Self {
            framebuffer: FrameBuffer::new(width, height),
            clear_color,
        }
    }
}

impl Renderer for ScalarRenderer {
    fn strategy(&self) -> Strategy {
        Strategy::Scalar
    }

    fn size(&self) -> (usize, usize) {
        (self.framebuffer.width(), self.framebuffer.height())
    }

    fn resize(&mut self, width: usize, height: usize) {
        self.framebuffer.resize(width, height);
    }

    fn render_frame(&mut self, scene: &Scene) -> Result<&FrameBuffer, Error> {
        let mut cols = self.framebuffer.all_columns();
        render_columns(ColumnKernel::Scalar, scene, &mut cols, self.clear_color);
        Ok(&self.framebuffer)
    }
}
