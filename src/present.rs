use std::num::NonZeroU32;
use std::rc::Rc;

use winit::window::Window;

use crate::error::PresentError;
use crate::framebuffer::FrameBuffer;
use crate::scaler::{ScaleLut, blit_bilinear_stretch};

/// Shows host-rendered frames in a window, stretched to the window size.
pub struct SoftPresenter {
    window: Rc<Window>,
    surface: softbuffer::Surface<Rc<Window>, Rc<Window>>,
    lut: ScaleLut,
}

impl SoftPresenter {
    pub fn new(window: Rc<Window>) -> Result<Self, PresentError> {
        let context = softbuffer::Context::new(window.clone())?;
        let surface = softbuffer::Surface::new(&context, window.clone())?;
        Ok(Self {
            window,
            surface,
            lut: ScaleLut::default(),
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn present(&mut self, frame: &FrameBuffer) -> Result<(), PresentError> {
        let size = self.window.inner_size();
        // Minimized.
        let (Some(w), Some(h)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height)) else {
            return Ok(());
        };
        let (dw, dh) = (size.width as usize, size.height as usize);
        self.surface.resize(w, h)?;
        if !self.lut.matches(dw, dh, frame) {
            self.lut = ScaleLut::new(dw, dh, frame.width(), frame.height());
        }

        let mut buf = self.surface.buffer_mut()?;
        blit_bilinear_stretch(&mut buf, dw, frame, &self.lut);
        buf.present()?;
        Ok(())
    }
}
