//! Frame renderers.
//!
//! Every strategy implements [`Renderer`]. The CPU strategies share one
//! column routine, [`render_columns`], and differ only in how they hand
//! columns to it: all at once, in lane batches, or split across a pool.

mod parallel;
mod scalar;
mod vectorized;

pub use parallel::ParallelRenderer;
pub use scalar::ScalarRenderer;
pub use vectorized::VectorizedRenderer;

use crate::config::{ColumnKernel, RenderConfig, Strategy};
use crate::error::{ConfigError, Error};
use crate::framebuffer::{ColumnsMut, FrameBuffer};
use crate::lanes::{LANES, cast_lanes};
use crate::raycast::{ColumnHit, cast_column, draw_span, shade};
use crate::scene::Scene;

pub trait Renderer {
    fn strategy(&self) -> Strategy;

    /// Current frame size in pixels.
    fn size(&self) -> (usize, usize);

    /// Reallocate the frame for a new resolution.
    fn resize(&mut self, width: usize, height: usize);

    /// Render a full frame. On error the previous frame is left untouched.
    fn render_frame(&mut self, scene: &Scene) -> Result<&FrameBuffer, Error>;
}

/// Build a host-side strategy from config.
pub fn build_cpu(config: &RenderConfig) -> Result<Box<dyn Renderer>, Error> {
    config.validate()?;
    let renderer: Box<dyn Renderer> = match config.strategy {
        Strategy::Scalar => Box::new(ScalarRenderer::new(config.width, config.height, config.clear_color)),
        Strategy::Vectorized => Box::new(VectorizedRenderer::new(
            config.width,
            config.height,
            config.clear_color,
        )),
        Strategy::Parallel => Box::new(ParallelRenderer::new(config)?),
        Strategy::Device => return Err(ConfigError::DeviceStrategy.into()),
    };
    tracing::info!(
        strategy = %config.strategy,
        width = config.width,
        height = config.height,
        "renderer ready"
    );
    Ok(renderer)
}

/// Paint one column's wall stripe.
#[inline]
fn paint_column(cols: &mut ColumnsMut<'_>, scene: &Scene, column: usize, hit: &ColumnHit) {
    let (start, end) = draw_span(hit.distance, cols.height());
    cols.fill_segment(column, start, end, shade(scene.palette(), hit));
}

/// Clear `cols` and draw every column it owns.
pub(crate) fn render_columns(kernel: ColumnKernel, scene: &Scene, cols: &mut ColumnsMut<'_>, clear_color: u32) {
    cols.clear(clear_color);
    let width = cols.screen_width();
    let range = cols.columns();
    match kernel {
        ColumnKernel::Scalar => {
            for column in range {
                let hit = cast_column(scene.grid(), scene.camera(), column, width);
                paint_column(cols, scene, column, &hit);
            }
        }
        ColumnKernel::Lanes => {
            for first in range.clone().step_by(LANES) {
                let hits = cast_lanes(scene.grid(), scene.camera(), first, width);
                let live = LANES.min(range.end - first);
                for (lane, hit) in hits.iter().take(live).enumerate() {
                    paint_column(cols, scene, first + lane, hit);
                }
            }
        }
    }
}
