//! Bilinear upscale from the internal column-major frame to a row-major
//! window buffer.

use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::ParallelSliceMut,
};

use crate::framebuffer::FrameBuffer;

/// Precomputed mapping from dest pixels to src neighbors + weights
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScaleLut {
    dst_w: usize,
    dst_h: usize,
    src_w: usize,
    src_h: usize,
    x0: Vec<usize>,
    x1: Vec<usize>,
    wx: Vec<u16>,
    y0: Vec<usize>,
    y1: Vec<usize>,
    wy: Vec<u16>,
}

impl ScaleLut {
    pub fn new(dst_w: usize, dst_h: usize, src_w: usize, src_h: usize) -> Self {
        let (x0, x1, wx) = axis_taps(dst_w, src_w);
        let (y0, y1, wy) = axis_taps(dst_h, src_h);
        Self {
            dst_w,
            dst_h,
            src_w,
            src_h,
            x0,
            x1,
            wx,
            y0,
            y1,
            wy,
        }
    }

    /// Whether this table maps a `src` frame onto a `dst_w`x`dst_h` target.
    pub fn matches(&self, dst_w: usize, dst_h: usize, src: &FrameBuffer) -> bool {
        self.dst_w == dst_w && self.dst_h == dst_h && self.src_w == src.width() && self.src_h == src.height()
    }
}

/// Neighbor indices and 8.8 fixed-point weights along one axis.
fn axis_taps(dst: usize, src: usize) -> (Vec<usize>, Vec<usize>, Vec<u16>) {
    let scale = src as f32 / dst.max(1) as f32;
    let last = src.saturating_sub(1) as isize;
    let mut i0 = Vec::with_capacity(dst);
    let mut i1 = Vec::with_capacity(dst);
    let mut w = Vec::with_capacity(dst);
    for i in 0..dst {
        let f = i as f32 * scale;
        let lo = (f.floor() as isize).clamp(0, last);
        i0.push(lo as usize);
        i1.push((lo + 1).clamp(0, last) as usize);
        w.push(((f - lo as f32) * 256.0).round().clamp(0.0, 256.0) as u16);
    }
    (i0, i1, w)
}

#[inline]
fn lerp_color_u32(a: u32, b: u32, w256: u32) -> u32 {
    let inv = 256 - w256;
    // R and B share one multiply (00RR00BB), G gets its own.
    let rb = (((a & 0x00FF00FF) * inv + (b & 0x00FF00FF) * w256) >> 8) & 0x00FF00FF;
    let g = (((a & 0x0000FF00) * inv + (b & 0x0000FF00) * w256) >> 8) & 0x0000FF00;
    rb | g
}

/// Stretch `src` over a row-major `dst` of width `dw`.
/// Destination rows are filled in parallel.
pub fn blit_bilinear_stretch(dst: &mut [u32], dw: usize, src: &FrameBuffer, lut: &ScaleLut) {
    let sh = src.height();
    let px = src.pixels();
    dst.par_chunks_mut(dw).enumerate().for_each(|(y, dst_row)| {
        let y0 = lut.y0[y];
        let y1 = lut.y1[y];
        let wy = lut.wy[y] as u32;

        for (x, out) in dst_row.iter_mut().enumerate() {
            let col0 = lut.x0[x] * sh;
            let col1 = lut.x1[x] * sh;
            let wx = lut.wx[x] as u32;

            let top = lerp_color_u32(px[col0 + y0], px[col1 + y0], wx);
            let bot = lerp_color_u32(px[col0 + y1], px[col1 + y1], wx);
            *out = lerp_color_u32(top, bot, wy);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::pack_rgb;

    #[test]
    fn lerp_endpoints_and_midpoint() {
        let a = pack_rgb(0, 100, 200);
        let b = pack_rgb(200, 0, 100);
        assert_eq!(lerp_color_u32(a, b, 0), a);
        assert_eq!(lerp_color_u32(a, b, 256), b);
        assert_eq!(lerp_color_u32(a, b, 128), pack_rgb(100, 50, 150));
    }

    #[test]
    fn identity_scale_copies_and_transposes() {
        let mut src = FrameBuffer::new(5, 3);
        for c in 0..5 {
            for r in 0..3 {
                src.set_pixel(c, r, pack_rgb(c as u8, r as u8, 7));
            }
        }
        let lut = ScaleLut::new(5, 3, 5, 3);
        let mut dst = vec![0u32; 15];
        blit_bilinear_stretch(&mut dst, 5, &src, &lut);
        for y in 0..3 {
            for x in 0..5 {
                assert_eq!(dst[y * 5 + x], src.pixel(x, y), "({x}, {y})");
            }
        }
    }

    #[test]
    fn upscale_of_flat_frame_stays_flat() {
        let mut src = FrameBuffer::new(4, 3);
        src.clear(0x00336699);
        let lut = ScaleLut::new(13, 7, 4, 3);
        assert!(lut.matches(13, 7, &src));
        assert!(!lut.matches(12, 7, &src));
        let mut dst = vec![0u32; 13 * 7];
        blit_bilinear_stretch(&mut dst, 13, &src, &lut);
        assert!(dst.iter().all(|&p| p == 0x00336699));
    }

    #[test]
    fn taps_stay_in_bounds() {
        let (i0, i1, w) = axis_taps(1000, 7);
        assert!(i0.iter().chain(&i1).all(|&i| i < 7));
        assert!(w.iter().all(|&w| w <= 256));
    }
}
