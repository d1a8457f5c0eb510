//! Column-major pixel store.
//!
//! Pixel `(column, row)` lives at `row + height * column`, so one wall stripe
//! is a contiguous run and can be written with block stores. Row 0 is the top
//! of the screen. Every pixel is `0x00RRGGBB`, the format softbuffer expects;
//! the bulk and single-pixel paths both go through [`pack_rgb`].

use std::ops::Range;

use rayon::iter::{IndexedParallelIterator, ParallelIterator};
use rayon::slice::ParallelSliceMut;

/// Pixels per wide store.
pub const BLOCK: usize = 8;

#[inline]
pub const fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

#[inline]
pub const fn unpack_rgb(color: u32) -> (u8, u8, u8) {
    ((color >> 16) as u8, (color >> 8) as u8, color as u8)
}

/// Fill `pixels[first..=last]`. Block alignment is measured on the absolute
/// buffer index `origin + i`, so views over a sub-range align identically.
#[inline]
fn fill_run(pixels: &mut [u32], origin: usize, first: usize, last: usize, color: u32) {
    let end = last + 1;
    let misalign = (origin + first) % BLOCK;
    let body_start = if misalign == 0 {
        first
    } else {
        (first + BLOCK - misalign).min(end)
    };
    let body_end = body_start + (end - body_start) / BLOCK * BLOCK;

    for px in &mut pixels[first..body_start] {
        *px = color;
    }
    let block = [color; BLOCK];
    for chunk in pixels[body_start..body_end].chunks_exact_mut(BLOCK) {
        chunk.copy_from_slice(&block);
    }
    for px in &mut pixels[body_end..end] {
        *px = color;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl FrameBuffer {
    /// Panics if either dimension is zero.
    pub fn new(width: usize, height: usize) -> Self {
        assert!(
            width > 0 && height > 0,
            "frame buffer must be non-empty, got {width}x{height}"
        );
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Reallocate for a new resolution. Contents are cleared to zero.
    pub fn resize(&mut self, width: usize, height: usize) {
        assert!(
            width > 0 && height > 0,
            "frame buffer must be non-empty, got {width}x{height}"
        );
        if self.width == width && self.height == height {
            return;
        }
        self.width = width;
        self.height = height;
        self.pixels = vec![0; width * height];
    }

    #[inline(always)]
    fn index(&self, column: usize, row: usize) -> usize {
        assert!(
            column < self.width && row < self.height,
            "pixel ({column}, {row}) outside {}x{}",
            self.width,
            self.height
        );
        row + self.height * column
    }

    pub fn pixel(&self, column: usize, row: usize) -> u32 {
        self.pixels[self.index(column, row)]
    }

    pub fn set_pixel(&mut self, column: usize, row: usize, color: u32) {
        let i = self.index(column, row);
        self.pixels[i] = color;
    }

    /// Set every pixel. Whole blocks first, then the remainder one by one.
    pub fn clear(&mut self, color: u32) {
        let len = self.pixels.len();
        fill_run(&mut self.pixels, 0, 0, len - 1, color);
    }

    /// Fill rows `row_start..=row_end` of one column.
    pub fn fill_column_segment(&mut self, column: usize, row_start: usize, row_end: usize, color: u32) {
        self.all_columns().fill_segment(column, row_start, row_end, color);
    }

    /// A view over every column, for sequential strategies.
    pub fn all_columns(&mut self) -> ColumnsMut<'_> {
        ColumnsMut {
            first_column: 0,
            height: self.height,
            screen_width: self.width,
            pixels: &mut self.pixels,
        }
    }

    /// Split the buffer into disjoint runs of `batch_columns` whole columns
    /// (the last run may be shorter). Each item owns its pixels exclusively.
    pub fn par_column_batches(
        &mut self,
        batch_columns: usize,
    ) -> impl IndexedParallelIterator<Item = ColumnsMut<'_>> {
        let height = self.height;
        let screen_width = self.width;
        let batch = batch_columns.max(1);
        self.pixels
            .par_chunks_mut(batch * height)
            .enumerate()
            .map(move |(i, pixels)| ColumnsMut {
                first_column: i * batch,
                height,
                screen_width,
                pixels,
            })
    }
}

/// Mutable view over a contiguous range of whole columns.
///
/// Column indices passed to its methods are absolute screen columns and must
/// fall inside [`ColumnsMut::columns`].
#[derive(Debug)]
pub struct ColumnsMut<'a> {
    first_column: usize,
    height: usize,
    screen_width: usize,
    pixels: &'a mut [u32],
}

impl ColumnsMut<'_> {
    pub fn columns(&self) -> Range<usize> {
        self.first_column..self.first_column + self.pixels.len() / self.height
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Width of the whole frame, which the ray setup needs for `camera_x`.
    pub fn screen_width(&self) -> usize {
        self.screen_width
    }

    pub fn clear(&mut self, color: u32) {
        let last = self.pixels.len() - 1;
        fill_run(self.pixels, self.origin(), 0, last, color);
    }

    /// Fill rows `row_start..=row_end` of `column`.
    pub fn fill_segment(&mut self, column: usize, row_start: usize, row_end: usize, color: u32) {
        assert!(
            self.columns().contains(&column),
            "column {column} outside {:?}",
            self.columns()
        );
        assert!(
            row_start <= row_end && row_end < self.height,
            "rows {row_start}..={row_end} outside height {}",
            self.height
        );
        let base = (column - self.first_column) * self.height;
        let origin = self.origin();
        fill_run(self.pixels, origin, base + row_start, base + row_end, color);
    }

    fn origin(&self) -> usize {
        self.first_column * self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_only_segment(fb: &FrameBuffer, column: usize, rows: Range<usize>, color: u32) {
        for c in 0..fb.width() {
            for r in 0..fb.height() {
                let expected = if c == column && rows.contains(&r) { color } else { 0 };
                assert_eq!(fb.pixel(c, r), expected, "pixel ({c}, {r})");
            }
        }
    }

    #[test]
    fn pack_is_xrgb() {
        assert_eq!(pack_rgb(0x12, 0x34, 0x56), 0x0012_3456);
        assert_eq!(unpack_rgb(0x00AB_CDEF), (0xAB, 0xCD, 0xEF));
    }

    #[test]
    fn set_pixel_uses_column_major_layout() {
        let mut fb = FrameBuffer::new(3, 5);
        fb.set_pixel(2, 1, pack_rgb(1, 2, 3));
        assert_eq!(fb.pixels()[1 + 5 * 2], 0x0001_0203);
    }

    #[test]
    fn clear_covers_sizes_not_divisible_by_block() {
        for (w, h) in [(1, 1), (3, 5), (7, 3), (8, 8), (13, 11)] {
            let mut fb = FrameBuffer::new(w, h);
            fb.clear(0xABCDEF);
            assert!(fb.pixels().iter().all(|&p| p == 0xABCDEF), "{w}x{h}");
        }
    }

    #[test]
    fn single_pixel_segment() {
        let mut fb = FrameBuffer::new(4, 10);
        fb.fill_column_segment(2, 6, 6, 7);
        assert_only_segment(&fb, 2, 6..7, 7);
    }

    #[test]
    fn segment_crossing_block_boundaries() {
        // height 13 puts column 1 at 13..26, so blocks 16..24 sit inside it.
        let mut fb = FrameBuffer::new(3, 13);
        fb.fill_column_segment(1, 1, 12, 9);
        assert_only_segment(&fb, 1, 1..13, 9);
    }

    #[test]
    fn every_segment_is_exact() {
        let (w, h) = (3, 19);
        for column in 0..w {
            for start in 0..h {
                for end in start..h {
                    let mut fb = FrameBuffer::new(w, h);
                    fb.fill_column_segment(column, start, end, 5);
                    assert_only_segment(&fb, column, start..end + 1, 5);
                }
            }
        }
    }

    #[test]
    #[should_panic]
    fn segment_past_height_panics() {
        let mut fb = FrameBuffer::new(2, 4);
        fb.fill_column_segment(0, 1, 4, 1);
    }

    #[test]
    fn batches_are_disjoint_and_cover_the_frame() {
        let mut fb = FrameBuffer::new(10, 3);
        let ranges: Vec<Range<usize>> = fb.par_column_batches(4).map(|b| b.columns()).collect();
        assert_eq!(ranges, vec![0..4, 4..8, 8..10]);
    }

    #[test]
    fn batch_view_writes_only_its_columns() {
        let mut fb = FrameBuffer::new(6, 5);
        fb.par_column_batches(2).for_each(|mut cols| {
            let first = cols.columns().start;
            cols.clear(first as u32 + 100);
            cols.fill_segment(first + 1, 1, 3, 1);
        });
        for c in 0..6 {
            for r in 0..5 {
                let batch_first = c / 2 * 2;
                let expected = if c == batch_first + 1 && (1..=3).contains(&r) {
                    1
                } else {
                    batch_first as u32 + 100
                };
                assert_eq!(fb.pixel(c, r), expected);
            }
        }
    }

    #[test]
    fn resize_reallocates() {
        let mut fb = FrameBuffer::new(2, 2);
        fb.clear(3);
        fb.resize(4, 3);
        assert_eq!(fb.pixels().len(), 12);
        assert!(fb.pixels().iter().all(|&p| p == 0));
    }
}
