use crate::error::GridError;
use crate::framebuffer::pack_rgb;

/// Built-in 24x24 map. Digits are material ids, 0 is open floor.
///
/// Each text line is one column: line `x`, character `y` is cell `(x, y)`.
/// `WorldGrid::default` transposes it into row-major storage.
const DEFAULT_MAP: &str = "\
111111111111111111111111
100000000000000000000001
100000000000000000000001
100000000000000000000001
100000222220000303030001
100000200020000000000001
100000200020000300030001
100000200020000000000001
100000220220000303030001
100000000000000000000001
100000000000000000000001
100000000000000000000001
100000000000000000000001
100000000000000000000001
100000000000000000000001
100000000000000000000001
144444444000000000000001
140400004000000000000001
140000504000000000000001
140400004000000000000001
140444444000000000000001
140000000000000000000001
144444444000000000000001
111111111111111111111111";

/// Static occupancy grid. Cells are stored row-major, `cells[y * width + x]`.
///
/// The outer ring is always solid, so a ray cast from any interior cell
/// eventually strikes a wall. Every constructor and mutator upholds this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldGrid {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl WorldGrid {
    pub fn new(width: usize, height: usize, cells: Vec<u8>) -> Result<Self, GridError> {
        if width < 3 || height < 3 {
            return Err(GridError::TooSmall { width, height });
        }
        if cells.len() != width * height {
            return Err(GridError::CellCount {
                expected: width * height,
                found: cells.len(),
            });
        }
        let grid = Self {
            width,
            height,
            cells,
        };
        grid.check_border()?;
        Ok(grid)
    }

    /// Empty interior enclosed by a ring of `wall`.
    pub fn ring(width: usize, height: usize, wall: u8) -> Result<Self, GridError> {
        let mut cells = vec![0u8; width * height];
        for y in 0..height {
            for x in 0..width {
                if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
                    cells[y * width + x] = wall;
                }
            }
        }
        Self::new(width, height, cells)
    }

    /// Parse a text map: one line per row, one digit per cell.
    /// Blank lines and lines starting with `#` are skipped.
    pub fn parse(text: &str) -> Result<Self, GridError> {
        let mut width = None;
        let mut cells = Vec::new();
        let mut rows = 0;

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let start = cells.len();
            for ch in line.chars() {
                let id = ch.to_digit(10).ok_or(GridError::InvalidCell {
                    line: line_no + 1,
                    ch,
                })?;
                cells.push(id as u8);
            }
            let found = cells.len() - start;
            match width {
                None => width = Some(found),
                Some(expected) if expected != found => {
                    return Err(GridError::RaggedRow {
                        row: rows,
                        expected,
                        found,
                    });
                }
                Some(_) => {}
            }
            rows += 1;
        }

        Self::new(width.unwrap_or(0), rows, cells)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Material id at a cell. No bounds handling beyond slice indexing:
    /// callers inside the ring can never step past it.
    #[inline(always)]
    pub fn material_at(&self, x: i32, y: i32) -> u8 {
        self.cells[y as usize * self.width + x as usize]
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.cells[y * self.width + x])
    }

    /// Edit a cell between frames. Clearing a border cell is refused.
    pub fn set_cell(&mut self, x: usize, y: usize, id: u8) -> Result<(), GridError> {
        if x >= self.width || y >= self.height {
            return Err(GridError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        if id == 0 && self.is_border(x, y) {
            return Err(GridError::OpenBorder { x, y });
        }
        self.cells[y * self.width + x] = id;
        Ok(())
    }

    fn is_border(&self, x: usize, y: usize) -> bool {
        x == 0 || y == 0 || x + 1 == self.width || y + 1 == self.height
    }

    fn check_border(&self) -> Result<(), GridError> {
        for y in 0..self.height {
            for x in 0..self.width {
                if self.is_border(x, y) && self.cells[y * self.width + x] == 0 {
                    return Err(GridError::OpenBorder { x, y });
                }
            }
        }
        Ok(())
    }
}

impl Default for WorldGrid {
    fn default() -> Self {
        let columns: Vec<&[u8]> = DEFAULT_MAP.lines().map(str::as_bytes).collect();
        let (width, height) = (columns.len(), columns.first().map_or(0, |c| c.len()));
        let mut cells = vec![0u8; width * height];
        for (x, column) in columns.iter().enumerate() {
            for (y, b) in column.iter().enumerate() {
                cells[y * width + x] = b - b'0';
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }
}

/// Colors indexed by material id. Entry 0 is a sentinel and never drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialPalette {
    colors: Vec<u32>,
}

impl MaterialPalette {
    pub fn new(colors: Vec<u32>) -> Self {
        Self { colors }
    }

    #[inline(always)]
    pub fn color(&self, id: u8) -> u32 {
        self.colors[id as usize]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[u32] {
        &self.colors
    }
}

impl Default for MaterialPalette {
    fn default() -> Self {
        Self::new(vec![
            0,
            pack_rgb(0, 0, 128),
            pack_rgb(0, 128, 0),
            pack_rgb(0, 128, 128),
            pack_rgb(128, 0, 0),
            pack_rgb(128, 0, 128),
        ])
    }
}
