//! Tile geometry for composite (high-resolution) capture.
//!
//! A magnification of `mag` turns a `w` x `h` window into a `mag*w` by
//! `mag*h` image assembled from `mag`-squared window-sized tiles. Each
//! tile is rendered through an oversized viewport whose origin is
//! shifted by minus one tile, so the back buffer receives exactly that
//! tile's pixels.

/// One window-sized tile of a composite capture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tile {
    /// Column in the tile grid.
    pub col: u32,
    /// Row in the tile grid.
    pub row: u32,
    /// Tile width (the window width).
    pub width: u32,
    /// Tile height (the window height).
    pub height: u32,
    /// Overall magnification.
    pub mag: u32,
    /// World size of one output pixel.
    pub pixel_size: f32,
}

impl Tile {
    /// The shifted, oversized viewport that renders this tile into the
    /// back buffer, as `(x, y, width, height)`.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn viewport(&self) -> (i32, i32, u32, u32) {
        (
            -((self.col * self.width) as i32),
            -((self.row * self.height) as i32),
            self.mag * self.width,
            self.mag * self.height,
        )
    }

    /// Destination of this tile in the assembled image, as `(x, y)`.
    #[must_use]
    pub const fn dst(&self) -> (u32, u32) {
        (self.col * self.width, self.row * self.height)
    }

    /// World-space offset of this tile's center from the image center.
    /// Backends without viewport-relative projection shift their focus
    /// by this instead.
    #[must_use]
    pub fn world_offset(&self) -> (f32, f32) {
        #[allow(clippy::cast_precision_loss)]
        let centered = |n: u32, total: u32| (n as f32 + 0.5) - (total as f32) * 0.5;
        #[allow(clippy::cast_precision_loss)]
        let (w, h) = (self.width as f32, self.height as f32);
        (
            centered(self.col, self.mag) * w * self.pixel_size,
            -centered(self.row, self.mag) * h * self.pixel_size,
        )
    }
}

/// Row-major iterator over the `mag`-squared tiles of a capture.
#[derive(Clone, Debug)]
pub struct TileGrid {
    mag: u32,
    width: u32,
    height: u32,
    pixel_size: f32,
    next: u32,
}

impl TileGrid {
    /// Creates the grid for a `mag`-times capture of a `width` x
    /// `height` window.
    #[must_use]
    pub const fn new(mag: u32, width: u32, height: u32, pixel_size: f32) -> Self {
        Self {
            mag,
            width,
            height,
            pixel_size,
            next: 0,
        }
    }
}

impl Iterator for TileGrid {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        if self.next >= self.mag * self.mag {
            return None;
        }
        let tile = Tile {
            col: self.next % self.mag,
            row: self.next / self.mag,
            width: self.width,
            height: self.height,
            mag: self.mag,
            pixel_size: self.pixel_size,
        };
        self.next += 1;
        Some(tile)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.mag * self.mag - self.next) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for TileGrid {}
