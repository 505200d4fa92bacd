//! 4-bit grayscale frame buffer
//!
//! Horizontal layout, two pixels per byte, the left pixel in the high nibble.
//! This is the layout the SSD1327 panel consumes directly.

use super::HalError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl GrayFrame {
    pub const MAX_LEVEL: u8 = 0x0F;

    pub fn new(width: u32, height: u32) -> Self {
        let len = Self::byte_len(width, height);
        Self {
            width,
            height,
            data: vec![0; len],
        }
    }

    /// Wraps precomposed pixel data, e.g. a splash image
    pub fn from_bytes(width: u32, height: u32, data: Vec<u8>) -> Result<Self, HalError> {
        let expected = Self::byte_len(width, height);
        if data.len() != expected {
            return Err(HalError::FrameSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn byte_len(width: u32, height: u32) -> usize {
        Self::row_bytes(width) * height as usize
    }

    fn row_bytes(width: u32) -> usize {
        (width as usize).div_ceil(2)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn fill(&mut self, level: u8) {
        let level = level & Self::MAX_LEVEL;
        self.data.fill((level << 4) | level);
        if self.width % 2 == 1 {
            // Keep the padding nibble of odd-width rows clear
            let row = Self::row_bytes(self.width);
            for y in 0..self.height as usize {
                self.data[y * row + row - 1] &= 0xF0;
            }
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        let (index, high) = self.locate(x, y)?;
        let byte = self.data[index];
        Some(if high { byte >> 4 } else { byte & 0x0F })
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, level: u8) {
        if let Some((index, high)) = self.locate(x, y) {
            let level = level & Self::MAX_LEVEL;
            let byte = &mut self.data[index];
            *byte = if high {
                (*byte & 0x0F) | (level << 4)
            } else {
                (*byte & 0xF0) | level
            };
        }
    }

    /// Copies `src` with its top-left corner at `(x, y)`
    ///
    /// Pixels outside this frame are clipped. Source pixels equal to `key`
    /// are treated as transparent.
    pub fn blit(&mut self, src: &GrayFrame, x: i32, y: i32, key: Option<u8>) {
        for sy in 0..src.height {
            let dy = y + sy as i32;
            if dy < 0 || dy >= self.height as i32 {
                continue;
            }
            for sx in 0..src.width {
                let dx = x + sx as i32;
                if dx < 0 || dx >= self.width as i32 {
                    continue;
                }
                let Some(level) = src.pixel(sx, sy) else {
                    continue;
                };
                if key == Some(level) {
                    continue;
                }
                self.set_pixel(dx as u32, dy as u32, level);
            }
        }
    }

    fn locate(&self, x: u32, y: u32) -> Option<(usize, bool)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = y as usize * Self::row_bytes(self.width) + x as usize / 2;
        Some((index, x % 2 == 0))
    }
}
