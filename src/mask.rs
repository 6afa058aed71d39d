//! Pixel collision masks.
//!
//! A [`Mask`] is a bit-packed silhouette. Two masks collide when any set
//! pixel of one lands on a set pixel of the other at the given offset, which
//! keeps the rounded corners of the bird and the lip of each pipe out of
//! the hit test.

use std::sync::OnceLock;

/// Width of the bird sprite in pixels
pub const BIRD_WIDTH: u32 = 68;
/// Height of the bird sprite in pixels
pub const BIRD_HEIGHT: u32 = 48;
/// Width of a pipe sprite in pixels (lip included)
pub const PIPE_WIDTH: u32 = 104;
/// Height of a pipe sprite in pixels
pub const PIPE_HEIGHT: u32 = 640;

/// Height of the wide lip at the open end of a pipe
const PIPE_LIP_HEIGHT: u32 = 48;
/// How far the pipe body is narrower than the lip on each side
const PIPE_BODY_INSET: u32 = 4;

const WORD_BITS: u32 = 64;

/// Bit-packed silhouette
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    words_per_row: usize,
    bits: Vec<u64>,
}

impl Mask {
    /// Create an empty mask
    pub fn new(width: u32, height: u32) -> Self {
        let words_per_row = width.div_ceil(WORD_BITS) as usize;
        Self {
            width,
            height,
            words_per_row,
            bits: vec![0; words_per_row * height as usize],
        }
    }

    /// Create a mask with every pixel set
    pub fn filled(width: u32, height: u32) -> Self {
        Self::from_fn(width, height, |_, _| true)
    }

    /// Create a mask by evaluating `solid` for every pixel
    pub fn from_fn<F: Fn(u32, u32) -> bool>(width: u32, height: u32, solid: F) -> Self {
        let mut mask = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                if solid(x, y) {
                    mask.set(x, y, true);
                }
            }
        }
        mask
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> (usize, u64) {
        let word = y as usize * self.words_per_row + (x / WORD_BITS) as usize;
        (word, 1u64 << (x % WORD_BITS))
    }

    /// Read a pixel; out-of-range coordinates are empty
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let (word, bit) = self.index(x, y);
        self.bits[word] & bit != 0
    }

    /// Write a pixel; out-of-range coordinates are ignored
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let (word, bit) = self.index(x, y);
        if value {
            self.bits[word] |= bit;
        } else {
            self.bits[word] &= !bit;
        }
    }

    /// Number of set pixels
    pub fn count(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Mirror the mask top to bottom
    pub fn flip_vertical(&self) -> Self {
        let mut flipped = Self::new(self.width, self.height);
        let row = self.words_per_row;
        for y in 0..self.height as usize {
            let src = (self.height as usize - 1 - y) * row;
            flipped.bits[y * row..(y + 1) * row].copy_from_slice(&self.bits[src..src + row]);
        }
        flipped
    }

    /// First overlapping pixel between `self` and `other` placed at
    /// `offset` relative to `self`'s top-left corner.
    ///
    /// The returned point is in `self`'s coordinates.
    pub fn overlap(&self, other: &Mask, offset: (i32, i32)) -> Option<(u32, u32)> {
        let (dx, dy) = offset;
        let x_start = dx.max(0);
        let x_end = (dx + other.width as i32).min(self.width as i32);
        let y_start = dy.max(0);
        let y_end = (dy + other.height as i32).min(self.height as i32);
        if x_start >= x_end || y_start >= y_end {
            return None;
        }

        for y in y_start..y_end {
            let oy = (y - dy) as u32;
            for x in x_start..x_end {
                let ox = (x - dx) as u32;
                if self.get(x as u32, y as u32) && other.get(ox, oy) {
                    return Some((x as u32, y as u32));
                }
            }
        }
        None
    }

    /// Whether the two masks touch at `offset`
    pub fn overlaps(&self, other: &Mask, offset: (i32, i32)) -> bool {
        self.overlap(other, offset).is_some()
    }
}

/// Oval silhouette filling the given box
pub fn ellipse(width: u32, height: u32) -> Mask {
    let rx = width as f32 / 2.0;
    let ry = height as f32 / 2.0;
    Mask::from_fn(width, height, |x, y| {
        let nx = (x as f32 + 0.5 - rx) / rx;
        let ny = (y as f32 + 0.5 - ry) / ry;
        nx * nx + ny * ny <= 1.0
    })
}

/// Pipe silhouette with its open end (the lip) at row 0
pub fn pipe_silhouette(width: u32, height: u32, lip_height: u32, inset: u32) -> Mask {
    Mask::from_fn(width, height, |x, y| {
        y < lip_height || (x >= inset && x + inset < width)
    })
}

/// Shared bird silhouette
pub fn bird_mask() -> &'static Mask {
    static MASK: OnceLock<Mask> = OnceLock::new();
    MASK.get_or_init(|| ellipse(BIRD_WIDTH, BIRD_HEIGHT))
}

/// Shared silhouette of a pipe hanging from the ceiling (lip at the bottom)
pub fn pipe_top_mask() -> &'static Mask {
    static MASK: OnceLock<Mask> = OnceLock::new();
    MASK.get_or_init(|| pipe_bottom_mask().flip_vertical())
}

/// Shared silhouette of a pipe rising from the floor (lip at the top)
pub fn pipe_bottom_mask() -> &'static Mask {
    static MASK: OnceLock<Mask> = OnceLock::new();
    MASK.get_or_init(|| {
        pipe_silhouette(PIPE_WIDTH, PIPE_HEIGHT, PIPE_LIP_HEIGHT, PIPE_BODY_INSET)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut mask = Mask::new(70, 3);
        mask.set(65, 2, true);
        assert!(mask.get(65, 2));
        assert!(!mask.get(64, 2));
        assert!(!mask.get(200, 200));
        assert_eq!(mask.count(), 1);
    }

    #[test]
    fn test_filled_overlap() {
        let a = Mask::filled(10, 10);
        let b = Mask::filled(10, 10);
        assert_eq!(a.overlap(&b, (5, 5)), Some((5, 5)));
        assert!(a.overlaps(&b, (-9, -9)));
        assert!(!a.overlaps(&b, (10, 0)));
        assert!(!a.overlaps(&b, (0, -10)));
    }

    #[test]
    fn test_ellipse_corners_empty() {
        let oval = ellipse(BIRD_WIDTH, BIRD_HEIGHT);
        assert!(!oval.get(0, 0));
        assert!(!oval.get(BIRD_WIDTH - 1, BIRD_HEIGHT - 1));
        assert!(oval.get(BIRD_WIDTH / 2, BIRD_HEIGHT / 2));

        // A square touching only the corner of the bounding box misses the oval
        let block = Mask::filled(4, 4);
        assert!(!oval.overlaps(&block, (-2, -2)));
        assert!(oval.overlaps(&block, (BIRD_WIDTH as i32 / 2, -2)));
    }

    #[test]
    fn test_flip_vertical() {
        let pipe = pipe_bottom_mask();
        let top = pipe_top_mask();
        // Lip row is full width at the open end
        assert!(pipe.get(0, 0));
        assert!(top.get(0, PIPE_HEIGHT - 1));
        // Body row is inset
        assert!(!pipe.get(0, PIPE_HEIGHT - 1));
        assert!(!top.get(0, 0));
        assert_eq!(pipe.count(), top.count());
    }

    #[test]
    fn test_overlap_symmetry() {
        let bird = bird_mask();
        let pipe = pipe_bottom_mask();
        for &(dx, dy) in &[(0, 10), (30, 47), (-50, 20), (60, 40), (67, 0)] {
            assert_eq!(
                bird.overlaps(pipe, (dx, dy)),
                pipe.overlaps(bird, (-dx, -dy)),
                "offset ({}, {})",
                dx,
                dy
            );
        }
    }
}
