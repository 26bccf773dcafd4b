use crate::memory::Cell;

/// The screen is square: 96 × 96 pixels, one cell each.
pub const SCREEN_WIDTH: usize = 96;
pub const SCREEN_HEIGHT: usize = 96;

/// Sprites are 8 × 8 blocks of cells.
pub const SPRITE_DIM: usize = 8;
pub const SPRITE_CELLS: usize = SPRITE_DIM * SPRITE_DIM;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Viewport {
    x: usize,
    y: usize,
    w: usize,
    h: usize,
}

const FULL_SCREEN: Viewport = Viewport {
    x: 0,
    y: 0,
    w: SCREEN_WIDTH,
    h: SCREEN_HEIGHT,
};

impl Viewport {
    fn contains(&self, x: usize, y: usize) -> bool {
        // Clip against the screen too, so a generous viewport can never
        // push a write past the buffer.
        x >= self.x
            && x < (self.x + self.w).min(SCREEN_WIDTH)
            && y >= self.y
            && y < (self.y + self.h).min(SCREEN_HEIGHT)
    }
}

/// Draw state for the peripheral surface: clip rectangle and dirty flag.
///
/// The pixel buffer itself is the video region of [`Ram`], handed in by the
/// caller on every draw call, so this type never aliases the backing array.
/// Drawing outside the viewport is clipping, not an error; the dirty flag
/// rises when any pixel actually changes hands and falls only when the
/// consumer reports the frame presented.
///
/// [`Ram`]: crate::memory::Ram
#[derive(Debug)]
pub struct Video {
    clip: Viewport,
    dirty: bool,
}

impl Video {
    pub fn new() -> Self {
        Video {
            clip: FULL_SCREEN,
            dirty: false,
        }
    }

    /// Fill the whole buffer, ignoring the viewport.
    pub fn clear(&mut self, vram: &mut [Cell], color: Cell) {
        vram.fill(color);
        self.dirty = true;
    }

    /// Write one pixel if `(x, y)` is inside the viewport; silently drop it
    /// otherwise.
    pub fn put(&mut self, vram: &mut [Cell], x: Cell, y: Cell, color: Cell) {
        let (x, y) = (x as usize, y as usize);
        if self.clip.contains(x, y) {
            vram[x + y * SCREEN_WIDTH] = color;
            self.dirty = true;
        }
    }

    /// Draw an 8×8 sprite with its top-left corner at `(x, y)`, clipping
    /// each pixel like [`Video::put`].
    pub fn blit(&mut self, vram: &mut [Cell], x: Cell, y: Cell, sprite: &[Cell; SPRITE_CELLS]) {
        for row in 0..SPRITE_DIM {
            for col in 0..SPRITE_DIM {
                self.put(
                    vram,
                    x.wrapping_add(col as Cell),
                    y.wrapping_add(row as Cell),
                    sprite[col + row * SPRITE_DIM],
                );
            }
        }
    }

    /// Restrict drawing to `[x, x+w) × [y, y+h)`.
    pub fn viewport(&mut self, x: Cell, y: Cell, w: Cell, h: Cell) {
        self.clip = Viewport {
            x: x as usize,
            y: y as usize,
            w: w as usize,
            h: h as usize,
        };
    }

    pub fn viewport_reset(&mut self) {
        self.clip = FULL_SCREEN;
    }

    /// An unpresented frame is waiting.
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    /// Raise the flag without drawing; a program's way of requesting a
    /// present.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn mark_presented(&mut self) {
        self.dirty = false;
    }
}

impl Default for Video {
    fn default() -> Self {
        Video::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::VIDEO;

    fn vram() -> Vec<Cell> {
        vec![0; VIDEO.len]
    }

    #[test]
    fn clear_fills_every_pixel() {
        let mut vram = vram();
        let mut video = Video::new();
        video.clear(&mut vram, 7);
        assert!(vram.iter().all(|&px| px == 7));
        assert!(video.dirty());
    }

    #[test]
    fn clear_is_idempotent() {
        let mut once = vram();
        let mut twice = vram();
        let mut video = Video::new();
        video.clear(&mut once, 3);
        video.clear(&mut twice, 3);
        video.clear(&mut twice, 3);
        assert_eq!(once, twice);
    }

    #[test]
    fn put_addresses_row_major() {
        let mut vram = vram();
        let mut video = Video::new();
        video.put(&mut vram, 5, 2, 1);
        assert_eq!(vram[5 + 2 * SCREEN_WIDTH], 1);
    }

    #[test]
    fn put_outside_the_screen_is_a_noop() {
        let mut vram = vram();
        let mut video = Video::new();
        video.put(&mut vram, SCREEN_WIDTH as Cell, 0, 1);
        video.put(&mut vram, 0, SCREEN_HEIGHT as Cell, 1);
        video.put(&mut vram, Cell::MAX, Cell::MAX, 1);
        assert!(vram.iter().all(|&px| px == 0));
        assert!(!video.dirty());
    }

    #[test]
    fn viewport_clips_as_a_rectangle() {
        let mut vram = vram();
        let mut video = Video::new();
        video.viewport(10, 10, 4, 4);
        video.put(&mut vram, 9, 10, 1);
        video.put(&mut vram, 10, 10, 2);
        video.put(&mut vram, 13, 13, 3);
        video.put(&mut vram, 14, 13, 4);
        assert_eq!(vram[10 + 10 * SCREEN_WIDTH], 2);
        assert_eq!(vram[13 + 13 * SCREEN_WIDTH], 3);
        assert_eq!(vram[9 + 10 * SCREEN_WIDTH], 0);
        assert_eq!(vram[14 + 13 * SCREEN_WIDTH], 0);
    }

    #[test]
    fn viewport_reset_restores_the_full_screen() {
        let mut vram = vram();
        let mut video = Video::new();
        video.viewport(0, 0, 1, 1);
        video.viewport_reset();
        video.put(&mut vram, 95, 95, 6);
        assert_eq!(vram[95 + 95 * SCREEN_WIDTH], 6);
    }

    #[test]
    fn oversized_viewport_cannot_escape_the_buffer() {
        let mut vram = vram();
        let mut video = Video::new();
        video.viewport(90, 90, 1000, 1000);
        video.put(&mut vram, 95, 95, 2);
        video.put(&mut vram, 96, 95, 2);
        assert_eq!(vram[95 + 95 * SCREEN_WIDTH], 2);
    }

    #[test]
    fn blit_draws_a_block_and_clips_the_overhang() {
        let mut vram = vram();
        let mut video = Video::new();
        let sprite = [5; SPRITE_CELLS];
        video.blit(&mut vram, 92, 0, &sprite);
        // Four columns land, four fall off the right edge.
        assert_eq!(vram[92], 5);
        assert_eq!(vram[95], 5);
        assert_eq!(vram[92 + 7 * SCREEN_WIDTH], 5);
        let drawn = vram.iter().filter(|&&px| px == 5).count();
        assert_eq!(drawn, 4 * SPRITE_DIM);
    }

    #[test]
    fn dirty_tracks_mutation_and_presentation() {
        let mut vram = vram();
        let mut video = Video::new();
        assert!(!video.dirty());
        video.put(&mut vram, 0, 0, 1);
        assert!(video.dirty());
        video.mark_presented();
        assert!(!video.dirty());
        video.mark_dirty();
        assert!(video.dirty());
    }
}
