//! Highlight border for frames inside a behavior window

use image::{Rgb, RgbImage};

/// Draws a rectangle outline along all four edges of the frame.
///
/// The thickness is clamped so the border never exceeds half of the frame.
pub fn draw_border(frame: &mut RgbImage, color: [u8; 3], thickness: u32) {
    let width = frame.width();
    let height = frame.height();
    if width == 0 || height == 0 || thickness == 0 {
        return;
    }

    let t = thickness.min(width.div_ceil(2)).min(height.div_ceil(2));
    let pixel = Rgb(color);

    for y in 0..height {
        let horizontal_edge = y < t || y >= height - t;
        for x in 0..width {
            if horizontal_edge || x < t || x >= width - t {
                frame.put_pixel(x, y, pixel);
            }
        }
    }
}

/// Checks whether every border pixel of the frame has the given color
pub fn has_border(frame: &RgbImage, color: [u8; 3]) -> bool {
    let width = frame.width();
    let height = frame.height();
    if width == 0 || height == 0 {
        return false;
    }

    let pixel = Rgb(color);
    let top_bottom = (0..width).all(|x| frame[(x, 0)] == pixel && frame[(x, height - 1)] == pixel);
    let sides = (0..height).all(|y| frame[(0, y)] == pixel && frame[(width - 1, y)] == pixel);
    top_bottom && sides
}
