//! Canvas sizing and layer placement.

const CANVAS_STEP: i32 = 1024;

/// Round one canvas dimension for a layer placed at `offset` with `image` extent.
///
/// The dimension always moves to the next multiple of 1024 above it. If the
/// layer still does not fit, the canvas grows by the overflow rounded the
/// same way. Returns `None` when the result does not fit an `i32`.
pub fn round_canvas_dimension(canvas: i32, offset: i32, image: i32) -> Option<i32> {
    let mut canvas = canvas.checked_add(CANVAS_STEP - canvas.rem_euclid(CANVAS_STEP))?;
    let overflow = offset.checked_add(image)?.checked_sub(canvas)?;
    if overflow > 0 {
        canvas = canvas
            .checked_add(overflow)?
            .checked_add(CANVAS_STEP - overflow % CANVAS_STEP)?;
    }
    Some(canvas)
}

/// Round both canvas dimensions.
pub fn round_canvas(
    (canvas_width, canvas_height): (i32, i32),
    (offset_x, offset_y): (i32, i32),
    (image_width, image_height): (i32, i32),
) -> Option<(i32, i32)> {
    Some((
        round_canvas_dimension(canvas_width, offset_x, image_width)?,
        round_canvas_dimension(canvas_height, offset_y, image_height)?,
    ))
}

/// Describes where a layer sits on its canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub canvas_width: usize,
    pub canvas_height: usize,
    pub offset_x: usize,
    pub offset_y: usize,
    pub image_width: usize,
    pub image_height: usize,
}

impl Placement {
    #[inline]
    fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.offset_x
            && y >= self.offset_y
            && x < self.offset_x + self.image_width
            && y < self.offset_y + self.image_height
    }
}

/// Copy layer pixels onto a zeroed canvas-sized buffer.
///
/// Canvas pixels inside the layer rectangle take the layer's pixels in
/// raster order; the rest stay zero.
pub fn place_on_canvas(pixels: &[u8], bpp: usize, placement: &Placement) -> Vec<u8> {
    let mut canvas = vec![0u8; placement.canvas_width * placement.canvas_height * bpp];
    let mut source = pixels.chunks_exact(bpp);

    for y in 0..placement.canvas_height {
        for x in 0..placement.canvas_width {
            if !placement.contains(x, y) {
                continue;
            }
            let Some(pixel) = source.next() else {
                return canvas;
            };
            let at = (y * placement.canvas_width + x) * bpp;
            canvas[at..at + bpp].copy_from_slice(pixel);
        }
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_wide_layer() {
        let w = round_canvas_dimension(2000, 1500, 2000).unwrap();
        assert_eq!(w % 1024, 0);
        assert!(w >= 3500);
        assert_eq!(w, 4096);
    }

    #[test]
    fn test_round_fits_without_growth() {
        assert_eq!(round_canvas_dimension(100, 0, 100), Some(1024));
        assert_eq!(round_canvas_dimension(1024, 10, 20), Some(2048));
        assert_eq!(round_canvas((0, 0), (0, 0), (5, 5)), Some((1024, 1024)));
    }

    #[test]
    fn test_round_near_i32_max() {
        assert_eq!(round_canvas_dimension(0x7FFF_FF00, 0, 16), None);
        assert_eq!(round_canvas_dimension(0, 0x7FFF_FFF0, 0x100), None);
        assert_eq!(round_canvas((0, 0x7FFF_FF00), (0, 0), (1, 1)), None);
    }

    #[test]
    fn test_place_on_canvas() {
        let placement = Placement {
            canvas_width: 4,
            canvas_height: 3,
            offset_x: 1,
            offset_y: 1,
            image_width: 2,
            image_height: 2,
        };
        let out = place_on_canvas(&[1, 2, 3, 4], 1, &placement);
        assert_eq!(out, vec![0, 0, 0, 0, 0, 1, 2, 0, 0, 3, 4, 0]);
    }

    #[test]
    fn test_place_short_source() {
        let placement = Placement {
            canvas_width: 2,
            canvas_height: 2,
            offset_x: 0,
            offset_y: 0,
            image_width: 2,
            image_height: 2,
        };
        let out = place_on_canvas(&[9, 9, 8, 8], 2, &placement);
        assert_eq!(out, vec![9, 9, 8, 8, 0, 0, 0, 0]);
    }
}
