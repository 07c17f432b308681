use image::RgbaImage;

/// Copy the whole of `src` into `canvas` with its top-left corner at (dx, dy).
///
/// Returns false, leaving the canvas untouched, if `src` would not fit.
pub fn blit_rgba(src: &RgbaImage, canvas: &mut RgbaImage, dx: u32, dy: u32) -> bool {
    let (sw, sh) = src.dimensions();
    let (cw, ch) = canvas.dimensions();
    if dx as u64 + sw as u64 > cw as u64 || dy as u64 + sh as u64 > ch as u64 {
        return false;
    }

    let row = sw as usize * 4;
    let stride = cw as usize * 4;
    let src_raw: &[u8] = src.as_raw();
    let dst: &mut [u8] = canvas;
    for yy in 0..sh as usize {
        let s = yy * row;
        let d = (dy as usize + yy) * stride + dx as usize * 4;
        dst[d..d + row].copy_from_slice(&src_raw[s..s + row]);
    }
    true
}
