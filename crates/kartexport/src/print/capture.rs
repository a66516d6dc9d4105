//! Flattening of rendered map canvases into one raster

use crate::map::{Affine, CanvasLayer};
use crate::types::Size;
use image::{Rgba, RgbaImage};

/// Draw every canvas layer, in order, over an opaque background.
///
/// Each layer is composited with source-over blending at its opacity; its
/// transform is honored with nearest-neighbour sampling.
pub fn capture_canvas(size: Size, layers: &[CanvasLayer], background: Rgba<u8>) -> RgbaImage {
    let mut output = RgbaImage::from_pixel(size.width, size.height, background);

    for layer in layers {
        let opacity = layer.opacity.clamp(0.0, 1.0);
        if opacity <= 0.0 {
            continue;
        }
        if layer.transform.is_identity() {
            draw_untransformed(&mut output, &layer.image, opacity);
        } else {
            match layer.transform.invert() {
                Some(inverse) => draw_transformed(&mut output, &layer.image, &inverse, opacity),
                None => log::warn!(
                    "Canvas of layer {} has a singular transform, skipping",
                    layer.layer
                ),
            }
        }
    }

    output
}

fn draw_untransformed(output: &mut RgbaImage, image: &RgbaImage, opacity: f32) {
    let width = output.width().min(image.width());
    let height = output.height().min(image.height());
    for y in 0..height {
        for x in 0..width {
            let src = *image.get_pixel(x, y);
            blend(output.get_pixel_mut(x, y), src, opacity);
        }
    }
}

fn draw_transformed(output: &mut RgbaImage, image: &RgbaImage, inverse: &Affine, opacity: f32) {
    let (src_w, src_h) = (f64::from(image.width()), f64::from(image.height()));
    for y in 0..output.height() {
        for x in 0..output.width() {
            let (sx, sy) = inverse.apply(f64::from(x) + 0.5, f64::from(y) + 0.5);
            if sx < 0.0 || sy < 0.0 || sx >= src_w || sy >= src_h {
                continue;
            }
            let src = *image.get_pixel(sx as u32, sy as u32);
            blend(output.get_pixel_mut(x, y), src, opacity);
        }
    }
}

/// Source-over blending of `src` scaled by `opacity` onto `dst`
fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>, opacity: f32) {
    let sa = f32::from(src[3]) / 255.0 * opacity;
    if sa <= 0.0 {
        return;
    }
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for c in 0..3 {
        let sc = f32::from(src[c]);
        let dc = f32::from(dst[c]);
        let value = (sc * sa + dc * da * (1.0 - sa)) / out_a;
        dst[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::LayerId;

    fn layer(image: RgbaImage, opacity: f32, transform: Affine) -> CanvasLayer {
        CanvasLayer {
            layer: LayerId(1),
            image,
            opacity,
            transform,
        }
    }

    #[test]
    fn test_background_shows_through_transparent_canvas() {
        let canvas = layer(RgbaImage::new(4, 4), 1.0, Affine::IDENTITY);
        let out = capture_canvas(Size::new(4, 4), &[canvas], Rgba([0, 0, 0, 255]));
        assert_eq!(*out.get_pixel(2, 2), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_opacity_blends_with_background() {
        let red = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));
        let out = capture_canvas(
            Size::new(2, 2),
            &[layer(red, 0.5, Affine::IDENTITY)],
            Rgba([255, 255, 255, 255]),
        );
        assert_eq!(*out.get_pixel(0, 0), Rgba([255, 128, 128, 255]));
    }

    #[test]
    fn test_transform_offsets_canvas() {
        // 4x4 canvas drawn shifted by (-1, -1): the map pixel (0, 0) shows canvas (1, 1)
        let mut image = RgbaImage::new(4, 4);
        image.put_pixel(1, 1, Rgba([0, 255, 0, 255]));
        let out = capture_canvas(
            Size::new(2, 2),
            &[layer(image, 1.0, Affine::translate(-1.0, -1.0))],
            Rgba([255, 255, 255, 255]),
        );
        assert_eq!(*out.get_pixel(0, 0), Rgba([0, 255, 0, 255]));
        assert_eq!(*out.get_pixel(1, 1), Rgba([255, 255, 255, 255]));
    }
}
