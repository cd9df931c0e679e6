use crate::overlay::source::BackgroundImage;
use crate::overlay::surface::{InkLayer, Rgba};
use image::imageops::FilterType;
use image::RgbaImage;

/// Where the background lands inside the surface: scaled uniformly to fit,
/// centred, letterboxed on the short axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

pub fn fit_contain(image: (u32, u32), surface: (u32, u32)) -> FitRect {
    let (iw, ih) = image;
    let (sw, sh) = surface;
    if iw == 0 || ih == 0 || sw == 0 || sh == 0 {
        return FitRect {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        };
    }
    let scale = (sw as f32 / iw as f32).min(sh as f32 / ih as f32);
    let width = ((iw as f32 * scale).round() as u32).clamp(1, sw);
    let height = ((ih as f32 * scale).round() as u32).clamp(1, sh);
    FitRect {
        x: (sw - width) / 2,
        y: (sh - height) / 2,
        width,
        height,
    }
}

/// Flattens ink over the background at surface resolution. This is what an
/// export reads; the overlay itself never composites.
pub fn flatten(background: &BackgroundImage, ink: &InkLayer, letterbox: Rgba) -> RgbaImage {
    let (sw, sh) = ink.size();
    let mut out = RgbaImage::from_pixel(
        sw,
        sh,
        image::Rgba([letterbox.r, letterbox.g, letterbox.b, letterbox.a]),
    );

    let fit = fit_contain(background.size(), (sw, sh));
    if fit.width > 0 && fit.height > 0 {
        let scaled = image::imageops::resize(
            background.rgba(),
            fit.width,
            fit.height,
            FilterType::Triangle,
        );
        image::imageops::overlay(&mut out, &scaled, fit.x as i64, fit.y as i64);
    }

    for (x, y, dst) in out.enumerate_pixels_mut() {
        let top = ink.pixel(x, y);
        if top.a == 0 {
            continue;
        }
        let bottom = Rgba::new(dst[0], dst[1], dst[2], dst[3]);
        let blended = blend_pixel(bottom, top);
        *dst = image::Rgba([blended.r, blended.g, blended.b, blended.a]);
    }
    out
}

fn blend_pixel(bottom: Rgba, top: Rgba) -> Rgba {
    let sa = top.a as f32 / 255.0;
    let da = bottom.a as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    if out_a <= f32::EPSILON {
        return Rgba::TRANSPARENT;
    }

    let blend = |s: u8, d: u8| -> u8 {
        (((s as f32 * sa) + (d as f32 * da * (1.0 - sa))) / out_a)
            .round()
            .clamp(0.0, 255.0) as u8
    };

    Rgba {
        r: blend(top.r, bottom.r),
        g: blend(top.g, bottom.g),
        b: blend(top.b, bottom.b),
        a: (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    }
}
