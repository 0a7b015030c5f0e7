//! Per-pixel blend rules for each map layer.

use bevy::color::LinearRgba;

use super::{Brush, Operation};
use crate::storage::{MapType, TERRAIN_MAX_HEIGHT};

/// Below this falloff alpha the texture tool leaves control data untouched.
const CONTROL_ALPHA_CLIP: f32 = 0.1;

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

#[inline]
fn decode_index(channel: f32) -> i32 {
    (channel * 255.0).round() as i32
}

#[inline]
fn encode_index(index: i32) -> f32 {
    index as f32 / 255.0
}

/// Applies the brush to one destination pixel of the given layer.
pub fn blend(
    map_type: MapType,
    operation: Operation,
    src: LinearRgba,
    brush: &Brush,
    alpha: f32,
) -> LinearRgba {
    match map_type {
        MapType::Height => blend_height(
            src,
            operation,
            brush.height() / TERRAIN_MAX_HEIGHT,
            alpha,
            brush.opacity(),
        ),
        MapType::Control => blend_control(src, operation, brush.index(), alpha, brush.opacity()),
        MapType::Color => blend_color(src, operation, brush.color(), alpha, brush.opacity()),
    }
}

/// Height lives in red, normalized. `height` is already normalized.
pub fn blend_height(
    src: LinearRgba,
    operation: Operation,
    height: f32,
    alpha: f32,
    opacity: f32,
) -> LinearRgba {
    let value = match operation {
        Operation::Add => src.red + height * alpha * opacity,
        Operation::Subtract => src.red - height * alpha * opacity,
        Operation::Multiply => src.red * (alpha * height * opacity + 1.0),
        Operation::Replace => lerp(src.red, height, alpha),
    };
    LinearRgba::new(value.clamp(0.0, 1.0), 0.0, 0.0, 1.0)
}

/// Control maps hold the base index in red, the overlay index in green and
/// the overlay blend in blue.
///
/// `Add` paints the overlay, `Replace` the base. Painting the base material
/// as overlay erases the overlay instead. Other operations leave the pixel
/// unchanged.
pub fn blend_control(
    src: LinearRgba,
    operation: Operation,
    index: u8,
    alpha: f32,
    opacity: f32,
) -> LinearRgba {
    let alpha_clip = if alpha < CONTROL_ALPHA_CLIP { 0.0 } else { 1.0 };
    let index_base = decode_index(src.red);
    let index_overlay = decode_index(src.green);
    let index = f32::from(index);
    let mut dest = src;

    match operation {
        Operation::Add => {
            let dest_index = lerp(index_overlay as f32, index, alpha_clip).round() as i32;
            if dest_index == index_base {
                dest.blue = lerp(src.blue, 0.0, alpha_clip);
            } else {
                dest.green = encode_index(dest_index);
                dest.blue = lerp(
                    src.blue,
                    (src.blue + opacity * alpha).clamp(0.0, 1.0),
                    alpha_clip,
                );
            }
        }
        Operation::Replace => {
            let dest_index = lerp(index_base as f32, index, alpha_clip).round() as i32;
            dest.red = encode_index(dest_index);
            dest.blue = lerp(src.blue, 0.0, alpha_clip);
        }
        Operation::Subtract | Operation::Multiply => {}
    }
    dest
}

/// Tints toward a target color by `alpha * opacity`. Alpha is preserved.
///
/// The target is the brush color for `Add` and `Replace`, the product for
/// `Multiply` and the clamped difference for `Subtract`.
pub fn blend_color(
    src: LinearRgba,
    operation: Operation,
    color: LinearRgba,
    alpha: f32,
    opacity: f32,
) -> LinearRgba {
    let target = match operation {
        Operation::Add | Operation::Replace => color,
        Operation::Multiply => LinearRgba::new(
            src.red * color.red,
            src.green * color.green,
            src.blue * color.blue,
            src.alpha,
        ),
        Operation::Subtract => LinearRgba::new(
            (src.red - color.red).max(0.0),
            (src.green - color.green).max(0.0),
            (src.blue - color.blue).max(0.0),
            src.alpha,
        ),
    };
    let t = alpha * opacity;
    LinearRgba::new(
        lerp(src.red, target.red, t),
        lerp(src.green, target.green, t),
        lerp(src.blue, target.blue, t),
        src.alpha,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn height(value: f32) -> LinearRgba {
        LinearRgba::new(value, 0.0, 0.0, 1.0)
    }

    fn control(base: i32, overlay: i32, blend: f32) -> LinearRgba {
        LinearRgba::new(encode_index(base), encode_index(overlay), blend, 1.0)
    }

    #[test]
    fn test_height_replace_is_exact() {
        for src in [0.0, 0.3, 0.5, 1.0] {
            let dest = blend_height(height(src), Operation::Replace, 1.0, 1.0, 0.7);
            assert_eq!(dest.red, 1.0);
        }
    }

    #[test]
    fn test_height_zero_alpha_is_fixed_point() {
        for operation in [Operation::Add, Operation::Subtract, Operation::Multiply] {
            let dest = blend_height(height(0.42), operation, 0.8, 0.0, 1.0);
            assert_eq!(dest, height(0.42));
        }
    }

    #[test]
    fn test_height_operations() {
        let src = height(0.5);
        assert!((blend_height(src, Operation::Add, 0.2, 1.0, 0.5).red - 0.6).abs() < 1e-6);
        assert!((blend_height(src, Operation::Subtract, 0.2, 0.5, 1.0).red - 0.4).abs() < 1e-6);
        assert_eq!(blend_height(src, Operation::Multiply, 1.0, 1.0, 0.5).red, 0.75);
        assert_eq!(blend_height(src, Operation::Add, 1.0, 1.0, 1.0).red, 1.0);
        assert_eq!(blend_height(src, Operation::Subtract, 1.0, 1.0, 1.0).red, 0.0);
    }

    #[test]
    fn test_height_clears_other_channels() {
        let src = LinearRgba::new(0.5, 0.3, 0.2, 0.1);
        assert_eq!(blend_height(src, Operation::Add, 0.0, 1.0, 1.0), height(0.5));
    }

    #[test]
    fn test_control_add_paints_overlay() {
        let dest = blend_control(control(1, 0, 0.2), Operation::Add, 5, 1.0, 0.5);
        assert_eq!(decode_index(dest.red), 1);
        assert_eq!(decode_index(dest.green), 5);
        assert!((dest.blue - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_control_add_base_erases_overlay() {
        let dest = blend_control(control(3, 7, 0.8), Operation::Add, 3, 1.0, 1.0);
        assert_eq!(dest.blue, 0.0);
        assert_eq!(decode_index(dest.red), 3);
    }

    #[test]
    fn test_control_alpha_clip() {
        let src = control(2, 4, 0.5);
        assert_eq!(blend_control(src, Operation::Add, 9, 0.09, 1.0), src);
        assert_eq!(blend_control(src, Operation::Replace, 9, 0.05, 1.0), src);
    }

    #[test]
    fn test_control_replace_sets_base() {
        let dest = blend_control(control(2, 4, 0.5), Operation::Replace, 9, 0.1, 1.0);
        assert_eq!(decode_index(dest.red), 9);
        assert_eq!(decode_index(dest.green), 4);
        assert_eq!(dest.blue, 0.0);
    }

    #[test]
    fn test_control_other_operations_are_noops() {
        let src = control(2, 4, 0.5);
        assert_eq!(blend_control(src, Operation::Subtract, 9, 1.0, 1.0), src);
        assert_eq!(blend_control(src, Operation::Multiply, 9, 1.0, 1.0), src);
    }

    #[test]
    fn test_color() {
        let src = LinearRgba::new(0.8, 0.8, 0.8, 0.3);
        let red = LinearRgba::RED;
        assert_eq!(
            blend_color(src, Operation::Replace, red, 1.0, 1.0),
            LinearRgba::new(1.0, 0.0, 0.0, 0.3)
        );
        assert_eq!(blend_color(src, Operation::Add, red, 0.0, 1.0), src);
        assert_eq!(
            blend_color(src, Operation::Multiply, red, 1.0, 1.0),
            LinearRgba::new(0.8, 0.0, 0.0, 0.3)
        );
        let sub = blend_color(src, Operation::Subtract, red, 1.0, 1.0);
        assert_eq!(sub.red, 0.0);
        assert_eq!(sub.green, 0.8);
    }
}
