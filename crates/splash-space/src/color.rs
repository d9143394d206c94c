//! Color helpers.

pub use splash_render::rgb_from_hex;

/// Convert HSL (all components in `[0, 1]`, hue wrapping) to RGB.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [f32; 3] {
    let h = h.rem_euclid(1.0);
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);
    if s == 0.0 {
        return [l; 3];
    }
    let q = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    [
        hue_to_rgb(p, q, h + 1.0 / 3.0),
        hue_to_rgb(p, q, h),
        hue_to_rgb(p, q, h - 1.0 / 3.0),
    ]
}

fn hue_to_rgb(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * 6.0 * (2.0 / 3.0 - t)
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-3)
    }

    #[test]
    fn test_hex_channels() {
        assert!(close(rgb_from_hex(0xff0000), [1.0, 0.0, 0.0]));
        assert!(close(rgb_from_hex(0x06b6d4), [6.0 / 255.0, 182.0 / 255.0, 212.0 / 255.0]));
    }

    #[test]
    fn test_hsl_primaries() {
        assert!(close(hsl_to_rgb(0.0, 1.0, 0.5), [1.0, 0.0, 0.0]));
        assert!(close(hsl_to_rgb(1.0 / 3.0, 1.0, 0.5), [0.0, 1.0, 0.0]));
        assert!(close(hsl_to_rgb(2.0 / 3.0, 1.0, 0.5), [0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_hsl_full_lightness_is_white() {
        assert!(close(hsl_to_rgb(0.7, 0.6, 1.0), [1.0, 1.0, 1.0]));
    }

    #[test]
    fn test_hsl_greyscale_when_unsaturated() {
        assert!(close(hsl_to_rgb(0.3, 0.0, 0.4), [0.4, 0.4, 0.4]));
    }
}
