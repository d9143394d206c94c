//! Pointer state tracker.
//!
//! [`PointerState`] holds the most recent pointer position in normalized
//! device coordinates (x right, y up, both in `[-1, 1]` while the pointer is
//! over the canvas). The host reports positions in viewport pixels; the
//! [`CanvasRect`] maps them into NDC.

use glam::Vec2;

/// Canvas placement in viewport pixels, as returned by a bounding-rect query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasRect {
    /// Left edge in viewport pixels.
    pub left: f32,
    /// Top edge in viewport pixels.
    pub top: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl CanvasRect {
    /// A canvas anchored at the viewport origin.
    pub fn from_size(width: f32, height: f32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
        }
    }

    /// Whether both dimensions are strictly positive.
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Map a client position to NDC. Returns `None` for a degenerate canvas.
    pub fn to_ndc(&self, client_x: f32, client_y: f32) -> Option<Vec2> {
        if !self.is_valid() {
            return None;
        }
        let x = ((client_x - self.left) / self.width) * 2.0 - 1.0;
        let y = -((client_y - self.top) / self.height) * 2.0 + 1.0;
        Some(Vec2::new(x, y))
    }

    /// Map an NDC position back to client pixels.
    pub fn to_client(&self, ndc: Vec2) -> Vec2 {
        Vec2::new(
            self.left + (ndc.x + 1.0) * 0.5 * self.width,
            self.top + (1.0 - ndc.y) * 0.5 * self.height,
        )
    }
}

/// Latest pointer position in normalized device coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    ndc: Vec2,
    moved: bool,
}

impl PointerState {
    /// Creates a pointer resting at the canvas center.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a pointer-move event in client pixels.
    ///
    /// Ignored when the canvas has no area.
    pub fn on_pointer_moved(&mut self, rect: &CanvasRect, client_x: f32, client_y: f32) {
        match rect.to_ndc(client_x, client_y) {
            Some(ndc) => {
                self.ndc = ndc;
                self.moved = true;
            }
            None => tracing::debug!("pointer move ignored: canvas has no area"),
        }
    }

    /// Overwrite the NDC position directly.
    pub fn set_ndc(&mut self, ndc: Vec2) {
        self.ndc = ndc;
        self.moved = true;
    }

    /// Current position in NDC.
    #[must_use]
    pub fn ndc(&self) -> Vec2 {
        self.ndc
    }

    /// Whether any pointer movement has been observed since mount.
    #[must_use]
    pub fn has_moved(&self) -> bool {
        self.moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_maps_to_origin() {
        let rect = CanvasRect::from_size(800.0, 600.0);
        let ndc = rect.to_ndc(400.0, 300.0).unwrap();
        assert!(ndc.length() < 1e-6);
    }

    #[test]
    fn test_corners_map_to_unit_square() {
        let rect = CanvasRect::from_size(800.0, 600.0);
        assert_eq!(rect.to_ndc(0.0, 0.0), Some(Vec2::new(-1.0, 1.0)));
        assert_eq!(rect.to_ndc(800.0, 600.0), Some(Vec2::new(1.0, -1.0)));
    }

    #[test]
    fn test_offset_canvas_subtracts_origin() {
        let rect = CanvasRect {
            left: 100.0,
            top: 50.0,
            width: 200.0,
            height: 100.0,
        };
        let ndc = rect.to_ndc(150.0, 75.0).unwrap();
        assert!((ndc.x + 0.5).abs() < 1e-6);
        assert!((ndc.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_client_roundtrip() {
        let rect = CanvasRect::from_size(1280.0, 720.0);
        let client = rect.to_client(Vec2::new(0.25, -0.5));
        let ndc = rect.to_ndc(client.x, client.y).unwrap();
        assert!((ndc - Vec2::new(0.25, -0.5)).length() < 1e-5);
    }

    #[test]
    fn test_zero_sized_canvas_is_ignored() {
        let mut pointer = PointerState::new();
        pointer.on_pointer_moved(&CanvasRect::from_size(0.0, 600.0), 10.0, 10.0);
        assert!(!pointer.has_moved());
        assert_eq!(pointer.ndc(), Vec2::ZERO);
    }

    #[test]
    fn test_position_updates_on_move() {
        let mut pointer = PointerState::new();
        pointer.on_pointer_moved(&CanvasRect::from_size(100.0, 100.0), 100.0, 0.0);
        assert!(pointer.has_moved());
        assert_eq!(pointer.ndc(), Vec2::new(1.0, 1.0));
    }
}
