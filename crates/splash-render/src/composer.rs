//! Post-processing composer: a scene pass followed by a bloom pass.
//!
//! The composer owns the size of every intermediate target. Bloom blurs through
//! a mip chain that starts at half resolution and halves per level, so a resize
//! has to rebuild the chain.

use bytemuck::{Pod, Zeroable};

/// Number of blur levels in the bloom mip chain.
pub const BLOOM_MIP_LEVELS: usize = 5;

/// Passes run by the composer, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPassKind {
    /// Renders the scene into the composer's read buffer.
    Scene,
    /// Extracts bright pixels, blurs them and adds them back.
    Bloom,
}

/// GPU uniform for the bloom shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct BloomParams {
    /// Glow strength.
    pub strength: f32,
    /// Blur radius.
    pub radius: f32,
    /// Luminance threshold.
    pub threshold: f32,
    /// Padding to 16 bytes.
    pub _pad: f32,
}

/// Bloom pass parameters and its mip chain dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct BloomPass {
    /// Glow strength.
    pub strength: f32,
    /// Blur radius.
    pub radius: f32,
    /// Luminance threshold.
    pub threshold: f32,
    mip_sizes: Vec<(u32, u32)>,
}

impl BloomPass {
    /// Create a bloom pass for a target of the given pixel size.
    pub fn new(strength: f32, radius: f32, threshold: f32, width: u32, height: u32) -> Self {
        let mut pass = Self {
            strength,
            radius,
            threshold,
            mip_sizes: Vec::with_capacity(BLOOM_MIP_LEVELS),
        };
        pass.set_size(width, height);
        pass
    }

    /// Rebuild the mip chain for a new target size.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.mip_sizes.clear();
        let mut w = (width / 2).max(1);
        let mut h = (height / 2).max(1);
        for _ in 0..BLOOM_MIP_LEVELS {
            self.mip_sizes.push((w, h));
            w = (w / 2).max(1);
            h = (h / 2).max(1);
        }
    }

    /// Mip chain dimensions, largest first.
    pub fn mip_sizes(&self) -> &[(u32, u32)] {
        &self.mip_sizes
    }

    /// Uniform block for upload.
    pub fn params(&self) -> BloomParams {
        BloomParams {
            strength: self.strength,
            radius: self.radius,
            threshold: self.threshold,
            _pad: 0.0,
        }
    }
}

/// Scene + bloom composer sized to the drawing surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Composer {
    passes: Vec<RenderPassKind>,
    bloom: BloomPass,
    width: u32,
    height: u32,
    pixel_ratio: f32,
}

impl Composer {
    /// Create a composer for a surface of `width`×`height` logical pixels.
    pub fn new(width: u32, height: u32, pixel_ratio: f32, bloom: BloomPass) -> Self {
        let mut composer = Self {
            passes: vec![RenderPassKind::Scene, RenderPassKind::Bloom],
            bloom,
            width,
            height,
            pixel_ratio,
        };
        composer.set_size(width, height);
        composer
    }

    /// Resize every intermediate target. Logical pixels are scaled by the pixel ratio.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        let (w, h) = self.drawing_buffer_size();
        self.bloom.set_size(w, h);
    }

    /// Logical size.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Physical size of the render targets.
    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        (
            (self.width as f32 * self.pixel_ratio).round() as u32,
            (self.height as f32 * self.pixel_ratio).round() as u32,
        )
    }

    /// Passes in execution order.
    pub fn passes(&self) -> &[RenderPassKind] {
        &self.passes
    }

    /// The bloom pass.
    pub fn bloom(&self) -> &BloomPass {
        &self.bloom
    }
}
