//! Immutable per-draw render state.
//!
//! A [`PassDescriptor`] fully describes how a draw combines with its target:
//! blending, culling, depth, and alpha testing. Descriptors are plain values,
//! hashed to look up pre-built pipelines, so a pass can never leak state into
//! the next one.

/// How a draw's output combines with what is already in the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// `src * 1 + dst * 0`: replaces the destination.
    Opaque,
    /// `src * 1 + dst * 1`.
    Additive,
    /// `src * 0 + dst * (1 - src.a)`: writes black wherever the draw is opaque.
    Silhouette,
    /// `src * src.a + dst * (1 - src.a)`.
    AlphaBlend,
}

impl BlendMode {
    /// The matching wgpu blend state. `None` means blending disabled.
    pub fn to_wgpu(self) -> Option<wgpu::BlendState> {
        use wgpu::{BlendComponent, BlendFactor, BlendOperation, BlendState};

        let component = |src_factor, dst_factor| BlendComponent {
            src_factor,
            dst_factor,
            operation: BlendOperation::Add,
        };
        match self {
            BlendMode::Opaque => None,
            BlendMode::Additive => Some(BlendState {
                color: component(BlendFactor::One, BlendFactor::One),
                alpha: BlendComponent::OVER,
            }),
            BlendMode::Silhouette => Some(BlendState {
                color: component(BlendFactor::Zero, BlendFactor::OneMinusSrcAlpha),
                alpha: BlendComponent::OVER,
            }),
            BlendMode::AlphaBlend => Some(BlendState {
                color: component(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha),
                alpha: BlendComponent::OVER,
            }),
        }
    }

    /// Combine one RGB channel on the CPU, matching [`to_wgpu`](Self::to_wgpu).
    #[inline]
    pub fn blend_channel(self, src: f32, src_alpha: f32, dst: f32) -> f32 {
        match self {
            BlendMode::Opaque => src,
            BlendMode::Additive => src + dst,
            BlendMode::Silhouette => dst * (1.0 - src_alpha),
            BlendMode::AlphaBlend => src * src_alpha + dst * (1.0 - src_alpha),
        }
    }
}

/// Which triangle faces are discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Back,
}

impl CullMode {
    pub fn to_wgpu(self) -> Option<wgpu::Face> {
        match self {
            CullMode::None => None,
            CullMode::Back => Some(wgpu::Face::Back),
        }
    }
}

/// Reverse-Z depth format shared by every depth attachment.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Reverse-Z clear value: 0.0 is the far plane.
pub const DEPTH_CLEAR_VALUE: f32 = 0.0;

/// Reverse-Z comparison: closer fragments have larger depth.
pub const DEPTH_COMPARE: wgpu::CompareFunction = wgpu::CompareFunction::GreaterEqual;

/// Alpha reference used for leaf cutouts, out of 255.
pub const LEAF_ALPHA_REF: u8 = 230;

/// Complete state for one draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PassDescriptor {
    pub blend: BlendMode,
    pub cull: CullMode,
    pub depth_write: bool,
    pub depth_test: bool,
    /// Fragments with alpha below `ref / 255` are discarded.
    pub alpha_test: Option<u8>,
}

impl PassDescriptor {
    /// Sky dome into the occlusion mask: visible sky keeps its colour.
    pub const OCCLUSION_SKY: Self = Self {
        blend: BlendMode::Opaque,
        cull: CullMode::None,
        depth_write: false,
        depth_test: false,
        alpha_test: None,
    };

    /// Sun sprite into the occlusion mask.
    pub const OCCLUSION_SUN: Self = Self {
        blend: BlendMode::Additive,
        cull: CullMode::None,
        depth_write: false,
        depth_test: false,
        alpha_test: None,
    };

    /// Terrain and trunks into the occlusion mask, as black.
    pub const OCCLUSION_OPAQUE: Self = Self {
        blend: BlendMode::Silhouette,
        cull: CullMode::Back,
        depth_write: true,
        depth_test: true,
        alpha_test: None,
    };

    /// Leaves into the occlusion mask. Both faces are drawn.
    pub const OCCLUSION_LEAVES: Self = Self {
        blend: BlendMode::Silhouette,
        cull: CullMode::None,
        depth_write: false,
        depth_test: true,
        alpha_test: Some(LEAF_ALPHA_REF),
    };

    /// Sky dome drawn directly in the base colour pass.
    pub const COLOR_SKY: Self = Self::OCCLUSION_SKY;

    /// Lit terrain and trunks.
    pub const COLOR_OPAQUE: Self = Self {
        blend: BlendMode::Opaque,
        cull: CullMode::Back,
        depth_write: true,
        depth_test: true,
        alpha_test: None,
    };

    /// Lit, alpha-blended leaves. Back faces are culled.
    pub const COLOR_LEAVES: Self = Self {
        blend: BlendMode::AlphaBlend,
        cull: CullMode::Back,
        depth_write: false,
        depth_test: true,
        alpha_test: Some(LEAF_ALPHA_REF),
    };

    /// Alpha reference as a 0..1 threshold, or 0 when the test is off.
    pub fn alpha_threshold(&self) -> f32 {
        self.alpha_test.map_or(0.0, |r| f32::from(r) / 255.0)
    }

    /// Whether a fragment of alpha `a` survives the alpha test.
    pub fn passes_alpha(&self, a: f32) -> bool {
        self.alpha_test.is_none_or(|_| a >= self.alpha_threshold())
    }

    pub fn primitive_state(&self) -> wgpu::PrimitiveState {
        wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: self.cull.to_wgpu(),
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        }
    }

    pub fn depth_stencil_state(&self) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: self.depth_write,
            depth_compare: if self.depth_test {
                DEPTH_COMPARE
            } else {
                wgpu::CompareFunction::Always
            },
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }
}
