//! Fill rectangle calculation for surface resizes

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

/// How frame content is placed on a resized surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMode {
    /// Stretch over the whole surface
    #[default]
    Fill,
    /// Largest centred rectangle with the content's aspect ratio
    KeepAspect,
}

/// Destination rectangle in surface coordinates
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct FillRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FillRect {
    pub fn from_vecs(origin: Vec2, size: Vec2) -> Self {
        Self {
            x: origin.x,
            y: origin.y,
            width: size.x,
            height: size.y,
        }
    }

    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Compute where `content` goes on a `surface` sized area
///
/// Empty content falls back to filling the surface.
pub fn fit_rect(content: (u32, u32), surface: (u32, u32), mode: FitMode) -> FillRect {
    let bounds = Vec2::new(surface.0 as f32, surface.1 as f32);

    if mode == FitMode::Fill || content.0 == 0 || content.1 == 0 {
        return FillRect::from_vecs(Vec2::ZERO, bounds);
    }

    let size = Vec2::new(content.0 as f32, content.1 as f32);
    let content_aspect = size.x / size.y;
    let bounds_aspect = bounds.x / bounds.y;

    let mul = if bounds_aspect < content_aspect {
        bounds.x / size.x
    } else {
        bounds.y / size.y
    };

    let scaled = size * mul;
    let origin = (bounds - scaled) / 2.0;

    FillRect::from_vecs(origin, scaled)
}
