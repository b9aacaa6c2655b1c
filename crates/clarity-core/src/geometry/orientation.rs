//! Full-screen quad geometry for each interface orientation.
//!
//! Every orientation has its own six-vertex quad whose texture coordinates
//! rotate the camera image to appear upright. Offscreen passes always use
//! [`Orientation::LandscapeRight`], which maps the texture straight through.

use serde::{Deserialize, Serialize};

/// One quad corner: clip-space position and texture coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

/// Two triangles covering clip space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadGeometry {
    pub vertices: [QuadVertex; 6],
}

const fn v(x: f32, y: f32, u: f32, w: f32) -> QuadVertex {
    QuadVertex {
        position: [x, y],
        uv: [u, w],
    }
}

/// Identity mapping, also used for every offscreen pass.
pub const LANDSCAPE_RIGHT_QUAD: QuadGeometry = QuadGeometry {
    vertices: [
        v(-1.0, -1.0, 0.0, 1.0),
        v(1.0, -1.0, 1.0, 1.0),
        v(-1.0, 1.0, 0.0, 0.0),
        v(1.0, -1.0, 1.0, 1.0),
        v(-1.0, 1.0, 0.0, 0.0),
        v(1.0, 1.0, 1.0, 0.0),
    ],
};

/// Half-turn.
pub const LANDSCAPE_LEFT_QUAD: QuadGeometry = QuadGeometry {
    vertices: [
        v(-1.0, -1.0, 1.0, 0.0),
        v(1.0, -1.0, 0.0, 0.0),
        v(-1.0, 1.0, 1.0, 1.0),
        v(1.0, -1.0, 0.0, 0.0),
        v(-1.0, 1.0, 1.0, 1.0),
        v(1.0, 1.0, 0.0, 1.0),
    ],
};

/// Quarter turn clockwise.
pub const PORTRAIT_QUAD: QuadGeometry = QuadGeometry {
    vertices: [
        v(-1.0, -1.0, 1.0, 1.0),
        v(1.0, -1.0, 1.0, 0.0),
        v(-1.0, 1.0, 0.0, 1.0),
        v(1.0, -1.0, 1.0, 0.0),
        v(-1.0, 1.0, 0.0, 1.0),
        v(1.0, 1.0, 0.0, 0.0),
    ],
};

/// Quarter turn counter-clockwise.
pub const PORTRAIT_UPSIDE_DOWN_QUAD: QuadGeometry = QuadGeometry {
    vertices: [
        v(-1.0, -1.0, 0.0, 0.0),
        v(1.0, -1.0, 0.0, 1.0),
        v(-1.0, 1.0, 1.0, 0.0),
        v(1.0, -1.0, 0.0, 1.0),
        v(-1.0, 1.0, 1.0, 0.0),
        v(1.0, 1.0, 1.0, 1.0),
    ],
};

/// Device interface orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    LandscapeRight,
    LandscapeLeft,
    Portrait,
    PortraitUpsideDown,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::LandscapeRight,
        Orientation::LandscapeLeft,
        Orientation::Portrait,
        Orientation::PortraitUpsideDown,
    ];

    pub fn quad(self) -> &'static QuadGeometry {
        match self {
            Self::LandscapeRight => &LANDSCAPE_RIGHT_QUAD,
            Self::LandscapeLeft => &LANDSCAPE_LEFT_QUAD,
            Self::Portrait => &PORTRAIT_QUAD,
            Self::PortraitUpsideDown => &PORTRAIT_UPSIDE_DOWN_QUAD,
        }
    }

    /// Stable index into per-orientation tables.
    pub fn index(self) -> usize {
        match self {
            Self::LandscapeRight => 0,
            Self::LandscapeLeft => 1,
            Self::Portrait => 2,
            Self::PortraitUpsideDown => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uv_at(quad: &QuadGeometry, x: f32, y: f32) -> [f32; 2] {
        quad.vertices
            .iter()
            .find(|v| v.position == [x, y])
            .map(|v| v.uv)
            .unwrap_or([f32::NAN; 2])
    }

    #[test]
    fn test_every_quad_covers_clip_space() {
        for orientation in Orientation::ALL {
            let quad = orientation.quad();
            for corner in [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]] {
                assert!(quad.vertices.iter().any(|v| v.position == corner));
            }
        }
    }

    #[test]
    fn test_landscape_right_is_passthrough() {
        let quad = Orientation::LandscapeRight.quad();
        assert_eq!(uv_at(quad, -1.0, 1.0), [0.0, 0.0]);
        assert_eq!(uv_at(quad, 1.0, -1.0), [1.0, 1.0]);
    }

    #[test]
    fn test_landscape_left_is_half_turn() {
        let quad = Orientation::LandscapeLeft.quad();
        assert_eq!(uv_at(quad, -1.0, 1.0), [1.0, 1.0]);
        assert_eq!(uv_at(quad, 1.0, -1.0), [0.0, 0.0]);
    }

    #[test]
    fn test_shared_vertices_agree_within_each_quad() {
        for orientation in Orientation::ALL {
            let quad = orientation.quad();
            for a in &quad.vertices {
                for b in &quad.vertices {
                    if a.position == b.position {
                        assert_eq!(a.uv, b.uv);
                    }
                }
            }
        }
    }

    #[test]
    fn test_indices_are_distinct() {
        let mut seen = [false; 4];
        for orientation in Orientation::ALL {
            seen[orientation.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}
