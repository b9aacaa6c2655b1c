//! Captured bi-planar YUV 4:2:0 frames.

use crate::geometry::Extent;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("{plane} plane holds {actual} bytes, needs at least {required}")]
    PlaneTooSmall {
        plane: &'static str,
        required: usize,
        actual: usize,
    },
    #[error("{plane} plane stride {stride} is shorter than a row of {row} bytes")]
    StrideTooShort {
        plane: &'static str,
        stride: usize,
        row: usize,
    },
    #[error("4:2:0 frames need even dimensions, got {0}")]
    OddDimensions(Extent),
    #[error("chroma plane is {actual}, expected {expected}")]
    ChromaMismatch { expected: Extent, actual: Extent },
}

/// One image plane with a row stride.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Bytes between the starts of consecutive rows.
    pub stride: usize,
    pub bytes_per_pixel: usize,
}

impl Plane {
    pub fn new(
        plane: &'static str,
        data: Vec<u8>,
        width: u32,
        height: u32,
        stride: usize,
        bytes_per_pixel: usize,
    ) -> Result<Self, FrameError> {
        let row = width as usize * bytes_per_pixel;
        if stride < row {
            return Err(FrameError::StrideTooShort { plane, stride, row });
        }
        let required = match height {
            0 => 0,
            h => stride * (h as usize - 1) + row,
        };
        if data.len() < required {
            return Err(FrameError::PlaneTooSmall {
                plane,
                required,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
            bytes_per_pixel,
        })
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }

    /// Row `y` without stride padding.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * self.bytes_per_pixel]
    }
}

/// A luma plane plus an interleaved CbCr plane at half resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YuvFrame {
    pub luma: Plane,
    pub chroma: Plane,
    /// Capture order, increasing by one per delivered frame.
    pub sequence: u64,
}

impl YuvFrame {
    pub fn new(luma: Plane, chroma: Plane, sequence: u64) -> Result<Self, FrameError> {
        let size = luma.extent();
        if size.width % 2 != 0 || size.height % 2 != 0 {
            return Err(FrameError::OddDimensions(size));
        }
        let expected = Extent::new(size.width / 2, size.height / 2);
        if chroma.extent() != expected {
            return Err(FrameError::ChromaMismatch {
                expected,
                actual: chroma.extent(),
            });
        }
        Ok(Self {
            luma,
            chroma,
            sequence,
        })
    }

    /// Build from tightly packed NV12 bytes: the luma plane followed by the
    /// interleaved chroma plane.
    pub fn from_nv12(width: u32, height: u32, bytes: &[u8], sequence: u64) -> Result<Self, FrameError> {
        let luma_len = width as usize * height as usize;
        let split = luma_len.min(bytes.len());
        let (luma, chroma) = bytes.split_at(split);
        let luma = Plane::new("luma", luma.to_vec(), width, height, width as usize, 1)?;
        let chroma = Plane::new(
            "chroma",
            chroma.to_vec(),
            width / 2,
            height / 2,
            width as usize,
            2,
        )?;
        Self::new(luma, chroma, sequence)
    }

    pub fn resolution(&self) -> Extent {
        self.luma.extent()
    }

    /// `(Y, Cb, Cr)` at pixel `(x, y)`.
    pub fn sample(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let luma = self.luma.row(y)[x as usize];
        let c = self.chroma.row(y / 2);
        let cx = (x / 2) as usize * 2;
        (luma, c[cx], c[cx + 1])
    }
}
