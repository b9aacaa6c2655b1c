//! Four-character pixel format codes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::yuv::YuvRange;

/// A four-character code such as `420v`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    /// Bi-planar 4:2:0, video range.
    pub const VIDEO_RANGE_NV12: Self = Self(*b"420v");
    /// Bi-planar 4:2:0, full range.
    pub const FULL_RANGE_NV12: Self = Self(*b"420f");

    /// Decode a big-endian packed code.
    pub const fn from_u32(code: u32) -> Self {
        Self(code.to_be_bytes())
    }

    pub const fn to_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// Range implied by the code, for the bi-planar formats this crate reads.
    pub fn yuv_range(self) -> Option<YuvRange> {
        match self {
            Self::VIDEO_RANGE_NV12 => Some(YuvRange::Video),
            Self::FULL_RANGE_NV12 => Some(YuvRange::Full),
            _ => None,
        }
    }
}

impl Default for FourCc {
    fn default() -> Self {
        Self::VIDEO_RANGE_NV12
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{}", char::from(b))?;
        }
        Ok(())
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc({self})")
    }
}

impl TryFrom<String> for FourCc {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let bytes: [u8; 4] = value
            .as_bytes()
            .try_into()
            .map_err(|_| format!("four-character code must be 4 ASCII bytes, got {value:?}"))?;
        if !bytes.is_ascii() {
            return Err(format!("four-character code must be ASCII, got {value:?}"));
        }
        Ok(Self(bytes))
    }
}

impl From<FourCc> for String {
    fn from(value: FourCc) -> Self {
        value.to_string()
    }
}
