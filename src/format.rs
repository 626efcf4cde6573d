//! Format Size Table
//!
//! Maps a DXGI format to its per-pixel byte size. Typeless and typed
//! variants of one bit layout are numerically adjacent in the DXGI
//! enumeration, so a handful of closed ranges covers every format the
//! fast path is expected to see.

use tracing::warn;

use crate::d3d::*;

/// Closed range of format values sharing one pixel size.
struct FormatRange {
    min: DxgiFormat,
    max: DxgiFormat,
    size: u32,
}

const FORMAT_RANGES: [FormatRange; 7] = [
    FormatRange { min: DXGI_FORMAT_R32G32B32A32_TYPELESS, max: DXGI_FORMAT_R32G32B32A32_SINT, size: 16 },
    FormatRange { min: DXGI_FORMAT_R32G32B32_TYPELESS, max: DXGI_FORMAT_R32G32B32_SINT, size: 12 },
    FormatRange { min: DXGI_FORMAT_R16G16B16A16_TYPELESS, max: DXGI_FORMAT_R32G32_SINT, size: 8 },
    FormatRange { min: DXGI_FORMAT_R10G10B10A2_TYPELESS, max: DXGI_FORMAT_R32_SINT, size: 4 },
    FormatRange { min: DXGI_FORMAT_B8G8R8A8_UNORM, max: DXGI_FORMAT_B8G8R8X8_UNORM_SRGB, size: 4 },
    FormatRange { min: DXGI_FORMAT_R8G8_TYPELESS, max: DXGI_FORMAT_R16_SINT, size: 2 },
    FormatRange { min: DXGI_FORMAT_R8_TYPELESS, max: DXGI_FORMAT_A8_UNORM, size: 1 },
];

/// Pixel size of `format` in bytes, or `None` if no range covers it.
pub fn lookup_format_size(format: DxgiFormat) -> Option<u32> {
    FORMAT_RANGES
        .iter()
        .find(|range| (range.min..=range.max).contains(&format))
        .map(|range| range.size)
}

/// Pixel size of `format` in bytes.
///
/// Unrecognized formats report 1 byte. The resulting copy is under-sized
/// rather than out of bounds.
pub fn format_size(format: DxgiFormat) -> u32 {
    lookup_format_size(format).unwrap_or_else(|| {
        warn!("Unhandled format {}", format);
        1
    })
}
