//! View decoding
//!
//! Turns a render-target or unordered-access view description into the
//! subresource range it writes.

use tracing::warn;

use crate::d3d::*;

/// Mip level and array layer range addressed by a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubresourceRange {
    pub mip_level: u32,
    pub first_layer: u32,
    pub layer_count: u32,
}

impl Default for SubresourceRange {
    fn default() -> Self {
        Self { mip_level: 0, first_layer: 0, layer_count: 1 }
    }
}

impl SubresourceRange {
    /// Subresource indices covered by this range in a resource with `mip_levels` mips.
    pub fn subresources(&self, mip_levels: u32) -> impl Iterator<Item = u32> {
        let range = *self;
        (0..range.layer_count)
            .map(move |i| calc_subresource(range.mip_level, range.first_layer + i, mip_levels))
    }
}

/// Decode the subresource range written through a view.
///
/// Undecodable dimensions log and fall back to mip 0, layer 0.
pub fn subresource_range(view: &ViewDesc) -> SubresourceRange {
    let single = |mip_level| SubresourceRange { mip_level, first_layer: 0, layer_count: 1 };
    let array = |mip_level, first_layer, layer_count| SubresourceRange {
        mip_level,
        first_layer,
        layer_count,
    };

    match *view {
        ViewDesc::RenderTarget { dimension, .. } => match dimension {
            RtvDimension::Texture1D { mip_slice } => single(mip_slice),
            RtvDimension::Texture1DArray { mip_slice, first_array_slice, array_size } => {
                array(mip_slice, first_array_slice, array_size)
            }
            RtvDimension::Texture2D { mip_slice } => single(mip_slice),
            RtvDimension::Texture2DArray { mip_slice, first_array_slice, array_size } => {
                array(mip_slice, first_array_slice, array_size)
            }
            RtvDimension::Texture3D { mip_slice, .. } => single(mip_slice),
            other => {
                warn!("Unhandled RTV dimension {:?}", other);
                SubresourceRange::default()
            }
        },
        ViewDesc::UnorderedAccess { dimension, .. } => match dimension {
            UavDimension::Buffer { .. } => SubresourceRange::default(),
            UavDimension::Texture1D { mip_slice } => single(mip_slice),
            UavDimension::Texture1DArray { mip_slice, first_array_slice, array_size } => {
                array(mip_slice, first_array_slice, array_size)
            }
            UavDimension::Texture2D { mip_slice } => single(mip_slice),
            UavDimension::Texture2DArray { mip_slice, first_array_slice, array_size } => {
                array(mip_slice, first_array_slice, array_size)
            }
            UavDimension::Texture3D { mip_slice, .. } => single(mip_slice),
        },
        ViewDesc::Other => {
            warn!("Unhandled view type");
            SubresourceRange::default()
        }
    }
}
