//! CPU Fast-Path Copy Engine
//!
//! Performs a subresource copy by mapping both sides and copying memory on
//! the CPU, instead of queueing a GPU copy that the application is about
//! to stall on. The destination is probed with a non-blocking map; if the
//! GPU still owns it, the caller falls back to the GPU copy.

use std::ptr;

use tracing::{error, trace};

use crate::d3d::{MapType, Usage, D3D11_MAP_FLAG_DO_NOT_WAIT};
use crate::descriptor::ResourceDescriptor;
use crate::driver::{DriverError, GpuContext, GpuResource, MappedSubresource};
use crate::format::format_size;
use crate::region::{clip, full_extent_box, ClippedRegion, CopyBox, Origin};
use crate::shim::Shim;

/// Placement of one copy between two subresources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CopyParams {
    pub dst_subresource: u32,
    pub dst_origin: Origin,
    pub src_subresource: u32,
    /// Source region; the whole source subresource when `None`.
    pub src_box: Option<CopyBox>,
}

impl CopyParams {
    /// Subresource 0 to subresource 0, full extent.
    pub fn whole_resource() -> Self {
        Self::default()
    }
}

/// Why the fast path left a copy to the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decline {
    DestinationNotCpuWritable,
    Undescribable,
    /// The destination could not be mapped without waiting on the GPU.
    DestinationBusy,
    DestinationMapFailed,
    NoShadow,
    SourceMapFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Applied,
    NotApplicable(Decline),
}

impl CopyOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// A mapped subresource, unmapped on drop.
struct Mapping<'a, C: GpuContext> {
    context: &'a C,
    resource: C::Resource,
    subresource: u32,
    mapped: MappedSubresource,
}

impl<'a, C: GpuContext> Mapping<'a, C> {
    fn new(
        context: &'a C,
        resource: C::Resource,
        subresource: u32,
        map_type: MapType,
        map_flags: u32,
    ) -> Result<Self, DriverError> {
        let mapped = context.map(&resource, subresource, map_type, map_flags)?;
        Ok(Self { context, resource, subresource, mapped })
    }
}

impl<C: GpuContext> Drop for Mapping<'_, C> {
    fn drop(&mut self) {
        self.context.unmap(&self.resource, self.subresource);
    }
}

/// Try to perform a copy on the CPU.
///
/// On `NotApplicable` nothing was written and the caller must issue the GPU
/// copy itself. `context` must be the unhooked context; hooked callers go
/// through [`HookedContext::try_fast_copy`](crate::HookedContext::try_fast_copy).
pub(crate) fn try_fast_copy<C: GpuContext>(
    shim: &Shim,
    context: &C,
    dst: &C::Resource,
    src: &C::Resource,
    params: &CopyParams,
) -> CopyOutcome {
    let outcome = fast_copy(shim, context, dst, src, params);

    let stats = shim.copy_stats();
    match outcome {
        CopyOutcome::Applied => stats.inc_fast_copies_applied(),
        CopyOutcome::NotApplicable(Decline::DestinationBusy) => stats.inc_fast_copies_busy(),
        CopyOutcome::NotApplicable(_) => stats.inc_fast_copies_declined(),
    }
    trace!(
        "Fast copy {:#x} -> {:#x} {:?}: {:?}",
        src.identity(),
        dst.identity(),
        params,
        outcome
    );
    outcome
}

fn fast_copy<C: GpuContext>(
    shim: &Shim,
    context: &C,
    dst: &C::Resource,
    src: &C::Resource,
    params: &CopyParams,
) -> CopyOutcome {
    let Ok(dst_info) = ResourceDescriptor::of(dst) else {
        return CopyOutcome::NotApplicable(Decline::Undescribable);
    };

    if !dst_info.is_cpu_writable() {
        return CopyOutcome::NotApplicable(Decline::DestinationNotCpuWritable);
    }

    let Ok(src_info) = ResourceDescriptor::of(src) else {
        return CopyOutcome::NotApplicable(Decline::Undescribable);
    };

    let src_extent = full_extent_box(&src_info, params.src_subresource);
    let src_box = match &params.src_box {
        Some(b) => b.intersect(&src_extent),
        None => src_extent,
    };
    let dst_box = full_extent_box(&dst_info, params.dst_subresource);
    let region = clip(&src_box, &dst_box, params.dst_origin);

    if region.is_empty() {
        return CopyOutcome::Applied;
    }

    // Resources that stall are typically created right before the copy, so
    // a non-blocking map is expected to succeed.
    let dst_map = match map_destination(context, dst, &dst_info, params.dst_subresource, &region) {
        Ok(mapping) => mapping,
        Err(DriverError::WasStillDrawing) => {
            return CopyOutcome::NotApplicable(Decline::DestinationBusy);
        }
        Err(e) => {
            error!("Failed to map destination resource: {}", e);
            log_resource(&dst_info);
            return CopyOutcome::NotApplicable(Decline::DestinationMapFailed);
        }
    };

    let src_map = if src_info.is_cpu_readable() {
        match Mapping::new(context, src.clone(), params.src_subresource, MapType::Read, 0) {
            Ok(mapping) => mapping,
            Err(e) => {
                error!("Failed to map source resource: {}", e);
                log_resource(&src_info);
                return CopyOutcome::NotApplicable(Decline::SourceMapFailed);
            }
        }
    } else {
        let shadow = if shim.config().shadow_resources {
            shim.registry().get_or_create(context, src)
        } else {
            None
        };
        let Some(shadow) = shadow else {
            return CopyOutcome::NotApplicable(Decline::NoShadow);
        };
        match Mapping::new(context, shadow, params.src_subresource, MapType::Read, 0) {
            Ok(mapping) => mapping,
            Err(e) => {
                error!("Failed to map shadow resource: {}", e);
                return CopyOutcome::NotApplicable(Decline::SourceMapFailed);
            }
        }
    };

    // SAFETY: both mappings are live until the guards drop at the end of
    // this function, and the clipped region lies within both subresources.
    unsafe {
        if dst_info.is_buffer() {
            copy_buffer(&dst_map.mapped, &src_map.mapped, &region);
        } else {
            copy_texture(&dst_map.mapped, &src_map.mapped, &region, format_size(dst_info.format));
        }
    }

    CopyOutcome::Applied
}

fn map_destination<'a, C: GpuContext>(
    context: &'a C,
    dst: &C::Resource,
    info: &ResourceDescriptor,
    subresource: u32,
    region: &ClippedRegion,
) -> Result<Mapping<'a, C>, DriverError> {
    if info.usage == Usage::Dynamic {
        // Dynamic textures and partial buffer writes are not worth handling.
        if info.is_buffer() && region.width() == info.width {
            Mapping::new(context, dst.clone(), subresource, MapType::WriteDiscard, 0)
        } else {
            Err(DriverError::WasStillDrawing)
        }
    } else {
        Mapping::new(context, dst.clone(), subresource, MapType::Write, D3D11_MAP_FLAG_DO_NOT_WAIT)
    }
}

fn log_resource(info: &ResourceDescriptor) {
    error!(
        "Resource dim {:?}, size {}x{}, usage {:?}",
        info.dimension, info.width, info.height, info.usage
    );
}

unsafe fn copy_buffer(dst: &MappedSubresource, src: &MappedSubresource, region: &ClippedRegion) {
    ptr::copy(
        src.data.add(region.src.left as usize),
        dst.data.add(region.dst.left as usize),
        region.width() as usize,
    );
}

unsafe fn copy_texture(
    dst: &MappedSubresource,
    src: &MappedSubresource,
    region: &ClippedRegion,
    pixel_size: u32,
) {
    let pixel_size = pixel_size as usize;
    let row_bytes = region.width() as usize * pixel_size;

    for z in 0..region.depth() as usize {
        for y in 0..region.height() as usize {
            let dst_offset = region.dst.left as usize * pixel_size
                + (region.dst.top as usize + y) * dst.row_pitch as usize
                + (region.dst.front as usize + z) * dst.depth_pitch as usize;
            let src_offset = region.src.left as usize * pixel_size
                + (region.src.top as usize + y) * src.row_pitch as usize
                + (region.src.front as usize + z) * src.depth_pitch as usize;

            ptr::copy(src.data.add(src_offset), dst.data.add(dst_offset), row_bytes);
        }
    }
}
