//! Driver Seam
//!
//! Traits through which the shim consumes the underlying D3D11 driver.
//! Handles are reference counted: `Clone` takes a reference, `Drop`
//! releases it.

use thiserror::Error;

use crate::d3d::{ContextType, MapType, RawResourceDesc, ViewDesc};
use crate::region::CopyBox;

/// Failure reported by a driver call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The resource is still in use by the GPU and `DO_NOT_WAIT` was requested.
    #[error("resource is still in use by the GPU")]
    WasStillDrawing,
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("out of memory")]
    OutOfMemory,
    #[error("unsupported resource dimension {0}")]
    UnsupportedDimension(u32),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    #[error("driver call failed, hr 0x{0:08X}")]
    Hresult(i32),
}

/// CPU view of a mapped subresource.
///
/// `data` stays valid until the matching `unmap` call.
#[derive(Debug, Clone, Copy)]
pub struct MappedSubresource {
    pub data: *mut u8,
    pub row_pitch: u32,
    pub depth_pitch: u32,
}

pub trait GpuResource: Clone {
    /// Stable identity for the lifetime of the resource.
    fn identity(&self) -> usize;

    fn description(&self) -> RawResourceDesc;

    /// Shadow resource attached to this resource, with its own reference.
    fn shadow(&self) -> Option<Self>;

    /// Attach `shadow` for the remaining lifetime of this resource.
    fn attach_shadow(&self, shadow: &Self) -> Result<(), DriverError>;
}

pub trait GpuView: Clone {
    type Resource: GpuResource;

    fn resource(&self) -> Result<Self::Resource, DriverError>;

    fn description(&self) -> ViewDesc;
}

pub trait GpuDevice: Clone {
    type Resource: GpuResource;
    type Context: GpuContext<Resource = Self::Resource>;

    fn identity(&self) -> usize;

    fn create_resource(
        &self,
        desc: &RawResourceDesc,
        initial_data: Option<&[u8]>,
    ) -> Result<Self::Resource, DriverError>;

    fn immediate_context(&self) -> Result<Self::Context, DriverError>;

    fn create_deferred_context(&self) -> Result<Self::Context, DriverError>;
}

/// The device context operations the shim intercepts or relies on.
pub trait GpuContext {
    type Resource: GpuResource;
    type View: GpuView<Resource = Self::Resource>;
    type Device: GpuDevice<Resource = Self::Resource>;

    fn identity(&self) -> usize;

    fn context_type(&self) -> ContextType;

    fn device(&self) -> Result<Self::Device, DriverError>;

    fn map(
        &self,
        resource: &Self::Resource,
        subresource: u32,
        map_type: MapType,
        map_flags: u32,
    ) -> Result<MappedSubresource, DriverError>;

    fn unmap(&self, resource: &Self::Resource, subresource: u32);

    fn copy_resource(&self, dst: &Self::Resource, src: &Self::Resource);

    #[allow(clippy::too_many_arguments)]
    fn copy_subresource_region(
        &self,
        dst: &Self::Resource,
        dst_subresource: u32,
        dst_x: u32,
        dst_y: u32,
        dst_z: u32,
        src: &Self::Resource,
        src_subresource: u32,
        src_box: Option<&CopyBox>,
    );

    fn update_subresource(
        &self,
        resource: &Self::Resource,
        subresource: u32,
        dst_box: Option<&CopyBox>,
        data: &[u8],
        row_pitch: u32,
        depth_pitch: u32,
    );

    fn clear_render_target_view(&self, rtv: &Self::View, color: [f32; 4]);

    fn clear_unordered_access_view_float(&self, uav: &Self::View, values: [f32; 4]);

    fn clear_unordered_access_view_uint(&self, uav: &Self::View, values: [u32; 4]);

    /// Currently bound render targets, unbound slots omitted.
    fn om_get_render_targets(&self) -> Vec<Self::View>;

    /// Currently bound compute UAVs, unbound slots omitted.
    fn cs_get_unordered_access_views(&self) -> Vec<Self::View>;

    fn om_set_render_targets(&self, rtvs: &[Option<Self::View>], dsv: Option<&Self::View>);

    fn om_set_render_targets_and_unordered_access_views(
        &self,
        rtvs: &[Option<Self::View>],
        dsv: Option<&Self::View>,
        uav_start_slot: u32,
        uavs: &[Option<Self::View>],
        uav_initial_counts: Option<&[u32]>,
    );

    fn cs_set_unordered_access_views(
        &self,
        start_slot: u32,
        uavs: &[Option<Self::View>],
        uav_initial_counts: Option<&[u32]>,
    );

    fn dispatch(&self, x: u32, y: u32, z: u32);

    fn dispatch_indirect(&self, args: &Self::Resource, aligned_byte_offset: u32);
}
