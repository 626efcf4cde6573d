//! D3D11 Driver Module
//!
//! Implements the driver traits on the real Direct3D 11 interfaces. Shadow
//! resources are attached to their base resource as private data, so the
//! driver releases them together with the base.

use std::ffi::c_void;
use std::mem;

use tracing::warn;
use windows::core::{Interface, GUID, IUnknown};
use windows::Win32::Foundation::{E_INVALIDARG, E_OUTOFMEMORY};
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::{DXGI_FORMAT, DXGI_SAMPLE_DESC};

use crate::d3d::{
    self, BufferDesc, ContextType, DxgiFormat, MapType, RawResourceDesc, RtvDimension, Texture1DDesc,
    Texture2DDesc, Texture3DDesc, UavDimension, Usage, ViewDesc,
};
use crate::descriptor::ResourceDescriptor;
use crate::driver::{DriverError, GpuContext, GpuDevice, GpuResource, GpuView, MappedSubresource};
use crate::format::format_size;
use crate::region::CopyBox;

/// Private data key under which a resource stores its shadow.
const SHADOW_RESOURCE_GUID: GUID = GUID::from_u128(0x5b1f_0c3e_8d2a_4f6b_9e71_c4a0_2d58_e913);

const MAX_RENDER_TARGETS: usize = D3D11_SIMULTANEOUS_RENDER_TARGET_COUNT as usize;
const MAX_COMPUTE_UAVS: usize = D3D11_PS_CS_UAV_REGISTER_COUNT as usize;

fn driver_error(error: windows::core::Error) -> DriverError {
    let hr = error.code();
    if hr.0 == d3d::DXGI_ERROR_WAS_STILL_DRAWING {
        DriverError::WasStillDrawing
    } else if hr == E_OUTOFMEMORY {
        DriverError::OutOfMemory
    } else if hr == E_INVALIDARG {
        DriverError::InvalidArgument("rejected by the driver")
    } else {
        DriverError::Hresult(hr.0)
    }
}

// =============================================================================
// Description Conversion
// =============================================================================

fn usage_from(usage: D3D11_USAGE) -> Usage {
    Usage::from_raw(usage.0 as u32).unwrap_or_default()
}

fn usage_to(usage: Usage) -> D3D11_USAGE {
    D3D11_USAGE(usage as i32)
}

fn format_to(format: DxgiFormat) -> DXGI_FORMAT {
    DXGI_FORMAT(format as i32)
}

fn buffer_desc(d: &D3D11_BUFFER_DESC) -> BufferDesc {
    BufferDesc {
        byte_width: d.ByteWidth,
        usage: usage_from(d.Usage),
        bind_flags: d.BindFlags,
        cpu_access_flags: d.CPUAccessFlags,
        misc_flags: d.MiscFlags,
        structure_byte_stride: d.StructureByteStride,
    }
}

fn texture1d_desc(d: &D3D11_TEXTURE1D_DESC) -> Texture1DDesc {
    Texture1DDesc {
        width: d.Width,
        mip_levels: d.MipLevels,
        array_size: d.ArraySize,
        format: d.Format.0 as u32,
        usage: usage_from(d.Usage),
        bind_flags: d.BindFlags,
        cpu_access_flags: d.CPUAccessFlags,
        misc_flags: d.MiscFlags,
    }
}

fn texture2d_desc(d: &D3D11_TEXTURE2D_DESC) -> Texture2DDesc {
    Texture2DDesc {
        width: d.Width,
        height: d.Height,
        mip_levels: d.MipLevels,
        array_size: d.ArraySize,
        format: d.Format.0 as u32,
        sample_count: d.SampleDesc.Count,
        sample_quality: d.SampleDesc.Quality,
        usage: usage_from(d.Usage),
        bind_flags: d.BindFlags,
        cpu_access_flags: d.CPUAccessFlags,
        misc_flags: d.MiscFlags,
    }
}

fn texture3d_desc(d: &D3D11_TEXTURE3D_DESC) -> Texture3DDesc {
    Texture3DDesc {
        width: d.Width,
        height: d.Height,
        depth: d.Depth,
        mip_levels: d.MipLevels,
        format: d.Format.0 as u32,
        usage: usage_from(d.Usage),
        bind_flags: d.BindFlags,
        cpu_access_flags: d.CPUAccessFlags,
        misc_flags: d.MiscFlags,
    }
}

fn rtv_dimension(d: &D3D11_RENDER_TARGET_VIEW_DESC) -> Option<RtvDimension> {
    // SAFETY: the union member read matches `ViewDimension`.
    unsafe {
        let u = &d.Anonymous;
        Some(match d.ViewDimension {
            D3D11_RTV_DIMENSION_BUFFER => RtvDimension::Buffer,
            D3D11_RTV_DIMENSION_TEXTURE1D => RtvDimension::Texture1D { mip_slice: u.Texture1D.MipSlice },
            D3D11_RTV_DIMENSION_TEXTURE1DARRAY => RtvDimension::Texture1DArray {
                mip_slice: u.Texture1DArray.MipSlice,
                first_array_slice: u.Texture1DArray.FirstArraySlice,
                array_size: u.Texture1DArray.ArraySize,
            },
            D3D11_RTV_DIMENSION_TEXTURE2D => RtvDimension::Texture2D { mip_slice: u.Texture2D.MipSlice },
            D3D11_RTV_DIMENSION_TEXTURE2DARRAY => RtvDimension::Texture2DArray {
                mip_slice: u.Texture2DArray.MipSlice,
                first_array_slice: u.Texture2DArray.FirstArraySlice,
                array_size: u.Texture2DArray.ArraySize,
            },
            D3D11_RTV_DIMENSION_TEXTURE2DMS => RtvDimension::Texture2DMs,
            D3D11_RTV_DIMENSION_TEXTURE2DMSARRAY => RtvDimension::Texture2DMsArray {
                first_array_slice: u.Texture2DMSArray.FirstArraySlice,
                array_size: u.Texture2DMSArray.ArraySize,
            },
            D3D11_RTV_DIMENSION_TEXTURE3D => RtvDimension::Texture3D {
                mip_slice: u.Texture3D.MipSlice,
                first_w_slice: u.Texture3D.FirstWSlice,
                w_size: u.Texture3D.WSize,
            },
            other => {
                warn!("Unhandled RTV dimension {}", other.0);
                return None;
            }
        })
    }
}

fn uav_dimension(d: &D3D11_UNORDERED_ACCESS_VIEW_DESC) -> Option<UavDimension> {
    // SAFETY: the union member read matches `ViewDimension`.
    unsafe {
        let u = &d.Anonymous;
        Some(match d.ViewDimension {
            D3D11_UAV_DIMENSION_BUFFER => UavDimension::Buffer {
                first_element: u.Buffer.FirstElement,
                num_elements: u.Buffer.NumElements,
            },
            D3D11_UAV_DIMENSION_TEXTURE1D => UavDimension::Texture1D { mip_slice: u.Texture1D.MipSlice },
            D3D11_UAV_DIMENSION_TEXTURE1DARRAY => UavDimension::Texture1DArray {
                mip_slice: u.Texture1DArray.MipSlice,
                first_array_slice: u.Texture1DArray.FirstArraySlice,
                array_size: u.Texture1DArray.ArraySize,
            },
            D3D11_UAV_DIMENSION_TEXTURE2D => UavDimension::Texture2D { mip_slice: u.Texture2D.MipSlice },
            D3D11_UAV_DIMENSION_TEXTURE2DARRAY => UavDimension::Texture2DArray {
                mip_slice: u.Texture2DArray.MipSlice,
                first_array_slice: u.Texture2DArray.FirstArraySlice,
                array_size: u.Texture2DArray.ArraySize,
            },
            D3D11_UAV_DIMENSION_TEXTURE3D => UavDimension::Texture3D {
                mip_slice: u.Texture3D.MipSlice,
                first_w_slice: u.Texture3D.FirstWSlice,
                w_size: u.Texture3D.WSize,
            },
            other => {
                warn!("Unhandled UAV dimension {}", other.0);
                return None;
            }
        })
    }
}

fn d3d_box(b: &CopyBox) -> D3D11_BOX {
    D3D11_BOX {
        left: b.left,
        top: b.top,
        front: b.front,
        right: b.right,
        bottom: b.bottom,
        back: b.back,
    }
}

/// Split tightly packed bytes into per-subresource initial data.
fn subresource_data(desc: &RawResourceDesc, data: &[u8]) -> Result<Vec<D3D11_SUBRESOURCE_DATA>, DriverError> {
    let info = ResourceDescriptor::from_raw(desc)?;
    let pixel_size = if info.is_buffer() { 1 } else { format_size(info.format) as usize };

    let mut out = Vec::with_capacity((info.layers * info.mips) as usize);
    let mut offset = 0usize;
    for _layer in 0..info.layers {
        for mip in 0..info.mips.max(1) {
            let extent = |dim: u32| dim.checked_shr(mip).unwrap_or(0).max(1) as usize;
            let row_pitch = extent(info.width) * pixel_size;
            let depth_pitch = row_pitch * extent(info.height);
            let size = depth_pitch * extent(info.depth);

            let slice = data
                .get(offset..offset + size)
                .ok_or(DriverError::InvalidArgument("initial data too short"))?;
            out.push(D3D11_SUBRESOURCE_DATA {
                pSysMem: slice.as_ptr() as *const c_void,
                SysMemPitch: row_pitch as u32,
                SysMemSlicePitch: depth_pitch as u32,
            });
            offset += size;
        }
    }
    Ok(out)
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl GpuResource for ID3D11Resource {
    fn identity(&self) -> usize {
        self.as_raw() as usize
    }

    fn description(&self) -> RawResourceDesc {
        // SAFETY: GetType and GetDesc only write the out-parameters, and the
        // cast matches the reported dimension.
        unsafe {
            let mut dimension = D3D11_RESOURCE_DIMENSION_UNKNOWN;
            self.GetType(&mut dimension);

            let desc = match dimension {
                D3D11_RESOURCE_DIMENSION_BUFFER => self.cast::<ID3D11Buffer>().map(|buffer| {
                    let mut desc = D3D11_BUFFER_DESC::default();
                    buffer.GetDesc(&mut desc);
                    RawResourceDesc::Buffer(buffer_desc(&desc))
                }),
                D3D11_RESOURCE_DIMENSION_TEXTURE1D => self.cast::<ID3D11Texture1D>().map(|texture| {
                    let mut desc = D3D11_TEXTURE1D_DESC::default();
                    texture.GetDesc(&mut desc);
                    RawResourceDesc::Texture1D(texture1d_desc(&desc))
                }),
                D3D11_RESOURCE_DIMENSION_TEXTURE2D => self.cast::<ID3D11Texture2D>().map(|texture| {
                    let mut desc = D3D11_TEXTURE2D_DESC::default();
                    texture.GetDesc(&mut desc);
                    RawResourceDesc::Texture2D(texture2d_desc(&desc))
                }),
                D3D11_RESOURCE_DIMENSION_TEXTURE3D => self.cast::<ID3D11Texture3D>().map(|texture| {
                    let mut desc = D3D11_TEXTURE3D_DESC::default();
                    texture.GetDesc(&mut desc);
                    RawResourceDesc::Texture3D(texture3d_desc(&desc))
                }),
                other => return RawResourceDesc::Unknown(other.0 as u32),
            };

            desc.unwrap_or_else(|e| {
                warn!("Resource of dimension {} rejected its interface: {}", dimension.0, e);
                RawResourceDesc::Unknown(dimension.0 as u32)
            })
        }
    }

    fn shadow(&self) -> Option<Self> {
        let mut raw: *mut c_void = std::ptr::null_mut();
        let mut size = mem::size_of::<*mut c_void>() as u32;

        // SAFETY: the slot was stored by SetPrivateDataInterface and holds an
        // interface pointer; GetPrivateData adds a reference we take over.
        unsafe {
            self.GetPrivateData(
                &SHADOW_RESOURCE_GUID,
                &mut size,
                Some(&mut raw as *mut *mut c_void as *mut c_void),
            )
            .ok()?;
            if raw.is_null() {
                return None;
            }
            IUnknown::from_raw(raw).cast::<ID3D11Resource>().ok()
        }
    }

    fn attach_shadow(&self, shadow: &Self) -> Result<(), DriverError> {
        // SAFETY: the driver takes its own reference on `shadow`.
        unsafe { self.SetPrivateDataInterface(&SHADOW_RESOURCE_GUID, shadow) }.map_err(driver_error)
    }
}

impl GpuView for ID3D11View {
    type Resource = ID3D11Resource;

    fn resource(&self) -> Result<ID3D11Resource, DriverError> {
        // SAFETY: plain getter on a live view.
        unsafe { self.GetResource() }.map_err(driver_error)
    }

    fn description(&self) -> ViewDesc {
        if let Ok(rtv) = self.cast::<ID3D11RenderTargetView>() {
            let mut desc = D3D11_RENDER_TARGET_VIEW_DESC::default();
            // SAFETY: GetDesc only writes the description struct.
            unsafe { rtv.GetDesc(&mut desc) };
            return match rtv_dimension(&desc) {
                Some(dimension) => ViewDesc::RenderTarget { format: desc.Format.0 as u32, dimension },
                None => ViewDesc::Other,
            };
        }
        if let Ok(uav) = self.cast::<ID3D11UnorderedAccessView>() {
            let mut desc = D3D11_UNORDERED_ACCESS_VIEW_DESC::default();
            // SAFETY: GetDesc only writes the description struct.
            unsafe { uav.GetDesc(&mut desc) };
            return match uav_dimension(&desc) {
                Some(dimension) => ViewDesc::UnorderedAccess { format: desc.Format.0 as u32, dimension },
                None => ViewDesc::Other,
            };
        }
        ViewDesc::Other
    }
}

impl GpuDevice for ID3D11Device {
    type Resource = ID3D11Resource;
    type Context = ID3D11DeviceContext;

    fn identity(&self) -> usize {
        self.as_raw() as usize
    }

    fn create_resource(
        &self,
        desc: &RawResourceDesc,
        initial_data: Option<&[u8]>,
    ) -> Result<ID3D11Resource, DriverError> {
        let data = initial_data.map(|d| subresource_data(desc, d)).transpose()?;
        let data_ptr = data.as_ref().map(|d| d.as_ptr());

        // SAFETY: descriptions and initial data outlive the create calls.
        let resource = unsafe {
            match *desc {
                RawResourceDesc::Buffer(d) => {
                    let desc = D3D11_BUFFER_DESC {
                        ByteWidth: d.byte_width,
                        Usage: usage_to(d.usage),
                        BindFlags: d.bind_flags,
                        CPUAccessFlags: d.cpu_access_flags,
                        MiscFlags: d.misc_flags,
                        StructureByteStride: d.structure_byte_stride,
                    };
                    let mut buffer = None;
                    self.CreateBuffer(&desc, data_ptr, Some(&mut buffer)).map_err(driver_error)?;
                    buffer.map(|b| b.cast::<ID3D11Resource>())
                }
                RawResourceDesc::Texture1D(d) => {
                    let desc = D3D11_TEXTURE1D_DESC {
                        Width: d.width,
                        MipLevels: d.mip_levels,
                        ArraySize: d.array_size,
                        Format: format_to(d.format),
                        Usage: usage_to(d.usage),
                        BindFlags: d.bind_flags,
                        CPUAccessFlags: d.cpu_access_flags,
                        MiscFlags: d.misc_flags,
                    };
                    let mut texture = None;
                    self.CreateTexture1D(&desc, data_ptr, Some(&mut texture)).map_err(driver_error)?;
                    texture.map(|t| t.cast::<ID3D11Resource>())
                }
                RawResourceDesc::Texture2D(d) => {
                    let desc = D3D11_TEXTURE2D_DESC {
                        Width: d.width,
                        Height: d.height,
                        MipLevels: d.mip_levels,
                        ArraySize: d.array_size,
                        Format: format_to(d.format),
                        SampleDesc: DXGI_SAMPLE_DESC { Count: d.sample_count, Quality: d.sample_quality },
                        Usage: usage_to(d.usage),
                        BindFlags: d.bind_flags,
                        CPUAccessFlags: d.cpu_access_flags,
                        MiscFlags: d.misc_flags,
                    };
                    let mut texture = None;
                    self.CreateTexture2D(&desc, data_ptr, Some(&mut texture)).map_err(driver_error)?;
                    texture.map(|t| t.cast::<ID3D11Resource>())
                }
                RawResourceDesc::Texture3D(d) => {
                    let desc = D3D11_TEXTURE3D_DESC {
                        Width: d.width,
                        Height: d.height,
                        Depth: d.depth,
                        MipLevels: d.mip_levels,
                        Format: format_to(d.format),
                        Usage: usage_to(d.usage),
                        BindFlags: d.bind_flags,
                        CPUAccessFlags: d.cpu_access_flags,
                        MiscFlags: d.misc_flags,
                    };
                    let mut texture = None;
                    self.CreateTexture3D(&desc, data_ptr, Some(&mut texture)).map_err(driver_error)?;
                    texture.map(|t| t.cast::<ID3D11Resource>())
                }
                RawResourceDesc::Unknown(dim) => return Err(DriverError::UnsupportedDimension(dim)),
            }
        };

        match resource {
            Some(Ok(resource)) => Ok(resource),
            Some(Err(e)) => Err(driver_error(e)),
            None => Err(DriverError::Unsupported("driver returned no resource")),
        }
    }

    fn immediate_context(&self) -> Result<ID3D11DeviceContext, DriverError> {
        // SAFETY: plain getter on a live device.
        unsafe { self.GetImmediateContext() }.map_err(driver_error)
    }

    fn create_deferred_context(&self) -> Result<ID3D11DeviceContext, DriverError> {
        let mut context = None;
        // SAFETY: plain creation call on a live device.
        unsafe { self.CreateDeferredContext(0, Some(&mut context)) }.map_err(driver_error)?;
        context.ok_or(DriverError::Unsupported("driver returned no deferred context"))
    }
}

fn render_target_views(views: &[Option<ID3D11View>]) -> Vec<Option<ID3D11RenderTargetView>> {
    views.iter().map(|v| v.as_ref().and_then(|v| v.cast().ok())).collect()
}

fn unordered_access_views(views: &[Option<ID3D11View>]) -> Vec<Option<ID3D11UnorderedAccessView>> {
    views.iter().map(|v| v.as_ref().and_then(|v| v.cast().ok())).collect()
}

impl GpuContext for ID3D11DeviceContext {
    type Resource = ID3D11Resource;
    type View = ID3D11View;
    type Device = ID3D11Device;

    fn identity(&self) -> usize {
        self.as_raw() as usize
    }

    fn context_type(&self) -> ContextType {
        // SAFETY: plain getter on a live context.
        if unsafe { self.GetType() } == D3D11_DEVICE_CONTEXT_DEFERRED {
            ContextType::Deferred
        } else {
            ContextType::Immediate
        }
    }

    fn device(&self) -> Result<ID3D11Device, DriverError> {
        // SAFETY: plain getter on a live context.
        unsafe { self.GetDevice() }.map_err(driver_error)
    }

    fn map(
        &self,
        resource: &ID3D11Resource,
        subresource: u32,
        map_type: MapType,
        map_flags: u32,
    ) -> Result<MappedSubresource, DriverError> {
        let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
        // SAFETY: `mapped` is written by the driver and stays valid until Unmap.
        unsafe {
            self.Map(resource, subresource, D3D11_MAP(map_type as i32), map_flags, Some(&mut mapped))
        }
        .map_err(driver_error)?;

        Ok(MappedSubresource {
            data: mapped.pData as *mut u8,
            row_pitch: mapped.RowPitch,
            depth_pitch: mapped.DepthPitch,
        })
    }

    fn unmap(&self, resource: &ID3D11Resource, subresource: u32) {
        // SAFETY: paired with a successful `map`.
        unsafe { self.Unmap(resource, subresource) }
    }

    fn copy_resource(&self, dst: &ID3D11Resource, src: &ID3D11Resource) {
        // SAFETY: both resources are live.
        unsafe { self.CopyResource(dst, src) }
    }

    fn copy_subresource_region(
        &self,
        dst: &ID3D11Resource,
        dst_subresource: u32,
        dst_x: u32,
        dst_y: u32,
        dst_z: u32,
        src: &ID3D11Resource,
        src_subresource: u32,
        src_box: Option<&CopyBox>,
    ) {
        let src_box = src_box.map(d3d_box);
        // SAFETY: both resources are live; the box outlives the call.
        unsafe {
            self.CopySubresourceRegion(
                dst,
                dst_subresource,
                dst_x,
                dst_y,
                dst_z,
                src,
                src_subresource,
                src_box.as_ref().map(|b| b as *const D3D11_BOX),
            )
        }
    }

    fn update_subresource(
        &self,
        resource: &ID3D11Resource,
        subresource: u32,
        dst_box: Option<&CopyBox>,
        data: &[u8],
        row_pitch: u32,
        depth_pitch: u32,
    ) {
        let dst_box = dst_box.map(d3d_box);
        // SAFETY: `data` covers the box with the given pitches.
        unsafe {
            self.UpdateSubresource(
                resource,
                subresource,
                dst_box.as_ref().map(|b| b as *const D3D11_BOX),
                data.as_ptr() as *const c_void,
                row_pitch,
                depth_pitch,
            )
        }
    }

    fn clear_render_target_view(&self, rtv: &ID3D11View, color: [f32; 4]) {
        let Ok(rtv) = rtv.cast::<ID3D11RenderTargetView>() else {
            warn!("ClearRenderTargetView on a view that is not a render target");
            return;
        };
        // SAFETY: live view.
        unsafe { self.ClearRenderTargetView(&rtv, &color) }
    }

    fn clear_unordered_access_view_float(&self, uav: &ID3D11View, values: [f32; 4]) {
        let Ok(uav) = uav.cast::<ID3D11UnorderedAccessView>() else {
            warn!("ClearUnorderedAccessViewFloat on a view that is not a UAV");
            return;
        };
        // SAFETY: live view.
        unsafe { self.ClearUnorderedAccessViewFloat(&uav, &values) }
    }

    fn clear_unordered_access_view_uint(&self, uav: &ID3D11View, values: [u32; 4]) {
        let Ok(uav) = uav.cast::<ID3D11UnorderedAccessView>() else {
            warn!("ClearUnorderedAccessViewUint on a view that is not a UAV");
            return;
        };
        // SAFETY: live view.
        unsafe { self.ClearUnorderedAccessViewUint(&uav, &values) }
    }

    fn om_get_render_targets(&self) -> Vec<ID3D11View> {
        let mut rtvs: [Option<ID3D11RenderTargetView>; MAX_RENDER_TARGETS] = Default::default();
        // SAFETY: the array holds every render target slot.
        unsafe { self.OMGetRenderTargets(Some(&mut rtvs), None) };
        rtvs.into_iter().flatten().filter_map(|v| v.cast().ok()).collect()
    }

    fn cs_get_unordered_access_views(&self) -> Vec<ID3D11View> {
        let mut uavs: [Option<ID3D11UnorderedAccessView>; MAX_COMPUTE_UAVS] = Default::default();
        // SAFETY: the array holds every compute UAV slot.
        unsafe { self.CSGetUnorderedAccessViews(0, Some(&mut uavs)) };
        uavs.into_iter().flatten().filter_map(|v| v.cast().ok()).collect()
    }

    fn om_set_render_targets(&self, rtvs: &[Option<ID3D11View>], dsv: Option<&ID3D11View>) {
        let rtvs = render_target_views(rtvs);
        let dsv: Option<ID3D11DepthStencilView> = dsv.and_then(|v| v.cast().ok());
        // SAFETY: views are live for the duration of the call.
        unsafe { self.OMSetRenderTargets(Some(&rtvs), dsv.as_ref()) }
    }

    fn om_set_render_targets_and_unordered_access_views(
        &self,
        rtvs: &[Option<ID3D11View>],
        dsv: Option<&ID3D11View>,
        uav_start_slot: u32,
        uavs: &[Option<ID3D11View>],
        uav_initial_counts: Option<&[u32]>,
    ) {
        let rtvs = render_target_views(rtvs);
        let dsv: Option<ID3D11DepthStencilView> = dsv.and_then(|v| v.cast().ok());
        let uavs = unordered_access_views(uavs);
        // SAFETY: views and counts are live for the duration of the call.
        unsafe {
            self.OMSetRenderTargetsAndUnorderedAccessViews(
                Some(&rtvs),
                dsv.as_ref(),
                uav_start_slot,
                uavs.len() as u32,
                Some(uavs.as_ptr()),
                uav_initial_counts.map(|c| c.as_ptr()),
            )
        }
    }

    fn cs_set_unordered_access_views(
        &self,
        start_slot: u32,
        uavs: &[Option<ID3D11View>],
        uav_initial_counts: Option<&[u32]>,
    ) {
        let uavs = unordered_access_views(uavs);
        // SAFETY: views and counts are live for the duration of the call.
        unsafe {
            self.CSSetUnorderedAccessViews(
                start_slot,
                uavs.len() as u32,
                Some(uavs.as_ptr()),
                uav_initial_counts.map(|c| c.as_ptr()),
            )
        }
    }

    fn dispatch(&self, x: u32, y: u32, z: u32) {
        // SAFETY: plain command on a live context.
        unsafe { self.Dispatch(x, y, z) }
    }

    fn dispatch_indirect(&self, args: &ID3D11Resource, aligned_byte_offset: u32) {
        let Ok(buffer) = args.cast::<ID3D11Buffer>() else {
            warn!("DispatchIndirect with an argument resource that is not a buffer");
            return;
        };
        // SAFETY: live buffer.
        unsafe { self.DispatchIndirect(&buffer, aligned_byte_offset) }
    }
}
