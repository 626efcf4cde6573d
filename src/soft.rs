//! Software driver
//!
//! In-memory implementation of the driver traits. Resources live in host
//! memory with padded row pitches (staging rows are 256-byte aligned, other
//! rows 16-byte aligned), GPU copies execute on the spot and mark their
//! destination busy until something maps it blocking, and every call is
//! counted. It backs the test suite and the self-test binary.
//!
//! Commands on deferred contexts also execute immediately; only the map
//! restrictions of deferred contexts are modeled.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::d3d::*;
use crate::descriptor::ResourceDescriptor;
use crate::driver::{DriverError, GpuContext, GpuDevice, GpuResource, GpuView, MappedSubresource};
use crate::format::format_size;
use crate::region::{clip, CopyBox, Origin};
use crate::view::subresource_range;

const STAGING_ROW_ALIGNMENT: usize = 256;
const DEFAULT_ROW_ALIGNMENT: usize = 16;
const MAX_BOUND_VIEWS: usize = 8;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

const fn align_up(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

// =============================================================================
// Counters
// =============================================================================

/// Snapshot of the calls a [`SoftDevice`] has executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SoftCounters {
    pub resources_created: u64,
    pub gpu_copies: u64,
    pub maps: u64,
    pub updates: u64,
    pub clears: u64,
    pub dispatches: u64,
}

#[derive(Debug, Default)]
struct Counters {
    resources_created: AtomicU64,
    gpu_copies: AtomicU64,
    maps: AtomicU64,
    updates: AtomicU64,
    clears: AtomicU64,
    dispatches: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> SoftCounters {
        SoftCounters {
            resources_created: self.resources_created.load(Ordering::Relaxed),
            gpu_copies: self.gpu_copies.load(Ordering::Relaxed),
            maps: self.maps.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
            dispatches: self.dispatches.load(Ordering::Relaxed),
        }
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

// =============================================================================
// Resources
// =============================================================================

/// Memory layout of one subresource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubresourceLayout {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub pixel_size: u32,
    pub row_pitch: u32,
    pub depth_pitch: u32,
}

impl SubresourceLayout {
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.pixel_size as usize
    }

    pub fn size(&self) -> usize {
        self.depth_pitch as usize * self.depth as usize
    }

    fn offset(&self, x: u32, y: u32, z: u32) -> usize {
        x as usize * self.pixel_size as usize
            + y as usize * self.row_pitch as usize
            + z as usize * self.depth_pitch as usize
    }

    fn full_box(&self) -> CopyBox {
        CopyBox::new(0, 0, 0, self.width, self.height, self.depth)
    }
}

struct ResourceState {
    desc: RawResourceDesc,
    info: ResourceDescriptor,
    layouts: Vec<SubresourceLayout>,
    memory: Vec<Mutex<Vec<u8>>>,
    shadow: Mutex<Option<SoftResource>>,
    mapped: Mutex<HashSet<u32>>,
    gpu_busy: AtomicBool,
}

/// A buffer or texture in host memory.
#[derive(Clone)]
pub struct SoftResource {
    inner: Arc<ResourceState>,
}

impl fmt::Debug for SoftResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftResource")
            .field("id", &format_args!("{:#x}", self.identity()))
            .field("desc", &self.inner.desc)
            .finish()
    }
}

/// Full mip chain length for the largest dimension.
fn full_mip_chain(width: u32, height: u32, depth: u32) -> u32 {
    let largest = width.max(height).max(depth).max(1);
    32 - largest.leading_zeros()
}

/// Replace a zero mip count by the full chain, as the driver does.
fn normalize(desc: &RawResourceDesc) -> RawResourceDesc {
    let mut desc = *desc;
    match &mut desc {
        RawResourceDesc::Texture1D(d) if d.mip_levels == 0 => {
            d.mip_levels = full_mip_chain(d.width, 1, 1)
        }
        RawResourceDesc::Texture2D(d) if d.mip_levels == 0 => {
            d.mip_levels = full_mip_chain(d.width, d.height, 1)
        }
        RawResourceDesc::Texture3D(d) if d.mip_levels == 0 => {
            d.mip_levels = full_mip_chain(d.width, d.height, d.depth)
        }
        _ => {}
    }
    desc
}

impl SoftResource {
    fn new(desc: &RawResourceDesc) -> Result<Self, DriverError> {
        let desc = normalize(desc);
        let info = ResourceDescriptor::from_raw(&desc)?;

        if info.width == 0 || info.height == 0 || info.depth == 0 || info.layers == 0 {
            return Err(DriverError::InvalidArgument("zero-sized resource"));
        }

        let alignment = if info.usage == Usage::Staging {
            STAGING_ROW_ALIGNMENT
        } else {
            DEFAULT_ROW_ALIGNMENT
        };

        let mut layouts = Vec::with_capacity((info.layers * info.mips) as usize);
        for _layer in 0..info.layers {
            for mip in 0..info.mips {
                let extent = |dim: u32| dim.checked_shr(mip).unwrap_or(0).max(1);
                let (width, height, depth) = (extent(info.width), extent(info.height), extent(info.depth));

                let layout = if info.is_buffer() {
                    SubresourceLayout {
                        width,
                        height: 1,
                        depth: 1,
                        pixel_size: 1,
                        row_pitch: width,
                        depth_pitch: width,
                    }
                } else {
                    let pixel_size = format_size(info.format);
                    let row_pitch = align_up(width as usize * pixel_size as usize, alignment) as u32;
                    SubresourceLayout {
                        width,
                        height,
                        depth,
                        pixel_size,
                        row_pitch,
                        depth_pitch: row_pitch * height,
                    }
                };
                layouts.push(layout);
            }
        }

        let memory = layouts.iter().map(|l| Mutex::new(vec![0u8; l.size()])).collect();

        Ok(Self {
            inner: Arc::new(ResourceState {
                desc,
                info,
                layouts,
                memory,
                shadow: Mutex::new(None),
                mapped: Mutex::new(HashSet::new()),
                gpu_busy: AtomicBool::new(false),
            }),
        })
    }

    pub fn info(&self) -> &ResourceDescriptor {
        &self.inner.info
    }

    pub fn subresource_count(&self) -> u32 {
        self.inner.layouts.len() as u32
    }

    pub fn layout(&self, subresource: u32) -> Option<SubresourceLayout> {
        self.inner.layouts.get(subresource as usize).copied()
    }

    /// Whether queued GPU work still targets this resource.
    pub fn is_gpu_busy(&self) -> bool {
        self.inner.gpu_busy.load(Ordering::Acquire)
    }

    pub fn set_gpu_busy(&self, busy: bool) {
        self.inner.gpu_busy.store(busy, Ordering::Release);
    }

    pub fn is_mapped(&self, subresource: u32) -> bool {
        lock(&self.inner.mapped).contains(&subresource)
    }

    /// Tightly packed contents of a subresource, bypassing the map rules.
    pub fn read_subresource(&self, subresource: u32) -> Vec<u8> {
        match self.layout(subresource) {
            Some(layout) => self.read_region(subresource, &layout.full_box()),
            None => Vec::new(),
        }
    }

    /// Overwrite a subresource from tightly packed bytes, bypassing the map rules.
    pub fn write_subresource(&self, subresource: u32, data: &[u8]) {
        if let Some(layout) = self.layout(subresource) {
            self.write_region(subresource, &layout.full_box(), data);
        }
    }

    fn read_region(&self, subresource: u32, region: &CopyBox) -> Vec<u8> {
        let Some(layout) = self.layout(subresource) else {
            return Vec::new();
        };
        let memory = lock(&self.inner.memory[subresource as usize]);
        let row_bytes = region.width() as usize * layout.pixel_size as usize;

        let mut out = Vec::with_capacity(row_bytes * region.height() as usize * region.depth() as usize);
        for z in region.front..region.back {
            for y in region.top..region.bottom {
                let offset = layout.offset(region.left, y, z);
                out.extend_from_slice(&memory[offset..offset + row_bytes]);
            }
        }
        out
    }

    fn write_region(&self, subresource: u32, region: &CopyBox, data: &[u8]) {
        let row_bytes = self
            .layout(subresource)
            .map_or(0, |l| region.width() as usize * l.pixel_size as usize);
        let row_pitch = row_bytes as u32;
        self.write_region_pitched(subresource, region, data, row_pitch, row_pitch * region.height());
    }

    fn write_region_pitched(
        &self,
        subresource: u32,
        region: &CopyBox,
        data: &[u8],
        row_pitch: u32,
        depth_pitch: u32,
    ) {
        let Some(layout) = self.layout(subresource) else {
            return;
        };
        let mut memory = lock(&self.inner.memory[subresource as usize]);
        let row_bytes = region.width() as usize * layout.pixel_size as usize;

        for (z_index, z) in (region.front..region.back).enumerate() {
            for (y_index, y) in (region.top..region.bottom).enumerate() {
                let src = z_index * depth_pitch as usize + y_index * row_pitch as usize;
                let Some(row) = data.get(src..src + row_bytes) else {
                    warn!("Source data too short for subresource {} write", subresource);
                    return;
                };
                let dst = layout.offset(region.left, y, z);
                memory[dst..dst + row_bytes].copy_from_slice(row);
            }
        }
    }

    fn fill(&self, subresource: u32, pattern: &[u8]) {
        let Some(layout) = self.layout(subresource) else {
            return;
        };
        let row: Vec<u8> = pattern.iter().copied().cycle().take(layout.row_bytes()).collect();
        let mut memory = lock(&self.inner.memory[subresource as usize]);
        for z in 0..layout.depth {
            for y in 0..layout.height {
                let offset = layout.offset(0, y, z);
                memory[offset..offset + row.len()].copy_from_slice(&row);
            }
        }
    }

    fn fill_bytes(&self, subresource: u32, range: std::ops::Range<usize>, pattern: &[u8]) {
        let mut memory = lock(&self.inner.memory[subresource as usize]);
        let end = range.end.min(memory.len());
        let start = range.start.min(end);
        for (byte, value) in memory[start..end].iter_mut().zip(pattern.iter().cycle()) {
            *byte = *value;
        }
    }

    /// Clamp `region` to the extent of `subresource`.
    fn clamp_box(&self, subresource: u32, region: &CopyBox) -> CopyBox {
        let Some(layout) = self.layout(subresource) else {
            return CopyBox::default();
        };
        CopyBox {
            right: region.right.min(layout.width),
            bottom: region.bottom.min(layout.height),
            back: region.back.min(layout.depth),
            ..*region
        }
    }
}

impl GpuResource for SoftResource {
    fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    fn description(&self) -> RawResourceDesc {
        self.inner.desc
    }

    fn shadow(&self) -> Option<Self> {
        lock(&self.inner.shadow).clone()
    }

    fn attach_shadow(&self, shadow: &Self) -> Result<(), DriverError> {
        *lock(&self.inner.shadow) = Some(shadow.clone());
        Ok(())
    }
}

// =============================================================================
// Views
// =============================================================================

#[derive(Debug, Clone)]
pub struct SoftView {
    resource: SoftResource,
    desc: ViewDesc,
}

impl SoftView {
    pub fn render_target(resource: &SoftResource, dimension: RtvDimension) -> Self {
        Self {
            desc: ViewDesc::RenderTarget { format: resource.info().format, dimension },
            resource: resource.clone(),
        }
    }

    pub fn unordered_access(resource: &SoftResource, dimension: UavDimension) -> Self {
        Self {
            desc: ViewDesc::UnorderedAccess { format: resource.info().format, dimension },
            resource: resource.clone(),
        }
    }

    /// Depth-stencil or shader-resource view; never decoded by the shim.
    pub fn other(resource: &SoftResource) -> Self {
        Self { desc: ViewDesc::Other, resource: resource.clone() }
    }

    /// Subresource indices this view writes.
    fn subresources(&self) -> Vec<u32> {
        let mips = self.resource.info().mips;
        subresource_range(&self.desc).subresources(mips).collect()
    }
}

impl GpuView for SoftView {
    type Resource = SoftResource;

    fn resource(&self) -> Result<SoftResource, DriverError> {
        Ok(self.resource.clone())
    }

    fn description(&self) -> ViewDesc {
        self.desc
    }
}

/// Encode a float clear color into one pixel of `format`.
fn encode_float_color(format: DxgiFormat, color: [f32; 4]) -> Vec<u8> {
    let unorm = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    match format {
        DXGI_FORMAT_R32G32B32A32_TYPELESS..=DXGI_FORMAT_R32G32B32A32_FLOAT => {
            color.iter().flat_map(|c| c.to_le_bytes()).collect()
        }
        DXGI_FORMAT_R32_TYPELESS..=DXGI_FORMAT_R32_FLOAT => color[0].to_le_bytes().to_vec(),
        DXGI_FORMAT_R8G8B8A8_TYPELESS..=DXGI_FORMAT_R8G8B8A8_UINT => color.map(unorm).to_vec(),
        DXGI_FORMAT_B8G8R8A8_UNORM..=DXGI_FORMAT_B8G8R8X8_UNORM_SRGB => {
            vec![unorm(color[2]), unorm(color[1]), unorm(color[0]), unorm(color[3])]
        }
        _ => vec![unorm(color[0]); format_size(format) as usize],
    }
}

/// Encode an integer clear value into one pixel of `format`.
fn encode_uint_color(format: DxgiFormat, values: [u32; 4]) -> Vec<u8> {
    match format {
        DXGI_FORMAT_UNKNOWN => values[0].to_le_bytes().to_vec(),
        DXGI_FORMAT_R32G32B32A32_TYPELESS..=DXGI_FORMAT_R32G32B32A32_SINT => {
            values.iter().flat_map(|v| v.to_le_bytes()).collect()
        }
        DXGI_FORMAT_R8G8B8A8_TYPELESS..=DXGI_FORMAT_R8G8B8A8_UINT => {
            values.map(|v| v as u8).to_vec()
        }
        _ => {
            let size = format_size(format) as usize;
            values[0].to_le_bytes().iter().copied().cycle().take(size).collect()
        }
    }
}

// =============================================================================
// Device
// =============================================================================

#[derive(Debug, Default)]
struct Bindings {
    render_targets: Mutex<Vec<Option<SoftView>>>,
    graphics_uavs: Mutex<Vec<Option<SoftView>>>,
    compute_uavs: Mutex<Vec<Option<SoftView>>>,
}

#[derive(Debug, Default)]
struct DeviceState {
    counters: Counters,
    fail_allocations: AtomicBool,
    immediate: Arc<Bindings>,
}

#[derive(Debug, Clone, Default)]
pub struct SoftDevice {
    inner: Arc<DeviceState>,
}

impl SoftDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> SoftCounters {
        self.inner.counters.snapshot()
    }

    /// Make every following allocation fail with `OutOfMemory`.
    pub fn set_fail_allocations(&self, fail: bool) {
        self.inner.fail_allocations.store(fail, Ordering::Relaxed);
    }

    fn context(&self, context_type: ContextType, bindings: Arc<Bindings>) -> SoftContext {
        SoftContext { device: self.clone(), context_type, bindings }
    }
}

impl GpuDevice for SoftDevice {
    type Resource = SoftResource;
    type Context = SoftContext;

    fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    /// `initial_data` holds every subresource tightly packed, in index order.
    fn create_resource(
        &self,
        desc: &RawResourceDesc,
        initial_data: Option<&[u8]>,
    ) -> Result<SoftResource, DriverError> {
        if self.inner.fail_allocations.load(Ordering::Relaxed) {
            return Err(DriverError::OutOfMemory);
        }

        let resource = SoftResource::new(desc)?;

        if let Some(mut data) = initial_data {
            for subresource in 0..resource.subresource_count() {
                let Some(layout) = resource.layout(subresource) else {
                    break;
                };
                let size = layout.row_bytes() * layout.height as usize * layout.depth as usize;
                if data.len() < size {
                    break;
                }
                resource.write_subresource(subresource, &data[..size]);
                data = &data[size..];
            }
        }

        bump(&self.inner.counters.resources_created);
        Ok(resource)
    }

    fn immediate_context(&self) -> Result<SoftContext, DriverError> {
        Ok(self.context(ContextType::Immediate, self.inner.immediate.clone()))
    }

    fn create_deferred_context(&self) -> Result<SoftContext, DriverError> {
        Ok(self.context(ContextType::Deferred, Arc::new(Bindings::default())))
    }
}

// =============================================================================
// Context
// =============================================================================

#[derive(Debug, Clone)]
pub struct SoftContext {
    device: SoftDevice,
    context_type: ContextType,
    bindings: Arc<Bindings>,
}

impl SoftContext {
    fn counters(&self) -> &Counters {
        &self.device.inner.counters
    }

    fn copy_region(
        &self,
        dst: &SoftResource,
        dst_subresource: u32,
        dst_origin: Origin,
        src: &SoftResource,
        src_subresource: u32,
        src_box: Option<&CopyBox>,
    ) {
        let (Some(dst_layout), Some(src_layout)) = (dst.layout(dst_subresource), src.layout(src_subresource))
        else {
            warn!("Copy with invalid subresource {} <- {}", dst_subresource, src_subresource);
            return;
        };

        let src_box = match src_box {
            Some(b) => src.clamp_box(src_subresource, b),
            None => src_layout.full_box(),
        };
        let region = clip(&src_box, &dst_layout.full_box(), dst_origin);
        if region.is_empty() {
            return;
        }

        let bytes = src.read_region(src_subresource, &region.src);
        dst.write_region(dst_subresource, &region.dst, &bytes);
        dst.set_gpu_busy(true);
    }

    /// Writes the low byte of the X group count into every bound compute UAV.
    fn run_compute(&self, x: u32) {
        bump(&self.counters().dispatches);
        let uavs = lock(&self.bindings.compute_uavs).clone();
        for uav in uavs.iter().flatten() {
            let resource = &uav.resource;
            match uav.desc {
                ViewDesc::UnorderedAccess { dimension: UavDimension::Buffer { .. }, .. } => {
                    resource.fill(0, &[x as u8]);
                }
                _ => {
                    for subresource in uav.subresources() {
                        resource.fill(subresource, &[x as u8]);
                    }
                }
            }
            resource.set_gpu_busy(true);
        }
    }
}

fn store_views(slots: &Mutex<Vec<Option<SoftView>>>, start: u32, views: &[Option<SoftView>]) {
    let mut slots = lock(slots);
    slots.resize(MAX_BOUND_VIEWS, None);
    for (i, view) in views.iter().enumerate() {
        if let Some(slot) = slots.get_mut(start as usize + i) {
            *slot = view.clone();
        }
    }
}

impl GpuContext for SoftContext {
    type Resource = SoftResource;
    type View = SoftView;
    type Device = SoftDevice;

    fn identity(&self) -> usize {
        Arc::as_ptr(&self.bindings) as usize
    }

    fn context_type(&self) -> ContextType {
        self.context_type
    }

    fn device(&self) -> Result<SoftDevice, DriverError> {
        Ok(self.device.clone())
    }

    fn map(
        &self,
        resource: &SoftResource,
        subresource: u32,
        map_type: MapType,
        map_flags: u32,
    ) -> Result<MappedSubresource, DriverError> {
        let layout = resource
            .layout(subresource)
            .ok_or(DriverError::InvalidArgument("subresource out of range"))?;
        let info = resource.info();
        let cpu = info.cpu_access_flags;

        let discard = matches!(map_type, MapType::WriteDiscard | MapType::WriteNoOverwrite);
        if self.context_type == ContextType::Deferred && !(discard && info.usage == Usage::Dynamic) {
            return Err(DriverError::InvalidArgument(
                "deferred contexts only map dynamic resources with WRITE_DISCARD",
            ));
        }

        let mut required = 0;
        if map_type.reads() {
            required |= D3D11_CPU_ACCESS_READ;
        }
        if map_type.writes() {
            required |= D3D11_CPU_ACCESS_WRITE;
        }
        let usage = if discard { Usage::Dynamic } else { Usage::Staging };
        let allowed = info.usage == usage && cpu & required == required;
        if !allowed {
            return Err(DriverError::InvalidArgument("resource does not allow this map type"));
        }

        if !discard && resource.is_gpu_busy() {
            if map_flags & D3D11_MAP_FLAG_DO_NOT_WAIT != 0 {
                return Err(DriverError::WasStillDrawing);
            }
            // Blocking map: the pending GPU work completes first.
            resource.set_gpu_busy(false);
        }

        if !lock(&resource.inner.mapped).insert(subresource) {
            return Err(DriverError::InvalidArgument("subresource is already mapped"));
        }

        bump(&self.counters().maps);
        let data = lock(&resource.inner.memory[subresource as usize]).as_mut_ptr();
        Ok(MappedSubresource { data, row_pitch: layout.row_pitch, depth_pitch: layout.depth_pitch })
    }

    fn unmap(&self, resource: &SoftResource, subresource: u32) {
        if !lock(&resource.inner.mapped).remove(&subresource) {
            warn!("Unmap of subresource {} that was not mapped", subresource);
        }
    }

    fn copy_resource(&self, dst: &SoftResource, src: &SoftResource) {
        bump(&self.counters().gpu_copies);
        let count = dst.subresource_count().min(src.subresource_count());
        for subresource in 0..count {
            self.copy_region(dst, subresource, Origin::ZERO, src, subresource, None);
        }
    }

    fn copy_subresource_region(
        &self,
        dst: &SoftResource,
        dst_subresource: u32,
        dst_x: u32,
        dst_y: u32,
        dst_z: u32,
        src: &SoftResource,
        src_subresource: u32,
        src_box: Option<&CopyBox>,
    ) {
        bump(&self.counters().gpu_copies);
        self.copy_region(
            dst,
            dst_subresource,
            Origin::new(dst_x, dst_y, dst_z),
            src,
            src_subresource,
            src_box,
        );
    }

    fn update_subresource(
        &self,
        resource: &SoftResource,
        subresource: u32,
        dst_box: Option<&CopyBox>,
        data: &[u8],
        row_pitch: u32,
        depth_pitch: u32,
    ) {
        bump(&self.counters().updates);
        let Some(layout) = resource.layout(subresource) else {
            warn!("Update of invalid subresource {}", subresource);
            return;
        };
        let region = match dst_box {
            Some(b) => resource.clamp_box(subresource, b),
            None => layout.full_box(),
        };
        if region.is_empty() {
            return;
        }
        resource.write_region_pitched(subresource, &region, data, row_pitch, depth_pitch);
        resource.set_gpu_busy(true);
    }

    fn clear_render_target_view(&self, rtv: &SoftView, color: [f32; 4]) {
        bump(&self.counters().clears);
        let pixel = encode_float_color(rtv.resource.info().format, color);
        for subresource in rtv.subresources() {
            rtv.resource.fill(subresource, &pixel);
        }
        rtv.resource.set_gpu_busy(true);
    }

    fn clear_unordered_access_view_float(&self, uav: &SoftView, values: [f32; 4]) {
        bump(&self.counters().clears);
        let pixel = encode_float_color(uav.resource.info().format, values);
        for subresource in uav.subresources() {
            uav.resource.fill(subresource, &pixel);
        }
        uav.resource.set_gpu_busy(true);
    }

    fn clear_unordered_access_view_uint(&self, uav: &SoftView, values: [u32; 4]) {
        bump(&self.counters().clears);
        let pixel = encode_uint_color(uav.resource.info().format, values);
        match uav.desc {
            ViewDesc::UnorderedAccess {
                dimension: UavDimension::Buffer { first_element, num_elements },
                ..
            } => {
                let stride = pixel.len();
                let start = first_element as usize * stride;
                let end = start + num_elements as usize * stride;
                uav.resource.fill_bytes(0, start..end, &pixel);
            }
            _ => {
                for subresource in uav.subresources() {
                    uav.resource.fill(subresource, &pixel);
                }
            }
        }
        uav.resource.set_gpu_busy(true);
    }

    fn om_get_render_targets(&self) -> Vec<SoftView> {
        lock(&self.bindings.render_targets).iter().flatten().cloned().collect()
    }

    fn cs_get_unordered_access_views(&self) -> Vec<SoftView> {
        lock(&self.bindings.compute_uavs).iter().flatten().cloned().collect()
    }

    fn om_set_render_targets(&self, rtvs: &[Option<SoftView>], _dsv: Option<&SoftView>) {
        let mut slots = lock(&self.bindings.render_targets);
        *slots = rtvs.iter().take(MAX_BOUND_VIEWS).cloned().collect();
    }

    fn om_set_render_targets_and_unordered_access_views(
        &self,
        rtvs: &[Option<SoftView>],
        dsv: Option<&SoftView>,
        uav_start_slot: u32,
        uavs: &[Option<SoftView>],
        _uav_initial_counts: Option<&[u32]>,
    ) {
        self.om_set_render_targets(rtvs, dsv);
        store_views(&self.bindings.graphics_uavs, uav_start_slot, uavs);
    }

    fn cs_set_unordered_access_views(
        &self,
        start_slot: u32,
        uavs: &[Option<SoftView>],
        _uav_initial_counts: Option<&[u32]>,
    ) {
        store_views(&self.bindings.compute_uavs, start_slot, uavs);
    }

    fn dispatch(&self, x: u32, _y: u32, _z: u32) {
        self.run_compute(x);
    }

    fn dispatch_indirect(&self, args: &SoftResource, aligned_byte_offset: u32) {
        let bytes = args.read_subresource(0);
        let offset = aligned_byte_offset as usize;
        let x = bytes
            .get(offset..offset + 4)
            .map_or(0, |b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]));
        self.run_compute(x);
    }
}
