//! End-to-end copy and shadow maintenance scenarios on the soft driver.

use std::sync::Arc;

use stagefix::d3d::*;
use stagefix::soft::{SoftContext, SoftDevice, SoftResource, SoftView};
use stagefix::{
    Config, CopyBox, CopyOutcome, CopyParams, GpuContext, GpuDevice, HookedContext,
    HookedDevice, Origin, Shim,
};

struct Harness {
    shim: Arc<Shim>,
    driver: SoftDevice,
    device: HookedDevice<SoftDevice>,
    context: HookedContext<SoftContext>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(Config::default())
    }

    fn with_config(config: Config) -> Self {
        let shim = Shim::new(config);
        let driver = SoftDevice::new();
        let device = shim.hook_device(driver.clone());
        let context = device.immediate_context().unwrap();
        Self { shim, driver, device, context }
    }

    fn gpu_copies(&self) -> u64 {
        self.driver.counters().gpu_copies
    }

    fn texture(&self, size: u32, usage: Usage, bind_flags: u32, cpu: u32, data: Option<&[u8]>) -> SoftResource {
        let desc = RawResourceDesc::Texture2D(Texture2DDesc {
            width: size,
            height: size,
            format: DXGI_FORMAT_R8G8B8A8_UNORM,
            usage,
            bind_flags,
            cpu_access_flags: cpu,
            ..Default::default()
        });
        self.device.create_resource(&desc, data).unwrap()
    }

    fn staging_source(&self, size: u32) -> (SoftResource, Vec<u8>) {
        let pixels = pattern(size);
        let texture = self.texture(size, Usage::Staging, 0, D3D11_CPU_ACCESS_READ, Some(pixels.as_slice()));
        (texture, pixels)
    }

    fn render_target(&self, size: u32) -> SoftResource {
        let pixels = pattern(size);
        self.texture(size, Usage::Default, D3D11_BIND_RENDER_TARGET, 0, Some(pixels.as_slice()))
    }

    fn with_shadow(&self, resource: &SoftResource) -> SoftResource {
        self.context.shadow_of(resource).unwrap()
    }
}

fn pattern(size: u32) -> Vec<u8> {
    (0..size * size * 4).map(|i| (i * 7 % 253) as u8).collect()
}

fn rtv(resource: &SoftResource) -> SoftView {
    SoftView::render_target(resource, RtvDimension::Texture2D { mip_slice: 0 })
}

fn uav(resource: &SoftResource) -> SoftView {
    SoftView::unordered_access(resource, UavDimension::Texture2D { mip_slice: 0 })
}

#[test]
fn test_staging_copy_runs_on_cpu() {
    let h = Harness::new();
    let (src, pixels) = h.staging_source(256);
    let dst = h.texture(256, Usage::Staging, 0, D3D11_CPU_ACCESS_WRITE, None);

    h.context.copy_resource(&dst, &src);

    assert_eq!(h.gpu_copies(), 0);
    assert_eq!(h.shim.stats().fast_copies_applied, 1);

    let mapped = h.context.map(&dst, 0, MapType::Read, 0).unwrap();
    h.context.unmap(&dst, 0);
    assert_eq!(mapped.row_pitch, 1024);
    assert_eq!(dst.read_subresource(0), pixels);
}

#[test]
fn test_deferred_copy_goes_to_gpu() {
    let h = Harness::new();
    let deferred = h.device.create_deferred_context().unwrap();
    let (src, pixels) = h.staging_source(256);
    let dst = h.texture(256, Usage::Staging, 0, D3D11_CPU_ACCESS_WRITE, None);

    deferred.copy_resource(&dst, &src);

    assert_eq!(h.gpu_copies(), 1);
    assert_eq!(h.shim.stats().fast_copies_applied, 0);
    assert_eq!(dst.read_subresource(0), pixels);
}

#[test]
fn test_disabled_fast_path_copies_on_gpu() {
    let h = Harness::with_config(Config { fast_path: false, ..Config::default() });
    let (src, _) = h.staging_source(64);
    let dst = h.texture(64, Usage::Staging, 0, D3D11_CPU_ACCESS_WRITE, None);

    h.context.copy_resource(&dst, &src);

    assert_eq!(h.gpu_copies(), 1);
    assert_eq!(h.shim.stats().gpu_fallbacks, 0);
}

#[test]
fn test_busy_destination_falls_back_once() {
    let h = Harness::new();
    let (src, pixels) = h.staging_source(64);
    let dst = h.texture(64, Usage::Staging, 0, D3D11_CPU_ACCESS_WRITE, None);
    dst.set_gpu_busy(true);

    h.context.copy_resource(&dst, &src);

    let stats = h.shim.stats();
    assert_eq!(h.gpu_copies(), 1);
    assert_eq!(stats.fast_copies_busy, 1);
    assert_eq!(stats.fast_copies_declined, 0);
    assert_eq!(stats.gpu_fallbacks, 1);
    assert_eq!(dst.read_subresource(0), pixels);
}

#[test]
fn test_zero_volume_copy_touches_nothing() {
    let h = Harness::new();
    let (src, _) = h.staging_source(16);
    let dst = h.texture(16, Usage::Staging, 0, D3D11_CPU_ACCESS_WRITE, None);
    let maps_before = h.driver.counters().maps;

    let params = CopyParams { dst_origin: Origin::new(16, 0, 0), ..CopyParams::whole_resource() };
    let outcome = h.context.try_fast_copy(&dst, &src, &params);

    assert_eq!(outcome, CopyOutcome::Applied);
    assert_eq!(h.driver.counters().maps, maps_before);
    assert!(dst.read_subresource(0).iter().all(|&b| b == 0));
}

#[test]
fn test_region_copy_with_box_and_origin() {
    let h = Harness::new();
    let (src, pixels) = h.staging_source(8);
    let dst = h.texture(8, Usage::Staging, 0, D3D11_CPU_ACCESS_WRITE, None);

    let src_box = CopyBox::new(2, 2, 0, 6, 6, 1);
    h.context.copy_subresource_region(&dst, 0, 1, 3, 0, &src, 0, Some(&src_box));

    assert_eq!(h.gpu_copies(), 0);
    let out = dst.read_subresource(0);
    let row = 8 * 4;
    for y in 0..4 {
        let dst_start = (3 + y) * row + 4;
        let src_start = (2 + y) * row + 2 * 4;
        assert_eq!(&out[dst_start..dst_start + 16], &pixels[src_start..src_start + 16]);
    }
    assert!(out[..3 * row].iter().all(|&b| b == 0));
}

#[test]
fn test_oversized_source_box_matches_gpu_copy() {
    let h = Harness::new();
    let (src, _) = h.staging_source(2);
    let cpu_dst = h.texture(64, Usage::Staging, 0, D3D11_CPU_ACCESS_WRITE, None);
    let gpu_dst = h.texture(64, Usage::Staging, 0, D3D11_CPU_ACCESS_WRITE, None);
    let oversized = CopyBox::new(0, 0, 0, 64, 64, 1);

    h.context.copy_subresource_region(&cpu_dst, 0, 0, 0, 0, &src, 0, Some(&oversized));
    assert_eq!(h.gpu_copies(), 0);

    h.context
        .inner()
        .copy_subresource_region(&gpu_dst, 0, 0, 0, 0, &src, 0, Some(&oversized));

    let out = cpu_dst.read_subresource(0);
    assert_eq!(out, gpu_dst.read_subresource(0));
    // Only the 2x2 source lands in the destination.
    let written = out.iter().enumerate().filter(|&(_, &b)| b != 0).map(|(i, _)| i);
    for i in written {
        let (x, y) = ((i % (64 * 4)) / 4, i / (64 * 4));
        assert!(x < 2 && y < 2, "byte {} outside the source extent", i);
    }
}

#[test]
fn test_hooked_fast_copy_creates_shadow_through_real_context() {
    let h = Harness::new();
    let src = h.render_target(16);
    let dst = h.texture(16, Usage::Staging, 0, D3D11_CPU_ACCESS_WRITE, None);

    let outcome = h.context.try_fast_copy(&dst, &src, &CopyParams::whole_resource());

    assert_eq!(outcome, CopyOutcome::Applied);
    assert_eq!(h.shim.stats().shadows_created, 1);
    assert_eq!(h.context.shadow_of(&src).unwrap().read_subresource(0), src.read_subresource(0));
    assert_eq!(dst.read_subresource(0), src.read_subresource(0));
}

#[test]
fn test_render_target_source_read_through_shadow() {
    let h = Harness::new();
    let src = h.render_target(64);
    let dst = h.texture(64, Usage::Staging, 0, D3D11_CPU_ACCESS_WRITE, None);

    h.context.copy_resource(&dst, &src);

    let stats = h.shim.stats();
    assert_eq!(stats.shadows_created, 1);
    assert_eq!(stats.fast_copies_applied, 1);
    // Only the baseline copy into the new shadow touched the GPU.
    assert_eq!(h.gpu_copies(), 1);
    assert!(h.shim.registry().lookup(&src).is_some());
    assert_eq!(dst.read_subresource(0), src.read_subresource(0));
}

#[test]
fn test_disabled_shadows_leave_gpu_sources_to_gpu() {
    let h = Harness::with_config(Config { shadow_resources: false, ..Config::default() });
    let src = h.render_target(64);
    let dst = h.texture(64, Usage::Staging, 0, D3D11_CPU_ACCESS_WRITE, None);

    h.context.copy_resource(&dst, &src);

    let stats = h.shim.stats();
    assert_eq!(stats.shadows_created, 0);
    assert_eq!(stats.fast_copies_declined, 1);
    assert_eq!(h.gpu_copies(), 1);
    assert!(h.shim.registry().lookup(&src).is_none());
}

#[test]
fn test_copy_into_shadowed_resource_updates_shadow() {
    let h = Harness::new();
    let dst = h.texture(32, Usage::Default, D3D11_BIND_RENDER_TARGET, 0, None);
    let shadow = h.with_shadow(&dst);
    let (src, pixels) = h.staging_source(32);
    let before = h.gpu_copies();

    h.context.copy_resource(&dst, &src);

    // The render target is not CPU writable: GPU copies into both.
    assert_eq!(h.gpu_copies(), before + 2);
    assert_eq!(dst.read_subresource(0), pixels);
    assert_eq!(shadow.read_subresource(0), pixels);
}

#[test]
fn test_deferred_copy_into_shadowed_resource_issues_both_gpu_copies() {
    let h = Harness::new();
    let deferred = h.device.create_deferred_context().unwrap();
    let dst = h.texture(32, Usage::Staging, 0, D3D11_CPU_ACCESS_WRITE, None);
    let shadow = h.with_shadow(&dst);
    let (src, pixels) = h.staging_source(32);
    let before = h.gpu_copies();

    deferred.copy_resource(&dst, &src);

    assert_eq!(h.gpu_copies(), before + 2);
    assert_eq!(h.shim.stats().fast_copies_applied, 0);
    assert_eq!(dst.read_subresource(0), pixels);
    assert_eq!(shadow.read_subresource(0), pixels);
}

#[test]
fn test_busy_shadow_gets_gpu_copy_after_cpu_base_copy() {
    let h = Harness::new();
    let dst = h.texture(32, Usage::Staging, 0, D3D11_CPU_ACCESS_WRITE, None);
    let shadow = h.with_shadow(&dst);
    shadow.set_gpu_busy(true);
    let (src, pixels) = h.staging_source(32);
    let before = h.gpu_copies();

    h.context.copy_resource(&dst, &src);

    let stats = h.shim.stats();
    assert_eq!(stats.fast_copies_applied, 1);
    assert_eq!(stats.fast_copies_busy, 1);
    assert_eq!(stats.gpu_fallbacks, 0);
    // Exactly one GPU copy, and it targets the shadow.
    assert_eq!(h.gpu_copies(), before + 1);
    assert!(shadow.is_gpu_busy());
    assert_eq!(dst.read_subresource(0), pixels);
    assert_eq!(shadow.read_subresource(0), pixels);
}

#[test]
fn test_clear_render_target_refreshes_shadow() {
    let h = Harness::new();
    let target = h.render_target(16);
    let shadow = h.with_shadow(&target);

    h.context.clear_render_target_view(&rtv(&target), [1.0, 0.0, 0.0, 1.0]);

    let expected: Vec<u8> = [255u8, 0, 0, 255].repeat(16 * 16);
    assert_eq!(shadow.read_subresource(0), expected);
    assert_eq!(h.shim.stats().shadow_refreshes, 1);
}

#[test]
fn test_clear_uav_uint_refreshes_shadow() {
    let h = Harness::new();
    let desc = RawResourceDesc::Texture2D(Texture2DDesc {
        width: 8,
        height: 8,
        format: DXGI_FORMAT_R32_UINT,
        bind_flags: D3D11_BIND_UNORDERED_ACCESS,
        ..Default::default()
    });
    let target = h.device.create_resource(&desc, None).unwrap();
    let shadow = h.with_shadow(&target);

    h.context.clear_unordered_access_view_uint(&uav(&target), [0x0102_0304, 0, 0, 0]);

    let expected: Vec<u8> = [4u8, 3, 2, 1].repeat(8 * 8);
    assert_eq!(shadow.read_subresource(0), expected);
}

#[test]
fn test_dispatch_refreshes_uav_shadow_only() {
    let h = Harness::new();
    let target = h.render_target(16);
    let target_shadow = h.with_shadow(&target);
    let storage = h.texture(16, Usage::Default, D3D11_BIND_UNORDERED_ACCESS, 0, None);
    let storage_shadow = h.with_shadow(&storage);

    h.context.om_set_render_targets(&[Some(rtv(&target))], None);
    h.context.cs_set_unordered_access_views(0, &[Some(uav(&storage))], None);

    // Rendering into the bound target, invisible to the shim.
    h.context.inner().clear_render_target_view(&rtv(&target), [0.0, 1.0, 0.0, 1.0]);
    let target_shadow_before = target_shadow.read_subresource(0);

    h.context.dispatch(7, 1, 1);

    assert!(storage_shadow.read_subresource(0).iter().all(|&b| b == 7));
    assert_eq!(target_shadow.read_subresource(0), target_shadow_before);
    assert_ne!(target_shadow.read_subresource(0), target.read_subresource(0));
}

#[test]
fn test_dispatch_indirect_refreshes_uav_shadow() {
    let h = Harness::new();
    let storage = h.texture(8, Usage::Default, D3D11_BIND_UNORDERED_ACCESS, 0, None);
    let storage_shadow = h.with_shadow(&storage);
    let args_desc = RawResourceDesc::Buffer(BufferDesc { byte_width: 16, ..Default::default() });
    let args: Vec<u8> = [0u32, 9, 1, 1].iter().flat_map(|v| v.to_le_bytes()).collect();
    let args = h.device.create_resource(&args_desc, Some(args.as_slice())).unwrap();

    h.context.cs_set_unordered_access_views(0, &[Some(uav(&storage))], None);
    h.context.dispatch_indirect(&args, 4);

    assert!(storage_shadow.read_subresource(0).iter().all(|&b| b == 9));
}

#[test]
fn test_rebinding_targets_refreshes_previous_targets() {
    let h = Harness::new();
    let target = h.render_target(16);
    let shadow = h.with_shadow(&target);

    h.context.om_set_render_targets(&[Some(rtv(&target))], None);
    h.context.inner().clear_render_target_view(&rtv(&target), [0.0, 0.0, 1.0, 1.0]);
    h.context.om_set_render_targets_and_unordered_access_views(&[None], None, 1, &[], None);

    assert_eq!(shadow.read_subresource(0), target.read_subresource(0));
    assert!(h.context.om_get_render_targets().is_empty());
}

#[test]
fn test_update_subresource_replicated_to_shadow() {
    let h = Harness::new();
    let target = h.render_target(8);
    let shadow = h.with_shadow(&target);

    let update_box = CopyBox::new(2, 1, 0, 4, 3, 1);
    let data = [0xAAu8; 2 * 2 * 4];
    h.context.update_subresource(&target, 0, Some(&update_box), &data, 8, 16);

    assert_eq!(shadow.read_subresource(0), target.read_subresource(0));
    let out = shadow.read_subresource(0);
    assert_eq!(&out[8 * 4 + 8..8 * 4 + 16], &data[..8]);
}

#[test]
fn test_staging_creation_is_promoted() {
    let h = Harness::new();
    let staging = h.texture(4, Usage::Staging, 0, D3D11_CPU_ACCESS_WRITE, None);
    let dynamic = h.texture(4, Usage::Dynamic, D3D11_BIND_SHADER_RESOURCE, D3D11_CPU_ACCESS_WRITE, None);

    assert_eq!(staging.info().cpu_access_flags, D3D11_CPU_ACCESS_READ | D3D11_CPU_ACCESS_WRITE);
    assert_eq!(dynamic.info().cpu_access_flags, D3D11_CPU_ACCESS_WRITE);
}

#[test]
fn test_staging_promotion_can_be_disabled() {
    let h = Harness::with_config(Config { promote_staging_access: false, ..Config::default() });
    let staging = h.texture(4, Usage::Staging, 0, D3D11_CPU_ACCESS_WRITE, None);

    assert_eq!(staging.info().cpu_access_flags, D3D11_CPU_ACCESS_WRITE);
}

#[test]
fn test_dynamic_buffer_full_copy_discards() {
    let h = Harness::new();
    let data: Vec<u8> = (0..64).collect();
    let src_desc = RawResourceDesc::Buffer(BufferDesc {
        byte_width: 64,
        usage: Usage::Staging,
        cpu_access_flags: D3D11_CPU_ACCESS_READ,
        ..Default::default()
    });
    let dst_desc = RawResourceDesc::Buffer(BufferDesc {
        byte_width: 64,
        usage: Usage::Dynamic,
        bind_flags: D3D11_BIND_VERTEX_BUFFER,
        cpu_access_flags: D3D11_CPU_ACCESS_WRITE,
        ..Default::default()
    });
    let src = h.device.create_resource(&src_desc, Some(data.as_slice())).unwrap();
    let dst = h.device.create_resource(&dst_desc, None).unwrap();

    h.context.copy_resource(&dst, &src);
    assert_eq!(h.gpu_copies(), 0);
    assert_eq!(dst.read_subresource(0), data);

    // Partial writes into dynamic buffers stay on the GPU.
    let half = CopyBox::new(0, 0, 0, 32, 1, 1);
    h.context.copy_subresource_region(&dst, 0, 0, 0, 0, &src, 0, Some(&half));
    assert_eq!(h.gpu_copies(), 1);
}

#[test]
fn test_shadow_allocation_failure_falls_back_to_gpu() {
    let h = Harness::new();
    let src = h.render_target(16);
    let dst = h.texture(16, Usage::Staging, 0, D3D11_CPU_ACCESS_WRITE, None);

    h.driver.set_fail_allocations(true);
    h.context.copy_resource(&dst, &src);

    let stats = h.shim.stats();
    assert_eq!(stats.shadow_creation_failures, 1);
    assert_eq!(stats.gpu_fallbacks, 1);
    assert_eq!(dst.read_subresource(0), src.read_subresource(0));
}

#[test]
fn test_hooked_device_wraps_contexts() {
    let h = Harness::new();
    let deferred = h.device.create_deferred_context().unwrap();

    assert_eq!(deferred.context_type(), ContextType::Deferred);
    assert_eq!(h.context.context_type(), ContextType::Immediate);
    assert_eq!(h.context.device().unwrap().identity(), h.driver.identity());
}
