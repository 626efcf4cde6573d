//! Context hooks
//!
//! Wraps a device context. Copies try the CPU fast path first; every other
//! operation that writes a resource outside the copy entry points keeps
//! that resource's shadow in sync.

use std::sync::Arc;

use tracing::trace;

use crate::d3d::{ContextType, MapType};
use crate::descriptor::ResourceDescriptor;
use crate::device::HookedDevice;
use crate::driver::{DriverError, GpuContext, GpuView, MappedSubresource};
use crate::fast_copy::{try_fast_copy, CopyOutcome, CopyParams};
use crate::region::{CopyBox, Origin};
use crate::shim::Shim;
use crate::view::subresource_range;

pub struct HookedContext<C: GpuContext> {
    shim: Arc<Shim>,
    context: C,
}

impl<C: GpuContext> HookedContext<C> {
    pub(crate) fn new(shim: Arc<Shim>, context: C) -> Self {
        Self { shim, context }
    }

    /// The real context.
    pub fn inner(&self) -> &C {
        &self.context
    }

    /// Try the CPU copy path on the real context.
    pub fn try_fast_copy(&self, dst: &C::Resource, src: &C::Resource, params: &CopyParams) -> CopyOutcome {
        try_fast_copy(&self.shim, &self.context, dst, src, params)
    }

    /// Shadow of `resource`, created and seeded on first request.
    pub fn shadow_of(&self, resource: &C::Resource) -> Option<C::Resource> {
        self.shim.registry().get_or_create(&self.context, resource)
    }

    /// Only immediate contexts execute commands as they are issued, so only
    /// they may copy through CPU mappings.
    fn fast_path_enabled(&self) -> bool {
        self.shim.config().fast_path && self.context.context_type() == ContextType::Immediate
    }

    /// Run a copy into `dst` and into its shadow, if any.
    ///
    /// Each target gets the GPU copy only if the CPU copy did not apply.
    fn copy_with_fast_path(
        &self,
        dst: &C::Resource,
        src: &C::Resource,
        params: &CopyParams,
        gpu_copy: impl Fn(&C::Resource),
    ) {
        let dst_shadow = self.shim.registry().lookup(dst);

        let mut needs_base_copy = true;
        let mut needs_shadow_copy = true;

        if self.fast_path_enabled() {
            needs_base_copy = !self.try_fast_copy(dst, src, params).applied();

            if !needs_base_copy {
                if let Some(shadow) = &dst_shadow {
                    needs_shadow_copy = !self.try_fast_copy(shadow, src, params).applied();
                }
            }

            if needs_base_copy {
                self.shim.copy_stats().inc_gpu_fallbacks();
            }
        }

        if needs_base_copy {
            gpu_copy(dst);
        }

        if let Some(shadow) = &dst_shadow {
            if needs_shadow_copy {
                gpu_copy(shadow);
            }
        }
    }

    /// Copy the subresources written through `view` into its resource's shadow.
    pub fn refresh_view_shadow(&self, view: &C::View) {
        let Ok(resource) = view.resource() else {
            return;
        };
        let Some(shadow) = self.shim.registry().lookup(&resource) else {
            return;
        };
        let Ok(info) = ResourceDescriptor::of(&resource) else {
            return;
        };

        let range = subresource_range(&view.description());
        for subresource in range.subresources(info.mips) {
            self.context
                .copy_subresource_region(&shadow, subresource, 0, 0, 0, &resource, subresource, None);
        }

        trace!("Refreshed shadow {:?} of view resource", range);
        self.shim.copy_stats().inc_shadow_refreshes();
    }

    /// Refresh the shadows of all bound render targets.
    pub fn refresh_render_target_shadows(&self) {
        for rtv in self.context.om_get_render_targets() {
            self.refresh_view_shadow(&rtv);
        }
    }

    /// Refresh the shadows of all bound compute UAVs.
    pub fn refresh_unordered_access_shadows(&self) {
        for uav in self.context.cs_get_unordered_access_views() {
            self.refresh_view_shadow(&uav);
        }
    }
}

impl<C: GpuContext> GpuContext for HookedContext<C> {
    type Resource = C::Resource;
    type View = C::View;
    type Device = HookedDevice<C::Device>;

    fn identity(&self) -> usize {
        self.context.identity()
    }

    fn context_type(&self) -> ContextType {
        self.context.context_type()
    }

    fn device(&self) -> Result<Self::Device, DriverError> {
        let device = self.context.device()?;
        Ok(HookedDevice::new(self.shim.clone(), device))
    }

    fn map(
        &self,
        resource: &Self::Resource,
        subresource: u32,
        map_type: MapType,
        map_flags: u32,
    ) -> Result<MappedSubresource, DriverError> {
        self.context.map(resource, subresource, map_type, map_flags)
    }

    fn unmap(&self, resource: &Self::Resource, subresource: u32) {
        self.context.unmap(resource, subresource)
    }

    fn copy_resource(&self, dst: &Self::Resource, src: &Self::Resource) {
        let params = CopyParams::whole_resource();
        self.copy_with_fast_path(dst, src, &params, |target| {
            self.context.copy_resource(target, src)
        });
    }

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
    ) {
        let params = CopyParams {
            dst_subresource,
            dst_origin: Origin::new(dst_x, dst_y, dst_z),
            src_subresource,
            src_box: src_box.copied(),
        };
        self.copy_with_fast_path(dst, src, &params, |target| {
            self.context.copy_subresource_region(
                target,
                dst_subresource,
                dst_x,
                dst_y,
                dst_z,
                src,
                src_subresource,
                src_box,
            )
        });
    }

    fn update_subresource(
        &self,
        resource: &Self::Resource,
        subresource: u32,
        dst_box: Option<&CopyBox>,
        data: &[u8],
        row_pitch: u32,
        depth_pitch: u32,
    ) {
        self.context
            .update_subresource(resource, subresource, dst_box, data, row_pitch, depth_pitch);

        if let Some(shadow) = self.shim.registry().lookup(resource) {
            self.context
                .update_subresource(&shadow, subresource, dst_box, data, row_pitch, depth_pitch);
            self.shim.copy_stats().inc_shadow_refreshes();
        }
    }

    fn clear_render_target_view(&self, rtv: &Self::View, color: [f32; 4]) {
        self.context.clear_render_target_view(rtv, color);
        self.refresh_view_shadow(rtv);
    }

    fn clear_unordered_access_view_float(&self, uav: &Self::View, values: [f32; 4]) {
        self.context.clear_unordered_access_view_float(uav, values);
        self.refresh_view_shadow(uav);
    }

    fn clear_unordered_access_view_uint(&self, uav: &Self::View, values: [u32; 4]) {
        self.context.clear_unordered_access_view_uint(uav, values);
        self.refresh_view_shadow(uav);
    }

    fn om_get_render_targets(&self) -> Vec<Self::View> {
        self.context.om_get_render_targets()
    }

    fn cs_get_unordered_access_views(&self) -> Vec<Self::View> {
        self.context.cs_get_unordered_access_views()
    }

    fn om_set_render_targets(&self, rtvs: &[Option<Self::View>], dsv: Option<&Self::View>) {
        // Rendering since the last bind went through the outgoing targets.
        self.refresh_render_target_shadows();
        self.context.om_set_render_targets(rtvs, dsv);
    }

    fn om_set_render_targets_and_unordered_access_views(
        &self,
        rtvs: &[Option<Self::View>],
        dsv: Option<&Self::View>,
        uav_start_slot: u32,
        uavs: &[Option<Self::View>],
        uav_initial_counts: Option<&[u32]>,
    ) {
        self.refresh_render_target_shadows();
        self.context.om_set_render_targets_and_unordered_access_views(
            rtvs,
            dsv,
            uav_start_slot,
            uavs,
            uav_initial_counts,
        );
    }

    fn cs_set_unordered_access_views(
        &self,
        start_slot: u32,
        uavs: &[Option<Self::View>],
        uav_initial_counts: Option<&[u32]>,
    ) {
        self.context
            .cs_set_unordered_access_views(start_slot, uavs, uav_initial_counts);
    }

    fn dispatch(&self, x: u32, y: u32, z: u32) {
        self.context.dispatch(x, y, z);
        self.refresh_unordered_access_shadows();
    }

    fn dispatch_indirect(&self, args: &Self::Resource, aligned_byte_offset: u32) {
        self.context.dispatch_indirect(args, aligned_byte_offset);
        self.refresh_unordered_access_shadows();
    }
}
