//! Device hooks
//!
//! Resource creation and context acquisition on a wrapped device.

use std::sync::Arc;

use tracing::debug;

use crate::context::HookedContext;
use crate::d3d::{RawResourceDesc, Usage, D3D11_CPU_ACCESS_READ, D3D11_CPU_ACCESS_WRITE};
use crate::driver::{DriverError, GpuDevice};
use crate::shim::Shim;

#[derive(Clone)]
pub struct HookedDevice<D: GpuDevice> {
    shim: Arc<Shim>,
    device: D,
}

impl<D: GpuDevice> HookedDevice<D> {
    pub(crate) fn new(shim: Arc<Shim>, device: D) -> Self {
        Self { shim, device }
    }

    /// The real device.
    pub fn inner(&self) -> &D {
        &self.device
    }
}

impl<D: GpuDevice> GpuDevice for HookedDevice<D> {
    type Resource = D::Resource;
    type Context = HookedContext<D::Context>;

    fn identity(&self) -> usize {
        self.device.identity()
    }

    /// Create a resource, giving staging resources CPU read+write access.
    ///
    /// Staging resources created write-only would otherwise never be
    /// readable sources or mappable shadows.
    fn create_resource(
        &self,
        desc: &RawResourceDesc,
        initial_data: Option<&[u8]>,
    ) -> Result<Self::Resource, DriverError> {
        if self.shim.config().promote_staging_access {
            if let Some(promoted) = promote_staging_access(desc) {
                debug!("Promoting staging resource to CPU read+write: {:?}", desc);
                return self.device.create_resource(&promoted, initial_data);
            }
        }
        self.device.create_resource(desc, initial_data)
    }

    fn immediate_context(&self) -> Result<Self::Context, DriverError> {
        let context = self.device.immediate_context()?;
        Ok(self.shim.hook_context(context))
    }

    fn create_deferred_context(&self) -> Result<Self::Context, DriverError> {
        let context = self.device.create_deferred_context()?;
        Ok(self.shim.hook_context(context))
    }
}

/// Rewritten description for staging resources, `None` for anything else.
pub fn promote_staging_access(desc: &RawResourceDesc) -> Option<RawResourceDesc> {
    if desc.usage() != Some(Usage::Staging) {
        return None;
    }
    let mut promoted = *desc;
    promoted.set_cpu_access_flags(D3D11_CPU_ACCESS_READ | D3D11_CPU_ACCESS_WRITE);
    Some(promoted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::d3d::*;

    #[test]
    fn test_promotes_staging_only() {
        let staging = RawResourceDesc::Buffer(BufferDesc {
            byte_width: 16,
            usage: Usage::Staging,
            cpu_access_flags: D3D11_CPU_ACCESS_WRITE,
            ..Default::default()
        });
        let RawResourceDesc::Buffer(promoted) = promote_staging_access(&staging).unwrap() else {
            panic!("promotion changed dimension");
        };
        assert_eq!(promoted.cpu_access_flags, D3D11_CPU_ACCESS_READ | D3D11_CPU_ACCESS_WRITE);

        let dynamic = RawResourceDesc::Buffer(BufferDesc {
            byte_width: 16,
            usage: Usage::Dynamic,
            cpu_access_flags: D3D11_CPU_ACCESS_WRITE,
            ..Default::default()
        });
        assert_eq!(promote_staging_access(&dynamic), None);
        assert_eq!(promote_staging_access(&RawResourceDesc::Unknown(5)), None);
    }
}
