//! Shadow Resource Registry
//!
//! Associates a base resource with a lazily created staging twin that the
//! CPU can always read without waiting on the GPU. The association lives
//! on the base resource itself, so it is released together with it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error};

use crate::descriptor::staging_twin;
use crate::driver::{GpuContext, GpuDevice, GpuResource};
use crate::stats::CopyStats;

/// Serializes shadow lookups and creations across all contexts.
#[derive(Debug)]
pub struct ShadowRegistry {
    lock: Mutex<()>,
    stats: Arc<CopyStats>,
}

impl ShadowRegistry {
    pub fn new(stats: Arc<CopyStats>) -> Self {
        Self { lock: Mutex::new(()), stats }
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Existing shadow of `resource`, if any.
    pub fn lookup<R: GpuResource>(&self, resource: &R) -> Option<R> {
        let _guard = self.guard();
        resource.shadow()
    }

    /// Existing shadow of `resource`, creating and seeding one if needed.
    ///
    /// `None` means the shadow could not be created; the fast path is then
    /// unavailable for this resource. `context` must be the unhooked
    /// context, since the baseline copy runs under the registry lock.
    /// Outside the crate this is reached through
    /// [`HookedContext::shadow_of`](crate::HookedContext::shadow_of).
    pub(crate) fn get_or_create<C: GpuContext>(&self, context: &C, resource: &C::Resource) -> Option<C::Resource> {
        let _guard = self.guard();

        if let Some(shadow) = resource.shadow() {
            return Some(shadow);
        }

        let shadow = self.create_locked(context, resource);
        if shadow.is_none() {
            self.stats.inc_shadow_creation_failures();
        }
        shadow
    }

    fn create_locked<C: GpuContext>(&self, context: &C, resource: &C::Resource) -> Option<C::Resource> {
        let raw = resource.description();
        let desc = staging_twin(&raw).ok()?;

        let created = context.device().and_then(|device| device.create_resource(&desc, None));
        let shadow = match created {
            Ok(shadow) => shadow,
            Err(e) => {
                error!("Failed to create shadow resource: {}", e);
                return None;
            }
        };

        // Baseline contents; first touch is allowed to go through the GPU.
        context.copy_resource(&shadow, resource);

        if let Err(e) = resource.attach_shadow(&shadow) {
            error!("Failed to attach shadow resource: {}", e);
            return None;
        }

        debug!(
            "Created shadow {:#x} for resource {:#x} ({:?})",
            shadow.identity(),
            resource.identity(),
            raw
        );
        self.stats.inc_shadows_created();
        Some(shadow)
    }
}
