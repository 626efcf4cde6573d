//! Shim state
//!
//! The one object shared by every hooked device and context: configuration,
//! the shadow registry, the hook-installation lock and the counters.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use crate::config::Config;
use crate::context::HookedContext;
use crate::device::HookedDevice;
use crate::driver::{GpuContext, GpuDevice};
use crate::shadow::ShadowRegistry;
use crate::stats::{CopyStats, CopyStatsSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum HookTarget {
    Device,
    Context,
}

/// Records which devices and contexts have been seen.
#[derive(Debug, Default)]
struct HookInstaller {
    installed: Mutex<HashSet<(HookTarget, usize)>>,
}

impl HookInstaller {
    /// Returns true the first time `identity` is seen for `target`.
    fn install(&self, target: HookTarget, identity: usize) -> bool {
        let mut installed = self.installed.lock().unwrap_or_else(PoisonError::into_inner);
        installed.insert((target, identity))
    }
}

#[derive(Debug)]
pub struct Shim {
    config: Config,
    stats: Arc<CopyStats>,
    registry: ShadowRegistry,
    hooks: HookInstaller,
}

impl Shim {
    pub fn new(config: Config) -> Arc<Self> {
        let stats = Arc::new(CopyStats::new());
        Arc::new(Self {
            config,
            registry: ShadowRegistry::new(stats.clone()),
            stats,
            hooks: HookInstaller::default(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ShadowRegistry {
        &self.registry
    }

    pub fn copy_stats(&self) -> &CopyStats {
        &self.stats
    }

    pub fn stats(&self) -> CopyStatsSnapshot {
        self.stats.snapshot()
    }

    /// Wrap a device the application just created.
    pub fn hook_device<D: GpuDevice>(self: &Arc<Self>, device: D) -> HookedDevice<D> {
        if self.hooks.install(HookTarget::Device, device.identity()) {
            info!("Hooking device {:#x}", device.identity());
        }
        HookedDevice::new(self.clone(), device)
    }

    /// Wrap a context obtained from a device.
    pub fn hook_context<C: GpuContext>(self: &Arc<Self>, context: C) -> HookedContext<C> {
        if self.hooks.install(HookTarget::Context, context.identity()) {
            info!(
                "Hooking {:?} context {:#x}",
                context.context_type(),
                context.identity()
            );
        }
        HookedContext::new(self.clone(), context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_installer_reports_first_install_only() {
        let hooks = HookInstaller::default();
        assert!(hooks.install(HookTarget::Device, 0x1000));
        assert!(!hooks.install(HookTarget::Device, 0x1000));
        assert!(hooks.install(HookTarget::Context, 0x1000));
        assert!(hooks.install(HookTarget::Device, 0x2000));
    }
}
