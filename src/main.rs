//! stagefix self-test
//!
//! Runs the copy scenarios the shim exists for against the in-memory
//! driver and reports the resulting counters:
//! 1. Staging to staging copy on the immediate context
//! 2. Copy from a GPU-only resource through its shadow
//! 3. The same copy on a deferred context
//! 4. Copy into a destination the GPU still owns
//!
//! Usage: `stagefix [config-path]`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use tracing::info;

use stagefix::config::Config;
use stagefix::d3d::*;
use stagefix::soft::{SoftContext, SoftDevice, SoftResource};
use stagefix::{logging, GpuContext, GpuDevice, HookedContext, HookedDevice, Shim};

const WIDTH: u32 = 256;
const HEIGHT: u32 = 256;

fn texture_desc(usage: Usage, bind_flags: u32, cpu_access_flags: u32) -> RawResourceDesc {
    RawResourceDesc::Texture2D(Texture2DDesc {
        width: WIDTH,
        height: HEIGHT,
        format: DXGI_FORMAT_R8G8B8A8_UNORM,
        usage,
        bind_flags,
        cpu_access_flags,
        ..Default::default()
    })
}

fn test_pattern() -> Vec<u8> {
    (0..WIDTH * HEIGHT * 4).map(|i| (i % 251) as u8).collect()
}

struct SelfTest {
    shim: Arc<Shim>,
    driver: SoftDevice,
    device: HookedDevice<SoftDevice>,
    context: HookedContext<SoftContext>,
}

impl SelfTest {
    fn new(config: Config) -> Result<Self> {
        let shim = Shim::new(config);
        let driver = SoftDevice::new();
        let device = shim.hook_device(driver.clone());
        let context = device.immediate_context()?;
        Ok(Self { shim, driver, device, context })
    }

    fn gpu_copies(&self) -> u64 {
        self.driver.counters().gpu_copies
    }

    fn staging_destination(&self) -> Result<SoftResource> {
        let desc = texture_desc(Usage::Staging, 0, D3D11_CPU_ACCESS_WRITE);
        Ok(self.device.create_resource(&desc, None)?)
    }

    fn staging_source(&self) -> Result<SoftResource> {
        let desc = texture_desc(Usage::Staging, 0, D3D11_CPU_ACCESS_READ);
        Ok(self.device.create_resource(&desc, Some(test_pattern().as_slice()))?)
    }

    /// Staging source and write-only staging destination.
    fn staging_copy(&self) -> Result<()> {
        let src = self.staging_source()?;
        let dst = self.staging_destination()?;

        let before = self.gpu_copies();
        self.context.copy_resource(&dst, &src);

        ensure!(self.gpu_copies() == before, "staging copy went through the GPU");
        ensure!(dst.read_subresource(0) == test_pattern(), "staging copy produced wrong contents");
        info!("Staging copy performed on the CPU");
        Ok(())
    }

    /// Render target source, which the CPU can only read through its shadow.
    fn shadow_copy(&self) -> Result<()> {
        let pattern = test_pattern();
        let desc = texture_desc(Usage::Default, D3D11_BIND_RENDER_TARGET, 0);
        let src = self.device.create_resource(&desc, Some(pattern.as_slice()))?;
        let dst = self.staging_destination()?;

        self.context.copy_resource(&dst, &src);

        ensure!(
            self.shim.registry().lookup(&src).is_some(),
            "no shadow was created for the render target"
        );
        ensure!(dst.read_subresource(0) == pattern, "shadow copy produced wrong contents");
        info!("Render target copy served from its shadow");
        Ok(())
    }

    fn deferred_copy(&self) -> Result<()> {
        let deferred = self.device.create_deferred_context()?;
        let src = self.staging_source()?;
        let dst = self.staging_destination()?;

        let before = self.gpu_copies();
        deferred.copy_resource(&dst, &src);

        ensure!(self.gpu_copies() == before + 1, "deferred copy skipped the GPU");
        info!("Deferred copy left to the GPU");
        Ok(())
    }

    fn busy_copy(&self) -> Result<()> {
        let src = self.staging_source()?;
        let dst = self.staging_destination()?;
        dst.set_gpu_busy(true);

        let before = self.gpu_copies();
        let busy_before = self.shim.stats().fast_copies_busy;
        self.context.copy_resource(&dst, &src);

        ensure!(self.gpu_copies() == before + 1, "busy destination did not fall back to the GPU");
        ensure!(
            self.shim.stats().fast_copies_busy == busy_before + 1,
            "busy destination was not counted"
        );
        info!("Busy destination fell back to the GPU");
        Ok(())
    }
}

fn main() -> Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    logging::init(&config)?;
    info!("stagefix self-test starting");
    info!("Configuration loaded: {:?}", config);

    let test = SelfTest::new(config.clone())?;

    if config.fast_path {
        test.staging_copy()?;
        if config.shadow_resources {
            test.shadow_copy()?;
        }
        test.busy_copy()?;
    }
    test.deferred_copy()?;

    let stats = test.shim.stats();
    info!(
        "Fast copies: {} applied, {} busy, {} declined; {} GPU fallbacks",
        stats.fast_copies_applied, stats.fast_copies_busy, stats.fast_copies_declined, stats.gpu_fallbacks
    );
    info!(
        "Shadows: {} created, {} failed, {} refreshes",
        stats.shadows_created, stats.shadow_creation_failures, stats.shadow_refreshes
    );
    info!("stagefix self-test passed");

    Ok(())
}
