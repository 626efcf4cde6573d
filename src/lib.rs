//! stagefix
//!
//! D3D11 copy shim. Copies into CPU-accessible staging resources are
//! performed on the CPU when the destination can be mapped without waiting
//! on the GPU, instead of queueing a GPU copy the application is about to
//! stall on. Sources the CPU cannot read are served from lazily created
//! staging shadows that every resource-writing entry point keeps in sync.
//!
//! The shim is written against the driver traits in [`driver`]. The
//! [`soft`] module provides an in-memory driver; on Windows, [`d3d11`]
//! implements the traits on the real D3D11 interfaces.

pub mod config;
pub mod context;
pub mod d3d;
#[cfg(windows)]
pub mod d3d11;
pub mod descriptor;
pub mod device;
pub mod driver;
pub mod fast_copy;
pub mod format;
pub mod logging;
pub mod region;
pub mod shadow;
pub mod shim;
pub mod soft;
pub mod stats;
pub mod view;

pub use config::Config;
pub use context::HookedContext;
pub use device::HookedDevice;
pub use driver::{DriverError, GpuContext, GpuDevice, GpuResource, GpuView, MappedSubresource};
pub use fast_copy::{CopyOutcome, CopyParams, Decline};
pub use region::{CopyBox, Origin};
pub use shadow::ShadowRegistry;
pub use shim::Shim;
pub use stats::{CopyStats, CopyStatsSnapshot};
