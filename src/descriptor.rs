//! Resource Descriptor Extractor
//!
//! Normalizes the dimension-specific driver description of a resource
//! into one flat descriptor the rest of the shim works with.

use tracing::warn;

use crate::d3d::*;
use crate::driver::{DriverError, GpuResource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceDimension {
    Buffer,
    Texture1D,
    Texture2D,
    Texture3D,
}

/// Normalized view of a buffer or texture description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub dimension: ResourceDimension,
    pub format: DxgiFormat,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub layers: u32,
    pub mips: u32,
    pub usage: Usage,
    pub bind_flags: u32,
    pub misc_flags: u32,
    pub cpu_access_flags: u32,
}

impl ResourceDescriptor {
    /// Describe a resource through the driver.
    pub fn of<R: GpuResource>(resource: &R) -> Result<Self, DriverError> {
        Self::from_raw(&resource.description())
    }

    pub fn from_raw(raw: &RawResourceDesc) -> Result<Self, DriverError> {
        match *raw {
            RawResourceDesc::Buffer(d) => Ok(Self {
                dimension: ResourceDimension::Buffer,
                format: DXGI_FORMAT_UNKNOWN,
                width: d.byte_width,
                height: 1,
                depth: 1,
                layers: 1,
                mips: 1,
                usage: d.usage,
                bind_flags: d.bind_flags,
                misc_flags: d.misc_flags,
                cpu_access_flags: d.cpu_access_flags,
            }),
            RawResourceDesc::Texture1D(d) => Ok(Self {
                dimension: ResourceDimension::Texture1D,
                format: d.format,
                width: d.width,
                height: 1,
                depth: 1,
                layers: d.array_size,
                mips: d.mip_levels,
                usage: d.usage,
                bind_flags: d.bind_flags,
                misc_flags: d.misc_flags,
                cpu_access_flags: d.cpu_access_flags,
            }),
            RawResourceDesc::Texture2D(d) => Ok(Self {
                dimension: ResourceDimension::Texture2D,
                format: d.format,
                width: d.width,
                height: d.height,
                depth: 1,
                layers: d.array_size,
                mips: d.mip_levels,
                usage: d.usage,
                bind_flags: d.bind_flags,
                misc_flags: d.misc_flags,
                cpu_access_flags: d.cpu_access_flags,
            }),
            RawResourceDesc::Texture3D(d) => Ok(Self {
                dimension: ResourceDimension::Texture3D,
                format: d.format,
                width: d.width,
                height: d.height,
                depth: d.depth,
                layers: 1,
                mips: d.mip_levels,
                usage: d.usage,
                bind_flags: d.bind_flags,
                misc_flags: d.misc_flags,
                cpu_access_flags: d.cpu_access_flags,
            }),
            RawResourceDesc::Unknown(dim) => {
                warn!("Unhandled resource dimension {}", dim);
                Err(DriverError::UnsupportedDimension(dim))
            }
        }
    }

    pub fn is_buffer(&self) -> bool {
        self.dimension == ResourceDimension::Buffer
    }

    fn is_simple(&self) -> bool {
        self.layers == 1 && self.mips == 1
    }

    /// Whether the fast path may write this resource through a CPU mapping.
    pub fn is_cpu_writable(&self) -> bool {
        matches!(self.usage, Usage::Staging | Usage::Dynamic)
            && self.cpu_access_flags & D3D11_CPU_ACCESS_WRITE != 0
            && self.is_simple()
    }

    /// Whether the fast path may read this resource through a CPU mapping.
    pub fn is_cpu_readable(&self) -> bool {
        self.usage == Usage::Staging
            && self.cpu_access_flags & D3D11_CPU_ACCESS_READ != 0
            && self.is_simple()
    }
}

/// Description of the staging twin used as a shadow for `raw`.
///
/// Same shape and format, staging usage, CPU read+write, no bind or misc
/// flags.
pub fn staging_twin(raw: &RawResourceDesc) -> Result<RawResourceDesc, DriverError> {
    const CPU_RW: u32 = D3D11_CPU_ACCESS_READ | D3D11_CPU_ACCESS_WRITE;

    match *raw {
        RawResourceDesc::Buffer(d) => Ok(RawResourceDesc::Buffer(BufferDesc {
            usage: Usage::Staging,
            bind_flags: 0,
            misc_flags: 0,
            cpu_access_flags: CPU_RW,
            structure_byte_stride: 0,
            ..d
        })),
        RawResourceDesc::Texture1D(d) => Ok(RawResourceDesc::Texture1D(Texture1DDesc {
            usage: Usage::Staging,
            bind_flags: 0,
            misc_flags: 0,
            cpu_access_flags: CPU_RW,
            ..d
        })),
        RawResourceDesc::Texture2D(d) => Ok(RawResourceDesc::Texture2D(Texture2DDesc {
            usage: Usage::Staging,
            bind_flags: 0,
            misc_flags: 0,
            cpu_access_flags: CPU_RW,
            ..d
        })),
        RawResourceDesc::Texture3D(d) => Ok(RawResourceDesc::Texture3D(Texture3DDesc {
            usage: Usage::Staging,
            bind_flags: 0,
            misc_flags: 0,
            cpu_access_flags: CPU_RW,
            ..d
        })),
        RawResourceDesc::Unknown(dim) => {
            warn!("Unhandled resource dimension {}", dim);
            Err(DriverError::UnsupportedDimension(dim))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tex2d(usage: Usage, cpu: u32, array_size: u32, mips: u32) -> RawResourceDesc {
        RawResourceDesc::Texture2D(Texture2DDesc {
            width: 128,
            height: 64,
            mip_levels: mips,
            array_size,
            format: DXGI_FORMAT_R8G8B8A8_UNORM,
            usage,
            cpu_access_flags: cpu,
            ..Default::default()
        })
    }

    #[test]
    fn test_buffer_is_flat() {
        let raw = RawResourceDesc::Buffer(BufferDesc {
            byte_width: 4096,
            usage: Usage::Dynamic,
            bind_flags: D3D11_BIND_CONSTANT_BUFFER,
            cpu_access_flags: D3D11_CPU_ACCESS_WRITE,
            ..Default::default()
        });
        let desc = ResourceDescriptor::from_raw(&raw).unwrap();

        assert_eq!(desc.dimension, ResourceDimension::Buffer);
        assert_eq!(desc.format, DXGI_FORMAT_UNKNOWN);
        assert_eq!(desc.width, 4096);
        assert_eq!((desc.height, desc.depth, desc.layers, desc.mips), (1, 1, 1, 1));
        assert!(desc.is_cpu_writable());
        assert!(!desc.is_cpu_readable());
    }

    #[test]
    fn test_texture3d_has_single_layer() {
        let raw = RawResourceDesc::Texture3D(Texture3DDesc {
            width: 32,
            height: 16,
            depth: 8,
            mip_levels: 1,
            format: DXGI_FORMAT_R32_FLOAT,
            ..Default::default()
        });
        let desc = ResourceDescriptor::from_raw(&raw).unwrap();

        assert_eq!((desc.width, desc.height, desc.depth, desc.layers), (32, 16, 8, 1));
    }

    #[test]
    fn test_unknown_dimension_rejected() {
        assert_eq!(
            ResourceDescriptor::from_raw(&RawResourceDesc::Unknown(9)),
            Err(DriverError::UnsupportedDimension(9))
        );
    }

    #[test]
    fn test_cpu_access_predicates() {
        let rw = D3D11_CPU_ACCESS_READ | D3D11_CPU_ACCESS_WRITE;
        let desc = |raw| ResourceDescriptor::from_raw(&raw).unwrap();

        assert!(desc(tex2d(Usage::Staging, D3D11_CPU_ACCESS_WRITE, 1, 1)).is_cpu_writable());
        assert!(!desc(tex2d(Usage::Staging, D3D11_CPU_ACCESS_WRITE, 1, 1)).is_cpu_readable());
        assert!(desc(tex2d(Usage::Staging, rw, 1, 1)).is_cpu_readable());
        assert!(desc(tex2d(Usage::Dynamic, D3D11_CPU_ACCESS_WRITE, 1, 1)).is_cpu_writable());
        assert!(!desc(tex2d(Usage::Default, rw, 1, 1)).is_cpu_writable());
        assert!(!desc(tex2d(Usage::Staging, rw, 2, 1)).is_cpu_writable());
        assert!(!desc(tex2d(Usage::Staging, rw, 1, 3)).is_cpu_readable());
    }

    #[test]
    fn test_staging_twin() {
        let raw = RawResourceDesc::Texture2D(Texture2DDesc {
            width: 256,
            height: 256,
            format: DXGI_FORMAT_R8G8B8A8_UNORM,
            bind_flags: D3D11_BIND_RENDER_TARGET | D3D11_BIND_SHADER_RESOURCE,
            misc_flags: D3D11_RESOURCE_MISC_GENERATE_MIPS,
            ..Default::default()
        });

        let RawResourceDesc::Texture2D(twin) = staging_twin(&raw).unwrap() else {
            panic!("twin changed dimension");
        };
        assert_eq!(twin.usage, Usage::Staging);
        assert_eq!(twin.bind_flags, 0);
        assert_eq!(twin.misc_flags, 0);
        assert_eq!(twin.cpu_access_flags, D3D11_CPU_ACCESS_READ | D3D11_CPU_ACCESS_WRITE);
        assert_eq!((twin.width, twin.height, twin.format), (256, 256, DXGI_FORMAT_R8G8B8A8_UNORM));
    }

    #[test]
    fn test_staging_twin_clears_structure_stride() {
        let raw = RawResourceDesc::Buffer(BufferDesc {
            byte_width: 64,
            misc_flags: D3D11_RESOURCE_MISC_BUFFER_STRUCTURED,
            structure_byte_stride: 16,
            bind_flags: D3D11_BIND_UNORDERED_ACCESS,
            ..Default::default()
        });

        let RawResourceDesc::Buffer(twin) = staging_twin(&raw).unwrap() else {
            panic!("twin changed dimension");
        };
        assert_eq!(twin.structure_byte_stride, 0);
        assert_eq!(twin.byte_width, 64);
    }
}
