//! D3D11 / DXGI bindings
//!
//! Manual Rust mirror of the subset of D3D11 and DXGI enumerations and
//! description structs the shim reasons about. Values match the native
//! headers so the Windows backend can convert with plain casts.

// =============================================================================
// DXGI Formats
// =============================================================================

pub type DxgiFormat = u32;

pub const DXGI_FORMAT_UNKNOWN: DxgiFormat = 0;
pub const DXGI_FORMAT_R32G32B32A32_TYPELESS: DxgiFormat = 1;
pub const DXGI_FORMAT_R32G32B32A32_FLOAT: DxgiFormat = 2;
pub const DXGI_FORMAT_R32G32B32A32_UINT: DxgiFormat = 3;
pub const DXGI_FORMAT_R32G32B32A32_SINT: DxgiFormat = 4;
pub const DXGI_FORMAT_R32G32B32_TYPELESS: DxgiFormat = 5;
pub const DXGI_FORMAT_R32G32B32_SINT: DxgiFormat = 8;
pub const DXGI_FORMAT_R16G16B16A16_TYPELESS: DxgiFormat = 9;
pub const DXGI_FORMAT_R16G16B16A16_FLOAT: DxgiFormat = 10;
pub const DXGI_FORMAT_R32G32_SINT: DxgiFormat = 18;
pub const DXGI_FORMAT_R32G8X24_TYPELESS: DxgiFormat = 19;
pub const DXGI_FORMAT_R10G10B10A2_TYPELESS: DxgiFormat = 23;
pub const DXGI_FORMAT_R8G8B8A8_TYPELESS: DxgiFormat = 27;
pub const DXGI_FORMAT_R8G8B8A8_UNORM: DxgiFormat = 28;
pub const DXGI_FORMAT_R8G8B8A8_UNORM_SRGB: DxgiFormat = 29;
pub const DXGI_FORMAT_R8G8B8A8_UINT: DxgiFormat = 30;
pub const DXGI_FORMAT_R32_TYPELESS: DxgiFormat = 39;
pub const DXGI_FORMAT_R32_FLOAT: DxgiFormat = 41;
pub const DXGI_FORMAT_R32_UINT: DxgiFormat = 42;
pub const DXGI_FORMAT_R32_SINT: DxgiFormat = 43;
pub const DXGI_FORMAT_R8G8_TYPELESS: DxgiFormat = 48;
pub const DXGI_FORMAT_R16_FLOAT: DxgiFormat = 54;
pub const DXGI_FORMAT_R16_SINT: DxgiFormat = 59;
pub const DXGI_FORMAT_R8_TYPELESS: DxgiFormat = 60;
pub const DXGI_FORMAT_R8_UNORM: DxgiFormat = 61;
pub const DXGI_FORMAT_A8_UNORM: DxgiFormat = 65;
pub const DXGI_FORMAT_BC1_UNORM: DxgiFormat = 71;
pub const DXGI_FORMAT_B8G8R8A8_UNORM: DxgiFormat = 87;
pub const DXGI_FORMAT_B8G8R8X8_UNORM_SRGB: DxgiFormat = 93;

// =============================================================================
// Usage, Bind and CPU Access
// =============================================================================

/// D3D11_USAGE
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Usage {
    #[default]
    Default = 0,
    Immutable = 1,
    Dynamic = 2,
    Staging = 3,
}

impl Usage {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Default),
            1 => Some(Self::Immutable),
            2 => Some(Self::Dynamic),
            3 => Some(Self::Staging),
            _ => None,
        }
    }
}

pub const D3D11_BIND_VERTEX_BUFFER: u32 = 0x1;
pub const D3D11_BIND_INDEX_BUFFER: u32 = 0x2;
pub const D3D11_BIND_CONSTANT_BUFFER: u32 = 0x4;
pub const D3D11_BIND_SHADER_RESOURCE: u32 = 0x8;
pub const D3D11_BIND_RENDER_TARGET: u32 = 0x20;
pub const D3D11_BIND_DEPTH_STENCIL: u32 = 0x40;
pub const D3D11_BIND_UNORDERED_ACCESS: u32 = 0x80;

pub const D3D11_CPU_ACCESS_WRITE: u32 = 0x10000;
pub const D3D11_CPU_ACCESS_READ: u32 = 0x20000;

pub const D3D11_RESOURCE_MISC_GENERATE_MIPS: u32 = 0x1;
pub const D3D11_RESOURCE_MISC_BUFFER_STRUCTURED: u32 = 0x40;

// =============================================================================
// Map Types
// =============================================================================

/// D3D11_MAP
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapType {
    Read = 1,
    Write = 2,
    ReadWrite = 3,
    WriteDiscard = 4,
    WriteNoOverwrite = 5,
}

impl MapType {
    pub fn reads(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    pub fn writes(self) -> bool {
        !matches!(self, Self::Read)
    }
}

pub const D3D11_MAP_FLAG_DO_NOT_WAIT: u32 = 0x100000;

/// DXGI_ERROR_WAS_STILL_DRAWING
pub const DXGI_ERROR_WAS_STILL_DRAWING: i32 = 0x887A000Au32 as i32;

/// D3D11_DEVICE_CONTEXT_TYPE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextType {
    Immediate,
    Deferred,
}

// =============================================================================
// Resource Descriptions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferDesc {
    pub byte_width: u32,
    pub usage: Usage,
    pub bind_flags: u32,
    pub cpu_access_flags: u32,
    pub misc_flags: u32,
    pub structure_byte_stride: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Texture1DDesc {
    pub width: u32,
    pub mip_levels: u32,
    pub array_size: u32,
    pub format: DxgiFormat,
    pub usage: Usage,
    pub bind_flags: u32,
    pub cpu_access_flags: u32,
    pub misc_flags: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Texture2DDesc {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub array_size: u32,
    pub format: DxgiFormat,
    pub sample_count: u32,
    pub sample_quality: u32,
    pub usage: Usage,
    pub bind_flags: u32,
    pub cpu_access_flags: u32,
    pub misc_flags: u32,
}

impl Default for Texture2DDesc {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            mip_levels: 1,
            array_size: 1,
            format: DXGI_FORMAT_UNKNOWN,
            sample_count: 1,
            sample_quality: 0,
            usage: Usage::Default,
            bind_flags: 0,
            cpu_access_flags: 0,
            misc_flags: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Texture3DDesc {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_levels: u32,
    pub format: DxgiFormat,
    pub usage: Usage,
    pub bind_flags: u32,
    pub cpu_access_flags: u32,
    pub misc_flags: u32,
}

/// Dimension-tagged resource description, as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawResourceDesc {
    Buffer(BufferDesc),
    Texture1D(Texture1DDesc),
    Texture2D(Texture2DDesc),
    Texture3D(Texture3DDesc),
    /// Any dimension the shim does not model, carrying the raw value.
    Unknown(u32),
}

impl RawResourceDesc {
    pub fn usage(&self) -> Option<Usage> {
        match self {
            Self::Buffer(d) => Some(d.usage),
            Self::Texture1D(d) => Some(d.usage),
            Self::Texture2D(d) => Some(d.usage),
            Self::Texture3D(d) => Some(d.usage),
            Self::Unknown(_) => None,
        }
    }

    /// Overwrite the CPU access flags. No-op for unknown dimensions.
    pub fn set_cpu_access_flags(&mut self, flags: u32) {
        match self {
            Self::Buffer(d) => d.cpu_access_flags = flags,
            Self::Texture1D(d) => d.cpu_access_flags = flags,
            Self::Texture2D(d) => d.cpu_access_flags = flags,
            Self::Texture3D(d) => d.cpu_access_flags = flags,
            Self::Unknown(_) => {}
        }
    }
}

// =============================================================================
// Views
// =============================================================================

/// D3D11_RTV_DIMENSION with its dimension-specific payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtvDimension {
    Buffer,
    Texture1D { mip_slice: u32 },
    Texture1DArray { mip_slice: u32, first_array_slice: u32, array_size: u32 },
    Texture2D { mip_slice: u32 },
    Texture2DArray { mip_slice: u32, first_array_slice: u32, array_size: u32 },
    Texture2DMs,
    Texture2DMsArray { first_array_slice: u32, array_size: u32 },
    Texture3D { mip_slice: u32, first_w_slice: u32, w_size: u32 },
}

/// D3D11_UAV_DIMENSION with its dimension-specific payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UavDimension {
    Buffer { first_element: u32, num_elements: u32 },
    Texture1D { mip_slice: u32 },
    Texture1DArray { mip_slice: u32, first_array_slice: u32, array_size: u32 },
    Texture2D { mip_slice: u32 },
    Texture2DArray { mip_slice: u32, first_array_slice: u32, array_size: u32 },
    Texture3D { mip_slice: u32, first_w_slice: u32, w_size: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewDesc {
    RenderTarget { format: DxgiFormat, dimension: RtvDimension },
    UnorderedAccess { format: DxgiFormat, dimension: UavDimension },
    /// Shader resource and depth-stencil views; the shim never decodes these.
    Other,
}

// =============================================================================
// Helper Functions
// =============================================================================

/// D3D11CalcSubresource
pub const fn calc_subresource(mip_slice: u32, array_slice: u32, mip_levels: u32) -> u32 {
    mip_slice + array_slice * mip_levels
}
