//! Region/Box Arithmetic
//!
//! Full-extent boxes per subresource and clipping of a source/destination
//! box pair to their mutual overlap.

use crate::descriptor::ResourceDescriptor;

/// Axis-aligned copy region, D3D11_BOX layout (right/bottom/back exclusive).
///
/// Buffers use only the x axis, in bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CopyBox {
    pub left: u32,
    pub top: u32,
    pub front: u32,
    pub right: u32,
    pub bottom: u32,
    pub back: u32,
}

/// Destination position of a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Origin {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Origin {
    pub const ZERO: Self = Self { x: 0, y: 0, z: 0 };

    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }
}

impl CopyBox {
    pub fn new(left: u32, top: u32, front: u32, right: u32, bottom: u32, back: u32) -> Self {
        Self { left, top, front, right, bottom, back }
    }

    /// Box of the given extent anchored at `origin`.
    pub fn at(origin: Origin, width: u32, height: u32, depth: u32) -> Self {
        Self {
            left: origin.x,
            top: origin.y,
            front: origin.z,
            right: origin.x + width,
            bottom: origin.y + height,
            back: origin.z + depth,
        }
    }

    pub fn origin(&self) -> Origin {
        Origin::new(self.left, self.top, self.front)
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn depth(&self) -> u32 {
        self.back.saturating_sub(self.front)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0 || self.depth() == 0
    }

    /// Overlap of two boxes; zero-volume when they are disjoint.
    pub fn intersect(&self, other: &CopyBox) -> CopyBox {
        CopyBox {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            front: self.front.max(other.front),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
            back: self.back.min(other.back),
        }
    }
}

/// Box covering the whole mip level addressed by `subresource`.
pub fn full_extent_box(desc: &ResourceDescriptor, subresource: u32) -> CopyBox {
    let mip = subresource % desc.mips.max(1);
    let extent = |dim: u32| dim.checked_shr(mip).unwrap_or(0).max(1);

    CopyBox::new(0, 0, 0, extent(desc.width), extent(desc.height), extent(desc.depth))
}

/// Clipped source and destination boxes of one copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClippedRegion {
    pub src: CopyBox,
    pub dst: CopyBox,
}

impl ClippedRegion {
    pub fn width(&self) -> u32 {
        self.src.width()
    }

    pub fn height(&self) -> u32 {
        self.src.height()
    }

    pub fn depth(&self) -> u32 {
        self.src.depth()
    }

    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }
}

/// Clip `src_box` against the part of `dst_box` at or after `dst_origin`.
///
/// Both resulting boxes share one extent; a destination origin outside
/// `dst_box` yields a zero-volume region.
pub fn clip(src_box: &CopyBox, dst_box: &CopyBox, dst_origin: Origin) -> ClippedRegion {
    let w = src_box.width().min(dst_box.right.saturating_sub(dst_origin.x));
    let h = src_box.height().min(dst_box.bottom.saturating_sub(dst_origin.y));
    let d = src_box.depth().min(dst_box.back.saturating_sub(dst_origin.z));

    ClippedRegion {
        src: CopyBox::at(src_box.origin(), w, h, d),
        dst: CopyBox::at(dst_origin, w, h, d),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::d3d::*;
    use crate::descriptor::ResourceDimension;

    fn texture(width: u32, height: u32, depth: u32, mips: u32) -> ResourceDescriptor {
        ResourceDescriptor {
            dimension: ResourceDimension::Texture3D,
            format: DXGI_FORMAT_R8G8B8A8_UNORM,
            width,
            height,
            depth,
            layers: 1,
            mips,
            usage: Usage::Default,
            bind_flags: 0,
            misc_flags: 0,
            cpu_access_flags: 0,
        }
    }

    #[test]
    fn test_full_extent_never_zero() {
        let desc = texture(256, 64, 8, 9);
        for mip in 0..9 {
            let b = full_extent_box(&desc, mip);
            assert_eq!(b.width(), (256 >> mip).max(1));
            assert_eq!(b.height(), (64 >> mip).max(1));
            assert_eq!(b.depth(), (8 >> mip).max(1));
            assert!(!b.is_empty());
        }
    }

    #[test]
    fn test_full_extent_wraps_on_mip_count() {
        // Subresource 5 of a 4-mip array is layer 1, mip 1.
        let desc = texture(16, 16, 1, 4);
        assert_eq!(full_extent_box(&desc, 5), CopyBox::new(0, 0, 0, 8, 8, 1));
    }

    #[test]
    fn test_full_extent_huge_mip_clamps() {
        let desc = texture(16, 16, 1, 40);
        assert_eq!(full_extent_box(&desc, 35), CopyBox::new(0, 0, 0, 1, 1, 1));
    }

    #[test]
    fn test_clip_to_destination() {
        let src = CopyBox::new(0, 0, 0, 100, 100, 1);
        let dst = CopyBox::new(0, 0, 0, 64, 64, 1);
        let region = clip(&src, &dst, Origin::new(16, 8, 0));

        assert_eq!(region.src, CopyBox::new(0, 0, 0, 48, 56, 1));
        assert_eq!(region.dst, CopyBox::new(16, 8, 0, 64, 64, 1));
    }

    #[test]
    fn test_clip_keeps_source_origin() {
        let src = CopyBox::new(10, 20, 0, 14, 30, 1);
        let dst = CopyBox::new(0, 0, 0, 64, 64, 1);
        let region = clip(&src, &dst, Origin::ZERO);

        assert_eq!(region.src, src);
        assert_eq!(region.dst, CopyBox::new(0, 0, 0, 4, 10, 1));
    }

    #[test]
    fn test_clip_never_grows() {
        let sources = [
            CopyBox::new(0, 0, 0, 1, 1, 1),
            CopyBox::new(3, 0, 0, 9, 4, 2),
            CopyBox::new(0, 5, 1, 32, 7, 3),
            CopyBox::new(0, 0, 0, 256, 256, 1),
        ];
        // Destination boxes are full extents, always anchored at zero.
        let destinations = [
            CopyBox::new(0, 0, 0, 1, 1, 1),
            CopyBox::new(0, 0, 0, 9, 4, 2),
            CopyBox::new(0, 0, 0, 256, 256, 1),
        ];
        for src in &sources {
            for dst in &destinations {
                for origin in [Origin::ZERO, Origin::new(2, 2, 0), Origin::new(300, 0, 0)] {
                    let region = clip(src, dst, origin);
                    assert!(region.width() <= src.width());
                    assert!(region.height() <= src.height());
                    assert!(region.depth() <= src.depth());
                    assert!(region.width() <= dst.width());
                    assert!(region.height() <= dst.height());
                    assert!(region.depth() <= dst.depth());
                    assert_eq!(region.src.width(), region.dst.width());
                }
            }
        }
    }

    #[test]
    fn test_intersect_limits_box_to_extent() {
        let extent = CopyBox::new(0, 0, 0, 2, 2, 1);
        assert_eq!(CopyBox::new(0, 0, 0, 64, 64, 1).intersect(&extent), extent);
        assert_eq!(CopyBox::new(1, 0, 0, 3, 1, 4).intersect(&extent), CopyBox::new(1, 0, 0, 2, 1, 1));
        assert!(CopyBox::new(4, 4, 0, 8, 8, 1).intersect(&extent).is_empty());
    }

    #[test]
    fn test_clip_disjoint_is_empty() {
        let src = CopyBox::new(0, 0, 0, 16, 16, 1);
        let dst = CopyBox::new(0, 0, 0, 16, 16, 1);
        let region = clip(&src, &dst, Origin::new(16, 0, 0));

        assert!(region.is_empty());
        assert_eq!(region.width(), 0);
    }
}
