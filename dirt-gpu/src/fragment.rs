use bytemuck::{Pod, Zeroable};
use glam::{vec2, Vec3, Vec4};

use crate::{
    pack_unorm2x16, pack_unorm4x8, unpack_unorm2x16, unpack_unorm4x8, Normal,
};

/// Something that can be ordered by a sorter.
pub trait Sortable: Copy {
    type Key: Copy + PartialOrd;

    fn key(&self) -> Self::Key;
}

/// A single visibility sample recorded at a pixel.
///
/// Depending on the pass, `payload` is either a packed RGBA8 color (see
/// [`Self::with_color()`]) or an index into the attribute buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Fragment {
    pub payload: u32,
    pub depth: f32,
}

impl Fragment {
    pub fn new(depth: f32, payload: u32) -> Self {
        Self { payload, depth }
    }

    pub fn with_color(depth: f32, color: Vec4) -> Self {
        Self::new(depth, pack_unorm4x8(color))
    }

    pub fn color(&self) -> Vec4 {
        unpack_unorm4x8(self.payload)
    }

    /// Packs this fragment into a single `u64`, so that it can be stored in
    /// an atomic slot.
    pub fn pack(self) -> u64 {
        ((self.depth.to_bits() as u64) << 32) | (self.payload as u64)
    }

    /// See: [`Self::pack()`].
    pub fn unpack(d0: u64) -> Self {
        Self {
            payload: d0 as u32,
            depth: f32::from_bits((d0 >> 32) as u32),
        }
    }
}

impl Sortable for Fragment {
    type Key = f32;

    fn key(&self) -> f32 {
        self.depth
    }
}

/// Node of a per-pixel linked list; nodes live in one pool shared by the
/// entire screen and `next` points at the next node of the same pixel.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LinkedFragment {
    pub fragment: Fragment,
    pub next: u32,
}

impl LinkedFragment {
    /// Value of `next` (and of a pixel's head) marking the end of a list.
    pub const END: u32 = u32::MAX;

    pub fn new(fragment: Fragment, next: u32) -> Self {
        Self { fragment, next }
    }

    pub fn is_last(&self) -> bool {
        self.next == Self::END
    }
}

impl Sortable for LinkedFragment {
    type Key = f32;

    fn key(&self) -> f32 {
        self.fragment.depth
    }
}

/// Fragment of the global sorted buffer, keyed by a packed `u32`.
///
/// Sorting and deduplication look at `key` only; see [`Self::pack_key()`] for
/// the layout produced by the geometry pass.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct PackedFragment {
    pub payload: u32,
    pub key: u32,
}

impl PackedFragment {
    const ID_BITS: u32 = 8;
    const DEPTH_MAX: u32 = (1 << (32 - Self::ID_BITS)) - 1;

    pub fn new(key: u32, payload: u32) -> Self {
        Self { payload, key }
    }

    /// Packs a `0.0..=1.0` depth into the upper 24 bits and `id` into the
    /// lower 8 bits, so that ordering keys orders by depth first.
    pub fn pack_key(depth: f32, id: u32) -> u32 {
        let depth = (depth.clamp(0.0, 1.0) * Self::DEPTH_MAX as f32) as u32;

        (depth << Self::ID_BITS) | (id & ((1 << Self::ID_BITS) - 1))
    }

    pub fn depth(&self) -> f32 {
        (self.key >> Self::ID_BITS) as f32 / Self::DEPTH_MAX as f32
    }

    pub fn id(&self) -> u32 {
        self.key & ((1 << Self::ID_BITS) - 1)
    }
}

impl Sortable for PackedFragment {
    type Key = u32;

    fn key(&self) -> u32 {
        self.key
    }
}

/// Shading attributes referenced by [`Fragment::payload`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct FragmentAttributes {
    /// RGBA8 base color.
    pub albedo: u32,

    /// Octahedron-encoded normal, see [`Normal::pack()`].
    pub normal: u32,

    /// RGBA8 specular color; alpha stores glossiness.
    pub specular: u32,

    /// x - index of refraction, divided by four
    /// y - opacity
    pub ior_opacity: u32,
}

impl FragmentAttributes {
    pub fn new(
        albedo: Vec4,
        normal: Vec3,
        specular: Vec4,
        ior: f32,
        opacity: f32,
    ) -> Self {
        Self {
            albedo: pack_unorm4x8(albedo),
            normal: Normal::pack(normal),
            specular: pack_unorm4x8(specular),
            ior_opacity: pack_unorm2x16(vec2(ior / 4.0, opacity)),
        }
    }

    pub fn albedo(&self) -> Vec4 {
        unpack_unorm4x8(self.albedo)
    }

    pub fn normal(&self) -> Vec3 {
        Normal::unpack(self.normal)
    }

    pub fn specular(&self) -> Vec4 {
        unpack_unorm4x8(self.specular)
    }

    pub fn ior(&self) -> f32 {
        unpack_unorm2x16(self.ior_opacity).x * 4.0
    }

    pub fn opacity(&self) -> f32 {
        unpack_unorm2x16(self.ior_opacity).y
    }
}
