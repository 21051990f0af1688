mod u32_ext;
mod vec3_ext;

use core::ops;

use glam::{Vec2, Vec4};

pub use self::u32_ext::*;
pub use self::vec3_ext::*;

/// Linearly interpolates between `a` and `b`; `t` is not clamped, so it can
/// be used to extrapolate as well.
pub fn mix<T>(a: T, b: T, t: f32) -> T
where
    T: ops::Add<Output = T>,
    T: ops::Sub<Output = T>,
    T: ops::Mul<f32, Output = T>,
    T: Copy,
{
    a + (b - a) * t
}

/// Packs a color into a `u32`, one byte per channel, red in the lowest byte.
pub fn pack_unorm4x8(val: Vec4) -> u32 {
    let val = (val.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round().as_uvec4();

    u32::from_bytes([val.x, val.y, val.z, val.w])
}

/// See: [`pack_unorm4x8()`].
pub fn unpack_unorm4x8(val: u32) -> Vec4 {
    let [x, y, z, w] = val.to_bytes();

    glam::uvec4(x, y, z, w).as_vec4() / 255.0
}

/// Packs two `0.0..=1.0` values into a `u32`, 16 bits each.
pub fn pack_unorm2x16(val: Vec2) -> u32 {
    let val = (val.clamp(Vec2::ZERO, Vec2::ONE) * 65535.0).round().as_uvec2();

    u32::from_halves([val.x, val.y])
}

/// See: [`pack_unorm2x16()`].
pub fn unpack_unorm2x16(val: u32) -> Vec2 {
    let [x, y] = val.to_halves();

    glam::uvec2(x, y).as_vec2() / 65535.0
}
