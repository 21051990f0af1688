use glam::{vec3, Vec2, Vec3, Vec3Swizzles};

use crate::{pack_unorm2x16, unpack_unorm2x16};

pub struct Normal;

impl Normal {
    /// Compresses normal from Vec3 into Vec2 using octahedron-normal mapping.
    pub fn encode(n: Vec3) -> Vec2 {
        let n = n / (n.x.abs() + n.y.abs() + n.z.abs());

        let n = if n.z >= 0.0 {
            n.xy()
        } else {
            let mut t = 1.0 - n.yx().abs();

            t.x = t.x.copysign(n.x);
            t.y = t.y.copysign(n.y);
            t
        };

        n * 0.5 + 0.5
    }

    /// See: [`Self::encode()`].
    pub fn decode(n: Vec2) -> Vec3 {
        let n = n * 2.0 - 1.0;
        let mut n = vec3(n.x, n.y, 1.0 - n.x.abs() - n.y.abs());
        let t = (-n.z).max(0.0);

        n.x -= t.copysign(n.x);
        n.y -= t.copysign(n.y);
        n.normalize()
    }

    /// Encodes normal into a single `u32`, as stored in fragment attributes.
    pub fn pack(n: Vec3) -> u32 {
        pack_unorm2x16(Self::encode(n))
    }

    /// See: [`Self::pack()`].
    pub fn unpack(n: u32) -> Vec3 {
        Self::decode(unpack_unorm2x16(n))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const EPSILON: f32 = 0.001;

    #[test]
    fn octahedral() {
        for n in [vec3(0.26, 0.53, 0.80), vec3(0.26, -0.53, -0.80)] {
            let n = n.normalize();
            let target = Normal::unpack(Normal::pack(n));

            assert_relative_eq!(target.x, n.x, epsilon = EPSILON);
            assert_relative_eq!(target.y, n.y, epsilon = EPSILON);
            assert_relative_eq!(target.z, n.z, epsilon = EPSILON);
        }
    }
}
