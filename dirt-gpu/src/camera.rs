use bytemuck::{Pod, Zeroable};
use glam::{vec3, Mat4, UVec2, Vec2, Vec3, Vec4, Vec4Swizzles};

/// Perspective camera, as seen by per-pixel passes.
///
/// Everything here works in view space, with the camera sitting at origin
/// and looking down `-Z`; pixel coordinates grow rightwards and upwards.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Camera {
    pub projection: Mat4,

    /// Maps view-space points straight into (homogeneous) pixel coordinates.
    pub pixel_projection: Mat4,

    /// See: [`Self::pixel_projection`].
    pub pixel_to_view: Mat4,

    /// x - screen width
    /// y - screen height
    /// z - distance to the near plane
    /// w - distance to the far plane
    pub screen: Vec4,
}

impl Camera {
    pub fn new(
        projection: Mat4,
        screen_size: UVec2,
        near: f32,
        far: f32,
    ) -> Self {
        let half_size = screen_size.as_vec2() * 0.5;

        let pixel_projection = Mat4::from_translation(half_size.extend(0.0))
            * Mat4::from_scale(half_size.extend(1.0))
            * projection;

        Self {
            projection,
            pixel_projection,
            pixel_to_view: pixel_projection.inverse(),
            screen: screen_size.as_vec2().extend(near).extend(far),
        }
    }

    pub fn perspective(
        fov_y: f32,
        screen_size: UVec2,
        near: f32,
        far: f32,
    ) -> Self {
        let aspect = screen_size.x as f32 / screen_size.y as f32;

        Self::new(
            Mat4::perspective_rh_gl(fov_y, aspect, near, far),
            screen_size,
            near,
            far,
        )
    }

    pub fn screen_size(&self) -> UVec2 {
        self.screen.xy().as_uvec2()
    }

    pub fn near(&self) -> f32 {
        self.screen.z
    }

    pub fn far(&self) -> f32 {
        self.screen.w
    }

    /// Given a point in view-coordinates, returns it in homogeneous
    /// pixel-coordinates.
    pub fn view_to_pixel(&self, pos: Vec3) -> Vec4 {
        self.pixel_projection * pos.extend(1.0)
    }

    /// Returns the view-space point seen through given pixel position at
    /// given view-space depth.
    pub fn reconstruct(&self, pixel: Vec2, view_z: f32) -> Vec3 {
        let pos = self.pixel_to_view.project_point3(pixel.extend(0.0));

        pos * (view_z / pos.z)
    }

    /// Returns the center of given pixel.
    pub fn pixel_center(pos: UVec2) -> Vec2 {
        pos.as_vec2() + 0.5
    }

    /// Direction from the camera towards given pixel.
    pub fn view_dir(&self, pixel: Vec2) -> Vec3 {
        self.reconstruct(pixel, -1.0).normalize_or_zero()
    }

    /// Converts post-projective depth (`0.0` at the near plane, `1.0` at the
    /// far one) into view-space Z.
    pub fn depth_to_view_z(&self, depth: f32) -> f32 {
        self.pixel_to_view
            .project_point3(vec3(0.0, 0.0, depth * 2.0 - 1.0))
            .z
    }

    /// See: [`Self::depth_to_view_z()`].
    pub fn view_z_to_depth(&self, view_z: f32) -> f32 {
        let pos = self.view_to_pixel(vec3(0.0, 0.0, view_z));

        pos.z / pos.w * 0.5 + 0.5
    }
}

/// Normals of the near and far clipping planes, in view space.
pub const NEAR_PLANE_NORMAL: Vec3 = vec3(0.0, 0.0, -1.0);
pub const FAR_PLANE_NORMAL: Vec3 = vec3(0.0, 0.0, 1.0);
