use core::mem;

use glam::{vec2, IVec2, Vec2, Vec2Swizzles, Vec3, Vec4, Vec4Swizzles};

use crate::{
    mix, Camera, Vec3Ext, Viewport, ViewportExit, DIRT_EPSILON,
    FAR_PLANE_NORMAL, NEAR_PLANE_NORMAL,
};

/// Storage queried by [`RayMarcher`] at each visited pixel.
pub trait LayerSearch {
    /// Looks for a fragment at `pixel` whose depth lies within `z_min ..=
    /// z_max` and returns its layer.
    ///
    /// `direction` tells whether the ray moves away from the camera (`1`),
    /// towards it (`-1`) or sideways (`0`), so that the lookup can start from
    /// the more promising end of the list.
    fn search(
        &self,
        pixel: IVec2,
        z_min: f32,
        z_max: f32,
        direction: i32,
    ) -> Option<u32>;

    /// Returns payload of a fragment found through [`Self::search()`].
    fn fetch(&self, pixel: IVec2, layer: u32) -> Vec4;
}

/// Interpolated state of a ray, advanced one pixel at a time.
///
/// `p` is the position in (permuted) pixel-coordinates, `q` is the view-space
/// position divided by `w` and `k` is `1 / w` - all three interpolate linearly
/// in screen space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RayState {
    pub p: Vec2,
    pub q: Vec3,
    pub k: f32,
    pub dp: Vec2,
    pub dq: Vec3,
    pub dk: f32,
    pub permuted: bool,
}

impl RayState {
    pub fn advance(&mut self) {
        self.p += self.dp;
        self.q += self.dq;
        self.k += self.dk;
    }

    /// Returns the current position in pixel-coordinates.
    pub fn pixel(&self) -> Vec2 {
        if self.permuted {
            self.p.yx()
        } else {
            self.p
        }
    }

    /// Returns the view-space depth estimated half a step ahead of current
    /// position.
    pub fn depth_estimate(&self) -> f32 {
        self.q.z / (self.k + self.dk * 0.5)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraceHit {
    pub pixel: IVec2,
    pub layer: u32,
    pub value: Vec4,
}

/// Why the march stopped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TraceStop {
    /// Search found a fragment.
    Hit,

    /// Ray walked past its (clipped) end.
    #[default]
    EndReached,

    /// Ray moved towards the camera and got behind it.
    DepthExit,

    /// Ray ran out of the step budget.
    StepLimit,

    /// Ray's projection is shorter than a pixel, so there's nothing to walk.
    Degenerate,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TraceResult {
    pub hit: Option<TraceHit>,
    pub stop: TraceStop,
    pub exit: ViewportExit,
    pub steps: u32,

    /// Screen-space start of the ray.
    pub start: Vec2,

    /// Screen-space end of the ray, after clipping.
    pub end: Vec2,
}

impl TraceResult {
    pub fn is_hit(&self) -> bool {
        self.hit.is_some()
    }

    /// Returns payload of the hit fragment or zero if nothing got hit.
    pub fn value(&self) -> Vec4 {
        self.hit.map(|hit| hit.value).unwrap_or(Vec4::ZERO)
    }
}

/// Walks view-space rays through screen space, pixel by pixel, checking each
/// visited pixel's fragments for an intersection.
///
/// See:
/// - https://jcgt.org/published/0003/04/04/
#[derive(Clone, Copy, Debug)]
pub struct RayMarcher {
    pub camera: Camera,
    pub viewport: Viewport,

    /// Length used for rays that never reach the near or far plane.
    pub scene_length: f32,

    pub max_steps: u32,
}

impl RayMarcher {
    pub fn new(camera: Camera, scene_length: f32, max_steps: u32) -> Self {
        Self {
            camera,
            viewport: Viewport::from_size(camera.screen_size()),
            scene_length,
            max_steps,
        }
    }

    /// Traces ray reflected off a surface at `origin` (view-space) with given
    /// `normal`.
    pub fn trace_reflection<S>(
        &self,
        origin: Vec3,
        normal: Vec3,
        search: &S,
    ) -> TraceResult
    where
        S: LayerSearch + ?Sized,
    {
        let view_dir = origin.normalize_or_zero();

        self.trace(origin, view_dir.reflect(normal.normalize_or_zero()), search)
    }

    pub fn trace<S>(
        &self,
        origin: Vec3,
        direction: Vec3,
        search: &S,
    ) -> TraceResult
    where
        S: LayerSearch + ?Sized,
    {
        let direction = direction.normalize_or_zero();
        let near = self.camera.near();
        let far = self.camera.far();

        // Clip with the near and far plane
        let length_to_near = self.distance_to_plane(
            -(origin.dot(NEAR_PLANE_NORMAL) - near),
            direction.dot(NEAR_PLANE_NORMAL),
        );

        let length_to_far = self.distance_to_plane(
            -(origin.dot(FAR_PLANE_NORMAL) + far),
            direction.dot(FAR_PLANE_NORMAL),
        );

        let end = origin + direction * length_to_near.min(length_to_far);

        // Project into screen space
        let h0 = self.camera.view_to_pixel(origin);
        let h1 = self.camera.view_to_pixel(end);
        let k0 = 1.0 / h0.w;
        let mut k1 = 1.0 / h1.w;
        let q0 = origin * k0;
        let mut q1 = end * k1;
        let mut p0 = h0.xy() * k0;
        let mut p1 = h1.xy() * k1;

        // Positive is away from the camera, negative towards it
        let direction_z = if end.z < origin.z {
            1
        } else if end.z > origin.z {
            -1
        } else {
            0
        };

        let (alpha, exit) = self.viewport.clip(p0, p1);

        p1 = mix(p0, p1, alpha);
        k1 = mix(k0, k1, alpha);
        q1 = mix(q0, q1, alpha);

        let mut result = TraceResult {
            exit,
            start: p0,
            end: p1,
            ..Default::default()
        };

        let mut delta = p1 - p0;

        // Permute, so that the primary iteration happens along x
        let permuted = delta.x.abs() < delta.y.abs();

        if permuted {
            delta = delta.yx();
            p0 = p0.yx();
            p1 = p1.yx();
        }

        if delta.x.abs() < DIRT_EPSILON {
            result.stop = TraceStop::Degenerate;
            return result;
        }

        let step_dir = delta.x.signum();
        let inv_dx = step_dir / delta.x;

        let mut ray = RayState {
            p: p0,
            q: q0,
            k: k0,
            dp: vec2(step_dir, inv_dx * delta.y),
            dq: (q1 - q0) * inv_dx,
            dk: (k1 - k0) * inv_dx,
            permuted,
        };

        let mut prev_z_max = ray.depth_estimate();
        let mut ray_z_max = prev_z_max;

        // `p1.x` doesn't change from now on, so pre-scale it by the step
        // direction for a signed comparison
        let end = p1.x * step_dir;

        // Start at the next pixel's center instead of the current one
        ray.p += ray.dp * 0.5;
        ray.q += ray.dq * 0.5;
        ray.k += ray.dk * 0.5;

        loop {
            if ray.p.x * step_dir > end {
                result.stop = TraceStop::EndReached;
                break;
            }

            if ray_z_max >= 0.0 {
                result.stop = TraceStop::DepthExit;
                break;
            }

            if result.steps >= self.max_steps {
                result.stop = TraceStop::StepLimit;
                break;
            }

            let pixel = ray.pixel().as_ivec2();
            let mut ray_z_min = prev_z_max;

            ray_z_max = ray.depth_estimate();

            // When marching towards the far plane the estimate can cross it,
            // flipping its sign - use the far plane itself in that case
            if direction_z > 0 && ray_z_max >= 0.0 {
                ray_z_max = -far;
            }

            prev_z_max = ray_z_max;

            if ray_z_min > ray_z_max {
                mem::swap(&mut ray_z_min, &mut ray_z_max);
            }

            result.steps += 1;

            if let Some(layer) =
                search.search(pixel, ray_z_min, ray_z_max, direction_z)
            {
                result.stop = TraceStop::Hit;
                result.hit = Some(TraceHit {
                    pixel,
                    layer,
                    value: search.fetch(pixel, layer),
                });

                break;
            }

            ray.advance();
        }

        result
    }

    /// Returns distance along the ray to a plane, falling back to the scene
    /// length for planes that are (almost) parallel to the ray or that lie
    /// behind it.
    fn distance_to_plane(&self, numerator: f32, denominator: f32) -> f32 {
        let range = self.scene_length;

        if denominator.abs() <= DIRT_EPSILON {
            return range;
        }

        let distance = numerator / denominator;

        if distance > DIRT_EPSILON && distance < range {
            distance
        } else {
            range
        }
    }
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;

    use glam::{ivec2, uvec2, vec3, vec4};

    use super::*;

    fn camera() -> Camera {
        Camera::perspective(60f32.to_radians(), uvec2(320, 240), 0.1, 100.0)
    }

    fn target() -> RayMarcher {
        RayMarcher::new(camera(), 100.0, 1024)
    }

    /// Every pixel at or beyond given column/row contains a fragment.
    struct Wall {
        column: Option<i32>,
        row: Option<i32>,
    }

    impl LayerSearch for Wall {
        fn search(&self, pixel: IVec2, _: f32, _: f32, _: i32) -> Option<u32> {
            let hit = self.column.map_or(false, |column| pixel.x >= column)
                || self.row.map_or(false, |row| pixel.y >= row);

            hit.then_some(3)
        }

        fn fetch(&self, pixel: IVec2, layer: u32) -> Vec4 {
            vec4(pixel.x as f32, pixel.y as f32, layer as f32, 1.0)
        }
    }

    /// Never finds anything, but remembers what it got asked for.
    #[derive(Default)]
    struct Nothing {
        queries: RefCell<Vec<(IVec2, f32, f32, i32)>>,
    }

    impl LayerSearch for Nothing {
        fn search(
            &self,
            pixel: IVec2,
            z_min: f32,
            z_max: f32,
            direction: i32,
        ) -> Option<u32> {
            self.queries
                .borrow_mut()
                .push((pixel, z_min, z_max, direction));

            None
        }

        fn fetch(&self, _: IVec2, _: u32) -> Vec4 {
            unreachable!()
        }
    }

    #[test]
    fn hit_along_x() {
        let wall = Wall {
            column: Some(200),
            row: None,
        };

        let result = target().trace(vec3(0.0, 0.0, -5.0), Vec3::X, &wall);
        let hit = result.hit.unwrap();

        assert_eq!(TraceStop::Hit, result.stop);
        assert_eq!(ivec2(200, 120), hit.pixel);
        assert_eq!(3, hit.layer);
        assert_eq!(vec4(200.0, 120.0, 3.0, 1.0), result.value());
        assert_eq!(41, result.steps);
        assert_eq!(ViewportExit::Right, result.exit);
    }

    #[test]
    fn hit_along_y() {
        let wall = Wall {
            column: None,
            row: Some(150),
        };

        let result = target().trace(vec3(0.0, 0.0, -5.0), Vec3::Y, &wall);
        let hit = result.hit.unwrap();

        assert_eq!(ivec2(160, 150), hit.pixel);
        assert_eq!(ViewportExit::Up, result.exit);
    }

    #[test]
    fn miss() {
        let search = Nothing::default();
        let result = target().trace(vec3(0.0, 0.0, -5.0), -Vec3::X, &search);

        assert!(!result.is_hit());
        assert_eq!(Vec4::ZERO, result.value());
        assert_eq!(TraceStop::EndReached, result.stop);
        assert_eq!(ViewportExit::Left, result.exit);

        // The clipped end lands at a pixel center, so depending on rounding
        // the last one may or may not get visited
        assert!((159..=160).contains(&result.steps), "{}", result.steps);
        assert_eq!(result.steps as usize, search.queries.borrow().len());
    }

    #[test]
    fn steps_are_bounded() {
        let target = RayMarcher::new(camera(), 100.0, u32::MAX);

        let directions = [
            vec3(1.0, 0.3, -0.2),
            vec3(-0.4, 1.0, -1.0),
            vec3(0.2, -0.1, -1.0),
            vec3(-1.0, -1.0, 0.5),
            vec3(0.05, 0.02, 1.0),
            vec3(0.7, -0.7, 0.0),
        ];

        for origin in [vec3(0.0, 0.0, -5.0), vec3(1.0, -0.5, -3.0)] {
            for direction in directions {
                let result =
                    target.trace(origin, direction, &Nothing::default());

                let delta = (result.end - result.start).abs().max_element();

                assert!(
                    result.steps as f32 <= delta.ceil(),
                    "{direction}: {} steps over {delta} pixels",
                    result.steps,
                );

                assert_ne!(TraceStop::StepLimit, result.stop);
            }
        }
    }

    #[test]
    fn step_limit() {
        let target = RayMarcher::new(camera(), 100.0, 3);
        let result =
            target.trace(vec3(0.0, 0.0, -5.0), Vec3::X, &Nothing::default());

        assert_eq!(TraceStop::StepLimit, result.stop);
        assert_eq!(3, result.steps);
    }

    #[test]
    fn depth_ranges() {
        let search = Nothing::default();

        target().trace(vec3(0.0, 0.0, -5.0), vec3(0.3, 0.2, -1.0), &search);

        let queries = search.queries.borrow();

        assert!(!queries.is_empty());

        for (idx, &(_, z_min, z_max, direction)) in queries.iter().enumerate() {
            assert!(z_min <= z_max, "{z_min} > {z_max}");
            assert!(z_max < 0.0);
            assert!(z_min >= -100.0 - 0.01);
            assert_eq!(1, direction);

            // Consecutive ranges are chained, moving away from the camera
            if idx > 0 {
                assert_eq!(queries[idx - 1].1, z_max);
            }
        }
    }

    #[test]
    fn ray_parallel_to_clipping_planes() {
        let result = target().trace(
            vec3(0.0, 0.0, -5.0),
            Vec3::X,
            &Nothing::default(),
        );

        assert!(result.end.is_finite());
        assert!(result.steps > 0);
    }

    #[test]
    fn ray_along_view_direction() {
        let result = target().trace(
            vec3(0.0, 0.0, -5.0),
            -Vec3::Z,
            &Nothing::default(),
        );

        assert!(matches!(
            result.stop,
            TraceStop::Degenerate | TraceStop::EndReached
        ));

        assert_eq!(0, result.steps);
    }

    #[test]
    fn reflection() {
        // Floor-like surface reflects rays upwards
        let wall = Wall {
            column: None,
            row: Some(120),
        };

        let result = target().trace_reflection(
            vec3(0.0, -1.0, -5.0),
            Vec3::Y,
            &wall,
        );

        assert!(result.is_hit());
        assert_eq!(120, result.hit.unwrap().pixel.y);
    }
}
