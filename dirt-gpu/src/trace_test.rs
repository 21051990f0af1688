use glam::{vec2, UVec2, Vec4};

use crate::{LayerSearch, Noise};

/// Which way the randomized queries of [`TraceTest`] walk the lists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TraceTestDirection {
    /// Every query moves away from the camera.
    Forward,

    /// Every query moves towards the camera and covers the far half of the
    /// scene.
    Inverse,

    /// Each query picks its direction at random.
    #[default]
    Bidirectional,
}

impl TraceTestDirection {
    pub fn encode(self) -> u32 {
        match self {
            Self::Forward => 0,
            Self::Inverse => 1,
            Self::Bidirectional => 2,
        }
    }

    pub fn decode(value: u32) -> Self {
        match value {
            0 => Self::Forward,
            1 => Self::Inverse,
            _ => Self::Bidirectional,
        }
    }
}

/// Benchmark-like workload for [`LayerSearch`] implementations: fires a
/// bunch of queries at random pixels and random depth ranges, averaging what
/// they find.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraceTest {
    pub iterations: u32,
    pub direction: TraceTestDirection,

    /// When set, queries span the whole near-far range instead of a random
    /// part of it.
    pub full_range: bool,

    /// Distances to the near and far plane.
    pub near: f32,
    pub far: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TraceTestResult {
    /// Mean of the fetched payloads, with misses counted as zero.
    pub value: Vec4,
    pub hits: u32,
}

impl TraceTest {
    pub const ITERATIONS: u32 = 20;

    pub fn new(near: f32, far: f32) -> Self {
        Self {
            iterations: Self::ITERATIONS,
            direction: Default::default(),
            full_range: false,
            near,
            far,
        }
    }

    pub fn with_direction(mut self, direction: TraceTestDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_full_range(mut self, full_range: bool) -> Self {
        self.full_range = full_range;
        self
    }

    /// Runs the test for a single invocation identified by `id`.
    pub fn run<S>(
        &self,
        screen_size: UVec2,
        id: UVec2,
        seed: u32,
        search: &S,
    ) -> TraceTestResult
    where
        S: LayerSearch + ?Sized,
    {
        let mut result = TraceTestResult::default();

        if self.iterations == 0 || screen_size.cmpeq(UVec2::ZERO).any() {
            return result;
        }

        let mut noise = Noise::new(seed, id);

        // View-space depths, i.e. negative
        let near = -self.near;
        let far = -self.far;
        let near_far_dist = (far - near).abs();

        for _ in 0..self.iterations {
            let pixel = (vec2(noise.sample(), noise.sample())
                * screen_size.as_vec2())
            .as_uvec2()
            .min(screen_size - 1);

            let mut r = noise.sample_vec3();

            let direction = match self.direction {
                TraceTestDirection::Forward => 1,

                TraceTestDirection::Inverse => {
                    r.x = 0.5;
                    r.y = 1.0;
                    -1
                }

                TraceTestDirection::Bidirectional => {
                    if r.z > 0.5 {
                        -1
                    } else {
                        1
                    }
                }
            };

            let (z_min, z_max) = if self.full_range {
                (far, near)
            } else {
                let z_max = r.x * -near_far_dist + near;
                let z_min = z_max - r.y * (z_max - far).abs();

                (z_min, z_max)
            };

            let pixel = pixel.as_ivec2();

            if let Some(layer) = search.search(pixel, z_min, z_max, direction)
            {
                result.value += search.fetch(pixel, layer);
                result.hits += 1;
            }
        }

        result.value /= self.iterations as f32;
        result
    }
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;

    use approx::assert_relative_eq;
    use glam::{uvec2, IVec2};

    use super::*;

    const SIZE: UVec2 = UVec2::new(64, 48);

    /// Every pixel holds a single fragment at given depth.
    #[derive(Default)]
    struct Plane {
        depth: f32,
        queries: RefCell<Vec<(IVec2, f32, f32, i32)>>,
    }

    impl LayerSearch for Plane {
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

            (z_min <= self.depth && self.depth <= z_max).then_some(0)
        }

        fn fetch(&self, _: IVec2, _: u32) -> Vec4 {
            Vec4::ONE
        }
    }

    fn plane(depth: f32) -> Plane {
        Plane {
            depth,
            ..Default::default()
        }
    }

    #[test]
    fn queries_stay_within_screen_and_planes() {
        let search = plane(-5.0);
        let target = TraceTest::new(0.1, 100.0);

        for id in [uvec2(0, 0), uvec2(13, 7), uvec2(63, 47)] {
            target.run(SIZE, id, 1234, &search);
        }

        let queries = search.queries.borrow();

        assert_eq!(3 * TraceTest::ITERATIONS as usize, queries.len());

        for &(pixel, z_min, z_max, direction) in queries.iter() {
            assert!(pixel.x >= 0 && pixel.x < 64, "{pixel}");
            assert!(pixel.y >= 0 && pixel.y < 48, "{pixel}");
            assert!(z_min <= z_max, "{z_min} > {z_max}");
            assert!(z_max <= -0.1 + 0.0001, "{z_max}");
            assert!(z_min >= -100.0 - 0.0001, "{z_min}");
            assert!(direction == 1 || direction == -1);
        }
    }

    #[test]
    fn value_is_mean_of_hits() {
        let search = plane(-5.0);

        let result = TraceTest::new(0.1, 100.0)
            .with_full_range(true)
            .run(SIZE, uvec2(5, 5), 1, &search);

        assert_eq!(TraceTest::ITERATIONS, result.hits);
        assert_relative_eq!(1.0, result.value.x);

        let result = TraceTest::new(0.1, 100.0)
            .run(SIZE, uvec2(5, 5), 1, &plane(-500.0));

        assert_eq!(0, result.hits);
        assert_eq!(Vec4::ZERO, result.value);
    }

    #[test]
    fn directions() {
        let forward = plane(-5.0);
        let inverse = plane(-5.0);

        TraceTest::new(0.1, 100.0)
            .with_direction(TraceTestDirection::Forward)
            .run(SIZE, uvec2(1, 2), 3, &forward);

        TraceTest::new(0.1, 100.0)
            .with_direction(TraceTestDirection::Inverse)
            .run(SIZE, uvec2(1, 2), 3, &inverse);

        assert!(forward.queries.borrow().iter().all(|query| query.3 == 1));

        // Inverse rays always cover the whole back half of the scene
        for &(_, z_min, z_max, direction) in inverse.queries.borrow().iter() {
            assert_eq!(-1, direction);
            assert_relative_eq!(-100.0, z_min, epsilon = 0.001);
            assert_relative_eq!(-50.05, z_max, epsilon = 0.001);
        }
    }

    #[test]
    fn same_seed_same_result() {
        let a = plane(-20.0);
        let b = plane(-20.0);
        let target = TraceTest::new(0.1, 100.0);

        assert_eq!(
            target.run(SIZE, uvec2(9, 9), 77, &a),
            target.run(SIZE, uvec2(9, 9), 77, &b),
        );

        assert_eq!(*a.queries.borrow(), *b.queries.borrow());
    }

    #[test]
    fn empty_screen() {
        let result = TraceTest::new(0.1, 100.0).run(
            UVec2::ZERO,
            UVec2::ZERO,
            0,
            &plane(-5.0),
        );

        assert_eq!(TraceTestResult::default(), result);
    }
}
