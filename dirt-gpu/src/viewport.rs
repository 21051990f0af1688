use glam::{vec2, UVec2, Vec2};

/// Edge through which a screen-space segment leaves the viewport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ViewportExit {
    #[default]
    None,
    Up,
    Down,
    Right,
    Left,
}

/// Screen-space rectangle rays are clipped against, in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub min: Vec2,
    pub max: Vec2,
}

impl Viewport {
    /// Distance between the screen's edge and viewport's edge; keeps clipped
    /// points at pixel centers.
    pub const PIXEL_OFFSET: f32 = 0.5;

    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_size(size: UVec2) -> Self {
        let offset = vec2(Self::PIXEL_OFFSET, Self::PIXEL_OFFSET);

        Self::new(offset, size.as_vec2() - offset)
    }

    /// Clips segment `p0 -> p1` so that its end lies within the viewport.
    ///
    /// Returns `alpha` such that `mix(p0, p1, alpha)` is the clipped end,
    /// together with the edge that got crossed. Vertical and horizontal edges
    /// are solved separately and the smaller alpha wins.
    pub fn clip(&self, p0: Vec2, p1: Vec2) -> (f32, ViewportExit) {
        let mut exit = ViewportExit::None;
        let mut alpha_y = 1.0;

        if p1.y > self.max.y {
            alpha_y = (self.max.y - p0.y) / (p1.y - p0.y);
            exit = ViewportExit::Up;
        } else if p1.y < self.min.y {
            alpha_y = (self.min.y - p0.y) / (p1.y - p0.y);
            exit = ViewportExit::Down;
        }

        let alpha = if p1.x > self.max.x {
            let alpha_x = (self.max.x - p0.x) / (p1.x - p0.x);

            if alpha_x < alpha_y {
                exit = ViewportExit::Right;
            }

            alpha_x.min(alpha_y)
        } else if p1.x < self.min.x {
            let alpha_x = (self.min.x - p0.x) / (p1.x - p0.x);

            if alpha_x < alpha_y {
                exit = ViewportExit::Left;
            }

            alpha_x.min(alpha_y)
        } else {
            alpha_y
        };

        (alpha, exit)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::uvec2;

    use super::*;
    use crate::mix;

    const MAX_RELATIVE: f32 = 0.00001;

    fn target() -> Viewport {
        Viewport::from_size(uvec2(640, 480))
    }

    #[test]
    fn inside() {
        let (alpha, exit) = target().clip(vec2(10.0, 10.0), vec2(300.0, 200.0));

        assert_eq!(1.0, alpha);
        assert_eq!(ViewportExit::None, exit);
    }

    #[test]
    fn exits() {
        let p0 = vec2(320.0, 240.0);

        let cases = [
            (vec2(400.0, 900.0), ViewportExit::Up),
            // Down and left edges sit at `0.5`, so those segments cross
            // them halfway, where the clipped end comes out exact
            (vec2(250.0, -239.0), ViewportExit::Down),
            (vec2(1500.0, 260.0), ViewportExit::Right),
            (vec2(-319.0, 200.0), ViewportExit::Left),
        ];

        for (p1, expected) in cases {
            let (alpha, exit) = target().clip(p0, p1);
            let end = mix(p0, p1, alpha);

            assert_eq!(expected, exit, "{p1}");
            assert!(alpha > 0.0 && alpha < 1.0);

            let (actual, edge) = match exit {
                ViewportExit::Up => (end.y, 479.5),
                ViewportExit::Down => (end.y, 0.5),
                ViewportExit::Right => (end.x, 639.5),
                ViewportExit::Left => (end.x, 0.5),
                ViewportExit::None => unreachable!(),
            };

            assert_relative_eq!(actual, edge, max_relative = MAX_RELATIVE);
        }
    }

    #[test]
    fn corner_picks_nearest_edge() {
        // Leaves through the right edge before it would reach the top one
        let p0 = vec2(600.0, 400.0);
        let p1 = vec2(700.0, 500.0);
        let (alpha, exit) = target().clip(p0, p1);

        assert_eq!(ViewportExit::Right, exit);
        assert_relative_eq!(
            mix(p0, p1, alpha).x,
            639.5,
            max_relative = MAX_RELATIVE
        );

        // ... and the other way around
        let p1 = vec2(650.0, 600.0);
        let (alpha, exit) = target().clip(p0, p1);

        assert_eq!(ViewportExit::Up, exit);
        assert_relative_eq!(
            mix(p0, p1, alpha).y,
            479.5,
            max_relative = MAX_RELATIVE
        );
    }
}
