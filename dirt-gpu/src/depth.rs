/// Tells which way depth values grow when moving away from the viewer.
///
/// All comparisons performed by stores and sorters go through this type, so
/// picking a convention once makes the whole pipeline agree on what "nearer"
/// means.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DepthConvention {
    /// Post-projective depth: larger values are farther away, so fragments
    /// are kept in ascending order.
    #[default]
    Projective,

    /// Camera-space Z with the camera looking down `-Z`: values closer to
    /// zero are nearer, so fragments are kept in descending order.
    Camera,
}

impl DepthConvention {
    /// Returns whether `a` lies behind `b`.
    pub fn is_farther<T>(self, a: T, b: T) -> bool
    where
        T: PartialOrd,
    {
        match self {
            DepthConvention::Projective => a > b,
            DepthConvention::Camera => a < b,
        }
    }

    /// Returns a depth that's behind every depth a fragment can carry.
    pub fn farthest(self) -> f32 {
        match self {
            DepthConvention::Projective => f32::INFINITY,
            DepthConvention::Camera => f32::NEG_INFINITY,
        }
    }

    pub fn encode(self) -> u32 {
        match self {
            DepthConvention::Projective => 0,
            DepthConvention::Camera => 1,
        }
    }

    pub fn decode(value: u32) -> Self {
        if value == 1 {
            DepthConvention::Camera
        } else {
            DepthConvention::Projective
        }
    }
}
