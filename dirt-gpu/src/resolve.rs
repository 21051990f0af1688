use glam::{Vec3, Vec4, Vec4Swizzles};

use crate::{Fragment, FragmentAttributes, FragmentStore, Sorter};

/// Fragment picked out of a pixel's list.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ResolvedLayer {
    pub color: Vec4,
    pub depth: f32,
    pub found: bool,
}

impl ResolvedLayer {
    /// Returned for layers past the end of the list: transparent black at
    /// depth zero.
    pub fn none() -> Self {
        Self {
            color: Vec4::ZERO,
            depth: 0.0,
            found: false,
        }
    }

    pub fn is_some(&self) -> bool {
        self.found
    }

    pub fn is_none(&self) -> bool {
        !self.found
    }
}

/// What [`Resolver::resolve_target()`] writes out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ResolveTarget {
    /// Albedo of the fragment.
    #[default]
    Color,

    /// Raw depth of the fragment, replicated over RGB.
    Depth,

    /// Normal of the fragment, remapped from `-1.0..=1.0` to `0.0..=1.0`.
    Normal,

    /// Number of fragments stored at the pixel relative to the store's
    /// capacity; doesn't depend on the layer.
    Occupancy,
}

impl ResolveTarget {
    pub fn encode(self) -> u32 {
        match self {
            Self::Color => 0,
            Self::Depth => 1,
            Self::Normal => 2,
            Self::Occupancy => 3,
        }
    }

    pub fn decode(value: u32) -> Self {
        match value {
            1 => Self::Depth,
            2 => Self::Normal,
            3 => Self::Occupancy,
            _ => Self::Color,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Resolver {
    sorter: Sorter,
}

impl Resolver {
    pub fn new(sorter: Sorter) -> Self {
        Self { sorter }
    }

    pub fn sorter(&self) -> Sorter {
        self.sorter
    }

    /// Sorts the store and returns its `layer`-th fragment (counting from the
    /// nearest one), decoding the payload as an RGBA8 color.
    pub fn resolve<const N: usize>(
        &self,
        store: &mut FragmentStore<Fragment, N>,
        layer: usize,
    ) -> ResolvedLayer {
        self.sorter.sort_store(store);
        self.resolve_sorted(store, layer)
    }

    /// Same as [`Self::resolve()`], but for stores that are already sorted.
    pub fn resolve_sorted<const N: usize>(
        &self,
        store: &FragmentStore<Fragment, N>,
        layer: usize,
    ) -> ResolvedLayer {
        match store.get(layer) {
            Some(fragment) => ResolvedLayer {
                color: fragment.color(),
                depth: fragment.depth,
                found: true,
            },

            None => ResolvedLayer::none(),
        }
    }

    /// Resolves given layer into one of the debug targets.
    ///
    /// For [`ResolveTarget::Color`] and [`ResolveTarget::Normal`], payloads
    /// are treated as indices into `attributes`; fragments pointing past it
    /// fall back to their payload's color (and to a zero normal).
    pub fn resolve_target<const N: usize>(
        &self,
        store: &mut FragmentStore<Fragment, N>,
        layer: usize,
        target: ResolveTarget,
        attributes: &[FragmentAttributes],
    ) -> ResolvedLayer {
        if target == ResolveTarget::Occupancy {
            let occupancy = if store.capacity() == 0 {
                0.0
            } else {
                store.len() as f32 / store.capacity() as f32
            };

            return ResolvedLayer {
                color: Vec3::splat(occupancy).extend(1.0),
                depth: 0.0,
                found: !store.is_empty(),
            };
        }

        self.sorter.sort_store(store);

        let Some(fragment) = store.get(layer) else {
            return ResolvedLayer::none();
        };

        let attrs = attributes.get(fragment.payload as usize);

        let color = match target {
            ResolveTarget::Depth => Vec3::splat(fragment.depth).extend(1.0),

            ResolveTarget::Normal => {
                let normal = attrs.map_or(Vec3::ZERO, |attrs| attrs.normal());

                (normal * 0.5 + 0.5).extend(1.0)
            }

            ResolveTarget::Color | ResolveTarget::Occupancy => {
                attrs.map_or_else(|| fragment.color(), |attrs| attrs.albedo())
            }
        };

        ResolvedLayer {
            color,
            depth: fragment.depth,
            found: true,
        }
    }

    /// Blends all fragments of the store front-to-back using the "over"
    /// operator; returns premultiplied color.
    pub fn composite<const N: usize>(
        &self,
        store: &mut FragmentStore<Fragment, N>,
    ) -> Vec4 {
        self.sorter.sort_store(store);

        let mut out = Vec4::ZERO;

        for fragment in store.as_slice() {
            let color = fragment.color();
            let weight = (1.0 - out.w) * color.w;

            out += (color.xyz() * weight).extend(weight);

            if out.w >= 1.0 {
                break;
            }
        }

        out
    }
}
