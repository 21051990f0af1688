use std::ops::Range;

use glam::{IVec2, UVec2, Vec4};

use crate::gpu::{Fragment, FragmentAttributes, LayerSearch};

/// Per-pixel fragment lists, sorted front-to-back and compacted into one
/// array; produced by the sort pass and read by the tracing passes.
///
/// Alongside each fragment we keep its view-space Z, so that lookups don't
/// have to care about the depth convention fragments were recorded with.
#[derive(Clone, Debug, Default)]
pub struct SortedLayers {
    size: UVec2,
    thickness: f32,

    /// `offsets[idx]..offsets[idx + 1]` is the range of `idx`-th pixel.
    offsets: Vec<u32>,

    fragments: Vec<Fragment>,
    view_z: Vec<f32>,
}

impl SortedLayers {
    pub fn new(size: UVec2, thickness: f32) -> Self {
        Self {
            size,
            thickness,
            offsets: vec![0],
            fragments: Default::default(),
            view_z: Default::default(),
        }
    }

    /// Appends the next pixel (in row-major order) together with its
    /// fragments and their view-space Zs, nearest first.
    pub fn push_pixel(
        &mut self,
        fragments: impl IntoIterator<Item = (Fragment, f32)>,
    ) {
        for (fragment, view_z) in fragments {
            self.fragments.push(fragment);
            self.view_z.push(view_z);
        }

        self.offsets.push(self.fragments.len() as u32);
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn thickness(&self) -> f32 {
        self.thickness
    }

    /// Total number of fragments, across all pixels.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Returns fragments of given pixel, nearest first; pixels outside the
    /// screen (or not pushed yet) have none.
    pub fn layers(&self, pixel: UVec2) -> &[Fragment] {
        self.range(pixel.as_ivec2())
            .map_or(&[][..], |range| &self.fragments[range])
    }

    /// Returns view-space Zs of given pixel's fragments, nearest first.
    pub fn view_z(&self, pixel: UVec2) -> &[f32] {
        self.range(pixel.as_ivec2())
            .map_or(&[][..], |range| &self.view_z[range])
    }

    /// Returns the largest number of fragments stored at a single pixel.
    pub fn max_depth_complexity(&self) -> usize {
        self.offsets
            .windows(2)
            .map(|range| (range[1] - range[0]) as usize)
            .max()
            .unwrap_or(0)
    }

    /// Wraps layers, so that [`LayerSearch::fetch()`] returns albedo of the
    /// attributes the fragment's payload points at.
    pub fn with_attributes<'a>(
        &'a self,
        attributes: &'a [FragmentAttributes],
    ) -> LayersWithAttributes<'a> {
        LayersWithAttributes {
            layers: self,
            attributes,
        }
    }

    fn range(&self, pixel: IVec2) -> Option<Range<usize>> {
        if pixel.x < 0
            || pixel.y < 0
            || pixel.x as u32 >= self.size.x
            || pixel.y as u32 >= self.size.y
        {
            return None;
        }

        let idx =
            (pixel.y as usize) * (self.size.x as usize) + pixel.x as usize;

        let start = *self.offsets.get(idx)? as usize;
        let end = *self.offsets.get(idx + 1)? as usize;

        Some(start..end)
    }

    /// Returns whether segment `z_min..=z_max` crosses a fragment at
    /// `view_z`, which is considered to extend `thickness` units behind its
    /// surface.
    fn intersects(&self, view_z: f32, z_min: f32, z_max: f32) -> bool {
        z_min <= view_z && z_max >= view_z - self.thickness
    }
}

impl LayerSearch for SortedLayers {
    /// Walks the pixel's list linearly: front-to-back for rays moving away
    /// from the camera, back-to-front otherwise, stopping as soon as the rest
    /// of the list can't match anymore.
    fn search(
        &self,
        pixel: IVec2,
        z_min: f32,
        z_max: f32,
        direction: i32,
    ) -> Option<u32> {
        let range = self.range(pixel)?;
        let view_z = &self.view_z[range];

        if direction > 0 {
            for (layer, &z) in view_z.iter().enumerate() {
                if self.intersects(z, z_min, z_max) {
                    return Some(layer as u32);
                }

                // Everything past this point lies even farther
                if z < z_min {
                    break;
                }
            }
        } else {
            for (layer, &z) in view_z.iter().enumerate().rev() {
                if self.intersects(z, z_min, z_max) {
                    return Some(layer as u32);
                }

                // Everything past this point lies even nearer
                if z - self.thickness > z_max {
                    break;
                }
            }
        }

        None
    }

    fn fetch(&self, pixel: IVec2, layer: u32) -> Vec4 {
        self.range(pixel)
            .and_then(|range| self.fragments[range].get(layer as usize))
            .map_or(Vec4::ZERO, |fragment| fragment.color())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct LayersWithAttributes<'a> {
    layers: &'a SortedLayers,
    attributes: &'a [FragmentAttributes],
}

impl LayerSearch for LayersWithAttributes<'_> {
    fn search(
        &self,
        pixel: IVec2,
        z_min: f32,
        z_max: f32,
        direction: i32,
    ) -> Option<u32> {
        self.layers.search(pixel, z_min, z_max, direction)
    }

    fn fetch(&self, pixel: IVec2, layer: u32) -> Vec4 {
        self.layers
            .range(pixel)
            .and_then(|range| self.layers.fragments[range].get(layer as usize))
            .and_then(|fragment| self.attributes.get(fragment.payload as usize))
            .map_or(Vec4::ZERO, |attrs| attrs.albedo())
    }
}
