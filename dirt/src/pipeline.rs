use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use derivative::Derivative;
use glam::{uvec2, UVec2, Vec3, Vec4};
use image::RgbaImage;
use log::{debug, info, warn};

use crate::gpu::{
    self, Camera, DepthConvention, FragmentAttributes, RayMarcher,
    ResolveTarget, Resolver, TraceResult, TraceTest,
};
use crate::{
    create_buffer, for_each_row, measure, Config, ConfigError, Error,
    FragmentBuffer, PixelStore, Result, SortedLayers,
};

/// Owns the fragment buffer of a screen and runs passes over it.
///
/// A frame goes like this:
///
/// - [`Self::begin_frame()`],
/// - geometry pass: any number of [`Self::append()`]s, possibly from many
///   threads at once,
/// - resolve passes, which read the buffer directly,
/// - [`Self::sort()`] followed by the tracing passes, which read the sorted
///   layers.
///
/// Passes that produce images return them top row first, i.e. flipped in
/// relation to pixel-coordinates (where `y` grows upwards).
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Pipeline {
    config: Config,
    camera: Camera,
    params: gpu::BufferParams,
    resolver: Resolver,

    #[derivative(Debug = "ignore")]
    buffer: Box<dyn FragmentBuffer>,

    #[derivative(Debug = "ignore")]
    layers: Option<SortedLayers>,

    frame: u32,
}

impl Pipeline {
    pub fn new(config: Config, camera: Camera) -> Result<Self> {
        config.validate()?;

        if camera.screen_size() != config.size {
            return Err(ConfigError::CameraMismatch {
                config: config.size,
                camera: camera.screen_size(),
            }
            .into());
        }

        info!(
            "Creating pipeline; size={}, capacity={}, storage={:?}, \
             algorithm={:?}, convention={:?}",
            config.size,
            config.capacity,
            config.storage,
            config.algorithm,
            config.convention,
        );

        let params = config.params(&camera);
        let resolver = Resolver::new(params.sorter());
        let buffer = create_buffer(&config);

        Ok(Self {
            config,
            camera,
            params,
            resolver,
            buffer,
            layers: None,
            frame: 0,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn params(&self) -> gpu::BufferParams {
        self.params
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn buffer(&self) -> &dyn FragmentBuffer {
        &*self.buffer
    }

    /// Returns layers produced by the last [`Self::sort()`] of this frame.
    pub fn layers(&self) -> Option<&SortedLayers> {
        self.layers.as_ref()
    }

    pub fn ray_marcher(&self) -> RayMarcher {
        RayMarcher::new(
            self.camera,
            self.config.scene_length,
            self.config.max_steps(),
        )
    }

    pub fn begin_frame(&mut self) {
        self.frame = self.frame.wrapping_add(1);

        debug!("Beginning frame {}", self.frame);

        self.buffer.begin_frame();
        self.layers = None;
    }

    /// Records a fragment; see [`FragmentBuffer::append()`].
    pub fn append(&self, pixel: UVec2, depth: f32, payload: u32) -> bool {
        self.buffer.append(pixel, depth, payload)
    }

    /// Sorts fragments of each pixel and compacts them into
    /// [`SortedLayers`].
    pub fn sort(&mut self) -> &SortedLayers {
        let layers = measure("sort", || self.build_layers());

        debug!(
            "Fragments sorted; fragments={}, max-depth-complexity={}",
            layers.len(),
            layers.max_depth_complexity(),
        );

        let dropped = self.buffer.dropped();

        if dropped > 0 {
            warn!(
                "{} fragment(s) didn't fit into the buffer during frame {} \
                 (overflow={:?})",
                dropped, self.frame, self.config.overflow,
            );
        }

        self.layers.insert(layers)
    }

    /// Returns the `layer`-th nearest fragment of each pixel.
    pub fn resolve_layer(&self, layer: usize) -> Result<RgbaImage> {
        measure("resolve_layer", || {
            self.render(|pixel| {
                let mut store = self.gather(pixel);

                self.resolver.resolve(&mut store, layer).color
            })
        })
    }

    /// Returns the `layer`-th nearest fragment of each pixel, visualized
    /// through given target.
    pub fn resolve_target(
        &self,
        layer: usize,
        target: ResolveTarget,
        attributes: &[FragmentAttributes],
    ) -> Result<RgbaImage> {
        measure("resolve_target", || {
            self.render(|pixel| {
                let mut store = self.gather(pixel);

                self.resolver
                    .resolve_target(&mut store, layer, target, attributes)
                    .color
            })
        })
    }

    /// Blends all fragments of each pixel front-to-back; returns
    /// premultiplied colors.
    pub fn composite(&self) -> Result<RgbaImage> {
        measure("composite", || {
            self.render(|pixel| {
                let mut store = self.gather(pixel);

                self.resolver.composite(&mut store)
            })
        })
    }

    /// Traces a single ray (in view-space) through the sorted layers.
    pub fn trace(&self, origin: Vec3, direction: Vec3) -> Result<TraceResult> {
        let layers = self.sorted("trace")?;

        Ok(self.ray_marcher().trace(origin, direction, layers))
    }

    /// Reflects the nearest fragment of each pixel and returns albedo of
    /// whatever the reflected ray hits.
    ///
    /// Payloads are treated as indices into `attributes`, which provide the
    /// normals; pixels whose nearest fragment points outside `attributes`
    /// stay transparent. Ray origins are pushed off their surfaces by the
    /// configured thickness.
    pub fn trace_reflections(
        &self,
        attributes: &[FragmentAttributes],
    ) -> Result<RgbaImage> {
        let layers = self.sorted("trace_reflections")?;
        let search = layers.with_attributes(attributes);
        let marcher = self.ray_marcher();
        let hits = AtomicU32::new(0);

        let image = measure("trace_reflections", || {
            self.render(|pixel| {
                let (Some(fragment), Some(&view_z)) =
                    (layers.layers(pixel).first(), layers.view_z(pixel).first())
                else {
                    return Vec4::ZERO;
                };

                let Some(attrs) = attributes.get(fragment.payload as usize)
                else {
                    return Vec4::ZERO;
                };

                let normal = attrs.normal();

                let origin = self
                    .camera
                    .reconstruct(Camera::pixel_center(pixel), view_z)
                    + normal * self.config.thickness;

                let result = marcher.trace_reflection(origin, normal, &search);

                if result.is_hit() {
                    hits.fetch_add(1, Ordering::Relaxed);
                }

                result.value()
            })
        })?;

        debug!("Reflections traced; hits={}", hits.into_inner());

        Ok(image)
    }

    /// Runs [`TraceTest`] for each pixel, returning the mean of what the
    /// queries found.
    pub fn trace_test(&self, seed: u32) -> Result<RgbaImage> {
        self.trace_test_with(
            &TraceTest::new(self.camera.near(), self.camera.far()),
            seed,
        )
    }

    pub fn trace_test_with(
        &self,
        test: &TraceTest,
        seed: u32,
    ) -> Result<RgbaImage> {
        let layers = self.sorted("trace_test")?;
        let size = self.config.size;

        measure("trace_test", || {
            self.render(|pixel| test.run(size, pixel, seed, layers).value)
        })
    }

    fn sorted(&self, pass: &'static str) -> Result<&SortedLayers> {
        self.layers.as_ref().ok_or(Error::NotSorted { pass })
    }

    fn gather(&self, pixel: UVec2) -> PixelStore {
        let mut store = PixelStore::with_capacity(self.config.capacity);

        self.buffer.gather(pixel, &mut store);
        store
    }

    fn build_layers(&self) -> SortedLayers {
        let size = self.config.size;
        let sorter = self.resolver.sorter();

        let rows = for_each_row(size.y, self.config.threads, |y| {
            let mut counts = Vec::with_capacity(size.x as usize);
            let mut fragments = Vec::new();

            for x in 0..size.x {
                let mut store = self.gather(uvec2(x, y));

                sorter.sort_store(&mut store);

                if self.config.dedup {
                    let len = gpu::dedup_identical(store.as_mut_slice());

                    store.truncate(len);
                }

                counts.push(store.len());

                fragments.extend(store.as_slice().iter().map(|fragment| {
                    (*fragment, self.view_z(fragment.depth))
                }));
            }

            (counts, fragments)
        });

        let mut layers = SortedLayers::new(size, self.config.thickness);

        for (counts, fragments) in rows {
            let mut fragments = fragments.into_iter();

            for count in counts {
                layers.push_pixel(fragments.by_ref().take(count));
            }
        }

        layers
    }

    /// Converts depth, as recorded by the geometry pass, into view-space Z.
    fn view_z(&self, depth: f32) -> f32 {
        match self.config.convention {
            DepthConvention::Projective => self.camera.depth_to_view_z(depth),
            DepthConvention::Camera => depth,
        }
    }

    fn render(&self, f: impl Fn(UVec2) -> Vec4 + Sync) -> Result<RgbaImage> {
        let size = self.config.size;

        let data = for_each_row(size.y, self.config.threads, |row| {
            let y = size.y - 1 - row;

            (0..size.x)
                .flat_map(|x| gpu::pack_unorm4x8(f(uvec2(x, y))).to_le_bytes())
                .collect::<Vec<_>>()
        })
        .concat();

        let len = data.len();

        RgbaImage::from_raw(size.x, size.y, data)
            .ok_or(Error::ImageSize { size, len })
    }
}

/// Writes image to given path, guessing format from the extension.
pub fn save_image(image: &RgbaImage, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();

    debug!("Saving image: {}", path.display());

    image.save(path)?;

    Ok(())
}
