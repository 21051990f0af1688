//! Renders a handful of translucent spheres standing on a floor in front of
//! a wall, then dumps what every pass produces into `target/demo/`.
//!
//! Run with `RUST_LOG=debug` (and optionally `--features metrics`) to see
//! what's going on.

use std::error::Error;
use std::fs;
use std::path::Path;
use std::thread;

use dirt::gpu::{
    pack_unorm4x8, Camera, FragmentAttributes, OverflowPolicy, ResolveTarget,
};
use dirt::{save_image, Config, Pipeline, StorageKind};
use glam::{uvec2, vec3, vec4, UVec2, Vec3, Vec4};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SIZE: UVec2 = UVec2::new(512, 512);
const SPHERES: usize = 12;
const WALL_Z: f32 = -20.0;
const FLOOR_Y: f32 = -1.5;

struct Sphere {
    center: Vec3,
    radius: f32,
    color: Vec4,
}

/// Something that can be hit by a primary ray, producing a fragment.
struct Surface {
    view_z: f32,
    attributes: u32,
    color: Vec4,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let out = Path::new("target").join("demo");

    fs::create_dir_all(&out)?;

    let camera = Camera::perspective(60f32.to_radians(), SIZE, 0.1, 100.0);
    let spheres = spheres();

    // Attributes `0` and `1` describe the floor and the wall, the rest
    // belongs to spheres; fragments point at them through their payloads
    let attributes: Vec<_> = [
        FragmentAttributes::new(
            vec4(0.6, 0.6, 0.6, 1.0),
            Vec3::Y,
            Vec4::ZERO,
            1.0,
            1.0,
        ),
        FragmentAttributes::new(
            vec4(0.2, 0.3, 0.8, 1.0),
            Vec3::Z,
            Vec4::ZERO,
            1.0,
            1.0,
        ),
    ]
    .into_iter()
    .chain(spheres.iter().map(|sphere| {
        FragmentAttributes::new(
            sphere.color,
            Vec3::Z,
            Vec4::splat(0.5),
            1.5,
            sphere.color.w,
        )
    }))
    .collect();

    for storage in [StorageKind::Array, StorageKind::Linked] {
        let config = Config::new(SIZE)
            .with_capacity(8)
            .with_overflow(OverflowPolicy::ReplaceMax)
            .with_storage(storage);

        let mut pipeline = Pipeline::new(config, camera)?;
        let prefix = format!("{:?}", storage).to_lowercase();

        info!("Rendering with {:?} storage", storage);

        // Frame 1: payloads are indices into `attributes`
        pipeline.begin_frame();
        draw(&pipeline, &camera, &spheres, |surface| surface.attributes);

        for layer in 0..3 {
            save_image(
                &pipeline.resolve_target(
                    layer,
                    ResolveTarget::Color,
                    &attributes,
                )?,
                out.join(format!("{}-layer-{}.png", prefix, layer)),
            )?;
        }

        save_image(
            &pipeline.resolve_target(0, ResolveTarget::Occupancy, &attributes)?,
            out.join(format!("{}-occupancy.png", prefix)),
        )?;

        pipeline.sort();

        save_image(
            &pipeline.trace_reflections(&attributes)?,
            out.join(format!("{}-reflections.png", prefix)),
        )?;

        save_image(
            &pipeline.trace_test(pipeline.frame())?,
            out.join(format!("{}-trace-test.png", prefix)),
        )?;

        // Frame 2: payloads are colors, for compositing
        pipeline.begin_frame();
        draw(&pipeline, &camera, &spheres, |surface| {
            pack_unorm4x8(surface.color)
        });

        save_image(
            &pipeline.composite()?,
            out.join(format!("{}-composite.png", prefix)),
        )?;
    }

    info!("Images saved into {}", out.display());

    Ok(())
}

fn spheres() -> Vec<Sphere> {
    let mut rng = StdRng::seed_from_u64(1234);

    (0..SPHERES)
        .map(|_| {
            let radius = rng.gen_range(0.4..1.2);

            Sphere {
                center: vec3(
                    rng.gen_range(-4.0..4.0),
                    FLOOR_Y + radius + rng.gen_range(0.0..2.0),
                    rng.gen_range(-16.0..-5.0),
                ),
                radius,
                color: vec4(
                    rng.gen_range(0.2..1.0),
                    rng.gen_range(0.2..1.0),
                    rng.gen_range(0.2..1.0),
                    rng.gen_range(0.3..0.7),
                ),
            }
        })
        .collect()
}

/// Plays the role of a rasterizer: shoots a primary ray through each pixel
/// and appends a fragment for every surface it crosses.
fn draw(
    pipeline: &Pipeline,
    camera: &Camera,
    spheres: &[Sphere],
    payload: impl Fn(&Surface) -> u32 + Sync,
) {
    let threads = pipeline.config().threads as u32;
    let payload = &payload;

    thread::scope(|scope| {
        for thread_id in 0..threads {
            scope.spawn(move || {
                for y in (thread_id..SIZE.y).step_by(threads as usize) {
                    for x in 0..SIZE.x {
                        let pixel = uvec2(x, y);
                        let dir = camera.view_dir(Camera::pixel_center(pixel));

                        for surface in surfaces(dir, spheres) {
                            pipeline.append(
                                pixel,
                                camera.view_z_to_depth(surface.view_z),
                                payload(&surface),
                            );
                        }
                    }
                }
            });
        }
    });
}

fn surfaces(dir: Vec3, spheres: &[Sphere]) -> Vec<Surface> {
    let mut surfaces = Vec::new();

    let floor_z = if dir.y < 0.0 {
        (dir * (FLOOR_Y / dir.y)).z
    } else {
        f32::NEG_INFINITY
    };

    if floor_z > WALL_Z {
        surfaces.push(Surface {
            view_z: floor_z,
            attributes: 0,
            color: vec4(0.6, 0.6, 0.6, 1.0),
        });
    } else {
        surfaces.push(Surface {
            view_z: WALL_Z,
            attributes: 1,
            color: vec4(0.2, 0.3, 0.8, 1.0),
        });
    }

    for (sphere_idx, sphere) in spheres.iter().enumerate() {
        let b = dir.dot(sphere.center);
        let c = sphere.center.length_squared() - sphere.radius * sphere.radius;
        let discriminant = b * b - c;

        if discriminant <= 0.0 {
            continue;
        }

        let discriminant = discriminant.sqrt();

        // Both the front and the back side of the sphere
        for t in [b - discriminant, b + discriminant] {
            if t > 0.0 {
                surfaces.push(Surface {
                    view_z: (dir * t).z,
                    attributes: 2 + sphere_idx as u32,
                    color: sphere.color,
                });
            }
        }
    }

    surfaces
}
