//! Headless floating-origin demo
//!
//! Usage: `farpoint_demo [config.json] [output.ppm]`
//!
//! Without a config file a small scene is built a nonillion units from the origin: two textured
//! cubes, a warm lamp and one light so far away it falls outside single precision. The camera
//! drifts forward for a few seconds of simulated time and the last software-rendered frame is
//! written as a PPM image. With the `gpu` backend the packed frames are uploaded to a headless
//! device instead.

use farpoint::prelude::*;
use std::env;
use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use farpoint::graphics::{GpuContext, GpuUpload};
use tracing::{info, warn};

const FRAMES: u32 = 180;
const DELTA_TIME: f32 = 1.0 / 60.0;
const WALK_SPEED: f32 = 1.0;
const STATS_EVERY: u32 = 60;

fn main() -> Result<(), Box<dyn Error>> {
    farpoint::init_logging();
    info!("Starting floating-origin demo");

    let mut args = env::args().skip(1);
    let config = match args.next() {
        Some(path) => WorldConfig::load(path)?,
        None => demo_config()?,
    };
    let output = args.next().unwrap_or_else(|| "farpoint.ppm".to_string());

    let mut world = World::from_config(&config)?;

    // The gpu backend only packs draws; mirror them onto a headless device when one exists
    let mut gpu = match world.backend().kind() {
        BackendKind::Gpu => match GpuContext::headless_blocking() {
            Ok(context) => Some((context, GpuUpload::new())),
            Err(err) => {
                warn!(%err, "No GPU device, packed frames stay on the CPU");
                None
            }
        },
        _ => None,
    };

    for frame in 0..FRAMES {
        // Same movement as holding the forward key
        world.camera_mut().fly(WALK_SPEED * DELTA_TIME, 0.0, 0.0)?;
        world.camera_mut().look(0.05, 0.0);

        let stats = world.frame(DELTA_TIME)?;
        if let (Some((context, upload)), Some(packed)) = (gpu.as_mut(), world.backend().as_gpu()) {
            upload.sync(packed, &context.device, &context.queue);
        }
        if frame % STATS_EVERY == 0 || frame + 1 == FRAMES {
            info!(
                frame,
                entities_drawn = stats.entities_drawn,
                lights_applied = stats.lights_applied,
                lights_skipped = stats.lights_skipped,
                camera = %world.camera().position,
                "Frame"
            );
        }
    }

    match world.backend().as_software() {
        Some(software) => {
            software.write_ppm(BufWriter::new(File::create(&output)?))?;
            info!(
                path = %output,
                width = software.width(),
                height = software.height(),
                fragments = software.stats().fragments,
                "Wrote final frame"
            );
        }
        None => info!(
            backend = ?world.backend().kind(),
            uploaded_draws = gpu.as_ref().map_or(0, |(_, upload)| upload.draws().len()),
            "Backend has no framebuffer to write"
        ),
    }

    Ok(())
}

/// The built-in scene, placed far beyond where `f64` can resolve single units
fn demo_config() -> Result<WorldConfig, NumericError> {
    let far = format!("1{}", "0".repeat(30));
    let beyond_f32 = format!("1{}", "0".repeat(45));

    let mut config = WorldConfig {
        resolution: UVec2::new(320, 240),
        backend: BackendKind::Software,
        ..Default::default()
    };
    config.camera.position = BigVector3::parse(&far, "0", "-4")?;

    config.entities = vec![
        EntityDescriptor::at(BigVector3::parse(&far, "0", "0")?),
        EntityDescriptor::at(BigVector3::parse(&format!("{far}.5"), "1.25", "1.5")?)
            .with_scale(Vec3::splat(0.5))
            .with_spin(Vec3::new(0.0, 1.5, 0.0)),
        EntityDescriptor::at(BigVector3::parse(&far, "2", "-2")?)
            .with_scale(Vec3::splat(0.2))
            .with_spin(Vec3::ZERO)
            .with_emission(Vec3::new(1.0, 0.85, 0.6), 6.0),
        EntityDescriptor::at(BigVector3::parse(&beyond_f32, "0", "0")?)
            .with_emission(Vec3::ONE, 1.0e6),
    ];
    Ok(config)
}
