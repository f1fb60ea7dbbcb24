//! Renders a small procedural scene and saves it as a binary PPM.
//!
//! Usage: `cargo run --example simple_render -- [settings.json] [output.ppm]`

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use sanct_core::{Camera, Light, Material, Mesh, Texture, TextureKind};
use sanct_renderer::{counters, Image, RenderSession, Renderer, Scene, Settings, Vec3};

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => Settings::load(&path).with_context(|| format!("loading {path}"))?,
        None => Settings {
            resolution_x: 640,
            resolution_y: 360,
            ..Default::default()
        },
    };
    let output = args.next().unwrap_or_else(|| "output.ppm".to_string());

    let scene = build_scene(&settings)?;
    let session = RenderSession::new();
    let mut renderer = Renderer::new(settings)?;
    renderer.render(&scene, &session)?;

    let image = renderer.output().get_flat_image()?;
    save_ppm(&image, &output)?;
    log::info!(
        "Saved {} ({} trace tasks)",
        output,
        session.metrics.counter(counters::TRACE_TASKS)
    );
    Ok(())
}

fn build_scene(settings: &Settings) -> Result<Scene> {
    let mut scene = Scene::new("simple", settings);

    let checker = scene.add_texture(Texture::new(
        "floor",
        TextureKind::Checker {
            a: Vec3::splat(0.9),
            b: Vec3::splat(0.2),
            size: 0.125,
        },
    ));
    let floor = scene.add_material(Material::diffuse(Vec3::ONE).with_texture(checker))?;
    let mirror = scene.add_material(Material::reflective(Vec3::new(0.7, 0.7, 0.8)))?;
    let glass = scene.add_material(Material::refractive(1.5))?;
    let clay = scene.add_material(
        Material::diffuse(Vec3::new(0.8, 0.35, 0.2)).with_smooth_shading(true),
    )?;

    scene.add_object(Mesh::quad(Vec3::new(0.0, -1.0, -5.0), Vec3::Y, 12.0, floor))?;
    scene.add_object(Mesh::quad(Vec3::new(0.0, 2.0, -9.0), Vec3::Z, 6.0, mirror))?;
    scene.add_object(Mesh::cuboid(
        Vec3::new(-2.5, -1.0, -6.0),
        Vec3::new(-1.0, 0.5, -4.5),
        clay,
    ))?;
    scene.add_object(Mesh::cuboid(
        Vec3::new(0.5, -1.0, -4.5),
        Vec3::new(1.5, 0.0, -3.5),
        glass,
    ))?;

    scene.add_light(Light::point(Vec3::new(2.0, 4.0, -2.0), Vec3::ONE, 400.0));
    scene.add_light(Light::sun(Vec3::new(-0.3, -1.0, -0.4), Vec3::new(1.0, 0.95, 0.8), 0.4));
    scene.set_background(Vec3::new(0.5, 0.7, 1.0));
    scene.set_ambient(Vec3::splat(0.1));
    scene.set_camera(
        Camera::new()
            .with_position(Vec3::new(0.0, 1.0, 1.0), Vec3::new(0.0, 0.0, -5.0), Vec3::Y)
            .with_vfov(50.0),
    );

    scene.build()?;
    Ok(scene)
}

fn save_ppm(image: &Image, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write!(writer, "P6\n{} {}\n255\n", image.width(), image.height())?;
    writer.write_all(image.as_bytes())?;
    writer.flush()?;
    Ok(())
}
