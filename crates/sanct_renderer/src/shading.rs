//! Material response for a single traced ray.
//!
//! [`shade`] is a pure function of the task, its hit and the scene: it
//! returns at most one sample for the task's pixel and the bounce tasks to
//! enqueue, without touching any scheduler state.

use sanct_core::{HitKind, Material, MaterialKind, Scene, Settings, TraceHit};
use sanct_math::{Ray, Vec3, EPSILON};

use crate::error::{RenderError, RenderResult};
use crate::output::Shade;
use crate::task::TraceTask;

/// Weights at or below this spawn no further work.
pub const WEIGHT_EPSILON: f32 = EPSILON;

/// Both Fresnel bounce factors are capped at `1 - MIN_SPLIT` so each stays lighter than its parent.
const MIN_SPLIT: f32 = 1e-4;

/// Weight factor applied at every KD-tree debug layer.
const DEBUG_ACCEL_FALLOFF: f32 = 0.6;

/// How far past a hit the KD-tree debug ray restarts.
const DEBUG_ACCEL_STEP: f32 = 0.5;

/// Read-only inputs shared by every shading call of a frame.
#[derive(Debug, Clone, Copy)]
pub struct ShadeContext<'a> {
    pub scene: &'a Scene,
    pub settings: &'a Settings,
}

/// Result of shading one task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShadeOutcome {
    pub sample: Option<Shade>,
    pub children: Vec<TraceTask>,
    /// True when the task resolved against the sky or background
    pub sky: bool,
}

impl ShadeOutcome {
    fn sample(shade: Shade) -> Self {
        Self {
            sample: Some(shade),
            ..Default::default()
        }
    }

    fn nothing() -> Self {
        Self::default()
    }
}

/// Shade `task` given the scene hit for its ray.
pub fn shade(ctx: &ShadeContext, task: &TraceTask, hit: &TraceHit) -> RenderResult<ShadeOutcome> {
    if task.depth >= ctx.settings.max_depth || !hit.successful() {
        return Ok(shade_sky(ctx, task));
    }

    let material = ctx
        .scene
        .material(hit.material)
        .ok_or(RenderError::MissingMaterial(hit.material))?;

    let outcome = match material.kind {
        MaterialKind::Void => return Err(RenderError::UnhandledMaterial(hit.material)),
        MaterialKind::Diffuse => match shade_diffuse(ctx, material, task.weight, hit) {
            Some(shade) => ShadeOutcome::sample(shade),
            None => ShadeOutcome::nothing(),
        },
        MaterialKind::Constant => {
            if task.weight > WEIGHT_EPSILON {
                let albedo = material.albedo(ctx.scene.textures(), hit);
                ShadeOutcome::sample(Shade::normal(albedo, task.weight))
            } else {
                ShadeOutcome::nothing()
            }
        }
        MaterialKind::Reflective {
            reflectivity,
            diffuseness,
        } => {
            let mut outcome = ShadeOutcome {
                sample: shade_diffuse(ctx, material, task.weight * diffuseness, hit),
                ..Default::default()
            };
            if task.weight * reflectivity > WEIGHT_EPSILON {
                let ray = task.ray.reflected(hit.bias_point(ctx.settings.bias), hit.n);
                outcome.children.push(task.child(ray, reflectivity));
            }
            outcome
        }
        MaterialKind::Refractive { ior, .. } => shade_refractive(ctx, task, hit, ior),
        MaterialKind::DebugAccel => shade_debug_accel(task, hit),
        MaterialKind::DebugNormal => {
            ShadeOutcome::sample(Shade::normal(hit.n * 0.5 + Vec3::splat(0.5), task.weight))
        }
        MaterialKind::DebugUv => {
            ShadeOutcome::sample(Shade::normal(Vec3::new(hit.u, 0.0, hit.v), task.weight))
        }
        MaterialKind::DebugBary => ShadeOutcome::sample(Shade::normal(
            Vec3::new(hit.bary_u, 0.0, hit.bary_v),
            task.weight,
        )),
    };
    Ok(outcome)
}

fn shade_sky(ctx: &ShadeContext, task: &TraceTask) -> ShadeOutcome {
    ShadeOutcome {
        sample: Some(Shade::normal(
            ctx.scene.sky(task.ray.direction()),
            task.weight,
        )),
        children: Vec::new(),
        sky: true,
    }
}

/// Direct light plus ambient, times albedo, with overexposure rolled off.
fn shade_diffuse(
    ctx: &ShadeContext,
    material: &Material,
    weight: f32,
    hit: &TraceHit,
) -> Option<Shade> {
    if weight < WEIGHT_EPSILON {
        return None;
    }
    let scene = ctx.scene;
    let albedo = material.albedo(scene.textures(), hit);
    let p = hit.bias_point(ctx.settings.bias);

    let mut light: Vec3 = scene
        .lights()
        .iter()
        .map(|light| light.contribution(p, hit.n, |from, to| scene.is_occluded(from, to)))
        .sum();
    light += scene.ambient() * albedo;

    Some(Shade::normal(clamp_overexposure(light * albedo), weight))
}

fn shade_refractive(ctx: &ShadeContext, task: &TraceTask, hit: &TraceHit, ior: f32) -> ShadeOutcome {
    // n faces against the ray on both sides of the surface
    let (n, etai, etat) = if hit.kind == HitKind::InsideRefractive {
        (-hit.n, ior, 1.0)
    } else {
        (hit.n, task.ior, ior)
    };
    let bias = ctx.settings.bias;
    let direction = task.ray.direction();

    let fresnel = schlick(direction, n, etai, etat);
    let reflected = fresnel.min(1.0 - MIN_SPLIT);
    let transmitted = (1.0 - fresnel).min(1.0 - MIN_SPLIT);
    let mut outcome = ShadeOutcome::nothing();

    if task.weight * reflected > WEIGHT_EPSILON {
        let ray = task.ray.reflected(hit.p + n * bias, n);
        outcome.children.push(task.child(ray, reflected));
    }

    if task.weight * transmitted > WEIGHT_EPSILON {
        if let Some(ray) = task.ray.refracted(hit.p - n * bias, n, etai, etat) {
            outcome.children.push(task.child(ray, transmitted).with_ior(etat));
        }
    }

    if outcome.children.is_empty() {
        return shade_sky(ctx, task);
    }
    outcome
}

fn shade_debug_accel(task: &TraceTask, hit: &TraceHit) -> ShadeOutcome {
    if task.weight <= WEIGHT_EPSILON {
        return ShadeOutcome::nothing();
    }
    let color = match hit.tree_depth % 3 {
        0 => Vec3::X,
        1 => Vec3::Y,
        _ => Vec3::Z,
    };
    let direction = task.ray.direction();
    let origin = task.ray.origin + direction * (hit.t + DEBUG_ACCEL_STEP);
    let child = task.child(Ray::new(origin, direction), DEBUG_ACCEL_FALLOFF);
    ShadeOutcome {
        sample: Some(Shade::normal(color, child.weight)),
        children: vec![child],
        sky: false,
    }
}

/// Schlick's approximation of Fresnel reflectance; `n` faces against `i`.
pub fn schlick(i: Vec3, n: Vec3, n1: f32, n2: f32) -> f32 {
    let cos_theta = (-i.dot(n)).clamp(0.0, 1.0);
    let f0 = ((n1 - n2) / (n1 + n2)).powi(2);
    f0 + (1.0 - f0) * (1.0 - cos_theta).powi(5)
}

/// Roll off channels above 1 logarithmically, then clamp to [0, 1].
pub fn clamp_overexposure(color: Vec3) -> Vec3 {
    let rest = (color - Vec3::ONE).max(Vec3::ZERO);
    let adjusted = Vec3::new(
        (1.0 + rest.x).log10(),
        (1.0 + rest.y).log10(),
        (1.0 + rest.z).log10(),
    );
    (color - adjusted).clamp(Vec3::ZERO, Vec3::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanct_core::{Light, Mesh};

    fn scene_with(materials: Vec<Material>) -> Scene {
        let mut scene = Scene::new("shading", &Settings::default());
        for material in materials {
            scene.add_material(material).unwrap();
        }
        scene.set_background(Vec3::new(0.1, 0.2, 0.3));
        scene
    }

    fn forward_task() -> TraceTask {
        TraceTask::primary(Ray::new(Vec3::ZERO, Vec3::NEG_Z), 0, 0)
    }

    /// Head-on hit on a surface facing +Z at z = -3.
    fn front_hit(material: usize) -> TraceHit {
        TraceHit {
            t: 3.0,
            p: Vec3::new(0.0, 0.0, -3.0),
            n: Vec3::Z,
            material,
            triangle: Some(0),
            kind: HitKind::Success,
            ..Default::default()
        }
    }

    fn run(scene: &Scene, task: &TraceTask, hit: &TraceHit) -> ShadeOutcome {
        let settings = Settings::default();
        let ctx = ShadeContext {
            scene,
            settings: &settings,
        };
        shade(&ctx, task, hit).unwrap()
    }

    #[test]
    fn test_miss_resolves_to_background() {
        let scene = scene_with(vec![]);
        let out = run(&scene, &forward_task(), &TraceHit::default());
        assert!(out.sky);
        assert!(out.children.is_empty());
        assert_eq!(out.sample, Some(Shade::normal(Vec3::new(0.1, 0.2, 0.3), 1.0)));
    }

    #[test]
    fn test_max_depth_resolves_to_background() {
        let scene = scene_with(vec![Material::diffuse(Vec3::ONE)]);
        let task = TraceTask {
            depth: Settings::default().max_depth,
            ..forward_task()
        };
        let out = run(&scene, &task, &front_hit(0));
        assert!(out.sky);
    }

    #[test]
    fn test_void_material_is_an_error() {
        let scene = scene_with(vec![Material::new(MaterialKind::Void, Vec3::ONE)]);
        let settings = Settings::default();
        let ctx = ShadeContext {
            scene: &scene,
            settings: &settings,
        };
        assert!(matches!(
            shade(&ctx, &forward_task(), &front_hit(0)),
            Err(RenderError::UnhandledMaterial(0))
        ));
        assert!(matches!(
            shade(&ctx, &forward_task(), &front_hit(4)),
            Err(RenderError::MissingMaterial(4))
        ));
    }

    #[test]
    fn test_diffuse_lit_by_point_light() {
        let mut scene = scene_with(vec![Material::diffuse(Vec3::splat(0.5))]);
        scene.set_ambient(Vec3::ZERO);
        // 4*pi*r^2 intensity at distance 1 gives unit irradiance head-on
        let intensity = 4.0 * std::f32::consts::PI;
        scene.add_light(Light::point(Vec3::new(0.0, 0.0, -2.0), Vec3::ONE, intensity));

        let out = run(&scene, &forward_task(), &front_hit(0));
        let shade = out.sample.unwrap();
        assert!(out.children.is_empty());
        assert!((shade.color - Vec3::splat(0.5)).length() < 1e-2);
        assert_eq!(shade.weight, 1.0);
    }

    #[test]
    fn test_diffuse_ambient_only() {
        let mut scene = scene_with(vec![Material::diffuse(Vec3::splat(0.5))]);
        scene.set_ambient(Vec3::ONE);
        let shade = run(&scene, &forward_task(), &front_hit(0)).sample.unwrap();
        // ambient * albedo, then * albedo again
        assert!((shade.color - Vec3::splat(0.25)).length() < 1e-6);
    }

    #[test]
    fn test_constant() {
        let scene = scene_with(vec![Material::constant(Vec3::new(0.3, 0.6, 0.9))]);
        let shade = run(&scene, &forward_task(), &front_hit(0)).sample.unwrap();
        assert_eq!(shade.color, Vec3::new(0.3, 0.6, 0.9));
    }

    #[test]
    fn test_reflective_splits_weight() {
        let scene = scene_with(vec![Material::reflective(Vec3::ONE)]);
        let task = forward_task();
        let out = run(&scene, &task, &front_hit(0));

        let diffuse = out.sample.unwrap();
        assert!((diffuse.weight - 0.2).abs() < 1e-6);
        assert_eq!(out.children.len(), 1);
        let child = &out.children[0];
        assert!((child.weight - 0.8).abs() < 1e-6);
        assert_eq!(child.depth, 1);
        assert!((child.ray.direction() - Vec3::Z).length() < 1e-6);
        assert!(child.ray.origin.z > -3.0);
    }

    #[test]
    fn test_refractive_entering() {
        let scene = scene_with(vec![Material::refractive(1.5)]);
        let out = run(&scene, &forward_task(), &front_hit(0));
        assert!(out.sample.is_none());
        assert_eq!(out.children.len(), 2);

        let (reflected, refracted) = (&out.children[0], &out.children[1]);
        // F0 = (0.5 / 2.5)^2
        assert!((reflected.weight - 0.04).abs() < 1e-5);
        assert!((refracted.weight - 0.96).abs() < 1e-5);
        assert_eq!(reflected.ior, 1.0);
        assert_eq!(refracted.ior, 1.5);
        assert!((refracted.ray.direction() - Vec3::NEG_Z).length() < 1e-5);
        assert!(refracted.ray.origin.z < -3.0);
        assert!(reflected.ray.origin.z > -3.0);
    }

    #[test]
    fn test_index_matched_interface_only_transmits() {
        let scene = scene_with(vec![Material::refractive(1.0)]);
        let out = run(&scene, &forward_task(), &front_hit(0));
        assert_eq!(out.children.len(), 1);
        let refracted = &out.children[0];
        assert!((refracted.ray.direction() - Vec3::NEG_Z).length() < 1e-6);
        assert!(refracted.weight < 1.0);
        assert!(refracted.weight > 0.999);
    }

    #[test]
    fn test_refractive_total_internal_reflection() {
        let scene = scene_with(vec![Material::refractive(1.5)]);
        // leaving glass at 60 degrees from the normal
        let direction = Vec3::new(60f32.to_radians().sin(), 0.0, -60f32.to_radians().cos());
        let task = TraceTask::primary(Ray::new(Vec3::ZERO, direction), 0, 0).with_ior(1.5);
        let hit = TraceHit {
            n: Vec3::NEG_Z,
            kind: HitKind::InsideRefractive,
            ..front_hit(0)
        };
        let out = run(&scene, &task, &hit);
        assert_eq!(out.children.len(), 1);
        let reflected = out.children[0];
        assert!(reflected.ray.direction().z > 0.0);
        assert!(reflected.weight < task.weight);
    }

    #[test]
    fn test_debug_accel_continues_through_surface() {
        let scene = scene_with(vec![Material::new(MaterialKind::DebugAccel, Vec3::ONE)]);
        let hit = TraceHit {
            tree_depth: 4,
            ..front_hit(0)
        };
        let out = run(&scene, &forward_task(), &hit);
        let shade = out.sample.unwrap();
        assert_eq!(shade.color, Vec3::Y);
        assert!((shade.weight - 0.6).abs() < 1e-6);
        let child = &out.children[0];
        assert!((child.ray.origin - Vec3::new(0.0, 0.0, -3.5)).length() < 1e-5);
        assert_eq!(child.depth, 1);
    }

    #[test]
    fn test_debug_normal_uv_bary() {
        let scene = scene_with(vec![
            Material::new(MaterialKind::DebugNormal, Vec3::ONE),
            Material::new(MaterialKind::DebugUv, Vec3::ONE),
            Material::new(MaterialKind::DebugBary, Vec3::ONE),
        ]);
        let hit = TraceHit {
            u: 0.2,
            v: 0.4,
            bary_u: 0.1,
            bary_v: 0.7,
            ..front_hit(0)
        };
        let color = |material| {
            let hit = TraceHit { material, ..hit };
            run(&scene, &forward_task(), &hit).sample.unwrap().color
        };
        assert_eq!(color(0), Vec3::new(0.5, 0.5, 1.0));
        assert_eq!(color(1), Vec3::new(0.2, 0.0, 0.4));
        assert_eq!(color(2), Vec3::new(0.1, 0.0, 0.7));
    }

    #[test]
    fn test_children_are_lighter_and_bounded() {
        let settings = Settings {
            max_depth: 6,
            ..Default::default()
        };
        let mut scene = scene_with(vec![
            Material::reflective(Vec3::ONE),
            Material::refractive(1.0),
            Material::refractive(1.5),
        ]);
        scene.add_object(Mesh::quad(Vec3::ZERO, Vec3::Z, 1.0, 0)).unwrap();
        let ctx = ShadeContext {
            scene: &scene,
            settings: &settings,
        };

        for material in 0..3 {
            let mut queue = vec![forward_task()];
            let mut processed = 0;
            while let Some(task) = queue.pop() {
                processed += 1;
                assert!(task.depth <= settings.max_depth);
                // every task hits the same kind of surface, facing it
                let hit = TraceHit {
                    n: -task.ray.direction(),
                    ..front_hit(material)
                };
                let out = shade(&ctx, &task, &hit).unwrap();
                for child in &out.children {
                    assert!(child.weight < task.weight, "material {material}");
                    assert_eq!(child.depth, task.depth + 1);
                }
                queue.extend(out.children);
            }
            assert!(processed > 1);
        }
    }

    #[test]
    fn test_schlick() {
        assert!((schlick(Vec3::NEG_Z, Vec3::Z, 1.0, 1.5) - 0.04).abs() < 1e-6);
        assert!((schlick(Vec3::X, Vec3::Z, 1.0, 1.5) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_clamp_overexposure() {
        assert_eq!(clamp_overexposure(Vec3::splat(0.5)), Vec3::splat(0.5));
        assert_eq!(clamp_overexposure(Vec3::new(3.0, -1.0, 1.0)), Vec3::new(1.0, 0.0, 1.0));
    }
}
