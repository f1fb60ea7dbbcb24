//! Sanct Core - scene model and spatial index for the Sanct ray tracer.
//!
//! This crate provides:
//!
//! - **Geometry**: [`Mesh`] input, indexed [`Triangle`]s and the [`KdTree`]
//! - **Surfaces**: [`Material`], [`Texture`], [`Skybox`] and bitmap [`Image`]s
//! - **Scene**: [`Scene`] with ray intersection and shadow queries
//! - **Configuration**: [`Settings`] loaded from JSON
//!
//! # Example
//!
//! ```ignore
//! use sanct_core::{Material, Mesh, Scene, Settings};
//! use sanct_math::{Ray, Vec3};
//!
//! let settings = Settings::default();
//! let mut scene = Scene::new("demo", &settings);
//! let red = scene.add_material(Material::diffuse(Vec3::X))?;
//! scene.add_object(Mesh::quad(Vec3::new(0.0, 0.0, -2.0), Vec3::Z, 1.0, red))?;
//! scene.build()?;
//!
//! let hit = scene.intersect(&Ray::new(Vec3::ZERO, Vec3::NEG_Z));
//! assert!(hit.successful());
//! ```

pub mod bitmap;
pub mod camera;
pub mod error;
pub mod hit;
pub mod kdtree;
pub mod light;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod settings;
pub mod skybox;
pub mod texture;
pub mod triangle;

// Re-export commonly used types
pub use bitmap::{Color8, Image};
pub use camera::{Camera, CameraFrame};
pub use error::{SceneError, SceneResult};
pub use hit::{HitKind, TraceHit};
pub use kdtree::{KdNode, KdTree, KdTreeParams, KdTreeStats};
pub use light::{Light, LightKind};
pub use material::{Material, MaterialKind};
pub use mesh::Mesh;
pub use scene::Scene;
pub use settings::{Rect, Settings};
pub use skybox::Skybox;
pub use texture::{Texture, TextureKind};
pub use triangle::{Surface, Triangle};
