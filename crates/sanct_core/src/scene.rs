//! Triangle scene with a KD-tree intersection surface.
//!
//! The scene owns all geometry, materials, textures and lights. Geometry edits
//! mark it dirty; [`Scene::build`] recomputes normals, triangle boxes and the
//! KD-tree and must run before the scene is rendered.

use std::ops::Range;
use std::time::Instant;

use sanct_math::{Aabb, Ray, Vec2, Vec3};

use crate::camera::Camera;
use crate::error::{SceneError, SceneResult};
use crate::hit::{HitKind, TraceHit};
use crate::kdtree::{KdTree, KdTreeParams};
use crate::light::Light;
use crate::material::Material;
use crate::mesh::Mesh;
use crate::settings::Settings;
use crate::skybox::Skybox;
use crate::texture::Texture;
use crate::triangle::{Surface, Triangle};

#[derive(Debug, Clone)]
pub struct Scene {
    name: String,

    vertices: Vec<Vec3>,
    uvs: Vec<Vec2>,
    triangles: Vec<Triangle>,
    /// Triangle range of every added object
    objects: Vec<Range<usize>>,

    materials: Vec<Material>,
    textures: Vec<Texture>,
    lights: Vec<Light>,
    camera: Camera,
    background: Vec3,
    ambient: Vec3,
    skybox: Option<Skybox>,

    // Rebuilt by build()
    vertex_normals: Vec<Vec3>,
    triangle_aabbs: Vec<Aabb>,
    tree: KdTree,
    params: KdTreeParams,
    dirty: bool,
}

impl Scene {
    /// Create an empty scene using the KD-tree parameters from `settings`.
    pub fn new(name: impl Into<String>, settings: &Settings) -> Self {
        Self::with_params(name, settings.kd_tree_params())
    }

    pub fn with_params(name: impl Into<String>, params: KdTreeParams) -> Self {
        Self {
            name: name.into(),
            vertices: Vec::new(),
            uvs: Vec::new(),
            triangles: Vec::new(),
            objects: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
            lights: Vec::new(),
            camera: Camera::default(),
            background: Vec3::ZERO,
            ambient: Vec3::ZERO,
            skybox: None,
            vertex_normals: Vec::new(),
            triangle_aabbs: Vec::new(),
            tree: KdTree::default(),
            params,
            dirty: false,
        }
    }

    // --- editing ---

    /// Append a mesh, re-basing its indices. Returns the object index.
    pub fn add_object(&mut self, mesh: Mesh) -> SceneResult<usize> {
        mesh.validate()?;

        let vertex_offset = self.vertices.len();
        let first_triangle = self.triangles.len();
        let vertex_count = mesh.vertex_count();

        self.vertices.extend(mesh.positions);
        if mesh.uvs.is_empty() {
            self.uvs.extend(std::iter::repeat(Vec2::ZERO).take(vertex_count));
        } else {
            self.uvs.extend(mesh.uvs);
        }
        self.triangles.extend(
            mesh.faces
                .iter()
                .map(|face| Triangle::new(face.map(|v| v + vertex_offset), mesh.material)),
        );

        self.objects.push(first_triangle..self.triangles.len());
        self.dirty = true;
        Ok(self.objects.len() - 1)
    }

    /// Add a material after checking its weight split and texture reference.
    ///
    /// Textures must be added before the materials that use them.
    pub fn add_material(&mut self, material: Material) -> SceneResult<usize> {
        let index = self.materials.len();
        material.validate(index, self.textures.len())?;
        self.materials.push(material);
        Ok(index)
    }

    pub fn add_texture(&mut self, texture: Texture) -> usize {
        self.textures.push(texture);
        self.textures.len() - 1
    }

    pub fn add_light(&mut self, light: Light) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    /// Flat sky color; also the ambient term while no skybox is set.
    pub fn set_background(&mut self, color: Vec3) {
        self.background = color;
        if self.skybox.is_none() {
            self.ambient = color;
        }
    }

    /// Use a cube map for sky lookups and its mean color as ambient.
    pub fn set_skybox(&mut self, skybox: Skybox) {
        self.ambient = skybox.ambient_color();
        self.skybox = Some(skybox);
    }

    pub fn set_ambient(&mut self, color: Vec3) {
        self.ambient = color;
    }

    // --- build ---

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Fail with [`SceneError::Dirty`] unless the scene is built.
    pub fn ensure_built(&self) -> SceneResult<()> {
        if self.dirty {
            Err(SceneError::Dirty)
        } else {
            Ok(())
        }
    }

    /// Recompute normals and triangle boxes, then rebuild the KD-tree.
    pub fn build(&mut self) -> SceneResult<()> {
        let start = Instant::now();

        for (index, triangle) in self.triangles.iter().enumerate() {
            if triangle.material >= self.materials.len() {
                return Err(SceneError::MissingMaterial {
                    triangle: index,
                    material: triangle.material,
                });
            }
        }

        self.build_triangle_normals();
        self.build_vertex_normals();
        self.triangle_aabbs = self
            .triangles
            .iter()
            .map(|t| t.aabb(&self.vertices))
            .collect();
        self.tree = KdTree::build(&self.triangle_aabbs, self.params);
        self.dirty = false;

        let stats = self.tree.stats();
        log::debug!(
            "KD-tree: {} nodes, {} leaves, depth {}, {} refs",
            stats.nodes,
            stats.leaves,
            stats.max_depth,
            stats.references
        );
        log::info!(
            "Built scene '{}': {} triangles, {} vertices in {:.2?}",
            self.name,
            self.triangles.len(),
            self.vertices.len(),
            start.elapsed()
        );
        Ok(())
    }

    fn build_triangle_normals(&mut self) {
        let mut degenerate = 0;
        for triangle in &mut self.triangles {
            triangle.build_normal(&self.vertices);
            if triangle.normal() == Vec3::ZERO {
                degenerate += 1;
            }
        }
        if degenerate > 0 {
            log::warn!("Scene '{}' has {} degenerate triangles", self.name, degenerate);
        }
    }

    /// Sum of the unit normals of every adjacent triangle, renormalized.
    fn build_vertex_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.vertices.len()];
        for triangle in &self.triangles {
            for &v in &triangle.vertices {
                normals[v] += triangle.normal();
            }
        }
        for normal in &mut normals {
            *normal = normal.normalize_or_zero();
        }
        self.vertex_normals = normals;
    }

    // --- queries ---

    fn surface(&self) -> Surface<'_> {
        Surface {
            vertices: &self.vertices,
            uvs: &self.uvs,
            vertex_normals: &self.vertex_normals,
            triangle_aabbs: &self.triangle_aabbs,
            materials: &self.materials,
        }
    }

    /// Closest successful hit through the KD-tree.
    pub fn intersect(&self, ray: &Ray) -> TraceHit {
        let surface = self.surface();
        self.tree
            .traverse(ray, |i| self.triangles[i].intersect(&surface, ray, i))
    }

    /// Closest successful hit by testing every triangle.
    pub fn intersect_linear(&self, ray: &Ray) -> TraceHit {
        let surface = self.surface();
        self.triangles
            .iter()
            .enumerate()
            .map(|(i, t)| t.intersect(&surface, ray, i))
            .filter(TraceHit::successful)
            .min_by(|a, b| a.t.total_cmp(&b.t))
            .unwrap_or_else(|| TraceHit::miss(HitKind::OutOfBounds))
    }

    /// True if any shadow-casting triangle crosses the segment `from..to`.
    pub fn is_occluded(&self, from: Vec3, to: Vec3) -> bool {
        self.triangles.iter().any(|t| {
            self.materials.get(t.material).is_some_and(|m| m.occludes)
                && t.fast_intersect(&self.vertices, from, to)
        })
    }

    /// New built scene holding only `triangle_ids`, sharing everything but geometry.
    ///
    /// Vertices are compacted in first-seen order.
    pub fn cut(&self, triangle_ids: &[usize]) -> SceneResult<Scene> {
        let mut scene = self.clone_without_geometry();

        let mut remap: Vec<Option<usize>> = vec![None; self.vertices.len()];
        let mut positions = Vec::new();
        let mut uvs = Vec::new();
        let mut triangles = Vec::with_capacity(triangle_ids.len());

        for &id in triangle_ids {
            let triangle = self
                .triangles
                .get(id)
                .ok_or(SceneError::TriangleOutOfRange(id))?;
            let face = triangle.vertices.map(|v| {
                *remap[v].get_or_insert_with(|| {
                    positions.push(self.vertices[v]);
                    uvs.push(self.uvs[v]);
                    positions.len() - 1
                })
            });
            triangles.push(Triangle::new(face, triangle.material));
        }

        if !triangles.is_empty() {
            scene.objects.push(0..triangles.len());
            scene.vertices = positions;
            scene.uvs = uvs;
            scene.triangles = triangles;
        }
        scene.build()?;
        log::info!(
            "Cut scene '{}' to {} of {} triangles",
            self.name,
            scene.triangles.len(),
            self.triangles.len()
        );
        Ok(scene)
    }

    fn clone_without_geometry(&self) -> Scene {
        Scene {
            name: self.name.clone(),
            vertices: Vec::new(),
            uvs: Vec::new(),
            triangles: Vec::new(),
            objects: Vec::new(),
            materials: self.materials.clone(),
            textures: self.textures.clone(),
            lights: self.lights.clone(),
            camera: self.camera,
            background: self.background,
            ambient: self.ambient,
            skybox: self.skybox.clone(),
            vertex_normals: Vec::new(),
            triangle_aabbs: Vec::new(),
            tree: KdTree::default(),
            params: self.params,
            dirty: false,
        }
    }

    // --- accessors ---

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn objects(&self) -> &[Range<usize>] {
        &self.objects
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertex_normals(&self) -> &[Vec3] {
        &self.vertex_normals
    }

    pub fn triangle_aabbs(&self) -> &[Aabb] {
        &self.triangle_aabbs
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn material(&self, index: usize) -> Option<&Material> {
        self.materials.get(index)
    }

    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn background(&self) -> Vec3 {
        self.background
    }

    pub fn ambient(&self) -> Vec3 {
        self.ambient
    }

    pub fn skybox(&self) -> Option<&Skybox> {
        self.skybox.as_ref()
    }

    pub fn tree(&self) -> &KdTree {
        &self.tree
    }

    /// Sky color seen along `direction`.
    pub fn sky(&self, direction: Vec3) -> Vec3 {
        match &self.skybox {
            Some(skybox) => skybox.sample(direction),
            None => self.background,
        }
    }
}
