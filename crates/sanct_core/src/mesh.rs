//! Mesh input for scene construction.
//!
//! A mesh is a self-contained vertex/face list using local indices. The scene
//! re-bases those indices when the mesh is added.

use sanct_math::{Aabb, Vec2, Vec3};

use crate::error::{SceneError, SceneResult};

/// Triangle mesh with one material for all faces.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    /// Vertex positions
    pub positions: Vec<Vec3>,

    /// Texture coordinates, either empty or one per vertex
    pub uvs: Vec<Vec2>,

    /// Counter-clockwise triangles as local vertex indices
    pub faces: Vec<[usize; 3]>,

    /// Scene material index shared by every face
    pub material: usize,
}

impl Mesh {
    pub fn new(positions: Vec<Vec3>, faces: Vec<[usize; 3]>, material: usize) -> Self {
        Self {
            positions,
            uvs: Vec::new(),
            faces,
            material,
        }
    }

    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        self.uvs = uvs;
        self
    }

    /// Axis-aligned square facing `normal`, centred on `center`.
    pub fn quad(center: Vec3, normal: Vec3, size: f32, material: usize) -> Self {
        let normal = normal.normalize_or_zero();
        let (tangent, bitangent) = normal.any_orthonormal_pair();
        let h = size * 0.5;
        let positions = vec![
            center - tangent * h - bitangent * h,
            center + tangent * h - bitangent * h,
            center + tangent * h + bitangent * h,
            center - tangent * h + bitangent * h,
        ];
        let uvs = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        let mut mesh = Self::new(positions, vec![[0, 1, 2], [0, 2, 3]], material).with_uvs(uvs);
        // any_orthonormal_pair may be left-handed relative to `normal`
        if tangent.cross(bitangent).dot(normal) < 0.0 {
            for face in &mut mesh.faces {
                face.swap(1, 2);
            }
        }
        mesh
    }

    /// Axis-aligned box with outward-facing triangles.
    pub fn cuboid(min: Vec3, max: Vec3, material: usize) -> Self {
        let corner = |i: usize| {
            Vec3::new(
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            )
        };
        let positions = (0..8).map(corner).collect();
        let faces = vec![
            // -X, +X
            [0, 4, 6],
            [0, 6, 2],
            [1, 3, 7],
            [1, 7, 5],
            // -Y, +Y
            [0, 1, 5],
            [0, 5, 4],
            [2, 6, 7],
            [2, 7, 3],
            // -Z, +Z
            [0, 2, 3],
            [0, 3, 1],
            [4, 5, 7],
            [4, 7, 6],
        ];
        Self::new(positions, faces, material)
    }

    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty()
    }

    pub fn bounds(&self) -> Aabb {
        self.positions
            .iter()
            .fold(Aabb::EMPTY, |acc, &p| Aabb::surrounding(&acc, &Aabb::from_points(p, p)))
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Check local indices and the uv count.
    pub fn validate(&self) -> SceneResult<()> {
        if self.has_uvs() && self.uvs.len() != self.positions.len() {
            return Err(SceneError::UvCountMismatch {
                vertices: self.positions.len(),
                uvs: self.uvs.len(),
            });
        }
        for (triangle, face) in self.faces.iter().enumerate() {
            if let Some(&vertex) = face.iter().find(|&&v| v >= self.positions.len()) {
                return Err(SceneError::MissingVertex { triangle, vertex });
            }
        }
        Ok(())
    }
}
