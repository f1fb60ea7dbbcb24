//! KD-tree over triangle bounding boxes.
//!
//! Nodes live in a flat arena with the root at index 0. Internal nodes split
//! their box at the midpoint of its longest axis; a triangle is referenced
//! by every child whose box overlaps the triangle's cached box, so the same
//! triangle may appear in several leaves.
//!
//! Traversal visits children nearest-first and stops at the first child that
//! produces a hit. Leaves only accept hits whose point lies inside the leaf,
//! which keeps a triangle shared by two leaves from being reported by the
//! farther one.

use sanct_math::{Aabb, Interval, Ray};

use crate::hit::{HitKind, TraceHit};

/// Nodes whose widest extent is at or below this are never split.
const MIN_NODE_EXTENT: f32 = 1e-4;

/// Build parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdTreeParams {
    pub max_triangles_per_leaf: usize,
    pub max_depth: usize,
}

impl Default for KdTreeParams {
    fn default() -> Self {
        Self {
            max_triangles_per_leaf: 4,
            max_depth: 12345,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KdNode {
    pub aabb: Aabb,
    /// Split axis (0, 1, 2); meaningless for leaves.
    pub axis: usize,
    pub depth: usize,
    /// Arena indices of the lower and upper child.
    pub children: Option<[usize; 2]>,
    /// Triangle references, only populated in leaves.
    pub triangles: Vec<usize>,
}

impl KdNode {
    fn leaf(aabb: Aabb, depth: usize) -> Self {
        Self {
            aabb,
            axis: 0,
            depth,
            children: None,
            triangles: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Shape of a built tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KdTreeStats {
    pub nodes: usize,
    pub leaves: usize,
    pub max_depth: usize,
    /// Sum of leaf reference counts (>= triangle count when triangles straddle splits).
    pub references: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KdTree {
    nodes: Vec<KdNode>,
}

struct PendingNode {
    node: usize,
    triangles: Vec<usize>,
}

/// True when every referenced box spans `node` on all three axes.
///
/// Such references land in both children of every split below `node`.
fn inseparable(node: &Aabb, triangles: &[usize], aabbs: &[Aabb]) -> bool {
    triangles.iter().all(|&t| {
        let bounds = &aabbs[t];
        bounds.min.cmple(node.min).all() && bounds.max.cmpge(node.max).all()
    })
}

impl KdTree {
    /// Build over cached triangle boxes; triangle `i` is `aabbs[i]`.
    pub fn build(aabbs: &[Aabb], params: KdTreeParams) -> Self {
        let root = if aabbs.is_empty() {
            Aabb::EMPTY
        } else {
            Aabb::enclosing(aabbs)
        };

        let mut nodes = vec![KdNode::leaf(root, 0)];
        let mut pending = vec![PendingNode {
            node: 0,
            triangles: (0..aabbs.len()).collect(),
        }];

        while let Some(PendingNode { node, triangles }) = pending.pop() {
            let aabb = nodes[node].aabb;
            let depth = nodes[node].depth;
            let axis = aabb.longest_axis();
            let extent = aabb.size()[axis];

            if depth >= params.max_depth
                || triangles.len() <= params.max_triangles_per_leaf
                || extent <= MIN_NODE_EXTENT
                || inseparable(&aabb, &triangles, aabbs)
            {
                nodes[node].triangles = triangles;
                continue;
            }

            let split = 0.5 * (aabb.min[axis] + aabb.max[axis]);
            let (lower_box, upper_box) = aabb.split(axis, split);

            let mut lower = Vec::new();
            let mut upper = Vec::new();
            for &triangle in &triangles {
                let bounds = &aabbs[triangle];
                if lower_box.overlaps(bounds) {
                    lower.push(triangle);
                }
                if upper_box.overlaps(bounds) {
                    upper.push(triangle);
                }
            }
            debug_assert!(lower.len() + upper.len() >= triangles.len());

            let first = nodes.len();
            nodes.push(KdNode::leaf(lower_box, depth + 1));
            nodes.push(KdNode::leaf(upper_box, depth + 1));
            nodes[node].axis = axis;
            nodes[node].children = Some([first, first + 1]);

            pending.push(PendingNode {
                node: first + 1,
                triangles: upper,
            });
            pending.push(PendingNode {
                node: first,
                triangles: lower,
            });
        }

        Self { nodes }
    }

    pub fn nodes(&self) -> &[KdNode] {
        &self.nodes
    }

    pub fn root(&self) -> Option<&KdNode> {
        self.nodes.first()
    }

    /// Closest hit along `ray`.
    ///
    /// `intersect(i)` tests triangle `i`. Returns an `OutOfBounds` hit when
    /// nothing is hit.
    pub fn traverse<F>(&self, ray: &Ray, mut intersect: F) -> TraceHit
    where
        F: FnMut(usize) -> TraceHit,
    {
        if self.nodes.is_empty() {
            return TraceHit::default();
        }
        self.traverse_node(0, ray, &mut intersect)
            .unwrap_or_else(|| TraceHit::miss(HitKind::OutOfBounds))
    }

    fn traverse_node<F>(&self, index: usize, ray: &Ray, intersect: &mut F) -> Option<TraceHit>
    where
        F: FnMut(usize) -> TraceHit,
    {
        let node = &self.nodes[index];
        if !node.aabb.hit(ray, Interval::forward()) {
            return None;
        }

        let Some([lower, upper]) = node.children else {
            return self.intersect_leaf(node, intersect);
        };

        let (near, far) = self.order_children(lower, upper, ray);
        self.traverse_node(near, ray, intersect)
            .or_else(|| self.traverse_node(far, ray, intersect))
    }

    fn intersect_leaf<F>(&self, node: &KdNode, intersect: &mut F) -> Option<TraceHit>
    where
        F: FnMut(usize) -> TraceHit,
    {
        let mut best: Option<TraceHit> = None;
        for &triangle in &node.triangles {
            let hit = intersect(triangle);
            if !hit.successful() || !node.aabb.contains(hit.p) {
                continue;
            }
            if best.map_or(true, |b| hit.t < b.t) {
                best = Some(TraceHit {
                    tree_depth: node.depth,
                    ..hit
                });
            }
        }
        best
    }

    /// The child holding the ray origin first, otherwise the one the ray enters first.
    fn order_children(&self, lower: usize, upper: usize, ray: &Ray) -> (usize, usize) {
        let (a, b) = (&self.nodes[lower].aabb, &self.nodes[upper].aabb);
        if a.contains(ray.origin) {
            return (lower, upper);
        }
        if b.contains(ray.origin) {
            return (upper, lower);
        }
        let entry_a = a.entry(ray, Interval::forward()).unwrap_or(f32::INFINITY);
        let entry_b = b.entry(ray, Interval::forward()).unwrap_or(f32::INFINITY);
        if entry_a <= entry_b {
            (lower, upper)
        } else {
            (upper, lower)
        }
    }

    pub fn stats(&self) -> KdTreeStats {
        let mut stats = KdTreeStats {
            nodes: self.nodes.len(),
            ..Default::default()
        };
        for node in self.nodes.iter().filter(|n| n.is_leaf()) {
            stats.leaves += 1;
            stats.references += node.triangles.len();
            stats.max_depth = stats.max_depth.max(node.depth);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanct_math::Vec3;

    fn unit_boxes(centers: &[Vec3]) -> Vec<Aabb> {
        centers
            .iter()
            .map(|&c| Aabb::from_points(c - Vec3::splat(0.1), c + Vec3::splat(0.1)))
            .collect()
    }

    /// Stand-in intersector: a "hit" at the box centre of triangle `i`.
    fn centre_hits(aabbs: &[Aabb], ray: &Ray, i: usize) -> TraceHit {
        let c = aabbs[i].centroid();
        let to = c - ray.origin;
        let t = to.dot(ray.direction());
        if t > 0.0 && (ray.at(t) - c).length() < 1e-3 {
            TraceHit {
                t,
                p: c,
                triangle: Some(i),
                kind: HitKind::Success,
                ..Default::default()
            }
        } else {
            TraceHit::miss(HitKind::OutOfBounds)
        }
    }

    #[test]
    fn test_small_set_is_single_leaf() {
        let aabbs = unit_boxes(&[Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z]);
        let tree = KdTree::build(&aabbs, KdTreeParams::default());
        assert_eq!(tree.nodes().len(), 1);
        let root = tree.root().unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.triangles, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_empty_tree_misses() {
        let tree = KdTree::build(&[], KdTreeParams::default());
        let hit = tree.traverse(&Ray::new(Vec3::ZERO, Vec3::X), |_| unreachable!());
        assert_eq!(hit.kind, HitKind::OutOfBounds);
    }

    #[test]
    fn test_split_refs_overlap_children() {
        let centers: Vec<Vec3> = (0..8).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        let aabbs = unit_boxes(&centers);
        let params = KdTreeParams {
            max_triangles_per_leaf: 1,
            max_depth: 16,
        };
        let tree = KdTree::build(&aabbs, params);
        let root = tree.root().unwrap();
        assert_eq!(root.axis, 0);
        assert!(!root.is_leaf());

        // every leaf reference overlaps its leaf, and every triangle is referenced
        let mut seen = vec![false; aabbs.len()];
        for node in tree.nodes().iter().filter(|n| n.is_leaf()) {
            for &t in &node.triangles {
                assert!(node.aabb.overlaps(&aabbs[t]));
                seen[t] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));

        let stats = tree.stats();
        assert_eq!(stats.nodes, tree.nodes().len());
        assert!(stats.leaves >= 8);
        assert!(stats.references >= 8);
    }

    #[test]
    fn test_max_depth_stops_splitting() {
        let centers: Vec<Vec3> = (0..64).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        let aabbs = unit_boxes(&centers);
        let params = KdTreeParams {
            max_triangles_per_leaf: 1,
            max_depth: 2,
        };
        let tree = KdTree::build(&aabbs, params);
        assert_eq!(tree.stats().max_depth, 2);
        assert_eq!(tree.stats().leaves, 4);
    }

    #[test]
    fn test_stacked_boxes_terminate() {
        // identical boxes can never be separated
        let aabbs = unit_boxes(&[Vec3::ZERO; 10]);
        let params = KdTreeParams {
            max_triangles_per_leaf: 2,
            max_depth: 12345,
        };
        let tree = KdTree::build(&aabbs, params);
        assert_eq!(tree.nodes().len(), 1);
        assert_eq!(tree.root().unwrap().triangles.len(), 10);
    }

    #[test]
    fn test_long_parallel_boxes_split_apart() {
        // x wins the longest-axis choice for several levels before y separates them
        let aabbs: Vec<Aabb> = (0..10)
            .map(|i| {
                let y = i as f32;
                Aabb::from_points(Vec3::new(0.0, y - 0.1, -0.1), Vec3::new(100.0, y + 0.1, 0.1))
            })
            .collect();
        let params = KdTreeParams {
            max_triangles_per_leaf: 1,
            max_depth: 64,
        };
        let tree = KdTree::build(&aabbs, params);
        let stats = tree.stats();
        assert!(stats.max_depth > 3);
        let largest = tree
            .nodes()
            .iter()
            .filter(|n| n.is_leaf())
            .map(|n| n.triangles.len())
            .max()
            .unwrap();
        assert_eq!(largest, 1);
    }

    #[test]
    fn test_covering_box_stops_split_only_when_all_cover() {
        let node = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        let aabbs = vec![
            Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(2.0)),
            Aabb::from_points(Vec3::ZERO, Vec3::ONE),
            Aabb::from_points(Vec3::ZERO, Vec3::new(0.5, 1.0, 1.0)),
        ];
        assert!(inseparable(&node, &[0, 1], &aabbs));
        assert!(!inseparable(&node, &[0, 1, 2], &aabbs));
    }

    #[test]
    fn test_traverse_returns_nearest() {
        let centers: Vec<Vec3> = (0..10).map(|i| Vec3::new(0.0, 0.0, -(i as f32) - 1.0)).collect();
        let aabbs = unit_boxes(&centers);
        let params = KdTreeParams {
            max_triangles_per_leaf: 1,
            max_depth: 16,
        };
        let tree = KdTree::build(&aabbs, params);

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let hit = tree.traverse(&ray, |i| centre_hits(&aabbs, &ray, i));
        assert_eq!(hit.triangle, Some(0));
        assert!((hit.t - 1.0).abs() < 1e-5);
        assert!(hit.tree_depth > 0);

        // looking the other way from behind the row
        let ray = Ray::new(Vec3::new(0.0, 0.0, -20.0), Vec3::Z);
        let hit = tree.traverse(&ray, |i| centre_hits(&aabbs, &ray, i));
        assert_eq!(hit.triangle, Some(9));
    }
}
