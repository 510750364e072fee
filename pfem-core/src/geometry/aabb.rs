//! Axis-aligned bounding box tree over mesh facets.
//!
//! Facets are fan-triangulated and stored in an R-tree. The tree is built
//! once and only read afterwards, so it can be shared across rayon workers.

use crate::mesh::SurfaceMesh;
use crate::types::Point3;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// One triangle of a (possibly fan-triangulated) facet.
#[derive(Debug, Clone)]
pub struct FacetTriangle {
    /// Facet this triangle belongs to.
    pub facet: usize,
    pub corners: [Point3; 3],
}

impl RTreeObject for FacetTriangle {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        let [a, b, c] = &self.corners;
        let min = a.inf(b).inf(c);
        let max = a.sup(b).sup(c);
        AABB::from_corners([min.x, min.y, min.z], [max.x, max.y, max.z])
    }
}

impl PointDistance for FacetTriangle {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let p = Point3::new(point[0], point[1], point[2]);
        (closest_point_on_triangle(&p, &self.corners) - p).norm_squared()
    }
}

/// Facet bounding box tree.
pub struct FacetTree {
    tree: RTree<FacetTriangle>,
}

impl FacetTree {
    /// Build the tree over all facets of `mesh`.
    pub fn new(mesh: &SurfaceMesh) -> Self {
        let mut triangles = Vec::with_capacity(mesh.n_facets());
        for f in 0..mesh.n_facets() {
            let verts = mesh.facet_vertices(f);
            let p0 = mesh.point(verts[0]);
            for w in verts[1..].windows(2) {
                triangles.push(FacetTriangle {
                    facet: f,
                    corners: [p0, mesh.point(w[0]), mesh.point(w[1])],
                });
            }
        }
        Self {
            tree: RTree::bulk_load(triangles),
        }
    }

    pub fn size(&self) -> usize {
        self.tree.size()
    }

    /// Squared distance from `p` to the closest facet (infinite if empty).
    pub fn squared_distance(&self, p: &Point3) -> f64 {
        self.nearest_facet(p).map_or(f64::INFINITY, |(_, _, d)| d)
    }

    /// Closest facet to `p`, the closest point on it and the squared distance.
    pub fn nearest_facet(&self, p: &Point3) -> Option<(usize, Point3, f64)> {
        let tri = self.tree.nearest_neighbor(&[p.x, p.y, p.z])?;
        let q = closest_point_on_triangle(p, &tri.corners);
        Some((tri.facet, q, (q - p).norm_squared()))
    }

    /// Triangles whose bounding box intersects the box `[min, max]`.
    pub fn triangles_in_box(
        &self,
        min: [f64; 3],
        max: [f64; 3],
    ) -> impl Iterator<Item = &FacetTriangle> {
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_corners(min, max))
    }
}

/// Closest point to `p` on triangle `tri`, by Voronoi region classification.
pub fn closest_point_on_triangle(p: &Point3, tri: &[Point3; 3]) -> Point3 {
    let [a, b, c] = tri;
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}
