//! Polygonal surface mesh with optional tetrahedral cells.
//!
//! Facets are stored in a flat corner array, the way indexed polygon meshes
//! usually are: facet `f` owns corners `facet_offsets[f]..facet_offsets[f + 1]`.
//! Vertex positions are kept in either double or single precision; every read
//! goes through [`SurfaceMesh::point`] which widens to `f64`.
//!
//! # Submodules
//!
//! - [`convert`] - dense matrix (V, F, T) exchange
//! - [`tags`] - element type classification
//! - [`volume`] - polyhedral volume mesh with face navigation

use crate::error::{Error, Result};
use crate::types::{Point3, Vec3};
use std::collections::HashMap;

pub mod convert;
pub mod tags;
pub mod volume;

pub use convert::{from_mesh, reorder_mesh, to_mesh, to_mesh_with_cells};
pub use tags::{compute_element_tags, ElementType};
pub use volume::{CellFace, Navigation3DIndex, VolumeMesh};

/// Storage precision of vertex coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    #[default]
    Double,
    Single,
}

#[derive(Debug, Clone)]
enum VertexStorage {
    Double(Vec<[f64; 3]>),
    Single(Vec<[f32; 3]>),
}

/// Polygonal surface mesh.
#[derive(Debug, Clone)]
pub struct SurfaceMesh {
    vertices: VertexStorage,
    facet_offsets: Vec<usize>,
    corners: Vec<usize>,
    cells: Vec<[usize; 4]>,
    boundary_vertex: Vec<bool>,
    /// Facet across the edge leaving each corner, filled by [`SurfaceMesh::connect`].
    adjacency: Vec<Option<usize>>,
}

impl SurfaceMesh {
    /// Create an empty double precision mesh.
    pub fn new() -> Self {
        Self::with_precision(Precision::Double)
    }

    /// Create an empty mesh storing coordinates with the given precision.
    pub fn with_precision(precision: Precision) -> Self {
        let vertices = match precision {
            Precision::Double => VertexStorage::Double(Vec::new()),
            Precision::Single => VertexStorage::Single(Vec::new()),
        };
        Self {
            vertices,
            facet_offsets: vec![0],
            corners: Vec::new(),
            cells: Vec::new(),
            boundary_vertex: Vec::new(),
            adjacency: Vec::new(),
        }
    }

    pub fn precision(&self) -> Precision {
        match self.vertices {
            VertexStorage::Double(_) => Precision::Double,
            VertexStorage::Single(_) => Precision::Single,
        }
    }

    /// Number of vertices in the mesh.
    pub fn n_vertices(&self) -> usize {
        match &self.vertices {
            VertexStorage::Double(v) => v.len(),
            VertexStorage::Single(v) => v.len(),
        }
    }

    /// Number of facets in the mesh.
    pub fn n_facets(&self) -> usize {
        self.facet_offsets.len() - 1
    }

    /// Number of tetrahedral cells.
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// Vertex position, widened to double precision.
    pub fn point(&self, v: usize) -> Point3 {
        match &self.vertices {
            VertexStorage::Double(p) => Point3::new(p[v][0], p[v][1], p[v][2]),
            VertexStorage::Single(p) => {
                Point3::new(p[v][0] as f64, p[v][1] as f64, p[v][2] as f64)
            }
        }
    }

    /// Append a vertex, returning its index.
    pub fn create_vertex(&mut self, p: &Point3) -> usize {
        let idx = self.n_vertices();
        match &mut self.vertices {
            VertexStorage::Double(pts) => pts.push([p.x, p.y, p.z]),
            VertexStorage::Single(pts) => pts.push([p.x as f32, p.y as f32, p.z as f32]),
        }
        self.boundary_vertex.push(false);
        idx
    }

    /// Add a polygonal facet.
    ///
    /// # Errors
    ///
    /// Returns an error if the facet has fewer than 3 vertices or references
    /// a vertex that does not exist.
    pub fn add_facet(&mut self, vertices: &[usize]) -> Result<usize> {
        if vertices.len() < 3 {
            return Err(Error::Mesh(format!(
                "facet requires at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        self.check_indices(vertices)?;

        let idx = self.n_facets();
        self.corners.extend_from_slice(vertices);
        self.facet_offsets.push(self.corners.len());
        self.adjacency.clear();
        Ok(idx)
    }

    /// Add a tetrahedral cell.
    pub fn add_cell(&mut self, vertices: [usize; 4]) -> Result<usize> {
        self.check_indices(&vertices)?;
        self.cells.push(vertices);
        Ok(self.cells.len() - 1)
    }

    fn check_indices(&self, vertices: &[usize]) -> Result<()> {
        let n = self.n_vertices();
        match vertices.iter().find(|&&v| v >= n) {
            Some(v) => Err(Error::Mesh(format!(
                "vertex index {} out of bounds (mesh has {} vertices)",
                v, n
            ))),
            None => Ok(()),
        }
    }

    /// Vertices of facet `f`, in order.
    pub fn facet_vertices(&self, f: usize) -> &[usize] {
        &self.corners[self.facet_offsets[f]..self.facet_offsets[f + 1]]
    }

    /// Number of vertices of facet `f`.
    pub fn facet_size(&self, f: usize) -> usize {
        self.facet_offsets[f + 1] - self.facet_offsets[f]
    }

    /// Range of corner indices owned by facet `f`.
    pub fn facet_corners(&self, f: usize) -> std::ops::Range<usize> {
        self.facet_offsets[f]..self.facet_offsets[f + 1]
    }

    /// Vertices of cell `c`.
    pub fn cell_vertices(&self, c: usize) -> [usize; 4] {
        self.cells[c]
    }

    /// True if every facet is a triangle.
    pub fn facets_are_simplices(&self) -> bool {
        (0..self.n_facets()).all(|f| self.facet_size(f) == 3)
    }

    /// Reverse the winding of facet `f`.
    pub fn flip(&mut self, f: usize) {
        let range = self.facet_corners(f);
        self.corners[range].reverse();
        self.adjacency.clear();
    }

    /// Average of the facet vertices.
    pub fn facet_barycenter(&self, f: usize) -> Point3 {
        let verts = self.facet_vertices(f);
        let sum = verts.iter().fold(Point3::zeros(), |acc, &v| acc + self.point(v));
        sum / verts.len() as f64
    }

    /// Facet normal by Newell's method (not normalized, length = 2 * area).
    pub fn facet_normal(&self, f: usize) -> Vec3 {
        let verts = self.facet_vertices(f);
        let mut n = Vec3::zeros();
        for (i, &v) in verts.iter().enumerate() {
            let p = self.point(v);
            let q = self.point(verts[(i + 1) % verts.len()]);
            n.x += (p.y - q.y) * (p.z + q.z);
            n.y += (p.z - q.z) * (p.x + q.x);
            n.z += (p.x - q.x) * (p.y + q.y);
        }
        n
    }

    /// Axis-aligned bounding box of the vertices.
    pub fn bounds(&self) -> Option<(Point3, Point3)> {
        if self.n_vertices() == 0 {
            return None;
        }
        let mut min = self.point(0);
        let mut max = min;
        for v in 1..self.n_vertices() {
            let p = self.point(v);
            min = min.inf(&p);
            max = max.sup(&p);
        }
        Some((min, max))
    }

    /// Whether vertex `v` lies on the mesh boundary.
    pub fn is_boundary_vertex(&self, v: usize) -> bool {
        self.boundary_vertex.get(v).copied().unwrap_or(false)
    }

    /// Replace the boundary vertex attribute.
    pub fn set_boundary_vertices(&mut self, flags: Vec<bool>) -> Result<()> {
        if flags.len() != self.n_vertices() {
            return Err(Error::Mesh(format!(
                "boundary attribute has {} entries, mesh has {} vertices",
                flags.len(),
                self.n_vertices()
            )));
        }
        self.boundary_vertex = flags;
        Ok(())
    }

    /// Compute facet adjacency across edges.
    ///
    /// Two facets are adjacent when they share an edge, whatever the
    /// direction in which each traverses it. Edges shared by more than two
    /// facets are left unconnected.
    pub fn connect(&mut self) {
        let mut edges: HashMap<(usize, usize), Vec<(usize, usize)>> = HashMap::new();
        for f in 0..self.n_facets() {
            let range = self.facet_corners(f);
            for c in range.clone() {
                let next = if c + 1 == range.end { range.start } else { c + 1 };
                let (a, b) = (self.corners[c], self.corners[next]);
                edges.entry((a.min(b), a.max(b))).or_default().push((f, c));
            }
        }

        self.adjacency = vec![None; self.corners.len()];
        for incident in edges.values() {
            if let [(f0, c0), (f1, c1)] = incident.as_slice() {
                self.adjacency[*c0] = Some(*f1);
                self.adjacency[*c1] = Some(*f0);
            }
        }
    }

    /// Facet adjacent across the edge leaving corner `c`.
    ///
    /// Returns `None` for border edges and before [`SurfaceMesh::connect`].
    pub fn adjacent(&self, c: usize) -> Option<usize> {
        self.adjacency.get(c).copied().flatten()
    }

    pub fn is_connected(&self) -> bool {
        self.adjacency.len() == self.corners.len()
    }

    /// Border edges as (from, to) vertex pairs, and mark their endpoints as
    /// boundary vertices.
    pub fn compute_borders(&mut self) -> Vec<[usize; 2]> {
        if !self.is_connected() {
            self.connect();
        }
        let mut borders = Vec::new();
        let mut flags = vec![false; self.n_vertices()];
        for f in 0..self.n_facets() {
            let range = self.facet_corners(f);
            for c in range.clone() {
                if self.adjacency[c].is_none() {
                    let next = if c + 1 == range.end { range.start } else { c + 1 };
                    let edge = [self.corners[c], self.corners[next]];
                    flags[edge[0]] = true;
                    flags[edge[1]] = true;
                    borders.push(edge);
                }
            }
        }
        self.boundary_vertex = flags;
        borders
    }

    /// Label facets by edge-connected component.
    ///
    /// Returns the number of components and the component of each facet.
    pub fn connected_components(&mut self) -> (usize, Vec<usize>) {
        if !self.is_connected() {
            self.connect();
        }
        let n = self.n_facets();
        let mut component = vec![usize::MAX; n];
        let mut count = 0;
        let mut stack = Vec::new();
        for seed in 0..n {
            if component[seed] != usize::MAX {
                continue;
            }
            component[seed] = count;
            stack.push(seed);
            while let Some(f) = stack.pop() {
                for c in self.facet_corners(f) {
                    if let Some(g) = self.adjacency[c] {
                        if component[g] == usize::MAX {
                            component[g] = count;
                            stack.push(g);
                        }
                    }
                }
            }
            count += 1;
        }
        (count, component)
    }
}

impl Default for SurfaceMesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_triangles() -> SurfaceMesh {
        let mut mesh = SurfaceMesh::new();
        mesh.create_vertex(&Point3::new(0.0, 0.0, 0.0));
        mesh.create_vertex(&Point3::new(1.0, 0.0, 0.0));
        mesh.create_vertex(&Point3::new(1.0, 1.0, 0.0));
        mesh.create_vertex(&Point3::new(0.0, 1.0, 0.0));
        mesh.add_facet(&[0, 1, 2]).unwrap();
        mesh.add_facet(&[0, 2, 3]).unwrap();
        mesh
    }

    #[test]
    fn test_invalid_facet() {
        let mut mesh = two_triangles();
        assert!(mesh.add_facet(&[0, 1]).is_err());
        assert!(mesh.add_facet(&[0, 1, 7]).is_err());
        assert_eq!(mesh.n_facets(), 2);
    }

    #[test]
    fn test_single_precision_roundtrip() {
        let mut mesh = SurfaceMesh::with_precision(Precision::Single);
        let v = mesh.create_vertex(&Point3::new(0.5, 0.25, -2.0));
        assert_eq!(mesh.precision(), Precision::Single);
        assert_eq!(mesh.point(v), Point3::new(0.5, 0.25, -2.0));
    }

    #[test]
    fn test_connect_and_borders() {
        let mut mesh = two_triangles();
        mesh.connect();
        // corner 2 of facet 0 is the edge 2 -> 0, shared with facet 1
        assert_eq!(mesh.adjacent(2), Some(1));
        assert_eq!(mesh.adjacent(3), Some(0));
        assert_eq!(mesh.adjacent(0), None);

        let borders = mesh.compute_borders();
        assert_eq!(borders.len(), 4);
        assert!((0..4).all(|v| mesh.is_boundary_vertex(v)));
    }

    #[test]
    fn test_components() {
        let mut mesh = two_triangles();
        let a = mesh.create_vertex(&Point3::new(5.0, 0.0, 0.0));
        let b = mesh.create_vertex(&Point3::new(6.0, 0.0, 0.0));
        let c = mesh.create_vertex(&Point3::new(5.0, 1.0, 0.0));
        mesh.add_facet(&[a, b, c]).unwrap();

        let (count, component) = mesh.connected_components();
        assert_eq!(count, 2);
        assert_eq!(component, vec![0, 0, 1]);
    }

    #[test]
    fn test_flip_and_normal() {
        let mut mesh = two_triangles();
        assert_relative_eq!(mesh.facet_normal(0).z, 1.0, epsilon = 1e-12);
        mesh.flip(0);
        assert_eq!(mesh.facet_vertices(0), &[2, 1, 0]);
        assert_relative_eq!(mesh.facet_normal(0).z, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_barycenter_and_bounds() {
        let mesh = two_triangles();
        let c = mesh.facet_barycenter(1);
        assert_relative_eq!(c.x, 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(c.y, 2.0 / 3.0, epsilon = 1e-12);

        let (min, max) = mesh.bounds().unwrap();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(1.0, 1.0, 0.0));
    }
}
