//! Polyhedral volume mesh.
//!
//! Cells are lists of oriented faces. A face is a polygon loop of vertices;
//! a cell references it with a `flipped` flag so that every face of a cell
//! is traversed with the same (outward) orientation.

use crate::error::{Error, Result};
use crate::types::Point3;
use std::collections::{BTreeSet, HashMap};

/// A face as seen from one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellFace {
    pub face: usize,
    /// Traverse the face loop backwards inside this cell.
    pub flipped: bool,
}

impl CellFace {
    pub fn new(face: usize, flipped: bool) -> Self {
        Self { face, flipped }
    }
}

/// Position of a walker on the boundary of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation3DIndex {
    /// Cell being walked.
    pub element: usize,
    /// Face position within the cell.
    pub local_face: usize,
    /// Global face index.
    pub face: usize,
    /// Position within the face loop.
    pub local_vertex: usize,
    /// Global vertex index at this position.
    pub vertex: usize,
}

/// Volume mesh with polygonal faces and polyhedral cells.
#[derive(Debug, Clone, Default)]
pub struct VolumeMesh {
    points: Vec<Point3>,
    faces: Vec<Vec<usize>>,
    cells: Vec<Vec<CellFace>>,
    kernels: HashMap<usize, Point3>,
}

impl VolumeMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, p: Point3) -> usize {
        self.points.push(p);
        self.points.len() - 1
    }

    /// Add a polygonal face loop.
    pub fn add_face(&mut self, vertices: Vec<usize>) -> Result<usize> {
        if vertices.len() < 3 {
            return Err(Error::Mesh(format!(
                "face requires at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        if let Some(v) = vertices.iter().find(|&&v| v >= self.points.len()) {
            return Err(Error::Mesh(format!(
                "vertex index {} out of bounds (mesh has {} vertices)",
                v,
                self.points.len()
            )));
        }
        self.faces.push(vertices);
        Ok(self.faces.len() - 1)
    }

    /// Add a cell bounded by the given oriented faces.
    pub fn add_cell(&mut self, faces: Vec<CellFace>) -> Result<usize> {
        if faces.len() < 4 {
            return Err(Error::Mesh(format!(
                "cell requires at least 4 faces, got {}",
                faces.len()
            )));
        }
        if let Some(cf) = faces.iter().find(|cf| cf.face >= self.faces.len()) {
            return Err(Error::Mesh(format!("face index {} out of bounds", cf.face)));
        }
        self.cells.push(faces);
        Ok(self.cells.len() - 1)
    }

    /// Override the kernel point of cell `c`.
    pub fn set_kernel(&mut self, c: usize, p: Point3) {
        self.kernels.insert(c, p);
    }

    pub fn n_vertices(&self) -> usize {
        self.points.len()
    }

    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn point(&self, v: usize) -> Point3 {
        self.points[v]
    }

    pub fn n_face_vertices(&self, face: usize) -> usize {
        self.faces[face].len()
    }

    pub fn n_cell_faces(&self, c: usize) -> usize {
        self.cells[c].len()
    }

    /// Distinct vertices of cell `c`, sorted.
    pub fn cell_vertices(&self, c: usize) -> Vec<usize> {
        let set: BTreeSet<usize> = self.cells[c]
            .iter()
            .flat_map(|cf| self.faces[cf.face].iter().copied())
            .collect();
        set.into_iter().collect()
    }

    pub fn n_cell_vertices(&self, c: usize) -> usize {
        self.cell_vertices(c).len()
    }

    /// Tetrahedron: four triangular faces.
    pub fn is_simplex(&self, c: usize) -> bool {
        self.cells[c].len() == 4 && self.cells[c].iter().all(|cf| self.faces[cf.face].len() == 3)
    }

    /// Hexahedron: six quadrilateral faces over eight vertices.
    pub fn is_cube(&self, c: usize) -> bool {
        self.cells[c].len() == 6
            && self.cells[c].iter().all(|cf| self.faces[cf.face].len() == 4)
            && self.n_cell_vertices(c) == 8
    }

    /// Any cell that is neither a tetrahedron nor a hexahedron.
    pub fn is_polytope(&self, c: usize) -> bool {
        !self.is_simplex(c) && !self.is_cube(c)
    }

    /// Kernel point of cell `c`: the explicit override if set, otherwise the
    /// vertex average (a valid kernel for convex cells).
    pub fn kernel(&self, c: usize) -> Point3 {
        if let Some(p) = self.kernels.get(&c) {
            return *p;
        }
        let verts = self.cell_vertices(c);
        let sum = verts.iter().fold(Point3::zeros(), |acc, &v| acc + self.points[v]);
        sum / verts.len() as f64
    }

    /// Walker positioned on vertex `lv` of the `lf`-th face of cell `c`,
    /// counted along the cell-oriented face loop.
    pub fn get_index_from_element(&self, c: usize, lf: usize, lv: usize) -> Navigation3DIndex {
        let cf = self.cells[c][lf];
        let n = self.faces[cf.face].len();
        let local_vertex = if cf.flipped { (n - lv % n) % n } else { lv % n };
        Navigation3DIndex {
            element: c,
            local_face: lf,
            face: cf.face,
            local_vertex,
            vertex: self.faces[cf.face][local_vertex],
        }
    }

    /// Advance to the next vertex around the current face, following the
    /// orientation the face has inside the cell.
    pub fn next_around_face(&self, idx: Navigation3DIndex) -> Navigation3DIndex {
        let cf = self.cells[idx.element][idx.local_face];
        let n = self.faces[idx.face].len();
        let local_vertex = if cf.flipped {
            (idx.local_vertex + n - 1) % n
        } else {
            (idx.local_vertex + 1) % n
        };
        Navigation3DIndex {
            local_vertex,
            vertex: self.faces[idx.face][local_vertex],
            ..idx
        }
    }
}
