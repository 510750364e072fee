//! Geometric predicates and queries on surface and volume meshes.
//!
//! # Submodules
//!
//! - [`predicates`] - SOS orientation, point-in-triangle, vertical ray crossing
//! - [`aabb`] - R-tree over facet triangles
//! - [`distance`] - unsigned and signed squared distance fields
//! - [`orient`] - facet orientation of planar meshes and closed surfaces
//! - [`polyhedra`] - polytope cell extraction and star tetrahedralization

pub mod aabb;
pub mod distance;
pub mod orient;
pub mod polyhedra;
pub mod predicates;

pub use aabb::{closest_point_on_triangle, FacetTree, FacetTriangle};
pub use distance::{compute_sign, compute_unsigned_distance_field, signed_squared_distances};
pub use orient::{orient_closed_surface, orient_normals_2d, signed_volume};
pub use polyhedra::{extract_polyhedra, tetrahedralize_star_shaped_surface, Polyhedron};
pub use predicates::{
    intersect_ray_z, orient_2d_inexact, orientation, point_in_triangle_2d, signed_area, Sign,
};
