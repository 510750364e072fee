//! pfem core - mesh classification, geometry and finite element assembly
//!
//! Building blocks for polygonal and polyhedral finite element solvers:
//! - Element classification of 2D surface meshes
//! - Robust 2D predicates, signed distance fields and surface orientation
//! - Polyhedral cell extraction and star-shaped tetrahedralization
//! - Linear and nonlinear local operators with parallel global assembly
//! - Surface sampling by centroidal Voronoi relaxation
//!
//! # Architecture
//!
//! - [`SurfaceMesh`] / [`VolumeMesh`]: connectivity and vertex positions
//! - [`ElementBases`] / [`ElementValues`]: per-element bases and their
//!   values at quadrature points
//! - [`Assemblers`]: operators selected by model name
//!
//! ```no_run
//! use pfem_core::{build_bases, to_mesh, Assemblers};
//! use nalgebra::DMatrix;
//!
//! let v = DMatrix::from_row_slice(3, 3, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
//! let f = DMatrix::from_row_slice(1, 3, &[0, 1, 2]);
//! let mesh = to_mesh(&v, &f)?;
//! let bases = build_bases(&mesh, false)?;
//! let k = Assemblers::new().assemble_scalar_problem("Laplacian", false, 3, &bases, &bases)?;
//! assert_eq!(k.nrows(), 3);
//! # Ok::<(), pfem_core::Error>(())
//! ```

pub mod assembler;
pub mod basis;
pub mod error;
pub mod geometry;
pub mod mesh;
pub mod sampling;
pub mod sparse;
pub mod types;

pub use assembler::{Assemblers, DispatchConfig, DispatchPolicy, Model, SolutionJet};
pub use basis::{build_bases, ElementBases, ElementValues, ReferenceElement};
pub use error::{Error, Result};
pub use mesh::{compute_element_tags, to_mesh, ElementType, SurfaceMesh, VolumeMesh};
pub use sampling::{sample_surface, EdgeSampler, SamplingOptions};
pub use sparse::CsrMatrix;
pub use types::{von_mises, Point3, Vec3};
