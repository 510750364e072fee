//! Surface point sampling.
//!
//! [`sample_surface`] distributes points on a triangle surface by
//! centroidal Voronoi relaxation. The restricted Voronoi cells are
//! approximated with a dense area-weighted cloud of integration points,
//! each assigned to its nearest site through an R-tree. Relaxed sites are
//! projected back onto the surface with the facet tree.
//!
//! [`EdgeSampler`] produces evenly spaced points on the edges of the
//! reference square and cube.

use crate::error::{Error, Result};
use crate::geometry::FacetTree;
use crate::mesh::{to_mesh, SurfaceMesh};
use crate::types::{Point3, Vec3};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Integration points per sample in the Voronoi approximation.
const INTEGRATION_DENSITY: usize = 30;

/// Step lengths tried, longest first, by the accelerated iterations.
const RELAXATION_STEPS: [f64; 3] = [1.8, 1.4, 1.0];

type Site = GeomWithData<[f64; 3], usize>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingOptions {
    /// Number of points, at least 4.
    pub num_samples: usize,
    /// Plain Lloyd iterations.
    pub num_lloyd: usize,
    /// Accelerated (over-relaxed, line-searched) iterations run after Lloyd.
    pub num_newton: usize,
    pub compute_normals: bool,
    pub seed: u64,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            num_samples: 1000,
            num_lloyd: 10,
            num_newton: 10,
            compute_normals: false,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SurfaceSamples {
    /// `num_samples x 3`.
    pub points: DMatrix<f64>,
    /// Unit normal of the facet nearest to each point, when requested.
    pub normals: Option<DMatrix<f64>>,
}

/// Fan triangulation of a mesh with cumulative areas for weighted picking.
struct AreaSampler {
    triangles: Vec<[Point3; 3]>,
    cumulative: Vec<f64>,
}

impl AreaSampler {
    fn new(mesh: &SurfaceMesh) -> Result<Self> {
        let mut triangles = Vec::new();
        let mut cumulative = Vec::new();
        let mut total = 0.0;
        for f in 0..mesh.n_facets() {
            let verts = mesh.facet_vertices(f);
            let p0 = mesh.point(verts[0]);
            for w in verts[1..].windows(2) {
                let tri = [p0, mesh.point(w[0]), mesh.point(w[1])];
                total += 0.5 * (tri[1] - tri[0]).cross(&(tri[2] - tri[0])).norm();
                triangles.push(tri);
                cumulative.push(total);
            }
        }
        if total <= 0.0 {
            return Err(Error::Sampling("surface has zero area".into()));
        }
        Ok(Self {
            triangles,
            cumulative,
        })
    }

    fn area(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    fn sample(&self, rng: &mut StdRng) -> Point3 {
        let r = rng.gen_range(0.0..self.area());
        let t = self
            .cumulative
            .partition_point(|&c| c <= r)
            .min(self.triangles.len() - 1);
        let [a, b, c] = &self.triangles[t];
        let s = rng.gen::<f64>().sqrt();
        let u = rng.gen::<f64>();
        a * (1.0 - s) + b * (s * (1.0 - u)) + c * (s * u)
    }
}

/// Weighted point cloud standing in for the surface measure.
struct Integrator {
    points: Vec<Point3>,
    weight: f64,
}

impl Integrator {
    fn site_tree(sites: &[Point3]) -> RTree<Site> {
        RTree::bulk_load(
            sites
                .iter()
                .enumerate()
                .map(|(i, p)| Site::new([p.x, p.y, p.z], i))
                .collect(),
        )
    }

    /// Nearest site of every integration point.
    fn assign(&self, sites: &[Point3]) -> Vec<usize> {
        let tree = Self::site_tree(sites);
        self.points
            .par_iter()
            .map(|p| tree.nearest_neighbor(&[p.x, p.y, p.z]).map_or(0, |s| s.data))
            .collect()
    }

    /// Quantization energy `Σ w |y - x_nearest(y)|²`.
    fn energy(&self, sites: &[Point3]) -> f64 {
        let owner = self.assign(sites);
        self.points
            .iter()
            .zip(&owner)
            .map(|(p, &s)| (p - sites[s]).norm_squared())
            .sum::<f64>()
            * self.weight
    }

    /// Centroid of every approximate Voronoi cell; empty cells keep the site.
    fn centroids(&self, sites: &[Point3]) -> Vec<Point3> {
        let owner = self.assign(sites);
        let mut sum = vec![Point3::zeros(); sites.len()];
        let mut count = vec![0usize; sites.len()];
        for (p, &s) in self.points.iter().zip(&owner) {
            sum[s] += p;
            count[s] += 1;
        }
        sum.iter()
            .zip(&count)
            .zip(sites)
            .map(|((s, &n), site)| if n > 0 { s / n as f64 } else { *site })
            .collect()
    }
}

fn project(tree: &FacetTree, points: &[Point3]) -> Vec<Point3> {
    points
        .par_iter()
        .map(|p| tree.nearest_facet(p).map_or(*p, |(_, q, _)| q))
        .collect()
}

fn lloyd_step(tree: &FacetTree, integrator: &Integrator, sites: &[Point3]) -> Vec<Point3> {
    project(tree, &integrator.centroids(sites))
}

/// One over-relaxed step toward the centroids, keeping the longest step
/// that lowers the energy. Falls back to a plain Lloyd step.
fn accelerated_step(
    tree: &FacetTree,
    integrator: &Integrator,
    sites: &[Point3],
    energy: f64,
) -> (Vec<Point3>, f64) {
    let centroids = integrator.centroids(sites);
    for omega in RELAXATION_STEPS {
        let moved: Vec<Point3> = sites
            .iter()
            .zip(&centroids)
            .map(|(x, c)| x + (c - x) * omega)
            .collect();
        let candidate = project(tree, &moved);
        let e = integrator.energy(&candidate);
        if e < energy {
            return (candidate, e);
        }
    }
    (sites.to_vec(), energy)
}

/// Sample `options.num_samples` points on the surface `(V, F)`.
///
/// # Errors
///
/// - [`Error::Sampling`] if fewer than 4 samples are requested or the
///   surface has no area
/// - [`Error::Format`] if `V`/`F` have the wrong shape
pub fn sample_surface(
    v: &DMatrix<f64>,
    f: &DMatrix<usize>,
    options: &SamplingOptions,
) -> Result<SurfaceSamples> {
    if options.num_samples <= 3 {
        return Err(Error::Sampling(format!(
            "at least 4 samples are needed, got {}",
            options.num_samples
        )));
    }
    let mesh = to_mesh(v, f)?;
    let area = AreaSampler::new(&mesh)?;
    let tree = FacetTree::new(&mesh);
    let mut rng = StdRng::seed_from_u64(options.seed);

    let mut sites: Vec<Point3> = (0..options.num_samples).map(|_| area.sample(&mut rng)).collect();

    if options.num_lloyd > 0 || options.num_newton > 0 {
        let n = options.num_samples * INTEGRATION_DENSITY;
        let integrator = Integrator {
            points: (0..n).map(|_| area.sample(&mut rng)).collect(),
            weight: area.area() / n as f64,
        };

        for _ in 0..options.num_lloyd {
            sites = lloyd_step(&tree, &integrator, &sites);
        }

        let mut energy = integrator.energy(&sites);
        debug!(energy, iterations = options.num_lloyd, "lloyd relaxation done");
        for _ in 0..options.num_newton {
            let (next, e) = accelerated_step(&tree, &integrator, &sites, energy);
            if e >= energy {
                break;
            }
            sites = next;
            energy = e;
        }
        debug!(energy, "accelerated relaxation done");
    }

    let points = DMatrix::from_fn(sites.len(), 3, |i, j| sites[i][j]);
    let normals = options.compute_normals.then(|| {
        DMatrix::from_fn(sites.len(), 3, |i, j| {
            tree.nearest_facet(&sites[i])
                .and_then(|(facet, _, _)| mesh.facet_normal(facet).try_normalize(0.0))
                .unwrap_or_else(Vec3::zeros)[j]
        })
    });

    Ok(SurfaceSamples { points, normals })
}

/// Points along the edges of the reference elements.
pub struct EdgeSampler;

impl EdgeSampler {
    /// `4 * resolution` points (`x 2`) on the edges of `[0, 1]²`, edge by
    /// edge, each edge including its start and end.
    pub fn sample_2d(resolution: usize) -> Result<DMatrix<f64>> {
        const EDGES: [([f64; 2], [f64; 2]); 4] = [
            ([0.0, 0.0], [1.0, 0.0]),
            ([1.0, 0.0], [1.0, 1.0]),
            ([1.0, 1.0], [0.0, 1.0]),
            ([0.0, 1.0], [0.0, 0.0]),
        ];
        Self::sample_edges(&EDGES, resolution)
    }

    /// `12 * resolution` points (`x 3`) on the edges of `[0, 1]³`.
    pub fn sample_3d(resolution: usize) -> Result<DMatrix<f64>> {
        let corner = |i: usize| [(i & 1) as f64, ((i >> 1) & 1) as f64, ((i >> 2) & 1) as f64];
        // corner pairs differing in exactly one coordinate
        let edges: Vec<([f64; 3], [f64; 3])> = (0..8)
            .flat_map(|i| [1, 2, 4].into_iter().map(move |bit| (i, i | bit)))
            .filter(|&(i, j)| i != j)
            .map(|(i, j)| (corner(i), corner(j)))
            .collect();
        Self::sample_edges(&edges, resolution)
    }

    fn sample_edges<const D: usize>(edges: &[([f64; D], [f64; D])], resolution: usize) -> Result<DMatrix<f64>> {
        if resolution < 2 {
            return Err(Error::Sampling(format!(
                "edge resolution must be at least 2, got {}",
                resolution
            )));
        }
        let mut samples = DMatrix::zeros(edges.len() * resolution, D);
        for (e, (a, b)) in edges.iter().enumerate() {
            for k in 0..resolution {
                let t = k as f64 / (resolution - 1) as f64;
                for d in 0..D {
                    samples[(e * resolution + k, d)] = a[d] + t * (b[d] - a[d]);
                }
            }
        }
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    /// Octahedron subdivided `levels` times and pushed to the unit sphere,
    /// outward oriented.
    fn sphere(levels: usize) -> (DMatrix<f64>, DMatrix<usize>) {
        let mut verts: Vec<Point3> = vec![
            Point3::x(),
            -Point3::x(),
            Point3::y(),
            -Point3::y(),
            Point3::z(),
            -Point3::z(),
        ];
        let mut faces = Vec::new();
        for (sx, sy, sz) in [(0, 2, 4), (1, 2, 4), (0, 3, 4), (1, 3, 4), (0, 2, 5), (1, 2, 5), (0, 3, 5), (1, 3, 5)] {
            let positive = (sx % 2 + sy % 2 + sz % 2) % 2 == 0;
            faces.push(if positive { [sx, sy, sz] } else { [sx, sz, sy] });
        }
        for _ in 0..levels {
            let mut mid: HashMap<(usize, usize), usize> = HashMap::new();
            let mut midpoint = |a: usize, b: usize, verts: &mut Vec<Point3>| {
                *mid.entry((a.min(b), a.max(b))).or_insert_with(|| {
                    verts.push((verts[a] + verts[b]) * 0.5);
                    verts.len() - 1
                })
            };
            let mut next = Vec::with_capacity(faces.len() * 4);
            for [a, b, c] in faces {
                let ab = midpoint(a, b, &mut verts);
                let bc = midpoint(b, c, &mut verts);
                let ca = midpoint(c, a, &mut verts);
                next.extend([[a, ab, ca], [ab, b, bc], [ca, bc, c], [ab, bc, ca]]);
            }
            faces = next;
        }
        let v = DMatrix::from_fn(verts.len(), 3, |i, j| verts[i].normalize()[j]);
        let f = DMatrix::from_fn(faces.len(), 3, |i, j| faces[i][j]);
        (v, f)
    }

    #[test]
    fn test_sphere_samples() {
        let (v, f) = sphere(2);
        let options = SamplingOptions {
            num_samples: 100,
            num_lloyd: 3,
            num_newton: 3,
            compute_normals: true,
            seed: 7,
        };
        let samples = sample_surface(&v, &f, &options).unwrap();
        assert_eq!(samples.points.shape(), (100, 3));
        let normals = samples.normals.unwrap();
        for i in 0..100 {
            let p = samples.points.row(i).transpose();
            assert!(p.norm() <= 1.0 + 1e-9);
            assert!(p.norm() > 0.8);
            let n = normals.row(i).transpose();
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-12);
            assert!(n.dot(&p) > 0.0);
        }
    }

    #[test]
    fn test_unrelaxed_samples_with_normals() {
        let (v, f) = sphere(2);
        let options = SamplingOptions {
            num_samples: 100,
            num_lloyd: 0,
            num_newton: 0,
            compute_normals: true,
            ..Default::default()
        };
        let samples = sample_surface(&v, &f, &options).unwrap();
        assert_eq!(samples.points.shape(), (100, 3));
        let normals = samples.normals.unwrap();
        assert_eq!(normals.shape(), (100, 3));
        for i in 0..100 {
            let p = samples.points.row(i).transpose();
            assert!(p.iter().all(|x| x.abs() <= 1.0 + 1e-9));
            let n = normals.row(i).transpose();
            assert!(n.dot(&p) > 0.0);
        }
    }

    #[test]
    fn test_samples_stay_on_surface() {
        let (v, f) = sphere(1);
        let mesh = to_mesh(&v, &f).unwrap();
        let tree = FacetTree::new(&mesh);
        for (num_lloyd, num_newton) in [(0, 0), (2, 2)] {
            let options = SamplingOptions {
                num_samples: 40,
                num_lloyd,
                num_newton,
                ..Default::default()
            };
            let samples = sample_surface(&v, &f, &options).unwrap();
            assert!(samples.normals.is_none());
            for i in 0..40 {
                let p = samples.points.row(i).transpose();
                assert!(tree.squared_distance(&Point3::new(p[0], p[1], p[2])) < 1e-12);
            }
        }
    }

    #[test]
    fn test_sampling_is_seeded() {
        let (v, f) = sphere(1);
        let options = SamplingOptions {
            num_samples: 20,
            num_lloyd: 1,
            num_newton: 1,
            ..Default::default()
        };
        let a = sample_surface(&v, &f, &options).unwrap();
        let b = sample_surface(&v, &f, &options).unwrap();
        assert_eq!(a.points, b.points);
        let c = sample_surface(&v, &f, &SamplingOptions { seed: 1, ..options }).unwrap();
        assert_ne!(a.points, c.points);
    }

    #[test]
    fn test_invalid_requests() {
        let (v, f) = sphere(0);
        let options = SamplingOptions {
            num_samples: 3,
            ..Default::default()
        };
        assert!(matches!(sample_surface(&v, &f, &options), Err(Error::Sampling(_))));

        let flat = DMatrix::from_row_slice(3, 3, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        let tri = DMatrix::from_row_slice(1, 3, &[0, 1, 2]);
        let options = SamplingOptions {
            num_samples: 10,
            ..Default::default()
        };
        assert!(matches!(sample_surface(&flat, &tri, &options), Err(Error::Sampling(_))));
    }

    #[test]
    fn test_edge_sampler() {
        let square = EdgeSampler::sample_2d(5).unwrap();
        assert_eq!(square.shape(), (20, 2));
        assert_eq!(square.row(2).iter().copied().collect::<Vec<_>>(), vec![0.5, 0.0]);
        assert!(square.iter().all(|&x| (0.0..=1.0).contains(&x)));

        let cube = EdgeSampler::sample_3d(3).unwrap();
        assert_eq!(cube.shape(), (36, 3));
        // every point lies on an edge: at least two coordinates are 0 or 1
        for i in 0..cube.nrows() {
            let on_face = cube.row(i).iter().filter(|&&x| x == 0.0 || x == 1.0).count();
            assert!(on_face >= 2);
        }
        assert!(EdgeSampler::sample_2d(1).is_err());
    }
}
