//! Quadrature rules on the reference elements.
//!
//! All rules live on the unit reference domains used by [`super::ReferenceElement`]:
//! - triangle `(0,0), (1,0), (0,1)` and tetrahedron `(0,0,0), (1,0,0), (0,1,0), (0,0,1)`
//! - square `[0,1]^2` and cube `[0,1]^3`
//!
//! Rules are selected by the polynomial degree they must integrate exactly.
//! Requests beyond the highest tabulated degree fall back to the highest rule.

/// Quadrature points (in reference coordinates, unused components zero) and
/// weights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Quadrature {
    pub points: Vec<[f64; 3]>,
    pub weights: Vec<f64>,
}

impl Quadrature {
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    fn push(&mut self, point: [f64; 3], weight: f64) {
        self.points.push(point);
        self.weights.push(weight);
    }

    /// Gauss-Legendre rule on `[0, 1]`.
    pub fn line(degree: usize) -> Self {
        let mut q = Self::default();
        for (x, w) in gauss_1d(degree) {
            q.push([0.5 * (x + 1.0), 0.0, 0.0], 0.5 * w);
        }
        q
    }

    /// Tensor product rule on `[0, 1]^2`.
    pub fn quad(degree: usize) -> Self {
        let line = Self::line(degree);
        let mut q = Self::default();
        for (px, wx) in line.points.iter().zip(&line.weights) {
            for (py, wy) in line.points.iter().zip(&line.weights) {
                q.push([px[0], py[0], 0.0], wx * wy);
            }
        }
        q
    }

    /// Tensor product rule on `[0, 1]^3`.
    pub fn hex(degree: usize) -> Self {
        let line = Self::line(degree);
        let mut q = Self::default();
        for (px, wx) in line.points.iter().zip(&line.weights) {
            for (py, wy) in line.points.iter().zip(&line.weights) {
                for (pz, wz) in line.points.iter().zip(&line.weights) {
                    q.push([px[0], py[0], pz[0]], wx * wy * wz);
                }
            }
        }
        q
    }

    /// Rule on the unit triangle; weights sum to 1/2.
    ///
    /// Points are tabulated in area coordinates `(L1, L2, L3)` and mapped to
    /// `(x, y) = (L2, L3)`.
    pub fn triangle(degree: usize) -> Self {
        let area: Vec<([f64; 3], f64)> = match degree {
            0 | 1 => vec![([1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0], 0.5)],
            2 => {
                // edge midpoints
                let w = 1.0 / 6.0;
                vec![
                    ([0.5, 0.5, 0.0], w),
                    ([0.0, 0.5, 0.5], w),
                    ([0.5, 0.0, 0.5], w),
                ]
            }
            _ => {
                let w_center = -27.0 / 96.0;
                let w_corner = 25.0 / 96.0;
                vec![
                    ([1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0], w_center),
                    ([0.6, 0.2, 0.2], w_corner),
                    ([0.2, 0.6, 0.2], w_corner),
                    ([0.2, 0.2, 0.6], w_corner),
                ]
            }
        };
        let mut q = Self::default();
        for (l, w) in area {
            q.push([l[1], l[2], 0.0], w);
        }
        q
    }

    /// Rule on the unit tetrahedron; weights sum to 1/6.
    pub fn tetrahedron(degree: usize) -> Self {
        let bary: Vec<([f64; 4], f64)> = match degree {
            0 | 1 => vec![([0.25; 4], 1.0 / 6.0)],
            2 => {
                // (α, β, β, β) and permutations
                let sqrt5 = 5.0_f64.sqrt();
                let alpha = (5.0 + 3.0 * sqrt5) / 20.0;
                let beta = (5.0 - sqrt5) / 20.0;
                let w = 1.0 / 24.0;
                vec![
                    ([alpha, beta, beta, beta], w),
                    ([beta, alpha, beta, beta], w),
                    ([beta, beta, alpha, beta], w),
                    ([beta, beta, beta, alpha], w),
                ]
            }
            _ => {
                // Keast: centroid plus (1/2, 1/6, 1/6, 1/6) permutations
                let (a, b) = (0.5, 1.0 / 6.0);
                let w_vertex = 3.0 / 40.0;
                vec![
                    ([0.25; 4], -2.0 / 15.0),
                    ([a, b, b, b], w_vertex),
                    ([b, a, b, b], w_vertex),
                    ([b, b, a, b], w_vertex),
                    ([b, b, b, a], w_vertex),
                ]
            }
        };
        let mut q = Self::default();
        for (l, w) in bary {
            q.push([l[1], l[2], l[3]], w);
        }
        q
    }
}

/// Gauss-Legendre points and weights on `[-1, 1]` exact up to `degree`.
fn gauss_1d(degree: usize) -> Vec<(f64, f64)> {
    match degree {
        0 | 1 => vec![(0.0, 2.0)],
        2 | 3 => {
            let p = 1.0 / 3.0_f64.sqrt();
            vec![(-p, 1.0), (p, 1.0)]
        }
        4 | 5 => {
            let p = (3.0 / 5.0_f64).sqrt();
            vec![(-p, 5.0 / 9.0), (0.0, 8.0 / 9.0), (p, 5.0 / 9.0)]
        }
        _ => {
            // ±√((3 ∓ 2√(6/5))/7), weights (18 ± √30) / 36
            let sqrt_6_5 = (6.0 / 5.0_f64).sqrt();
            let p1 = ((3.0 - 2.0 * sqrt_6_5) / 7.0).sqrt();
            let p2 = ((3.0 + 2.0 * sqrt_6_5) / 7.0).sqrt();
            let sqrt_30 = 30.0_f64.sqrt();
            let w1 = (18.0 + sqrt_30) / 36.0;
            let w2 = (18.0 - sqrt_30) / 36.0;
            vec![(-p2, w2), (-p1, w1), (p1, w1), (p2, w2)]
        }
    }
}
