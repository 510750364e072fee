//! 2D orientation predicates with simulation-of-simplicity tie breaking.
//!
//! Degenerate configurations (collinear or coincident points) are resolved
//! by a fixed symbolic ordering on `y` then `x`, so every query has a
//! definite answer and the same input always produces the same result.

use crate::mesh::SurfaceMesh;

/// Sign of a 2D orientation test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Negative,
    Zero,
    Positive,
}

impl Sign {
    pub fn of(value: f64) -> Self {
        if value > 0.0 {
            Sign::Positive
        } else if value < 0.0 {
            Sign::Negative
        } else {
            Sign::Zero
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            Sign::Negative => -1,
            Sign::Zero => 0,
            Sign::Positive => 1,
        }
    }
}

/// Twice the signed area of the triangle `(0,0)-(x1,y1)-(x2,y2)`, with an
/// SOS-determined sign.
///
/// The sign is 0 only when `(x1, y1) == (x2, y2)`.
pub fn orientation(x1: f64, y1: f64, x2: f64, y2: f64) -> (i32, f64) {
    let twice_signed_area = y1 * x2 - x1 * y2;
    let sign = if twice_signed_area > 0.0 {
        1
    } else if twice_signed_area < 0.0 {
        -1
    } else if y2 > y1 {
        1
    } else if y2 < y1 {
        -1
    } else if x1 > x2 {
        1
    } else if x1 < x2 {
        -1
    } else {
        0
    };
    (sign, twice_signed_area)
}

/// Robust test of `(x0, y0)` against the triangle `p1-p2-p3`.
///
/// Returns the barycentric coordinates `(a, b, c)` of the query if it lies
/// inside under the SOS convention, `None` otherwise.
#[allow(clippy::too_many_arguments)]
pub fn point_in_triangle_2d(
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    x3: f64,
    y3: f64,
) -> Option<(f64, f64, f64)> {
    let (x1, x2, x3) = (x1 - x0, x2 - x0, x3 - x0);
    let (y1, y2, y3) = (y1 - y0, y2 - y0, y3 - y0);

    let (sign_a, a) = orientation(x2, y2, x3, y3);
    if sign_a == 0 {
        return None;
    }
    let (sign_b, b) = orientation(x3, y3, x1, y1);
    if sign_b != sign_a {
        return None;
    }
    let (sign_c, c) = orientation(x1, y1, x2, y2);
    if sign_c != sign_a {
        return None;
    }

    let sum = a + b + c;
    // Matching non-zero SOS signs cannot all come from zero areas.
    debug_assert!(sum != 0.0, "point_in_triangle_2d: zero barycentric sum");
    Some((a / sum, b / sum, c / sum))
}

/// Plain floating point orientation of the triangle `p0, p1, p2`.
pub fn orient_2d_inexact(p0: [f64; 2], p1: [f64; 2], p2: [f64; 2]) -> Sign {
    let a11 = p1[0] - p0[0];
    let a12 = p1[1] - p0[1];
    let a21 = p2[0] - p0[0];
    let a22 = p2[1] - p0[1];
    Sign::of(a11 * a22 - a12 * a21)
}

/// Intersect the vertical line through `q` with the first triangle of facet `f`.
///
/// Returns the crossing sign (+1 for a counter-clockwise triangle seen from
/// above, -1 for clockwise) and the height of the intersection, or `None`
/// if the line misses or the triangle is flat in XY.
pub fn intersect_ray_z(mesh: &SurfaceMesh, f: usize, q: &[f64; 3]) -> Option<(i32, f64)> {
    let verts = mesh.facet_vertices(f);
    intersect_ray_z_triangle(
        &[mesh.point(verts[0]), mesh.point(verts[1]), mesh.point(verts[2])],
        q,
    )
}

pub(crate) fn intersect_ray_z_triangle(
    tri: &[crate::types::Point3; 3],
    q: &[f64; 3],
) -> Option<(i32, f64)> {
    let [p1, p2, p3] = tri;
    let (u, v, w) = point_in_triangle_2d(q[0], q[1], p1.x, p1.y, p2.x, p2.y, p3.x, p3.y)?;
    let z = u * p1.z + v * p2.z + w * p3.z;
    match orient_2d_inexact([p1.x, p1.y], [p2.x, p2.y], [p3.x, p3.y]) {
        Sign::Zero => None,
        sign => Some((sign.as_i32(), z)),
    }
}

/// Signed area of facet `f` projected on the XY plane.
///
/// The polygon is fan-triangulated from its first vertex; only the sign is
/// meaningful for non-planar facets.
pub fn signed_area(mesh: &SurfaceMesh, f: usize) -> f64 {
    let verts = mesh.facet_vertices(f);
    let p0 = mesh.point(verts[0]);
    verts
        .windows(2)
        .skip(1)
        .map(|w| {
            let p1 = mesh.point(w[0]);
            let p2 = mesh.point(w[1]);
            0.5 * ((p1.x - p0.x) * (p2.y - p0.y) - (p2.x - p0.x) * (p1.y - p0.y))
        })
        .sum()
}
