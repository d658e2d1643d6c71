//! Convex hulls and shape descriptors of planar polygons embedded in 3D.
//!
//! Hulls are computed in a 2D parameterization of the plane and lifted back,
//! so every returned vertex lies exactly on the plane. Vertex order is
//! counter-clockwise when looking against the plane normal.

use nalgebra::{Matrix3, SymmetricEigen, Vector2, Vector3};

/// Below this, a polygon is treated as degenerate.
const AREA_EPSILON: f64 = 1e-12;

/// Orthonormal in-plane basis (u, v) such that u × v = normal.
pub fn plane_basis(normal: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let helper = if normal.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let u = normal.cross(&helper).normalize();
    let v = normal.cross(&u);
    (u, v)
}

/// Convex hull of `points` projected onto the plane (`normal`, `origin`).
///
/// Uses Andrew's monotone chain. Collinear vertices are dropped.
/// Returns an empty polygon when fewer than three non-collinear points remain.
pub fn convex_hull_on_plane(
    points: &[Vector3<f64>],
    normal: &Vector3<f64>,
    origin: &Vector3<f64>,
) -> Vec<Vector3<f64>> {
    if points.len() < 3 {
        return Vec::new();
    }

    let (u, v) = plane_basis(normal);
    let mut pts2d: Vec<Vector2<f64>> = points
        .iter()
        .filter(|p| p.iter().all(|c| c.is_finite()))
        .map(|p| {
            let d = p - origin;
            Vector2::new(d.dot(&u), d.dot(&v))
        })
        .collect();

    pts2d.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts2d.dedup_by(|a, b| (a.x - b.x).abs() < 1e-12 && (a.y - b.y).abs() < 1e-12);
    if pts2d.len() < 3 {
        return Vec::new();
    }

    let cross = |o: &Vector2<f64>, a: &Vector2<f64>, b: &Vector2<f64>| {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };

    let mut lower: Vec<Vector2<f64>> = Vec::with_capacity(pts2d.len());
    for p in &pts2d {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<Vector2<f64>> = Vec::with_capacity(pts2d.len());
    for p in pts2d.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(*p);
    }

    // Last point of each chain is the first point of the other
    lower.pop();
    upper.pop();
    lower.extend(upper);

    if lower.len() < 3 {
        return Vec::new();
    }

    lower
        .into_iter()
        .map(|p| origin + u * p.x + v * p.y)
        .collect()
}

/// Area of a planar polygon (vertices in order, implicitly closed).
pub fn polygon_area(polygon: &[Vector3<f64>]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let mut sum = Vector3::zeros();
    for i in 0..polygon.len() {
        let j = (i + 1) % polygon.len();
        sum += polygon[i].cross(&polygon[j]);
    }
    0.5 * sum.norm()
}

/// Elongation and principal direction of a polygon.
///
/// Elongation is √(λmax / λmid) of the vertex covariance; the principal
/// direction is the eigenvector of λmax. Returns `None` for fewer than three
/// vertices. A polygon with no spread along its second axis has infinite
/// elongation.
pub fn elongation_and_principal_direction(
    polygon: &[Vector3<f64>],
) -> Option<(f64, Vector3<f64>)> {
    if polygon.len() < 3 {
        return None;
    }

    let n = polygon.len() as f64;
    let mean: Vector3<f64> = polygon.iter().sum::<Vector3<f64>>() / n;
    let mut cov = Matrix3::zeros();
    for p in polygon {
        let d = p - mean;
        cov += d * d.transpose();
    }
    cov /= n;

    let eigen = SymmetricEigen::new(cov);
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let lambda_max = eigen.eigenvalues[order[0]].max(0.0);
    let lambda_mid = eigen.eigenvalues[order[1]].max(0.0);
    let principal = eigen.eigenvectors.column(order[0]).into_owned();

    let elongation = if lambda_mid <= AREA_EPSILON {
        f64::INFINITY
    } else {
        (lambda_max / lambda_mid).sqrt()
    };
    Some((elongation, principal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square_with_interior() -> Vec<Vector3<f64>> {
        vec![
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(1.0, 0.0, 1.0),
            Vector3::new(0.5, 0.5, 1.0),
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(0.0, 1.0, 1.0),
            Vector3::new(0.5, 0.0, 1.0),
        ]
    }

    #[test]
    fn test_plane_basis_is_right_handed() {
        let n = Vector3::new(0.3, -0.4, 0.5).normalize();
        let (u, v) = plane_basis(&n);
        assert_relative_eq!(u.dot(&n), 0.0, epsilon = 1e-12);
        assert_relative_eq!(v.dot(&n), 0.0, epsilon = 1e-12);
        assert_relative_eq!(u.cross(&v), n, epsilon = 1e-12);
    }

    #[test]
    fn test_hull_drops_interior_and_collinear_points() {
        let n = Vector3::new(0.0, 0.0, -1.0);
        let hull = convex_hull_on_plane(&unit_square_with_interior(), &n, &Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(hull.len(), 4);
        assert_relative_eq!(polygon_area(&hull), 1.0, epsilon = 1e-12);
        for p in &hull {
            assert_relative_eq!(p.z, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_hull_of_collinear_points_is_empty() {
        let pts: Vec<_> = (0..5).map(|i| Vector3::new(i as f64, 0.0, 0.0)).collect();
        assert!(convex_hull_on_plane(&pts, &Vector3::z(), &Vector3::zeros()).is_empty());
    }

    #[test]
    fn test_elongation_of_rectangle() {
        let rect = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(4.0, 0.0, 0.0),
            Vector3::new(4.0, 1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ];
        let (elongation, dir) = elongation_and_principal_direction(&rect).unwrap();
        assert_relative_eq!(elongation, 4.0, epsilon = 1e-9);
        assert_relative_eq!(dir.x.abs(), 1.0, epsilon = 1e-9);
    }
}
