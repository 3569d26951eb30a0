use nalgebra::{Matrix3, SymmetricEigen, Vector3};

use crate::domain::morphology::Point;

/// Dominant axis of a point cloud.
///
/// Centers the cloud on its centroid, builds the 3x3 scatter matrix `XᵀX` and
/// returns the eigenvector of its largest eigenvalue. The sign of the result is
/// arbitrary; callers orient it themselves.
///
/// Returns `None` when the cloud has no spread (no points, a single point or
/// all points coincident) or when the decomposition is not finite.
pub fn principal_direction(points: &[Point]) -> Option<Vector3<f64>> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let centroid = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords)
        / n;

    let scatter = points.iter().fold(Matrix3::zeros(), |acc, p| {
        let x = p.coords - centroid;
        acc + x * x.transpose()
    });

    let eig = SymmetricEigen::new(scatter);
    let axis = eig.eigenvalues.imax();
    let lambda_max = eig.eigenvalues[axis];
    if !lambda_max.is_finite() || lambda_max <= 0.0 {
        return None;
    }

    let direction: Vector3<f64> = eig.eigenvectors.column(axis).into_owned();
    let norm = direction.norm();
    if !norm.is_finite() || norm == 0.0 {
        return None;
    }
    Some(direction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parallel(a: &Vector3<f64>, b: &Vector3<f64>) -> bool {
        let cos = a.dot(b) / (a.norm() * b.norm());
        (cos.abs() - 1.0).abs() < 1e-9
    }

    #[rstest]
    #[case::x_axis(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]], [1.0, 0.0, 0.0])]
    #[case::y_axis(vec![[3.0, -1.0, 2.0], [3.0, 4.0, 2.0]], [0.0, 1.0, 0.0])]
    #[case::diagonal(vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0], [3.0, 3.0, 3.0]], [1.0, 1.0, 1.0])]
    fn given_collinear_points_when_estimating_then_returns_line_direction(
        #[case] raw: Vec<[f64; 3]>,
        #[case] expected: [f64; 3],
    ) {
        let points: Vec<Point> = raw.iter().map(|p| Point::new(p[0], p[1], p[2])).collect();

        let direction = principal_direction(&points).unwrap();

        assert!(parallel(
            &direction,
            &Vector3::new(expected[0], expected[1], expected[2])
        ));
    }

    #[test]
    fn given_elongated_cloud_when_estimating_then_returns_long_axis() {
        let points = vec![
            Point::new(-10.0, -1.0, 0.0),
            Point::new(-5.0, 1.0, 0.0),
            Point::new(0.0, -1.0, 0.0),
            Point::new(5.0, 1.0, 0.0),
            Point::new(10.0, -1.0, 0.0),
        ];

        let direction = principal_direction(&points).unwrap();

        assert!(direction.x.abs() > 0.99);
        assert!(direction.z.abs() < 1e-9);
    }

    #[test]
    fn given_single_point_when_estimating_then_returns_none() {
        assert_eq!(principal_direction(&[Point::new(1.0, 2.0, 3.0)]), None);
    }

    #[test]
    fn given_coincident_points_when_estimating_then_returns_none() {
        let p = Point::new(1.0, 2.0, 3.0);
        assert_eq!(principal_direction(&[p, p, p]), None);
    }

    #[test]
    fn given_no_points_when_estimating_then_returns_none() {
        assert_eq!(principal_direction(&[]), None);
    }
}
