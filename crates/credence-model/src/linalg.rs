//! Symmetric eigendecomposition, inversion and conditioning.
//!
//! Design matrices have a handful of terms; the classical largest-pivot
//! Jacobi method handles them directly.

use crate::error::LinalgError;
use ndarray::{Array1, Array2, Axis};

/// Jacobi iteration cap
pub const MAX_ITERATIONS: usize = 10_000;

/// Off-diagonal convergence tolerance
pub const TOLERANCE: f64 = 1e-15;

/// Smallest eigenvalue ratio treated as non-singular
pub const SINGULAR_RATIO: f64 = 1e-12;

/// Eigenvalues and eigenvectors of a symmetric matrix.
#[derive(Debug, Clone)]
pub struct EigenDecomposition {
    /// Eigenvalues, descending
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors as columns, matching `eigenvalues`
    pub eigenvectors: Array2<f64>,
}

impl EigenDecomposition {
    /// Largest eigenvalue.
    pub fn max(&self) -> f64 {
        self.eigenvalues.first().copied().unwrap_or(f64::NAN)
    }

    /// Smallest eigenvalue.
    pub fn min(&self) -> f64 {
        self.eigenvalues.last().copied().unwrap_or(f64::NAN)
    }

    /// `V diag(f(λ)) Vᵀ`
    pub fn reconstruct_with(&self, f: impl Fn(f64) -> f64) -> Array2<f64> {
        let mut scaled = self.eigenvectors.clone();
        for (mut column, &lambda) in scaled.axis_iter_mut(Axis(1)).zip(&self.eigenvalues) {
            column *= f(lambda);
        }
        scaled.dot(&self.eigenvectors.t())
    }
}

/// Jacobi eigendecomposition of a symmetric matrix.
///
/// Repeatedly annihilates the largest off-diagonal element until every
/// off-diagonal magnitude is below `tolerance` or `max_iterations` is hit.
pub fn jacobi_eigendecomp(
    matrix: &Array2<f64>,
    max_iterations: usize,
    tolerance: f64,
) -> Result<EigenDecomposition, LinalgError> {
    let n = matrix.nrows();
    if matrix.ncols() != n {
        return Err(LinalgError::DimensionMismatch {
            expected: n,
            actual: matrix.ncols(),
        });
    }

    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);

    for _ in 0..max_iterations {
        let Some((p, q)) = largest_off_diagonal(&a) else {
            break;
        };
        if a[[p, q]].abs() < tolerance {
            break;
        }
        let (c, s) = rotation(a[[p, p]], a[[q, q]], a[[p, q]]);
        rotate(&mut a, &mut v, p, q, c, s);
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| a[[j, j]].total_cmp(&a[[i, i]]));

    let eigenvalues = order.iter().map(|&i| a[[i, i]]).collect();
    let eigenvectors = v.select(Axis(1), &order);

    Ok(EigenDecomposition {
        eigenvalues,
        eigenvectors,
    })
}

/// Position of the largest off-diagonal magnitude in the upper triangle.
fn largest_off_diagonal(a: &Array2<f64>) -> Option<(usize, usize)> {
    let n = a.nrows();
    let mut best = None;
    let mut best_val = -1.0;
    for i in 0..n {
        for j in (i + 1)..n {
            let val = a[[i, j]].abs();
            if val > best_val {
                best_val = val;
                best = Some((i, j));
            }
        }
    }
    best
}

/// Cosine and sine of the rotation zeroing `a[p][q]`.
fn rotation(app: f64, aqq: f64, apq: f64) -> (f64, f64) {
    if apq == 0.0 {
        return (1.0, 0.0);
    }
    let theta = (aqq - app) / (2.0 * apq);
    let t = theta.signum() / (theta.abs() + theta.mul_add(theta, 1.0).sqrt());
    let c = 1.0 / t.mul_add(t, 1.0).sqrt();
    (c, t * c)
}

fn rotate(a: &mut Array2<f64>, v: &mut Array2<f64>, p: usize, q: usize, c: f64, s: f64) {
    let n = a.nrows();
    let (app, aqq, apq) = (a[[p, p]], a[[q, q]], a[[p, q]]);

    a[[p, p]] = c * c * app - 2.0 * c * s * apq + s * s * aqq;
    a[[q, q]] = s * s * app + 2.0 * c * s * apq + c * c * aqq;
    a[[p, q]] = 0.0;
    a[[q, p]] = 0.0;

    for r in (0..n).filter(|&r| r != p && r != q) {
        let (arp, arq) = (a[[r, p]], a[[r, q]]);
        a[[r, p]] = c * arp - s * arq;
        a[[p, r]] = a[[r, p]];
        a[[r, q]] = s * arp + c * arq;
        a[[q, r]] = a[[r, q]];
    }

    for r in 0..n {
        let (vrp, vrq) = (v[[r, p]], v[[r, q]]);
        v[[r, p]] = c * vrp - s * vrq;
        v[[r, q]] = s * vrp + c * vrq;
    }
}

/// Inverse of a symmetric positive semi-definite matrix with its
/// conditioning.
#[derive(Debug, Clone)]
pub struct ScaledInverse {
    /// The inverse
    pub inverse: Array2<f64>,
    /// Condition number of the unit-diagonal rescaled matrix
    pub condition_number: f64,
}

/// Invert a cross-product matrix `X'X` after rescaling it to unit diagonal.
///
/// With `D = diag(1 / sqrt(diag(M)))`, the scaled matrix `D M D` is
/// eigendecomposed and `M⁻¹ = D (D M D)⁻¹ D`. The reported condition number
/// is that of `D M D`, so it does not depend on column units.
///
/// Fails with [`LinalgError::Singular`] if a column is identically zero or
/// the smallest to largest eigenvalue ratio is below `min_ratio`.
pub fn scaled_inverse(matrix: &Array2<f64>, min_ratio: f64) -> Result<ScaledInverse, LinalgError> {
    let n = matrix.nrows();
    if matrix.ncols() != n {
        return Err(LinalgError::DimensionMismatch {
            expected: n,
            actual: matrix.ncols(),
        });
    }

    let diag = matrix.diag();
    if diag.iter().any(|&d| d.is_nan() || d <= 0.0) {
        return Err(LinalgError::Singular { ratio: 0.0 });
    }
    let d: Array1<f64> = diag.mapv(|x| 1.0 / x.sqrt());

    let mut scaled = matrix.clone();
    for ((i, j), value) in scaled.indexed_iter_mut() {
        *value *= d[i] * d[j];
    }

    let decomp = jacobi_eigendecomp(&scaled, MAX_ITERATIONS, TOLERANCE)?;
    let (max, min) = (decomp.max(), decomp.min());
    let ratio = if max > 0.0 { min / max } else { 0.0 };
    if ratio.is_nan() || ratio < min_ratio {
        return Err(LinalgError::Singular { ratio });
    }

    let mut inverse = decomp.reconstruct_with(|lambda| 1.0 / lambda);
    for ((i, j), value) in inverse.indexed_iter_mut() {
        *value *= d[i] * d[j];
    }

    Ok(ScaledInverse {
        inverse,
        condition_number: max / min,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_eigendecomp_diagonal_sorted() {
        let m = array![[1.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 2.0]];
        let decomp = jacobi_eigendecomp(&m, 100, 1e-12).unwrap();
        assert_abs_diff_eq!(decomp.eigenvalues[0], 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(decomp.eigenvalues[1], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(decomp.eigenvalues[2], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_eigendecomp_reconstructs() {
        let m = array![[2.0, 1.0, 1.0], [1.0, 2.0, 1.0], [1.0, 1.0, 2.0]];
        let decomp = jacobi_eigendecomp(&m, 100, 1e-14).unwrap();
        assert_abs_diff_eq!(decomp.max(), 4.0, epsilon = 1e-10);
        assert_abs_diff_eq!(decomp.min(), 1.0, epsilon = 1e-10);
        let back = decomp.reconstruct_with(|l| l);
        for (a, b) in m.iter().zip(back.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_non_square_rejected() {
        let m = Array2::<f64>::zeros((2, 3));
        assert!(matches!(
            jacobi_eigendecomp(&m, 10, 1e-12),
            Err(LinalgError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_scaled_inverse_is_inverse() {
        let m = array![[4.0, 2.0, 0.6], [2.0, 2.0, 0.4], [0.6, 0.4, 1.0]];
        let inv = scaled_inverse(&m, SINGULAR_RATIO).unwrap();
        let product = m.dot(&inv.inverse);
        let eye = Array2::<f64>::eye(3);
        for (a, b) in product.iter().zip(eye.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
        }
        assert!(inv.condition_number >= 1.0);
    }

    #[test]
    fn test_scaling_removes_unit_effect() {
        let m = array![[1.0, 0.3], [0.3, 1.0]];
        let rescaled = array![[1.0e6, 0.3e3], [0.3e3, 1.0]];
        let a = scaled_inverse(&m, SINGULAR_RATIO).unwrap();
        let b = scaled_inverse(&rescaled, SINGULAR_RATIO).unwrap();
        assert_abs_diff_eq!(a.condition_number, b.condition_number, epsilon = 1e-9);
        assert_abs_diff_eq!(a.condition_number, 1.3 / 0.7, epsilon = 1e-9);
    }

    #[test]
    fn test_collinear_is_singular() {
        // third column = first + second
        let x = array![[1.0, 2.0, 3.0], [1.0, 5.0, 6.0], [1.0, 7.0, 8.0], [1.0, 1.0, 2.0]];
        let xtx = x.t().dot(&x);
        assert!(matches!(
            scaled_inverse(&xtx, SINGULAR_RATIO),
            Err(LinalgError::Singular { .. })
        ));
    }

    #[test]
    fn test_zero_column_is_singular() {
        let m = array![[1.0, 0.0], [0.0, 0.0]];
        assert!(matches!(
            scaled_inverse(&m, SINGULAR_RATIO),
            Err(LinalgError::Singular { ratio }) if ratio == 0.0
        ));
    }
}
