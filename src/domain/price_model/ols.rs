//! Ordinary least squares with intercept.
//!
//! The design matrix is centered, then the minimum-norm solution is taken from a thin SVD of
//! the centered matrix. One-hot blocks are collinear with the intercept, so the design is
//! usually rank deficient; dropping the null singular directions picks the same solution as
//! an SVD-based `lstsq`. Working on the centered matrix directly keeps the cost bounded by
//! the smaller of rows and columns, which matters once every row brings its own category.

use linfa_linalg::svd::SVD;
use ndarray::{Array1, Array2, Axis};

use crate::domain::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquaresFit {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
    pub rank: usize,
}

pub fn fit(x: &Array2<f64>, y: &Array1<f64>) -> Result<LeastSquaresFit> {
    if x.nrows() != y.len() {
        return Err(AppError::Internal(format!(
            "design matrix has {} rows but target has {} values",
            x.nrows(),
            y.len()
        )));
    }
    let (Some(x_mean), Some(y_mean)) = (x.mean_axis(Axis(0)), y.mean()) else {
        return Err(AppError::training_msg("no rows to fit"));
    };

    let xc = x - &x_mean;
    let yc = y - y_mean;

    let mut coefficients = Array1::<f64>::zeros(x.ncols());
    let mut rank = 0;
    // A constant design has nothing to decompose: the fit is the target mean.
    if xc.iter().any(|v| *v != 0.0) {
        let (Some(u), sigma, Some(vt)) = xc.svd(true, true).map_err(|err| {
            AppError::training_msg(format!("singular value decomposition failed: {err}"))
        })?
        else {
            return Err(AppError::Internal(
                "singular value decomposition returned no singular vectors".into(),
            ));
        };

        // Same relative cutoff numpy's lstsq uses by default.
        let largest = sigma.iter().cloned().fold(0.0_f64, f64::max);
        let cutoff = largest * f64::EPSILON * x.nrows().max(x.ncols()) as f64;
        for (k, &s) in sigma.iter().enumerate() {
            if s <= cutoff {
                continue;
            }
            rank += 1;
            let weight = u.column(k).dot(&yc) / s;
            coefficients.scaled_add(weight, &vt.row(k));
        }
    }

    let intercept = y_mean - x_mean.dot(&coefficients);
    if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
        return Err(AppError::training_msg(
            "least squares produced non-finite coefficients",
        ));
    }

    Ok(LeastSquaresFit {
        coefficients,
        intercept,
        rank,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_exact_line() {
        // y = 2x + 1
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![1.0, 3.0, 5.0, 7.0];
        let fit = fit(&x, &y).unwrap();
        assert!((fit.coefficients[0] - 2.0).abs() < 1e-9);
        assert!((fit.intercept - 1.0).abs() < 1e-9);
        assert_eq!(fit.rank, 1);
    }

    #[test]
    fn test_two_features() {
        // y = 3a - 2b + 5
        let x = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [2.0, 3.0], [4.0, 1.0]];
        let y = x.map_axis(Axis(1), |r| 3.0 * r[0] - 2.0 * r[1] + 5.0);
        let fit = fit(&x, &y).unwrap();
        assert!((fit.coefficients[0] - 3.0).abs() < 1e-9);
        assert!((fit.coefficients[1] + 2.0).abs() < 1e-9);
        assert!((fit.intercept - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_collinear_columns_get_minimum_norm_split() {
        // Two identical columns share the weight equally.
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        let y = array![2.0, 4.0, 6.0];
        let fit = fit(&x, &y).unwrap();
        assert_eq!(fit.rank, 1);
        assert!((fit.coefficients[0] - 1.0).abs() < 1e-9);
        assert!((fit.coefficients[1] - 1.0).abs() < 1e-9);
        assert!(fit.intercept.abs() < 1e-9);
    }

    #[test]
    fn test_constant_design_falls_back_to_mean() {
        let x = array![[1.0], [1.0], [1.0]];
        let y = array![10.0, 20.0, 30.0];
        let fit = fit(&x, &y).unwrap();
        assert_eq!(fit.rank, 0);
        assert_eq!(fit.coefficients[0], 0.0);
        assert!((fit.intercept - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_columns() {
        let x = Array2::<f64>::zeros((3, 0));
        let y = array![1.0, 2.0, 3.0];
        let fit = fit(&x, &y).unwrap();
        assert!(fit.coefficients.is_empty());
        assert!((fit.intercept - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_rows_is_training_error() {
        let x = Array2::<f64>::zeros((0, 2));
        let y = Array1::<f64>::zeros(0);
        assert!(matches!(fit(&x, &y), Err(AppError::Training { .. })));
    }

    #[test]
    fn test_wide_design_interpolates_targets() {
        // More columns than rows: one indicator per row plus a shared block.
        let rows = 40;
        let cols = 2 * rows + 3;
        let mut x = Array2::<f64>::zeros((rows, cols));
        for i in 0..rows {
            x[[i, i]] = 1.0;
            x[[i, rows + i]] = 1.0;
            x[[i, 2 * rows + i % 3]] = 1.0;
        }
        let y = Array1::from_iter((0..rows).map(|i| 50.0 + 3.5 * i as f64));
        let fit = fit(&x, &y).unwrap();

        assert_eq!(fit.rank, rows - 1);
        let fitted = x.dot(&fit.coefficients) + fit.intercept;
        for (a, b) in fitted.iter().zip(y.iter()) {
            assert!((a - b).abs() < 1e-8, "{a} vs {b}");
        }
    }
}
