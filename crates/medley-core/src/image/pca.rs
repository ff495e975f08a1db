//! Principal component subspace
//!
//! The basis is the top right-singular vectors of the mean-centred data.
//! They are obtained from a symmetric eigen-decomposition of whichever of
//! the Gram matrix (`n x n`) or the scatter matrix (`d x d`) is smaller:
//! Householder reduction to tridiagonal form, then implicit QL iterations.
//!
//! When the data has fewer significant directions than requested, the
//! basis is completed with standard basis vectors orthogonalised against
//! it, so the result is always `n_components` orthonormal rows. Each row is
//! signed so that its largest-magnitude coordinate is positive.

use crate::error::{Error, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis, Zip};

// QL iterations allowed per eigenvalue before moving on
const MAX_QL_ITERATIONS: usize = 64;

// Completion candidates shorter than this after orthogonalisation are dropped
const COMPLETION_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Clone)]
struct Basis {
    mean: Array1<f64>,
    /// `n_components x dimension`, orthonormal rows
    components: Array2<f64>,
    singular_values: Array1<f64>,
}

/// Linear subspace model fitted once from a dataset
#[derive(Debug, Clone)]
pub struct SubspaceModel {
    n_components: usize,
    basis: Option<Basis>,
}

impl SubspaceModel {
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            basis: None,
        }
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }

    pub fn is_fitted(&self) -> bool {
        self.basis.is_some()
    }

    /// Fit the basis to `vectors` (one sample per row)
    pub fn fit(&mut self, vectors: &Array2<f64>) -> Result<()> {
        let (samples, dimension) = vectors.dim();
        let k = self.n_components;

        if k == 0 || samples < k || dimension < k {
            return Err(Error::InsufficientData {
                samples,
                dimension,
                components: k,
            });
        }

        let mean = vectors
            .mean_axis(Axis(0))
            .ok_or(Error::InsufficientData {
                samples,
                dimension,
                components: k,
            })?;
        let centred = vectors - &mean;

        let (directions, singular_values) = principal_directions(&centred, k);
        let significant = significant_count(&singular_values, samples.max(dimension));

        let mut rows: Vec<Array1<f64>> = Vec::with_capacity(k);
        let mut values = Vec::with_capacity(k);

        for (direction, &s) in directions.iter().zip(&singular_values).take(significant) {
            if rows.len() == k {
                break;
            }
            if let Some(unit) = orthonormalise(direction.clone(), &rows) {
                rows.push(unit);
                values.push(s);
            }
        }

        let found = rows.len();
        for axis in 0..dimension {
            if rows.len() == k {
                break;
            }
            let mut candidate = Array1::zeros(dimension);
            candidate[axis] = 1.0;
            if let Some(unit) = orthonormalise(candidate, &rows) {
                rows.push(unit);
                values.push(0.0);
            }
        }

        if found < k {
            log::debug!(
                "Subspace has {} significant directions, completed to {}",
                found,
                k
            );
        }

        let mut components = Array2::zeros((k, dimension));
        for (mut target, mut row) in components.outer_iter_mut().zip(rows) {
            fix_sign(&mut row);
            target.assign(&row);
        }

        self.basis = Some(Basis {
            mean,
            components,
            singular_values: Array1::from(values),
        });
        Ok(())
    }

    /// Project a batch of vectors (one per row)
    pub fn transform(&self, vectors: &Array2<f64>) -> Result<Array2<f64>> {
        let basis = self.basis.as_ref().ok_or(Error::NotFitted)?;
        check_dimension(basis, vectors.ncols())?;

        let centred = vectors - &basis.mean;
        Ok(centred.dot(&basis.components.t()))
    }

    /// Project a single vector
    pub fn project(&self, vector: &[f64]) -> Result<Array1<f64>> {
        let basis = self.basis.as_ref().ok_or(Error::NotFitted)?;
        check_dimension(basis, vector.len())?;

        let centred = &ArrayView1::from(vector) - &basis.mean;
        Ok(basis.components.dot(&centred))
    }

    pub fn fit_transform(&mut self, vectors: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(vectors)?;
        self.transform(vectors)
    }

    pub fn components(&self) -> Option<&Array2<f64>> {
        self.basis.as_ref().map(|b| &b.components)
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.basis.as_ref().map(|b| &b.mean)
    }

    pub fn singular_values(&self) -> Option<&Array1<f64>> {
        self.basis.as_ref().map(|b| &b.singular_values)
    }
}

fn check_dimension(basis: &Basis, len: usize) -> Result<()> {
    if len != basis.mean.len() {
        return Err(Error::InvalidInput(format!(
            "expected vectors of length {}, got {}",
            basis.mean.len(),
            len
        )));
    }
    Ok(())
}

/// Leading `count` right-singular vectors of `centred` with their singular
/// values, sorted by descending singular value
fn principal_directions(centred: &Array2<f64>, count: usize) -> (Vec<Array1<f64>>, Vec<f64>) {
    let (samples, dimension) = centred.dim();

    if samples <= dimension {
        // X X^T = U S^2 U^T, V = X^T U / S
        let (values, vectors) = sorted_eigen(centred.dot(&centred.t()), count);
        let directions = vectors
            .into_iter()
            .zip(&values)
            .map(|(u, &s)| {
                let v = centred.t().dot(&u);
                if s > 0.0 {
                    v / s
                } else {
                    v
                }
            })
            .collect();
        (directions, values)
    } else {
        // X^T X = V S^2 V^T
        let (values, vectors) = sorted_eigen(centred.t().dot(centred), count);
        (vectors, values)
    }
}

/// Top `count` eigenpairs as (singular value, unit eigenvector), descending
fn sorted_eigen(matrix: Array2<f64>, count: usize) -> (Vec<f64>, Vec<Array1<f64>>) {
    let (eigenvalues, eigenvectors) = symmetric_eigen(matrix);

    let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
    // Stable, so equal eigenvalues keep solver order
    order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]));

    order
        .into_iter()
        .take(count)
        .map(|i| (eigenvalues[i].max(0.0).sqrt(), eigenvectors.row(i).to_owned()))
        .unzip()
}

/// Number of singular values above the numerical noise floor
fn significant_count(singular_values: &[f64], size: usize) -> usize {
    let largest = singular_values.first().copied().unwrap_or(0.0);
    let tolerance = largest * size as f64 * f64::EPSILON;
    singular_values
        .iter()
        .take_while(|&&s| s > 0.0 && s > tolerance)
        .count()
}

/// Gram-Schmidt `candidate` against `basis` (applied twice for stability)
fn orthonormalise(mut candidate: Array1<f64>, basis: &[Array1<f64>]) -> Option<Array1<f64>> {
    for _ in 0..2 {
        for row in basis {
            let overlap = row.dot(&candidate);
            candidate.scaled_add(-overlap, row);
        }
    }
    let norm = candidate.dot(&candidate).sqrt();
    if norm < COMPLETION_TOLERANCE {
        return None;
    }
    Some(candidate / norm)
}

/// Flip `row` so its largest-magnitude coordinate is positive
fn fix_sign(row: &mut Array1<f64>) {
    let mut pivot = 0.0f64;
    for &value in row.iter() {
        if value.abs() > pivot.abs() {
            pivot = value;
        }
    }
    if pivot < 0.0 {
        row.mapv_inplace(|v| -v);
    }
}

/// Eigen-decomposition of a symmetric matrix.
///
/// Returns eigenvalues and a matrix whose rows are the matching unit
/// eigenvectors, both in solver order.
fn symmetric_eigen(matrix: Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = matrix.nrows();
    if n == 0 {
        return (Array1::zeros(0), matrix);
    }

    // The input is symmetric, so it is its own transpose. Working on the
    // transpose keeps every inner loop on a contiguous row.
    let mut w = matrix;
    let mut d = vec![0.0; n];
    let mut e = vec![0.0; n];

    tridiagonalise(&mut w, &mut d, &mut e);
    diagonalise(&mut w, &mut d, &mut e);

    (Array1::from(d), w)
}

/// Householder reduction of `w` to tridiagonal form.
///
/// On return `d` holds the diagonal, `e[1..]` the subdiagonal and the rows
/// of `w` the accumulated orthogonal transformation.
fn tridiagonalise(w: &mut Array2<f64>, d: &mut [f64], e: &mut [f64]) {
    let n = d.len();
    for (j, dj) in d.iter_mut().enumerate() {
        *dj = w[[j, n - 1]];
    }

    for i in (1..n).rev() {
        let scale: f64 = d[..i].iter().map(|x| x.abs()).sum();
        let mut h = 0.0;

        if scale == 0.0 {
            e[i] = d[i - 1];
            for j in 0..i {
                d[j] = w[[j, i - 1]];
                w[[j, i]] = 0.0;
                w[[i, j]] = 0.0;
            }
        } else {
            for x in &mut d[..i] {
                *x /= scale;
                h += *x * *x;
            }
            let mut f = d[i - 1];
            let mut g = if f > 0.0 { -h.sqrt() } else { h.sqrt() };
            e[i] = scale * g;
            h -= f * g;
            d[i - 1] = f - g;
            e[..i].fill(0.0);

            for j in 0..i {
                f = d[j];
                w[[i, j]] = f;
                g = e[j] + w[[j, j]] * f;
                for k in (j + 1)..i {
                    let wjk = w[[j, k]];
                    g += wjk * d[k];
                    e[k] += wjk * f;
                }
                e[j] = g;
            }

            f = 0.0;
            for j in 0..i {
                e[j] /= h;
                f += e[j] * d[j];
            }
            let hh = f / (h + h);
            for j in 0..i {
                e[j] -= hh * d[j];
            }
            for j in 0..i {
                f = d[j];
                g = e[j];
                for k in j..i {
                    w[[j, k]] -= f * e[k] + g * d[k];
                }
                d[j] = w[[j, i - 1]];
                w[[j, i]] = 0.0;
            }
        }
        d[i] = h;
    }

    for i in 0..n - 1 {
        w[[i, n - 1]] = w[[i, i]];
        w[[i, i]] = 1.0;
        let h = d[i + 1];
        if h != 0.0 {
            for k in 0..=i {
                d[k] = w[[i + 1, k]] / h;
            }
            for j in 0..=i {
                let mut g = 0.0;
                for k in 0..=i {
                    g += w[[i + 1, k]] * w[[j, k]];
                }
                for k in 0..=i {
                    w[[j, k]] -= g * d[k];
                }
            }
        }
        for k in 0..=i {
            w[[i + 1, k]] = 0.0;
        }
    }
    for j in 0..n {
        d[j] = w[[j, n - 1]];
        w[[j, n - 1]] = 0.0;
    }
    w[[n - 1, n - 1]] = 1.0;
    e[0] = 0.0;
}

/// Implicit QL iterations on the tridiagonal matrix (`d`, `e`), applying
/// every rotation to the rows of `w`
fn diagonalise(w: &mut Array2<f64>, d: &mut [f64], e: &mut [f64]) {
    let n = d.len();
    for i in 1..n {
        e[i - 1] = e[i];
    }
    e[n - 1] = 0.0;

    let mut shift = 0.0;
    let mut norm = 0.0f64;

    for l in 0..n {
        norm = norm.max(d[l].abs() + e[l].abs());
        let mut m = l;
        while m + 1 < n && e[m].abs() > f64::EPSILON * norm {
            m += 1;
        }

        if m > l {
            let mut converged = false;
            for _ in 0..MAX_QL_ITERATIONS {
                let mut g = d[l];
                let mut p = (d[l + 1] - g) / (2.0 * e[l]);
                let mut r = p.hypot(1.0);
                if p < 0.0 {
                    r = -r;
                }
                d[l] = e[l] / (p + r);
                d[l + 1] = e[l] * (p + r);
                let dl1 = d[l + 1];
                let mut h = g - d[l];
                for x in &mut d[l + 2..] {
                    *x -= h;
                }
                shift += h;

                p = d[m];
                let (mut c, mut c2, mut c3) = (1.0, 1.0, 1.0);
                let el1 = e[l + 1];
                let (mut s, mut s2) = (0.0, 0.0);
                for i in (l..m).rev() {
                    c3 = c2;
                    c2 = c;
                    s2 = s;
                    g = c * e[i];
                    h = c * p;
                    r = p.hypot(e[i]);
                    e[i + 1] = s * r;
                    s = e[i] / r;
                    c = p / r;
                    p = c * d[i] - s * g;
                    d[i + 1] = h + s * (c * g + s * d[i]);
                    rotate_rows(w, i, c, s);
                }
                p = -s * s2 * c3 * el1 * e[l] / dl1;
                e[l] = s * p;
                d[l] = c * p;

                if e[l].abs() <= f64::EPSILON * norm {
                    converged = true;
                    break;
                }
            }
            if !converged {
                log::debug!("QL iteration limit reached for eigenvalue {}", l);
            }
        }

        d[l] += shift;
        e[l] = 0.0;
    }
}

/// Apply a plane rotation to rows `i` and `i + 1`
fn rotate_rows(w: &mut Array2<f64>, i: usize, c: f64, s: f64) {
    let (mut head, mut tail) = w.view_mut().split_at(Axis(0), i + 1);
    Zip::from(head.row_mut(i))
        .and(tail.row_mut(0))
        .for_each(|a, b| {
            let next = *b;
            *b = s * *a + c * next;
            *a = c * *a - s * next;
        });
}
