//! Truncated tensor algebra kernels.
//!
//! Elements are flat slices laid out by [`Levels`], without the scalar term.
//! Group-like elements (signatures, exponentials) have an implied scalar of
//! one; Lie elements and powers used by the logarithm have an implied
//! scalar of zero. Every forward kernel has an adjoint that accumulates
//! into its gradient buffers.

use crate::dims::Levels;

/// `out = exp(dx)`, with level `k` equal to `dx^{⊗k} / k!`.
pub(crate) fn restricted_exp(levels: &Levels, dx: &[f64], out: &mut [f64]) {
    let c = levels.channels;
    out[levels.range(1)].copy_from_slice(dx);
    for k in 2..=levels.depth {
        let (lower, upper) = out.split_at_mut(levels.offset(k));
        let prev = &lower[levels.range(k - 1)];
        let current = &mut upper[..levels.size(k)];
        let inv_k = 1.0 / k as f64;
        for (x, &px) in prev.iter().enumerate() {
            let scaled = px * inv_k;
            for (slot, &dj) in current[x * c..(x + 1) * c].iter_mut().zip(dx) {
                *slot = scaled * dj;
            }
        }
    }
}

/// Adjoint of [`restricted_exp`]. Consumes `grad_exp` as scratch.
pub(crate) fn restricted_exp_backward(
    levels: &Levels,
    dx: &[f64],
    exp: &[f64],
    grad_exp: &mut [f64],
    grad_dx: &mut [f64],
) {
    let c = levels.channels;
    for k in (2..=levels.depth).rev() {
        let (lower, upper) = grad_exp.split_at_mut(levels.offset(k));
        let grad_prev = &mut lower[levels.range(k - 1)];
        let grad_current = &upper[..levels.size(k)];
        let prev = &exp[levels.range(k - 1)];
        let inv_k = 1.0 / k as f64;
        for (x, gp) in grad_prev.iter_mut().enumerate() {
            let row = &grad_current[x * c..(x + 1) * c];
            let px = prev[x] * inv_k;
            for (j, &g) in row.iter().enumerate() {
                *gp += g * dx[j] * inv_k;
                grad_dx[j] += g * px;
            }
        }
    }
    for (gd, &g) in grad_dx.iter_mut().zip(&grad_exp[levels.range(1)]) {
        *gd += g;
    }
}

/// `out += a ⊗ b` for elements with zero scalar term.
pub(crate) fn mult_partial_add(levels: &Levels, a: &[f64], b: &[f64], out: &mut [f64]) {
    for k in 2..=levels.depth {
        let out_k = &mut out[levels.range(k)];
        for i in 1..k {
            let j = k - i;
            let b_j = &b[levels.range(j)];
            let width = b_j.len();
            for (x, &ax) in a[levels.range(i)].iter().enumerate() {
                if ax == 0.0 {
                    continue;
                }
                for (slot, &by) in out_k[x * width..(x + 1) * width].iter_mut().zip(b_j) {
                    *slot += ax * by;
                }
            }
        }
    }
}

/// Adjoint of [`mult_partial_add`] with respect to both operands.
pub(crate) fn mult_partial_backward(
    levels: &Levels,
    a: &[f64],
    b: &[f64],
    grad_out: &[f64],
    grad_a: &mut [f64],
    grad_b: &mut [f64],
) {
    for k in 2..=levels.depth {
        let g_k = &grad_out[levels.range(k)];
        for i in 1..k {
            let j = k - i;
            let b_j = &b[levels.range(j)];
            let width = b_j.len();
            let a_range = levels.range(i);
            let b_range = levels.range(j);
            for x in 0..levels.size(i) {
                let row = &g_k[x * width..(x + 1) * width];
                let ax = a[a_range.start + x];
                let mut acc = 0.0;
                for (y, &g) in row.iter().enumerate() {
                    acc += g * b_j[y];
                    grad_b[b_range.start + y] += ax * g;
                }
                grad_a[a_range.start + x] += acc;
            }
        }
    }
}

/// `a = a ⊗ b` for group-like elements (implied unit scalar), in place.
///
/// Levels are updated from the top down so each level reads the old values
/// of the levels below it.
pub(crate) fn group_mult(levels: &Levels, a: &mut [f64], b: &[f64]) {
    for k in (1..=levels.depth).rev() {
        let (lower, upper) = a.split_at_mut(levels.offset(k));
        let a_k = &mut upper[..levels.size(k)];
        for (slot, &bk) in a_k.iter_mut().zip(&b[levels.range(k)]) {
            *slot += bk;
        }
        for i in 1..k {
            let b_j = &b[levels.range(k - i)];
            let width = b_j.len();
            for (x, &ax) in lower[levels.range(i)].iter().enumerate() {
                for (slot, &by) in a_k[x * width..(x + 1) * width].iter_mut().zip(b_j) {
                    *slot += ax * by;
                }
            }
        }
    }
}

/// Adjoint of [`group_mult`], given the operands before multiplication.
pub(crate) fn group_mult_backward(
    levels: &Levels,
    a: &[f64],
    b: &[f64],
    grad_out: &[f64],
    grad_a: &mut [f64],
    grad_b: &mut [f64],
) {
    for ((ga, gb), &g) in grad_a.iter_mut().zip(grad_b.iter_mut()).zip(grad_out) {
        *ga += g;
        *gb += g;
    }
    mult_partial_backward(levels, a, b, grad_out, grad_a, grad_b);
}

fn log_coefficient(n: usize) -> f64 {
    let sign = if n % 2 == 1 { 1.0 } else { -1.0 };
    sign / n as f64
}

/// Powers `x, x^2, ..., x^depth` of a zero-scalar element.
fn powers(levels: &Levels, x: &[f64]) -> Vec<Vec<f64>> {
    let mut out = Vec::with_capacity(levels.depth);
    out.push(x.to_vec());
    for _ in 2..=levels.depth {
        let mut next = vec![0.0; levels.total()];
        mult_partial_add(levels, out.last().expect("at least one power"), x, &mut next);
        out.push(next);
    }
    out
}

/// `out = log(1 + x) = sum_{n=1}^{depth} (-1)^{n+1} x^n / n`.
pub(crate) fn log(levels: &Levels, x: &[f64], out: &mut [f64]) {
    out.fill(0.0);
    for (n, power) in powers(levels, x).iter().enumerate() {
        let coefficient = log_coefficient(n + 1);
        for (slot, &p) in out.iter_mut().zip(power) {
            *slot += coefficient * p;
        }
    }
}

/// Adjoint of [`log`]; accumulates into `grad_x`.
pub(crate) fn log_backward(levels: &Levels, x: &[f64], grad_out: &[f64], grad_x: &mut [f64]) {
    let powers = powers(levels, x);
    let scaled = |n: usize| -> Vec<f64> {
        let coefficient = log_coefficient(n);
        grad_out.iter().map(|g| coefficient * g).collect()
    };

    // grad of x^n, walking the chain x^n = x^{n-1} ⊗ x back down
    let mut grad_power = scaled(levels.depth);
    for n in (2..=levels.depth).rev() {
        let mut grad_prev = scaled(n - 1);
        mult_partial_backward(levels, &powers[n - 2], x, &grad_power, &mut grad_prev, grad_x);
        grad_power = grad_prev;
    }
    for (gx, g) in grad_x.iter_mut().zip(grad_power) {
        *gx += g;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dims::LyndonSpec;
    use crate::tests::{assert_close, pseudo_random};

    fn levels(channels: usize, depth: usize) -> Levels {
        Levels::new(&LyndonSpec::new(channels, depth).unwrap())
    }

    fn exp_of(levels: &Levels, dx: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; levels.total()];
        restricted_exp(levels, dx, &mut out);
        out
    }

    #[test]
    fn test_exp_levels() {
        let lv = levels(2, 3);
        let out = exp_of(&lv, &[1.0, 2.0]);
        assert_eq!(&out[0..2], &[1.0, 2.0]);
        assert_eq!(&out[2..6], &[0.5, 1.0, 1.0, 2.0]);
        // level 3: dx⊗dx⊗dx / 6
        assert_close(out[6], 1.0 / 6.0, 1e-12);
        assert_close(out[13], 8.0 / 6.0, 1e-12);
    }

    #[test]
    fn test_exp_times_inverse_is_identity() {
        let lv = levels(3, 4);
        let dx = pseudo_random(7, 3);
        let neg: Vec<f64> = dx.iter().map(|v| -v).collect();
        let mut a = exp_of(&lv, &dx);
        group_mult(&lv, &mut a, &exp_of(&lv, &neg));
        for v in a {
            assert_close(v, 0.0, 1e-12);
        }
    }

    #[test]
    fn test_exps_of_parallel_increments_compose() {
        let lv = levels(2, 4);
        let mut a = exp_of(&lv, &[0.3, -0.1]);
        group_mult(&lv, &mut a, &exp_of(&lv, &[0.6, -0.2]));
        let direct = exp_of(&lv, &[0.9, -0.3]);
        for (x, y) in a.iter().zip(&direct) {
            assert_close(*x, *y, 1e-12);
        }
    }

    #[test]
    fn test_log_of_exp() {
        let lv = levels(3, 4);
        let dx = pseudo_random(11, 3);
        let mut out = vec![0.0; lv.total()];
        log(&lv, &exp_of(&lv, &dx), &mut out);
        for (i, v) in out.iter().enumerate() {
            let expected = if i < 3 { dx[i] } else { 0.0 };
            assert_close(*v, expected, 1e-12);
        }
    }

    #[test]
    fn test_group_mult_backward_matches_finite_difference() {
        let lv = levels(2, 3);
        let a = pseudo_random(1, lv.total());
        let b = pseudo_random(2, lv.total());
        let weights = pseudo_random(3, lv.total());
        let objective = |a: &[f64], b: &[f64]| {
            let mut out = a.to_vec();
            group_mult(&lv, &mut out, b);
            out.iter().zip(&weights).map(|(o, w)| o * w).sum::<f64>()
        };

        let mut grad_a = vec![0.0; lv.total()];
        let mut grad_b = vec![0.0; lv.total()];
        group_mult_backward(&lv, &a, &b, &weights, &mut grad_a, &mut grad_b);

        let eps = 1e-6;
        for i in 0..lv.total() {
            let mut up = a.clone();
            let mut down = a.clone();
            up[i] += eps;
            down[i] -= eps;
            let numeric = (objective(&up, &b) - objective(&down, &b)) / (2.0 * eps);
            assert_close(grad_a[i], numeric, 1e-6);

            let mut up = b.clone();
            let mut down = b.clone();
            up[i] += eps;
            down[i] -= eps;
            let numeric = (objective(&a, &up) - objective(&a, &down)) / (2.0 * eps);
            assert_close(grad_b[i], numeric, 1e-6);
        }
    }

    #[test]
    fn test_exp_backward_matches_finite_difference() {
        let lv = levels(3, 3);
        let dx = pseudo_random(5, 3);
        let weights = pseudo_random(6, lv.total());
        let objective = |dx: &[f64]| {
            exp_of(&lv, dx)
                .iter()
                .zip(&weights)
                .map(|(o, w)| o * w)
                .sum::<f64>()
        };

        let mut grad_exp = weights.clone();
        let mut grad_dx = vec![0.0; 3];
        restricted_exp_backward(&lv, &dx, &exp_of(&lv, &dx), &mut grad_exp, &mut grad_dx);

        let eps = 1e-6;
        for j in 0..3 {
            let mut up = dx.clone();
            let mut down = dx.clone();
            up[j] += eps;
            down[j] -= eps;
            let numeric = (objective(&up) - objective(&down)) / (2.0 * eps);
            assert_close(grad_dx[j], numeric, 1e-6);
        }
    }

    #[test]
    fn test_log_backward_matches_finite_difference() {
        let lv = levels(2, 4);
        let x = pseudo_random(9, lv.total());
        let weights = pseudo_random(10, lv.total());
        let objective = |x: &[f64]| {
            let mut out = vec![0.0; lv.total()];
            log(&lv, x, &mut out);
            out.iter().zip(&weights).map(|(o, w)| o * w).sum::<f64>()
        };

        let mut grad_x = vec![0.0; lv.total()];
        log_backward(&lv, &x, &weights, &mut grad_x);

        let eps = 1e-6;
        for i in 0..lv.total() {
            let mut up = x.clone();
            let mut down = x.clone();
            up[i] += eps;
            down[i] -= eps;
            let numeric = (objective(&up) - objective(&down)) / (2.0 * eps);
            assert_close(grad_x[i], numeric, 1e-6);
        }
    }
}
