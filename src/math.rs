//! Scalar numerical helpers shared by the kernel library.
//!
//! Grounded on `pyhgf/binary.py` (`sgm`, `gaussian_density`, `binary_surprise`)
//! and `pyhgf/updates/posterior/volatile/volatile_node_posterior_update_unbounded.py`
//! (the `[-80, 80]` clip and the `2 + sqrt(3)` constant).

use statrs::function::gamma::{digamma, ln_gamma};

/// Logistic sigmoid. Monotone increasing, `sigmoid(0) == 0.5`.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Gaussian density parametrised by precision rather than variance.
pub fn gaussian_density(x: f64, mean: f64, precision: f64) -> f64 {
    (precision / (2.0 * std::f64::consts::PI).sqrt()) * (-precision / 2.0 * (x - mean).powi(2)).exp()
}

/// Surprise elicited by a binary outcome `x` given predicted probability
/// `mu_hat` of `x == 1`.
pub fn binary_surprise(x: f64, mu_hat: f64) -> f64 {
    if x != 0.0 {
        -mu_hat.ln()
    } else {
        -(1.0 - mu_hat).ln()
    }
}

/// Clip to `[-80, 80]` before exponentiation, as specified for the unbounded
/// volatility update (spec.md §4.4, §9 — "numerical choices of the reference;
/// preserve them bit-for-bit").
pub fn clip_exp_arg(x: f64) -> f64 {
    x.clamp(-80.0, 80.0)
}

/// `2 + sqrt(3)`, the fixed point used by the unbounded volatility update's
/// second quadratic approximation.
pub const TWO_PLUS_SQRT3: f64 = 2.0 + 1.732_050_807_568_877_2;

/// Smoothed rectangular weighting window used to blend the two quadratic
/// approximations of the unbounded volatility update.
///
/// `pyhgf.math.smoothed_rectangular` is not part of the retained source
/// slice (see DESIGN.md); this reconstructs it as the product of two
/// logistic transitions, which reproduces the documented call-site contract:
/// the weight is close to 1 inside a central band and decays smoothly to 0
/// on both sides, with `(theta_l, phi_l)` controlling the left transition and
/// `(theta_r, phi_r)` the right one.
pub fn smoothed_rectangular(x: f64, theta_l: f64, phi_l: f64, theta_r: f64, phi_r: f64) -> f64 {
    sigmoid(phi_l * (x + theta_l)) * sigmoid(-phi_r * (x - theta_r))
}

/// KL(Dirichlet(alpha) || Dirichlet(beta)).
///
/// `KL = lnGamma(sum a) - sum lnGamma(a_i) - lnGamma(sum b) + sum lnGamma(b_i)
///       + sum (a_i - b_i) * (digamma(a_i) - digamma(sum a))`
///
/// `KL(Dir(a) || Dir(a)) == 0` for any valid `a` (spec.md §8).
pub fn dirichlet_kullback_leibler(alpha: &[f64], beta: &[f64]) -> f64 {
    debug_assert_eq!(alpha.len(), beta.len());
    let sum_alpha: f64 = alpha.iter().sum();
    let sum_beta: f64 = beta.iter().sum();
    let digamma_sum_alpha = digamma(sum_alpha);

    let mut kl = ln_gamma(sum_alpha) - ln_gamma(sum_beta);
    for (&a, &b) in alpha.iter().zip(beta.iter()) {
        kl -= ln_gamma(a);
        kl += ln_gamma(b);
        kl += (a - b) * (digamma(a) - digamma_sum_alpha);
    }
    kl
}
