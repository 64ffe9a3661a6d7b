//! # Bounded Scalar Minimization
//!
//! Brent's method on a closed interval: golden-section steps with parabolic
//! interpolation when the last few points allow it. Works without
//! derivatives and tolerates step-shaped objectives, where it degrades to
//! golden-section search. No randomness is involved, so identical inputs
//! give identical results.

/// `(3 - sqrt(5)) / 2`
const GOLDEN_MEAN: f64 = 0.381_966_011_250_105_1;

/// Outcome of a bounded minimization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundedMinimum {
    /// Best abscissa found.
    pub x: f64,
    /// Objective value at `x`.
    pub fun: f64,
    /// Number of objective evaluations.
    pub evaluations: usize,
    /// False when the evaluation budget ran out before the bracket shrank
    /// below tolerance.
    pub converged: bool,
}

/// Brent minimizer over `[lower, upper]`.
#[derive(Debug, Clone, Copy)]
pub struct BoundedMinimizer {
    lower: f64,
    upper: f64,
    xatol: f64,
    max_evaluations: usize,
}

impl BoundedMinimizer {
    /// Minimizer over `[lower, upper]` with an absolute tolerance of `1e-5`
    /// and a budget of 500 evaluations.
    pub fn new(lower: f64, upper: f64) -> Self {
        debug_assert!(lower < upper, "empty search interval");
        Self {
            lower,
            upper,
            xatol: 1e-5,
            max_evaluations: 500,
        }
    }

    pub fn with_xatol(mut self, xatol: f64) -> Self {
        self.xatol = xatol;
        self
    }

    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = max_evaluations.max(1);
        self
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }

    /// Minimize `f` on the configured interval.
    pub fn minimize<F: FnMut(f64) -> f64>(&self, mut f: F) -> BoundedMinimum {
        let sqrt_eps = f64::EPSILON.sqrt();
        let (mut a, mut b) = (self.lower, self.upper);

        // xf: best point so far, nfc: second best, fulc: previous second best
        let mut fulc = a + GOLDEN_MEAN * (b - a);
        let mut nfc = fulc;
        let mut xf = fulc;
        let mut fx = f(xf);
        let mut ffulc = fx;
        let mut fnfc = fx;
        let mut evaluations = 1usize;

        let mut rat = 0.0f64;
        let mut e = 0.0f64;
        let mut xm = 0.5 * (a + b);
        let mut tol1 = sqrt_eps * xf.abs() + self.xatol / 3.0;
        let mut tol2 = 2.0 * tol1;
        let mut converged = true;

        while (xf - xm).abs() > tol2 - 0.5 * (b - a) {
            let mut golden = true;

            if e.abs() > tol1 {
                golden = false;
                let mut r = (xf - nfc) * (fx - ffulc);
                let mut q = (xf - fulc) * (fx - fnfc);
                let mut p = (xf - fulc) * q - (xf - nfc) * r;
                q = 2.0 * (q - r);
                if q > 0.0 {
                    p = -p;
                }
                q = q.abs();
                r = e;
                e = rat;

                if p.abs() < (0.5 * q * r).abs() && p > q * (a - xf) && p < q * (b - xf) {
                    rat = p / q;
                    let x = xf + rat;
                    if (x - a) < tol2 || (b - x) < tol2 {
                        rat = tol1 * sign_or_one(xm - xf);
                    }
                } else {
                    golden = true;
                }
            }

            if golden {
                e = if xf >= xm { a - xf } else { b - xf };
                rat = GOLDEN_MEAN * e;
            }

            let x = xf + sign_or_one(rat) * rat.abs().max(tol1);
            let fu = f(x);
            evaluations += 1;

            if fu <= fx {
                if x >= xf {
                    a = xf;
                } else {
                    b = xf;
                }
                fulc = nfc;
                ffulc = fnfc;
                nfc = xf;
                fnfc = fx;
                xf = x;
                fx = fu;
            } else {
                if x < xf {
                    a = x;
                } else {
                    b = x;
                }
                if fu <= fnfc || nfc == xf {
                    fulc = nfc;
                    ffulc = fnfc;
                    nfc = x;
                    fnfc = fu;
                } else if fu <= ffulc || fulc == xf || fulc == nfc {
                    fulc = x;
                    ffulc = fu;
                }
            }

            xm = 0.5 * (a + b);
            tol1 = sqrt_eps * xf.abs() + self.xatol / 3.0;
            tol2 = 2.0 * tol1;

            if evaluations >= self.max_evaluations {
                converged = false;
                break;
            }
        }

        BoundedMinimum {
            x: xf,
            fun: fx,
            evaluations,
            converged,
        }
    }
}

/// Sign of `v`, treating zero as positive.
fn sign_or_one(v: f64) -> f64 {
    if v < 0.0 { -1.0 } else { 1.0 }
}
