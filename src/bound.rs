//! Delay bound for continuous mixing.
//!
//! A packet crossing `n` mix layers, each holding it for an exponentially
//! distributed time with rate `mu`, accumulates an Erlang(n, mu) delay.
//! The one-sided Chernov (Cantelli) bound gives a delay that is exceeded
//! with probability at most `1 - confidence`; it is the half-width of the
//! windows in which packets are attributed to the same round.
use crate::error::{Result, SdaError};

/// Upper bound on the sum of `n` i.i.d. exponential delays of rate `mu`
/// that holds with probability at least `confidence`.
///
/// # Examples
///
/// ```
/// use mixsda::bound::chernov_bound;
///
/// // k = sqrt(1/(1-0.75) - 1) = sqrt(3), so the bound is (3 + 3) / 10.
/// let bound = chernov_bound(10., 3, 0.75).unwrap();
/// assert!((bound - 0.6).abs() < 1e-12);
/// ```
pub fn chernov_bound(mu: f64, n: usize, confidence: f64) -> Result<f64> {
    if !(mu > 0.) || !mu.is_finite() {
        return Err(SdaError::Domain(format!("delay rate must be positive, got {}", mu)));
    }
    if n == 0 {
        return Err(SdaError::Domain("at least one mix layer is needed".into()));
    }
    if !(confidence > 0. && confidence < 1.) {
        return Err(SdaError::Domain(format!("confidence must lie in (0, 1), got {}",
                                            confidence)));
    }

    let k = (1. / (1. - confidence) - 1.).sqrt();
    let n = n as f64;

    Ok((k * n.sqrt() + n) / mu)
}


#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    #[test]
    fn bound_known_values() {
        // confidence = 0.5 gives k = 1.
        let bound = chernov_bound(10., 3, 0.5).unwrap();
        assert!(approx_eq!(f64, bound, (3f64.sqrt() + 3.) / 10., ulps = 4));

        let bound = chernov_bound(1., 1, 0.5).unwrap();
        assert!(approx_eq!(f64, bound, 2., ulps = 2));

        // confidence = 0.9 gives k = 3.
        let bound = chernov_bound(2., 4, 0.9).unwrap();
        assert!(approx_eq!(f64, bound, (3. * 2. + 4.) / 2., epsilon = 1e-12));
    }

    #[test]
    fn bound_rejects_invalid_arguments() {
        assert!(matches!(chernov_bound(10., 3, 1.), Err(SdaError::Domain(_))));
        assert!(matches!(chernov_bound(10., 3, 1.5), Err(SdaError::Domain(_))));
        assert!(matches!(chernov_bound(10., 3, 0.), Err(SdaError::Domain(_))));
        assert!(matches!(chernov_bound(0., 3, 0.5), Err(SdaError::Domain(_))));
        assert!(matches!(chernov_bound(-1., 3, 0.5), Err(SdaError::Domain(_))));
        assert!(matches!(chernov_bound(f64::NAN, 3, 0.5), Err(SdaError::Domain(_))));
        assert!(matches!(chernov_bound(10., 0, 0.5), Err(SdaError::Domain(_))));
    }

    proptest! {
        #[test]
        fn bound_increases_with_confidence(mu in 0.1f64..100.,
                                           n in 1usize..20,
                                           c in 0.01f64..0.98,
                                           d in 0.001f64..0.01) {
            let lower = chernov_bound(mu, n, c).unwrap();
            let upper = chernov_bound(mu, n, c + d).unwrap();
            prop_assert!(lower < upper);
        }
    }
}
