use crate::{fXX, math::T};
use num_traits::AsPrimitive;

/// Natural logarithm of the absolute value of the gamma function.
///
/// Evaluated in double precision.
pub fn ln_gamma<T>(x: T) -> T
where
    T: fXX,
{
    T!(libm::lgamma(AsPrimitive::<f64>::as_(x)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{relative_eq, ulps_eq};

    #[test]
    fn test_ln_gamma() {
        assert!(ulps_eq!(ln_gamma(1.0f64), 0.0, epsilon = 1e-12));
        assert!(ulps_eq!(ln_gamma(2.0f64), 0.0, epsilon = 1e-12));
        assert!(relative_eq!(
            ln_gamma(0.5f64),
            std::f64::consts::PI.sqrt().ln(),
            max_relative = 1e-12
        ));
        assert!(relative_eq!(
            ln_gamma(10.0f64),
            362880.0f64.ln(),
            max_relative = 1e-12
        ));
        assert!(relative_eq!(
            ln_gamma(0.001f64),
            6.907_178_885_383_853,
            max_relative = 1e-9
        ));
        assert!(relative_eq!(
            ln_gamma(3.5f32),
            1.200_973_6,
            max_relative = 1e-5
        ));
    }
}
