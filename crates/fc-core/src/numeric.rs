use crate::FcError;

pub fn ensure_finite(v: f64, what: &'static str) -> Result<f64, FcError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(FcError::NonFinite { what, value: v })
    }
}

/// Reject values outside `[min, max]` (inclusive) or non-finite.
pub fn ensure_in_range(v: f64, min: f64, max: f64, what: &'static str) -> Result<f64, FcError> {
    let v = ensure_finite(v, what)?;
    if v < min || v > max {
        return Err(FcError::OutOfRange {
            what,
            value: v,
            min,
            max,
        });
    }
    Ok(v)
}

/// Clamp that tolerates NaN input by falling back to `fallback`.
///
/// Output paths must never forward a NaN to hardware.
pub fn clamp_or(v: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if v.is_nan() { fallback } else { v.clamp(min, max) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(f64::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn ensure_in_range_bounds_are_inclusive() {
        assert_eq!(ensure_in_range(0.0, 0.0, 100.0, "pct").unwrap(), 0.0);
        assert_eq!(ensure_in_range(100.0, 0.0, 100.0, "pct").unwrap(), 100.0);
        assert!(matches!(
            ensure_in_range(100.5, 0.0, 100.0, "pct"),
            Err(FcError::OutOfRange { .. })
        ));
    }

    #[test]
    fn clamp_or_replaces_nan() {
        assert_eq!(clamp_or(f64::NAN, 20.0, 100.0, 100.0), 100.0);
        assert_eq!(clamp_or(150.0, 20.0, 100.0, 100.0), 100.0);
        assert_eq!(clamp_or(5.0, 20.0, 100.0, 100.0), 20.0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn clamp_or_stays_in_bounds(v in prop::num::f64::ANY, lo in 0.0_f64..50.0, span in 0.0_f64..50.0) {
            let hi = lo + span;
            let out = clamp_or(v, lo, hi, hi);
            prop_assert!(out >= lo && out <= hi);
        }
    }
}
