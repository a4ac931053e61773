//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Number of milliseconds in a second
pub const MILLIS_PER_SECOND: f64 = 1000.0;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Convert a non-negative, finite number of milliseconds into a std duration.
///
/// Returns `None` for negative or non-finite values, which have no meaning as
/// a timeout.
pub fn millis_to_duration(millis: f64) -> Option<std::time::Duration> {
    if millis.is_finite() && millis >= 0.0 {
        std::time::Duration::try_from_secs_f64(millis / MILLIS_PER_SECOND).ok()
    }
    else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_millis_to_duration() {
        assert_eq!(
            millis_to_duration(500.0),
            Some(std::time::Duration::from_millis(500))
        );
        assert_eq!(millis_to_duration(0.0), Some(std::time::Duration::ZERO));
        assert_eq!(millis_to_duration(-1.0), None);
        assert_eq!(millis_to_duration(f64::NAN), None);
    }

    #[test]
    fn test_duration_to_seconds() {
        assert_eq!(
            duration_to_seconds(chrono::Duration::milliseconds(1500)),
            Some(1.5)
        );
    }
}
