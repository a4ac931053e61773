//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()` if `lhs` is much smaller than `rhs.abs()` in
/// magnitude and `lhs < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap an angle in degrees into the range [-180, 180).
pub fn wrap_pm180_deg<T>(value: T) -> T
where
    T: Float
{
    let half_turn = T::from(180.0).unwrap();
    let full_turn = T::from(360.0).unwrap();

    let wrapped = rem_euclid(value + half_turn, full_turn) - half_turn;

    // Guard the round-off case of `rem_euclid` so the upper bound stays open
    if wrapped >= half_turn { wrapped - full_turn } else { wrapped }
}

/// Get the signed angular distance from `a` to `b` in degrees.
///
/// This is the shortest rotation which takes heading `a` onto heading `b`,
/// accounting for wrapping, and is always within [-180, 180). Positive values
/// are clockwise when headings are measured clockwise.
pub fn get_ang_dist_deg<T>(a: T, b: T) -> T
where
    T: Float
{
    wrap_pm180_deg(b - a)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rem_euclid() {
        assert_eq!(rem_euclid(370f64, 360f64), 10f64);
        assert_eq!(rem_euclid(-10f64, 360f64), 350f64);
        assert_eq!(rem_euclid(0f64, 360f64), 0f64);
    }

    #[test]
    fn test_get_ang_dist_deg() {
        assert_eq!(get_ang_dist_deg(0f64, 90f64), 90f64);
        assert_eq!(get_ang_dist_deg(90f64, 0f64), -90f64);
        assert_eq!(get_ang_dist_deg(0f64, 360f64), 0f64);
        assert_eq!(get_ang_dist_deg(350f64, 10f64), 20f64);
        assert_eq!(get_ang_dist_deg(10f64, 350f64), -20f64);
        assert_eq!(get_ang_dist_deg(0f64, 270f64), -90f64);
        assert_eq!(get_ang_dist_deg(0f64, 180f64), -180f64);
        assert_eq!(get_ang_dist_deg(-720f64, 45f64), 45f64);
    }

    #[test]
    fn test_wrap_pm180_deg_bounds() {
        let mut angle = -1000f64;
        while angle < 1000f64 {
            let w = wrap_pm180_deg(angle);
            assert!(w >= -180.0 && w < 180.0, "{} wrapped to {}", angle, w);
            angle += 7.3;
        }
    }
}
