use crate::config::FPE_D;
use rand::Rng;

/// Equality within the simulator's floating point epsilon
pub fn double_equals(a: f64, b: f64) -> bool {
    (a - b).abs() < FPE_D
}

/// Uniform random integer in `[low, high]`, both ends inclusive
pub fn random_in(low: i32, high: i32) -> i32 {
    if high <= low {
        return low;
    }
    rand::thread_rng().gen_range(low..=high)
}

/// Rounds to the nearest integer, halves toward positive infinity
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
