/// Round `value` to the nearest multiple of `block`, never below `block`.
///
/// Ties on `value / block` round to even, so `align(96.0, 64) == 128` and
/// `align(160.0, 64) == 128`. Negative, zero and NaN inputs give `block`.
/// A zero `block` yields zero.
pub fn align(value: f64, block: u32) -> u32 {
    if block == 0 {
        return 0;
    }
    let max_steps = (u32::MAX / block) as f64;
    let steps = (value / block as f64).round_ties_even().max(1.0).min(max_steps);
    steps as u32 * block
}
