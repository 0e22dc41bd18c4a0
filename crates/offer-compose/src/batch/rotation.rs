//! Per-recipient variation: product rotation and price escalation

/// Index of the candidate shown to the recipient at `position`.
///
/// Returns `base` unchanged when there is nothing to rotate through
/// (`len <= 1`), otherwise `(base + step * position) mod len`.
pub fn rotation_index(len: usize, base: usize, step: usize, position: usize) -> usize {
    if len <= 1 {
        return base;
    }
    // Reduce each factor first so large positions cannot overflow
    let offset = (step % len) * (position % len) % len;
    (base % len + offset) % len
}

/// `base * (1 + position * rate)`, rounded to cents
pub fn escalated_price(base: f64, rate: f64, position: usize) -> f64 {
    round_cents(base * (1.0 + position as f64 * rate))
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_wraps() {
        let indices: Vec<usize> = (0..4).map(|i| rotation_index(3, 0, 1, i)).collect();
        assert_eq!(indices, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_rotation_with_base_and_step() {
        assert_eq!(rotation_index(4, 1, 2, 0), 1);
        assert_eq!(rotation_index(4, 1, 2, 1), 3);
        assert_eq!(rotation_index(4, 1, 2, 2), 1);
    }

    #[test]
    fn test_step_zero_keeps_base() {
        assert!((0..5).all(|i| rotation_index(3, 2, 0, i) == 2));
    }

    #[test]
    fn test_single_candidate_returns_base() {
        assert_eq!(rotation_index(1, 0, 1, 7), 0);
        assert_eq!(rotation_index(0, 0, 1, 7), 0);
    }

    #[test]
    fn test_escalation() {
        assert_eq!(escalated_price(10000.0, 0.05, 0), 10000.0);
        assert_eq!(escalated_price(10000.0, 0.05, 2), 11000.0);
        assert_eq!(escalated_price(999.99, 0.015, 3), 1044.99);
    }
}
