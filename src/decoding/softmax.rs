// ============================================================
// Layer 5 — Softmax Normalizer
// ============================================================
// Turns raw logits into a probability distribution.
//
//   p_i = exp(x_i - max) / Σ_j exp(x_j - max)
//
// Subtracting the maximum first keeps every exponent ≤ 0, so
// large logits cannot overflow. The sum is accumulated in f64:
// the decoder compares remaining mass against 1e-6, which is
// below what an f32 sum over a long document can resolve.

use crate::error::{ReaderError, Result};

/// Normalise `logits` into probabilities of the same length and order.
///
/// Fails on an empty input, where the denominator is undefined.
pub fn softmax(logits: &[f32]) -> Result<Vec<f64>> {
    if logits.is_empty() {
        return Err(ReaderError::empty_input("cannot softmax an empty logit vector"));
    }

    let max = logits
        .iter()
        .map(|&x| f64::from(x))
        .fold(f64::NEG_INFINITY, f64::max);

    let mut probs: Vec<f64> = logits.iter().map(|&x| (f64::from(x) - max).exp()).collect();
    let inv_sum = probs.iter().sum::<f64>().recip();
    probs.iter_mut().for_each(|p| *p *= inv_sum);

    Ok(probs)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn assert_distribution(p: &[f64]) {
        assert!(p.iter().all(|&x| x >= 0.0));
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sums_to_one() {
        let p = softmax(&[1.0, 2.0, 3.0, -4.0]).unwrap();
        assert_eq!(p.len(), 4);
        assert_distribution(&p);
    }

    #[test]
    fn test_preserves_order() {
        let p = softmax(&[0.5, 3.0, 1.0]).unwrap();
        assert!(p[1] > p[2] && p[2] > p[0]);
    }

    #[test]
    fn test_large_logits_do_not_overflow() {
        let p = softmax(&[1000.0, 1001.0, 999.0]).unwrap();
        assert_distribution(&p);
        assert!(p.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_uniform_input() {
        let p = softmax(&[7.0; 500]).unwrap();
        assert_distribution(&p);
        assert!((p[0] - 1.0 / 500.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_logit_is_certain() {
        assert_eq!(softmax(&[-3.5]).unwrap(), vec![1.0]);
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(matches!(softmax(&[]), Err(ReaderError::EmptyInput(_))));
    }
}
