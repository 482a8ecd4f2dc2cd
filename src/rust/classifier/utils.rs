/// Numerically stable softmax. The result sums to 1.0 for any finite input.
pub fn softmax(scores: &[f32]) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }
    let max = scores.iter().fold(f64::NEG_INFINITY, |acc, &x| acc.max(x as f64));
    let exps: Vec<f64> = scores.iter().map(|&x| (x as f64 - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest score; the first one wins on ties.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &x)| match best {
            Some((_, b)) if b >= x => best,
            _ => Some((i, x)),
        })
        .map(|(i, _)| i)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_two_classes() {
        let probs = softmax(&[2.0, -1.0]);
        assert!((probs[0] - 0.952_574).abs() < 1e-6);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_softmax_large_scores() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert_eq!(probs, vec![0.5, 0.5]);
        assert!(softmax(&[]).is_empty());
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[2.0, -1.0]), Some(0));
        assert_eq!(argmax(&[-3.0, 0.5, 0.1]), Some(1));
        assert_eq!(argmax(&[1.0, 1.0]), Some(0));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(95.257_412, 2), 95.26);
        assert_eq!(round_to(4.742_58, 2), 4.74);
        assert_eq!(round_to(100.0, 2), 100.0);
    }
}
