use ndarray::{Array1, ArrayView1};

/// Log-softmax over a logits row.
pub fn log_softmax_1d(logits: &ArrayView1<f32>) -> Array1<f32> {
    let max_val = logits.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
    if !max_val.is_finite() {
        return Array1::from_elem(logits.len(), f32::NEG_INFINITY);
    }
    let scaled_logits = logits - max_val;
    let exp_sum = scaled_logits.mapv(f32::exp).sum();
    scaled_logits - exp_sum.ln()
}

/// The `k` highest log-probabilities with their token ids, best first.
///
/// Ties keep the lower token id first so decoding is reproducible.
pub fn get_top_k_from_log_probs(log_probs: &Array1<f32>, k: usize) -> Vec<(u32, f32)> {
    let mut indexed_log_probs: Vec<(usize, f32)> = log_probs
        .iter()
        .enumerate()
        .map(|(i, &lp)| (i, lp))
        .collect();
    indexed_log_probs.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    indexed_log_probs.truncate(k);
    indexed_log_probs
        .into_iter()
        .map(|(i, lp)| (i as u32, lp))
        .collect()
}
