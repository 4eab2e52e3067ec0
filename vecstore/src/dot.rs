/// Compute the inner product of two vectors.
///
/// For unit-norm inputs this equals cosine similarity and lies in `[-1, 1]`.
/// Uses f64 intermediate precision. Returns 0.0 on dimension mismatch.
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter()
        .zip(b)
        .map(|(&x, &y)| x as f64 * y as f64)
        .sum::<f64>() as f32
}
