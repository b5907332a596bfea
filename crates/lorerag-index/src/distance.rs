use lorerag_core::config::DistanceMetric;

/// Distance under `metric`; smaller is closer for every metric.
pub fn distance(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        DistanceMetric::L2 => squared_euclidean(a, b),
        DistanceMetric::Cosine => cosine_distance(a, b),
    }
}

pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// `1 - cos(a, b)`. A zero vector is treated as orthogonal to everything.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (lhs, rhs) in a.iter().zip(b) {
        dot += lhs * rhs;
        norm_a += lhs * lhs;
        norm_b += rhs * rhs;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_are_at_zero() {
        let v = [0.6, 0.8];
        assert_eq!(squared_euclidean(&v, &v), 0.0);
        assert!(cosine_distance(&v, &v).abs() < 1e-6);
    }

    #[test]
    fn l2_is_squared() {
        assert_eq!(squared_euclidean(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
    }

    #[test]
    fn cosine_orders_by_angle() {
        let q = [1.0, 0.0];
        let near = cosine_distance(&q, &[1.0, 0.1]);
        let far = cosine_distance(&q, &[0.0, 1.0]);
        assert!(near < far);
        assert!((cosine_distance(&q, &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
        assert_eq!(cosine_distance(&q, &[0.0, 0.0]), 1.0);
    }
}
