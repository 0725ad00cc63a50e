use rand::rngs::StdRng;
use rand::SeedableRng;

/// Index of the first maximum value.
pub fn argmax<T: PartialOrd>(values: &[T]) -> usize {
    let mut result: usize = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if v > &values[result] {
            result = i;
        }
    }
    result
}

pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

pub fn moving_average(window: usize, vector: &[f64]) -> Vec<f64> {
    if window == 0 {
        return vec![];
    }
    let mut aux: usize = 0;
    let mut result: Vec<f64> = vec![];
    while aux < vector.len() {
        let end: usize = (aux + window).min(vector.len());
        let slice: &[f64] = &vector[aux..end];
        let r: f64 = slice.iter().sum();
        result.push(r / slice.len() as f64);
        aux = end;
    }
    result
}

/// Seeded generators are derived per component so they never share a stream.
pub fn rng_from(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => {
            let offset = stream.wrapping_mul(0x9E37_79B9_7F4A_7C15);
            StdRng::seed_from_u64(seed.wrapping_add(offset))
        }
        None => StdRng::from_entropy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rstest::rstest;

    #[rstest]
    #[case(&[0.0, 1.0, 0.5], 1)]
    #[case(&[2.0, 2.0, 1.0], 0)]
    #[case(&[-3.0, -1.0, -2.0], 1)]
    fn argmax_picks_first_maximum(#[case] values: &[f64], #[case] expected: usize) {
        assert_eq!(argmax(values), expected);
    }

    #[test]
    fn moving_average_keeps_partial_tail() {
        let avg = moving_average(2, &[1.0, 3.0, 5.0]);
        assert_eq!(avg, vec![2.0, 5.0]);
        assert!(moving_average(0, &[1.0]).is_empty());
    }

    #[test]
    fn seeded_streams_are_reproducible_and_distinct() {
        let a: u64 = rng_from(Some(7), 1).gen();
        let b: u64 = rng_from(Some(7), 1).gen();
        let c: u64 = rng_from(Some(7), 2).gen();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
