//! Elementwise array helpers for formula code.
//!
//! Arrays of different lengths broadcast: a short array repeats its last element, an
//! empty one reads as zero. Results have the length of the longest input.

#[inline(always)]
fn get_at<T: Copy + Default>(values: &[T], i: usize) -> T {
    values.get(i).or_else(|| values.last()).copied().unwrap_or_default()
}

fn longest<T>(arrays: &[&[T]]) -> usize {
    arrays.iter().map(|a| a.len()).max().unwrap_or(0)
}

fn fold_arrays(arrays: &[&[f64]], pick: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    (0..longest(arrays))
        .map(|i| {
            arrays
                .iter()
                .map(|a| get_at(a, i))
                .reduce(&pick)
                .unwrap_or(0.0)
        })
        .collect()
}

/// Elementwise maximum over an ordered sequence of arrays.
pub fn max_of(arrays: &[&[f64]]) -> Vec<f64> {
    fold_arrays(arrays, f64::max)
}

/// Elementwise minimum over an ordered sequence of arrays.
pub fn min_of(arrays: &[&[f64]]) -> Vec<f64> {
    fold_arrays(arrays, f64::min)
}

pub fn clamp_min(values: &[f64], floor: f64) -> Vec<f64> {
    values.iter().map(|v| v.max(floor)).collect()
}

/// Rounds halves away from zero (`2.5 -> 3`, `-2.5 -> -3`).
pub fn round_half_away(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| v.round()).collect()
}

/// `if_true[i]` where `mask[i]`, else `if_false[i]`.
pub fn select(mask: &[bool], if_true: &[f64], if_false: &[f64]) -> Vec<f64> {
    let len = mask.len().max(if_true.len()).max(if_false.len());
    (0..len)
        .map(|i| if get_at(mask, i) { get_at(if_true, i) } else { get_at(if_false, i) })
        .collect()
}

pub fn scale(values: &[f64], factor: f64) -> Vec<f64> {
    values.iter().map(|v| v * factor).collect()
}

pub fn zip_with<A: Copy + Default, B: Copy + Default, T>(a: &[A], b: &[B], f: impl Fn(A, B) -> T) -> Vec<T> {
    let len = a.len().max(b.len());
    (0..len).map(|i| f(get_at(a, i), get_at(b, i))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_max_min_over_sequence() {
        let a = [1.0, 5.0, -2.0];
        let b = [3.0, 4.0, -1.0];
        let floor = [0.0];
        assert_eq!(max_of(&[&a, &b, &floor]), vec![3.0, 5.0, 0.0]);
        assert_eq!(min_of(&[&a, &b]), vec![1.0, 4.0, -2.0]);
        assert!(max_of(&[]).is_empty());
    }

    #[rstest]
    #[case(2.5, 3.0)]
    #[case(-2.5, -3.0)]
    #[case(2.4, 2.0)]
    fn test_round_half_away(#[case] input: f64, #[case] expected: f64) {
        assert_eq!(round_half_away(&[input]), vec![expected]);
    }

    #[test]
    fn test_select_broadcasts_scalars() {
        assert_eq!(select(&[true, false, true], &[10.0], &[1.0, 2.0, 3.0]), vec![10.0, 2.0, 10.0]);
    }

    #[test]
    fn test_zip_with_and_clamp() {
        let net = zip_with(&[100.0, 50.0], &[30.0, 80.0], |gross, tax| gross - tax);
        assert_eq!(clamp_min(&net, 0.0), vec![70.0, 0.0]);
        assert_eq!(scale(&[2.0, 4.0], 0.5), vec![1.0, 2.0]);
    }
}
