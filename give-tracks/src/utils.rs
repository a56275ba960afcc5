///
/// Finite values of `values`, sorted ascending.
///
pub fn sorted_finite<I: IntoIterator<Item = f64>>(values: I) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

///
/// The value at `proportion` (0 to 1) of an ascending slice, picking the
/// nearest rank.
///
pub fn quantile(sorted: &[f64], proportion: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = ((sorted.len() - 1) as f64 * proportion.clamp(0.0, 1.0)).round() as usize;
    sorted.get(rank).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case(0.0, Some(1.0))]
    #[case(0.5, Some(3.0))]
    #[case(1.0, Some(5.0))]
    #[case(7.0, Some(5.0))]
    fn test_quantile(#[case] proportion: f64, #[case] expected: Option<f64>) {
        let sorted = sorted_finite(vec![5.0, f64::NAN, 1.0, 3.0, 2.0, 4.0]);
        assert_eq!(quantile(&sorted, proportion), expected);
    }

    #[rstest]
    fn test_quantile_of_nothing() {
        assert_eq!(quantile(&[], 0.5), None);
    }
}
