use crate::errors::{TreeError, TreeResult};
use crate::traits::SummaryCtor;

const RELATIVE_TOLERANCE: f64 = 1e-9;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= RELATIVE_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

///
/// Summary statistics of a numeric signal over a span. Coverage is counted in
/// bases, so a value spanning 10 bases contributes 10 to `valid_count`.
///
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalSummary {
    pub valid_count: u64,
    pub sum_data: f64,
    pub sum_squares: f64,
    pub min_val: f64,
    pub max_val: f64,
}

impl Default for SignalSummary {
    fn default() -> Self {
        SignalSummary {
            valid_count: 0,
            sum_data: 0.0,
            sum_squares: 0.0,
            min_val: f64::INFINITY,
            max_val: f64::NEG_INFINITY,
        }
    }
}

impl SignalSummary {
    ///
    /// Build a summary from already reduced fields, as received from a data
    /// source. A non-empty summary must have `min_val <= max_val`.
    ///
    pub fn from_fields(
        valid_count: u64,
        sum_data: f64,
        sum_squares: f64,
        min_val: f64,
        max_val: f64,
    ) -> TreeResult<Self> {
        if valid_count == 0 {
            return Ok(SignalSummary::default());
        }
        if !(min_val <= max_val) {
            return Err(TreeError::InconsistentSummary(format!(
                "minVal {} > maxVal {}",
                min_val, max_val
            )));
        }
        Ok(SignalSummary {
            valid_count,
            sum_data,
            sum_squares,
            min_val,
            max_val,
        })
    }

    /// Population standard deviation.
    pub fn std_dev(&self) -> f64 {
        if self.valid_count == 0 {
            return 0.0;
        }
        let n = self.valid_count as f64;
        let mean = self.sum_data / n;
        (self.sum_squares / n - mean * mean).max(0.0).sqrt()
    }
}

impl SummaryCtor<f64> for SignalSummary {
    fn add_data(&mut self, weight: u32, data: &f64) {
        if weight == 0 {
            return;
        }
        let w = weight as f64;
        self.valid_count += weight as u64;
        self.sum_data += data * w;
        self.sum_squares += data * data * w;
        self.min_val = self.min_val.min(*data);
        self.max_val = self.max_val.max(*data);
    }

    fn add_summary(&mut self, other: &Self) {
        if other.valid_count == 0 {
            return;
        }
        self.valid_count += other.valid_count;
        self.sum_data += other.sum_data;
        self.sum_squares += other.sum_squares;
        self.min_val = self.min_val.min(other.min_val);
        self.max_val = self.max_val.max(other.max_val);
    }

    fn value(&self) -> f64 {
        if self.valid_count > 0 {
            self.sum_data / self.valid_count as f64
        } else {
            0.0
        }
    }

    fn is_empty(&self) -> bool {
        self.valid_count == 0
    }

    fn is_consistent(&self) -> bool {
        self.valid_count == 0 || self.min_val <= self.max_val
    }

    fn approx_eq(&self, other: &Self) -> bool {
        if self.valid_count != other.valid_count {
            return false;
        }
        if self.valid_count == 0 {
            return true;
        }
        close(self.sum_data, other.sum_data)
            && close(self.sum_squares, other.sum_squares)
            && close(self.min_val, other.min_val)
            && close(self.max_val, other.max_val)
    }
}

///
/// Accumulator for trees whose entries carry no statistics.
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoSummary;

impl<T> SummaryCtor<T> for NoSummary {
    fn add_data(&mut self, _weight: u32, _data: &T) {}

    fn add_summary(&mut self, _other: &Self) {}

    fn value(&self) -> f64 {
        0.0
    }

    fn is_empty(&self) -> bool {
        true
    }

    fn approx_eq(&self, _other: &Self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn summary_of(values: &[(u32, f64)]) -> SignalSummary {
        let mut summary = SignalSummary::default();
        for (weight, value) in values {
            summary.add_data(*weight, value);
        }
        summary
    }

    #[rstest]
    fn test_two_entry_summary() {
        let summary = summary_of(&[(10, 2.0), (10, 4.0)]);
        assert_eq!(summary.valid_count, 20);
        assert_eq!(summary.sum_data, 60.0);
        assert_eq!(summary.sum_squares, 200.0);
        assert_eq!(summary.min_val, 2.0);
        assert_eq!(summary.max_val, 4.0);
        assert_eq!(summary.value(), 3.0);
    }

    #[rstest]
    fn test_empty_value_is_zero() {
        let summary = SignalSummary::default();
        assert!(summary.is_empty());
        assert_eq!(summary.value(), 0.0);
        assert_eq!(summary.std_dev(), 0.0);
    }

    #[rstest]
    fn test_zero_weight_is_ignored() {
        let summary = summary_of(&[(0, 100.0), (5, 1.0)]);
        assert_eq!(summary.valid_count, 5);
        assert_eq!(summary.max_val, 1.0);
    }

    #[rstest]
    fn test_add_summary_is_associative() {
        let a = summary_of(&[(3, 1.5), (2, -4.0)]);
        let b = summary_of(&[(7, 10.0)]);
        let c = summary_of(&[(1, 0.25), (4, 3.0)]);

        let mut left = a;
        left.add_summary(&b);
        left.add_summary(&c);

        let mut bc = b;
        bc.add_summary(&c);
        let mut right = a;
        right.add_summary(&bc);

        assert!(left.approx_eq(&right));
        assert_eq!(left.min_val, -4.0);
        assert_eq!(left.max_val, 10.0);
    }

    #[rstest]
    fn test_add_summary_is_order_independent() {
        let a = summary_of(&[(3, 1.5)]);
        let b = summary_of(&[(7, 10.0)]);

        let mut ab = a;
        ab.add_summary(&b);
        let mut ba = b;
        ba.add_summary(&a);
        assert!(ab.approx_eq(&ba));
    }

    #[rstest]
    fn test_absorbing_empty_is_noop() {
        let a = summary_of(&[(3, 1.5)]);
        let mut b = a;
        b.add_summary(&SignalSummary::default());
        assert_eq!(a, b);
        assert!(b.is_consistent());
    }

    #[rstest]
    #[case(0, 0.0, 0.0, 5.0, 1.0, true)]
    #[case(10, 30.0, 90.0, 3.0, 3.0, true)]
    #[case(10, 30.0, 90.0, 4.0, 3.0, false)]
    fn test_from_fields(
        #[case] count: u64,
        #[case] sum: f64,
        #[case] squares: f64,
        #[case] min: f64,
        #[case] max: f64,
        #[case] ok: bool,
    ) {
        assert_eq!(
            SignalSummary::from_fields(count, sum, squares, min, max).is_ok(),
            ok
        );
    }

    #[rstest]
    fn test_std_dev() {
        let summary = summary_of(&[(1, 2.0), (1, 4.0)]);
        assert!((summary.std_dev() - 1.0).abs() < 1e-12);
    }
}
