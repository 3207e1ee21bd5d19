use std::collections::HashMap;

use nalgebra::RealField;

/// A memoized binomial coefficient calculator.
/// Used to build the Bezier degree elevation coefficients.
pub struct Binomial<T> {
    memo: HashMap<(usize, usize), T>,
}

impl<T: RealField + Copy> Default for Binomial<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RealField + Copy> Binomial<T> {
    pub fn new() -> Self {
        Self {
            memo: HashMap::new(),
        }
    }

    /// Returns the binomial coefficient of `n` and `k` with memoization.
    pub fn get(&mut self, n: usize, k: usize) -> T {
        if k > n {
            return T::zero();
        }
        if k == 0 || k == n {
            return T::one();
        }

        let k = k.min(n - k);
        if let Some(&memoized) = self.memo.get(&(n, k)) {
            return memoized;
        }

        let r = self.get(n - 1, k) + self.get(n - 1, k - 1);
        self.memo.insert((n, k), r);
        r
    }
}

#[cfg(test)]
mod tests {
    use super::Binomial;

    #[test]
    fn pascal_triangle() {
        let mut binomial = Binomial::<f64>::new();
        assert_eq!(binomial.get(5, 0), 1.);
        assert_eq!(binomial.get(5, 1), 5.);
        assert_eq!(binomial.get(5, 2), 10.);
        assert_eq!(binomial.get(5, 3), 10.);
        assert_eq!(binomial.get(5, 5), 1.);
        assert_eq!(binomial.get(5, 6), 0.);
        assert_eq!(binomial.get(10, 4), 210.);
    }
}
