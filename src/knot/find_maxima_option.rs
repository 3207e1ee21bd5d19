use crate::misc::FloatingPoint;

/// Options for locating the maximum of each basis function by bisection
#[derive(Clone, Debug, Copy)]
pub struct FindMaximaOptions<T> {
    /// Upper bound on bisection steps per basis function and element
    pub max_iterations: usize,
    /// The bisection stops once the bracket in local coordinates is narrower than this
    pub tolerance: T,
}

impl<T: FloatingPoint> Default for FindMaximaOptions<T> {
    fn default() -> Self {
        Self {
            max_iterations: 128,
            tolerance: T::default_epsilon() * T::from_usize(16).unwrap(),
        }
    }
}

impl<T> FindMaximaOptions<T> {
    /// Set the bisection step cap
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the bracket width at which the bisection stops
    pub fn with_tolerance(mut self, tolerance: T) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Location of the maximum of every basis function of a knot vector
#[derive(Clone, Debug)]
pub struct KnotMaxima<T> {
    /// Knot span (element index) where the maximum was found
    pub spans: Vec<usize>,
    /// Local coordinate in `[0, 1]` inside that span
    pub xi: Vec<T>,
    /// Parameter value of the maximum
    pub u: Vec<T>,
}
