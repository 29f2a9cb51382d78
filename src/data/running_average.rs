//! Fixed-capacity moving mean with O(1) insertion.

/// Mean of the last `capacity` values added.
///
/// The sum is maintained incrementally: adding to a full buffer overwrites the
/// oldest slot and adjusts the sum by `new - evicted`.
///
/// An empty average is `NaN`, not zero, since zero is a legitimate mean.
#[derive(Debug, Clone)]
pub struct RunningAverage {
    values: Vec<f64>,
    capacity: usize,
    next: usize,
    sum: f64,
}

impl RunningAverage {
    /// Creates an empty average over `capacity` values. A capacity of zero is
    /// treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: Vec::with_capacity(capacity),
            capacity,
            next: 0,
            sum: 0.0,
        }
    }

    /// Adds `value`, evicting the oldest value once full.
    pub fn add(&mut self, value: f64) {
        if self.values.len() < self.capacity {
            self.values.push(value);
        } else {
            let evicted = std::mem::replace(&mut self.values[self.next], value);
            self.sum -= evicted;
        }
        self.sum += value;
        self.next = (self.next + 1) % self.capacity;
    }

    /// Current mean, or `NaN` when nothing has been added.
    pub fn average(&self) -> f64 {
        if self.values.is_empty() {
            return f64::NAN;
        }
        self.sum / self.values.len() as f64
    }

    /// Number of values currently averaged (saturates at the capacity).
    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// Maximum number of values averaged.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether `capacity` values have been added.
    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    /// Back to the freshly constructed state.
    pub fn reset(&mut self) {
        self.values.clear();
        self.next = 0;
        self.sum = 0.0;
    }
}
