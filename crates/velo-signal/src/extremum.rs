use velo_core::{Result, VeloError};

/// `better(candidate, incumbent)`: whether `candidate` should replace `incumbent`
/// as the window's extremum.
pub type Comparator = fn(f64, f64) -> bool;

#[inline]
pub fn greater(candidate: f64, incumbent: f64) -> bool {
    candidate > incumbent
}

#[inline]
pub fn less(candidate: f64, incumbent: f64) -> bool {
    candidate < incumbent
}

/// Trailing-window extremum tracker over a borrowed price array.
///
/// Keeps the indices that could still become the window's extremum in a
/// circular buffer of `window + 1` slots. Stored candidates run oldest to
/// newest from `begin`, and no candidate is `better` than the one stored
/// before it, so `indices[begin]` is always the current extremum and each
/// insert needs only a binary search plus a truncation.
///
/// With a strict comparator a later tie never displaces an earlier value.
pub struct ExtremumTracker<'a, F = Comparator> {
    prices: &'a [f64],
    window: usize,
    better: F,
    indices: Box<[usize]>,
    begin: usize,
    size: usize,
    next: usize,
}

impl<'a> ExtremumTracker<'a> {
    /// Tracks the window maximum.
    pub fn highs(prices: &'a [f64], window: usize) -> Result<Self> {
        Self::new(prices, window, greater as Comparator)
    }

    /// Tracks the window minimum.
    pub fn lows(prices: &'a [f64], window: usize) -> Result<Self> {
        Self::new(prices, window, less as Comparator)
    }
}

impl<'a, F> ExtremumTracker<'a, F>
where
    F: Fn(f64, f64) -> bool,
{
    pub fn new(prices: &'a [f64], window: usize, better: F) -> Result<Self> {
        if window == 0 {
            return Err(VeloError::InvalidWindow(window));
        }
        // One slot more than the window so that a candidate exactly `window`
        // steps old is still reported, capping the result at `window`.
        let capacity = window + 1;
        Ok(Self {
            prices,
            window,
            better,
            indices: vec![0; capacity].into_boxed_slice(),
            begin: 0,
            size: 0,
            next: 0,
        })
    }

    /// Feed the next observation and return how many steps ago the current
    /// window's extremum occurred (0 when `index` itself is the extremum).
    ///
    /// Indices must arrive as 0, 1, 2, ... with no gaps or repeats.
    pub fn insert(&mut self, index: usize) -> Result<usize> {
        if index != self.next {
            return Err(VeloError::InvalidSequence {
                expected: self.next,
                got: index,
            });
        }
        let price = *self
            .prices
            .get(index)
            .ok_or(VeloError::InsufficientHistory {
                required: index + 1,
                actual: self.prices.len(),
            })?;

        // Indices advance by one per call, so at most one candidate expires.
        if self.size > 0 && index - self.indices[self.begin] >= self.capacity() {
            self.begin = (self.begin + 1) % self.capacity();
            self.size -= 1;
        }

        // Everything from `at` onward is dominated by `index` and can never
        // be the extremum again before it expires.
        let at = self.partition_point(price);
        let slot = self.slot(at);
        self.indices[slot] = index;
        self.size = at + 1;
        self.next += 1;

        Ok(index - self.indices[self.begin])
    }

    /// Leftmost logical offset whose candidate `price` beats.
    fn partition_point(&self, price: f64) -> usize {
        let (mut lo, mut hi) = (0, self.size);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let incumbent = self.prices[self.indices[self.slot(mid)]];
            if (self.better)(price, incumbent) {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    fn slot(&self, offset: usize) -> usize {
        (self.begin + offset) % self.capacity()
    }

    /// Index of the current window extremum, if anything has been inserted.
    pub fn extremum(&self) -> Option<usize> {
        (self.size > 0).then(|| self.indices[self.begin])
    }

    /// Stored candidates, oldest first.
    pub fn candidates(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.size).map(move |offset| self.indices[self.slot(offset)])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn window(&self) -> usize {
        self.window
    }
}
