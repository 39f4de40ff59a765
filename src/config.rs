//! Configuration options for the block cache eviction policy.

/// Tunable policy options for a block cache instance.
///
/// The hard memory budget (`max_size`) and the nominal block size are
/// supplied at `start`; everything here shapes how eviction spends that
/// budget across the three retention classes.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Fraction of the budget targeted at blocks accessed exactly once.
    /// Default: 0.25
    pub single_fraction: f64,

    /// Fraction of the budget targeted at blocks accessed more than once.
    /// Default: 0.50
    pub multi_fraction: f64,

    /// Fraction of the budget targeted at blocks flagged in-memory.
    /// Default: 0.25
    pub in_memory_fraction: f64,

    /// Usage threshold (as a fraction of `max_size`) above which an
    /// eviction pass is triggered.
    /// Default: 0.85
    pub acceptable_factor: f64,

    /// Low-water mark (as a fraction of `max_size`) that an eviction pass
    /// drives usage down to, avoiding evict-one-admit-one thrashing.
    /// Default: 0.75
    pub min_factor: f64,

    /// Run eviction on a dedicated background thread. When disabled,
    /// eviction runs inline on the admitting thread.
    /// Default: true
    pub eviction_thread: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            single_fraction: 0.25,
            multi_fraction: 0.50,
            in_memory_fraction: 0.25,
            acceptable_factor: 0.85,
            min_factor: 0.75,
            eviction_thread: true,
        }
    }
}

impl CacheOptions {
    /// Creates a new CacheOptions with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the budget fraction targeted at single-access blocks.
    pub fn single_fraction(mut self, value: f64) -> Self {
        self.single_fraction = value;
        self
    }

    /// Sets the budget fraction targeted at multi-access blocks.
    pub fn multi_fraction(mut self, value: f64) -> Self {
        self.multi_fraction = value;
        self
    }

    /// Sets the budget fraction targeted at in-memory blocks.
    pub fn in_memory_fraction(mut self, value: f64) -> Self {
        self.in_memory_fraction = value;
        self
    }

    /// Sets the eviction trigger threshold.
    pub fn acceptable_factor(mut self, value: f64) -> Self {
        self.acceptable_factor = value;
        self
    }

    /// Sets the low-water mark eviction drives down to.
    pub fn min_factor(mut self, value: f64) -> Self {
        self.min_factor = value;
        self
    }

    /// Enables or disables the background eviction thread.
    pub fn eviction_thread(mut self, value: bool) -> Self {
        self.eviction_thread = value;
        self
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> crate::Result<()> {
        for (name, value) in [
            ("single_fraction", self.single_fraction),
            ("multi_fraction", self.multi_fraction),
            ("in_memory_fraction", self.in_memory_fraction),
        ] {
            if value <= 0.0 || value >= 1.0 {
                return Err(crate::Error::configuration(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }

        let sum = self.single_fraction + self.multi_fraction + self.in_memory_fraction;
        if (sum - 1.0).abs() > 1e-9 {
            return Err(crate::Error::configuration(format!(
                "segment fractions must sum to 1.0, got {}",
                sum
            )));
        }

        if self.min_factor <= 0.0 || self.min_factor >= 1.0 {
            return Err(crate::Error::configuration("min_factor must be between 0 and 1"));
        }
        if self.acceptable_factor <= 0.0 || self.acceptable_factor >= 1.0 {
            return Err(crate::Error::configuration(
                "acceptable_factor must be between 0 and 1",
            ));
        }
        if self.min_factor >= self.acceptable_factor {
            return Err(crate::Error::configuration(
                "min_factor must be below acceptable_factor",
            ));
        }

        Ok(())
    }
}
