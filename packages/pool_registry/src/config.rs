/// Sizing parameters for the storage behind a pool.
///
/// # Examples
///
/// ```
/// use pool_registry::PoolConfig;
///
/// let config = PoolConfig::new().default_capacity(32).max_size(256);
///
/// assert_eq!(config.capacity(), 32);
/// assert_eq!(config.limit(), 256);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[must_use]
pub struct PoolConfig {
    default_capacity: usize,
    max_size: usize,
}

impl PoolConfig {
    /// Number of idle slots reserved up front when storage is created.
    pub const DEFAULT_CAPACITY: usize = 10;

    /// Maximum number of idle instances kept by default.
    pub const DEFAULT_MAX_SIZE: usize = 10_000;

    /// Creates a configuration with default values.
    pub const fn new() -> Self {
        Self {
            default_capacity: Self::DEFAULT_CAPACITY,
            max_size: Self::DEFAULT_MAX_SIZE,
        }
    }

    /// Sets the number of idle slots reserved up front.
    pub const fn default_capacity(mut self, capacity: usize) -> Self {
        self.default_capacity = capacity;
        self
    }

    /// Sets the maximum number of idle instances the storage keeps. Instances released
    /// while the storage is full are destroyed instead of being kept.
    ///
    /// # Panics
    ///
    /// Panics if `max_size` is zero.
    pub const fn max_size(mut self, max_size: usize) -> Self {
        assert!(max_size > 0, "pool max_size must be greater than zero");
        self.max_size = max_size;
        self
    }

    /// The number of idle slots reserved up front.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.default_capacity
    }

    /// The maximum number of idle instances the storage keeps.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.max_size
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}
