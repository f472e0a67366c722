use crate::{PoolConfig, Registry};

/// Builder for creating an instance of [`Registry`].
///
/// You only need to use this builder if you want to customize the registry.
/// The default configuration used by [`Registry::new()`] is sufficient for most use cases.
///
/// # Examples
///
/// ```
/// use pool_registry::{PoolConfig, Registry};
///
/// let registry = Registry::builder()
///     .label("Projectiles")
///     .pool_config(PoolConfig::new().default_capacity(64))
///     .build();
///
/// assert_eq!(registry.label(), "Projectiles");
/// assert_eq!(registry.pool_config().capacity(), 64);
/// ```
#[derive(Debug)]
#[must_use]
pub struct RegistryBuilder {
    label: String,
    pool_config: PoolConfig,
}

impl RegistryBuilder {
    pub(crate) fn new() -> Self {
        Self {
            label: Registry::DEFAULT_LABEL.to_string(),
            pool_config: PoolConfig::default(),
        }
    }

    /// Sets the name that identifies the registry in diagnostics.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the sizing configuration of every pool the registry creates.
    ///
    /// Pools registered explicitly keep their own configuration.
    pub fn pool_config(mut self, pool_config: PoolConfig) -> Self {
        self.pool_config = pool_config;
        self
    }

    /// Builds the registry with the specified configuration.
    #[must_use]
    pub fn build(self) -> Registry {
        Registry::new_inner(self.label, self.pool_config)
    }
}
