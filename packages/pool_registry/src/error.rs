use thiserror::Error;

/// Errors that can occur when manufacturing, acquiring or looking up pooled objects.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No creation strategy matches the requested type or prototype.
    ///
    /// This indicates a type that does not expose any of the capabilities the pool
    /// can work with. It is not retried - the type must be fixed to expose a constructor,
    /// the self-lifecycle capability or the host object capability.
    #[error("could not create object of type {type_name}: {reason}")]
    UnsupportedCreationKind {
        /// Name of the type that could not be created.
        type_name: &'static str,

        /// A human-readable description of why no strategy matched.
        reason: &'static str,
    },

    /// A keyed lookup referenced a key that has no sub-pool.
    #[error("no pool found for key: {key}")]
    KeyNotFound {
        /// Debug representation of the key that was not found.
        key: String,
    },

    /// A pool was registered for a type (or type and key type) that already had one.
    ///
    /// The registry recovers from this automatically by clearing the superseded pool,
    /// so this is only ever surfaced as a diagnostic warning, never returned to callers.
    #[error(
        "pool for {} is already registered, clearing and replacing the existing pool",
        describe_pool(.type_name, .key_type_name.as_ref())
    )]
    DuplicateRegistration {
        /// Name of the pooled type.
        type_name: &'static str,

        /// Name of the key type, if the superseded entry was a keyed pool.
        key_type_name: Option<&'static str>,
    },

    /// The pool has no storage attached, either because it was never realized
    /// or because it has been cleared.
    #[error("pool of type {type_name} is not realized")]
    NotRealized {
        /// Name of the pooled type.
        type_name: &'static str,
    },
}

fn describe_pool(type_name: &str, key_type_name: Option<&&'static str>) -> String {
    match key_type_name {
        Some(key_type_name) => format!("{type_name} with key of type {key_type_name}"),
        None => type_name.to_string(),
    }
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
