/// Trait for loading service configuration from environment variables.
///
/// Implementors derive `serde::Deserialize` (with `#[serde(default = ...)]`
/// for optional settings) and call `Config::from_env()` at startup. Field
/// `foo_bar` is read from `FOO_BAR`.
pub trait Config: Sized + ::serde::de::DeserializeOwned {
    fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Load from an explicit set of `(KEY, value)` pairs instead of the process
    /// environment. Used by tests so they never mutate global env state.
    fn from_iter<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars)
    }
}
