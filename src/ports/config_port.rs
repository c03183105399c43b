//! Configuration access port trait.

/// Read-only view of a sectioned key/value configuration.
///
/// Section and key lookups are case-insensitive. Values come back raw;
/// typing and range checks belong to `domain::config_validation`.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Keys present in `section`, lowercased and sorted. Empty when the
    /// section is absent.
    fn keys(&self, section: &str) -> Vec<String>;
}
