//! Folio integration test support.
//!
//! Re-exports the workspace crates and builds the settings the test
//! service runs with.

pub use folio_app;
pub use folio_core;
pub use folio_db;
pub use folio_service;

use folio_core::config::Settings;

/// ## Summary
/// Default settings with the in-memory backend and a quiet log level.
///
/// ## Errors
/// Returns an error if the defaults fail to deserialize.
pub fn test_settings() -> anyhow::Result<Settings> {
    let settings = Settings::builder()?
        .set_override("logging.level", "warn")?
        .build()?
        .try_deserialize::<Settings>()?;
    settings.validate()?;
    Ok(settings)
}
