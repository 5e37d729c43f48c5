// Configuration loading

pub mod error;
pub mod secrets;
pub mod settings;

pub use error::ConfigError;
pub use secrets::{get_secret, get_secret_or_file, Secret, SecretLookup, SecretSource};
pub use settings::{
    BaselineBackend, FeedSettings, FeedsSettings, PathSettings, Settings, SheetSource, SheetsSettings, WikiSettings,
};
