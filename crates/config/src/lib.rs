// Configuration loading

pub mod settings;

pub use settings::{
    CleanupSettings, CollectSettings, ConfigError, LocaleSettings, PathSettings, Settings,
    API_KEY_ENV,
};
