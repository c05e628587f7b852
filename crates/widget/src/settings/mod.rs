pub mod state;

pub use state::{
    DEFAULT_FALLBACK_MESSAGE, DEFAULT_LANGUAGE, DEFAULT_PREFERRED_VOICES, SessionConfig,
    SettingsError, WidgetSettings,
};
