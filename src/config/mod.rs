//! Configuration: settings structs, defaults, TOML persistence, app paths.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, ChatConfig, ChatProviderKind, HistoryConfig, SessionConfig, SttConfig, TtsConfig,
};
