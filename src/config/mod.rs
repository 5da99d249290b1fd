pub mod settings;


pub use settings::{EngineConfig, EngineSettings, HistorySettings};
