pub mod config;
pub mod config_loader;
pub mod events;
pub mod model;

pub use config::{AppConfig, HistoryConfig, StatsConfig, StreamConfig};
pub use config_loader::ConfigLoader;
pub use events::{ClientCommand, ServerEvent};
pub use model::{
    Aggregates, BookmakerId, GameType, MultiplierHint, Outcome, Prediction, RouletteColor,
    RouletteHint, Round, RoundState, RoundUpdate, Scope, ServiceHealth, ServiceStatus,
    SettledRound, WheelForecast,
};
