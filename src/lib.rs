pub mod action_selection;
pub mod agent;
pub mod app;
pub mod config;
pub mod env;
pub mod experiment;
pub mod logging;
pub mod memory;
pub mod model;
pub mod network;
pub mod utils;

pub use agent::Agent;
pub use config::Config;
pub use experiment::QLearning;
