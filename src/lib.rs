pub mod bottleneck;
pub mod cli;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod formula;
pub mod history;
pub mod jitter;
pub mod models;
pub mod output;
pub mod recorder;
pub mod runtime;
pub mod state;
