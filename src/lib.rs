pub mod answer;
pub mod audio;
pub mod buffer;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod persist;
pub mod room;
pub mod runtime;
pub mod sync;
pub mod timer;
