pub mod audio;
pub mod audio_api;
pub mod middle;
pub mod pipeline;
pub mod remote;
pub mod shared;
pub mod tui;
