pub mod audio;
pub mod audio_api;
pub mod field;
pub mod loader;
pub mod middle;
pub mod music;
pub mod pipeline;
pub mod shared;
