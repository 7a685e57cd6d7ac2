pub mod playback_driver;
pub mod spotify;
