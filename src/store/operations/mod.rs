pub mod player;
pub mod progress;
