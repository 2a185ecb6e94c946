pub mod constants;
pub mod error;
pub mod storage;
pub mod wire;
pub mod shared_cat_state;
pub mod shared_effects;
pub mod shared_rewards;
pub mod shared_wheel_game;

pub use error::ClientError;
