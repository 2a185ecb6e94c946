pub mod use_cat_channel;
pub mod use_nickname;
pub mod use_reward_manager;

pub use use_cat_channel::*;
pub use use_nickname::*;
pub use use_reward_manager::*;
