pub const CAT_SOCKET_PATH: &str = "/cat/ws";
pub const REWARDS_ENDPOINT: &str = "/api/rewards/active";
pub const WHEEL_SPIN_ENDPOINT: &str = "/api/wheel/spin";

pub const INITIAL_LOG_LIMIT: u32 = 50;
pub const REST_EXPIRY_GRACE_MS: f64 = 3_000.0;
pub const RECONNECT_BASE_MS: u32 = 1_000;
pub const RECONNECT_MAX_MS: u32 = 30_000;

pub const REFRESH_MIN_INTERVAL_MS: f64 = 5_000.0;
pub const REWARD_POLL_INTERVAL_MS: u32 = 30_000;
pub const OPTIMISTIC_GRACE_MS: f64 = 2_000.0;
pub const NAVIGATION_SETTLE_MS: u32 = 100;

pub const SPIN_DURATION_MS: f64 = 4_000.0;
pub const MIN_EXTRA_ROTATIONS: u32 = 3;
pub const MAX_EXTRA_ROTATIONS: u32 = 7;
pub const WHEEL_COOLDOWN_MS: f64 = 120_000.0;

// Durable storage keys
pub const WHEEL_LAST_SPIN_KEY: &str = "wheel_last_spin";
pub const WHEEL_COOLDOWN_DURATION_KEY: &str = "wheel_cooldown_duration";
pub const USER_ID_KEY: &str = "user_id";
pub const USERNAME_KEY: &str = "username";
pub const TOKEN_KEY: &str = "token";

// Signal bus event names
pub const REWARD_ACTIVATED_EVENT: &str = "rewardActivated";
pub const REWARDS_UPDATED_EVENT: &str = "rewardsUpdated";
pub const NICKNAME_UPDATE_EVENT: &str = "nicknameUpdate";

pub const NETWORK_ERROR: &str = "Network error. Please try again";
