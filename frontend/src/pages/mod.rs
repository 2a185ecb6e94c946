pub mod home;
pub mod wheel;
