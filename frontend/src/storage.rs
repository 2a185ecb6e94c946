use shared::constants::{TOKEN_KEY, USERNAME_KEY, USER_ID_KEY};
use shared::shared_cat_state::CatIdentity;
use shared::storage::KeyValueStore;
use shared::ClientError;
use web_sys::{window, Storage};

fn local_storage() -> Option<Storage> {
    window().and_then(|w| w.local_storage().ok().flatten())
}

fn session_storage() -> Option<Storage> {
    window().and_then(|w| w.session_storage().ok().flatten())
}

/// `localStorage` behind the shared store trait. Reads as empty and rejects
/// writes when storage is unavailable (private mode, sandboxed frames).
#[derive(Clone, Copy, Default)]
pub struct LocalStore;

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Option<String> {
        local_storage().and_then(|s| s.get_item(key).ok().flatten())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let storage = local_storage()
            .ok_or_else(|| ClientError::Storage("localStorage unavailable".to_string()))?;
        storage
            .set_item(key, value)
            .map_err(|e| ClientError::Storage(format!("{:?}", e)))
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = local_storage() {
            let _ = storage.remove_item(key);
        }
    }
}

fn read_either(key: &str) -> Option<String> {
    [local_storage(), session_storage()]
        .into_iter()
        .flatten()
        .find_map(|s| s.get_item(key).ok().flatten())
        .filter(|v| !v.is_empty())
}

// Get auth token from storage
pub fn get_auth_token() -> Option<String> {
    read_either(TOKEN_KEY)
}

/// The signed-in user, if any.
pub fn current_identity() -> Option<CatIdentity> {
    let user_name = read_either(USERNAME_KEY)?;
    let user_id = read_either(USER_ID_KEY).unwrap_or_else(|| user_name.clone());
    Some(CatIdentity { user_id, user_name })
}
