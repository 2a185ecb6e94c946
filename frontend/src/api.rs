use gloo_net::http::Request;
use shared::constants::{REWARDS_ENDPOINT, WHEEL_SPIN_ENDPOINT};
use shared::shared_rewards::{RewardsResponse, RewardsSnapshot};
use shared::shared_wheel_game::{WheelSpinRequest, WheelSpinResponse};
use shared::ClientError;

use crate::config::get_api_url;
use crate::storage::get_auth_token;

fn transport(e: gloo_net::Error) -> ClientError {
    ClientError::Transport(e.to_string())
}

/// Active rewards for the signed-in user. Anonymous visitors have none.
pub async fn fetch_rewards() -> Result<RewardsSnapshot, ClientError> {
    let Some(token) = get_auth_token() else {
        return Ok(RewardsSnapshot::new());
    };

    let response = Request::get(&get_api_url(REWARDS_ENDPOINT))
        .header("Authorization", &format!("Bearer {}", token))
        .send()
        .await
        .map_err(transport)?;

    if !response.ok() {
        return Err(ClientError::Transport(format!(
            "rewards request failed with status {}",
            response.status()
        )));
    }

    let body = response
        .json::<RewardsResponse>()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))?;
    Ok(body.rewards)
}

/// Records a finished spin. Rejections still carry a body, usually with the
/// server's view of the remaining cooldown, so it is parsed regardless of
/// status.
pub async fn record_spin(request: &WheelSpinRequest) -> Result<WheelSpinResponse, ClientError> {
    let token = get_auth_token().ok_or(ClientError::NotLoggedIn)?;

    let response = Request::post(&get_api_url(WHEEL_SPIN_ENDPOINT))
        .header("Authorization", &format!("Bearer {}", token))
        .json(request)
        .map_err(transport)?
        .send()
        .await
        .map_err(transport)?;

    let status = response.status();
    match response.json::<WheelSpinResponse>().await {
        Ok(body) => Ok(body),
        Err(_) if status == 401 => Err(ClientError::NotLoggedIn),
        Err(e) => Err(ClientError::Transport(format!(
            "spin request failed with status {}: {}",
            status, e
        ))),
    }
}
