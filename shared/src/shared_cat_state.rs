use serde::{Deserialize, Serialize};

use crate::constants::{
    INITIAL_LOG_LIMIT, RECONNECT_BASE_MS, RECONNECT_MAX_MS, REST_EXPIRY_GRACE_MS,
};
use crate::wire;
use crate::ClientError;

/// The shared cat's mood. One authoritative value lives on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CatMood {
    #[default]
    #[serde(alias = "playing")]
    Playing,
    #[serde(alias = "zen")]
    Zen,
    #[serde(alias = "sleeping")]
    Sleeping,
    #[serde(alias = "happy")]
    Happy,
    #[serde(alias = "tired")]
    Tired,
    #[serde(alias = "angry")]
    Angry,
}

impl CatMood {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Playing => "Playing",
            Self::Zen => "Zen",
            Self::Sleeping => "Sleeping",
            Self::Happy => "Happy",
            Self::Tired => "Tired",
            Self::Angry => "Angry",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Playing => "😺",
            Self::Zen => "😌",
            Self::Sleeping => "😴",
            Self::Happy => "😸",
            Self::Tired => "🙀",
            Self::Angry => "😾",
        }
    }
}

/// Held while some user has put the cat to sleep.
#[derive(Debug, Clone, PartialEq)]
pub struct RestLock {
    pub holder_name: String,
    pub expires_at_ms: f64,
}

/// Kind of interaction recorded in the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogAction {
    Feed,
    Pet,
    Play,
    Rest,
    Other(String),
}

impl From<String> for LogAction {
    fn from(action: String) -> Self {
        match action.to_lowercase().as_str() {
            "feed" => Self::Feed,
            "pet" => Self::Pet,
            "play" => Self::Play,
            "rest" => Self::Rest,
            _ => Self::Other(action),
        }
    }
}

impl From<LogAction> for String {
    fn from(action: LogAction) -> Self {
        match action {
            LogAction::Feed => "feed".to_string(),
            LogAction::Pet => "pet".to_string(),
            LogAction::Play => "play".to_string(),
            LogAction::Rest => "rest".to_string(),
            LogAction::Other(other) => other,
        }
    }
}

impl LogAction {
    pub fn describe(&self) -> String {
        match self {
            Self::Feed => "fed the cat".to_string(),
            Self::Pet => "petted the cat".to_string(),
            Self::Play => "played with the cat".to_string(),
            Self::Rest => "put the cat to sleep".to_string(),
            Self::Other(other) => other.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(with = "wire::loose_id")]
    pub id: String,
    pub action: LogAction,
    #[serde(alias = "userName")]
    pub actor_name: String,
    #[serde(with = "wire::millis")]
    pub timestamp: f64,
}

// === Channel messages ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    GetCurrentState,
    GetLogs {
        limit: u32,
    },
    #[serde(rename_all = "camelCase")]
    ActivateRest {
        user_id: String,
        user_name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    CatStateChanged {
        state: CatMood,
    },
    #[serde(rename_all = "camelCase")]
    CatResting {
        #[serde(with = "wire::millis")]
        rest_until: f64,
        user_name: String,
    },
    RestDenied {
        message: String,
    },
    CatRestEnded,
    /// Newest first, as the server stores them.
    InitialLogs(Vec<LogEntry>),
    NewLog(LogEntry),
}

impl ServerMessage {
    pub fn parse(text: &str) -> Result<Self, ClientError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl ClientMessage {
    pub fn to_text(&self) -> Result<String, ClientError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

/// The signed-in user as far as the cat is concerned.
#[derive(Debug, Clone, PartialEq)]
pub struct CatIdentity {
    pub user_id: String,
    pub user_name: String,
}

/// What an inbound message changed, for the view layer.
#[derive(Debug, Clone, PartialEq)]
pub enum MirrorEvent {
    MoodChanged(CatMood),
    RestStarted(RestLock),
    RestDenied(String),
    RestEnded,
    /// The local countdown ran out and no end-of-rest event followed.
    RestExpiredLocally,
    LogsReplaced,
    LogAppended(LogEntry),
}

/// Client-side mirror of the server's cat. Only inbound events mutate mood
/// and rest lock; local input never does.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatStateMirror {
    mood: CatMood,
    rest_lock: Option<RestLock>,
    logs: Vec<LogEntry>,
    status: ConnectionStatus,
    last_denial: Option<String>,
}

impl CatStateMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mood(&self) -> CatMood {
        self.mood
    }

    pub fn rest_lock(&self) -> Option<&RestLock> {
        self.rest_lock.as_ref()
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn last_denial(&self) -> Option<&str> {
        self.last_denial.as_deref()
    }

    /// Requests to send on every (re)connect. Status stays `Connecting`
    /// until they are through.
    pub fn handshake(&self) -> Vec<ClientMessage> {
        vec![
            ClientMessage::GetCurrentState,
            ClientMessage::GetLogs {
                limit: INITIAL_LOG_LIMIT,
            },
        ]
    }

    pub fn on_connected(&mut self) {
        self.status = ConnectionStatus::Connected;
    }

    pub fn on_disconnected(&mut self) {
        self.status = ConnectionStatus::Disconnected;
    }

    pub fn on_connecting(&mut self) {
        self.status = ConnectionStatus::Connecting;
    }

    pub fn apply(&mut self, message: ServerMessage) -> MirrorEvent {
        match message {
            ServerMessage::CatStateChanged { state } => {
                self.mood = state;
                if state != CatMood::Sleeping {
                    self.rest_lock = None;
                }
                MirrorEvent::MoodChanged(state)
            }
            ServerMessage::CatResting {
                rest_until,
                user_name,
            } => {
                let lock = RestLock {
                    holder_name: user_name,
                    expires_at_ms: rest_until,
                };
                self.mood = CatMood::Sleeping;
                self.rest_lock = Some(lock.clone());
                self.last_denial = None;
                MirrorEvent::RestStarted(lock)
            }
            ServerMessage::RestDenied { message } => {
                self.last_denial = Some(message.clone());
                MirrorEvent::RestDenied(message)
            }
            ServerMessage::CatRestEnded => {
                self.rest_lock = None;
                if self.mood == CatMood::Sleeping {
                    self.mood = CatMood::Playing;
                }
                MirrorEvent::RestEnded
            }
            ServerMessage::InitialLogs(mut entries) => {
                entries.truncate(INITIAL_LOG_LIMIT as usize);
                entries.reverse();
                self.logs = entries;
                MirrorEvent::LogsReplaced
            }
            ServerMessage::NewLog(entry) => {
                self.logs.push(entry.clone());
                MirrorEvent::LogAppended(entry)
            }
        }
    }

    /// Builds the rest request, gated on a signed-in user and on the mirrored
    /// lock being free.
    pub fn request_rest(
        &self,
        identity: Option<&CatIdentity>,
        now_ms: f64,
    ) -> Result<ClientMessage, ClientError> {
        let identity = identity.ok_or(ClientError::NotLoggedIn)?;
        if let Some(lock) = &self.rest_lock {
            if lock.expires_at_ms > now_ms {
                return Err(ClientError::RestLocked {
                    holder: lock.holder_name.clone(),
                });
            }
        }
        Ok(ClientMessage::ActivateRest {
            user_id: identity.user_id.clone(),
            user_name: identity.user_name.clone(),
        })
    }

    pub fn rest_remaining_ms(&self, now_ms: f64) -> f64 {
        self.rest_lock
            .as_ref()
            .map(|lock| (lock.expires_at_ms - now_ms).max(0.0))
            .unwrap_or(0.0)
    }

    /// Called from the display countdown. Repairs a lock whose end event never
    /// arrived once the grace window has passed.
    pub fn tick(&mut self, now_ms: f64) -> Option<MirrorEvent> {
        let lock = self.rest_lock.as_ref()?;
        if now_ms < lock.expires_at_ms + REST_EXPIRY_GRACE_MS {
            return None;
        }
        log::warn!(
            "Rest lock held by {} expired locally without an end event, resetting",
            lock.holder_name
        );
        self.rest_lock = None;
        self.mood = CatMood::Playing;
        Some(MirrorEvent::RestExpiredLocally)
    }
}

/// Exponential reconnect delay, doubling from one second up to a cap.
#[derive(Debug, Clone, Default)]
pub struct Backoff {
    attempt: u32,
}

impl Backoff {
    pub fn next_delay_ms(&mut self) -> u32 {
        let delay = RECONNECT_BASE_MS
            .saturating_mul(1u32 << self.attempt.min(16))
            .min(RECONNECT_MAX_MS);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u32, actor: &str) -> LogEntry {
        LogEntry {
            id: id.to_string(),
            action: LogAction::Pet,
            actor_name: actor.to_string(),
            timestamp: id as f64 * 1000.0,
        }
    }

    fn alice() -> CatIdentity {
        CatIdentity {
            user_id: "u1".to_string(),
            user_name: "alice".to_string(),
        }
    }

    #[test]
    fn test_initial_mood_is_playing() {
        let mirror = CatStateMirror::new();
        assert_eq!(mirror.mood(), CatMood::Playing);
        assert!(mirror.rest_lock().is_none());
        assert_eq!(mirror.status(), ConnectionStatus::Connecting);
    }

    #[test]
    fn test_connect_requests_state_and_bounded_logs() {
        let mut mirror = CatStateMirror::new();
        let requests = mirror.handshake();
        assert_eq!(
            requests,
            vec![
                ClientMessage::GetCurrentState,
                ClientMessage::GetLogs { limit: 50 }
            ]
        );
        mirror.on_connected();
        assert_eq!(mirror.status(), ConnectionStatus::Connected);

        mirror.on_disconnected();
        assert_eq!(mirror.status(), ConnectionStatus::Disconnected);
        assert_eq!(mirror.handshake(), requests);
    }

    #[test]
    fn test_live_only_after_handshake_is_sent() {
        let mut mirror = CatStateMirror::new();
        mirror.on_disconnected();
        mirror.on_connecting();
        let _ = mirror.handshake();
        assert_eq!(mirror.status(), ConnectionStatus::Connecting);

        mirror.on_connected();
        assert_eq!(mirror.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn test_parse_server_messages() {
        let msg = ServerMessage::parse(r#"{"event":"cat-state-changed","data":{"state":"ZEN"}}"#).unwrap();
        assert_eq!(msg, ServerMessage::CatStateChanged { state: CatMood::Zen });

        let msg = ServerMessage::parse(
            r#"{"event":"cat-resting","data":{"restUntil":"1970-01-01T00:01:00Z","userName":"bob"}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ServerMessage::CatResting {
                rest_until: 60_000.0,
                user_name: "bob".to_string()
            }
        );

        let msg = ServerMessage::parse(r#"{"event":"cat-rest-ended"}"#).unwrap();
        assert_eq!(msg, ServerMessage::CatRestEnded);

        let msg = ServerMessage::parse(
            r#"{"event":"new-log","data":{"id":3,"action":"feed","userName":"carol","timestamp":5}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ServerMessage::NewLog(LogEntry {
                id: "3".to_string(),
                action: LogAction::Feed,
                actor_name: "carol".to_string(),
                timestamp: 5.0,
            })
        );
    }

    #[test]
    fn test_unknown_event_is_a_decode_error() {
        let err = ServerMessage::parse(r#"{"event":"cat-exploded","data":{}}"#).unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn test_outbound_message_shape() {
        let text = ClientMessage::ActivateRest {
            user_id: "u1".to_string(),
            user_name: "alice".to_string(),
        }
        .to_text()
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["event"], "activate-rest");
        assert_eq!(value["data"]["userId"], "u1");
        assert_eq!(value["data"]["userName"], "alice");

        let value = serde_json::to_value(ClientMessage::GetLogs { limit: 50 }).unwrap();
        assert_eq!(value["event"], "get-logs");
        assert_eq!(value["data"]["limit"], 50);
    }

    #[test]
    fn test_rest_lock_granted_then_denied_for_second_user() {
        let mut mirror = CatStateMirror::new();
        mirror.apply(ServerMessage::CatStateChanged {
            state: CatMood::Happy,
        });

        let request = mirror.request_rest(Some(&alice()), 0.0).unwrap();
        assert!(matches!(request, ClientMessage::ActivateRest { .. }));
        // Sending the request changes nothing locally.
        assert_eq!(mirror.mood(), CatMood::Happy);

        let event = mirror.apply(ServerMessage::CatResting {
            rest_until: 60_000.0,
            user_name: "alice".to_string(),
        });
        assert!(matches!(event, MirrorEvent::RestStarted(_)));
        assert_eq!(mirror.mood(), CatMood::Sleeping);
        assert_eq!(mirror.rest_remaining_ms(15_000.0), 45_000.0);

        // Another viewer whose mirror has not caught up yet asks and is refused.
        let mut other = CatStateMirror::new();
        other.apply(ServerMessage::CatStateChanged {
            state: CatMood::Happy,
        });
        let event = other.apply(ServerMessage::RestDenied {
            message: "The cat is already resting".to_string(),
        });
        assert_eq!(
            event,
            MirrorEvent::RestDenied("The cat is already resting".to_string())
        );
        assert_eq!(other.mood(), CatMood::Happy);
        assert_eq!(other.last_denial(), Some("The cat is already resting"));
    }

    #[test]
    fn test_request_rest_gating() {
        let mut mirror = CatStateMirror::new();
        assert_eq!(
            mirror.request_rest(None, 0.0).unwrap_err(),
            ClientError::NotLoggedIn
        );

        mirror.apply(ServerMessage::CatResting {
            rest_until: 10_000.0,
            user_name: "bob".to_string(),
        });
        assert_eq!(
            mirror.request_rest(Some(&alice()), 5_000.0).unwrap_err(),
            ClientError::RestLocked {
                holder: "bob".to_string()
            }
        );
        // Past expiry the mirror no longer blocks; the server arbitrates.
        assert!(mirror.request_rest(Some(&alice()), 10_001.0).is_ok());
    }

    #[test]
    fn test_rest_end_event_returns_to_playing() {
        let mut mirror = CatStateMirror::new();
        mirror.apply(ServerMessage::CatResting {
            rest_until: 10_000.0,
            user_name: "bob".to_string(),
        });
        assert_eq!(mirror.apply(ServerMessage::CatRestEnded), MirrorEvent::RestEnded);
        assert_eq!(mirror.mood(), CatMood::Playing);
        assert!(mirror.rest_lock().is_none());
        assert_eq!(mirror.rest_remaining_ms(0.0), 0.0);
    }

    #[test]
    fn test_local_expiry_repair_waits_for_grace_window() {
        let mut mirror = CatStateMirror::new();
        mirror.apply(ServerMessage::CatResting {
            rest_until: 10_000.0,
            user_name: "bob".to_string(),
        });

        assert_eq!(mirror.tick(9_000.0), None);
        assert_eq!(mirror.tick(10_000.0), None);
        assert_eq!(mirror.tick(10_000.0 + REST_EXPIRY_GRACE_MS - 1.0), None);
        assert_eq!(mirror.mood(), CatMood::Sleeping);

        assert_eq!(
            mirror.tick(10_000.0 + REST_EXPIRY_GRACE_MS),
            Some(MirrorEvent::RestExpiredLocally)
        );
        assert_eq!(mirror.mood(), CatMood::Playing);
        assert_eq!(mirror.tick(20_000.0), None);
    }

    #[test]
    fn test_logs_reversed_on_load_then_appended_in_arrival_order() {
        let mut mirror = CatStateMirror::new();
        mirror.apply(ServerMessage::InitialLogs(vec![
            entry(3, "c"),
            entry(2, "b"),
            entry(1, "a"),
        ]));
        let ids: Vec<_> = mirror.logs().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);

        // An older timestamp arriving later still goes to the end.
        let mut late = entry(9, "z");
        late.timestamp = 0.0;
        mirror.apply(ServerMessage::NewLog(late));
        mirror.apply(ServerMessage::NewLog(entry(4, "d")));
        let ids: Vec<_> = mirror.logs().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "9", "4"]);
    }

    #[test]
    fn test_initial_logs_capped_to_most_recent() {
        let mut mirror = CatStateMirror::new();
        let newest_first: Vec<_> = (1..=80).rev().map(|i| entry(i, "x")).collect();
        mirror.apply(ServerMessage::InitialLogs(newest_first));
        assert_eq!(mirror.logs().len(), 50);
        assert_eq!(mirror.logs().first().unwrap().id, "31");
        assert_eq!(mirror.logs().last().unwrap().id, "80");
    }

    #[test]
    fn test_log_action_labels() {
        assert_eq!(LogAction::from("FEED".to_string()), LogAction::Feed);
        assert_eq!(
            LogAction::from("dance".to_string()),
            LogAction::Other("dance".to_string())
        );
        assert_eq!(LogAction::Rest.describe(), "put the cat to sleep");
    }

    #[test]
    fn test_backoff_doubles_to_cap_and_resets() {
        let mut backoff = Backoff::default();
        let delays: Vec<_> = (0..7).map(|_| backoff.next_delay_ms()).collect();
        assert_eq!(delays, vec![1_000, 2_000, 4_000, 8_000, 16_000, 30_000, 30_000]);
        backoff.reset();
        assert_eq!(backoff.next_delay_ms(), 1_000);
    }
}
