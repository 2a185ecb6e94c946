use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::constants::{OPTIMISTIC_GRACE_MS, REFRESH_MIN_INTERVAL_MS};
use crate::shared_effects::{color_filter_css, EffectKind};
use crate::wire;

/// Reward types the client knows how to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardKind {
    Cursor,
    Color,
    Yarn,
    Nickname,
}

impl RewardKind {
    pub const ALL: [RewardKind; 4] = [Self::Cursor, Self::Color, Self::Yarn, Self::Nickname];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Cursor => "cursor",
            Self::Color => "color",
            Self::Yarn => "yarn",
            Self::Nickname => "nickname",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    pub fn effect(&self) -> Option<EffectKind> {
        match self {
            Self::Cursor => Some(EffectKind::Cursor),
            Self::Color => Some(EffectKind::Color),
            Self::Yarn | Self::Nickname => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default, with = "wire::opt_millis")]
    pub expires_at: Option<f64>,
    #[serde(default, with = "wire::opt_millis")]
    pub created_at: Option<f64>,
}

impl Reward {
    /// Truthiness of the payload: null, false, zero and "" carry nothing.
    pub fn has_value(&self) -> bool {
        match &self.value {
            serde_json::Value::Null => false,
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::Number(n) => n.as_f64().map_or(false, |v| v != 0.0),
            serde_json::Value::String(s) => !s.is_empty(),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
        }
    }

    pub fn is_active(&self, now_ms: f64) -> bool {
        self.has_value() && self.expires_at.map_or(true, |expires| expires > now_ms)
    }

    pub fn value_text(&self) -> Option<String> {
        match &self.value {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Reward type key to reward, as the server reports it. Unknown keys are kept
/// so consumers further out can still read them.
pub type RewardsSnapshot = BTreeMap<String, Reward>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewardsResponse {
    #[serde(default)]
    pub rewards: RewardsSnapshot,
}

/// Detail of the "reward activated" signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardActivated {
    #[serde(rename = "type")]
    pub reward_type: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Detail of the nickname signal. `None` clears the override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NicknameUpdate {
    pub nickname: Option<String>,
}

impl NicknameUpdate {
    pub fn from_snapshot(snapshot: &RewardsSnapshot, now_ms: f64) -> Self {
        let nickname = snapshot
            .get(RewardKind::Nickname.key())
            .filter(|reward| reward.is_active(now_ms))
            .and_then(Reward::value_text);
        Self { nickname }
    }
}

/// CSS value for an effect-bearing reward payload. Cursor values pass through
/// untouched; the browser layer resolves image URLs into glyphs.
pub fn effect_value(kind: EffectKind, value: &serde_json::Value) -> Option<String> {
    match kind {
        EffectKind::Cursor => match value {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        },
        EffectKind::Color => color_filter_css(value),
    }
}

// === Reconciliation ===

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RewardPhase {
    Inactive,
    /// Applied locally ahead of the server, at `since_ms`.
    Optimistic { since_ms: f64 },
    Confirmed,
    /// The expiry timer fired and the effect is off; waiting on a refresh.
    Expiring,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EffectCommand {
    Apply { kind: EffectKind, value: String },
    Remove { kind: EffectKind },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpiryTimer {
    pub reward: RewardKind,
    pub fire_in_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOutcome {
    pub commands: Vec<EffectCommand>,
    /// Replaces every previously armed timer.
    pub timers: Vec<ExpiryTimer>,
}

#[derive(Debug, Clone)]
struct RewardSlot {
    phase: RewardPhase,
    applied: Option<String>,
}

impl Default for RewardSlot {
    fn default() -> Self {
        Self {
            phase: RewardPhase::Inactive,
            applied: None,
        }
    }
}

/// Per-type state machine reconciling server snapshots, optimistic signals
/// and expiry timers into effect commands.
#[derive(Debug, Clone, Default)]
pub struct RewardReconciler {
    slots: BTreeMap<RewardKind, RewardSlot>,
}

impl RewardReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self, kind: RewardKind) -> RewardPhase {
        self.slots
            .get(&kind)
            .map(|slot| slot.phase)
            .unwrap_or(RewardPhase::Inactive)
    }

    pub fn applied_value(&self, kind: RewardKind) -> Option<&str> {
        self.slots.get(&kind).and_then(|slot| slot.applied.as_deref())
    }

    pub fn apply_snapshot(&mut self, snapshot: &RewardsSnapshot, now_ms: f64) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();

        for kind in RewardKind::ALL {
            let reward = snapshot.get(kind.key());
            let server_active = reward.map_or(false, |r| r.is_active(now_ms));
            let server_value = match (kind.effect(), reward) {
                (Some(effect), Some(r)) if server_active => effect_value(effect, &r.value),
                _ => None,
            };

            let slot = self.slots.entry(kind).or_default();
            let next = match (slot.phase, server_active) {
                (_, true) => RewardPhase::Confirmed,
                (RewardPhase::Optimistic { since_ms }, false)
                    if now_ms - since_ms < OPTIMISTIC_GRACE_MS =>
                {
                    log::debug!("Holding optimistic {} reward against stale snapshot", kind.key());
                    slot.phase
                }
                _ => RewardPhase::Inactive,
            };
            slot.phase = next;

            if let Some(effect) = kind.effect() {
                match next {
                    RewardPhase::Confirmed => match server_value {
                        Some(value) if slot.applied.as_deref() != Some(value.as_str()) => {
                            slot.applied = Some(value.clone());
                            outcome.commands.push(EffectCommand::Apply { kind: effect, value });
                        }
                        Some(_) => {}
                        // Active on the server but with a payload we can't render.
                        None => {
                            if slot.applied.take().is_some() {
                                log::warn!("Unrenderable {} reward value, removing effect", kind.key());
                                outcome.commands.push(EffectCommand::Remove { kind: effect });
                            }
                        }
                    },
                    RewardPhase::Inactive => {
                        if slot.applied.take().is_some() {
                            outcome.commands.push(EffectCommand::Remove { kind: effect });
                        }
                    }
                    RewardPhase::Optimistic { .. } | RewardPhase::Expiring => {}
                }
            }

            if let Some(expires) = reward.filter(|_| server_active).and_then(|r| r.expires_at) {
                outcome.timers.push(ExpiryTimer {
                    reward: kind,
                    fire_in_ms: expires - now_ms,
                });
            }
        }

        outcome
    }

    /// A reward was just won locally; show it before the server catches up.
    pub fn optimistic(
        &mut self,
        kind: RewardKind,
        value: &serde_json::Value,
        now_ms: f64,
    ) -> Vec<EffectCommand> {
        let slot = self.slots.entry(kind).or_default();
        match slot.phase {
            RewardPhase::Confirmed => return Vec::new(),
            _ => slot.phase = RewardPhase::Optimistic { since_ms: now_ms },
        }

        let Some(effect) = kind.effect() else {
            return Vec::new();
        };
        match effect_value(effect, value) {
            Some(value) if slot.applied.as_deref() != Some(value.as_str()) => {
                slot.applied = Some(value.clone());
                vec![EffectCommand::Apply { kind: effect, value }]
            }
            _ => Vec::new(),
        }
    }

    /// When the earliest optimistic reward's grace window closes.
    pub fn confirmation_due_ms(&self) -> Option<f64> {
        self.slots
            .values()
            .filter_map(|slot| match slot.phase {
                RewardPhase::Optimistic { since_ms } => Some(since_ms + OPTIMISTIC_GRACE_MS),
                _ => None,
            })
            .reduce(f64::min)
    }

    /// Delay before the refresh that settles optimistic rewards against the
    /// server: after the grace window and once `gate` accepts again. `None`
    /// when nothing is optimistic or a fetch is still in flight.
    pub fn confirmation_refresh_in(&self, gate: &RefreshGate, now_ms: f64) -> Option<f64> {
        let due = self.confirmation_due_ms()?;
        let wait = gate.wait_ms(now_ms)?;
        Some((due - now_ms).max(wait).max(0.0))
    }

    pub fn expiry_fired(&mut self, kind: RewardKind) -> Vec<EffectCommand> {
        let slot = self.slots.entry(kind).or_default();
        if !matches!(
            slot.phase,
            RewardPhase::Confirmed | RewardPhase::Optimistic { .. }
        ) {
            return Vec::new();
        }
        slot.phase = RewardPhase::Expiring;
        match (kind.effect(), slot.applied.take()) {
            (Some(effect), Some(_)) => vec![EffectCommand::Remove { kind: effect }],
            _ => Vec::new(),
        }
    }

    /// Reverts everything that is on screen.
    pub fn teardown(&mut self) -> Vec<EffectCommand> {
        let kinds: BTreeSet<_> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.applied.is_some())
            .filter_map(|(kind, _)| kind.effect())
            .collect();
        self.slots.clear();
        kinds
            .into_iter()
            .map(|kind| EffectCommand::Remove { kind })
            .collect()
    }
}

/// Drops refreshes while one is in flight or the last one finished recently.
#[derive(Debug, Clone)]
pub struct RefreshGate {
    in_flight: bool,
    last_completed_ms: Option<f64>,
    min_interval_ms: f64,
}

impl Default for RefreshGate {
    fn default() -> Self {
        Self::new(REFRESH_MIN_INTERVAL_MS)
    }
}

impl RefreshGate {
    pub fn new(min_interval_ms: f64) -> Self {
        Self {
            in_flight: false,
            last_completed_ms: None,
            min_interval_ms,
        }
    }

    pub fn try_begin(&mut self, now_ms: f64) -> bool {
        if self.in_flight {
            return false;
        }
        if let Some(last) = self.last_completed_ms {
            if now_ms - last < self.min_interval_ms {
                return false;
            }
        }
        self.in_flight = true;
        true
    }

    pub fn complete(&mut self, now_ms: f64) {
        self.in_flight = false;
        self.last_completed_ms = Some(now_ms);
    }

    /// Time until `try_begin` would accept. `None` while a fetch is in
    /// flight, since its completion restarts the window.
    pub fn wait_ms(&self, now_ms: f64) -> Option<f64> {
        if self.in_flight {
            return None;
        }
        Some(
            self.last_completed_ms
                .map_or(0.0, |last| (last + self.min_interval_ms - now_ms).max(0.0)),
        )
    }
}
