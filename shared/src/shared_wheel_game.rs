use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{
    MAX_EXTRA_ROTATIONS, MIN_EXTRA_ROTATIONS, SPIN_DURATION_MS, WHEEL_COOLDOWN_DURATION_KEY,
    WHEEL_COOLDOWN_MS, WHEEL_LAST_SPIN_KEY,
};
use crate::shared_rewards::RewardKind;
use crate::storage::KeyValueStore;
use crate::ClientError;

/// One labelled slice of the wheel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelSegment {
    pub label: &'static str,
    pub reward: RewardKind,
    pub value: &'static str,
    pub color: &'static str,
}

impl WheelSegment {
    pub fn reward_value(&self) -> serde_json::Value {
        match self.value.parse::<f64>() {
            Ok(n) => serde_json::json!(n),
            Err(_) => serde_json::Value::String(self.value.to_string()),
        }
    }
}

/// Clockwise from 12 o'clock.
pub const WHEEL_SEGMENTS: [WheelSegment; 8] = [
    WheelSegment { label: "Fish Cursor", reward: RewardKind::Cursor, value: "🐟", color: "#f97316" },
    WheelSegment { label: "Ocean Hue", reward: RewardKind::Color, value: "180", color: "#06b6d4" },
    WheelSegment { label: "Yarn Ball", reward: RewardKind::Yarn, value: "1", color: "#8b5cf6" },
    WheelSegment { label: "Sir Whiskers", reward: RewardKind::Nickname, value: "Sir Whiskers", color: "#ec4899" },
    WheelSegment { label: "Mouse Cursor", reward: RewardKind::Cursor, value: "🐭", color: "#22c55e" },
    WheelSegment { label: "Sunset Hue", reward: RewardKind::Color, value: "320", color: "#eab308" },
    WheelSegment { label: "Paw Cursor", reward: RewardKind::Cursor, value: "🐾", color: "#3b82f6" },
    WheelSegment { label: "Lady Mittens", reward: RewardKind::Nickname, value: "Lady Mittens", color: "#ef4444" },
];

/// Angular offset between the drawn pointer tip and 12 o'clock. Tuned against
/// the canvas label layout; planning and recovery both honour it.
pub const POINTER_CALIBRATION_DEG: f64 = 0.0;

pub fn segment_span(segment_count: usize) -> f64 {
    360.0 / segment_count as f64
}

pub fn normalize_degrees(angle: f64) -> f64 {
    let normalized = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Absolute wheel rotation (mod 360) that puts the centre of segment `index`
/// under the pointer.
pub fn target_rotation(index: usize, segment_count: usize) -> f64 {
    let span = segment_span(segment_count);
    normalize_degrees(POINTER_CALIBRATION_DEG - (index as f64 + 0.5) * span)
}

/// Wheel-frame angle currently under the pointer.
fn pointer_angle(rotation: f64) -> f64 {
    normalize_degrees(POINTER_CALIBRATION_DEG - rotation)
}

/// Recovers the segment a rotation landed on, rounding to the nearest centre.
pub fn index_at_pointer(rotation: f64, segment_count: usize) -> usize {
    let span = segment_span(segment_count);
    let nearest = ((pointer_angle(rotation) - span / 2.0) / span).round() as i64;
    nearest.rem_euclid(segment_count as i64) as usize
}

/// Segment whose slice currently contains the pointer, for highlighting while
/// the wheel is moving.
pub fn segment_at_pointer(rotation: f64, segment_count: usize) -> usize {
    let span = segment_span(segment_count);
    ((pointer_angle(rotation) / span).floor() as usize).min(segment_count - 1)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinPlan {
    pub winning_index: usize,
    pub extra_rotations: u32,
    pub start_rotation: f64,
    pub final_rotation: f64,
    pub started_at_ms: f64,
}

impl SpinPlan {
    /// Continues from `current_rotation` so consecutive spins never jump.
    pub fn new(
        current_rotation: f64,
        winning_index: usize,
        extra_rotations: u32,
        segment_count: usize,
        started_at_ms: f64,
    ) -> Self {
        let target = target_rotation(winning_index, segment_count);
        let adjustment = normalize_degrees(target - normalize_degrees(current_rotation));
        let delta = extra_rotations as f64 * 360.0 + adjustment;
        Self {
            winning_index,
            extra_rotations,
            start_rotation: current_rotation,
            final_rotation: current_rotation + delta,
            started_at_ms,
        }
    }

    pub fn rotation_at(&self, now_ms: f64) -> f64 {
        let progress = ((now_ms - self.started_at_ms) / SPIN_DURATION_MS).clamp(0.0, 1.0);
        if progress >= 1.0 {
            return self.final_rotation;
        }
        self.start_rotation + (self.final_rotation - self.start_rotation) * ease_out_cubic(progress)
    }

    pub fn is_finished(&self, now_ms: f64) -> bool {
        now_ms - self.started_at_ms >= SPIN_DURATION_MS
    }
}

pub fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

/// Outcome of a finished spin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelResult {
    pub index: usize,
    pub segment: WheelSegment,
}

/// Spin state of the wheel on this client.
#[derive(Debug, Clone)]
pub struct WheelGame {
    pub rotation: f64,
    pub segments: &'static [WheelSegment],
    current: Option<SpinPlan>,
}

impl Default for WheelGame {
    fn default() -> Self {
        Self::new()
    }
}

impl WheelGame {
    pub fn new() -> Self {
        Self {
            rotation: 0.0,
            segments: &WHEEL_SEGMENTS,
            current: None,
        }
    }

    pub fn is_spinning(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_plan(&self) -> Option<&SpinPlan> {
        self.current.as_ref()
    }

    /// Picks the outcome up front and plans the rotation that shows it.
    pub fn start_spin<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        logged_in: bool,
        cooldown_remaining_ms: f64,
        now_ms: f64,
    ) -> Result<SpinPlan, ClientError> {
        if self.is_spinning() {
            return Err(ClientError::AlreadySpinning);
        }
        if cooldown_remaining_ms > 0.0 {
            return Err(ClientError::CooldownActive {
                remaining_secs: (cooldown_remaining_ms / 1000.0).ceil(),
            });
        }
        if !logged_in {
            return Err(ClientError::NotLoggedIn);
        }

        let winning_index = rng.gen_range(0..self.segments.len());
        let extra_rotations = rng.gen_range(MIN_EXTRA_ROTATIONS..=MAX_EXTRA_ROTATIONS);
        let plan = SpinPlan::new(
            self.rotation,
            winning_index,
            extra_rotations,
            self.segments.len(),
            now_ms,
        );
        self.current = Some(plan);
        Ok(plan)
    }

    /// Settles the wheel at the planned rotation and reads the result back off
    /// the geometry.
    pub fn complete_spin(&mut self) -> Option<WheelResult> {
        let plan = self.current.take()?;
        self.rotation = plan.final_rotation;
        let index = index_at_pointer(plan.final_rotation, self.segments.len());
        if index != plan.winning_index {
            log::error!(
                "Wheel landed on segment {} but {} was chosen (rotation {})",
                index,
                plan.winning_index,
                plan.final_rotation
            );
        }
        Some(WheelResult {
            index,
            segment: self.segments[index],
        })
    }
}

// === API Types ===

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelSpinRequest {
    pub outcome_label: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelSpinResponse {
    pub accepted: bool,
    #[serde(default)]
    pub cooldown_seconds_remaining: Option<f64>,
}

// === Cooldown ===

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CooldownState {
    pub last_action_ms: f64,
    pub duration_ms: f64,
}

impl CooldownState {
    pub fn remaining_ms(&self, now_ms: f64) -> f64 {
        (self.duration_ms - (now_ms - self.last_action_ms)).max(0.0)
    }

    pub fn remaining_secs(&self, now_ms: f64) -> i64 {
        (self.remaining_ms(now_ms) / 1000.0).ceil() as i64
    }
}

/// Wheel cooldown persisted in durable storage. Remaining time is always
/// derived from the stored spin time, never counted down in memory.
pub struct CooldownTracker<S: KeyValueStore> {
    store: S,
    duration_ms: f64,
}

impl<S: KeyValueStore> CooldownTracker<S> {
    pub fn new(store: S) -> Self {
        Self::with_duration(store, WHEEL_COOLDOWN_MS)
    }

    pub fn with_duration(store: S, duration_ms: f64) -> Self {
        Self { store, duration_ms }
    }

    pub fn load(&self) -> Option<CooldownState> {
        let last_action_ms = self.store.get_f64(WHEEL_LAST_SPIN_KEY)?;
        let duration_ms = self
            .store
            .get_f64(WHEEL_COOLDOWN_DURATION_KEY)
            .unwrap_or(self.duration_ms);
        Some(CooldownState {
            last_action_ms,
            duration_ms,
        })
    }

    pub fn start(&self, spun_at_ms: f64) -> Result<(), ClientError> {
        self.store
            .set(WHEEL_LAST_SPIN_KEY, &spun_at_ms.to_string())?;
        self.store
            .set(WHEEL_COOLDOWN_DURATION_KEY, &self.duration_ms.to_string())
    }

    /// The server's remaining seconds win; persist the spin time they imply.
    pub fn start_from_server(&self, remaining_secs: f64, now_ms: f64) -> Result<(), ClientError> {
        let implied_spin = now_ms - (self.duration_ms - remaining_secs.max(0.0) * 1000.0);
        self.start(implied_spin)
    }

    /// Clears the stored entry once it has run out.
    pub fn remaining_ms(&self, now_ms: f64) -> f64 {
        match self.load() {
            Some(state) => {
                let remaining = state.remaining_ms(now_ms);
                if remaining <= 0.0 {
                    self.clear();
                }
                remaining
            }
            None => 0.0,
        }
    }

    pub fn remaining_secs(&self, now_ms: f64) -> i64 {
        (self.remaining_ms(now_ms) / 1000.0).ceil() as i64
    }

    pub fn clear(&self) {
        self.store.remove(WHEEL_LAST_SPIN_KEY);
        self.store.remove(WHEEL_COOLDOWN_DURATION_KEY);
    }

    /// Starts the cooldown after recording a spin. Failures still lock the
    /// wheel unless the server said how long to wait.
    pub fn settle(
        &self,
        outcome: &Result<WheelSpinResponse, ClientError>,
        spun_at_ms: f64,
        now_ms: f64,
    ) -> Result<(), ClientError> {
        let server_remaining = match outcome {
            Ok(response) if !response.accepted => response.cooldown_seconds_remaining,
            Err(ClientError::CooldownActive { remaining_secs }) => Some(*remaining_secs),
            _ => None,
        };
        match server_remaining {
            Some(secs) => self.start_from_server(secs, now_ms),
            None => self.start(spun_at_ms),
        }
    }
}

// Format time for cooldown display
pub fn format_time(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}h {}m {:02}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_recovery_matches_choice_for_every_geometry() {
        let starts = [0.0, 1.0, 44.999, 90.0, 359.9, 1234.5, -270.0, 7_200.25];
        for segment_count in 1..=24 {
            for index in 0..segment_count {
                for extra in MIN_EXTRA_ROTATIONS..=MAX_EXTRA_ROTATIONS {
                    for start in starts {
                        let plan = SpinPlan::new(start, index, extra, segment_count, 0.0);
                        assert_eq!(
                            index_at_pointer(plan.final_rotation, segment_count),
                            index,
                            "n={} i={} extra={} start={}",
                            segment_count,
                            index,
                            extra,
                            start
                        );
                        assert_eq!(segment_at_pointer(plan.final_rotation, segment_count), index);
                    }
                }
            }
        }
    }

    #[test]
    fn test_spin_delta_covers_requested_rotations() {
        for extra in MIN_EXTRA_ROTATIONS..=MAX_EXTRA_ROTATIONS {
            let plan = SpinPlan::new(123.0, 5, extra, 8, 0.0);
            let delta = plan.final_rotation - plan.start_rotation;
            assert!(delta >= extra as f64 * 360.0);
            assert!(delta < (extra + 1) as f64 * 360.0);
        }
    }

    #[test]
    fn test_consecutive_spins_continue_from_current_rotation() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut game = WheelGame::new();
        let mut previous = game.rotation;
        for step in 0..50 {
            let plan = game
                .start_spin(&mut rng, true, 0.0, step as f64 * 10_000.0)
                .unwrap();
            assert_eq!(plan.start_rotation, previous);
            assert!(plan.final_rotation > plan.start_rotation);
            let result = game.complete_spin().unwrap();
            assert_eq!(result.index, plan.winning_index);
            assert_eq!(result.segment, WHEEL_SEGMENTS[plan.winning_index]);
            previous = game.rotation;
        }
    }

    #[test]
    fn test_random_choices_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = [false; 8];
        let mut game = WheelGame::new();
        for _ in 0..400 {
            let plan = game.start_spin(&mut rng, true, 0.0, 0.0).unwrap();
            assert!(plan.winning_index < WHEEL_SEGMENTS.len());
            assert!((MIN_EXTRA_ROTATIONS..=MAX_EXTRA_ROTATIONS).contains(&plan.extra_rotations));
            seen[plan.winning_index] = true;
            game.complete_spin();
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_spin_rejections() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut game = WheelGame::new();

        let err = game.start_spin(&mut rng, false, 0.0, 0.0).unwrap_err();
        assert_eq!(err, ClientError::NotLoggedIn);
        assert!(!err.is_silent());
        assert!(!game.is_spinning());

        let err = game.start_spin(&mut rng, true, 1_500.0, 0.0).unwrap_err();
        assert_eq!(err, ClientError::CooldownActive { remaining_secs: 2.0 });
        assert!(err.is_silent());

        game.start_spin(&mut rng, true, 0.0, 0.0).unwrap();
        let rotation = game.rotation;
        let err = game.start_spin(&mut rng, true, 0.0, 0.0).unwrap_err();
        assert_eq!(err, ClientError::AlreadySpinning);
        assert_eq!(game.rotation, rotation);
    }

    #[test]
    fn test_animation_eases_to_exact_final_rotation() {
        let plan = SpinPlan::new(30.0, 2, 4, 8, 1_000.0);
        assert_eq!(plan.rotation_at(1_000.0), 30.0);
        assert_eq!(plan.rotation_at(0.0), 30.0);
        let mid = plan.rotation_at(1_000.0 + SPIN_DURATION_MS / 2.0);
        assert!(mid > 30.0 && mid < plan.final_rotation);
        assert!(!plan.is_finished(1_000.0 + SPIN_DURATION_MS - 1.0));
        assert!(plan.is_finished(1_000.0 + SPIN_DURATION_MS));
        assert_eq!(plan.rotation_at(1_000.0 + SPIN_DURATION_MS), plan.final_rotation);
        assert_eq!(plan.rotation_at(1_000_000.0), plan.final_rotation);
    }

    #[test]
    fn test_cooldown_monotonic_and_reaches_zero() {
        let state = CooldownState {
            last_action_ms: 10_000.0,
            duration_ms: WHEEL_COOLDOWN_MS,
        };
        let mut previous = f64::MAX;
        let mut now = 10_000.0;
        while now <= 10_000.0 + WHEEL_COOLDOWN_MS + 5_000.0 {
            let remaining = state.remaining_ms(now);
            assert!(remaining <= previous);
            assert!(remaining >= 0.0);
            previous = remaining;
            now += 250.0;
        }
        assert_eq!(state.remaining_ms(10_000.0 + WHEEL_COOLDOWN_MS), 0.0);
        assert_eq!(state.remaining_ms(10_000.0 + WHEEL_COOLDOWN_MS - 1.0), 1.0);
        assert_eq!(state.remaining_secs(10_000.0), 120);
    }

    #[test]
    fn test_tracker_persists_and_clears() {
        let store = MemoryStore::new();
        let tracker = CooldownTracker::new(&store);
        assert_eq!(tracker.remaining_ms(0.0), 0.0);

        tracker.start(1_000.0).unwrap();
        assert_eq!(store.get_f64(WHEEL_LAST_SPIN_KEY), Some(1_000.0));

        // A fresh tracker over the same storage sees the same cooldown.
        let reloaded = CooldownTracker::new(&store);
        assert_eq!(reloaded.remaining_ms(61_000.0), 60_000.0);
        assert_eq!(reloaded.remaining_secs(61_000.5), 60);

        assert_eq!(reloaded.remaining_ms(1_000.0 + WHEEL_COOLDOWN_MS), 0.0);
        assert_eq!(store.get(WHEEL_LAST_SPIN_KEY), None);
    }

    #[test]
    fn test_provisional_cooldown_blocks_restart_while_recording() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut game = WheelGame::new();
        let tracker = CooldownTracker::new(MemoryStore::default());

        game.start_spin(&mut rng, true, tracker.remaining_ms(0.0), 0.0).unwrap();
        tracker.start(0.0).unwrap();
        game.complete_spin().unwrap();

        // Animation done, record request still in flight.
        let now = SPIN_DURATION_MS + 10.0;
        let err = game
            .start_spin(&mut rng, true, tracker.remaining_ms(now), now)
            .unwrap_err();
        assert!(matches!(err, ClientError::CooldownActive { .. }));
        assert!(!game.is_spinning());

        // The server's answer then replaces the provisional entry.
        let rejected = Ok(WheelSpinResponse {
            accepted: false,
            cooldown_seconds_remaining: Some(30.0),
        });
        tracker.settle(&rejected, 0.0, now).unwrap();
        assert_eq!(tracker.remaining_secs(now), 30);
    }

    #[test]
    fn test_settle_accepted_uses_spin_time() {
        let store = MemoryStore::new();
        let tracker = CooldownTracker::new(&store);
        let ok = Ok(WheelSpinResponse {
            accepted: true,
            cooldown_seconds_remaining: None,
        });
        tracker.settle(&ok, 5_000.0, 9_000.0).unwrap();
        assert_eq!(tracker.load().unwrap().last_action_ms, 5_000.0);
    }

    #[test]
    fn test_settle_failure_still_locks_out() {
        let store = MemoryStore::new();
        let tracker = CooldownTracker::new(&store);
        let failed = Err(ClientError::Transport("offline".to_string()));
        tracker.settle(&failed, 5_000.0, 9_000.0).unwrap();
        assert_eq!(tracker.remaining_ms(5_000.0), WHEEL_COOLDOWN_MS);
    }

    #[test]
    fn test_settle_server_remaining_is_authoritative() {
        let store = MemoryStore::new();
        let tracker = CooldownTracker::new(&store);
        let rejected = Ok(WheelSpinResponse {
            accepted: false,
            cooldown_seconds_remaining: Some(30.0),
        });
        tracker.settle(&rejected, 5_000.0, 100_000.0).unwrap();
        assert_eq!(tracker.remaining_ms(100_000.0), 30_000.0);
        assert_eq!(
            tracker.load().unwrap().last_action_ms,
            100_000.0 - (WHEEL_COOLDOWN_MS - 30_000.0)
        );

        let err = Err(ClientError::CooldownActive { remaining_secs: 10.0 });
        tracker.settle(&err, 5_000.0, 200_000.0).unwrap();
        assert_eq!(tracker.remaining_ms(200_000.0), 10_000.0);
    }

    #[test]
    fn test_spin_response_parsing() {
        let response: WheelSpinResponse =
            serde_json::from_str(r#"{"accepted": false, "cooldownSecondsRemaining": 42}"#).unwrap();
        assert!(!response.accepted);
        assert_eq!(response.cooldown_seconds_remaining, Some(42.0));

        let body = serde_json::to_value(WheelSpinRequest {
            outcome_label: "Fish Cursor".to_string(),
        })
        .unwrap();
        assert_eq!(body["outcomeLabel"], "Fish Cursor");
    }

    #[test]
    fn test_segment_reward_values() {
        assert_eq!(WHEEL_SEGMENTS[1].reward_value(), serde_json::json!(180.0));
        assert_eq!(WHEEL_SEGMENTS[0].reward_value(), serde_json::json!("🐟"));
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "0s");
        assert_eq!(format_time(42), "42s");
        assert_eq!(format_time(65), "1m 05s");
        assert_eq!(format_time(3723), "1h 2m 03s");
        assert_eq!(format_time(-4), "0s");
    }
}
