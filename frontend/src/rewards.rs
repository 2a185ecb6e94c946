//! Keeps the page's reward effects in step with the server.
//!
//! The manager is the only writer of the cursor and color overrides. Snapshots
//! arrive from a 30s poll, from expiry timers and after a local win; the
//! shared reconciler turns each of them into apply/remove commands.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use gloo::events::EventListener;
use gloo_timers::callback::{Interval, Timeout};
use log::{debug, info, warn};
use shared::constants::{
    NICKNAME_UPDATE_EVENT, REWARDS_UPDATED_EVENT, REWARD_ACTIVATED_EVENT,
    REWARD_POLL_INTERVAL_MS,
};
use shared::shared_effects::{EffectKind, EffectStore};
use shared::shared_rewards::{
    EffectCommand, ExpiryTimer, NicknameUpdate, RefreshGate, RewardActivated, RewardKind,
    RewardReconciler, RewardsSnapshot,
};
use wasm_bindgen_futures::spawn_local;

use crate::api;
use crate::bus;
use crate::effects::{resolve_cursor_css, DomSurface};

// setTimeout stores its delay as a signed 32-bit value.
const MAX_TIMER_DELAY_MS: f64 = i32::MAX as f64;
// Lands the follow-up just past the throttle window.
const FOLLOWUP_MARGIN_MS: f64 = 100.0;

struct Inner {
    reconciler: RewardReconciler,
    gate: RefreshGate,
    cursor: EffectStore<DomSurface>,
    color: EffectStore<DomSurface>,
    timers: HashMap<RewardKind, Timeout>,
    followup: Option<Timeout>,
    /// Cursor images resolve asynchronously; a newer command outdates them.
    cursor_generation: u64,
}

type Shared = Rc<RefCell<Inner>>;

pub struct RewardManager {
    inner: Shared,
    _poll: Interval,
    _activated: Option<EventListener>,
}

impl RewardManager {
    /// Installs the manager and runs the first refresh.
    pub fn start() -> Self {
        let surface = Rc::new(DomSurface::new());
        let inner: Shared = Rc::new(RefCell::new(Inner {
            reconciler: RewardReconciler::new(),
            gate: RefreshGate::default(),
            cursor: EffectStore::new(EffectKind::Cursor, Rc::clone(&surface)),
            color: EffectStore::new(EffectKind::Color, surface),
            timers: HashMap::new(),
            followup: None,
            cursor_generation: 0,
        }));

        let poll = {
            let weak = Rc::downgrade(&inner);
            Interval::new(REWARD_POLL_INTERVAL_MS, move || {
                if let Some(inner) = weak.upgrade() {
                    refresh(&inner);
                }
            })
        };

        let activated = {
            let weak = Rc::downgrade(&inner);
            bus::listen(REWARD_ACTIVATED_EVENT, move |signal: RewardActivated| {
                if let Some(inner) = weak.upgrade() {
                    on_reward_activated(&inner, signal);
                }
            })
        };

        info!("Reward manager started");
        refresh(&inner);

        Self {
            inner,
            _poll: poll,
            _activated: activated,
        }
    }
}

impl Drop for RewardManager {
    fn drop(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.timers.clear();
        inner.followup = None;
        inner.cursor_generation += 1;
        let commands = inner.reconciler.teardown();
        drop(inner);
        execute(&self.inner, commands);

        // Anything applied outside the reconciler's knowledge goes too.
        let mut inner = self.inner.borrow_mut();
        inner.cursor.remove();
        inner.color.remove();
        info!("Reward manager stopped");
    }
}

fn now() -> f64 {
    js_sys::Date::now()
}

/// Throttled re-fetch. A failed fetch counts as "no active rewards".
/// Returns false when the gate dropped the request.
fn refresh(shared: &Shared) -> bool {
    if !shared.borrow_mut().gate.try_begin(now()) {
        debug!("Reward refresh throttled");
        return false;
    }

    let weak = Rc::downgrade(shared);
    spawn_local(async move {
        let snapshot = match api::fetch_rewards().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Failed to fetch rewards: {}", e);
                RewardsSnapshot::new()
            }
        };
        let Some(shared) = weak.upgrade() else {
            return;
        };
        apply_snapshot(&shared, &snapshot);
    });
    true
}

fn timer_delay(ms: f64) -> u32 {
    ms.clamp(0.0, MAX_TIMER_DELAY_MS) as u32
}

/// One pending follow-up refresh at a time; a newer one replaces it.
fn arm_followup(shared: &Shared, delay_ms: f64) {
    let delay = timer_delay(delay_ms + FOLLOWUP_MARGIN_MS);
    debug!("Follow-up reward refresh in {}ms", delay);
    let weak = Rc::downgrade(shared);
    let followup = Timeout::new(delay, move || {
        if let Some(shared) = weak.upgrade() {
            refresh(&shared);
        }
    });
    shared.borrow_mut().followup = Some(followup);
}

/// Optimistic rewards are settled against the server once their grace window
/// closes and the gate reopens.
fn schedule_confirmation(shared: &Shared) {
    let delay = {
        let inner = shared.borrow();
        inner.reconciler.confirmation_refresh_in(&inner.gate, now())
    };
    if let Some(delay) = delay {
        arm_followup(shared, delay);
    }
}

fn apply_snapshot(shared: &Shared, snapshot: &RewardsSnapshot) {
    let now = now();
    let outcome = {
        let mut inner = shared.borrow_mut();
        inner.gate.complete(now);
        inner.reconciler.apply_snapshot(snapshot, now)
    };
    debug!(
        "Reward snapshot: {} entries, {} commands",
        snapshot.len(),
        outcome.commands.len()
    );
    execute(shared, outcome.commands);
    arm_timers(shared, outcome.timers);
    schedule_confirmation(shared);

    bus::dispatch(REWARDS_UPDATED_EVENT, snapshot);
    bus::dispatch(
        NICKNAME_UPDATE_EVENT,
        &NicknameUpdate::from_snapshot(snapshot, now),
    );
}

fn arm_timers(shared: &Shared, timers: Vec<ExpiryTimer>) {
    let mut inner = shared.borrow_mut();
    inner.timers.clear();
    for timer in timers {
        let delay = timer_delay(timer.fire_in_ms);
        let weak = Rc::downgrade(shared);
        let kind = timer.reward;
        debug!("Arming {} expiry in {}ms", kind.key(), delay);
        let handle = Timeout::new(delay, move || {
            if let Some(shared) = weak.upgrade() {
                on_expired(&shared, kind);
            }
        });
        inner.timers.insert(kind, handle);
    }
}

fn on_expired(shared: &Shared, kind: RewardKind) {
    info!("{} reward expired", kind.key());
    let commands = shared.borrow_mut().reconciler.expiry_fired(kind);
    execute(shared, commands);
    if kind == RewardKind::Nickname {
        bus::dispatch(NICKNAME_UPDATE_EVENT, &NicknameUpdate { nickname: None });
    }
    if !refresh(shared) {
        let wait = shared.borrow().gate.wait_ms(now());
        if let Some(wait) = wait {
            arm_followup(shared, wait);
        }
    }
}

fn on_reward_activated(shared: &Shared, signal: RewardActivated) {
    let Some(kind) = RewardKind::from_key(&signal.reward_type) else {
        debug!("Ignoring activation of unknown reward {}", signal.reward_type);
        return;
    };
    info!("{} reward activated locally", kind.key());
    let commands = shared
        .borrow_mut()
        .reconciler
        .optimistic(kind, &signal.value, now());
    execute(shared, commands);
    // An in-flight fetch schedules the confirmation when it completes.
    refresh(shared);
    schedule_confirmation(shared);
}

fn execute(shared: &Shared, commands: Vec<EffectCommand>) {
    for command in commands {
        match command {
            EffectCommand::Apply {
                kind: EffectKind::Color,
                value,
            } => {
                shared.borrow_mut().color.apply(&value);
            }
            EffectCommand::Remove {
                kind: EffectKind::Color,
            } => {
                shared.borrow_mut().color.remove();
            }
            EffectCommand::Apply {
                kind: EffectKind::Cursor,
                value,
            } => apply_cursor(shared, value),
            EffectCommand::Remove {
                kind: EffectKind::Cursor,
            } => {
                let mut inner = shared.borrow_mut();
                inner.cursor_generation += 1;
                inner.cursor.remove();
            }
        }
    }
}

fn apply_cursor(shared: &Shared, value: String) {
    let generation = {
        let mut inner = shared.borrow_mut();
        inner.cursor_generation += 1;
        inner.cursor_generation
    };
    let weak = Rc::downgrade(shared);
    spawn_local(async move {
        let css = resolve_cursor_css(&value).await;
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let mut inner = shared.borrow_mut();
        if inner.cursor_generation != generation {
            debug!("Dropping stale cursor {}", value);
            return;
        }
        inner.cursor.apply(&css);
    });
}
