mod wheel_canvas;
mod wheel_utils;

use std::cell::RefCell;
use std::rc::Rc;

use gloo_render::{request_animation_frame, AnimationFrame};
use gloo_timers::callback::Interval;
use shared::constants::{NETWORK_ERROR, REWARD_ACTIVATED_EVENT};
use shared::shared_rewards::RewardActivated;
use shared::shared_wheel_game::{CooldownTracker, WheelGame, WheelResult, WheelSpinRequest};
use shared::ClientError;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::api;
use crate::bus;
use crate::storage::{get_auth_token, LocalStore};
use crate::styles;

use wheel_canvas::WheelCanvas;
use wheel_utils::{ResultDisplay, SpinButton};

const CUSTOM_CSS: &str = r#"
@keyframes pulse-subtle {
    0% {
        transform: scale(1);
        box-shadow: 0 0 0 0 rgba(255, 215, 0, 0.4);
    }
    70% {
        transform: scale(1.02);
        box-shadow: 0 0 0 10px rgba(255, 215, 0, 0);
    }
    100% {
        transform: scale(1);
        box-shadow: 0 0 0 0 rgba(255, 215, 0, 0);
    }
}

.animate-pulse-subtle {
    animation: pulse-subtle 2s infinite;
}
"#;

type FrameSlot = Rc<RefCell<Option<AnimationFrame>>>;

fn cooldown_secs() -> i64 {
    CooldownTracker::new(LocalStore).remaining_secs(js_sys::Date::now())
}

/// Redraws every frame until the planned spin has run its course.
fn animate(
    game: Rc<RefCell<WheelGame>>,
    frame: FrameSlot,
    rotation: UseStateHandle<f64>,
    on_done: Callback<()>,
) {
    let slot = Rc::clone(&frame);
    let handle = request_animation_frame(move |_| {
        let now = js_sys::Date::now();
        let Some(plan) = game.borrow().current_plan().copied() else {
            return;
        };
        rotation.set(plan.rotation_at(now));
        if plan.is_finished(now) {
            slot.borrow_mut().take();
            on_done.emit(());
        } else {
            animate(game, slot, rotation, on_done);
        }
    });
    *frame.borrow_mut() = Some(handle);
}

fn publish_reward(result: &WheelResult) {
    let segment = result.segment;
    bus::dispatch(
        REWARD_ACTIVATED_EVENT,
        &RewardActivated {
            reward_type: segment.reward.key().to_string(),
            value: segment.reward_value(),
        },
    );
}

#[function_component(CatWheel)]
pub fn cat_wheel() -> Html {
    {
        use_effect_with((), move |_| {
            let document = gloo_utils::document();
            let style = document.create_element("style").ok();
            if let (Some(style), Some(head)) = (style.as_ref(), document.head()) {
                style.set_text_content(Some(CUSTOM_CSS));
                let _ = head.append_child(style);
            }
            move || {
                if let Some(style) = style {
                    style.remove();
                }
            }
        });
    }

    let game = use_mut_ref(WheelGame::new);
    let frame: FrameSlot = use_mut_ref(|| None);
    let rotation = use_state(|| 0.0_f64);
    let is_spinning = use_state(|| false);
    let result = use_state(|| None::<WheelResult>);
    let message = use_state(|| None::<String>);
    let spun_at = use_mut_ref(|| 0.0_f64);
    // Remaining time is re-derived from storage every second.
    let cooldown = use_state(cooldown_secs);

    {
        let cooldown = cooldown.clone();
        let frame = frame.clone();
        use_effect_with((), move |_| {
            let ticker = Interval::new(1_000, move || cooldown.set(cooldown_secs()));
            move || {
                drop(ticker);
                frame.borrow_mut().take();
            }
        });
    }

    let on_done = {
        let game = game.clone();
        let rotation = rotation.clone();
        let is_spinning = is_spinning.clone();
        let result = result.clone();
        let message = message.clone();
        let cooldown = cooldown.clone();
        let spun_at = spun_at.clone();

        Callback::from(move |_| {
            let finished = game.borrow_mut().complete_spin();
            rotation.set(game.borrow().rotation);
            is_spinning.set(false);
            let Some(finished) = finished else {
                return;
            };
            result.set(Some(finished));

            let message = message.clone();
            let cooldown = cooldown.clone();
            let spun_at_ms = *spun_at.borrow();
            spawn_local(async move {
                let request = WheelSpinRequest {
                    outcome_label: finished.segment.label.to_string(),
                };
                let outcome = api::record_spin(&request).await;

                let tracker = CooldownTracker::new(LocalStore);
                if let Err(e) = tracker.settle(&outcome, spun_at_ms, js_sys::Date::now()) {
                    log::warn!("Could not persist wheel cooldown: {}", e);
                }
                cooldown.set(cooldown_secs());

                match outcome {
                    Ok(response) if response.accepted => {
                        log::info!("Spin recorded: {}", finished.segment.label);
                        publish_reward(&finished);
                    }
                    Ok(_) => {
                        log::info!("Spin was not accepted by the server");
                        message.set(Some(
                            ClientError::CooldownActive {
                                remaining_secs: cooldown_secs() as f64,
                            }
                            .to_string(),
                        ));
                    }
                    Err(ClientError::NotLoggedIn) => {
                        message.set(Some(ClientError::NotLoggedIn.to_string()));
                    }
                    Err(e) => {
                        log::warn!("Failed to record spin: {}", e);
                        message.set(Some(NETWORK_ERROR.to_string()));
                    }
                }
            });
        })
    };

    let start_spin = {
        let game = game.clone();
        let frame = frame.clone();
        let rotation = rotation.clone();
        let is_spinning = is_spinning.clone();
        let result = result.clone();
        let message = message.clone();
        let cooldown = cooldown.clone();
        let spun_at = spun_at.clone();

        Callback::from(move |_: MouseEvent| {
            let now = js_sys::Date::now();
            let tracker = CooldownTracker::new(LocalStore);
            let remaining = tracker.remaining_ms(now);
            let logged_in = get_auth_token().is_some();
            let started =
                game.borrow_mut()
                    .start_spin(&mut rand::thread_rng(), logged_in, remaining, now);

            match started {
                Ok(plan) => {
                    log::debug!(
                        "Spinning to segment {} with {} extra turns",
                        plan.winning_index,
                        plan.extra_rotations
                    );
                    *spun_at.borrow_mut() = now;
                    // Locks out restarts until the server's answer settles it.
                    if let Err(e) = tracker.start(now) {
                        log::warn!("Could not persist wheel cooldown: {}", e);
                    }
                    cooldown.set(cooldown_secs());
                    message.set(None);
                    result.set(None);
                    is_spinning.set(true);
                    animate(game.clone(), frame.clone(), rotation.clone(), on_done.clone());
                }
                Err(e) if e.is_silent() => log::debug!("Spin ignored: {}", e),
                Err(e) => message.set(Some(e.to_string())),
            }
        })
    };

    html! {
        <div class="container mx-auto px-4 py-8">
            <h1 class="text-3xl font-bold mb-6 text-center text-gray-900 dark:text-white">
                <span class="bg-clip-text text-transparent bg-gradient-to-r from-yellow-400 to-orange-500">{"Wheel of Whiskers"}</span>
            </h1>

            <div class="bg-white dark:bg-gray-800 p-6 sm:p-8 rounded-2xl shadow-xl max-w-2xl mx-auto border border-gray-100 dark:border-gray-700">
                <div class="relative mx-auto mb-8 flex justify-center items-center">
                    <div class="w-full max-w-[450px] mx-auto">
                        <WheelCanvas
                            rotation={*rotation}
                            is_spinning={*is_spinning}
                            segments={game.borrow().segments}
                        />
                    </div>
                </div>

                if let Some(text) = (*message).clone() {
                    <div class="mb-6 text-center">
                        <p class={styles::ALERT_ERROR}>{text}</p>
                    </div>
                }

                <div class="flex justify-center mt-4">
                    <div class="w-full max-w-[300px]">
                        <SpinButton
                            is_spinning={*is_spinning}
                            cooldown_seconds={*cooldown}
                            onclick={start_spin}
                        />
                    </div>
                </div>

                <ResultDisplay result={*result} />

                <p class={classes!(styles::TEXT_SMALL, "mt-6", "text-center")}>
                    {"Win a cursor, a new café colour, yarn or a nickname. One spin every two minutes."}
                </p>
            </div>
        </div>
    }
}
