use shared::shared_cat_state::{CatMood, ConnectionStatus};
use shared::shared_wheel_game::format_time;
use yew::prelude::*;

use crate::components::activity_log::ActivityLog;
use crate::hooks::use_cat_channel;
use crate::styles;

fn status_badge(status: ConnectionStatus) -> Html {
    let (label, dot) = match status {
        ConnectionStatus::Connected => ("Live", "bg-green-500"),
        ConnectionStatus::Connecting => ("Connecting...", "bg-yellow-400 animate-pulse"),
        ConnectionStatus::Disconnected => ("Reconnecting...", "bg-red-500"),
    };
    html! {
        <span class={classes!(styles::TEXT_SMALL, "inline-flex", "items-center", "gap-2")}>
            <span class={classes!("w-2", "h-2", "rounded-full", dot)}></span>
            {label}
        </span>
    }
}

/// The shared cafe cat: mood, rest countdown and the activity feed.
#[function_component(CatWidget)]
pub fn cat_widget() -> Html {
    let channel = use_cat_channel();
    let state = channel.state.clone();
    let mood = state.mood();
    let remaining_ms = state.rest_remaining_ms(channel.now_ms);
    let locked = state.rest_lock().is_some();
    let connected = state.status() == ConnectionStatus::Connected;

    let on_rest = {
        let request_rest = channel.request_rest.clone();
        Callback::from(move |_: MouseEvent| request_rest.emit(()))
    };

    let rest_line = match state.rest_lock() {
        Some(lock) => html! {
            <p class={styles::TEXT_BODY}>
                {format!(
                    "{} put the cat to sleep. Waking in {}",
                    lock.holder_name,
                    format_time((remaining_ms / 1000.0).ceil() as i64)
                )}
            </p>
        },
        _ if mood == CatMood::Sleeping => html! {
            <p class={styles::TEXT_BODY}>{"Waking up..."}</p>
        },
        _ => html! {},
    };

    html! {
        <div class={styles::CARD}>
            <div class="flex items-center justify-between mb-4">
                <h2 class={styles::TEXT_H2}>{"The Cafe Cat"}</h2>
                { status_badge(state.status()) }
            </div>

            <div class="flex flex-col items-center gap-2 py-6">
                <span class="text-7xl" aria-hidden="true">{mood.emoji()}</span>
                <span class={styles::TEXT_H3}>{mood.label()}</span>
                { rest_line }
            </div>

            if let Some(notice) = &channel.notice {
                <div class={classes!(styles::ALERT_WARNING, "text-center")}>
                    {notice.to_string()}
                </div>
            }

            <div class="flex justify-center mb-6">
                <button
                    class={styles::BUTTON_PRIMARY}
                    onclick={on_rest}
                    disabled={locked || !connected}
                >
                    {"Put the cat to sleep"}
                </button>
            </div>

            <ActivityLog entries={state.logs().to_vec()} />
        </div>
    }
}
