use chrono::{DateTime, Local};
use shared::shared_cat_state::LogEntry;
use yew::prelude::*;

use crate::styles;

#[derive(Properties, PartialEq)]
pub struct ActivityLogProps {
    /// Oldest first.
    pub entries: Vec<LogEntry>,
}

fn format_timestamp(timestamp_ms: f64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms as i64)
        .map(|dt| dt.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

#[function_component(ActivityLog)]
pub fn activity_log(props: &ActivityLogProps) -> Html {
    html! {
        <div>
            <h3 class={classes!(styles::CARD_TITLE, "mb-2")}>{"Recent activity"}</h3>
            if props.entries.is_empty() {
                <p class={styles::TEXT_SMALL}>{"Nothing has happened yet."}</p>
            } else {
                <ul class="max-h-64 overflow-y-auto space-y-1">
                    { for props.entries.iter().map(|entry| html! {
                        <li key={entry.id.clone()} class={styles::CARD_TEXT}>
                            <span class="font-mono text-xs mr-2">{format_timestamp(entry.timestamp)}</span>
                            <span class="font-medium">{&entry.actor_name}</span>
                            {" "}
                            {entry.action.describe()}
                        </li>
                    }) }
                </ul>
            }
        </div>
    }
}
