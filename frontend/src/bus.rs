//! Process-local publish/subscribe over window `CustomEvent`s. Details travel
//! as JSON strings so any serde type can ride the bus.

use gloo::events::EventListener;
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{window, CustomEvent, CustomEventInit};

pub fn dispatch<T: Serialize>(event_name: &str, detail: &T) {
    let Some(window) = window() else {
        return;
    };
    let detail = match serde_json::to_string(detail) {
        Ok(json) => json,
        Err(e) => {
            log::error!("Failed to encode {} detail: {}", event_name, e);
            return;
        }
    };
    let event_init = CustomEventInit::new();
    event_init.set_detail(&JsValue::from_str(&detail));
    if let Ok(event) = CustomEvent::new_with_event_init_dict(event_name, &event_init) {
        let _ = window.dispatch_event(&event);
    }
}

/// Subscribes until the returned listener is dropped. Malformed details are
/// logged and skipped.
pub fn listen<T, F>(event_name: &'static str, callback: F) -> Option<EventListener>
where
    T: DeserializeOwned,
    F: Fn(T) + 'static,
{
    let window = window()?;
    Some(EventListener::new(&window, event_name, move |event| {
        let Some(event) = event.dyn_ref::<CustomEvent>() else {
            return;
        };
        let Some(json) = event.detail().as_string() else {
            return;
        };
        match serde_json::from_str::<T>(&json) {
            Ok(detail) => callback(detail),
            Err(e) => log::warn!("Ignoring malformed {} event: {}", event_name, e),
        }
    }))
}
