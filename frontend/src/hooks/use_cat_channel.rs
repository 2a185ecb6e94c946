use std::rc::Rc;

use gloo_timers::callback::Interval;
use shared::constants::CAT_SOCKET_PATH;
use shared::shared_cat_state::{CatStateMirror, MirrorEvent};
use shared::ClientError;
use yew::prelude::*;

use crate::channel::{CatChannel, ChannelUpdate};
use crate::config::get_ws_url;
use crate::storage::current_identity;

pub struct CatChannelHandle {
    pub state: Rc<CatStateMirror>,
    /// Last problem worth showing: a denial, a missing session, a dropped link.
    pub notice: Option<ClientError>,
    /// Re-sampled every second for the rest countdown.
    pub now_ms: f64,
    pub request_rest: Callback<()>,
}

#[hook]
pub fn use_cat_channel() -> CatChannelHandle {
    let state = use_state(|| Rc::new(CatStateMirror::new()));
    let notice = use_state(|| None::<ClientError>);
    let now_ms = use_state(js_sys::Date::now);
    let channel = use_mut_ref(|| None::<CatChannel>);

    {
        let state = state.clone();
        let notice = notice.clone();
        let now_ms = now_ms.clone();
        let channel = channel.clone();

        use_effect_with((), move |_| {
            let on_update = Callback::from(move |update: ChannelUpdate| {
                match &update.event {
                    Some(MirrorEvent::RestDenied(reason)) => {
                        notice.set(Some(ClientError::Denied(reason.clone())));
                    }
                    Some(MirrorEvent::RestStarted(_))
                    | Some(MirrorEvent::RestEnded)
                    | Some(MirrorEvent::RestExpiredLocally) => notice.set(None),
                    _ => {}
                }
                state.set(update.state);
            });

            let connected = CatChannel::connect(get_ws_url(CAT_SOCKET_PATH), on_update);
            *channel.borrow_mut() = Some(connected);

            let ticker = {
                let channel = channel.clone();
                Interval::new(1_000, move || {
                    if let Some(channel) = channel.borrow().as_ref() {
                        channel.tick();
                    }
                    now_ms.set(js_sys::Date::now());
                })
            };

            move || {
                drop(ticker);
                let closed = channel.borrow_mut().take();
                drop(closed);
            }
        });
    }

    let request_rest = {
        let channel = channel.clone();
        let notice = notice.clone();
        Callback::from(move |_| {
            let identity = current_identity();
            let result = match channel.borrow().as_ref() {
                Some(channel) => channel.request_rest(identity.as_ref()),
                None => Err(ClientError::Transport("not connected".to_string())),
            };
            match result {
                Ok(()) => notice.set(None),
                Err(e) => {
                    log::info!("Rest request not sent: {}", e);
                    notice.set(Some(e));
                }
            }
        })
    };

    CatChannelHandle {
        state: (*state).clone(),
        notice: (*notice).clone(),
        now_ms: *now_ms,
        request_rest,
    }
}
