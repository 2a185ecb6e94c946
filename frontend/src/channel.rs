use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use futures::lock::Mutex;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use gloo_net::websocket::{futures::WebSocket, Message};
use gloo_timers::callback::Timeout;
use log::{debug, error, info, warn};
use shared::shared_cat_state::{
    Backoff, CatIdentity, CatStateMirror, ClientMessage, MirrorEvent, ServerMessage,
};
use shared::ClientError;
use yew::Callback;

type Writer = Rc<Mutex<SplitSink<WebSocket, Message>>>;

/// Snapshot handed to the view after every change.
#[derive(Clone, PartialEq)]
pub struct ChannelUpdate {
    pub state: Rc<CatStateMirror>,
    pub event: Option<MirrorEvent>,
}

struct ChannelInner {
    url: String,
    mirror: RefCell<CatStateMirror>,
    writer: RefCell<Option<Writer>>,
    /// Bumped on every connection attempt; stale reader loops see a newer
    /// value and exit instead of delivering duplicate events.
    generation: Cell<u64>,
    backoff: RefCell<Backoff>,
    reconnect: RefCell<Option<Timeout>>,
    closed: Cell<bool>,
    on_update: Callback<ChannelUpdate>,
}

/// Long-lived connection to the shared cat. Dropping it closes the socket and
/// stops reconnecting.
pub struct CatChannel {
    inner: Rc<ChannelInner>,
}

impl CatChannel {
    pub fn connect(url: String, on_update: Callback<ChannelUpdate>) -> Self {
        let inner = Rc::new(ChannelInner {
            url,
            mirror: RefCell::new(CatStateMirror::new()),
            writer: RefCell::new(None),
            generation: Cell::new(0),
            backoff: RefCell::new(Backoff::default()),
            reconnect: RefCell::new(None),
            closed: Cell::new(false),
            on_update,
        });
        open(&inner);
        Self { inner }
    }

    pub fn request_rest(&self, identity: Option<&CatIdentity>) -> Result<(), ClientError> {
        let message = self
            .inner
            .mirror
            .borrow()
            .request_rest(identity, js_sys::Date::now())?;
        send(&self.inner, message)
    }

    /// Drives the display countdown's safety net.
    pub fn tick(&self) {
        let event = self.inner.mirror.borrow_mut().tick(js_sys::Date::now());
        if event.is_some() {
            notify(&self.inner, event);
        }
    }
}

impl Drop for CatChannel {
    fn drop(&mut self) {
        info!("Closing cat channel");
        self.inner.closed.set(true);
        self.inner.generation.set(self.inner.generation.get() + 1);
        self.inner.reconnect.borrow_mut().take();
        if let Some(writer) = self.inner.writer.borrow_mut().take() {
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(e) = writer.lock().await.close().await {
                    debug!("Error closing WebSocket: {:?}", e);
                }
            });
        }
    }
}

fn notify(inner: &ChannelInner, event: Option<MirrorEvent>) {
    let state = Rc::new(inner.mirror.borrow().clone());
    inner.on_update.emit(ChannelUpdate { state, event });
}

fn send(inner: &ChannelInner, message: ClientMessage) -> Result<(), ClientError> {
    let writer = inner
        .writer
        .borrow()
        .clone()
        .ok_or_else(|| ClientError::Transport("not connected".to_string()))?;
    let text = message.to_text()?;
    debug!("-> {}", text);
    wasm_bindgen_futures::spawn_local(async move {
        if let Err(e) = writer.lock().await.send(Message::Text(text)).await {
            error!("Failed to send cat message: {:?}", e);
        }
    });
    Ok(())
}

fn open(inner: &Rc<ChannelInner>) {
    if inner.closed.get() {
        return;
    }
    let generation = inner.generation.get() + 1;
    inner.generation.set(generation);
    inner.mirror.borrow_mut().on_connecting();
    notify(inner, None);

    info!("Connecting to cat channel at {}", inner.url);
    let ws = match WebSocket::open(&inner.url) {
        Ok(ws) => ws,
        Err(e) => {
            warn!("Cat channel connect error: {:?}", e);
            connection_lost(inner, generation);
            return;
        }
    };

    let (write, mut read) = ws.split();
    let writer: Writer = Rc::new(Mutex::new(write));
    *inner.writer.borrow_mut() = Some(writer.clone());

    // Snapshot requests are re-issued on every connect.
    let requests = inner.mirror.borrow().handshake();
    let weak = Rc::downgrade(inner);
    wasm_bindgen_futures::spawn_local(async move {
        let mut ws_write = writer.lock().await;
        for request in requests {
            let text = match request.to_text() {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to encode {:?}: {}", request, e);
                    continue;
                }
            };
            if let Err(e) = ws_write.send(Message::Text(text)).await {
                warn!("Cat channel handshake failed: {:?}", e);
                drop(ws_write);
                if let Some(inner) = weak.upgrade() {
                    connection_lost(&inner, generation);
                }
                return;
            }
        }
        if let Some(inner) = weak.upgrade() {
            if inner.generation.get() == generation {
                info!("Cat channel connected");
                inner.mirror.borrow_mut().on_connected();
                inner.backoff.borrow_mut().reset();
                notify(&inner, None);
            }
        }
    });

    let weak: Weak<ChannelInner> = Rc::downgrade(inner);
    wasm_bindgen_futures::spawn_local(async move {
        while let Some(msg) = read.next().await {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.generation.get() != generation {
                return;
            }
            match msg {
                Ok(Message::Text(text)) => match ServerMessage::parse(&text) {
                    Ok(message) => {
                        debug!("<- {:?}", message);
                        let event = inner.mirror.borrow_mut().apply(message);
                        if let MirrorEvent::RestDenied(reason) = &event {
                            info!("Rest request denied: {}", reason);
                        }
                        notify(&inner, Some(event));
                    }
                    Err(e) => warn!("Ignoring cat message: {}", e),
                },
                Ok(Message::Bytes(_)) => {}
                Err(e) => {
                    warn!("Cat channel error: {:?}", e);
                    break;
                }
            }
        }
        debug!("Cat channel stream ended");
        if let Some(inner) = weak.upgrade() {
            connection_lost(&inner, generation);
        }
    });
}

fn connection_lost(inner: &Rc<ChannelInner>, generation: u64) {
    if inner.closed.get() || inner.generation.get() != generation {
        return;
    }
    // Invalidate this connection so its loops stand down.
    inner.generation.set(generation + 1);
    inner.writer.borrow_mut().take();
    inner.mirror.borrow_mut().on_disconnected();
    notify(inner, None);

    let delay = inner.backoff.borrow_mut().next_delay_ms();
    info!("Cat channel disconnected, retrying in {}ms", delay);
    let weak = Rc::downgrade(inner);
    let timeout = Timeout::new(delay, move || {
        if let Some(inner) = weak.upgrade() {
            open(&inner);
        }
    });
    *inner.reconnect.borrow_mut() = Some(timeout);
}
