use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};

use gloo::events::EventListener;
use gloo_timers::callback::Timeout;
use js_sys::{Array, Function, Reflect};
use shared::shared_effects::{RenderSurface, StyleTarget};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{window, Document, HtmlElement, MutationObserver, MutationObserverInit};

fn document() -> Option<Document> {
    window().and_then(|w| w.document())
}

fn target_element(target: StyleTarget) -> Option<HtmlElement> {
    let document = document()?;
    match target {
        StyleTarget::Root => document
            .document_element()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok()),
        StyleTarget::Body => document.body(),
    }
}

/// The live page. Every DOM call is best effort; failures are logged at
/// debug level and otherwise ignored.
#[derive(Default)]
pub struct DomSurface {
    navigation: Rc<NavigationHub>,
    /// What we last wrote per inline slot, and how the browser serialised it.
    written: RefCell<HashMap<(StyleTarget, String), (String, String)>>,
}

impl DomSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

pub enum DomSubscription {
    Observer(ObserverHandle),
    Navigation(NavigationHandle),
    Inert,
}

pub struct ObserverHandle {
    observer: MutationObserver,
    _callback: Closure<dyn FnMut(Array, MutationObserver)>,
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

pub struct NavigationHandle {
    hub: Rc<NavigationHub>,
    id: usize,
}

impl Drop for NavigationHandle {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}

impl RenderSurface for DomSurface {
    type Subscription = DomSubscription;

    fn upsert_style_rule(&self, id: &str, css: &str) {
        let Some(document) = document() else {
            return;
        };
        let style = match document.get_element_by_id(id) {
            Some(existing) => existing,
            None => {
                let Ok(style) = document.create_element("style") else {
                    return;
                };
                style.set_id(id);
                match document.head() {
                    Some(head) => {
                        let _ = head.append_child(&style);
                    }
                    None => return,
                }
                style
            }
        };
        style.set_text_content(Some(css));
    }

    fn remove_style_rule(&self, id: &str) {
        if let Some(style) = document().and_then(|d| d.get_element_by_id(id)) {
            style.remove();
        }
    }

    fn inline_value(&self, target: StyleTarget, property: &str) -> Option<String> {
        let element = target_element(target)?;
        let current = element.style().get_property_value(property).ok()?;
        if current.is_empty() {
            return None;
        }
        // Browsers re-serialise values (quotes in url(...), spacing); map our
        // own write back to what we asked for.
        match self.written.borrow().get(&(target, property.to_string())) {
            Some((ours, serialised)) if *serialised == current => Some(ours.clone()),
            _ => Some(current),
        }
    }

    fn set_inline(&self, target: StyleTarget, property: &str, value: &str) {
        let Some(element) = target_element(target) else {
            return;
        };
        let style = element.style();
        if let Err(e) = style.set_property_with_priority(property, value, "important") {
            log::debug!("Could not set inline {}: {:?}", property, e);
            return;
        }
        let serialised = style.get_property_value(property).unwrap_or_default();
        self.written.borrow_mut().insert(
            (target, property.to_string()),
            (value.to_string(), serialised),
        );
    }

    fn clear_inline(&self, target: StyleTarget, property: &str) {
        self.written
            .borrow_mut()
            .remove(&(target, property.to_string()));
        if let Some(element) = target_element(target) {
            let _ = element.style().remove_property(property);
        }
    }

    fn clear_inline_everywhere(&self, property: &str) {
        let Some(document) = document() else {
            return;
        };
        let Ok(nodes) = document.query_selector_all("[style]") else {
            return;
        };
        for i in 0..nodes.length() {
            if let Some(element) = nodes.item(i).and_then(|n| n.dyn_into::<HtmlElement>().ok()) {
                let _ = element.style().remove_property(property);
            }
        }
    }

    fn on_structural_change(
        &self,
        watched_attributes: &[&str],
        callback: Rc<dyn Fn()>,
    ) -> DomSubscription {
        let Some(root) = document().and_then(|d| d.document_element()) else {
            return DomSubscription::Inert;
        };

        let closure = Closure::wrap(Box::new(move |_records: Array, _observer: MutationObserver| {
            callback();
        }) as Box<dyn FnMut(Array, MutationObserver)>);

        let observer = match MutationObserver::new(closure.as_ref().unchecked_ref()) {
            Ok(observer) => observer,
            Err(e) => {
                log::debug!("MutationObserver unavailable: {:?}", e);
                return DomSubscription::Inert;
            }
        };

        let filter: Array = watched_attributes
            .iter()
            .map(|name| JsValue::from_str(name))
            .collect();
        let options = MutationObserverInit::new();
        options.set_child_list(true);
        options.set_subtree(true);
        options.set_attributes(true);
        options.set_attribute_filter(&filter);

        if let Err(e) = observer.observe_with_options(&root, &options) {
            log::debug!("Could not observe document: {:?}", e);
            return DomSubscription::Inert;
        }

        DomSubscription::Observer(ObserverHandle {
            observer,
            _callback: closure,
        })
    }

    fn on_navigate(&self, settle_ms: u32, callback: Rc<dyn Fn()>) -> DomSubscription {
        let id = self.navigation.subscribe(settle_ms, callback);
        DomSubscription::Navigation(NavigationHandle {
            hub: Rc::clone(&self.navigation),
            id,
        })
    }
}

// === Navigation ===

type NavWrapper = Closure<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>;

/// Wraps `history.pushState`/`replaceState` and listens for `popstate` while
/// anyone is subscribed. One patch is shared by all subscribers so wrappers
/// never stack.
#[derive(Default)]
struct NavigationHub {
    listeners: RefCell<BTreeMap<usize, (u32, Rc<dyn Fn()>)>>,
    pending: RefCell<HashMap<usize, Timeout>>,
    next_id: Cell<usize>,
    patch: RefCell<Option<HistoryPatch>>,
}

impl NavigationHub {
    fn subscribe(self: &Rc<Self>, settle_ms: u32, callback: Rc<dyn Fn()>) -> usize {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().insert(id, (settle_ms, callback));

        if self.patch.borrow().is_none() {
            let patch = HistoryPatch::install(Rc::downgrade(self));
            *self.patch.borrow_mut() = patch;
        }
        id
    }

    fn unsubscribe(&self, id: usize) {
        self.listeners.borrow_mut().remove(&id);
        self.pending.borrow_mut().remove(&id);
        if self.listeners.borrow().is_empty() {
            // Dropping the patch restores the original history functions.
            let patch = self.patch.borrow_mut().take();
            drop(patch);
        }
    }

    fn navigated(self: &Rc<Self>) {
        let listeners: Vec<_> = self
            .listeners
            .borrow()
            .iter()
            .map(|(id, (settle, cb))| (*id, *settle, Rc::clone(cb)))
            .collect();
        for (id, settle_ms, callback) in listeners {
            // Restarting the timeout debounces bursts of route changes.
            let timeout = Timeout::new(settle_ms, move || callback());
            self.pending.borrow_mut().insert(id, timeout);
        }
    }
}

struct HistoryPatch {
    history: web_sys::History,
    original_push: Function,
    original_replace: Function,
    _push: NavWrapper,
    _replace: NavWrapper,
    _popstate: EventListener,
}

impl HistoryPatch {
    fn install(hub: Weak<NavigationHub>) -> Option<Self> {
        let window = window()?;
        let history = window.history().ok()?;
        let original_push = Reflect::get(&history, &JsValue::from_str("pushState"))
            .ok()?
            .dyn_into::<Function>()
            .ok()?;
        let original_replace = Reflect::get(&history, &JsValue::from_str("replaceState"))
            .ok()?
            .dyn_into::<Function>()
            .ok()?;

        let push = wrap_history_fn(&history, &original_push, hub.clone());
        let replace = wrap_history_fn(&history, &original_replace, hub.clone());
        let _ = Reflect::set(&history, &JsValue::from_str("pushState"), push.as_ref());
        let _ = Reflect::set(&history, &JsValue::from_str("replaceState"), replace.as_ref());

        let popstate = EventListener::new(&window, "popstate", move |_| {
            if let Some(hub) = hub.upgrade() {
                hub.navigated();
            }
        });

        Some(Self {
            history,
            original_push,
            original_replace,
            _push: push,
            _replace: replace,
            _popstate: popstate,
        })
    }
}

impl Drop for HistoryPatch {
    fn drop(&mut self) {
        let _ = Reflect::set(
            &self.history,
            &JsValue::from_str("pushState"),
            &self.original_push,
        );
        let _ = Reflect::set(
            &self.history,
            &JsValue::from_str("replaceState"),
            &self.original_replace,
        );
    }
}

fn wrap_history_fn(
    history: &web_sys::History,
    original: &Function,
    hub: Weak<NavigationHub>,
) -> NavWrapper {
    let history = history.clone();
    let original = original.clone();
    Closure::wrap(Box::new(move |state: JsValue, title: JsValue, url: JsValue| {
        let result = original
            .call3(&history, &state, &title, &url)
            .unwrap_or(JsValue::UNDEFINED);
        if let Some(hub) = hub.upgrade() {
            hub.navigated();
        }
        result
    }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>)
}
