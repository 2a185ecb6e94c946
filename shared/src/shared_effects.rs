//! Global visual overrides (custom pointer glyph, page-wide hue rotation).
//!
//! An [`EffectStore`] owns one effect kind. It writes a stylesheet rule, an
//! inline fallback on the root and body elements, and keeps both asserted
//! across DOM churn and route changes through a [`RenderSurface`]. Removal
//! drops the subscriptions and scrubs every trace.

use std::rc::Rc;

use crate::constants::NAVIGATION_SETTLE_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EffectKind {
    Cursor,
    Color,
}

impl EffectKind {
    pub fn style_id(&self) -> &'static str {
        match self {
            Self::Cursor => "cat-cafe-cursor-effect",
            Self::Color => "cat-cafe-color-effect",
        }
    }

    pub fn css_property(&self) -> &'static str {
        match self {
            Self::Cursor => "cursor",
            Self::Color => "filter",
        }
    }

    /// Elements that carry the inline fallback. Filters compose, so the hue
    /// rotation only goes on the root or it would be applied twice.
    pub fn inline_targets(&self) -> &'static [StyleTarget] {
        match self {
            Self::Cursor => &[StyleTarget::Root, StyleTarget::Body],
            Self::Color => &[StyleTarget::Root],
        }
    }

    pub fn css_rule(&self, value: &str) -> String {
        match self {
            Self::Cursor => format!(
                "html, body, body *, body *::before, body *::after {{ cursor: {} !important; }}",
                value
            ),
            Self::Color => format!("html {{ filter: {} !important; }}", value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleTarget {
    Root,
    Body,
}

/// Attributes whose changes can clobber an inline override.
pub const WATCHED_ATTRIBUTES: &[&str] = &["style", "class"];

/// The page an effect is drawn on. Implementations must not panic; platform
/// failures are swallowed.
pub trait RenderSurface {
    /// Dropping the subscription unhooks its callback.
    type Subscription;

    fn upsert_style_rule(&self, id: &str, css: &str);
    fn remove_style_rule(&self, id: &str);

    fn inline_value(&self, target: StyleTarget, property: &str) -> Option<String>;
    fn set_inline(&self, target: StyleTarget, property: &str, value: &str);
    fn clear_inline(&self, target: StyleTarget, property: &str);
    /// Clears `property` from every mounted element's inline style.
    fn clear_inline_everywhere(&self, property: &str);

    /// Fires when nodes are inserted or a watched attribute changes.
    fn on_structural_change(
        &self,
        watched_attributes: &[&str],
        callback: Rc<dyn Fn()>,
    ) -> Self::Subscription;

    /// Fires `settle_ms` after each client-side route change.
    fn on_navigate(&self, settle_ms: u32, callback: Rc<dyn Fn()>) -> Self::Subscription;
}

struct ActiveEffect<S: RenderSurface> {
    value: String,
    _observer: S::Subscription,
    _navigation: S::Subscription,
}

pub struct EffectStore<S: RenderSurface + 'static> {
    kind: EffectKind,
    surface: Rc<S>,
    active: Option<ActiveEffect<S>>,
}

impl<S: RenderSurface + 'static> EffectStore<S> {
    pub fn new(kind: EffectKind, surface: Rc<S>) -> Self {
        Self {
            kind,
            surface,
            active: None,
        }
    }

    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    pub fn active_value(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.value.as_str())
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Returns false when `value` is already applied.
    pub fn apply(&mut self, value: &str) -> bool {
        if self.active_value() == Some(value) {
            return false;
        }
        if self.active.is_some() {
            self.remove();
        }

        let kind = self.kind;
        self.surface
            .upsert_style_rule(kind.style_id(), &kind.css_rule(value));
        reassert_inline(self.surface.as_ref(), kind, value);

        let reassert: Rc<dyn Fn()> = {
            let surface = Rc::clone(&self.surface);
            let value = value.to_string();
            Rc::new(move || reassert_inline(surface.as_ref(), kind, &value))
        };
        let observer = self
            .surface
            .on_structural_change(WATCHED_ATTRIBUTES, Rc::clone(&reassert));
        let navigation = self.surface.on_navigate(NAVIGATION_SETTLE_MS, reassert);

        log::info!("Applied {:?} effect: {}", kind, value);
        self.active = Some(ActiveEffect {
            value: value.to_string(),
            _observer: observer,
            _navigation: navigation,
        });
        true
    }

    /// Returns false when nothing was active.
    pub fn remove(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        // Unhook first so the scrub below is not re-asserted.
        drop(active);

        let kind = self.kind;
        let property = kind.css_property();
        self.surface.remove_style_rule(kind.style_id());
        for target in kind.inline_targets() {
            self.surface.clear_inline(*target, property);
        }
        self.surface.clear_inline_everywhere(property);
        log::info!("Removed {:?} effect", kind);
        true
    }
}

impl<S: RenderSurface + 'static> Drop for EffectStore<S> {
    fn drop(&mut self) {
        self.remove();
    }
}

// Writing an unchanged value would itself be observed as an attribute change.
fn reassert_inline<S: RenderSurface + ?Sized>(surface: &S, kind: EffectKind, value: &str) {
    let property = kind.css_property();
    for target in kind.inline_targets() {
        if surface.inline_value(*target, property).as_deref() != Some(value) {
            surface.set_inline(*target, property, value);
        }
    }
}

// === Effect payloads ===

/// Pointer glyph drawn from a short text (usually an emoji) as an SVG cursor.
/// This is also the fallback when an image glyph fails to load.
pub fn text_cursor_css(glyph: &str) -> String {
    let svg = format!(
        "<svg xmlns='http://www.w3.org/2000/svg' width='32' height='32'><text x='4' y='26' font-size='24'>{}</text></svg>",
        glyph
    );
    format!(
        "url(\"data:image/svg+xml;utf8,{}\") 16 16, auto",
        urlencoding::encode(&svg)
    )
}

pub fn image_cursor_css(data_url: &str) -> String {
    format!("url(\"{}\") 16 16, auto", data_url)
}

pub fn looks_like_image_url(value: &str) -> bool {
    value.starts_with("http://")
        || value.starts_with("https://")
        || value.starts_with("data:image/")
        || value.starts_with('/')
}

const NAMED_HUES: &[(&str, i32)] = &[
    ("red", 0),
    ("orange", 30),
    ("yellow", 60),
    ("green", 120),
    ("cyan", 180),
    ("blue", 240),
    ("purple", 270),
    ("pink", 320),
];

/// Filter value for a colour reward. Accepts a hue in degrees, a colour name
/// or a ready-made filter expression.
pub fn color_filter_css(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().map(|deg| format!("hue-rotate({}deg)", deg)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            if let Ok(deg) = s.trim_end_matches("deg").parse::<f64>() {
                return Some(format!("hue-rotate({}deg)", deg));
            }
            if s.contains('(') {
                return Some(s.to_string());
            }
            NAMED_HUES
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(s))
                .map(|(_, deg)| format!("hue-rotate({}deg)", deg))
        }
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    type Hooks = Rc<RefCell<Vec<Option<Rc<dyn Fn()>>>>>;

    /// Records what an effect did to the page.
    #[derive(Default)]
    pub struct RecordingSurface {
        pub rules: RefCell<HashMap<String, String>>,
        pub inline: RefCell<HashMap<(StyleTarget, String), String>>,
        /// Elements other than root/body that carry an inline property.
        pub stray_inline: RefCell<HashMap<String, usize>>,
        pub inline_writes: RefCell<usize>,
        observers: Hooks,
        navigation: Hooks,
    }

    pub struct HookHandle {
        hooks: Hooks,
        slot: usize,
    }

    impl Drop for HookHandle {
        fn drop(&mut self) {
            self.hooks.borrow_mut()[self.slot] = None;
        }
    }

    fn register(hooks: &Hooks, callback: Rc<dyn Fn()>) -> HookHandle {
        let mut list = hooks.borrow_mut();
        list.push(Some(callback));
        HookHandle {
            hooks: Rc::clone(hooks),
            slot: list.len() - 1,
        }
    }

    fn fire(hooks: &Hooks) {
        let live: Vec<_> = hooks.borrow().iter().flatten().cloned().collect();
        for callback in live {
            callback();
        }
    }

    impl RecordingSurface {
        pub fn live_observers(&self) -> usize {
            self.observers.borrow().iter().flatten().count()
        }

        pub fn live_navigation_hooks(&self) -> usize {
            self.navigation.borrow().iter().flatten().count()
        }

        pub fn mutate_dom(&self) {
            fire(&self.observers);
        }

        pub fn navigate(&self) {
            fire(&self.navigation);
        }

        pub fn inline(&self, target: StyleTarget, property: &str) -> Option<String> {
            self.inline
                .borrow()
                .get(&(target, property.to_string()))
                .cloned()
        }

        pub fn is_neutral(&self) -> bool {
            self.rules.borrow().is_empty()
                && self.inline.borrow().is_empty()
                && self.stray_inline.borrow().values().all(|n| *n == 0)
                && self.live_observers() == 0
                && self.live_navigation_hooks() == 0
        }
    }

    impl RenderSurface for RecordingSurface {
        type Subscription = HookHandle;

        fn upsert_style_rule(&self, id: &str, css: &str) {
            self.rules.borrow_mut().insert(id.to_string(), css.to_string());
        }

        fn remove_style_rule(&self, id: &str) {
            self.rules.borrow_mut().remove(id);
        }

        fn inline_value(&self, target: StyleTarget, property: &str) -> Option<String> {
            self.inline(target, property)
        }

        fn set_inline(&self, target: StyleTarget, property: &str, value: &str) {
            *self.inline_writes.borrow_mut() += 1;
            self.inline
                .borrow_mut()
                .insert((target, property.to_string()), value.to_string());
        }

        fn clear_inline(&self, target: StyleTarget, property: &str) {
            self.inline
                .borrow_mut()
                .remove(&(target, property.to_string()));
        }

        fn clear_inline_everywhere(&self, property: &str) {
            self.inline.borrow_mut().retain(|(_, p), _| p != property);
            self.stray_inline.borrow_mut().remove(property);
        }

        fn on_structural_change(
            &self,
            _watched_attributes: &[&str],
            callback: Rc<dyn Fn()>,
        ) -> HookHandle {
            register(&self.observers, callback)
        }

        fn on_navigate(&self, _settle_ms: u32, callback: Rc<dyn Fn()>) -> HookHandle {
            register(&self.navigation, callback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingSurface;
    use super::*;
    use serde_json::json;

    fn cursor_store() -> (Rc<RecordingSurface>, EffectStore<RecordingSurface>) {
        let surface = Rc::new(RecordingSurface::default());
        let store = EffectStore::new(EffectKind::Cursor, Rc::clone(&surface));
        (surface, store)
    }

    #[test]
    fn test_apply_writes_rule_and_inline_fallback() {
        let (surface, mut store) = cursor_store();
        assert!(store.apply("crosshair"));

        let rule = surface.rules.borrow().get("cat-cafe-cursor-effect").cloned();
        assert!(rule.unwrap().contains("cursor: crosshair !important"));
        assert_eq!(surface.inline(StyleTarget::Root, "cursor").as_deref(), Some("crosshair"));
        assert_eq!(surface.inline(StyleTarget::Body, "cursor").as_deref(), Some("crosshair"));
        assert_eq!(surface.live_observers(), 1);
        assert_eq!(surface.live_navigation_hooks(), 1);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let (surface, mut store) = cursor_store();
        store.apply("crosshair");
        let rules = surface.rules.borrow().clone();
        let inline = surface.inline.borrow().clone();

        assert!(!store.apply("crosshair"));
        assert_eq!(*surface.rules.borrow(), rules);
        assert_eq!(*surface.inline.borrow(), inline);
        assert_eq!(surface.live_observers(), 1);
        assert_eq!(surface.live_navigation_hooks(), 1);
    }

    #[test]
    fn test_remove_after_apply_is_neutral() {
        let (surface, mut store) = cursor_store();
        store.apply("crosshair");
        surface
            .stray_inline
            .borrow_mut()
            .insert("cursor".to_string(), 3);

        assert!(store.remove());
        assert!(surface.is_neutral());
        assert!(!store.is_active());
    }

    #[test]
    fn test_remove_without_effect_is_noop() {
        let (surface, mut store) = cursor_store();
        assert!(!store.remove());
        assert!(surface.is_neutral());
    }

    #[test]
    fn test_new_payload_replaces_previous_effect() {
        let (surface, mut store) = cursor_store();
        store.apply("crosshair");
        assert!(store.apply("wait"));
        assert_eq!(store.active_value(), Some("wait"));
        assert_eq!(surface.inline(StyleTarget::Body, "cursor").as_deref(), Some("wait"));
        assert_eq!(surface.live_observers(), 1);
        assert_eq!(surface.live_navigation_hooks(), 1);
        assert_eq!(surface.rules.borrow().len(), 1);
    }

    #[test]
    fn test_dom_churn_and_navigation_reassert_inline() {
        let (surface, mut store) = cursor_store();
        store.apply("crosshair");

        surface.clear_inline(StyleTarget::Body, "cursor");
        surface.mutate_dom();
        assert_eq!(surface.inline(StyleTarget::Body, "cursor").as_deref(), Some("crosshair"));

        surface.set_inline(StyleTarget::Root, "cursor", "default");
        surface.navigate();
        assert_eq!(surface.inline(StyleTarget::Root, "cursor").as_deref(), Some("crosshair"));
    }

    #[test]
    fn test_reassert_skips_unchanged_values() {
        let (surface, mut store) = cursor_store();
        store.apply("crosshair");
        let writes = *surface.inline_writes.borrow();
        surface.mutate_dom();
        surface.navigate();
        assert_eq!(*surface.inline_writes.borrow(), writes);
    }

    #[test]
    fn test_hooks_gone_after_remove() {
        let (surface, mut store) = cursor_store();
        store.apply("crosshair");
        store.remove();
        surface.mutate_dom();
        surface.navigate();
        assert!(surface.is_neutral());
    }

    #[test]
    fn test_drop_reverts_effect() {
        let surface = Rc::new(RecordingSurface::default());
        {
            let mut store = EffectStore::new(EffectKind::Color, Rc::clone(&surface));
            store.apply("hue-rotate(90deg)");
            assert_eq!(
                surface.inline(StyleTarget::Root, "filter").as_deref(),
                Some("hue-rotate(90deg)")
            );
            assert_eq!(surface.inline(StyleTarget::Body, "filter"), None);
        }
        assert!(surface.is_neutral());
    }

    #[test]
    fn test_color_filter_values() {
        assert_eq!(color_filter_css(&json!(90)).as_deref(), Some("hue-rotate(90deg)"));
        assert_eq!(color_filter_css(&json!("45deg")).as_deref(), Some("hue-rotate(45deg)"));
        assert_eq!(color_filter_css(&json!("Blue")).as_deref(), Some("hue-rotate(240deg)"));
        assert_eq!(
            color_filter_css(&json!("invert(1)")).as_deref(),
            Some("invert(1)")
        );
        assert_eq!(color_filter_css(&json!("plaid")), None);
        assert_eq!(color_filter_css(&json!(true)), None);
    }

    #[test]
    fn test_cursor_payloads() {
        let css = text_cursor_css("🐟");
        assert!(css.starts_with("url(\"data:image/svg+xml;utf8,"));
        assert!(css.ends_with("16 16, auto"));
        assert!(!css.contains('<'));

        assert!(looks_like_image_url("https://cdn.example/fish.png"));
        assert!(looks_like_image_url("/assets/fish.png"));
        assert!(!looks_like_image_url("🐟"));
    }
}
