use web_sys::window;
use yew::prelude::*;
use yew_router::prelude::*;

use crate::components::NicknameBadge;
use crate::{styles, Route};

const THEME_KEY: &str = "theme";

#[derive(Properties, PartialEq)]
pub struct BaseProps {
    pub children: Html,
}

fn stored_dark_mode() -> bool {
    window()
        .and_then(|w| w.local_storage().ok().flatten())
        .and_then(|s| s.get_item(THEME_KEY).ok().flatten())
        .map_or(true, |theme| theme == "dark")
}

fn store_theme(dark_mode: bool) {
    if let Some(storage) = window().and_then(|w| w.local_storage().ok().flatten()) {
        let _ = storage.set_item(THEME_KEY, if dark_mode { "dark" } else { "light" });
    }
}

#[function_component(Base)]
pub fn base(props: &BaseProps) -> Html {
    let dark_mode = use_state(stored_dark_mode);

    let toggle_theme = {
        let dark_mode = dark_mode.clone();
        Callback::from(move |_: MouseEvent| {
            let next = !*dark_mode;
            store_theme(next);
            dark_mode.set(next);
        })
    };

    let theme_icon = if *dark_mode { "☀️" } else { "🌙" };

    html! {
        <div class={if *dark_mode { "dark h-full bg-gray-900" } else { "h-full bg-gray-50" }}>
            <nav class={styles::NAV}>
                <div class="w-full mx-auto px-4 sm:px-6 lg:px-8">
                    <div class="h-16 flex items-center justify-between">
                        <div class="flex items-center">
                            <Link<Route> to={Route::Home} classes={styles::NAV_BRAND}>{"Cat Cafe"}</Link<Route>>
                        </div>
                        <div class={styles::NAV_ITEMS}>
                            <Link<Route> to={Route::Home} classes={styles::NAV_LINK}>{"Cafe"}</Link<Route>>
                            <Link<Route> to={Route::Wheel} classes={styles::NAV_LINK}>{"Wheel"}</Link<Route>>
                            <NicknameBadge />
                            <button onclick={toggle_theme} class={styles::BUTTON_ICON}>{theme_icon}</button>
                        </div>
                    </div>
                </div>
            </nav>
            <main class="pt-16">{props.children.clone()}</main>
        </div>
    }
}
