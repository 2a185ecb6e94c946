pub mod api;
pub mod base;
pub mod bus;
pub mod channel;
pub mod components;
pub mod config;
pub mod effects;
pub mod hooks;
pub mod pages;
pub mod rewards;
pub mod storage;
pub mod styles;

use yew::prelude::*;
use yew_router::prelude::*;

use crate::base::Base;
use crate::hooks::use_reward_manager;
use crate::pages::{home::Home, wheel::CatWheel};

#[derive(Clone, Routable, PartialEq)]
pub enum Route {
    #[at("/")]
    Home,
    #[at("/wheel")]
    Wheel,
    #[not_found]
    #[at("/404")]
    NotFound,
}

#[function_component(App)]
pub fn app() -> Html {
    // Reward effects follow the user across every page.
    use_reward_manager();

    html! {
        <BrowserRouter>
            // Mounted once so the header outlives route changes.
            <Base>
                <div class="min-h-screen w-full">
                    <div class="mx-auto">
                        <Switch<Route> render={switch} />
                    </div>
                </div>
            </Base>
        </BrowserRouter>
    }
}

pub fn switch(route: Route) -> Html {
    match route {
        Route::Home => html! { <Home /> },
        Route::Wheel => html! { <CatWheel /> },
        Route::NotFound => html! { <Redirect<Route> to={Route::Home} /> },
    }
}
