use yew::prelude::*;

use crate::components::CatWidget;
use crate::styles;

#[function_component(Home)]
pub fn home() -> Html {
    html! {
        <div class={styles::CONTAINER_LG}>
            <div class="text-center mb-8">
                <h1 class={styles::TEXT_H1}>{"Welcome to the Cat Cafe"}</h1>
                <p class={classes!(styles::TEXT_BODY, "mt-2")}>
                    {"One cat, shared by everyone in the room. Be gentle."}
                </p>
            </div>
            <div class="max-w-2xl mx-auto">
                <CatWidget />
            </div>
        </div>
    }
}
