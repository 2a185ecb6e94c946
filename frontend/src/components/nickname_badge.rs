use yew::prelude::*;

use crate::hooks::use_nickname;
use crate::storage::current_identity;

/// Shows the signed-in name, or the nickname won on the wheel while it lasts.
#[function_component(NicknameBadge)]
pub fn nickname_badge() -> Html {
    let nickname = use_nickname();
    let name = nickname
        .clone()
        .or_else(|| current_identity().map(|identity| identity.user_name));

    match name {
        Some(name) => html! {
            <span class="text-sm font-medium text-gray-700 dark:text-gray-300">
                if nickname.is_some() { {"🎀 "} }
                {name}
            </span>
        },
        None => html! {},
    }
}
