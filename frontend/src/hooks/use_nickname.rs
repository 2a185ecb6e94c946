use shared::constants::NICKNAME_UPDATE_EVENT;
use shared::shared_rewards::NicknameUpdate;
use yew::prelude::*;

use crate::bus;

/// Nickname won on the wheel, if one is active.
#[hook]
pub fn use_nickname() -> Option<String> {
    let nickname = use_state(|| None::<String>);

    {
        let nickname = nickname.clone();
        use_effect_with((), move |_| {
            let listener = bus::listen(NICKNAME_UPDATE_EVENT, move |update: NicknameUpdate| {
                nickname.set(update.nickname);
            });
            move || drop(listener)
        });
    }

    (*nickname).clone()
}
