use yew::prelude::*;

use crate::rewards::RewardManager;

/// Runs the reward manager for as long as the calling component is mounted.
/// Mount it once, near the root.
#[hook]
pub fn use_reward_manager() {
    let manager = use_mut_ref(|| None::<RewardManager>);

    use_effect_with((), move |_| {
        *manager.borrow_mut() = Some(RewardManager::start());

        move || {
            // Dropping reverts every effect and cancels all timers.
            let stopped = manager.borrow_mut().take();
            drop(stopped);
        }
    });
}
