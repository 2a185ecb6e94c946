use shared::shared_wheel_game::{format_time, WheelResult};
use shared::shared_rewards::RewardKind;
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct ResultDisplayProps {
    pub result: Option<WheelResult>,
}

#[function_component(ResultDisplay)]
pub fn result_display(props: &ResultDisplayProps) -> Html {
    let Some(result) = props.result else {
        return html! {};
    };

    let segment = result.segment;
    let (message, gradient_classes) = match segment.reward {
        RewardKind::Cursor => (
            format!("You won the {} {}!", segment.label, segment.value),
            "from-orange-400 to-orange-600 border-orange-300",
        ),
        RewardKind::Color => (
            format!("You won {}! The café changes colour.", segment.label),
            "from-cyan-400 to-cyan-600 border-cyan-300",
        ),
        RewardKind::Yarn => (
            "You won a ball of yarn!".to_string(),
            "from-violet-400 to-violet-600 border-violet-300",
        ),
        RewardKind::Nickname => (
            format!("The cat now calls you {}!", segment.value),
            "from-pink-400 to-pink-600 border-pink-300",
        ),
    };

    html! {
        <div class="mt-8 mb-4 flex flex-col items-center justify-center">
            <div class={classes!(
                "flex",
                "items-center",
                "justify-center",
                "px-6",
                "py-4",
                "rounded-xl",
                "bg-gradient-to-r",
                "text-white",
                "font-bold",
                "text-xl",
                "shadow-lg",
                "border-2",
                "animate-pulse",
                gradient_classes
            )}>
                <span>{message}</span>
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct SpinButtonProps {
    pub is_spinning: bool,
    pub cooldown_seconds: i64,
    pub onclick: Callback<MouseEvent>,
}

#[function_component(SpinButton)]
pub fn spin_button(props: &SpinButtonProps) -> Html {
    let on_cooldown = props.cooldown_seconds > 0;
    let button_text = if props.is_spinning {
        "Spinning...".to_string()
    } else if on_cooldown {
        format!("Cooldown: {}", format_time(props.cooldown_seconds))
    } else {
        "Spin the wheel".to_string()
    };

    let is_disabled = props.is_spinning || on_cooldown;

    let button_class = if is_disabled {
        if on_cooldown {
            "bg-gradient-to-r from-blue-400 to-gray-400 opacity-80 cursor-not-allowed text-white"
        } else {
            "bg-gradient-to-r from-gray-400 to-gray-500 opacity-75 cursor-not-allowed text-white"
        }
    } else {
        "bg-gradient-to-r from-yellow-400 to-orange-500 hover:from-yellow-500 hover:to-orange-600 text-white shadow-lg hover:shadow-xl transform hover:-translate-y-0.5 active:translate-y-0 animate-pulse-subtle"
    };

    let spin_icon_class = if props.is_spinning {
        "inline-block mr-2 animate-spin"
    } else {
        "hidden"
    };

    html! {
        <div class={classes!("relative", "overflow-hidden", "rounded-full", "w-full", button_class)}>
            <button
                onclick={props.onclick.clone()}
                disabled={is_disabled}
                class="relative w-full px-8 py-4 font-bold text-lg transition-all duration-300 border-2 border-transparent hover:border-white focus:outline-none focus:ring-4 focus:ring-yellow-300 focus:ring-opacity-50 bg-transparent"
            >
                <div class="flex items-center justify-center relative z-10">
                    <svg class={spin_icon_class} xmlns="http://www.w3.org/2000/svg" width="20" height="20" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2">
                        <circle cx="12" cy="12" r="10" />
                        <path d="M12 6v6l4 2" />
                    </svg>
                    <span>{button_text}</span>
                </div>
            </button>
        </div>
    }
}
