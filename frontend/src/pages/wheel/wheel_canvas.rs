use std::f64::consts::PI;

use shared::shared_wheel_game::{segment_at_pointer, segment_span, WheelSegment};
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};
use yew::prelude::*;

const CANVAS_SIZE: u32 = 450;

#[derive(Properties, PartialEq)]
pub struct WheelCanvasProps {
    /// Clockwise, in degrees.
    pub rotation: f64,
    pub is_spinning: bool,
    pub segments: &'static [WheelSegment],
}

fn is_dark_mode() -> bool {
    gloo_utils::document()
        .document_element()
        .map(|el| el.class_list().contains("dark"))
        .unwrap_or(false)
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
    canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
}

#[function_component(WheelCanvas)]
pub fn wheel_canvas(props: &WheelCanvasProps) -> Html {
    let canvas_ref = use_node_ref();

    {
        let canvas_ref = canvas_ref.clone();
        let segments = props.segments;

        use_effect_with(
            (props.rotation, props.is_spinning),
            move |(rotation, is_spinning)| {
                if let Some(context) = canvas_ref
                    .cast::<HtmlCanvasElement>()
                    .as_ref()
                    .and_then(context_2d)
                {
                    draw_wheel(&context, segments, *rotation, *is_spinning);
                }
                || ()
            },
        );
    }

    html! {
        <div class="relative">
            <canvas
                ref={canvas_ref}
                width={CANVAS_SIZE.to_string()}
                height={CANVAS_SIZE.to_string()}
                class="w-full max-w-[450px] h-auto rounded-full shadow-lg transition-all duration-300"
                style={if props.is_spinning {
                    "filter: drop-shadow(0px 5px 20px rgba(130, 100, 255, 0.4));"
                } else {
                    "filter: drop-shadow(0px 5px 15px rgba(0, 0, 0, 0.2));"
                }}
            />
        </div>
    }
}

fn draw_wheel(
    context: &CanvasRenderingContext2d,
    segments: &[WheelSegment],
    rotation: f64,
    is_spinning: bool,
) {
    let size = CANVAS_SIZE as f64;
    let center = size / 2.0;
    let radius = center - 30.0;
    let dark = is_dark_mode();
    let count = segments.len();
    if count == 0 {
        return;
    }
    let span = segment_span(count).to_radians();
    let highlighted = segment_at_pointer(rotation, count);

    context.clear_rect(0.0, 0.0, size, size);

    // Outer glow
    context.begin_path();
    let glow = if is_spinning { 0.25 } else { 0.15 };
    if dark {
        context.set_fill_style_str(&format!("rgba(130, 100, 255, {})", glow));
    } else {
        context.set_fill_style_str(&format!("rgba(100, 130, 255, {})", glow));
    }
    let _ = context.arc(center, center, radius + 15.0, 0.0, 2.0 * PI);
    context.fill();

    context.save();
    let _ = context.translate(center, center);
    // Canvas angles start at 3 o'clock; segment 0 starts at 12.
    let _ = context.rotate(rotation.to_radians() - PI / 2.0);

    for (i, segment) in segments.iter().enumerate() {
        let start = i as f64 * span;
        let end = start + span;

        context.begin_path();
        context.set_fill_style_str(segment.color);
        context.move_to(0.0, 0.0);
        let _ = context.arc(0.0, 0.0, radius, start, end);
        context.close_path();
        context.fill();

        if i == highlighted && !is_spinning {
            context.set_fill_style_str("rgba(255, 255, 255, 0.25)");
            context.fill();
        }

        context.set_stroke_style_str(if dark {
            "rgba(255, 255, 255, 0.7)"
        } else {
            "rgba(255, 255, 255, 0.9)"
        });
        context.set_line_width(2.5);
        context.stroke();

        context.save();
        let _ = context.rotate(start + span / 2.0);
        let _ = context.translate(radius * 0.62, 0.0);
        context.set_text_align("center");
        context.set_text_baseline("middle");
        context.set_fill_style_str("#ffffff");
        context.set_shadow_color("rgba(0, 0, 0, 0.5)");
        context.set_shadow_blur(3.0);
        context.set_font("bold 15px 'Segoe UI', Roboto, system-ui, sans-serif");
        let _ = context.fill_text(segment.label, 0.0, 0.0);
        context.restore();
    }
    context.restore();

    // Hub
    context.begin_path();
    context.set_fill_style_str(if dark { "#2d3142" } else { "#8b5cf6" });
    let _ = context.arc(center, center, radius * 0.18, 0.0, 2.0 * PI);
    context.fill();

    // Rim
    context.begin_path();
    context.set_stroke_style_str(if dark {
        "rgba(180, 130, 255, 0.5)"
    } else {
        "rgba(130, 100, 255, 0.5)"
    });
    context.set_line_width(if is_spinning { 5.0 } else { 4.0 });
    let _ = context.arc(center, center, radius - 2.0, 0.0, 2.0 * PI);
    context.stroke();

    // Pointer, fixed at 12 o'clock.
    let pointer_width = 16.0;
    let pointer_height = 28.0;
    let tip_y = center - radius + 8.0;
    context.begin_path();
    context.move_to(center, tip_y);
    context.line_to(center - pointer_width, tip_y - pointer_height);
    context.line_to(center + pointer_width, tip_y - pointer_height);
    context.close_path();
    context.set_fill_style_str(if is_spinning { "#ffd700" } else { "#f59e0b" });
    context.fill();
    context.set_stroke_style_str("#e69500");
    context.set_line_width(1.5);
    context.stroke();
}
