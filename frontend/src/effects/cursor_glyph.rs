//! Turns a cursor reward value into a CSS `cursor` value.
//!
//! Text glyphs (emoji) are drawn as SVG. Image URLs are loaded and scaled onto
//! a 32px canvas; if the image cannot be loaded the cursor falls back to a
//! paw glyph, and if the canvas is tainted the raw URL is used unscaled.

use futures::channel::oneshot;
use gloo::events::EventListener;
use shared::shared_effects::{image_cursor_css, looks_like_image_url, text_cursor_css};
use shared::ClientError;
use wasm_bindgen::JsCast;
use web_sys::{window, CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

const CURSOR_SIZE: u32 = 32;
const FALLBACK_GLYPH: &str = "🐾";

pub async fn resolve_cursor_css(value: &str) -> String {
    if !looks_like_image_url(value) {
        return text_cursor_css(value);
    }

    let image = match load_image(value).await {
        Ok(image) => image,
        Err(e) => {
            log::warn!("Cursor image {} failed to load ({}), using glyph", value, e);
            return text_cursor_css(FALLBACK_GLYPH);
        }
    };

    match scale_to_data_url(&image) {
        Ok(data_url) => image_cursor_css(&data_url),
        Err(e) => {
            log::warn!("Could not rasterise cursor image ({}), using it unscaled", e);
            image_cursor_css(value)
        }
    }
}

async fn load_image(url: &str) -> Result<HtmlImageElement, ClientError> {
    let image = HtmlImageElement::new().map_err(|e| ClientError::Transport(format!("{:?}", e)))?;
    image.set_cross_origin(Some("anonymous"));

    let (tx, rx) = oneshot::channel::<bool>();
    let tx = std::rc::Rc::new(std::cell::RefCell::new(Some(tx)));
    let on_load = {
        let tx = tx.clone();
        EventListener::once(&image, "load", move |_| {
            if let Some(tx) = tx.borrow_mut().take() {
                let _ = tx.send(true);
            }
        })
    };
    let on_error = EventListener::once(&image, "error", move |_| {
        if let Some(tx) = tx.borrow_mut().take() {
            let _ = tx.send(false);
        }
    });

    image.set_src(url);
    let loaded = rx.await.unwrap_or(false);
    drop(on_load);
    drop(on_error);

    if loaded {
        Ok(image)
    } else {
        Err(ClientError::Transport(format!("could not load {}", url)))
    }
}

fn scale_to_data_url(image: &HtmlImageElement) -> Result<String, ClientError> {
    let js_err = |e: wasm_bindgen::JsValue| ClientError::Transport(format!("{:?}", e));
    let document = window()
        .and_then(|w| w.document())
        .ok_or_else(|| ClientError::Transport("no document".to_string()))?;
    let canvas = document
        .create_element("canvas")
        .map_err(js_err)?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| ClientError::Transport("not a canvas".to_string()))?;
    canvas.set_width(CURSOR_SIZE);
    canvas.set_height(CURSOR_SIZE);

    let context = canvas
        .get_context("2d")
        .map_err(js_err)?
        .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
        .ok_or_else(|| ClientError::Transport("no 2d context".to_string()))?;
    context
        .draw_image_with_html_image_element_and_dw_and_dh(
            image,
            0.0,
            0.0,
            CURSOR_SIZE as f64,
            CURSOR_SIZE as f64,
        )
        .map_err(js_err)?;

    // Throws on a tainted canvas (cross-origin image without CORS).
    canvas.to_data_url().map_err(js_err)
}
