/// Tab Warden - Chrome extension for time-aware tab management
/// Built with Rust + WASM + Yew

mod background;
mod curation;
mod domain;
mod operations;
mod stats;
mod storage;
mod tab_data;
mod tracker;
pub mod ui;

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Re-export the domain extractor for JavaScript access
#[wasm_bindgen]
pub fn extract_domain(url: &str) -> String {
    domain::extract_domain(url).unwrap_or_default()
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}

// Start the tab tracking background worker
#[wasm_bindgen]
pub fn start_background() {
    background::start();
}
