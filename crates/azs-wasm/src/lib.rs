//! WebAssembly bindings for AntiZombieScroll

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use azs_core::settings::FeatureFlags;
use azs_core::sites::{classify_url, policy_for};

pub mod chrome;
pub mod content;
pub mod dom;
pub mod hooks;
pub mod logger;
pub mod popup;

/// Best-effort text for a thrown JavaScript value.
pub(crate) fn describe(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn log_level(verbose: bool) -> log::LevelFilter {
    if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

/// Entry point of the content script bundle.
#[wasm_bindgen]
pub fn start_content_script(verbose: bool) -> Result<(), JsValue> {
    logger::init(log_level(verbose));
    content::start_content_script()
}

/// Entry point of the popup page, after `DOMContentLoaded`.
#[wasm_bindgen]
pub fn start_popup(verbose: bool) -> Result<(), JsValue> {
    logger::init(log_level(verbose));
    popup::start_popup()
}

/// Site name for `url`, or `undefined` when unsupported.
#[wasm_bindgen]
pub fn classify(url: &str) -> Option<String> {
    classify_url(url).map(|site| site.name().to_string())
}

/// Default settings object, as stored.
#[wasm_bindgen]
pub fn default_settings() -> Result<JsValue, JsValue> {
    let text = serde_json::Value::Object(FeatureFlags::default().to_stored()).to_string();
    js_sys::JSON::parse(&text)
}

/// Policy that would be installed for `url` with default settings.
#[wasm_bindgen]
pub fn describe_policy(url: &str) -> Result<JsValue, JsValue> {
    let policy = policy_for(classify_url(url), url, &FeatureFlags::default());
    let text = serde_json::to_string(&policy).map_err(|e| JsValue::from_str(&e.to_string()))?;
    js_sys::JSON::parse(&text)
}
