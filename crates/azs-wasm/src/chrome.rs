//! Extension APIs: sync storage, tab notification and runtime messages.
//!
//! Everything is reached through `js_sys::Reflect` on the global `chrome`
//! object so that a missing or invalidated extension context degrades to
//! errors instead of exceptions.

use azs_core::error::{ChannelError, HookError, StoreError};
use azs_core::settings::{Feature, FeatureFlags, Message, NotifyChannel, SettingsStore};
use js_sys::{Array, Function, Promise, Reflect, JSON};
use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::describe;

/// `chrome.<path...>`, or `None` when any step is missing.
fn lookup(path: &[&str]) -> Option<JsValue> {
    let mut current: JsValue = js_sys::global().into();
    for key in std::iter::once(&"chrome").chain(path) {
        current = Reflect::get(&current, &JsValue::from_str(key)).ok()?;
        if current.is_undefined() || current.is_null() {
            return None;
        }
    }
    Some(current)
}

async fn call(target: &JsValue, method: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let function: Function = Reflect::get(target, &JsValue::from_str(method))?.dyn_into()?;
    let args: Array = args.iter().collect();
    let returned = Reflect::apply(&function, target, &args)?;
    match returned.dyn_into::<Promise>() {
        Ok(promise) => JsFuture::from(promise).await,
        Err(value) => Ok(value),
    }
}

fn to_js(value: &Value) -> Result<JsValue, JsValue> {
    JSON::parse(&value.to_string())
}

fn from_js(value: &JsValue) -> Option<Value> {
    let text: String = JSON::stringify(value).ok()?.into();
    serde_json::from_str(&text).ok()
}

// =============================================================================
// Storage
// =============================================================================

/// `chrome.storage.sync`
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeStore;

impl ChromeStore {
    pub fn new() -> Self {
        Self
    }

    pub fn is_available() -> bool {
        lookup(&["storage", "sync"]).is_some()
    }

    async fn set(&self, values: Map<String, Value>) -> Result<(), StoreError> {
        let area = lookup(&["storage", "sync"]).ok_or(StoreError::Unavailable)?;
        let items = to_js(&Value::Object(values)).map_err(|e| StoreError::Write(describe(&e)))?;
        call(&area, "set", &[items])
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Write(describe(&e)))
    }
}

impl SettingsStore for ChromeStore {
    async fn load(&self) -> Result<Map<String, Value>, StoreError> {
        let area = lookup(&["storage", "sync"]).ok_or(StoreError::Unavailable)?;
        let defaults = to_js(&Value::Object(FeatureFlags::default().to_stored()))
            .map_err(|e| StoreError::Read(describe(&e)))?;
        let stored = call(&area, "get", &[defaults])
            .await
            .map_err(|e| StoreError::Read(describe(&e)))?;

        match from_js(&stored) {
            Some(Value::Object(map)) => Ok(map),
            _ => Err(StoreError::Read("storage returned a non-object".to_string())),
        }
    }

    async fn save(&self, feature: Feature, value: bool) -> Result<(), StoreError> {
        let mut values = Map::new();
        values.insert(feature.key().to_string(), Value::Bool(value));
        self.set(values).await
    }

    async fn save_all(&self, flags: &FeatureFlags) -> Result<(), StoreError> {
        self.set(flags.to_stored()).await
    }
}

// =============================================================================
// Notification
// =============================================================================

/// Popup → active tab channel. `Disconnected` when the popup runs outside an
/// extension context; sends then succeed without doing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabChannel {
    Tabs,
    Disconnected,
}

impl TabChannel {
    pub fn detect() -> Self {
        if lookup(&["tabs"]).is_some() {
            TabChannel::Tabs
        } else {
            log::warn!("chrome.tabs unavailable, settings changes reach pages on reload only");
            TabChannel::Disconnected
        }
    }
}

impl NotifyChannel for TabChannel {
    async fn send(&self, message: &Message) -> Result<(), ChannelError> {
        if *self == TabChannel::Disconnected {
            return Ok(());
        }
        let tabs = lookup(&["tabs"]).ok_or(ChannelError::Unavailable)?;

        let query = to_js(&serde_json::json!({ "active": true, "currentWindow": true }))
            .map_err(|_| ChannelError::Unavailable)?;
        let found = call(&tabs, "query", &[query])
            .await
            .map_err(|_| ChannelError::NoActiveTab)?;
        let tab_id = Array::from(&found)
            .iter()
            .next()
            .and_then(|tab| Reflect::get(&tab, &JsValue::from_str("id")).ok())
            .filter(|id| id.as_f64().is_some())
            .ok_or(ChannelError::NoActiveTab)?;

        let payload = to_js(&message.to_value()).map_err(|e| ChannelError::NoReceiver(describe(&e)))?;
        call(&tabs, "sendMessage", &[tab_id, payload])
            .await
            .map(|_| ())
            .map_err(|e| ChannelError::NoReceiver(describe(&e)))
    }
}

// =============================================================================
// Runtime messages
// =============================================================================

pub type MessageListener = Closure<dyn FnMut(JsValue, JsValue, JsValue)>;

/// Register `handler` on `chrome.runtime.onMessage`. The returned closure must
/// be kept alive for as long as messages should be delivered.
pub fn on_runtime_message<F>(mut handler: F) -> Result<MessageListener, HookError>
where
    F: FnMut(Message) + 'static,
{
    let event = lookup(&["runtime", "onMessage"]).ok_or_else(|| HookError::Listener {
        kind: "runtime.onMessage",
        reason: "extension runtime unavailable".to_string(),
    })?;

    let closure = MessageListener::wrap(Box::new(move |raw: JsValue, _sender: JsValue, _respond: JsValue| {
        let parsed = from_js(&raw)
            .ok_or_else(|| "not JSON".to_string())
            .and_then(|value| Message::from_value(value).map_err(|e| e.to_string()));
        match parsed {
            Ok(message) => handler(message),
            Err(e) => log::debug!("ignoring runtime message: {e}"),
        }
    }));

    let add: Function = Reflect::get(&event, &JsValue::from_str("addListener"))
        .and_then(|f| f.dyn_into::<Function>().map_err(JsValue::from))
        .map_err(|e| HookError::Listener {
            kind: "runtime.onMessage",
            reason: describe(&e),
        })?;
    add.call1(&event, closure.as_ref()).map_err(|e| HookError::Listener {
        kind: "runtime.onMessage",
        reason: describe(&e),
    })?;

    Ok(closure)
}
