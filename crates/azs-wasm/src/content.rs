//! Content script: builds the page agent and feeds it navigation, settings
//! and timer events.
//!
//! Route changes arrive from three sources: wrapped `history.pushState` /
//! `replaceState`, `popstate`, and a low-frequency poll of `location.href`
//! that catches whatever the first two miss (the page's own history calls
//! run in a different JavaScript world than this script).

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use azs_core::agent::{AgentConfig, PageAgent};
use azs_core::navigation::NavTrigger;
use azs_core::settings::{load_flags, FeatureFlags};
use azs_core::sites::classify_url;
use js_sys::{Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Event, History, Window};

use crate::chrome::{self, ChromeStore, MessageListener};
use crate::describe;
use crate::dom::WebDom;
use crate::hooks::{scroll_offset, BrowserHooks};

pub type Agent = PageAgent<WebDom, BrowserHooks>;
pub type SharedAgent = Rc<RefCell<Agent>>;

type HistoryWrapper = Closure<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>;

/// Everything that has to stay alive for the page's lifetime.
struct ContentScript {
    _agent: SharedAgent,
    _history: Vec<HistoryWrapper>,
    _popstate: Option<Closure<dyn FnMut(Event)>>,
    _poll: Option<Closure<dyn FnMut()>>,
    _messages: Option<MessageListener>,
}

thread_local! {
    static CONTENT: RefCell<Option<ContentScript>> = const { RefCell::new(None) };
}

pub fn start_content_script() -> Result<(), JsValue> {
    if CONTENT.with(|slot| slot.borrow().is_some()) {
        return Err(JsValue::from_str("Content script already started."));
    }

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
    let url = window.location().href()?;
    if classify_url(&url).is_none() {
        log::debug!("unsupported site, staying idle: {url}");
        return Ok(());
    }

    spawn_local(async move {
        if let Err(e) = boot(window, url).await {
            log::error!("content script failed to start: {}", describe(&e));
        }
    });
    Ok(())
}

async fn boot(window: Window, url: String) -> Result<(), JsValue> {
    let document = window.document().ok_or_else(|| JsValue::from_str("No document"))?;

    let flags = if ChromeStore::is_available() {
        load_flags(&ChromeStore::new()).await
    } else {
        log::warn!("extension storage unavailable, using default settings");
        FeatureFlags::default()
    };

    let agent: SharedAgent = Rc::new_cyclic(|weak| {
        let hooks = BrowserHooks::new(window.clone(), weak.clone());
        RefCell::new(PageAgent::new(
            WebDom::new(document),
            hooks,
            &url,
            flags,
            AgentConfig::default(),
        ))
    });
    let config = agent.borrow().config();

    let history = match window.history() {
        Ok(history) => wrap_history(&history, &window, &agent),
        Err(e) => {
            log::warn!("history unavailable: {}", describe(&e));
            Vec::new()
        }
    };
    let popstate = listen_popstate(&window, &agent);
    let poll = start_polling(&window, &agent, config.poll_interval);
    let messages = listen_messages(&window, &agent);

    agent.borrow_mut().reevaluate(&url, scroll_offset(&window));

    CONTENT.with(|slot| {
        *slot.borrow_mut() = Some(ContentScript {
            _agent: agent,
            _history: history,
            _popstate: popstate,
            _poll: poll,
            _messages: messages,
        });
    });
    Ok(())
}

// =============================================================================
// Scheduling
// =============================================================================

fn reevaluate_now(agent: &Weak<RefCell<Agent>>, window: &Window) {
    let Some(agent) = agent.upgrade() else {
        return;
    };
    let url = match window.location().href() {
        Ok(url) => url,
        Err(e) => {
            log::warn!("cannot read location: {}", describe(&e));
            return;
        }
    };
    let offset = scroll_offset(window);
    match agent.try_borrow_mut() {
        Ok(mut agent) => agent.reevaluate(&url, offset),
        Err(_) => log::debug!("agent busy, skipping re-evaluation"),
    };
}

/// Re-evaluate after `delay`. Overlapping schedules are harmless.
fn schedule(agent: &SharedAgent, window: &Window, delay: Duration) {
    let weak = Rc::downgrade(agent);
    let timer_window = window.clone();
    let callback = Closure::once_into_js(move || reevaluate_now(&weak, &timer_window));
    let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
    if let Err(e) = window.set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), millis) {
        log::warn!("re-evaluation not scheduled: {}", describe(&e));
    }
}

fn navigated(agent: &Weak<RefCell<Agent>>, window: &Window, trigger: NavTrigger) {
    let Some(agent) = agent.upgrade() else {
        return;
    };
    let Ok(url) = window.location().href() else {
        return;
    };
    let delay = match agent.try_borrow_mut() {
        Ok(mut a) => a.on_navigation(&url, trigger),
        Err(_) => return,
    };
    if let Some(delay) = delay {
        schedule(&agent, window, delay);
    }
}

// =============================================================================
// Navigation sources
// =============================================================================

fn wrap_history(history: &History, window: &Window, agent: &SharedAgent) -> Vec<HistoryWrapper> {
    let mut wrappers = Vec::new();
    for (method, trigger) in [
        ("pushState", NavTrigger::PushState),
        ("replaceState", NavTrigger::ReplaceState),
    ] {
        let original = match Reflect::get(history, &JsValue::from_str(method))
            .and_then(|f| f.dyn_into::<Function>().map_err(JsValue::from))
        {
            Ok(original) => original,
            Err(e) => {
                log::warn!("history.{method} not wrapped: {}", describe(&e));
                continue;
            }
        };

        let weak = Rc::downgrade(agent);
        let target = history.clone();
        let window = window.clone();
        let wrapper = HistoryWrapper::wrap(Box::new(move |state: JsValue, title: JsValue, url: JsValue| {
            let result = original.call3(&target, &state, &title, &url);
            navigated(&weak, &window, trigger);
            result
        }));

        if let Err(e) = Reflect::set(history, &JsValue::from_str(method), wrapper.as_ref()) {
            log::warn!("history.{method} not wrapped: {}", describe(&e));
            continue;
        }
        wrappers.push(wrapper);
    }
    wrappers
}

fn listen_popstate(window: &Window, agent: &SharedAgent) -> Option<Closure<dyn FnMut(Event)>> {
    let weak = Rc::downgrade(agent);
    let target = window.clone();
    let closure = Closure::<dyn FnMut(Event)>::wrap(Box::new(move |_event: Event| {
        navigated(&weak, &target, NavTrigger::PopState);
    }));
    match window.add_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref()) {
        Ok(()) => Some(closure),
        Err(e) => {
            log::warn!("popstate listener not installed: {}", describe(&e));
            None
        }
    }
}

fn start_polling(window: &Window, agent: &SharedAgent, interval: Duration) -> Option<Closure<dyn FnMut()>> {
    let weak = Rc::downgrade(agent);
    let target = window.clone();
    let closure = Closure::<dyn FnMut()>::wrap(Box::new(move || {
        navigated(&weak, &target, NavTrigger::Poll);
    }));
    let millis = i32::try_from(interval.as_millis()).unwrap_or(i32::MAX);
    match window.set_interval_with_callback_and_timeout_and_arguments_0(closure.as_ref().unchecked_ref(), millis) {
        Ok(_) => Some(closure),
        Err(e) => {
            log::warn!("navigation polling not started: {}", describe(&e));
            None
        }
    }
}

fn listen_messages(window: &Window, agent: &SharedAgent) -> Option<MessageListener> {
    let weak = Rc::downgrade(agent);
    let target = window.clone();
    let listener = chrome::on_runtime_message(move |message| {
        let Some(agent) = weak.upgrade() else {
            return;
        };
        let delay = match agent.try_borrow_mut() {
            Ok(mut a) => a.on_message(&message),
            Err(_) => return,
        };
        if let Some(delay) = delay {
            schedule(&agent, &target, delay);
        }
    });
    match listener {
        Ok(listener) => Some(listener),
        Err(e) => {
            log::warn!("settings changes will not be applied live: {e}");
            None
        }
    }
}
