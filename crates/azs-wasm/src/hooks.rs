//! Browser listener and observer registration for the page agent.
//!
//! Input listeners go on `window`, capture phase, non-passive, so the gate
//! sees every event before the page does and may cancel it. Every closure
//! holds a weak handle to the agent; a dropped agent makes them inert.

use std::cell::RefCell;
use std::rc::Weak;

use azs_core::agent::EventHooks;
use azs_core::error::HookError;
use azs_core::gate::{InputEvent, InputKinds, Offset, Verdict};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    AddEventListenerOptions, Element, Event, KeyboardEvent, MutationObserver, MutationObserverInit,
    TouchEvent, WheelEvent, Window,
};

use crate::content::Agent;
use crate::describe;

type AgentHandle = Weak<RefCell<Agent>>;

struct Listener {
    event: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

struct Observer {
    observer: MutationObserver,
    _closure: Closure<dyn FnMut(js_sys::Array, MutationObserver)>,
}

pub struct BrowserHooks {
    window: Window,
    agent: AgentHandle,
    listeners: Vec<Listener>,
    observer: Option<Observer>,
}

fn event_names(kinds: InputKinds) -> Vec<&'static str> {
    let mut names = Vec::new();
    if kinds.contains(InputKinds::WHEEL) {
        names.push("wheel");
    }
    if kinds.contains(InputKinds::KEY) {
        names.push("keydown");
    }
    if kinds.contains(InputKinds::TOUCH) {
        names.extend(["touchstart", "touchmove"]);
    }
    if kinds.contains(InputKinds::SCROLL) {
        names.push("scroll");
    }
    names
}

/// Window scroll position.
pub fn scroll_offset(window: &Window) -> Offset {
    Offset::new(
        window.scroll_x().unwrap_or(0.0),
        window.scroll_y().unwrap_or(0.0),
    )
}

fn input_event(name: &str, event: &Event) -> Option<InputEvent> {
    match name {
        "wheel" => event.dyn_ref::<WheelEvent>().map(|e| InputEvent::Wheel {
            delta_x: e.delta_x(),
            delta_y: e.delta_y(),
        }),
        "keydown" => event.dyn_ref::<KeyboardEvent>().map(|e| InputEvent::Key { key: e.key() }),
        "touchstart" | "touchmove" => {
            let touch = event.dyn_ref::<TouchEvent>()?.touches().get(0)?;
            let (x, y) = (f64::from(touch.client_x()), f64::from(touch.client_y()));
            Some(if name == "touchstart" {
                InputEvent::TouchStart { x, y }
            } else {
                InputEvent::TouchMove { x, y }
            })
        }
        "scroll" => Some(InputEvent::Scroll),
        _ => None,
    }
}

fn dispatch(agent: &AgentHandle, window: &Window, name: &str, event: &Event) {
    let Some(agent) = agent.upgrade() else {
        return;
    };
    let Some(input) = input_event(name, event) else {
        return;
    };
    // Scroll events carry no meaningful target; the gate only checks offsets.
    let target = match input {
        InputEvent::Scroll => None,
        _ => event.target().and_then(|t| t.dyn_into::<Element>().ok()),
    };

    let offset = scroll_offset(window);
    let Ok(mut agent) = agent.try_borrow_mut() else {
        return;
    };
    match agent.handle_input(target.as_ref(), &input, offset) {
        Verdict::Pass => {}
        Verdict::Prevent => {
            event.prevent_default();
            event.stop_propagation();
        }
        Verdict::SnapBack(to) => window.scroll_to_with_x_and_y(to.x, to.y),
    }
}

impl BrowserHooks {
    pub fn new(window: Window, agent: AgentHandle) -> Self {
        Self {
            window,
            agent,
            listeners: Vec::new(),
            observer: None,
        }
    }

    fn remove_listeners(&mut self) {
        for listener in self.listeners.drain(..) {
            let _ = self.window.remove_event_listener_with_callback_and_bool(
                listener.event,
                listener.closure.as_ref().unchecked_ref(),
                true,
            );
        }
    }
}

impl EventHooks for BrowserHooks {
    fn attach_input_listeners(&mut self, kinds: InputKinds) -> Result<(), HookError> {
        self.remove_listeners();

        let options = AddEventListenerOptions::new();
        options.set_capture(true);
        options.set_passive(false);

        for name in event_names(kinds) {
            let agent = self.agent.clone();
            let window = self.window.clone();
            let closure = Closure::<dyn FnMut(Event)>::wrap(Box::new(move |event: Event| {
                dispatch(&agent, &window, name, &event);
            }));

            let added = self.window.add_event_listener_with_callback_and_add_event_listener_options(
                name,
                closure.as_ref().unchecked_ref(),
                &options,
            );
            if let Err(e) = added {
                self.remove_listeners();
                return Err(HookError::Listener {
                    kind: name,
                    reason: describe(&e),
                });
            }
            self.listeners.push(Listener { event: name, closure });
        }
        Ok(())
    }

    fn detach_input_listeners(&mut self) {
        self.remove_listeners();
    }

    fn observe_mutations(&mut self) -> Result<(), HookError> {
        self.disconnect_mutations();

        let body = self
            .window
            .document()
            .and_then(|d| d.body())
            .ok_or(HookError::NoDocument)?;

        let agent = self.agent.clone();
        let closure = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::wrap(Box::new(
            move |_records: js_sys::Array, _observer: MutationObserver| {
                let Some(agent) = agent.upgrade() else {
                    return;
                };
                if let Ok(mut agent) = agent.try_borrow_mut() {
                    let report = agent.on_mutations();
                    if report.hidden > 0 {
                        log::debug!("hid {} injected elements", report.hidden);
                    }
                };
            },
        ));

        let observer = MutationObserver::new(closure.as_ref().unchecked_ref())
            .map_err(|e| HookError::Observer(describe(&e)))?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        observer
            .observe_with_options(&body, &init)
            .map_err(|e| HookError::Observer(describe(&e)))?;

        self.observer = Some(Observer {
            observer,
            _closure: closure,
        });
        Ok(())
    }

    fn disconnect_mutations(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.observer.disconnect();
        }
    }
}

impl Drop for BrowserHooks {
    fn drop(&mut self) {
        self.remove_listeners();
        self.disconnect_mutations();
    }
}
