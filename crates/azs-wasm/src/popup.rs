//! Settings popup binding.
//!
//! Markup contract: one `.switch[data-feature="<key>"]` per feature (class
//! `active` when on), a `#challenge` dialog with `#challenge-word`,
//! `#challenge-input`, `#challenge-submit`, `#challenge-cancel` and
//! `#challenge-error`, and a `#reset` button.

use std::cell::RefCell;
use std::rc::Rc;

use azs_core::challenge::WORDS;
use azs_core::popup::{PopupController, ToggleOutcome};
use azs_core::settings::Feature;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, Event, HtmlInputElement, KeyboardEvent};

use crate::chrome::{ChromeStore, TabChannel};
use crate::describe;

type Controller = PopupController<ChromeStore, TabChannel>;

/// `None` while an async operation has the controller checked out; clicks
/// arriving in that window are dropped.
type Slot = Rc<RefCell<Option<Controller>>>;

const SWITCHES: &str = ".switch[data-feature]";

struct Popup {
    _slot: Slot,
    _handlers: Vec<Closure<dyn FnMut(Event)>>,
}

thread_local! {
    static POPUP: RefCell<Option<Popup>> = const { RefCell::new(None) };
}

pub fn start_popup() -> Result<(), JsValue> {
    if POPUP.with(|slot| slot.borrow().is_some()) {
        return Err(JsValue::from_str("Popup already started."));
    }
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("No document"))?;

    spawn_local(async move {
        let controller = PopupController::load(ChromeStore::new(), TabChannel::detect()).await;
        render(&document, &controller);

        let slot: Slot = Rc::new(RefCell::new(Some(controller)));
        match bind(&document, &slot) {
            Ok(handlers) => POPUP.with(|popup| {
                *popup.borrow_mut() = Some(Popup {
                    _slot: slot,
                    _handlers: handlers,
                });
            }),
            Err(e) => log::error!("popup not bound: {}", describe(&e)),
        }
    });
    Ok(())
}

// =============================================================================
// Rendering
// =============================================================================

fn set_visible(element: &Element, visible: bool) {
    let _ = if visible {
        element.remove_attribute("hidden")
    } else {
        element.set_attribute("hidden", "")
    };
}

fn input(document: &Document) -> Option<HtmlInputElement> {
    document
        .get_element_by_id("challenge-input")
        .and_then(|e| e.dyn_into::<HtmlInputElement>().ok())
}

fn render(document: &Document, controller: &Controller) {
    if let Ok(switches) = document.query_selector_all(SWITCHES) {
        for i in 0..switches.length() {
            let Some(element) = switches.get(i).and_then(|n| n.dyn_into::<Element>().ok()) else {
                continue;
            };
            let feature = element
                .get_attribute("data-feature")
                .and_then(|key| Feature::from_key(&key));
            if let Some(feature) = feature {
                let _ = element
                    .class_list()
                    .toggle_with_force("active", controller.flags().get(feature));
            }
        }
    }

    let pending = controller.pending();
    if let Some(dialog) = document.get_element_by_id("challenge") {
        set_visible(&dialog, pending.is_some());
    }
    if let Some(word) = document.get_element_by_id("challenge-word") {
        word.set_text_content(pending.map(|p| p.challenge.word()));
    }
    if let Some(error) = document.get_element_by_id("challenge-error") {
        set_visible(&error, controller.error_visible());
    }
}

// =============================================================================
// Actions
// =============================================================================

enum Action {
    Toggle(Feature),
    Submit,
    Cancel,
    Reset,
}

fn random_pick() -> usize {
    (js_sys::Math::random() * WORDS.len() as f64) as usize
}

/// Check the controller out, run `action`, check it back in and re-render.
fn run(document: Document, slot: Slot, action: Action) {
    let Some(mut controller) = slot.borrow_mut().take() else {
        log::debug!("popup busy, ignoring input");
        return;
    };

    spawn_local(async move {
        let outcome = match action {
            Action::Toggle(feature) => Some(controller.toggle(feature, random_pick()).await),
            Action::Submit => {
                let answer = input(&document).map(|i| i.value()).unwrap_or_default();
                controller.submit_challenge(&answer).await
            }
            Action::Cancel => {
                controller.cancel_challenge();
                None
            }
            Action::Reset => Some(controller.reset(random_pick()).await),
        };

        match outcome {
            Some(ToggleOutcome::ChallengeRequired { .. }) => {
                if let Some(input) = input(&document) {
                    input.set_value("");
                    let _ = input.focus();
                }
            }
            Some(ToggleOutcome::Reverted(e)) => log::error!("setting not saved: {e}"),
            Some(ToggleOutcome::Reset { changed }) => log::info!("reset {} settings", changed.len()),
            Some(ToggleOutcome::Applied { .. } | ToggleOutcome::Rejected) | None => {}
        }

        render(&document, &controller);
        *slot.borrow_mut() = Some(controller);
    });
}

fn on(
    element: &Element,
    event: &str,
    document: &Document,
    slot: &Slot,
    action: impl Fn(&Event) -> Option<Action> + 'static,
) -> Result<Closure<dyn FnMut(Event)>, JsValue> {
    let document = document.clone();
    let slot = slot.clone();
    let closure = Closure::<dyn FnMut(Event)>::wrap(Box::new(move |event: Event| {
        if let Some(action) = action(&event) {
            run(document.clone(), slot.clone(), action);
        }
    }));
    element.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    Ok(closure)
}

fn bind(document: &Document, slot: &Slot) -> Result<Vec<Closure<dyn FnMut(Event)>>, JsValue> {
    let mut handlers = Vec::new();

    let switches = document.query_selector_all(SWITCHES)?;
    for i in 0..switches.length() {
        let Some(element) = switches.get(i).and_then(|n| n.dyn_into::<Element>().ok()) else {
            continue;
        };
        let Some(feature) = element
            .get_attribute("data-feature")
            .and_then(|key| Feature::from_key(&key))
        else {
            log::warn!("switch with unknown feature ignored");
            continue;
        };
        handlers.push(on(&element, "click", document, slot, move |_| Some(Action::Toggle(feature)))?);
    }

    let buttons: [(&str, fn() -> Action); 3] = [
        ("challenge-submit", || Action::Submit),
        ("challenge-cancel", || Action::Cancel),
        ("reset", || Action::Reset),
    ];
    for (id, action) in buttons {
        if let Some(element) = document.get_element_by_id(id) {
            handlers.push(on(&element, "click", document, slot, move |_| Some(action()))?);
        }
    }

    if let Some(element) = document.get_element_by_id("challenge-input") {
        handlers.push(on(&element, "keydown", document, slot, |event| {
            let key = event.dyn_ref::<KeyboardEvent>()?.key();
            (key == "Enter").then_some(Action::Submit)
        })?);
    }

    Ok(handlers)
}
