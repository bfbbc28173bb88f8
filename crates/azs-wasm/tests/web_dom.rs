#![cfg(target_arch = "wasm32")]

use azs_core::agent::EventHooks;
use azs_core::dom::Dom;
use azs_core::error::HookError;
use azs_core::gate::{GateConfig, GateMode, InputEvent, InputKinds, Offset, ScrollGate, Verdict};
use azs_core::suppressor::{Suppressor, SUPPRESSED_ATTR};
use azs_wasm::dom::WebDom;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{Document, Element};

wasm_bindgen_test_configure!(run_in_browser);

#[derive(Default)]
struct NoHooks;

impl EventHooks for NoHooks {
    fn attach_input_listeners(&mut self, _kinds: InputKinds) -> Result<(), HookError> {
        Ok(())
    }
    fn detach_input_listeners(&mut self) {}
    fn observe_mutations(&mut self) -> Result<(), HookError> {
        Ok(())
    }
    fn disconnect_mutations(&mut self) {}
}

fn document() -> Document {
    web_sys::window().unwrap().document().unwrap()
}

/// Fresh subtree under `body`, removed by the caller.
fn mount(document: &Document, html: &str) -> Element {
    let host = document.create_element("div").unwrap();
    host.set_inner_html(html);
    document.body().unwrap().append_child(&host).unwrap();
    host
}

fn by_id(document: &Document, id: &str) -> Element {
    document.get_element_by_id(id).unwrap()
}

#[wasm_bindgen_test]
fn native_matching_and_ancestor_walk() {
    let document = document();
    let host = mount(
        &document,
        r#"<div role="dialog"><span id="inside"></span></div><span id="outside"></span>"#,
    );
    let dom = WebDom::new(document.clone());

    let inside = by_id(&document, "inside");
    let outside = by_id(&document, "outside");
    assert!(dom.ancestors_matching_any(&inside, &["[role=\"dialog\"]"]));
    assert!(!dom.ancestors_matching_any(&outside, &["[role=\"dialog\"]"]));
    // the body itself is never part of the walk
    assert!(!dom.ancestors_matching_any(&outside, &["body"]));
    assert!(dom.matches(&inside, "[").is_err());

    host.remove();
}

#[wasm_bindgen_test]
fn suppressor_hides_and_restores_live_elements() {
    let document = document();
    let host = mount(
        &document,
        r#"<ytd-reel-shelf-renderer id="shelf" style="display: flex"></ytd-reel-shelf-renderer>"#,
    );
    let dom = WebDom::new(document.clone());
    let shelf = by_id(&document, "shelf");

    let mut suppressor = Suppressor::new();
    let report = suppressor.start(&dom, vec!["ytd-reel-shelf-renderer", "[broken"]);
    assert_eq!(report.hidden, 1);
    assert_eq!(report.skipped_patterns, 1);
    assert_eq!(dom.inline_style(&shelf, "display").as_deref(), Some("none"));
    assert!(shelf.has_attribute(SUPPRESSED_ATTR));

    suppressor.stop(&dom, true);
    assert_eq!(dom.inline_style(&shelf, "display").as_deref(), Some("flex"));
    assert!(!shelf.has_attribute(SUPPRESSED_ATTR));

    host.remove();
}

#[wasm_bindgen_test]
fn gate_uses_native_selectors() {
    let document = document();
    let host = mount(
        &document,
        r#"<div id="primary"><p id="feed"></p></div><div role="menu"><p id="menu-item"></p></div>"#,
    );
    let dom = WebDom::new(document.clone());

    let mut hooks = NoHooks;
    let mut gate = ScrollGate::new();
    let config = GateConfig {
        mode: GateMode::AllowList,
        allow: vec!["[role=\"menu\"]"],
        clip: vec!["#primary"],
    };
    gate.activate(&dom, &mut hooks, config, Offset::default()).unwrap();

    let wheel = InputEvent::Wheel { delta_x: 0.0, delta_y: 100.0 };
    let feed = by_id(&document, "feed");
    let item = by_id(&document, "menu-item");
    assert_eq!(gate.decide(&dom, Some(&feed), &wheel, Offset::default()), Verdict::Prevent);
    assert_eq!(gate.decide(&dom, Some(&item), &wheel, Offset::default()), Verdict::Pass);

    let primary = by_id(&document, "primary").dyn_into::<web_sys::HtmlElement>().unwrap();
    assert_eq!(primary.style().get_property_priority("overflow"), "important");

    gate.deactivate(&dom, &mut hooks);
    assert_eq!(dom.inline_style(&primary, "overflow"), None);

    host.remove();
}

#[wasm_bindgen_test]
fn exported_helpers() {
    assert_eq!(azs_wasm::classify("https://www.instagram.com/direct/inbox/").as_deref(), Some("instagram"));
    assert_eq!(azs_wasm::classify("https://example.com/"), None);
}
