//! Browser bindings for the chat widget.

mod dom;
mod storage;
mod voice;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use js_sys::Promise;
use pigeon_client::create_backend;
use pigeon_widget::{ChatWidget, WidgetSettings};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};
use web_sys::{Document, Element, HtmlElement, HtmlInputElement, KeyboardEvent, Window};

pub use dom::{ChoiceHandler, DomSurface};
pub use storage::LocalStorage;
pub use voice::BrowserVoice;

const CONTAINER_ID: &str = "chatbot-container";
const MESSAGES_ID: &str = "chatbot-messages";
const INPUT_ID: &str = "user-input";
const READ_ALOUD_TOGGLE_ID: &str = "read-aloud-toggle";
const SETTINGS_MENU_ID: &str = "settings-menu";

const READ_ALOUD_ON_COLOR: &str = "#28a745";
const READ_ALOUD_OFF_COLOR: &str = "#007bff";
const OPEN_DELAY_MS: i32 = 10;

/// Initialize WASM module
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Pigeon chat widget module initialized");
}

/// Chat widget bound to the host page.
#[wasm_bindgen]
pub struct ChatbotWidget {
    window: Window,
    document: Document,
    widget: Rc<ChatWidget>,
    _on_enter: Closure<dyn FnMut(KeyboardEvent)>,
}

#[wasm_bindgen]
impl ChatbotWidget {
    /// Mounts the widget, replays stored history and fetches the greeting if needed.
    ///
    /// `config` is an optional JSON settings document.
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<String>) -> Result<ChatbotWidget, JsValue> {
        let window = web_sys::window().ok_or_else(|| js_error("no global window"))?;
        let document = window
            .document()
            .ok_or_else(|| js_error("window has no document"))?;
        let settings = WidgetSettings::load(config.as_deref());

        let backend = create_backend(settings.client_config()).map_err(js_error)?;
        let storage = LocalStorage::open(&window).map_err(js_error)?;
        let container = element_by_id(&document, MESSAGES_ID)?;

        let slot: Rc<RefCell<Weak<ChatWidget>>> = Rc::new(RefCell::new(Weak::new()));
        let surface = DomSurface::new(document.clone(), container, choice_handler(slot.clone()));

        let widget = Rc::new(ChatWidget::new(
            &settings,
            backend,
            Box::new(surface),
            Box::new(storage),
            Rc::new(BrowserVoice::new(window.clone())),
        ));
        *slot.borrow_mut() = Rc::downgrade(&widget);

        let on_enter = {
            let document = document.clone();
            let widget = widget.clone();
            Closure::<dyn FnMut(KeyboardEvent)>::new(move |event: KeyboardEvent| {
                if event.key() == "Enter" {
                    submit_input(&document, widget.clone());
                }
            })
        };
        input_box(&document)?
            .add_event_listener_with_callback("keypress", on_enter.as_ref().unchecked_ref())?;

        let host = Self {
            window,
            document,
            widget,
            _on_enter: on_enter,
        };
        host.open()?;
        if let Err(error) = sync_read_aloud_toggle(&host.document, host.widget.read_aloud()) {
            tracing::warn!("read-aloud toggle not synced: {}", storage::describe(&error));
        }

        let widget = host.widget.clone();
        spawn_local(async move { widget.start().await });

        Ok(host)
    }

    /// Shows the container, then fades it in.
    pub fn open(&self) -> Result<(), JsValue> {
        let container = element_by_id(&self.document, CONTAINER_ID)?;
        if let Some(html) = container.dyn_ref::<HtmlElement>() {
            html.style().set_property("display", "block")?;
        }

        let reveal = Closure::once_into_js(move || {
            if let Err(error) = container.class_list().add_1("show") {
                tracing::warn!("failed to show chat container: {}", storage::describe(&error));
            }
            if let Err(error) = container.set_attribute("aria-hidden", "false") {
                tracing::warn!("failed to update aria-hidden: {}", storage::describe(&error));
            }
        });
        self.window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                reveal.unchecked_ref(),
                OPEN_DELAY_MS,
            )?;
        Ok(())
    }

    /// Sends the input box contents; resolves once the reply is rendered.
    #[wasm_bindgen(js_name = sendMessage)]
    pub fn send_message(&self) -> Result<Promise, JsValue> {
        let widget = self.widget.clone();
        let text = take_input(&self.document)?;

        Ok(future_to_promise(async move {
            if let Some(text) = text {
                widget.submit(&text).await;
            }
            Ok(JsValue::UNDEFINED)
        }))
    }

    /// Flips read-aloud and updates the toggle button; returns the new state.
    #[wasm_bindgen(js_name = toggleReadAloud)]
    pub fn toggle_read_aloud(&self) -> Result<bool, JsValue> {
        let enabled = self.widget.toggle_read_aloud();
        sync_read_aloud_toggle(&self.document, enabled)?;
        Ok(enabled)
    }

    #[wasm_bindgen(js_name = toggleSettingsMenu)]
    pub fn toggle_settings_menu(&self) -> Result<(), JsValue> {
        toggle_settings_menu(&self.document)
    }

    /// Clears the conversation everywhere; resolves to whether the server acknowledged.
    #[wasm_bindgen(js_name = resetChat)]
    pub fn reset_chat(&self) -> Promise {
        let widget = self.widget.clone();
        let document = self.document.clone();

        future_to_promise(async move {
            let acknowledged = widget.reset().await;
            if acknowledged {
                toggle_settings_menu(&document)?;
            }
            Ok(JsValue::from_bool(acknowledged))
        })
    }

    /// Listens once; the transcript is placed in the input box and sent.
    #[wasm_bindgen(js_name = startVoiceRecognition)]
    pub fn start_voice_recognition(&self) -> bool {
        let document = self.document.clone();
        let widget = Rc::downgrade(&self.widget);

        self.widget.start_voice_input(Box::new(move |transcript| {
            let Some(widget) = widget.upgrade() else {
                return;
            };
            match input_box(&document) {
                Ok(input) => input.set_value(&transcript),
                Err(error) => {
                    tracing::error!("voice transcript has no input box: {}", storage::describe(&error));
                    return;
                }
            }
            submit_input(&document, widget);
        }))
    }

    /// The visible transcript in its persisted shape.
    pub fn transcript(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.widget.entries())?)
    }
}

fn choice_handler(slot: Rc<RefCell<Weak<ChatWidget>>>) -> ChoiceHandler {
    Rc::new(move |choice: String| {
        let Some(widget) = slot.borrow().upgrade() else {
            tracing::warn!("choice clicked after the widget was dropped");
            return;
        };
        spawn_local(async move { widget.select_choice(&choice).await });
    })
}

fn submit_input(document: &Document, widget: Rc<ChatWidget>) {
    match take_input(document) {
        Ok(Some(text)) => spawn_local(async move { widget.submit(&text).await }),
        Ok(None) => {}
        Err(error) => tracing::error!("failed to read user input: {}", storage::describe(&error)),
    }
}

/// Returns the input text and clears the box; blank input is left untouched.
fn take_input(document: &Document) -> Result<Option<String>, JsValue> {
    let input = input_box(document)?;
    let text = input.value();
    if text.trim().is_empty() {
        return Ok(None);
    }

    input.set_value("");
    Ok(Some(text))
}

/// Mirrors the read-aloud state onto the toggle button.
fn sync_read_aloud_toggle(document: &Document, enabled: bool) -> Result<(), JsValue> {
    let button = element_by_id(document, READ_ALOUD_TOGGLE_ID)?;
    if let Some(html) = button.dyn_ref::<HtmlElement>() {
        let color = if enabled {
            READ_ALOUD_ON_COLOR
        } else {
            READ_ALOUD_OFF_COLOR
        };
        html.style().set_property("background-color", color)?;
    }
    button.set_attribute("aria-pressed", if enabled { "true" } else { "false" })
}

fn toggle_settings_menu(document: &Document) -> Result<(), JsValue> {
    let menu = element_by_id(document, SETTINGS_MENU_ID)?;
    match menu.dyn_ref::<HtmlElement>() {
        Some(html) => dom::toggle_display(html, "block"),
        None => Ok(()),
    }
}

fn input_box(document: &Document) -> Result<HtmlInputElement, JsValue> {
    element_by_id(document, INPUT_ID)?
        .dyn_into::<HtmlInputElement>()
        .map_err(|_| js_error(format!("#{INPUT_ID} is not an input element")))
}

fn element_by_id(document: &Document, id: &str) -> Result<Element, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| js_error(format!("missing #{id} element")))
}

fn js_error(message: impl ToString) -> JsValue {
    JsValue::from_str(&message.to_string())
}
