use std::collections::HashMap;
use std::rc::Rc;

use pigeon_widget::chat::OPTIONS_TOGGLE_LABEL;
use pigeon_widget::{Fragment, MessageSurface, NodeId, RenderedNode};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement};

use crate::storage::describe;

const TYPING_MARKUP: &str = r#"<div id="typing-window"><span class="typing"></span><span class="typing"></span><span class="typing"></span></div>"#;
const EMBED_ALLOW: &str = "accelerometer; autoplay; encrypted-media; gyroscope; picture-in-picture";

/// Invoked with the text of a clicked dropdown option or reply button.
pub type ChoiceHandler = Rc<dyn Fn(String)>;

/// Click handlers must live exactly as long as the node they are attached to.
struct MountedNode {
    element: Element,
    _listeners: Vec<Closure<dyn FnMut()>>,
}

/// Renders fragments into the `#chatbot-messages` container.
pub struct DomSurface {
    document: Document,
    container: Element,
    on_choice: ChoiceHandler,
    mounted: HashMap<NodeId, MountedNode>,
}

impl DomSurface {
    pub fn new(document: Document, container: Element, on_choice: ChoiceHandler) -> Self {
        Self {
            document,
            container,
            on_choice,
            mounted: HashMap::new(),
        }
    }

    fn build(&self, node: &RenderedNode) -> Result<MountedNode, JsValue> {
        let element = self.document.create_element("div")?;
        element
            .class_list()
            .add_2("message", node.sender.as_str())?;
        let mut listeners = Vec::new();

        match &node.fragment {
            Fragment::Markup(markup) => element.set_inner_html(markup),
            Fragment::Image { src, alt } => {
                let image = self.document.create_element("img")?;
                image.set_attribute("src", src)?;
                image.set_attribute("alt", alt)?;
                set_style(&image, "max-width", "50%")?;
                element.append_child(&image)?;
            }
            Fragment::Video { src } => {
                let video = self.document.create_element("video")?;
                video.set_attribute("src", src)?;
                video.set_attribute("controls", "")?;
                set_style(&video, "max-width", "100%")?;
                element.append_child(&video)?;
            }
            Fragment::Embed { src } => {
                let frame = self.document.create_element("iframe")?;
                frame.set_attribute("src", src)?;
                frame.set_attribute("width", "100%")?;
                frame.set_attribute("height", "315")?;
                frame.set_attribute("allow", EMBED_ALLOW)?;
                frame.set_attribute("allowfullscreen", "")?;
                element.append_child(&frame)?;
            }
            Fragment::Dropdown { message, options } => {
                let dropdown = self.document.create_element("div")?;
                dropdown.class_list().add_1("dropdown-container")?;

                let label = self.document.create_element("div")?;
                label.class_list().add_1("dropdown-message")?;
                label.set_text_content(Some(message));

                let list = self.document.create_element("div")?;
                list.class_list().add_1("options-list")?;
                for option in options {
                    let item = self.document.create_element("div")?;
                    item.set_text_content(Some(option));
                    listeners.push(self.on_click(&item, self.choice_listener(option))?);
                    list.append_child(&item)?;
                }

                let toggle = self.document.create_element("button")?;
                toggle.class_list().add_1("options-button")?;
                toggle.set_text_content(Some(OPTIONS_TOGGLE_LABEL));
                let toggled = list.clone();
                listeners.push(self.on_click(
                    &toggle,
                    Box::new(move || toggle_options(&toggled)),
                )?);

                dropdown.append_child(&label)?;
                dropdown.append_child(&toggle)?;
                dropdown.append_child(&list)?;
                element.append_child(&dropdown)?;
            }
            Fragment::Buttons { message, buttons } => {
                let text = self.document.create_element("div")?;
                text.set_text_content(Some(message));
                element.append_child(&text)?;

                let row = self.document.create_element("div")?;
                row.class_list().add_1("button-response")?;
                for label in buttons {
                    let button = self.document.create_element("button")?;
                    button.set_text_content(Some(label));
                    listeners.push(self.on_click(&button, self.choice_listener(label))?);
                    row.append_child(&button)?;
                }
                element.append_child(&row)?;
            }
            Fragment::Typing => {
                element.class_list().add_1("typing-indicator")?;
                element.set_inner_html(TYPING_MARKUP);
            }
        }

        Ok(MountedNode {
            element,
            _listeners: listeners,
        })
    }

    fn choice_listener(&self, choice: &str) -> Box<dyn FnMut()> {
        let on_choice = self.on_choice.clone();
        let choice = choice.to_string();
        Box::new(move || on_choice(choice.clone()))
    }

    fn on_click(
        &self,
        target: &Element,
        handler: Box<dyn FnMut()>,
    ) -> Result<Closure<dyn FnMut()>, JsValue> {
        let closure = Closure::wrap(handler);
        target.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
        Ok(closure)
    }
}

impl MessageSurface for DomSurface {
    fn append(&mut self, node: RenderedNode) {
        let mounted = match self.build(&node) {
            Ok(mounted) => mounted,
            Err(error) => {
                tracing::error!("failed to build message node {:?}: {}", node.id, describe(&error));
                return;
            }
        };

        if let Err(error) = self.container.append_child(&mounted.element) {
            tracing::error!("failed to attach message node {:?}: {}", node.id, describe(&error));
            return;
        }
        self.mounted.insert(node.id, mounted);
    }

    fn remove(&mut self, id: NodeId) {
        if let Some(mounted) = self.mounted.remove(&id) {
            mounted.element.remove();
        }
    }

    fn clear(&mut self) {
        self.container.set_inner_html("");
        self.mounted.clear();
    }

    fn scroll_to_latest(&mut self) {
        self.container.set_scroll_top(self.container.scroll_height());
    }
}

fn set_style(element: &Element, property: &str, value: &str) -> Result<(), JsValue> {
    match element.dyn_ref::<HtmlElement>() {
        Some(html) => html.style().set_property(property, value),
        None => Ok(()),
    }
}

fn toggle_options(list: &Element) {
    let Some(html) = list.dyn_ref::<HtmlElement>() else {
        return;
    };
    if let Err(error) = toggle_display(html, "flex") {
        tracing::warn!("failed to toggle options list: {}", describe(&error));
    }
}

/// Flips `display` between `shown` and `none`.
pub(crate) fn toggle_display(element: &HtmlElement, shown: &'static str) -> Result<(), JsValue> {
    let style = element.style();
    let current = style.get_property_value("display")?;
    style.set_property("display", next_display(&current, shown))
}

fn next_display(current: &str, shown: &'static str) -> &'static str {
    if current == shown { "none" } else { shown }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_toggles_between_shown_and_none() {
        assert_eq!(next_display("", "flex"), "flex");
        assert_eq!(next_display("none", "flex"), "flex");
        assert_eq!(next_display("flex", "flex"), "none");
        assert_eq!(next_display("block", "block"), "none");
    }
}
