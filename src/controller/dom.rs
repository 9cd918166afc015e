//! Browser DOM surface
//!
//! Renders into the container element and listens on the input field and
//! `window`. All text reaches the page through text nodes or attributes;
//! only the sanitized SVG is parsed as markup.

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, DomParser, Element, HtmlAnchorElement, HtmlInputElement, KeyboardEvent, SupportedType, Url, Window,
};

use crate::controller::surface::{Dispatch, Surface, UiEvent};
use crate::error::{describe_js_error, ConfigError, RenderError};
use crate::models::download::SVG_MIME_TYPE;
use crate::models::presentation::{PresentationMode, RenderedArtifact, DOWNLOAD_HINT};
use crate::services::downloader::content_blob;
use crate::services::listeners::ListenerScope;

pub struct DomSurface {
    window: Window,
    document: Document,
    container: Element,
    input: HtmlInputElement,
}

fn render_error(context: &str, err: JsValue) -> RenderError {
    RenderError(format!("{}: {}", context, describe_js_error(&err)))
}

/// Keys that activate a focused button-like element
pub fn is_activation_key(key: &str) -> bool {
    matches!(key, "Enter" | " " | "Spacebar")
}

/// Look up a required element
pub fn query_required(document: &Document, selector: &str) -> Result<Element, ConfigError> {
    document
        .query_selector(selector)
        .map_err(|e| ConfigError::InvalidValue {
            field: "selector",
            reason: format!("'{}': {}", selector, describe_js_error(&e)),
        })?
        .ok_or_else(|| ConfigError::ElementNotFound(selector.to_string()))
}

impl DomSurface {
    pub fn from_selectors(container_selector: &str, input_selector: &str) -> Result<Self, ConfigError> {
        let window = web_sys::window().ok_or_else(|| ConfigError::NoBrowser("no window".to_string()))?;
        let document = window
            .document()
            .ok_or_else(|| ConfigError::NoBrowser("no document".to_string()))?;

        let container = query_required(&document, container_selector)?;
        let input = query_required(&document, input_selector)?
            .dyn_into::<HtmlInputElement>()
            .map_err(|_| ConfigError::InvalidValue {
                field: "inputSelector",
                reason: format!("'{}' is not an <input> element", input_selector),
            })?;

        Ok(Self {
            window,
            document,
            container,
            input,
        })
    }

    fn clear(&self) {
        self.container.set_text_content(None);
    }

    /// Parse sanitized markup into an SVG element owned by our document
    fn parse_svg(&self, markup: &str) -> Result<Element, RenderError> {
        let parser = DomParser::new().map_err(|e| render_error("create DOMParser", e))?;
        let parsed = parser
            .parse_from_string(markup, SupportedType::ImageSvgXml)
            .map_err(|e| render_error("parse SVG", e))?;

        if parsed.get_elements_by_tag_name("parsererror").length() > 0 {
            return Err(RenderError("SVG markup could not be parsed".to_string()));
        }

        let root = parsed
            .document_element()
            .ok_or_else(|| RenderError("parsed SVG has no root element".to_string()))?;
        self.document
            .import_node_with_deep(&root, true)
            .map_err(|e| render_error("import SVG", e))?
            .dyn_into::<Element>()
            .map_err(|_| RenderError("imported SVG is not an element".to_string()))
    }

    fn set_attributes(element: &Element, attributes: &[(&str, &str)]) -> Result<(), RenderError> {
        for (name, value) in attributes {
            element
                .set_attribute(name, value)
                .map_err(|e| render_error(&format!("set {}", name), e))?;
        }
        Ok(())
    }

    fn mount_inline(&self, svg: &Element, scope: &ListenerScope, dispatch: Dispatch) -> Result<(), RenderError> {
        Self::set_attributes(svg, &[("title", DOWNLOAD_HINT), ("tabindex", "0")])?;
        self.container
            .append_child(svg)
            .map_err(|e| render_error("insert SVG", e))?;

        let on_click = dispatch.clone();
        scope.listen(svg, "click", move |_event| on_click(UiEvent::DownloadRequested))?;

        scope.listen(svg, "keydown", move |event| {
            let activated = event
                .dyn_ref::<KeyboardEvent>()
                .map_or(false, |key_event| is_activation_key(&key_event.key()));
            if activated {
                event.prevent_default();
                dispatch(UiEvent::DownloadRequested);
            }
        })
    }

    fn mount_anchor(
        &self,
        svg: &Element,
        artifact: &RenderedArtifact,
        scope: &ListenerScope,
        dispatch: Dispatch,
    ) -> Result<(), RenderError> {
        let blob = content_blob(&artifact.markup, SVG_MIME_TYPE).map_err(|e| render_error("create blob", e))?;
        let url = Url::create_object_url_with_blob(&blob).map_err(|e| render_error("create object URL", e))?;
        let revoke = url.clone();
        scope.on_cancel(move || {
            if let Err(err) = Url::revoke_object_url(&revoke) {
                log::warn!("Failed to revoke object URL: {}", describe_js_error(&err));
            }
        });

        let anchor: HtmlAnchorElement = self
            .document
            .create_element("a")
            .map_err(|e| render_error("create anchor", e))?
            .dyn_into()
            .map_err(|_| RenderError("created element is not an anchor".to_string()))?;
        anchor.set_href(&url);
        anchor.set_download(&artifact.filename);
        anchor.set_title(DOWNLOAD_HINT);

        anchor.append_child(svg).map_err(|e| render_error("wrap SVG", e))?;
        self.container
            .append_child(&anchor)
            .map_err(|e| render_error("insert anchor", e))?;

        // Route activation through the download trigger; the href stays for
        // "save link as" and middle clicks
        scope.listen(&anchor, "click", move |event| {
            event.prevent_default();
            dispatch(UiEvent::DownloadRequested);
        })
    }
}

impl Surface for DomSurface {
    fn input_value(&self) -> String {
        self.input.value()
    }

    fn set_input_value(&self, text: &str) {
        self.input.set_value(text);
    }

    fn attach(&self, scope: &ListenerScope, dispatch: Dispatch) -> Result<(), RenderError> {
        let input = self.input.clone();
        let on_input = dispatch.clone();
        scope.listen(&self.input, "input", move |_event| on_input(UiEvent::Input(input.value())))?;

        scope.listen(&self.window, "hashchange", move |_event| dispatch(UiEvent::HashChange))
    }

    fn render_artifact(
        &self,
        artifact: &RenderedArtifact,
        scope: &ListenerScope,
        dispatch: Dispatch,
    ) -> Result<(), RenderError> {
        let svg = self.parse_svg(&artifact.markup)?;
        Self::set_attributes(&svg, &[("role", "img"), ("aria-label", artifact.label.as_str())])?;

        self.clear();
        match artifact.mode {
            PresentationMode::InlineSvg => self.mount_inline(&svg, scope, dispatch),
            PresentationMode::StrictAnchor => self.mount_anchor(&svg, artifact, scope, dispatch),
        }
    }

    fn show_message(&self, message: &str) {
        self.clear();
        match self.document.create_element("div") {
            Ok(element) => {
                element.set_class_name("error-message");
                element.set_text_content(Some(message));
                if let Err(err) = self.container.append_child(&element) {
                    log::error!("Failed to show message: {}", describe_js_error(&err));
                }
            }
            Err(err) => {
                log::error!("Failed to create message element: {}", describe_js_error(&err));
                self.container.set_text_content(Some(message));
            }
        }
    }
}
