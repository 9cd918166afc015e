//! SVG markup sanitizer
//!
//! Streams the markup through quick-xml and re-emits only a whitelist of
//! SVG drawing elements and safe attributes. Dropped elements take their
//! whole subtree with them. Output is canonical (double-quoted attributes,
//! re-escaped text, no prolog), so sanitizing twice is a no-op.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::SanitizeError;

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";

/// Which inline presentation survives sanitization
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SanitizeProfile {
    /// Keep `style` attributes and `<style>` elements
    #[default]
    Styled,
    /// Drop them too, for pages with a CSP that forbids inline style
    Strict,
}

const DRAWING_ELEMENTS: &[&str] = &[
    "svg", "g", "defs", "symbol", "use", "title", "desc", "a", "switch",
    "path", "rect", "circle", "ellipse", "line", "polyline", "polygon", "image",
    "text", "tspan", "textPath", "linearGradient", "radialGradient", "stop",
    "clipPath", "mask", "pattern", "marker", "view",
    "filter", "feBlend", "feColorMatrix", "feComponentTransfer", "feComposite",
    "feConvolveMatrix", "feDiffuseLighting", "feDisplacementMap", "feDistantLight",
    "feDropShadow", "feFlood", "feFuncA", "feFuncB", "feFuncG", "feFuncR",
    "feGaussianBlur", "feImage", "feMerge", "feMergeNode", "feMorphology",
    "feOffset", "fePointLight", "feSpecularLighting", "feSpotLight", "feTile",
    "feTurbulence",
];

const STYLE_ELEMENT: &str = "style";

const UNSAFE_URL_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

/// Sanitize with inline styles kept
pub fn sanitize(raw: &str) -> Result<String, SanitizeError> {
    sanitize_svg(raw, SanitizeProfile::Styled)
}

/// Sanitize and strip inline presentation declarations
pub fn strip_presentation_attributes(svg: &str) -> Result<String, SanitizeError> {
    sanitize_svg(svg, SanitizeProfile::Strict)
}

pub fn sanitize_svg(raw: &str, profile: SanitizeProfile) -> Result<String, SanitizeError> {
    let mut reader = Reader::from_str(raw);
    reader.trim_text(false);

    let mut writer = Writer::new(Vec::new());

    // Open elements we emitted, and nesting inside a dropped element
    let mut open: Vec<String> = Vec::new();
    // `<style>` text is buffered so comments cannot split a pattern
    let mut style_text = String::new();
    let mut skip_depth = 0usize;
    let mut root_seen = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| malformed(&reader, e))?;

        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => return Err(SanitizeError::Malformed("unexpected end of markup".to_string())),
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(ref element) | Event::Empty(ref element) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = element_name(element)?;

                if !root_seen {
                    if name != "svg" {
                        return Err(SanitizeError::NotSvg(name));
                    }
                    root_seen = true;
                }

                if !is_allowed_element(element, &name, profile) {
                    log::debug!("svg sanitizer: dropping <{}>", name);
                    if !is_empty {
                        skip_depth = 1;
                    }
                    continue;
                }

                let clean = clean_element(element, &name, profile)?;
                if is_empty {
                    write(&mut writer, Event::Empty(clean))?;
                } else {
                    write(&mut writer, Event::Start(clean))?;
                    open.push(name);
                }

                if open.is_empty() {
                    // Self-closing root: nothing else belongs to the document
                    break;
                }
            }
            Event::End(_) => {
                let Some(name) = open.pop() else {
                    continue;
                };
                if name == STYLE_ELEMENT {
                    let css = std::mem::take(&mut style_text);
                    if is_safe_style(&css) {
                        write(&mut writer, Event::Text(BytesText::new(&css)))?;
                    } else {
                        log::debug!("svg sanitizer: dropping unsafe <style> content");
                    }
                }
                write(&mut writer, Event::End(BytesEnd::new(name)))?;
                if open.is_empty() {
                    break;
                }
            }
            Event::Text(ref text) => {
                let Some(parent) = open.last() else {
                    continue;
                };
                let content = text
                    .unescape()
                    .map_err(|e| SanitizeError::Malformed(e.to_string()))?;
                if parent == STYLE_ELEMENT {
                    style_text.push_str(&content);
                } else {
                    write(&mut writer, Event::Text(BytesText::new(&content)))?;
                }
            }
            Event::Eof => break,
            // Prolog, comments, processing instructions and CDATA never survive
            Event::Decl(_) | Event::DocType(_) | Event::PI(_) | Event::Comment(_) | Event::CData(_) => {}
        }
    }

    if !root_seen {
        return Err(SanitizeError::Empty);
    }
    if !open.is_empty() {
        return Err(SanitizeError::Malformed("unclosed <svg> element".to_string()));
    }

    String::from_utf8(writer.into_inner()).map_err(|e| SanitizeError::Malformed(e.to_string()))
}

fn malformed(reader: &Reader<&[u8]>, err: quick_xml::Error) -> SanitizeError {
    SanitizeError::Malformed(format!("at position {}: {}", reader.buffer_position(), err))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), SanitizeError> {
    writer
        .write_event(event)
        .map_err(|e| SanitizeError::Malformed(e.to_string()))
}

fn element_name(element: &BytesStart<'_>) -> Result<String, SanitizeError> {
    std::str::from_utf8(element.name().as_ref())
        .map(str::to_string)
        .map_err(|e| SanitizeError::Malformed(e.to_string()))
}

fn is_allowed_element(element: &BytesStart<'_>, name: &str, profile: SanitizeProfile) -> bool {
    // Prefixed elements belong to a foreign namespace
    if element.name().prefix().is_some() {
        return false;
    }
    if name == STYLE_ELEMENT {
        return profile == SanitizeProfile::Styled;
    }
    DRAWING_ELEMENTS.contains(&name)
}

/// Rebuild the start tag keeping only safe attributes
fn clean_element(
    element: &BytesStart<'_>,
    name: &str,
    profile: SanitizeProfile,
) -> Result<BytesStart<'static>, SanitizeError> {
    let mut clean = BytesStart::new(name.to_string());

    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| SanitizeError::Malformed(e.to_string()))?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(|e| SanitizeError::Malformed(e.to_string()))?;
        let value = attribute
            .unescape_value()
            .map_err(|e| SanitizeError::Malformed(e.to_string()))?;

        if is_allowed_attribute(key, &value, profile) {
            clean.push_attribute((key, value.as_ref()));
        } else {
            log::debug!("svg sanitizer: dropping {}=\"...\" on <{}>", key, name);
        }
    }

    Ok(clean)
}

fn is_allowed_attribute(key: &str, value: &str, profile: SanitizeProfile) -> bool {
    let lower = key.to_ascii_lowercase();

    if lower.starts_with("on") {
        return false;
    }

    match lower.as_str() {
        "xmlns" => value == SVG_NAMESPACE,
        "xmlns:xlink" => value == XLINK_NAMESPACE,
        "xml:space" | "xml:lang" => true,
        "href" | "xlink:href" => is_safe_url(value),
        "style" => profile == SanitizeProfile::Styled && is_safe_style(value),
        _ => !lower.contains(':'),
    }
}

/// Lowercase and drop whitespace/control characters, the way browsers
/// tolerate them inside URL schemes
fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_safe_url(value: &str) -> bool {
    let normalized = normalize(value);
    !UNSAFE_URL_SCHEMES
        .iter()
        .any(|scheme| normalized.starts_with(scheme))
}

/// Applies to `style` attributes and `<style>` element content alike
fn is_safe_style(value: &str) -> bool {
    const UNSAFE_CSS: &[&str] = &["javascript:", "vbscript:", "expression(", "@import", "-moz-binding"];
    let normalized = normalize(value);
    !UNSAFE_CSS.iter().any(|pattern| normalized.contains(pattern))
}
