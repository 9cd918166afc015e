//! URL fragment as persisted state
//!
//! Values are percent-encoded with the `encodeURIComponent` character set on
//! write and decoded on read, so text containing `#`, `?`, `%` or spaces
//! round-trips exactly.

use std::cell::RefCell;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use wasm_bindgen::JsValue;

use crate::error::{describe_js_error, ConfigError, HashStoreError};

/// Everything `encodeURIComponent` escapes
const FRAGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub const DEFAULT_BASE_ADDRESS: &str = "http://localhost:3000/";

pub fn encode_fragment(value: &str) -> String {
    utf8_percent_encode(value, FRAGMENT_ENCODE_SET).to_string()
}

/// Decode a fragment (with or without its leading `#`). Invalid UTF-8
/// escapes decode lossily rather than failing.
pub fn decode_fragment(fragment: &str) -> String {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
    percent_decode_str(fragment).decode_utf8_lossy().into_owned()
}

/// Address with everything from the first `#` removed
pub fn strip_fragment(address: &str) -> &str {
    address.split('#').next().unwrap_or(address)
}

pub trait HashStore {
    /// Decoded fragment value, empty if unset
    fn value(&self) -> String;

    /// Store `value` in the fragment; an empty value removes it
    fn set_value(&self, value: &str) -> Result<(), HashStoreError>;

    /// Remove the fragment without leaving a trailing `#` or reloading
    fn remove_value(&self) -> Result<(), HashStoreError>;

    /// Full address including the fragment
    fn current_address(&self) -> String;

    fn base_address(&self) -> String {
        strip_fragment(&self.current_address()).to_string()
    }

    /// Fragment value, or the base address when the fragment is empty
    fn effective_text(&self) -> String {
        let value = self.value();
        if value.is_empty() {
            self.base_address()
        } else {
            value
        }
    }
}

/// Hash store backed by `window.location` and `window.history`
pub struct BrowserHashStore {
    window: web_sys::Window,
}

impl BrowserHashStore {
    pub fn new() -> Result<Self, ConfigError> {
        let window = web_sys::window().ok_or_else(|| ConfigError::NoBrowser("no window".to_string()))?;
        Ok(Self { window })
    }

    fn location(&self) -> web_sys::Location {
        self.window.location()
    }
}

fn js_error(context: &str, err: JsValue) -> HashStoreError {
    HashStoreError(format!("{}: {}", context, describe_js_error(&err)))
}

impl HashStore for BrowserHashStore {
    fn value(&self) -> String {
        match self.location().hash() {
            Ok(hash) => decode_fragment(&hash),
            Err(err) => {
                log::warn!("Failed to read location.hash: {}", describe_js_error(&err));
                String::new()
            }
        }
    }

    fn set_value(&self, value: &str) -> Result<(), HashStoreError> {
        if value.is_empty() {
            return self.remove_value();
        }
        self.location()
            .set_hash(&encode_fragment(value))
            .map_err(|e| js_error("set location.hash", e))
    }

    fn remove_value(&self) -> Result<(), HashStoreError> {
        let location = self.location();
        let pathname = location.pathname().map_err(|e| js_error("read location.pathname", e))?;
        let search = location.search().map_err(|e| js_error("read location.search", e))?;
        let title = self
            .window
            .document()
            .map(|document| document.title())
            .unwrap_or_default();

        let history = self.window.history().map_err(|e| js_error("access history", e))?;
        history
            .push_state_with_url(&JsValue::from_str(""), &title, Some(&format!("{}{}", pathname, search)))
            .map_err(|e| js_error("history.pushState", e))
    }

    fn current_address(&self) -> String {
        self.location().href().unwrap_or_else(|err| {
            log::warn!("Failed to read location.href: {}", describe_js_error(&err));
            String::new()
        })
    }
}

/// In-memory hash store for tests. Keeps the fragment in encoded form so
/// the codec is exercised exactly as in the browser.
pub struct MemoryHashStore {
    base_address: RefCell<String>,
    fragment: RefCell<String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::with_base_address(DEFAULT_BASE_ADDRESS)
    }

    pub fn with_base_address(base_address: &str) -> Self {
        Self {
            base_address: RefCell::new(base_address.to_string()),
            fragment: RefCell::new(String::new()),
        }
    }

    pub fn set_base_address(&self, base_address: &str) {
        *self.base_address.borrow_mut() = base_address.to_string();
    }

    /// Raw (encoded) fragment, as it would appear after `#`
    pub fn raw_fragment(&self) -> String {
        self.fragment.borrow().clone()
    }

    /// Simulate the user editing the address bar or navigating history
    pub fn set_raw_fragment(&self, fragment: &str) {
        *self.fragment.borrow_mut() = fragment.strip_prefix('#').unwrap_or(fragment).to_string();
    }
}

impl Default for MemoryHashStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HashStore for MemoryHashStore {
    fn value(&self) -> String {
        decode_fragment(&self.fragment.borrow())
    }

    fn set_value(&self, value: &str) -> Result<(), HashStoreError> {
        if value.is_empty() {
            return self.remove_value();
        }
        *self.fragment.borrow_mut() = encode_fragment(value);
        Ok(())
    }

    fn remove_value(&self) -> Result<(), HashStoreError> {
        self.fragment.borrow_mut().clear();
        Ok(())
    }

    fn current_address(&self) -> String {
        let fragment = self.fragment.borrow();
        if fragment.is_empty() {
            self.base_address.borrow().clone()
        } else {
            format!("{}#{}", self.base_address.borrow(), fragment)
        }
    }

    fn base_address(&self) -> String {
        self.base_address.borrow().clone()
    }
}
