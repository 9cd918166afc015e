//! Text → SVG artifact generation
//!
//! The QR symbol itself comes from the `qrcode` crate; this module only picks
//! the encoder options and turns encoder failures into `GenerationError`.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use async_trait::async_trait;
use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};

use crate::error::{ConfigError, GenerationError};
use crate::models::config::QrConfig;

/// Produces raw (unsanitized) SVG markup for a piece of text
#[async_trait(?Send)]
pub trait ArtifactGenerator {
    async fn generate(&self, text: &str) -> Result<String, GenerationError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QrSvgGenerator {
    ec_level: EcLevel,
    min_size: u32,
    dark_color: String,
    light_color: String,
}

impl Default for QrSvgGenerator {
    fn default() -> Self {
        Self {
            ec_level: EcLevel::M,
            min_size: 256,
            dark_color: "#000000".to_string(),
            light_color: "#ffffff".to_string(),
        }
    }
}

impl QrSvgGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &QrConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            ec_level: parse_ec_level(&config.error_correction)?,
            min_size: config.min_size,
            dark_color: config.dark_color.clone(),
            light_color: config.light_color.clone(),
        })
    }

    /// Encode synchronously; the async trait method wraps this
    pub fn render(&self, text: &str) -> Result<String, GenerationError> {
        let code = QrCode::with_error_correction_level(text.as_bytes(), self.ec_level)
            .map_err(|e| GenerationError::Encode(e.to_string()))?;

        Ok(code
            .render::<svg::Color<'_>>()
            .min_dimensions(self.min_size, self.min_size)
            .dark_color(svg::Color(self.dark_color.as_str()))
            .light_color(svg::Color(self.light_color.as_str()))
            .quiet_zone(true)
            .build())
    }
}

fn parse_ec_level(level: &str) -> Result<EcLevel, ConfigError> {
    match level.to_ascii_uppercase().as_str() {
        "L" => Ok(EcLevel::L),
        "M" => Ok(EcLevel::M),
        "Q" => Ok(EcLevel::Q),
        "H" => Ok(EcLevel::H),
        other => Err(ConfigError::InvalidValue {
            field: "qr.errorCorrection",
            reason: format!("expected L, M, Q or H, got '{}'", other),
        }),
    }
}

#[async_trait(?Send)]
impl ArtifactGenerator for QrSvgGenerator {
    async fn generate(&self, text: &str) -> Result<String, GenerationError> {
        let result = self.render(text);
        if let Err(err) = &result {
            log::warn!("QR encoder rejected {} bytes of input: {}", text.len(), err);
        }
        result
    }
}

/// Manually opened latch; futures waiting on it stay pending until `open()`
#[derive(Clone, Default)]
pub struct Gate {
    open: Rc<Cell<bool>>,
    waker: Rc<RefCell<Option<Waker>>>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) {
        self.open.set(true);
        if let Some(waker) = self.waker.borrow_mut().take() {
            waker.wake();
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.get()
    }

    pub fn wait(&self) -> GateWait {
        GateWait { gate: self.clone() }
    }
}

pub struct GateWait {
    gate: Gate,
}

impl Future for GateWait {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.gate.is_open() {
            Poll::Ready(())
        } else {
            *self.gate.waker.borrow_mut() = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

/// Test double: real QR output, but fails on chosen inputs, records every
/// call and can hold a result back until its gate opens.
#[derive(Default)]
pub struct ScriptedGenerator {
    inner: QrSvgGenerator,
    failing: RefCell<HashSet<String>>,
    held: RefCell<HashMap<String, Gate>>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `generate(text)` fail
    pub fn fail_on(&self, text: &str) {
        self.failing.borrow_mut().insert(text.to_string());
    }

    /// Hold results for `text` until the returned gate is opened
    pub fn hold(&self, text: &str) -> Gate {
        let gate = Gate::new();
        self.held.borrow_mut().insert(text.to_string(), gate.clone());
        gate
    }

    /// Every text passed to `generate`, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

#[async_trait(?Send)]
impl ArtifactGenerator for ScriptedGenerator {
    async fn generate(&self, text: &str) -> Result<String, GenerationError> {
        self.calls.borrow_mut().push(text.to_string());

        let gate = self.held.borrow().get(text).cloned();
        if let Some(gate) = gate {
            gate.wait().await;
        }

        if self.failing.borrow().contains(text) {
            return Err(GenerationError::Encode("QR generation failed".to_string()));
        }
        self.inner.render(text)
    }
}
