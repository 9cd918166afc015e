//! Capabilities the controller depends on
//!
//! Each service is a small trait with a browser implementation and an
//! in-memory one, so the controller runs unchanged in host tests.

pub mod downloader;
pub mod event_loop;
pub mod generator;
pub mod hash_store;
pub mod listeners;

pub use downloader::{BrowserFileDownloader, FileDownloader, RecordingDownloader};
pub use event_loop::{BrowserEventLoop, EventLoop, ManualEventLoop, TimerHandle};
pub use generator::{ArtifactGenerator, Gate, QrSvgGenerator, ScriptedGenerator};
pub use hash_store::{BrowserHashStore, HashStore, MemoryHashStore};
pub use listeners::ListenerScope;
