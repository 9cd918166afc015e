//! Saving generated content as a file

use std::cell::RefCell;

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Blob, BlobPropertyBag, Document, HtmlAnchorElement, Url};

use crate::error::{describe_js_error, ConfigError, DownloadError};
use crate::models::download::DownloadRequest;

pub trait FileDownloader {
    fn download(&self, request: &DownloadRequest) -> Result<(), DownloadError>;
}

/// Downloads through a transient object URL and a hidden `<a download>`
pub struct BrowserFileDownloader {
    document: Document,
}

fn js_error(context: &str, err: JsValue) -> DownloadError {
    DownloadError(format!("{}: {}", context, describe_js_error(&err)))
}

impl BrowserFileDownloader {
    pub fn new() -> Result<Self, ConfigError> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| ConfigError::NoBrowser("no document".to_string()))?;
        Ok(Self { document })
    }

    pub fn with_document(document: Document) -> Self {
        Self { document }
    }

    fn click_anchor(&self, url: &str, filename: &str) -> Result<(), DownloadError> {
        let anchor: HtmlAnchorElement = self
            .document
            .create_element("a")
            .map_err(|e| js_error("create anchor", e))?
            .dyn_into()
            .map_err(|_| DownloadError("created element is not an anchor".to_string()))?;
        anchor.set_href(url);
        anchor.set_download(filename);
        anchor
            .style()
            .set_property("display", "none")
            .map_err(|e| js_error("hide anchor", e))?;

        let body = self
            .document
            .body()
            .ok_or_else(|| DownloadError("document has no body".to_string()))?;
        body.append_child(&anchor).map_err(|e| js_error("attach anchor", e))?;
        anchor.click();
        anchor.remove();
        Ok(())
    }
}

/// Blob holding `content` with the given MIME type
pub fn content_blob(content: &str, mime_type: &str) -> Result<Blob, JsValue> {
    let parts = js_sys::Array::of1(&JsValue::from_str(content));
    let options = BlobPropertyBag::new();
    options.set_type(mime_type);
    Blob::new_with_str_sequence_and_options(&parts, &options)
}

impl FileDownloader for BrowserFileDownloader {
    fn download(&self, request: &DownloadRequest) -> Result<(), DownloadError> {
        let blob = content_blob(&request.content, &request.mime_type)
            .map_err(|e| js_error("create blob", e))?;
        let url = Url::create_object_url_with_blob(&blob).map_err(|e| js_error("create object URL", e))?;

        // The browser gives no completion signal, so release right after the click
        let result = self.click_anchor(&url, &request.filename);
        if let Err(err) = Url::revoke_object_url(&url) {
            log::warn!("Failed to revoke object URL: {}", describe_js_error(&err));
        }

        if result.is_ok() {
            log::info!("Downloaded {} ({} bytes)", request.filename, request.content.len());
        }
        result
    }
}

/// Records downloads instead of performing them
#[derive(Default)]
pub struct RecordingDownloader {
    downloads: RefCell<Vec<DownloadRequest>>,
}

impl RecordingDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn downloads(&self) -> Vec<DownloadRequest> {
        self.downloads.borrow().clone()
    }

    pub fn last_download(&self) -> Option<DownloadRequest> {
        self.downloads.borrow().last().cloned()
    }

    pub fn clear_history(&self) {
        self.downloads.borrow_mut().clear();
    }
}

impl FileDownloader for RecordingDownloader {
    fn download(&self, request: &DownloadRequest) -> Result<(), DownloadError> {
        self.downloads.borrow_mut().push(request.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::download::SVG_MIME_TYPE;

    #[test]
    fn test_tracks_downloaded_files() {
        let downloader = RecordingDownloader::new();
        let request = DownloadRequest::svg("test.svg", "<svg>test</svg>");

        downloader.download(&request).unwrap();

        assert_eq!(downloader.downloads(), vec![request]);
        assert_eq!(downloader.downloads()[0].mime_type, SVG_MIME_TYPE);
    }

    #[test]
    fn test_last_download() {
        let downloader = RecordingDownloader::new();
        assert!(downloader.last_download().is_none());

        downloader.download(&DownloadRequest::svg("first.svg", "content1")).unwrap();
        downloader.download(&DownloadRequest::svg("second.svg", "content2")).unwrap();

        let last = downloader.last_download().unwrap();
        assert_eq!(last.filename, "second.svg");
        assert_eq!(last.content, "content2");
    }

    #[test]
    fn test_clear_history() {
        let downloader = RecordingDownloader::new();
        downloader.download(&DownloadRequest::svg("test.svg", "content")).unwrap();

        downloader.clear_history();
        assert!(downloader.downloads().is_empty());
    }
}
