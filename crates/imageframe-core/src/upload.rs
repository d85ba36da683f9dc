//! Drag-and-drop image upload.
//!
//! A dropped file shows up as a placeholder image straight away. The
//! transport posts the file to the repository endpoint; when the answer
//! comes back the placeholder either becomes the real image or goes away.

use crate::config::PluginConfig;
use crate::dom::{Document, NodeId, escape_attribute};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use url::Url;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Prefix of placeholder image ids.
pub const PLACEHOLDER_PREFIX: &str = "imageframe-upload-";

const REQUEST_TIMEOUT_SECS: u64 = 60;
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// A dropped file on its way to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub repository_id: Option<String>,
    pub context_id: Option<String>,
}

impl UploadRequest {
    pub fn new(file_name: &str, mime_type: &str, bytes: Vec<u8>, config: &PluginConfig) -> Self {
        Self {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            bytes,
            repository_id: config.repository_id.clone(),
            context_id: config.context_id.clone(),
        }
    }

    /// Only images can be dropped into the editor.
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Replacement the server picked when the file name was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFile {
    pub url: String,
    #[serde(default)]
    pub filename: Option<String>,
}

/// JSON body returned by the upload endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadResponse {
    pub url: Option<String>,
    pub file: Option<String>,
    pub id: Option<String>,
    /// `"fileexists"` when the server stored the file under another name.
    pub event: Option<String>,
    pub newfile: Option<NewFile>,
    pub error: Option<String>,
}

impl UploadResponse {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Upload(format!("malformed response: {e}")))
    }

    /// Address the image should load from.
    pub fn image_url(&self) -> Result<&str> {
        if let Some(error) = &self.error {
            return Err(Error::Upload(error.clone()));
        }
        if self.event.as_deref() == Some("fileexists") {
            return self
                .newfile
                .as_ref()
                .map(|file| file.url.as_str())
                .ok_or_else(|| Error::Upload("fileexists without a replacement file".to_string()));
        }
        self.url
            .as_deref()
            .ok_or_else(|| Error::Upload("response has no url".to_string()))
    }
}

/// Sends an upload request somewhere and returns the server's answer.
pub trait UploadTransport {
    fn upload<'a>(&'a self, request: &'a UploadRequest) -> BoxFuture<'a, Result<UploadResponse>>;
}

/// Multipart POST to the configured repository endpoint.
#[derive(Debug, Clone)]
pub struct HttpUploadTransport {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpUploadTransport {
    /// `config.upload_url` may be relative; it is resolved against `base`.
    pub fn new(base: &Url, config: &PluginConfig) -> Result<Self> {
        let endpoint = base
            .join(&config.upload_url)
            .map_err(|e| Error::Config(format!("upload_url: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Upload(e.to_string()))?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn form(request: &UploadRequest) -> Result<reqwest::multipart::Form> {
        let file = reqwest::multipart::Part::bytes(request.bytes.clone())
            .file_name(request.file_name.clone())
            .mime_str(&request.mime_type)
            .map_err(|e| Error::Upload(e.to_string()))?;
        let mut form = reqwest::multipart::Form::new()
            .part("repo_upload_file", file)
            .text("title", request.file_name.clone());
        if let Some(repository_id) = &request.repository_id {
            form = form.text("repo_id", repository_id.clone());
        }
        if let Some(context_id) = &request.context_id {
            form = form.text("ctx_id", context_id.clone());
        }
        Ok(form)
    }

    async fn send(&self, request: &UploadRequest) -> Result<UploadResponse> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(Self::form(request)?)
            .send()
            .await
            .map_err(|e| Error::Upload(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| Error::Upload(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::Upload(format!("server answered {}", status.as_u16())));
        }
        UploadResponse::parse(&text)
    }
}

impl UploadTransport for HttpUploadTransport {
    fn upload<'a>(&'a self, request: &'a UploadRequest) -> BoxFuture<'a, Result<UploadResponse>> {
        Box::pin(self.send(request))
    }
}

/// How a pending upload ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResolution {
    /// The placeholder now shows the uploaded image.
    Inserted(NodeId),
    /// The placeholder was removed; the message is for the user.
    Failed(String),
    /// The placeholder was deleted while the upload was running.
    Discarded,
}

/// A placeholder image waiting for its upload.
#[derive(Debug)]
pub struct DropUpload {
    placeholder: NodeId,
    placeholder_id: String,
}

impl DropUpload {
    /// Insert the placeholder at the caret.
    pub fn begin(doc: &mut Document, request: &UploadRequest) -> Result<Self> {
        if !request.is_image() {
            return Err(Error::Upload(format!("{} is not an image", request.file_name)));
        }
        let placeholder_id = format!("{PLACEHOLDER_PREFIX}{}", uuid::Uuid::new_v4());
        let html = format!(
            "<img id=\"{}\" alt=\"{}\">",
            escape_attribute(&placeholder_id),
            escape_attribute(&request.file_name)
        );
        let placeholder = doc
            .insert_html_at_selection(&html)?
            .first()
            .copied()
            .ok_or_else(|| Error::Upload("placeholder was not inserted".to_string()))?;
        log::debug!("Upload of {} started as {}", request.file_name, placeholder_id);
        Ok(Self {
            placeholder,
            placeholder_id,
        })
    }

    pub fn placeholder(&self) -> NodeId {
        self.placeholder
    }

    pub fn placeholder_id(&self) -> &str {
        &self.placeholder_id
    }

    /// Apply the transport's answer to the placeholder.
    pub fn resolve(self, doc: &mut Document, response: Result<UploadResponse>) -> Result<UploadResolution> {
        if !doc.is_connected(self.placeholder) {
            log::warn!("Upload placeholder {} was removed before completion", self.placeholder_id);
            return Ok(UploadResolution::Discarded);
        }
        let url = response.and_then(|response| response.image_url().map(str::to_string));
        match url {
            Ok(url) => {
                doc.set_attribute(self.placeholder, "src", &url)?;
                doc.remove_attribute(self.placeholder, "id")?;
                log::debug!("Upload {} finished: {}", self.placeholder_id, url);
                Ok(UploadResolution::Inserted(self.placeholder))
            }
            Err(error) => {
                doc.remove(self.placeholder)?;
                log::error!("Upload {} failed: {}", self.placeholder_id, error);
                Ok(UploadResolution::Failed(error.to_string()))
            }
        }
    }
}

/// Run a whole drop: placeholder, transfer, resolution.
pub async fn upload_dropped_file<T>(
    transport: &T,
    doc: &mut Document,
    request: &UploadRequest,
) -> Result<UploadResolution>
where
    T: UploadTransport + ?Sized,
{
    let pending = DropUpload::begin(doc, request)?;
    let response = transport.upload(request).await;
    pending.resolve(doc, response)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Answers every request with a fixed body, or fails.
    struct FixedTransport(std::result::Result<&'static str, &'static str>);

    impl UploadTransport for FixedTransport {
        fn upload<'a>(&'a self, _request: &'a UploadRequest) -> BoxFuture<'a, Result<UploadResponse>> {
            let answer = self.0;
            Box::pin(async move {
                match answer {
                    Ok(json) => UploadResponse::parse(json),
                    Err(message) => Err(Error::Upload(message.to_string())),
                }
            })
        }
    }

    fn request() -> UploadRequest {
        UploadRequest::new("cat.png", "image/png", vec![1, 2, 3], &PluginConfig::default())
    }

    #[test]
    fn test_success_sets_src() {
        let mut doc = Document::from_html("<p>x</p>").unwrap();
        let transport = FixedTransport(Ok(r#"{"url":"https://example.org/cat.png","file":"cat.png","id":"7"}"#));
        let resolution = pollster::block_on(upload_dropped_file(&transport, &mut doc, &request())).unwrap();

        let UploadResolution::Inserted(img) = resolution else {
            panic!("expected insertion, got {resolution:?}");
        };
        assert_eq!(doc.attribute(img, "src"), Some("https://example.org/cat.png"));
        assert_eq!(doc.attribute(img, "alt"), Some("cat.png"));
        assert_eq!(doc.attribute(img, "id"), None);
    }

    #[test]
    fn test_file_exists_uses_new_file() {
        let mut doc = Document::new();
        let transport = FixedTransport(Ok(
            r#"{"event":"fileexists","newfile":{"url":"https://example.org/cat (1).png","filename":"cat (1).png"}}"#,
        ));
        let resolution = pollster::block_on(upload_dropped_file(&transport, &mut doc, &request())).unwrap();
        let UploadResolution::Inserted(img) = resolution else {
            panic!("expected insertion, got {resolution:?}");
        };
        assert_eq!(doc.attribute(img, "src"), Some("https://example.org/cat (1).png"));
    }

    #[test]
    fn test_server_error_removes_placeholder() {
        let mut doc = Document::from_html("<p>x</p>").unwrap();
        let transport = FixedTransport(Ok(r#"{"error":"File too large"}"#));
        let resolution = pollster::block_on(upload_dropped_file(&transport, &mut doc, &request())).unwrap();
        assert_eq!(resolution, UploadResolution::Failed("Upload failed: File too large".to_string()));
        assert_eq!(doc.inner_html(doc.root()), "<p>x</p>");
    }

    #[test]
    fn test_transport_failure_and_malformed_body() {
        for transport in [FixedTransport(Err("connection reset")), FixedTransport(Ok("<html>"))] {
            let mut doc = Document::new();
            let resolution = pollster::block_on(upload_dropped_file(&transport, &mut doc, &request())).unwrap();
            assert!(matches!(resolution, UploadResolution::Failed(_)));
            assert!(doc.find_by_tag(doc.root(), "img").is_empty());
        }
    }

    #[test]
    fn test_placeholder_deleted_while_pending() {
        let mut doc = Document::new();
        let pending = DropUpload::begin(&mut doc, &request()).unwrap();
        assert!(pending.placeholder_id().starts_with(PLACEHOLDER_PREFIX));
        assert!(doc.find_by_id(doc.root(), pending.placeholder_id()).is_some());
        doc.remove(pending.placeholder()).unwrap();

        let response = UploadResponse::parse(r#"{"url":"a.png"}"#);
        assert_eq!(pending.resolve(&mut doc, response).unwrap(), UploadResolution::Discarded);
    }

    #[test]
    fn test_non_image_is_refused() {
        let mut doc = Document::new();
        let request = UploadRequest::new("notes.txt", "text/plain", Vec::new(), &PluginConfig::default());
        assert!(matches!(DropUpload::begin(&mut doc, &request), Err(Error::Upload(_))));
        assert!(doc.children(doc.root()).is_empty());
    }

    #[test]
    fn test_endpoint_resolves_against_base() {
        let base = Url::parse("https://lms.example.org/course/view.php").unwrap();
        let transport = HttpUploadTransport::new(&base, &PluginConfig::default()).unwrap();
        assert_eq!(
            transport.endpoint().as_str(),
            "https://lms.example.org/repository/upload.php"
        );
    }
}
