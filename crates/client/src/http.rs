//! Request descriptions and body encoding.
//!
//! Endpoints describe a call as an [`ApiRequest`]; the client turns it into
//! a `reqwest` request. Bodies are either JSON or multipart: a form that
//! carries files is sent as multipart with its JSON encoded in a `data`
//! field, the way the API's upload routes expect.

use std::path::Path;

use mime_guess::MimeGuess;
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;

/// A REST call, independent of the HTTP client.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, starting with `/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }

    /// Append a query parameter when `value` is present.
    #[must_use]
    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialised.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("unserialisable body: {e}")))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    /// Attach `body` as JSON, or as multipart when `files` is non-empty.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialised.
    pub fn json_or_multipart<T: Serialize + ?Sized>(
        self,
        body: &T,
        files: Vec<FilePart>,
    ) -> Result<Self, ApiError> {
        if files.is_empty() {
            return self.json(body);
        }
        let payload = FormPayload::new().json_data(body)?.files(files);
        Ok(self.multipart(payload))
    }

    #[must_use]
    pub fn multipart(mut self, payload: FormPayload) -> Self {
        self.body = RequestBody::Multipart(payload);
        self
    }
}

/// Request body variants.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(FormPayload),
}

/// A multipart form under construction.
#[derive(Debug, Clone, Default)]
pub struct FormPayload {
    fields: Vec<(String, String)>,
    files: Vec<FilePart>,
}

impl FormPayload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.push((name.to_owned(), value.into()));
        self
    }

    /// Encode `body` as JSON into the `data` field.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialised.
    pub fn json_data<T: Serialize + ?Sized>(self, body: &T) -> Result<Self, ApiError> {
        let json = serde_json::to_string(body)
            .map_err(|e| ApiError::InvalidRequest(format!("unserialisable body: {e}")))?;
        Ok(self.text("data", json))
    }

    #[must_use]
    pub fn file(mut self, file: FilePart) -> Self {
        self.files.push(file);
        self
    }

    #[must_use]
    pub fn files(mut self, files: impl IntoIterator<Item = FilePart>) -> Self {
        self.files.extend(files);
        self
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn file_parts(&self) -> &[FilePart] {
        &self.files
    }

    /// Build the `reqwest` form.
    ///
    /// # Errors
    ///
    /// Returns an error if a file carries an invalid MIME type.
    pub fn into_form(self) -> Result<Form, ApiError> {
        let mut form = Form::new();
        for (name, value) in self.fields {
            form = form.text(name, value);
        }
        for file in self.files {
            let part = Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(&file.mime)
                .map_err(|e| ApiError::InvalidRequest(format!("invalid MIME type: {e}")))?;
            form = form.part(file.field, part);
        }
        Ok(form)
    }
}

/// A file upload.
#[derive(Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for FilePart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePart")
            .field("field", &self.field)
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl FilePart {
    #[must_use]
    pub fn new(field: &str, file_name: &str, mime: &str, bytes: Vec<u8>) -> Self {
        Self {
            field: field.to_owned(),
            file_name: file_name.to_owned(),
            mime: mime.to_owned(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub async fn read(field: &str, path: &Path) -> Result<Self, ApiError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ApiError::InvalidRequest(format!("cannot read {}: {e}", path.display()))
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_owned();
        Ok(Self::new(field, &file_name, &mime_for(path), bytes))
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

fn mime_for(path: &Path) -> String {
    MimeGuess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Body {
        name: &'static str,
    }

    #[test]
    fn test_query_opt_skips_none() {
        let request = ApiRequest::get("/products")
            .query("page", 2)
            .query_opt("searchTerm", None::<&str>)
            .query_opt("category", Some("shoes"));
        assert_eq!(
            request.query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("category".to_string(), "shoes".to_string()),
            ]
        );
    }

    #[test]
    fn test_json_without_files() {
        let request = ApiRequest::post("/shops")
            .json_or_multipart(&Body { name: "Crafts" }, vec![])
            .unwrap();
        match request.body {
            RequestBody::Json(value) => assert_eq!(value["name"], "Crafts"),
            other => panic!("expected JSON body, got {other:?}"),
        }
    }

    #[test]
    fn test_multipart_with_files() {
        let logo = FilePart::new("logo", "logo.png", "image/png", vec![1, 2, 3]);
        let request = ApiRequest::patch("/shops/my-shop")
            .json_or_multipart(&Body { name: "Crafts" }, vec![logo])
            .unwrap();
        match request.body {
            RequestBody::Multipart(payload) => {
                assert_eq!(payload.field("data"), Some(r#"{"name":"Crafts"}"#));
                assert_eq!(payload.file_parts().len(), 1);
                assert!(payload.into_form().is_ok());
            }
            other => panic!("expected multipart body, got {other:?}"),
        }
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for(Path::new("a/B.JPG")), "image/jpeg");
        assert_eq!(mime_for(Path::new("scan.tiff")), "image/tiff");
        assert_eq!(mime_for(Path::new("doc.pdf")), "application/pdf");
        assert_eq!(mime_for(Path::new("noext")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_read_detects_image_type() {
        let dir = std::env::temp_dir().join(format!("bazaar-upload-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("banner.bmp");
        tokio::fs::write(&path, [0u8; 8]).await.unwrap();

        let file = FilePart::read("images", &path).await.unwrap();
        assert_eq!(file.file_name, "banner.bmp");
        assert!(file.is_image(), "bmp should be an image, got {}", file.mime);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[test]
    fn test_file_part_debug_hides_bytes() {
        let file = FilePart::new("images", "a.png", "image/png", vec![0; 1024]);
        let debug = format!("{file:?}");
        assert!(debug.contains("len: 1024"));
        assert!(file.is_image());
    }
}
