//! Image endpoints and uploads.

use photox_domain::{ApiRequest, DomainError, MultipartForm, RequestBody};
use serde_json::Value;
use tracing::{debug, info};

use super::ListQuery;
use crate::client::ApiClient;
use crate::error::{ClientError, ClientResult};

const IMAGES_PATH: &str = "/images/";
const UPLOAD_PATH: &str = "/images/upload/";

fn image_path(id: u64) -> String {
    format!("{IMAGES_PATH}{id}/")
}

/// A file to upload, with optional metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
    title: Option<String>,
    category: Option<String>,
    is_public: Option<bool>,
}

impl ImageUpload {
    /// Creates an upload, guessing the content type from the file name.
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            file_name,
            content_type,
            bytes,
            title: None,
            category: None,
            is_public: None,
        }
    }

    /// Overrides the guessed content type.
    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Sets the image title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the image category.
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets whether the image is public.
    #[must_use]
    pub const fn is_public(mut self, is_public: bool) -> Self {
        self.is_public = Some(is_public);
        self
    }

    /// File name sent to the server.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Builds the multipart form: the file under `image`, then the metadata
    /// fields that were set.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotAnImage` unless the content type is `image/*`.
    pub fn into_form(self) -> Result<MultipartForm, DomainError> {
        if !self.content_type.starts_with("image/") {
            return Err(DomainError::NotAnImage {
                file_name: self.file_name,
                content_type: self.content_type,
            });
        }

        let mut form =
            MultipartForm::new().file("image", self.file_name, self.content_type, self.bytes);
        if let Some(title) = self.title.filter(|t| !t.is_empty()) {
            form = form.text("title", title);
        }
        if let Some(category) = self.category.filter(|c| !c.is_empty()) {
            form = form.text("category", category);
        }
        if let Some(is_public) = self.is_public {
            form = form.text("is_public", is_public.to_string());
        }
        Ok(form)
    }
}

/// Image listing, editing and upload operations.
#[derive(Debug, Clone)]
pub struct ImageService {
    client: ApiClient,
}

impl ImageService {
    /// Creates the service.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Lists the current user's images.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Format` if the body is not a page of results.
    pub async fn list(&self, query: &ListQuery) -> ClientResult<Value> {
        self.list_at(query.apply(ApiRequest::get(IMAGES_PATH))).await
    }

    /// Follows a `next` link returned by a previous page, verbatim.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Format` if the body is not a page of results.
    pub async fn list_next(&self, next_url: &str) -> ClientResult<Value> {
        self.list_at(ApiRequest::get(next_url)).await
    }

    /// Fetches one image.
    ///
    /// # Errors
    ///
    /// Returns the client error if the request fails.
    pub async fn get(&self, id: u64) -> ClientResult<Value> {
        Ok(self.client.request(ApiRequest::get(image_path(id))).await?.data()?)
    }

    /// Updates an image's metadata.
    ///
    /// # Errors
    ///
    /// Returns the client error if the request fails.
    pub async fn update(&self, id: u64, payload: Value) -> ClientResult<Value> {
        let request = ApiRequest::put(image_path(id)).json(payload);
        Ok(self.client.request(request).await?.data()?)
    }

    /// Deletes an image.
    ///
    /// # Errors
    ///
    /// Returns the client error if the request fails.
    pub async fn delete(&self, id: u64) -> ClientResult<()> {
        self.client.request(ApiRequest::delete(image_path(id))).await?;
        Ok(())
    }

    /// Uploads an image and returns the created image record.
    ///
    /// # Errors
    ///
    /// - `ClientError::InvalidRequest` if the file is not an image
    /// - `ClientError::Format` if the response is neither enveloped nor an
    ///   image record
    pub async fn upload(&self, upload: ImageUpload) -> ClientResult<Value> {
        let file_name = upload.file_name().to_string();
        let form = upload.into_form()?;
        debug!(file_name = %file_name, fields = form.parts().len(), "uploading image");

        let request = ApiRequest::post(UPLOAD_PATH).body(RequestBody::Multipart(form));
        let image = normalize_upload(self.client.request(request).await?.json_value()?)?;

        info!(file_name = %file_name, id = %image["id"], "image uploaded");
        Ok(image)
    }

    async fn list_at(&self, request: ApiRequest) -> ClientResult<Value> {
        let body = self.client.request(request).await?.json_value()?;
        normalize_page(body)
    }
}

/// Accepts `{code: 0, data: {...}}` or a bare record with `id` and
/// `image_url`.
fn normalize_upload(body: Value) -> ClientResult<Value> {
    if body.get("code").and_then(Value::as_i64) == Some(0)
        && let Some(data) = body.get("data").filter(|d| !d.is_null())
    {
        return Ok(data.clone());
    }
    if is_set(&body, "id") && is_set(&body, "image_url") {
        return Ok(body);
    }
    Err(ClientError::Format(format!(
        "unexpected upload response: {body}"
    )))
}

/// Accepts an enveloped page or a bare `{results: [...]}` page.
fn normalize_page(body: Value) -> ClientResult<Value> {
    if let Some(data) = body.get("data").filter(|d| !d.is_null()) {
        return Ok(data.clone());
    }
    if body.get("results").is_some() {
        return Ok(body);
    }
    Err(ClientError::Format(format!(
        "unexpected image list response: {body}"
    )))
}

fn is_set(body: &Value, field: &str) -> bool {
    match body.get(field) {
        None | Some(Value::Null | Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}
