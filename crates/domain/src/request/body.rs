//! HTTP request body types

use serde_json::Value;

/// Body of an outgoing API request.
///
/// Bodies are plain data so that a request can be replayed after a token
/// refresh without re-reading files or re-serialising payloads.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    /// No body
    #[default]
    None,
    /// JSON document
    Json(Value),
    /// Multipart form data
    Multipart(MultipartForm),
}

/// Value of a single multipart field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    /// Scalar text field.
    Text(String),
    /// Binary file field.
    File {
        /// File name reported to the server.
        file_name: String,
        /// MIME type of the content.
        content_type: String,
        /// Raw file bytes.
        bytes: Vec<u8>,
    },
}

/// A named multipart field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: FormValue,
}

/// Ordered multipart form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    /// Creates an empty form.
    #[must_use]
    pub const fn new() -> Self {
        Self { parts: Vec::new() }
    }

    /// Appends a text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart {
            name: name.into(),
            value: FormValue::Text(value.into()),
        });
        self
    }

    /// Appends a file field.
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push(FormPart {
            name: name.into(),
            value: FormValue::File {
                file_name: file_name.into(),
                content_type: content_type.into(),
                bytes,
            },
        });
        self
    }

    /// Returns the fields in insertion order.
    #[must_use]
    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }
}
