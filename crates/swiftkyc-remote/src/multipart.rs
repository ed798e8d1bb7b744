//! `multipart/form-data` encoding for binary image submissions.

use rand::Rng;
use swiftkyc_core::ImageBlob;

/// One file part of a form.
#[derive(Clone, PartialEq, Eq)]
pub struct FormPart {
    /// Form field name.
    pub name: String,
    /// Reported file name.
    pub file_name: String,
    /// Part content type.
    pub content_type: String,
    /// Part bytes.
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for FormPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormPart")
            .field("name", &self.name)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Ordered set of file parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an image artifact under `field`.
    pub fn with_image(mut self, field: impl Into<String>, blob: &ImageBlob) -> Self {
        self.parts.push(FormPart {
            name: field.into(),
            file_name: blob.file_name.clone(),
            content_type: blob.format.mime().to_string(),
            bytes: blob.bytes.clone(),
        });
        self
    }

    /// Returns the parts in insertion order.
    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// Finds a part by field name.
    pub fn part(&self, field: &str) -> Option<&FormPart> {
        self.parts.iter().find(|part| part.name == field)
    }

    /// `Content-Type` header value for `boundary`.
    pub fn content_type(boundary: &str) -> String {
        format!("multipart/form-data; boundary={boundary}")
    }

    /// Encodes the form body with `boundary`.
    pub fn encode(&self, boundary: &str) -> Vec<u8> {
        let mut body = Vec::new();
        for part in &self.parts {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    escape_quoted(&part.name),
                    escape_quoted(&part.file_name)
                )
                .as_bytes(),
            );
            body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", part.content_type).as_bytes());
            body.extend_from_slice(&part.bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        body
    }
}

/// Generates a boundary token that will not collide with image bytes in practice.
pub fn random_boundary<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "swiftkyc-{:016x}{:016x}",
        rng.random::<u64>(),
        rng.random::<u64>()
    )
}

fn escape_quoted(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use swiftkyc_core::ImageFormat;

    use super::*;

    #[test]
    fn encodes_file_field_with_headers() {
        let blob = ImageBlob::new(ImageFormat::Jpeg, "doc.jpg", vec![0xFF, 0xD8, 0xFF, 1])
            .expect("blob should build");
        let form = MultipartForm::new().with_image("file", &blob);
        let body = form.encode("b0undary");
        let text = String::from_utf8_lossy(&body);

        assert!(text.starts_with("--b0undary\r\n"));
        assert!(text.contains("name=\"file\"; filename=\"doc.jpg\""));
        assert!(text.contains("Content-Type: image/jpeg\r\n\r\n"));
        assert!(text.ends_with("--b0undary--\r\n"));
        assert_eq!(form.part("file").map(|part| part.bytes.len()), Some(4));
    }
}
