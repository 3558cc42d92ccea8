//! Custom Extractors
//!
//! Multipart upload parsing shared by post images and complex chat messages.

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::StatusCode,
};

use crate::application::services::ImageUpload;
use crate::shared::error::AppError;

/// Multipart form with `file` parts and an optional `content` text part.
///
/// Part content types sent by the client are ignored; images are sniffed
/// later from their bytes.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub content: Option<String>,
    pub files: Vec<ImageUpload>,
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Upload exceeds the size limit".into())
    } else {
        AppError::BadRequest(format!("Invalid multipart body: {}", e.body_text()))
    }
}

impl<S> FromRequest<S> for UploadForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            match field.name() {
                Some("file") | Some("files") => {
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    form.files.push(ImageUpload::new(bytes));
                }
                Some("content") => {
                    form.content = Some(field.text().await.map_err(multipart_error)?);
                }
                other => {
                    tracing::debug!(field = ?other, "Ignoring unknown multipart field");
                }
            }
        }

        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    const BOUNDARY: &str = "X-BOUNDARY";

    fn multipart_request(body: String) -> Request {
        Request::builder()
            .method("POST")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_collects_files_and_content() {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"content\"\r\n\r\nhello\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.png\"\r\n\
             Content-Type: text/plain\r\n\r\nabc\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nx\r\n\
             --{b}--\r\n",
            b = BOUNDARY
        );

        let form = UploadForm::from_request(multipart_request(body), &())
            .await
            .unwrap();

        assert_eq!(form.content.as_deref(), Some("hello"));
        assert_eq!(form.files, vec![ImageUpload::new(b"abc".to_vec())]);
    }

    #[tokio::test]
    async fn test_rejects_non_multipart() {
        let request = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let err = UploadForm::from_request(request, &()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
