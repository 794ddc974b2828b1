//! Background-removal client.
//!
//! The remote service is an opaque image-in/image-out endpoint: the photo is
//! POSTed as a multipart form with a single `file` field holding a PNG, and a
//! successful (2xx) response body is the subject on a transparent background,
//! in any format the `image` crate decodes.
//!
//! [`BackgroundRemover`] is the seam the session talks to. [`HttpRemover`] is
//! the `reqwest` implementation; tests substitute a counting mock.

use crate::imaging::{RasterError, decode_image, encode_png};
use image::RgbaImage;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use thiserror::Error;

/// Endpoint used when the config file does not name one.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/remove-bg";

pub const DEFAULT_USER_AGENT: &str = concat!("passport-sheet/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum RemovalError {
    #[error("Background removal failed: HTTP status {0}")]
    Status(StatusCode),
    #[error("Background removal request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Could not encode photo for upload: {0}")]
    Encode(#[source] RasterError),
    #[error("Background removal returned an unreadable image: {0}")]
    Decode(#[source] RasterError),
}

pub type Result<T> = std::result::Result<T, RemovalError>;

/// Anything that can cut the subject out of a photo.
///
/// One call per request; the caller guarantees a single request in flight.
#[allow(async_fn_in_trait)]
pub trait BackgroundRemover {
    async fn remove_background(&self, image: &RgbaImage) -> Result<RgbaImage>;
}

/// HTTP client for the removal endpoint.
#[derive(Debug, Clone)]
pub struct HttpRemover {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRemover {
    pub fn new(endpoint: impl Into<String>, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST an already-encoded PNG and return the raw response body.
    pub async fn remove_png(&self, png: Vec<u8>) -> Result<Vec<u8>> {
        let part = Part::bytes(png)
            .file_name("photo.png")
            .mime_str("image/png")?;
        let form = Form::new().part("file", part);

        tracing::info!(endpoint = %self.endpoint, "Requesting background removal");
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "Background removal rejected");
            return Err(RemovalError::Status(status));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

impl BackgroundRemover for HttpRemover {
    async fn remove_background(&self, image: &RgbaImage) -> Result<RgbaImage> {
        let png = encode_png(image).map_err(RemovalError::Encode)?;
        let body = self.remove_png(png).await?;
        decode_image(&body).map_err(RemovalError::Decode)
    }
}
