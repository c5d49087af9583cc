//! QR code images for tickets.
//!
//! Each ticket gets one PNG at `{dir}/{ticket_id}.png`. Writing is
//! idempotent: the same ticket id always renders the same image, so
//! regenerating simply overwrites the file.

use crate::error::CodeImageError;
use crate::types::TicketId;
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Smallest edge length of a rendered code, in pixels.
const MIN_EDGE_PX: u32 = 256;

/// A generated code image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeImage {
    /// Reference returned to clients and stored with the registration.
    pub reference: String,
    /// Location on disk.
    pub path: PathBuf,
}

impl CodeImage {
    /// Read the PNG bytes back from disk.
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing or unreadable.
    pub async fn read(&self) -> Result<Vec<u8>, CodeImageError> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}

/// Renders ticket ids into QR PNG files under a directory.
#[derive(Debug, Clone)]
pub struct QrCodeGenerator {
    dir: PathBuf,
}

impl QrCodeGenerator {
    /// Create a generator writing into `dir`.
    ///
    /// The directory is created on first use.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory images are written to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for a ticket's image.
    #[must_use]
    pub fn path_for(&self, ticket_id: &TicketId) -> PathBuf {
        self.dir.join(format!("{ticket_id}.png"))
    }

    /// Render the ticket id and write it to disk.
    ///
    /// # Errors
    ///
    /// Returns error if encoding fails or the file cannot be written.
    pub async fn generate(&self, ticket_id: &TicketId) -> Result<CodeImage, CodeImageError> {
        let png = render_png(ticket_id.as_str())?;
        let path = self.path_for(ticket_id);

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, png).await?;

        tracing::debug!(ticket_id = %ticket_id, path = %path.display(), "QR code written");

        Ok(CodeImage {
            reference: path.to_string_lossy().into_owned(),
            path,
        })
    }
}

/// Encode `text` as a QR code and return PNG bytes.
///
/// # Errors
///
/// Returns error if the text does not fit a QR code or PNG encoding fails.
pub fn render_png(text: &str) -> Result<Vec<u8>, CodeImageError> {
    let code = QrCode::new(text.as_bytes()).map_err(|e| CodeImageError::Encode(e.to_string()))?;
    let image = code
        .render::<Luma<u8>>()
        .min_dimensions(MIN_EDGE_PX, MIN_EDGE_PX)
        .build();

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(image)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| CodeImageError::Render(e.to_string()))?;
    Ok(png)
}
