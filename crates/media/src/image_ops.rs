//! Image header inspection for stills and watermark overlays.
//!
//! Only headers are read: the frame size is all the graph builder needs, and
//! full decoding of a large photo would be wasted work.

use {
    image::{ImageFormat, ImageReader},
    std::{io::Cursor, path::Path},
};

use crate::{
    error::{Context, Error, Result},
    graph::Dimensions,
};

/// Image metadata.
#[derive(Debug, Clone)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: Option<ImageFormat>,
}

impl ImageMetadata {
    /// Frame size, or an error for zero-sized images.
    pub fn dimensions(&self) -> Result<Dimensions> {
        Dimensions::new(self.width, self.height)
            .with_context(|| format!("image has no area: {}x{}", self.width, self.height))
    }
}

/// Read metadata from in-memory image bytes without decoding pixels.
pub fn get_image_metadata(data: &[u8]) -> Result<ImageMetadata> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .context("failed to guess image format")?;

    let format = reader.format();
    let (width, height) = reader.into_dimensions()?;

    Ok(ImageMetadata {
        width,
        height,
        format,
    })
}

/// Read metadata from an image file's header.
pub fn read_image_metadata(path: &Path) -> Result<ImageMetadata> {
    let reader = ImageReader::open(path)
        .with_context(|| format!("failed to open image {}", path.display()))?
        .with_guessed_format()
        .context("failed to guess image format")?;

    let format = reader.format();
    if format.is_none() {
        return Err(Error::message(format!(
            "unrecognised image format: {}",
            path.display()
        )));
    }
    let (width, height) = reader.into_dimensions()?;

    Ok(ImageMetadata {
        width,
        height,
        format,
    })
}

/// Frame size of an image file.
pub fn image_dimensions(path: &Path) -> Result<Dimensions> {
    read_image_metadata(path)?.dimensions()
}
