//! Captured camera frames.
//!
//! A [`Frame`] owns its pixel buffer. Capture layers that recycle buffers can
//! attach a release hook; it runs when the frame is dropped, so a frame the
//! sampler skips is released exactly like one that went through detection.

use crate::{Error, Result};
use image::{imageops, RgbImage};
use std::borrow::Cow;
use std::fmt;

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// One captured frame and its sensor rotation
pub struct Frame {
    image: RgbImage,
    rotation_degrees: u16,
    release: Option<ReleaseHook>,
}

impl Frame {
    /// Wrap an upright image
    #[must_use]
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            rotation_degrees: 0,
            release: None,
        }
    }

    /// Blank frame of the given size
    #[must_use]
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(RgbImage::new(width, height))
    }

    /// Set the clockwise rotation needed to bring the image upright
    ///
    /// # Errors
    ///
    /// Returns an error unless `degrees` is 0, 90, 180 or 270
    pub fn with_rotation(mut self, degrees: u16) -> Result<Self> {
        if !matches!(degrees, 0 | 90 | 180 | 270) {
            return Err(Error::InvalidInput(format!(
                "Unsupported frame rotation: {degrees} degrees"
            )));
        }
        self.rotation_degrees = degrees;
        Ok(self)
    }

    /// Run `hook` once when the frame is dropped
    #[must_use]
    pub fn with_release_hook<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.release = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub const fn rotation_degrees(&self) -> u16 {
        self.rotation_degrees
    }

    /// Dimensions after rotation
    #[must_use]
    pub fn upright_dimensions(&self) -> (u32, u32) {
        let (width, height) = self.image.dimensions();
        if self.rotation_degrees % 180 == 0 {
            (width, height)
        } else {
            (height, width)
        }
    }

    /// Image rotated upright; borrowed when no rotation is needed
    #[must_use]
    pub fn upright(&self) -> Cow<'_, RgbImage> {
        match self.rotation_degrees {
            90 => Cow::Owned(imageops::rotate90(&self.image)),
            180 => Cow::Owned(imageops::rotate180(&self.image)),
            270 => Cow::Owned(imageops::rotate270(&self.image)),
            _ => Cow::Borrowed(&self.image),
        }
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("dimensions", &self.image.dimensions())
            .field("rotation_degrees", &self.rotation_degrees)
            .field("has_release_hook", &self.release.is_some())
            .finish()
    }
}
