// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPreview {
    pub file_url: String,
    pub image_width: u32,
}

impl AttachmentPreview {
    /// Scales the image to `percent` of the modal width, rounding down.
    pub fn scaled(file_url: &str, modal_width: u32, percent: u32) -> Self {
        let image_width = u32::try_from(u64::from(modal_width) * u64::from(percent) / 100)
            .unwrap_or(modal_width);
        Self {
            file_url: file_url.to_owned(),
            image_width,
        }
    }
}

/// Modal window able to preview an attached receipt.
pub trait Modal {
    fn width(&self) -> u32;
    fn show(&mut self, preview: AttachmentPreview);
}

/// Blocking user-facing notice.
pub trait Alert {
    fn alert(&mut self, message: &str);
}

impl<F> Alert for F
where
    F: FnMut(&str),
{
    fn alert(&mut self, message: &str) {
        self(message);
    }
}
