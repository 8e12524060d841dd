use image::{ImageFormat, ImageReader};
use lingora_core::AppError;
use std::io::Cursor;

/// Validation errors for avatar uploads
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too small: {size} bytes (min: {min} bytes)")]
    FileTooSmall { size: usize, min: usize },

    #[error("File size {size} bytes exceeds maximum size of {max} bytes")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Payload is not a decodable image: {0}")]
    NotAnImage(String),

    #[error("Image format {format:?} does not match an allowed content type")]
    DisallowedFormat { format: ImageFormat },

    #[error("Image dimensions {width}x{height} exceed maximum of {max} pixels per side")]
    DimensionsTooLarge { width: u32, height: u32, max: u32 },
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Dimensions read from the image header during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Avatar upload validator
///
/// Checks run cheapest-first: byte-size bounds, then the declared content
/// type, then a header decode that confirms the payload really is an image
/// of an allowed format within the dimension cap. All checks operate on the
/// in-memory payload; nothing touches storage here.
pub struct AvatarValidator {
    min_size_bytes: usize,
    max_size_bytes: usize,
    max_dimension_px: u32,
    allowed_content_types: Vec<String>,
}

impl AvatarValidator {
    pub fn new(
        min_size_bytes: usize,
        max_size_bytes: usize,
        max_dimension_px: u32,
        allowed_content_types: Vec<String>,
    ) -> Self {
        Self {
            min_size_bytes,
            max_size_bytes,
            max_dimension_px,
            allowed_content_types,
        }
    }

    /// Validate file size bounds
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size < self.min_size_bytes {
            return Err(ValidationError::FileTooSmall {
                size,
                min: self.min_size_bytes,
            });
        }

        if size > self.max_size_bytes {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_size_bytes,
            });
        }

        Ok(())
    }

    /// Validate the declared content type against the allow-list
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = content_type.to_lowercase();

        if !self
            .allowed_content_types
            .iter()
            .any(|ct| ct == &normalized)
        {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    /// Sniff the image header: the payload must decode as one of the allowed
    /// formats and fit within the dimension cap. The declared content type is
    /// not trusted for this step.
    pub fn validate_image_header(&self, data: &[u8]) -> Result<ImageDimensions, ValidationError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ValidationError::NotAnImage(e.to_string()))?;

        let format = reader
            .format()
            .ok_or_else(|| ValidationError::NotAnImage("unrecognized format".to_string()))?;

        let format_allowed = self
            .allowed_content_types
            .iter()
            .filter_map(|ct| format_for_content_type(ct))
            .any(|f| f == format);
        if !format_allowed {
            return Err(ValidationError::DisallowedFormat { format });
        }

        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| ValidationError::NotAnImage(e.to_string()))?;

        if width > self.max_dimension_px || height > self.max_dimension_px {
            return Err(ValidationError::DimensionsTooLarge {
                width,
                height,
                max: self.max_dimension_px,
            });
        }

        Ok(ImageDimensions { width, height })
    }

    /// Run all checks in order. Returns the header dimensions on success.
    pub fn validate(
        &self,
        content_type: &str,
        data: &[u8],
    ) -> Result<ImageDimensions, ValidationError> {
        self.validate_file_size(data.len())?;
        self.validate_content_type(content_type)?;
        self.validate_image_header(data)
    }
}

/// Image format implied by a content type, if the format is one this
/// pipeline understands.
fn format_for_content_type(content_type: &str) -> Option<ImageFormat> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
        "image/png" => Some(ImageFormat::Png),
        "image/webp" => Some(ImageFormat::WebP),
        "image/gif" => Some(ImageFormat::Gif),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), format)
            .unwrap();
        buffer
    }

    /// Gradient fill keeps the encoded payload from collapsing below the
    /// minimum-size floor the way a solid color would.
    fn gradient_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([x as u8, y as u8, (x ^ y) as u8, 255])
        }))
    }

    fn test_validator() -> AvatarValidator {
        AvatarValidator::new(
            1024,
            5 * 1024 * 1024,
            2048,
            vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
        )
    }

    #[test]
    fn test_valid_avatar_passes() {
        let data = encode(&gradient_image(256, 256), ImageFormat::Png);
        assert!(data.len() >= 1024);

        let dims = test_validator().validate("image/png", &data).unwrap();
        assert_eq!(dims.width, 256);
        assert_eq!(dims.height, 256);
    }

    #[test]
    fn test_oversize_payload_rejected_before_decode() {
        let data = vec![0u8; 8 * 1024 * 1024];
        let err = test_validator().validate("image/jpeg", &data).unwrap_err();

        assert!(matches!(err, ValidationError::FileTooLarge { .. }));
        assert!(err.to_string().contains("exceeds maximum size"));
    }

    #[test]
    fn test_undersize_payload_rejected() {
        let err = test_validator()
            .validate("image/png", &[0u8; 10])
            .unwrap_err();
        assert!(matches!(err, ValidationError::FileTooSmall { .. }));
    }

    #[test]
    fn test_disallowed_content_type_rejected() {
        let data = encode(&gradient_image(256, 256), ImageFormat::Png);
        let err = test_validator().validate("image/gif", &data).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidContentType { .. }));
    }

    #[test]
    fn test_corrupt_payload_rejected() {
        let data = vec![0xAB; 2048];
        let err = test_validator().validate("image/png", &data).unwrap_err();
        assert!(matches!(err, ValidationError::NotAnImage(_)));
    }

    #[test]
    fn test_spoofed_content_type_rejected_by_sniffing() {
        // GIF bytes declared as PNG: the declared type passes the allow-list
        // but header sniffing sees a format outside it.
        let data = encode(&gradient_image(256, 256), ImageFormat::Gif);
        let err = test_validator().validate("image/png", &data).unwrap_err();
        assert!(matches!(err, ValidationError::DisallowedFormat { .. }));
    }

    #[test]
    fn test_oversized_dimensions_rejected() {
        let validator = AvatarValidator::new(
            1,
            5 * 1024 * 1024,
            2048,
            vec!["image/png".to_string()],
        );
        let data = encode(&gradient_image(2100, 16), ImageFormat::Png);
        let err = validator.validate("image/png", &data).unwrap_err();

        match err {
            ValidationError::DimensionsTooLarge { width, max, .. } => {
                assert_eq!(width, 2100);
                assert_eq!(max, 2048);
            }
            other => panic!("expected dimension error, got {:?}", other),
        }
    }

    #[test]
    fn test_at_cap_dimensions_pass() {
        let validator = AvatarValidator::new(1, 50 * 1024 * 1024, 2048, vec!["image/png".to_string()]);
        let data = encode(&gradient_image(2048, 64), ImageFormat::Png);
        assert!(validator.validate("image/png", &data).is_ok());
    }

    #[test]
    fn test_validation_error_maps_to_app_validation() {
        let err: AppError = ValidationError::FileTooSmall { size: 2, min: 1024 }.into();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
