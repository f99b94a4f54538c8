//! 上传文件校验
//!
//! 依次检查：是否上传、数量、MIME 类型、大小、文件头魔数。

use axum::body::Bytes;
use axum::http::StatusCode;
use thiserror::Error;

use crate::util::config::LimitsConfig;
use crate::util::processing::BatchItem;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No file provided. Please upload a file using the \"{0}\" field.")]
    MissingFile(String),
    #[error("No files provided. Please upload files using the \"{0}\" field.")]
    MissingFiles(String),
    #[error("Too many files. Maximum {max} files allowed, received {received}.")]
    TooManyFiles { max: usize, received: usize },
    #[error("File type is required.")]
    MissingMimeType,
    #[error("Invalid file type: {0}. Only JPG, JPEG, PNG, and GIF are allowed.")]
    UnsupportedMimeType(String),
    #[error("File is empty.")]
    EmptyFile,
    #[error("File size ({}MB) exceeds maximum allowed size of {}MB.", megabytes(.size), megabytes(.max))]
    FileTooLarge { size: usize, max: usize },
    #[error("Invalid image format. File does not appear to be a valid image.")]
    UnrecognizedImage,
    #[error("Unexpected field: {0}. Please use the correct field name.")]
    UnexpectedField(String),
    #[error("{filename}: {source}")]
    InFile {
        filename: String,
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ValidationError::MissingFile(_)
            | ValidationError::MissingFiles(_)
            | ValidationError::TooManyFiles { .. }
            | ValidationError::MissingMimeType
            | ValidationError::EmptyFile
            | ValidationError::UnexpectedField(_) => StatusCode::BAD_REQUEST,
            ValidationError::UnsupportedMimeType(_) | ValidationError::UnrecognizedImage => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            ValidationError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ValidationError::InFile { source, .. } => source.status_code(),
        }
    }

    fn in_file(self, filename: &str) -> Self {
        ValidationError::InFile {
            filename: filename.to_string(),
            source: Box::new(self),
        }
    }
}

fn megabytes(bytes: &usize) -> String {
    format!("{:.2}", *bytes as f64 / (1024.0 * 1024.0))
}

/// 识别出的图片格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
}

/// 通过文件头魔数判断图片格式
pub fn detect_image_format(bytes: &[u8]) -> Option<ImageFormat> {
    const SIGNATURES: &[(&[u8], ImageFormat)] = &[
        (&[0xFF, 0xD8, 0xFF], ImageFormat::Jpeg),
        (&[0x89, 0x50, 0x4E, 0x47], ImageFormat::Png),
        (&[0x47, 0x49, 0x46, 0x38], ImageFormat::Gif),
    ];

    SIGNATURES
        .iter()
        .find(|(magic, _)| bytes.starts_with(magic))
        .map(|(_, format)| *format)
}

/// 从 multipart 中读出的一个文件
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field_name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn display_name(&self) -> &str {
        self.filename.as_deref().unwrap_or(&self.field_name)
    }

    /// 客户端声明的类型优先，缺失时按文件名推断
    fn effective_mime(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .map(str::trim)
            .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
            .map(|ct| ct.to_ascii_lowercase())
            .or_else(|| {
                self.filename
                    .as_deref()
                    .and_then(|name| mime_guess::from_path(name).first())
                    .map(|mime| mime.essence_str().to_string())
            })
    }

    pub fn into_batch_item(self) -> BatchItem {
        let filename = self.display_name().to_string();
        BatchItem::new(filename, self.bytes)
    }
}

pub struct UploadValidator<'a> {
    limits: &'a LimitsConfig,
}

impl<'a> UploadValidator<'a> {
    pub fn new(limits: &'a LimitsConfig) -> Self {
        Self { limits }
    }

    /// 单图接口：取第一个文件
    pub fn validate_single(
        &self,
        field: &str,
        mut files: Vec<UploadedFile>,
    ) -> Result<UploadedFile, ValidationError> {
        if files.is_empty() {
            return Err(ValidationError::MissingFile(field.to_string()));
        }
        if files.len() > 1 {
            return Err(ValidationError::TooManyFiles {
                max: 1,
                received: files.len(),
            });
        }

        let file = files.remove(0);
        self.validate_file(&file)?;
        Ok(file)
    }

    pub fn validate_batch(
        &self,
        field: &str,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<UploadedFile>, ValidationError> {
        if files.is_empty() {
            return Err(ValidationError::MissingFiles(field.to_string()));
        }
        if files.len() > self.limits.max_batch_size {
            return Err(ValidationError::TooManyFiles {
                max: self.limits.max_batch_size,
                received: files.len(),
            });
        }

        for file in &files {
            self.validate_file(file)
                .map_err(|e| e.in_file(file.display_name()))?;
        }
        Ok(files)
    }

    pub fn validate_file(&self, file: &UploadedFile) -> Result<(), ValidationError> {
        let mime = file.effective_mime().ok_or(ValidationError::MissingMimeType)?;
        if !self
            .limits
            .allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&mime))
        {
            return Err(ValidationError::UnsupportedMimeType(mime));
        }

        let size = file.bytes.len();
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }
        if size > self.limits.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.limits.max_file_size,
            });
        }

        if detect_image_format(&file.bytes).is_none() {
            return Err(ValidationError::UnrecognizedImage);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00];

    fn file(name: &str, content_type: Option<&str>, bytes: &[u8]) -> UploadedFile {
        UploadedFile {
            field_name: "images".to_string(),
            filename: Some(name.to_string()),
            content_type: content_type.map(str::to_string),
            bytes: Bytes::copy_from_slice(bytes),
        }
    }

    #[test]
    fn test_detect_image_format() {
        assert_eq!(detect_image_format(PNG), Some(ImageFormat::Png));
        assert_eq!(detect_image_format(JPEG), Some(ImageFormat::Jpeg));
        assert_eq!(detect_image_format(b"GIF89a"), Some(ImageFormat::Gif));
        assert_eq!(detect_image_format(b"%PDF-1.7"), None);
        assert_eq!(detect_image_format(&[0xFF, 0xD8]), None);
    }

    #[test]
    fn test_single_requires_a_file() {
        let limits = LimitsConfig::default();
        let err = UploadValidator::new(&limits)
            .validate_single("image", Vec::new())
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "No file provided. Please upload a file using the \"image\" field."
        );
    }

    #[test]
    fn test_rejects_unsupported_mime() {
        let limits = LimitsConfig::default();
        let err = UploadValidator::new(&limits)
            .validate_file(&file("doc.pdf", Some("application/pdf"), b"%PDF"))
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(
            err.to_string(),
            "Invalid file type: application/pdf. Only JPG, JPEG, PNG, and GIF are allowed."
        );
    }

    #[test]
    fn test_mime_falls_back_to_filename() {
        let limits = LimitsConfig::default();
        let validator = UploadValidator::new(&limits);
        assert!(validator.validate_file(&file("scan.png", None, PNG)).is_ok());
        assert!(validator
            .validate_file(&file("scan.png", Some("application/octet-stream"), PNG))
            .is_ok());
        assert_eq!(
            validator.validate_file(&file("scan", None, PNG)),
            Err(ValidationError::MissingMimeType)
        );
    }

    #[test]
    fn test_size_checks() {
        let limits = LimitsConfig {
            max_file_size: 6,
            ..LimitsConfig::default()
        };
        let validator = UploadValidator::new(&limits);

        let empty = validator
            .validate_file(&file("a.png", Some("image/png"), b""))
            .unwrap_err();
        assert_eq!(empty.status_code(), StatusCode::BAD_REQUEST);

        let large = validator
            .validate_file(&file("a.png", Some("image/png"), PNG))
            .unwrap_err();
        assert_eq!(large.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(large.to_string().starts_with("File size (0.00MB) exceeds"));
    }

    #[test]
    fn test_magic_bytes_must_match() {
        let limits = LimitsConfig::default();
        let err = UploadValidator::new(&limits)
            .validate_file(&file("fake.png", Some("image/png"), b"not an image"))
            .unwrap_err();
        assert_eq!(err, ValidationError::UnrecognizedImage);
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn test_batch_count_and_file_prefix() {
        let limits = LimitsConfig {
            max_batch_size: 2,
            ..LimitsConfig::default()
        };
        let validator = UploadValidator::new(&limits);

        let too_many = validator
            .validate_batch(
                "images",
                vec![
                    file("a.png", Some("image/png"), PNG),
                    file("b.png", Some("image/png"), PNG),
                    file("c.png", Some("image/png"), PNG),
                ],
            )
            .unwrap_err();
        assert_eq!(
            too_many.to_string(),
            "Too many files. Maximum 2 files allowed, received 3."
        );

        let bad = validator
            .validate_batch(
                "images",
                vec![
                    file("a.jpg", Some("image/jpeg"), JPEG),
                    file("b.png", Some("image/png"), b"zz"),
                ],
            )
            .unwrap_err();
        assert_eq!(
            bad.to_string(),
            "b.png: Invalid image format. File does not appear to be a valid image."
        );
        assert_eq!(bad.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn test_into_batch_item_keeps_name() {
        let item = file("a.png", Some("image/png"), PNG).into_batch_item();
        assert_eq!(item.filename, "a.png");
        assert_eq!(&item.bytes[..], PNG);
    }
}
