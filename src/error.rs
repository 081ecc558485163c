use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportErrorCode {
    TemplateEncrypted,
    TemplateUnreadable,
    Serialize,
    InvalidConfiguration,
    Io,
}

impl ExportErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportErrorCode::TemplateEncrypted => "TEMPLATE_ENCRYPTED",
            ExportErrorCode::TemplateUnreadable => "TEMPLATE_UNREADABLE",
            ExportErrorCode::Serialize => "SERIALIZE_FAILED",
            ExportErrorCode::InvalidConfiguration => "INVALID_CONFIGURATION",
            ExportErrorCode::Io => "IO_ERROR",
        }
    }
}

// Document-level failures only. Per-field problems are PatchWarning entries
// on a successful export.
#[derive(Debug, Error)]
pub enum SheetFillError {
    #[error("this PDF template is encrypted; supply an unprotected copy")]
    TemplateEncrypted,
    #[error("template is not a readable PDF: {0}")]
    TemplateUnreadable(String),
    #[error("failed to serialize filled sheet: {0}")]
    Serialize(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SheetFillError {
    pub fn code(&self) -> ExportErrorCode {
        match self {
            SheetFillError::TemplateEncrypted => ExportErrorCode::TemplateEncrypted,
            SheetFillError::TemplateUnreadable(_) => ExportErrorCode::TemplateUnreadable,
            SheetFillError::Serialize(_) => ExportErrorCode::Serialize,
            SheetFillError::InvalidConfiguration(_) => ExportErrorCode::InvalidConfiguration,
            SheetFillError::Io(_) => ExportErrorCode::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_strings() {
        assert_eq!(
            SheetFillError::TemplateEncrypted.code().as_str(),
            "TEMPLATE_ENCRYPTED"
        );
        assert_eq!(
            SheetFillError::TemplateUnreadable("x".into()).code(),
            ExportErrorCode::TemplateUnreadable
        );
    }

    #[test]
    fn encrypted_message_is_actionable() {
        let msg = SheetFillError::TemplateEncrypted.to_string();
        assert!(msg.contains("encrypted"));
    }

    #[test]
    fn io_errors_convert() {
        let err: SheetFillError = std::io::Error::other("disk").into();
        assert_eq!(err.code(), ExportErrorCode::Io);
        assert!(std::error::Error::source(&err).is_some());
    }
}
