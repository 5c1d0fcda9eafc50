use thiserror::Error;

/// Unified error type for pdf-toolbox-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Input validation (no documents, bad size tokens, empty overlay content)
/// - PDF operations (reading, encryption, saving)
/// - Capability checks for optional compression strategies
/// - Google Drive operations (OAuth, API requests)
/// - Configuration and general I/O
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Input Errors
    // ==========================================================================
    /// No input documents were supplied
    #[error("no input documents")]
    NoInput,

    /// A page-size token could not be parsed
    #[error("invalid page size '{input}': expected WIDTHxHEIGHT (units: pt, in, mm), A4 or Letter")]
    SizePolicyParse { input: String },

    /// Unknown compression mode token
    #[error("unknown compression mode '{0}' (expected lossless, optimize or downscale)")]
    UnknownCompressionMode(String),

    /// Overlay text was empty
    #[error("no overlay content provided")]
    EmptyContent,

    /// Image bytes were missing or could not be decoded
    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    /// Overlay width, height or font size was not a positive number
    #[error("invalid overlay size: {0}")]
    InvalidOverlaySize(String),

    /// Date string was not in YYYY-MM-DD form
    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    // ==========================================================================
    // PDF Errors
    // ==========================================================================
    /// An input document could not be opened or parsed
    #[error("There was a problem reading the document: {file}: {reason}")]
    DocumentRead { file: String, reason: String },

    /// The document is encrypted
    #[error("cannot read encrypted PDF without password")]
    EncryptedDocument,

    /// Invalid page number requested
    #[error("invalid page number {page} (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// An optional capability was compiled out
    #[error("{capability} is not available in this build")]
    CapabilityUnavailable { capability: &'static str },

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    /// Error from the lopdf library
    #[error("lopdf error: {0}")]
    Lopdf(String),

    // ==========================================================================
    // Google Drive Errors
    // ==========================================================================
    /// Drive integration has no client credentials
    #[error("Google Drive not configured. Set GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET environment variables.")]
    DriveNotConfigured,

    /// The stored credentials were rejected
    #[error("Google Drive authorization expired or was revoked")]
    DriveUnauthorized,

    /// OAuth state did not match the one issued
    #[error("OAuth state mismatch")]
    DriveStateMismatch,

    /// Drive API request failed
    #[error("Google Drive request failed: {0}")]
    DriveRequest(String),

    /// Invalid response from the Drive API
    #[error("invalid Google Drive response: {0}")]
    DriveInvalidResponse(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error was caused by the caller's input rather than the server.
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NoInput
                | Self::SizePolicyParse { .. }
                | Self::UnknownCompressionMode(_)
                | Self::EmptyContent
                | Self::ImageDecode(_)
                | Self::InvalidOverlaySize(_)
                | Self::InvalidDate(_)
                | Self::DocumentRead { .. }
                | Self::EncryptedDocument
                | Self::PageOutOfRange { .. }
                | Self::CapabilityUnavailable { .. }
                | Self::DriveNotConfigured
                | Self::DriveStateMismatch
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
