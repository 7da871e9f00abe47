//! Error types for the virtual file tree.

use thiserror::Error;

/// Broad classes of failure, used by callers to decide whether to fall back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The bytes are not the requested format; try another codec.
    FormatMismatch,
    /// A declared length runs past the available bytes.
    TruncatedData,
    /// Bytes of the right format failed to decode. The node is now inaccessible.
    DecodeFailure,
    /// Building a container or image failed.
    Build,
    /// Tree options are invalid.
    Config,
    Io,
}

/// Errors that can occur while resolving or rebuilding nodes.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Common(#[from] arcsys_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("container error: {0}")]
    Pac(#[from] arcsys_pac::Error),

    #[error("image error: {0}")]
    Image(#[from] arcsys_image::Error),

    #[error("SEGS error: {0}")]
    Segs(#[from] arcsys_segs::Error),

    #[error("texture error: {0}")]
    Dds(#[from] arcsys_dds::Error),

    #[error("cipher error: {0}")]
    Crypto(#[from] arcsys_crypto::Error),

    #[error("invalid tree options: {0}")]
    Json(#[from] serde_json::Error),

    /// The ArcSys MD5 variant was selected without a key table.
    #[error("the arcsys MD5 variant needs a key table (md5_key)")]
    MissingKey,

    /// An earlier failure made the node permanently unreadable.
    #[error("{0} is not accessible")]
    NoAccess(String),

    /// The node is not a member of the container.
    #[error("{member} is not a member of {container}")]
    NotAMember { container: String, member: String },

    /// A node's byte range starts past the end of its backing.
    #[error("{path} starts at {offset:#x}, past the {available:#x}-byte backing")]
    OutOfRange {
        path: String,
        offset: usize,
        available: usize,
    },
}

fn common_kind(error: &arcsys_common::Error) -> ErrorKind {
    match error {
        arcsys_common::Error::UnexpectedEof { .. } => ErrorKind::TruncatedData,
        arcsys_common::Error::InvalidMagic { .. } => ErrorKind::FormatMismatch,
        arcsys_common::Error::PatchOutOfRange { .. } => ErrorKind::Build,
        arcsys_common::Error::Io(_) => ErrorKind::Io,
    }
}

impl Error {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        use arcsys_image::Error as Image;
        use arcsys_pac::Error as Pac;

        match self {
            Self::Common(e) => common_kind(e),
            Self::Io(_) => ErrorKind::Io,
            Self::Pac(e) => match e {
                Pac::Common(e) => common_kind(e),
                Pac::Io(_) | Pac::Walk(_) => ErrorKind::Io,
                Pac::TooShort(_) | Pac::InvalidMagic(_) | Pac::InvalidHeader(_) => {
                    ErrorKind::FormatMismatch
                }
                Pac::EntryOutOfRange { .. } => ErrorKind::TruncatedData,
                Pac::NameTooLong { .. } | Pac::SizeOverflow(_) => ErrorKind::Build,
            },
            Self::Image(e) => match e {
                Image::Common(e) => common_kind(e),
                Image::NotHip | Image::NotHpl => ErrorKind::FormatMismatch,
                Image::UnsupportedEncoder(_) | Image::PixelBufferSize { .. } => ErrorKind::Build,
                _ => ErrorKind::DecodeFailure,
            },
            Self::Segs(_) => ErrorKind::DecodeFailure,
            Self::Dds(e) => match e {
                arcsys_dds::Error::InvalidMagic(_) => ErrorKind::FormatMismatch,
                _ => ErrorKind::DecodeFailure,
            },
            Self::Crypto(_) | Self::Json(_) | Self::MissingKey => ErrorKind::Config,
            Self::NoAccess(_) => ErrorKind::DecodeFailure,
            Self::NotAMember { .. } => ErrorKind::Build,
            Self::OutOfRange { .. } => ErrorKind::TruncatedData,
        }
    }

    /// Whether this failure makes the node permanently inaccessible.
    pub fn is_sticky(&self) -> bool {
        matches!(self.kind(), ErrorKind::DecodeFailure | ErrorKind::Io)
    }
}

/// Result type for tree operations.
pub type Result<T> = std::result::Result<T, Error>;
