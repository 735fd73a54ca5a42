#![allow(dead_code)]

use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    // DNS wire-format errors.
    #[error("insufficient data for base length type")]
    ErrBaseLen,
    #[error("insufficient data for calculated length type")]
    ErrCalcLen,
    #[error("segment prefix is reserved")]
    ErrReserved,
    #[error("name is not in canonical format (it must end with a .)")]
    ErrNonCanonicalName,
    #[error("too many pointers (>10)")]
    ErrTooManyPtr,
    #[error("invalid pointer")]
    ErrInvalidPtr,
    #[error("segment length too long")]
    ErrSegTooLong,
    #[error("zero length segment")]
    ErrZeroSegLen,
    #[error("name too long")]
    ErrNameTooLong,
    #[error("character string exceeds 255 bytes")]
    ErrStringTooLong,
    #[error("resource length too long")]
    ErrResTooLong,
    #[error("insufficient data for resource body length")]
    ErrResourceLen,
    #[error("nsec bitmap malformed")]
    ErrNsecBitmap,
    #[error("parsing/packing of this section has completed")]
    ErrSectionDone,
    #[error("parsing/packing of this type isn't available yet")]
    ErrNotStarted,
    #[error("too many Questions to pack (>65535)")]
    ErrTooManyQuestions,
    #[error("too many Answers to pack (>65535)")]
    ErrTooManyAnswers,
    #[error("too many Authorities to pack (>65535)")]
    ErrTooManyAuthorities,
    #[error("too many Additionals to pack (>65535)")]
    ErrTooManyAdditionals,

    // Discovery engine errors.
    #[error("connection closed")]
    ErrConnectionClosed,
    #[error("engine not started")]
    ErrEngineNotStarted,
    #[error("host name must not be empty")]
    ErrHostnameEmpty,
    #[error("invalid host name: {0}")]
    ErrInvalidHostName(String),
    #[error("invalid service name: {0}")]
    ErrInvalidServiceName(String),
    #[error("invalid instance name: {0}")]
    ErrInvalidInstanceName(String),

    #[error("{0}")]
    Io(#[source] IoError),
    #[error("utf8: {0}")]
    Utf8(#[from] FromUtf8Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// Workaround for wanting PartialEq for io::Error.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}
