//! Shared error-code contract.
//!
//! Every service error enum implements [`ErrorCode`] so a failure can be
//! reported to HTTP and websocket clients with a stable, grepable `E_*` code
//! alongside its human-readable message.

pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

impl ErrorCode for frames::StrokeError {
    fn error_code(&self) -> &'static str {
        "E_INVALID_STROKE"
    }
}

impl ErrorCode for frames::MessageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Stroke(_) => "E_INVALID_STROKE",
            Self::TooManyPoints(_) => "E_TOO_MANY_POINTS",
        }
    }
}

impl ErrorCode for frames::CodecError {
    fn error_code(&self) -> &'static str {
        "E_MALFORMED_MESSAGE"
    }
}
