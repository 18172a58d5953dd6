//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use jsonrpsee::types::ErrorObjectOwned;
use roster_core::domain::DomainError;
use roster_core::error::AppError;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const STORAGE_ERROR: i32 = 5001;
    pub const INVARIANT_VIOLATION: i32 = 5002;
    pub const TIMEOUT: i32 = 5003;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    let code = match &err {
        AppError::Validation(_) | AppError::Serialization(_) => code::VALIDATION_ERROR,
        AppError::NotFound(_) => code::NOT_FOUND,
        AppError::Conflict(_) => code::CONFLICT,
        AppError::Storage(_) => code::STORAGE_ERROR,
        AppError::Timeout(_) => code::TIMEOUT,
        AppError::InvariantViolation(_) => code::INVARIANT_VIOLATION,
        AppError::Domain(e) => match e {
            DomainError::InvalidStateTransition { .. } => code::CONFLICT,
            DomainError::ValidationError(_) => code::VALIDATION_ERROR,
            DomainError::DuplicateMember { .. } | DomainError::CursorOutOfBounds { .. } => {
                code::INVARIANT_VIOLATION
            }
        },
        AppError::Config(_) | AppError::Io(_) | AppError::Internal(_) => code::INTERNAL_ERROR,
    };

    ErrorObjectOwned::owned(code, err.to_string(), None::<()>)
}
