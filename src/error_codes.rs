// src/error_codes.rs
//
// Parse REST error codes and their translation into field-level errors.

use crate::validation::{FieldError, BASE_FIELD};

/// Numeric error codes returned by Parse in `{"code": ..., "error": ...}` payloads.
pub mod codes {
    pub const INTERNAL_SERVER_ERROR: i64 = 1;
    pub const CONNECTION_FAILED: i64 = 100;
    pub const OBJECT_NOT_FOUND: i64 = 101;
    pub const INVALID_QUERY: i64 = 102;
    pub const INVALID_CLASS_NAME: i64 = 103;
    pub const MISSING_OBJECT_ID: i64 = 104;
    pub const INVALID_KEY_NAME: i64 = 105;
    pub const INVALID_POINTER: i64 = 106;
    pub const INVALID_JSON: i64 = 107;
    pub const COMMAND_UNAVAILABLE: i64 = 108;
    pub const NOT_INITIALIZED: i64 = 109;
    pub const INCORRECT_TYPE: i64 = 111;
    pub const INVALID_CHANNEL_NAME: i64 = 112;
    pub const PUSH_MISCONFIGURED: i64 = 115;
    pub const OBJECT_TOO_LARGE: i64 = 116;
    pub const OPERATION_FORBIDDEN: i64 = 119;
    pub const CACHE_MISS: i64 = 120;
    pub const INVALID_NESTED_KEY: i64 = 121;
    pub const INVALID_FILE_NAME: i64 = 122;
    pub const INVALID_ACL: i64 = 123;
    pub const TIMEOUT: i64 = 124;
    pub const INVALID_EMAIL_ADDRESS: i64 = 125;
    pub const DUPLICATE_VALUE: i64 = 137;
    pub const INVALID_ROLE_NAME: i64 = 139;
    pub const EXCEEDED_QUOTA: i64 = 140;
    pub const SCRIPT_FAILED: i64 = 141;
    pub const VALIDATION_FAILED: i64 = 142;
    pub const USERNAME_MISSING: i64 = 200;
    pub const PASSWORD_MISSING: i64 = 201;
    pub const USERNAME_TAKEN: i64 = 202;
    pub const EMAIL_TAKEN: i64 = 203;
    pub const EMAIL_MISSING: i64 = 204;
    pub const EMAIL_NOT_FOUND: i64 = 205;
    pub const SESSION_MISSING: i64 = 206;
    pub const MUST_CREATE_USER_THROUGH_SIGNUP: i64 = 207;
    pub const ACCOUNT_ALREADY_LINKED: i64 = 208;
    pub const INVALID_SESSION_TOKEN: i64 = 209;
    pub const LINKED_ID_MISSING: i64 = 250;
    pub const INVALID_LINKED_SESSION: i64 = 251;
    pub const UNSUPPORTED_SERVICE: i64 = 252;
}

// (code, field, message)
const TABLE: &[(i64, &str, &str)] = &[
    (codes::INTERNAL_SERVER_ERROR, BASE_FIELD, "Internal server error"),
    (codes::CONNECTION_FAILED, BASE_FIELD, "Connection to the server failed"),
    (codes::OBJECT_NOT_FOUND, BASE_FIELD, "Object not found"),
    (codes::INVALID_QUERY, BASE_FIELD, "Invalid query"),
    (codes::INVALID_CLASS_NAME, BASE_FIELD, "Invalid class name"),
    (codes::MISSING_OBJECT_ID, "objectId", "is missing"),
    (codes::INVALID_KEY_NAME, BASE_FIELD, "Invalid field name"),
    (codes::INVALID_POINTER, BASE_FIELD, "Invalid pointer"),
    (codes::INVALID_JSON, BASE_FIELD, "Badly formed JSON"),
    (codes::COMMAND_UNAVAILABLE, BASE_FIELD, "Command unavailable"),
    (codes::NOT_INITIALIZED, BASE_FIELD, "Client not initialized"),
    (codes::INCORRECT_TYPE, BASE_FIELD, "Field set to incorrect type"),
    (codes::INVALID_CHANNEL_NAME, BASE_FIELD, "Invalid channel name"),
    (codes::PUSH_MISCONFIGURED, BASE_FIELD, "Push is misconfigured"),
    (codes::OBJECT_TOO_LARGE, BASE_FIELD, "Object is too large"),
    (codes::OPERATION_FORBIDDEN, BASE_FIELD, "Operation is not allowed"),
    (codes::CACHE_MISS, BASE_FIELD, "Result not found in the cache"),
    (codes::INVALID_NESTED_KEY, BASE_FIELD, "Invalid key in nested object"),
    (codes::INVALID_FILE_NAME, BASE_FIELD, "Invalid file name"),
    (codes::INVALID_ACL, "ACL", "is invalid"),
    (codes::TIMEOUT, BASE_FIELD, "Request timed out"),
    (codes::INVALID_EMAIL_ADDRESS, "email", "is invalid"),
    (codes::DUPLICATE_VALUE, BASE_FIELD, "A unique field was given a duplicate value"),
    (codes::INVALID_ROLE_NAME, BASE_FIELD, "Invalid role name"),
    (codes::EXCEEDED_QUOTA, BASE_FIELD, "Application quota exceeded"),
    (codes::SCRIPT_FAILED, BASE_FIELD, "Cloud code script failed"),
    (codes::VALIDATION_FAILED, BASE_FIELD, "Cloud code validation failed"),
    (codes::USERNAME_MISSING, "username", "can't be blank"),
    (codes::PASSWORD_MISSING, "password", "can't be blank"),
    (codes::USERNAME_TAKEN, "username", "has already been taken"),
    (codes::EMAIL_TAKEN, "email", "has already been taken"),
    (codes::EMAIL_MISSING, "email", "can't be blank"),
    (codes::EMAIL_NOT_FOUND, "email", "was not found"),
    (codes::SESSION_MISSING, "sessionToken", "is missing"),
    (codes::MUST_CREATE_USER_THROUGH_SIGNUP, BASE_FIELD, "User must be created through signup"),
    (codes::ACCOUNT_ALREADY_LINKED, BASE_FIELD, "Account already linked to another user"),
    (codes::INVALID_SESSION_TOKEN, "sessionToken", "is invalid"),
    (codes::LINKED_ID_MISSING, BASE_FIELD, "Linked account id is missing"),
    (codes::INVALID_LINKED_SESSION, BASE_FIELD, "Linked account session is invalid"),
    (codes::UNSUPPORTED_SERVICE, BASE_FIELD, "Authentication service is not supported"),
];

/// Translates a backend error code into a `(field, message)` pair.
///
/// Never fails: codes missing from the table fall back to a `"base"` error naming the code.
pub fn translate(code: i64) -> FieldError {
    match TABLE.iter().find(|(known, _, _)| *known == code) {
        Some((_, field, message)) => FieldError::new(*field, *message),
        None => FieldError::base(format!("Unknown error (code {})", code)),
    }
}

/// Returns `true` if `code` has a dedicated entry in the translation table.
pub fn is_known(code: i64) -> bool {
    TABLE.iter().any(|(known, _, _)| *known == code)
}
