//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// User Roles
// =============================================================================

/// Default role assigned to new users
pub const ROLE_USER: &str = "user";

/// Administrator role with elevated privileges
pub const ROLE_ADMIN: &str = "admin";

// =============================================================================
// Lifecycle Statuses
// =============================================================================

/// Account can log in and be mutated
pub const USER_STATUS_ACTIVE: &str = "ACTIVE";

/// Account is retained but locked out
pub const USER_STATUS_DISABLED: &str = "DISABLED";

/// All valid user status values
pub const VALID_USER_STATUSES: &[&str] = &[USER_STATUS_ACTIVE, USER_STATUS_DISABLED];

/// Prescription recorded but not yet dispensed
pub const PRESCRIPTION_STATUS_PENDING: &str = "PENDING";

/// Prescription currently being taken
pub const PRESCRIPTION_STATUS_ACTIVE: &str = "ACTIVE";

/// Course completed
pub const PRESCRIPTION_STATUS_DONE: &str = "DONE";

/// Prescription withdrawn before completion
pub const PRESCRIPTION_STATUS_CANCELLED: &str = "CANCELLED";

/// All valid prescription status values
pub const VALID_PRESCRIPTION_STATUSES: &[&str] = &[
    PRESCRIPTION_STATUS_PENDING,
    PRESCRIPTION_STATUS_ACTIVE,
    PRESCRIPTION_STATUS_DONE,
    PRESCRIPTION_STATUS_CANCELLED,
];

/// Check if a user status value is valid
pub fn is_valid_user_status(status: &str) -> bool {
    VALID_USER_STATUSES.contains(&status)
}

/// Check if a prescription status value is valid
pub fn is_valid_prescription_status(status: &str) -> bool {
    VALID_PRESCRIPTION_STATUSES.contains(&status)
}

// =============================================================================
// Credential Hash Marker
// =============================================================================

/// PHC algorithm identifier every stored credential must carry
pub const HASH_ALGORITHM: &str = "argon2id";

/// Argon2 version field (0x13)
pub const HASH_VERSION: u32 = 0x13;

/// Encoded salt length in characters (16 raw bytes, unpadded base64)
pub const HASH_SALT_LENGTH: usize = 22;

/// Raw hash output length in bytes
pub const HASH_OUTPUT_LENGTH: usize = 32;
