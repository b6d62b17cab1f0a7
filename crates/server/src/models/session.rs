//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use bluewave_core::{Email, UserId, UserRole};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// User's email address.
    pub email: Email,
    /// Account role.
    pub role: UserRole,
}

/// Session keys for authentication data.
pub mod session_keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the user awaiting MFA verification (password already checked).
    pub const MFA_USER_ID: &str = "mfa_user_id";

    /// Key for the user being pushed through mandatory MFA enrollment.
    pub const MFA_SETUP_USER_ID: &str = "mfa_setup_user_id";

    /// Key for freshly generated backup codes, shown exactly once.
    pub const MFA_BACKUP_CODES: &str = "mfa_backup_codes";

    /// Key for the session JWT minted at login.
    pub const JWT_TOKEN: &str = "jwt_token";

    /// Key for Google OAuth state (CSRF protection).
    pub const GOOGLE_OAUTH_STATE: &str = "google_oauth_state";
}
