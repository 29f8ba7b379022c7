// src/user.rs

/// Regular expression source identifying a valid username.
///
/// A username starts with an ASCII letter or digit. A `-` or `.` may appear
/// only between two letters or digits, so separators never lead, trail, or
/// repeat. The pattern carries no length bound; see [`USERNAME_MAX_LENGTH`].
///
/// Exported as source text so callers compile it with whatever engine they
/// use. It avoids lookaround so it compiles with the `regex` crate as well as
/// backtracking engines. It accepts the same strings as the older lookahead
/// form `^[a-zA-Z0-9](?:[a-zA-Z0-9]|[-.](?=[a-zA-Z0-9]))*$`, but the text
/// differs, so compare by matching, not by string equality.
pub const VALID_USERNAME_REGEXP: &str = r"^[a-zA-Z0-9]+(?:[-.][a-zA-Z0-9]+)*$";

/// Maximum allowed length for a username.
pub const USERNAME_MAX_LENGTH: usize = 255;

/// Maximum allowed length for a user display name.
pub const USER_DISPLAY_NAME_MAX_LENGTH: usize = 255;

/// Returns the URL path to a user's public profile.
///
/// The username is embedded as given, without escaping or validation.
pub fn user_url(username: &str) -> String {
    format!("/users/{}", username)
}
