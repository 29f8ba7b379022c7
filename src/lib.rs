//! Username and display name policy shared by everything that accepts or
//! links to user accounts.

pub mod user;

pub use user::{user_url, USERNAME_MAX_LENGTH, USER_DISPLAY_NAME_MAX_LENGTH, VALID_USERNAME_REGEXP};
