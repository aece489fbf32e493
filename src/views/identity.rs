// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Avatar initials and display names.

use crate::models::User;

const FALLBACK_INITIALS: &str = "U";
const FALLBACK_NAME: &str = "User";

/// Uppercased first letters of the name parts, or `"U"` if both are missing
/// or empty.
pub fn initials(first_name: Option<&str>, last_name: Option<&str>) -> String {
    let letters: String = [first_name, last_name]
        .into_iter()
        .flatten()
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .collect();

    if letters.is_empty() {
        FALLBACK_INITIALS.to_string()
    } else {
        letters
    }
}

/// `"first last"` if either name part is present, then the email, then
/// `"User"`.
pub fn display_name(user: &User) -> String {
    let first = user.first_name.as_deref().unwrap_or_default();
    let last = user.last_name.as_deref().unwrap_or_default();

    if !first.is_empty() || !last.is_empty() {
        return format!("{first} {last}").trim().to_string();
    }

    match user.email.as_deref() {
        Some(email) if !email.is_empty() => email.to_string(),
        _ => FALLBACK_NAME.to_string(),
    }
}

/// Identity chrome shown next to the navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub initials: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl Identity {
    pub fn for_user(user: &User) -> Self {
        Self {
            initials: initials(user.first_name.as_deref(), user.last_name.as_deref()),
            display_name: display_name(user),
            avatar_url: user.profile_image_url.clone(),
        }
    }
}
