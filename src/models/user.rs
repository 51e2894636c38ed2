// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider profile.

use serde::{Deserialize, Serialize};

/// User-info response from the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub email: Option<String>,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

impl UserInfo {
    /// Best available display name.
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = &self.name {
            if !name.trim().is_empty() {
                return Some(name.trim().to_string());
            }
        }

        match (&self.given_name, &self.family_name) {
            (Some(given), Some(family)) => Some(format!("{} {}", given, family)),
            (Some(given), None) => Some(given.clone()),
            (None, Some(family)) => Some(family.clone()),
            (None, None) => None,
        }
    }

    /// `None` when the provider did not share an email.
    pub fn into_profile(self) -> Option<UserProfile> {
        let display_name = self.display_name();
        let email = self.email.filter(|e| !e.trim().is_empty())?;
        Some(UserProfile {
            display_name: display_name.unwrap_or_else(|| email.clone()),
            email,
        })
    }
}

/// Cached profile of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub email: String,
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(email: Option<&str>, name: Option<&str>, given: Option<&str>, family: Option<&str>) -> UserInfo {
        UserInfo {
            email: email.map(String::from),
            name: name.map(String::from),
            given_name: given.map(String::from),
            family_name: family.map(String::from),
            picture: None,
        }
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(
            info(None, Some("Ada Lovelace"), None, None).display_name(),
            Some("Ada Lovelace".to_string())
        );
        assert_eq!(
            info(None, Some("  "), Some("Ada"), Some("Lovelace")).display_name(),
            Some("Ada Lovelace".to_string())
        );
        assert_eq!(info(None, None, None, Some("Lovelace")).display_name(), Some("Lovelace".to_string()));
        assert_eq!(info(None, None, None, None).display_name(), None);
    }

    #[test]
    fn test_into_profile() {
        let profile = info(Some("ada@example.com"), None, None, None).into_profile().unwrap();
        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(profile.display_name, "ada@example.com");

        assert!(info(None, Some("Ada"), None, None).into_profile().is_none());
    }
}
