use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Resident,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Resident => "resident",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resident" => Ok(Role::Resident),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// A portal user; the document id is the identity-provider uid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub interior_number: u32,
    #[serde(default)]
    pub house_number: String,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Name shown next to a notification: full name, else email
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.email
        } else {
            &self.full_name
        }
    }

    pub fn avatar_color(&self) -> &'static str {
        avatar_color(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub license_plate: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

pub const AVATAR_PALETTE: [&str; 7] = [
    "bg-red-500",
    "bg-blue-500",
    "bg-green-500",
    "bg-yellow-500",
    "bg-indigo-500",
    "bg-pink-500",
    "bg-purple-500",
];

/// Avatar colour for a user id: a pure function of the id, no shared cache
pub fn avatar_color(user_id: &str) -> &'static str {
    let digest = Sha256::digest(user_id.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let index = u64::from_be_bytes(head) % AVATAR_PALETTE.len() as u64;
    AVATAR_PALETTE[index as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_color_is_deterministic() {
        assert_eq!(avatar_color("u-123"), avatar_color("u-123"));
        assert!(AVATAR_PALETTE.contains(&avatar_color("")));
    }

    #[test]
    fn avatar_colors_spread_over_palette() {
        let distinct: std::collections::HashSet<_> =
            (0..200).map(|i| avatar_color(&format!("user-{}", i))).collect();
        assert!(distinct.len() > 3);
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let mut profile = Profile {
            id: "u1".into(),
            email: "ana@example.com".into(),
            full_name: "  ".into(),
            role: Role::Resident,
            phone: String::new(),
            interior_number: 0,
            house_number: String::new(),
            created_at: Utc::now(),
        };
        assert_eq!(profile.display_name(), "ana@example.com");
        profile.full_name = "Ana Ruiz".into();
        assert_eq!(profile.display_name(), "Ana Ruiz");
    }
}
