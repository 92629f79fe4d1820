//! Resident onboarding and profile bootstrap
//!
//! An administrator registers a resident: an account is created in the
//! identity provider, then the profile (document id = uid) and an optional
//! vehicle are written in one batch. Registering an email that already has an
//! account completes that account's profile instead of failing.

pub mod identity;
pub mod password;

pub use identity::{
    is_valid_email, Identity, IdentityError, IdentityProvider, MemoryIdentityProvider,
    NewIdentity, MIN_PASSWORD_LEN,
};
pub use password::{PasswordError, PasswordHasherService};

use crate::backend::Portal;
use crate::error::{PortalError, PortalResult};
use crate::model::{collections, Profile, Role, Vehicle};
use crate::store::{encode_fields, new_document_id, WriteBatch};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reported when the email already had an account
pub const EXISTING_USER_INFO: &str = "user already existed";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVehicle {
    pub license_plate: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResident {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub interior_number: i64,
    #[serde(default)]
    pub house_number: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub vehicle: Option<NewVehicle>,
}

impl NewResident {
    pub fn new(email: &str, password: &str, full_name: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
            full_name: full_name.to_string(),
            phone: String::new(),
            interior_number: 0,
            house_number: String::new(),
            role: Role::Resident,
            vehicle: None,
        }
    }

    pub fn with_vehicle(mut self, vehicle: NewVehicle) -> Self {
        self.vehicle = Some(vehicle);
        self
    }

    pub fn validate(&self) -> PortalResult<()> {
        if !is_valid_email(self.email.trim()) {
            return Err(PortalError::validation("email is not valid"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PortalError::validation("password must have at least 6 characters"));
        }
        if self.full_name.trim().chars().count() < 3 {
            return Err(PortalError::validation("fullName must have at least 3 characters"));
        }
        if self.interior_number < 0 || self.interior_number > i64::from(u32::MAX) {
            return Err(PortalError::validation("interiorNumber must be a non-negative integer"));
        }
        if let Some(vehicle) = &self.vehicle {
            if vehicle.license_plate.trim().chars().count() < 3 {
                return Err(PortalError::validation("licensePlate must have at least 3 characters"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidentRegistration {
    pub uid: String,
    /// The email already had an account; its profile was merged
    pub existed: bool,
    pub vehicle_id: Option<String>,
}

#[derive(Clone)]
pub struct ResidentService {
    portal: Portal,
}

impl ResidentService {
    pub fn new(portal: Portal) -> Self {
        Self { portal }
    }

    pub async fn create_resident(&self, request: NewResident) -> PortalResult<ResidentRegistration> {
        request.validate()?;
        let store = self.portal.store()?;
        let identity = self.portal.identity()?;

        let email = request.email.trim().to_string();
        let created = identity
            .create_user(NewIdentity {
                email: email.clone(),
                password: request.password.clone(),
                display_name: Some(request.full_name.trim().to_string()),
            })
            .await;

        let (uid, existed) = match created {
            Ok(account) => (account.uid, false),
            Err(IdentityError::EmailAlreadyExists(_)) => {
                let existing = identity
                    .find_by_email(&email)
                    .await?
                    .ok_or_else(|| IdentityError::UnknownUser(email.clone()))?;
                (existing.uid, true)
            }
            Err(e) => return Err(e.into()),
        };

        let now = Utc::now();
        let profile = Profile {
            id: uid.clone(),
            email,
            full_name: request.full_name.trim().to_string(),
            role: request.role,
            phone: request.phone.trim().to_string(),
            interior_number: request.interior_number as u32,
            house_number: request.house_number.trim().to_string(),
            created_at: now,
        };

        let mut batch = WriteBatch::new();
        if existed {
            batch.merge(collections::PROFILES, &uid, encode_fields(&profile)?);
        } else {
            batch.set(collections::PROFILES, &uid, encode_fields(&profile)?);
        }

        let vehicle_id = match &request.vehicle {
            Some(vehicle) => {
                let id = new_document_id();
                let record = Vehicle {
                    id: String::new(),
                    user_id: uid.clone(),
                    license_plate: vehicle.license_plate.trim().to_uppercase(),
                    brand: vehicle.brand.trim().to_string(),
                    model: vehicle.model.trim().to_string(),
                    color: vehicle.color.trim().to_string(),
                    active: true,
                    created_at: now,
                };
                batch.set(collections::VEHICLES, &id, encode_fields(&record)?);
                Some(id)
            }
            None => None,
        };

        store.commit(batch).await?;
        log::info!(
            "Resident {} registered as {} ({})",
            uid,
            profile.role,
            if existed { "existing account" } else { "new account" }
        );
        Ok(ResidentRegistration { uid, existed, vehicle_id })
    }

    /// Authenticate and make sure a profile exists; returns the user's role.
    ///
    /// First sign-in creates a resident profile named after the account's
    /// display name, or the local part of the email.
    pub async fn ensure_profile(&self, email: &str, password: &str) -> PortalResult<(String, Role)> {
        let store = self.portal.store()?;
        let identity = self.portal.identity()?;

        let account = identity.sign_in(email, password).await?;

        if let Some(doc) = store.get(collections::PROFILES, &account.uid).await? {
            let role = doc
                .get("role")
                .and_then(Value::as_str)
                .and_then(|role| role.parse().ok())
                .unwrap_or_default();
            return Ok((account.uid, role));
        }

        let full_name = account
            .display_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
        let profile = Profile {
            id: account.uid.clone(),
            email: account.email.clone(),
            full_name,
            role: Role::Resident,
            phone: String::new(),
            interior_number: 0,
            house_number: String::new(),
            created_at: Utc::now(),
        };
        store.set(collections::PROFILES, &account.uid, encode_fields(&profile)?, false).await?;

        log::info!("Created default profile for {}", account.uid);
        Ok((account.uid, Role::Resident))
    }
}
