//! Identity provider seam
//!
//! Accounts (email + password) live outside the document store; profiles
//! reference them by uid. The portal only needs to create accounts, look them
//! up by email and check credentials on sign-in.

use super::password::{PasswordError, PasswordHasherService};
use crate::store::new_document_id;
use std::sync::Arc;

/// Shortest password the provider accepts
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum IdentityError {
    #[error("email already exists: {0}")]
    EmailAlreadyExists(String),
    #[error("password does not meet the policy")]
    InvalidPassword,
    #[error("invalid email: {0}")]
    InvalidEmail(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("no account for {0}")]
    UnknownUser(String),
    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl IdentityError {
    /// Message shown to the administrator or resident
    pub fn user_message(&self) -> String {
        match self {
            IdentityError::EmailAlreadyExists(_) => "Email is already registered.".to_string(),
            IdentityError::InvalidPassword => {
                "Temporary password does not meet the policy.".to_string()
            }
            IdentityError::InvalidEmail(_) => "Email is not valid.".to_string(),
            IdentityError::InvalidCredentials | IdentityError::UnknownUser(_) => {
                "Invalid email or password.".to_string()
            }
            IdentityError::Password(e) => format!("identity_error: {}", e),
        }
    }
}

/// `local@domain.tld`: non-empty local part and a dot somewhere after the `@`
pub fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .map(|(host, tld)| !host.is_empty() && !tld.is_empty())
                    .unwrap_or(false)
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account; fails with `EmailAlreadyExists` when the email is taken
    async fn create_user(&self, request: NewIdentity) -> Result<Identity, IdentityError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, IdentityError>;

    /// Check credentials and return the account
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError>;
}

#[async_trait::async_trait]
impl<P: IdentityProvider + ?Sized> IdentityProvider for Arc<P> {
    async fn create_user(&self, request: NewIdentity) -> Result<Identity, IdentityError> {
        (**self).create_user(request).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, IdentityError> {
        (**self).find_by_email(email).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        (**self).sign_in(email, password).await
    }
}

struct Account {
    identity: Identity,
    password_hash: String,
}

/// Process-local accounts keyed by lower-cased email
#[derive(Default)]
pub struct MemoryIdentityProvider {
    accounts: scc::HashMap<String, Account>,
    hasher: PasswordHasherService,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

fn account_key(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait::async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn create_user(&self, request: NewIdentity) -> Result<Identity, IdentityError> {
        let email = request.email.trim().to_string();
        if !is_valid_email(&email) {
            return Err(IdentityError::InvalidEmail(email));
        }
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::InvalidPassword);
        }

        let identity = Identity {
            uid: new_document_id(),
            email: email.clone(),
            display_name: request.display_name.filter(|name| !name.trim().is_empty()),
        };
        let password_hash = self.hasher.hash_password(&request.password)?;

        self.accounts
            .insert_async(account_key(&email), Account { identity: identity.clone(), password_hash })
            .await
            .map_err(|_| IdentityError::EmailAlreadyExists(email))?;

        log::info!("Created identity {} for {}", identity.uid, identity.email);
        Ok(identity)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, IdentityError> {
        Ok(self.accounts.read_async(&account_key(email), |_, account| account.identity.clone()).await)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let found = self
            .accounts
            .read_async(&account_key(email), |_, account| {
                (account.identity.clone(), account.password_hash.clone())
            })
            .await;

        let (identity, hash) = found.ok_or_else(|| IdentityError::UnknownUser(email.to_string()))?;
        if self.hasher.verify_password(password, &hash)? {
            Ok(identity)
        } else {
            Err(IdentityError::InvalidCredentials)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, password: &str) -> NewIdentity {
        NewIdentity {
            email: email.to_string(),
            password: password.to_string(),
            display_name: Some("Ana Torres".to_string()),
        }
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("ana@example.com"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ana example.com"));
        assert!(!is_valid_email("ana@.com"));
    }

    #[tokio::test]
    async fn test_create_and_sign_in() {
        let provider = MemoryIdentityProvider::new();
        let created = provider.create_user(request("ana@example.com", "secret1")).await.unwrap();

        let signed_in = provider.sign_in("ANA@example.com", "secret1").await.unwrap();
        assert_eq!(signed_in.uid, created.uid);
        assert!(matches!(
            provider.sign_in("ana@example.com", "wrong-pass").await,
            Err(IdentityError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let provider = MemoryIdentityProvider::new();
        provider.create_user(request("ana@example.com", "secret1")).await.unwrap();
        let err = provider.create_user(request("Ana@Example.com", "secret2")).await.unwrap_err();

        assert!(matches!(err, IdentityError::EmailAlreadyExists(_)));
        assert_eq!(err.user_message(), "Email is already registered.");
        assert_eq!(provider.len(), 1);
    }

    #[tokio::test]
    async fn test_policy_violations() {
        let provider = MemoryIdentityProvider::new();
        assert!(matches!(
            provider.create_user(request("ana@example.com", "123")).await,
            Err(IdentityError::InvalidPassword)
        ));
        assert!(matches!(
            provider.create_user(request("not-an-email", "secret1")).await,
            Err(IdentityError::InvalidEmail(_))
        ));
        assert!(provider.is_empty());
    }
}
