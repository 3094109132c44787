use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::session::Role;

const MIN_PASSWORD_LEN: usize = 6;
const MIN_SECURITY_CODE_LEN: usize = 4;

/// Faculty self-registration form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FacultySignup {
    pub faculty_id: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "confirmPassword", alias = "confirm_password")]
    pub confirm_password: String,
    pub security_code: String,
    pub department: String,
    pub designation: String,
    pub joining_date: String,
}

/// Administrator self-registration form. `role` is the administrative title
/// (e.g. Dean), not the dashboard role.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdminSignup {
    pub admin_id: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "confirmPassword", alias = "confirm_password")]
    pub confirm_password: String,
    pub security_code: String,
    pub role: String,
    pub department: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignupError {
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password must be at least 6 characters long")]
    PasswordTooShort,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Security code must be at least 4 characters")]
    SecurityCodeTooShort,
    #[error("Please fill in all required fields ({0} is missing)")]
    MissingField(&'static str),
    #[error("joining date '{0}' must be formatted as YYYY-MM-DD")]
    InvalidJoiningDate(String),
}

fn validate_credentials(
    email: &str,
    password: &str,
    confirm_password: &str,
    security_code: &str,
) -> Result<(), SignupError> {
    if email.is_empty() || !email.contains('@') {
        return Err(SignupError::InvalidEmail);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(SignupError::PasswordTooShort);
    }
    if password != confirm_password {
        return Err(SignupError::PasswordMismatch);
    }
    if security_code.chars().count() < MIN_SECURITY_CODE_LEN {
        return Err(SignupError::SecurityCodeTooShort);
    }
    Ok(())
}

fn require(value: &str, field: &'static str) -> Result<(), SignupError> {
    if value.trim().is_empty() {
        Err(SignupError::MissingField(field))
    } else {
        Ok(())
    }
}

impl FacultySignup {
    pub fn validate(&self) -> Result<NaiveDate, SignupError> {
        validate_credentials(
            &self.email,
            &self.password,
            &self.confirm_password,
            &self.security_code,
        )?;
        require(&self.faculty_id, "faculty_id")?;
        require(&self.department, "department")?;
        require(&self.designation, "designation")?;
        require(&self.joining_date, "joining_date")?;

        NaiveDate::parse_from_str(self.joining_date.trim(), "%Y-%m-%d")
            .map_err(|_| SignupError::InvalidJoiningDate(self.joining_date.clone()))
    }

    pub fn into_account(self) -> Result<Account, SignupError> {
        let joining_date = self.validate()?;
        let id = self.faculty_id.trim().to_string();
        Ok(Account {
            password_digest: digest_secret(&id, &self.password),
            security_code_digest: digest_secret(&id, &self.security_code),
            role: Role::Faculty,
            email: self.email,
            department: self.department,
            profile: AccountProfile::Faculty {
                designation: self.designation,
                joining_date,
            },
            id,
        })
    }
}

impl AdminSignup {
    pub fn validate(&self) -> Result<(), SignupError> {
        validate_credentials(
            &self.email,
            &self.password,
            &self.confirm_password,
            &self.security_code,
        )?;
        require(&self.admin_id, "admin_id")?;
        require(&self.role, "role")?;
        require(&self.department, "department")
    }

    pub fn into_account(self) -> Result<Account, SignupError> {
        self.validate()?;
        let id = self.admin_id.trim().to_string();
        Ok(Account {
            password_digest: digest_secret(&id, &self.password),
            security_code_digest: digest_secret(&id, &self.security_code),
            role: Role::Admin,
            email: self.email,
            department: self.department,
            profile: AccountProfile::Admin { title: self.role },
            id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountProfile {
    Faculty {
        designation: String,
        joining_date: NaiveDate,
    },
    Admin {
        title: String,
    },
}

/// Registered user. Secrets are kept only as salted SHA-256 digests, which is
/// enough for the in-memory directory but not for a persistent credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub role: Role,
    pub email: String,
    pub department: String,
    pub profile: AccountProfile,
    password_digest: String,
    security_code_digest: String,
}

impl Account {
    /// Compares digests without an early exit on the first differing byte.
    pub fn verify_password(&self, candidate: &str) -> bool {
        let candidate = digest_secret(&self.id, candidate);
        candidate.len() == self.password_digest.len()
            && candidate
                .bytes()
                .zip(self.password_digest.bytes())
                .fold(0u8, |diff, (left, right)| diff | (left ^ right))
                == 0
    }
}

/// Single-round salted SHA-256. Fast by construction, so it offers little
/// resistance to offline guessing.
// TODO: switch to argon2 before accounts are persisted outside the process.
fn digest_secret(id: &str, secret: &str) -> String {
    let digest = Sha256::new()
        .chain_update(id.as_bytes())
        .chain_update(b":")
        .chain_update(secret.as_bytes())
        .finalize();
    format!("{digest:x}")
}
