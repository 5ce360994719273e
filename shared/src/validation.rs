use crate::models::{AdminRegistration, CandidateForm};

pub const DNI_LENGTH: usize = 8;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const ADMIN_ACCESS_CODE: &str = "ADMIN2024";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("DNI must be exactly {DNI_LENGTH} digits")]
    InvalidDni,
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters")]
    PasswordTooShort,
    #[error("Invalid access code")]
    InvalidAccessCode,
    #[error("Unknown role: {0}")]
    UnknownRole(String),
}

pub fn validate_dni(dni: &str) -> Result<(), ValidationError> {
    if dni.len() != DNI_LENGTH || !dni.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidDni);
    }
    Ok(())
}

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() { return Err(ValidationError::MissingField(field)); }
    Ok(())
}

pub fn validate_candidate_form(form: &CandidateForm) -> Result<(), ValidationError> {
    require(&form.name, "name")?;
    require(&form.party, "party")?;
    require(&form.photo, "photo")
}

/// Field presence first, then the password rules, then the shared access code.
/// Email uniqueness needs the stored accounts and is checked by the store.
pub fn validate_registration(registration: &AdminRegistration, access_code: &str) -> Result<(), ValidationError> {
    require(&registration.name, "name")?;
    require(&registration.email, "email")?;

    if registration.password != registration.confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    // Length in UTF-16 code units, as browsers count it.
    if registration.password.encode_utf16().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }
    if registration.access_code != access_code {
        return Err(ValidationError::InvalidAccessCode);
    }
    Ok(())
}
