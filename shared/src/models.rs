use serde::{Serialize, Deserialize};
use std::fmt;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use crate::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    President,
    Mayor,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::President, Role::Mayor];

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::President => "president",
            Role::Mayor => "mayor",
        }
    }

    /// Store key holding this role's candidate collection.
    pub const fn collection_key(self) -> &'static str {
        match self {
            Role::President => "presidents",
            Role::Mayor => "mayors",
        }
    }

    pub const fn id_prefix(self) -> char {
        match self {
            Role::President => 'p',
            Role::Mayor => 'm',
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "president" => Ok(Role::President),
            "mayor" => Ok(Role::Mayor),
            other => Err(ValidationError::UnknownRole(other.to_string())),
        }
    }
}

#[cfg(feature = "backend")]
impl<'a> rocket::request::FromParam<'a> for Role {
    type Error = ValidationError;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub party: String,
    pub photo: String,
    #[serde(rename = "type")]
    pub role: Role,
    #[serde(default)]
    pub votes: u32,
}

impl Candidate {
    pub fn new(id: impl Into<String>, role: Role, form: &CandidateForm) -> Self {
        Self {
            id: id.into(),
            name: form.name.trim().to_string(),
            party: form.party.trim().to_string(),
            photo: form.photo.trim().to_string(),
            role,
            votes: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub dni: String,
    pub president_id: String,
    pub mayor_id: String,
    /// RFC 3339 when written here; rows from other writers are kept verbatim.
    pub timestamp: String,
}

impl Vote {
    pub fn choice(&self, role: Role) -> &str {
        match role {
            Role::President => &self.president_id,
            Role::Mayor => &self.mayor_id,
        }
    }
}

/// A ballot with only one race chosen so far. Kept apart from the vote list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BallotDraft {
    pub dni: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub president_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mayor_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl BallotDraft {
    pub fn new(dni: impl Into<String>) -> Self {
        Self {
            dni: dni.into(),
            president_id: None,
            mayor_id: None,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn choice(&self, role: Role) -> Option<&str> {
        match role {
            Role::President => self.president_id.as_deref(),
            Role::Mayor => self.mayor_id.as_deref(),
        }
    }

    pub fn select(&mut self, role: Role, candidate_id: impl Into<String>) {
        let slot = match role {
            Role::President => &mut self.president_id,
            Role::Mayor => &mut self.mayor_id,
        };
        *slot = Some(candidate_id.into());
        self.updated_at = OffsetDateTime::now_utc();
    }

    pub fn to_vote(&self) -> Option<Vote> {
        match (&self.president_id, &self.mayor_id) {
            (Some(president_id), Some(mayor_id)) => Some(Vote {
                dni: self.dni.clone(),
                president_id: president_id.clone(),
                mayor_id: mayor_id.clone(),
                timestamp: now_rfc3339(),
            }),
            _ => None,
        }
    }
}

// Formatting only fails for years outside 0..=9999.
fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdminAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateForm {
    pub name: String,
    pub party: String,
    pub photo: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdminRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub access_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoterLogin {
    pub dni: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub role: Role,
    pub candidate_id: String,
}
