use std::fmt;

use serde::{Deserialize, Serialize};

/// Role an actor holds in the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorRole {
    #[default]
    Taxpayer,
    TaxOfficer,
    Admin,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Taxpayer => "TAXPAYER",
            Self::TaxOfficer => "TAX_OFFICER",
            Self::Admin => "ADMIN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TAXPAYER" => Some(Self::Taxpayer),
            "TAX_OFFICER" => Some(Self::TaxOfficer),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The caller on whose behalf a workflow operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(
        user_id: impl Into<String>,
        role: ActorRole,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}
