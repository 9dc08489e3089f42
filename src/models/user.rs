use serde::{Deserialize, Serialize};

pub const ROLE_ADMIN: &str = "Admin";
pub const ROLE_DRIVER: &str = "Driver";
pub const PASSENGER_ROLES: [&str; 2] = ["Rider", "Passenger"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserRecord {
    pub id: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loyalty_points: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
}

impl UserRecord {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn is_passenger(&self) -> bool {
        PASSENGER_ROLES
            .iter()
            .any(|role| self.role.eq_ignore_ascii_case(role))
    }

    pub fn display_name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.name.as_deref())
            .filter(|name| !name.is_empty())
            .unwrap_or("Unknown")
    }

    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        if term.is_empty() {
            return true;
        }

        let contains = |field: Option<&str>| {
            field
                .map(|value| value.to_lowercase().contains(&term))
                .unwrap_or(false)
        };

        contains(self.display_name.as_deref().or(self.name.as_deref()))
            || contains(self.email.as_deref())
            || contains(self.phone.as_deref())
    }
}
