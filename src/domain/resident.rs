use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A household account. Owns devices, budgets and supplier contracts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resident {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    /// Inactive residents are blocked until an administrator activates them
    pub active: bool,
    pub registered_at: DateTime<Utc>,
}

/// Registration payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewResident {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 3, max = 20))]
    pub phone: String,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[validate(length(max = 20))]
    pub postal_code: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
}

/// Editable part of a resident's profile. The email is the login identity
/// and cannot be changed here.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 3, max = 20))]
    pub phone: String,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[validate(length(max = 20))]
    pub postal_code: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
}

impl Resident {
    pub fn apply(&mut self, update: ProfileUpdate) {
        self.name = update.name;
        self.phone = update.phone;
        self.address = update.address;
        self.postal_code = update.postal_code;
        self.city = update.city;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> NewResident {
        NewResident {
            name: "Ana Costa".to_string(),
            email: "ana@example.com".to_string(),
            phone: "912345678".to_string(),
            address: None,
            postal_code: Some("4000-001".to_string()),
            city: Some("Porto".to_string()),
        }
    }

    #[test]
    fn test_valid_registration() {
        assert!(registration().validate().is_ok());
    }

    #[test]
    fn test_registration_rejects_bad_email() {
        let mut r = registration();
        r.email = "not-an-email".to_string();
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_registration_rejects_empty_name() {
        let mut r = registration();
        r.name.clear();
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_profile_update_keeps_email() {
        let mut resident = Resident {
            id: 1,
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            phone: "912345678".to_string(),
            address: None,
            postal_code: None,
            city: None,
            active: true,
            registered_at: Utc::now(),
        };
        resident.apply(ProfileUpdate {
            name: "Ana Costa".to_string(),
            phone: "919999999".to_string(),
            address: Some("Rua A".to_string()),
            postal_code: None,
            city: Some("Braga".to_string()),
        });
        assert_eq!(resident.name, "Ana Costa");
        assert_eq!(resident.email, "ana@example.com");
        assert_eq!(resident.city.as_deref(), Some("Braga"));
    }
}
