use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::errors::StoreError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CustomerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Field set accepted by `create`; id and timestamps are assigned by the store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

/// Partial update. `photo` distinguishes "leave as is" (`None`) from
/// "remove" (`Some(None)`); on the wire that is an absent key versus `null`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub photo: Option<Option<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAck {
    pub success: bool,
    pub id: CustomerId,
}

impl DeleteAck {
    pub fn new(id: CustomerId) -> Self {
        Self { success: true, id }
    }
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn require_text(field: &str, value: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::Validation(format!("{field} is required")));
    }
    Ok(())
}

impl NewCustomer {
    pub fn validate(&self) -> Result<(), StoreError> {
        require_text("firstName", &self.first_name)?;
        require_text("lastName", &self.last_name)?;
        require_text("email", &self.email)?;
        require_text("phone", &self.phone)?;
        require_text("address", &self.address)?;
        Ok(())
    }

    pub fn into_customer(self, id: CustomerId, created_at: DateTime<Utc>) -> Customer {
        Customer {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            photo: self.photo,
            created_at,
            updated_at: None,
        }
    }
}

impl CustomerPatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.photo.is_none()
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        let fields = [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("address", &self.address),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                require_text(field, value)?;
            }
        }
        Ok(())
    }

    /// Replaces every full field set, as a form submit in edit mode does.
    pub fn replace_all(fields: NewCustomer) -> Self {
        Self {
            first_name: Some(fields.first_name),
            last_name: Some(fields.last_name),
            email: Some(fields.email),
            phone: Some(fields.phone),
            address: Some(fields.address),
            photo: Some(fields.photo),
        }
    }
}

impl Customer {
    /// Applies `patch` in place and stamps `updated_at`. `id` and `created_at`
    /// are never touched.
    pub fn apply_patch(&mut self, patch: CustomerPatch, updated_at: DateTime<Utc>) {
        if let Some(first_name) = patch.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            self.last_name = last_name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(phone) = patch.phone {
            self.phone = phone;
        }
        if let Some(address) = patch.address {
            self.address = address;
        }
        if let Some(photo) = patch.photo {
            self.photo = photo;
        }
        self.updated_at = Some(updated_at);
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn fields(&self) -> NewCustomer {
        NewCustomer {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            photo: self.photo.clone(),
        }
    }

    /// Case-insensitive substring match on first name, last name or email.
    pub fn matches_term(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        [&self.first_name, &self.last_name, &self.email]
            .into_iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Keeps the records matching `term`, in their original order.
pub fn filter_by_term(customers: Vec<Customer>, term: &str) -> Vec<Customer> {
    customers.into_iter().filter(|customer| customer.matches_term(term)).collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{filter_by_term, Customer, CustomerId, CustomerPatch, NewCustomer};
    use crate::errors::StoreError;

    fn juan() -> Customer {
        NewCustomer {
            first_name: "Juan".to_string(),
            last_name: "García".to_string(),
            email: "juan@email.com".to_string(),
            phone: "+503 0000-0000".to_string(),
            address: "Calle Principal 123".to_string(),
            photo: None,
        }
        .into_customer(CustomerId::from("1700000000000"), Utc::now())
    }

    #[test]
    fn search_term_is_case_insensitive_and_unicode_aware() {
        let customer = juan();
        assert!(customer.matches_term("gar"));
        assert!(customer.matches_term("GARCÍA"));
        assert!(customer.matches_term("JUAN@"));
        assert!(!customer.matches_term("lopez"));
        assert!(customer.matches_term(""));
    }

    #[test]
    fn filter_preserves_original_order() {
        let mut ana = juan();
        ana.id = CustomerId::from("2");
        ana.first_name = "Ana".to_string();
        ana.last_name = "Garza".to_string();
        let mut luis = juan();
        luis.id = CustomerId::from("3");
        luis.first_name = "Luis".to_string();
        luis.last_name = "Perez".to_string();
        luis.email = "luis@x.com".to_string();

        let found = filter_by_term(vec![juan(), luis, ana], "gar");
        let ids: Vec<&str> = found.iter().map(|customer| customer.id.as_str()).collect();
        assert_eq!(ids, vec!["1700000000000", "2"]);
    }

    #[test]
    fn patch_preserves_unmentioned_fields() {
        let mut customer = juan();
        let created_at = customer.created_at;
        customer.photo = Some("data:image/png;base64,AAAA".to_string());

        customer.apply_patch(
            CustomerPatch { phone: Some("555".to_string()), ..CustomerPatch::default() },
            Utc::now(),
        );

        assert_eq!(customer.phone, "555");
        assert_eq!(customer.first_name, "Juan");
        assert_eq!(customer.photo.as_deref(), Some("data:image/png;base64,AAAA"));
        assert_eq!(customer.created_at, created_at);
        assert!(customer.updated_at.is_some());
    }

    #[test]
    fn patch_photo_null_clears_and_absent_keeps() {
        let clear: CustomerPatch = serde_json::from_str(r#"{"photo":null}"#).expect("parse");
        assert_eq!(clear.photo, Some(None));

        let keep: CustomerPatch = serde_json::from_str(r#"{"email":"a@b.c"}"#).expect("parse");
        assert_eq!(keep.photo, None);
        assert!(!keep.is_empty());

        let mut customer = juan();
        customer.photo = Some("data:image/png;base64,AAAA".to_string());
        customer.apply_patch(clear, Utc::now());
        assert_eq!(customer.photo, None);
    }

    #[test]
    fn validation_rejects_blank_required_fields() {
        let mut fields = juan().fields();
        fields.email = "   ".to_string();
        assert!(matches!(fields.validate(), Err(StoreError::Validation(ref m)) if m.contains("email")));

        let patch = CustomerPatch { last_name: Some(String::new()), ..CustomerPatch::default() };
        assert!(matches!(patch.validate(), Err(StoreError::Validation(_))));
        assert!(CustomerPatch::default().validate().is_ok());
    }

    #[test]
    fn json_shape_uses_camel_case_and_omits_unset_timestamps() {
        let value = serde_json::to_value(juan()).expect("serialize");
        assert_eq!(value["firstName"], "Juan");
        assert_eq!(value["id"], "1700000000000");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_none());
        assert!(value.get("photo").is_none());
    }
}
