use clientela_core::domain::customer::{Customer, CustomerPatch, NewCustomer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormField {
    FirstName,
    LastName,
    Email,
    Phone,
    Address,
}

impl FormField {
    pub const ALL: [FormField; 5] =
        [Self::FirstName, Self::LastName, Self::Email, Self::Phone, Self::Address];

    pub fn label(self) -> &'static str {
        match self {
            Self::FirstName => "First name",
            Self::LastName => "Last name",
            Self::Email => "Email",
            Self::Phone => "Phone",
            Self::Address => "Address",
        }
    }
}

/// Unsaved input of the form view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CustomerForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub photo: Option<String>,
}

impl CustomerForm {
    pub fn from_customer(customer: &Customer) -> Self {
        let fields = customer.fields();
        Self {
            first_name: fields.first_name,
            last_name: fields.last_name,
            email: fields.email,
            phone: fields.phone,
            address: fields.address,
            photo: fields.photo,
        }
    }

    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::FirstName => &self.first_name,
            FormField::LastName => &self.last_name,
            FormField::Email => &self.email,
            FormField::Phone => &self.phone,
            FormField::Address => &self.address,
        }
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let slot = match field {
            FormField::FirstName => &mut self.first_name,
            FormField::LastName => &mut self.last_name,
            FormField::Email => &mut self.email,
            FormField::Phone => &mut self.phone,
            FormField::Address => &mut self.address,
        };
        *slot = value.into();
    }

    pub fn is_complete(&self) -> bool {
        FormField::ALL.iter().all(|field| !self.get(*field).trim().is_empty())
    }

    pub fn to_new_customer(&self) -> NewCustomer {
        NewCustomer {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            photo: self.photo.clone(),
        }
    }

    /// Edit submits send the whole field set, photo included, so a removed
    /// photo is cleared on the stored record.
    pub fn to_patch(&self) -> CustomerPatch {
        CustomerPatch::replace_all(self.to_new_customer())
    }
}
