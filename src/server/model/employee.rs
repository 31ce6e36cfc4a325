use std::str::FromStr;
use derive_more::Display;
use serde::Serialize;

/// Role of an employee at the register. Gates privileged payment types.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum Role {
    Manager,
    Cashier,
}

impl Role {
    /// Only managers may open credit card payments.
    pub fn can_authorize_credit_card(self) -> bool {
        matches!(self, Role::Manager)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Manager" => Ok(Self::Manager),
            "Cashier" => Ok(Self::Cashier),
            s => Err(format!("Invalid role: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Employee {
    pub registration_number: i32,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}
