use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepartmentId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TravelAgencyId(pub String);

/// Directory roles that matter to request assignment and authorization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Employee,
    Approver,
    AccountingOfficer,
    AgencyAgent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Approver => "approver",
            Self::AccountingOfficer => "accounting_officer",
            Self::AgencyAgent => "agency_agent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "employee" => Some(Self::Employee),
            "approver" => Some(Self::Approver),
            "accounting_officer" => Some(Self::AccountingOfficer),
            "agency_agent" => Some(Self::AgencyAgent),
            _ => None,
        }
    }
}

/// Minimal addressable identity used for notification recipients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// A user row as the identity directory sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department_id: Option<DepartmentId>,
    pub travel_agency_id: Option<TravelAgencyId>,
}

impl DirectoryUser {
    pub fn contact(&self) -> Contact {
        Contact { id: self.id.clone(), name: self.name.clone(), email: self.email.clone() }
    }
}

/// The acting identity every lifecycle operation is invoked with.
///
/// Department and agency affiliation come from the identity context, not from
/// the request being acted on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub department_id: Option<DepartmentId>,
    pub travel_agency_id: Option<TravelAgencyId>,
}

impl Actor {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id, department_id: None, travel_agency_id: None }
    }

    pub fn in_department(user_id: UserId, department_id: DepartmentId) -> Self {
        Self { user_id, department_id: Some(department_id), travel_agency_id: None }
    }

    pub fn agency_member(user_id: UserId, travel_agency_id: TravelAgencyId) -> Self {
        Self { user_id, department_id: None, travel_agency_id: Some(travel_agency_id) }
    }
}

#[cfg(test)]
mod tests {
    use super::{DirectoryUser, Role, UserId};

    #[test]
    fn role_literals_round_trip() {
        for role in
            [Role::Employee, Role::Approver, Role::AccountingOfficer, Role::AgencyAgent]
        {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("auditor"), None);
    }

    #[test]
    fn contact_carries_directory_identity() {
        let user = DirectoryUser {
            id: UserId("u-1".to_string()),
            name: "Ana Flores".to_string(),
            email: "ana@example.com".to_string(),
            role: Role::Approver,
            department_id: None,
            travel_agency_id: None,
        };

        let contact = user.contact();
        assert_eq!(contact.id, user.id);
        assert_eq!(contact.email, "ana@example.com");
    }
}
