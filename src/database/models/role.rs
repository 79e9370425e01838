use serde::{Deserialize, Serialize};

/// User role. The well-known roles drive authorization decisions; anything
/// else (e.g. `manager`, `bookkeeper`) is carried through untouched and has
/// no elevated privileges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    SuperAdmin,
    Admin,
    User,
    Custom(String),
}

impl Role {
    pub fn parse(s: &str) -> Self {
        match s {
            "super_admin" => Role::SuperAdmin,
            "admin" => Role::Admin,
            "user" => Role::User,
            other => Role::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::User => "user",
            Role::Custom(s) => s,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin)
    }

    /// Admin or above.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Role::parse(&s)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

// Stored as plain text in the users table.
impl sqlx::Type<sqlx::Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Role {
    fn decode(
        value: sqlx::postgres::PgValueRef<'r>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync + 'static>> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Role::parse(s))
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for Role {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> sqlx::encode::IsNull {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str().to_string(), buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_and_extended_roles() {
        assert_eq!(Role::parse("super_admin"), Role::SuperAdmin);
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("user"), Role::User);
        assert_eq!(
            Role::parse("bookkeeper"),
            Role::Custom("bookkeeper".to_string())
        );
    }

    #[test]
    fn extended_roles_have_no_privileges() {
        assert!(!Role::parse("manager").is_admin());
        assert!(!Role::parse("manager").is_super_admin());
        assert!(Role::Admin.is_admin());
        assert!(!Role::Admin.is_super_admin());
        assert!(Role::SuperAdmin.is_admin());
    }

    #[test]
    fn serde_round_trips_as_string() {
        let json = serde_json::to_string(&Role::SuperAdmin).unwrap();
        assert_eq!(json, "\"super_admin\"");
        let role: Role = serde_json::from_str("\"bookkeeper\"").unwrap();
        assert_eq!(role, Role::Custom("bookkeeper".to_string()));
    }
}
