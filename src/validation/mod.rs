//! Pure, side-effect free checks run on every payload before it reaches
//! authorization or storage.

mod community;
mod deny_list;
mod fields;
mod property;
mod user;

pub use community::{check_admin_membership, validate_community};
pub use deny_list::DenyList;
pub use fields::{format_date, validate_email, validate_provider_id, validate_uuid, Gender};
pub use property::validate_property;
pub use user::validate_profile;

/// Rejection carrying a human readable reason, surfaced to clients as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct ValidationError {
    pub reason: String,
}

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub(crate) fn empty(field: &str) -> Self {
        Self::new(format!("{field} is empty"))
    }

    pub(crate) fn invalid(field: &str) -> Self {
        Self::new(format!("{field} is invalid"))
    }
}

pub(crate) fn require(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::empty(field));
    }
    Ok(())
}

/// Range check that also narrows the value to its storage type.
pub(crate) fn bounded<T: TryFrom<i64>>(
    field: &str,
    value: i64,
    min: i64,
    max: i64,
) -> Result<T, ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::new(format!(
            "{field} must be between {min} and {max}"
        )));
    }
    T::try_from(value).map_err(|_| ValidationError::invalid(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_rejects_blank() {
        assert_eq!(require("city", "  ").unwrap_err().reason, "city is empty");
        assert!(require("city", "Oslo").is_ok());
    }

    #[test]
    fn bounded_checks_and_narrows() {
        let v: i16 = bounded("bedrooms", 3, 0, 32_767).unwrap();
        assert_eq!(v, 3);
        assert!(bounded::<i16>("bedrooms", 32_768, 0, 32_767).is_err());
        assert!(bounded::<i16>("bedrooms", -1, 0, 32_767).is_err());
        let err = bounded::<i32>("square_feet", 0, 1, 999_999_999).unwrap_err();
        assert_eq!(err.reason, "square_feet must be between 1 and 999999999");
    }
}
