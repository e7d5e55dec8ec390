use time::Date;

use super::{
    fields::{validate_birth_date, validate_email, validate_provider_id, Gender, INTERESTS},
    require, DenyList, ValidationError,
};
use crate::users::{dto::ProfileUpdate, repo_types::ProfileChanges};

/// Checks a full profile payload and returns the typed columns to persist.
pub fn validate_profile(
    p: &ProfileUpdate,
    deny: &DenyList,
    today: Date,
) -> Result<ProfileChanges, ValidationError> {
    validate_provider_id("id", &p.id)?;
    validate_email(&p.email)?;

    require("first_name", &p.first_name)?;
    deny.screen("first_name", &p.first_name)?;
    require("last_name", &p.last_name)?;
    deny.screen("last_name", &p.last_name)?;

    let birth_date = validate_birth_date(&p.birth_date, today)?;

    if p.gender.is_empty() {
        return Err(ValidationError::empty("gender"));
    }
    let gender = Gender::parse(&p.gender).ok_or_else(|| ValidationError::invalid("gender"))?;

    require("location", &p.location)?;
    deny.screen("location", &p.location)?;

    if p.interests.is_empty() {
        return Err(ValidationError::empty("interests"));
    }
    let mut interests: Vec<String> = Vec::with_capacity(p.interests.len());
    for interest in &p.interests {
        if !INTERESTS.contains(&interest.as_str()) {
            return Err(ValidationError::new(format!(
                "interest {interest:?} is not supported"
            )));
        }
        if !interests.contains(interest) {
            interests.push(interest.clone());
        }
    }

    Ok(ProfileChanges {
        first_name: p.first_name.trim().to_string(),
        last_name: p.last_name.trim().to_string(),
        birth_date,
        gender,
        location: p.location.trim().to_string(),
        interests,
    })
}
