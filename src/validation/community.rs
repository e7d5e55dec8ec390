use super::{
    fields::{validate_provider_id, validate_uuid},
    require, DenyList, ValidationError,
};
use crate::communities::{dto::CommunityPayload, repo_types::NewCommunity};

/// Checks the community's own fields. Membership is checked separately by
/// [`check_admin_membership`] once the full member list is known.
pub fn validate_community(
    id: &str,
    p: &CommunityPayload,
    deny: &DenyList,
) -> Result<NewCommunity, ValidationError> {
    let id = validate_uuid("id", id)?;
    validate_provider_id("admin_id", &p.admin_id)?;
    require("name", &p.name)?;
    deny.screen("name", &p.name)?;
    deny.screen("description", &p.description)?;

    let mut members: Vec<String> = Vec::with_capacity(p.user_ids.len());
    for user_id in &p.user_ids {
        validate_provider_id("user_ids", user_id)?;
        if !members.contains(user_id) {
            members.push(user_id.clone());
        }
    }

    let mut property_ids = Vec::with_capacity(p.property_ids.len());
    for property_id in &p.property_ids {
        if !property_ids.contains(property_id) {
            property_ids.push(*property_id);
        }
    }

    Ok(NewCommunity {
        id,
        admin_id: p.admin_id.clone(),
        name: p.name.trim().to_string(),
        description: p.description.trim().to_string(),
        members,
        property_ids,
    })
}

/// The admin of a community must always be one of its members.
pub fn check_admin_membership(admin_id: &str, members: &[String]) -> Result<(), ValidationError> {
    if members.iter().any(|m| m == admin_id) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "community admin must be a member of the community",
        ))
    }
}
