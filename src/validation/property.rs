use super::{
    bounded,
    fields::{validate_provider_id, validate_uuid},
    require, DenyList, ValidationError,
};
use crate::properties::{
    dto::{Address, PropertyPayload},
    repo_types::NewProperty,
};

const MAX_SQUARE_FEET: i64 = 999_999_999;
const MAX_COST_DOLLARS: i64 = 999_999_999_999;
const MAX_ROOM_COUNT: i64 = 32_767;

pub fn validate_property(
    id: &str,
    lister_id: &str,
    p: &PropertyPayload,
    deny: &DenyList,
) -> Result<NewProperty, ValidationError> {
    let id = validate_uuid("id", id)?;
    validate_provider_id("lister_id", lister_id)?;

    require("name", &p.name)?;
    require("address1", &p.address.address1)?;
    require("city", &p.address.city)?;
    require("state", &p.address.state)?;
    require("zipcode", &p.address.zipcode)?;
    require("country", &p.address.country)?;

    for (field, text) in [
        ("name", &p.name),
        ("description", &p.description),
        ("address1", &p.address.address1),
        ("address2", &p.address.address2),
        ("city", &p.address.city),
        ("state", &p.address.state),
        ("zipcode", &p.address.zipcode),
        ("country", &p.address.country),
        ("misc_note", &p.misc_note),
    ] {
        deny.screen(field, text)?;
    }

    Ok(NewProperty {
        id,
        lister_id: lister_id.to_string(),
        name: p.name.trim().to_string(),
        description: p.description.trim().to_string(),
        address: p.address.clone(),
        address_key: address_key(&p.address),
        square_feet: bounded("square_feet", p.square_feet, 1, MAX_SQUARE_FEET)?,
        bedrooms: bounded("bedrooms", p.bedrooms, 0, MAX_ROOM_COUNT)?,
        toilets: bounded("toilets", p.toilets, 0, MAX_ROOM_COUNT)?,
        showers: bounded("showers", p.showers, 0, MAX_ROOM_COUNT)?,
        cost_dollars: bounded("cost_dollars", p.cost_dollars, 1, MAX_COST_DOLLARS)?,
        cost_cents: bounded("cost_cents", p.cost_cents, 0, 99)?,
        misc_note: p.misc_note.trim().to_string(),
    })
}

/// Canonical form of an address used for duplicate detection: every part
/// lowercased with runs of whitespace collapsed to a single space.
pub fn address_key(a: &Address) -> String {
    [
        &a.address1,
        &a.address2,
        &a.city,
        &a.state,
        &a.zipcode,
        &a.country,
    ]
    .iter()
    .map(|part| {
        part.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    })
    .collect::<Vec<_>>()
    .join("|")
}
