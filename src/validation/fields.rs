use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::{format_description::FormatItem, macros::format_description, Date};
use uuid::Uuid;

use super::ValidationError;

pub const MINIMUM_AGE: i32 = 18;

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Interests a profile may list.
pub const INTERESTS: &[&str] = &[
    "Reading",
    "Cooking",
    "Gardening",
    "Hiking",
    "Music",
    "Sports",
    "Travel",
    "Gaming",
    "Art",
    "Photography",
    "Fitness",
    "Movies",
    "Pets",
    "Technology",
    "Volunteering",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Man,
    Woman,
    #[serde(rename = "Non-binary")]
    NonBinary,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Man => "Man",
            Gender::Woman => "Woman",
            Gender::NonBinary => "Non-binary",
            Gender::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Man" => Some(Gender::Man),
            "Woman" => Some(Gender::Woman),
            "Non-binary" => Some(Gender::NonBinary),
            "Other" => Some(Gender::Other),
            _ => None,
        }
    }
}

lazy_static! {
    // Dot-atom local part, hostname labels in the domain. Rules out IP
    // literals, quoted locals, empty labels and consecutive dots.
    static ref EMAIL_RE: Regex = Regex::new(
        r#"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)+$"#
    )
    .unwrap();
    static ref PROVIDER_ID_RE: Regex = Regex::new(r"^[0-9]{1,255}$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_RE.is_match(email)
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::empty("email"));
    }
    if !email.contains('@') {
        return Err(ValidationError::new("email is missing @"));
    }
    if !is_valid_email(email) {
        return Err(ValidationError::invalid("email"));
    }
    Ok(())
}

/// Subject ids handed out by the identity provider are numeric strings.
pub fn is_valid_provider_id(id: &str) -> bool {
    PROVIDER_ID_RE.is_match(id)
}

pub fn validate_provider_id(field: &str, id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::empty(field));
    }
    if !is_valid_provider_id(id) {
        return Err(ValidationError::invalid(field));
    }
    Ok(())
}

pub fn validate_uuid(field: &str, id: &str) -> Result<Uuid, ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::empty(field));
    }
    Uuid::parse_str(id).map_err(|_| ValidationError::invalid(field))
}

pub fn parse_birth_date(s: &str) -> Result<Date, ValidationError> {
    if s.is_empty() {
        return Err(ValidationError::empty("birth_date"));
    }
    Date::parse(s, DATE_FORMAT)
        .map_err(|_| ValidationError::new("birth_date must be formatted as YYYY-MM-DD"))
}

pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT).unwrap_or_default()
}

/// Whole years between `birth` and `today`, counting a birthday as passed
/// once today's day-of-year reaches the birth day-of-year.
pub fn age_on(birth: Date, today: Date) -> i32 {
    let mut age = today.year() - birth.year();
    if today.ordinal() < birth.ordinal() {
        age -= 1;
    }
    age
}

pub fn validate_birth_date(s: &str, today: Date) -> Result<Date, ValidationError> {
    let birth = parse_birth_date(s)?;
    if age_on(birth, today) < MINIMUM_AGE {
        return Err(ValidationError::new(format!(
            "must be at least {MINIMUM_AGE} years old"
        )));
    }
    Ok(birth)
}
