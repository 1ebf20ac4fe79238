use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

/// Shape-checked input for user creation.
#[derive(Debug, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Shape-checked input for user update; both fields are required on every
/// update, there is no partial-update form.
#[derive(Debug, PartialEq, Eq)]
pub struct UserChanges {
    pub name: String,
    pub email: String,
}

/// Shape-checked login credentials.
#[derive(Debug, PartialEq, Eq)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

fn string_field<'a>(data: &'a Value, key: &str) -> Option<&'a str> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Validate a creation record. Rules run name -> email -> password and stop
/// on the first violation, returning its message.
pub fn validate_create(data: &Value) -> Result<NewUser, &'static str> {
    if !data.is_object() {
        return Err("Invalid JSON data");
    }

    let name =
        string_field(data, "name").ok_or("Name is required and must be a non-empty string")?;
    if name.chars().count() > 100 {
        return Err("Name must be less than 100 characters");
    }

    let email = string_field(data, "email").ok_or("Email is required and must be a string")?;
    if !is_valid_email(email) {
        return Err("Email must be a valid email address");
    }

    let password =
        string_field(data, "password").ok_or("Password is required and must be a string")?;
    let password_len = password.chars().count();
    if password_len < 6 {
        return Err("Password must be at least 6 characters long");
    }
    if password_len > 128 {
        return Err("Password must be less than 128 characters");
    }

    Ok(NewUser {
        name: name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
    })
}

/// Validate an update record. Same name/email rules as creation; password
/// is not part of update.
pub fn validate_update(data: &Value) -> Result<UserChanges, &'static str> {
    if !data.is_object() {
        return Err("Invalid JSON data");
    }

    let name =
        string_field(data, "name").ok_or("Name is required and must be a non-empty string")?;
    if name.chars().count() > 100 {
        return Err("Name must be less than 100 characters");
    }

    let email = string_field(data, "email").ok_or("Email is required and must be a string")?;
    if !is_valid_email(email) {
        return Err("Email must be a valid email address");
    }

    Ok(UserChanges {
        name: name.to_string(),
        email: email.to_string(),
    })
}

/// Validate a login record. Password only has to be present; no length
/// bound is enforced here.
pub fn validate_login(data: &Value) -> Result<LoginInput, &'static str> {
    if !data.is_object() {
        return Err("Invalid JSON data");
    }

    let email = string_field(data, "email").ok_or("Email is required")?;
    if !is_valid_email(email) {
        return Err("Email must be a valid email address");
    }

    let password = string_field(data, "password").ok_or("Password is required")?;

    Ok(LoginInput {
        email: email.to_string(),
        password: password.to_string(),
    })
}

/// Syntactic email check only: `local@domain.tld` with a 2+ letter top-level
/// segment and at most 254 characters total. No DNS/MX verification.
pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    }
    email.chars().count() <= 254 && EMAIL_RE.is_match(email)
}
