//! Payload Validator
//!
//! Checks inbound JSON objects against per-endpoint field specs. Every
//! failing field is reported at once as `field -> [messages]`.
//! Unknown fields are ignored.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use kernel::id::CityId;
use serde_json::{Map, Value};

use crate::domain::value_object::email::{EMAIL_MAX_LENGTH, Email};

pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_NULL: &str = "This field may not be null.";
pub const MSG_BLANK: &str = "This field may not be blank.";
pub const MSG_NOT_STRING: &str = "Not a valid string.";
pub const MSG_BAD_EMAIL: &str = "Enter a valid email address.";
pub const MSG_BAD_BOOL: &str = "Must be a valid boolean.";
pub const MSG_BAD_INT: &str = "A valid integer is required.";
pub const MSG_BAD_DATE: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";
pub const MSG_EMAIL_TAKEN: &str = "my user with this email already exists.";
const MSG_NO_DATA: &str = "No data provided";
const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Login reports missing fields as a bare string, without a trailing dot
const MSG_LOGIN_REQUIRED: &str = "This field is required";

const NAME_MAX_LENGTH: usize = 30;
const PHONE_MAX_LENGTH: usize = 14;
const INFO_MAX_LENGTH: usize = 300;
const PASSWORD_MAX_LENGTH: usize = 100;

pub fn msg_max_length(max: usize) -> String {
    format!("Ensure this field has no more than {max} characters.")
}

pub fn msg_unknown_city(id: i64) -> String {
    format!("Invalid pk \"{id}\" - object does not exist.")
}

// ============================================================================
// Field specs
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Email,
    Boolean,
    Integer,
    /// `YYYY-MM-DD`
    Date,
}

/// Value used when an optional field is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    EmptyText,
    Null,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub nullable: bool,
    pub allow_blank: bool,
    pub max_length: Option<usize>,
    pub default: Option<FieldDefault>,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            nullable: false,
            allow_blank: false,
            max_length: None,
            default: None,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind)
        }
    }

    pub const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }

    pub const fn allow_blank(self) -> Self {
        Self {
            allow_blank: true,
            ..self
        }
    }

    pub const fn max_length(self, max: usize) -> Self {
        Self {
            max_length: Some(max),
            ..self
        }
    }

    pub const fn default_to(self, default: FieldDefault) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }
}

use FieldKind::{Boolean, Date, Integer, Text};

pub const CREATE_USER_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("first_name", Text).max_length(NAME_MAX_LENGTH),
    FieldSpec::required("last_name", Text).max_length(NAME_MAX_LENGTH),
    FieldSpec::required("email", FieldKind::Email).max_length(EMAIL_MAX_LENGTH),
    FieldSpec::required("is_admin", Boolean),
    FieldSpec::required("password", Text).max_length(PASSWORD_MAX_LENGTH),
    FieldSpec::optional("other_name", Text)
        .allow_blank()
        .max_length(NAME_MAX_LENGTH)
        .default_to(FieldDefault::EmptyText),
    FieldSpec::optional("phone", Text)
        .allow_blank()
        .max_length(PHONE_MAX_LENGTH)
        .default_to(FieldDefault::EmptyText),
    FieldSpec::optional("birthday", Date)
        .nullable()
        .default_to(FieldDefault::Null),
    FieldSpec::optional("city", Integer)
        .nullable()
        .default_to(FieldDefault::Null),
    FieldSpec::optional("additional_info", Text)
        .allow_blank()
        .max_length(INFO_MAX_LENGTH)
        .default_to(FieldDefault::EmptyText),
];

pub const SELF_UPDATE_FIELDS: &[FieldSpec] = &[
    FieldSpec::optional("first_name", Text).max_length(NAME_MAX_LENGTH),
    FieldSpec::optional("last_name", Text).max_length(NAME_MAX_LENGTH),
    FieldSpec::optional("other_name", Text).max_length(NAME_MAX_LENGTH),
    FieldSpec::optional("phone", Text).max_length(PHONE_MAX_LENGTH),
    FieldSpec::optional("email", FieldKind::Email).max_length(EMAIL_MAX_LENGTH),
];

/// Supplied fields must carry a value; blank text and null are rejected
pub const ADMIN_UPDATE_FIELDS: &[FieldSpec] = &[
    FieldSpec::optional("first_name", Text).max_length(NAME_MAX_LENGTH),
    FieldSpec::optional("last_name", Text).max_length(NAME_MAX_LENGTH),
    FieldSpec::optional("other_name", Text).max_length(NAME_MAX_LENGTH),
    FieldSpec::optional("phone", Text).max_length(PHONE_MAX_LENGTH),
    FieldSpec::optional("email", FieldKind::Email).max_length(EMAIL_MAX_LENGTH),
    FieldSpec::optional("is_admin", Boolean),
    FieldSpec::optional("birthday", Date),
    FieldSpec::optional("city", Integer),
    FieldSpec::optional("additional_info", Text).max_length(INFO_MAX_LENGTH),
    FieldSpec::optional("password", Text).max_length(PASSWORD_MAX_LENGTH),
];

// ============================================================================
// Results
// ============================================================================

/// Field name to list of messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn to_value(&self) -> Value {
        let map = self
            .0
            .iter()
            .map(|(field, messages)| (field.clone(), Value::from(messages.clone())))
            .collect::<Map<_, _>>();
        Value::Object(map)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Email(Email),
    Bool(bool),
    Int(i64),
    Date(NaiveDate),
    Null,
}

/// Fields that passed validation, keyed by name
#[derive(Debug, Default)]
pub struct ValidatedFields(BTreeMap<&'static str, FieldValue>);

impl ValidatedFields {
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    fn take(&mut self, name: &str) -> Option<FieldValue> {
        self.0.remove(name)
    }

    pub fn take_text(&mut self, name: &str) -> Option<String> {
        match self.take(name)? {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn take_email(&mut self, name: &str) -> Option<Email> {
        match self.take(name)? {
            FieldValue::Email(e) => Some(e),
            _ => None,
        }
    }

    pub fn take_bool(&mut self, name: &str) -> Option<bool> {
        match self.take(name)? {
            FieldValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// `Some(None)` when the field was explicitly null
    pub fn take_date(&mut self, name: &str) -> Option<Option<NaiveDate>> {
        match self.take(name)? {
            FieldValue::Date(d) => Some(Some(d)),
            FieldValue::Null => Some(None),
            _ => None,
        }
    }

    /// `Some(None)` when the field was explicitly null
    pub fn take_int(&mut self, name: &str) -> Option<Option<i64>> {
        match self.take(name)? {
            FieldValue::Int(i) => Some(Some(i)),
            FieldValue::Null => Some(None),
            _ => None,
        }
    }
}

// ============================================================================
// Core validation
// ============================================================================

pub fn msg_not_object(datatype: &str) -> String {
    format!("Invalid data. Expected a dictionary, but got {datatype}.")
}

/// Why a request body is not a usable JSON object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyError {
    /// Not JSON at all
    Malformed,
    /// Valid JSON of another type, reported under `non_field_errors`
    NotObject(FieldErrors),
}

/// Parse a request body as a JSON object
pub fn parse_object(body: &[u8]) -> Result<Map<String, Value>, BodyError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| BodyError::Malformed)?;

    let message = match value {
        Value::Object(map) => return Ok(map),
        Value::Null => MSG_NO_DATA.to_string(),
        Value::Array(_) => msg_not_object("list"),
        Value::String(_) => msg_not_object("str"),
        Value::Bool(_) => msg_not_object("bool"),
        Value::Number(n) if n.is_f64() => msg_not_object("float"),
        Value::Number(_) => msg_not_object("int"),
    };

    let mut errors = FieldErrors::default();
    errors.push(NON_FIELD_ERRORS, message);
    Err(BodyError::NotObject(errors))
}

/// Validate `payload` against `specs`
pub fn validate(
    payload: &Map<String, Value>,
    specs: &[FieldSpec],
) -> Result<ValidatedFields, FieldErrors> {
    let mut fields = ValidatedFields::default();
    let mut errors = FieldErrors::default();

    for spec in specs {
        match payload.get(spec.name) {
            None => {
                if spec.required {
                    errors.push(spec.name, MSG_REQUIRED);
                } else if let Some(default) = spec.default {
                    let value = match default {
                        FieldDefault::EmptyText => FieldValue::Text(String::new()),
                        FieldDefault::Null => FieldValue::Null,
                    };
                    fields.0.insert(spec.name, value);
                }
            }
            Some(Value::Null) => {
                if spec.nullable {
                    fields.0.insert(spec.name, FieldValue::Null);
                } else {
                    errors.push(spec.name, MSG_NULL);
                }
            }
            Some(raw) => match coerce(spec, raw) {
                Ok(value) => {
                    fields.0.insert(spec.name, value);
                }
                Err(messages) => {
                    for message in messages {
                        errors.push(spec.name, message);
                    }
                }
            },
        }
    }

    if errors.is_empty() {
        Ok(fields)
    } else {
        Err(errors)
    }
}

fn coerce(spec: &FieldSpec, raw: &Value) -> Result<FieldValue, Vec<String>> {
    match spec.kind {
        FieldKind::Text => coerce_text(spec, raw).map(FieldValue::Text),
        FieldKind::Email => {
            let text = coerce_text(spec, raw)?;
            Email::new(text)
                .map(FieldValue::Email)
                .map_err(|_| vec![MSG_BAD_EMAIL.to_string()])
        }
        FieldKind::Boolean => coerce_bool(raw)
            .map(FieldValue::Bool)
            .ok_or_else(|| vec![MSG_BAD_BOOL.to_string()]),
        FieldKind::Integer => coerce_int(raw)
            .map(FieldValue::Int)
            .ok_or_else(|| vec![MSG_BAD_INT.to_string()]),
        FieldKind::Date => raw
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
            .map(FieldValue::Date)
            .ok_or_else(|| vec![MSG_BAD_DATE.to_string()]),
    }
}

/// Strings are trimmed; numbers are accepted in their JSON spelling
fn coerce_text(spec: &FieldSpec, raw: &Value) -> Result<String, Vec<String>> {
    let text = match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return Err(vec![MSG_NOT_STRING.to_string()]),
    };

    if text.is_empty() && !spec.allow_blank {
        return Err(vec![MSG_BLANK.to_string()]);
    }

    if let Some(max) = spec.max_length {
        if text.chars().count() > max {
            return Err(vec![msg_max_length(max)]);
        }
    }

    Ok(text)
}

fn coerce_bool(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
            "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_int(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ============================================================================
// Endpoint inputs
// ============================================================================

/// Login credentials as submitted
///
/// A non-string value can never match a stored email or password, so it is
/// carried as `None` and fails at the lookup or the password check.
#[derive(Debug)]
pub struct LoginCredentials {
    pub login: Option<String>,
    pub password: Option<String>,
}

/// Login only checks presence; missing fields map to a bare message string
pub fn validate_login(payload: &Map<String, Value>) -> Result<LoginCredentials, Value> {
    let mut missing = Map::new();
    for field in ["login", "password"] {
        if !payload.contains_key(field) {
            missing.insert(field.to_string(), Value::from(MSG_LOGIN_REQUIRED));
        }
    }

    if !missing.is_empty() {
        return Err(Value::Object(missing));
    }

    let as_string = |field: &str| payload.get(field).and_then(Value::as_str).map(str::to_string);

    Ok(LoginCredentials {
        login: as_string("login"),
        password: as_string("password"),
    })
}

/// Admin-Create input; absent optionals already defaulted
#[derive(Debug)]
pub struct CreateUserInput {
    pub first_name: String,
    pub last_name: String,
    pub other_name: String,
    pub email: Email,
    pub password: String,
    pub phone: String,
    pub birthday: Option<NaiveDate>,
    pub is_admin: bool,
    pub city: Option<CityId>,
    pub additional_info: String,
}

/// Partial update input; `None` means "not supplied"
#[derive(Debug, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub other_name: Option<String>,
    pub email: Option<Email>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub birthday: Option<Option<NaiveDate>>,
    pub is_admin: Option<bool>,
    pub city: Option<Option<CityId>>,
    pub additional_info: Option<String>,
}

pub fn validate_create(payload: &Map<String, Value>) -> Result<CreateUserInput, FieldErrors> {
    let mut fields = validate(payload, CREATE_USER_FIELDS)?;

    // Every field below is present after a successful validation pass
    let mut text = |name: &str| fields.take_text(name).unwrap_or_default();
    let first_name = text("first_name");
    let last_name = text("last_name");
    let other_name = text("other_name");
    let password = text("password");
    let phone = text("phone");
    let additional_info = text("additional_info");

    let Some(email) = fields.take_email("email") else {
        let mut errors = FieldErrors::default();
        errors.push("email", MSG_REQUIRED);
        return Err(errors);
    };

    Ok(CreateUserInput {
        first_name,
        last_name,
        other_name,
        email,
        password,
        phone,
        birthday: fields.take_date("birthday").flatten(),
        is_admin: fields.take_bool("is_admin").unwrap_or(false),
        city: fields.take_int("city").flatten().map(CityId::new),
        additional_info,
    })
}

pub fn validate_self_update(payload: &Map<String, Value>) -> Result<UserChanges, FieldErrors> {
    validate(payload, SELF_UPDATE_FIELDS).map(into_changes)
}

pub fn validate_admin_update(payload: &Map<String, Value>) -> Result<UserChanges, FieldErrors> {
    validate(payload, ADMIN_UPDATE_FIELDS).map(into_changes)
}

fn into_changes(mut fields: ValidatedFields) -> UserChanges {
    UserChanges {
        first_name: fields.take_text("first_name"),
        last_name: fields.take_text("last_name"),
        other_name: fields.take_text("other_name"),
        email: fields.take_email("email"),
        password: fields.take_text("password"),
        phone: fields.take_text("phone"),
        birthday: fields.take_date("birthday"),
        is_admin: fields.take_bool("is_admin"),
        city: fields
            .take_int("city")
            .map(|city| city.map(CityId::new)),
        additional_info: fields.take_text("additional_info"),
    }
}
