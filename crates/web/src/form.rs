//! Form decoding and validation.
//!
//! A [`FormSpec`] declares, once per form shape, which submitted keys map to
//! which fields of a record, how each raw value is coerced and which rules the
//! field must satisfy:
//!
//! ```
//! use snippetbox_web::form::{Field, FormSpec, MaxChars, NotBlank, PermittedValue};
//!
//! #[derive(Default)]
//! struct CreateForm {
//!     title: String,
//!     expires: i32,
//! }
//!
//! let spec = FormSpec::new()
//!     .field(Field::new("title", |f: &CreateForm| &f.title, |f: &mut CreateForm| &mut f.title)
//!         .rule(NotBlank)
//!         .rule(MaxChars(100)))
//!     .field(Field::new("expires", |f: &CreateForm| &f.expires, |f: &mut CreateForm| &mut f.expires)
//!         .rule(PermittedValue::new([1, 7, 365])));
//!
//! let form = spec.decode(&[("title".into(), " ".into()), ("expires".into(), "2".into())]).unwrap();
//! let errors = spec.validate(&form);
//! assert_eq!(errors.get("title"), Some("This field cannot be blank"));
//! assert_eq!(errors.get("expires"), Some("This field must equal 1, 7 or 365"));
//! ```
//!
//! Decoding only fails when a value cannot be coerced into its field type.
//! Validation never fails early: every rule of every field is evaluated.

use std::fmt::{Debug, Display};

use http::HeaderValue;
use mime::Mime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported content type: {content_type}")]
    UnsupportedContentType { content_type: String },

    #[error("malformed form body: {source}")]
    Malformed {
        #[from]
        source: serde_urlencoded::de::Error,
    },

    #[error("invalid value for field {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Coercion from a raw submitted value into a field type.
///
/// Only a missing key keeps the field's default. A submitted value, empty or
/// not, must coerce.
pub trait FormValue: Sized {
    fn from_form_value(raw: &str) -> Result<Self, String>;
}

impl FormValue for String {
    fn from_form_value(raw: &str) -> Result<Self, String> {
        Ok(raw.to_owned())
    }
}

macro_rules! numeric_form_value {
    ($($ty:ty),*) => {
        $(
            impl FormValue for $ty {
                fn from_form_value(raw: &str) -> Result<Self, String> {
                    let raw = raw.trim();
                    if raw.is_empty() {
                        return Err("an empty value is not a number".to_owned());
                    }
                    raw.parse::<$ty>().map_err(|e| format!("{raw:?} is not a number: {e}"))
                }
            }
        )*
    };
}

numeric_form_value!(i32, i64, u32, u64, usize);

impl FormValue for bool {
    fn from_form_value(raw: &str) -> Result<Self, String> {
        match raw.trim() {
            "true" | "on" | "1" => Ok(true),
            "" | "false" | "off" | "0" => Ok(false),
            other => Err(format!("{other:?} is not a boolean")),
        }
    }
}

/// A check a field value must pass; `Err` carries the message shown to the user.
pub trait Rule<V: ?Sized>: Send + Sync {
    fn check(&self, value: &V) -> Result<(), String>;
}

/// The value must contain something other than whitespace.
#[derive(Debug, Clone, Copy)]
pub struct NotBlank;

impl Rule<String> for NotBlank {
    fn check(&self, value: &String) -> Result<(), String> {
        if value.trim().is_empty() { Err("This field cannot be blank".to_owned()) } else { Ok(()) }
    }
}

/// At most `n` characters, counted as unicode scalar values.
#[derive(Debug, Clone, Copy)]
pub struct MaxChars(pub usize);

impl Rule<String> for MaxChars {
    fn check(&self, value: &String) -> Result<(), String> {
        if value.chars().count() > self.0 {
            Err(format!("This field cannot be more than {} characters long", self.0))
        } else {
            Ok(())
        }
    }
}

/// The value must be one of an allow-list.
#[derive(Debug, Clone)]
pub struct PermittedValue<V> {
    allowed: Vec<V>,
}

impl<V> PermittedValue<V> {
    pub fn new(allowed: impl IntoIterator<Item = V>) -> Self {
        Self { allowed: allowed.into_iter().collect() }
    }
}

impl<V> Rule<V> for PermittedValue<V>
where
    V: PartialEq + Display + Send + Sync,
{
    fn check(&self, value: &V) -> Result<(), String> {
        if self.allowed.contains(value) {
            return Ok(());
        }

        let mut listed = self.allowed.iter().map(ToString::to_string).collect::<Vec<_>>();
        let options = match listed.pop() {
            Some(last) if !listed.is_empty() => format!("{} or {last}", listed.join(", ")),
            Some(last) => last,
            None => String::new(),
        };
        Err(format!("This field must equal {options}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

/// Every rule failure of one record, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// The first message recorded for `field`.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.iter().find(|error| error.field == field).map(|error| error.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(ValidationError { field, message: message.into() });
    }
}

/// One declared field of a form: the submitted key, typed accessors into the
/// record and the rules its value must satisfy.
pub struct Field<T, V> {
    name: &'static str,
    get: fn(&T) -> &V,
    get_mut: fn(&mut T) -> &mut V,
    rules: Vec<Box<dyn Rule<V>>>,
}

impl<T, V> Field<T, V> {
    pub fn new(name: &'static str, get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> Self {
        Self { name, get, get_mut, rules: Vec::new() }
    }

    #[must_use]
    pub fn rule<R: Rule<V> + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }
}

trait ErasedField<T>: Send + Sync {
    fn name(&self) -> &'static str;
    fn decode(&self, record: &mut T, raw: &str) -> Result<(), String>;
    fn validate(&self, record: &T, errors: &mut ValidationErrors);
}

impl<T, V> ErasedField<T> for Field<T, V>
where
    V: FormValue,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn decode(&self, record: &mut T, raw: &str) -> Result<(), String> {
        *(self.get_mut)(record) = V::from_form_value(raw)?;
        Ok(())
    }

    fn validate(&self, record: &T, errors: &mut ValidationErrors) {
        let value = (self.get)(record);
        for rule in &self.rules {
            if let Err(message) = rule.check(value) {
                errors.add(self.name, message);
            }
        }
    }
}

/// The declaration of one form shape, see the module docs.
pub struct FormSpec<T> {
    fields: Vec<Box<dyn ErasedField<T>>>,
}

impl<T> Debug for FormSpec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.fields.iter().map(|field| field.name())).finish()
    }
}

impl<T> Default for FormSpec<T> {
    fn default() -> Self {
        Self { fields: Vec::new() }
    }
}

impl<T> FormSpec<T> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn field<V>(mut self, field: Field<T, V>) -> Self
    where
        T: 'static,
        V: FormValue + 'static,
    {
        self.fields.push(Box::new(field));
        self
    }

    /// Runs every rule of every field against `record`.
    pub fn validate(&self, record: &T) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        for field in &self.fields {
            field.validate(record, &mut errors);
        }
        errors
    }
}

impl<T: Default> FormSpec<T> {
    /// Builds a record from submitted key/value pairs.
    ///
    /// Undeclared keys are ignored, a missing key leaves the field at its
    /// default and the first occurrence of a repeated key wins.
    pub fn decode(&self, pairs: &[(String, String)]) -> Result<T, DecodeError> {
        let mut record = T::default();

        for field in &self.fields {
            let Some((_, raw)) = pairs.iter().find(|(key, _)| key == field.name()) else {
                continue;
            };
            field
                .decode(&mut record, raw)
                .map_err(|reason| DecodeError::InvalidValue { field: field.name(), reason })?;
        }

        Ok(record)
    }

    /// Decodes an `application/x-www-form-urlencoded` request body.
    ///
    /// A body without a declared content type is parsed as url-encoded.
    pub fn decode_body(&self, content_type: Option<&HeaderValue>, body: &[u8]) -> Result<T, DecodeError> {
        if let Some(value) = content_type {
            let unsupported = || DecodeError::UnsupportedContentType {
                content_type: String::from_utf8_lossy(value.as_bytes()).into_owned(),
            };
            let mime = value.to_str().ok().and_then(|s| s.parse::<Mime>().ok()).ok_or_else(unsupported)?;
            if mime.essence_str() != mime::APPLICATION_WWW_FORM_URLENCODED.essence_str() {
                return Err(unsupported());
            }
        }

        let pairs = serde_urlencoded::from_bytes::<Vec<(String, String)>>(body)?;
        self.decode(&pairs)
    }
}
