//! Request validation.
//!
//! Every engine operation has a fixed schema: the fields it requires, their
//! JSON types and the constraints their values must satisfy. A field is
//! reported once, at the first failing stage, in priority order
//! MISSING > BAD_TYPE > BAD_REQ. All fields are checked so a caller sees
//! every offending input at once.
//!
//! Presence and JSON types are checked here while the typed request is
//! built. The typed request then carries its semantic rules as `validator`
//! attributes, plus the few rules that depend on more than one attribute
//! can say.

use std::fmt;

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use validator::{Validate, ValidationErrors};

use crate::{
    error::{AppError, AppResult, ErrorCode, FieldError, FieldErrors},
    models::{
        search::{words, DEFAULT_COUNT},
        Lend, NewBook, SearchQuery,
    },
};

/// Year of the first printed books
pub const GUTENBERG_YEAR: i32 = 1448;

pub static ISBN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{3}-[0-9]{3}-[0-9]{3}-[0-9]$").expect("valid isbn regex"));

/// Operations that accept a request body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    AddBook,
    FindBooks,
    CheckoutBook,
    ReturnBook,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::AddBook => "addBook",
            Operation::FindBooks => "findBooks",
            Operation::CheckoutBook => "checkoutBook",
            Operation::ReturnBook => "returnBook",
        };
        f.write_str(name)
    }
}

/// A typed request built from JSON and checked by its `Validate` rules
pub trait Schema: Validate + Sized {
    /// Build the typed request, reading every field of the schema in order.
    /// Fields that fail presence or type checks take their default value.
    fn check(fields: &mut Fields<'_>) -> Self;
}

/// Validate `req` against the schema of `T` for `operation`.
pub fn validate<T: Schema>(operation: Operation, req: &Value) -> AppResult<T> {
    let Some(map) = req.as_object() else {
        let error = FieldError {
            code: ErrorCode::BadType,
            widget: None,
            message: format!("{} request must be an object", operation),
        };
        return Err(AppError::Invalid(FieldErrors::new(vec![error])));
    };

    let mut fields = Fields::new(map);
    let value = T::check(&mut fields);
    if let Err(errors) = value.validate() {
        fields.reject(&errors);
    }
    if !fields.errors.is_empty() {
        let errors = FieldErrors::new(fields.into_errors());
        tracing::debug!("{} request rejected: {}", operation, errors);
        return Err(AppError::Invalid(errors));
    }
    Ok(value)
}

/// Request field name for a `validator` error key
fn widget_name(field: &str) -> &str {
    match field {
        "copy_count" => "nCopies",
        "patron_id" => "patronId",
        other => other,
    }
}

/// Field accessor that records the errors it encounters
pub struct Fields<'a> {
    req: &'a Map<String, Value>,
    /// Field names in schema order
    visited: Vec<String>,
    errors: Vec<FieldError>,
}

impl<'a> Fields<'a> {
    fn new(req: &'a Map<String, Value>) -> Self {
        Self {
            req,
            visited: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn error(&mut self, code: ErrorCode, name: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(code, name, message));
    }

    fn reported(&self, name: &str) -> bool {
        self.errors.iter().any(|e| e.widget.as_deref() == Some(name))
    }

    /// Add the `validator` failures of fields not already reported
    fn reject(&mut self, errors: &ValidationErrors) {
        let failures: Vec<(String, String)> = errors
            .field_errors()
            .iter()
            .map(|(field, errs)| {
                let name = widget_name(field).to_string();
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_deref())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{} is invalid", name));
                (name, message)
            })
            .collect();

        for (name, message) in failures {
            if !self.reported(&name) {
                self.error(ErrorCode::BadReq, &name, message);
            }
        }
    }

    /// Errors in schema order
    fn into_errors(mut self) -> Vec<FieldError> {
        let visited = &self.visited;
        self.errors.sort_by_key(|e| {
            e.widget
                .as_deref()
                .and_then(|w| visited.iter().position(|v| v == w))
                .unwrap_or(usize::MAX)
        });
        self.errors
    }

    /// Present, non-null value of a field
    fn present(&mut self, name: &str) -> Option<&'a Value> {
        self.visited.push(name.to_string());
        self.req.get(name).filter(|v| !v.is_null())
    }

    fn required(&mut self, name: &str) -> Option<&'a Value> {
        let value = self.present(name);
        if value.is_none() {
            self.error(ErrorCode::Missing, name, format!("{} is required", name));
        }
        value
    }

    fn as_text(&mut self, name: &str, value: &'a Value) -> Option<&'a str> {
        let text = value.as_str();
        if text.is_none() {
            self.error(ErrorCode::BadType, name, format!("{} must be a string", name));
        }
        text
    }

    fn as_integer(&mut self, name: &str, value: &Value) -> Option<i64> {
        let Value::Number(number) = value else {
            self.error(ErrorCode::BadType, name, format!("{} must be a number", name));
            return None;
        };
        let integer = number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        });
        if integer.is_none() {
            self.error(ErrorCode::BadReq, name, format!("{} must be an integer", name));
        }
        integer
    }

    fn in_range<T: TryFrom<i64>>(&mut self, name: &str, integer: i64) -> Option<T> {
        let value = T::try_from(integer).ok();
        if value.is_none() {
            self.error(ErrorCode::BadReq, name, format!("{} is out of range", name));
        }
        value
    }

    pub fn text(&mut self, name: &str) -> String {
        self.required(name)
            .and_then(|value| self.as_text(name, value))
            .unwrap_or_default()
            .to_string()
    }

    /// Array of non-empty strings
    pub fn text_list(&mut self, name: &str) -> Vec<String> {
        let Some(value) = self.required(name) else {
            return Vec::new();
        };
        let Some(items) = value.as_array() else {
            self.error(ErrorCode::BadType, name, format!("{} must be an array", name));
            return Vec::new();
        };
        let mut texts = Vec::with_capacity(items.len());
        for item in items {
            match item.as_str() {
                Some(text) => texts.push(text.to_string()),
                None => {
                    self.error(ErrorCode::BadType, name, format!("{} must contain only strings", name));
                    return Vec::new();
                }
            }
        }
        if texts.iter().any(String::is_empty) {
            self.error(ErrorCode::BadReq, name, "must be non-empty");
            return Vec::new();
        }
        texts
    }

    pub fn integer<T: TryFrom<i64> + Default>(&mut self, name: &str) -> T {
        self.required(name)
            .and_then(|value| self.as_integer(name, value))
            .and_then(|integer| self.in_range(name, integer))
            .unwrap_or_default()
    }

    /// Integer that may be absent; `None` when absent or invalid
    pub fn optional_integer<T: TryFrom<i64>>(&mut self, name: &str) -> Option<T> {
        let value = self.present(name)?;
        let integer = self.as_integer(name, value)?;
        self.in_range(name, integer)
    }

    /// Apply a rule to a field that passed its presence and type checks
    pub fn check<T: ?Sized>(&mut self, name: &str, value: &T, rule: fn(&T) -> Result<(), String>) {
        if self.reported(name) {
            return;
        }
        if let Err(message) = rule(value) {
            self.error(ErrorCode::BadReq, name, message);
        }
    }
}

fn has_words(text: &str) -> Result<(), String> {
    if words(text).is_empty() {
        Err("search must contain at least one word of two or more characters".to_string())
    } else {
        Ok(())
    }
}

fn publish_year(year: &i32) -> Result<(), String> {
    if (GUTENBERG_YEAR..=Utc::now().year()).contains(year) {
        Ok(())
    } else {
        Err(format!("must be a past year on or after {}", GUTENBERG_YEAR))
    }
}

impl Schema for NewBook {
    fn check(fields: &mut Fields<'_>) -> Self {
        let book = NewBook {
            isbn: fields.text("isbn"),
            title: fields.text("title"),
            authors: fields.text_list("authors"),
            pages: fields.integer("pages"),
            year: fields.integer("year"),
            publisher: fields.text("publisher"),
            copy_count: fields.optional_integer("nCopies"),
        };
        fields.check("year", &book.year, publish_year);
        book
    }
}

impl Schema for SearchQuery {
    fn check(fields: &mut Fields<'_>) -> Self {
        let query = SearchQuery {
            search: fields.text("search"),
            index: fields.optional_integer("index").unwrap_or(0),
            count: fields.optional_integer("count").unwrap_or(DEFAULT_COUNT),
        };
        fields.check("search", query.search.as_str(), has_words);
        query
    }
}

impl Schema for Lend {
    fn check(fields: &mut Fields<'_>) -> Self {
        Lend {
            isbn: fields.text("isbn"),
            patron_id: fields.text("patronId"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn book_request() -> Value {
        json!({
            "isbn": "123-456-789-0",
            "title": "Go",
            "authors": ["A"],
            "pages": 100,
            "year": 2000,
            "publisher": "P",
        })
    }

    fn invalid(err: AppError) -> FieldErrors {
        match err {
            AppError::Invalid(errors) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_book() {
        let book: NewBook = validate(Operation::AddBook, &book_request()).unwrap();
        assert_eq!(book.isbn, "123-456-789-0");
        assert_eq!(book.authors, vec!["A"]);
        assert_eq!(book.copy_count, None);
        assert_eq!(book.copies(), 1);
    }

    #[test]
    fn test_integral_float_accepted() {
        let mut req = book_request();
        req["pages"] = json!(100.0);
        req["nCopies"] = json!(3);
        let book: NewBook = validate(Operation::AddBook, &req).unwrap();
        assert_eq!(book.pages, 100);
        assert_eq!(book.copy_count, Some(3));
    }

    #[test]
    fn test_missing_fields() {
        let mut req = book_request();
        let map = req.as_object_mut().unwrap();
        map.remove("title");
        map.insert("publisher".to_string(), Value::Null);

        let errors = invalid(validate::<NewBook>(Operation::AddBook, &req).unwrap_err());
        assert_eq!(errors.as_slice().len(), 2);
        assert_eq!(errors.field("title").unwrap().code, ErrorCode::Missing);
        assert_eq!(errors.field("publisher").unwrap().code, ErrorCode::Missing);
    }

    #[test]
    fn test_priority_order() {
        let mut req = book_request();
        req["isbn"] = json!("12-34");
        req["pages"] = json!("100");
        req.as_object_mut().unwrap().remove("year");

        let errors = invalid(validate::<NewBook>(Operation::AddBook, &req).unwrap_err());
        let reported: Vec<(ErrorCode, &str)> = errors
            .as_slice()
            .iter()
            .map(|e| (e.code, e.widget.as_deref().unwrap()))
            .collect();
        assert_eq!(
            reported,
            vec![
                (ErrorCode::Missing, "year"),
                (ErrorCode::BadType, "pages"),
                (ErrorCode::BadReq, "isbn"),
            ]
        );
    }

    #[test]
    fn test_bad_requests() {
        let cases = [
            ("isbn", json!("1234567890")),
            ("title", json!("")),
            ("authors", json!([])),
            ("authors", json!(["A", ""])),
            ("pages", json!(0)),
            ("pages", json!(12.5)),
            ("year", json!(1447)),
            ("year", json!(Utc::now().year() + 1)),
            ("nCopies", json!(-1)),
            ("nCopies", json!(0)),
        ];
        for (field, value) in cases {
            let mut req = book_request();
            req[field] = value.clone();
            let errors = invalid(validate::<NewBook>(Operation::AddBook, &req).unwrap_err());
            let error = errors.field(field).unwrap_or_else(|| panic!("no error for {}={}", field, value));
            assert_eq!(error.code, ErrorCode::BadReq, "{}={}", field, value);
        }
    }

    #[test]
    fn test_bad_types() {
        let cases = [
            ("isbn", json!(1234)),
            ("authors", json!("A")),
            ("authors", json!(["A", 1])),
            ("year", json!("2000")),
            ("nCopies", json!(true)),
        ];
        for (field, value) in cases {
            let mut req = book_request();
            req[field] = value;
            let errors = invalid(validate::<NewBook>(Operation::AddBook, &req).unwrap_err());
            assert_eq!(errors.field(field).unwrap().code, ErrorCode::BadType);
        }
    }

    #[test]
    fn test_bad_requests_in_schema_order() {
        let mut req = book_request();
        req["nCopies"] = json!(0);
        req["year"] = json!(1200);
        req["title"] = json!("");
        req["isbn"] = json!("123");

        let errors = invalid(validate::<NewBook>(Operation::AddBook, &req).unwrap_err());
        let widgets: Vec<&str> = errors
            .as_slice()
            .iter()
            .map(|e| e.widget.as_deref().unwrap())
            .collect();
        assert_eq!(widgets, vec!["isbn", "title", "year", "nCopies"]);
        assert_eq!(errors.code(), ErrorCode::BadReq);
    }

    #[test]
    fn test_integer_out_of_range() {
        let mut req = book_request();
        req["pages"] = json!(i64::from(i32::MAX) + 1);
        let errors = invalid(validate::<NewBook>(Operation::AddBook, &req).unwrap_err());
        assert_eq!(errors.as_slice().len(), 1);
        assert_eq!(errors.field("pages").unwrap().code, ErrorCode::BadReq);
    }

    #[test]
    fn test_request_must_be_object() {
        let errors = invalid(validate::<Lend>(Operation::CheckoutBook, &json!(["x"])).unwrap_err());
        assert_eq!(errors.code(), ErrorCode::BadType);
    }

    #[test]
    fn test_search_defaults() {
        let query: SearchQuery = validate(Operation::FindBooks, &json!({ "search": "animal farm" })).unwrap();
        assert_eq!(query.index, 0);
        assert_eq!(query.count, DEFAULT_COUNT);
    }

    #[test]
    fn test_search_errors() {
        let errors = invalid(validate::<SearchQuery>(Operation::FindBooks, &json!({})).unwrap_err());
        assert_eq!(errors.field("search").unwrap().code, ErrorCode::Missing);

        let errors = invalid(validate::<SearchQuery>(Operation::FindBooks, &json!({ "search": "a ! b" })).unwrap_err());
        assert_eq!(errors.field("search").unwrap().code, ErrorCode::BadReq);

        let req = json!({ "search": "farm", "index": -1, "count": "2" });
        let errors = invalid(validate::<SearchQuery>(Operation::FindBooks, &req).unwrap_err());
        assert_eq!(errors.field("index").unwrap().code, ErrorCode::BadReq);
        assert_eq!(errors.field("count").unwrap().code, ErrorCode::BadType);

        let req = json!({ "search": "farm", "index": 1.5 });
        let errors = invalid(validate::<SearchQuery>(Operation::FindBooks, &req).unwrap_err());
        assert_eq!(errors.field("index").unwrap().code, ErrorCode::BadReq);
    }

    #[test]
    fn test_lend() {
        let lend: Lend = validate(
            Operation::ReturnBook,
            &json!({ "isbn": "123-456-789-0", "patronId": "joe" }),
        )
        .unwrap();
        assert_eq!(lend, Lend::new("123-456-789-0", "joe"));

        let errors = invalid(
            validate::<Lend>(Operation::CheckoutBook, &json!({ "isbn": "123", "patronId": "" })).unwrap_err(),
        );
        assert_eq!(errors.field("isbn").unwrap().code, ErrorCode::BadReq);
        assert_eq!(errors.field("patronId").unwrap().code, ErrorCode::BadReq);

        let errors = invalid(validate::<Lend>(Operation::CheckoutBook, &json!({ "patronId": 7 })).unwrap_err());
        assert_eq!(errors.field("isbn").unwrap().code, ErrorCode::Missing);
        assert_eq!(errors.field("patronId").unwrap().code, ErrorCode::BadType);
    }
}
