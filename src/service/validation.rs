//! Request validation from the resource model's field declarations.

use crate::error::AppError;
use crate::model::{FieldDef, FieldKind, Resource};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a create body: every required field present and non-null,
    /// every present field well-typed. Unknown keys are ignored.
    pub fn validate(body: &HashMap<String, Value>, resource: &Resource) -> Result<(), AppError> {
        for f in &resource.fields {
            let val = body.get(&f.name);
            if f.required && (val.is_none() || val == Some(&Value::Null)) {
                return Err(AppError::validation(&f.name, "this field is required"));
            }
            if let Some(v) = val {
                validate_field(f, v)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present in the body (partial update).
    /// Required is not enforced for missing fields.
    pub fn validate_partial(
        body: &HashMap<String, Value>,
        resource: &Resource,
    ) -> Result<(), AppError> {
        for (name, v) in body {
            if let Some(f) = resource.field(name) {
                validate_field(f, v)?;
            }
        }
        Ok(())
    }
}

fn validate_field(field: &FieldDef, v: &Value) -> Result<(), AppError> {
    if v.is_null() {
        if field.required {
            return Err(AppError::validation(&field.name, "may not be null"));
        }
        return Ok(());
    }
    match field.kind {
        FieldKind::Integer => {
            if v.as_i64().is_none() {
                return Err(AppError::validation(&field.name, "must be an integer"));
            }
        }
        FieldKind::Text => {
            if !v.is_string() {
                return Err(AppError::validation(&field.name, "must be a string"));
            }
        }
        FieldKind::Date => {
            let ok = v
                .as_str()
                .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
                .unwrap_or(false);
            if !ok {
                return Err(AppError::validation(
                    &field.name,
                    "must be a date in YYYY-MM-DD format",
                ));
            }
        }
    }
    Ok(())
}
