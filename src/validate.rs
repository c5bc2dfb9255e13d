//! Admission control for catalog records.
//!
//! A record either becomes a typed row ready to be written or is rejected
//! with the name of the first required field it lacks. Blank strings count
//! as missing.

use thiserror::Error;

use crate::models::{EmployerRecord, NewEmployer, NewPosting, PostingRecord};

/// Currency code used when a posting carries no salary currency.
pub const DEFAULT_CURRENCY: &str = "RUR";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission<T> {
    Accepted(T),
    Rejected(Rejection),
}

impl<T> Admission<T> {
    pub fn into_result(self) -> Result<T, Rejection> {
        match self {
            Admission::Accepted(value) => Ok(value),
            Admission::Rejected(reason) => Err(reason),
        }
    }
}

impl<T> From<Result<T, Rejection>> for Admission<T> {
    fn from(result: Result<T, Rejection>) -> Self {
        match result {
            Ok(value) => Admission::Accepted(value),
            Err(reason) => Admission::Rejected(reason),
        }
    }
}

pub fn validate_employer(record: &EmployerRecord) -> Admission<NewEmployer> {
    let admit = || -> Result<NewEmployer, Rejection> {
        Ok(NewEmployer {
            id: required(&record.id, "id")?,
            name: required(&record.name, "name")?,
            url: record.alternate_url.clone().unwrap_or_default(),
        })
    };
    admit().into()
}

pub fn validate_posting(record: &PostingRecord) -> Admission<NewPosting> {
    let admit = || -> Result<NewPosting, Rejection> {
        let id = required(&record.id, "id")?;
        let name = required(&record.name, "name")?;
        let url = required(&record.alternate_url, "alternate_url")?;

        let salary = record.salary.as_ref();
        let currency = salary
            .and_then(|s| s.currency.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CURRENCY)
            .to_string();

        Ok(NewPosting {
            id,
            name,
            url,
            salary_from: salary.and_then(|s| s.from).unwrap_or(0),
            salary_to: salary.and_then(|s| s.to).unwrap_or(0),
            currency,
        })
    };
    admit().into()
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, Rejection> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(Rejection::MissingField(field)),
    }
}
