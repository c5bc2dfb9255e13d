use serde::{Deserialize, Deserializer, Serialize};

// --- Records as they arrive from the catalog (every field optional) ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployerRecord {
    #[serde(default, deserialize_with = "opaque_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub alternate_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostingRecord {
    #[serde(default, deserialize_with = "opaque_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub alternate_url: Option<String>,
    #[serde(default)]
    pub salary: Option<SalaryRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SalaryRecord {
    #[serde(default)]
    pub from: Option<i64>,
    #[serde(default)]
    pub to: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// The catalog sends ids as strings, but older endpoints used bare numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

fn opaque_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    }))
}

// --- Admitted rows, ready to be written ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEmployer {
    pub id: String,
    pub name: String,
    pub url: String, // empty when the catalog had none
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPosting {
    pub id: String,
    pub name: String,
    pub url: String,
    pub salary_from: i64, // 0 = not given
    pub salary_to: i64,   // 0 = not given
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    AlreadyPresent,
}

impl UpsertOutcome {
    pub fn from_changes(rows: usize) -> Self {
        if rows == 0 {
            UpsertOutcome::AlreadyPresent
        } else {
            UpsertOutcome::Inserted
        }
    }
}

// --- Query results ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployerPostingCount {
    pub employer: String,
    pub postings: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostingListing {
    pub employer: String,
    pub name: String,
    pub salary_from: i64,
    pub salary_to: i64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostingSummary {
    pub name: String,
    pub salary_from: i64,
    pub salary_to: i64,
    pub url: String,
}

impl From<PostingListing> for PostingSummary {
    fn from(listing: PostingListing) -> Self {
        Self {
            name: listing.name,
            salary_from: listing.salary_from,
            salary_to: listing.salary_to,
            url: listing.url,
        }
    }
}
