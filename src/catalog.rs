use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::CatalogError;
use crate::models::{EmployerRecord, PostingRecord};

pub const DEFAULT_API_URL: &str = "https://api.hh.ru";

/// Employers looked up when no queries are given on the command line.
pub const DEFAULT_EMPLOYER_QUERIES: &[&str] = &[
    "Яндекс",
    "Сбербанк",
    "Тинькофф",
    "Mail.ru",
    "Газпром",
    "Роснефть",
    "Лукойл",
    "ВТБ",
    "Альфа-Банк",
    "Мегафон",
];

const USER_AGENT: &str = concat!("hhdb/", env!("CARGO_PKG_VERSION"));
const POSTINGS_PER_PAGE: &str = "100";

// --- Catalog trait ---

pub trait Catalog {
    /// Resolves the configured employers. Fails with
    /// [`CatalogError::NothingFetched`] only if none could be resolved.
    fn fetch_employers(&self) -> Result<Vec<EmployerRecord>, CatalogError>;

    fn fetch_postings(&self, employer_id: &str) -> Result<Vec<PostingRecord>, CatalogError>;
}

// --- HeadHunter client ---

/// Every list endpoint wraps its results in `{"items": [...], ...}`.
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug)]
pub struct HeadHunterClient {
    client: Client,
    base_url: String,
    queries: Vec<String>,
}

impl HeadHunterClient {
    pub fn new(base_url: &str, queries: Vec<String>) -> Result<Self, CatalogError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            queries,
        })
    }

    pub fn with_default_queries(base_url: &str) -> Result<Self, CatalogError> {
        let queries = DEFAULT_EMPLOYER_QUERIES
            .iter()
            .map(|q| q.to_string())
            .collect();
        Self::new(base_url, queries)
    }

    fn get_items<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, CatalogError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).query(query).send()?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(CatalogError::Status { url, status, body });
        }

        let page: Page<T> = response.json()?;
        Ok(page.items)
    }
}

impl Catalog for HeadHunterClient {
    fn fetch_employers(&self) -> Result<Vec<EmployerRecord>, CatalogError> {
        let mut employers = Vec::new();

        for text in &self.queries {
            let found = self.get_items::<EmployerRecord>(
                "/employers",
                &[
                    ("text", text.as_str()),
                    ("only_with_vacancies", "true"),
                    ("per_page", "1"),
                ],
            );
            match found {
                Ok(items) => match items.into_iter().next() {
                    Some(employer) => {
                        debug!(query = %text, id = ?employer.id, name = ?employer.name, "resolved employer");
                        employers.push(employer);
                    }
                    None => warn!(query = %text, "no employer matched"),
                },
                Err(err) => warn!(query = %text, error = %err, "employer lookup failed"),
            }
        }

        if employers.is_empty() {
            return Err(CatalogError::NothingFetched {
                queries: self.queries.len(),
            });
        }
        Ok(employers)
    }

    fn fetch_postings(&self, employer_id: &str) -> Result<Vec<PostingRecord>, CatalogError> {
        let postings = self.get_items::<PostingRecord>(
            "/vacancies",
            &[("employer_id", employer_id), ("per_page", POSTINGS_PER_PAGE)],
        )?;
        if postings.is_empty() {
            debug!(employer_id, "employer has no postings");
        }
        Ok(postings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_employer_page_decodes_first_item() {
        let json = r#"{
            "items": [
                {
                    "id": "1740",
                    "name": "Яндекс",
                    "url": "https://api.hh.ru/employers/1740",
                    "alternate_url": "https://hh.ru/employer/1740",
                    "logo_urls": null,
                    "open_vacancies": 1203
                }
            ],
            "found": 12,
            "pages": 12,
            "per_page": 1,
            "page": 0
        }"#;

        let page: Page<EmployerRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(page.items.len(), 1);
        let employer = &page.items[0];
        assert_eq!(employer.id.as_deref(), Some("1740"));
        assert_eq!(employer.name.as_deref(), Some("Яндекс"));
        assert_eq!(
            employer.alternate_url.as_deref(),
            Some("https://hh.ru/employer/1740")
        );
    }

    #[test]
    fn test_page_without_items_is_empty() {
        let page: Page<PostingRecord> = serde_json::from_str(r#"{"found": 0}"#).unwrap();
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_no_queries_is_total_failure() {
        let client = HeadHunterClient::new(DEFAULT_API_URL, Vec::new()).unwrap();
        let err = client.fetch_employers().unwrap_err();
        assert!(matches!(err, CatalogError::NothingFetched { queries: 0 }));
    }

    #[test]
    fn test_every_lookup_failing_is_total_failure() {
        // Nothing listens on port 1, so each lookup fails to connect
        let client =
            HeadHunterClient::new("http://127.0.0.1:1", vec!["x".into(), "y".into()]).unwrap();
        let err = client.fetch_employers().unwrap_err();
        assert!(
            matches!(err, CatalogError::NothingFetched { queries: 2 }),
            "got {err:?}"
        );
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = HeadHunterClient::with_default_queries("https://api.hh.ru/").unwrap();
        assert_eq!(client.base_url, "https://api.hh.ru");
        assert_eq!(client.queries.len(), DEFAULT_EMPLOYER_QUERIES.len());
    }
}
