use std::io::{self, Write};

use crate::models::{EmployerPostingCount, PostingListing, PostingSummary};

pub fn salary_range(from: i64, to: i64) -> String {
    match (from, to) {
        (0, 0) => "-".to_string(),
        (from, 0) => format!("from {}", from),
        (0, to) => format!("up to {}", to),
        (from, to) => format!("{}-{}", from, to),
    }
}

pub fn average(value: Option<f64>) -> String {
    match value {
        Some(avg) => format!("{:.2}", avg),
        None => "no data".to_string(),
    }
}

pub fn employer_counts(out: &mut impl Write, rows: &[EmployerPostingCount]) -> io::Result<()> {
    if rows.is_empty() {
        return writeln!(out, "No employers found.");
    }
    writeln!(out, "{:<40} {:>9}", "EMPLOYER", "POSTINGS")?;
    writeln!(out, "{}", "-".repeat(50))?;
    for row in rows {
        writeln!(out, "{:<40} {:>9}", truncate(&row.employer, 38), row.postings)?;
    }
    Ok(())
}

pub fn listings(out: &mut impl Write, rows: &[PostingListing]) -> io::Result<()> {
    if rows.is_empty() {
        return writeln!(out, "No postings found.");
    }
    writeln!(
        out,
        "{:<20} {:<36} {:>20}  {}",
        "EMPLOYER", "POSTING", "SALARY", "URL"
    )?;
    writeln!(out, "{}", "-".repeat(110))?;
    for row in rows {
        writeln!(
            out,
            "{:<20} {:<36} {:>20}  {}",
            truncate(&row.employer, 18),
            truncate(&row.name, 34),
            salary_range(row.salary_from, row.salary_to),
            row.url
        )?;
    }
    Ok(())
}

pub fn summaries(out: &mut impl Write, rows: &[PostingSummary]) -> io::Result<()> {
    if rows.is_empty() {
        return writeln!(out, "No postings found.");
    }
    writeln!(out, "{:<48} {:>20}  {}", "POSTING", "SALARY", "URL")?;
    writeln!(out, "{}", "-".repeat(100))?;
    for row in rows {
        writeln!(
            out,
            "{:<48} {:>20}  {}",
            truncate(&row.name, 46),
            salary_range(row.salary_from, row.salary_to),
            row.url
        )?;
    }
    Ok(())
}

/// Shortens to `max` characters, counting chars rather than bytes.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salary_range_formats() {
        assert_eq!(salary_range(0, 0), "-");
        assert_eq!(salary_range(1000, 0), "from 1000");
        assert_eq!(salary_range(0, 2000), "up to 2000");
        assert_eq!(salary_range(1000, 2000), "1000-2000");
    }

    #[test]
    fn test_average_sentinel() {
        assert_eq!(average(None), "no data");
        assert_eq!(average(Some(0.0)), "0.00");
        assert_eq!(average(Some(1500.0)), "1500.00");
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("Dev", 10), "Dev");
        assert_eq!(truncate("Разработчик", 8), "Разра...");
    }

    #[test]
    fn test_employer_counts_table() {
        let mut out = Vec::new();
        let rows = vec![EmployerPostingCount {
            employer: "Acme".into(),
            postings: 2,
        }];
        employer_counts(&mut out, &rows).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("EMPLOYER"));
        assert!(text.lines().any(|l| l.starts_with("Acme") && l.ends_with('2')));
    }

    #[test]
    fn test_empty_tables() {
        let mut out = Vec::new();
        summaries(&mut out, &[]).unwrap();
        listings(&mut out, &[]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "No postings found.\nNo postings found.\n");
    }
}
