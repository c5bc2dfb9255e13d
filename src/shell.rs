use anyhow::Result;
use std::io::{BufRead, Write};

use crate::db::Store;
use crate::report;

const MENU: &str = "\
1. Employers and their posting counts
2. All postings
3. Average salary
4. Postings paid above average
5. Search postings by keyword
0. Exit";

enum Step {
    Continue,
    Exit,
}

/// Request/response console over the store's read operations.
pub struct Shell<'a, R, W> {
    store: &'a Store,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Shell<'a, R, W> {
    pub fn new(store: &'a Store, input: R, output: W) -> Self {
        Self {
            store,
            input,
            output,
        }
    }

    /// Runs until `0` is chosen or input ends. Query errors are shown and
    /// the loop goes on; only I/O errors on the console itself stop it.
    pub fn run(&mut self) -> std::io::Result<()> {
        loop {
            writeln!(self.output, "\n{}", MENU)?;
            write!(self.output, "> ")?;
            self.output.flush()?;

            let Some(choice) = self.read_line()? else {
                break;
            };
            match self.dispatch(choice.trim()) {
                Ok(Step::Continue) => {}
                Ok(Step::Exit) => break,
                Err(err) => writeln!(self.output, "Error: {:#}", err)?,
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, choice: &str) -> Result<Step> {
        match choice {
            "1" => {
                let rows = self.store.count_postings_by_employer()?;
                report::employer_counts(&mut self.output, &rows)?;
            }
            "2" => {
                let rows = self.store.list_all_postings()?;
                report::listings(&mut self.output, &rows)?;
            }
            "3" => {
                let avg = self.store.average_salary()?;
                writeln!(self.output, "Average salary: {}", report::average(avg))?;
            }
            "4" => {
                let rows = self.store.list_above_average_salary()?;
                report::summaries(&mut self.output, &rows)?;
            }
            "5" => {
                write!(self.output, "Keyword: ")?;
                self.output.flush()?;
                let keyword = self.read_line()?.unwrap_or_default();
                let keyword = keyword.trim();
                writeln!(self.output, "Postings matching '{}':", keyword)?;
                let rows = self.store.list_by_keyword(keyword)?;
                report::summaries(&mut self.output, &rows)?;
            }
            "0" => return Ok(Step::Exit),
            other => writeln!(self.output, "Unknown choice '{}'. Try again.", other)?,
        }
        Ok(Step::Continue)
    }

    fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{employer, posting, test_store};
    use std::io::Cursor;

    fn run_shell(store: &Store, input: &str) -> String {
        let mut out = Vec::new();
        Shell::new(store, Cursor::new(input.to_string()), &mut out)
            .run()
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_exit_and_eof_end_loop() {
        let (store, _dir) = test_store();
        let out = run_shell(&store, "0\n");
        assert_eq!(out.matches("0. Exit").count(), 1);

        let out = run_shell(&store, "");
        assert_eq!(out.matches("0. Exit").count(), 1);
    }

    #[test]
    fn test_average_without_data() {
        let (store, _dir) = test_store();
        let out = run_shell(&store, "3\n0\n");
        assert!(out.contains("Average salary: no data"));
    }

    #[test]
    fn test_keyword_search_prompts_for_keyword() {
        let (store, _dir) = test_store();
        store.upsert_employer(&employer("1", "Acme")).unwrap();
        store
            .upsert_posting(&posting("10", "Engineer", Some((1000, 2000))), "1")
            .unwrap();
        store.upsert_posting(&posting("11", "QA", None), "1").unwrap();

        let out = run_shell(&store, "5\neng\n0\n");
        assert!(out.contains("Postings matching 'eng':"));
        assert!(out.contains("Engineer"));
        assert!(out.contains("1000-2000"));
        assert!(!out.contains("https://hh.ru/vacancy/11"));
    }

    #[test]
    fn test_counts_and_unknown_choice() {
        let (store, _dir) = test_store();
        store.upsert_employer(&employer("1", "Acme")).unwrap();

        let out = run_shell(&store, "9\n1\n0\n");
        assert!(out.contains("Unknown choice '9'"));
        assert!(out.lines().any(|l| l.starts_with("Acme") && l.ends_with('0')));
    }

    #[test]
    fn test_query_error_is_reported_and_loop_continues() {
        let (mut store, _dir) = test_store();
        store.close().unwrap();

        let out = run_shell(&store, "2\n0\n");
        assert!(out.contains("Error: database connection is closed"));
        assert_eq!(out.matches("0. Exit").count(), 2);
    }
}
