use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

#[derive(Debug)]
pub struct CleanedPageText {
    pub lines: Vec<String>,
    pub page_number_lines_dropped: usize,
}

/// Normalizes one page of extracted text into trimmed, single-spaced lines.
#[derive(Debug)]
pub struct PageTextCleaner {
    page_number_line: Regex,
    whitespace_run: Regex,
}

impl PageTextCleaner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            page_number_line: Regex::new(r"^\d+$")
                .context("failed to compile page number regex")?,
            whitespace_run: Regex::new(r"\s+")
                .context("failed to compile whitespace run regex")?,
        })
    }

    /// Splits the page into lines, trims each, drops empties and short
    /// all-digit lines (running page numbers left behind by the text layer),
    /// and collapses interior whitespace runs to a single space. Line order
    /// is preserved; a blank page yields no lines.
    pub fn clean(&self, page_text: &str, page_number: i64) -> CleanedPageText {
        let mut lines = Vec::new();
        let mut dropped = 0usize;

        for raw in page_text.split('\n') {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if self.page_number_line.is_match(line) && line.chars().count() < 4 {
                dropped += 1;
                continue;
            }

            lines.push(self.whitespace_run.replace_all(line, " ").into_owned());
        }

        if dropped > 0 {
            debug!(page = page_number, dropped, "dropped page number artifacts");
        }

        CleanedPageText {
            lines,
            page_number_lines_dropped: dropped,
        }
    }
}
