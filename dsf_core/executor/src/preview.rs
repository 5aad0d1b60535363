use crate::error::ExecutorError;
use crate::Executor;
use log::debug;
use rand::Rng;
use serde_json::Value;
use shared_clients::decodable::types::{PreviewPage, PreviewRequest};
use std::time::Duration;

const INITIAL_DELAY: Duration = Duration::from_secs(1);
const EPSILON: Duration = Duration::from_millis(1);

/// Exponential backoff with a random stagger, bounded by a total budget.
#[derive(Debug)]
pub struct Backoff {
    budget: Duration,
    elapsed: Duration,
    next: Duration,
}

impl Backoff {
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            elapsed: Duration::ZERO,
            next: INITIAL_DELAY,
        }
    }

    /// Delay before the next attempt, or `None` once the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        let remaining = self.budget.saturating_sub(self.elapsed);
        if remaining < EPSILON {
            return None;
        }
        let stagger = Duration::from_millis(rand::rng().random_range(0..=1000));
        let delay = (self.next + stagger).min(remaining);
        self.elapsed += delay;
        self.next *= 2;
        Some(delay)
    }
}

/// Rows collected from preview pages. Append streams accumulate; change
/// streams keep only the latest `after` image.
#[derive(Debug)]
struct PreviewRows {
    append: bool,
    rows: Vec<Value>,
}

impl PreviewRows {
    fn absorb(&mut self, page: &PreviewPage) {
        if self.append {
            self.rows.extend(page.results.iter().cloned());
            return;
        }
        if let Some(last) = page.results.last() {
            self.rows = match last.get("after") {
                Some(after) if !after.is_null() => vec![after.clone()],
                _ => Vec::new(),
            };
        }
    }
}

impl Executor {
    /// Run `sql` as a preview and return the rows it produced before the
    /// preview finished or the timeout ran out.
    pub async fn preview(&self, sql: &str) -> Result<Vec<Value>, ExecutorError> {
        let input_streams = self.api().preview_dependencies(sql).await?;
        let request = PreviewRequest {
            sql: sql.to_string(),
            start: self.settings().preview_start,
            input_streams,
        };
        let mut page = self.api().create_preview(&request).await?;
        debug!("Preview '{}' created", page.id);

        let mut rows = PreviewRows {
            append: page.is_append(),
            rows: Vec::new(),
        };
        let mut backoff = Backoff::new(self.settings().preview_timeout);
        while let Some(token) = page.next_token.clone() {
            page = self.api().run_preview(&page.id, &token).await?;
            rows.absorb(&page);
            if page.next_token.is_none() {
                break;
            }
            match backoff.next_delay() {
                Some(delay) => tokio::time::sleep(delay).await,
                None => break,
            }
        }
        Ok(rows.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(kind: &str, results: Vec<Value>) -> PreviewPage {
        PreviewPage {
            id: "p".to_string(),
            output_stream_type: kind.to_string(),
            results,
            next_token: None,
        }
    }

    #[test]
    fn backoff_stays_within_budget() {
        let mut backoff = Backoff::new(Duration::from_secs(5));
        let mut total = Duration::ZERO;
        let mut attempts = 0;
        while let Some(delay) = backoff.next_delay() {
            total += delay;
            attempts += 1;
        }
        assert_eq!(total, Duration::from_secs(5));
        assert!((2..=3).contains(&attempts));
    }

    #[test]
    fn change_stream_keeps_last_image() {
        let mut rows = PreviewRows {
            append: false,
            rows: Vec::new(),
        };
        rows.absorb(&page(
            "CHANGE",
            vec![json!({"after": {"n": 1}}), json!({"after": {"n": 2}})],
        ));
        assert_eq!(rows.rows, vec![json!({"n": 2})]);

        rows.absorb(&page("CHANGE", vec![]));
        assert_eq!(rows.rows.len(), 1);

        rows.absorb(&page("CHANGE", vec![json!({"after": null})]));
        assert!(rows.rows.is_empty());
    }

    #[test]
    fn append_stream_accumulates() {
        let mut rows = PreviewRows {
            append: true,
            rows: Vec::new(),
        };
        rows.absorb(&page("APPEND", vec![json!({"n": 1})]));
        rows.absorb(&page("APPEND", vec![json!({"n": 2})]));
        assert_eq!(rows.rows.len(), 2);
    }
}
