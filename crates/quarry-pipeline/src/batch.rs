//! Batch runner: JSONL questions in, one answer record per question out.
//!
//! Questions run concurrently up to `max_concurrency`. Each runs on a
//! blocking worker under a per-question timeout; on timeout its token is
//! cancelled and a fallback record is emitted immediately. The worker
//! keeps its concurrency permit until it reaches the next checkpoint and
//! returns, so abandoned work never exceeds the limit.

use std::collections::HashSet;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use quarry_core::config::QuarryConfig;
use quarry_core::models::{Answer, AnswerRecord, Question};
use quarry_core::traits::{Cancellable, CancellationToken};
use quarry_core::tracing::metrics;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::pipeline::{Pipeline, TIMED_OUT};

/// Parsed batch input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchInput {
    pub questions: Vec<Question>,
    /// Lines that were not valid question records.
    pub skipped: usize,
}

/// Read a JSONL batch. Blank lines are ignored; lines that do not parse and
/// repeated identifiers are skipped with a warning.
pub fn read_batch(path: &Path) -> io::Result<BatchInput> {
    let content = fs::read_to_string(path)?;
    Ok(parse_batch(&content))
}

pub fn parse_batch(content: &str) -> BatchInput {
    let mut input = BatchInput::default();
    let mut seen = HashSet::new();
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Question>(line) {
            Ok(q) if seen.insert(q.id.clone()) => input.questions.push(q),
            Ok(q) => {
                warn!(line = number + 1, id = %q.id, "duplicate question id skipped");
                input.skipped += 1;
            }
            Err(e) => {
                warn!(line = number + 1, error = %e, "invalid batch line skipped");
                input.skipped += 1;
            }
        }
    }
    input
}

/// Write one JSON record per line.
pub fn write_records(path: &Path, records: &[AnswerRecord]) -> io::Result<()> {
    let file = fs::File::create(path)?;
    let mut out = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()
}

pub struct BatchRunner {
    pipeline: Arc<Pipeline>,
    max_concurrency: usize,
    question_timeout: Duration,
}

impl BatchRunner {
    /// `max_concurrency` is clamped to at least 1.
    pub fn new(pipeline: Arc<Pipeline>, max_concurrency: usize, question_timeout: Duration) -> Self {
        Self {
            pipeline,
            max_concurrency: max_concurrency.max(1),
            question_timeout,
        }
    }

    pub fn from_config(pipeline: Arc<Pipeline>, config: &QuarryConfig) -> Self {
        Self::new(
            pipeline,
            config.batch.effective_max_concurrency(),
            Duration::from_secs(config.batch.effective_question_timeout_secs()),
        )
    }

    /// Answer every question. The result holds exactly one record per input
    /// question, in input order.
    pub async fn run(&self, questions: Vec<Question>) -> Vec<AnswerRecord> {
        let started = Instant::now();
        let total = questions.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for (index, question) in questions.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let pipeline = Arc::clone(&self.pipeline);
            let timeout = self.question_timeout;
            tasks.spawn(async move {
                let record = answer_one(pipeline, semaphore, question, timeout).await;
                (index, record)
            });
        }

        let mut slots: Vec<Option<AnswerRecord>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, record)) => slots[index] = Some(record),
                Err(e) => error!(error = %e, "batch task failed"),
            }
        }

        let records: Vec<AnswerRecord> = slots
            .into_iter()
            .zip(&questions)
            .map(|(slot, q)| slot.unwrap_or_else(|| fallback_record(q, "internal error")))
            .collect();
        info!(
            { metrics::QUESTIONS_ANSWERED } = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch complete"
        );
        records
    }
}

async fn answer_one(
    pipeline: Arc<Pipeline>,
    semaphore: Arc<Semaphore>,
    question: Question,
    timeout: Duration,
) -> AnswerRecord {
    let permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(e) => {
            error!(error = %e, id = %question.id, "concurrency limiter closed");
            return fallback_record(&question, "internal error");
        }
    };

    let token = CancellationToken::new();
    let worker_token = token.clone();
    let worker_question = question.clone();
    let worker = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        pipeline.answer(&worker_question, &worker_token)
    });

    match tokio::time::timeout(timeout, worker).await {
        Ok(Ok(record)) => record,
        Ok(Err(e)) => {
            error!(error = %e, id = %question.id, "pipeline worker failed");
            fallback_record(&question, "internal error")
        }
        Err(_) => {
            warn!(id = %question.id, timeout_secs = timeout.as_secs_f64(), "question timed out");
            token.cancel();
            fallback_record(&question, TIMED_OUT)
        }
    }
}

fn fallback_record(question: &Question, explanation: &str) -> AnswerRecord {
    let answer = Answer::fallback(&question.format_hint, explanation);
    AnswerRecord::from_answer(&question.id, answer, String::new(), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn invalid_and_duplicate_lines_are_skipped() {
        let content = r#"{"id":"a","question":"How many orders?","format_hint":"int"}

not json
{"id":"a","question":"again","format_hint":"int"}
{"id":"b","question":"Top 3 products by revenue","format_hint":"list[{product:str, revenue:float}]"}
"#;
        let input = parse_batch(content);
        assert_eq!(input.skipped, 2);
        let ids: Vec<&str> = input.questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn records_are_written_one_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let q = Question::new("q1", "How many orders?", "int");
        write_records(&path, &[fallback_record(&q, TIMED_OUT)]).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(written.trim()).unwrap();
        assert_eq!(value["id"], json!("q1"));
        assert_eq!(value["final_answer"], json!(0));
        assert_eq!(value["explanation"], json!("timed out"));
        assert_eq!(value["citations"], json!([]));
    }
}
