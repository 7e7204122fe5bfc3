//! File-backed delivery queue using JSON lines for durability.
//!
//! The live queue is persisted to `<stream>.jsonl` and rewritten on every
//! extraction; dead letters are appended to `<stream>_dead_letter.jsonl`.
//! Both are reloaded on open; a line that fails to decode is logged, counted
//! and skipped. Claims are kept in memory only, so they do not survive a
//! restart.
//!
//! File I/O is blocking and runs under the queue lock on the calling
//! runtime worker, and every extraction rewrites the whole live file. Use it
//! for a single process with a small queue; use Redis otherwise.

use std::collections::{BinaryHeap, HashMap};
use std::fs::{self, create_dir_all, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::Utf8Error;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::memory::ScoredEntry;
use crate::core::{DeliveryQueue, Job, JobKey, SchedulerError};

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    score: i64,
    member: String,
}

struct State {
    live: BinaryHeap<ScoredEntry>,
    next_seq: u64,
    dead: Vec<Job>,
    claims: HashMap<JobKey, Instant>,
    skipped_lines: usize,
}

/// Durable single-process delivery queue.
pub struct FileDeliveryQueue {
    path: PathBuf,
    stream: String,
    state: Mutex<State>,
}

fn backend<E: std::fmt::Display>(e: E) -> SchedulerError {
    SchedulerError::Backend(e.to_string())
}

impl FileDeliveryQueue {
    /// Open (or create) the queue files under `path`.
    pub fn open(path: impl AsRef<Path>, stream: impl Into<String>) -> Result<Self, SchedulerError> {
        let path = path.as_ref().to_path_buf();
        create_dir_all(&path).map_err(backend)?;
        let queue = Self {
            path,
            stream: stream.into(),
            state: Mutex::new(State {
                live: BinaryHeap::new(),
                next_seq: 0,
                dead: Vec::new(),
                claims: HashMap::new(),
                skipped_lines: 0,
            }),
        };
        queue.load_from_disk()?;
        Ok(queue)
    }

    fn live_path(&self) -> PathBuf {
        self.path.join(format!("{}.jsonl", self.stream))
    }

    fn dead_path(&self) -> PathBuf {
        self.path.join(format!("{}_dead_letter.jsonl", self.stream))
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.join(format!("{}.jsonl.tmp", self.stream))
    }

    /// Lines that failed to load on open and were skipped.
    pub fn skipped_lines(&self) -> usize {
        self.state.lock().skipped_lines
    }

    /// Non-empty lines of `file_path`; lines that are not UTF-8 come back as `Err`.
    fn read_lines(file_path: &Path) -> Result<Vec<Result<String, Utf8Error>>, SchedulerError> {
        if !file_path.exists() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(file_path).map_err(backend)?;
        Ok(bytes
            .split(|b| *b == b'\n')
            .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
            .map(|line| std::str::from_utf8(line).map(str::to_string))
            .collect())
    }

    fn load_from_disk(&self) -> Result<(), SchedulerError> {
        let mut state = self.state.lock();
        for (index, line) in Self::read_lines(&self.live_path())?.into_iter().enumerate() {
            let entry = line
                .map_err(backend)
                .and_then(|line| serde_json::from_str::<StoredEntry>(&line).map_err(SchedulerError::from));
            match entry {
                Ok(entry) => {
                    let seq = state.next_seq;
                    state.next_seq += 1;
                    state.live.push(ScoredEntry {
                        score: entry.score,
                        seq,
                        member: entry.member,
                    });
                }
                Err(e) => {
                    state.skipped_lines += 1;
                    tracing::error!(stream = %self.stream, entry = index + 1, error = %e, "skipping unreadable queue entry");
                }
            }
        }
        for (index, line) in Self::read_lines(&self.dead_path())?.into_iter().enumerate() {
            match line.map_err(backend).and_then(|line| Job::decode(&line)) {
                Ok(job) => state.dead.push(job),
                Err(e) => {
                    state.skipped_lines += 1;
                    tracing::error!(stream = %self.stream, entry = index + 1, error = %e, "skipping unreadable dead letter");
                }
            }
        }
        tracing::debug!(
            stream = %self.stream,
            live = state.live.len(),
            dead = state.dead.len(),
            skipped = state.skipped_lines,
            "loaded delivery queue from disk"
        );
        Ok(())
    }

    fn append_line(file_path: &Path, line: &str) -> Result<(), SchedulerError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)
            .map_err(backend)?;
        writeln!(file, "{line}").map_err(backend)
    }

    /// Replace the live file with the heap contents in extraction order.
    ///
    /// The new contents go to a temporary file that is synced and renamed
    /// over the live file, so a failure leaves the previous file intact.
    fn rewrite_live(&self, live: &BinaryHeap<ScoredEntry>) -> Result<(), SchedulerError> {
        let mut entries: Vec<&ScoredEntry> = live.iter().collect();
        entries.sort_unstable_by(|a, b| b.cmp(a));

        let tmp = self.tmp_path();
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)
            .map_err(backend)?;
        for entry in entries {
            let line = serde_json::to_string(&StoredEntry {
                score: entry.score,
                member: entry.member.clone(),
            })?;
            writeln!(file, "{line}").map_err(backend)?;
        }
        file.sync_all().map_err(backend)?;
        fs::rename(&tmp, self.live_path()).map_err(backend)
    }
}

#[async_trait]
impl DeliveryQueue for FileDeliveryQueue {
    async fn admit(&self, job: &Job) -> Result<(), SchedulerError> {
        let member = job.encode()?;
        let score = job.score();
        let line = serde_json::to_string(&StoredEntry {
            score,
            member: member.clone(),
        })?;
        let mut state = self.state.lock();
        Self::append_line(&self.live_path(), &line)?;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.live.push(ScoredEntry { score, seq, member });
        Ok(())
    }

    async fn extract_highest(&self) -> Result<Option<String>, SchedulerError> {
        let mut state = self.state.lock();
        let Some(entry) = state.live.pop() else {
            return Ok(None);
        };
        if let Err(e) = self.rewrite_live(&state.live) {
            // Keep memory and disk in agreement.
            state.live.push(entry);
            return Err(e);
        }
        Ok(Some(entry.member))
    }

    async fn dead_letter(&self, job: &Job) -> Result<(), SchedulerError> {
        let line = job.encode()?;
        let mut state = self.state.lock();
        Self::append_line(&self.dead_path(), &line)?;
        state.dead.push(job.clone());
        Ok(())
    }

    async fn claim(&self, key: &JobKey, ttl: Duration) -> Result<bool, SchedulerError> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.claims.retain(|_, expires| *expires > now);
        if state.claims.contains_key(key) {
            return Ok(false);
        }
        state.claims.insert(key.clone(), now + ttl);
        Ok(true)
    }

    async fn release(&self, key: &JobKey) -> Result<(), SchedulerError> {
        self.state.lock().claims.remove(key);
        Ok(())
    }

    async fn len(&self) -> Result<usize, SchedulerError> {
        Ok(self.state.lock().live.len())
    }

    async fn dead_letters(&self) -> Result<Vec<Job>, SchedulerError> {
        Ok(self.state.lock().dead.clone())
    }
}
