//! Persistence of cases as one JSON document each.
//!
//! Documents are read leniently: unknown fields are ignored and missing
//! fields take their defaults, so older and newer layouts load alike.

use crate::ai::{ClinicalAnswer, Diagnosis};
use crate::deck::Deck;
use crate::topics::TopicTracker;
use crate::types::Slide;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Which workflow produced a case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaseKind {
    Diagnosis,
    #[default]
    ContentGenerator,
}

/// How a content case was started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    Question,
    #[default]
    Topic,
}

/// A saved case: inputs, AI output and the edited deck.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Case {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: CaseKind,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub mode: InputMode,
    pub topic: Option<String>,
    pub question: Option<String>,
    pub answer: Option<ClinicalAnswer>,
    pub diagnoses: Vec<Diagnosis>,
    pub outline: Vec<String>,
    pub slides: Vec<Slide>,
    pub topics: TopicTracker,
}

impl Case {
    /// A new case with a fresh id and the current time.
    pub fn new(title: impl Into<String>, kind: CaseKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            kind,
            created_at: Utc::now(),
            ..Self::default()
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.mode = InputMode::Topic;
        self.topic = Some(topic.into());
        self
    }

    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.mode = InputMode::Question;
        self.question = Some(question.into());
        self
    }

    /// Rebuild the editable deck.
    pub fn deck(&self) -> Deck {
        Deck::with_topics(self.slides.clone(), self.topics.clone())
    }

    /// Capture the current deck state.
    pub fn save_deck(&mut self, deck: &Deck) {
        self.slides = deck.to_slides();
        self.topics = deck.topics().clone();
    }

    /// Topic, question or title, whichever names the case best.
    pub fn headline(&self) -> &str {
        self.topic
            .as_deref()
            .or(self.question.as_deref())
            .unwrap_or(&self.title)
    }
}

/// Key-value storage of cases by id.
pub trait CaseStore {
    fn get(&self, id: Uuid) -> Result<Option<Case>>;

    /// Insert or replace a case.
    fn put(&mut self, case: &Case) -> Result<()>;

    /// All cases, newest first.
    fn list(&self) -> Result<Vec<Case>>;

    /// Returns `false` when no such case existed.
    fn delete(&mut self, id: Uuid) -> Result<bool>;
}

fn newest_first(cases: &mut [Case]) {
    cases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Cases kept in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    cases: HashMap<Uuid, Case>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CaseStore for MemoryStore {
    fn get(&self, id: Uuid) -> Result<Option<Case>> {
        Ok(self.cases.get(&id).cloned())
    }

    fn put(&mut self, case: &Case) -> Result<()> {
        self.cases.insert(case.id, case.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<Case>> {
        let mut cases: Vec<Case> = self.cases.values().cloned().collect();
        newest_first(&mut cases);
        Ok(cases)
    }

    fn delete(&mut self, id: Uuid) -> Result<bool> {
        Ok(self.cases.remove(&id).is_some())
    }
}

/// Cases stored as `<id>.json` files in one directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            Error::StorageError(format!("cannot create {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn read_case(path: &Path) -> Result<Case> {
        let data = fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }
}

impl CaseStore for JsonFileStore {
    fn get(&self, id: Uuid) -> Result<Option<Case>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        Self::read_case(&path).map(Some)
    }

    fn put(&mut self, case: &Case) -> Result<()> {
        let path = self.path_for(case.id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(case)?)?;
        fs::rename(&tmp, &path)?;
        log::debug!("Saved case {} to {}", case.id, path.display());
        Ok(())
    }

    fn list(&self) -> Result<Vec<Case>> {
        let mut cases = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_case(&path) {
                Ok(case) => cases.push(case),
                Err(e) => log::warn!("Skipping unreadable case {}: {}", path.display(), e),
            }
        }
        newest_first(&mut cases);
        Ok(cases)
    }

    fn delete(&mut self, id: Uuid) -> Result<bool> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        Ok(true)
    }
}
