//! Topic bookkeeping for a deck.
//!
//! `used` holds every topic that has been materialized into a slide;
//! `suggested` holds model suggestions in the order they arrived. Both are
//! de-duplicated, and a used topic is never offered again as a suggestion.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Used and suggested topics for one editing session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicTracker {
    #[serde(default)]
    used: IndexSet<String>,

    #[serde(default)]
    suggested: IndexSet<String>,
}

impl TopicTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a tracker from persisted lists.
    pub fn from_parts<U, S>(used: U, suggested: S) -> Self
    where
        U: IntoIterator<Item = String>,
        S: IntoIterator<Item = String>,
    {
        let mut tracker = Self {
            used: used.into_iter().collect(),
            suggested: IndexSet::new(),
        };
        tracker.merge_suggestions(suggested);
        tracker
    }

    pub fn used(&self) -> impl Iterator<Item = &str> {
        self.used.iter().map(String::as_str)
    }

    pub fn suggested(&self) -> impl Iterator<Item = &str> {
        self.suggested.iter().map(String::as_str)
    }

    pub fn is_used(&self, topic: &str) -> bool {
        self.used.contains(topic)
    }

    /// Union the given slide titles into the used set.
    ///
    /// Returns how many titles were new.
    pub fn absorb_titles<'a, I>(&mut self, titles: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let before = self.used.len();
        for title in titles {
            if !self.used.contains(title) {
                self.used.insert(title.to_string());
            }
            self.suggested.shift_remove(title);
        }
        self.used.len() - before
    }

    /// Append suggestions, skipping blanks, duplicates and used topics.
    ///
    /// Returns how many suggestions were added.
    pub fn merge_suggestions<I>(&mut self, incoming: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let before = self.suggested.len();
        for topic in incoming {
            let topic = topic.trim();
            if topic.is_empty() || self.used.contains(topic) {
                continue;
            }
            self.suggested.insert(topic.to_string());
        }
        self.suggested.len() - before
    }

    /// Topics the model must not suggest again: the outline, current
    /// suggestions and everything already used, without duplicates.
    pub fn exclusions(&self, outline: &[String]) -> Vec<String> {
        let mut excluded: IndexSet<&str> = outline.iter().map(String::as_str).collect();
        excluded.extend(self.suggested.iter().map(String::as_str));
        excluded.extend(self.used.iter().map(String::as_str));
        excluded.into_iter().map(str::to_string).collect()
    }
}
