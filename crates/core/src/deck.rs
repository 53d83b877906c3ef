//! Slide deck editing engine.
//!
//! The [`Deck`] is the canonical in-memory presentation for one editing
//! session. Slides are correlated by a synthetic [`SlideId`] assigned when they
//! enter the deck, so duplicate titles never confuse reordering, selection or
//! placeholder resolution. Every mutating operation validates its arguments
//! before touching state: on error the deck is unchanged.

use crate::topics::TopicTracker;
use crate::types::Slide;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Content written into a placeholder whose generation failed.
pub const GENERATION_FAILED_TEXT: &str = "Failed to generate content.";

/// Stable identity of a slide within one deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlideId(u64);

impl fmt::Display for SlideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a single slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlideState {
    /// Inserted with empty content while generation is pending.
    Placeholder,
    /// Holds validated content.
    Populated,
    /// Generation failed; the slide shows an error paragraph.
    Failed(String),
}

/// A slide together with its identity and lifecycle state.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckEntry {
    id: SlideId,
    state: SlideState,
    slide: Slide,
}

impl DeckEntry {
    pub fn id(&self) -> SlideId {
        self.id
    }

    pub fn state(&self) -> &SlideState {
        &self.state
    }

    pub fn slide(&self) -> &Slide {
        &self.slide
    }
}

/// Batched modification requested from the AI collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyAction {
    /// Regenerate the selected slides, same titles, same count.
    ReplaceContent,
    /// Enrich the content of the selected slides in place.
    ExpandSelected,
    /// Expand the selected topics, possibly into more slides.
    ExpandContent,
}

impl ModifyAction {
    /// The action tag sent to the collaborator.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ReplaceContent => "replace_content",
            Self::ExpandSelected => "expand_selected",
            Self::ExpandContent => "expand_content",
        }
    }
}

impl fmt::Display for ModifyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Serialize)]
struct RawDeck<'a> {
    slides: Vec<&'a Slide>,
}

/// Ordered slides, selection and topic state of one editing session.
#[derive(Debug, Clone, Default)]
pub struct Deck {
    entries: Vec<DeckEntry>,
    next_id: u64,
    selection: HashSet<SlideId>,
    topics: TopicTracker,
}

impl Deck {
    /// Create an empty deck.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a deck from validated slides.
    pub fn from_slides(slides: Vec<Slide>) -> Self {
        Self::with_topics(slides, TopicTracker::new())
    }

    /// Create a deck from validated slides and previously tracked topics.
    pub fn with_topics(slides: Vec<Slide>, topics: TopicTracker) -> Self {
        let mut deck = Self {
            topics,
            ..Self::default()
        };
        for slide in slides {
            deck.push_entry(slide, SlideState::Populated);
        }
        deck.sync_topics();
        deck
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[DeckEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&DeckEntry> {
        self.entries.get(index)
    }

    pub fn slide(&self, index: usize) -> Option<&Slide> {
        self.entries.get(index).map(|e| &e.slide)
    }

    /// Slides in display order.
    pub fn slides(&self) -> impl Iterator<Item = &Slide> {
        self.entries.iter().map(|e| &e.slide)
    }

    /// Owned copy of the slides in display order.
    pub fn to_slides(&self) -> Vec<Slide> {
        self.slides().cloned().collect()
    }

    pub fn topics(&self) -> &TopicTracker {
        &self.topics
    }

    pub fn topics_mut(&mut self) -> &mut TopicTracker {
        &mut self.topics
    }

    /// Current position of a slide.
    pub fn position(&self, id: SlideId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn id_at(&self, index: usize) -> Option<SlideId> {
        self.entries.get(index).map(|e| e.id)
    }

    /// Append a populated slide.
    pub fn push_slide(&mut self, slide: Slide) -> SlideId {
        let id = self.push_entry(slide, SlideState::Populated);
        self.sync_topics();
        id
    }

    /// Move the slide at `from` so that it ends up at `to`.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }

        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        log::debug!("Moved slide {} -> {}", from, to);
        Ok(())
    }

    /// Drag-and-drop reorder: move `active` to where `over` currently is.
    pub fn reorder_by_id(&mut self, active: SlideId, over: SlideId) -> Result<()> {
        let from = self.require_position(active)?;
        let to = self.require_position(over)?;
        self.reorder(from, to)
    }

    /// Delete one slide. Remaining selected slides keep their selection.
    pub fn remove(&mut self, index: usize) -> Result<Slide> {
        self.check_index(index)?;
        let entry = self.entries.remove(index);
        self.selection.remove(&entry.id);
        Ok(entry.slide)
    }

    /// Delete every slide at the given indices in one pass.
    ///
    /// Survivors keep their relative order. Any out-of-range index fails the
    /// whole call.
    pub fn remove_selected(&mut self, indices: &BTreeSet<usize>) -> Result<Vec<Slide>> {
        if let Some(&last) = indices.iter().next_back() {
            self.check_index(last)?;
        }

        let mut removed = Vec::with_capacity(indices.len());
        let mut kept = Vec::with_capacity(self.entries.len() - indices.len());
        for (index, entry) in std::mem::take(&mut self.entries).into_iter().enumerate() {
            if indices.contains(&index) {
                self.selection.remove(&entry.id);
                removed.push(entry.slide);
            } else {
                kept.push(entry);
            }
        }
        self.entries = kept;

        log::debug!("Removed {} slide(s)", removed.len());
        Ok(removed)
    }

    /// Delete the currently selected slides.
    pub fn remove_selection(&mut self) -> Result<Vec<Slide>> {
        let indices: BTreeSet<usize> = self.selected_indices().into_iter().collect();
        self.remove_selected(&indices)
    }

    /// Select or deselect the slide at `index`.
    pub fn select(&mut self, index: usize, selected: bool) -> Result<()> {
        self.check_index(index)?;
        let id = self.entries[index].id;
        if selected {
            self.selection.insert(id);
        } else {
            self.selection.remove(&id);
        }
        Ok(())
    }

    /// Select every slide, or clear the selection.
    pub fn select_all(&mut self, selected: bool) {
        self.selection.clear();
        if selected {
            self.selection.extend(self.entries.iter().map(|e| e.id));
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.entries
            .get(index)
            .is_some_and(|e| self.selection.contains(&e.id))
    }

    /// Positions of the selected slides, ascending.
    pub fn selected_indices(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| self.selection.contains(&e.id))
            .map(|(i, _)| i)
            .collect()
    }

    /// Append one empty placeholder per topic, returning their ids in order.
    pub fn push_placeholders(&mut self, topics: &[String]) -> Vec<SlideId> {
        let ids = topics
            .iter()
            .map(|topic| self.push_entry(Slide::new(topic.as_str()), SlideState::Placeholder))
            .collect();
        self.sync_topics();
        ids
    }

    /// Apply the outcome of a placeholder's generation.
    ///
    /// Returns `false` when the slot no longer exists or is not a placeholder
    /// (deleted or already resolved while the request was in flight).
    pub fn resolve_placeholder(
        &mut self,
        id: SlideId,
        outcome: std::result::Result<Slide, String>,
    ) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            log::debug!("Placeholder {} vanished before its generation completed", id);
            return false;
        };
        if entry.state != SlideState::Placeholder {
            return false;
        }

        match outcome {
            Ok(slide) => {
                entry.slide = slide;
                entry.state = SlideState::Populated;
            }
            Err(reason) => {
                log::warn!("Generation failed for '{}': {}", entry.slide.title, reason);
                entry.slide =
                    Slide::with_message(entry.slide.title.clone(), GENERATION_FAILED_TEXT);
                entry.state = SlideState::Failed(reason);
            }
        }
        self.sync_topics();
        true
    }

    /// Validate a selection for a batched modification.
    ///
    /// Returns the indices sorted and de-duplicated.
    pub fn modification_targets(&self, indices: &[usize]) -> Result<Vec<usize>> {
        if indices.is_empty() {
            return Err(Error::ModificationError("no slides selected".to_string()));
        }
        let targets: BTreeSet<usize> = indices.iter().copied().collect();
        for &index in &targets {
            self.check_index(index)?;
        }
        Ok(targets.into_iter().collect())
    }

    /// Replace the whole deck with a collaborator-provided array.
    ///
    /// An empty array is rejected and leaves the deck unchanged.
    pub fn replace_all(&mut self, slides: Vec<Slide>) -> Result<()> {
        if slides.is_empty() {
            return Err(Error::ModificationError(
                "collaborator returned no slides".to_string(),
            ));
        }

        self.entries.clear();
        self.selection.clear();
        for slide in slides {
            self.push_entry(slide, SlideState::Populated);
        }
        self.sync_topics();
        Ok(())
    }

    /// The deck as `{"slides": [...]}`, pretty printed.
    pub fn raw_json(&self) -> Result<String> {
        let raw = RawDeck {
            slides: self.slides().collect(),
        };
        Ok(serde_json::to_string_pretty(&raw)?)
    }

    fn push_entry(&mut self, slide: Slide, state: SlideState) -> SlideId {
        let id = SlideId(self.next_id);
        self.next_id += 1;
        self.entries.push(DeckEntry { id, state, slide });
        id
    }

    fn sync_topics(&mut self) {
        let titles = self.entries.iter().map(|e| e.slide.title.as_str());
        self.topics.absorb_titles(titles);
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.entries.len() {
            Ok(())
        } else {
            Err(Error::IndexError {
                index,
                len: self.entries.len(),
            })
        }
    }

    fn require_position(&self, id: SlideId) -> Result<usize> {
        self.position(id)
            .ok_or_else(|| Error::ModificationError(format!("slide {} is not in the deck", id)))
    }
}
