use crate::model::{Speaker, TurnEntry};

/// Conversation turns, oldest first. Grows by appending only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transcript {
    entries: Vec<TurnEntry>,
}

impl Transcript {
    pub fn entries(&self) -> &[TurnEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TurnEntry> {
        self.entries.last()
    }

    /// Number of turns authored by `speaker`.
    pub fn count(&self, speaker: Speaker) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.speaker == speaker)
            .count()
    }

    pub(super) fn push(&mut self, entry: TurnEntry) {
        self.entries.push(entry);
    }

    /// Place stored history (newest first) ahead of the turns already present.
    pub(super) fn hydrate(&mut self, newest_first: Vec<TurnEntry>) {
        let mut entries: Vec<TurnEntry> = newest_first.into_iter().rev().collect();
        entries.append(&mut self.entries);
        self.entries = entries;
    }
}
