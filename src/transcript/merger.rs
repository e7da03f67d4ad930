use crate::protocol::TranscriptFragment;

/// Folds the service's unordered, revision-bearing fragment stream into a
/// single display-ready view: the latest fragment per id, ordered by start
/// offset.
///
/// Mutated only from the controller's inbound task; readers get snapshots.
pub struct TranscriptMerger {
    /// Sorted non-decreasing by `start_offset_ms`; ties stay in first-seen
    /// order so repeated renders never flicker.
    entries: Vec<TranscriptFragment>,
}

impl TranscriptMerger {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Apply one fragment: replace the existing entry with the same id, or
    /// insert a new one at its time-ordered position.
    ///
    /// A revision normally keeps its start offset, so replacement is
    /// in-place; if the offset did change, the entry is re-inserted at its
    /// new position. A fragment arriving after a final one for the same id
    /// still overwrites it.
    pub fn apply(&mut self, fragment: TranscriptFragment) {
        match self.entries.iter().position(|e| e.id == fragment.id) {
            Some(index) => {
                if self.entries[index].start_offset_ms == fragment.start_offset_ms {
                    self.entries[index] = fragment;
                } else {
                    self.entries.remove(index);
                    self.insert_ordered(fragment);
                }
            }
            None => self.insert_ordered(fragment),
        }
    }

    fn insert_ordered(&mut self, fragment: TranscriptFragment) {
        // First entry strictly later than the new one; inserting there keeps
        // equal offsets in arrival order.
        let index = self
            .entries
            .iter()
            .position(|e| e.start_offset_ms > fragment.start_offset_ms)
            .unwrap_or(self.entries.len());
        self.entries.insert(index, fragment);
    }

    /// The current ordered view, oldest utterance first.
    pub fn view(&self) -> &[TranscriptFragment] {
        &self.entries
    }

    /// Owned snapshot for handing across task boundaries.
    pub fn snapshot(&self) -> Vec<TranscriptFragment> {
        self.entries.clone()
    }

    /// Concatenated text of the current view, for the downstream
    /// note-generation call.
    pub fn full_text(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Discard all entries. Called when a new session starts.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for TranscriptMerger {
    fn default() -> Self {
        Self::new()
    }
}
