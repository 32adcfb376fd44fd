/// Position of a [`HistoryCursor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// One step past the oldest entry; shows an empty line
    BeforeOldest,
    Entry(usize),
    /// Past the newest entry, showing the text that was being typed
    Live,
}

/// Command history with shell-style navigation
///
/// Consecutive duplicate commands are stored once. Moving away from the live line keeps
/// what was typed so far, and moving back restores it.
#[derive(Debug)]
pub struct HistoryCursor {
    entries: Vec<String>,
    cursor: Cursor,
    scratch: String,
}

impl Default for HistoryCursor {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            cursor: Cursor::Live,
            scratch: String::new(),
        }
    }
}

impl HistoryCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, command: &str) {
        self.scratch.clear();
        if self.entries.last().map(String::as_str) != Some(command) {
            self.entries.push(command.to_string());
        }
        self.cursor = Cursor::Live;
    }

    /// Return to the live line and forget the draft
    pub fn reset(&mut self) {
        self.scratch.clear();
        self.cursor = Cursor::Live;
    }

    /// Step towards older entries
    pub fn older(&mut self, live_text: &str) -> String {
        if self.cursor == Cursor::Live {
            self.scratch = live_text.to_string();
        }

        let (cursor, text) = match self.cursor {
            Cursor::Live => match self.entries.len() {
                0 => (Cursor::BeforeOldest, String::new()),
                len => (Cursor::Entry(len - 1), self.entries[len - 1].clone()),
            },
            Cursor::Entry(0) | Cursor::BeforeOldest => (Cursor::BeforeOldest, String::new()),
            Cursor::Entry(i) => (Cursor::Entry(i - 1), self.entries[i - 1].clone()),
        };
        self.cursor = cursor;
        text
    }

    /// Step towards newer entries, ending at the text that was being typed
    pub fn newer(&mut self) -> String {
        let next = match self.cursor {
            Cursor::BeforeOldest => 0,
            Cursor::Entry(i) => i + 1,
            Cursor::Live => return self.scratch.clone(),
        };

        if next < self.entries.len() {
            self.cursor = Cursor::Entry(next);
            self.entries[next].clone()
        } else {
            self.cursor = Cursor::Live;
            self.scratch.clone()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
