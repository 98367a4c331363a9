use serde::{Deserialize, Serialize};

/// Number of turns retained and rendered into each prompt.
pub const MAX_HISTORY: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// Ordered turn log, trimmed to the most recent [`MAX_HISTORY`] entries.
///
/// Not persisted; history resets with the process.
#[derive(Debug, Default)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Append a user turn and trim.
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(Role::User, text);
    }

    /// Append an assistant turn and trim.
    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.push(Role::Assistant, text);
    }

    fn push(&mut self, role: Role, text: impl Into<String>) {
        self.turns.push(Turn {
            role,
            text: text.into(),
        });
        if self.turns.len() > MAX_HISTORY {
            let excess = self.turns.len() - MAX_HISTORY;
            self.turns.drain(..excess);
        }
    }

    /// Render the retained turns into a single prompt.
    ///
    /// Layout: optional system instructions first, then a labelled line per
    /// retained turn, then a trailing `Assistant:` cue. Blocks are joined by
    /// blank lines.
    pub fn render_prompt(&self, system_prompt: Option<&str>) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(self.turns.len() + 2);

        if let Some(system) = system_prompt.filter(|s| !s.is_empty()) {
            parts.push(format!("System Instructions: {system}\n"));
        }
        for turn in &self.turns {
            parts.push(format!("{}: {}", turn.role.label(), turn.text));
        }
        parts.push("Assistant:".to_string());

        parts.join("\n\n")
    }
}
