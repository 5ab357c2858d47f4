// Chat bubble state: composing, timed display, and slash-command interception.

use super::character;
use std::time::Duration;

/// Maximum characters a single chat message may hold.
pub const MAX_MESSAGE_CHARS: usize = 50;
/// How long a committed or received message stays visible.
pub const DEFAULT_VISIBLE_DURATION: Duration = Duration::from_millis(5000);
/// Bubble wrap width for the renderer, in pixels.
pub const DEFAULT_MAX_WIDTH: f32 = 150.0;

const COMMANDS: &[(&str, &str)] = &[
    ("/sit", character::SIT),
    ("/stand", character::SIT_TO_STAND),
    ("/cry", character::CRY),
    ("/dance", character::DANCE),
];

/// Maps a slash token to the emote it triggers.
pub fn emote_for_command(text: &str) -> Option<&'static str> {
    let token = text.trim();
    COMMANDS
        .iter()
        .find(|(command, _)| token.eq_ignore_ascii_case(command))
        .map(|(_, emote)| *emote)
}

/// Side effect produced when the local player finishes composing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Nothing,
    Send(String),
    Emote(&'static str),
}

/// What the renderer should draw above an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatDisplay {
    pub text: String,
    pub typing_indicator: bool,
    pub max_width: f32,
}

#[derive(Debug, Clone)]
pub struct EphemeralMessage {
    text: String,
    is_composing: bool,
    // Typing flag mirrored from the store for entities this process does not control.
    remote_composing: bool,
    visible_elapsed: Duration,
    visible_duration: Duration,
    max_width: f32,
}

impl Default for EphemeralMessage {
    fn default() -> Self {
        Self::new(DEFAULT_VISIBLE_DURATION)
    }
}

impl EphemeralMessage {
    pub fn new(visible_duration: Duration) -> Self {
        Self {
            text: String::new(),
            is_composing: false,
            remote_composing: false,
            visible_elapsed: Duration::ZERO,
            visible_duration,
            max_width: DEFAULT_MAX_WIDTH,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_composing(&self) -> bool {
        self.is_composing
    }

    pub fn is_remote_composing(&self) -> bool {
        self.remote_composing
    }

    pub fn start_composing(&mut self) {
        self.is_composing = true;
        self.text.clear();
        self.visible_elapsed = Duration::ZERO;
    }

    /// Appends a printable character while composing. Returns whether it was accepted.
    pub fn append_char(&mut self, c: char) -> bool {
        if !self.is_composing || c.is_control() {
            return false;
        }
        if self.text.chars().count() >= MAX_MESSAGE_CHARS {
            return false;
        }
        self.text.push(c);
        true
    }

    pub fn backspace(&mut self) -> bool {
        if !self.is_composing {
            return false;
        }
        self.text.pop().is_some()
    }

    /// Leaves composing mode. Command tokens are swallowed and turned into emotes.
    pub fn commit(&mut self) -> ChatOutcome {
        if !self.is_composing {
            return ChatOutcome::Nothing;
        }
        self.is_composing = false;
        self.visible_elapsed = Duration::ZERO;

        if let Some(emote) = emote_for_command(&self.text) {
            self.text.clear();
            return ChatOutcome::Emote(emote);
        }

        if self.text.trim().is_empty() {
            self.text.clear();
            return ChatOutcome::Nothing;
        }

        ChatOutcome::Send(self.text.clone())
    }

    /// Shows a broadcast message. Re-delivery of the current text does not restart the timer.
    pub fn set_remote_display(&mut self, text: &str) -> bool {
        let text: String = text.chars().take(MAX_MESSAGE_CHARS).collect();
        if self.text == text {
            return false;
        }
        self.text = text;
        self.is_composing = false;
        self.visible_elapsed = Duration::ZERO;
        true
    }

    pub fn set_remote_composing(&mut self, composing: bool) {
        self.remote_composing = composing;
    }

    pub fn update(&mut self, delta: Duration) {
        if self.is_composing || self.text.is_empty() {
            return;
        }
        self.visible_elapsed = self.visible_elapsed.saturating_add(delta);
        if self.visible_elapsed >= self.visible_duration {
            self.text.clear();
            self.visible_elapsed = Duration::ZERO;
        }
    }

    /// Resolves the bubble contents. The local player always sees their own draft; remote
    /// viewers only get the typing indicator when no earlier message is still visible.
    pub fn display(&self, is_local: bool) -> Option<ChatDisplay> {
        if is_local && self.is_composing {
            return Some(self.bubble(self.text.clone(), true));
        }
        if !self.text.is_empty() {
            return Some(self.bubble(self.text.clone(), false));
        }
        if !is_local && self.remote_composing {
            return Some(self.bubble(String::new(), true));
        }
        None
    }

    fn bubble(&self, text: String, typing_indicator: bool) -> ChatDisplay {
        ChatDisplay {
            text,
            typing_indicator,
            max_width: self.max_width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn composed(text: &str) -> EphemeralMessage {
        let mut message = EphemeralMessage::default();
        message.start_composing();
        for c in text.chars() {
            message.append_char(c);
        }
        message
    }

    #[test]
    fn when_message_is_displayed_then_it_expires_after_exactly_the_visible_duration() {
        let mut message = composed("hello");
        assert_eq!(message.commit(), ChatOutcome::Send("hello".to_string()));

        message.update(ms(4999));
        assert_eq!(message.text(), "hello");

        message.update(ms(1));
        assert_eq!(message.text(), "");
    }

    #[test]
    fn when_composing_then_the_display_timer_does_not_run() {
        let mut message = composed("draft");
        message.update(ms(10_000));

        assert!(message.is_composing());
        assert_eq!(message.text(), "draft");
    }

    #[test]
    fn when_composition_starts_then_the_visible_message_is_cleared() {
        let mut message = EphemeralMessage::default();
        message.set_remote_display("old news");
        message.update(ms(3000));

        message.start_composing();
        assert_eq!(message.text(), "");

        // The countdown restarts from zero for the next message.
        message.append_char('x');
        message.commit();
        message.update(ms(4999));
        assert_eq!(message.text(), "x");
    }

    #[test]
    fn when_text_reaches_the_limit_then_further_characters_are_rejected() {
        let mut message = composed(&"a".repeat(MAX_MESSAGE_CHARS));

        assert!(!message.append_char('b'));
        assert_eq!(message.text().chars().count(), MAX_MESSAGE_CHARS);
        assert!(message.backspace());
        assert!(message.append_char('b'));
    }

    #[test]
    fn when_not_composing_then_edits_are_ignored() {
        let mut message = EphemeralMessage::default();

        assert!(!message.append_char('a'));
        assert!(!message.backspace());
        assert_eq!(message.text(), "");
    }

    #[test]
    fn when_committing_a_command_then_an_emote_is_emitted_instead_of_chat() {
        let mut message = composed("/dance");

        assert_eq!(message.commit(), ChatOutcome::Emote(character::DANCE));
        assert_eq!(message.text(), "");
        assert!(message.display(true).is_none());
    }

    #[test]
    fn when_committing_blank_text_then_nothing_is_sent() {
        let mut message = composed("   ");

        assert_eq!(message.commit(), ChatOutcome::Nothing);
        assert_eq!(message.text(), "");
    }

    #[test]
    fn when_remote_text_repeats_then_the_countdown_is_not_restarted() {
        let mut message = EphemeralMessage::default();
        assert!(message.set_remote_display("hi"));
        message.update(ms(3000));

        assert!(!message.set_remote_display("hi"));
        message.update(ms(2000));
        assert_eq!(message.text(), "");
    }

    #[test]
    fn when_long_remote_text_repeats_then_the_countdown_is_not_restarted() {
        let long = "x".repeat(MAX_MESSAGE_CHARS + 10);
        let mut message = EphemeralMessage::default();
        assert!(message.set_remote_display(&long));
        assert_eq!(message.text().chars().count(), MAX_MESSAGE_CHARS);
        message.update(ms(4000));

        assert!(!message.set_remote_display(&long));
        message.update(ms(1500));
        assert_eq!(message.text(), "");
    }

    #[test]
    fn when_remote_text_changes_then_the_countdown_restarts() {
        let mut message = EphemeralMessage::default();
        message.set_remote_display("hi");
        message.update(ms(3000));

        assert!(message.set_remote_display("there"));
        message.update(ms(3000));
        assert_eq!(message.text(), "there");
    }

    #[test]
    fn when_remote_is_typing_over_a_visible_message_then_no_indicator_is_shown() {
        let mut message = EphemeralMessage::default();
        message.set_remote_display("still here");
        message.set_remote_composing(true);

        let shown = message.display(false).expect("message visible");
        assert_eq!(shown.text, "still here");
        assert!(!shown.typing_indicator);

        message.update(DEFAULT_VISIBLE_DURATION);
        let shown = message.display(false).expect("indicator visible");
        assert_eq!(shown.text, "");
        assert!(shown.typing_indicator);
    }

    #[test]
    fn when_local_player_composes_then_the_draft_and_indicator_are_shown() {
        let message = composed("typing");

        let shown = message.display(true).expect("draft visible");
        assert_eq!(shown.text, "typing");
        assert!(shown.typing_indicator);
        assert_eq!(shown.max_width, DEFAULT_MAX_WIDTH);
    }

    #[test]
    fn command_tokens_are_matched_case_insensitively_with_whitespace() {
        assert_eq!(emote_for_command("  /SIT "), Some(character::SIT));
        assert_eq!(emote_for_command("/sit down"), None);
        assert_eq!(emote_for_command("sit"), None);
    }
}
