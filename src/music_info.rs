/// Result bundle handed from a search to the play callback
///
/// A bundle says what kind of match was found, what (if anything) should be
/// spoken first, and what to enqueue.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::SkillError;
use crate::track::Track;

/// Kind of match a search produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Album,
    Artist,
    Track,
    Song,
    Random,
    Genre,
    Playlist,
    EmptyPlaylist,
    PlaylistOp,
    Radio,
    Internet,
    News,
    Next,
    Prev,
    Control,
    None,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchType::Album => "album",
            MatchType::Artist => "artist",
            MatchType::Track => "track",
            MatchType::Song => "song",
            MatchType::Random => "random",
            MatchType::Genre => "genre",
            MatchType::Playlist => "playlist",
            MatchType::EmptyPlaylist => "empty_playlist",
            MatchType::PlaylistOp => "playlist_op",
            MatchType::Radio => "radio",
            MatchType::Internet => "internet",
            MatchType::News => "news",
            MatchType::Next => "next",
            MatchType::Prev => "prev",
            MatchType::Control => "control",
            MatchType::None => "none",
        };
        write!(f, "{}", name)
    }
}

/// A message key plus the values substituted into its dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub key: String,
    pub values: BTreeMap<String, String>,
}

impl Message {
    pub fn new(key: impl Into<String>) -> Self {
        Message {
            key: key.into(),
            values: BTreeMap::new(),
        }
    }

    /// Add a substitution value
    pub fn with(mut self, name: &str, value: impl ToString) -> Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// What to tell the user when a request failed
    pub fn from_error(err: &SkillError) -> Self {
        match err {
            SkillError::Player { cmd, code } => Message::new("mpc_failed").with("cmd", cmd).with("rc", code),
            SkillError::Spawn { program, .. } => Message::new("mpc_failed")
                .with("cmd", program)
                .with("rc", err.return_code()),
            other => Message::new("internal_error").with("error", other),
        }
    }
}

/// The outcome of one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicInfo {
    pub match_type: MatchType,
    pub message: Option<Message>,
    /// `None` when there is nothing to play
    pub tracks: Option<Vec<Track>>,
}

impl MusicInfo {
    pub fn new(match_type: MatchType, message: Option<Message>, tracks: Option<Vec<Track>>) -> Self {
        MusicInfo {
            match_type,
            message,
            tracks,
        }
    }

    /// Something to play, with a message to speak first
    pub fn found(match_type: MatchType, message: Message, tracks: Vec<Track>) -> Self {
        Self::new(match_type, Some(message), Some(tracks))
    }

    /// Nothing found; only the message is spoken
    pub fn not_found(message: Message) -> Self {
        Self::new(MatchType::None, Some(message), None)
    }

    /// Result of a playlist operation: a message and no music
    pub fn playlist_op(message: Message) -> Self {
        Self::new(MatchType::PlaylistOp, Some(message), Some(Vec::new()))
    }

    /// A failure turned into something the user can be told
    pub fn from_error(err: &SkillError) -> Self {
        log::error!("Request failed: {}", err);
        Self::not_found(Message::from_error(err))
    }

    /// Initial state before any search ran
    pub fn empty() -> Self {
        Self::new(MatchType::None, None, None)
    }

    pub fn message_key(&self) -> Option<&str> {
        self.message.as_ref().map(|m| m.key.as_str())
    }

    pub fn has_tracks(&self) -> bool {
        self.tracks.as_ref().map_or(false, |t| !t.is_empty())
    }

    pub fn track_count(&self) -> usize {
        self.tracks.as_ref().map_or(0, Vec::len)
    }
}
