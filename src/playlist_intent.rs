/// Playlist Command Recognition
///
/// Parses requests that create, delete, list or edit saved playlists, and
/// pulls the playlist name out of "play ... playlist" requests.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::music_intent::normalize;

/// Playlist operation requested by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistCommand {
    /// "(create|make) playlist {playlist}"
    Create { playlist: String },

    /// "(delete|remove) playlist {playlist}"
    Delete { playlist: String },

    /// "add {music} to playlist {playlist}"
    AddMusic { music: String, playlist: String },

    /// "(remove|delete) {music} from playlist {playlist}"
    RemoveMusic { music: String, playlist: String },

    /// "list (my|) playlists", "what playlists do i have"
    List,

    /// Create/delete without a name
    MissingName,

    /// "add ..." without "to playlist"
    MissingToPlaylist,

    /// "remove ..." without "from playlist"
    MissingFromPlaylist,

    /// Not a playlist command
    Unrecognized,
}

// "to" is often heard as "two" or "2"
static RE_TO_PLAYLIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" (?:to|two|2) playlist(?: |$)").unwrap());

static RE_FROM_PLAYLIST: Lazy<Regex> = Lazy::new(|| Regex::new(r" from playlist(?: |$)").unwrap());

/// Parse a playlist manipulation utterance
pub fn parse_playlist_command(utterance: &str) -> PlaylistCommand {
    let text = normalize(utterance);
    let words: Vec<&str> = text.split(' ').filter(|w| !w.is_empty()).collect();

    let Some(first) = words.first() else {
        return PlaylistCommand::Unrecognized;
    };

    match *first {
        "create" | "make" => {
            let playlist = name_after_keyword(&words[1..]);
            if playlist.is_empty() {
                PlaylistCommand::MissingName
            } else {
                PlaylistCommand::Create { playlist }
            }
        }
        "remove" | "delete" => {
            if words.get(1) == Some(&"playlist") {
                let playlist = words[2..].join(" ");
                if playlist.is_empty() {
                    PlaylistCommand::MissingName
                } else {
                    PlaylistCommand::Delete { playlist }
                }
            } else {
                split_music_and_playlist(&words[1..].join(" "), &RE_FROM_PLAYLIST)
                    .map(|(music, playlist)| PlaylistCommand::RemoveMusic { music, playlist })
                    .unwrap_or(PlaylistCommand::MissingFromPlaylist)
            }
        }
        "add" | "ad" | "at" | "i'd" => split_music_and_playlist(&words[1..].join(" "), &RE_TO_PLAYLIST)
            .map(|(music, playlist)| PlaylistCommand::AddMusic { music, playlist })
            .unwrap_or(PlaylistCommand::MissingToPlaylist),
        "list" | "what" => PlaylistCommand::List,
        _ => PlaylistCommand::Unrecognized,
    }
}

/// Extract the playlist name from a "play ... playlist ..." request
///
/// Leading "play", "my", "the" and "playlist" words and a trailing
/// "playlist" are dropped: "play my road trip playlist" -> "road trip".
pub fn parse_playlist_request(sentence: &str) -> String {
    let text = normalize(sentence);
    let mut words: Vec<&str> = text.split(' ').filter(|w| !w.is_empty()).collect();

    while let Some(first) = words.first() {
        if matches!(*first, "play" | "my" | "the" | "playlist" | "start") {
            words.remove(0);
        } else {
            break;
        }
    }
    while words.last() == Some(&"playlist") {
        words.pop();
    }

    words.join(" ")
}

/// Skip the word "playlist" after the verb when present
fn name_after_keyword(words: &[&str]) -> String {
    match words.first() {
        Some(&"playlist") => words[1..].join(" "),
        _ => words.join(" "),
    }
}

fn split_music_and_playlist(phrase: &str, separator: &Regex) -> Option<(String, String)> {
    let mut parts = separator.splitn(phrase, 2);
    let music = parts.next()?.trim().to_string();
    let playlist = parts.next()?.trim().to_string();
    if music.is_empty() || playlist.is_empty() {
        log::info!("Playlist phrase is missing a slot: '{}'", phrase);
        return None;
    }
    Some((music, playlist))
}
