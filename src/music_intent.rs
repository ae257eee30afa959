// Music Intent Recognition
//
// This module classifies spoken music requests and extracts the search terms
// from library play phrases. Parsing is keyword stripping: known leading
// words ("album", "track", "artist", ...) pick the kind of lookup and the
// word "by" separates the music name from the artist name.

use once_cell::sync::Lazy;
use regex::Regex;

/// Coarse classification of an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    /// Transport control passed straight to the player
    Control(PlayerControl),

    /// Create, delete, list or edit saved playlists
    PlaylistOp,

    /// Play something from the local library
    Music,

    /// Play an internet radio station
    Radio,

    /// Search the internet for music
    Internet,

    /// Play the latest news bulletin
    News,

    /// Play a saved playlist
    Playlist,
}

/// Player transport commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerControl {
    Pause,
    Stop,
    Resume,
    Next,
    Previous,
}

impl PlayerControl {
    /// Recognize a whole utterance as a transport command
    pub fn parse(text: &str) -> Option<Self> {
        match normalize(text).as_str() {
            "pause" | "pause music" | "pause the music" => Some(PlayerControl::Pause),
            "stop" | "stop music" | "stop the music" | "stop playing" => Some(PlayerControl::Stop),
            "resume" | "continue" | "unpause" | "resume music" | "continue music" => {
                Some(PlayerControl::Resume)
            }
            "next" | "skip" | "next song" | "next track" | "skip song" | "skip track" => {
                Some(PlayerControl::Next)
            }
            "previous" | "previous song" | "previous track" | "go back" | "last song"
            | "last track" => Some(PlayerControl::Previous),
            _ => None,
        }
    }

    /// The `mpc` sub-command for this control
    pub fn mpc_verb(&self) -> &'static str {
        match self {
            PlayerControl::Pause => "pause",
            PlayerControl::Stop => "stop",
            PlayerControl::Resume => "play",
            PlayerControl::Next => "next",
            PlayerControl::Previous => "prev",
        }
    }
}

/// A library lookup extracted from a play phrase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MusicQuery {
    /// "album {album}"
    Album { album: String },

    /// "album {album} by {artist}"
    AlbumArtist { album: String, artist: String },

    /// "artist {artist}"
    Artist { artist: String },

    /// "genre {genre}"
    Genre { genre: String },

    /// "(any|all|my|random|some) music"
    AllMusic,

    /// "playlist {playlist}"
    Playlist { playlist: String },

    /// "track {track}"
    Track { track: String },

    /// "track {track} by {artist}"
    TrackArtist { track: String, artist: String },

    /// No keyword: could be an album, an artist or a track
    Unknown { music: String },

    /// No keyword but an artist after "by"
    UnknownArtist { music: String, artist: String },
}

impl MusicQuery {
    /// Canonical phrase for this query
    ///
    /// Parsing the returned phrase yields the same query again.
    pub fn to_phrase(&self) -> String {
        let phrase = match self {
            MusicQuery::Album { album } => format!("album {}", album),
            MusicQuery::AlbumArtist { album, artist } => format!("album {} by {}", album, artist),
            MusicQuery::Artist { artist } => format!("artist {}", artist),
            MusicQuery::Genre { genre } => format!("genre {}", genre),
            MusicQuery::AllMusic => "music".to_string(),
            MusicQuery::Playlist { playlist } => format!("playlist {}", playlist),
            MusicQuery::Track { track } => format!("track {}", track),
            MusicQuery::TrackArtist { track, artist } => format!("track {} by {}", track, artist),
            MusicQuery::Unknown { music } => music.clone(),
            MusicQuery::UnknownArtist { music, artist } => format!("{} by {}", music, artist),
        };
        // The parser drops one leading "play", so names starting with it survive
        format!("play {}", phrase)
    }
}

/// Outcome of parsing a library phrase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryParse {
    Query(MusicQuery),

    /// Only a bare keyword was given ("play album")
    NotEnoughInfo { phrase: String },
}

/// Music intent parser
pub struct MusicIntentParser;

/// First words that start a playlist operation ("add" is often heard as "at" or "I'd")
const PLAYLIST_VERBS: &[&str] = &[
    "create", "make", "add", "ad", "at", "i'd", "delete", "remove", "list", "what",
];

/// Phrases meaning "play anything from the library"
const ALL_MUSIC_PHRASES: &[&str] = &[
    "any music",
    "all music",
    "my music",
    "random music",
    "some music",
    "music",
];

/// Bare keywords that carry no search term on their own
const BARE_KEYWORDS: &[&str] = &[
    "album", "record", "track", "song", "title", "artist", "band", "genre", "johnra", "playlist",
];

static RE_BY: Lazy<Regex> = Lazy::new(|| Regex::new(r" by ").unwrap());

static RE_SONG_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(track|song|title|album|record|artist|band)s?\b").unwrap());

static RE_INTERNET_RADIO: Lazy<Regex> = Lazy::new(|| Regex::new(r"\binternet radio\b").unwrap());

static RE_INTERNET: Lazy<Regex> = Lazy::new(|| Regex::new(r"\binternet\b").unwrap());

static RE_RADIO: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:radio|station)\b").unwrap());

static RE_NEWS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(news|npr|n p r)\b").unwrap());

static RE_PLAYLIST: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bplaylists?\b").unwrap());

// Leading keywords, group 1 is everything after the keyword
static RE_LEADING_ALBUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:album|record) (.+)$").unwrap());

static RE_LEADING_TRACK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:track|tracked|song|title) (.+)$").unwrap());

static RE_LEADING_ARTIST: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:artist|band) (.+)$").unwrap());

static RE_LEADING_GENRE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:genre|johnra) (.+)$").unwrap());

static RE_LEADING_PLAYLIST: Lazy<Regex> = Lazy::new(|| Regex::new(r"^playlist (.+)$").unwrap());

impl MusicIntentParser {
    /// Pick the coarse request type of an utterance
    pub fn classify(sentence: &str) -> RequestType {
        let text = normalize(sentence);

        if let Some(control) = PlayerControl::parse(&text) {
            return RequestType::Control(control);
        }

        let first_word = text.split(' ').next().unwrap_or("");
        if PLAYLIST_VERBS.contains(&first_word) {
            return RequestType::PlaylistOp;
        }

        // Music keywords win over "radio" so "play the album radio gaga" stays in the library
        if RE_INTERNET_RADIO.is_match(&text) {
            RequestType::Radio
        } else if RE_INTERNET.is_match(&text) {
            RequestType::Internet
        } else if RE_SONG_WORDS.is_match(&text) {
            RequestType::Music
        } else if RE_RADIO.is_match(&text) {
            RequestType::Radio
        } else if RE_NEWS.is_match(&text) {
            RequestType::News
        } else if RE_PLAYLIST.is_match(&text) {
            RequestType::Playlist
        } else {
            RequestType::Music
        }
    }

    /// Parse a library play phrase into a lookup
    ///
    /// # Examples
    ///
    /// ```
    /// use local_music_skill::music_intent::{LibraryParse, MusicIntentParser, MusicQuery};
    ///
    /// let parsed = MusicIntentParser::parse_library_phrase("play album abbey road by the beatles");
    /// assert_eq!(
    ///     parsed,
    ///     LibraryParse::Query(MusicQuery::AlbumArtist {
    ///         album: "abbey road".to_string(),
    ///         artist: "the beatles".to_string(),
    ///     })
    /// );
    /// ```
    pub fn parse_library_phrase(phrase: &str) -> LibraryParse {
        let text = normalize(phrase);

        let phrase = match text.strip_prefix("play") {
            Some("") => {
                return LibraryParse::NotEnoughInfo {
                    phrase: "play".to_string(),
                }
            }
            Some(rest) if rest.starts_with(' ') => rest.trim_start().to_string(),
            _ => text.clone(),
        };

        // A bare keyword says what kind of music but not which
        if BARE_KEYWORDS.contains(&phrase.as_str()) {
            let phrase = if phrase == "johnra" { "genre".to_string() } else { phrase };
            log::info!("Not enough information in phrase: {}", phrase);
            return LibraryParse::NotEnoughInfo { phrase };
        }

        let (music_name, artist_name) = Self::split_by_artist(&phrase);

        let artist_name = match artist_name {
            Some(artist) => Some(Self::strip_artist_keyword(&artist)),
            None => {
                if ALL_MUSIC_PHRASES.contains(&music_name.as_str()) {
                    return LibraryParse::Query(MusicQuery::AllMusic);
                }
                if let Some(genre) = Self::capture(&RE_LEADING_GENRE, &music_name) {
                    return LibraryParse::Query(MusicQuery::Genre { genre });
                }
                if let Some(playlist) = Self::capture(&RE_LEADING_PLAYLIST, &music_name) {
                    return LibraryParse::Query(MusicQuery::Playlist { playlist });
                }
                None
            }
        };

        let query = if let Some(album) = Self::capture(&RE_LEADING_ALBUM, &music_name) {
            match artist_name {
                Some(artist) => MusicQuery::AlbumArtist { album, artist },
                None => MusicQuery::Album { album },
            }
        } else if let Some(track) = Self::capture(&RE_LEADING_TRACK, &music_name) {
            match artist_name {
                Some(artist) => MusicQuery::TrackArtist { track, artist },
                None => MusicQuery::Track { track },
            }
        } else if let Some(artist) = Self::capture(&RE_LEADING_ARTIST, &music_name) {
            MusicQuery::Artist { artist }
        } else {
            match artist_name {
                // "play songs by queen", "play music by queen"
                Some(artist) if Self::is_generic_music(&music_name) => MusicQuery::Artist { artist },
                Some(artist) => MusicQuery::UnknownArtist {
                    music: music_name,
                    artist,
                },
                None => MusicQuery::Unknown { music: music_name },
            }
        };

        log::debug!("Parsed library phrase '{}' as {:?}", phrase, query);
        LibraryParse::Query(query)
    }

    /// Split "{music} by {artist}"
    ///
    /// With more than one "by" the last one separates the artist and the
    /// earlier ones belong to the music name ("stand by me by ben e king").
    fn split_by_artist(phrase: &str) -> (String, Option<String>) {
        let parts: Vec<&str> = RE_BY.split(phrase).collect();
        match parts.as_slice() {
            [music] => (music.to_string(), None),
            [music @ .., artist] => (music.join(" by "), Some(artist.to_string())),
            [] => (String::new(), None),
        }
    }

    /// Drop every leading "artist"/"band" ("by band artist queen" is queen)
    fn strip_artist_keyword(artist: &str) -> String {
        let mut artist = artist.to_string();
        while let Some(rest) = Self::capture(&RE_LEADING_ARTIST, &artist) {
            artist = rest;
        }
        artist
    }

    fn is_generic_music(music: &str) -> bool {
        ALL_MUSIC_PHRASES.contains(&music)
            || BARE_KEYWORDS.contains(&music)
            || matches!(music, "songs" | "tracks" | "albums" | "something" | "anything")
    }

    fn capture(re: &Regex, text: &str) -> Option<String> {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

/// Lower-case, drop trailing punctuation and collapse whitespace
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ','))
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a spoken playlist name into an `mpc` playlist name
pub fn normalize_playlist_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .replace('\'', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(phrase: &str) -> MusicQuery {
        match MusicIntentParser::parse_library_phrase(phrase) {
            LibraryParse::Query(q) => q,
            other => panic!("expected a query for '{}', got {:?}", phrase, other),
        }
    }

    #[test]
    fn test_classify_playlist_verbs() {
        assert_eq!(MusicIntentParser::classify("create playlist road trip"), RequestType::PlaylistOp);
        assert_eq!(MusicIntentParser::classify("At track yesterday to playlist oldies"), RequestType::PlaylistOp);
        assert_eq!(MusicIntentParser::classify("I'd album help to playlist beatles"), RequestType::PlaylistOp);
        assert_eq!(MusicIntentParser::classify("what playlists do i have"), RequestType::PlaylistOp);
    }

    #[test]
    fn test_classify_request_types() {
        assert_eq!(MusicIntentParser::classify("play internet radio"), RequestType::Radio);
        assert_eq!(MusicIntentParser::classify("play yesterday on the internet"), RequestType::Internet);
        assert_eq!(MusicIntentParser::classify("play the album radio gaga"), RequestType::Music);
        assert_eq!(MusicIntentParser::classify("play jazz radio"), RequestType::Radio);
        assert_eq!(MusicIntentParser::classify("next station"), RequestType::Radio);
        assert_eq!(MusicIntentParser::classify("play station fip"), RequestType::Radio);
        assert_eq!(MusicIntentParser::classify("play the news"), RequestType::News);
        assert_eq!(MusicIntentParser::classify("play n p r"), RequestType::News);
        assert_eq!(MusicIntentParser::classify("play my road trip playlist"), RequestType::Playlist);
        assert_eq!(MusicIntentParser::classify("play abbey road"), RequestType::Music);
    }

    #[test]
    fn test_classify_whole_words_only() {
        // "bandana" is not "band", "newsome" is not "news"
        assert_eq!(MusicIntentParser::classify("play bandana"), RequestType::Music);
        assert_eq!(MusicIntentParser::classify("play joanna newsome radio"), RequestType::Radio);
        assert_eq!(MusicIntentParser::classify("play songs by queen"), RequestType::Music);
    }

    #[test]
    fn test_classify_controls() {
        assert_eq!(
            MusicIntentParser::classify("Pause the music."),
            RequestType::Control(PlayerControl::Pause)
        );
        assert_eq!(
            MusicIntentParser::classify("next track"),
            RequestType::Control(PlayerControl::Next)
        );
        assert_eq!(
            MusicIntentParser::classify("go back"),
            RequestType::Control(PlayerControl::Previous)
        );
        assert_eq!(PlayerControl::Resume.mpc_verb(), "play");
        assert_eq!(PlayerControl::Previous.mpc_verb(), "prev");
    }

    #[test]
    fn test_parse_track_by_artist() {
        assert_eq!(
            query("play track yesterday by the beatles"),
            MusicQuery::TrackArtist {
                track: "yesterday".to_string(),
                artist: "the beatles".to_string(),
            }
        );
        assert_eq!(
            query("play song help by band the beatles"),
            MusicQuery::TrackArtist {
                track: "help".to_string(),
                artist: "the beatles".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_track_misheard_as_tracked() {
        assert_eq!(
            query("play tracked yesterday"),
            MusicQuery::Track {
                track: "yesterday".to_string()
            }
        );
    }

    #[test]
    fn test_parse_album() {
        assert_eq!(
            query("play record dark side of the moon"),
            MusicQuery::Album {
                album: "dark side of the moon".to_string()
            }
        );
        assert_eq!(
            query("play album meddle by artist pink floyd"),
            MusicQuery::AlbumArtist {
                album: "meddle".to_string(),
                artist: "pink floyd".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_artist() {
        assert_eq!(
            query("play artist neil young"),
            MusicQuery::Artist {
                artist: "neil young".to_string()
            }
        );
        assert_eq!(
            query("play band rush"),
            MusicQuery::Artist {
                artist: "rush".to_string()
            }
        );
        assert_eq!(
            query("play songs by queen"),
            MusicQuery::Artist {
                artist: "queen".to_string()
            }
        );
    }

    #[test]
    fn test_parse_all_music_genre_playlist() {
        assert_eq!(query("play random music"), MusicQuery::AllMusic);
        assert_eq!(query("play music"), MusicQuery::AllMusic);
        assert_eq!(
            query("play genre blues"),
            MusicQuery::Genre {
                genre: "blues".to_string()
            }
        );
        assert_eq!(
            query("play johnra classic rock"),
            MusicQuery::Genre {
                genre: "classic rock".to_string()
            }
        );
        assert_eq!(
            query("play playlist road trip"),
            MusicQuery::Playlist {
                playlist: "road trip".to_string()
            }
        );
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            query("play abbey road"),
            MusicQuery::Unknown {
                music: "abbey road".to_string()
            }
        );
        assert_eq!(
            query("play harvest by neil young"),
            MusicQuery::UnknownArtist {
                music: "harvest".to_string(),
                artist: "neil young".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_multiple_by() {
        assert_eq!(
            query("play track stand by me by ben e king"),
            MusicQuery::TrackArtist {
                track: "stand by me".to_string(),
                artist: "ben e king".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_not_enough_info() {
        assert_eq!(
            MusicIntentParser::parse_library_phrase("play album"),
            LibraryParse::NotEnoughInfo {
                phrase: "album".to_string()
            }
        );
        assert_eq!(
            MusicIntentParser::parse_library_phrase("play johnra"),
            LibraryParse::NotEnoughInfo {
                phrase: "genre".to_string()
            }
        );
        assert_eq!(
            MusicIntentParser::parse_library_phrase("play"),
            LibraryParse::NotEnoughInfo {
                phrase: "play".to_string()
            }
        );
    }

    #[test]
    fn test_parse_without_play_prefix() {
        // Playlist edits pass the music name without "play"
        assert_eq!(
            query("album help"),
            MusicQuery::Album {
                album: "help".to_string()
            }
        );
        // "player" is not "play"
        assert_eq!(
            query("player piano"),
            MusicQuery::Unknown {
                music: "player piano".to_string()
            }
        );
    }

    #[test]
    fn test_parse_is_deterministic() {
        let phrase = "Play Track Wish You Were Here by Pink Floyd?";
        let first = MusicIntentParser::parse_library_phrase(phrase);
        for _ in 0..5 {
            assert_eq!(MusicIntentParser::parse_library_phrase(phrase), first);
        }
    }

    #[test]
    fn test_reparse_keeps_slots() {
        let phrases = [
            "play track yesterday by the beatles",
            "play song help",
            "play album meddle by band pink floyd",
            "play record harvest",
            "play artist neil young",
            "play genre jazz",
            "play some music",
            "play playlist road trip",
            "play abbey road",
            "play harvest moon by neil young",
            "play track stand by me by ben e king",
            "play play that funky music",
            "play play",
            "play play that funky music by wild cherry",
            "play harvest by band artist neil young",
            "play songs by artist band queen",
            "play player piano",
        ];

        for phrase in phrases {
            let parsed = query(phrase);
            let reparsed = query(&parsed.to_phrase());
            assert_eq!(parsed, reparsed, "slots changed when re-parsing '{}'", phrase);
        }
    }

    #[test]
    fn test_artist_keywords_stripped_repeatedly() {
        assert_eq!(
            query("play harvest by band artist neil young"),
            MusicQuery::UnknownArtist {
                music: "harvest".to_string(),
                artist: "neil young".to_string()
            }
        );
        assert_eq!(
            query("play play"),
            MusicQuery::Unknown {
                music: "play".to_string()
            }
        );
        assert_eq!(MusicQuery::AllMusic.to_phrase(), "play music");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Play   Track  Help!  "), "play track help");
        assert_eq!(normalize("what playlists do i have?"), "what playlists do i have");
    }

    #[test]
    fn test_normalize_playlist_name() {
        assert_eq!(normalize_playlist_name(" Road Trip "), "road_trip");
        assert_eq!(normalize_playlist_name("mike's  mix"), "mikes_mix");
    }
}
