use serde::{Deserialize, Serialize};

/// `mpc --format` string used for every library query.
///
/// Columns: artist, album, title, time, file, genre.
pub const MPC_TRACK_FORMAT: &str = "%artist%\t%album%\t%title%\t%time%\t%file%\t%genre%";

/// Number of tab-separated columns produced by [`MPC_TRACK_FORMAT`]
const TRACK_COLUMNS: usize = 6;

/// A playable item: a library file, a stream URL or a downloaded bulletin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Player URI (`file:///…`, `http://…` or a local path)
    pub path: String,
    pub title: String,
    pub album: String,
    pub artist: String,
    pub genre: String,
    pub artwork: Option<String>,
    pub duration_ms: u64,
}

impl Track {
    /// Create a track that is nothing more than a URI
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Track {
            path: uri.into(),
            title: String::new(),
            album: String::new(),
            artist: String::new(),
            genre: String::new(),
            artwork: None,
            duration_ms: 0,
        }
    }

    /// Parse one line of `mpc` output produced with [`MPC_TRACK_FORMAT`]
    ///
    /// The relative file name is joined onto `music_uri`. Returns `None` for
    /// lines that do not carry all six columns.
    pub fn from_mpc_line(line: &str, music_uri: &str) -> Option<Self> {
        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() < TRACK_COLUMNS {
            log::debug!("Skipping short mpc line ({} columns): {}", columns.len(), line);
            return None;
        }

        let relative_path = columns[4].trim();
        if relative_path.is_empty() {
            return None;
        }

        Some(Track {
            path: format!("{}{}", music_uri, relative_path),
            title: columns[2].trim().to_string(),
            album: columns[1].trim().to_string(),
            artist: columns[0].trim().to_string(),
            genre: columns[5].trim().to_string(),
            artwork: None,
            duration_ms: time_to_seconds(columns[3]).saturating_mul(1000),
        })
    }

    /// Lower-cased artist, for exact name comparisons
    pub fn artist_key(&self) -> String {
        self.artist.to_lowercase()
    }

    /// Lower-cased title, for exact name comparisons
    pub fn title_key(&self) -> String {
        self.title.to_lowercase()
    }
}

/// Parse all non-blank lines of `mpc` output into tracks
pub fn parse_mpc_output(stdout: &str, music_uri: &str) -> Vec<Track> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| Track::from_mpc_line(line, music_uri))
        .collect()
}

/// Convert `H:MM:SS`, `M:SS` or `S` to a number of seconds
///
/// Unparsable parts count as zero. Oversized values saturate.
pub fn time_to_seconds(time_str: &str) -> u64 {
    let parts: Vec<u64> = time_str
        .trim()
        .splitn(3, ':')
        .map(|p| p.trim().parse::<u64>().unwrap_or(0))
        .collect();

    match parts.as_slice() {
        [hours, minutes, seconds] => hours
            .saturating_mul(3600)
            .saturating_add(minutes.saturating_mul(60))
            .saturating_add(*seconds),
        [minutes, seconds] => minutes.saturating_mul(60).saturating_add(*seconds),
        [seconds] => *seconds,
        _ => 0,
    }
}
