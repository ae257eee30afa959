/// Internet Radio
///
/// Stations come from a CSV file with one station per line:
///
/// ```text
/// "radio paradise", "pop|top 40", "the united states", "english", "no ads", "http://stream.radioparadise.com/flac"
/// ```
///
/// Requests are matched by substring against the genre, country, language
/// or station name column.

use rand::seq::SliceRandom;
use std::path::Path;

use crate::error::SkillError;
use crate::mpc_client::MpcClient;
use crate::music_info::{MatchType, Message, MusicInfo};
use crate::music_intent::normalize;
use crate::track::Track;

/// One line of the station file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    pub name: String,
    pub genre: String, // Pipe-separated, e.g. "pop|top 40"
    pub country: String,
    pub language: String,
    pub ads: String,
    pub url: String,
}

impl Station {
    fn from_record(record: &csv::StringRecord) -> Option<Self> {
        if record.len() < 6 {
            return None;
        }
        let field = |i: usize| record[i].trim().trim_matches('"').trim().to_string();
        Some(Station {
            name: field(0),
            genre: field(1),
            country: field(2),
            language: field(3),
            ads: field(4),
            url: field(5),
        })
    }

    /// Column a request is matched against
    fn column(&self, column: StationColumn) -> &str {
        match column {
            StationColumn::Name => &self.name,
            StationColumn::Genre => &self.genre,
            StationColumn::Country => &self.country,
            StationColumn::Language => &self.language,
        }
    }

    /// Genres read out loud: "pop|top 40" -> "pop or top 40"
    pub fn spoken_genre(&self) -> String {
        self.genre.replace('|', " or ")
    }

    pub fn to_track(&self) -> Track {
        let mut track = Track::from_uri(&self.url);
        track.title = self.name.clone();
        track.genre = self.genre.clone();
        track
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StationColumn {
    Name,
    Genre,
    Country,
    Language,
}

/// What kind of station the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioRequest {
    Random,
    Genre(String),
    Country(String),
    Language(String),
    Station(String),
    Next,
    Previous,
}

impl RadioRequest {
    fn kind(&self) -> &'static str {
        match self {
            RadioRequest::Random => "random",
            RadioRequest::Genre(_) => "genre",
            RadioRequest::Country(_) => "country",
            RadioRequest::Language(_) => "language",
            RadioRequest::Station(_) => "station",
            RadioRequest::Next => "next",
            RadioRequest::Previous => "previous",
        }
    }
}

/// Read the station file
///
/// Lines starting with `#` are comments. Lines with fewer than six fields
/// are skipped. Fields are lower-cased for matching.
pub fn load_stations(path: &Path) -> Result<Vec<Station>, SkillError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut stations = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        match Station::from_record(&record) {
            Some(mut station) => {
                station.name = station.name.to_lowercase();
                station.genre = station.genre.to_lowercase();
                station.country = station.country.to_lowercase();
                station.language = station.language.to_lowercase();
                stations.push(station);
            }
            None => log::warn!("Skipping station record {} with {} fields", line + 1, record.len()),
        }
    }

    log::info!("Loaded {} stations from {}", stations.len(), path.display());
    Ok(stations)
}

/// Parse a radio request
///
/// Understands phrases such as "play the radio", "play radio from canada",
/// "play radio spoken in french", "play genre jazz on the radio",
/// "play station radio paradise", "play classic rock radio" and
/// "next station".
pub fn parse_radio_request(utterance: &str) -> RadioRequest {
    let text = normalize(utterance);
    let words = remove_filler(text.split(' ').filter(|w| !w.is_empty()).collect());
    log::debug!("Radio words: {:?}", words);

    match words.as_slice() {
        ["different" | "next", ..] => RadioRequest::Next,
        ["previous" | "last", ..] => RadioRequest::Previous,
        ["play", "radio"] | ["play", "radio", "station"] => RadioRequest::Random,
        ["play", "radio", "station", "from", rest @ ..] | ["play", "radio", "from", rest @ ..] => {
            or_random(skip_leading(rest, &["country"]), RadioRequest::Country)
        }
        ["play", "radio", "station", rest @ ..] => or_random(rest, RadioRequest::Station),
        ["play", "radio", "spoken" | "in", rest @ ..] => {
            or_random(skip_leading(rest, &["in", "language"]), RadioRequest::Language)
        }
        ["play", "radio", ..] => RadioRequest::Random,
        ["play", "music" | "any", ..] => RadioRequest::Random,
        ["play", "genre", rest @ ..] => or_random(rest, RadioRequest::Genre),
        ["play", "station", rest @ ..] => or_random(rest, RadioRequest::Station),
        ["play", rest @ ..] if matches!(rest.last(), Some(&"radio" | &"station")) => {
            or_random(rest, RadioRequest::Genre)
        }
        _ => RadioRequest::Random,
    }
}

/// Drop "on the", "on my", "the", "a" and "internet"
fn remove_filler(words: Vec<&str>) -> Vec<&str> {
    let mut kept = Vec::with_capacity(words.len());
    let mut i = 0;
    while i < words.len() {
        match (words[i], words.get(i + 1)) {
            ("on", Some(&"the" | &"my")) => i += 2,
            ("the" | "a" | "internet", _) => i += 1,
            (word, _) => {
                kept.push(word);
                i += 1;
            }
        }
    }
    kept
}

fn skip_leading<'a, 'b>(mut words: &'a [&'b str], skip: &[&str]) -> &'a [&'b str] {
    while let Some(first) = words.first() {
        if !skip.contains(first) {
            break;
        }
        words = &words[1..];
    }
    words
}

/// Join search words, dropping trailing "radio"/"station"
fn search_terms(words: &[&str]) -> String {
    let mut end = words.len();
    while end > 0 && matches!(words[end - 1], "radio" | "station") {
        end -= 1;
    }
    words[..end].join(" ")
}

fn or_random(words: &[&str], request: fn(String) -> RadioRequest) -> RadioRequest {
    let terms = search_terms(words);
    if terms.is_empty() {
        RadioRequest::Random
    } else {
        request(terms)
    }
}

/// Choose stations for a request and build the result
pub fn get_stations(stations: &[Station], request: &RadioRequest, max_queued: usize) -> MusicInfo {
    log::info!("get_stations() request: {:?}", request);
    let mut rng = rand::thread_rng();

    let (column, search_name) = match request {
        RadioRequest::Next => return MusicInfo::new(MatchType::Next, None, Some(Vec::new())),
        RadioRequest::Previous => return MusicInfo::new(MatchType::Prev, None, Some(Vec::new())),
        RadioRequest::Random => {
            let picked: Vec<&Station> = stations.choose_multiple(&mut rng, max_queued).collect();
            let Some(first) = picked.first() else {
                log::info!("Station file has no stations");
                return MusicInfo::not_found(
                    Message::new("radio_not_found")
                        .with("request_type", request.kind())
                        .with("search_name", ""),
                );
            };
            let message = Message::new("playing_radio")
                .with("station_name", &first.name)
                .with("station_genre", first.spoken_genre());
            let tracks = picked.iter().map(|s| s.to_track()).collect();
            return MusicInfo::found(MatchType::Radio, message, tracks);
        }
        RadioRequest::Genre(name) => (StationColumn::Genre, name),
        RadioRequest::Country(name) => (StationColumn::Country, name),
        RadioRequest::Language(name) => (StationColumn::Language, name),
        RadioRequest::Station(name) => (StationColumn::Name, name),
    };

    let matches: Vec<&Station> = stations
        .iter()
        .filter(|s| s.column(column).contains(search_name.as_str()))
        .take(max_queued)
        .collect();

    let Some(first) = matches.first().copied() else {
        log::info!("Did not find {} {}", request.kind(), search_name);
        let message = match request {
            RadioRequest::Country(_) => Message::new("country_not_found").with("country", search_name),
            RadioRequest::Language(_) => Message::new("language_not_found").with("language", search_name),
            RadioRequest::Station(_) => Message::new("station_not_found").with("station", search_name),
            _ => Message::new("radio_not_found")
                .with("request_type", request.kind())
                .with("search_name", search_name),
        };
        return MusicInfo::not_found(message);
    };
    log::info!("Found {} stations, first: {} ({})", matches.len(), first.name, first.url);

    // The message names the first match even though the queue is shuffled
    let message = match request {
        RadioRequest::Country(_) => Message::new("playing_country")
            .with("station_name", &first.name)
            .with("country", search_name),
        RadioRequest::Language(_) => Message::new("playing_language")
            .with("station_name", &first.name)
            .with("language", search_name),
        RadioRequest::Station(_) => Message::new("playing_station").with("station_name", &first.name),
        _ => Message::new("playing_genre").with("genre_name", search_name),
    };

    let mut tracks: Vec<Track> = matches.iter().map(|s| s.to_track()).collect();
    tracks.shuffle(&mut rng);
    MusicInfo::found(MatchType::Radio, message, tracks)
}

impl MpcClient {
    /// Handle a radio request end to end
    pub fn play_radio(&self, utterance: &str, stations_file: &Path) -> MusicInfo {
        log::info!("play_radio() utterance: {}", utterance);
        // Never stop playing the radio
        self.set_repeat(true);

        let request = parse_radio_request(utterance);
        if matches!(request, RadioRequest::Next | RadioRequest::Previous) {
            return get_stations(&[], &request, self.max_queued());
        }

        if !stations_file.exists() {
            log::warn!("Station file {} not found", stations_file.display());
            let file = stations_file
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| stations_file.display().to_string());
            return MusicInfo::not_found(Message::new("file_not_found").with("file", file));
        }

        match load_stations(stations_file) {
            Ok(stations) => get_stations(&stations, &request, self.max_queued()),
            Err(e) => {
                let e = SkillError::Stations(format!("{}: {}", stations_file.display(), e));
                MusicInfo::from_error(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpc_client::testing::{client, ScriptedRunner};
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    const STATIONS: &str = r#"# name, genre, country, language, ads, url
"Radio Paradise", "pop|top 40", "the united states", "english", "no ads", "http://stream.radioparadise.com/flac"
"FIP", "jazz|eclectic", "france", "french", "no ads", "http://icecast.radiofrance.fr/fip-hifi.aac"
"CBC Music", "classical", "canada", "english", "no ads", "http://cbc.example/music"
"Jazz24", "jazz", "the united states", "english", "ads", "http://live.jazz24.example/stream"
"broken line", "rock"
"#;

    fn station_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(STATIONS.as_bytes()).unwrap();
        file
    }

    fn stations() -> Vec<Station> {
        load_stations(station_file().path()).unwrap()
    }

    #[test]
    fn test_load_stations() {
        let stations = stations();
        assert_eq!(stations.len(), 4);
        assert_eq!(stations[0].name, "radio paradise");
        assert_eq!(stations[0].genre, "pop|top 40");
        assert_eq!(stations[0].url, "http://stream.radioparadise.com/flac");
        assert_eq!(stations[1].language, "french");
    }

    #[test]
    fn test_parse_radio_request() {
        assert_eq!(parse_radio_request("play the radio"), RadioRequest::Random);
        assert_eq!(parse_radio_request("play radio station"), RadioRequest::Random);
        assert_eq!(parse_radio_request("play music on the radio"), RadioRequest::Random);
        assert_eq!(
            parse_radio_request("play the radio from the country canada"),
            RadioRequest::Country("canada".to_string())
        );
        assert_eq!(
            parse_radio_request("play radio station from france"),
            RadioRequest::Country("france".to_string())
        );
        assert_eq!(
            parse_radio_request("play radio station radio paradise"),
            RadioRequest::Station("radio paradise".to_string())
        );
        assert_eq!(
            parse_radio_request("play the radio spoken in french"),
            RadioRequest::Language("french".to_string())
        );
        assert_eq!(
            parse_radio_request("play radio in language english"),
            RadioRequest::Language("english".to_string())
        );
        assert_eq!(
            parse_radio_request("play genre jazz on the radio"),
            RadioRequest::Genre("jazz".to_string())
        );
        assert_eq!(
            parse_radio_request("play station fip on my radio"),
            RadioRequest::Station("fip".to_string())
        );
        assert_eq!(
            parse_radio_request("play classic rock radio station"),
            RadioRequest::Genre("classic rock".to_string())
        );
    }

    #[test]
    fn test_parse_radio_navigation() {
        assert_eq!(parse_radio_request("next station"), RadioRequest::Next);
        assert_eq!(parse_radio_request("different radio station"), RadioRequest::Next);
        assert_eq!(parse_radio_request("previous station"), RadioRequest::Previous);
        assert_eq!(parse_radio_request("last station"), RadioRequest::Previous);
    }

    #[test]
    fn test_parse_radio_fallbacks() {
        assert_eq!(parse_radio_request("radio"), RadioRequest::Random);
        assert_eq!(parse_radio_request("play radio from"), RadioRequest::Random);
        assert_eq!(parse_radio_request("play something nice"), RadioRequest::Random);
        assert_eq!(parse_radio_request("play internet radio"), RadioRequest::Random);
        assert_eq!(parse_radio_request("play the internet radio station"), RadioRequest::Random);
        assert_eq!(
            parse_radio_request("play jazz internet radio"),
            RadioRequest::Genre("jazz".to_string())
        );
    }

    #[test]
    fn test_get_stations_by_genre() {
        let info = get_stations(&stations(), &RadioRequest::Genre("jazz".to_string()), 10);
        assert_eq!(info.match_type, MatchType::Radio);
        assert_eq!(info.track_count(), 2);
        let message = info.message.unwrap();
        assert_eq!(message.key, "playing_genre");
        assert_eq!(message.value("genre_name"), Some("jazz"));
    }

    #[test]
    fn test_get_stations_respects_max_queued() {
        let info = get_stations(&stations(), &RadioRequest::Country("united states".to_string()), 1);
        assert_eq!(info.track_count(), 1);
        let message = info.message.unwrap();
        assert_eq!(message.key, "playing_country");
        assert_eq!(message.value("station_name"), Some("radio paradise"));

        let info = get_stations(&stations(), &RadioRequest::Random, 3);
        assert_eq!(info.track_count(), 3);
        assert_eq!(info.message_key(), Some("playing_radio"));
    }

    #[test]
    fn test_get_stations_messages() {
        let stations = stations();
        let info = get_stations(&stations, &RadioRequest::Language("french".to_string()), 5);
        assert_eq!(info.message.unwrap().value("station_name"), Some("fip"));

        let info = get_stations(&stations, &RadioRequest::Station("paradise".to_string()), 5);
        let message = info.message.unwrap();
        assert_eq!(message.key, "playing_station");
        assert_eq!(message.value("station_name"), Some("radio paradise"));
        assert_eq!(info.tracks.unwrap()[0].title, "radio paradise");
    }

    #[test]
    fn test_get_stations_not_found() {
        let stations = stations();
        let cases = [
            (RadioRequest::Genre("polka".to_string()), "radio_not_found"),
            (RadioRequest::Country("peru".to_string()), "country_not_found"),
            (RadioRequest::Language("greek".to_string()), "language_not_found"),
            (RadioRequest::Station("kexp".to_string()), "station_not_found"),
        ];
        for (request, key) in cases {
            let info = get_stations(&stations, &request, 5);
            assert_eq!(info.match_type, MatchType::None, "{:?}", request);
            assert_eq!(info.message_key(), Some(key));
            assert!(info.tracks.is_none());
        }
    }

    #[test]
    fn test_spoken_genre() {
        let info = get_stations(&stations()[..1], &RadioRequest::Random, 5);
        assert_eq!(info.message.unwrap().value("station_genre"), Some("pop or top 40"));
    }

    #[test]
    fn test_play_radio_sets_repeat() {
        let file = station_file();
        let runner = Arc::new(ScriptedRunner::new());
        let info = client(runner.clone()).play_radio("play genre jazz radio", file.path());
        assert_eq!(info.match_type, MatchType::Radio);
        assert_eq!(runner.calls(), vec!["repeat on"]);
    }

    #[test]
    fn test_play_radio_next_and_missing_file() {
        let runner = Arc::new(ScriptedRunner::new());
        let mpc = client(runner);

        let info = mpc.play_radio("next station", Path::new("/nonexistent/radio.stations.csv"));
        assert_eq!(info.match_type, MatchType::Next);
        assert!(info.message.is_none());

        let info = mpc.play_radio("play the radio", Path::new("/nonexistent/radio.stations.csv"));
        let message = info.message.unwrap();
        assert_eq!(message.key, "file_not_found");
        assert_eq!(message.value("file"), Some("radio.stations.csv"));
    }
}
