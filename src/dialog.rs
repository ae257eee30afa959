/// English dialog for message keys
///
/// Templates use `{name}` placeholders filled from the message values.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::music_info::Message;

static RE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").unwrap());

/// Template for a message key
pub fn template(key: &str) -> Option<&'static str> {
    let text = match key {
        // Library
        "playing_album" => "Playing the album {album_name} by {artist_name}",
        "diff_album_artist" => "Playing the album {album_name} by {artist_found}",
        "playing_artist" => "Playing songs by {artist_name}",
        "artist_not_found" => "Sorry, I did not find any music by {artist_name}",
        "playing_random" => "Playing {num_hits} random songs",
        "music_not_found" => "Sorry, I did not find {music_name}",
        "playing_genre" => "Playing {genre_name}",
        "genre_not_found" => "Sorry, I did not find any {genre_name} music",
        "playing_track" => "Playing {track_name} by {artist_name}",
        "diff_artist" => "I found {track_name} by {artist_found}",
        "found_tracks" => "Playing {num_hits} songs called {track_name}",
        "track_not_found" => "Sorry, I did not find the song {track_name}",
        "track_artist_not_found" => "Sorry, I did not find {track_name} by {artist_name}",
        "not_enough_info" => "Please say more than {phrase}",
        "mpc_failed" => "Sorry, the music player command {cmd} failed with code {rc}",
        "internal_error" => "Sorry, something went wrong",

        // Playlists
        "playlist_not_found" => "Sorry, I did not find the playlist {playlist_name}",
        "empty_playlist" => "The playlist {playlist_name} is empty",
        "playing_playlist" => "Playing the playlist {playlist_name}",
        "playlist_exists" => "The playlist {playlist_name} already exists",
        "created_playlist" => "Created the playlist {playlist_name}",
        "deleted_playlist" => "Deleted the playlist {playlist_name}",
        "added_to_playlist" => "Added {music_name} to the playlist {playlist_name}",
        "deleted_from_playlist" => "Removed {music_name} from the playlist {playlist_name}",
        "playlist_missing_track" => "The playlist {playlist_name} does not have {music_name}",
        "list_playlists" => "Your playlists are {playlists}",
        "list_playlist" => "You have one playlist, {playlists}",
        "playlists_not_found" => "You do not have any playlists",
        "to_playlist_missing" => "Please say to playlist followed by the playlist name",
        "from_playlist_missing" => "Please say from playlist followed by the playlist name",
        "playlist_name_missing" => "Please say the name of the playlist",
        "playlist_op_not_understood" => "Sorry, I did not understand {utterance}",

        // Radio
        "playing_radio" => "Playing {station_name}, a {station_genre} station",
        "playing_country" => "Playing {station_name} from {country}",
        "playing_language" => "Playing {station_name} in {language}",
        "playing_station" => "Playing {station_name}",
        "radio_not_found" => "Sorry, I did not find a {search_name} radio station",
        "country_not_found" => "Sorry, I did not find a radio station from {country}",
        "language_not_found" => "Sorry, I did not find a radio station in {language}",
        "station_not_found" => "Sorry, I did not find the station {station}",
        "file_not_found" => "Sorry, the file {file} is missing",

        // Internet and news
        "searching_internet" => "I did not find that in your library, searching the internet for {sentence}",
        "playing_npr" => "Here is the latest news",
        "cannot_play_npr" => "Sorry, I cannot get the news right now",
        "cannot_parse_npr" => "Sorry, I cannot read the news page",
        _ => return None,
    };
    Some(text)
}

/// Render a message as a sentence
///
/// Unknown keys render as the key followed by its values. Placeholders with
/// no value are left empty.
pub fn render(message: &Message) -> String {
    let Some(text) = template(&message.key) else {
        log::warn!("No dialog for message key {}", message.key);
        if message.values.is_empty() {
            return message.key.clone();
        }
        let values: Vec<String> = message
            .values
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        return format!("{} {}", message.key, values.join(" "));
    };

    let rendered = RE_PLACEHOLDER.replace_all(text, |caps: &regex::Captures| {
        message.value(&caps[1]).unwrap_or_default().to_string()
    });
    rendered.split_whitespace().collect::<Vec<_>>().join(" ")
}
