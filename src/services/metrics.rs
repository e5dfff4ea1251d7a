use lazy_static::lazy_static;
use prometheus::{register_int_counter, IntCounter};

lazy_static! {
    pub static ref PLAYLIST_FETCHES: IntCounter = register_int_counter!(
        "iptv_playlist_fetches_total",
        "Playlists downloaded from the source"
    )
    .unwrap();
    pub static ref ENTRIES_PARSED: IntCounter = register_int_counter!(
        "iptv_entries_parsed_total",
        "Playlist entries produced by the parser"
    )
    .unwrap();
    pub static ref SEARCHES: IntCounter =
        register_int_counter!("iptv_searches_total", "Channel searches served").unwrap();
}
