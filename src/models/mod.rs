pub mod catalog;
pub mod playlist;

pub use catalog::{
    CatalogItem, CatalogSection, DrmInfo, LinkKind, LoadResponse, MediaKind, SearchResponse,
    StreamLink,
};
pub use playlist::{EntryDataRequest, ParseResponse, Playlist, PlaylistEntry, SearchQuery};
