use serde::{Deserialize, Serialize};

/// Single playable channel parsed from an M3U playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistEntry {
    pub url: String,
    pub title: String,

    // HTTP headers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,

    // DRM (ClearKey)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drm_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drm_key_id: Option<String>,

    // Channel information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_title: Option<String>,
}

impl PlaylistEntry {
    /// Create an entry with only the required fields set
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            user_agent: None,
            referer: None,
            drm_key: None,
            drm_key_id: None,
            channel_id: None,
            logo_url: None,
            group_title: None,
        }
    }
}

/// Parsed playlist, entries kept in file order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub items: Vec<PlaylistEntry>,
}

impl Playlist {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl IntoIterator for Playlist {
    type Item = PlaylistEntry;
    type IntoIter = std::vec::IntoIter<PlaylistEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Response for the parse endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResponse {
    pub total: usize,
    pub items: Vec<PlaylistEntry>,
}

/// Query parameters for the search endpoint
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Request body carrying an entry serialized as JSON
#[derive(Debug, Deserialize)]
pub struct EntryDataRequest {
    pub data: String,
}
