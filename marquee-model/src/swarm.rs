/// Connection status of a torrent swarm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SwarmStatus {
    #[default]
    Connecting,
    Downloading,
    Seeding,
    Error,
}

/// Snapshot of swarm download activity
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwarmStats {
    pub status: SwarmStatus,
    pub downloaded_bytes: u64,
    pub download_speed_bps: u64,
    pub peer_count: u32,
    /// Fraction of the torrent available locally, `[0, 1]`
    pub progress: f64,
}

/// File entry announced by torrent metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TorrentFile {
    pub index: usize,
    pub name: String,
    pub length: u64,
}

impl TorrentFile {
    /// Lower-cased extension without the dot
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    pub fn has_extension_in(&self, extensions: &[String]) -> bool {
        self.extension().is_some_and(|ext| {
            extensions.iter().any(|allowed| {
                allowed.trim_start_matches('.').eq_ignore_ascii_case(&ext)
            })
        })
    }
}

/// Selected file inside a torrent
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileRef {
    pub index: usize,
    pub name: String,
}

impl From<&TorrentFile> for FileRef {
    fn from(file: &TorrentFile) -> Self {
        Self {
            index: file.index,
            name: file.name.clone(),
        }
    }
}
