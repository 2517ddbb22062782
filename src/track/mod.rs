use std::collections::HashMap;
use std::fmt;

/// One playlist entry as far as the download is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRecord {
    pub artist: String,
    pub title: String,
    /// Catalog identifier, absent for local files and some podcast entries.
    pub spotify_track_id: Option<String>,
}

impl TrackRecord {
    pub fn new(artist: String, title: String, spotify_track_id: Option<String>) -> Self {
        Self {
            artist,
            title,
            spotify_track_id,
        }
    }

    /// `"<artist> - <title>"`, used as search text and as the missing-songs line.
    pub fn query(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }

    /// Title with path separators replaced so it always names a single file.
    pub fn file_stem(&self) -> String {
        self.title.replace(['/', '\\'], ",")
    }

    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.file_stem(), extension)
    }

    pub fn key(&self) -> TrackKey {
        match &self.spotify_track_id {
            Some(id) if !id.is_empty() => TrackKey::Catalog(id.clone()),
            _ => TrackKey::Query(self.query()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackKey {
    Catalog(String),
    Query(String),
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKey::Catalog(id) => write!(f, "spotify:track:{}", id),
            TrackKey::Query(query) => f.write_str(query),
        }
    }
}

/// Insertion-ordered tracks of one playlist.
///
/// Re-inserting a key keeps the original position and replaces the record,
/// so the last occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct TrackCollection {
    entries: Vec<(TrackKey, TrackRecord)>,
    positions: HashMap<TrackKey, usize>,
}

impl TrackCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record that was replaced, if the key was already present.
    pub fn insert(&mut self, record: TrackRecord) -> Option<TrackRecord> {
        let key = record.key();
        match self.positions.get(&key) {
            Some(&position) => Some(std::mem::replace(&mut self.entries[position].1, record)),
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, record));
                None
            }
        }
    }

    #[cfg(test)]
    pub fn get(&self, key: &TrackKey) -> Option<&TrackRecord> {
        self.positions
            .get(key)
            .map(|&position| &self.entries[position].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackRecord> {
        self.entries.iter().map(|(_, record)| record)
    }
}

impl FromIterator<TrackRecord> for TrackCollection {
    fn from_iter<I: IntoIterator<Item = TrackRecord>>(iter: I) -> Self {
        let mut collection = Self::new();
        for record in iter {
            collection.insert(record);
        }
        collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(artist: &str, title: &str, id: Option<&str>) -> TrackRecord {
        TrackRecord::new(artist.to_string(), title.to_string(), id.map(str::to_string))
    }

    #[test]
    fn test_query_and_file_name() {
        let track = record("Daft Punk", "One More Time", Some("0DiWol3AO6WpXZgp0goxAV"));
        assert_eq!(track.query(), "Daft Punk - One More Time");
        assert_eq!(track.file_name("mp3"), "One More Time.mp3");
        assert_eq!(track.key(), TrackKey::Catalog("0DiWol3AO6WpXZgp0goxAV".to_string()));
    }

    #[test]
    fn test_file_stem_replaces_path_separators() {
        let track = record("AC/DC", "Back In Black / Live", None);
        assert_eq!(track.file_stem(), "Back In Black , Live");
        assert_eq!(track.query(), "AC/DC - Back In Black / Live");
    }

    #[test]
    fn test_keeps_insertion_order() {
        let tracks = vec![
            record("Burial", "Archangel", None),
            record("Aphex Twin", "Xtal", None),
            record("Boards of Canada", "Roygbiv", None),
        ]
        .into_iter()
        .collect::<TrackCollection>();
        let queries = tracks.iter().map(TrackRecord::query).collect::<Vec<_>>();
        assert_eq!(
            queries,
            vec![
                "Burial - Archangel",
                "Aphex Twin - Xtal",
                "Boards of Canada - Roygbiv"
            ]
        );
    }

    #[test]
    fn test_duplicate_query_without_id_keeps_last_record_in_first_position() {
        let mut tracks = TrackCollection::new();
        assert!(tracks.insert(record("Artist", "Song", None)).is_none());
        assert!(tracks.insert(record("Other", "Tune", None)).is_none());
        let replaced = tracks.insert(TrackRecord {
            artist: "Artist".to_string(),
            title: "Song".to_string(),
            spotify_track_id: Some(String::new()),
        });
        assert!(replaced.is_some());
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks.iter().next().unwrap().spotify_track_id, Some(String::new()));
    }

    #[test]
    fn test_same_display_text_with_distinct_ids_are_kept() {
        let mut tracks = TrackCollection::new();
        tracks.insert(record("Artist", "Song", Some("a")));
        tracks.insert(record("Artist", "Song", Some("b")));
        assert_eq!(tracks.len(), 2);
        assert!(tracks.get(&TrackKey::Catalog("b".to_string())).is_some());
    }
}
