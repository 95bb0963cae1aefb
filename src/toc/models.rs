use crate::toc::error::{TocError, TocResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// CD-Text field names, as defined by libcdio.
///
/// The set is closed and ordered; cue serialization emits fields in this
/// canonical order, never in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CdTextField {
    Arranger,
    Composer,
    Discid,
    Genre,
    Message,
    Isrc,
    Performer,
    SizeInfo,
    Songwriter,
    Title,
    TocInfo,
    TocInfo2,
    UpcEan,
}

impl CdTextField {
    pub const ALL: [CdTextField; 13] = [
        CdTextField::Arranger,
        CdTextField::Composer,
        CdTextField::Discid,
        CdTextField::Genre,
        CdTextField::Message,
        CdTextField::Isrc,
        CdTextField::Performer,
        CdTextField::SizeInfo,
        CdTextField::Songwriter,
        CdTextField::Title,
        CdTextField::TocInfo,
        CdTextField::TocInfo2,
        CdTextField::UpcEan,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CdTextField::Arranger => "ARRANGER",
            CdTextField::Composer => "COMPOSER",
            CdTextField::Discid => "DISCID",
            CdTextField::Genre => "GENRE",
            CdTextField::Message => "MESSAGE",
            CdTextField::Isrc => "ISRC",
            CdTextField::Performer => "PERFORMER",
            CdTextField::SizeInfo => "SIZE_INFO",
            CdTextField::Songwriter => "SONGWRITER",
            CdTextField::Title => "TITLE",
            CdTextField::TocInfo => "TOC_INFO",
            CdTextField::TocInfo2 => "TOC_INFO2",
            CdTextField::UpcEan => "UPC_EAN",
        }
    }
}

/// A single addressable point inside a track.
///
/// Index 0 is the pre-gap, index 1 the start of playable content. Offsets
/// start out unset and are resolved as the table is assembled; `relative` is
/// only meaningful once `path` names a backing source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub number: u32,

    /// Disc-wide frame offset; `None` until resolved.
    #[serde(default)]
    pub absolute: Option<u32>,

    /// Backing source file; `None` until assigned.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Frame offset within `path`.
    #[serde(default)]
    pub relative: Option<u32>,

    /// File-group tag, increasing in file-construction order; a jump in the
    /// counter marks a FILE boundary in the cue sheet.
    #[serde(default)]
    pub counter: Option<u32>,
}

impl Index {
    pub fn new(number: u32) -> Self {
        Index {
            number,
            absolute: None,
            path: None,
            relative: None,
            counter: None,
        }
    }
}

/// A track entry in a [`Table`](crate::toc::Table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Track number, 1-based.
    pub number: u32,

    /// Audio tracks feed the audio-only identifier algorithms; data tracks
    /// still occupy disc space and shift the leadout.
    pub audio: bool,

    /// Session number, 1-based.
    #[serde(default = "default_session")]
    pub session: u32,

    #[serde(default)]
    pub indexes: BTreeMap<u32, Index>,

    /// ISRC code, 12 alphanumeric characters.
    #[serde(default)]
    pub isrc: Option<String>,

    #[serde(default)]
    pub cdtext: BTreeMap<CdTextField, String>,

    #[serde(default)]
    pub pre_emphasis: bool,
}

fn default_session() -> u32 {
    1
}

impl Track {
    pub fn new(number: u32, audio: bool) -> Self {
        Track {
            number,
            audio,
            session: 1,
            indexes: BTreeMap::new(),
            isrc: None,
            cdtext: BTreeMap::new(),
            pre_emphasis: false,
        }
    }

    pub fn add_index(&mut self, index: Index) {
        self.indexes.insert(index.number, index);
    }

    pub fn get_index(&self, number: u32) -> TocResult<&Index> {
        self.indexes.get(&number).ok_or(TocError::MissingIndex {
            track: self.number,
            index: number,
        })
    }

    pub(crate) fn get_index_mut(&mut self, number: u32) -> TocResult<&mut Index> {
        let track = self.number;
        self.indexes.get_mut(&number).ok_or(TocError::MissingIndex {
            track,
            index: number,
        })
    }

    /// First chronological index: index 0 if there is a pre-gap, else index 1.
    pub fn first_index(&self) -> TocResult<&Index> {
        self.indexes
            .values()
            .next()
            .ok_or(TocError::EmptyTrack(self.number))
    }

    pub fn last_index(&self) -> TocResult<&Index> {
        self.indexes
            .values()
            .next_back()
            .ok_or(TocError::EmptyTrack(self.number))
    }

    /// Pre-gap length in frames: the distance between index 0 and index 1,
    /// or zero when the track has no index 0.
    pub fn pregap(&self) -> TocResult<u32> {
        if !self.indexes.contains_key(&0) {
            return Ok(0);
        }

        let start = self.resolved_absolute(1)?;
        let pregap_start = self.resolved_absolute(0)?;
        Ok(start - pregap_start)
    }

    fn resolved_absolute(&self, number: u32) -> TocResult<u32> {
        self.get_index(number)?
            .absolute
            .ok_or(TocError::UnresolvedOffset {
                track: self.number,
                index: number,
            })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    fn track_with_pregap() -> Track {
        let mut track = Track::new(1, true);
        let mut index0 = Index::new(0);
        index0.absolute = Some(0);
        let mut index1 = Index::new(1);
        index1.absolute = Some(150);
        track.add_index(index0);
        track.add_index(index1);
        track
    }

    #[test]
    fn cdtext_fields_keep_the_canonical_order() {
        let names: Vec<&str> = CdTextField::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            [
                "ARRANGER",
                "COMPOSER",
                "DISCID",
                "GENRE",
                "MESSAGE",
                "ISRC",
                "PERFORMER",
                "SIZE_INFO",
                "SONGWRITER",
                "TITLE",
                "TOC_INFO",
                "TOC_INFO2",
                "UPC_EAN",
            ]
        );

        let mut sorted = CdTextField::ALL;
        sorted.sort();
        assert_eq!(sorted, CdTextField::ALL);
    }

    #[test]
    fn cdtext_fields_serialize_as_their_names() {
        assert_eq!(
            serde_json::to_string(&CdTextField::UpcEan).unwrap(),
            "\"UPC_EAN\""
        );
        assert_eq!(
            serde_json::to_string(&CdTextField::Discid).unwrap(),
            "\"DISCID\""
        );
        assert_eq!(
            serde_json::to_string(&CdTextField::TocInfo2).unwrap(),
            "\"TOC_INFO2\""
        );
    }

    #[test]
    fn first_and_last_index_follow_numeric_order() {
        let track = track_with_pregap();
        assert_eq!(track.first_index().unwrap().number, 0);
        assert_eq!(track.last_index().unwrap().number, 1);
    }

    #[test]
    fn empty_track_has_no_first_index() {
        let track = Track::new(3, true);
        assert_eq!(track.first_index(), Err(TocError::EmptyTrack(3)));
    }

    #[test]
    fn pregap_is_the_gap_between_index_0_and_index_1() {
        assert_eq!(track_with_pregap().pregap().unwrap(), 150);
    }

    #[test]
    fn pregap_is_zero_without_index_0() {
        let mut track = Track::new(1, true);
        let mut index1 = Index::new(1);
        index1.absolute = Some(150);
        track.add_index(index1);
        assert_eq!(track.pregap().unwrap(), 0);
    }

    #[test]
    fn index_deserializes_with_missing_optional_fields() {
        let index: Index = serde_json::from_str(r#"{"number": 1}"#).unwrap();
        assert_eq!(index, Index::new(1));
    }

    #[test]
    fn track_deserializes_with_missing_optional_fields() {
        let track: Track =
            serde_json::from_str(r#"{"number": 2, "audio": true}"#).unwrap();
        assert_eq!(track.session, 1);
        assert!(track.indexes.is_empty());
        assert!(!track.pre_emphasis);
    }
}
