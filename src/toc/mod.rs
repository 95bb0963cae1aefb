use crate::cd::FRAMES_PER_SECOND;
use crate::toc::error::{TocError, TocResult};
use crate::toc::models::{CdTextField, Index, Track};
use log::debug;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::path::Path;

pub mod cue;
pub mod discid;
pub mod error;
pub mod models;

/// Frame cost of crossing into the given session.
///
/// The first additional session costs 11250 frames of lead-out/lead-in
/// overhead plus the 150 frame pre-gap of the first track after the lead-in;
/// every further session costs 6750 + 150 frames.
pub fn inter_session_gap(session: u32) -> u32 {
    if session > 2 { 6900 } else { 11400 }
}

/// The table of indexes on a CD.
///
/// Tracks are ordered by number, forming a contiguous 1-based run. The table
/// is built incrementally; [`Table::has_toc`] and [`Table::can_cue`] report
/// whether enough offsets have been resolved for the identifier algorithms
/// and for cue serialization respectively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub tracks: Vec<Track>,

    /// Frame offset where the lead-out area begins, one past the last usable
    /// frame; `None` until known.
    #[serde(default)]
    pub leadout: Option<u32>,

    /// Disc catalog number (UPC/EAN).
    #[serde(default)]
    pub catalog: Option<String>,

    #[serde(default)]
    pub cdtext: BTreeMap<CdTextField, String>,

    /// Cached MusicBrainz disc id, cleared by every mutating operation.
    #[serde(skip)]
    pub(crate) mbdiscid: OnceCell<String>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tracks(tracks: Vec<Track>) -> Self {
        Table {
            tracks,
            ..Self::default()
        }
    }

    pub fn add_track(&mut self, track: Track) {
        self.tracks.push(track);
        self.invalidate_cache();
    }

    pub fn track(&self, number: u32) -> TocResult<&Track> {
        let position = number
            .checked_sub(1)
            .ok_or(TocError::UnknownTrack(number))? as usize;
        self.tracks
            .get(position)
            .ok_or(TocError::UnknownTrack(number))
    }

    fn track_mut(&mut self, number: u32) -> TocResult<&mut Track> {
        let position = number
            .checked_sub(1)
            .ok_or(TocError::UnknownTrack(number))? as usize;
        self.tracks
            .get_mut(position)
            .ok_or(TocError::UnknownTrack(number))
    }

    pub(crate) fn index_at(&self, track: u32, index: u32) -> TocResult<&Index> {
        self.track(track)?.get_index(index)
    }

    fn index_at_mut(&mut self, track: u32, index: u32) -> TocResult<&mut Index> {
        self.track_mut(track)?.get_index_mut(index)
    }

    /// Start of the given track's index 1, in frames.
    pub fn track_start(&self, number: u32) -> TocResult<u32> {
        self.track(number)?
            .get_index(1)?
            .absolute
            .ok_or(TocError::UnresolvedOffset {
                track: number,
                index: 1,
            })
    }

    /// End of the given track, in frames: the frame before the next track's
    /// index 1, or the frame before the leadout for the last track. When the
    /// next track opens a new session the inter-session gap is subtracted,
    /// since those frames belong to neither track.
    pub fn track_end(&self, number: u32) -> TocResult<u32> {
        let this_track = self.track(number)?;
        let leadout = self.leadout.ok_or(TocError::MissingLeadout)?;

        if (number as usize) >= self.tracks.len() {
            return Ok(leadout - 1);
        }

        let next_track = self.track(number + 1)?;
        let mut end = next_track
            .get_index(1)?
            .absolute
            .ok_or(TocError::UnresolvedOffset {
                track: number + 1,
                index: 1,
            })?
            - 1;

        if next_track.session > this_track.session {
            end -= inter_session_gap(next_track.session);
        }

        Ok(end)
    }

    /// Length of the given track, in frames.
    pub fn track_length(&self, number: u32) -> TocResult<u32> {
        Ok(self.track_end(number)? - self.track_start(number)? + 1)
    }

    /// Number of audio tracks on the disc.
    pub fn audio_tracks(&self) -> u32 {
        self.tracks.iter().filter(|t| t.audio).count() as u32
    }

    pub fn has_data_tracks(&self) -> bool {
        self.tracks.iter().any(|t| !t.audio)
    }

    /// Disc length in frames, excluding any hidden track before track 1.
    /// With `data` false, trailing data tracks are excluded as well.
    pub fn frame_length(&self, data: bool) -> TocResult<u32> {
        let last = if data {
            self.tracks.last().ok_or(TocError::EmptyTable)?
        } else {
            let audio = self.audio_tracks();
            if audio == 0 {
                return Err(TocError::EmptyTable);
            }
            self.track(audio)?
        };

        let leadout = self.track_end(last.number)? + 1;
        Ok(leadout - self.track_start(1)?)
    }

    /// Duration of the audio portion of the disc, in milliseconds.
    pub fn duration(&self) -> TocResult<u64> {
        Ok(self.frame_length(false)? as u64 * 1000 / FRAMES_PER_SECOND as u64)
    }

    /// The position after `(track, index)` in disc order: index numbers
    /// ascend within a track, then traversal continues at the first index of
    /// the next track. `Ok(None)` signals the end of the disc.
    pub fn next_track_index(&self, track: u32, index: u32) -> TocResult<Option<(u32, u32)>> {
        let t = self.track(track)?;
        if !t.indexes.contains_key(&index) {
            return Err(TocError::MissingIndex { track, index });
        }

        if let Some((&next, _)) = t.indexes.range(index + 1..).next() {
            return Ok(Some((track, next)));
        }

        match self.track(track + 1) {
            Ok(next_track) => Ok(next_track
                .indexes
                .keys()
                .next()
                .map(|&n| (next_track.number, n))),
            Err(_) => Ok(None),
        }
    }

    fn first_position(&self) -> Option<(u32, u32)> {
        let track = self.tracks.first()?;
        let index = track.indexes.keys().next()?;
        Some((track.number, *index))
    }

    /// Walk every `(track, index)` pair of the disc in traversal order.
    pub fn walk(&self) -> IndexWalk<'_> {
        IndexWalk {
            table: self,
            position: self.first_position(),
        }
    }

    /// Walk `(track, index)` pairs starting at the given position.
    pub fn walk_from(&self, track: u32, index: u32) -> TocResult<IndexWalk<'_>> {
        self.index_at(track, index)?;
        Ok(IndexWalk {
            table: self,
            position: Some((track, index)),
        })
    }

    /// Reset the path and relative offset of every index, leaving absolute
    /// offsets untouched. Used before re-assigning file provenance.
    pub fn clear_files(&mut self) {
        debug!("clearing file assignments");
        let positions: Vec<(u32, u32)> = self.walk().collect();
        for (track, index) in positions {
            if let Ok(i) = self.index_at_mut(track, index) {
                i.path = None;
                i.relative = None;
            }
        }
        self.invalidate_cache();
    }

    /// Assign `path` as the backing file for the run of indexes starting at
    /// `(track, index)` and covering `length` frames. Every index whose
    /// absolute offset falls within the covered range gets the path, a
    /// relative offset within the file and the given counter stamp.
    ///
    /// The starting index must already have a resolved absolute offset.
    pub fn set_file(
        &mut self,
        track: u32,
        index: u32,
        path: &Path,
        length: u32,
        counter: u32,
    ) -> TocResult<()> {
        debug!(
            "set_file: track {}, index {}, path {:?}, length {}, counter {}",
            track, index, path, length, counter
        );

        let start = self
            .index_at(track, index)?
            .absolute
            .ok_or(TocError::UnresolvedOffset { track, index })?;

        if length == 0 {
            return Ok(());
        }
        let end = start + length - 1;

        let positions: Vec<(u32, u32)> = self.walk_from(track, index)?.collect();
        for (t, i) in positions {
            let idx = self.index_at_mut(t, i)?;
            match idx.absolute {
                Some(absolute) if absolute <= end => {
                    idx.path = Some(path.to_path_buf());
                    idx.relative = Some(absolute - start);
                    idx.counter = Some(counter);
                    debug!(
                        "assigned {:?}, relative {} on track {}, index {}",
                        path,
                        absolute - start,
                        t,
                        i
                    );
                }
                _ => break,
            }
        }

        self.invalidate_cache();
        Ok(())
    }

    /// Copy relative offsets into absolute offsets for as long as consecutive
    /// indexes belong to the first contiguous file group. A pre-existing
    /// absolute offset that disagrees with the computed one is a hard error,
    /// never silently resolved.
    ///
    /// Tables assembled from a linear run of source files call this after
    /// each appended file; re-running it is idempotent.
    pub fn absolutize(&mut self) -> TocResult<()> {
        debug!("absolutizing table");
        // offsets may change even when an inconsistency aborts the walk
        self.invalidate_cache();

        let Some(first) = self.first_position() else {
            return Ok(());
        };
        let running = self.index_at(first.0, first.1)?.counter;

        let positions: Vec<(u32, u32)> = self.walk().collect();
        for (track, index) in positions {
            let idx = self.index_at_mut(track, index)?;

            let Some(counter) = idx.counter else {
                debug!("track {}, index {} has no counter", track, index);
                break;
            };
            if Some(counter) != running {
                debug!(
                    "track {}, index {} belongs to a different file group",
                    track, index
                );
                break;
            }

            if let Some(existing) = idx.absolute {
                if Some(existing) != idx.relative {
                    return Err(TocError::InconsistentOffset {
                        track,
                        index,
                        existing,
                        computed: idx.relative,
                    });
                }
            }
            idx.absolute = idx.relative;
        }

        Ok(())
    }

    /// Append a copy of every track of `other` as the given later session.
    ///
    /// Track numbers, absolute offsets and counters of the appended tracks
    /// are shifted so both tables stay globally ordered; `other` itself is
    /// left untouched.
    pub fn merge(&mut self, other: &Table, session: u32) -> TocResult<()> {
        let gap = inter_session_gap(session);
        let leadout = self.leadout.ok_or(TocError::MissingLeadout)?;
        let other_leadout = other.leadout.ok_or(TocError::MissingLeadout)?;

        let track_count = self.tracks.len() as u32;
        let source_counter = self
            .tracks
            .last()
            .ok_or(TocError::EmptyTable)?
            .last_index()?
            .counter
            .unwrap_or(0);

        for track in &other.tracks {
            let mut appended = track.clone();
            appended.number = track.number + track_count;
            appended.session = session;
            for index in appended.indexes.values_mut() {
                if let Some(absolute) = index.absolute {
                    index.absolute = Some(absolute + leadout + gap);
                }
                if let Some(counter) = index.counter {
                    index.counter = Some(counter + source_counter);
                }
                debug!(
                    "shifted track {:02}, index {:02}: absolute {:?}, counter {:?}",
                    appended.number, index.number, index.absolute, index.counter
                );
            }
            self.tracks.push(appended);
        }

        // FIXME: growth formula matches existing rips but has not been
        // validated against real multi-session disc captures.
        self.leadout = Some(leadout + other_leadout + gap);
        debug!("leadout now {:?}", self.leadout);

        self.invalidate_cache();
        Ok(())
    }

    /// Whether the table describes a complete TOC: a leadout plus a resolved
    /// index 1 for every track.
    pub fn has_toc(&self) -> bool {
        if self.leadout.is_none() {
            debug!("no leadout, no TOC");
            return false;
        }

        for track in &self.tracks {
            match track.indexes.get(&1) {
                Some(index) if index.absolute.is_some() => {}
                _ => {
                    debug!("track {} has no resolved index 1, no TOC", track.number);
                    return false;
                }
            }
        }

        true
    }

    /// Whether the table can be serialized to a cue sheet: a complete TOC
    /// with a resolved relative offset on every index.
    pub fn can_cue(&self) -> bool {
        if !self.has_toc() {
            debug!("no TOC, cannot cue");
            return false;
        }

        for track in &self.tracks {
            for index in track.indexes.values() {
                if index.relative.is_none() {
                    debug!(
                        "track {:02}, index {:02} has no relative offset, cannot cue",
                        track.number, index.number
                    );
                    return false;
                }
            }
        }

        true
    }

    pub(crate) fn invalidate_cache(&mut self) {
        self.mbdiscid.take();
    }
}

/// Finite forward walk over the `(track, index)` pairs of a [`Table`] in
/// disc order; backs [`Table::set_file`], [`Table::clear_files`] and
/// [`Table::absolutize`].
pub struct IndexWalk<'a> {
    table: &'a Table,
    position: Option<(u32, u32)>,
}

impl Iterator for IndexWalk<'_> {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<(u32, u32)> {
        let (track, index) = self.position?;
        // positions handed out by the walk always exist in the table
        self.position = self.table.next_track_index(track, index).ok().flatten();
        Some((track, index))
    }
}
