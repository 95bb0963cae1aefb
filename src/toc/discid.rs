//! Disc identifier algorithms: CDDB, MusicBrainz and AccurateRip.
//!
//! Each algorithm has its own bit layout and value domain, specified by the
//! external lookup service it feeds; the arithmetic here must match those
//! services exactly.

use crate::cd::FRAMES_PER_SECOND;
use crate::toc::error::{TocError, TocResult};
use crate::toc::Table;
use base64::alphabet::Alphabet;
use base64::engine::{general_purpose, GeneralPurpose};
use base64::Engine as _;
use lazy_static::lazy_static;
use log::debug;
use sha1::{Digest, Sha1};

// MusicBrainz avoids the special HTTP characters of plain base64: `+` and
// `/` become `.` and `_`, and the `=` padding becomes `-` after encoding.
lazy_static! {
    static ref MUSICBRAINZ_BASE64: GeneralPurpose = GeneralPurpose::new(
        &Alphabet::new("ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789._")
            .expect("64 unique base64 characters"),
        general_purpose::PAD,
    );
}

/// Frame overhead of a session transition, without the following pre-gap.
const SESSION_LEADOUT_LEADIN: u32 = 11250;

/// Standard pre-gap of the first track after a lead-in.
const LEADIN_PREGAP: u32 = 150;

/// The full CDDB result set: the packed disc id, the audio track count, the
/// lead-in-compensated offset of every track and the disc length in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CddbValues {
    pub disc_id: u32,
    pub audio_tracks: u32,
    pub track_offsets: Vec<u32>,
    pub disc_length: u32,
}

fn cddb_sum(mut value: u32) -> u32 {
    let mut sum = 0;
    while value > 0 {
        sum += value % 10;
        value /= 10;
    }
    sum
}

impl Table {
    /// Everything needed for a CDDB disc id and lookup.
    ///
    /// Data tracks count towards the id; the per-track offsets are shifted by
    /// the standard two second lead-in.
    pub fn cddb_values(&self) -> TocResult<CddbValues> {
        let last = self.tracks.last().ok_or(TocError::EmptyTable)?;

        let delta = 2 * FRAMES_PER_SECOND;
        let mut n: u32 = 0;
        let mut track_offsets = Vec::with_capacity(self.tracks.len());

        for track in &self.tracks {
            let offset = self.track_start(track.number)? + delta;
            track_offsets.push(offset);
            n += cddb_sum(offset / FRAMES_PER_SECOND);
        }

        // the true leadout, without the lead-in compensation; start and
        // leadout are each truncated to seconds before the difference
        let leadout = self.track_end(last.number)? + 1;
        let start_seconds = self.track_start(1)? / FRAMES_PER_SECOND;
        let leadout_seconds = leadout / FRAMES_PER_SECOND;
        let t = leadout_seconds - start_seconds;

        // deployed CDDB servers reduce the checksum modulo 0xff, not 0x100
        let disc_id = ((n % 0xff) << 24) | (t << 8) | self.tracks.len() as u32;

        let values = CddbValues {
            disc_id,
            audio_tracks: self.audio_tracks(),
            track_offsets,
            disc_length: leadout_seconds,
        };
        debug!("cddb values: {:?}", values);
        Ok(values)
    }

    /// The CDDB disc id, 8 lowercase hex digits.
    pub fn cddb_disc_id(&self) -> TocResult<String> {
        Ok(format!("{:08x}", self.cddb_values()?.disc_id))
    }

    /// Everything needed for a MusicBrainz disc id and submit URL: first
    /// track number, last audio track number, the lead-in-compensated
    /// effective leadout, then the compensated offset of every audio track.
    ///
    /// Data tracks are excluded; a trailing data track and its session
    /// overhead are cut out of the effective leadout.
    pub fn musicbrainz_values(&self) -> TocResult<Vec<u32>> {
        let mut values = vec![1, self.audio_tracks()];

        let mut leadout = self.leadout.ok_or(TocError::MissingLeadout)?;
        if self.has_data_tracks() {
            let last = self.tracks.last().ok_or(TocError::EmptyTable)?;
            if last.audio {
                return Err(TocError::DataTrackNotLast);
            }
            let absolute =
                last.get_index(1)?
                    .absolute
                    .ok_or(TocError::UnresolvedOffset {
                        track: last.number,
                        index: 1,
                    })?;
            leadout = absolute - SESSION_LEADOUT_LEADIN - LEADIN_PREGAP;
        }

        // the leadout offset is treated as the track 0 offset
        values.push(LEADIN_PREGAP + leadout);

        for track in &self.tracks {
            if !track.audio {
                continue;
            }
            values.push(self.track_start(track.number)? + LEADIN_PREGAP);
        }

        debug!("musicbrainz values: {:?}", values);
        Ok(values)
    }

    /// The MusicBrainz disc id, a 28 character string over `[A-Za-z0-9._-]`.
    ///
    /// Computed once and cached; every mutating table operation clears the
    /// cache.
    pub fn musicbrainz_disc_id(&self) -> TocResult<String> {
        if let Some(id) = self.mbdiscid.get() {
            debug!("returning cached musicbrainz disc id {}", id);
            return Ok(id.clone());
        }

        let values = self.musicbrainz_values()?;

        let mut sha = Sha1::new();
        sha.update(format!("{:02X}", values[0]));
        sha.update(format!("{:02X}", values[1]));
        sha.update(format!("{:08X}", values[2]));
        // always 99 track slots, zero-filled past the last track
        for slot in 0..99 {
            let offset = values.get(3 + slot).copied().unwrap_or(0);
            sha.update(format!("{:08X}", offset));
        }

        let digest = sha.finalize();
        let id = MUSICBRAINZ_BASE64.encode(digest).replace('=', "-");

        debug!("computed musicbrainz disc id {}", id);
        Ok(self.mbdiscid.get_or_init(|| id).clone())
    }

    /// Submission URL for the MusicBrainz TOC attach endpoint. The host is
    /// supplied by the caller; server configuration lives elsewhere.
    pub fn musicbrainz_submit_url(&self, host: &str) -> TocResult<String> {
        let disc_id = self.musicbrainz_disc_id()?;
        let values = self.musicbrainz_values()?;
        let toc: Vec<String> = values.iter().map(u32::to_string).collect();

        Ok(format!(
            "https://{}/cdtoc/attach?id={}&toc={}&tracks={}",
            host,
            disc_id,
            toc.join("+"),
            self.audio_tracks()
        ))
    }

    /// Both AccurateRip disc ids as 8 digit lowercase hex strings.
    ///
    /// Data tracks are skipped, but still shift the end-of-disc offset both
    /// accumulators fold in after the track loop.
    pub fn accuraterip_ids(&self) -> TocResult<(String, String)> {
        let mut disc_id1: u64 = 0;
        let mut disc_id2: u64 = 0;

        for track in &self.tracks {
            if !track.audio {
                continue;
            }
            let offset = self.track_start(track.number)? as u64;
            disc_id1 += offset;
            disc_id2 += offset.max(1) * track.number as u64;
        }

        let last = self.tracks.last().ok_or(TocError::EmptyTable)?;
        let end = self.track_end(last.number)? as u64 + 1;
        disc_id1 += end;
        disc_id2 += end * (self.audio_tracks() as u64 + 1);

        Ok((
            format!("{:08x}", disc_id1 & 0xffff_ffff),
            format!("{:08x}", disc_id2 & 0xffff_ffff),
        ))
    }

    /// Relative path of the AccurateRip checksum database entry for this
    /// disc, addressed by the last three hex digits of the first disc id.
    pub fn accuraterip_path(&self) -> TocResult<String> {
        let (disc_id1, disc_id2) = self.accuraterip_ids()?;
        let digits = disc_id1.as_bytes();

        Ok(format!(
            "{}/{}/{}/dBAR-{:03}-{}-{}-{}.bin",
            digits[7] as char,
            digits[6] as char,
            digits[5] as char,
            self.audio_tracks(),
            disc_id1,
            disc_id2,
            self.cddb_disc_id()?
        ))
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::toc::models::{Index, Track};
    use crate::toc::tests::{audio_track, two_track_table};
    use std::path::Path;

    fn single_track_table() -> Table {
        let mut table = Table::with_tracks(vec![audio_track(1, 0)]);
        table.leadout = Some(1000);
        table
    }

    #[test]
    fn cddb_sum_adds_decimal_digits() {
        assert_eq!(cddb_sum(0), 0);
        assert_eq!(cddb_sum(7), 7);
        assert_eq!(cddb_sum(254), 11);
        assert_eq!(cddb_sum(4321), 10);
    }

    #[test]
    fn cddb_disc_id_packs_checksum_length_and_track_count() {
        // offset 150 -> 2 seconds -> checksum 2; leadout 1000 -> 13 seconds
        let table = single_track_table();
        assert_eq!(table.cddb_disc_id().unwrap(), "02000d01");
    }

    #[test]
    fn cddb_values_carry_the_full_result_set() {
        let table = single_track_table();
        let values = table.cddb_values().unwrap();
        assert_eq!(values.disc_id, 0x02000d01);
        assert_eq!(values.audio_tracks, 1);
        assert_eq!(values.track_offsets, [150]);
        assert_eq!(values.disc_length, 13);
    }

    #[test]
    fn cddb_values_require_resolved_tracks() {
        let table = Table::new();
        assert_eq!(table.cddb_values(), Err(TocError::EmptyTable));
    }

    #[test]
    fn musicbrainz_values_compensate_for_the_lead_in() {
        let table = two_track_table();
        assert_eq!(
            table.musicbrainz_values().unwrap(),
            [1, 2, 30300, 150, 15150]
        );
    }

    #[test]
    fn musicbrainz_values_cut_a_trailing_data_track() {
        let mut data = Track::new(2, false);
        let mut index = Index::new(1);
        index.absolute = Some(16000);
        data.add_index(index);

        let mut table = Table::with_tracks(vec![audio_track(1, 0), data]);
        table.leadout = Some(20000);

        // effective leadout: 16000 - 11250 - 150 = 4600
        assert_eq!(table.musicbrainz_values().unwrap(), [1, 1, 4750, 150]);
    }

    #[test]
    fn musicbrainz_disc_id_is_deterministic_and_well_formed() {
        let table = two_track_table();
        let id = table.musicbrainz_disc_id().unwrap();

        assert_eq!(id.len(), 28);
        assert!(
            id.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
        );
        assert_eq!(table.musicbrainz_disc_id().unwrap(), id);
    }

    #[test]
    fn musicbrainz_disc_id_cache_is_cleared_by_mutation() {
        let mut table = two_track_table();
        let before = table.musicbrainz_disc_id().unwrap();

        let mut other = Table::with_tracks(vec![audio_track(1, 0)]);
        other.leadout = Some(5000);
        table.merge(&other, 2).unwrap();

        let after = table.musicbrainz_disc_id().unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn musicbrainz_disc_id_survives_file_reassignment() {
        let mut table = two_track_table();
        let before = table.musicbrainz_disc_id().unwrap();

        // file provenance does not enter the id
        table
            .set_file(1, 1, Path::new("disc.wav"), 30150, 0)
            .unwrap();
        assert_eq!(table.musicbrainz_disc_id().unwrap(), before);
    }

    #[test]
    fn musicbrainz_submit_url_joins_the_toc_values() {
        let table = two_track_table();
        let id = table.musicbrainz_disc_id().unwrap();
        let url = table
            .musicbrainz_submit_url("musicbrainz.org")
            .unwrap();

        assert_eq!(
            url,
            format!(
                "https://musicbrainz.org/cdtoc/attach?id={}&toc=1+2+30300+150+15150&tracks=2",
                id
            )
        );
    }

    #[test]
    fn accuraterip_ids_for_a_single_track() {
        // start 0, end-plus-one 1000: id1 = 1000, id2 = 1*1 + 1000*2
        let table = single_track_table();
        let (id1, id2) = table.accuraterip_ids().unwrap();
        assert_eq!(id1, "000003e8");
        assert_eq!(id2, "000007d1");
    }

    #[test]
    fn accuraterip_path_uses_the_trailing_digits_of_id1() {
        let table = single_track_table();
        assert_eq!(
            table.accuraterip_path().unwrap(),
            "8/e/3/dBAR-001-000003e8-000007d1-02000d01.bin"
        );
    }
}
