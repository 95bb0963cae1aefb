//! Cue-sheet serialization of a [`Table`].
//!
//! The emitted dialect follows the conventional EAC-style cue grammar:
//! REM extensions and CATALOG up front, the first FILE line before TRACK 01
//! even when an unbacked pre-gap precedes it, and a fresh FILE line whenever
//! the index counter crosses a source-file boundary.

use crate::cd::Msf;
use crate::toc::error::{TocError, TocResult};
use crate::toc::models::CdTextField;
use crate::toc::Table;
use crate::util;
use log::debug;
use std::path::Path;

fn file_line(path: &Path, cue_path: &Path) -> String {
    let target = util::relative_path(path, cue_path);
    format!("FILE \"{}\" WAVE", target.display())
}

impl Table {
    /// Serialize the table as cue-sheet text.
    ///
    /// Backing file paths are written relative to `cue_path`; the REM
    /// COMMENT line names the generating `program`. Requires a complete TOC.
    pub fn cue(&self, cue_path: &Path, program: &str) -> TocResult<String> {
        debug!("generating cue sheet for {:?}", cue_path);

        if !self.has_toc() {
            return Err(TocError::IncompleteToc);
        }

        let mut lines: Vec<String> = Vec::new();

        // disc-level CD-Text; PERFORMER and TITLE get their own lines below
        for field in CdTextField::ALL {
            if matches!(field, CdTextField::Performer | CdTextField::Title) {
                continue;
            }
            if let Some(value) = self.cdtext.get(&field) {
                lines.push(format!("    {} {}", field.name(), value));
            }
        }

        lines.push(format!(
            "REM DISCID {}",
            self.cddb_disc_id()?.to_uppercase()
        ));
        lines.push(format!(
            "REM COMMENT \"{} {}\"",
            program,
            env!("CARGO_PKG_VERSION")
        ));

        if let Some(catalog) = &self.catalog {
            lines.push(format!("CATALOG {}", catalog));
        }

        for field in [CdTextField::Performer, CdTextField::Title] {
            if let Some(value) = self.cdtext.get(&field) {
                lines.push(format!("{} \"{}\"", field.name(), value));
            }
        }

        let first_track = self.tracks.first().ok_or(TocError::EmptyTable)?;
        let index_one_absolute =
            first_track
                .get_index(1)?
                .absolute
                .ok_or(TocError::UnresolvedOffset {
                    track: first_track.number,
                    index: 1,
                })?;

        // the first FILE line goes before TRACK 01 and any pre-gap, so
        // resolve forward past unbacked indexes to the first one with a path
        let mut position = (first_track.number, first_track.first_index()?.number);
        let mut counter;
        loop {
            let index = self.index_at(position.0, position.1)?;
            counter = index.counter;
            if let Some(path) = &index.path {
                debug!("counter {:?}, first FILE {:?}", counter, path);
                lines.push(file_line(path, cue_path));
                break;
            }
            position = self
                .next_track_index(position.0, position.1)?
                .ok_or(TocError::NoBackingFile)?;
        }

        for (i, track) in self.tracks.iter().enumerate() {
            if !track.audio {
                continue;
            }

            let mut wrote_track = false;

            for (&number, index) in &track.indexes {
                // a counter above the running one marks the start of a new
                // source file; it has to be above, a hidden first track can
                // sit at counter 0
                if index.counter > counter {
                    if let Some(path) = &index.path {
                        debug!("counter {:?}, FILE {:?}", index.counter, path);
                        lines.push(file_line(path, cue_path));
                    }
                    counter = index.counter;
                }

                if !wrote_track {
                    wrote_track = true;
                    lines.push(format!("  TRACK {:02} AUDIO", track.number));

                    for field in CdTextField::ALL {
                        if let Some(value) = track.cdtext.get(&field) {
                            lines.push(format!("    {} \"{}\"", field.name(), value));
                        }
                    }

                    if let Some(isrc) = &track.isrc {
                        lines.push(format!("    ISRC {}", isrc));
                    }

                    if track.pre_emphasis {
                        lines.push("    FLAGS PRE".to_string());
                    }

                    if let Some(index00) = track.indexes.get(&0) {
                        // a silent pre-gap on the first track has no backing
                        // file and is written as PREGAP instead of INDEX 00
                        if i == 0 && index00.path.is_none() {
                            let pregap_start =
                                index00.absolute.ok_or(TocError::UnresolvedOffset {
                                    track: track.number,
                                    index: 0,
                                })?;
                            lines.push(format!(
                                "    PREGAP {}",
                                Msf::from_frames(index_one_absolute - pregap_start)
                            ));
                            continue;
                        }

                        let relative =
                            index00.relative.ok_or(TocError::UnresolvedRelative {
                                track: track.number,
                                index: 0,
                            })?;
                        lines.push(format!("    INDEX 00 {}", Msf::from_frames(relative)));
                    }
                }

                if number > 0 {
                    let relative = index.relative.ok_or(TocError::UnresolvedRelative {
                        track: track.number,
                        index: number,
                    })?;
                    lines.push(format!(
                        "    INDEX {:02} {}",
                        number,
                        Msf::from_frames(relative)
                    ));
                }
            }
        }

        lines.push(String::new());
        Ok(lines.join("\n"))
    }
}
