use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TocError {
    #[error("track {0} is not present in the table")]
    UnknownTrack(u32),

    #[error("track {0} has no indexes")]
    EmptyTrack(u32),

    #[error("track {track} has no index {index}")]
    MissingIndex { track: u32, index: u32 },

    #[error("track {track}, index {index} has no absolute offset")]
    UnresolvedOffset { track: u32, index: u32 },

    #[error("track {track}, index {index} has no relative offset")]
    UnresolvedRelative { track: u32, index: u32 },

    #[error(
        "track {track}, index {index} has absolute offset {existing}, \
         refusing to override with {computed:?}"
    )]
    InconsistentOffset {
        track: u32,
        index: u32,
        existing: u32,
        computed: Option<u32>,
    },

    #[error("the table has no leadout offset")]
    MissingLeadout,

    #[error("the table has no tracks")]
    EmptyTable,

    #[error("the table does not describe a complete TOC")]
    IncompleteToc,

    #[error("no index in the table has a backing file")]
    NoBackingFile,

    #[error("data tracks are only supported at the end of the disc")]
    DataTrackNotLast,
}

pub type TocResult<T> = Result<T, TocError>;
