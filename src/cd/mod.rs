use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest addressable slice of Red Book disc time, 1/75 of a second.
pub const FRAMES_PER_SECOND: u32 = 75;
pub const SECONDS_PER_MINUTE: u32 = 60;

/// A frame count broken down into minutes, seconds and leftover frames,
/// the notation cue sheets use for INDEX and PREGAP positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Msf {
    pub minutes: u32,
    pub seconds: u32,
    pub frames: u32,
}

impl Msf {
    pub fn from_frames(frames: u32) -> Self {
        Msf {
            minutes: frames / FRAMES_PER_SECOND / SECONDS_PER_MINUTE,
            seconds: frames / FRAMES_PER_SECOND % SECONDS_PER_MINUTE,
            frames: frames % FRAMES_PER_SECOND,
        }
    }

    pub fn to_frames(self) -> u32 {
        (self.minutes * SECONDS_PER_MINUTE + self.seconds) * FRAMES_PER_SECOND + self.frames
    }
}

impl fmt::Display for Msf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.minutes, self.seconds, self.frames)
    }
}
