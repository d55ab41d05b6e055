//! Frame naming on disk.
//!
//! Frames are written as `frame_%06d.png`. Past 999999 the index simply grows
//! wider, so order is by numeric index rather than by name.

use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};

pub const FRAME_PREFIX: &str = "frame_";
pub const FRAME_EXTENSION: &str = "png";
pub const FRAME_INDEX_WIDTH: usize = 6;

/// printf-style pattern understood by ffmpeg's image2 muxer/demuxer.
pub fn frame_pattern() -> String {
    format!(
        "{}%0{}d.{}",
        FRAME_PREFIX, FRAME_INDEX_WIDTH, FRAME_EXTENSION
    )
}

pub fn frame_name(index: usize) -> String {
    format!(
        "{}{:0width$}.{}",
        FRAME_PREFIX,
        index,
        FRAME_EXTENSION,
        width = FRAME_INDEX_WIDTH
    )
}

fn frame_regex() -> Regex {
    Regex::new(&format!(
        r"^{}(\d{{{},}})\.{}$",
        regex::escape(FRAME_PREFIX),
        FRAME_INDEX_WIDTH,
        FRAME_EXTENSION
    ))
    .expect("frame name regex is valid")
}

/// A single frame, addressed by file name within a frames directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRef<'a> {
    pub name: &'a str,
    dir: &'a Path,
}

impl FrameRef<'_> {
    pub fn path(&self) -> PathBuf {
        self.dir.join(self.name)
    }

    /// Same file name under another directory.
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.name)
    }
}

/// Ordered, finite list of the frames in a directory. Iterating is lazy and
/// can be restarted any number of times.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    dir: PathBuf,
    names: Vec<String>,
}

impl FrameSequence {
    /// Lists frame files in `dir`, ignoring anything not named like a frame
    /// (temporary files in particular).
    pub fn scan(dir: &Path) -> io::Result<Self> {
        let pattern = frame_regex();
        let mut indexed = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().to_str().map(String::from))
            .filter_map(|name| {
                let index = pattern.captures(&name)?.get(1)?.as_str().parse::<u64>().ok()?;
                Some((index, name))
            })
            .collect::<Vec<(u64, String)>>();
        indexed.sort();

        Ok(Self {
            dir: dir.to_path_buf(),
            names: indexed.into_iter().map(|(_, name)| name).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn iter(&self) -> impl Iterator<Item = FrameRef<'_>> + '_ {
        self.names.iter().map(move |name| FrameRef {
            name,
            dir: &self.dir,
        })
    }
}
