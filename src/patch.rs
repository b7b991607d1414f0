use std::{
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("anchor `{slot}` not found")]
    AnchorNotFound { slot: &'static str },
    #[error("anchors `{first}` and `{second}` overlap")]
    OverlappingSlots {
        first: &'static str,
        second: &'static str,
    },
}

/// Whether a patch stage writes its result back to disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    #[default]
    Write,
    DryRun,
}

/// What a patch stage did to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Modified,
    Unchanged,
}

/// Read `path`, run it through `render` and write the result back.
///
/// Nothing is written when `render` fails, so a target is either fully regenerated or left as
/// it was.
pub fn rewrite_file<F>(path: &Path, mode: WriteMode, render: F) -> Result<Change, PatchError>
where
    F: FnOnce(&str) -> Result<String, PatchError>,
{
    let io_err = |source: io::Error| PatchError::Io {
        path: path.to_path_buf(),
        source,
    };

    let original = fs::read_to_string(path).map_err(io_err)?;
    let updated = render(&original)?;

    let change = if updated == original {
        Change::Unchanged
    } else {
        Change::Modified
    };
    if mode == WriteMode::Write {
        fs::write(path, updated).map_err(io_err)?;
    }
    Ok(change)
}
