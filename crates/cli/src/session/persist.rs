// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk form of the session: one JSON file, replaced atomically and
//! readable only by its owner.

use std::io::{BufReader, Write};
use std::path::Path;

use anyhow::Context;
use tempfile::NamedTempFile;

use crate::session::Session;

/// Read a session written by [`save`].
pub fn load(path: &Path) -> anyhow::Result<Session> {
    let file = std::fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let session: Session = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parse {}", path.display()))?;
    anyhow::ensure!(
        !session.access_token.is_empty(),
        "{}: session has no access credential",
        path.display()
    );
    Ok(session)
}

/// Replace the session file.
///
/// The new contents go to an owner-only temp file in the same directory,
/// which is synced and then renamed over `path`. Readers see either the old
/// session or the new one.
pub fn save(path: &Path, session: &Session) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

    let mut staged = NamedTempFile::new_in(dir)
        .with_context(|| format!("stage session in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut staged, session)?;
    staged.write_all(b"\n")?;
    staged.as_file().sync_all()?;
    staged
        .persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

/// Remove the session file. Missing files are not an error.
pub fn remove(path: &Path) -> anyhow::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
