//! Session export/import — the portable document on disk.
//!
//! An export file is exactly the [`SessionDocument`] the local cache and
//! the remote actor carry, pretty-printed:
//!
//! ```text
//! Canvas::export() → export_session() → { "sessionId": .., "nodes": [..], "edges": [..],
//!                                         "tiles": [..], "trail": [..],
//!                                         "characterPosition": {..}, "lastUpdated": ".." }
//!   → import_session() → validated SessionDocument → Canvas::import()
//! ```
//!
//! Import is all-or-nothing: any shape or invariant violation is reported
//! as `MalformedImport` before anything is applied.

use std::io::{Read, Write};

use crate::session::SessionDocument;
use crate::{Error, Result};

/// Write `doc` as pretty JSON followed by a newline.
pub fn export_session(doc: &SessionDocument, writer: &mut dyn Write) -> Result<()> {
    let text = doc.to_json_pretty()?;
    writer.write_all(text.as_bytes())?;
    writeln!(writer)?;
    writer.flush()?;
    tracing::debug!(
        session = %doc.session_id,
        nodes = doc.nodes.len(),
        edges = doc.edges.len(),
        tiles = doc.tiles.len(),
        "session exported"
    );
    Ok(())
}

/// Read and validate a document produced by [`export_session`].
pub fn import_session(reader: &mut dyn Read) -> Result<SessionDocument> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| Error::MalformedImport(format!("unreadable export: {e}")))?;
    if text.trim().is_empty() {
        return Err(Error::MalformedImport("export is empty".into()));
    }
    SessionDocument::from_json(&text)
}
