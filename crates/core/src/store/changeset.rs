//! Groups of collection writes applied all-or-nothing.

use anyhow::Result;

use super::{render, Record, RecordKind};

/// Full replacement contents for one collection.
#[derive(Debug, Clone)]
pub(crate) struct StagedCollection {
    /// Collection being replaced.
    pub kind: RecordKind,
    /// Complete CSV document, header included.
    pub contents: String,
}

/// A set of collection replacements committed with [`RecordStore::commit`].
///
/// [`RecordStore::commit`]: super::RecordStore::commit
#[derive(Debug, Clone, Default)]
pub struct Changeset {
    staged: Vec<StagedCollection>,
}

impl Changeset {
    /// An empty changeset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage the full contents of `R`'s collection, replacing any earlier staging of it.
    pub fn stage<R: Record>(&mut self, records: &[R]) -> Result<&mut Self> {
        let contents = render(records)?;
        match self.staged.iter_mut().find(|entry| entry.kind == R::KIND) {
            Some(entry) => entry.contents = contents,
            None => self.staged.push(StagedCollection {
                kind: R::KIND,
                contents,
            }),
        }
        Ok(self)
    }

    /// Collections touched by this changeset, in staging order.
    pub fn kinds(&self) -> Vec<RecordKind> {
        self.staged.iter().map(|entry| entry.kind).collect()
    }

    /// Whether nothing has been staged.
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub(crate) fn into_staged(self) -> Vec<StagedCollection> {
        self.staged
    }
}
