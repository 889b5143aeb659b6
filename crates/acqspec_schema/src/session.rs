//! A working session over several acquisitions.

use crate::acquisition::AcquisitionSchema;
use crate::builder::{Phase, SchemaBuilder};
use crate::export::{ExportError, ExportedAcquisition, SchemaDocument};
use acqspec_ids::AcquisitionId;
use std::collections::BTreeMap;
use tracing::info;

/// Builders for every acquisition being edited, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct SchemaSession {
    builders: Vec<SchemaBuilder>,
}

impl SchemaSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a finalized document back for further editing.
    pub fn from_document(document: &SchemaDocument) -> Result<Self, ExportError> {
        let mut session = Self::new();
        for (title, acquisition) in &document.acquisitions {
            let schema: AcquisitionSchema = acquisition.to_schema(title)?;
            session.add(SchemaBuilder::from_schema(schema));
        }
        Ok(session)
    }

    pub fn add(&mut self, builder: SchemaBuilder) -> AcquisitionId {
        let id = builder.id().clone();
        self.builders.push(builder);
        id
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    pub fn get(&self, id: &AcquisitionId) -> Option<&SchemaBuilder> {
        self.builders.iter().find(|b| b.id() == id)
    }

    pub fn get_mut(&mut self, id: &AcquisitionId) -> Option<&mut SchemaBuilder> {
        self.builders.iter_mut().find(|b| b.id() == id)
    }

    pub fn find_by_title(&self, title: &str) -> Option<&SchemaBuilder> {
        self.builders.iter().find(|b| b.title() == title)
    }

    pub fn find_by_title_mut(&mut self, title: &str) -> Option<&mut SchemaBuilder> {
        self.builders.iter_mut().find(|b| b.title() == title)
    }

    /// Discard an acquisition.
    pub fn remove(&mut self, id: &AcquisitionId) -> Option<SchemaBuilder> {
        let index = self.builders.iter().position(|b| b.id() == id)?;
        Some(self.builders.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaBuilder> {
        self.builders.iter()
    }

    /// Produce the export document.
    ///
    /// Every acquisition must be past field selection with no open edits, and
    /// titles must be unique.
    pub fn finalize(&self) -> Result<SchemaDocument, ExportError> {
        let mut acquisitions = BTreeMap::new();
        for builder in &self.builders {
            let title = builder.title().to_string();
            if builder.phase() == Phase::SelectingFields {
                return Err(ExportError::SelectionOpen(title));
            }
            let count = builder.open_edits().count();
            if count > 0 {
                return Err(ExportError::EditsOpen { title, count });
            }
            if acquisitions.contains_key(&title) {
                return Err(ExportError::DuplicateTitle(title));
            }
            acquisitions.insert(title, ExportedAcquisition::from_schema(builder.schema()));
        }
        let document = SchemaDocument::new(acquisitions)?;
        info!(
            acquisitions = document.acquisitions.len(),
            hash = %&document.content_hash[..12],
            "finalized schema document"
        );
        Ok(document)
    }
}
