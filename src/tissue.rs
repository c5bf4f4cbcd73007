//! Tissue resolution - logical path to metadata id, registering on first use

use crate::blob::BlobGateway;
use crate::config::Environment;
use crate::storage::MetadataGateway;
use crate::{Error, Result};

/// A tissue known to the metadata store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTissue {
    pub id: i64,
    pub abs_path: String,
    /// True when this call created the tissue row
    pub registered: bool,
}

/// Resolves logical tissue paths against the metadata store
pub struct TissueResolver<'a, M, B> {
    metadata: &'a M,
    blobs: &'a B,
    env: &'a Environment,
}

impl<'a, M: MetadataGateway, B: BlobGateway> TissueResolver<'a, M, B> {
    pub fn new(metadata: &'a M, blobs: &'a B, env: &'a Environment) -> Self {
        Self { metadata, blobs, env }
    }

    /// Look up a tissue by logical path, registering it if its image file exists.
    ///
    /// Registration goes through the store's insert-if-absent, so two first
    /// calls racing on the same path end up with the same id.
    pub fn resolve(&self, logical_path: &str) -> Result<ResolvedTissue> {
        if let Some(row) = self.metadata.get_tissue_id_and_abs_path(logical_path)? {
            return Ok(ResolvedTissue {
                id: row.id,
                abs_path: row.abs_path,
                registered: false,
            });
        }

        let abs_path = self.env.tissue_abs_path(logical_path);
        if !self.blobs.exists(&abs_path) {
            return Err(Error::TissueNotFound(logical_path.to_string()));
        }

        let id = self.metadata.insert_tissue(logical_path, &abs_path)?;
        tracing::info!("Registered tissue {} as id {} ({})", logical_path, id, abs_path);

        Ok(ResolvedTissue {
            id,
            abs_path,
            registered: true,
        })
    }
}
