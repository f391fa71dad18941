//! Sync coordinator — routes host requests to the local store or the remote
//! collaborator and reports outcomes back to the host.
//!
//! Per diagram the placement is either local (in the store) or remote (not in
//! the store; the remote collaborator owns it). Transitions happen only on
//! explicit requests. Notifications are sent only after the operation they
//! report has succeeded.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::confirm::Confirm;
use super::messages::{Notification, Request};
use crate::diagram::{Diagram, DiagramRecord, now_millis};
use crate::error::{Error, Result, SyncError};
use crate::store::DiagramStore;
use crate::thumbnail::ThumbnailRenderer;

/// Where a save ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Written to the local store; carries the finalized diagram.
    Local(Diagram),
    /// Forwarded to the remote collaborator; any local copy is gone.
    Remote(Diagram),
}

/// What a remove request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    ForwardedToRemote,
    /// The user said no; nothing changed and nothing was sent.
    Declined,
}

pub struct SyncCoordinator {
    store: Arc<dyn DiagramStore>,
    thumbnails: Arc<dyn ThumbnailRenderer>,
    confirm: Arc<dyn Confirm>,
    notify_tx: mpsc::Sender<Notification>,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn DiagramStore>,
        thumbnails: Arc<dyn ThumbnailRenderer>,
        confirm: Arc<dyn Confirm>,
        notify_tx: mpsc::Sender<Notification>,
    ) -> Self {
        Self {
            store,
            thumbnails,
            confirm,
            notify_tx,
        }
    }

    /// Dispatch one host request.
    pub async fn handle(&self, request: Request) -> Result<()> {
        debug!(request = request.name(), "Handling host request");
        match request {
            Request::SaveDiagram { diagram } => self.save(diagram).await.map(|_| ()),
            Request::RemoveDiagrams { diagram } => self.remove(diagram).await.map(|_| ()),
            Request::GetDiagrams => self.list().await.map(|_| ()),
        }
    }

    /// Save locally or forward to the remote collaborator, per `diagram.is_remote`.
    pub async fn save(&self, diagram: Diagram) -> Result<SaveOutcome> {
        let thumbnail = self.thumbnails.render_thumbnail();
        let now = now_millis();
        let Diagram { record, is_remote } = diagram;

        if is_remote {
            let promoted = Diagram::remote(DiagramRecord {
                thumbnail,
                created_at: now,
                updated_at: now,
                ..record
            });
            let payload = to_payload("saveToRemote", &promoted)?;

            // The local copy is dropped only once a slot for the forward is held,
            // and the forward is sent only after the local copy is gone.
            let permit = self.notify_tx.reserve().await.map_err(|_| {
                SyncError::HostDisconnected {
                    port: "saveToRemote".to_string(),
                }
            })?;
            if let Some(id) = promoted.id() {
                self.store.delete(id).await?;
                info!(id = %id, "Diagram promoted to remote, local copy removed");
            }
            permit.send(Notification::SaveToRemote(payload));
            return Ok(SaveOutcome::Remote(promoted));
        }

        let created_at = match record.id.as_deref() {
            Some(id) => self
                .store
                .get(id)
                .await?
                .and_then(|existing| existing.created_at)
                .map_or(now, |created| created.min(now)),
            None => now,
        };

        let mut record = DiagramRecord {
            thumbnail,
            created_at,
            updated_at: now,
            ..record
        };
        let id = self.store.put(&record).await?;
        record.id = Some(id);

        let saved = Diagram::local(record);
        let payload = to_payload("saveToLocalCompleted", &saved)?;
        self.send(Notification::SaveToLocalCompleted(payload)).await?;
        info!(id = ?saved.id(), title = %saved.record.title, "Diagram saved locally");
        Ok(SaveOutcome::Local(saved))
    }

    /// Remove after the user confirms.
    pub async fn remove(&self, diagram: Diagram) -> Result<RemoveOutcome> {
        let question = format!(
            "Are you sure you want to delete \"{}\" diagram?",
            diagram.record.title
        );
        if !self.confirm.confirm(&question).await {
            debug!(id = ?diagram.id(), "Removal declined");
            return Ok(RemoveOutcome::Declined);
        }

        if diagram.is_remote {
            let payload = to_payload("removeRemoteDiagram", &diagram)?;
            self.send(Notification::RemoveRemoteDiagram(payload)).await?;
            return Ok(RemoveOutcome::ForwardedToRemote);
        }

        if let Some(id) = diagram.id() {
            self.store.delete(id).await?;
        }
        let payload = to_payload("removedDiagram", &diagram)?;
        self.send(Notification::RemovedDiagram(payload, true)).await?;
        info!(id = ?diagram.id(), "Diagram removed locally");
        Ok(RemoveOutcome::Removed)
    }

    /// Read the whole local collection, newest first, and deliver it as one batch.
    pub async fn list(&self) -> Result<Vec<Diagram>> {
        let documents = self.store.list().await?;
        let now = now_millis();
        let diagrams: Vec<Diagram> = documents
            .into_iter()
            .map(|doc| Diagram::local(doc.backfill(now)))
            .collect();

        let payload = to_payload("gotLocalDiagramJson", &diagrams)?;
        self.send(Notification::GotLocalDiagramJson(payload)).await?;
        debug!(count = diagrams.len(), "Local diagrams delivered");
        Ok(diagrams)
    }

    async fn send(&self, notification: Notification) -> Result<()> {
        let port = notification.port();
        self.notify_tx
            .send(notification)
            .await
            .map_err(|_| SyncError::HostDisconnected {
                port: port.to_string(),
            })?;
        Ok(())
    }
}

fn to_payload<T: Serialize + ?Sized>(port: &str, value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| {
        Error::from(SyncError::Serialization {
            port: port.to_string(),
            reason: e.to_string(),
        })
    })
}
