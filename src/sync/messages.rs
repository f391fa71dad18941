//! Messages crossing the host boundary.

use serde::Deserialize;

use crate::diagram::Diagram;

/// A request from the host application.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    SaveDiagram { diagram: Diagram },
    RemoveDiagrams { diagram: Diagram },
    GetDiagrams,
}

impl Request {
    /// Every `type` tag a request frame may carry.
    pub const NAMES: [&'static str; 3] = ["saveDiagram", "removeDiagrams", "getDiagrams"];

    pub fn name(&self) -> &'static str {
        match self {
            Self::SaveDiagram { .. } => "saveDiagram",
            Self::RemoveDiagrams { .. } => "removeDiagrams",
            Self::GetDiagrams => "getDiagrams",
        }
    }
}

/// A fire-and-forget notification to the host application or remote collaborator.
///
/// Payloads are JSON strings, serialized once by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Route a save to the remote collaborator.
    SaveToRemote(String),
    /// A local save finished; carries the resolved id and timestamps.
    SaveToLocalCompleted(String),
    /// Route a removal to the remote collaborator.
    RemoveRemoteDiagram(String),
    /// A local removal finished.
    RemovedDiagram(String, bool),
    /// The full local listing, as one JSON array.
    GotLocalDiagramJson(String),
}

impl Notification {
    /// Port name as the host application knows it.
    pub fn port(&self) -> &'static str {
        match self {
            Self::SaveToRemote(_) => "saveToRemote",
            Self::SaveToLocalCompleted(_) => "saveToLocalCompleted",
            Self::RemoveRemoteDiagram(_) => "removeRemoteDiagram",
            Self::RemovedDiagram(..) => "removedDiagram",
            Self::GotLocalDiagramJson(_) => "gotLocalDiagramJson",
        }
    }

    /// The port's argument as a JSON value: the payload string, or
    /// `[payload, success]` for `removedDiagram`.
    pub fn payload(&self) -> serde_json::Value {
        match self {
            Self::SaveToRemote(p)
            | Self::SaveToLocalCompleted(p)
            | Self::RemoveRemoteDiagram(p)
            | Self::GotLocalDiagramJson(p) => serde_json::Value::String(p.clone()),
            Self::RemovedDiagram(p, success) => serde_json::json!([p, success]),
        }
    }
}
