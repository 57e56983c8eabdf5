use serde::{Deserialize, Serialize};

/// Documents every applicant must upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    IdentityDocument,
    AcademicTranscript,
    Photograph,
}

impl DocumentKind {
    pub const fn ordered() -> [Self; 3] {
        [
            Self::IdentityDocument,
            Self::AcademicTranscript,
            Self::Photograph,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::IdentityDocument => "Identity Document",
            Self::AcademicTranscript => "Academic Transcript",
            Self::Photograph => "Photograph",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    Missing,
    Uploaded,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub kind: DocumentKind,
    pub status: DocumentStatus,
    /// Opaque URL handed back by the storage collaborator.
    pub url: Option<String>,
}

/// Display reference attached to the document verification step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentLink {
    pub kind: DocumentKind,
    pub label: &'static str,
    pub url: String,
    pub status: DocumentStatus,
}

/// One entry per [`DocumentKind`], always in the same order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChecklist {
    entries: [DocumentEntry; 3],
}

impl Default for DocumentChecklist {
    fn default() -> Self {
        Self::empty()
    }
}

impl DocumentChecklist {
    pub fn empty() -> Self {
        Self {
            entries: DocumentKind::ordered().map(|kind| DocumentEntry {
                kind,
                status: DocumentStatus::Missing,
                url: None,
            }),
        }
    }

    pub fn entries(&self) -> &[DocumentEntry] {
        &self.entries
    }

    pub fn entry(&self, kind: DocumentKind) -> &DocumentEntry {
        &self.entries[Self::slot(kind)]
    }

    pub fn record_upload(&mut self, kind: DocumentKind, url: impl Into<String>) {
        let entry = &mut self.entries[Self::slot(kind)];
        entry.status = DocumentStatus::Uploaded;
        entry.url = Some(url.into());
    }

    pub fn with_upload(mut self, kind: DocumentKind, url: impl Into<String>) -> Self {
        self.record_upload(kind, url);
        self
    }

    /// Kinds the applicant still has to provide. A rejected upload counts as
    /// missing.
    pub fn missing(&self) -> Vec<DocumentKind> {
        self.entries
            .iter()
            .filter(|entry| {
                matches!(
                    entry.status,
                    DocumentStatus::Missing | DocumentStatus::Rejected
                )
            })
            .map(|entry| entry.kind)
            .collect()
    }

    pub fn links(&self) -> Vec<DocumentLink> {
        self.entries
            .iter()
            .filter_map(|entry| {
                entry.url.as_ref().map(|url| DocumentLink {
                    kind: entry.kind,
                    label: entry.kind.label(),
                    url: url.clone(),
                    status: entry.status,
                })
            })
            .collect()
    }

    fn slot(kind: DocumentKind) -> usize {
        match kind {
            DocumentKind::IdentityDocument => 0,
            DocumentKind::AcademicTranscript => 1,
            DocumentKind::Photograph => 2,
        }
    }
}
