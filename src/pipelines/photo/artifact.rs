// SPDX-License-Identifier: GPL-3.0-only

//! The final capture artifact

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Local};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Encoded, normalized label image
///
/// Immutable once produced. A new capture replaces the previous artifact;
/// nothing keeps a history.
#[derive(Clone)]
pub struct CapturedArtifact {
    pub id: Uuid,
    pub data: Arc<[u8]>,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
    /// JPEG quality the data was encoded at
    pub quality: u8,
    /// False when the quality floor was reached while still over budget
    pub within_budget: bool,
    pub captured_at: DateTime<Local>,
}

impl CapturedArtifact {
    pub fn new(
        data: Vec<u8>,
        mime_type: &'static str,
        width: u32,
        height: u32,
        quality: u8,
        within_budget: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            data: Arc::from(data.into_boxed_slice()),
            mime_type,
            width,
            height,
            quality,
            within_budget,
            captured_at: Local::now(),
        }
    }

    /// Size of the encoded data in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Displayable `data:` URI of the encoded image
    pub fn preview_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}

impl fmt::Debug for CapturedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedArtifact")
            .field("id", &self.id)
            .field("bytes", &self.data.len())
            .field("mime_type", &self.mime_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("quality", &self.quality)
            .field("within_budget", &self.within_budget)
            .field("captured_at", &self.captured_at)
            .finish()
    }
}
