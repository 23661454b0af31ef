use {serde::Serialize, std::fmt};

/// A single platform-legal text message.
///
/// Immutable once built. Serializes to the LINE message object shape,
/// `{"type":"text","text":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Segment {
    #[serde(rename = "type")]
    kind: SegmentKind,
    text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
enum SegmentKind {
    Text,
}

impl Segment {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Text,
            text: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        &self.text
    }

    /// Length in Unicode scalar values, the unit segment limits are expressed in.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn into_content(self) -> String {
        self.text
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
