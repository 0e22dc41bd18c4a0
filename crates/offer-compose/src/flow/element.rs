use std::sync::Arc;

/// One piece of dynamic content for the extended pages
#[derive(Debug, Clone, PartialEq)]
pub struct FlowElement {
    pub id: String,
    /// Protection group; consecutive elements sharing a group stay together
    pub group: Option<String>,
    pub kind: FlowKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowKind {
    /// Level 1 is the largest
    Heading { text: String, level: u8 },
    Paragraph { text: String },
    /// PNG or JPEG drawn at `height` points, scaled down if it cannot fit
    Image { data: Arc<Vec<u8>>, height: f32 },
    /// `columns` are relative widths; an empty header draws no header row
    Table {
        columns: Vec<f32>,
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Label/amount pairs in a framed box, kept clear of the page bottom
    FinancingBlock {
        title: String,
        rows: Vec<(String, String)>,
        note: Option<String>,
    },
}

impl FlowElement {
    pub fn new(id: impl Into<String>, kind: FlowKind) -> Self {
        Self {
            id: id.into(),
            group: None,
            kind,
        }
    }

    pub fn heading(id: impl Into<String>, text: impl Into<String>, level: u8) -> Self {
        Self::new(
            id,
            FlowKind::Heading {
                text: text.into(),
                level,
            },
        )
    }

    pub fn paragraph(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, FlowKind::Paragraph { text: text.into() })
    }

    pub fn image(id: impl Into<String>, data: Arc<Vec<u8>>, height: f32) -> Self {
        Self::new(id, FlowKind::Image { data, height })
    }

    pub fn table(
        id: impl Into<String>,
        columns: Vec<f32>,
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> Self {
        Self::new(
            id,
            FlowKind::Table {
                columns,
                header,
                rows,
            },
        )
    }

    pub fn financing(
        id: impl Into<String>,
        title: impl Into<String>,
        rows: Vec<(String, String)>,
        note: Option<String>,
    ) -> Self {
        Self::new(
            id,
            FlowKind::FinancingBlock {
                title: title.into(),
                rows,
                note,
            },
        )
    }

    /// Assign the element to a protection group
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn is_heading(&self) -> bool {
        matches!(self.kind, FlowKind::Heading { .. })
    }

    pub fn is_financing(&self) -> bool {
        matches!(self.kind, FlowKind::FinancingBlock { .. })
    }
}
