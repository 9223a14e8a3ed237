use chatset_types::{DetectOrder, RecordShape};
use serde_json::Value;
use std::path::Path;

use crate::driver::load_records;
use crate::error::Result;

/// Shape census of a dataset, used to eyeball an input before converting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetSummary {
    pub total: usize,
    pub conversations: usize,
    pub messages: usize,
    pub alpaca: usize,
    pub unknown: usize,
    /// Keys of the first record, in file order.
    pub first_keys: Vec<String>,
}

impl DatasetSummary {
    /// Per-shape counts labelled by shape name, in a fixed order.
    pub fn shape_counts(&self) -> [(&'static str, usize); 4] {
        [
            (RecordShape::Conversations.as_str(), self.conversations),
            (RecordShape::Messages.as_str(), self.messages),
            (RecordShape::Alpaca.as_str(), self.alpaca),
            (RecordShape::Unknown.as_str(), self.unknown),
        ]
    }
}

pub fn inspect_records(records: &[Value], order: DetectOrder) -> DatasetSummary {
    let mut summary = DatasetSummary {
        total: records.len(),
        first_keys: records
            .first()
            .and_then(Value::as_object)
            .map(|obj| obj.keys().cloned().collect())
            .unwrap_or_default(),
        ..Default::default()
    };

    for record in records {
        match RecordShape::detect(record, order) {
            RecordShape::Conversations => summary.conversations += 1,
            RecordShape::Messages => summary.messages += 1,
            RecordShape::Alpaca => summary.alpaca += 1,
            RecordShape::Unknown => summary.unknown += 1,
        }
    }

    summary
}

pub fn inspect_file(path: &Path, order: DetectOrder) -> Result<DatasetSummary> {
    let records = load_records(path)?;
    Ok(inspect_records(&records, order))
}
