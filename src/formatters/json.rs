//! Machine-readable report: an object keyed by file path, each value the
//! file's visible messages in run order.

use super::{emit, Formatter, FormatterOptions, RunMetadata};
use crate::error::Result;
use crate::results::AggregatedResults;
use serde_json::{Map, Value as JsonVal};

pub struct JsonFormatter {
    options: FormatterOptions,
}

impl JsonFormatter {
    pub fn boxed(options: FormatterOptions) -> Box<dyn Formatter> {
        Box::new(Self { options })
    }

    /// Compose the report object (pure).
    pub fn compose(&self, results: &AggregatedResults) -> JsonVal {
        let mut files: Map<String, JsonVal> = Map::new();
        for m in self.options.visible(results) {
            let entry = files
                .entry(m.file_path.clone())
                .or_insert_with(|| JsonVal::Array(Vec::new()));
            if let JsonVal::Array(items) = entry {
                items.push(serde_json::to_value(m).unwrap_or(JsonVal::Null));
            }
        }
        JsonVal::Object(files)
    }
}

impl Formatter for JsonFormatter {
    fn print(&self, results: &AggregatedResults, _metadata: &RunMetadata) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.compose(results))
            .unwrap_or_else(|_| "{}".to_string());
        emit(&self.options, &text)
    }
}
