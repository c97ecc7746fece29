//! Output types returned by [`crate::extract`].
//!
//! The model's answer is kept as a raw [`serde_json::Value`]: the pipeline
//! guarantees it parsed as JSON, not that it matches the troubleshooting
//! schema. [`ExtractionOutput::table`] offers a typed view for callers that
//! want one.

use serde::{Deserialize, Serialize};

/// Result of a successful extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Parsed model response, expected to be `{"TroubleShooting": [...]}`.
    pub result: serde_json::Value,
    /// 1-indexed pages that were rendered and submitted.
    pub pages: Vec<u32>,
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    /// Decode the result into the troubleshooting schema.
    pub fn table(&self) -> Result<TroubleshootingTable, serde_json::Error> {
        TroubleshootingTable::deserialize(&self.result)
    }
}

/// Top-level shape of a well-formed model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TroubleshootingTable {
    #[serde(rename = "TroubleShooting")]
    pub entries: Vec<TroubleshootingEntry>,
}

/// One problem with its causes, solutions and provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TroubleshootingEntry {
    pub problem: String,
    /// `[x, y, width, height]` in rendered-page pixels.
    pub problem_bounding_box: [f64; 4],
    pub problem_page: u32,
    pub causes: Vec<String>,
    pub solutions: Vec<String>,
}

/// Counters and timings for one extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub rendered_pages: usize,
    /// Always `2 × rendered_pages`.
    pub payload_entries: usize,
    pub annotated_blocks: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub render_duration_ms: u64,
    pub annotate_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn output(result: serde_json::Value) -> ExtractionOutput {
        ExtractionOutput {
            result,
            pages: vec![1],
            stats: ExtractionStats::default(),
        }
    }

    #[test]
    fn typed_view_of_valid_result() {
        let out = output(json!({
            "TroubleShooting": [{
                "Problem": "Unit does not start",
                "ProblemBoundingBox": [120, 340, 410, 60],
                "ProblemPage": 2,
                "Causes": ["No power"],
                "Solutions": ["Check the fuse", "Reset the breaker"]
            }]
        }));
        let table = out.table().unwrap();
        assert_eq!(table.entries.len(), 1);
        let e = &table.entries[0];
        assert_eq!(e.problem, "Unit does not start");
        assert_eq!(e.problem_bounding_box, [120.0, 340.0, 410.0, 60.0]);
        assert_eq!(e.problem_page, 2);
        assert_eq!(e.solutions.len(), 2);
    }

    #[test]
    fn typed_view_rejects_other_shapes_without_touching_result() {
        let out = output(json!({"answer": 42}));
        assert!(out.table().is_err());
        assert_eq!(out.result["answer"], 42);
    }

    #[test]
    fn entry_serialises_with_schema_names() {
        let table = TroubleshootingTable {
            entries: vec![TroubleshootingEntry {
                problem: "Noise".into(),
                problem_bounding_box: [1.0, 2.0, 3.0, 4.0],
                problem_page: 1,
                causes: vec!["Loose panel".into()],
                solutions: vec!["Tighten screws".into()],
            }],
        };
        let v = serde_json::to_value(&table).unwrap();
        assert_eq!(v["TroubleShooting"][0]["ProblemPage"], 1);
        assert_eq!(v["TroubleShooting"][0]["Causes"][0], "Loose panel");
    }
}
