//! System prompt for troubleshooting-table extraction.
//!
//! The prompt is a protocol contract with [`crate::pipeline::assemble`]: it
//! tells the model that images arrive as pairs, a raw page view followed by
//! the same page overlaid with block coordinates. Changing the payload order
//! without changing this text (or vice versa) breaks bounding-box provenance.
//!
//! Callers can override it via [`crate::config::ExtractionConfig::system_prompt`].

/// Default system prompt.
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are looking at images of a troubleshooting guide and corresponding images with approximate paragraph coordinates.
For every page you receive two images in order: first the page as rendered, then the same page with block bounding boxes drawn on it and each box labelled "x, y, width, height" in pixels.
The guide is organized in a table with the headings 'Problem', 'Cause', and 'Solution' or in a similar manner.
Your task is to extract the text from each cell of the table and structure it in a clear and organized manner into a JSON format.

For each 'Problem' listed in the guide, create an object that contains the problem description, an array of possible causes, and an array of solutions.
For problems with multiple causes or solutions, each cause and solution should be a separate string in their respective arrays.
For each problem provide the approximate bounding box location and the page it appears on.

Here is an example of how you should format the information:

{
  "TroubleShooting": [
    {
      "Problem": "Example Problem 1",
      "ProblemBoundingBox": [x1, y1, width1, height1],
      "ProblemPage": 1,
      "Causes": [
        "Example Cause 1a",
        "Example Cause 1b"
      ],
      "Solutions": [
        "Example Solution 1a",
        "Example Solution 1b"
      ]
    },
    {
      "Problem": "Example Problem 2",
      "ProblemBoundingBox": [x2, y2, width2, height2],
      "ProblemPage": 2,
      "Causes": [
        "Example Cause 2a"
      ],
      "Solutions": [
        "Example Solution 2a"
      ]
    }
  ]
}

Please ensure that you transcribe the text exactly as it appears, including any specific instructions or details.
If a cell contains a list, represent each item as a separate string within the appropriate array.
If any part of the text is not legible, please mark it as '[illegible]'.
Respond with the JSON object only: no Markdown fences, no commentary."#;

/// User-turn text sent alongside the images.
///
/// VLM APIs require a user turn; the images carry the content.
pub fn page_listing(pages: &[u32]) -> String {
    let list: Vec<String> = pages.iter().map(u32::to_string).collect();
    format!(
        "Pages {} follow, each as a raw view then an annotated view.",
        list.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_defines_schema_and_rules() {
        for needle in [
            "\"TroubleShooting\"",
            "\"ProblemBoundingBox\"",
            "\"ProblemPage\"",
            "\"Causes\"",
            "\"Solutions\"",
            "[illegible]",
            "transcribe the text exactly",
        ] {
            assert!(EXTRACTION_SYSTEM_PROMPT.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn page_listing_names_pages() {
        assert_eq!(
            page_listing(&[2, 3]),
            "Pages 2, 3 follow, each as a raw view then an annotated view."
        );
    }
}
