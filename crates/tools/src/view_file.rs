//! `view_file`: read a workspace file, optionally a line range of it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use specplan_core::error::ToolError;
use specplan_core::files::FileSource;
use specplan_core::tool::{Tool, ToolHandler, make_tool, parse_args};

pub const VIEW_FILE: &str = "view_file";

struct ViewFile {
    files: Arc<dyn FileSource>,
    max_bytes: usize,
}

#[derive(Deserialize)]
struct Args {
    path: String,
    #[serde(default)]
    start_line: Option<usize>,
    #[serde(default)]
    end_line: Option<usize>,
}

#[async_trait]
impl ToolHandler for ViewFile {
    async fn handle(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: Args = parse_args(VIEW_FILE, args)?;
        let content = self.files.read_to_string(&args.path).await?;

        let total_lines = content.lines().count();
        let start = args.start_line.unwrap_or(1).max(1);
        let end = args.end_line.unwrap_or(total_lines).min(total_lines);

        if args.start_line.is_some() && start > total_lines.max(1) {
            return Err(ToolError::invalid_args(format!(
                "start_line {start} is past the end of '{}' ({total_lines} lines)",
                args.path
            )));
        }
        if end < start && total_lines > 0 {
            return Err(ToolError::invalid_args(format!(
                "end_line {end} is before start_line {start}"
            )));
        }

        let selected = if args.start_line.is_none() && args.end_line.is_none() {
            content
        } else {
            content
                .lines()
                .skip(start - 1)
                .take(end + 1 - start)
                .collect::<Vec<_>>()
                .join("\n")
        };

        let (content, truncated) = truncate_bytes(&selected, self.max_bytes);

        Ok(serde_json::json!({
            "path": args.path,
            "content": content,
            "start_line": start,
            "end_line": end,
            "total_lines": total_lines,
            "truncated": truncated,
        }))
    }
}

/// Cut `text` to at most `max` bytes on a char boundary.
fn truncate_bytes(text: &str, max: usize) -> (&str, bool) {
    if text.len() <= max {
        return (text, false);
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    (&text[..cut], true)
}

/// Build the tool over a file source. Content past `max_bytes` is cut and
/// flagged `truncated`.
pub fn view_file_tool(files: Arc<dyn FileSource>, max_bytes: usize) -> specplan_core::Result<Tool> {
    make_tool(
        VIEW_FILE,
        "Read a file from the workspace by its path relative to the workspace root. \
         Use start_line/end_line (1-based, inclusive) to read part of a large file.",
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Path relative to the workspace root"
                },
                "start_line": { "type": "integer", "minimum": 1 },
                "end_line": { "type": "integer", "minimum": 1 }
            },
            "required": ["path"],
            "additionalProperties": false
        }),
        Some(serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "content": { "type": "string" },
                "start_line": { "type": "integer" },
                "end_line": { "type": "integer" },
                "total_lines": { "type": "integer" },
                "truncated": { "type": "boolean" }
            },
            "required": ["path", "content", "total_lines", "truncated"]
        })),
        ViewFile { files, max_bytes },
    )
}
