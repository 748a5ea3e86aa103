use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct PiEntryLine {
    #[serde(rename = "type")]
    line_type: String,
    #[serde(default)]
    message: Option<PiMessage>,
}

#[derive(Debug, Deserialize)]
struct PiMessage {
    role: Option<String>,
    #[serde(default)]
    content: PiContent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum PiContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
    #[default]
    Missing,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

/// One transcript line, reduced to what session listings need.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TranscriptLine {
    UserMessage { text: Option<String> },
    OtherMessage,
    NotAMessage,
}

pub fn parse_pi_transcript_line(line: &str) -> Result<TranscriptLine, ParseError> {
    let parsed: PiEntryLine = serde_json::from_str(line)?;
    if parsed.line_type != "message" {
        return Ok(TranscriptLine::NotAMessage);
    }
    let Some(message) = parsed.message else {
        return Ok(TranscriptLine::OtherMessage);
    };
    if message.role.as_deref() != Some("user") {
        return Ok(TranscriptLine::OtherMessage);
    }

    let text = match message.content {
        PiContent::Text(text) => Some(text),
        PiContent::Blocks(blocks) => blocks
            .into_iter()
            .find(|block| block.block_type == "text")
            .and_then(|block| block.text),
        PiContent::Missing => None,
    };
    Ok(TranscriptLine::UserMessage { text })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_text_comes_from_first_text_block() {
        let line = r#"{"type":"message","message":{"role":"user","content":[{"type":"image"},{"type":"text","text":"fix the build"}]}}"#;
        assert_eq!(
            parse_pi_transcript_line(line).expect("parse"),
            TranscriptLine::UserMessage {
                text: Some("fix the build".to_string())
            }
        );
    }

    #[test]
    fn assistant_and_non_message_lines() {
        let assistant = r#"{"type":"message","message":{"role":"assistant","content":[]}}"#;
        assert_eq!(
            parse_pi_transcript_line(assistant).expect("parse"),
            TranscriptLine::OtherMessage
        );

        let header = r#"{"type":"session","id":"abc","cwd":"/tmp"}"#;
        assert_eq!(
            parse_pi_transcript_line(header).expect("parse"),
            TranscriptLine::NotAMessage
        );
    }

    #[test]
    fn malformed_lines_are_errors() {
        assert!(parse_pi_transcript_line("{not json").is_err());
    }
}
