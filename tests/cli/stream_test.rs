//! Tests for line reading and stream parsing.

use claude_runner::cli::{ClaudeEvent, LineReader, StreamError, StreamParser};

#[test]
fn parse_line_valid_json() {
    let line = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"Hi"}]}}"#;
    let event = StreamParser::parse_line(line).unwrap();

    assert_eq!(event.text_parts().collect::<String>(), "Hi");
}

#[test]
fn parse_line_invalid_json() {
    let line = "not valid json at all";
    let result = StreamParser::parse_line(line);

    match result.unwrap_err() {
        StreamError::ParseError { input, reason: _ } => {
            assert_eq!(input, "not valid json at all");
        }
        other => panic!("Expected ParseError, got {other:?}"),
    }
}

#[test]
fn parse_line_whitespace_only() {
    assert!(matches!(
        StreamParser::parse_line("   \t  "),
        Err(StreamError::Empty)
    ));
}

#[test]
fn parse_line_json_that_is_not_an_object() {
    assert!(matches!(
        StreamParser::parse_line("[1,2,3]"),
        Err(StreamError::ParseError { .. })
    ));
    assert!(matches!(
        StreamParser::parse_line("\"assistant\""),
        Err(StreamError::ParseError { .. })
    ));
}

#[test]
fn parse_line_truncated_json() {
    let line = r#"{"type":"assistant","message":{"content":[{"type":"te"#;
    assert!(matches!(
        StreamParser::parse_line(line),
        Err(StreamError::ParseError { .. })
    ));
}

#[tokio::test]
async fn line_reader_joins_chunks_split_mid_line() {
    let mock = tokio_test::io::Builder::new()
        .read(br#"{"type":"assis"#)
        .read(br#"tant","message":{"content":[{"type":"text","te"#)
        .read(b"xt\":\"Hel\"}]}}\r\n{\"type\":\"assistant\",")
        .read(br#""message":{"content":[{"type":"text","text":"lo!"}]}}"#)
        .read(b"\n")
        .build();
    let mut reader = LineReader::new(mock);

    let mut answer = String::new();
    while let Some(line) = reader.next_line().await.unwrap() {
        let event = StreamParser::parse_line(&line).unwrap();
        assert!(matches!(event, ClaudeEvent::Assistant { .. }));
        answer.extend(event.text_parts());
    }

    assert_eq!(answer, "Hello!");
}

#[tokio::test]
async fn line_reader_handles_long_lines() {
    let text = "x".repeat(256 * 1024);
    let line = format!(
        r#"{{"type":"assistant","message":{{"content":[{{"type":"text","text":"{text}"}}]}}}}"#
    );
    let input = format!("{line}\n");
    let mut reader = LineReader::new(input.as_bytes());

    let read = reader.next_line().await.unwrap().unwrap();
    assert_eq!(read.len(), line.len());
    let event = StreamParser::parse_line(&read).unwrap();
    assert_eq!(event.text_parts().collect::<String>(), text);
    assert!(reader.next_line().await.unwrap().is_none());
}

#[tokio::test]
async fn line_reader_empty_input() {
    let mut reader = LineReader::new(&b""[..]);
    assert!(reader.next_line().await.unwrap().is_none());
}
