use bytes::{BufMut, BytesMut};
use busdec_protocol::DecodeResult;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};
use tracing::trace;

const MAX_LINE_LENGTH: usize = 64 * 1024;
const COMMENT: char = '#';

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Invalid hex on line {line}: {source}")]
    InvalidHex {
        line: usize,
        #[source]
        source: hex::FromHexError,
    },

    #[error(transparent)]
    Lines(#[from] LinesCodecError),

    #[error("Failed to encode decode result: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reads one captured frame per text line, written as hex byte pairs, and
/// writes decode results back as JSON lines.
///
/// Bytes may be separated by whitespace, `,` or `:` and carry a `0x` prefix.
/// Blank lines and lines starting with `#` are skipped.
pub struct CaptureCodec {
    lines: LinesCodec,
    line: usize,
}

impl CaptureCodec {
    pub fn new() -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
            line: 0,
        }
    }

    fn parse_line(&mut self, text: &str) -> Result<Option<Vec<u8>>, CaptureError> {
        self.line += 1;

        let text = text.trim();
        if text.is_empty() || text.starts_with(COMMENT) {
            return Ok(None);
        }

        let mut frame = Vec::with_capacity(text.len() / 2);
        for token in text
            .split(|c: char| c.is_whitespace() || c == ',' || c == ':')
            .filter(|t| !t.is_empty())
        {
            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            let bytes = hex::decode(digits).map_err(|source| CaptureError::InvalidHex {
                line: self.line,
                source,
            })?;
            frame.extend_from_slice(&bytes);
        }

        trace!("Decoded capture line {}: {:02X?}", self.line, frame);
        Ok(Some(frame))
    }
}

impl Default for CaptureCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for CaptureCodec {
    type Item = Vec<u8>;
    type Error = CaptureError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while let Some(text) = self.lines.decode(src)? {
            if let Some(frame) = self.parse_line(&text)? {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while let Some(text) = self.lines.decode_eof(src)? {
            if let Some(frame) = self.parse_line(&text)? {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }
}

impl Encoder<DecodeResult> for CaptureCodec {
    type Error = CaptureError;

    fn encode(&mut self, item: DecodeResult, dst: &mut BytesMut) -> Result<(), Self::Error> {
        trace!("Encoding result {:?}", item);

        let json = serde_json::to_vec(&item)?;
        dst.reserve(json.len() + 1);
        dst.put_slice(&json);
        dst.put_u8(b'\n');

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use tokio_util::codec::FramedRead;

    async fn read_all(input: &[u8]) -> Vec<Result<Vec<u8>, CaptureError>> {
        let mock = tokio_test::io::Builder::new().read(input).build();
        FramedRead::new(mock, CaptureCodec::new()).collect().await
    }

    #[tokio::test]
    async fn test_reads_frames_in_all_notations() {
        let frames = read_all(b"01 03 02 00 0A\n0x01,0x83,0x02\nA1:55\n010302000A\n").await;
        let frames: Vec<Vec<u8>> = frames.into_iter().map(|f| f.unwrap()).collect();
        assert_eq!(
            frames,
            vec![
                vec![0x01, 0x03, 0x02, 0x00, 0x0A],
                vec![0x01, 0x83, 0x02],
                vec![0xA1, 0x55],
                vec![0x01, 0x03, 0x02, 0x00, 0x0A],
            ]
        );
    }

    #[tokio::test]
    async fn test_skips_blank_and_comment_lines() {
        let frames = read_all(b"# captured on ttyUSB0\n\n  \r\nFF 00\r\n").await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref().unwrap(), &vec![0xFF, 0x00]);
    }

    #[tokio::test]
    async fn test_last_line_without_newline() {
        let frames = read_all(b"01 02\n03 04").await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].as_ref().unwrap(), &vec![0x03, 0x04]);
    }

    #[tokio::test]
    async fn test_invalid_hex_reports_line() {
        let frames = read_all(b"01 02\n# comment\n01 0G\n").await;
        assert!(frames[0].is_ok());
        match &frames[1] {
            Err(CaptureError::InvalidHex { line, .. }) => assert_eq!(*line, 3),
            other => panic!("expected invalid hex error, got {:?}", other),
        }
    }

    #[test]
    fn test_odd_digit_count_is_rejected() {
        let mut codec = CaptureCodec::new();
        let mut src = BytesMut::from("01 2\n");
        assert!(matches!(
            codec.decode(&mut src),
            Err(CaptureError::InvalidHex { line: 1, .. })
        ));
    }

    #[test]
    fn test_encodes_json_lines() -> Result<(), CaptureError> {
        let mut codec = CaptureCodec::new();
        let mut dst = BytesMut::new();
        codec.encode(DecodeResult::failure("Frame too short"), &mut dst)?;
        codec.encode(DecodeResult::ok().with_raw(&[0x01]), &mut dst)?;
        assert_eq!(
            &dst[..],
            b"{\"valid\":false,\"error\":\"Frame too short\"}\n{\"valid\":true,\"raw\":[1]}\n"
        );
        Ok(())
    }
}
