use bytes::{Bytes, BytesMut};
use futures::{future, Stream, StreamExt};
use tokio::io::AsyncRead;
use tokio_util::codec::{Decoder, FramedRead};

/// One newline delimited chunk of input, without its delimiter.
/// The bytes are forwarded as-is, they don't have to be valid utf8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line(Bytes);

impl Line {
    fn from_raw(mut raw: Bytes) -> Self {
        // also strip the \r of a \r\n terminated line
        if raw.last() == Some(&b'\r') {
            raw.truncate(raw.len() - 1);
        }
        Line(raw)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Line {
    fn from(s: &str) -> Self {
        Line(Bytes::copy_from_slice(s.as_bytes()))
    }
}

#[derive(Debug, Default)]
pub struct LineCodec {
    // where to resume looking for a newline, so that a long line
    // arriving in small pieces isn't scanned from the start every time
    next_index: usize,
}

impl Decoder for LineCodec {
    type Item = Line;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Line>, Self::Error> {
        match buf[self.next_index..].iter().position(|b| *b == b'\n') {
            Some(offset) => {
                let end = self.next_index + offset;
                self.next_index = 0;
                let mut raw = buf.split_to(end + 1);
                raw.truncate(end);
                Ok(Some(Line::from_raw(raw.freeze())))
            }
            None => {
                self.next_index = buf.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Line>, Self::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if buf.is_empty() {
            Ok(None)
        } else {
            // the peer went away without terminating its last line
            let raw = buf.split_to(buf.len());
            Ok(Some(Line::from_raw(raw.freeze())))
        }
    }
}

/// Lazily cut the given reader into lines.
/// The stream ends at the first read error exactly like it does on a clean EOF,
/// the two cases are not told apart.
pub fn scan<R: AsyncRead>(rdr: R) -> impl Stream<Item = Line> {
    FramedRead::new(rdr, LineCodec::default())
        .take_while(|res| future::ready(res.is_ok()))
        .filter_map(|res| future::ready(res.ok()))
}

#[cfg(test)]
mod test {
    use std::{
        io::Cursor,
        pin::Pin,
        task::{Context, Poll},
    };

    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, ReadBuf};

    struct ResetReader;

    impl AsyncRead for ResetReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::ErrorKind::ConnectionReset.into()))
        }
    }

    async fn collect<R: AsyncRead>(rdr: R) -> Vec<Line> {
        scan(rdr).collect().await
    }

    #[test]
    fn test_decode_partial() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from(&b"hel"[..]);
        assert_eq!(codec.decode(&mut buf).expect("decode"), None);
        buf.extend_from_slice(b"lo\nwor");
        assert_eq!(
            codec.decode(&mut buf).expect("decode"),
            Some(Line::from("hello"))
        );
        assert_eq!(codec.decode(&mut buf).expect("decode"), None);
        assert_eq!(&buf[..], b"wor");
        assert_eq!(
            codec.decode_eof(&mut buf).expect("decode"),
            Some(Line::from("wor")),
            "unterminated trailing line is still a line"
        );
        assert_eq!(codec.decode_eof(&mut buf).expect("decode"), None);
    }

    #[tokio::test]
    async fn test_scan_lines_in_order() {
        let lines = collect(Cursor::new(b"alpha\nbeta\r\n\ngamma".to_vec())).await;
        assert_eq!(
            lines,
            vec![
                Line::from("alpha"),
                Line::from("beta"),
                Line::from(""),
                Line::from("gamma"),
            ]
        );
    }

    #[tokio::test]
    async fn test_scan_empty_input() {
        let lines = collect(Cursor::new(Vec::<u8>::new())).await;
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn test_scan_keeps_raw_bytes() {
        let lines = collect(Cursor::new(b"\xff\xfe\n".to_vec())).await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_bytes(), b"\xff\xfe");
    }

    #[tokio::test]
    async fn test_scan_stops_on_read_error() {
        let rdr = Cursor::new(b"alpha\nbe".to_vec()).chain(ResetReader);
        let lines = collect(rdr).await;
        assert_eq!(
            lines,
            vec![Line::from("alpha")],
            "the partial line in front of a read error is dropped"
        );
    }
}
