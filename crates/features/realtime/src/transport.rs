use crate::error::RealtimeError;
use futures::Sink;
use futures::stream::BoxStream;
use std::future::Future;
use std::pin::Pin;
use url::Url;

/// Write half of an open connection. Items are text frames.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = RealtimeError> + Send>>;

/// Read half of an open connection. The stream ends when the connection closes.
pub type FrameStream = BoxStream<'static, Result<String, RealtimeError>>;

/// Opens connections for [`RealtimeClient`](crate::RealtimeClient).
///
/// An `Err` from `open` is treated like a connection that closed immediately.
/// Errors yielded by the stream are reported but only the end of the stream
/// counts as a close.
pub trait Transport: Send + Sync + 'static {
    fn open(&self, url: &Url) -> impl Future<Output = Result<(FrameSink, FrameStream), RealtimeError>> + Send;
}

#[cfg(feature = "websocket")]
pub use websocket::WebSocketTransport;

#[cfg(feature = "websocket")]
mod websocket {
    use super::{FrameSink, FrameStream, Transport};
    use crate::error::{RealtimeError, RealtimeErrorExt};
    use futures::{SinkExt, Stream, StreamExt, future};
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message;
    use tracing::{debug, trace};
    use url::Url;

    /// `tokio-tungstenite` transport. Supports `ws://` and `wss://` (rustls).
    #[derive(Debug, Clone, Copy, Default)]
    pub struct WebSocketTransport;

    impl Transport for WebSocketTransport {
        async fn open(&self, url: &Url) -> Result<(FrameSink, FrameStream), RealtimeError> {
            let (ws_stream, response) =
                connect_async(url.as_str()).await.context("WebSocket handshake")?;
            debug!(status = %response.status(), host = url.host_str().unwrap_or_default(), "WebSocket handshake complete");

            let (writer, reader) = ws_stream.split();

            let sink: FrameSink = Box::pin(
                writer
                    .sink_map_err(RealtimeError::from)
                    .with(|text: String| future::ready(Ok::<_, RealtimeError>(Message::text(text)))),
            );

            let stream: FrameStream =
                end_after_error(reader).filter_map(|item| future::ready(text_frame(item))).boxed();

            Ok((sink, stream))
        }
    }

    /// Yields items up to and including the first `Err`. tungstenite cannot
    /// read past an error, so anything after it is not a frame.
    fn end_after_error<S, T, E>(stream: S) -> impl Stream<Item = Result<T, E>>
    where
        S: Stream<Item = Result<T, E>>,
    {
        stream.scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            *failed = item.is_err();
            future::ready(Some(item))
        })
    }

    /// Text frames pass through; binary frames pass if they are UTF-8; control frames are dropped.
    fn text_frame(
        item: Result<Message, tokio_tungstenite::tungstenite::Error>,
    ) -> Option<Result<String, RealtimeError>> {
        match item {
            Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => Some(Ok(text)),
                Err(_) => {
                    debug!(len = bytes.len(), "Ignoring non-UTF-8 binary frame");
                    None
                },
            },
            Ok(Message::Close(frame)) => {
                debug!(?frame, "Close frame received");
                None
            },
            Ok(other) => {
                trace!(?other, "Ignoring control frame");
                None
            },
            Err(err) => Some(Err(RealtimeError::from(err))),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use futures::executor::block_on;
        use futures::stream;
        use tokio_tungstenite::tungstenite::Error as WsError;

        #[test]
        fn text_and_utf8_binary_frames_pass() {
            assert_eq!(text_frame(Ok(Message::text("hello"))).unwrap().unwrap(), "hello");
            assert_eq!(text_frame(Ok(Message::binary(b"{\"type\":\"X\"}".to_vec()))).unwrap().unwrap(), r#"{"type":"X"}"#);
        }

        #[test]
        fn non_utf8_binary_is_dropped() {
            assert!(text_frame(Ok(Message::binary(vec![0xff, 0xfe, 0x00]))).is_none());
        }

        #[test]
        fn control_frames_are_ignored() {
            assert!(text_frame(Ok(Message::Close(None))).is_none());
            assert!(text_frame(Ok(Message::Ping(Vec::from(*b"hb").into()))).is_none());
            assert!(text_frame(Ok(Message::Pong(Vec::new().into()))).is_none());
        }

        #[test]
        fn read_errors_pass_through() {
            let item = text_frame(Err(WsError::ConnectionClosed)).unwrap();
            assert!(matches!(item, Err(RealtimeError::WebSocket { .. })));
        }

        #[test]
        fn stream_ends_after_first_error() {
            let items: Vec<Result<u8, &str>> = vec![Ok(1), Ok(2), Err("reset"), Ok(3), Err("again")];
            let seen: Vec<_> = block_on(end_after_error(stream::iter(items)).collect());
            assert_eq!(seen, vec![Ok(1), Ok(2), Err("reset")]);
        }

        #[test]
        fn clean_stream_is_untouched() {
            let seen: Vec<Result<u8, &str>> = block_on(end_after_error(stream::iter([Ok(1), Ok(2)])).collect());
            assert_eq!(seen, vec![Ok(1), Ok(2)]);
        }
    }
}
