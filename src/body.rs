use crate::codec::{Codec, CompressionLevel};
use bytes::{Buf, Bytes, BytesMut};
use compression_codecs::EncodeV2;
use compression_core::util::{PartialBuffer, WriteBuffer};
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

const OUTPUT_BUFFER_SIZE: usize = 8 * 1024;

pin_project! {
    /// A response body produced by the encoding filter.
    ///
    /// Depending on the negotiation outcome the inner body is compressed,
    /// passed through unchanged, or absent (406 responses).
    #[project = EncodingBodyProj]
    #[allow(missing_docs)]
    pub enum EncodingBody<B> {
        /// Compressed body with encoder.
        Compressed {
            #[pin]
            inner: B,
            state: CompressedBody,
        },
        /// Passthrough body without compression.
        Passthrough {
            #[pin]
            inner: B,
        },
        /// No body at all.
        Empty,
    }
}

/// Encoder and buffers of an actively compressed body.
///
/// The encoder is released as soon as the stream is finished or the inner
/// body fails; dropping the body releases it on every other path.
pub(crate) struct CompressedBody {
    encoder: Option<Box<dyn EncodeV2 + Send>>,
    output_buffer: Vec<u8>,
    always_flush: bool,
    state: CompressState,
    pending_trailers: Option<http::HeaderMap>,
}

/// State machine for compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompressState {
    /// Reading data from inner body and compressing.
    Reading,
    /// Finishing compression after inner body is done.
    Finishing,
    /// Emitting buffered trailers.
    Trailers,
    /// Encoder closed.
    Done,
}

impl CompressedBody {
    fn new(codec: Codec, level: CompressionLevel, always_flush: bool) -> Self {
        Self {
            encoder: Some(codec.encoder(level)),
            output_buffer: vec![0u8; OUTPUT_BUFFER_SIZE],
            always_flush,
            state: CompressState::Reading,
            pending_trailers: None,
        }
    }

    pub(crate) fn state(&self) -> CompressState {
        self.state
    }

    pub(crate) fn always_flush(&self) -> bool {
        self.always_flush
    }

    /// Drops the encoder and stops the stream.
    fn close(&mut self) {
        self.encoder = None;
        self.state = CompressState::Done;
    }

    fn after_finish(&mut self) {
        self.encoder = None;
        self.state = if self.pending_trailers.is_some() {
            CompressState::Trailers
        } else {
            CompressState::Done
        };
    }

    fn poll_compressed<B>(
        &mut self,
        cx: &mut Context<'_>,
        mut inner: Pin<&mut B>,
    ) -> Poll<Option<Result<Frame<Bytes>, io::Error>>>
    where
        B: Body,
        B::Data: Buf,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        loop {
            match self.state {
                CompressState::Done => return Poll::Ready(None),

                CompressState::Trailers => {
                    self.state = CompressState::Done;
                    return Poll::Ready(self.pending_trailers.take().map(|t| Ok(Frame::trailers(t))));
                }

                CompressState::Finishing => {
                    let mut all_output = BytesMut::new();
                    if let Err(e) = self.finish(&mut all_output) {
                        self.close();
                        return Poll::Ready(Some(Err(e)));
                    }
                    self.after_finish();
                    if !all_output.is_empty() {
                        return Poll::Ready(Some(Ok(Frame::data(all_output.freeze()))));
                    }
                }

                CompressState::Reading => match inner.as_mut().poll_frame(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(None) => {
                        self.state = CompressState::Finishing;
                    }
                    Poll::Ready(Some(Err(e))) => {
                        tracing::debug!("response body failed while compressing");
                        self.close();
                        return Poll::Ready(Some(Err(io::Error::other(e.into()))));
                    }
                    Poll::Ready(Some(Ok(frame))) => match frame.into_data() {
                        Ok(mut data) => {
                            let input = data.copy_to_bytes(data.remaining());
                            match self.compress_chunk(&input) {
                                Ok(Some(output)) => return Poll::Ready(Some(Ok(Frame::data(output)))),
                                // The encoder buffered the chunk; read more.
                                Ok(None) => {}
                                Err(e) => {
                                    self.close();
                                    return Poll::Ready(Some(Err(e)));
                                }
                            }
                        }
                        Err(frame) => {
                            if let Ok(trailers) = frame.into_trailers() {
                                self.pending_trailers = Some(trailers);
                                self.state = CompressState::Finishing;
                            }
                        }
                    },
                },
            }
        }
    }

    /// Feeds a chunk to the encoder, returning whatever output it produced.
    fn compress_chunk(&mut self, input: &[u8]) -> io::Result<Option<Bytes>> {
        let Some(encoder) = self.encoder.as_mut() else {
            return Ok(None);
        };
        let mut input_buf = PartialBuffer::new(input);
        let mut all_output = BytesMut::new();

        while input_buf.written_len() < input.len() {
            let mut output = WriteBuffer::new_initialized(self.output_buffer.as_mut_slice());
            let consumed = input_buf.written_len();
            encoder.encode(&mut input_buf, &mut output)?;

            let written = output.written_len();
            all_output.extend_from_slice(&self.output_buffer[..written]);

            if written == 0 && input_buf.written_len() == consumed {
                return Err(io::Error::other("encoder made no progress"));
            }
        }

        if self.always_flush {
            loop {
                let mut output = WriteBuffer::new_initialized(self.output_buffer.as_mut_slice());
                let done = encoder.flush(&mut output)?;
                let written = output.written_len();
                all_output.extend_from_slice(&self.output_buffer[..written]);
                if done {
                    break;
                }
            }
        }

        Ok((!all_output.is_empty()).then(|| all_output.freeze()))
    }

    /// Writes the encoder's trailing bytes into `all_output`.
    fn finish(&mut self, all_output: &mut BytesMut) -> io::Result<()> {
        let Some(encoder) = self.encoder.as_mut() else {
            return Ok(());
        };
        loop {
            let mut output = WriteBuffer::new_initialized(self.output_buffer.as_mut_slice());
            let done = encoder.finish(&mut output)?;
            let written = output.written_len();
            all_output.extend_from_slice(&self.output_buffer[..written]);
            if done {
                return Ok(());
            }
        }
    }
}

impl<B> EncodingBody<B> {
    /// Creates a body that compresses `inner` with `codec`.
    pub fn compressed(
        inner: B,
        codec: Codec,
        level: CompressionLevel,
        always_flush: bool,
    ) -> Self {
        Self::Compressed {
            inner,
            state: CompressedBody::new(codec, level, always_flush),
        }
    }

    /// Creates a passthrough body without compression.
    pub fn passthrough(inner: B) -> Self {
        Self::Passthrough { inner }
    }

    /// Creates a body with no content.
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Returns true if this body compresses its inner body.
    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::Compressed { .. })
    }
}

impl<B> Body for EncodingBody<B>
where
    B: Body,
    B::Data: Buf,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            EncodingBodyProj::Passthrough { inner } => match inner.poll_frame(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Ready(Some(Ok(frame))) => {
                    let frame = frame.map_data(|mut data| data.copy_to_bytes(data.remaining()));
                    Poll::Ready(Some(Ok(frame)))
                }
                Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(io::Error::other(e.into())))),
            },
            EncodingBodyProj::Compressed { inner, state } => state.poll_compressed(cx, inner),
            EncodingBodyProj::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            EncodingBody::Passthrough { inner } => inner.is_end_stream(),
            EncodingBody::Compressed { state, .. } => state.state() == CompressState::Done,
            EncodingBody::Empty => true,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            EncodingBody::Passthrough { inner } => inner.size_hint(),
            // Compressed size is unknown
            EncodingBody::Compressed { .. } => SizeHint::default(),
            EncodingBody::Empty => SizeHint::with_exact(0),
        }
    }
}
