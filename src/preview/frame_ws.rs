//! WebSocket server streaming captured frames to the viewer.
//!
//! Each binary message is raw RGBA followed by a 28-byte little-endian
//! trailer: stride, height, width, frame number, target time (ns) and the
//! `RGBA` magic.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    routing::get,
    Router,
};
use image::RgbaImage;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Bytes appended after the pixel data.
pub const TRAILER_LEN: usize = 28;

/// `"RGBA"` read as a little-endian u32.
const RGBA_MAGIC: u32 = 0x52474241;

/// Frame data ready for WebSocket transmission.
#[derive(Clone)]
pub struct WSFrame {
    /// Raw RGBA frame data.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Bytes per row.
    pub stride: u32,
    pub frame_number: u32,
    /// Time since the track started, in nanoseconds.
    pub target_time_ns: u64,
    pub created_at: Instant,
}

impl WSFrame {
    pub fn from_image(image: RgbaImage, frame_number: u32, target_time_ns: u64) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width,
            height,
            stride: width * 4,
            frame_number,
            target_time_ns,
            created_at: Instant::now(),
        }
    }
}

impl std::fmt::Debug for WSFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WSFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("frame_number", &self.frame_number)
            .finish_non_exhaustive()
    }
}

/// Shared producer side of the frame channel. The capture track writes the
/// latest frame, the server fans it out to every connected viewer.
pub type FrameSender = Arc<watch::Sender<Option<WSFrame>>>;

pub fn frame_channel() -> FrameSender {
    let (tx, _) = watch::channel(None);
    Arc::new(tx)
}

/// Running frame server.
pub struct FrameServer {
    port: u16,
    shutdown: CancellationToken,
}

impl FrameServer {
    /// Bind `127.0.0.1:0` and start serving `frames`.
    pub async fn start(frames: &FrameSender) -> std::io::Result<Self> {
        let shutdown = CancellationToken::new();
        let tx = Arc::clone(frames);

        let app = Router::new().route(
            "/",
            get(move |ws: WebSocketUpgrade| {
                let rx = tx.subscribe();
                async move { ws.on_upgrade(move |socket| handle_socket(socket, rx)) }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        log::info!("[FRAME_WS] Started on port {}", port);

        let token = shutdown.clone();
        tokio::spawn(async move {
            let served = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                token.cancelled().await;
                log::info!("[FRAME_WS] Shutting down");
            })
            .await;
            if let Err(e) = served {
                log::error!("[FRAME_WS] Server error: {}", e);
            }
        });

        Ok(Self { port, shutdown })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for FrameServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_socket(mut socket: WebSocket, mut frame_rx: watch::Receiver<Option<WSFrame>>) {
    log::debug!("[FRAME_WS] Client connected");

    // Encode before awaiting so the watch borrow is not held across it.
    let initial = frame_rx.borrow_and_update().as_ref().and_then(encode_frame);
    if let Some(msg) = initial {
        if socket.send(msg).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                        log::debug!("[FRAME_WS] Client disconnected");
                        break;
                    }
                    _ => {}
                }
            }
            result = frame_rx.changed() => {
                if result.is_err() {
                    break;
                }
                let frame_msg = frame_rx.borrow_and_update().as_ref().and_then(encode_frame);
                if let Some(msg) = frame_msg {
                    if socket.send(msg).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

fn encode_frame(frame: &WSFrame) -> Option<Message> {
    pack_frame(frame).map(Message::Binary)
}

/// Pixel data plus trailer, or `None` when the buffer is short.
pub fn pack_frame(frame: &WSFrame) -> Option<Vec<u8>> {
    let expected_size = frame.stride as usize * frame.height as usize;
    if frame.data.len() < expected_size || frame.stride < frame.width * 4 {
        log::warn!(
            "[FRAME_WS] Frame data too small: {} < {}",
            frame.data.len(),
            expected_size
        );
        return None;
    }

    let mut packed = Vec::with_capacity(expected_size + TRAILER_LEN);
    packed.extend_from_slice(&frame.data[..expected_size]);
    packed.extend_from_slice(&frame.stride.to_le_bytes());
    packed.extend_from_slice(&frame.height.to_le_bytes());
    packed.extend_from_slice(&frame.width.to_le_bytes());
    packed.extend_from_slice(&frame.frame_number.to_le_bytes());
    packed.extend_from_slice(&frame.target_time_ns.to_le_bytes());
    packed.extend_from_slice(&RGBA_MAGIC.to_le_bytes());
    Some(packed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn test_trailer_layout() {
        let image = RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 4]));
        let frame = WSFrame::from_image(image, 9, 1_000_000);
        let packed = pack_frame(&frame).unwrap();

        let pixels = 3 * 2 * 4;
        assert_eq!(packed.len(), pixels + TRAILER_LEN);
        assert_eq!(&packed[..4], &[1, 2, 3, 4]);

        let trailer = &packed[pixels..];
        assert_eq!(u32_at(trailer, 0), 12);
        assert_eq!(u32_at(trailer, 4), 2);
        assert_eq!(u32_at(trailer, 8), 3);
        assert_eq!(u32_at(trailer, 12), 9);
        assert_eq!(
            u64::from_le_bytes(trailer[16..24].try_into().unwrap()),
            1_000_000
        );
        assert_eq!(&trailer[24..], b"ABGR".as_slice());
    }

    #[test]
    fn test_short_buffer_is_skipped() {
        let mut frame = WSFrame::from_image(RgbaImage::new(4, 4), 0, 0);
        frame.data.truncate(10);
        assert!(pack_frame(&frame).is_none());
    }

    #[tokio::test]
    async fn test_server_binds_localhost_port() {
        let frames = frame_channel();
        let server = FrameServer::start(&frames).await.unwrap();
        assert_ne!(server.port(), 0);

        let stream = tokio::net::TcpStream::connect(("127.0.0.1", server.port())).await;
        assert!(stream.is_ok());
        server.shutdown();
    }
}
