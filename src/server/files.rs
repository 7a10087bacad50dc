//! Streaming file responses with byte-range support.

use std::io::SeekFrom;
use std::path::Path;

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use super::range::{parse_range_header, RangeRequest};
use crate::error::{MediaError, MediaResult};

/// Fallback for extensions we do not recognise.
const OCTET_STREAM: &str = "application/octet-stream";

/// Maps a file extension to the `Content-Type` we advertise for it.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("ogg") => "audio/ogg",
        _ => OCTET_STREAM,
    }
}

/// Streams `path` to the client, honouring an optional `Range` header.
///
/// Without a range the whole file is sent with 200. A satisfiable range
/// yields 206 with `Content-Range`; anything else becomes a 416 through
/// [`MediaError::RangeNotSatisfiable`].
pub async fn serve_file(
    path: &Path,
    range_header: Option<&str>,
    content_type: &'static str,
) -> MediaResult<Response> {
    let mut file = File::open(path)
        .await
        .map_err(|e| MediaError::from_io(path, e))?;
    let size = file
        .metadata()
        .await
        .map_err(|e| MediaError::from_io(path, e))?
        .len();

    let request = parse_range_header(range_header, size)
        .map_err(|reason| MediaError::RangeNotSatisfiable { size, reason })?;

    match request {
        RangeRequest::Full => {
            log::debug!("[Media] {} -> full ({} bytes)", path.display(), size);
            let body = Body::from_stream(ReaderStream::new(file));
            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type.to_string()),
                    (header::CONTENT_LENGTH, size.to_string()),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                ],
                body,
            )
                .into_response())
        }
        RangeRequest::Partial(range) => {
            log::debug!("[Media] {} -> {}", path.display(), range.content_range());
            file.seek(SeekFrom::Start(range.start))
                .await
                .map_err(|e| MediaError::from_io(path, e))?;
            let body = Body::from_stream(ReaderStream::new(file.take(range.len())));
            Ok((
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_TYPE, content_type.to_string()),
                    (header::CONTENT_LENGTH, range.len().to_string()),
                    (header::CONTENT_RANGE, range.content_range()),
                    (header::ACCEPT_RANGES, "bytes".to_string()),
                ],
                body,
            )
                .into_response())
        }
    }
}
