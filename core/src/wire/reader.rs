// Frame reader: exact-length reads over a stream that may return partial data

use super::WireError;
use futures::io::{AsyncRead, AsyncReadExt};
use std::io::ErrorKind;

/// Fill `buf` completely from `reader`.
///
/// Keeps issuing reads until every byte of `buf` is filled. A zero-byte read
/// means the peer finished the stream and is reported as
/// [`WireError::EndOfStream`], even if part of the buffer was already filled.
/// Any other I/O error is returned as-is. The caller never sees a short buffer.
pub async fn read_exact<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), WireError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => return Err(WireError::EndOfStream),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Err(WireError::EndOfStream),
            Err(e) => return Err(WireError::Io(e)),
        }
    }
    Ok(())
}

/// Read the one-byte body length that starts every frame.
pub async fn read_length_prefix<R>(reader: &mut R) -> Result<u8, WireError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut prefix = [0u8; 1];
    read_exact(reader, &mut prefix).await?;
    Ok(prefix[0])
}
