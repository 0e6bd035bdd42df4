// Byte-exact stream primitives
//
// A short read is not end-of-stream. Only a zero-byte read into a non-empty
// buffer is.
use crate::error::{StorageError, StorageResult};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Chunk size used for copying and as the first `read_all` chunk
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// `read_all` chunks double up to this size
const MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// Largest buffer `read_all` will produce
pub const MAX_BUFFER_SIZE: usize = isize::MAX as usize - 8;

/// Fill `buf` completely unless the source runs dry first
///
/// Returns the number of bytes read, which is less than `buf.len()` only on
/// end-of-stream.
pub async fn read_fully_into<R>(reader: &mut R, buf: &mut [u8]) -> StorageResult<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Read into `buf[offset..offset + len]` until full or end-of-stream
///
/// Fails with `InvalidArgument` if the span does not fit in `buf`.
pub async fn read_fully<R>(
    reader: &mut R,
    buf: &mut [u8],
    offset: usize,
    len: usize,
) -> StorageResult<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let end = offset
        .checked_add(len)
        .filter(|&end| end <= buf.len())
        .ok_or_else(|| {
            StorageError::InvalidArgument(format!(
                "offset {} + length {} out of bounds for buffer of {} bytes",
                offset,
                len,
                buf.len()
            ))
        })?;

    read_fully_into(reader, &mut buf[offset..end]).await
}

/// Read until end-of-stream or until `max_len` bytes have been collected
///
/// The returned vector holds exactly the bytes read, with no spare capacity.
pub async fn read_all<R>(reader: &mut R, max_len: usize) -> StorageResult<Vec<u8>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    read_all_limited(reader, max_len, MAX_BUFFER_SIZE).await
}

/// Read everything the source has to offer
pub async fn to_byte_array<R>(reader: &mut R) -> StorageResult<Vec<u8>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    read_all(reader, usize::MAX).await
}

async fn read_all_limited<R>(reader: &mut R, max_len: usize, limit: usize) -> StorageResult<Vec<u8>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = Vec::new();
    let mut chunk = DEFAULT_CHUNK_SIZE;

    while buf.len() < max_len {
        let want = chunk.min(max_len - buf.len());
        let start = buf.len();

        buf.try_reserve(want)
            .map_err(|e| StorageError::ResourceExhausted(e.to_string()))?;
        buf.resize(start + want, 0);

        let n = read_fully_into(reader, &mut buf[start..]).await?;
        buf.truncate(start + n);

        if buf.len() > limit {
            return Err(StorageError::ResourceExhausted(format!(
                "required buffer size exceeds {} bytes",
                limit
            )));
        }

        if n < want {
            break;
        }

        chunk = (chunk * 2).min(MAX_CHUNK_SIZE);
    }

    buf.shrink_to_fit();
    Ok(buf)
}

/// Copy the whole source into the sink, returning the number of bytes moved
///
/// The sink is flushed before returning. Any read or write failure is
/// returned as-is.
pub async fn copy_all<R, W>(reader: &mut R, writer: &mut W) -> StorageResult<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; DEFAULT_CHUNK_SIZE];
    let mut copied = 0u64;

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        writer.write_all(&buf[..n]).await?;
        copied += n as u64;
    }

    writer.flush().await?;
    Ok(copied)
}
