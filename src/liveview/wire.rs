//! Length-prefixed frame codec used on the live view socket.

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const LENGTH_PREFIX_LEN: usize = 4;

/// Frames larger than this are treated as a corrupt stream by readers
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

pub fn frame_header(len: usize) -> io::Result<[u8; LENGTH_PREFIX_LEN]> {
    u32::try_from(len)
        .map(u32::to_ne_bytes)
        .map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("frame of {} bytes does not fit the length prefix", len),
            )
        })
}

pub async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let header = frame_header(frame.len())?;
    writer.write_all(&header).await?;
    writer.write_all(frame).await?;
    writer.flush().await
}

/// Read one frame; `None` when the peer closed cleanly between frames
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; LENGTH_PREFIX_LEN];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = u32::from_ne_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame length {} exceeds {}", len, MAX_FRAME_LEN),
        ));
    }

    let mut frame = vec![0u8; len];
    reader.read_exact(&mut frame).await?;
    Ok(Some(frame))
}
