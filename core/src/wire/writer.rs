// Frame writer: the seller side of the wire format

use super::{SensorObservation, WireError};
use futures::io::{AsyncWrite, AsyncWriteExt};

/// Write one length-prefixed frame and flush it.
pub async fn write_observation<W>(writer: &mut W, observation: &SensorObservation) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let frame = observation.encode_frame()?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
