//! Serialization of fitted artifacts.
//!
//! Fitted encoders, statistics tables and regressor parameters are stored as
//! plain data (strings, `f64`, `Vec<f64>`) so that the artifact bundle does not
//! depend on in-memory representations such as `ndarray` buffers.

use crate::error::PriceError;
use std::path::Path;

/// A trait for parameter representations that can be serialized to and from bytes.
pub trait SerializableParams: Sized {
    /// Serialize the parameters into a byte buffer.
    fn to_bytes(&self) -> Result<Vec<u8>, PriceError>;

    /// Deserialize the parameters from a byte buffer.
    fn from_bytes(bytes: &[u8]) -> Result<Self, PriceError>;

    /// Write the serialized parameters to `path`.
    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), PriceError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Read parameters previously written with [`SerializableParams::save_to_file`].
    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PriceError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

impl<T> SerializableParams for T
where
    T: serde::Serialize + for<'de> serde::Deserialize<'de>,
{
    fn to_bytes(&self) -> Result<Vec<u8>, PriceError> {
        Ok(bincode::serialize(self)?)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, PriceError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
