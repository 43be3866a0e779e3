/// Errors that can occur while encoding frames or decoding messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// The payload does not fit the one-byte length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A STATE frame carried an operating-mode index outside the known set.
    #[error("unknown operating mode index {0}")]
    UnknownMode(u8),
}

pub type Result<T> = std::result::Result<T, ProtoError>;
