use bytes::Bytes;

/// One fixed-time slice of encoded media, opaque to everything but the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    sequence: u64,
    data: Bytes,
}

impl Chunk {
    pub fn new(sequence: u64, data: Bytes) -> Self {
        Self { sequence, data }
    }

    /// Position in emission order, starting at 0 for each encoder run
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn into_data(self) -> Bytes {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
