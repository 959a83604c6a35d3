use crate::loader::TextUnit;

/// A contiguous run of text units sized for one completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 1-based position among the document's chunks.
    pub ordinal: usize,
    pub units: Vec<TextUnit>,
}

impl Chunk {
    /// Unit texts in order, one per line.
    pub fn content(&self) -> String {
        self.units
            .iter()
            .map(|u| u.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Indices of the first and last unit covered.
    pub fn span(&self) -> Option<(usize, usize)> {
        Some((self.units.first()?.index, self.units.last()?.index))
    }
}

/// Split units into `ceil(len / chunk_size)` order-preserving chunks.
/// Every chunk is full except possibly the last. `chunk_size` must be non-zero.
pub fn partition(units: &[TextUnit], chunk_size: usize) -> Vec<Chunk> {
    assert!(chunk_size > 0, "chunk_size must be non-zero");
    units
        .chunks(chunk_size)
        .enumerate()
        .map(|(i, slice)| Chunk {
            ordinal: i + 1,
            units: slice.to_vec(),
        })
        .collect()
}
