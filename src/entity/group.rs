/// Spatial cluster of co-located tracks within one frame.
///
/// Group ids are assigned per frame in discovery order and carry no identity
/// across frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub group_id: usize,
    /// Track ids of the members, at least two and all distinct
    pub members: Vec<u64>,
    /// Integer mean of the member centers
    pub centroid: (i32, i32),
}

impl Group {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, track_id: u64) -> bool {
        self.members.contains(&track_id)
    }
}
