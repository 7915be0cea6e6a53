/// Opaque reference to a DOM element owned by a page document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub u64);

/// Read-only view of the page's media element at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSnapshot {
    pub paused: bool,
    pub muted: bool,
    /// 0.0-1.0.
    pub volume: f64,
    pub playback_rate: f64,
    pub current_time: f64,
    /// NaN or 0 while metadata is not loaded.
    pub duration: f64,
    /// End of the last buffered range, if any range is buffered.
    pub buffered_end: Option<f64>,
}

/// A single write to the page's media element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaUpdate {
    /// 0.0-1.0.
    Volume(f64),
    PlaybackRate(f64),
    CurrentTime(f64),
}

/// A node inserted into the document, as seen by the structural-mutation watch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddedNode {
    pub class_list: Vec<String>,
    /// Whether the node's subtree contains a control bar.
    pub contains_control_bar: bool,
}

/// One batch of child-list mutations under the document body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationRecord {
    pub added_nodes: Vec<AddedNode>,
}
