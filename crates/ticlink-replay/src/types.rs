//! Data types for episode records.

/// Episode record header.
///
/// # Examples
///
/// ```
/// use ticlink_replay::RecordHeader;
///
/// let header = RecordHeader {
///     engine_version: "stub-1".into(),
///     library_version: "0.1.0".into(),
///     episode_seed: 42,
///     config_hash: 0xDEAD_BEEF,
///     player_index: 0,
///     button_count: 3,
/// };
/// assert_eq!(header.episode_seed, 42);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordHeader {
    /// Engine build that produced the episode.
    pub engine_version: String,
    /// Version of this library that wrote the record.
    pub library_version: String,
    /// Seed the episode was started with.
    pub episode_seed: u64,
    /// Fingerprint of the simulation-relevant configuration
    /// (see [`config_hash`](crate::config_hash)).
    pub config_hash: u64,
    /// Player slot whose actions were recorded.
    pub player_index: u8,
    /// Length of every recorded action vector.
    pub button_count: u32,
}

/// One record frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// An action held for a span of tics.
    Action {
        /// Episode tic at which the action was first applied.
        episode_tic: u64,
        /// Tics the action was held.
        tics: u32,
        /// One value per configured button.
        values: Vec<f64>,
    },
    /// The episode ended.
    End {
        /// Episode tic at which it ended.
        episode_tic: u64,
    },
}

/// Frame tag for [`Frame::Action`].
pub const FRAME_ACTION: u8 = 1;
/// Frame tag for [`Frame::End`].
pub const FRAME_END: u8 = 2;
