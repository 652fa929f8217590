//! Track file I/O
//!
//! JSON track files (beats + frame features) in, alignment JSON out.

pub mod track_file;

pub use track_file::{load_track_file, write_alignment, FeatureRows, TrackFile};
