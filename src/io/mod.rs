//! Alignment access.
//!
//! The junction extractors and the coverage pass consume plain
//! `AlignmentRecord` values through the `AlignmentSource` trait; everything
//! noodles-specific stays inside `bam.rs`.

pub mod bam;

pub use bam::{AlignmentRecord, AlignmentSource, BamSource, CigarOp, MemorySource};
