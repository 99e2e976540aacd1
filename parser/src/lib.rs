//! A middle-level parser and printer of DICOM data sets.
//!
//! This crate interprets encoded data sets as streams of
//! [tokens](dataset::DataToken), on top of stateful
//! encoders and decoders which track position, byte order
//! and the active character set.

pub mod dataset;
pub mod stateful;

pub use crate::dataset::{DataSetReader, DataSetWriter, DataToken};
pub use crate::stateful::{StatefulDecoder, StatefulEncoder};
