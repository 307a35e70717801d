//! Implements the storage contract for [hdf5::Group] and [hdf5::Dataset], so a
//! schema-bound accessor can sit directly on a group of an open NeXus file.
//!
//! Fields are stored as datasets, and subgroups as hard-linked groups. Values are
//! read back with their element type widened to 64 bits, and date-times come back
//! as RFC3339 text.
mod codec;
mod dataset;
mod group;

#[cfg(test)]
pub(crate) use tests::OneTempFile;
