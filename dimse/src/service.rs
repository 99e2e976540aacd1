//! Collaborator traits for server roles.
//!
//! The engine calls out through these seams; concrete storage and
//! query back ends live outside this crate.

use crate::query::QueryRetrieveLevel;
use dcmkit_object::{FileObject, InMemObject};
use std::fmt;

/// An error raised by a service collaborator.
#[derive(Debug)]
pub struct ServiceError {
    message: String,
    /// the DIMSE status code conveyed to the peer
    pub status: u16,
}

impl ServiceError {
    /// Create a new error with the given failure status code.
    pub fn new(message: impl Into<String>, status: u16) -> Self {
        ServiceError {
            message: message.into(),
            status,
        }
    }

    /// A generic processing failure (status 0x0110).
    pub fn processing_failure(message: impl Into<String>) -> Self {
        ServiceError::new(message, 0x0110)
    }

    /// An out-of-resources failure (status 0xA700).
    pub fn out_of_resources(message: impl Into<String>) -> Self {
        ServiceError::new(message, 0xA700)
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (status {:#06x})", self.message, self.status)
    }
}

impl std::error::Error for ServiceError {}

/// Receives composite objects stored through C-STORE.
pub trait StorageSink {
    /// Store the given file object. The metadata of the request
    /// (SOP class and instance) has already been checked against
    /// the file content.
    fn store(&mut self, file: FileObject) -> Result<(), ServiceError>;
}

/// Produces matches for C-FIND queries.
pub trait QueryHandler {
    /// Find entities matching the identifier at the given level.
    /// Every returned data set becomes one pending response.
    fn find(
        &mut self,
        level: QueryRetrieveLevel,
        identifier: &InMemObject,
    ) -> Result<Vec<InMemObject>, ServiceError>;
}

/// Produces the composite objects selected by a retrieval.
pub trait RetrieveSource {
    /// Fetch the objects selected by the identifier at the given
    /// level, to be sent through C-STORE suboperations.
    fn get(
        &mut self,
        level: QueryRetrieveLevel,
        identifier: &InMemObject,
    ) -> Result<Vec<FileObject>, ServiceError>;
}
