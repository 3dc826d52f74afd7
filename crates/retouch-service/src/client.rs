//! The seam between the orchestrator and the image model.

use std::future::Future;

use retouch_core::{EncodedImage, ProcessingRequest};

use crate::error::ServiceError;

/// Performs one edit attempt. Retries and timeouts are the caller's job.
pub trait EditService: Send + Sync {
    fn edit(
        &self,
        request: &ProcessingRequest,
    ) -> impl Future<Output = Result<EncodedImage, ServiceError>> + Send;
}

impl<S: EditService> EditService for std::sync::Arc<S> {
    fn edit(
        &self,
        request: &ProcessingRequest,
    ) -> impl Future<Output = Result<EncodedImage, ServiceError>> + Send {
        (**self).edit(request)
    }
}
