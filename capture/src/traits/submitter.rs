use crate::error::SubmitError;
use crate::types::{AttendanceSubmission, Direction, SubmissionReceipt};
use async_trait::async_trait;

/// Sends one attendance record. One call is one request; never retried here.
#[async_trait]
pub trait AttendanceSubmitter: Send + Sync {
    async fn submit(
        &self,
        direction: Direction,
        submission: &AttendanceSubmission,
    ) -> Result<SubmissionReceipt, SubmitError>;
}
