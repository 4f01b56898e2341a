use tracing::{error, warn};

use crate::dispatch::{DispatchError, FailureKind};

/// Operator-facing sink for every dispatch failure that is not a silent no-op.
/// Reporting never changes the reply sent back to the platform.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &DispatchError, request_id: &str);
}

/// Default sink: structured `tracing` events, `warn` for bad input and
/// missing handlers, `error` for handler failures.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, failure: &DispatchError, request_id: &str) {
        let kind = failure.kind();
        match kind {
            FailureKind::Malformed | FailureKind::UnregisteredTarget => warn!(
                event_name = "slack.dispatch.failure",
                correlation_id = request_id,
                failure_kind = kind.as_str(),
                error = %failure,
                "interaction could not be dispatched"
            ),
            FailureKind::HandlerFailed => {
                if let DispatchError::CommandFailed {
                    command, team_id, channel_id, user_id, text, ..
                } = failure
                {
                    error!(
                        event_name = "slack.dispatch.failure",
                        correlation_id = request_id,
                        failure_kind = kind.as_str(),
                        command = %command,
                        team_id = %team_id,
                        channel_id = %channel_id,
                        user_id = %user_id,
                        text = %text,
                        error = %failure,
                        "slash command handler failed"
                    );
                } else {
                    error!(
                        event_name = "slack.dispatch.failure",
                        correlation_id = request_id,
                        failure_kind = kind.as_str(),
                        error = %failure,
                        "interaction handler failed"
                    );
                }
            }
        }
    }
}
