//! Running the editor's code through the execution service.

use super::{CompilerSession, Notice};
use crate::services::execution::{
    ExecutionRequest, ExecutionService, ExecutionStatus, RunOutcome, COMPILING_OUTPUT,
    MISSING_AUTH_OUTPUT,
};

impl CompilerSession {
    /// Compile and run the current text once.
    ///
    /// Without an auth token nothing is sent. Failures only change the output
    /// area; persisted editor state is never touched by a run.
    pub async fn run(
        &mut self,
        service: &dyn ExecutionService,
        auth_token: Option<&str>,
    ) -> RunOutcome {
        let Some(token) = auth_token.filter(|t| !t.is_empty()) else {
            tracing::debug!("Run attempted without auth token");
            let outcome = RunOutcome {
                status: ExecutionStatus::Error,
                output: MISSING_AUTH_OUTPUT.to_string(),
            };
            self.show_outcome(&outcome);
            self.notices.push(Notice::login_required());
            return outcome;
        };

        self.is_running = true;
        self.status = ExecutionStatus::Idle;
        self.set_output(COMPILING_OUTPUT.to_string());
        self.schedule_save();

        let request = ExecutionRequest::new(self.state.code.clone());
        let request_id = request.request_id.clone();
        let outcome = match service.execute(request, token).await {
            Ok(response) => {
                let outcome = response.to_outcome();
                self.notices.push(match outcome.status {
                    ExecutionStatus::Success => Notice::compile_succeeded(),
                    _ => Notice::compile_failed(),
                });
                outcome
            }
            Err(e) => {
                tracing::warn!("Execution request {} failed: {}", request_id, e);
                self.notices.push(Notice::execution_error());
                e.to_outcome()
            }
        };

        self.show_outcome(&outcome);
        self.is_running = false;
        outcome
    }

    fn show_outcome(&mut self, outcome: &RunOutcome) {
        self.status = outcome.status;
        self.set_output(outcome.output.clone());
    }

    /// Replace the output text and mirror it into the output cache
    fn set_output(&mut self, output: String) {
        self.output_cache.save(&output);
        self.output = output;
    }
}
