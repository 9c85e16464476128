//! Single-worker request processing: risk gate, then execution.
//!
//! The loop drains the queue one request at a time; the next dequeue does
//! not start until the previous request reached a terminal outcome. This
//! deliberately serializes outbound trades.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::Notify;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use tribute_domain::RequestDecision;

use crate::events::{EventBus, PipelineEvent};
use crate::notify::{MessageGenerator, Notifier, RejectionContext, fallback_rejection};
use crate::queue::RequestQueue;
use crate::request::{ProcessingOutcome, TradeRequest};
use crate::risk::RiskAnalyzer;
use crate::stats::OutcomeLog;
use crate::trade::{TradeContext, TradeExecutor};

/// Reason attached when the analysis deadline expires.
pub const ANALYSIS_TIMEOUT_REASON: &str = "risk analysis timed out";

/// Reason attached when the analysis call itself fails.
pub const ANALYSIS_FAILURE_REASON: &str = "risk analysis failed";

/// Configuration for the request processor.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Deadline for the risk analysis call.
    pub analysis_timeout: Duration,
    /// Fixed stake per accepted request, in SOL.
    pub stake_sol: Decimal,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            analysis_timeout: Duration::from_secs(30),
            stake_sol: Decimal::new(1, 1), // 0.1 SOL
        }
    }
}

/// Drains the admission queue and settles each request.
pub struct RequestProcessor<R, E> {
    queue: Arc<RequestQueue>,
    analyzer: Arc<R>,
    executor: Arc<E>,
    notifier: Arc<dyn Notifier>,
    messages: Option<Arc<dyn MessageGenerator>>,
    events: EventBus,
    outcomes: Arc<OutcomeLog>,
    config: ProcessorConfig,
    running: AtomicBool,
    shutdown: Notify,
}

impl<R, E> RequestProcessor<R, E>
where
    R: RiskAnalyzer,
    E: TradeExecutor,
{
    /// Creates a processor over the given collaborators.
    pub fn new(
        config: ProcessorConfig,
        queue: Arc<RequestQueue>,
        analyzer: Arc<R>,
        executor: Arc<E>,
        notifier: Arc<dyn Notifier>,
        events: EventBus,
    ) -> Self {
        Self {
            queue,
            analyzer,
            executor,
            notifier,
            messages: None,
            events,
            outcomes: Arc::new(OutcomeLog::default()),
            config,
            running: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    /// Sets the external rejection-message generator.
    #[must_use]
    pub fn with_message_generator(mut self, messages: Arc<dyn MessageGenerator>) -> Self {
        self.messages = Some(messages);
        self
    }

    /// The processed-outcome history.
    pub fn outcomes(&self) -> &Arc<OutcomeLog> {
        &self.outcomes
    }

    /// Drains the queue until stopped. One request is mid-processing at a
    /// time, and a request's failure never aborts the loop.
    pub async fn run(&self) {
        self.running.store(true, Ordering::SeqCst);
        info!(
            timeout_secs = self.config.analysis_timeout.as_secs(),
            stake_sol = %self.config.stake_sol,
            "Request processor started"
        );

        while self.running.load(Ordering::SeqCst) {
            let request = tokio::select! {
                request = self.queue.dequeue() => request,
                _ = self.shutdown.notified() => break,
            };
            let outcome = self.process(request).await;
            self.outcomes.record(&outcome).await;
        }

        info!("Request processor stopped");
    }

    /// Stops the loop once the in-flight request settles.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    /// Settles one request: the risk call races the deadline, and anything
    /// short of an explicit "safe" answer rejects (fail-closed).
    pub async fn process(&self, request: TradeRequest) -> ProcessingOutcome {
        let mint = request.target_mint;
        debug!(mint = %mint, requester = %request.requester, "Analyzing request");

        match timeout(self.config.analysis_timeout, self.analyzer.analyze(&mint)).await {
            Err(_) => {
                warn!(mint = %mint, "Risk analysis deadline expired, rejecting");
                self.reject(
                    request,
                    RequestDecision::TimedOut,
                    vec![ANALYSIS_TIMEOUT_REASON.to_string()],
                )
                .await
            }
            Ok(Err(err)) => {
                warn!(mint = %mint, error = %err, "Risk analysis failed, rejecting");
                self.reject(
                    request,
                    RequestDecision::Rejected,
                    vec![ANALYSIS_FAILURE_REASON.to_string()],
                )
                .await
            }
            Ok(Ok(assessment)) if !assessment.is_safe => {
                info!(mint = %mint, risks = ?assessment.risks, "Risk check flagged mint");
                self.reject(request, RequestDecision::Rejected, assessment.risks)
                    .await
            }
            Ok(Ok(_)) => self.execute(request).await,
        }
    }

    async fn reject(
        &self,
        request: TradeRequest,
        decision: RequestDecision,
        risks: Vec<String>,
    ) -> ProcessingOutcome {
        let context = RejectionContext {
            requester: request.requester,
            target_mint: request.target_mint,
            risks: risks.clone(),
        };
        let text = match &self.messages {
            Some(generator) => match generator.rejection_message(&context).await {
                Ok(text) => text,
                Err(err) => {
                    debug!(error = %err, "Message generator failed, using fallback");
                    fallback_rejection(&context)
                }
            },
            None => fallback_rejection(&context),
        };
        self.announce(text);

        let reasoning = match decision {
            RequestDecision::TimedOut => {
                "risk analysis did not finish within the deadline".to_string()
            }
            _ => format!("risk check rejected: {}", risks.join("; ")),
        };
        self.events
            .emit(PipelineEvent::rejected(&request, reasoning, risks.clone()));

        ProcessingOutcome {
            request,
            decision,
            risk_reasons: risks,
            execution_signature: None,
        }
    }

    async fn execute(&self, request: TradeRequest) -> ProcessingOutcome {
        let mint = request.target_mint;
        let context = TradeContext {
            origin: "tribute-request".to_string(),
            requester: Some(request.requester),
        };

        // The risk check already ran; the executor's own screening is
        // redundant here.
        match self
            .executor
            .execute_buy(&mint, &context, true, Some(self.config.stake_sol))
            .await
        {
            Ok(signature) => {
                info!(mint = %mint, signature = %signature, "Trade executed");
                self.announce(format!(
                    "Bought {} SOL of {mint} for {}",
                    self.config.stake_sol, request.requester
                ));
                let reasoning = format!(
                    "risk check passed; bought {} SOL of {mint}",
                    self.config.stake_sol
                );
                self.events
                    .emit(PipelineEvent::accepted(&request, reasoning, signature));
                ProcessingOutcome {
                    request,
                    decision: RequestDecision::Accepted,
                    risk_reasons: Vec::new(),
                    execution_signature: Some(signature),
                }
            }
            Err(err) => {
                error!(mint = %mint, error = %err, "Execution failed after passing risk check");
                self.announce(format!(
                    "{mint} passed the risk check but the buy failed"
                ));
                let reasoning = format!("passed the risk check but execution failed: {err}");
                self.events
                    .emit(PipelineEvent::rejected(&request, reasoning, Vec::new()));
                ProcessingOutcome {
                    request,
                    decision: RequestDecision::ExecutionFailed,
                    risk_reasons: Vec::new(),
                    execution_signature: None,
                }
            }
        }
    }

    /// Fire-and-forget announcement; a failing notifier never reaches the
    /// processing loop.
    fn announce(&self, text: String) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(err) = notifier.announce(&text).await {
                warn!(error = %err, "Announcement failed");
            }
        });
    }
}
