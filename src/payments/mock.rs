use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{PaymentError, PaymentProvider, PaymentSession, SessionRequest};

/// Sessions remembered for replay before the oldest are forgotten.
pub const DEFAULT_SESSION_CAPACITY: usize = 10_000;

#[derive(Debug, Default)]
struct SessionLog {
    by_key: HashMap<String, (String, PaymentSession)>,
    order: VecDeque<String>,
}

/// In-process provider for local runs and tests. Sessions are remembered by
/// idempotency key, up to `capacity` of them; the oldest key is evicted
/// first. A key reused with a different charge is rejected.
#[derive(Debug)]
pub struct MockPaymentProvider {
    sessions: Mutex<SessionLog>,
    capacity: usize,
    created: AtomicUsize,
    failure: Option<String>,
    latency: Duration,
}

impl Default for MockPaymentProvider {
    fn default() -> Self {
        Self {
            sessions: Mutex::default(),
            capacity: DEFAULT_SESSION_CAPACITY,
            created: AtomicUsize::new(0),
            failure: None,
            latency: Duration::ZERO,
        }
    }
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with the given message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn sessions_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn sessions_remembered(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .by_key
            .len()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    #[instrument(skip(self, request), fields(idempotency_key = %request.idempotency_key))]
    async fn create_session(
        &self,
        request: &SessionRequest,
    ) -> Result<PaymentSession, PaymentError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if let Some(message) = &self.failure {
            return Err(PaymentError::Rejected {
                status: 402,
                message: message.clone(),
            });
        }
        if request.amount_total() <= 0 {
            return Err(PaymentError::Rejected {
                status: 400,
                message: "amount must be greater than zero".to_string(),
            });
        }

        let fingerprint = request.fingerprint();
        let mut log = self
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some((seen, existing)) = log.by_key.get(&request.idempotency_key) {
            if *seen != fingerprint {
                warn!(session_id = %existing.id, "idempotency key reused with different parameters");
                return Err(PaymentError::Rejected {
                    status: 400,
                    message: "Keys for idempotent requests can only be used with the same parameters they were first used with".to_string(),
                });
            }
            info!(session_id = %existing.id, "replayed mock checkout session");
            return Ok(existing.clone());
        }

        let id = format!("cs_mock_{}", Uuid::new_v4().simple());
        let session = PaymentSession {
            url: Some(format!("https://checkout.mock.local/pay/{id}")),
            id,
        };
        while log.order.len() >= self.capacity {
            let Some(oldest) = log.order.pop_front() else {
                break;
            };
            log.by_key.remove(&oldest);
        }
        log.order.push_back(request.idempotency_key.clone());
        log.by_key
            .insert(request.idempotency_key.clone(), (fingerprint, session.clone()));
        self.created.fetch_add(1, Ordering::SeqCst);
        info!(session_id = %session.id, amount = request.amount_total(), "created mock checkout session");
        Ok(session)
    }
}
