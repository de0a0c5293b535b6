// src/staging/service.rs

use crate::{
    circle::models::{FeeLevel, PendingTransfer, UpstreamBody, UpstreamError},
    staging::store::PendingStore,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;

/// Every confirmed transfer is submitted at this fee tier.
pub const CONFIRM_FEE_LEVEL: FeeLevel = FeeLevel::Medium;

/// The funds-moving call. Only the confirm path ever reaches it.
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    async fn execute(
        &self,
        transfer: &PendingTransfer,
        idempotency_key: Uuid,
        fee_level: FeeLevel,
    ) -> Result<UpstreamBody, UpstreamError>;
}

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("unknown or already used confirmation code: {0}")]
    UnknownCode(String),
    /// The transfer was not executed; the same link can be visited again.
    #[error("transfer could not be submitted, try the link again: {reason}")]
    Retryable { reason: String, upstream: Option<UpstreamBody> },
    /// Upstream refused the transfer; the link is spent.
    #[error("transfer rejected by upstream with status {}", .0.status)]
    Rejected(UpstreamBody),
    #[error("server misconfigured: {0}")]
    Config(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedLink {
    pub code: String,
    pub link: String,
}

/// Two-phase transfer flow: `stage` only reserves a code, `confirm` moves funds.
#[derive(Clone)]
pub struct StagingService {
    store: Arc<dyn PendingStore>,
    executor: Arc<dyn TransferExecutor>,
    confirm_url: Url,
}

impl StagingService {
    pub fn new(
        store: Arc<dyn PendingStore>,
        executor: Arc<dyn TransferExecutor>,
        public_base_url: &str,
    ) -> Result<Self, url::ParseError> {
        let confirm_url =
            Url::parse(&format!("{}/confirm", public_base_url.trim_end_matches('/')))?;
        Ok(Self { store, executor, confirm_url })
    }

    pub fn stage(&self, transfer: PendingTransfer) -> StagedLink {
        info!(
            "Staging transfer of {} {} from wallet {} to {}",
            transfer.amount, transfer.token_id, transfer.wallet_id, transfer.destination_address
        );
        let code = self.store.put(transfer);
        let mut link = self.confirm_url.clone();
        link.query_pairs_mut().append_pair("code", &code);
        StagedLink { code, link: link.into() }
    }

    /// Resolves `code` and executes its transfer.
    ///
    /// The entry is taken out of the store before the upstream call, so two
    /// concurrent confirmations of one code execute at most one transfer.
    /// It is put back only when the failure leaves the transfer unexecuted
    /// and retrying the same request may succeed.
    pub async fn confirm(&self, code: &str) -> Result<UpstreamBody, StagingError> {
        let staged = self
            .store
            .take(code)
            .ok_or_else(|| StagingError::UnknownCode(code.to_string()))?;

        let outcome = self
            .executor
            .execute(&staged.transfer, staged.idempotency_key, CONFIRM_FEE_LEVEL)
            .await;

        match outcome {
            Ok(body) if body.is_success() => {
                info!(
                    "Transfer for code {} staged at {} confirmed (status {})",
                    code, staged.staged_at, body.status
                );
                Ok(body)
            }
            Ok(body) if body.is_retryable() => {
                warn!("Upstream returned {} for code {}, keeping it staged", body.status, code);
                self.store.restore(code.to_string(), staged);
                Err(StagingError::Retryable {
                    reason: format!("upstream returned status {}", body.status),
                    upstream: Some(body),
                })
            }
            Ok(body) => {
                warn!("Upstream rejected transfer for code {}: {}", code, body.body);
                Err(StagingError::Rejected(body))
            }
            Err(e) if e.is_config() => {
                error!("Cannot execute transfer for code {}: {}", code, e);
                self.store.restore(code.to_string(), staged);
                Err(StagingError::Config(e.to_string()))
            }
            Err(e) => {
                error!("Transfer call for code {} failed: {}", code, e);
                self.store.restore(code.to_string(), staged);
                Err(StagingError::Retryable { reason: e.to_string(), upstream: None })
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.store.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::store::InMemoryPendingStore;
    use rust_decimal::Decimal;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Records every call and answers with scripted statuses (200 once exhausted).
    #[derive(Default)]
    struct RecordingExecutor {
        calls: Mutex<Vec<(PendingTransfer, Uuid, FeeLevel)>>,
        statuses: Mutex<VecDeque<u16>>,
    }

    impl RecordingExecutor {
        fn with_statuses(statuses: &[u16]) -> Self {
            Self {
                calls: Mutex::default(),
                statuses: Mutex::new(statuses.iter().copied().collect()),
            }
        }

        fn calls(&self) -> Vec<(PendingTransfer, Uuid, FeeLevel)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TransferExecutor for RecordingExecutor {
        async fn execute(
            &self,
            transfer: &PendingTransfer,
            idempotency_key: Uuid,
            fee_level: FeeLevel,
        ) -> Result<UpstreamBody, UpstreamError> {
            self.calls
                .lock()
                .unwrap()
                .push((transfer.clone(), idempotency_key, fee_level));
            let status = self.statuses.lock().unwrap().pop_front().unwrap_or(200);
            Ok(UpstreamBody { status, body: format!("{{\"status\":{}}}", status) })
        }
    }

    struct MissingSecretExecutor;

    #[async_trait]
    impl TransferExecutor for MissingSecretExecutor {
        async fn execute(
            &self,
            _transfer: &PendingTransfer,
            _idempotency_key: Uuid,
            _fee_level: FeeLevel,
        ) -> Result<UpstreamBody, UpstreamError> {
            Err(UpstreamError::MissingEntitySecret)
        }
    }

    /// Fails its first call with a real connection error, then succeeds.
    #[derive(Default)]
    struct FlakyNetworkExecutor {
        keys: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl TransferExecutor for FlakyNetworkExecutor {
        async fn execute(
            &self,
            _transfer: &PendingTransfer,
            idempotency_key: Uuid,
            _fee_level: FeeLevel,
        ) -> Result<UpstreamBody, UpstreamError> {
            let attempt = {
                let mut keys = self.keys.lock().unwrap();
                keys.push(idempotency_key);
                keys.len()
            };
            if attempt == 1 {
                // Nothing listens on port 1
                reqwest::Client::new().get("http://127.0.0.1:1").send().await?;
            }
            Ok(UpstreamBody { status: 201, body: "{}".to_string() })
        }
    }

    fn transfer(n: i64) -> PendingTransfer {
        PendingTransfer {
            amount: Decimal::new(n, 1),
            destination_address: format!("0x{:040x}", n),
            token_id: format!("token-{}", n),
            wallet_id: format!("wallet-{}", n),
        }
    }

    fn service(executor: Arc<dyn TransferExecutor>) -> (StagingService, Arc<InMemoryPendingStore>) {
        let store = Arc::new(InMemoryPendingStore::new());
        let service = StagingService::new(store.clone(), executor, "http://127.0.0.1:8000/").unwrap();
        (service, store)
    }

    #[test]
    fn stage_returns_confirm_link_with_code() {
        let (service, store) = service(Arc::new(RecordingExecutor::default()));
        let staged = service.stage(transfer(1));

        assert_eq!(
            staged.link,
            format!("http://127.0.0.1:8000/confirm?code={}", staged.code)
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn confirm_executes_once_then_code_is_gone() {
        let executor = Arc::new(RecordingExecutor::default());
        let (service, store) = service(executor.clone());
        let staged = service.stage(transfer(15));

        let body = service.confirm(&staged.code).await.unwrap();
        assert_eq!(body.status, 200);
        assert!(store.is_empty());

        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, transfer(15));
        assert_eq!(calls[0].2, FeeLevel::Medium);

        let second = service.confirm(&staged.code).await;
        assert!(matches!(second, Err(StagingError::UnknownCode(_))));
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn never_staged_code_makes_no_upstream_call() {
        let executor = Arc::new(RecordingExecutor::default());
        let (service, _) = service(executor.clone());

        let result = service.confirm("f00d").await;
        assert!(matches!(result, Err(StagingError::UnknownCode(code)) if code == "f00d"));
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn server_error_keeps_code_for_retry_with_same_key() {
        let executor = Arc::new(RecordingExecutor::with_statuses(&[503]));
        let (service, store) = service(executor.clone());
        let staged = service.stage(transfer(2));

        let first = service.confirm(&staged.code).await;
        assert!(matches!(first, Err(StagingError::Retryable { .. })));
        assert_eq!(store.len(), 1);

        service.confirm(&staged.code).await.unwrap();
        let calls = executor.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, calls[1].1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn transport_failure_keeps_code_for_retry_with_same_key() {
        let executor = Arc::new(FlakyNetworkExecutor::default());
        let (service, store) = service(executor.clone());
        let staged = service.stage(transfer(5));

        match service.confirm(&staged.code).await {
            Err(StagingError::Retryable { upstream, .. }) => assert!(upstream.is_none()),
            other => panic!("expected a retryable failure, got {:?}", other),
        }
        assert_eq!(store.len(), 1);

        let body = service.confirm(&staged.code).await.unwrap();
        assert_eq!(body.status, 201);
        assert!(store.is_empty());

        let keys = executor.keys.lock().unwrap().clone();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0], keys[1]);
    }

    #[tokio::test]
    async fn upstream_rejection_spends_the_code() {
        let executor = Arc::new(RecordingExecutor::with_statuses(&[400]));
        let (service, store) = service(executor);
        let staged = service.stage(transfer(3));

        match service.confirm(&staged.code).await {
            Err(StagingError::Rejected(body)) => assert_eq!(body.status, 400),
            other => panic!("expected rejection, got {:?}", other),
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn missing_entity_secret_keeps_code() {
        let (service, store) = service(Arc::new(MissingSecretExecutor));
        let staged = service.stage(transfer(4));

        assert!(matches!(
            service.confirm(&staged.code).await,
            Err(StagingError::Config(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_stage_and_confirm_has_no_cross_talk() {
        const N: i64 = 64;
        let executor = Arc::new(RecordingExecutor::default());
        let (service, store) = service(executor.clone());

        let staging = (0..N).map(|n| {
            let service = service.clone();
            tokio::spawn(async move { (n, service.stage(transfer(n))) })
        });
        let staged: Vec<(i64, StagedLink)> = futures::future::join_all(staging)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let confirming = staged.iter().map(|(_, link)| {
            let service = service.clone();
            let code = link.code.clone();
            tokio::spawn(async move { service.confirm(&code).await })
        });
        for result in futures::future::join_all(confirming).await {
            assert!(result.unwrap().is_ok());
        }

        let calls = executor.calls();
        assert_eq!(calls.len(), N as usize);
        for n in 0..N {
            let matching = calls.iter().filter(|(t, _, _)| *t == transfer(n)).count();
            assert_eq!(matching, 1, "transfer {} executed {} times", n, matching);
        }
        assert!(store.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_confirms_execute_at_most_once() {
        let executor = Arc::new(RecordingExecutor::default());
        let (service, _) = service(executor.clone());
        let staged = service.stage(transfer(9));

        let racers = (0..8).map(|_| {
            let service = service.clone();
            let code = staged.code.clone();
            tokio::spawn(async move { service.confirm(&code).await.is_ok() })
        });
        let successes = futures::future::join_all(racers)
            .await
            .into_iter()
            .filter(|r| *r.as_ref().unwrap())
            .count();

        assert_eq!(successes, 1);
        assert_eq!(executor.calls().len(), 1);
    }
}
