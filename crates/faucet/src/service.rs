//! Faucet core: nonce-serialized transaction issuance and confirmation polling
//!
//! One `Faucet` instance per process owns the signing identity and the cached
//! account nonce. Issuance (reserve a nonce, sign, submit) runs under a mutex
//! so concurrent funding requests never race on the sequence number.
//! Confirmation polling runs outside the lock: waiting on transaction A must
//! not hold up submission of transaction B.

use crate::config::{FaucetConfig, NATIVE_TOKEN};
use crate::error::{FaucetError, FaucetResult};
use crate::node::{NodeClient, TransactionReceipt};
use crate::tx::{LegacyTransaction, SignedTransaction};
use crate::wallet::Wallet;
use obx_common::types::{Address, Hash};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

pub struct Faucet {
    node: Arc<dyn NodeClient>,
    wallet: Wallet,
    /// Next sequence number to use for the faucet account. Authoritative
    /// while this process holds exclusive funding rights; the on-chain count
    /// lags it whenever submissions are pending.
    nonce: Mutex<u64>,
    fund_amount: u128,
    gas_price: u64,
    gas_limit: u64,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl std::fmt::Debug for Faucet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Faucet")
            .field("address", &self.wallet.address())
            .field("fund_amount", &self.fund_amount)
            .field("gas_price", &self.gas_price)
            .field("gas_limit", &self.gas_limit)
            .field("confirmation_timeout", &self.confirmation_timeout)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl Faucet {
    /// Bind the faucet to its prefunded account: derive the signing identity,
    /// verify the node is reachable and on the configured chain, and seed the
    /// nonce cache from the account's on-chain count. Any failure here is
    /// fatal; the service cannot run without it.
    pub async fn new(config: &FaucetConfig, node: Arc<dyn NodeClient>) -> FaucetResult<Self> {
        let wallet = Wallet::from_private_key_hex(&config.private_key, config.chain_id)?;

        let fund_amount = config
            .fund_amount_wei
            .parse::<u128>()
            .map_err(|e| FaucetError::InvalidConfig(format!("fund amount: {e}")))?;

        let chain_id = node
            .chain_id()
            .await
            .map_err(|e| FaucetError::Initialization(e.to_string()))?;
        if chain_id != config.chain_id {
            // A mismatch would give every signature a wrong EIP-155 v and
            // every submission would bounce.
            return Err(FaucetError::Initialization(format!(
                "node reports chain id {chain_id}, configured for {}",
                config.chain_id
            )));
        }

        let nonce = node.transaction_count(&wallet.address()).await.map_err(|e| {
            FaucetError::Initialization(format!(
                "unable to fetch {} nonce: {e}",
                wallet.address()
            ))
        })?;

        info!(address = %wallet.address(), nonce, chain_id, "faucet account ready");

        Ok(Self {
            node,
            wallet,
            nonce: Mutex::new(nonce),
            fund_amount,
            gas_price: config.gas_price,
            gas_limit: config.gas_limit,
            confirmation_timeout: config.confirmation_timeout(),
            poll_interval: config.poll_interval(),
        })
    }

    /// The faucet account's address.
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Fund `recipient` with the configured amount of `token`, waiting up to
    /// the configured confirmation window for the transfer to land on-chain.
    pub async fn fund(&self, recipient: &Address, token: &str) -> FaucetResult<TransactionReceipt> {
        self.fund_with_deadline(recipient, token, Instant::now() + self.confirmation_timeout)
            .await
    }

    /// Like [`fund`](Self::fund), with an explicit confirmation deadline.
    /// Returns only once the transfer is observed on-chain with a successful
    /// execution status, or with the error that stopped it.
    pub async fn fund_with_deadline(
        &self,
        recipient: &Address,
        token: &str,
        deadline: Instant,
    ) -> FaucetResult<TransactionReceipt> {
        if token != NATIVE_TOKEN {
            // Non-native funding is a policy rejection, not a silent no-op.
            return Err(FaucetError::UnsupportedToken(token.to_string()));
        }

        let tx = self.issue_native_transfer(recipient).await?;
        info!(
            hash = %tx.hash,
            nonce = tx.nonce,
            to = %tx.to,
            value = %tx.value,
            "funding transaction submitted"
        );
        debug!(
            tx = %serde_json::to_string(&tx).unwrap_or_default(),
            "signed transaction"
        );

        let receipt = self.await_confirmation(&tx.hash, deadline).await?;
        info!(
            hash = %tx.hash,
            block = %receipt.block_number,
            gas_used = %receipt.gas_used,
            "funding transaction confirmed"
        );

        Ok(receipt)
    }

    /// Reserve a nonce, sign and submit. Only one funding request is in this
    /// section at a time; the guard drops on every exit path.
    async fn issue_native_transfer(&self, recipient: &Address) -> FaucetResult<SignedTransaction> {
        let mut cached = self.nonce.lock().await;

        let on_chain = self
            .node
            .transaction_count(&self.wallet.address())
            .await
            .map_err(|e| FaucetError::NonceFetch(e.to_string()))?;

        // The cached value is authoritative: the on-chain count lags while
        // submissions await confirmation. It can only run ahead if something
        // else spent from the faucet account, in which case resync upward.
        if on_chain > *cached {
            warn!(
                cached = *cached,
                on_chain, "account nonce ran ahead of local counter, resyncing"
            );
            *cached = on_chain;
        }
        let nonce = *cached;

        let tx = LegacyTransaction {
            nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: *recipient,
            value: self.fund_amount,
            data: Vec::new(),
        };

        let signed = self.wallet.sign_transaction(&tx)?;

        if let Err(err) = self.node.send_raw_transaction(&signed.raw).await {
            // Keep the signed transaction visible for diagnostics. The nonce
            // is not advanced: the next request reuses it.
            error!(
                hash = %signed.hash,
                nonce,
                raw = %format!("0x{}", hex::encode(&signed.raw)),
                %err,
                "transaction submission failed"
            );
            return Err(FaucetError::Submission(err.to_string()));
        }

        *cached = nonce + 1;
        Ok(signed)
    }

    /// Poll the node for the transaction's receipt until `deadline`. An
    /// absent receipt keeps the loop going; any other node error ends the
    /// wait immediately since it may never resolve on its own.
    async fn await_confirmation(
        &self,
        hash: &Hash,
        deadline: Instant,
    ) -> FaucetResult<TransactionReceipt> {
        let started = Instant::now();

        loop {
            match self.node.transaction_receipt(hash).await {
                Ok(Some(receipt)) => {
                    debug!(
                        receipt = %serde_json::to_string(&receipt).unwrap_or_default(),
                        "receipt retrieved"
                    );
                    if receipt.is_success() {
                        return Ok(receipt);
                    }
                    return Err(FaucetError::TransactionReverted {
                        hash: *hash,
                        status: receipt.status,
                    });
                }
                // Not mined yet, keep polling.
                Ok(None) => {}
                Err(err) => return Err(FaucetError::ReceiptQuery(err.to_string())),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(FaucetError::ConfirmationTimeout {
                    hash: *hash,
                    waited: now.duration_since(started),
                });
            }
            sleep_until(deadline.min(now + self.poll_interval)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeError, NodeResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    // Private key 0x...01; the corresponding address is fixed but irrelevant
    // to these tests.
    const TEST_KEY: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";
    const CHAIN_ID: u64 = 777;

    fn test_config() -> FaucetConfig {
        FaucetConfig {
            private_key: TEST_KEY.to_string(),
            chain_id: CHAIN_ID,
            ..FaucetConfig::default()
        }
    }

    /// In-process stand-in for the chain node. Submission appends the raw
    /// transaction; receipt queries report "not yet available" for a
    /// configurable number of polls, then a receipt with the configured
    /// status (or never, or a hard error).
    struct MockNode {
        on_chain_nonce: AtomicU64,
        submitted: StdMutex<Vec<Vec<u8>>>,
        calls: AtomicUsize,
        receipt_polls: AtomicUsize,
        pending_polls: usize,
        receipt_status: Option<&'static str>,
        receipt_error: AtomicBool,
        reject_submission: AtomicBool,
        /// Hold receipts back until this many transactions were submitted.
        release_receipts_at: usize,
    }

    impl MockNode {
        fn new(nonce: u64) -> Self {
            Self {
                on_chain_nonce: AtomicU64::new(nonce),
                submitted: StdMutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                receipt_polls: AtomicUsize::new(0),
                pending_polls: 0,
                receipt_status: Some("0x1"),
                receipt_error: AtomicBool::new(false),
                reject_submission: AtomicBool::new(false),
                release_receipts_at: 0,
            }
        }

        fn submitted_nonces(&self) -> Vec<u64> {
            self.submitted
                .lock()
                .unwrap()
                .iter()
                .map(|raw| rlp::Rlp::new(raw).val_at::<u64>(0).unwrap())
                .collect()
        }
    }

    #[async_trait]
    impl NodeClient for MockNode {
        async fn transaction_count(&self, _address: &Address) -> NodeResult<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.on_chain_nonce.load(Ordering::SeqCst))
        }

        async fn send_raw_transaction(&self, raw: &[u8]) -> NodeResult<Hash> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.reject_submission.load(Ordering::SeqCst) {
                return Err(NodeError::Rpc("mempool full".to_string()));
            }
            self.submitted.lock().unwrap().push(raw.to_vec());
            Ok(Hash(keccak_hash::keccak(raw).0))
        }

        async fn transaction_receipt(&self, hash: &Hash) -> NodeResult<Option<TransactionReceipt>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.receipt_error.load(Ordering::SeqCst) {
                return Err(NodeError::Rpc("internal node error".to_string()));
            }

            if self.submitted.lock().unwrap().len() < self.release_receipts_at {
                return Ok(None);
            }

            let polls = self.receipt_polls.fetch_add(1, Ordering::SeqCst);
            if polls < self.pending_polls {
                return Ok(None);
            }

            match self.receipt_status {
                Some(status) => Ok(Some(TransactionReceipt {
                    transaction_hash: *hash,
                    block_number: "0x10".to_string(),
                    gas_used: "0x5208".to_string(),
                    status: status.to_string(),
                })),
                None => Ok(None),
            }
        }

        async fn chain_id(&self) -> NodeResult<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CHAIN_ID)
        }
    }

    async fn faucet_with(node: Arc<MockNode>) -> Faucet {
        Faucet::new(&test_config(), node).await.unwrap()
    }

    #[tokio::test]
    async fn initialization_seeds_nonce_from_chain() {
        let node = Arc::new(MockNode::new(5));
        let faucet = faucet_with(node).await;
        assert_eq!(*faucet.nonce.lock().await, 5);
    }

    #[tokio::test]
    async fn initialization_fails_on_chain_id_mismatch() {
        let node = Arc::new(MockNode::new(0));
        let config = FaucetConfig {
            chain_id: 31337,
            ..test_config()
        };
        let err = Faucet::new(&config, node).await.unwrap_err();
        assert!(matches!(err, FaucetError::Initialization(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn fund_uses_cached_nonce_and_advances_locally() {
        let mut mock = MockNode::new(5);
        // "not yet available" twice, then a success receipt
        mock.pending_polls = 2;
        let node = Arc::new(mock);
        let faucet = faucet_with(node.clone()).await;

        let recipient = Address([0xaa; 20]);
        let receipt = faucet.fund(&recipient, "obx").await.unwrap();
        assert!(receipt.is_success());

        assert_eq!(node.submitted_nonces(), vec![5]);
        // three receipt queries: two pending, one final
        assert_eq!(node.receipt_polls.load(Ordering::SeqCst), 3);

        // next call uses 6 even though the on-chain count still reads 5
        faucet.fund(&recipient, "obx").await.unwrap();
        assert_eq!(node.submitted_nonces(), vec![5, 6]);
    }

    #[tokio::test]
    async fn unsupported_token_is_rejected_without_node_interaction() {
        let node = Arc::new(MockNode::new(0));
        let faucet = faucet_with(node.clone()).await;
        let calls_after_init = node.calls.load(Ordering::SeqCst);

        let err = faucet
            .fund(&Address([0xbb; 20]), "usdc")
            .await
            .unwrap_err();
        assert!(matches!(err, FaucetError::UnsupportedToken(token) if token == "usdc"));
        assert_eq!(node.calls.load(Ordering::SeqCst), calls_after_init);
    }

    #[tokio::test]
    async fn failed_submission_does_not_burn_the_nonce() {
        let node = Arc::new(MockNode::new(9));
        let faucet = faucet_with(node.clone()).await;

        node.reject_submission.store(true, Ordering::SeqCst);
        let err = faucet.fund(&Address([0xcc; 20]), "obx").await.unwrap_err();
        assert!(matches!(err, FaucetError::Submission(_)));
        assert_eq!(*faucet.nonce.lock().await, 9);

        // the next request reuses the nonce the failed one reserved
        node.reject_submission.store(false, Ordering::SeqCst);
        faucet.fund(&Address([0xcc; 20]), "obx").await.unwrap();
        assert_eq!(node.submitted_nonces(), vec![9]);
    }

    #[tokio::test(start_paused = true)]
    async fn reverted_transaction_is_an_error() {
        let mut mock = MockNode::new(0);
        mock.receipt_status = Some("0x0");
        let faucet = faucet_with(Arc::new(mock)).await;

        let err = faucet.fund(&Address([0xdd; 20]), "obx").await.unwrap_err();
        assert!(matches!(
            err,
            FaucetError::TransactionReverted { status, .. } if status == "0x0"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_receipt_times_out_after_the_configured_window() {
        let mut mock = MockNode::new(0);
        mock.receipt_status = None; // receipt never materializes
        let faucet = faucet_with(Arc::new(mock)).await;

        let started = Instant::now();
        let err = faucet.fund(&Address([0xee; 20]), "obx").await.unwrap_err();
        let elapsed = started.elapsed();

        match err {
            FaucetError::ConfirmationTimeout { waited, .. } => {
                assert!(waited >= Duration::from_secs(30));
            }
            other => panic!("expected ConfirmationTimeout, got {other:?}"),
        }
        // bounded by the window plus at most one poll interval
        assert!(elapsed >= Duration::from_secs(30));
        assert!(elapsed <= Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_receipt_error_aborts_the_wait_early() {
        let node = Arc::new(MockNode::new(0));
        let faucet = faucet_with(node.clone()).await;

        node.receipt_error.store(true, Ordering::SeqCst);
        let started = Instant::now();
        let err = faucet.fund(&Address([0x11; 20]), "obx").await.unwrap_err();
        assert!(matches!(err, FaucetError::ReceiptQuery(_)));
        // fails on the first query, well before the window elapses
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn nonces_are_sequential_across_concurrent_funds() {
        let node = Arc::new(MockNode::new(100));
        let faucet = Arc::new(faucet_with(node.clone()).await);

        let mut handles = Vec::new();
        for i in 0..8u8 {
            let faucet = faucet.clone();
            handles.push(tokio::spawn(async move {
                faucet.fund(&Address([i; 20]), "obx").await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut nonces = node.submitted_nonces();
        nonces.sort_unstable();
        assert_eq!(nonces, (100..108).collect::<Vec<u64>>());
    }

    #[tokio::test(start_paused = true)]
    async fn confirmation_wait_does_not_block_next_submission() {
        let mut mock = MockNode::new(0);
        // No receipt for anyone until a second transaction has been
        // submitted. If the lock wrongly covered the polling phase, the
        // first call would hold it for the whole window and this test would
        // time out instead of completing.
        mock.release_receipts_at = 2;
        let node = Arc::new(mock);
        let faucet = Arc::new(faucet_with(node.clone()).await);

        let first = {
            let faucet = faucet.clone();
            tokio::spawn(async move { faucet.fund(&Address([0x01; 20]), "obx").await })
        };
        let second = {
            let faucet = faucet.clone();
            tokio::spawn(async move { faucet.fund(&Address([0x02; 20]), "obx").await })
        };

        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();
        assert_eq!(node.submitted_nonces().len(), 2);
    }
}
