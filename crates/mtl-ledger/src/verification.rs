use mtl_chain::Transaction;
use mtl_types::{BatchId, TxReceipt};

use crate::client::LedgerClient;
use crate::error::LedgerResult;

/// Sets and revokes the batch-level verified flag.
///
/// Who may verify is decided by the contract host; a refused call surfaces as
/// [`crate::LedgerError::Unauthorized`].
pub struct VerificationGate<'a> {
    client: &'a LedgerClient,
}

impl<'a> VerificationGate<'a> {
    pub fn new(client: &'a LedgerClient) -> Self {
        Self { client }
    }

    pub async fn verify(&self, batch_id: &BatchId, verified: bool) -> LedgerResult<TxReceipt> {
        self.client
            .submit(Transaction::VerifyBatch {
                batch_id: batch_id.clone(),
                verified,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{client_on, dev_chain};
    use crate::LedgerError;
    use mtl_types::BatchDraft;

    fn id(s: &str) -> BatchId {
        BatchId::new(s).unwrap()
    }

    fn draft() -> BatchDraft {
        BatchDraft {
            farmer_id: "F9".into(),
            millet_type: "Foxtail Millet".into(),
            variety: "SiA 3085".into(),
            harvest_date: "2024-09-20".into(),
            quality_grade: "A".into(),
            organic_certified: true,
        }
    }

    #[tokio::test]
    async fn verify_and_revoke() {
        let chain = dev_chain();
        let owner = client_on(&chain, 2).await;
        owner.registry().create(draft().with_id(id("B1"))).await.unwrap();

        owner.verification().verify(&id("B1"), true).await.unwrap();
        assert!(owner.registry().get(&id("B1")).await.unwrap().verified);

        owner.verification().verify(&id("B1"), false).await.unwrap();
        assert!(!owner.registry().get(&id("B1")).await.unwrap().verified);
    }

    #[tokio::test]
    async fn admin_may_verify_any_batch() {
        let chain = dev_chain();
        let owner = client_on(&chain, 3).await;
        let admin = client_on(&chain, 0).await;
        owner.registry().create(draft().with_id(id("B1"))).await.unwrap();

        admin.verification().verify(&id("B1"), true).await.unwrap();
        assert!(owner.registry().get(&id("B1")).await.unwrap().verified);
    }

    #[tokio::test]
    async fn stranger_is_unauthorized() {
        let chain = dev_chain();
        let owner = client_on(&chain, 3).await;
        let stranger = client_on(&chain, 4).await;
        owner.registry().create(draft().with_id(id("B1"))).await.unwrap();

        let err = stranger
            .verification()
            .verify(&id("B1"), true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Unauthorized { account, .. } if account == stranger.account()
        ));
        assert!(!owner.registry().get(&id("B1")).await.unwrap().verified);
    }

    #[tokio::test]
    async fn unknown_batch() {
        let chain = dev_chain();
        let admin = client_on(&chain, 0).await;
        let err = admin.verification().verify(&id("ghost"), true).await.unwrap_err();
        assert!(matches!(err, LedgerError::BatchNotFound(_)));
    }
}
