pub mod adapters;
pub mod bid;
pub mod crypto;
pub mod store;
pub mod utility;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use alloy_primitives::{Address, Bytes, B256};
    use kettle_store::{KettleStoreConfig, StoreEngine};
    use kettle_types::{CallerStack, ConfidentialRequest, MessageSigner, Secp256k1Signer};

    use crate::abi::BuildBlockArgs;
    use crate::backend::{BuiltBlock, ExecutionBackend, RelaySubmitter};
    use crate::context::ConfidentialContext;
    use crate::errors::KettleVmError;

    pub(crate) struct TestFixture {
        pub ctx: ConfidentialContext,
        pub originator: Address,
    }

    /// Backend double: concatenates bundles into the payload, reports the
    /// bundle length as gas used, returns the bundle prefix as the hint.
    pub(crate) struct FixedBackend;

    impl ExecutionBackend for FixedBackend {
        fn build_block(
            &self,
            _args: &BuildBlockArgs,
            bundles: Vec<Bytes>,
        ) -> Result<BuiltBlock, KettleVmError> {
            Ok(BuiltBlock {
                payload: Bytes::from(bundles.concat()),
                value: Bytes::from(vec![0u8; 32]),
            })
        }

        fn simulate_bundle(&self, bundle: &[u8]) -> Result<u64, KettleVmError> {
            Ok(bundle.len() as u64)
        }

        fn extract_hint(&self, bundle: &[u8]) -> Result<Bytes, KettleVmError> {
            Ok(Bytes::copy_from_slice(&bundle[..bundle.len().min(4)]))
        }
    }

    pub(crate) struct FixedRelay;

    impl RelaySubmitter for FixedRelay {
        fn submit_block_bid(
            &self,
            _relay_url: &str,
            _signed_bid: &[u8],
        ) -> Result<Bytes, KettleVmError> {
            Ok(Bytes::from_static(b"{}"))
        }
    }

    pub(crate) fn context() -> TestFixture {
        context_with(Arc::new(FixedBackend), Arc::new(FixedRelay))
    }

    pub(crate) fn context_with(
        backend: Arc<dyn ExecutionBackend>,
        relay: Arc<dyn RelaySubmitter>,
    ) -> TestFixture {
        let engine = StoreEngine::new(
            KettleStoreConfig::default(),
            Arc::new(Secp256k1Signer::random()),
        );
        let originator = Secp256k1Signer::random();
        let request_hash = B256::repeat_byte(0x5a);
        let context_signature = originator.sign_hash(&request_hash.0).unwrap();
        let request = ConfidentialRequest {
            caller_stack: CallerStack::new().pushed(Some(originator.address())),
            confidential_inputs: Bytes::from_static(b"bundle bytes"),
            request_hash,
            originator: originator.address(),
            context_signature: Bytes::from(context_signature.to_vec()),
        };
        TestFixture {
            originator: originator.address(),
            ctx: ConfidentialContext {
                store: engine.new_transactional_store(request),
                backend,
                relay,
            },
        }
    }
}
