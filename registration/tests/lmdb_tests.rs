//! Registrar running on the durable LMDB backend.

use std::sync::Arc;
use std::time::Duration;

use civitas_crypto::{recover_signer, IssuerKey};
use civitas_nullables::{NullBalanceOracle, NullFinalityOracle, NullProofVerifier};
use civitas_registration::{IssueRequest, Registrar, RegistrarConfig, RegistrationError};
use civitas_store::IdentityStore;
use civitas_store_lmdb::LmdbEnvironment;
use civitas_types::{IdentityHandle, PersonhoodProof, WalletAddress};

const MAP_SIZE: usize = 16 * 1024 * 1024;

fn registrar(env: &LmdbEnvironment, finality: Arc<NullFinalityOracle>) -> Registrar {
    Registrar::new(
        Arc::new(env.identity_store()),
        Arc::new(NullProofVerifier::new()),
        Arc::new(NullBalanceOracle::new(10)),
        finality,
        IssuerKey::from_bytes(&[7u8; 32]).expect("valid key"),
        RegistrarConfig {
            min_token_balance: 10,
            call_timeout: Duration::from_secs(5),
        },
    )
}

fn request(identity: &str, wallet: &WalletAddress) -> IssueRequest {
    IssueRequest {
        wallet: wallet.to_string(),
        proof: PersonhoodProof {
            nullifier_hash: identity.into(),
            merkle_root: "0x01".into(),
            proof: "0x02".into(),
            verification_level: "orb".into(),
        },
    }
}

#[tokio::test]
async fn bindings_survive_restart_and_switch_rules_apply() {
    let dir = tempfile::tempdir().expect("temp dir");
    let aaa = WalletAddress::from_bytes([0xAA; 20]);
    let bbb = WalletAddress::from_bytes([0xBB; 20]);
    let ccc = WalletAddress::from_bytes([0xCC; 20]);
    let h1 = IdentityHandle::new("H1").unwrap();

    {
        let env = LmdbEnvironment::open(dir.path(), MAP_SIZE).expect("open env");
        let registrar = registrar(&env, Arc::new(NullFinalityOracle::new()));
        let issued = registrar.issue_credential(&request("H1", &aaa)).await.unwrap();
        assert_eq!(
            recover_signer(&aaa, &issued.signature).unwrap(),
            *registrar.issuer_address()
        );
        // Switch while AAA is still unfinalized.
        registrar.issue_credential(&request("H1", &bbb)).await.unwrap();
    }

    let env = LmdbEnvironment::open(dir.path(), MAP_SIZE).expect("reopen env");
    let store = env.identity_store();
    let binding = store.get_binding(&h1).unwrap().unwrap();
    assert_eq!(binding.wallet, bbb);
    assert!(binding.is_complete());
    assert_eq!(store.get_wallet_owner(&aaa).unwrap(), None);
    assert_eq!(store.get_wallet_owner(&bbb).unwrap(), Some(h1.clone()));

    let finality = Arc::new(NullFinalityOracle::new());
    finality.finalize(&bbb);
    let registrar = registrar(&env, finality);
    let err = registrar
        .issue_credential(&request("H1", &ccc))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistrationError::SybilConflict));
    assert_eq!(store.get_binding(&h1).unwrap().unwrap().wallet, bbb);
    assert_eq!(registrar.status().diagnostics.bindings, Some(1));
}
