//! QUIC transport integration tests
//!
//! These tests verify the full request path: client → QUIC stream →
//! ProvisionerServer → LocalVolumeProvisioner → filesystem.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;

use liblocalpv::provenance::PROVISIONED_ON_ANNOTATION;
use liblocalpv::transport::{ProvisionerClient, ProvisionerServer};
use liblocalpv::{
    AccessMode, Capacity, DeleteOutcome, IgnoreReason, LocalPvError, LocalVolumeProvisioner,
    PROVISIONER_NAME, ProvisionerConfig, ProvisioningRequest, ProvisioningState, ReclaimPolicy,
};
use rcgen::{BasicConstraints, CertificateParams, IsCa, KeyPair};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio::task::JoinHandle;

const SERVER_NAME: &str = "localhost";

/// Self-signed CA plus a leaf certificate for [`SERVER_NAME`].
struct TestCerts {
    ca_cert_der: CertificateDer<'static>,
    cert_der: CertificateDer<'static>,
    key_der: Vec<u8>,
}

impl TestCerts {
    fn generate() -> Self {
        let ca_key = KeyPair::generate().expect("generate CA key");
        let mut ca_params = CertificateParams::new(Vec::<String>::new()).expect("CA params");
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let ca_cert = ca_params.self_signed(&ca_key).expect("self-sign CA");

        let key = KeyPair::generate().expect("generate node key");
        let mut params =
            CertificateParams::new(vec![SERVER_NAME.to_owned()]).expect("node cert params");
        params.is_ca = IsCa::NoCa;
        let cert = params
            .signed_by(&key, &ca_cert, &ca_key)
            .expect("sign node cert");

        Self {
            ca_cert_der: CertificateDer::from(ca_cert.der().to_vec()),
            cert_der: CertificateDer::from(cert.der().to_vec()),
            key_der: key.serialize_der(),
        }
    }

    fn server_config(&self) -> rustls::ServerConfig {
        rustls::ServerConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_protocol_versions(&[&rustls::version::TLS13])
        .expect("protocol versions")
        .with_no_client_auth()
        .with_single_cert(
            vec![self.cert_der.clone()],
            PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.key_der.clone())),
        )
        .expect("server cert")
    }

    fn client_config(&self) -> rustls::ClientConfig {
        let mut roots = rustls::RootCertStore::empty();
        roots.add(self.ca_cert_der.clone()).expect("add CA");
        rustls::ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_protocol_versions(&[&rustls::version::TLS13])
        .expect("protocol versions")
        .with_root_certificates(roots)
        .with_no_client_auth()
    }
}

/// A provisioner served over QUIC on a loopback port.
struct TestNode {
    client: ProvisionerClient,
    _serve: JoinHandle<()>,
}

async fn start_node(node: &str, root: &Path) -> TestNode {
    let certs = TestCerts::generate();
    let provisioner =
        LocalVolumeProvisioner::new(ProvisionerConfig::new(node, root).expect("config"));

    let bind = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
    let server = ProvisionerServer::new(bind, certs.server_config(), Arc::new(provisioner))
        .expect("start server");
    let addr = server.endpoint().local_addr().expect("local addr");

    let serve = tokio::spawn(async move {
        let _ = server.serve().await;
    });

    let client = ProvisionerClient::connect(addr, SERVER_NAME, certs.client_config())
        .await
        .expect("connect");

    TestNode {
        client,
        _serve: serve,
    }
}

fn request(name: &str, modes: &[AccessMode]) -> ProvisioningRequest {
    ProvisioningRequest {
        volume_name: name.into(),
        capacity: Capacity::parse("1Gi").unwrap(),
        access_modes: modes.to_vec(),
        reclaim_policy: Some(ReclaimPolicy::Delete),
        claim: Some("default/data".into()),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn lifecycle_over_quic() {
    let tmp = tempfile::tempdir().unwrap();
    let node = start_node("node-01", tmp.path()).await;

    let info = node.client.plugin_info().await.unwrap();
    assert_eq!(info.name, PROVISIONER_NAME);
    assert_eq!(info.node_name, "node-01");
    assert!(node.client.probe().await.unwrap());

    assert!(
        !node
            .client
            .should_provision(request("pvc-1", &[AccessMode::ReadWriteMany]))
            .await
            .unwrap()
    );
    let req = request("pvc-1", &[AccessMode::ReadWriteOnce]);
    assert!(node.client.should_provision(req.clone()).await.unwrap());

    let (record, state) = node.client.provision(req).await.unwrap();
    assert_eq!(state, ProvisioningState::Finished);
    assert_eq!(record.path, tmp.path().join("pvc-1"));
    assert!(tmp.path().join("pvc-1").is_dir());

    let outcome = node.client.delete(record).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert!(!tmp.path().join("pvc-1").exists());

    node.client.close();
}

#[tokio::test(flavor = "multi_thread")]
async fn foreign_node_delete_is_ignored_over_quic() {
    let tmp = tempfile::tempdir().unwrap();
    let node = start_node("node-01", tmp.path()).await;

    let (mut record, _) = node
        .client
        .provision(request("pvc-2", &[AccessMode::ReadWriteOnce]))
        .await
        .unwrap();
    record
        .annotations
        .insert(PROVISIONED_ON_ANNOTATION.into(), "node-02".into());

    let outcome = node.client.delete(record).await.unwrap();
    assert_eq!(
        outcome,
        DeleteOutcome::Ignored {
            reason: IgnoreReason::ForeignNode {
                found: Some("node-02".into()),
                local: "node-01".into(),
            }
        }
    );
    assert!(tmp.path().join("pvc-2").is_dir());

    node.client.close();
}

#[tokio::test(flavor = "multi_thread")]
async fn errors_cross_the_wire() {
    let tmp = tempfile::tempdir().unwrap();
    let node = start_node("node-01", tmp.path()).await;

    let err = node
        .client
        .provision(request("../escape", &[AccessMode::ReadWriteOnce]))
        .await
        .unwrap_err();
    assert!(matches!(err, LocalPvError::InvalidArgument(_)));

    std::fs::write(tmp.path().join("pvc-3"), b"occupied").unwrap();
    let err = node
        .client
        .provision(request("pvc-3", &[AccessMode::ReadWriteOnce]))
        .await
        .unwrap_err();
    assert!(err.is_terminal());

    node.client.close();
}
