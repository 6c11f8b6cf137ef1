//! Certificate fixtures minted with rcgen.

#![allow(dead_code)]

use keypin::pinning::util::spki_der;
use keypin::pinning::Fingerprint;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyUsagePurpose,
};

/// Root → intermediate → leaf, all DER.
pub struct TestPki {
    pub root_der: Vec<u8>,
    pub intermediate_der: Vec<u8>,
    pub leaf_der: Vec<u8>,
}

impl TestPki {
    pub fn mint(label: &str, leaf_names: &[&str]) -> Self {
        let root = Certificate::from_params(ca_params(&format!("{label} Root CA")))
            .expect("root params");
        let intermediate = Certificate::from_params(ca_params(&format!("{label} Issuing CA")))
            .expect("intermediate params");

        let mut leaf_params =
            CertificateParams::new(leaf_names.iter().map(|n| n.to_string()).collect::<Vec<_>>());
        leaf_params
            .distinguished_name
            .push(DnType::CommonName, leaf_names.first().copied().unwrap_or(label));
        leaf_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
        let leaf = Certificate::from_params(leaf_params).expect("leaf params");

        Self {
            root_der: root.serialize_der().expect("serialize root"),
            intermediate_der: intermediate
                .serialize_der_with_signer(&root)
                .expect("sign intermediate"),
            leaf_der: leaf
                .serialize_der_with_signer(&intermediate)
                .expect("sign leaf"),
        }
    }

    /// Leaf first, root last.
    pub fn chain(&self) -> Vec<Vec<u8>> {
        vec![
            self.leaf_der.clone(),
            self.intermediate_der.clone(),
            self.root_der.clone(),
        ]
    }

    pub fn leaf_pin(&self) -> Fingerprint {
        fingerprint(&self.leaf_der)
    }

    pub fn intermediate_pin(&self) -> Fingerprint {
        fingerprint(&self.intermediate_der)
    }

    pub fn root_pin(&self) -> Fingerprint {
        fingerprint(&self.root_der)
    }
}

pub fn fingerprint(cert_der: &[u8]) -> Fingerprint {
    Fingerprint::of_spki(spki_der(cert_der).expect("certificate has SPKI"))
}

fn ca_params(common_name: &str) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new());
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.distinguished_name.push(DnType::CommonName, common_name);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    params
}
