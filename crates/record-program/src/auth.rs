use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::instruction::Request;
use crate::pubkey::Pubkey;

/// Evidence that `identity` signed a request digest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub identity: Pubkey,
    #[serde(with = "crate::auth::serde_hex")]
    pub signature: Vec<u8>,
}

impl Proof {
    pub fn sign(key: &SigningKey, request: &Request) -> Self {
        let signature = key.sign(&request.digest());
        Self {
            identity: key.verifying_key().into(),
            signature: signature.to_bytes().to_vec(),
        }
    }

    /// Strict ed25519 verification of this proof against `digest`.
    pub fn verify(&self, digest: &[u8; 32]) -> Result<(), AuthError> {
        let key = VerifyingKey::from_bytes(self.identity.as_bytes())
            .map_err(|_| AuthError::MalformedIdentity(self.identity))?;
        let signature = Signature::from_slice(&self.signature)
            .map_err(|_| AuthError::MalformedSignature(self.identity))?;
        key.verify_strict(digest, &signature)
            .map_err(|_| AuthError::InvalidSignature(self.identity))
    }
}

/// Check that `claimed` produced one of `proofs` over this request.
///
/// A missing proof and a bad one are both refusals; the first proof naming
/// `claimed` is the only one considered.
pub fn authorize(request: &Request, claimed: &Pubkey, proofs: &[Proof]) -> Result<(), AuthError> {
    let proof = proofs
        .iter()
        .find(|proof| proof.identity == *claimed)
        .ok_or(AuthError::MissingProof(*claimed))?;
    proof.verify(&request.digest())
}

pub(crate) mod serde_hex {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(&encoded).map_err(D::Error::custom)
    }
}
