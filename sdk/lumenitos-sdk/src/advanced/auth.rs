//! Authorization entry signing.
//!
//! Simulation returns the authorization entries an invocation needs. Each
//! address-credential entry is signed over
//! `sha256(HashIdPreimage::SorobanAuthorization { network_id, nonce, expiration, invocation })`
//! and the signature is encoded the way the authorizing address expects it.

use crate::core::constants::{PUBLIC_KEY_FIELD, SIGNATURE_FIELD};
use crate::core::signer::LumenitosSigner;
use crate::error::{LumenitosSdkError, Result};
use crate::utils;
use stellar_xdr::curr::{
    AccountId, Hash, HashIdPreimage, HashIdPreimageSorobanAuthorization, Limits, PublicKey,
    ReadXdr, ScAddress, ScMap, ScMapEntry, ScVal, ScVec, SorobanAddressCredentials,
    SorobanAuthorizationEntry, SorobanAuthorizedInvocation, SorobanCredentials, Uint256, WriteXdr,
};
use tracing::debug;

/// Authorization entry, normalized once from whatever the transport returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEntry {
    /// Satisfied by the transaction source's envelope signature.
    SourceAccount {
        root_invocation: SorobanAuthorizedInvocation,
    },
    Address(AddressCredential),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressCredential {
    pub address: ScAddress,
    pub nonce: i64,
    pub signature_expiration_ledger: u32,
    pub signature: ScVal,
    /// Invocation tree captured at simulation time. Never modified.
    pub invocation: SorobanAuthorizedInvocation,
}

impl From<SorobanAuthorizationEntry> for AuthEntry {
    fn from(entry: SorobanAuthorizationEntry) -> Self {
        match entry.credentials {
            SorobanCredentials::SourceAccount => Self::SourceAccount {
                root_invocation: entry.root_invocation,
            },
            SorobanCredentials::Address(creds) => Self::Address(AddressCredential {
                address: creds.address,
                nonce: creds.nonce,
                signature_expiration_ledger: creds.signature_expiration_ledger,
                signature: creds.signature,
                invocation: entry.root_invocation,
            }),
        }
    }
}

/// Parse a base64 XDR `SorobanAuthorizationEntry`.
impl TryFrom<&str> for AuthEntry {
    type Error = LumenitosSdkError;

    fn try_from(encoded: &str) -> Result<Self> {
        let entry = SorobanAuthorizationEntry::from_xdr_base64(encoded, Limits::none())
            .map_err(|e| LumenitosSdkError::AuthSigning(format!("undecodable auth entry: {e}")))?;
        Ok(entry.into())
    }
}

impl AuthEntry {
    pub fn into_xdr(self) -> SorobanAuthorizationEntry {
        match self {
            Self::SourceAccount { root_invocation } => SorobanAuthorizationEntry {
                credentials: SorobanCredentials::SourceAccount,
                root_invocation,
            },
            Self::Address(cred) => SorobanAuthorizationEntry {
                credentials: SorobanCredentials::Address(SorobanAddressCredentials {
                    address: cred.address,
                    nonce: cred.nonce,
                    signature_expiration_ledger: cred.signature_expiration_ledger,
                    signature: cred.signature,
                }),
                root_invocation: cred.invocation,
            },
        }
    }

    pub fn invocation(&self) -> &SorobanAuthorizedInvocation {
        match self {
            Self::SourceAccount { root_invocation } => root_invocation,
            Self::Address(cred) => &cred.invocation,
        }
    }

    pub fn is_address(&self) -> bool {
        matches!(self, Self::Address(_))
    }
}

/// How the authorizing address expects its signature encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizerKind {
    /// Custom account contract checking one key: raw 64-byte signature.
    Contract,
    /// Native key check (or a multi-signer account contract):
    /// `[{ public_key, signature }]`.
    NativeKey,
}

impl AuthorizerKind {
    pub fn for_address(address: &ScAddress) -> Result<Self> {
        match address {
            ScAddress::Contract(_) => Ok(Self::Contract),
            ScAddress::Account(_) => Ok(Self::NativeKey),
            other => Err(LumenitosSdkError::AuthSigning(format!(
                "unsupported authorizer address {other:?}"
            ))),
        }
    }
}

/// Canonical preimage an address credential signs.
pub fn signing_preimage(
    network_id: &[u8; 32],
    nonce: i64,
    signature_expiration_ledger: u32,
    invocation: &SorobanAuthorizedInvocation,
) -> HashIdPreimage {
    HashIdPreimage::SorobanAuthorization(HashIdPreimageSorobanAuthorization {
        network_id: Hash(*network_id),
        nonce,
        signature_expiration_ledger,
        invocation: invocation.clone(),
    })
}

pub fn signature_payload(
    network_id: &[u8; 32],
    nonce: i64,
    signature_expiration_ledger: u32,
    invocation: &SorobanAuthorizedInvocation,
) -> Result<[u8; 32]> {
    let preimage = signing_preimage(network_id, nonce, signature_expiration_ledger, invocation);
    Ok(utils::sha256(&preimage.to_xdr(Limits::none())?))
}

/// `ScVal` a native key authorizer accepts for one signer.
pub fn native_signature_val(public_key: &[u8; 32], signature: &[u8; 64]) -> Result<ScVal> {
    // Map keys must be in sorted order.
    let record = ScMap(
        vec![
            ScMapEntry {
                key: ScVal::Symbol(utils::symbol(PUBLIC_KEY_FIELD)?),
                val: utils::bytes_val(public_key)?,
            },
            ScMapEntry {
                key: ScVal::Symbol(utils::symbol(SIGNATURE_FIELD)?),
                val: utils::bytes_val(signature)?,
            },
        ]
        .try_into()?,
    );
    Ok(ScVal::Vec(Some(ScVec(
        vec![ScVal::Map(Some(record))].try_into()?,
    ))))
}

/// Signs address-credential entries for one network.
pub struct AuthEntrySigner<'a> {
    network_id: [u8; 32],
    signer: Option<&'a dyn LumenitosSigner>,
    kind: Option<AuthorizerKind>,
}

impl<'a> AuthEntrySigner<'a> {
    pub fn new(network_passphrase: &str, signer: Option<&'a dyn LumenitosSigner>) -> Self {
        Self {
            network_id: utils::network_id(network_passphrase),
            signer,
            kind: None,
        }
    }

    /// Force one encoding instead of inferring it from the entry's address.
    pub fn with_authorizer_kind(mut self, kind: AuthorizerKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn network_id(&self) -> &[u8; 32] {
        &self.network_id
    }

    /// Sign one entry, valid through `expiration_ledger`. Source-account
    /// entries are returned unchanged.
    pub async fn sign_entry(&self, entry: AuthEntry, expiration_ledger: u32) -> Result<AuthEntry> {
        let cred = match entry {
            AuthEntry::Address(cred) => cred,
            source => return Ok(source),
        };

        let address = utils::sc_address_to_string(&cred.address)
            .map_err(|e| LumenitosSdkError::AuthSigning(e.to_string()))?;
        let signer = self
            .signer
            .ok_or_else(|| LumenitosSdkError::KeyMissing(address.clone()))?;
        let kind = match self.kind {
            Some(kind) => kind,
            None => AuthorizerKind::for_address(&cred.address)?,
        };

        let public_key = signer.public_key();
        if let ScAddress::Account(AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(pk)))) =
            &cred.address
        {
            if *pk != public_key {
                return Err(LumenitosSdkError::KeyMissing(address));
            }
        }

        let payload =
            signature_payload(&self.network_id, cred.nonce, expiration_ledger, &cred.invocation)?;
        let signature = signer
            .sign_message(&payload)
            .await
            .map_err(LumenitosSdkError::AuthSigning)?;

        let signature = match kind {
            AuthorizerKind::Contract => utils::bytes_val(&signature)?,
            AuthorizerKind::NativeKey => native_signature_val(&public_key, &signature)?,
        };
        debug!(%address, nonce = cred.nonce, expiration_ledger, ?kind, "signed auth entry");

        Ok(AuthEntry::Address(AddressCredential {
            signature_expiration_ledger: expiration_ledger,
            signature,
            ..cred
        }))
    }

    pub async fn sign_all(
        &self,
        entries: Vec<AuthEntry>,
        expiration_ledger: u32,
    ) -> Result<Vec<AuthEntry>> {
        let mut signed = Vec::with_capacity(entries.len());
        for entry in entries {
            signed.push(self.sign_entry(entry, expiration_ledger).await?);
        }
        Ok(signed)
    }

    /// Build and sign a fresh entry for `address` over `invocation`, using a
    /// client-chosen random nonce.
    pub async fn authorize_invocation(
        &self,
        address: ScAddress,
        invocation: SorobanAuthorizedInvocation,
        expiration_ledger: u32,
    ) -> Result<AuthEntry> {
        let entry = AuthEntry::Address(AddressCredential {
            address,
            nonce: rand::random::<i64>(),
            signature_expiration_ledger: expiration_ledger,
            signature: ScVal::Void,
            invocation,
        });
        self.sign_entry(entry, expiration_ledger).await
    }
}
