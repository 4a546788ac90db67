// SPDX-License-Identifier: Apache-2.0

//! A client-side bag of keys and credentials. The wallet serializes as a
//! payload whose body is the list of transport strings of its contents, so a
//! whole wallet travels as one opaque token.

use serde_json::Value;

use credential_config::{PrivateKey, PublicKey, Signature, Validator as _};

use crate::codec::{self, RawMap};
use crate::credential::Data;
use crate::error::{CredentialError, CredentialResult};
use crate::payload::{decode, Decoded, Payload, PayloadTag, Signable, SignableExt as _};

/// The whitelist of things a wallet may hold.
#[derive(Clone, Debug, PartialEq)]
pub enum WalletItem {
    PrivateKey(PrivateKey),
    PublicKey(PublicKey),
    Data(Data),
}

impl WalletItem {
    pub fn transport(&self) -> String {
        match self {
            WalletItem::PrivateKey(key) => Decoded::PrivateKey(key.clone()).transport(),
            WalletItem::PublicKey(key) => Decoded::PublicKey(key.clone()).transport(),
            WalletItem::Data(data) => data.transport(),
        }
    }

    fn from_decoded(decoded: Decoded) -> CredentialResult<Self> {
        match decoded {
            Decoded::PrivateKey(key) => Ok(WalletItem::PrivateKey(key)),
            Decoded::PublicKey(key) => Ok(WalletItem::PublicKey(key)),
            Decoded::Payload(Payload::Data(data)) => Ok(WalletItem::Data(data)),
            Decoded::Payload(payload) => Err(CredentialError::UnsupportedWalletItem(
                payload.tag().to_string(),
            )),
            Decoded::Signature(_) => Err(CredentialError::UnsupportedWalletItem(
                PayloadTag::Signature.to_string(),
            )),
        }
    }
}

impl From<PrivateKey> for WalletItem {
    fn from(key: PrivateKey) -> Self {
        WalletItem::PrivateKey(key)
    }
}

impl From<PublicKey> for WalletItem {
    fn from(key: PublicKey) -> Self {
        WalletItem::PublicKey(key)
    }
}

impl From<Data> for WalletItem {
    fn from(data: Data) -> Self {
        WalletItem::Data(data)
    }
}

/// An ordered container of wallet items. The signature is optional: an
/// unsigned wallet is acceptable, but a signed one must verify under a key the
/// wallet itself carries (there is no registry-bound key for wallets), and
/// every stored credential must validate either way.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Wallet {
    items: Vec<WalletItem>,
    signature: Signature,
}

impl Wallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a decoded payload, rejecting anything outside the whitelist.
    pub fn insert(&mut self, decoded: Decoded) -> CredentialResult<()> {
        self.items.push(WalletItem::from_decoded(decoded)?);
        Ok(())
    }

    /// Adds an item that is already known to be storable.
    pub fn push(&mut self, item: impl Into<WalletItem>) {
        self.items.push(item.into());
    }

    /// Removes by position; `None` when out of range.
    pub fn remove(&mut self, index: usize) -> Option<WalletItem> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[WalletItem] {
        &self.items
    }

    pub fn datas(&self) -> Vec<&Data> {
        self.items
            .iter()
            .filter_map(|item| match item {
                WalletItem::Data(data) => Some(data),
                _ => None,
            })
            .collect()
    }

    pub fn private_keys(&self) -> Vec<&PrivateKey> {
        self.items
            .iter()
            .filter_map(|item| match item {
                WalletItem::PrivateKey(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    pub fn public_keys(&self) -> Vec<&PublicKey> {
        self.items
            .iter()
            .filter_map(|item| match item {
                WalletItem::PublicKey(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    /// Parses an opaque wallet token (the wallet's own transport form).
    pub fn load(token: &str) -> CredentialResult<Wallet> {
        match decode(token)? {
            Decoded::Payload(Payload::Wallet(wallet)) => Ok(wallet),
            _ => Err(CredentialError::MalformedPayload(
                "token is not a wallet".to_string(),
            )),
        }
    }

    /// The opaque token accepted by `load`.
    pub fn dump(&self) -> String {
        self.transport()
    }

    pub(crate) fn from_raw(map: &RawMap) -> CredentialResult<Self> {
        let mut wallet = Wallet::new();
        for value in codec::get_array(map, "d")? {
            let token = value.as_str().ok_or_else(|| {
                CredentialError::MalformedPayload(
                    "wallet items must be transport strings".to_string(),
                )
            })?;
            wallet.insert(decode(token)?)?;
        }
        wallet.signature = codec::get_signature(map)?;
        Ok(wallet)
    }
}

impl Signable for Wallet {
    fn tag(&self) -> PayloadTag {
        PayloadTag::Wallet
    }

    fn raw_body(&self) -> RawMap {
        let mut map = RawMap::new();
        map.insert("t".to_string(), Value::String("w".to_string()));
        map.insert(
            "d".to_string(),
            Value::Array(
                self.items
                    .iter()
                    .map(|item| Value::String(item.transport()))
                    .collect(),
            ),
        );
        map
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn set_signature(&mut self, signature: Signature) {
        self.signature = signature;
    }

    fn validate(&self) -> bool {
        let credentials_valid = self.items.iter().all(|item| match item {
            WalletItem::Data(data) => data.validate(),
            WalletItem::PrivateKey(_) | WalletItem::PublicKey(_) => true,
        });
        if !credentials_valid {
            return false;
        }
        if self.signature.is_empty() {
            return true;
        }
        // A signed wallet binds to its owner: the signature must verify under
        // one of the keys stored in the wallet.
        let message = self.signing_bytes();
        self.items.iter().any(|item| match item {
            WalletItem::PrivateKey(key) => key.verify(&message, &self.signature),
            WalletItem::PublicKey(key) => key.verify(&message, &self.signature),
            WalletItem::Data(_) => false,
        })
    }
}
