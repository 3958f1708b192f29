//! VeChain transaction encoding and signing
//!
//! Body layout (RLP list, in order):
//! `chainTag, blockRef, expiration, clauses, gasPriceCoef, gas, dependsOn,
//! nonce, reserved`, where each clause is `[to, value, data]`.
//!
//! - signing hash = blake2b-256(body)
//! - signature    = secp256k1 `r || s || recovery_id` over the signing hash
//! - tx id        = blake2b-256(signing hash || origin address)
//! - raw          = RLP list of the body fields followed by the signature

use alloy::primitives::{Address, B256};
use alloy::signers::{local::PrivateKeySigner, SignerSync};
use alloy_rlp::{Encodable, Header};
use blake2::{digest::consts::U32, Blake2b, Digest};

use crate::error::BridgeError;
use crate::wallet::Clause;

type Blake2b256 = Blake2b<U32>;

/// blake2b with a 32-byte digest over the concatenation of `parts`
pub fn blake2b256(parts: &[&[u8]]) -> B256 {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    B256::from_slice(&hasher.finalize())
}

/// Unsigned VeChain transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThorTransaction {
    pub chain_tag: u8,
    pub block_ref: u64,
    pub expiration: u32,
    pub clauses: Vec<Clause>,
    pub gas_price_coef: u8,
    pub gas: u64,
    pub depends_on: Option<B256>,
    pub nonce: u64,
}

fn encode_list(payload: &[u8], out: &mut Vec<u8>) {
    Header {
        list: true,
        payload_length: payload.len(),
    }
    .encode(out);
    out.extend_from_slice(payload);
}

fn encode_clause(clause: &Clause, out: &mut Vec<u8>) {
    let mut payload = Vec::new();
    match clause.to {
        Some(to) => to.as_slice().encode(&mut payload),
        None => (&[] as &[u8]).encode(&mut payload),
    }
    clause
        .value
        .to_be_bytes_trimmed_vec()
        .as_slice()
        .encode(&mut payload);
    let data: &[u8] = &clause.data;
    data.encode(&mut payload);
    encode_list(&payload, out);
}

impl ThorTransaction {
    fn body_fields(&self) -> Vec<u8> {
        let mut fields = Vec::new();
        self.chain_tag.encode(&mut fields);
        self.block_ref.encode(&mut fields);
        self.expiration.encode(&mut fields);

        let mut clauses = Vec::new();
        for clause in &self.clauses {
            encode_clause(clause, &mut clauses);
        }
        encode_list(&clauses, &mut fields);

        self.gas_price_coef.encode(&mut fields);
        self.gas.encode(&mut fields);
        match &self.depends_on {
            Some(id) => id.as_slice().encode(&mut fields),
            None => (&[] as &[u8]).encode(&mut fields),
        }
        self.nonce.encode(&mut fields);
        // reserved: no features
        encode_list(&[], &mut fields);
        fields
    }

    /// RLP encoding of the unsigned body
    pub fn encode_unsigned(&self) -> Vec<u8> {
        let mut out = Vec::new();
        encode_list(&self.body_fields(), &mut out);
        out
    }

    pub fn signing_hash(&self) -> B256 {
        blake2b256(&[self.encode_unsigned().as_slice()])
    }

    /// Gas charged before any clause executes
    pub fn intrinsic_gas(clauses: &[Clause]) -> u64 {
        const TX_GAS: u64 = 5_000;
        const CLAUSE_GAS: u64 = 16_000;
        const CLAUSE_GAS_CONTRACT_CREATION: u64 = 48_000;
        const ZERO_BYTE_GAS: u64 = 4;
        const NON_ZERO_BYTE_GAS: u64 = 68;

        if clauses.is_empty() {
            return TX_GAS + CLAUSE_GAS;
        }

        clauses.iter().fold(TX_GAS, |total, clause| {
            let base = if clause.to.is_some() {
                CLAUSE_GAS
            } else {
                CLAUSE_GAS_CONTRACT_CREATION
            };
            let data: u64 = clause
                .data
                .iter()
                .map(|b| if *b == 0 { ZERO_BYTE_GAS } else { NON_ZERO_BYTE_GAS })
                .sum();
            total + base + data
        })
    }

    pub fn sign(self, signer: &PrivateKeySigner) -> Result<SignedThorTransaction, BridgeError> {
        let hash = self.signing_hash();
        let sig = signer
            .sign_hash_sync(&hash)
            .map_err(|e| BridgeError::Backend(format!("Failed to sign transaction: {}", e)))?;

        let mut signature = sig.as_bytes();
        // Thor wants the raw recovery id, not the 27/28 form
        if signature[64] >= 27 {
            signature[64] -= 27;
        }

        Ok(SignedThorTransaction {
            origin: signer.address(),
            signing_hash: hash,
            signature,
            tx: self,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SignedThorTransaction {
    pub tx: ThorTransaction,
    pub origin: Address,
    pub signing_hash: B256,
    pub signature: [u8; 65],
}

impl SignedThorTransaction {
    pub fn id(&self) -> B256 {
        blake2b256(&[self.signing_hash.as_slice(), self.origin.as_slice()])
    }

    /// Raw bytes for `POST /transactions`
    pub fn encode(&self) -> Vec<u8> {
        let mut fields = self.tx.body_fields();
        self.signature.as_slice().encode(&mut fields);
        let mut out = Vec::new();
        encode_list(&fields, &mut out);
        out
    }
}
