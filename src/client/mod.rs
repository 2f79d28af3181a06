use ed25519_dalek::SigningKey;
use record_program::auth::Proof;
use record_program::{CodecError, ProgramKind, Pubkey, RecordInstruction, Request};

use crate::ledger::Transaction;

/// Builds signed transactions for one record program.
///
/// Mirrors what a wallet-backed client does: pick the accounts, encode the
/// instruction, collect signatures. The nonce starts at the ledger height
/// the client was created against and advances with every build, so one
/// submitter's repeated signed calls stay distinct.
#[derive(Clone, Debug)]
pub struct RecordClient {
    program: ProgramKind,
    nonce: u64,
}

impl RecordClient {
    pub fn new(program: ProgramKind) -> Self {
        Self::with_nonce(program, 0)
    }

    pub fn with_nonce(program: ProgramKind, nonce: u64) -> Self {
        Self { program, nonce }
    }

    pub fn program(&self) -> ProgramKind {
        self.program
    }

    /// Create a record in the slot addressed by `slot`'s public key, funded
    /// by `payer`. Both keys sign.
    pub fn initialize(
        &mut self,
        payer: &SigningKey,
        slot: &SigningKey,
        message: &str,
    ) -> Result<Transaction, CodecError> {
        let instruction = RecordInstruction::Initialize {
            message: message.to_string(),
        };
        self.build(
            slot.verifying_key().into(),
            Some(payer.verifying_key().into()),
            &instruction,
            &[payer, slot],
        )
    }

    pub fn update(&mut self, slot: Pubkey, message: &str) -> Result<Transaction, CodecError> {
        let instruction = RecordInstruction::Update {
            message: message.to_string(),
        };
        self.build(slot, None, &instruction, &[])
    }

    pub fn get(&mut self, slot: Pubkey) -> Result<Transaction, CodecError> {
        self.build(slot, None, &RecordInstruction::Get, &[])
    }

    pub fn ping(&mut self) -> Result<Transaction, CodecError> {
        self.build(Pubkey::default(), None, &RecordInstruction::Ping, &[])
    }

    fn build(
        &mut self,
        slot: Pubkey,
        payer: Option<Pubkey>,
        instruction: &RecordInstruction,
        signers: &[&SigningKey],
    ) -> Result<Transaction, CodecError> {
        let request = Request::new(self.program, slot, payer, instruction)?;
        let proofs = signers
            .iter()
            .map(|key| Proof::sign(key, &request))
            .collect();
        let nonce = self.nonce;
        self.nonce += 1;
        Ok(Transaction {
            request,
            proofs,
            nonce,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::OsRng;
    use record_program::auth::authorize;

    #[test]
    fn initialize_is_signed_by_payer_and_slot() {
        let payer = SigningKey::generate(&mut OsRng);
        let slot = SigningKey::generate(&mut OsRng);
        let mut client = RecordClient::new(ProgramKind::Message);
        let tx = client.initialize(&payer, &slot, "gm").unwrap();
        assert_eq!(tx.proofs.len(), 2);
        authorize(&tx.request, &payer.verifying_key().into(), &tx.proofs).unwrap();
        authorize(&tx.request, &slot.verifying_key().into(), &tx.proofs).unwrap();
        assert_eq!(tx.request.payer, Some(payer.verifying_key().into()));
    }

    #[test]
    fn identical_updates_get_distinct_ids() {
        let mut client = RecordClient::new(ProgramKind::Greeting);
        let slot = Pubkey::new([1; 32]);
        let a = client.update(slot, "same").unwrap();
        let b = client.update(slot, "same").unwrap();
        assert!(a.proofs.is_empty());
        assert_ne!(a.id(), b.id());
    }
}
