//! Instruction dispatch.
//!
//! [`process`] is the whole transaction boundary as far as the program is
//! concerned: it decodes the instruction, runs the authorization and
//! precondition checks, builds the complete new account and commits it with a
//! single [`RecordStore::put`]. Every error return happens before that write,
//! so a failed request leaves the store exactly as it found it.

use tracing::{debug, info};

use crate::auth::{authorize, Proof};
use crate::error::{AuthError, ProgramError};
use crate::instruction::{RecordInstruction, Request};
use crate::pubkey::Pubkey;
use crate::rent::Rent;
use crate::state::{GreetingRecord, MessageRecord, ProgramKind, Record};
use crate::store::{Account, RecordStore, WriteIntent};

/// Everything the host hands the program for one request.
pub struct Invocation<'a> {
    pub request: &'a Request,
    pub proofs: &'a [Proof],
    /// Current balance of `request.payer`; zero when there is none.
    pub payer_lamports: u64,
}

/// What a successful request did. Carries no record data: callers read the
/// slot back themselves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A slot was created and funded with `lamports` taken from `payer`.
    Created {
        slot: Pubkey,
        payer: Pubkey,
        lamports: u64,
    },
    Updated { slot: Pubkey, count: u64 },
    Viewed { slot: Pubkey },
    Pinged,
}

/// Program log lines for one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgramLog {
    lines: Vec<String>,
}

impl ProgramLog {
    pub fn msg(&mut self, line: String) {
        info!(target: "record_program::log", "{line}");
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

pub fn process<S: RecordStore>(
    store: &mut S,
    rent: &Rent,
    invocation: Invocation<'_>,
    log: &mut ProgramLog,
) -> Result<Outcome, ProgramError> {
    let request = invocation.request;
    let instruction = RecordInstruction::unpack(&request.data)?;
    debug!(
        program = %request.program,
        slot = %request.slot,
        instruction = instruction.name(),
        "dispatching"
    );
    match instruction {
        RecordInstruction::Initialize { message } => {
            initialize(store, rent, &invocation, message, log)
        }
        RecordInstruction::Update { message } => update(store, request, message, log),
        RecordInstruction::Get => get(store, request, log),
        RecordInstruction::Ping => {
            log.msg(format!("Greetings from: the {} program", request.program));
            Ok(Outcome::Pinged)
        }
    }
}

fn initialize<S: RecordStore>(
    store: &mut S,
    rent: &Rent,
    invocation: &Invocation<'_>,
    message: String,
    log: &mut ProgramLog,
) -> Result<Outcome, ProgramError> {
    let request = invocation.request;
    let slot = request.slot;
    let payer = request.payer.ok_or(AuthError::MissingPayer)?;
    // funder pays, and the fresh slot key proves the address is the caller's
    authorize(request, &payer, invocation.proofs)?;
    authorize(request, &slot, invocation.proofs)?;

    if store.exists(&slot) {
        return Err(ProgramError::AlreadyInitialized { slot });
    }

    let record = match request.program {
        ProgramKind::Message => Record::Message(MessageRecord {
            message,
            sender: payer,
        }),
        ProgramKind::Greeting => Record::Greeting(GreetingRecord { message, count: 0 }),
    };
    let data = record.encode()?;
    let lamports = rent.check_funding(invocation.payer_lamports, request.program.max_space())?;

    store.put(
        slot,
        Account {
            program: request.program,
            lamports,
            data,
        },
        WriteIntent::Create,
    )?;

    match &record {
        Record::Message(r) => log.msg(format!("Message from {}: {}", r.sender, r.message)),
        Record::Greeting(r) => log.msg(format!("Initialized with message: {}", r.message)),
    }
    Ok(Outcome::Created {
        slot,
        payer,
        lamports,
    })
}

/// Needs no signature: anyone able to reference the slot may update it.
fn update<S: RecordStore>(
    store: &mut S,
    request: &Request,
    message: String,
    log: &mut ProgramLog,
) -> Result<Outcome, ProgramError> {
    if request.program == ProgramKind::Message {
        return Err(ProgramError::UnsupportedInstruction {
            program: request.program,
            instruction: "update",
        });
    }
    let slot = request.slot;
    let account = owned_account(store, request)?;
    let current = GreetingRecord::decode(&account.data)?;
    let next = GreetingRecord {
        message,
        count: current.count.checked_add(1).ok_or(ProgramError::CounterOverflow)?,
    };
    let data = next.encode()?;

    let account = Account {
        data,
        ..account.clone()
    };
    store.put(slot, account, WriteIntent::Overwrite)?;

    log.msg(format!(
        "Updated message to: {} (count: {})",
        next.message, next.count
    ));
    Ok(Outcome::Updated {
        slot,
        count: next.count,
    })
}

fn get<S: RecordStore>(
    store: &S,
    request: &Request,
    log: &mut ProgramLog,
) -> Result<Outcome, ProgramError> {
    let account = owned_account(store, request)?;
    match account.record()? {
        Record::Message(r) => log.msg(format!(
            "Current message: {} (from {})",
            r.message, r.sender
        )),
        Record::Greeting(r) => log.msg(format!(
            "Current greeting: {} (accessed {} times)",
            r.message, r.count
        )),
    }
    Ok(Outcome::Viewed { slot: request.slot })
}

fn owned_account<'s, S: RecordStore>(
    store: &'s S,
    request: &Request,
) -> Result<&'s Account, ProgramError> {
    let slot = request.slot;
    let account = store
        .get(&slot)
        .ok_or(ProgramError::NotInitialized { slot })?;
    if account.program != request.program {
        return Err(ProgramError::ProgramMismatch {
            slot,
            owner: account.program,
        });
    }
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;

    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    use crate::store::MemoryStore;

    const FUNDS: u64 = 1_000_000_000;

    struct Harness {
        store: MemoryStore,
        rent: Rent,
        payer: SigningKey,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: MemoryStore::new(),
                rent: Rent::default(),
                payer: SigningKey::generate(&mut OsRng),
            }
        }

        fn run(
            &mut self,
            request: &Request,
            signers: &[&SigningKey],
            payer_lamports: u64,
        ) -> Result<Outcome, ProgramError> {
            let proofs: Vec<Proof> = signers.iter().map(|k| Proof::sign(k, request)).collect();
            let mut log = ProgramLog::default();
            process(
                &mut self.store,
                &self.rent,
                Invocation {
                    request,
                    proofs: &proofs,
                    payer_lamports,
                },
                &mut log,
            )
        }

        fn init(
            &mut self,
            program: ProgramKind,
            slot: &SigningKey,
            message: &str,
        ) -> Result<Outcome, ProgramError> {
            let payer = self.payer.clone();
            let request = Request::new(
                program,
                slot.verifying_key().into(),
                Some(payer.verifying_key().into()),
                &RecordInstruction::Initialize {
                    message: message.into(),
                },
            )
            .unwrap();
            self.run(&request, &[&payer, slot], FUNDS)
        }

        fn update(&mut self, slot: Pubkey, message: &str) -> Result<Outcome, ProgramError> {
            let request = Request::new(
                ProgramKind::Greeting,
                slot,
                None,
                &RecordInstruction::Update {
                    message: message.into(),
                },
            )
            .unwrap();
            self.run(&request, &[], 0)
        }

        fn record(&self, slot: &Pubkey) -> Record {
            self.store.get_record(slot).unwrap().unwrap()
        }
    }

    #[test]
    fn message_initialize_records_sender() {
        let mut h = Harness::new();
        let slot = SigningKey::generate(&mut OsRng);
        let slot_key: Pubkey = slot.verifying_key().into();
        let outcome = h
            .init(
                ProgramKind::Message,
                &slot,
                "Hello, Solana! This is a test message from my contract.",
            )
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Created {
                slot: slot_key,
                payer: h.payer.verifying_key().into(),
                lamports: h.rent.minimum_balance(MessageRecord::SPACE),
            }
        );
        assert_eq!(
            h.record(&slot_key),
            Record::Message(MessageRecord {
                message: "Hello, Solana! This is a test message from my contract.".into(),
                sender: h.payer.verifying_key().into(),
            })
        );
    }

    #[test]
    fn second_initialize_fails_and_keeps_record() {
        let mut h = Harness::new();
        let slot = SigningKey::generate(&mut OsRng);
        let slot_key: Pubkey = slot.verifying_key().into();
        h.init(ProgramKind::Greeting, &slot, "first").unwrap();
        let before = h.store.clone();
        assert_eq!(
            h.init(ProgramKind::Greeting, &slot, "second").unwrap_err(),
            ProgramError::AlreadyInitialized { slot: slot_key }
        );
        assert_eq!(h.store, before);
    }

    #[test]
    fn greeting_counter_tracks_updates() {
        let mut h = Harness::new();
        let slot = SigningKey::generate(&mut OsRng);
        let slot_key: Pubkey = slot.verifying_key().into();
        h.init(ProgramKind::Greeting, &slot, "Hello, Solana World!").unwrap();
        assert_eq!(
            h.record(&slot_key),
            Record::Greeting(GreetingRecord {
                message: "Hello, Solana World!".into(),
                count: 0
            })
        );
        let updates = [
            "Updated greeting from Solana!",
            "Second update!",
            "Third update!",
            "Final update!",
        ];
        for (i, msg) in updates.iter().enumerate() {
            let outcome = h.update(slot_key, msg).unwrap();
            assert_eq!(
                outcome,
                Outcome::Updated {
                    slot: slot_key,
                    count: i as u64 + 1
                }
            );
        }
        assert_eq!(
            h.record(&slot_key),
            Record::Greeting(GreetingRecord {
                message: "Final update!".into(),
                count: 4
            })
        );
    }

    #[test]
    fn update_of_empty_slot_creates_nothing() {
        let mut h = Harness::new();
        let slot = Pubkey::new([8; 32]);
        assert_eq!(
            h.update(slot, "nope").unwrap_err(),
            ProgramError::NotInitialized { slot }
        );
        assert!(!h.store.exists(&slot));
    }

    #[test]
    fn get_is_read_only() {
        let mut h = Harness::new();
        let slot = SigningKey::generate(&mut OsRng);
        let slot_key: Pubkey = slot.verifying_key().into();
        h.init(ProgramKind::Greeting, &slot, "hi").unwrap();
        h.update(slot_key, "there").unwrap();
        let before = h.store.clone();
        let request =
            Request::new(ProgramKind::Greeting, slot_key, None, &RecordInstruction::Get).unwrap();
        assert_eq!(h.run(&request, &[], 0).unwrap(), Outcome::Viewed { slot: slot_key });
        assert_eq!(h.run(&request, &[], 0).unwrap(), Outcome::Viewed { slot: slot_key });
        assert_eq!(h.store, before);
    }

    #[test]
    fn underfunded_payer_is_refused() {
        let mut h = Harness::new();
        let slot = SigningKey::generate(&mut OsRng);
        let payer = h.payer.clone();
        let request = Request::new(
            ProgramKind::Greeting,
            slot.verifying_key().into(),
            Some(payer.verifying_key().into()),
            &RecordInstruction::Initialize {
                message: "gm".into(),
            },
        )
        .unwrap();
        let err = h.run(&request, &[&payer, &slot], 10).unwrap_err();
        assert_eq!(
            err,
            ProgramError::InsufficientFunds {
                required: h.rent.minimum_balance(GreetingRecord::SPACE),
                available: 10
            }
        );
        assert!(h.store.is_empty());
    }

    #[test]
    fn initialize_needs_payer_and_slot_signatures() {
        let mut h = Harness::new();
        let slot = SigningKey::generate(&mut OsRng);
        let payer = h.payer.clone();
        let request = Request::new(
            ProgramKind::Message,
            slot.verifying_key().into(),
            Some(payer.verifying_key().into()),
            &RecordInstruction::Initialize {
                message: "gm".into(),
            },
        )
        .unwrap();
        assert_eq!(
            h.run(&request, &[&slot], FUNDS).unwrap_err(),
            ProgramError::Unauthorized(AuthError::MissingProof(payer.verifying_key().into()))
        );
        assert_eq!(
            h.run(&request, &[&payer], FUNDS).unwrap_err(),
            ProgramError::Unauthorized(AuthError::MissingProof(slot.verifying_key().into()))
        );
        assert!(h.store.is_empty());
    }

    #[test]
    fn oversize_message_is_a_codec_error() {
        let mut h = Harness::new();
        let slot = SigningKey::generate(&mut OsRng);
        let err = h
            .init(ProgramKind::Greeting, &slot, &"x".repeat(201))
            .unwrap_err();
        assert!(matches!(err, ProgramError::Codec(_)), "{err}");
        assert!(h.store.is_empty());
    }

    #[test]
    fn message_program_has_no_update() {
        let mut h = Harness::new();
        let slot = SigningKey::generate(&mut OsRng);
        let slot_key: Pubkey = slot.verifying_key().into();
        h.init(ProgramKind::Message, &slot, "fixed").unwrap();
        let request = Request::new(
            ProgramKind::Message,
            slot_key,
            None,
            &RecordInstruction::Update {
                message: "changed".into(),
            },
        )
        .unwrap();
        assert!(matches!(
            h.run(&request, &[], 0).unwrap_err(),
            ProgramError::UnsupportedInstruction { .. }
        ));
        assert_eq!(h.record(&slot_key).message(), "fixed");
    }

    #[test]
    fn programs_cannot_touch_each_others_slots() {
        let mut h = Harness::new();
        let slot = SigningKey::generate(&mut OsRng);
        let slot_key: Pubkey = slot.verifying_key().into();
        h.init(ProgramKind::Message, &slot, "mine").unwrap();
        assert_eq!(
            h.update(slot_key, "yours").unwrap_err(),
            ProgramError::ProgramMismatch {
                slot: slot_key,
                owner: ProgramKind::Message
            }
        );
    }

    #[test]
    fn counter_saturation_is_an_error() {
        let mut h = Harness::new();
        let slot = Pubkey::new([5; 32]);
        h.store
            .put(
                slot,
                Account {
                    program: ProgramKind::Greeting,
                    lamports: 0,
                    data: GreetingRecord {
                        message: "max".into(),
                        count: u64::MAX,
                    }
                    .encode()
                    .unwrap(),
                },
                WriteIntent::Create,
            )
            .unwrap();
        assert_eq!(h.update(slot, "one more").unwrap_err(), ProgramError::CounterOverflow);
    }

    #[test]
    fn ping_logs_and_touches_nothing() {
        let mut h = Harness::new();
        let request = Request::new(
            ProgramKind::Message,
            Pubkey::default(),
            None,
            &RecordInstruction::Ping,
        )
        .unwrap();
        let mut log = ProgramLog::default();
        let outcome = process(
            &mut h.store,
            &h.rent,
            Invocation {
                request: &request,
                proofs: &[],
                payer_lamports: 0,
            },
            &mut log,
        )
        .unwrap();
        assert_eq!(outcome, Outcome::Pinged);
        assert_eq!(log.lines(), ["Greetings from: the message program".to_string()]);
        assert!(h.store.is_empty());
    }
}
