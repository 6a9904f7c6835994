//! Riddler Registry Contract
//!
//! An owner publishes riddles by committing `keccak256(answer)`; anyone may
//! guess by attaching at least the configured minimum deposit. A correct guess
//! marks the riddle solved and emits `RiddleSolved`. Every deposit, winning or
//! not, accrues to the registry balance, which only the owner may withdraw.
//!
//! ## Game Flow
//! 1. Owner calls `init` with the SEP-41 token and the minimum guess deposit.
//! 2. Owner calls `create_riddle` with the question and plaintext answer. Only
//!    the answer's Keccak-256 digest is stored.
//! 3. Players call `guess`, paying the deposit. The attempt is hashed the same
//!    way and compared against the stored commitment.
//! 4. Owner calls `withdraw` to collect the accumulated balance.
//!
//! ## Storage Strategy
//! - `instance()`: Owner, Token, MinDeposit, RiddleCount. Contract config and
//!   the arena length, one ledger entry.
//! - `persistent()`: Balance, TotalDeposited, TotalWithdrawn and one
//!   `Riddle(id)` entry per riddle, each with its own TTL bumped on every write.
//!
//! ## Invariant
//! `balance == total_deposited - total_withdrawn`, and `balance` equals the
//! token amount held on behalf of the registry, assuming all inflows go through
//! `create_riddle` and `guess`.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, log, token::TokenClient,
    Address, BytesN, Env, String, Vec,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Persistent storage TTL in ledgers (~30 days at 5s/ledger).
/// Extended on every write so riddle data never expires while in use.
pub const PERSISTENT_BUMP_LEDGERS: u32 = 518_400;

/// Longest accepted question, in bytes.
pub const MAX_QUESTION_LEN: u32 = 1_024;

// ---------------------------------------------------------------------------
// Error Types
// ---------------------------------------------------------------------------

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized  = 1,
    NotInitialized      = 2,
    Unauthorized        = 3,
    RiddleNotFound      = 4,
    AlreadySolved       = 5,
    InsufficientDeposit = 6,
    InvalidAmount       = 7,
    InvalidInput        = 8,
    TransferFailed      = 9,
    Overflow            = 10,
    AccountingMismatch  = 11,
}

// ---------------------------------------------------------------------------
// Storage Types
// ---------------------------------------------------------------------------

/// Storage key discriminants.
#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    // --- instance() keys: contract-level config ---
    Owner,
    Token,
    MinDeposit,
    /// Number of riddles created so far; the next riddle id.
    RiddleCount,
    // --- persistent() keys: accounting and riddle data ---
    Balance,
    TotalDeposited,
    TotalWithdrawn,
    /// Riddle keyed by its dense, zero-based id.
    Riddle(u32),
}

/// A published riddle. The plaintext answer is never stored.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Riddle {
    pub id:                u32,
    pub question:          String,
    /// Keccak-256 of the answer's UTF-8 bytes.
    pub answer_commitment: BytesN<32>,
    /// Open → Solved, one way.
    pub solved:            bool,
    /// Amount the owner attached at creation (0 allowed).
    pub deposit_collected: i128,
    /// Set together with `solved`.
    pub solver:            Option<Address>,
}

/// Snapshot of the registry's configuration and accounting.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegistryState {
    pub owner:           Address,
    pub token:           Address,
    pub min_deposit:     i128,
    pub balance:         i128,
    pub riddle_count:    u32,
    pub total_deposited: i128,
    pub total_withdrawn: i128,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct Initialized {
    pub owner:       Address,
    pub token:       Address,
    pub min_deposit: i128,
}

#[contractevent]
pub struct RiddleSolved {
    #[topic]
    pub riddle_id: u32,
    #[topic]
    pub solver:    Address,
}

#[contractevent]
pub struct Withdrawn {
    #[topic]
    pub owner:  Address,
    pub amount: i128,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct RiddleRegistry;

#[contractimpl]
impl RiddleRegistry {
    // -----------------------------------------------------------------------
    // init
    // -----------------------------------------------------------------------

    /// Initialize the registry. May only be called once.
    ///
    /// `token` is the SEP-41 contract every deposit and withdrawal moves
    /// through. `min_deposit` is the smallest amount a guess may attach; it is
    /// fixed for the registry's lifetime, as is `owner`.
    pub fn init(env: Env, owner: Address, token: Address, min_deposit: i128) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Owner) {
            return Err(Error::AlreadyInitialized);
        }

        owner.require_auth();

        if min_deposit < 0 {
            return Err(Error::InvalidAmount);
        }

        env.storage().instance().set(&DataKey::Owner,       &owner);
        env.storage().instance().set(&DataKey::Token,       &token);
        env.storage().instance().set(&DataKey::MinDeposit,  &min_deposit);
        env.storage().instance().set(&DataKey::RiddleCount, &0u32);

        set_i128(&env, DataKey::Balance,        0);
        set_i128(&env, DataKey::TotalDeposited, 0);
        set_i128(&env, DataKey::TotalWithdrawn, 0);

        Initialized { owner, token, min_deposit }.publish(&env);

        Ok(())
    }

    // -----------------------------------------------------------------------
    // create_riddle
    // -----------------------------------------------------------------------

    /// Publish a new riddle. Owner only.
    ///
    /// Stores `keccak256(answer)` in place of the answer. `deposit` is pulled
    /// from the owner into the registry balance when non-zero. Returns the new
    /// riddle's id, which is always the previous riddle count.
    pub fn create_riddle(
        env:      Env,
        owner:    Address,
        question: String,
        answer:   String,
        deposit:  i128,
    ) -> Result<u32, Error> {
        require_initialized(&env)?;
        require_owner(&env, &owner)?;

        if deposit < 0 {
            return Err(Error::InvalidAmount);
        }
        if question.is_empty() || question.len() > MAX_QUESTION_LEN {
            log!(&env, "create_riddle: question length {} rejected", question.len());
            return Err(Error::InvalidInput);
        }
        if answer.is_empty() {
            return Err(Error::InvalidInput);
        }

        let answer_commitment = commit(&env, &answer);
        let riddle_id = get_riddle_count(&env);
        let next_count = riddle_id.checked_add(1).ok_or(Error::Overflow)?;

        let riddle = Riddle {
            id: riddle_id,
            question,
            answer_commitment,
            solved: false,
            deposit_collected: deposit,
            solver: None,
        };
        save_riddle(&env, &riddle);
        env.storage().instance().set(&DataKey::RiddleCount, &next_count);

        if deposit > 0 {
            collect_deposit(&env, &owner, deposit)?;
        }

        log!(&env, "create_riddle: id {} deposit {}", riddle_id, deposit);

        Ok(riddle_id)
    }

    // -----------------------------------------------------------------------
    // guess
    // -----------------------------------------------------------------------

    /// Attempt to solve a riddle, attaching `deposit`.
    ///
    /// Checks run in order: the riddle exists, it is still open, the deposit
    /// meets the minimum. The deposit is kept whether or not the attempt is
    /// correct. Returns `true` when this call solved the riddle.
    pub fn guess(
        env:       Env,
        player:    Address,
        riddle_id: u32,
        attempt:   String,
        deposit:   i128,
    ) -> Result<bool, Error> {
        require_initialized(&env)?;
        player.require_auth();

        let mut riddle = load_riddle(&env, riddle_id)?;

        if riddle.solved {
            log!(&env, "guess: riddle {} already solved", riddle_id);
            return Err(Error::AlreadySolved);
        }

        if deposit < 0 {
            return Err(Error::InvalidAmount);
        }
        if deposit < get_min_deposit(&env) {
            log!(&env, "guess: deposit {} below minimum", deposit);
            return Err(Error::InsufficientDeposit);
        }

        let attempt_commitment = commit(&env, &attempt);

        if deposit > 0 {
            collect_deposit(&env, &player, deposit)?;
        }

        if attempt_commitment != riddle.answer_commitment {
            return Ok(false);
        }

        riddle.solved = true;
        riddle.solver = Some(player.clone());
        save_riddle(&env, &riddle);

        RiddleSolved { riddle_id, solver: player }.publish(&env);

        Ok(true)
    }

    // -----------------------------------------------------------------------
    // withdraw
    // -----------------------------------------------------------------------

    /// Transfer the entire registry balance to the owner. Owner only.
    ///
    /// The balance is zeroed before the token transfer. If the transfer fails
    /// the call returns `TransferFailed` and the host discards every write made
    /// by this invocation, so the balance is left as it was.
    pub fn withdraw(env: Env, owner: Address) -> Result<i128, Error> {
        require_initialized(&env)?;
        require_owner(&env, &owner)?;

        let amount = get_balance(&env);
        if amount == 0 {
            return Ok(0);
        }

        let total_withdrawn = get_total_withdrawn(&env)
            .checked_add(amount)
            .ok_or(Error::Overflow)?;
        set_i128(&env, DataKey::Balance,        0);
        set_i128(&env, DataKey::TotalWithdrawn, total_withdrawn);

        let token = get_token(&env);
        let contract_address = env.current_contract_address();
        match TokenClient::new(&env, &token).try_transfer(&contract_address, &owner, &amount) {
            Ok(Ok(_)) => {}
            _ => {
                log!(&env, "withdraw: token transfer of {} failed", amount);
                return Err(Error::TransferFailed);
            }
        }

        Withdrawn { owner, amount }.publish(&env);

        Ok(amount)
    }

    // -----------------------------------------------------------------------
    // View functions
    // -----------------------------------------------------------------------

    /// All riddles in creation order.
    pub fn get_riddles(env: Env) -> Vec<Riddle> {
        let mut riddles = Vec::new(&env);
        for riddle_id in 0..get_riddle_count(&env) {
            if let Some(riddle) = env
                .storage()
                .persistent()
                .get::<DataKey, Riddle>(&DataKey::Riddle(riddle_id))
            {
                riddles.push_back(riddle);
            }
        }
        riddles
    }

    /// Returns the riddle, or `None` if no riddle has this id.
    pub fn get_riddle(env: Env, riddle_id: u32) -> Option<Riddle> {
        env.storage().persistent().get(&DataKey::Riddle(riddle_id))
    }

    pub fn riddle_count(env: Env) -> u32 {
        get_riddle_count(&env)
    }

    pub fn get_min_deposit_amount(env: Env) -> Result<i128, Error> {
        require_initialized(&env)?;
        Ok(get_min_deposit(&env))
    }

    /// The commitment `create_riddle` would store for `text`.
    pub fn commitment_of(env: Env, text: String) -> BytesN<32> {
        commit(&env, &text)
    }

    pub fn registry_state(env: Env) -> Result<RegistryState, Error> {
        require_initialized(&env)?;

        let state = RegistryState {
            owner:           get_owner(&env),
            token:           get_token(&env),
            min_deposit:     get_min_deposit(&env),
            balance:         get_balance(&env),
            riddle_count:    get_riddle_count(&env),
            total_deposited: get_total_deposited(&env),
            total_withdrawn: get_total_withdrawn(&env),
        };

        let expected_balance = state
            .total_deposited
            .checked_sub(state.total_withdrawn)
            .ok_or(Error::Overflow)?;

        if expected_balance != state.balance {
            return Err(Error::AccountingMismatch);
        }

        Ok(state)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `keccak256` over the UTF-8 bytes of `text`, i.e. the digest of its packed
/// encoding. Used identically for answers and attempts.
fn commit(env: &Env, text: &String) -> BytesN<32> {
    env.crypto().keccak256(&text.to_bytes()).into()
}

fn collect_deposit(env: &Env, from: &Address, amount: i128) -> Result<(), Error> {
    let token = get_token(env);
    let contract_address = env.current_contract_address();
    TokenClient::new(env, &token).transfer(from, &contract_address, &amount);

    let balance = get_balance(env)
        .checked_add(amount)
        .ok_or(Error::Overflow)?;
    let total_deposited = get_total_deposited(env)
        .checked_add(amount)
        .ok_or(Error::Overflow)?;

    set_i128(env, DataKey::Balance,        balance);
    set_i128(env, DataKey::TotalDeposited, total_deposited);

    Ok(())
}

fn require_initialized(env: &Env) -> Result<(), Error> {
    if !env.storage().instance().has(&DataKey::Owner) {
        return Err(Error::NotInitialized);
    }
    Ok(())
}

fn require_owner(env: &Env, caller: &Address) -> Result<(), Error> {
    let owner = get_owner(env);
    caller.require_auth();
    if &owner != caller {
        log!(env, "only owner can do this");
        return Err(Error::Unauthorized);
    }
    Ok(())
}

fn load_riddle(env: &Env, riddle_id: u32) -> Result<Riddle, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Riddle(riddle_id))
        .ok_or(Error::RiddleNotFound)
}

fn save_riddle(env: &Env, riddle: &Riddle) {
    let key = DataKey::Riddle(riddle.id);
    env.storage().persistent().set(&key, riddle);
    extend_persistent_ttl(env, &key);
}

fn get_owner(env: &Env) -> Address {
    env.storage()
        .instance()
        .get(&DataKey::Owner)
        .expect("RiddleRegistry: owner not set")
}

fn get_token(env: &Env) -> Address {
    env.storage()
        .instance()
        .get(&DataKey::Token)
        .expect("RiddleRegistry: token not set")
}

fn get_min_deposit(env: &Env) -> i128 {
    env.storage()
        .instance()
        .get(&DataKey::MinDeposit)
        .unwrap_or(0)
}

fn get_riddle_count(env: &Env) -> u32 {
    env.storage()
        .instance()
        .get(&DataKey::RiddleCount)
        .unwrap_or(0)
}

fn get_balance(env: &Env) -> i128 {
    env.storage()
        .persistent()
        .get(&DataKey::Balance)
        .unwrap_or(0)
}

fn get_total_deposited(env: &Env) -> i128 {
    env.storage()
        .persistent()
        .get(&DataKey::TotalDeposited)
        .unwrap_or(0)
}

fn get_total_withdrawn(env: &Env) -> i128 {
    env.storage()
        .persistent()
        .get(&DataKey::TotalWithdrawn)
        .unwrap_or(0)
}

fn set_i128(env: &Env, key: DataKey, value: i128) {
    env.storage().persistent().set(&key, &value);
    extend_persistent_ttl(env, &key);
}

fn extend_persistent_ttl(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}
