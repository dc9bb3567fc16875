//! Instruction-list transaction builder
//!
//! Turns a fee payer plus a list of instructions into a fully signed legacy
//! transaction. Compute-budget instructions from [`BuilderConfig`] are
//! prepended; instruction contents are never inspected.

use async_trait::async_trait;
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    hash::Hash,
    instruction::Instruction,
    message::Message,
    pubkey::Pubkey,
    signer::signers::Signers,
    transaction::Transaction,
};
use std::sync::Arc;
use tracing::debug;

use super::errors::TransactionBuilderError;
use crate::config::BuilderConfig;
use crate::types::SignedTransaction;

/// Source of a recent blockhash for the transaction validity window
#[async_trait]
pub trait BlockhashSource: Send + Sync {
    async fn latest_blockhash(&self) -> Result<Hash, TransactionBuilderError>;
}

/// Fixed blockhash, for offline signing and tests
#[derive(Debug, Clone, Copy)]
pub struct StaticBlockhash(pub Hash);

#[async_trait]
impl BlockhashSource for StaticBlockhash {
    async fn latest_blockhash(&self) -> Result<Hash, TransactionBuilderError> {
        Ok(self.0)
    }
}

/// What to build: who pays and which instructions to run
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    pub fee_payer: Pubkey,
    pub instructions: Vec<Instruction>,
}

impl TransactionRequest {
    pub fn new(fee_payer: Pubkey) -> Self {
        Self {
            fee_payer,
            instructions: Vec::new(),
        }
    }

    pub fn with_instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    pub fn with_instructions(mut self, instructions: impl IntoIterator<Item = Instruction>) -> Self {
        self.instructions.extend(instructions);
        self
    }
}

/// Produces a signed, network-ready transaction from structured parameters
#[async_trait]
pub trait TransactionBuilder: Send + Sync {
    async fn build_signed<S>(
        &self,
        request: &TransactionRequest,
        signers: &S,
    ) -> Result<SignedTransaction, TransactionBuilderError>
    where
        S: Signers + Sync + ?Sized;
}

/// Default builder: compute-budget prefix, legacy message, recent blockhash
pub struct InstructionTxBuilder {
    blockhash: Arc<dyn BlockhashSource>,
    config: BuilderConfig,
}

impl std::fmt::Debug for InstructionTxBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstructionTxBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl InstructionTxBuilder {
    pub fn new(blockhash: Arc<dyn BlockhashSource>, config: BuilderConfig) -> Self {
        Self { blockhash, config }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Resolve a named well-known account from configuration
    pub fn known_account(&self, name: &str) -> Result<Pubkey, TransactionBuilderError> {
        self.config
            .known_accounts
            .get(name)
            .map(|key| key.to_pubkey())
            .ok_or_else(|| {
                TransactionBuilderError::Configuration(format!("unknown account '{}'", name))
            })
    }

    /// Final instruction list: compute budget first, then the request
    fn plan_instructions(&self, request: &TransactionRequest) -> Vec<Instruction> {
        let mut instructions = Vec::with_capacity(request.instructions.len() + 2);
        if let Some(limit) = self.config.compute_unit_limit {
            instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(limit));
        }
        if let Some(price) = self.config.compute_unit_price_micro_lamports {
            instructions.push(ComputeBudgetInstruction::set_compute_unit_price(price));
        }
        instructions.extend(request.instructions.iter().cloned());
        instructions
    }
}

#[async_trait]
impl TransactionBuilder for InstructionTxBuilder {
    async fn build_signed<S>(
        &self,
        request: &TransactionRequest,
        signers: &S,
    ) -> Result<SignedTransaction, TransactionBuilderError>
    where
        S: Signers + Sync + ?Sized,
    {
        if request.instructions.is_empty() {
            return Err(TransactionBuilderError::InvalidRequest(
                "no instructions".to_string(),
            ));
        }

        let blockhash = self.blockhash.latest_blockhash().await?;
        let instructions = self.plan_instructions(request);
        let message = Message::new_with_blockhash(&instructions, Some(&request.fee_payer), &blockhash);

        // `try_sign` reports an unexpected keypair as a pubkey mismatch
        let provided = signers.pubkeys();
        if let Some(missing) = message
            .account_keys
            .iter()
            .take(message.header.num_required_signatures as usize)
            .find(|key| !provided.contains(key))
        {
            return Err(TransactionBuilderError::MissingSigner(missing.to_string()));
        }

        let mut tx = Transaction::new_unsigned(message);
        tx.try_sign(signers, blockhash)?;

        debug!(
            fee_payer = %request.fee_payer,
            instructions = instructions.len(),
            signatures = tx.signatures.len(),
            blockhash = %blockhash,
            "Built signed transaction"
        );

        Ok(SignedTransaction::from_legacy(&tx)?)
    }
}
