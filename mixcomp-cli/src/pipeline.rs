//! Ordered, validated invocation stages.
//!
//! Invoking a Solana program through the Computer takes a fixed series of
//! requests and local steps. Each is a [`Stage`] with explicit
//! prerequisites; a [`Pipeline`] checks the whole list before sending
//! anything and then runs it in order, collecting each stage's output in a
//! [`PipelineOutput`].

use std::fmt;

use mixcomp::amount::Amount;
use mixcomp::invoice::Invoice;
use mixcomp::proto::{ComputerInfo, FeeQuote, UserRecord};
use mixcomp::timestamp::UnixTimestamp;
use mixcomp_http::ComputerClient;
use mixcomp_svm::builder::parse_pubkey;
use mixcomp_svm::system::{SOL_DECIMALS, lamports_moved, transfer};
use mixcomp_svm::{DurableNonce, Instruction, Pubkey, SystemCallBuilder, SystemCallTransaction};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{FlowError, OrderViolation, PipelineError};
use crate::fee::get_fee;
use crate::invoice::InvoiceAssembler;
use crate::registration::{registered_user, user_address};

/// One step of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Fetch the computer descriptor.
    Descriptor,
    /// Look up the caller; fails unless registered.
    Registration,
    /// Fetch one durable nonce per transaction.
    NonceAccount,
    /// Build and serialize the transactions.
    Transaction,
    /// Quote the fee of every transaction for the SOL it moves.
    FeeQuote,
    /// Assemble the invoices and their payment links.
    Invoice,
}

impl Stage {
    /// Full invocation, in order.
    pub const INVOKE: [Self; 6] = [
        Self::Descriptor,
        Self::Registration,
        Self::NonceAccount,
        Self::Transaction,
        Self::FeeQuote,
        Self::Invoice,
    ];

    /// Stages that must run before this one.
    #[must_use]
    pub const fn requires(self) -> &'static [Self] {
        match self {
            Self::Descriptor | Self::Registration => &[],
            Self::NonceAccount => &[Self::Descriptor, Self::Registration],
            Self::Transaction => &[Self::Descriptor, Self::Registration, Self::NonceAccount],
            Self::FeeQuote => &[Self::Transaction],
            Self::Invoice => &[
                Self::Descriptor,
                Self::Registration,
                Self::Transaction,
                Self::FeeQuote,
            ],
        }
    }

    /// Lowercase stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Descriptor => "descriptor",
            Self::Registration => "registration",
            Self::NonceAccount => "nonce_account",
            Self::Transaction => "transaction",
            Self::FeeQuote => "fee_quote",
            Self::Invoice => "invoice",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Checks that no stage repeats and every stage follows its prerequisites.
///
/// # Errors
///
/// Returns [`PipelineError::OutOfOrder`] for the first misplaced stage.
pub fn validate(stages: &[Stage]) -> Result<(), PipelineError> {
    let mut seen: Vec<Stage> = Vec::with_capacity(stages.len());
    for &stage in stages {
        if seen.contains(&stage) {
            return Err(PipelineError::OutOfOrder {
                stage,
                reason: OrderViolation::Repeated,
            });
        }
        if let Some(&missing) = stage.requires().iter().find(|r| !seen.contains(r)) {
            return Err(PipelineError::OutOfOrder {
                stage,
                reason: OrderViolation::Requires(missing),
            });
        }
        seen.push(stage);
    }
    Ok(())
}

/// What to invoke, and for whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequest {
    /// Receiver of the transfer.
    pub program_id: Pubkey,
    /// Mixin user paying for the call.
    pub user_id: Uuid,
    /// Source of the transfer; the user's chain address when unset.
    pub from: Option<Pubkey>,
    /// Extra instructions run after the transfer.
    pub instructions: Vec<Instruction>,
}

impl InvokeRequest {
    /// Transfer to `program_id` on behalf of `user_id`.
    #[must_use]
    pub const fn new(program_id: Pubkey, user_id: Uuid) -> Self {
        Self {
            program_id,
            user_id,
            from: None,
            instructions: Vec::new(),
        }
    }

    /// Transfers from `from` instead of the user's chain address.
    #[must_use]
    pub const fn with_from(mut self, from: Pubkey) -> Self {
        self.from = Some(from);
        self
    }

    /// Runs `instructions` after the transfer.
    #[must_use]
    pub fn with_instructions(mut self, instructions: Vec<Instruction>) -> Self {
        self.instructions = instructions;
        self
    }
}

/// Everything the stages produced so far.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    /// Computer descriptor.
    pub info: Option<ComputerInfo>,
    /// The caller's Computer record.
    pub user: Option<UserRecord>,
    /// Payload instructions, one chunk per transaction.
    pub plan: Vec<Vec<Instruction>>,
    /// One durable nonce per chunk.
    pub nonces: Vec<DurableNonce>,
    /// Serialized transactions.
    pub transactions: Vec<Vec<u8>>,
    /// One fee quote per transaction.
    pub quotes: Vec<FeeQuote>,
    /// One invoice per transaction.
    pub invoices: Vec<Invoice>,
    /// Payment link of each invoice.
    pub pay_urls: Vec<String>,
}

impl PipelineOutput {
    fn info(&self) -> Result<&ComputerInfo, PipelineError> {
        self.info
            .as_ref()
            .ok_or(PipelineError::MissingOutput(Stage::Descriptor))
    }

    fn user(&self) -> Result<&UserRecord, PipelineError> {
        self.user
            .as_ref()
            .ok_or(PipelineError::MissingOutput(Stage::Registration))
    }
}

/// Runs stage lists against one Computer.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'a> {
    client: &'a ComputerClient,
    config: &'a ClientConfig,
}

impl<'a> Pipeline<'a> {
    /// Creates a pipeline using `client` and `config`.
    #[must_use]
    pub const fn new(client: &'a ComputerClient, config: &'a ClientConfig) -> Self {
        Self { client, config }
    }

    /// Runs [`Stage::INVOKE`] and returns one payment link per transaction.
    ///
    /// # Errors
    ///
    /// Returns the first [`FlowError`] of any stage.
    pub async fn invoke(&self, request: &InvokeRequest) -> Result<Vec<String>, FlowError> {
        Ok(self.run(&Stage::INVOKE, request).await?.pay_urls)
    }

    /// Validates `stages`, then runs them in order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::OutOfOrder`] before any request if the list
    /// is invalid, otherwise the first [`FlowError`] of any stage.
    pub async fn run(
        &self,
        stages: &[Stage],
        request: &InvokeRequest,
    ) -> Result<PipelineOutput, FlowError> {
        validate(stages)?;
        let mut out = PipelineOutput::default();
        for &stage in stages {
            tracing::debug!(%stage, user_id = %request.user_id, "running stage");
            match stage {
                Stage::Descriptor => out.info = Some(self.client.computer_info().await?),
                Stage::Registration => {
                    out.user = Some(registered_user(self.client, request.user_id).await?);
                }
                Stage::NonceAccount => self.fetch_nonces(&mut out, request).await?,
                Stage::Transaction => self.build_transactions(&mut out)?,
                Stage::FeeQuote => self.quote_fees(&mut out).await?,
                Stage::Invoice => self.assemble_invoices(&mut out, request)?,
            }
        }
        Ok(out)
    }

    fn builder(&self, info: &ComputerInfo) -> Result<SystemCallBuilder, FlowError> {
        let payer = parse_pubkey("payer", &info.payer)?;
        Ok(SystemCallBuilder::new(payer).with_size_limit(self.config.transaction_size_limit))
    }

    async fn fetch_nonces(
        &self,
        out: &mut PipelineOutput,
        request: &InvokeRequest,
    ) -> Result<(), FlowError> {
        let from = match request.from {
            Some(from) => from,
            None => {
                let chain_address = out
                    .user()?
                    .chain_address
                    .as_deref()
                    .ok_or(FlowError::MissingChainAddress(request.user_id))?;
                parse_pubkey("chain_address", chain_address)?
            }
        };

        let mut payload = Vec::with_capacity(1 + request.instructions.len());
        payload.push(transfer(
            &from,
            &request.program_id,
            self.config.transfer_lamports,
        ));
        payload.extend_from_slice(&request.instructions);
        let plan = self.builder(out.info()?)?.plan(&payload)?;

        let address = user_address(request.user_id);
        let mut nonces = Vec::with_capacity(plan.len());
        for _ in &plan {
            let account = self.client.nonce_account(&address).await?;
            nonces.push(DurableNonce::try_from(&account)?);
        }
        tracing::debug!(transactions = plan.len(), "nonce accounts ready");
        out.plan = plan;
        out.nonces = nonces;
        Ok(())
    }

    fn build_transactions(&self, out: &mut PipelineOutput) -> Result<(), FlowError> {
        let builder = self.builder(out.info()?)?;
        if out.plan.is_empty() {
            return Err(PipelineError::MissingOutput(Stage::NonceAccount).into());
        }
        out.transactions = builder
            .build_all(&out.plan, &out.nonces)?
            .iter()
            .map(SystemCallTransaction::to_bytes)
            .collect::<Result<_, _>>()?;
        Ok(())
    }

    async fn quote_fees(&self, out: &mut PipelineOutput) -> Result<(), FlowError> {
        if out.transactions.len() != out.plan.len() {
            return Err(PipelineError::MissingOutput(Stage::Transaction).into());
        }
        let mut quotes = Vec::with_capacity(out.plan.len());
        for chunk in &out.plan {
            let sol_amount = Amount::from_units(lamports_moved(chunk), SOL_DECIMALS)?;
            quotes.push(get_fee(self.client, sol_amount).await?);
        }
        out.quotes = quotes;
        Ok(())
    }

    fn assemble_invoices(
        &self,
        out: &mut PipelineOutput,
        request: &InvokeRequest,
    ) -> Result<(), FlowError> {
        if out.quotes.len() < out.transactions.len() || out.transactions.is_empty() {
            return Err(PipelineError::MissingOutput(Stage::FeeQuote).into());
        }
        let assembler =
            InvoiceAssembler::new(out.info()?, self.config, out.user()?, request.user_id)?;
        let now = UnixTimestamp::now();
        let mut invoices = Vec::with_capacity(out.transactions.len());
        let mut pay_urls = Vec::with_capacity(out.transactions.len());
        for (i, (tx, quote)) in out.transactions.iter().zip(&out.quotes).enumerate() {
            let invoice = assembler.build(tx, quote, i == 0, now)?;
            pay_urls.push(assembler.pay_url(&invoice));
            invoices.push(invoice);
        }
        tracing::info!(
            user_id = %request.user_id,
            invoices = invoices.len(),
            "invocation ready for payment"
        );
        out.invoices = invoices;
        out.pay_urls = pay_urls;
        Ok(())
    }
}
