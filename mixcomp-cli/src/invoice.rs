//! Invoice assembly for a system call.
//!
//! One invoice pays for one serialized transaction: the transaction rides as
//! a storage attachment, each configured deposit asset becomes a line item
//! crediting the user, and a final fee line item carries the system-call
//! memo and references the deposits so the Computer processes them first.

use mixcomp::amount::Amount;
use mixcomp::deeplink::invoice_url;
use mixcomp::extra::{MtgMemo, OperationPayload};
use mixcomp::invoice::{LineItem, Reference};
use mixcomp::proto::{ComputerInfo, FeeQuote, UserId, UserRecord};
use mixcomp::timestamp::UnixTimestamp;
use mixcomp::{Invoice, MixAddress};
use mixcomp_http::ComputerClient;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::FlowError;
use crate::registration::registered_user;

/// Builds invoices for one registered user against one computer descriptor.
#[derive(Debug, Clone)]
pub struct InvoiceAssembler<'a> {
    info: &'a ComputerInfo,
    config: &'a ClientConfig,
    computer_user: UserId,
    recipient: MixAddress,
}

impl<'a> InvoiceAssembler<'a> {
    /// Prepares an assembler for `user`, the Computer record of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::NotRegistered`] if the record has no id, or
    /// [`FlowError::Address`] if the descriptor's member list is invalid.
    pub fn new(
        info: &'a ComputerInfo,
        config: &'a ClientConfig,
        user: &UserRecord,
        user_id: Uuid,
    ) -> Result<Self, FlowError> {
        let computer_user = user.id.ok_or(FlowError::NotRegistered(user_id))?;
        let recipient = info.members.mix_address()?;
        Ok(Self {
            info,
            config,
            computer_user,
            recipient,
        })
    }

    /// The Computer's numeric id of the user.
    #[must_use]
    pub const fn computer_user(&self) -> UserId {
        self.computer_user
    }

    /// Assembles the invoice paying for `transaction` with `quote`.
    ///
    /// Deposit items are added only when `with_deposits` is set; the fee
    /// item then references all of them.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::ExpiredFee`] if `quote` is no longer valid at
    /// `now`, or [`FlowError::Invoice`] / [`FlowError::Amount`] if the
    /// invoice cannot be built.
    pub fn build(
        &self,
        transaction: &[u8],
        quote: &FeeQuote,
        with_deposits: bool,
        now: UnixTimestamp,
    ) -> Result<Invoice, FlowError> {
        quote.ensure_fresh(self.config.fee_ttl_secs, now)?;
        let app_id = self.info.members.app_id;
        let user = self.computer_user.0;

        let mut invoice = Invoice::new(self.recipient.clone());
        invoice.attach_storage(Uuid::new_v4(), transaction.to_vec())?;

        let mut deposits = Vec::new();
        if with_deposits {
            let extra = MtgMemo::new(app_id, OperationPayload::user_deposit(user)).to_extra();
            for (asset, amount) in self.config.assets.deposits() {
                let index = invoice.push_item(LineItem::new(asset.id, amount, extra.clone()))?;
                deposits.push(index);
            }
        }

        let call = OperationPayload::system_call(
            user,
            Uuid::new_v4(),
            self.config.skip_post_process,
            Some(quote.fee_id),
        );
        let total = Amount::total_fee(self.info.params.operation.price, quote.xin_amount)?;
        let fee = LineItem::new(
            self.config.assets.fee_asset().id,
            total,
            MtgMemo::new(app_id, call).to_extra(),
        )
        .with_index_references(deposits);
        invoice.push_item(fee)?;

        tracing::debug!(
            fee_id = %quote.fee_id,
            %total,
            items = invoice.items().len(),
            "assembled invoice"
        );
        Ok(invoice)
    }

    /// Payment link for `invoice`.
    #[must_use]
    pub fn pay_url(&self, invoice: &Invoice) -> String {
        invoice_url(&self.config.pay_url, invoice)
    }
}

/// Fetches the descriptor and the user's record, then returns the payment
/// link for a single serialized transaction.
///
/// # Errors
///
/// Returns [`FlowError`] if a request fails, the user is not registered, the
/// quote has expired, or the invoice cannot be built.
pub async fn build_invoice(
    client: &ComputerClient,
    config: &ClientConfig,
    user_id: Uuid,
    transaction: &[u8],
    quote: &FeeQuote,
) -> Result<String, FlowError> {
    let info = client.computer_info().await?;
    let user = registered_user(client, user_id).await?;
    let assembler = InvoiceAssembler::new(&info, config, &user, user_id)?;
    let invoice = assembler.build(transaction, quote, true, UnixTimestamp::now())?;
    Ok(assembler.pay_url(&invoice))
}

/// Renders an invoice as JSON for display.
///
/// Memo extras are shown as text; other binary fields as hex.
#[must_use]
pub fn describe(invoice: &Invoice) -> Value {
    let items: Vec<Value> = invoice
        .items()
        .iter()
        .map(|item| {
            json!({
                "trace_id": item.trace_id,
                "asset_id": item.asset_id,
                "amount": item.amount,
                "extra": display_bytes(&item.extra),
                "references": item.references.iter().map(describe_reference).collect::<Vec<_>>(),
            })
        })
        .collect();
    let attachments: Vec<Value> = invoice
        .attachments()
        .iter()
        .map(|attachment| {
            json!({
                "trace_id": attachment.trace_id,
                "amount": attachment.amount,
                "size": attachment.data.len(),
                "data": hex::encode(&attachment.data),
            })
        })
        .collect();
    json!({
        "recipient": invoice.recipient().to_string(),
        "items": items,
        "attachments": attachments,
    })
}

fn describe_reference(reference: &Reference) -> Value {
    match reference {
        Reference::Index(index) => json!(index),
        Reference::Hash(hash) => json!(hex::encode(hash)),
    }
}

fn display_bytes(bytes: &[u8]) -> String {
    std::str::from_utf8(bytes).map_or_else(|_| hex::encode(bytes), str::to_owned)
}
