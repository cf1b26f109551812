//! Mixin invoices.
//!
//! An [`Invoice`] bundles several payments to one recipient so that a user
//! settles all of them with a single confirmation. Each [`LineItem`] is one
//! payment; a line item may declare that it depends on earlier items by
//! index, or on already settled transactions by hash. Opaque data that the
//! recipient needs (a serialized Solana transaction, for instance) rides
//! along as a [`StorageAttachment`], paid for in XIN and kept outside the
//! line-item list.
//!
//! # Wire format
//!
//! All integers are big-endian.
//!
//! ```text
//! version u8
//! recipient_len u16 ‖ recipient (MixAddress binary)
//! item_count u8
//!   trace(16) ‖ asset(16) ‖ amount_len u8 ‖ amount ‖ extra_len u16 ‖ extra
//!   ‖ ref_count u8 ‖ { 0x01 ‖ index u8 | 0x00 ‖ hash(32) }*
//! attachment_count u8
//!   trace(16) ‖ amount_len u8 ‖ amount ‖ data_len u32 ‖ data
//! ```
//!
//! The string form is `"MIN"` followed by the unpadded URL-safe base64 of
//! `payload ‖ sha3_256("MIN" ‖ payload)[0..4]`.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

use crate::address::MixAddress;
use crate::amount::Amount;
use crate::encoding::RawUrlBase64;
use crate::error::InvoiceError;
use crate::sha3_256;

/// Prefix of an invoice string.
pub const INVOICE_PREFIX: &str = "MIN";

/// Current invoice format version.
pub const INVOICE_VERSION: u8 = 0;

/// Maximum number of line items.
pub const MAX_ITEMS: usize = 128;

/// Maximum number of storage attachments.
pub const MAX_ATTACHMENTS: usize = 16;

/// Maximum number of references per line item.
pub const MAX_REFERENCES: usize = 16;

/// Maximum length of an amount's text.
pub const MAX_AMOUNT_LEN: usize = 128;

/// Maximum length of a line item's `extra`.
pub const MAX_EXTRA_LEN: usize = u16::MAX as usize;

/// Maximum size of one storage attachment.
pub const STORAGE_CAPACITY: usize = 4 * 1024 * 1024;

const CHECKSUM_LEN: usize = 4;
const REFERENCE_HASH: u8 = 0;
const REFERENCE_INDEX: u8 = 1;

/// A dependency of a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    /// An earlier item of the same invoice.
    Index(u8),
    /// A settled transaction.
    Hash([u8; 32]),
}

/// A payment inside an invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    /// Unique id of the resulting transaction.
    pub trace_id: Uuid,
    /// Asset to pay.
    pub asset_id: Uuid,
    /// Amount to pay.
    pub amount: Amount,
    /// Memo carried by the payment.
    pub extra: Vec<u8>,
    /// Dependencies, in wire order.
    pub references: Vec<Reference>,
}

impl LineItem {
    /// Creates a line item with a fresh trace id and no references.
    #[must_use]
    pub fn new(asset_id: Uuid, amount: Amount, extra: Vec<u8>) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            asset_id,
            amount,
            extra,
            references: Vec::new(),
        }
    }

    /// Sets the trace id.
    #[must_use]
    pub const fn with_trace_id(mut self, trace_id: Uuid) -> Self {
        self.trace_id = trace_id;
        self
    }

    /// Appends references in the given order.
    #[must_use]
    pub fn with_references(mut self, references: impl IntoIterator<Item = Reference>) -> Self {
        self.references.extend(references);
        self
    }

    /// Appends index references.
    #[must_use]
    pub fn with_index_references(self, references: Vec<u8>) -> Self {
        self.with_references(references.into_iter().map(Reference::Index))
    }

    /// Appends hash references.
    #[must_use]
    pub fn with_hash_references(self, references: Vec<[u8; 32]>) -> Self {
        self.with_references(references.into_iter().map(Reference::Hash))
    }

    /// Returns the index references in order.
    #[must_use]
    pub fn index_references(&self) -> Vec<u8> {
        self.references
            .iter()
            .filter_map(|r| match r {
                Reference::Index(index) => Some(*index),
                Reference::Hash(_) => None,
            })
            .collect()
    }

    /// Returns the hash references in order.
    #[must_use]
    pub fn hash_references(&self) -> Vec<[u8; 32]> {
        self.references
            .iter()
            .filter_map(|r| match r {
                Reference::Hash(hash) => Some(*hash),
                Reference::Index(_) => None,
            })
            .collect()
    }
}

/// Opaque data delivered with an invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageAttachment {
    /// Unique id of the storage payment.
    pub trace_id: Uuid,
    /// XIN paid for storing `data`.
    pub amount: Amount,
    /// The stored bytes.
    pub data: Vec<u8>,
}

/// A set of payments to one recipient, plus storage attachments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    recipient: MixAddress,
    items: Vec<LineItem>,
    attachments: Vec<StorageAttachment>,
}

impl Invoice {
    /// Creates an empty invoice.
    #[must_use]
    pub const fn new(recipient: MixAddress) -> Self {
        Self {
            recipient,
            items: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Returns the recipient.
    #[must_use]
    pub const fn recipient(&self) -> &MixAddress {
        &self.recipient
    }

    /// Returns the line items in order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Returns the storage attachments in order.
    #[must_use]
    pub fn attachments(&self) -> &[StorageAttachment] {
        &self.attachments
    }

    /// Appends a line item and returns its index.
    ///
    /// # Errors
    ///
    /// Returns [`InvoiceError`] if the invoice is full, the trace id is
    /// already used, a field is too long, or an index reference does not
    /// point at an earlier item.
    pub fn push_item(&mut self, item: LineItem) -> Result<u8, InvoiceError> {
        let index = self.items.len();
        if index >= MAX_ITEMS {
            return Err(InvoiceError::TooManyItems);
        }
        self.check_trace(item.trace_id)?;
        check_amount(&item.amount)?;
        if item.extra.len() > MAX_EXTRA_LEN {
            return Err(InvoiceError::ExtraTooLarge(item.extra.len()));
        }
        if item.references.len() > MAX_REFERENCES {
            return Err(InvoiceError::TooManyReferences(item.references.len()));
        }
        if let Some(reference) = item
            .index_references()
            .into_iter()
            .find(|r| usize::from(*r) >= index)
        {
            return Err(InvoiceError::ForwardReference {
                item: index,
                reference,
            });
        }
        self.items.push(item);
        #[allow(clippy::cast_possible_truncation)]
        Ok(index as u8)
    }

    /// Attaches `data` under `trace_id`, priced with [`Amount::storage_cost`].
    ///
    /// # Errors
    ///
    /// Returns [`InvoiceError`] if the data exceeds [`STORAGE_CAPACITY`], the
    /// trace id is already used, or the invoice is full.
    pub fn attach_storage(&mut self, trace_id: Uuid, data: Vec<u8>) -> Result<(), InvoiceError> {
        let amount = Amount::storage_cost(data.len());
        #[cfg(feature = "telemetry")]
        tracing::debug!(%trace_id, len = data.len(), %amount, "attached storage");
        self.push_attachment(StorageAttachment {
            trace_id,
            amount,
            data,
        })
    }

    fn push_attachment(&mut self, attachment: StorageAttachment) -> Result<(), InvoiceError> {
        if self.attachments.len() >= MAX_ATTACHMENTS {
            return Err(InvoiceError::TooManyAttachments);
        }
        if attachment.data.len() > STORAGE_CAPACITY {
            return Err(InvoiceError::StorageTooLarge(attachment.data.len()));
        }
        check_amount(&attachment.amount)?;
        self.check_trace(attachment.trace_id)?;
        self.attachments.push(attachment);
        Ok(())
    }

    fn check_trace(&self, trace_id: Uuid) -> Result<(), InvoiceError> {
        let taken = self.items.iter().any(|i| i.trace_id == trace_id)
            || self.attachments.iter().any(|a| a.trace_id == trace_id);
        if taken {
            return Err(InvoiceError::DuplicateTrace(trace_id));
        }
        Ok(())
    }

    /// Encodes the binary payload (without prefix or checksum).
    ///
    /// Lengths are bounded by the checks in [`Invoice::push_item`] and
    /// [`Invoice::attach_storage`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(INVOICE_VERSION);
        let recipient = self.recipient.to_bytes();
        out.extend_from_slice(&(recipient.len() as u16).to_be_bytes());
        out.extend_from_slice(&recipient);

        out.push(self.items.len() as u8);
        for item in &self.items {
            out.extend_from_slice(item.trace_id.as_bytes());
            out.extend_from_slice(item.asset_id.as_bytes());
            write_amount(&mut out, &item.amount);
            out.extend_from_slice(&(item.extra.len() as u16).to_be_bytes());
            out.extend_from_slice(&item.extra);
            out.push(item.references.len() as u8);
            for reference in &item.references {
                match reference {
                    Reference::Index(index) => {
                        out.push(REFERENCE_INDEX);
                        out.push(*index);
                    }
                    Reference::Hash(hash) => {
                        out.push(REFERENCE_HASH);
                        out.extend_from_slice(hash);
                    }
                }
            }
        }

        out.push(self.attachments.len() as u8);
        for attachment in &self.attachments {
            out.extend_from_slice(attachment.trace_id.as_bytes());
            write_amount(&mut out, &attachment.amount);
            out.extend_from_slice(&(attachment.data.len() as u32).to_be_bytes());
            out.extend_from_slice(&attachment.data);
        }
        out
    }

    /// Decodes a binary payload produced by [`Invoice::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`InvoiceError`] if the payload is truncated or violates any
    /// invoice rule.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InvoiceError> {
        let mut r = Reader::new(bytes);
        let version = r.u8("version")?;
        if version != INVOICE_VERSION {
            return Err(InvoiceError::UnsupportedVersion(version));
        }
        let recipient_len = usize::from(r.u16("recipient length")?);
        let recipient = MixAddress::from_bytes(r.take(recipient_len, "recipient")?)?;
        let mut invoice = Self::new(recipient);

        let item_count = r.u8("item count")?;
        for _ in 0..item_count {
            let trace_id = r.uuid("trace id")?;
            let asset_id = r.uuid("asset id")?;
            let amount = r.amount()?;
            let extra_len = usize::from(r.u16("extra length")?);
            let extra = r.take(extra_len, "extra")?.to_vec();
            let ref_count = r.u8("reference count")?;
            let mut references = Vec::with_capacity(usize::from(ref_count));
            for _ in 0..ref_count {
                let reference = match r.u8("reference tag")? {
                    REFERENCE_INDEX => Reference::Index(r.u8("index reference")?),
                    REFERENCE_HASH => {
                        let mut hash = [0u8; 32];
                        hash.copy_from_slice(r.take(32, "hash reference")?);
                        Reference::Hash(hash)
                    }
                    tag => return Err(InvoiceError::InvalidReferenceTag(tag)),
                };
                references.push(reference);
            }
            invoice.push_item(LineItem {
                trace_id,
                asset_id,
                amount,
                extra,
                references,
            })?;
        }

        let attachment_count = r.u8("attachment count")?;
        for _ in 0..attachment_count {
            let trace_id = r.uuid("storage trace id")?;
            let amount = r.amount()?;
            let data_len = r.u32("storage length")? as usize;
            if data_len > STORAGE_CAPACITY {
                return Err(InvoiceError::StorageTooLarge(data_len));
            }
            let data = r.take(data_len, "storage data")?.to_vec();
            invoice.push_attachment(StorageAttachment {
                trace_id,
                amount,
                data,
            })?;
        }

        if r.remaining() != 0 {
            return Err(InvoiceError::TrailingBytes(r.remaining()));
        }
        Ok(invoice)
    }
}

impl Display for Invoice {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut data = self.to_bytes();
        let checksum = sha3_256(&[INVOICE_PREFIX.as_bytes(), &data]);
        data.extend_from_slice(&checksum[..CHECKSUM_LEN]);
        write!(f, "{INVOICE_PREFIX}{}", RawUrlBase64::encode(data))
    }
}

impl FromStr for Invoice {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix(INVOICE_PREFIX)
            .ok_or(InvoiceError::InvalidPrefix)?;
        let data = RawUrlBase64::from(body)
            .decode()
            .map_err(|e| InvoiceError::InvalidEncoding(e.to_string()))?;
        if data.len() <= CHECKSUM_LEN {
            return Err(InvoiceError::Truncated("checksum"));
        }
        let (payload, checksum) = data.split_at(data.len() - CHECKSUM_LEN);
        let expected = sha3_256(&[INVOICE_PREFIX.as_bytes(), payload]);
        if checksum != &expected[..CHECKSUM_LEN] {
            return Err(InvoiceError::InvalidChecksum);
        }
        Self::from_bytes(payload)
    }
}

fn check_amount(amount: &Amount) -> Result<(), InvoiceError> {
    let text = amount.to_string();
    if text.len() > MAX_AMOUNT_LEN {
        return Err(InvoiceError::AmountTooLong(text));
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn write_amount(out: &mut Vec<u8>, amount: &Amount) {
    let text = amount.to_string();
    out.push(text.len() as u8);
    out.extend_from_slice(text.as_bytes());
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    const fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    const fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], InvoiceError> {
        if self.buf.len() < n {
            return Err(InvoiceError::Truncated(field));
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, InvoiceError> {
        Ok(self.take(1, field)?[0])
    }

    fn u16(&mut self, field: &'static str) -> Result<u16, InvoiceError> {
        let b = self.take(2, field)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self, field: &'static str) -> Result<u32, InvoiceError> {
        let b = self.take(4, field)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn uuid(&mut self, field: &'static str) -> Result<Uuid, InvoiceError> {
        let b = self.take(16, field)?;
        Uuid::from_slice(b).map_err(|_| InvoiceError::Truncated(field))
    }

    fn amount(&mut self) -> Result<Amount, InvoiceError> {
        let len = usize::from(self.u8("amount length")?);
        let text = self.take(len, "amount")?;
        let text = std::str::from_utf8(text)
            .map_err(|e| InvoiceError::InvalidEncoding(e.to_string()))?;
        Ok(text.parse()?)
    }
}
