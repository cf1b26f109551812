//! Payment deep links opened by the Mixin Messenger.

use crate::address::MixAddress;
use crate::amount::Amount;
use crate::extra::MtgMemo;
use crate::invoice::Invoice;

/// Default base of payment links.
pub const DEFAULT_PAY_URL: &str = "https://mixin.one/pay";

/// Link paying `amount` of the operation asset to `recipient` with `memo`.
///
/// Used for registration, which is a single plain transfer.
#[must_use]
pub fn transfer_url(pay_base: &str, recipient: &MixAddress, amount: Amount, memo: &MtgMemo) -> String {
    format!(
        "{}/{recipient}?amount={amount}&memo={memo}",
        pay_base.trim_end_matches('/')
    )
}

/// Link paying every line item and attachment of `invoice` at once.
#[must_use]
pub fn invoice_url(pay_base: &str, invoice: &Invoice) -> String {
    format!("{}/{invoice}", pay_base.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::extra::OperationPayload;

    #[test]
    fn test_transfer_url_layout() {
        let user = Uuid::parse_str("c3f8b0d2-1e4a-4f5b-9c6d-7e8f9a0b1c2d").unwrap();
        let recipient = MixAddress::single_user(user);
        let memo = MtgMemo::new(Uuid::nil(), OperationPayload::user_deposit(1));
        let url = transfer_url(
            "https://mixin.one/pay/",
            &recipient,
            "0.001".parse().unwrap(),
            &memo,
        );
        assert_eq!(
            url,
            format!("https://mixin.one/pay/{recipient}?amount=0.001&memo={}", memo.to_hex())
        );
    }

    #[test]
    fn test_invoice_url_layout() {
        let user = Uuid::parse_str("c3f8b0d2-1e4a-4f5b-9c6d-7e8f9a0b1c2d").unwrap();
        let invoice = Invoice::new(MixAddress::single_user(user));
        let url = invoice_url(DEFAULT_PAY_URL, &invoice);
        assert!(url.starts_with("https://mixin.one/pay/MIN"));
    }
}
