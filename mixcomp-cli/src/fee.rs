//! Fee quotes.
//!
//! Every system call pays the operation price plus a chain fee quoted in
//! XIN. A quote is fetched fresh for each transaction and is only honoured
//! for a short window.

use mixcomp::amount::Amount;
use mixcomp::proto::FeeQuote;
use mixcomp_http::ComputerClient;

use crate::error::FlowError;

/// Quotes the XIN fee for moving `sol_amount`.
///
/// # Errors
///
/// Returns [`FlowError::Api`] if the request fails or the body is not a
/// quote.
pub async fn get_fee(client: &ComputerClient, sol_amount: Amount) -> Result<FeeQuote, FlowError> {
    let quote = client.fee(sol_amount).await?;
    tracing::debug!(fee_id = %quote.fee_id, xin = %quote.xin_amount, "fee quoted");
    Ok(quote)
}
