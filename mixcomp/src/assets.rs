//! Assets a client deposits or pays fees with.
//!
//! An invocation invoice carries one deposit line item per deposit asset and
//! a single fee line item in the fee asset. The list is configurable; an
//! [`AssetRegistry`] only exists in a validated state.
//!
//! ```toml
//! [[assets]]
//! id = "64692c23-8971-4cf4-84a7-4dd1271dd887"
//! symbol = "SOL"
//! purpose = "deposit"
//! amount = "0.01"
//!
//! [[assets]]
//! id = "c94ac88f-4671-3976-b60a-09064f1811e8"
//! symbol = "XIN"
//! purpose = "fee"
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::amount::Amount;
use crate::error::AssetError;

/// Mixin asset id of SOL.
pub const SOL_ASSET_ID: Uuid = Uuid::from_u128(0x64692c23_8971_4cf4_84a7_4dd1271dd887);

/// Mixin asset id of USDC on Solana.
pub const USDC_ASSET_ID: Uuid = Uuid::from_u128(0xde6fa523_c596_398e_b12f_6d6980544b59);

/// Mixin asset id of XIN.
pub const XIN_ASSET_ID: Uuid = Uuid::from_u128(0xc94ac88f_4671_3976_b60a_09064f1811e8);

/// What an asset is used for in an invocation invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetPurpose {
    /// Deposited into the user's Computer account before the call.
    Deposit,
    /// Pays the operation price and chain fee.
    Fee,
}

/// A configured asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Mixin asset id.
    pub id: Uuid,
    /// Display symbol, used in logs only.
    pub symbol: String,
    /// Role in the invoice.
    pub purpose: AssetPurpose,
    /// Deposit amount. Required for deposit assets, ignored for the fee asset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
}

/// Validated, ordered asset list.
///
/// Holds exactly one fee asset, an amount for every deposit asset, and no
/// duplicate ids. Deposit order is the order of the line items.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<AssetInfo>")]
pub struct AssetRegistry {
    assets: Vec<AssetInfo>,
    fee_index: usize,
}

impl AssetRegistry {
    /// Validates `assets` into a registry.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError`] if the fee asset is missing or repeated, a
    /// deposit has no amount, or an id appears twice.
    pub fn new(assets: Vec<AssetInfo>) -> Result<Self, AssetError> {
        let mut seen = HashSet::with_capacity(assets.len());
        for asset in &assets {
            if !seen.insert(asset.id) {
                return Err(AssetError::Duplicate(asset.id));
            }
            if asset.purpose == AssetPurpose::Deposit && asset.amount.is_none() {
                return Err(AssetError::MissingAmount(asset.symbol.clone()));
            }
        }
        let fees: Vec<usize> = assets
            .iter()
            .enumerate()
            .filter(|(_, a)| a.purpose == AssetPurpose::Fee)
            .map(|(i, _)| i)
            .collect();
        match fees.as_slice() {
            [fee_index] => Ok(Self {
                fee_index: *fee_index,
                assets,
            }),
            other => Err(AssetError::FeeAssetCount(other.len())),
        }
    }

    /// Returns the deposit assets with their amounts, in order.
    pub fn deposits(&self) -> impl Iterator<Item = (&AssetInfo, Amount)> {
        self.assets
            .iter()
            .filter(|a| a.purpose == AssetPurpose::Deposit)
            .filter_map(|a| a.amount.map(|amount| (a, amount)))
    }

    /// Returns the fee asset.
    #[must_use]
    pub fn fee_asset(&self) -> &AssetInfo {
        &self.assets[self.fee_index]
    }

    /// Looks up an asset by id.
    #[must_use]
    pub fn get(&self, id: &Uuid) -> Option<&AssetInfo> {
        self.assets.iter().find(|a| &a.id == id)
    }

    /// Returns all assets in order.
    #[must_use]
    pub fn as_slice(&self) -> &[AssetInfo] {
        &self.assets
    }
}

impl TryFrom<Vec<AssetInfo>> for AssetRegistry {
    type Error = AssetError;

    fn try_from(assets: Vec<AssetInfo>) -> Result<Self, Self::Error> {
        Self::new(assets)
    }
}

impl Default for AssetRegistry {
    /// SOL and USDC deposits of 0.01 each, XIN fees.
    fn default() -> Self {
        let deposit = Some(Amount::from_scaled(1, 2));
        Self {
            assets: vec![
                AssetInfo {
                    id: SOL_ASSET_ID,
                    symbol: "SOL".to_owned(),
                    purpose: AssetPurpose::Deposit,
                    amount: deposit,
                },
                AssetInfo {
                    id: USDC_ASSET_ID,
                    symbol: "USDC".to_owned(),
                    purpose: AssetPurpose::Deposit,
                    amount: deposit,
                },
                AssetInfo {
                    id: XIN_ASSET_ID,
                    symbol: "XIN".to_owned(),
                    purpose: AssetPurpose::Fee,
                    amount: None,
                },
            ],
            fee_index: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deposit(id: Uuid, symbol: &str, amount: Option<&str>) -> AssetInfo {
        AssetInfo {
            id,
            symbol: symbol.to_owned(),
            purpose: AssetPurpose::Deposit,
            amount: amount.map(|a| a.parse().unwrap()),
        }
    }

    fn fee(id: Uuid) -> AssetInfo {
        AssetInfo {
            id,
            symbol: "XIN".to_owned(),
            purpose: AssetPurpose::Fee,
            amount: None,
        }
    }

    #[test]
    fn test_default_registry() {
        let registry = AssetRegistry::default();
        let deposits: Vec<_> = registry.deposits().map(|(a, amt)| (a.id, amt.to_string())).collect();
        assert_eq!(
            deposits,
            vec![
                (SOL_ASSET_ID, "0.01".to_owned()),
                (USDC_ASSET_ID, "0.01".to_owned())
            ]
        );
        assert_eq!(registry.fee_asset().id, XIN_ASSET_ID);
        assert_eq!(AssetRegistry::new(registry.as_slice().to_vec()), Ok(registry));
    }

    #[test]
    fn test_requires_single_fee_asset() {
        let none = vec![deposit(SOL_ASSET_ID, "SOL", Some("1"))];
        assert_eq!(AssetRegistry::new(none), Err(AssetError::FeeAssetCount(0)));

        let two = vec![fee(XIN_ASSET_ID), fee(SOL_ASSET_ID)];
        assert_eq!(AssetRegistry::new(two), Err(AssetError::FeeAssetCount(2)));
    }

    #[test]
    fn test_deposit_needs_amount() {
        let assets = vec![deposit(SOL_ASSET_ID, "SOL", None), fee(XIN_ASSET_ID)];
        assert_eq!(
            AssetRegistry::new(assets),
            Err(AssetError::MissingAmount("SOL".to_owned()))
        );
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let assets = vec![
            deposit(SOL_ASSET_ID, "SOL", Some("1")),
            deposit(SOL_ASSET_ID, "SOL2", Some("2")),
            fee(XIN_ASSET_ID),
        ];
        assert_eq!(
            AssetRegistry::new(assets),
            Err(AssetError::Duplicate(SOL_ASSET_ID))
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let json = r#"[{"id":"c94ac88f-4671-3976-b60a-09064f1811e8","symbol":"XIN","purpose":"fee"}]"#;
        let registry: AssetRegistry = serde_json::from_str(json).unwrap();
        assert_eq!(registry.deposits().count(), 0);
        assert_eq!(registry.get(&XIN_ASSET_ID).map(|a| a.purpose), Some(AssetPurpose::Fee));

        let bad = r#"[{"id":"64692c23-8971-4cf4-84a7-4dd1271dd887","symbol":"SOL","purpose":"deposit"}]"#;
        assert!(serde_json::from_str::<AssetRegistry>(bad).is_err());
    }
}
