//! Purchases of catalog items and asset shares, plus admin overrides.

use std::sync::Arc;

use tracing::info;

use crate::application::cache::KeyLocks;
use crate::application::catalog::Catalog;
use crate::application::ledger::UserLedger;
use crate::application::series::StockTimeSeriesStore;
use crate::domain::trade::{affordable, units_to_buy};
use crate::domain::{
    AssetId, Goods, ItemId, PricePoint, Purchase, Quantity, User, UserId, ValidationError,
};
use crate::error::Result;
use crate::port::Storage;

/// Purchase path on top of the ledger and the price series.
///
/// Purchases by one buyer are serialized so the inventory capacity and
/// balance checks cannot be raced past.
pub struct Trader<S: Storage> {
    ledger: Arc<UserLedger<S>>,
    catalog: Arc<Catalog<S>>,
    series: Arc<StockTimeSeriesStore<S>>,
    buyers: KeyLocks<UserId>,
    inventory_capacity: i64,
}

impl<S: Storage> Trader<S> {
    pub fn new(
        ledger: Arc<UserLedger<S>>,
        catalog: Arc<Catalog<S>>,
        series: Arc<StockTimeSeriesStore<S>>,
        inventory_capacity: i64,
    ) -> Self {
        Self {
            ledger,
            catalog,
            series,
            buyers: KeyLocks::new(),
            inventory_capacity: inventory_capacity.max(0),
        }
    }

    pub fn inventory_capacity(&self) -> i64 {
        self.inventory_capacity
    }

    /// Buy up to `quantity` of `item_id`, limited by balance and free
    /// inventory space.
    pub async fn buy_item(
        &self,
        buyer: &UserId,
        item_id: &ItemId,
        quantity: Quantity,
    ) -> Result<Purchase> {
        let requested = quantity.requested()?;
        let item = self
            .catalog
            .item(item_id)
            .await?
            .ok_or_else(|| ValidationError::UnknownItem {
                item_id: item_id.clone(),
            })?;

        let _guard = self.buyers.lock(buyer).await;
        let free_space = self.inventory_capacity - self.ledger.item_count(buyer).await?;
        if free_space <= 0 {
            return Err(ValidationError::InventoryFull {
                capacity: self.inventory_capacity,
            }
            .into());
        }

        let balance = self.ledger.balance(buyer).await?;
        let units = units_to_buy(requested, affordable(balance, item.price), Some(free_space));
        if units == 0 {
            return Err(ValidationError::InsufficientFunds {
                balance,
                unit_price: item.price,
            }
            .into());
        }

        let goods = Goods::Items {
            item_id: item_id.clone(),
            quantity: units,
        };
        let total_cost = units.saturating_mul(item.price.max(0));
        self.ledger.settle(buyer, goods, item.price).await?;
        info!(buyer = %buyer, item = %item_id, units, total_cost, "Item purchased");
        Ok(Purchase {
            quantity: units,
            total_cost,
        })
    }

    /// Buy up to `quantity` shares of `asset_id` at its latest price.
    ///
    /// Assets priced at zero cannot be bought.
    pub async fn buy_shares(
        &self,
        buyer: &UserId,
        asset_id: &AssetId,
        quantity: Quantity,
    ) -> Result<Purchase> {
        if asset_id.owner() == *buyer {
            return Err(ValidationError::SelfTarget.into());
        }
        let requested = quantity.requested()?;
        let price = self
            .series
            .latest(asset_id)
            .await?
            .ok_or_else(|| ValidationError::UnknownAsset {
                asset_id: asset_id.clone(),
            })?
            .price;
        if price <= 0 {
            return Err(ValidationError::Unpriced {
                asset_id: asset_id.clone(),
            }
            .into());
        }

        let _guard = self.buyers.lock(buyer).await;
        let balance = self.ledger.balance(buyer).await?;
        let units = units_to_buy(requested, affordable(balance, price), None);
        if units == 0 {
            return Err(ValidationError::InsufficientFunds {
                balance,
                unit_price: price,
            }
            .into());
        }

        let goods = Goods::Shares {
            asset_id: asset_id.clone(),
            quantity: units,
        };
        let total_cost = units.saturating_mul(price);
        self.ledger.settle(buyer, goods, price).await?;
        info!(buyer = %buyer, asset = %asset_id, units, total_cost, "Shares purchased");
        Ok(Purchase {
            quantity: units,
            total_cost,
        })
    }

    /// Admin override of a user's balance.
    pub async fn set_balance(&self, user_id: &UserId, amount: i64) -> Result<User> {
        let user = self.ledger.set_balance(user_id, amount).await?;
        info!(user = %user_id, balance = user.balance, "Balance overridden");
        Ok(user)
    }

    /// Admin override of an asset's price.
    pub async fn set_price(&self, asset_id: &AssetId, amount: i64) -> Result<PricePoint> {
        let point = self.series.update_price(asset_id, amount).await?;
        info!(asset = %asset_id, price = point.price, "Price overridden");
        Ok(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryStore;
    use crate::domain::ItemPatch;
    use crate::error::Error;
    use crate::testkit::ManualClock;

    struct Fixture {
        trader: Trader<MemoryStore>,
        store: MemoryStore,
        ledger: Arc<UserLedger<MemoryStore>>,
        series: Arc<StockTimeSeriesStore<MemoryStore>>,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::default());
        let catalog = Arc::new(Catalog::new(store.clone(), clock.clone()));
        let ledger = Arc::new(UserLedger::new(store.clone(), catalog.clone(), clock.clone()));
        let series = Arc::new(StockTimeSeriesStore::new(
            store.clone(),
            ledger.clone(),
            5,
            clock,
        ));
        catalog
            .register_item(
                &ItemId::new("apple"),
                &ItemPatch {
                    price: Some(100),
                    ..ItemPatch::default()
                },
            )
            .await
            .unwrap();
        let trader = Trader::new(ledger.clone(), catalog, series.clone(), 5);
        Fixture {
            trader,
            store,
            ledger,
            series,
        }
    }

    fn validation(err: Error) -> ValidationError {
        match err {
            Error::Validation(v) => v,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn buy_all_is_capped_by_inventory() {
        let f = fixture().await;
        let (u, apple) = (UserId::new("u"), ItemId::new("apple"));
        f.ledger.add_balance(&u, 999).await.unwrap();

        let purchase = f.trader.buy_item(&u, &apple, Quantity::All).await.unwrap();
        assert_eq!(purchase, Purchase { quantity: 5, total_cost: 500 });
        assert_eq!(f.ledger.balance(&u).await.unwrap(), 499);

        let err = f.trader.buy_item(&u, &apple, Quantity::Exact(1)).await.unwrap_err();
        assert_eq!(validation(err), ValidationError::InventoryFull { capacity: 5 });
    }

    #[tokio::test]
    async fn buy_exact_is_capped_by_balance() {
        let f = fixture().await;
        let (u, apple) = (UserId::new("u"), ItemId::new("apple"));
        f.ledger.add_balance(&u, 250).await.unwrap();

        let purchase = f.trader.buy_item(&u, &apple, Quantity::Exact(4)).await.unwrap();
        assert_eq!(purchase.quantity, 2);
        assert_eq!(f.ledger.balance(&u).await.unwrap(), 50);

        let err = f.trader.buy_item(&u, &apple, Quantity::Exact(1)).await.unwrap_err();
        assert!(matches!(validation(err), ValidationError::InsufficientFunds { .. }));
    }

    #[tokio::test]
    async fn rejects_bad_item_requests() {
        let f = fixture().await;
        let u = UserId::new("u");

        let err = f
            .trader
            .buy_item(&u, &ItemId::new("apple"), Quantity::Exact(0))
            .await
            .unwrap_err();
        assert_eq!(validation(err), ValidationError::NonPositiveAmount { amount: 0 });

        let err = f
            .trader
            .buy_item(&u, &ItemId::new("pear"), Quantity::Exact(1))
            .await
            .unwrap_err();
        assert!(matches!(validation(err), ValidationError::UnknownItem { .. }));
    }

    #[tokio::test]
    async fn buy_shares_records_volume() {
        let f = fixture().await;
        let (buyer, asset) = (UserId::new("buyer"), AssetId::new("seller"));
        f.series.update_price(&asset, 30).await.unwrap();
        f.ledger.add_balance(&buyer, 100).await.unwrap();

        let purchase = f.trader.buy_shares(&buyer, &asset, Quantity::All).await.unwrap();
        assert_eq!(purchase, Purchase { quantity: 3, total_cost: 90 });
        assert_eq!(f.series.total_purchased(&asset).await.unwrap(), 3);
        assert_eq!(f.ledger.balance(&buyer).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn cannot_buy_own_shares_or_unknown_assets() {
        let f = fixture().await;
        let u = UserId::new("u");

        let err = f
            .trader
            .buy_shares(&u, &AssetId::from(&u), Quantity::Exact(1))
            .await
            .unwrap_err();
        assert_eq!(validation(err), ValidationError::SelfTarget);

        let err = f
            .trader
            .buy_shares(&u, &AssetId::new("ghost"), Quantity::Exact(1))
            .await
            .unwrap_err();
        assert!(matches!(validation(err), ValidationError::UnknownAsset { .. }));
    }

    #[tokio::test]
    async fn zero_priced_shares_cannot_be_bought() {
        let f = fixture().await;
        let (buyer, asset) = (UserId::new("buyer"), AssetId::new("seller"));
        f.series.update_price(&asset, -5).await.unwrap();

        let err = f.trader.buy_shares(&buyer, &asset, Quantity::All).await.unwrap_err();
        assert_eq!(
            validation(err),
            ValidationError::Unpriced {
                asset_id: asset.clone()
            }
        );
        assert_eq!(f.series.total_purchased(&asset).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_settlement_keeps_goods_and_balance() {
        let f = fixture().await;
        let (u, apple) = (UserId::new("u"), ItemId::new("apple"));
        f.ledger.add_balance(&u, 300).await.unwrap();
        f.store.fail_writes(true);

        assert!(f.trader.buy_item(&u, &apple, Quantity::Exact(2)).await.is_err());
        f.store.fail_writes(false);
        assert_eq!(f.ledger.item_count(&u).await.unwrap(), 0);
        assert_eq!(f.ledger.balance(&u).await.unwrap(), 300);
    }

    #[tokio::test]
    async fn admin_overrides_clamp() {
        let f = fixture().await;
        assert_eq!(f.trader.set_balance(&UserId::new("u"), -1).await.unwrap().balance, 0);
        assert_eq!(f.trader.set_price(&AssetId::new("a"), -1).await.unwrap().price, 0);
    }
}
