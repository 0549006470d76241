//! Price ticker and cleanup jobs over SQLite tenants.

mod support;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use merchant::adapter::outbound::sqlite::SqliteStore;
use merchant::application::schedule::{self, run_tick};
use merchant::application::{
    CleanupJob, PriceTicker, Schedule, ScheduledJob, TenantRegistry, TickReport,
};
use merchant::domain::{AssetId, CommandId, HistoryInterval, TenantId, UserId};
use merchant::port::Clock;
use merchant::testkit::{domain, ManualClock, ScriptedPricing};
use support::TempDb;
use tokio::sync::watch;

async fn registry(
    dbs: &[(&str, &TempDb)],
    clock: Arc<ManualClock>,
) -> Arc<TenantRegistry<SqliteStore>> {
    let registry = Arc::new(TenantRegistry::new());
    for (id, db) in dbs {
        registry.register(db.open_as(id, clock.clone()).await);
    }
    registry
}

#[tokio::test]
async fn ticker_updates_every_asset_of_every_tenant() {
    let clock = Arc::new(ManualClock::default());
    let (db_a, db_b) = (TempDb::create("tick-a"), TempDb::create("tick-b"));
    for (db, price) in [(&db_a, 10), (&db_b, 50)] {
        let tenant = db.tenant(clock.clone());
        tenant.series().update_price(&AssetId::new("acme"), price).await.unwrap();
        tenant.series().update_price(&AssetId::new("bolt"), price + 1).await.unwrap();
    }
    let registry = registry(&[("a", &db_a), ("b", &db_b)], clock.clone()).await;
    clock.advance(Duration::minutes(1));

    let ticker = PriceTicker::new(registry.clone(), Arc::new(ScriptedPricing::new().with_step(5)));
    let report = ticker.run_once().await;
    assert_eq!(report, TickReport { succeeded: 4, failed: 0 });

    let a = registry.get(&TenantId::new("a")).unwrap();
    let history = a
        .series()
        .history(&AssetId::new("acme"), HistoryInterval::Minute)
        .await
        .unwrap();
    assert_eq!(history.iter().map(|p| p.price).collect::<Vec<_>>(), vec![15, 10]);

    let b = registry.get(&TenantId::new("b")).unwrap();
    assert_eq!(
        b.series().latest(&AssetId::new("bolt")).await.unwrap().unwrap().price,
        56
    );
}

#[tokio::test]
async fn failing_asset_is_isolated() {
    let clock = Arc::new(ManualClock::default());
    let db = TempDb::create("tick-isolated");
    {
        let tenant = db.tenant(clock.clone());
        for asset in ["a", "b", "c"] {
            tenant.series().update_price(&AssetId::new(asset), 100).await.unwrap();
        }
    }
    let registry = registry(&[("t", &db)], clock.clone()).await;
    let ticker = Arc::new(PriceTicker::new(
        registry.clone(),
        Arc::new(ScriptedPricing::new().with_price("a", 1).failing_for("b").with_price("c", 3)),
    ));

    let report = run_tick(&ticker, Some(StdDuration::from_secs(5))).await;
    assert_eq!(report, Some(TickReport { succeeded: 2, failed: 1 }));

    let tenant = registry.get(&TenantId::new("t")).unwrap();
    let latest = |id: &'static str| {
        let tenant = tenant.clone();
        async move { tenant.series().latest(&AssetId::new(id)).await.unwrap().unwrap().price }
    };
    assert_eq!(latest("a").await, 1);
    assert_eq!(latest("b").await, 100);
    assert_eq!(latest("c").await, 3);
}

#[tokio::test]
async fn panicking_strategy_does_not_end_the_tick() {
    let clock = Arc::new(ManualClock::default());
    let (db_a, db_b) = (TempDb::create("panic-a"), TempDb::create("panic-b"));
    {
        let tenant = db_a.tenant(clock.clone());
        tenant.series().update_price(&AssetId::new("bolt"), 10).await.unwrap();
        clock.advance(Duration::seconds(1));
        tenant.series().update_price(&AssetId::new("acme"), 10).await.unwrap();
    }
    {
        let tenant = db_b.tenant(clock.clone());
        tenant.series().update_price(&AssetId::new("crank"), 40).await.unwrap();
    }
    let registry = registry(&[("a", &db_a), ("b", &db_b)], clock.clone()).await;
    let ticker = Arc::new(PriceTicker::new(
        registry.clone(),
        Arc::new(ScriptedPricing::new().with_step(1).panicking_for("acme")),
    ));

    let report = run_tick(&ticker, Some(StdDuration::from_secs(5))).await;
    assert_eq!(report, Some(TickReport { succeeded: 2, failed: 1 }));

    let a = registry.get(&TenantId::new("a")).unwrap();
    let latest = |id: &'static str| {
        let a = a.clone();
        async move { a.series().latest(&AssetId::new(id)).await.unwrap().unwrap().price }
    };
    assert_eq!(latest("acme").await, 10);
    assert_eq!(latest("bolt").await, 11);

    let b = registry.get(&TenantId::new("b")).unwrap();
    let crank = b.series().latest(&AssetId::new("crank")).await.unwrap().unwrap();
    assert_eq!(crank.price, 41);
}

#[tokio::test]
async fn spawned_ticker_runs_until_shutdown() {
    let clock = Arc::new(ManualClock::default());
    let db = TempDb::create("tick-spawned");
    {
        let tenant = db.tenant(clock.clone());
        tenant.series().update_price(&AssetId::new("acme"), 0).await.unwrap();
    }
    let registry = registry(&[("t", &db)], clock.clone()).await;
    let pricing = Arc::new(ScriptedPricing::new().with_step(1));
    let ticker = Arc::new(PriceTicker::new(registry.clone(), pricing.clone()));

    let (shutdown, receiver) = watch::channel(false);
    let handle = schedule::spawn(
        ticker,
        Schedule::every(StdDuration::from_millis(20)),
        clock.clone(),
        receiver,
    );
    tokio::time::sleep(StdDuration::from_millis(150)).await;
    shutdown.send(true).unwrap();
    handle.await.unwrap();

    let ticks = pricing.calls();
    assert!(ticks >= 2, "expected several ticks, got {ticks}");
    let tenant = registry.get(&TenantId::new("t")).unwrap();
    let price = tenant.series().latest(&AssetId::new("acme")).await.unwrap().unwrap().price;
    assert_eq!(price, ticks as i64);

    tokio::time::sleep(StdDuration::from_millis(60)).await;
    assert_eq!(pricing.calls(), ticks, "no ticks after shutdown");
}

#[tokio::test]
async fn cleanup_prunes_each_tenant() {
    let clock = Arc::new(ManualClock::default());
    let db = TempDb::create("cleanup");
    {
        let tenant = db.tenant(clock.clone());
        tenant
            .catalog()
            .register_command(&CommandId::new("work"), &domain::command(1_000))
            .await
            .unwrap();
        tenant
            .ledger()
            .create_cooldown(&UserId::new("u"), &CommandId::new("work"))
            .await
            .unwrap();
        tenant.series().update_price(&AssetId::new("acme"), 1).await.unwrap();
        clock.advance(Duration::days(200));
        tenant.series().update_price(&AssetId::new("acme"), 2).await.unwrap();
    }
    let registry = registry(&[("t", &db)], clock.clone()).await;

    let job = CleanupJob::new(registry.clone(), Duration::days(186), clock.clone());
    assert_eq!(job.run_once().await, TickReport { succeeded: 2, failed: 0 });

    let tenant = registry.get(&TenantId::new("t")).unwrap();
    let ledger = tenant.ledger();
    assert!(ledger
        .remaining_cooldown(&UserId::new("u"), &CommandId::new("work"))
        .await
        .unwrap()
        <= Duration::zero());
    assert_eq!(
        merchant::port::UserTable::cooldowns(tenant.storage()).await.unwrap().len(),
        0
    );

    let since = clock.now() - Duration::days(365);
    let rows = merchant::port::AssetTable::history(
        tenant.storage(),
        &AssetId::new("acme"),
        HistoryInterval::Minute,
        since,
    )
    .await
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].price, 2);
}
