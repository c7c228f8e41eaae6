use common::CategoryId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Category, NewItem, NewUser, Price};
use fulfillment::{FulfillmentCoordinator, StaticCategories, StubPaymentClient, StubShipmentClient};
use store::{InMemoryStore, MarketStore, MarketTx};

fn categories() -> StaticCategories {
    StaticCategories::new([
        Category {
            id: CategoryId::new(1),
            parent_id: None,
            name: "furniture".to_string(),
        },
        Category {
            id: CategoryId::new(10),
            parent_id: Some(CategoryId::new(1)),
            name: "lighting".to_string(),
        },
    ])
}

fn bench_purchase(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("fulfillment/purchase", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryStore::new();
                let coordinator = FulfillmentCoordinator::new(
                    store.clone(),
                    StubPaymentClient::new(),
                    StubShipmentClient::new(),
                    categories(),
                    "11",
                );

                let mut tx = store.begin().await.unwrap();
                let seller = tx
                    .insert_user(NewUser {
                        account_name: "seller".to_string(),
                        address: "seller street 1".to_string(),
                    })
                    .await
                    .unwrap();
                let buyer = tx
                    .insert_user(NewUser {
                        account_name: "buyer".to_string(),
                        address: "buyer street 1".to_string(),
                    })
                    .await
                    .unwrap();
                let item = tx
                    .insert_item(NewItem {
                        seller_id: seller.id,
                        name: "lamp".to_string(),
                        price: Price::new(500).unwrap(),
                        description: "desk lamp".to_string(),
                        image_name: "lamp.jpg".to_string(),
                        category_id: CategoryId::new(10),
                    })
                    .await
                    .unwrap();
                tx.commit().await.unwrap();

                coordinator
                    .purchase(buyer.id, item.id, "TOK-1")
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_full_trade(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("fulfillment/full_trade", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryStore::new();
                let shipment = StubShipmentClient::new();
                let coordinator = FulfillmentCoordinator::new(
                    store.clone(),
                    StubPaymentClient::new(),
                    shipment.clone(),
                    categories(),
                    "11",
                );

                let mut tx = store.begin().await.unwrap();
                let seller = tx
                    .insert_user(NewUser {
                        account_name: "seller".to_string(),
                        address: "seller street 1".to_string(),
                    })
                    .await
                    .unwrap();
                let buyer = tx
                    .insert_user(NewUser {
                        account_name: "buyer".to_string(),
                        address: "buyer street 1".to_string(),
                    })
                    .await
                    .unwrap();
                let item = tx
                    .insert_item(NewItem {
                        seller_id: seller.id,
                        name: "lamp".to_string(),
                        price: Price::new(500).unwrap(),
                        description: "desk lamp".to_string(),
                        image_name: "lamp.jpg".to_string(),
                        category_id: CategoryId::new(10),
                    })
                    .await
                    .unwrap();
                tx.commit().await.unwrap();

                coordinator
                    .purchase(buyer.id, item.id, "TOK-1")
                    .await
                    .unwrap();
                coordinator.reserve_pickup(seller.id, item.id).await.unwrap();
                shipment.set_carrier_status(domain::ShippingStatus::Shipping);
                coordinator
                    .confirm_handoff(seller.id, item.id)
                    .await
                    .unwrap();
                shipment.set_carrier_status(domain::ShippingStatus::Done);
                coordinator
                    .confirm_delivery(buyer.id, item.id)
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_purchase, bench_full_trade);
criterion_main!(benches);
