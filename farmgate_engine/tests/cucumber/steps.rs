use std::time::Duration;

use cucumber::{given, then, when};
use farmgate_engine::{
    db_types::{SettlementSource, TransactionStatus},
    CommissionManagement,
    SettlementResult,
};
use fg_common::{Kobo, Provider, Rate, NAIRA_CURRENCY_CODE};
use futures_util::future::join_all;

use crate::cucumber::SettlementWorld;

fn percent(pct: u32) -> Rate {
    Rate::from_bps(pct * 100)
}

#[given(expr = "a farmer '{word}'")]
async fn add_farmer(world: &mut SettlementWorld, name: String) {
    let farmer = world.system_mut().market.add_farmer().await;
    world.farmers.insert(name, farmer);
}

#[given(expr = "a partner '{word}' earning {int}%")]
async fn add_partner(world: &mut SettlementWorld, name: String, pct: u32) {
    let partner = world.system_mut().market.add_partner(Some(percent(pct))).await;
    world.partners.insert(name, partner);
}

#[given(expr = "a partner '{word}' on the default rate")]
async fn add_default_partner(world: &mut SettlementWorld, name: String) {
    let partner = world.system_mut().market.add_partner(None).await;
    world.partners.insert(name, partner);
}

#[given(expr = "farmer '{word}' is managed by partner '{word}'")]
async fn assign_partner(world: &mut SettlementWorld, farmer: String, partner: String) {
    let (farmer, partner) = (world.farmer(&farmer), world.partner(&partner));
    world.system().market.assign_partner(farmer, partner).await;
}

#[given(expr = "farmer '{word}' was referred by partner '{word}' at {int}%")]
async fn add_referral(world: &mut SettlementWorld, farmer: String, partner: String, pct: u32) {
    let (farmer, partner) = (world.farmer(&farmer), world.partner(&partner));
    world.system().market.add_referral(partner, farmer, Some(percent(pct)), None).await;
}

#[given(expr = "a listing '{word}' by farmer '{word}' with {int} units at {int} kobo")]
async fn add_listing(world: &mut SettlementWorld, name: String, farmer: String, quantity: i64, price: i64) {
    let farmer = world.farmer(&farmer);
    let listing = world.system().market.add_listing(farmer, quantity, Kobo::from(price)).await;
    world.listings.insert(name, listing);
}

#[given(expr = "order '{word}' for {int} units of '{word}'")]
async fn place_order(world: &mut SettlementWorld, name: String, quantity: i64, listing: String) {
    let listing = world.listing(&listing);
    let order = world.system().market.place_order(&[(listing, quantity)]).await;
    world.orders.insert(name, order);
}

#[given(expr = "order '{word}' for {int} units of '{word}' and {int} units of '{word}'")]
async fn place_two_line_order(world: &mut SettlementWorld, name: String, q1: i64, l1: String, q2: i64, l2: String) {
    let lines = [(world.listing(&l1), q1), (world.listing(&l2), q2)];
    let order = world.system().market.place_order(&lines).await;
    world.orders.insert(name, order);
}

#[given(expr = "the provider reports order '{word}' as {word}")]
async fn script_provider(world: &mut SettlementWorld, order: String, status: String) {
    let order = world.order(&order);
    let gateway = &world.system().gateway;
    match status.as_str() {
        "paid" => gateway.paid(order.reference(), order.order.total),
        "failed" => gateway.failed(order.reference()),
        "pending" => gateway.pending(order.reference()),
        other => panic!("Unknown provider status {other}"),
    }
}

async fn settle(world: &mut SettlementWorld, order: &str, source: SettlementSource) {
    let reference = world.order(order).reference().to_string();
    let result = world.api().settle(&reference, Provider::Paystack, source).await;
    world.results = vec![result];
}

#[when(expr = "the webhook for order '{word}' arrives")]
async fn webhook(world: &mut SettlementWorld, order: String) {
    settle(world, &order, SettlementSource::Webhook).await;
}

#[when(expr = "the buyer polls for order '{word}'")]
async fn poll(world: &mut SettlementWorld, order: String) {
    settle(world, &order, SettlementSource::Poll).await;
}

#[when(expr = "the sweeper runs")]
async fn sweep(world: &mut SettlementWorld) {
    let result = world.api().sweep_pending(chrono::Duration::zero()).await.expect("Error sweeping payments");
    assert!(result.errors.is_empty(), "Sweep errors: {:?}", result.errors);
}

#[when(expr = "the webhook and {int} polls for order '{word}' arrive together")]
async fn race(world: &mut SettlementWorld, polls: usize, order: String) {
    let reference = world.order(&order).reference().to_string();
    let api = world.api();
    let sources = std::iter::once(SettlementSource::Webhook).chain(std::iter::repeat(SettlementSource::Poll).take(polls));
    let results = join_all(sources.map(|source| api.settle(&reference, Provider::Paystack, source))).await;
    world.results = results;
}

#[when(expr = "the buyer starts checkout for order '{word}'")]
async fn checkout(world: &mut SettlementWorld, order: String) {
    let order = world.order(&order).order.id;
    let email = world.system().market.buyer.email.clone();
    let init = world
        .api()
        .initialize_payment(order, Provider::Paystack, &email, NAIRA_CURRENCY_CODE, None)
        .await
        .expect("Error initializing payment");
    let settlement = init.settlement.expect("Payment was not settled at checkout");
    world.results = vec![Ok(settlement)];
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut SettlementWorld, ms: u64) {
    let delay = Duration::from_millis(ms);
    tokio::time::sleep(delay).await;
}

#[then(expr = "the settlement outcome is '{word}'")]
async fn check_outcome(world: &mut SettlementWorld, outcome: String) {
    let result = world.results.last().expect("Nothing has been settled");
    let actual = match result {
        Ok(r) => r.outcome().to_string(),
        Err(e) => panic!("Settlement failed: {e}"),
    };
    assert_eq!(actual, outcome, "Unexpected settlement outcome");
}

#[then(expr = "exactly {int} settlement(s) won")]
async fn check_winners(world: &mut SettlementWorld, count: usize) {
    let winners = world.results.iter().filter(|r| matches!(r, Ok(SettlementResult::Settled(_)))).count();
    let losers = world.results.iter().filter(|r| matches!(r, Ok(SettlementResult::AlreadySettled(_)))).count();
    assert_eq!(winners, count, "Unexpected number of winners");
    assert_eq!(winners + losers, world.results.len(), "Some settlements had other outcomes: {:?}", world.results);
}

#[then(expr = "the payment for order '{word}' is {word}")]
async fn check_payment_status(world: &mut SettlementWorld, order: String, status: String) {
    let expected = status.parse::<TransactionStatus>().expect("Not a transaction status");
    let tx = world.system().market.transaction(world.order(&order).reference()).await;
    assert_eq!(tx.status, expected);
}

#[then(expr = "order '{word}' is confirmed and paid")]
async fn check_order_paid(world: &mut SettlementWorld, order: String) {
    let order = world.system().market.order(world.order(&order).order.id).await;
    assert!(order.is_settled(), "Order is {}/{}", order.status, order.payment_status);
}

#[then(expr = "order '{word}' is still awaiting payment")]
async fn check_order_unpaid(world: &mut SettlementWorld, order: String) {
    let order = world.system().market.order(world.order(&order).order.id).await;
    assert!(!order.is_settled(), "Order is {}/{}", order.status, order.payment_status);
    assert!(order.payment_reference.is_none());
}

#[then(expr = "listing '{word}' has {int} units available")]
async fn check_stock(world: &mut SettlementWorld, listing: String, available: i64) {
    let listing = world.system().market.listing(world.listing(&listing).id).await;
    assert_eq!(listing.available_quantity, available);
}

#[then(expr = "listing '{word}' is {word}")]
async fn check_listing_status(world: &mut SettlementWorld, listing: String, status: String) {
    let listing = world.system().market.listing(world.listing(&listing).id).await;
    assert_eq!(listing.status.to_string(), status);
}

#[then(expr = "order '{word}' has {int} commission(s)")]
async fn check_commission_count(world: &mut SettlementWorld, order: String, count: usize) {
    let order_id = world.order(&order).order.id;
    let commissions = world.api().db().fetch_commissions_for_order(order_id).await.expect("Error fetching commissions");
    assert_eq!(commissions.len(), count);
    for c in commissions {
        assert_eq!(c.metadata.platform_fee + c.amount + c.metadata.farmer_net, c.order_amount);
    }
}

#[then(expr = "partner '{word}' has earned {int} kobo")]
async fn check_partner_total(world: &mut SettlementWorld, partner: String, total: i64) {
    let partner = world.system().market.partner(world.partner(&partner).id).await;
    assert_eq!(partner.total_commissions, Kobo::from(total));
}

#[then(expr = "the split is {int} kobo platform fee, {int} kobo commission and {int} kobo to the farmer")]
async fn check_split(world: &mut SettlementWorld, fee: i64, commission: i64, net: i64) {
    let Some(Ok(SettlementResult::Settled(report))) = world.results.last() else {
        panic!("The last settlement did not settle the payment");
    };
    let splits = report.items.iter().filter_map(|i| i.commission.as_ref().map(|c| *c.split())).collect::<Vec<_>>();
    assert!(!splits.is_empty(), "No fee splits were computed");
    let total = |f: fn(&farmgate_engine::FeeSplit) -> Kobo| splits.iter().map(f).sum::<Kobo>();
    assert_eq!(total(|s| s.platform_fee), Kobo::from(fee));
    assert_eq!(total(|s| s.partner_commission), Kobo::from(commission));
    assert_eq!(total(|s| s.farmer_net), Kobo::from(net));
}

#[then(expr = "{int} shortfall(s) is/are reported")]
async fn check_shortfalls(world: &mut SettlementWorld, count: usize) {
    let Some(Ok(SettlementResult::Settled(report))) = world.results.last() else {
        panic!("The last settlement did not settle the payment");
    };
    assert_eq!(report.shortfalls.len(), count);
}
