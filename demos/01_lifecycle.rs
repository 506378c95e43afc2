/// lifecycle - every transition a loan can take, with the events each one emits
use nft_lending_rs::{
    AccountId, Amount, CollateralRef, Event, FungibleAsset, InMemoryCollection, InMemoryToken,
    LendingProtocol, NonFungibleAsset, ProtocolConfig, Rate, SafeTimeProvider, TimeSource,
};
use chrono::{Duration, TimeZone, Utc};

fn print_events(events: Vec<Event>) {
    for event in events {
        println!("  event: {}", serde_json::to_string(&event).unwrap_or_default());
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== loan lifecycle ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

    let escrow = AccountId::new("escrow");
    let alice = AccountId::new("alice");
    let bob = AccountId::new("bob");
    let first = CollateralRef::new("punks", 1);
    let second = CollateralRef::new("punks", 2);

    let mut usdc = InMemoryToken::new("USDC");
    for holder in [&alice, &bob] {
        usdc.mint(holder, Amount::new(10_000))?;
        usdc.approve(holder, &escrow, Amount::new(10_000))?;
    }
    let mut nfts = InMemoryCollection::new();
    for token in [&first, &second] {
        nfts.mint(token.clone(), &alice)?;
        nfts.approve(&alice, &escrow, token)?;
    }

    let config = ProtocolConfig::conservative().with_escrow(escrow.clone());
    let mut protocol = LendingProtocol::new(config, usdc, nfts, &time)?;

    // 1. listing and cancelling
    println!("1. list then cancel");
    println!("-------------------");
    let cancelled = protocol.create_loan(&alice, first.clone(), Amount::new(500), Rate::from_percentage(5), Duration::days(7))?;
    println!("  listed {} against {}", cancelled, first);
    protocol.cancel_loan(&alice, cancelled)?;
    println!("  status: {}", protocol.loan(cancelled)?.status());
    print_events(protocol.take_events());

    // 2. funding
    println!("\n2. list and fund");
    println!("----------------");
    let id = protocol.create_loan(&alice, second, Amount::new(2_000), Rate::from_bps(1_250), Duration::days(30))?;
    let quote = protocol.fund_loan(&bob, id, Amount::new(2_000))?;
    println!("  interest due: {}", quote.interest);
    println!("  total due: {}", quote.total_due);
    if let Some(maturity) = protocol.maturity(id)? {
        println!("  maturity: {}", maturity.format("%Y-%m-%d"));
    }
    print_events(protocol.take_events());

    // 3. repayment halfway through the term
    println!("\n3. repay");
    println!("--------");
    controller.advance(Duration::days(15));
    println!("  date: {}", time.now().format("%Y-%m-%d"));
    let paid = protocol.repay_loan(&alice, id)?;
    println!("  paid: {}", paid);
    println!("  bob balance: {}", protocol.custody().fungible().balance_of(&bob));
    println!("  alice owns: {:?}", protocol.custody().collateral().tokens_of(&alice));
    print_events(protocol.take_events());

    // 4. audit trail
    println!("\n4. history of {}", id);
    println!("-----------------");
    for snapshot in protocol.history(id) {
        println!("  {} {} ({})", snapshot.timestamp.format("%Y-%m-%d"), snapshot.trigger, snapshot.snapshot_id);
    }

    println!("\n{}", protocol.view()?.to_json_pretty()?);

    Ok(())
}
