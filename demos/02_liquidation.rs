/// liquidation - an unpaid loan past maturity hands its collateral to the liquidator
use nft_lending_rs::{
    AccountId, Amount, CollateralRef, FungibleAsset, InMemoryCollection, InMemoryToken,
    LendingError, LendingProtocol, NonFungibleAsset, ProtocolConfig, Rate, SafeTimeProvider,
    TimeSource,
};
use chrono::{Duration, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== liquidation ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

    let escrow = AccountId::new("escrow");
    let alice = AccountId::new("alice");
    let bob = AccountId::new("bob");
    let keeper = AccountId::new("keeper");
    let ape = CollateralRef::new("apes", 88);

    let mut usdc = InMemoryToken::new("USDC");
    usdc.mint(&bob, Amount::new(5_000))?;
    usdc.approve(&bob, &escrow, Amount::new(5_000))?;
    let mut nfts = InMemoryCollection::new();
    nfts.mint(ape.clone(), &alice)?;
    nfts.approve(&alice, &escrow, &ape)?;

    let config = ProtocolConfig::default().with_escrow(escrow);
    let mut protocol = LendingProtocol::new(config, usdc, nfts, &time)?;

    let id = protocol.create_loan(&alice, ape.clone(), Amount::new(5_000), Rate::from_percentage(10), Duration::days(14))?;
    protocol.fund_loan(&bob, id, Amount::new(5_000))?;
    println!("funded {} on {}", id, time.now().format("%Y-%m-%d"));

    // a day before maturity the keeper is turned away
    controller.advance(Duration::days(13));
    match protocol.liquidate_loan(&keeper, id) {
        Err(LendingError::TooEarly { eligible_at, .. }) => {
            println!("too early, eligible at {}", eligible_at.format("%Y-%m-%d %H:%M"));
        }
        other => println!("unexpected: {:?}", other),
    }

    // alice never repays
    controller.advance(Duration::days(2));
    println!("liquidatable on {}: {}", time.now().format("%Y-%m-%d"), protocol.is_liquidatable(id)?);
    protocol.liquidate_loan(&keeper, id)?;

    println!("status: {}", protocol.loan(id)?.status());
    println!("{} now owned by {}", ape, protocol.custody().collateral().owner_of(&ape)?);

    // the loan is closed for good
    if let Err(err) = protocol.repay_loan(&alice, id) {
        println!("late repayment rejected: {}", err);
    }

    for event in protocol.take_events() {
        println!("  {:?}", event);
    }

    Ok(())
}
