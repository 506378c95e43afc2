/// quick start - list, fund and repay a single loan
use nft_lending_rs::{
    AccountId, Amount, CollateralRef, FungibleAsset, InMemoryCollection, InMemoryToken,
    LendingProtocol, NonFungibleAsset, ProtocolConfig, Rate, SafeTimeProvider, TimeSource,
};
use chrono::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::System);
    let escrow = AccountId::new("escrow");
    let alice = AccountId::new("alice");
    let bob = AccountId::new("bob");
    let punk = CollateralRef::new("punks", 1);

    // alice owns the collateral, bob has the currency; both approve the escrow
    let mut usdc = InMemoryToken::new("USDC");
    usdc.mint(&alice, Amount::new(1_000))?;
    usdc.mint(&bob, Amount::new(1_000))?;
    usdc.approve(&alice, &escrow, Amount::new(1_000))?;
    usdc.approve(&bob, &escrow, Amount::new(1_000))?;

    let mut nfts = InMemoryCollection::new();
    nfts.mint(punk.clone(), &alice)?;
    nfts.approve(&alice, &escrow, &punk)?;

    let config = ProtocolConfig::default().with_escrow(escrow);
    let mut protocol = LendingProtocol::new(config, usdc, nfts, &time)?;

    // borrow 100 for 10 days at 20% of principal
    let id = protocol.create_loan(&alice, punk, Amount::new(100), Rate::from_percentage(20), Duration::days(10))?;
    protocol.fund_loan(&bob, id, Amount::new(100))?;
    let paid = protocol.repay_loan(&alice, id)?;

    println!("{} repaid {}", id, paid);
    println!("{}", protocol.loan_view(id)?.to_json_pretty()?);

    Ok(())
}
