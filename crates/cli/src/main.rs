//! Command Line Interface for the basecore pool and vesting engines.
use anyhow::Result;
use basecore_domain::clock::{Clock, ManualClock, SystemClock};
use basecore_domain::config::EngineConfig;
use basecore_domain::error::EngineError;
use basecore_domain::events::{EngineEventType, EventLog};
use basecore_domain::ledger::{InMemoryLedger, Ledger};
use basecore_domain::math::constant_product::calculate_k;
use basecore_domain::token::{AccountId, AssetId, TokenAmount};
use basecore_domain::value_objects::Percentage;
use basecore_pool::engine::PoolEngine;
use basecore_pool::quote::quote_swap;
use basecore_vesting::engine::VestingEngine;
use basecore_vesting::schedule::{ScheduleRequest, vested_amount};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use prettytable::{Table, row};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::info;

const DAY: u64 = 86_400;

#[derive(Parser)]
#[command(name = "basecore")]
#[command(about = "Constant-product pool and vesting engine toolkit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quote a swap against given reserves
    Quote {
        /// Reserve of the input asset
        #[arg(long)]
        reserve_in: TokenAmount,

        /// Reserve of the output asset
        #[arg(long)]
        reserve_out: TokenAmount,

        /// Amount sold into the pool
        #[arg(long)]
        amount_in: TokenAmount,

        /// Pool fee in basis points
        #[arg(long, default_value_t = 30)]
        fee_bps: u32,

        /// Share of the fee kept by the protocol, in basis points
        #[arg(long, default_value_t = 0)]
        protocol_share_bps: u32,
    },
    /// Print vested amounts of a schedule over time
    VestingCurve {
        /// Total amount of the schedule
        #[arg(short, long, default_value = "1000")]
        total: TokenAmount,

        /// Cliff in days
        #[arg(long, default_value_t = 30)]
        cliff_days: u64,

        /// Full vesting duration in days
        #[arg(long, default_value_t = 365)]
        duration_days: u64,

        /// Days between rows
        #[arg(long, default_value_t = 30)]
        step_days: u64,
    },
    /// Run a seeded in-memory market with random swaps, deposits and releases
    Simulate {
        /// Number of simulated steps
        #[arg(short, long, default_value_t = 50)]
        swaps: u32,

        /// RNG seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Quote {
            reserve_in,
            reserve_out,
            amount_in,
            fee_bps,
            protocol_share_bps,
        } => {
            let quote = quote_swap(
                reserve_in,
                reserve_out,
                amount_in,
                fee_bps,
                protocol_share_bps,
            )?;

            println!("\n💱 Swap Quote");
            println!("════════════════════════════════════");
            println!("Amount In:        {}", quote.amount_in);
            println!("Amount Out:       {}", quote.amount_out);
            println!("Fee ({} bps):     {}", quote.fee_rate_bps, quote.fee.total);
            println!("  Protocol:       {}", quote.fee.protocol);
            println!("  Providers:      {}", quote.fee.liquidity_providers);
            println!("Spot Before:      {}", format_price(quote.spot_price_before));
            println!("Spot After:       {}", format_price(quote.spot_price_after));
            println!("Price Impact:     {}", quote.price_impact);
            println!("════════════════════════════════════");
        }
        Commands::VestingCurve {
            total,
            cliff_days,
            duration_days,
            step_days,
        } => {
            let cliff = days_to_seconds(cliff_days)?;
            let duration = days_to_seconds(duration_days)?;
            ScheduleRequest {
                beneficiary: AccountId::new("preview"),
                total_amount: total,
                cliff_duration: cliff,
                vesting_duration: duration,
                revocable: false,
            }
            .validate()?;

            println!(
                "📈 Vesting {} over {} days with a {}-day cliff",
                total, duration_days, cliff_days
            );
            let mut table = Table::new();
            table.add_row(row!["Day", "Vested", "Progress"]);
            let step = step_days.max(1);
            let mut day = 0;
            loop {
                let vested = vested_amount(total, 0, cliff, duration, days_to_seconds(day)?)?;
                let progress = Percentage::from_ratio(vested.0, total.0).unwrap_or_default();
                table.add_row(row![day, vested, progress]);
                if day >= duration_days {
                    break;
                }
                day = day.saturating_add(step).min(duration_days);
            }
            table.printstd();
        }
        Commands::Simulate { swaps, seed } => simulate(swaps, seed).await?,
    }

    Ok(())
}

/// One line of the simulation trace.
struct StepRow {
    action: String,
    amount_in: String,
    amount_out: String,
    outcome: String,
}

impl StepRow {
    fn new(action: String, amount_in: String, result: Result<String, EngineError>) -> Self {
        let (amount_out, outcome) = match result {
            Ok(out) => (out, "ok".to_string()),
            Err(e) => ("-".to_string(), e.to_string()),
        };
        Self {
            action,
            amount_in,
            amount_out,
            outcome,
        }
    }
}

fn days_to_seconds(days: u64) -> Result<u64> {
    days.checked_mul(DAY)
        .ok_or_else(|| anyhow::anyhow!("{days} days does not fit in a u64 of seconds"))
}

fn format_price(price: Option<rust_decimal::Decimal>) -> String {
    price.map_or_else(|| "n/a".to_string(), |p| p.round_dp(8).to_string())
}

async fn simulate(steps: u32, seed: u64) -> Result<()> {
    let config = EngineConfig::from_env()?;
    let mut rng = StdRng::seed_from_u64(seed);

    println!("🚀 Building in-memory market (seed {})...", seed);
    let ledger = Arc::new(InMemoryLedger::new());
    let clock = Arc::new(ManualClock::new(SystemClock.now()));
    let events = Arc::new(EventLog::new(config.event_log_capacity));
    let custody = config.custody_account.clone();
    let pool = PoolEngine::new(
        ledger.clone(),
        clock.clone(),
        config.pool.clone(),
        custody.clone(),
    )?
    .with_event_log(events.clone());
    let vesting = VestingEngine::new(
        ledger.clone(),
        clock.clone(),
        config.vesting.clone(),
        custody.clone(),
    )?
    .with_event_log(events.clone());

    let token_a = AssetId::new("TokenA");
    let token_b = AssetId::new("TokenB");
    let admin = config.pool.admin.clone();
    let providers: Vec<AccountId> = (0..3)
        .map(|i| AccountId::new(format!("lp-{i}")))
        .collect();
    let trader = AccountId::new("trader");
    let bankroll = TokenAmount::from(1_000_000_000u64);
    for account in providers.iter().chain(std::iter::once(&trader)) {
        for asset in [&token_a, &token_b] {
            ledger.mint(asset, account, bankroll).await;
            ledger.approve(asset, account, &custody, bankroll).await;
        }
    }

    pool.create_pool(&admin, &token_a, &token_b, 0).await?;
    pool.add_liquidity(
        &providers[0],
        &token_a,
        &token_b,
        TokenAmount::from(1_000_000u64),
        TokenAmount::from(2_000_000u64),
        TokenAmount::zero(),
        TokenAmount::zero(),
    )
    .await?;

    let vesting_asset = config.vesting.vesting_asset.clone();
    let grant = TokenAmount::from(100_000u64);
    let treasury = TokenAmount::from(300_000u64);
    ledger.mint(&vesting_asset, &config.vesting.admin, treasury).await;
    ledger
        .approve(&vesting_asset, &config.vesting.admin, &custody, treasury)
        .await;
    let cliff = days_to_seconds(10)?;
    let duration = days_to_seconds(u64::from(steps).max(10))?;
    let requests = providers
        .iter()
        .map(|lp| ScheduleRequest {
            beneficiary: lp.clone(),
            total_amount: grant,
            cliff_duration: cliff,
            vesting_duration: duration,
            revocable: true,
        })
        .collect();
    vesting
        .create_schedules_batch(&config.vesting.admin, requests)
        .await?;

    let mut table = Table::new();
    table.add_row(row![
        "Step", "Action", "In", "Out", "Reserve A", "Reserve B", "k", "Result"
    ]);
    let seeded = pool.get_pool_info(&token_a, &token_b).await?;
    let mut last_k = calculate_k(seeded.reserve_a, seeded.reserve_b);

    for step in 1..=steps {
        clock.advance(DAY);
        let roll = rng.random_range(0..10);
        let lp = &providers[rng.random_range(0..providers.len())];
        let row = if roll < 7 {
            let (asset_in, asset_out) = if rng.random_bool(0.5) {
                (&token_a, &token_b)
            } else {
                (&token_b, &token_a)
            };
            let size = TokenAmount::from(rng.random_range(1u64..50_000));
            let result = pool
                .swap(&trader, asset_in, asset_out, size, TokenAmount::zero())
                .await
                .map(|receipt| receipt.amount_out().to_string());
            StepRow::new(format!("swap {asset_in}"), size.to_string(), result)
        } else if roll < 9 {
            let size_a = TokenAmount::from(rng.random_range(1_000u64..100_000));
            let size_b = TokenAmount::from(rng.random_range(1_000u64..200_000));
            let result = pool
                .add_liquidity(
                    lp,
                    &token_a,
                    &token_b,
                    size_a,
                    size_b,
                    TokenAmount::zero(),
                    TokenAmount::zero(),
                )
                .await
                .map(|receipt| format!("{} shares", receipt.shares));
            StepRow::new(format!("add {lp}"), format!("{size_a}/{size_b}"), result)
        } else {
            let position = pool.get_liquidity_position(lp, &token_a, &token_b).await?;
            let shares = TokenAmount(position.shares.0 / 2);
            let result = pool
                .remove_liquidity(
                    lp,
                    &token_a,
                    &token_b,
                    shares,
                    TokenAmount::zero(),
                    TokenAmount::zero(),
                )
                .await
                .map(|receipt| format!("{}/{}", receipt.amount_a, receipt.amount_b));
            StepRow::new(format!("remove {lp}"), format!("{shares} shares"), result)
        };

        let info = pool.get_pool_info(&token_a, &token_b).await?;
        let k = calculate_k(info.reserve_a, info.reserve_b);
        let trend = match k.cmp(&last_k) {
            Ordering::Greater => "up",
            Ordering::Equal => "-",
            Ordering::Less => "down",
        };
        last_k = k;
        table.add_row(row![
            step,
            row.action,
            row.amount_in,
            row.amount_out,
            info.reserve_a,
            info.reserve_b,
            trend,
            row.outcome
        ]);

        if step % 7 == 0 {
            let report = vesting.release_batch(&providers).await?;
            info!(step, released = %report.total_released, "Weekly vesting release");
        }
    }
    table.printstd();

    let fees = pool.claim_fees(&admin, &token_a, &token_b).await;
    let info = pool.get_pool_info(&token_a, &token_b).await?;
    let stats = vesting.get_vesting_stats().await;

    println!("\n📊 Simulation Results");
    println!("════════════════════════════════════");
    println!("Reserves:         {} / {}", info.reserve_a, info.reserve_b);
    println!("Total Shares:     {}", info.total_shares);
    match fees {
        Ok((fee_a, fee_b)) => println!("Protocol Fees:    {} / {}", fee_a, fee_b),
        Err(e) => println!("Protocol Fees:    {}", e),
    }
    println!("Custody A:        {}", ledger.balance_of(&token_a, &custody).await);
    println!(
        "Vesting Released: {} of {}",
        stats.total_released, stats.total_committed
    );
    println!("Vesting Pending:  {}", stats.total_pending);
    println!(
        "Swaps Recorded:   {}",
        events.events_of_type(EngineEventType::Swapped).await.len()
    );
    println!("Events Recorded:  {}", events.len().await);
    println!("════════════════════════════════════");
    Ok(())
}
