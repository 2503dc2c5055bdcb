//! custody-ledger CLI: administer, deposit, withdraw, query, reconcile.

use clap::{Parser, Subcommand};
use custody_ledger::clock::parse_instant;
use custody_ledger::statement::{verify_statement_hash, StatementReport};
use custody_ledger::{
    normalize_account, AccountId, Amount, AssetId, Clock, CustodyStatement, DeploymentRecord,
    InMemoryCustody, Ledger, LedgerStore, ManualClock, SystemClock,
};
use custody_ledger_report::render_report;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();
    let cli = Cli::parse();
    let clock = clock_for(cli.at.as_deref())?;
    match cli.command {
        Command::Init(args) => run_init(&cli.db, clock, args),
        Command::AddAsset(args) => mutate(&cli.db, clock, |l| {
            l.add_supported_asset(&normalize_account(&args.caller), &args.asset)?;
            println!("supported\t{}", args.asset);
            Ok(())
        }),
        Command::RemoveAsset(args) => mutate(&cli.db, clock, |l| {
            l.remove_supported_asset(&normalize_account(&args.caller), &args.asset)?;
            println!("unsupported\t{}", args.asset);
            Ok(())
        }),
        Command::TransferOwnership(args) => mutate(&cli.db, clock, |l| {
            let new_owner = normalize_account(&args.new_owner);
            l.transfer_ownership(&normalize_account(&args.caller), new_owner.clone())?;
            println!("owner\t{}", new_owner);
            Ok(())
        }),
        Command::Mint(args) => mutate(&cli.db, clock, |l| {
            let account = normalize_account(&args.account);
            l.custody_mut().mint(&args.asset, &account, args.amount);
            println!(
                "wallet\t{}\t{}",
                account,
                l.custody().wallet_balance(&args.asset, &account)
            );
            Ok(())
        }),
        Command::Approve(args) => mutate(&cli.db, clock, |l| {
            let account = normalize_account(&args.account);
            l.custody_mut().approve(&args.asset, &account, args.amount);
            println!("allowance\t{}\t{}", account, args.amount);
            Ok(())
        }),
        Command::FundReserve(args) => mutate(&cli.db, clock, |l| {
            l.custody_mut().fund_reserve(&args.asset, args.amount);
            println!("held\t{}\t{}", args.asset, l.custody_balance(&args.asset));
            Ok(())
        }),
        Command::Deposit(args) => mutate(&cli.db, clock, |l| {
            let account = normalize_account(&args.account);
            let receipt = if args.asset.is_native() {
                l.deposit_native(&account, args.amount)?
            } else {
                l.deposit_token(&args.asset, &account, args.amount)?
            };
            println!("{}", serde_json::to_string_pretty(&receipt)?);
            Ok(())
        }),
        Command::Withdraw(args) => mutate(&cli.db, clock, |l| {
            let account = normalize_account(&args.account);
            let receipt = if args.asset.is_native() {
                l.withdraw(&account, args.amount)?
            } else {
                l.withdraw_token(&args.asset, &account, args.amount)?
            };
            println!("{}", serde_json::to_string_pretty(&receipt)?);
            Ok(())
        }),
        Command::Balance(args) => {
            let ledger = load(&cli.db, clock)?;
            let account = normalize_account(&args.account);
            println!("{}", ledger.get_balance(&args.asset, &account)?);
            Ok(())
        }
        Command::Custody(args) => run_custody(&cli.db, clock, args),
        Command::Statement(args) => run_statement(&cli.db, clock, args),
        Command::Verify(args) => run_verify(args),
    }
}

#[derive(Parser)]
#[command(name = "custody-ledger")]
#[command(about = "Multi-asset custodial ledger with simple interest")]
struct Cli {
    /// Ledger database.
    #[arg(long, global = true, default_value = "./data/ledger.sqlite")]
    db: PathBuf,
    /// Evaluate at this instant (Unix seconds or RFC3339) instead of now.
    #[arg(long, global = true)]
    at: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a ledger from an owner address or a deployment record.
    Init(InitArgs),
    /// Admit a token for deposits (owner only).
    AddAsset(RegistryArgs),
    /// Stop accepting deposits of a token (owner only).
    RemoveAsset(RegistryArgs),
    /// Hand the administrative role to another address (owner only).
    TransferOwnership(OwnershipArgs),
    /// Credit an external wallet (simulated custodian).
    Mint(WalletArgs),
    /// Set the allowance an account grants the custodian on a token.
    Approve(WalletArgs),
    /// Add an interest reserve straight to custody.
    FundReserve(ReserveArgs),
    /// Deposit native currency or a supported token.
    Deposit(MoveArgs),
    /// Withdraw from the account's own position.
    Withdraw(MoveArgs),
    /// Print an account's effective balance.
    Balance(BalanceArgs),
    /// Print custody holdings.
    Custody(CustodyArgs),
    /// Write a reconciliation statement (JSON, SHA-256, HTML).
    Statement(StatementArgs),
    /// Verify a statement's reproducibility hash.
    Verify(VerifyArgs),
}

#[derive(Parser)]
struct InitArgs {
    #[arg(long, conflicts_with = "deployment")]
    owner: Option<String>,
    /// Deployment record; defaults to the env/well-known locations when no owner is given.
    #[arg(long)]
    deployment: Option<PathBuf>,
    /// Overwrite an existing ledger.
    #[arg(long)]
    force: bool,
}

#[derive(Parser)]
struct RegistryArgs {
    #[arg(long)]
    caller: String,
    #[arg(long)]
    asset: AssetId,
}

#[derive(Parser)]
struct OwnershipArgs {
    #[arg(long)]
    caller: String,
    #[arg(long)]
    new_owner: String,
}

#[derive(Parser)]
struct WalletArgs {
    #[arg(long, default_value = "native")]
    asset: AssetId,
    #[arg(long)]
    account: String,
    #[arg(long)]
    amount: Amount,
}

#[derive(Parser)]
struct ReserveArgs {
    #[arg(long, default_value = "native")]
    asset: AssetId,
    #[arg(long)]
    amount: Amount,
}

#[derive(Parser)]
struct MoveArgs {
    #[arg(long, default_value = "native")]
    asset: AssetId,
    #[arg(long)]
    account: String,
    #[arg(long)]
    amount: Amount,
}

#[derive(Parser)]
struct BalanceArgs {
    #[arg(long, default_value = "native")]
    asset: AssetId,
    #[arg(long)]
    account: String,
}

#[derive(Parser)]
struct CustodyArgs {
    #[arg(long)]
    asset: Option<AssetId>,
}

#[derive(Parser)]
struct StatementArgs {
    #[arg(long, default_value = "./reports")]
    reports_dir: PathBuf,
    /// File stem for the outputs.
    #[arg(long, default_value = "statement")]
    name: String,
}

#[derive(Parser)]
struct VerifyArgs {
    #[arg(long)]
    statement: PathBuf,
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn clock_for(at: Option<&str>) -> CliResult<Arc<dyn Clock>> {
    let clock: Arc<dyn Clock> = match at {
        Some(s) => Arc::new(ManualClock::at(parse_instant(s)?)),
        None => Arc::new(SystemClock),
    };
    Ok(clock)
}

fn load_with(db: &Path, clock: Arc<dyn Clock>) -> CliResult<(LedgerStore, Ledger)> {
    let store = LedgerStore::open(db)?;
    let Some((snapshot, custody)) = store.load::<InMemoryCustody>()? else {
        return Err(format!("no ledger at {}; run `init` first", db.display()).into());
    };
    Ok((store, Ledger::restore(snapshot, custody, clock)))
}

fn load(db: &Path, clock: Arc<dyn Clock>) -> CliResult<Ledger> {
    Ok(load_with(db, clock)?.1)
}

/// Load, apply `f`, and save only if `f` succeeded.
fn mutate(
    db: &Path,
    clock: Arc<dyn Clock>,
    f: impl FnOnce(&mut Ledger) -> CliResult<()>,
) -> CliResult<()> {
    let (store, mut ledger) = load_with(db, clock)?;
    f(&mut ledger)?;
    store.save(&ledger.snapshot(), ledger.custody())?;
    info!(events = ledger.events().len(), "ledger updated");
    Ok(())
}

fn run_init(db: &Path, clock: Arc<dyn Clock>, args: InitArgs) -> CliResult<()> {
    let store = LedgerStore::open(db)?;
    if !args.force && store.load::<InMemoryCustody>()?.is_some() {
        return Err(format!("ledger already exists at {}", db.display()).into());
    }
    let (owner, tokens): (AccountId, Vec<AssetId>) = match (&args.owner, &args.deployment) {
        (Some(owner), _) => (normalize_account(owner), vec![]),
        (None, Some(path)) => {
            let rec = DeploymentRecord::load_from_path(path)?;
            (rec.owner(), rec.initial_tokens()?)
        }
        (None, None) => {
            let rec = DeploymentRecord::load()?;
            (rec.owner(), rec.initial_tokens()?)
        }
    };
    let mut ledger = Ledger::new(owner.clone(), InMemoryCustody::new(), clock);
    for token in &tokens {
        ledger.add_supported_asset(&owner, token)?;
    }
    store.save(&ledger.snapshot(), ledger.custody())?;
    info!(%owner, tokens = tokens.len(), db = %db.display(), "ledger initialized");
    println!("owner\t{}", owner);
    for token in tokens {
        println!("supported\t{}", token);
    }
    Ok(())
}

fn run_custody(db: &Path, clock: Arc<dyn Clock>, args: CustodyArgs) -> CliResult<()> {
    let ledger = load(db, clock)?;
    let assets: Vec<AssetId> = match args.asset {
        Some(a) => vec![a],
        None => std::iter::once(AssetId::Native)
            .chain(ledger.registry().entries().map(|(a, _)| a.clone()))
            .collect(),
    };
    for asset in assets {
        println!("{}\t{}", asset, ledger.custody_balance(&asset));
    }
    Ok(())
}

fn run_statement(db: &Path, clock: Arc<dyn Clock>, args: StatementArgs) -> CliResult<()> {
    let ledger = load(db, clock)?;
    let report = StatementReport::new(CustodyStatement::build(&ledger)?)?;
    std::fs::create_dir_all(&args.reports_dir)?;
    let json_path = args
        .reports_dir
        .join(format!("{}.statement.json", args.name));
    let hash_path = args.reports_dir.join(format!("{}.sha256", args.name));
    let html_path = args.reports_dir.join(format!("{}.html", args.name));
    std::fs::write(
        &json_path,
        serde_json::to_string_pretty(&report.statement)?,
    )?;
    std::fs::write(
        &hash_path,
        format!("{}\n", report.reproducibility_hash_sha256),
    )?;
    render_report(&report, &html_path)?;
    info!(
        ?json_path,
        ?hash_path,
        ?html_path,
        solvent = report.statement.is_solvent(),
        "statement written"
    );
    println!("{}", report.reproducibility_hash_sha256);
    Ok(())
}

/// `<stem>.statement.json` pairs with `<stem>.sha256` in the same directory.
fn hash_path_for(statement: &Path) -> PathBuf {
    let file = statement
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let stem = file
        .strip_suffix(".statement.json")
        .or_else(|| file.strip_suffix(".json"))
        .unwrap_or(&file);
    statement
        .parent()
        .unwrap_or(Path::new("."))
        .join(format!("{}.sha256", stem))
}

fn run_verify(args: VerifyArgs) -> CliResult<()> {
    let raw = std::fs::read_to_string(&args.statement)?;
    let statement: CustodyStatement = serde_json::from_str(&raw)?;
    let expected = std::fs::read_to_string(hash_path_for(&args.statement)).ok();
    let result = verify_statement_hash(&statement, expected.as_deref())?;
    if result.matches {
        println!("OK\t{}", result.statement_hash);
    } else {
        eprintln!(
            "MISMATCH\tcomputed={}\texpected={:?}",
            result.statement_hash, result.expected_hash
        );
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_deposit() {
        let cli = Cli::try_parse_from([
            "custody-ledger",
            "--at",
            "1700000000",
            "deposit",
            "--account",
            "0xA11CE",
            "--amount",
            "100000000000000000000",
        ])
        .unwrap();
        assert_eq!(cli.at.as_deref(), Some("1700000000"));
        match cli.command {
            Command::Deposit(args) => {
                assert!(args.asset.is_native());
                assert_eq!(args.amount, 100_000_000_000_000_000_000);
            }
            _ => panic!("expected deposit"),
        }
    }

    #[test]
    fn hash_path_pairs_with_statement() {
        assert_eq!(
            hash_path_for(Path::new("reports/q1.statement.json")),
            PathBuf::from("reports/q1.sha256")
        );
        assert_eq!(
            hash_path_for(Path::new("q1.json")),
            PathBuf::from("q1.sha256")
        );
    }

    #[test]
    fn mutate_saves_only_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("ledger.sqlite");
        let clock = || -> Arc<dyn Clock> { Arc::new(ManualClock::at(1_000)) };
        run_init(
            &db,
            clock(),
            InitArgs {
                owner: Some("0xOwner".into()),
                deployment: None,
                force: false,
            },
        )
        .unwrap();

        let alice: AccountId = "0xa11ce".into();
        mutate(&db, clock(), |l| {
            l.custody_mut().mint(&AssetId::Native, &alice, 10);
            Ok(())
        })
        .unwrap();
        let failed = mutate(&db, clock(), |l| {
            l.deposit_native(&alice, 10)?;
            l.withdraw(&alice, 11)?;
            Ok(())
        });
        assert!(failed.is_err());

        let ledger = load(&db, clock()).unwrap();
        assert_eq!(ledger.get_balance(&AssetId::Native, &alice).unwrap(), 0);
        assert_eq!(ledger.custody().wallet_balance(&AssetId::Native, &alice), 10);
        assert_eq!(ledger.owner(), "0xowner");
    }
}
