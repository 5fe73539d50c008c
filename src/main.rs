use clap::Parser;
use devattest::attest::{
    AttestationRequest, AttestationState, CommandTokenProvider, NonceMode, Orchestrator,
    VerifyMode,
};
use devattest::nonce::{Nonce, NonceGenerator};
use devattest::policy::{PolicyOutcome, PolicyVerifier, RateLimiter, RateLimiterConfig};
use devattest::remote::ReqwestTransport;
use devattest::store::{
    FileRequestHistoryStore, IRequestHistoryStore, MemoRequestHistoryStore,
    MemoTrustAnchorStore, RefValues,
};
use devattest::token::{EnvelopeCodec, Scheme, Statement};
use std::error::Error;
use std::fs;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Device integrity attestation tool")]
struct DevAttestCli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    Nonce(NonceArgs),
    Verify(VerifyArgs),
    Attest(AttestArgs),
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Generate a nonce for the given scheme, locally or from the \
    verification server")]
struct NonceArgs {
    #[arg(short, long, default_value = "playintegrity")]
    scheme: Scheme,

    #[arg(short, long, default_value = "local")]
    mode: NonceMode,

    #[arg(long)]
    server: Option<String>,
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Cryptographically verify the supplied token using the key \
    material in the trust anchor store, and optionally appraise it against \
    reference values")]
struct VerifyArgs {
    #[arg(short, long, default_value = "token.jwt")]
    evidence: String,

    #[arg(short, long, default_value = "playintegrity")]
    scheme: Scheme,

    #[arg(short, long, default_value = "tastore.json")]
    tastore: String,

    /// Reference values overriding the built-in ones
    #[arg(short, long)]
    rvstore: Option<String>,

    /// Nonce the token is expected to be bound to; the statement is
    /// appraised only when it is given
    #[arg(short, long)]
    nonce: Option<String>,
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Run a complete, rate-limited attestation request using an \
    external command as the token provider")]
struct AttestArgs {
    #[arg(short, long, default_value = "playintegrity")]
    scheme: Scheme,

    #[arg(long, default_value = "local")]
    nonce_mode: NonceMode,

    #[arg(long, default_value = "local")]
    verify_mode: VerifyMode,

    #[arg(long)]
    server: Option<String>,

    /// Program invoked as `<provider> [provider-arg..] <scheme> <nonce>`
    #[arg(short, long)]
    provider: String,

    #[arg(long = "provider-arg", allow_hyphen_values = true)]
    provider_args: Vec<String>,

    #[arg(short, long, default_value = "tastore.json")]
    tastore: String,

    /// Reference values overriding the built-in ones
    #[arg(short, long)]
    rvstore: Option<String>,

    /// Persist the rate limiter's request history in this file
    #[arg(long)]
    history: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = DevAttestCli::parse();

    init_logging(cli.log_json);

    match cli.command {
        Command::Nonce(args) => match nonce(&args).await {
            Ok(n) => println!("{n}"),
            Err(e) => eprintln!("nonce generation failed: {e}"),
        },

        Command::Verify(args) => match verify(&args) {
            Ok(j) => {
                println!("{j}");
                println!("verification successful")
            }
            Err(e) => eprintln!("verification failed: {e}"),
        },

        Command::Attest(args) => match attest(&args).await {
            Ok(j) => println!("{j}"),
            Err(e) => eprintln!("attestation failed: {e}"),
        },
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn nonce(args: &NonceArgs) -> Result<Nonce, Box<dyn Error>> {
    let transport = Arc::new(ReqwestTransport::new()?);

    let n = NonceGenerator::new(transport)
        .generate(args.scheme, args.mode, args.server.as_deref())
        .await?;

    Ok(n)
}

fn verify(args: &VerifyArgs) -> Result<String, Box<dyn Error>> {
    let refvals = load_refvals(args.rvstore.as_deref())?;
    let codec = load_codec(&args.tastore, &refvals)?;

    let token = fs::read_to_string(&args.evidence)?;

    let payload = codec.decode(token.trim(), args.scheme)?;

    let statement = Statement::parse(args.scheme, &payload.claims)?;

    let outcome = match (&args.nonce, &args.rvstore) {
        (Some(nonce), _) => {
            let policy = PolicyVerifier::new(refvals);
            Some(policy.verify(&statement, &Nonce::from(nonce.as_str()))?)
        }
        (None, Some(_)) => return Err("appraisal requires the expected nonce".into()),
        (None, None) => None,
    };

    let j = serde_json::to_string_pretty(&Verified {
        statement: &statement,
        outcome: outcome.as_ref(),
    })?;

    Ok(j)
}

async fn attest(args: &AttestArgs) -> Result<String, Box<dyn Error>> {
    let args_ref: Vec<&str> = args.provider_args.iter().map(String::as_str).collect();
    let provider = Arc::new(CommandTokenProvider::new(&args.provider).with_args(&args_ref));

    let history: Arc<dyn IRequestHistoryStore> = match &args.history {
        Some(path) => Arc::new(FileRequestHistoryStore::new(path)),
        None => Arc::new(MemoRequestHistoryStore::new()),
    };
    let limiter = RateLimiter::for_scheme(history, args.scheme, RateLimiterConfig::default());

    let transport = Arc::new(ReqwestTransport::new()?);

    let mut orchestrator = Orchestrator::new(args.scheme, provider, transport, limiter);

    if args.verify_mode == VerifyMode::Local {
        let refvals = load_refvals(args.rvstore.as_deref())?;

        orchestrator = orchestrator
            .with_codec(load_codec(&args.tastore, &refvals)?)
            .with_policy(PolicyVerifier::new(refvals));
    }

    let request = AttestationRequest::new(args.nonce_mode, args.verify_mode, args.server.as_deref());

    let state: AttestationState<Statement> = orchestrator.run(&request).await;

    let j = serde_json::to_string_pretty(&state)?;

    Ok(j)
}

#[derive(serde::Serialize)]
struct Verified<'a> {
    statement: &'a Statement,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<&'a PolicyOutcome>,
}

fn load_codec(tastore: &str, refvals: &RefValues) -> Result<EnvelopeCodec, Box<dyn Error>> {
    let j = fs::read_to_string(tastore)?;

    let mut tas = MemoTrustAnchorStore::new();
    tas.load_json(&j)?;

    Ok(EnvelopeCodec::from_store(&tas).with_hostname(&refvals.hostname))
}

// the built-in reference values unless a file overrides them
fn load_refvals(rvstore: Option<&str>) -> Result<RefValues, Box<dyn Error>> {
    match rvstore {
        Some(path) => Ok(RefValues::parse(&fs::read_to_string(path)?)?),
        None => Ok(RefValues::default()),
    }
}
