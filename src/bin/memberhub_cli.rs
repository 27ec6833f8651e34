//!
//! memberhub CLI binary
//! --------------------
//! Runs one backend operation through the access proxy as the holder of an
//! API token or as a persona logged in with username and password, and
//! prints the JSON result.

use std::env;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{Map, Value};
use tracing_subscriber::{fmt, EnvFilter};

use memberhub::i18n::Locale;
use memberhub::{Environment, ProxyConfig, ProxyError, DEFAULT_SOURCE_IP};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [options] --token <token> <operation> [json-args]\n  {program} [options] --login <user> --password <pw> <operation> [json-args]\n\nOptions:\n  --fixtures <path>     Fixture file (default: bundled sample data)\n  --storage <dir>       Storage root for attachments and exports\n  --locale <de|en>      Locale for messages\n  --internal            Allow internal-only operations\n  --ip <addr>           Source address (default: {DEFAULT_SOURCE_IP})\n  -h, --help            Show this help\n\n[json-args] is a JSON array of positional arguments or an object of keyword arguments.\n\nExamples:\n  {program} --token memberhub-orga_bot-<secret> list_registrations '[1]'\n  {program} --login berta@example.cde --password secret get_persona\n\nEnvironment:\n  MEMBERHUB_* variables provide defaults for every option."
    );
}

#[derive(Default)]
struct Args {
    token: Option<String>,
    login: Option<String>,
    password: Option<String>,
    ip: Option<String>,
    internal: bool,
    operation: Option<String>,
    payload: Option<String>,
}

fn parse_args(config: &mut ProxyConfig, argv: &[String]) -> Result<Option<Args>> {
    let mut out = Args::default();
    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        let mut value = |flag: &str| it.next().cloned().ok_or_else(|| anyhow!("{flag} requires a value"));
        match a.as_str() {
            "-h" | "--help" => return Ok(None),
            "--token" => out.token = Some(value(a.as_str())?),
            "--login" => out.login = Some(value(a.as_str())?),
            "--password" => out.password = Some(value(a.as_str())?),
            "--ip" => out.ip = Some(value(a.as_str())?),
            "--fixtures" => config.fixtures = Some(value(a.as_str())?.into()),
            "--storage" => config.storage_dir = value(a.as_str())?.into(),
            "--locale" => config.locale = value(a.as_str())?.parse::<Locale>()?,
            "--internal" => out.internal = true,
            s if s.starts_with('-') => bail!("unknown flag {s}"),
            s if out.operation.is_none() => out.operation = Some(s.to_string()),
            s if out.payload.is_none() => out.payload = Some(s.to_string()),
            s => bail!("unexpected argument {s}"),
        }
    }
    Ok(Some(out))
}

fn split_payload(payload: Option<&str>) -> Result<(Vec<Value>, Map<String, Value>)> {
    let Some(text) = payload else { return Ok((Vec::new(), Map::new())); };
    match serde_json::from_str::<Value>(text).context("json-args must be valid JSON")? {
        Value::Array(a) => Ok((a, Map::new())),
        Value::Object(o) => Ok((Vec::new(), o)),
        other => Ok((vec![other], Map::new())),
    }
}

/// `Ok(None)` when only the usage text was requested.
fn run(argv: &[String]) -> Result<Option<Result<Value, ProxyError>>> {
    let mut config = ProxyConfig::from_env()?;
    let Some(args) = parse_args(&mut config, argv)? else {
        print_usage(argv.first().map(String::as_str).unwrap_or("memberhub-cli"));
        return Ok(None);
    };
    let operation = args.operation.clone().ok_or_else(|| anyhow!("missing <operation>"))?;
    let (positional, keywords) = split_payload(args.payload.as_deref())?;
    config.internal_access |= args.internal;
    let ip = args.ip.clone().unwrap_or_else(|| DEFAULT_SOURCE_IP.to_string());

    let env = Environment::from_config(config)?;
    let credential = match (&args.token, &args.login) {
        (Some(t), None) => t.clone(),
        (None, Some(user)) => {
            let pw = args.password.as_deref().ok_or_else(|| anyhow!("--login requires --password"))?;
            env.login(user, pw, &ip)?
        }
        (None, None) => String::new(),
        (Some(_), Some(_)) => bail!("--token and --login are mutually exclusive"),
    };
    Ok(Some(env.proxy().call_from(&credential, &operation, &positional, &keywords, &ip)))
}

fn render(v: &Value) -> String { serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()) }

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let argv: Vec<String> = env::args().collect();
    match run(&argv) {
        Ok(None) => ExitCode::SUCCESS,
        Ok(Some(Ok(v))) => {
            println!("{}", render(&v));
            ExitCode::SUCCESS
        }
        Ok(Some(Err(e))) => {
            eprintln!("error: {e}");
            let mut src = std::error::Error::source(&e);
            while let Some(s) = src {
                eprintln!("  caused by: {s}");
                src = s.source();
            }
            ExitCode::from(e.exit_code() as u8)
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
