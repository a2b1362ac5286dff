//!
//! stockgate CLI binary
//! --------------------
//! Operator tool over the authorization core: log in against the policy
//! authority, inspect the cached clearance-level table and check what the
//! current credential may do.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use stockgate::guard::{Navigator, RouteTable};
use stockgate::notify::TracingNotifier;
use stockgate::policy::catalog;
use stockgate::policy::FunctionId;
use stockgate::{Gate, GateConfig};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--config <file>] <command> [args]\n\nCommands:\n  login <identity> <secret>   authenticate and fetch the clearance-level table\n  logout                      forget the stored credential\n  whoami                      show identity and clearance level of the stored credential\n  levels                      refresh and print the clearance-level table\n  check <function>            can the current credential perform <function>?\n  route <path>                would navigation to <path> be allowed?\n  functions                   list function metadata known to the authority\n  sync-functions              register catalog functions missing at the authority\n\nEnvironment:\n  STOCKGATE_API_URL, STOCKGATE_STORE_PATH, STOCKGATE_LOGIN_ROUTE, STOCKGATE_DENIED_ROUTE, STOCKGATE_HOME_ROUTE,\n  STOCKGATE_CLEAR_POLICY_ON_LOGOUT, STOCKGATE_PERSIST_POLICY, STOCKGATE_REQUEST_TIMEOUT_SECS\n  RUST_LOG (default: info)"
    );
}

struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate(&self, route: &str) { println!("redirect -> {}", route); }
}

fn arg<'a>(args: &'a [String], idx: usize, what: &str) -> Result<&'a str> {
    args.get(idx).map(String::as_str).ok_or_else(|| anyhow!("missing argument: {}", what))
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut it = env::args();
    let program = it.next().unwrap_or_else(|| "stockgate".into());

    let mut config_path: Option<PathBuf> = None;
    let mut args: Vec<String> = Vec::new();
    while let Some(a) = it.next() {
        match a.as_str() {
            "--config" => config_path = Some(PathBuf::from(it.next().ok_or_else(|| anyhow!("--config needs a path"))?)),
            "-h" | "--help" => { print_usage(&program); return Ok(()); }
            _ => args.push(a),
        }
    }
    let Some(cmd) = args.first().cloned() else {
        print_usage(&program);
        return Ok(());
    };

    let cfg = GateConfig::load(config_path.as_deref())?;
    info!(target: "stockgate", "stockgate: api_url='{}' store='{}'", cfg.api_url, cfg.store_path.display());
    let gate = Gate::from_config(cfg, Arc::new(TracingNotifier))?.with_navigator(Arc::new(PrintNavigator));
    gate.session().start().await.unwrap_or_else(|e| eprintln!("warning: policy refresh failed: {}", e));

    match cmd.as_str() {
        "login" => {
            let identity = arg(&args, 1, "identity")?;
            let secret = arg(&args, 2, "secret")?;
            gate.session().login(identity, secret).await.map_err(|e| anyhow!(e.user_message()))?;
            println!("logged in as {} (clearance level {})", identity, gate.tokens().clearance_level());
        }
        "logout" => {
            gate.session().logout();
            println!("logged out");
        }
        "whoami" => match gate.tokens().claims() {
            Some(_) => println!(
                "{} (clearance level {})",
                gate.tokens().user_identity().unwrap_or_else(|| "<unknown>".into()),
                gate.tokens().clearance_level()
            ),
            None => println!("not logged in"),
        },
        "levels" => {
            let snap = gate.cache().refresh().await?;
            let mut levels = snap.levels.clone();
            levels.sort_by(|a, b| b.level.cmp(&a.level));
            for l in levels {
                let fns: Vec<&str> = l.allowed_functions.iter().map(FunctionId::as_str).collect();
                println!("{:>3}  {:<16} {}", l.level, l.name, fns.join(", "));
            }
        }
        "check" => {
            let f = FunctionId::new(arg(&args, 1, "function")?);
            let ok = gate.current_user_can(&f);
            println!("{} {}", if ok { "allowed" } else { "denied" }, f);
            if !ok { std::process::exit(1); }
        }
        "route" => {
            let path = arg(&args, 1, "path")?;
            let guard = gate.route_guard(Arc::new(PrintNavigator), RouteTable::inventory_default());
            let ok = guard.can_activate_path(path);
            println!("{} {}", if ok { "allowed" } else { "denied" }, path);
            if !ok { std::process::exit(1); }
        }
        "functions" => {
            let list = gate.cache().refresh_functions().await?;
            for f in list.iter() {
                println!("{:<24} {:<10} {}", f.id, f.category, f.name);
            }
        }
        "sync-functions" => {
            let n = gate.cache().ensure_functions(&catalog::catalog_permissions()).await?;
            println!("registered {} functions", n);
        }
        other => {
            print_usage(&program);
            return Err(anyhow!("unknown command '{}'", other));
        }
    }
    gate.dispose();
    Ok(())
}
